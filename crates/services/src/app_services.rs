use std::sync::Arc;

use quiz_core::model::Catalog;
use storage::repository::Storage;

use crate::Clock;
use crate::config::{NotifierConfig, QuizConfig};
use crate::error::AppServicesError;
use crate::notify_service::{HttpNotifier, Notifier};
use crate::review_service::ReviewService;
use crate::sessions::QuizService;

/// Assembles app-facing services over one storage backend and catalog.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<Catalog>,
    quiz: Arc<QuizService>,
    review: Arc<ReviewService>,
    notifier: Arc<dyn Notifier>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: QuizConfig,
        catalog: Catalog,
        notifier: NotifierConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(
            storage,
            clock,
            config,
            catalog,
            Arc::new(HttpNotifier::new(notifier)),
        ))
    }

    /// Build services over an existing storage bundle and notifier.
    #[must_use]
    pub fn with_storage(
        storage: Storage,
        clock: Clock,
        config: QuizConfig,
        catalog: Catalog,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let quiz = Arc::new(QuizService::new(
            clock,
            config,
            Arc::clone(&catalog),
            &storage,
            Arc::clone(&notifier),
        ));
        let review = Arc::new(ReviewService::new(
            Arc::clone(&catalog),
            Arc::clone(&storage.results),
        ));
        Self {
            catalog,
            quiz,
            review,
            notifier,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn review(&self) -> Arc<ReviewService> {
        Arc::clone(&self.review)
    }

    #[must_use]
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }
}
