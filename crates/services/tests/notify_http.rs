use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{Catalog, Position, QuestionDraft, ResultId, UserId};
use quiz_core::time::fixed_clock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use services::notify_service::build_request;
use services::{
    DeliveryStatus, FinalizeOutcome, HttpNotifier, Identity, Notifier, NotifierConfig,
    NotifyError, QuizConfig, QuizService,
};
use storage::repository::{InMemoryRepository, Storage};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEND_PATH: &str = "/functions/v1/send-results";

fn config(server: &MockServer, api_key: Option<&str>) -> NotifierConfig {
    NotifierConfig {
        endpoint: Some(format!("{}{SEND_PATH}", server.uri())),
        api_key: api_key.map(str::to_owned),
        app_base_url: "https://quiz.test".into(),
    }
}

#[tokio::test]
async fn posts_json_with_bearer_token() {
    let server = MockServer::start().await;
    let id = ResultId::generate();

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "to": "p@example.com",
            "score": 20,
            "total": 25,
            "percentage": 80,
            "resultId": id.to_string(),
            "quiz_name": "User's knowledge",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = HttpNotifier::new(config(&server, Some("secret")));
    let request = build_request(
        notifier.app_base_url(),
        "p@example.com",
        id,
        20,
        25,
        80,
        "User's knowledge",
    )
    .unwrap();
    notifier.notify(&request).await.unwrap();
}

#[tokio::test]
async fn rejected_request_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "ok": false })))
        .mount(&server)
        .await;

    let notifier = HttpNotifier::new(config(&server, None));
    let request =
        build_request("https://quiz.test", "p@example.com", ResultId::generate(), 1, 2, 50, "")
            .unwrap();
    let err = notifier.notify(&request).await.unwrap_err();
    assert!(matches!(err, NotifyError::HttpStatus(status) if status.as_u16() == 400));
}

#[tokio::test]
async fn unconfigured_notifier_is_disabled() {
    let notifier = HttpNotifier::new(NotifierConfig::default());
    assert!(!notifier.enabled());
    let request =
        build_request("https://quiz.test", "p@example.com", ResultId::generate(), 1, 2, 50, "")
            .unwrap();
    let err = notifier.notify(&request).await.unwrap_err();
    assert!(matches!(err, NotifyError::Disabled));
}

#[tokio::test]
async fn finalized_attempt_is_saved_then_notified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(json!({ "to": "p@example.com", "total": 2 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let repo = InMemoryRepository::new();
    let storage = Storage {
        local: Arc::new(repo.clone()),
        results: Arc::new(repo.clone()),
    };
    let drafts = ["Q1", "Q2"]
        .iter()
        .map(|id| QuestionDraft {
            id: (*id).into(),
            prompt: format!("prompt {id}"),
            options: vec!["yes".into(), "no".into()],
            answer: "yes".into(),
            image: None,
        })
        .collect();
    let svc = QuizService::new(
        fixed_clock(),
        QuizConfig::new(2, Duration::from_secs(600), "User's knowledge", 70).unwrap(),
        Arc::new(Catalog::from_drafts(drafts).unwrap()),
        &storage,
        Arc::new(HttpNotifier::new(config(&server, None))),
    );
    let identity = Identity::new(UserId::new("user-7").unwrap(), Some("p@example.com".into()));
    let session = svc
        .start(Some(identity), &mut StdRng::seed_from_u64(11))
        .await
        .unwrap();
    session.answer(Position::FIRST, "yes").await.unwrap();
    assert!(matches!(
        session.submit().await,
        FinalizeOutcome::Finalized { .. }
    ));

    let mut deliveries = session.deliveries();
    let (save, notify) = deliveries.settled().await;
    assert_eq!(save, DeliveryStatus::Succeeded);
    assert_eq!(notify, DeliveryStatus::Succeeded);

    let result_id = deliveries.result_id.borrow().expect("saved result id");
    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["resultId"], result_id.to_string());
    assert_eq!(
        body["reviewUrl"],
        format!("https://quiz.test/results?result_id={result_id}&shared=1")
    );
}
