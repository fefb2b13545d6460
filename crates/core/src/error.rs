use thiserror::Error;

use crate::link::LinkError;
use crate::model::{CatalogError, PositionError, QuestionError, SelectionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Link(#[from] LinkError),
}
