mod answers;
mod catalog;
mod ids;
mod question;
mod result;
mod selection;

pub use answers::{AnswersByPosition, Position, PositionError};
pub use catalog::{Catalog, CatalogError};
pub use ids::{ParseIdError, QuestionId, ResultId, RunId, UserId};
pub use question::{Question, QuestionDraft, QuestionError};
pub use result::{FinalizeReason, FinalizedResult};
pub use selection::{Fingerprint, Run, Selection, SelectionError};
