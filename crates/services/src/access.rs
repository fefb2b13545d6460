//! Who may see which result.

use quiz_core::model::{ResultId, UserId};
use quiz_core::ReviewLink;

/// Signed-in participant as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        let email = email
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());
        Self { user_id, email }
    }
}

/// Source the results view reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsAccess {
    /// A stored record fetched by id; read-only when `shared`.
    Remote { result_id: ResultId, shared: bool },
    /// The live attempt on this device.
    Local,
    /// Neither a link nor a signed-in participant.
    SignInRequired,
}

/// Decide what the results view may show.
///
/// A review link always wins over local state, even for a signed-in
/// participant.
#[must_use]
pub fn resolve_access(link: Option<&ReviewLink>, identity: Option<&Identity>) -> ResultsAccess {
    match (link, identity) {
        (Some(link), _) => ResultsAccess::Remote {
            result_id: link.result_id,
            shared: link.shared,
        },
        (None, Some(_)) => ResultsAccess::Local,
        (None, None) => ResultsAccess::SignInRequired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::new(UserId::new("u1").unwrap(), Some(" p@example.com ".into()))
    }

    #[test]
    fn link_wins_over_identity() {
        let link = ReviewLink::shared(ResultId::generate());
        assert_eq!(
            resolve_access(Some(&link), Some(&identity())),
            ResultsAccess::Remote {
                result_id: link.result_id,
                shared: true
            }
        );
        assert!(matches!(
            resolve_access(Some(&link), None),
            ResultsAccess::Remote { .. }
        ));
    }

    #[test]
    fn identity_without_link_reads_local() {
        assert_eq!(resolve_access(None, Some(&identity())), ResultsAccess::Local);
    }

    #[test]
    fn nothing_requires_sign_in() {
        assert_eq!(resolve_access(None, None), ResultsAccess::SignInRequired);
    }

    #[test]
    fn blank_email_is_dropped() {
        let id = Identity::new(UserId::new("u1").unwrap(), Some("  ".into()));
        assert_eq!(id.email, None);
        assert_eq!(identity().email.as_deref(), Some("p@example.com"));
    }
}
