//! Authorization policy.
//!
//! Reads are open (subject to the anonymous-read setting); mutations of an
//! existing record are reserved to its author. Handlers call
//! [`ensure_can_write`] before every update or delete.

use crate::error::DomainError;

/// The identity making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User(i32),
}

impl Principal {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Principal::Anonymous => None,
            Principal::User(id) => Some(*id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::User(_))
    }
}

/// A record bound to the user that created it.
pub trait Authored {
    fn author_id(&self) -> i32;
}

/// Mutating operation being authorized, used for the denial message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Edit,
    Delete,
}

impl WriteAction {
    fn verb(self) -> &'static str {
        match self {
            WriteAction::Edit => "edit",
            WriteAction::Delete => "delete",
        }
    }
}

/// Safe methods are allowed for everyone unless anonymous reads are disabled.
pub fn can_read(principal: &Principal, anonymous_reads: bool) -> bool {
    anonymous_reads || principal.is_authenticated()
}

/// Only the stored author may mutate a record.
pub fn can_write<R: Authored + ?Sized>(principal: &Principal, record: &R) -> bool {
    principal.user_id() == Some(record.author_id())
}

/// Fails with [`DomainError::Forbidden`] unless `principal` authored `record`.
pub fn ensure_can_write<R: Authored + ?Sized>(
    principal: &Principal,
    record: &R,
    kind: &str,
    action: WriteAction,
) -> Result<(), DomainError> {
    if can_write(principal, record) {
        Ok(())
    } else {
        tracing::debug!(
            principal = ?principal,
            author_id = record.author_id(),
            kind,
            "write denied"
        );
        Err(DomainError::Forbidden(format!(
            "You do not have permission to {} this {}.",
            action.verb(),
            kind
        )))
    }
}

/// Fails with [`DomainError::Unauthorized`] when reads need a signed-in user.
pub fn ensure_can_read(principal: &Principal, anonymous_reads: bool) -> Result<(), DomainError> {
    if can_read(principal, anonymous_reads) {
        Ok(())
    } else {
        Err(DomainError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Record(i32);

    impl Authored for Record {
        fn author_id(&self) -> i32 {
            self.0
        }
    }

    #[rstest]
    #[case(Principal::User(7), true)]
    #[case(Principal::User(8), false)]
    #[case(Principal::Anonymous, false)]
    fn only_author_can_write(#[case] principal: Principal, #[case] allowed: bool) {
        assert_eq!(can_write(&principal, &Record(7)), allowed);
    }

    #[rstest]
    #[case(Principal::Anonymous, true, true)]
    #[case(Principal::Anonymous, false, false)]
    #[case(Principal::User(1), false, true)]
    fn reads_follow_anonymous_setting(
        #[case] principal: Principal,
        #[case] anonymous_reads: bool,
        #[case] allowed: bool,
    ) {
        assert_eq!(can_read(&principal, anonymous_reads), allowed);
    }

    #[test]
    fn denial_message_names_action_and_kind() {
        let err = ensure_can_write(&Principal::User(2), &Record(1), "post", WriteAction::Delete)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "You do not have permission to delete this post."
        );
    }
}
