//! Which persistence failures reach the caller.
//!
//! The session always applies a mutation in memory first. What happens when
//! the matching store write fails depends only on the kind of mutation, and
//! is decided here rather than at each call site.

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    SaveCatalog,
    MergeCatalog,
    ClearCatalog,
    AddHistory,
    RemoveHistory,
    ClearHistory,
    SaveSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and return the error: the user asked for a catalog change and
    /// must learn that it did not stick.
    Surface,
    /// Log and carry on: session state already holds the change.
    Swallow,
}

pub const fn policy(mutation: Mutation) -> FailurePolicy {
    match mutation {
        Mutation::SaveCatalog | Mutation::MergeCatalog | Mutation::ClearCatalog => {
            FailurePolicy::Surface
        }
        Mutation::AddHistory
        | Mutation::RemoveHistory
        | Mutation::ClearHistory
        | Mutation::SaveSettings => FailurePolicy::Swallow,
    }
}

/// Log a failed write and apply the mutation's policy to it.
pub fn settle(mutation: Mutation, result: Result<()>) -> Result<()> {
    let Err(err) = result else {
        return Ok(());
    };

    match policy(mutation) {
        FailurePolicy::Surface => {
            tracing::error!("{:?} failed: {}", mutation, err);
            Err(err)
        }
        FailurePolicy::Swallow => {
            tracing::warn!("{:?} not persisted, keeping in-memory state: {}", mutation, err);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::Collection;

    #[test]
    fn test_catalog_failures_surface() {
        for m in [Mutation::SaveCatalog, Mutation::MergeCatalog, Mutation::ClearCatalog] {
            assert_eq!(policy(m), FailurePolicy::Surface);
            let err = Error::write(Collection::Songs, Some("a"), "boom");
            assert!(settle(m, Err(err)).is_err());
        }
    }

    #[test]
    fn test_history_and_settings_failures_swallowed() {
        for m in [
            Mutation::AddHistory,
            Mutation::RemoveHistory,
            Mutation::ClearHistory,
            Mutation::SaveSettings,
        ] {
            assert_eq!(policy(m), FailurePolicy::Swallow);
            let err = Error::write(Collection::History, None, "boom");
            assert!(settle(m, Err(err)).is_ok());
        }
    }

    #[test]
    fn test_success_passes_through() {
        assert!(settle(Mutation::SaveCatalog, Ok(())).is_ok());
    }
}
