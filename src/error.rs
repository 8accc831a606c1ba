//! Error types for the chain organizer.

use thiserror::Error;

use crate::types::Height;

/// Failures surfaced by the store façade.
///
/// Any store error reaching an organizer path is treated as fatal; the store
/// is the node's source of truth and an inconsistent answer cannot be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store integrity: {0}")]
    Integrity(String),

    #[error("store corruption: {0}")]
    Corruption(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Block-level verdicts from the external validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid proof of work")]
    InvalidProofOfWork,

    #[error("consensus: {0}")]
    Consensus(String),
}

/// Terminal failures. Once one occurs the organizer refuses further work
/// until process restart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error(transparent)]
    StoreIntegrity(#[from] StoreError),

    #[error("branch work walk hit a terminal link")]
    BranchWork,

    #[error("candidate work walk hit a terminal link")]
    Strength,

    #[error("branch point {branch_point} above candidate top {top}")]
    InvalidBranchPoint { branch_point: Height, top: Height },

    #[error("cannot disorganize height {height} at or below fork point {fork_point}")]
    InvalidForkPoint { fork_point: Height, height: Height },

    #[error("candidate chain state unavailable at height {0}")]
    ChainState(Height),

    #[error("milestone header key unavailable at height {0}")]
    Milestone(Height),

    #[error("block disassociation failed")]
    Disassociate,
}

/// Outcome of a single `organize` submission.
///
/// The first five variants are peer-attributable: they carry the height the
/// caller needs for peer scoring and leave organizer state untouched beyond
/// possibly caching the payload. `Stopped` is transient. `Fatal` parks the
/// organizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrganizeError {
    #[error("duplicate header at height {height}")]
    DuplicateHeader { height: Height },

    #[error("duplicate block at height {height}")]
    DuplicateBlock { height: Height },

    #[error("orphan header")]
    OrphanHeader,

    #[error("orphan block")]
    OrphanBlock,

    #[error("checkpoint conflict at height {height}")]
    CheckpointConflict { height: Height },

    #[error("block unconfirmable at height {height}")]
    Unconfirmable { height: Height },

    #[error("validation failed at height {height}: {source}")]
    Validation {
        height: Height,
        source: ValidationError,
    },

    #[error("organizer stopped")]
    Stopped,

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl From<StoreError> for OrganizeError {
    fn from(error: StoreError) -> Self {
        OrganizeError::Fatal(FatalError::StoreIntegrity(error))
    }
}

impl OrganizeError {
    /// True for the terminal class; everything else is recoverable at the
    /// peer or caller level.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OrganizeError::Fatal(_))
    }

    /// The height reported with the outcome, where one is known.
    pub fn height(&self) -> Option<Height> {
        match self {
            OrganizeError::DuplicateHeader { height }
            | OrganizeError::DuplicateBlock { height }
            | OrganizeError::CheckpointConflict { height }
            | OrganizeError::Unconfirmable { height }
            | OrganizeError::Validation { height, .. } => Some(*height),
            _ => None,
        }
    }
}

/// Type alias for store operation results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Type alias for validation operation results.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Type alias for organize submission results, carrying the height on success.
pub type OrganizeResult = std::result::Result<Height, OrganizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(OrganizeError::Fatal(FatalError::BranchWork).is_fatal());
        assert!(!OrganizeError::OrphanHeader.is_fatal());
        assert!(!OrganizeError::Stopped.is_fatal());
    }

    #[test]
    fn test_store_error_promotes_to_fatal() {
        let error: OrganizeError = StoreError::Integrity("bad index".to_string()).into();
        assert!(error.is_fatal());
    }

    #[test]
    fn test_reported_heights() {
        assert_eq!(OrganizeError::DuplicateBlock { height: 7 }.height(), Some(7));
        assert_eq!(OrganizeError::OrphanBlock.height(), None);
        assert_eq!(
            OrganizeError::Validation {
                height: 3,
                source: ValidationError::InvalidProofOfWork,
            }
            .height(),
            Some(3)
        );
    }
}
