//! Typed events carried on the chaser bus.
//!
//! The organizer and its downstream chasers (download, validation,
//! confirmation) are wired cyclically through one broadcast bus rather than
//! holding references to each other. Every variant carries the height or
//! store link a subscriber needs to act without further context.

use crate::types::{Height, Link};

/// A chaser bus event.
///
/// The organizer publishes the candidate-chain variants and consumes the
/// `Block*` failure variants published by the validation and confirmation
/// chasers. `ConfirmBypassed` belongs to the confirmation chaser; it is
/// defined here so the bus stays closed over one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A header was pushed onto the candidate chain at `height`.
    HeaderOrganized { height: Height },

    /// The candidate header at `height` was popped during a reorganization.
    HeaderReorganized { height: Height },

    /// A header was cached to the side tree without reaching the candidate
    /// chain.
    HeaderArchived { height: Height },

    /// A block was pushed onto the candidate chain at `height`.
    BlockOrganized { height: Height },

    /// The candidate block at `height` was popped during a reorganization.
    BlockReorganized { height: Height },

    /// New candidate headers above `branch_point` need their bodies
    /// downloaded (header-mode chase kick).
    Headers { branch_point: Height },

    /// New candidate blocks above `branch_point` need validation
    /// (block-mode chase kick).
    Block { branch_point: Height },

    /// The body for the candidate header at `link` must be re-downloaded.
    Header { link: Link },

    /// The block at `link` failed pre-validation checks.
    BlockUnchecked { link: Link },

    /// The block at `link` failed validation.
    BlockUnvalid { link: Link },

    /// The header at `link` is permanently unconfirmable.
    BlockUnconfirmable { link: Link },

    /// The block at `link` is malleated: its body is invalid but the header
    /// may yet be satisfied by a different body.
    BlockMalleated { link: Link },

    /// The confirmation chaser skipped validation for the block at `height`.
    ConfirmBypassed { height: Height },

    /// Validation may be skipped at and below `height`.
    ///
    /// `branch_point` and `old_top` describe the reorganization that changed
    /// the bypass extent, so subscribers that dispatched work under the old
    /// extent can resynchronize. Emissions outside a reorganization set both
    /// to the current candidate top.
    Bypass {
        height: Height,
        branch_point: Height,
        old_top: Height,
    },

    /// Candidate work is available from `height` upward.
    Bump { height: Height },

    /// The candidate chain regressed below its previous top; downstream work
    /// above `branch_point` is stale.
    Regressed { branch_point: Height },

    /// The candidate chain was restored to the confirmed chain above
    /// `fork_point` after a validation failure.
    Disorganized { fork_point: Height },

    /// The node is shutting down.
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_equality() {
        assert_eq!(Event::Bump { height: 4 }, Event::Bump { height: 4 });
        assert_ne!(
            Event::HeaderOrganized { height: 1 },
            Event::HeaderReorganized { height: 1 }
        );
    }

    #[test]
    fn test_bypass_payload_carries_reorg_shape() {
        let event = Event::Bypass {
            height: 500,
            branch_point: 120,
            old_top: 640,
        };
        match event {
            Event::Bypass {
                height,
                branch_point,
                old_top,
            } => {
                assert_eq!(height, 500);
                assert!(branch_point < old_top);
            }
            _ => unreachable!(),
        }
    }
}
