//! The organize entry: one incoming header or block, end to end.

use std::sync::Arc;

use tracing::debug;

use crate::error::{OrganizeError, OrganizeResult};
use crate::organizer::engine::Organizer;
use crate::organizer::mode::Mode;
use crate::store::Store;
use crate::types::HeaderState;

impl<M: Mode, S: Store> Organizer<M, S> {
    /// Reconcile one incoming payload against the candidate chain.
    ///
    /// Returns the payload's height on success — which covers both topping
    /// the candidate chain and being cached as a weak branch. Fatal outcomes
    /// park the organizer; every later submission reports the same fault.
    pub async fn organize(&mut self, payload: M::Payload) -> OrganizeResult {
        if let Some(fault) = &self.fault {
            return Err(OrganizeError::Fatal(fault.clone()));
        }

        let result = self.do_organize(payload).await;
        if let Err(OrganizeError::Fatal(fault)) = &result {
            self.close(fault.clone());
        }
        result
    }

    async fn do_organize(&mut self, payload: M::Payload) -> OrganizeResult {
        let header = *M::header(&payload);
        let hash = header.block_hash();

        // Dedupe against the side tree.
        if let Some(height) = self.tree.get(&hash).map(|entry| entry.state.height()) {
            self.stats.duplicates += 1;
            return Err(M::duplicate(height));
        }

        // Dedupe against the store. A header-only slot may be filled by a
        // block; anything else already archived is a duplicate.
        if let Some(link) = self.store.to_header(&hash).await? {
            let state = self.store.get_header_state(link).await?;
            let height = self.store.get_height(link).await?;

            if state == HeaderState::Unconfirmable {
                return Err(OrganizeError::Unconfirmable { height });
            }
            if !M::IS_BLOCK || state != HeaderState::Unassociated {
                self.stats.duplicates += 1;
                return Err(M::duplicate(height));
            }
        }

        // Parent lookup: cached top state, side tree, then store.
        let Some(parent) = self.chain_state_for(&header.prev_blockhash).await? else {
            self.stats.orphans += 1;
            debug!(%hash, parent = %header.prev_blockhash, "orphaned");
            return Err(M::orphan());
        };

        // Roll chain state forward from parent to current header.
        let state = Arc::new(parent.advance(&header, &self.config.settings));
        let height = state.height();
        self.log_transitions(&parent, &state);

        // Checkpoints are chain validation, not block validation.
        if self.checkpoints.is_conflict(&hash, height) {
            return Err(OrganizeError::CheckpointConflict { height });
        }

        // Block validation is bypassed under checkpoint or milestone.
        let bypassed = self.bypass.is_bypassed(height);
        if !bypassed {
            if let Err(source) = M::validate(&payload, &state, self.validator.as_ref()) {
                return Err(OrganizeError::Validation { height, source });
            }
        }

        // Storable means bypassed, current, or strong. Weak branches are
        // cached either way; the distinction keeps sub-current peers from
        // earning candidacy without strength.
        let branch = self.branch_work(&header).await?;
        if !self.is_strong(&branch).await? {
            let current = bypassed || self.is_current(header.time);
            debug!(height, %hash, current, "weak branch cached");
            self.cache(payload, state);
            return Ok(height);
        }

        self.execute_reorg(payload, &state, branch).await?;

        self.stats.organized += 1;
        self.state = Some(state);
        Ok(height)
    }
}
