//! Recovery entries: disorganize after a validation failure, and malleated
//! block handling.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::FatalError;
use crate::events::Event;
use crate::organizer::engine::Organizer;
use crate::organizer::mode::Mode;
use crate::store::Store;
use crate::types::Link;

impl<M: Mode, S: Store> Organizer<M, S> {
    /// Restore the confirmed chain as the candidate after the header at
    /// `link` proved unconfirmable.
    ///
    /// Candidates strictly between the fork point and the failing height are
    /// preserved in the side tree; the failing header and everything above
    /// it is poisoned and dropped.
    pub async fn disorganize(&mut self, link: Link) -> Result<(), FatalError> {
        if self.fault.is_some() {
            return Ok(());
        }

        let result = self.do_disorganize(link).await;
        if let Err(fault) = &result {
            self.close(fault.clone());
        }
        result
    }

    async fn do_disorganize(&mut self, link: Link) -> Result<(), FatalError> {
        // A prior reorganization may already have removed the header.
        if !self.store.is_candidate_header(link).await? {
            return Ok(());
        }

        let height = self.store.get_height(link).await?;
        let fork_point = self.store.fork_point().await?;
        if height == 0 || height <= fork_point {
            return Err(FatalError::InvalidForkPoint { fork_point, height });
        }

        let old_state = self
            .state
            .clone()
            .ok_or_else(|| Self::integrity("disorganize before start"))?;
        let old_top = old_state.height();
        warn!(height, fork_point, old_top, "disorganizing candidate chain");

        // Preserve candidates below the failure in the side tree, rolling
        // chain state forward from the fork point.
        let fork_hash = self.candidate_hash(fork_point).await?;
        let mut state = Arc::new(
            self.store
                .chain_state_at(&self.config.settings, &fork_hash)
                .await?
                .ok_or(FatalError::ChainState(fork_point))?,
        );
        for index in (fork_point + 1)..height {
            let link = self
                .store
                .to_candidate(index)
                .await?
                .ok_or_else(|| Self::integrity("candidate index gap"))?;
            let header = self.store.get_header(link).await?;
            let block = if M::IS_BLOCK {
                self.store.get_block(link).await?
            } else {
                None
            };
            let payload = M::payload_of(header, block)
                .ok_or_else(|| Self::integrity("unassociated candidate during disorganize"))?;

            state = Arc::new(state.advance(M::header(&payload), &self.config.settings));
            self.cache(payload, Arc::clone(&state));
        }

        // Pop everything above the fork point.
        let top_candidate = self.store.top_candidate().await?;
        for index in ((fork_point + 1)..=top_candidate).rev() {
            self.store.pop_candidate().await?;
            self.bus.emit(&[M::reorganized(index)]);
        }

        if self.bypass.reset(fork_point) {
            self.notify_bypass(fork_point, old_top);
        }

        // Restore the confirmed chain above the fork point as the candidate.
        let top_confirmed = self.store.top_confirmed().await?;
        for index in (fork_point + 1)..=top_confirmed {
            let link = self
                .store
                .to_confirmed(index)
                .await?
                .ok_or_else(|| Self::integrity("confirmed index gap"))?;
            self.store.push_candidate(link).await?;
            self.bus.emit(&[M::organized(index)]);
            self.update_milestone_link(link, index).await?;
        }

        // Recompute the top-candidate state cache from the store.
        let new_top = self.store.top_candidate().await?;
        let new_hash = self.candidate_hash(new_top).await?;
        let new_state = self
            .store
            .chain_state_at(&self.config.settings, &new_hash)
            .await?
            .ok_or(FatalError::ChainState(new_top))?;
        self.log_transitions(&old_state, &new_state);
        self.state = Some(Arc::new(new_state));

        // Downstream chasers may be working ahead; send them back.
        self.bus.emit(&[Event::Disorganized { fork_point }]);
        info!(fork_point, new_top, "candidate chain restored to confirmed");
        Ok(())
    }

    /// Disassociate a malleated block body and re-announce its header for
    /// download.
    pub async fn malleated(&mut self, link: Link) -> Result<(), FatalError> {
        if self.fault.is_some() {
            return Ok(());
        }

        let result = self.do_malleated(link).await;
        if let Err(fault) = &result {
            self.close(fault.clone());
        }
        result
    }

    async fn do_malleated(&mut self, link: Link) -> Result<(), FatalError> {
        self.store
            .set_disassociated(link)
            .await
            .map_err(|_| FatalError::Disassociate)?;

        // A header reorganized out needs no re-download.
        if !self.store.is_candidate_header(link).await? {
            return Ok(());
        }

        info!(%link, "re-announcing malleated block for download");
        self.bus.emit(&[Event::Header { link }]);
        Ok(())
    }
}
