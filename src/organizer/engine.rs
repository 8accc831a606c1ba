//! Organizer construction, startup, and shared utilities.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bitcoin::BlockHash;
use tracing::{debug, error, info};

use crate::chain::{BypassTracker, ChainState, Checkpoints, SideTree};
use crate::config::Config;
use crate::error::FatalError;
use crate::event_bus::EventBus;
use crate::events::Event;
use crate::organizer::mode::Mode;
use crate::store::Store;
use crate::types::{Height, Link, OrganizerStats};
use crate::validation::BlockValidator;

/// The candidate-chain organizer.
///
/// Owns the side tree, the cached top-candidate chain state, the bypass
/// tracker, and the store's candidate index. All mutation happens on the
/// serialization context driving [`run`](crate::organizer::Organizer::run);
/// see the lifecycle module.
pub struct Organizer<M: Mode, S: Store> {
    pub(super) config: Config,
    pub(super) store: S,
    pub(super) bus: EventBus,
    pub(super) validator: Arc<dyn BlockValidator>,
    pub(super) tree: SideTree<M::Payload>,
    pub(super) checkpoints: Checkpoints,
    pub(super) bypass: BypassTracker,
    /// Chain state of the current candidate top; populated by `start`.
    pub(super) state: Option<Arc<ChainState>>,
    pub(super) stats: OrganizerStats,
    pub(super) fault: Option<FatalError>,
    pub(super) _mode: PhantomData<M>,
}

impl<M: Mode, S: Store> Organizer<M, S> {
    pub fn new(
        config: Config,
        store: S,
        bus: EventBus,
        validator: Arc<dyn BlockValidator>,
    ) -> Self {
        let checkpoints = Checkpoints::new(config.checkpoints.clone());
        let bypass = BypassTracker::new(&checkpoints, config.milestone);
        Self {
            config,
            store,
            bus,
            validator,
            tree: SideTree::new(),
            checkpoints,
            bypass,
            state: None,
            stats: OrganizerStats::default(),
            fault: None,
            _mode: PhantomData,
        }
    }

    /// Initialize the top-candidate state cache and the milestone bypass.
    ///
    /// Must complete before any submission is processed.
    pub async fn start(&mut self) -> Result<(), FatalError> {
        let top = self.store.top_candidate().await?;
        let hash = self.candidate_hash(top).await?;
        let state = self
            .store
            .chain_state_at(&self.config.settings, &hash)
            .await?
            .ok_or(FatalError::ChainState(top))?;

        info!(height = top, %hash, "organizer starting at candidate top");
        self.state = Some(Arc::new(state));
        self.initialize_bypass(top).await
    }

    /// Height of the current candidate top, as cached.
    pub fn tip_height(&self) -> Option<Height> {
        self.state.as_ref().map(|state| state.height())
    }

    /// Hash of the current candidate top, as cached.
    pub fn tip_hash(&self) -> Option<BlockHash> {
        self.state.as_ref().map(|state| state.hash())
    }

    /// The terminal error, once the organizer has faulted.
    pub fn fault(&self) -> Option<&FatalError> {
        self.fault.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Activity counters, with the live side-tree size filled in.
    pub fn stats(&self) -> OrganizerStats {
        let mut stats = self.stats.clone();
        stats.tree_size = self.tree.len() as u64;
        stats
    }

    /// Three-tier chain-state lookup for a parent hash: the cached top
    /// candidate, the side tree, then the store.
    pub(super) async fn chain_state_for(
        &self,
        hash: &BlockHash,
    ) -> Result<Option<Arc<ChainState>>, FatalError> {
        // Top state is cached because it is by far the most commonly hit.
        if let Some(state) = &self.state {
            if state.hash() == *hash {
                return Ok(Some(Arc::clone(state)));
            }
        }

        if let Some(entry) = self.tree.get(hash) {
            return Ok(Some(Arc::clone(&entry.state)));
        }

        Ok(self
            .store
            .chain_state_at(&self.config.settings, hash)
            .await?
            .map(Arc::new))
    }

    /// Cache a payload into the side tree and announce it where the mode
    /// defines an announcement.
    pub(super) fn cache(&mut self, payload: M::Payload, state: Arc<ChainState>) {
        let height = state.height();
        debug!(height, hash = %state.hash(), "caching weak branch entry");
        self.tree.insert(payload, state);
        self.stats.cached += 1;
        if let Some(event) = M::archived(height) {
            self.bus.emit(&[event]);
        }
    }

    /// True when `time` falls within the configured currency window.
    pub(super) fn is_current(&self, time: u32) -> bool {
        let window = self.config.currency_window;
        if window.is_zero() {
            return true;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        u64::from(time).saturating_add(window.as_secs()) >= now
    }

    /// Hash of the candidate header at `height`.
    pub(super) async fn candidate_hash(&self, height: Height) -> Result<BlockHash, FatalError> {
        let link = self
            .store
            .to_candidate(height)
            .await?
            .ok_or(FatalError::ChainState(height))?;
        Ok(self.store.get_header_key(link).await?)
    }

    /// Activate the milestone if the store already carries it on the
    /// candidate chain.
    async fn initialize_bypass(&mut self, top: Height) -> Result<(), FatalError> {
        let Some(milestone) = self.config.milestone else {
            return Ok(());
        };
        let Some(link) = self.store.to_candidate(milestone.height).await? else {
            return Ok(());
        };

        let key = self
            .store
            .get_header_key(link)
            .await
            .map_err(|_| FatalError::Milestone(milestone.height))?;
        if key == milestone.hash {
            self.bypass.activate(milestone.height);
            self.notify_bypass(top, top);
        }
        Ok(())
    }

    /// Publish the current bypass extent together with the reorganization
    /// shape that produced it.
    pub(super) fn notify_bypass(&self, branch_point: Height, old_top: Height) {
        self.bus.emit(&[Event::Bypass {
            height: self.bypass.extent(),
            branch_point,
            old_top,
        }]);
    }

    /// Run the milestone test for a pushed link, fetching its key only when
    /// the configured height matches.
    pub(super) async fn update_milestone_link(
        &mut self,
        link: Link,
        height: Height,
    ) -> Result<(), FatalError> {
        if self.bypass.milestone_height() == Some(height) {
            let key = self
                .store
                .get_header_key(link)
                .await
                .map_err(|_| FatalError::Milestone(height))?;
            self.update_milestone(&key, height);
        }
        Ok(())
    }

    /// Run the milestone test for a pushed hash.
    pub(super) fn update_milestone(&mut self, hash: &BlockHash, height: Height) {
        if self.bypass.update(hash, height) {
            self.notify_bypass(height, height);
        }
    }

    /// Log consensus-context transitions between two adjacent states.
    pub(super) fn log_transitions(&self, previous: &ChainState, next: &ChainState) {
        if previous.flags() != next.flags() {
            info!(
                from = %format!("{:08x}", previous.flags()),
                to = %format!("{:08x}", next.flags()),
                height = next.height(),
                "activation flags changed"
            );
        }
        if previous.minimum_block_version() != next.minimum_block_version() {
            info!(
                from = previous.minimum_block_version(),
                to = next.minimum_block_version(),
                height = next.height(),
                "minimum block version changed"
            );
        }
    }

    /// A store answer that violates the index contract.
    pub(super) fn integrity(message: &str) -> FatalError {
        FatalError::StoreIntegrity(crate::error::StoreError::Integrity(message.to_string()))
    }

    /// Latch the terminal fault. First fault wins.
    pub(super) fn close(&mut self, fault: FatalError) {
        if self.fault.is_none() {
            error!(%fault, "organizer faulted");
            self.fault = Some(fault);
        }
    }
}
