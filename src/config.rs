//! Configuration for the chain organizer.

use std::time::Duration;

use bitcoin::block::Header;
use bitcoin::constants::genesis_block;
use bitcoin::Network;

use crate::chain::{Checkpoint, Milestone};
use crate::types::Height;

/// Consensus profile the chain-state roller advances under.
///
/// Activation heights select when the version-threshold soft forks take
/// effect on this network. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Settings {
    pub network: Network,
    pub bip34_height: Height,
    pub bip66_height: Height,
    pub bip65_height: Height,
}

impl Settings {
    pub fn mainnet() -> Self {
        Self {
            network: Network::Bitcoin,
            bip34_height: 227_931,
            bip66_height: 363_725,
            bip65_height: 388_381,
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            bip34_height: 21_111,
            bip66_height: 330_776,
            bip65_height: 581_885,
        }
    }

    pub fn regtest() -> Self {
        Self {
            network: Network::Regtest,
            bip34_height: 500,
            bip66_height: 1_251,
            bip65_height: 1_351,
        }
    }

    /// Genesis header of the configured network.
    pub fn genesis_header(&self) -> Header {
        genesis_block(self.network).header
    }
}

/// Organizer configuration. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Consensus profile for chain-state rolling.
    pub settings: Settings,

    /// Pinned `(hash, height)` pairs; consensus-critical.
    pub checkpoints: Vec<Checkpoint>,

    /// Optional single bypass point, activated once the candidate chain
    /// confirms it.
    pub milestone: Option<Milestone>,

    /// Window within which a header's timestamp counts as "current".
    /// Zero disables the check, making everything current.
    pub currency_window: Duration,

    /// Whether the node runs the header-first organizer (bodies downloaded
    /// separately) or the block-first one. Consumed by node wiring when
    /// choosing which engine to construct.
    pub headers_first: bool,
}

impl Config {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            checkpoints: Vec::new(),
            milestone: None,
            currency_window: Duration::ZERO,
            headers_first: true,
        }
    }

    pub fn mainnet() -> Self {
        Self::new(Settings::mainnet())
    }

    pub fn testnet() -> Self {
        Self::new(Settings::testnet())
    }

    pub fn regtest() -> Self {
        Self::new(Settings::regtest())
    }

    pub fn with_checkpoints(mut self, checkpoints: Vec<Checkpoint>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn with_milestone(mut self, milestone: Milestone) -> Self {
        self.milestone = Some(milestone);
        self
    }

    pub fn with_currency_window(mut self, window: Duration) -> Self {
        self.currency_window = window;
        self
    }

    pub fn blocks_first(mut self) -> Self {
        self.headers_first = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::BlockHash;

    #[test]
    fn test_defaults() {
        let config = Config::regtest();

        assert!(config.checkpoints.is_empty());
        assert!(config.milestone.is_none());
        assert!(config.currency_window.is_zero());
        assert!(config.headers_first);
    }

    #[test]
    fn test_builder_methods() {
        let hash = BlockHash::from_byte_array([7; 32]);
        let config = Config::regtest()
            .with_checkpoints(vec![Checkpoint::new(10, hash)])
            .with_milestone(Milestone::new(20, hash))
            .with_currency_window(Duration::from_secs(3600))
            .blocks_first();

        assert_eq!(config.checkpoints.len(), 1);
        assert_eq!(config.milestone.unwrap().height, 20);
        assert_eq!(config.currency_window, Duration::from_secs(3600));
        assert!(!config.headers_first);
    }

    #[test]
    fn test_genesis_header_matches_network() {
        let settings = Settings::regtest();
        assert_eq!(
            settings.genesis_header().block_hash(),
            genesis_block(Network::Regtest).header.block_hash()
        );
    }
}
