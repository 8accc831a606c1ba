//! Per-height consensus context and its roller.
//!
//! A `ChainState` captures everything block-level validation needs to know
//! about a header's position on its branch: height, activation flags, the
//! minimum block version those flags imply, and the median-time-past window.
//! States are immutable once built; advancing a parent state with the next
//! header produces a new state.

use bitcoin::block::Header;
use bitcoin::BlockHash;

use crate::config::Settings;
use crate::types::Height;

/// Activation flag bits for the version-threshold soft forks.
pub mod forks {
    /// Coinbase height commitment (BIP34), minimum version 2.
    pub const BIP34: u32 = 1;
    /// Strict DER signatures (BIP66), minimum version 3.
    pub const BIP66: u32 = 1 << 1;
    /// `OP_CHECKLOCKTIMEVERIFY` (BIP65), minimum version 4.
    pub const BIP65: u32 = 1 << 2;
}

/// Number of ancestor timestamps contributing to median time past.
const MEDIAN_TIME_PAST_WINDOW: usize = 11;

/// Consensus context of one header on one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    height: Height,
    hash: BlockHash,
    flags: u32,
    minimum_block_version: i32,
    median_time_past: u32,
    /// Timestamps of the trailing window ending at this header, oldest first.
    timestamps: Vec<u32>,
}

impl ChainState {
    /// Context of the genesis header.
    pub fn genesis(header: &Header, settings: &Settings) -> Self {
        let flags = Self::flags_at(0, settings);
        Self {
            height: 0,
            hash: header.block_hash(),
            flags,
            minimum_block_version: Self::minimum_version(flags),
            median_time_past: 0,
            timestamps: vec![header.time],
        }
    }

    /// Roll this state forward by one header.
    ///
    /// Pure: reads only the parent state, the header, and the settings.
    /// The produced median time past is the one `header` itself must be
    /// validated against, i.e. the median over the window ending at the
    /// parent.
    pub fn advance(&self, header: &Header, settings: &Settings) -> Self {
        let height = self.height + 1;
        let flags = Self::flags_at(height, settings);

        let mut timestamps = self.timestamps.clone();
        timestamps.push(header.time);
        if timestamps.len() > MEDIAN_TIME_PAST_WINDOW {
            timestamps.remove(0);
        }

        Self {
            height,
            hash: header.block_hash(),
            flags,
            minimum_block_version: Self::minimum_version(flags),
            median_time_past: Self::median(&self.timestamps),
            timestamps,
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    /// Active soft-fork flags at this height.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Lowest block version the active flags admit.
    pub fn minimum_block_version(&self) -> i32 {
        self.minimum_block_version
    }

    /// Median of the timestamp window ending at the parent. Zero at genesis.
    pub fn median_time_past(&self) -> u32 {
        self.median_time_past
    }

    fn flags_at(height: Height, settings: &Settings) -> u32 {
        let mut flags = 0;
        if height >= settings.bip34_height {
            flags |= forks::BIP34;
        }
        if height >= settings.bip66_height {
            flags |= forks::BIP66;
        }
        if height >= settings.bip65_height {
            flags |= forks::BIP65;
        }
        flags
    }

    fn minimum_version(flags: u32) -> i32 {
        if flags & forks::BIP65 != 0 {
            4
        } else if flags & forks::BIP66 != 0 {
            3
        } else if flags & forks::BIP34 != 0 {
            2
        } else {
            1
        }
    }

    fn median(timestamps: &[u32]) -> u32 {
        let mut sorted = timestamps.to_vec();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::header_with_time;
    use bitcoin::constants::genesis_block;
    use bitcoin::Network;

    fn regtest_settings() -> Settings {
        Settings::regtest()
    }

    fn genesis_state(settings: &Settings) -> ChainState {
        ChainState::genesis(&genesis_block(Network::Regtest).header, settings)
    }

    #[test]
    fn test_genesis_state() {
        let settings = regtest_settings();
        let state = genesis_state(&settings);

        assert_eq!(state.height(), 0);
        assert_eq!(state.median_time_past(), 0);
        assert_eq!(state.minimum_block_version(), 1);
        assert_eq!(
            state.hash(),
            genesis_block(Network::Regtest).header.block_hash()
        );
    }

    #[test]
    fn test_advance_rolls_height_and_hash() {
        let settings = regtest_settings();
        let state = genesis_state(&settings);
        let header = header_with_time(state.hash(), crate::test_utils::EASY_BITS, 100, 1);

        let next = state.advance(&header, &settings);

        assert_eq!(next.height(), 1);
        assert_eq!(next.hash(), header.block_hash());
    }

    #[test]
    fn test_median_time_past_is_parent_window() {
        let settings = regtest_settings();
        let mut state = genesis_state(&settings);
        let genesis_time = genesis_block(Network::Regtest).header.time;

        // Height 1 validates against the genesis-only window.
        let header = header_with_time(state.hash(), crate::test_utils::EASY_BITS, 500, 1);
        state = state.advance(&header, &settings);
        assert_eq!(state.median_time_past(), genesis_time);

        // Grow past the window; the median tracks the trailing eleven.
        for nonce in 2..20u32 {
            let header = header_with_time(
                state.hash(),
                crate::test_utils::EASY_BITS,
                nonce * 100,
                nonce,
            );
            state = state.advance(&header, &settings);
        }

        // Parent window covers times 800..=1800 step 100; median is 1300.
        assert_eq!(state.median_time_past(), 1300);
    }

    #[test]
    fn test_flags_and_minimum_version_activate_by_height() {
        let settings = Settings {
            bip34_height: 2,
            bip66_height: 3,
            bip65_height: 4,
            ..Settings::regtest()
        };
        let mut state = genesis_state(&settings);
        let mut versions = Vec::new();

        for nonce in 1..=4u32 {
            let header =
                header_with_time(state.hash(), crate::test_utils::EASY_BITS, nonce, nonce);
            state = state.advance(&header, &settings);
            versions.push((state.flags(), state.minimum_block_version()));
        }

        assert_eq!(versions[0], (0, 1));
        assert_eq!(versions[1], (forks::BIP34, 2));
        assert_eq!(versions[2], (forks::BIP34 | forks::BIP66, 3));
        assert_eq!(versions[3], (forks::BIP34 | forks::BIP66 | forks::BIP65, 4));
    }

    #[test]
    fn test_advance_is_pure() {
        let settings = regtest_settings();
        let state = genesis_state(&settings);
        let header = header_with_time(state.hash(), crate::test_utils::EASY_BITS, 100, 1);

        let a = state.advance(&header, &settings);
        let b = state.advance(&header, &settings);

        assert_eq!(a, b);
        assert_eq!(state.height(), 0);
    }
}
