//! Block validation boundary.
//!
//! Full consensus checking (script, merkle, subsidy, timestamp, retarget)
//! lives outside this crate. The organizer drives whatever validator it is
//! constructed with, handing it the chain state rolled to the block under
//! test, and reports the verdict to the caller unchanged.

use bitcoin::Block;

use crate::chain::ChainState;
use crate::error::ValidationResult;

/// Block-level validation invoked by the block-mode organizer for payloads
/// not covered by a checkpoint or milestone bypass.
pub trait BlockValidator: Send + Sync {
    fn validate(&self, block: &Block, state: &ChainState) -> ValidationResult<()>;
}

/// Accepts everything. Used by the header-mode organizer (which performs no
/// block validation) and by deployments that validate downstream.
#[derive(Debug, Default)]
pub struct NullValidator;

impl BlockValidator for NullValidator {
    fn validate(&self, _block: &Block, _state: &ChainState) -> ValidationResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::test_utils::{block_with_coinbase, EASY_BITS};

    #[test]
    fn test_null_validator_accepts() {
        let settings = Settings::regtest();
        let genesis = settings.genesis_header();
        let block = block_with_coinbase(genesis.block_hash(), EASY_BITS, genesis.time + 1, 1);
        let state =
            ChainState::genesis(&genesis, &settings).advance(&block.header, &settings);

        assert!(NullValidator.validate(&block, &state).is_ok());
    }
}
