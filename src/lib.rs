//! Candidate-chain organizer for a Bitcoin full node.
//!
//! This library implements the subsystem that reconciles incoming headers or
//! blocks against the node's best chain:
//!
//! - Maintain an in-memory side tree of connectable branches too weak to
//!   displace the candidate chain
//! - Accumulate branch proof-of-work across the tree and the store
//! - Reorganize the candidate chain when a branch accumulates strictly more
//!   work
//! - Track checkpoint and milestone bypass so downstream validation can skip
//!   settled history
//! - Recover from validation failures by restoring the confirmed chain
//! - Publish typed events driving the download, validation, and confirmation
//!   chasers
//!
//! # Quick Start
//!
//! ```no_run
//! use chain_organizer::{Config, EventBus, HeaderOrganizer, MemoryStore, NullValidator};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::mainnet();
//!     let bus = EventBus::default();
//!     let store = MemoryStore::with_genesis(&config.settings);
//!
//!     let mut organizer =
//!         HeaderOrganizer::new(config, store, bus.clone(), Arc::new(NullValidator));
//!     organizer.start().await?;
//!
//!     let shutdown = CancellationToken::new();
//!     let handle = organizer.spawn(shutdown.clone());
//!
//!     // Feed headers from peer protocols through the handle; subscribe to
//!     // `bus` for candidate-chain events.
//!     # let _ = handle;
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! The organizer is single-threaded cooperative: one task owns all mutable
//! state and runs each submission to completion before the next. Handles
//! submit from any thread without blocking. Events published during one work
//! item reach any subscriber in publication order.

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub mod chain;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod logging;
pub mod organizer;
pub mod store;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use chain::{ChainState, Checkpoint, Checkpoints, Milestone};
pub use config::{Config, Settings};
pub use error::{
    FatalError, OrganizeError, OrganizeResult, StoreError, StoreResult, ValidationError,
};
pub use event_bus::{EventBus, EventStream};
pub use events::Event;
pub use logging::{init_console_logging, LoggingError, LoggingResult};
pub use organizer::{
    BlockOrganizer, BlocksFirst, HeaderOrganizer, HeadersFirst, Mode, Organizer, OrganizerHandle,
};
pub use store::{ArchiveItem, MemoryStore, Store};
pub use types::{HeaderState, Height, Link, OrganizerStats};
pub use validation::{BlockValidator, NullValidator};

// Re-export commonly used bitcoin types
pub use bitcoin::block::Header;
pub use bitcoin::{Block, BlockHash, CompactTarget, Network};

/// Current version of the chain-organizer library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
