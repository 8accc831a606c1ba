//! The candidate-chain organizer.
//!
//! One engine, split across focused modules:
//!
//! - `engine.rs` - struct definition, startup, shared utilities
//! - `organize.rs` - the organize pipeline
//! - `reorg.rs` - branch work, strongness, and the reorg executor
//! - `disorganize.rs` - disorganize and malleated recovery entries
//! - `lifecycle.rs` - serialization context, commands, and the handle
//! - `mode.rs` - header-first / block-first strategy

mod disorganize;
mod engine;
mod lifecycle;
mod mode;
mod organize;
mod reorg;

pub use engine::Organizer;
pub use lifecycle::{Command, OrganizerHandle};
pub use mode::{BlocksFirst, HeadersFirst, Mode};

/// Header-first organizer over a store.
pub type HeaderOrganizer<S> = Organizer<HeadersFirst, S>;

/// Block-first organizer over a store.
pub type BlockOrganizer<S> = Organizer<BlocksFirst, S>;
