//! Header-first and block-first instantiations of the organizer.
//!
//! The two modes share the whole engine; they differ in what `organize`
//! accepts, whether block-level validation runs, and which events announce
//! candidate-chain changes downstream. Each difference is one method on the
//! [`Mode`] strategy trait.

use bitcoin::block::Header;
use bitcoin::Block;

use crate::chain::ChainState;
use crate::error::{OrganizeError, ValidationResult};
use crate::events::Event;
use crate::store::ArchiveItem;
use crate::types::Height;
use crate::validation::BlockValidator;

/// Strategy distinguishing header-first from block-first operation.
pub trait Mode: Send + Sync + 'static {
    /// What `organize` accepts: a bare header or a full block.
    type Payload: Clone + Send + Sync + 'static;

    /// Whether payloads carry block bodies.
    const IS_BLOCK: bool;

    fn header(payload: &Self::Payload) -> &Header;

    fn archive_item(payload: &Self::Payload) -> ArchiveItem<'_>;

    /// Rebuild a payload from archived parts, e.g. when re-seeding the side
    /// tree during disorganize. `None` when a required body is missing.
    fn payload_of(header: Header, block: Option<Block>) -> Option<Self::Payload>;

    /// Block-level validation; a no-op for headers.
    fn validate(
        payload: &Self::Payload,
        state: &ChainState,
        validator: &dyn BlockValidator,
    ) -> ValidationResult<()>;

    fn duplicate(height: Height) -> OrganizeError;

    fn orphan() -> OrganizeError;

    /// Event announcing a candidate push at `height`.
    fn organized(height: Height) -> Event;

    /// Event announcing a candidate pop at `height`.
    fn reorganized(height: Height) -> Event;

    /// Event announcing a cache into the side tree, where the mode defines
    /// one.
    fn archived(height: Height) -> Option<Event>;

    /// Post-reorg kick for the downstream chaser waiting on this mode's
    /// output.
    fn chase(branch_point: Height) -> Event;
}

/// Header-first operation: bare headers organize the candidate chain and the
/// download chaser fetches bodies behind it.
#[derive(Debug, Clone, Copy)]
pub enum HeadersFirst {}

impl Mode for HeadersFirst {
    type Payload = Header;

    const IS_BLOCK: bool = false;

    fn header(payload: &Self::Payload) -> &Header {
        payload
    }

    fn archive_item(payload: &Self::Payload) -> ArchiveItem<'_> {
        ArchiveItem::Header(payload)
    }

    fn payload_of(header: Header, _block: Option<Block>) -> Option<Self::Payload> {
        Some(header)
    }

    fn validate(
        _payload: &Self::Payload,
        _state: &ChainState,
        _validator: &dyn BlockValidator,
    ) -> ValidationResult<()> {
        Ok(())
    }

    fn duplicate(height: Height) -> OrganizeError {
        OrganizeError::DuplicateHeader { height }
    }

    fn orphan() -> OrganizeError {
        OrganizeError::OrphanHeader
    }

    fn organized(height: Height) -> Event {
        Event::HeaderOrganized { height }
    }

    fn reorganized(height: Height) -> Event {
        Event::HeaderReorganized { height }
    }

    fn archived(height: Height) -> Option<Event> {
        Some(Event::HeaderArchived { height })
    }

    fn chase(branch_point: Height) -> Event {
        Event::Headers { branch_point }
    }
}

/// Block-first operation: full blocks organize the candidate chain and the
/// validation chaser follows it.
#[derive(Debug, Clone, Copy)]
pub enum BlocksFirst {}

impl Mode for BlocksFirst {
    type Payload = Block;

    const IS_BLOCK: bool = true;

    fn header(payload: &Self::Payload) -> &Header {
        &payload.header
    }

    fn archive_item(payload: &Self::Payload) -> ArchiveItem<'_> {
        ArchiveItem::Block(payload)
    }

    fn payload_of(header: Header, block: Option<Block>) -> Option<Self::Payload> {
        let block = block?;
        debug_assert_eq!(block.header, header);
        Some(block)
    }

    fn validate(
        payload: &Self::Payload,
        state: &ChainState,
        validator: &dyn BlockValidator,
    ) -> ValidationResult<()> {
        validator.validate(payload, state)
    }

    fn duplicate(height: Height) -> OrganizeError {
        OrganizeError::DuplicateBlock { height }
    }

    fn orphan() -> OrganizeError {
        OrganizeError::OrphanBlock
    }

    fn organized(height: Height) -> Event {
        Event::BlockOrganized { height }
    }

    fn reorganized(height: Height) -> Event {
        Event::BlockReorganized { height }
    }

    fn archived(_height: Height) -> Option<Event> {
        None
    }

    fn chase(branch_point: Height) -> Event {
        Event::Block { branch_point }
    }
}
