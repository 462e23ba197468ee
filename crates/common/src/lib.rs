//! Shared utilities for the hayashi ledger-state core.
//!
//! This crate provides the small pieces that both the persistence layer and
//! the transaction engine depend on:
//!
//! - [`opaque`]: the canonical opaque text encoding used to key XDR values
//!   in the backing store (base64 over the value's XDR bytes)
//! - [`keys`]: projection from a protocol ledger entry to its ledger key
//! - [`math`]: lossless conversion between a `u128` and the two signed
//!   64-bit halves the backing store can represent
//! - [`error`]: the shared error type for encoding failures

pub mod error;
pub mod keys;
pub mod math;
pub mod opaque;

pub use error::{Error, Result};
pub use keys::ledger_entry_key;
pub use math::{join_u128, split_u128};
pub use opaque::{from_opaque_base64, to_opaque_base64};
