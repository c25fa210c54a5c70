//! Concrete execution contexts for the tracer registry.
//!
//! [`SnapshotContext`] works on captured bytes and registers. With the
//! `unicorn` feature, [`unicorn::attach`] wires a live Unicorn x86-64
//! instance into a [`tracehook::Registry`].

mod error;
pub use error::BackendError;

pub mod snapshot;
pub use snapshot::SnapshotContext;

pub mod x86;

#[cfg(feature = "unicorn")]
pub mod unicorn;
