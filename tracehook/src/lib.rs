//! Classified callback registry for execution tracing.
//!
//! Observers register for single-instruction or code-block events, scoped to
//! one address space (by page-table root) or to all of them, and for
//! universal tracers to kernel or user mode. The execution engine asks the
//! registry which enabled tracers match each event and runs their callbacks.
//!
//! ```
//! use tracehook::{Granularity, Registry, TracerError, TracerId};
//!
//! let registry = Registry::new();
//! let id = registry.add_inst_tracer(0, "user", false, None).unwrap();
//! registry.enable(id).unwrap();
//! assert_eq!(registry.matching(Granularity::Instruction, 0x1aa000, false).len(), 1);
//!
//! assert_eq!(registry.disable(TracerId::from_raw(999_999)), Err(TracerError::InvalidId));
//! assert_eq!(registry.last_error(), Some(TracerError::InvalidId));
//! ```

pub mod config;
pub use config::RegistryConfig;

mod error;
pub use error::TracerError;

pub mod record;
pub use record::{Collection, Granularity, Scope, Tracer, TracerId, TracerSummary};

mod default_callback;
pub use default_callback::{default_callback, render_default};

mod listing;
pub use listing::Listing;

mod registry;
pub use registry::Registry;

mod global;
pub use global::{
    add_block_tracer, add_inst_tracer, disable_tracer, enable_tracer, global, last_error,
    list_tracers,
};

pub use tracehook_interfaces::{callback, ExecutionContext, TraceCallback, TraceOutput};
