//! Process-wide registry and free functions over it.

use std::sync::OnceLock;

use tracehook_interfaces::TraceCallback;

use crate::{Registry, TracerError, TracerId, TracerSummary};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// The registry shared by the whole process, created empty on first use.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::new)
}

pub fn add_inst_tracer(
    address_space_id: u64,
    label: &str,
    is_kernel: bool,
    callback: Option<TraceCallback>,
) -> Result<TracerId, TracerError> {
    global().add_inst_tracer(address_space_id, label, is_kernel, callback)
}

pub fn add_block_tracer(
    address_space_id: u64,
    label: &str,
    is_kernel: bool,
    callback: Option<TraceCallback>,
) -> Result<TracerId, TracerError> {
    global().add_block_tracer(address_space_id, label, is_kernel, callback)
}

pub fn enable_tracer(id: TracerId) -> Result<(), TracerError> {
    global().enable(id)
}

pub fn disable_tracer(id: TracerId) -> Result<(), TracerError> {
    global().disable(id)
}

pub fn list_tracers() -> impl Iterator<Item = TracerSummary> {
    global().list_all()
}

/// Most recent failure recorded by the process-wide registry.
pub fn last_error() -> Option<TracerError> {
    global().last_error()
}
