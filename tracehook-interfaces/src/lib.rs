//! Contracts shared between the tracer registry and the execution engine that
//! drives it.
//!
//! The registry never looks inside an execution context. It hands the context
//! through to callbacks and, for the default callback, asks it for a
//! disassembly listing and a register snapshot.

use std::any::Any;
use std::sync::Arc;

/// Kernel half of the address space on Windows x64.
pub const KERNEL_ADDRESS_MASK: u64 = 0xffff_0000_0000_0000;

/// Whether `addr` lies in the kernel half of the address space.
pub fn is_kernel_address(addr: u64) -> bool {
    is_kernel_address_with_mask(addr, KERNEL_ADDRESS_MASK)
}

/// Same as [`is_kernel_address`] but against a caller supplied mask.
pub fn is_kernel_address_with_mask(addr: u64, mask: u64) -> bool {
    addr & mask == mask
}

/// Engine-owned handle to a live CPU.
pub trait ExecutionContext {
    /// Page-table root of the running process (cr3 on x86).
    fn address_space_id(&self) -> u64;

    /// Whether the CPU is currently executing kernel code.
    fn is_kernel_mode(&self) -> bool;

    /// Disassembles up to `max_instructions` starting at `start`, one line
    /// per instruction.
    fn disassemble(&self, start: u64, max_instructions: usize) -> String;

    /// Named register values, in display order.
    fn registers(&self) -> Vec<(&'static str, u64)>;
}

/// Opaque value a callback may hand back to the engine.
pub type TraceOutput = Option<Box<dyn Any + Send>>;

/// Observer invoked with `(context, start address, end address)`.
pub type TraceCallback =
    Arc<dyn Fn(&mut dyn ExecutionContext, u64, u64) -> TraceOutput + Send + Sync>;

/// Wraps a closure into a [`TraceCallback`].
pub fn callback<F>(f: F) -> TraceCallback
where
    F: Fn(&mut dyn ExecutionContext, u64, u64) -> TraceOutput + Send + Sync + 'static,
{
    Arc::new(f)
}
