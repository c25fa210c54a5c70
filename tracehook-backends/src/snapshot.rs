//! Execution context backed by a captured memory window and register file.

use tracehook_interfaces::{is_kernel_address_with_mask, ExecutionContext, KERNEL_ADDRESS_MASK};

use crate::x86;

/// A frozen CPU: the bytes around the program counter plus register values.
///
/// Useful for replaying a recorded trace through the registry, or for
/// driving tracers without a live emulator.
#[derive(Debug, Clone)]
pub struct SnapshotContext {
    address_space_id: u64,
    pc: u64,
    base: u64,
    memory: Vec<u8>,
    registers: Vec<(&'static str, u64)>,
    kernel_mode: Option<bool>,
    kernel_mask: u64,
}

impl SnapshotContext {
    /// `memory` is mapped starting at `base`.
    pub fn new(address_space_id: u64, base: u64, memory: Vec<u8>) -> Self {
        Self {
            address_space_id,
            pc: base,
            base,
            memory,
            registers: Vec::new(),
            kernel_mode: None,
            kernel_mask: KERNEL_ADDRESS_MASK,
        }
    }

    pub fn with_pc(mut self, pc: u64) -> Self {
        self.pc = pc;
        self
    }

    pub fn with_register(mut self, name: &'static str, value: u64) -> Self {
        match self.registers.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.registers.push((name, value)),
        }
        self
    }

    /// Forces the privilege level instead of deriving it from the pc.
    pub fn with_kernel_mode(mut self, kernel: bool) -> Self {
        self.kernel_mode = Some(kernel);
        self
    }

    pub fn with_kernel_mask(mut self, mask: u64) -> Self {
        self.kernel_mask = mask;
        self
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
    }

    fn bytes_at(&self, address: u64) -> Option<&[u8]> {
        let offset = usize::try_from(address.checked_sub(self.base)?).ok()?;
        self.memory.get(offset..)
    }
}

impl ExecutionContext for SnapshotContext {
    fn address_space_id(&self) -> u64 {
        self.address_space_id
    }

    fn is_kernel_mode(&self) -> bool {
        self.kernel_mode
            .unwrap_or_else(|| is_kernel_address_with_mask(self.pc, self.kernel_mask))
    }

    fn disassemble(&self, start: u64, max_instructions: usize) -> String {
        match self.bytes_at(start) {
            Some(bytes) => x86::disassemble(bytes, start, max_instructions),
            None => format!("{start:#018x}:  (unmapped)\n"),
        }
    }

    fn registers(&self) -> Vec<(&'static str, u64)> {
        self.registers.clone()
    }
}
