//! Unicorn-backed execution context and the hooks that feed the registry.

use tracehook::{Granularity, Registry};
use tracehook_interfaces::{is_kernel_address_with_mask, ExecutionContext, KERNEL_ADDRESS_MASK};
use unicorn_engine::{RegisterX86, Unicorn};

use crate::x86;
use crate::BackendError;

const DUMP_REGISTERS: [(&str, RegisterX86); 6] = [
    ("rax", RegisterX86::RAX),
    ("rbx", RegisterX86::RBX),
    ("rcx", RegisterX86::RCX),
    ("rdx", RegisterX86::RDX),
    ("rip", RegisterX86::RIP),
    ("cr3", RegisterX86::CR3),
];

/// Borrowed view of a running x86-64 Unicorn instance.
pub struct UnicornContext<'u, 'a, D> {
    uc: &'u mut Unicorn<'a, D>,
    kernel_mask: u64,
}

impl<'u, 'a, D> UnicornContext<'u, 'a, D> {
    pub fn new(uc: &'u mut Unicorn<'a, D>) -> Self {
        Self {
            uc,
            kernel_mask: KERNEL_ADDRESS_MASK,
        }
    }

    pub fn with_kernel_mask(mut self, mask: u64) -> Self {
        self.kernel_mask = mask;
        self
    }

    fn read_code(&self, start: u64, len: usize) -> Option<Vec<u8>> {
        // the tail of the window may run past the mapping, so shrink until it reads
        let mut len = len;
        while len > 0 {
            if let Ok(bytes) = self.uc.mem_read_as_vec(start, len) {
                return Some(bytes);
            }
            len /= 2;
        }
        None
    }
}

impl<D> ExecutionContext for UnicornContext<'_, '_, D> {
    fn address_space_id(&self) -> u64 {
        self.uc.reg_read(RegisterX86::CR3).unwrap_or(0)
    }

    fn is_kernel_mode(&self) -> bool {
        self.uc
            .pc_read()
            .map(|pc| is_kernel_address_with_mask(pc, self.kernel_mask))
            .unwrap_or(false)
    }

    fn disassemble(&self, start: u64, max_instructions: usize) -> String {
        match self.read_code(start, x86::window_len(max_instructions)) {
            Some(bytes) => x86::disassemble(&bytes, start, max_instructions),
            None => format!("{start:#018x}:  (unmapped)\n"),
        }
    }

    fn registers(&self) -> Vec<(&'static str, u64)> {
        DUMP_REGISTERS
            .iter()
            .filter_map(|(name, reg)| self.uc.reg_read(*reg).ok().map(|v| (*name, v)))
            .collect()
    }
}

/// Installs an instruction hook and a block hook that dispatch every event
/// through `registry`.
pub fn attach<'a>(uc: &mut Unicorn<'a, ()>, registry: &'a Registry) -> Result<(), BackendError> {
    uc.add_code_hook(1, 0, move |uc, address, size| {
        let mut ctx = UnicornContext::new(uc);
        registry.dispatch(
            &mut ctx,
            address,
            address + u64::from(size),
            Granularity::Instruction,
        );
    })
    .map_err(|err| BackendError::Engine(format!("{err:?}")))?;

    uc.add_block_hook(move |uc, address, size| {
        let mut ctx = UnicornContext::new(uc);
        registry.dispatch(
            &mut ctx,
            address,
            address + u64::from(size),
            Granularity::CodeBlock,
        );
    })
    .map_err(|err| BackendError::Engine(format!("{err:?}")))?;

    Ok(())
}
