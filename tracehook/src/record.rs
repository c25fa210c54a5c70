//! Tracer records and the rule that sorts them into collections.

use std::fmt;
use std::sync::Arc;

use tracehook_interfaces::TraceCallback;

use crate::TracerError;

/// Identifier handed out on registration. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TracerId(u32);

impl TracerId {
    /// Wraps a raw id, e.g. one read back from a user command.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TracerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How often a tracer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u32)]
pub enum Granularity {
    /// Once per executed instruction.
    Instruction = 0,
    /// Once per translated code block.
    CodeBlock = 1,
}

impl Granularity {
    pub const fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Granularity {
    type Error = TracerError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Instruction),
            1 => Ok(Self::CodeBlock),
            _ => Err(TracerError::InvalidGranularity),
        }
    }
}

/// Which address spaces and privilege level a tracer covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Scope {
    /// Bound to one page-table root.
    Process,
    /// Every address space, kernel mode only.
    UniversalKernel,
    /// Every address space, user mode only.
    UniversalUser,
}

impl Scope {
    /// Address space id `0` means "every address space"; the kernel flag
    /// only matters in that case.
    pub const fn classify(address_space_id: u64, is_kernel: bool) -> Self {
        if address_space_id != 0 {
            Self::Process
        } else if is_kernel {
            Self::UniversalKernel
        } else {
            Self::UniversalUser
        }
    }
}

/// One of the six tracer collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Collection {
    pub granularity: Granularity,
    pub scope: Scope,
}

impl Collection {
    pub const COUNT: usize = 6;

    /// Storage order, also the order id lookups would scan in.
    pub const ALL: [Collection; Self::COUNT] = [
        Self::new(Granularity::Instruction, Scope::Process),
        Self::new(Granularity::Instruction, Scope::UniversalKernel),
        Self::new(Granularity::Instruction, Scope::UniversalUser),
        Self::new(Granularity::CodeBlock, Scope::Process),
        Self::new(Granularity::CodeBlock, Scope::UniversalKernel),
        Self::new(Granularity::CodeBlock, Scope::UniversalUser),
    ];

    /// Order used by diagnostics listings: user before kernel.
    pub const LISTING_ORDER: [Collection; Self::COUNT] = [
        Self::new(Granularity::Instruction, Scope::Process),
        Self::new(Granularity::Instruction, Scope::UniversalUser),
        Self::new(Granularity::Instruction, Scope::UniversalKernel),
        Self::new(Granularity::CodeBlock, Scope::Process),
        Self::new(Granularity::CodeBlock, Scope::UniversalUser),
        Self::new(Granularity::CodeBlock, Scope::UniversalKernel),
    ];

    pub const fn new(granularity: Granularity, scope: Scope) -> Self {
        Self { granularity, scope }
    }

    /// Picks the collection a registration belongs to.
    pub const fn classify(
        address_space_id: u64,
        is_kernel: bool,
        granularity: Granularity,
    ) -> Self {
        Self::new(granularity, Scope::classify(address_space_id, is_kernel))
    }

    pub(crate) const fn slot(self) -> usize {
        let scope = match self.scope {
            Scope::Process => 0,
            Scope::UniversalKernel => 1,
            Scope::UniversalUser => 2,
        };
        match self.granularity {
            Granularity::Instruction => scope,
            Granularity::CodeBlock => 3 + scope,
        }
    }
}

/// A registered observer. Owned by the registry for its whole lifetime.
pub(crate) struct TracerRecord {
    pub(crate) id: TracerId,
    pub(crate) label: String,
    pub(crate) address_space_id: u64,
    pub(crate) is_kernel: bool,
    pub(crate) granularity: Granularity,
    pub(crate) enabled: bool,
    pub(crate) callback: TraceCallback,
    pub(crate) is_default_callback: bool,
}

impl TracerRecord {
    pub(crate) fn summary(&self) -> TracerSummary {
        TracerSummary {
            id: self.id,
            address_space_id: self.address_space_id,
            label: self.label.clone(),
            is_kernel: self.is_kernel,
            granularity: self.granularity,
            enabled: self.enabled,
            callback_addr: Arc::as_ptr(&self.callback) as *const () as usize,
            is_default_callback: self.is_default_callback,
        }
    }
}

/// Read-only copy of a record, as produced by the listing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TracerSummary {
    pub id: TracerId,
    pub address_space_id: u64,
    pub label: String,
    pub is_kernel: bool,
    pub granularity: Granularity,
    pub enabled: bool,
    /// Address of the callback, for telling observers apart.
    pub callback_addr: usize,
    pub is_default_callback: bool,
}

impl TracerSummary {
    pub fn collection(&self) -> Collection {
        Collection::classify(self.address_space_id, self.is_kernel, self.granularity)
    }
}

impl fmt::Display for TracerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\tuid: {}\tcr3: {:x}\tlabel: {}\tenable: {}\tcb: {:#x}",
            self.id,
            self.address_space_id,
            self.label,
            u8::from(self.enabled),
            self.callback_addr
        )
    }
}

/// Callback paired with the id of the tracer that owns it.
#[derive(Clone)]
pub struct Tracer {
    pub id: TracerId,
    pub callback: TraceCallback,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer").field("id", &self.id).finish_non_exhaustive()
    }
}
