use std::fmt;

use crate::record::{Granularity, TracerSummary};

/// Printable dump of the registry, split into instruction and block sections.
#[derive(Debug, Clone)]
pub struct Listing {
    entries: Vec<TracerSummary>,
}

impl Listing {
    pub(crate) fn new(entries: Vec<TracerSummary>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TracerSummary] {
        &self.entries
    }

    fn section(
        &self,
        f: &mut fmt::Formatter<'_>,
        title: &str,
        granularity: Granularity,
    ) -> fmt::Result {
        writeln!(f, "================={title}============================")?;
        for entry in self.entries.iter().filter(|e| e.granularity == granularity) {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.section(f, "Instruction Tracer", Granularity::Instruction)?;
        self.section(f, "Code Block Tracer", Granularity::CodeBlock)
    }
}
