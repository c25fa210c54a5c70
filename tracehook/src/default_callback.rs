//! Fallback observer used when a tracer is registered without a callback.

use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Arc;

use tracehook_interfaces::{ExecutionContext, TraceCallback, TraceOutput};

/// Renders the first `count` instructions at `pc_start` and the context's
/// register snapshot.
pub fn render_default(ctx: &dyn ExecutionContext, pc_start: u64, count: usize) -> String {
    let mut out = ctx.disassemble(pc_start, count);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }

    let registers = ctx.registers();
    if !registers.is_empty() {
        for (name, value) in &registers {
            let _ = write!(out, "\t{name} {value:08x}");
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Builds the default callback. It prints [`render_default`] to stdout and
/// returns nothing.
pub fn default_callback(count: usize) -> TraceCallback {
    Arc::new(move |ctx: &mut dyn ExecutionContext, pc_start: u64, _pc_end: u64| -> TraceOutput {
        let text = render_default(ctx, pc_start, count);
        let _ = std::io::stdout().lock().write_all(text.as_bytes());
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl ExecutionContext for Fixed {
        fn address_space_id(&self) -> u64 {
            0x1aa000
        }

        fn is_kernel_mode(&self) -> bool {
            false
        }

        fn disassemble(&self, start: u64, max_instructions: usize) -> String {
            format!("{start:#x}: nop x{max_instructions}")
        }

        fn registers(&self) -> Vec<(&'static str, u64)> {
            vec![("rax", 0x10), ("cr3", 0x1aa000)]
        }
    }

    #[test]
    fn renders_listing_then_registers() {
        let text = render_default(&Fixed, 0x401000, 1);
        assert_eq!(text, "0x401000: nop x1\n\trax 00000010\tcr3 001aa000\n\n");
    }

    #[test]
    fn default_callback_returns_nothing() {
        let cb = default_callback(1);
        let mut ctx = Fixed;
        assert!(cb(&mut ctx, 0x401000, 0x401001).is_none());
    }
}
