//! x86-64 disassembly for execution contexts that hold raw code bytes.

use std::fmt::Write as _;

use yaxpeax_arch::LengthedInstruction;
use yaxpeax_x86::amd64::InstDecoder;

/// Longest possible x86 instruction, in bytes.
pub const MAX_INSTRUCTION_LEN: usize = 15;

/// Decodes up to `max_instructions` from `bytes`, which are mapped at
/// `start`. Stops early at the end of the buffer or at the first byte
/// sequence that does not decode, which is rendered as `(bad)`.
pub fn disassemble(bytes: &[u8], start: u64, max_instructions: usize) -> String {
    let decoder = InstDecoder::default();
    let mut out = String::new();
    let mut offset = 0usize;

    for _ in 0..max_instructions {
        let Some(window) = bytes.get(offset..).filter(|w| !w.is_empty()) else {
            break;
        };
        let address = start.wrapping_add(offset as u64);

        match decoder.decode_slice(window) {
            Ok(instruction) => {
                let _ = writeln!(out, "{address:#018x}:  {instruction}");
                offset += instruction.len().to_const() as usize;
            }
            Err(_) => {
                let _ = writeln!(out, "{address:#018x}:  (bad)");
                break;
            }
        }
    }
    out
}

/// Bytes worth reading to disassemble `max_instructions`.
pub fn window_len(max_instructions: usize) -> usize {
    max_instructions.saturating_mul(MAX_INSTRUCTION_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    // nop; mov rax, rcx; ret
    const CODE: [u8; 5] = [0x90, 0x48, 0x89, 0xc8, 0xc3];

    #[test]
    fn decodes_sequential_instructions() {
        let text = disassemble(&CODE, 0x401000, 8);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("0x0000000000401000:"));
        assert!(lines[0].ends_with("nop"));
        assert!(lines[1].starts_with("0x0000000000401001:"));
        assert!(lines[1].contains("mov"));
        assert!(lines[2].starts_with("0x0000000000401004:"));
        assert!(lines[2].ends_with("ret"));
    }

    #[test]
    fn honours_instruction_count() {
        assert_eq!(disassemble(&CODE, 0, 1).lines().count(), 1);
        assert_eq!(disassemble(&CODE, 0, 0), "");
    }

    #[test]
    fn stops_at_undecodable_bytes() {
        // 0x06 (push es) does not exist in long mode
        let text = disassemble(&[0x90, 0x06, 0x90], 0x1000, 4);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("(bad)"));
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        assert_eq!(disassemble(&[], 0x1000, 4), "");
    }
}
