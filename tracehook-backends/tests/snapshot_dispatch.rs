use std::sync::{Arc, Mutex};

use rstest::rstest;
use tracehook::{callback, render_default, ExecutionContext, Granularity, Registry};
use tracehook_backends::SnapshotContext;

// xor eax, eax; inc eax; ret
const CODE: [u8; 5] = [0x31, 0xc0, 0xff, 0xc0, 0xc3];

fn user_process() -> SnapshotContext {
    SnapshotContext::new(0x1aa000, 0x401000, CODE.to_vec())
        .with_pc(0x401000)
        .with_register("rax", 0x1234)
        .with_register("cr3", 0x1aa000)
}

#[test]
fn default_rendering_uses_snapshot_collaborators() {
    let ctx = user_process();
    let text = render_default(&ctx, 0x401000, 1);
    let mut lines = text.lines();
    let first = lines.next().unwrap();
    assert!(first.starts_with("0x0000000000401000:"));
    assert!(first.contains("xor"));
    assert_eq!(lines.next(), Some("\trax 00001234\tcr3 001aa000"));
    assert_eq!(lines.next(), Some(""));
}

#[rstest]
#[case(0x401000, false)]
#[case(0xffff_f800_0000_2000, true)]
fn snapshot_mode_selects_universal_collection(#[case] pc: u64, #[case] kernel: bool) {
    let registry = Registry::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut ids = Vec::new();
    for is_kernel in [false, true] {
        let seen = Arc::clone(&seen);
        let id = registry
            .add_block_tracer(
                0,
                if is_kernel { "kernel" } else { "user" },
                is_kernel,
                Some(callback(move |ctx, start, _| {
                    seen.lock().unwrap().push((is_kernel, ctx.disassemble(start, 1)));
                    None
                })),
            )
            .unwrap();
        ids.push(id);
    }
    for id in ids {
        registry.enable(id).unwrap();
    }

    let mut ctx = user_process().with_pc(pc);
    assert_eq!(ctx.is_kernel_mode(), kernel);
    registry.dispatch(&mut ctx, 0x401000, 0x401005, Granularity::CodeBlock);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, kernel);
    assert!(seen[0].1.contains("xor"));
}

#[test]
fn process_tracer_only_sees_its_own_address_space() {
    let registry = Registry::new();
    let hits = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&hits);
    let id = registry
        .add_inst_tracer(
            0x1aa000,
            "calc.exe",
            false,
            Some(callback(move |_, _, _| {
                *counter.lock().unwrap() += 1;
                None
            })),
        )
        .unwrap();
    registry.enable(id).unwrap();

    let mut own = user_process();
    let mut other = SnapshotContext::new(0x2bb000, 0x401000, CODE.to_vec());
    for pc in [0x401000u64, 0x401002, 0x401004] {
        registry.dispatch(&mut own, pc, pc + 1, Granularity::Instruction);
        registry.dispatch(&mut other, pc, pc + 1, Granularity::Instruction);
    }
    assert_eq!(*hits.lock().unwrap(), 3);
}
