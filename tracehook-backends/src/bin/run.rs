//! Runs a raw x86-64 code image under Unicorn with the default tracers on.
//!
//! Usage: `tracehook-run <image> [load address in hex]`

use std::env;
use std::path::Path;
use std::process::ExitCode;

use log::{error, info};
use tracehook::callback;
use tracehook_backends::{unicorn::attach, BackendError};
use unicorn_engine::unicorn_const::{Arch, Mode, Permission, SECOND_SCALE};
use unicorn_engine::{RegisterX86, Unicorn};

const DEFAULT_BASE: u64 = 0x40_0000;
const STACK_BASE: u64 = 0x7ff0_0000;
const STACK_SIZE: usize = 0x1_0000;
const PAGE_SIZE: usize = 0x1000;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: {} <image> [base]", args[0]);
        return ExitCode::FAILURE;
    };
    let base = match args.get(2).map(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16)) {
        None => DEFAULT_BASE,
        Some(Ok(base)) => base,
        Some(Err(err)) => {
            eprintln!("bad load address: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(Path::new(path), base) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn engine<T>(result: Result<T, unicorn_engine::unicorn_const::uc_error>) -> Result<T, BackendError> {
    result.map_err(|err| BackendError::Engine(format!("{err:?}")))
}

fn run(path: &Path, base: u64) -> Result<(), BackendError> {
    let image = std::fs::read(path)?;
    info!("Loaded {} bytes from {}", image.len(), path.display());

    let registry = tracehook::global();
    let inst = registry.add_inst_tracer(0, "user instructions", false, None)?;
    let block = registry.add_block_tracer(
        0,
        "user blocks",
        false,
        Some(callback(|_, start, end| {
            info!("block {start:#x}..{end:#x}");
            None
        })),
    )?;
    registry.enable(inst)?;
    registry.enable(block)?;
    print!("{}", registry.listing());

    let mut unicorn = engine(Unicorn::new(Arch::X86, Mode::MODE_64))?;
    let emu = &mut unicorn;

    let image_size = image.len().div_ceil(PAGE_SIZE).max(1) * PAGE_SIZE;
    engine(emu.mem_map(base, image_size, Permission::ALL))?;
    engine(emu.mem_write(base, &image))?;
    engine(emu.mem_map(STACK_BASE, STACK_SIZE, Permission::READ | Permission::WRITE))?;
    engine(emu.reg_write(RegisterX86::RSP, STACK_BASE + STACK_SIZE as u64 - 8))?;

    attach(emu, registry)?;

    info!("Starting program at: {base:#x}");
    let end = base + image.len() as u64;
    let result = emu.emu_start(base, end, 30 * SECOND_SCALE, 0);
    let rip = engine(emu.reg_read(RegisterX86::RIP))?;
    info!("Stopped at {rip:#x}");
    engine(result)
}
