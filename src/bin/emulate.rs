//! Run an RV32I program image to completion and report how it ended.

use std::cell::Cell;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use clap_num::maybe_hex;
use log::info;

use rv32i_sim::{loader, sim_control::SimControl, Hart, HartFault, HartState, MemoryMap, SystemBus};

/// Run an RV32I ELF or raw binary through the simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the input image (ELF unless --raw is given)
    input: String,

    /// Treat the input as a raw binary rather than an ELF file
    #[arg(long)]
    raw: bool,

    /// Load address for a raw binary (use 0x prefix for hexadecimal)
    #[arg(long, value_parser=maybe_hex::<u32>, default_value = "0")]
    raw_base: u32,

    /// Stop after this many retired instructions even if still running
    #[arg(long, value_parser=maybe_hex::<u64>)]
    max_steps: Option<u64>,
}

fn build_bus(map: &MemoryMap, halt: Rc<Cell<bool>>) -> SystemBus {
    let mut bus = SystemBus::new();
    bus.attach(
        "instruction_memory",
        map.instruction_memory_base,
        map.instruction_memory_size,
        Box::new(rv32i_sim::memory::MemoryRegion::new(
            map.instruction_memory_base,
            map.instruction_memory_size,
        )),
    )
    .expect("default memory map is internally consistent");
    bus.attach(
        "data_memory",
        map.data_memory_base,
        map.data_memory_size,
        Box::new(rv32i_sim::memory::MemoryRegion::new(
            map.data_memory_base,
            map.data_memory_size,
        )),
    )
    .expect("default memory map is internally consistent");
    bus.attach(
        "sim_control",
        map.sim_control_base,
        4,
        Box::new(SimControl::new(halt)),
    )
    .expect("default memory map is internally consistent");
    bus
}

fn exit_code_for_fault(fault: &HartFault) -> u8 {
    match fault {
        HartFault::IllegalInstruction(_) => 1,
        HartFault::Bus(_) | HartFault::MisalignedFetch { .. } => 2,
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let map = MemoryMap::default();
    let halt = Rc::new(Cell::new(false));
    let mut bus = build_bus(&map, halt.clone());

    let reset_vector = if args.raw {
        let bytes = match std::fs::read(&args.input) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("could not read {}: {e}", args.input);
                return ExitCode::from(2);
            }
        };
        if let Err(e) = loader::load_raw_binary(&mut bus, args.raw_base, &bytes) {
            eprintln!("error loading raw binary: {e}");
            return ExitCode::from(2);
        }
        args.raw_base
    } else {
        match loader::load_elf(&mut bus, &args.input) {
            Ok(entry) => entry,
            Err(e) => {
                eprintln!("error loading ELF: {e}");
                return ExitCode::from(2);
            }
        }
    };

    let mut hart = Hart::new(bus, reset_vector, halt);
    info!("starting execution at pc=0x{reset_vector:08x}");

    let state = match args.max_steps {
        Some(max_steps) => hart.run_bounded(max_steps),
        None => hart.run(),
    };

    match state {
        HartState::Halted => {
            info!("halted at pc=0x{:08x}", hart.pc());
            ExitCode::SUCCESS
        }
        HartState::Faulted { fault, pc } => {
            eprintln!("fault at pc=0x{pc:08x}: {fault}");
            ExitCode::from(exit_code_for_fault(&fault))
        }
        HartState::Running => {
            eprintln!("step limit reached at pc=0x{:08x}", hart.pc());
            ExitCode::from(3)
        }
    }
}
