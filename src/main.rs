//! isasim 命令行入口
//!
//! 加载镜像，运行到结束，写出寄存器转储并与期望结果比较。

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use isasim::cpu::CpuState;
use isasim::report;
use isasim::sim_env::{parse_isa, ImageFormat, SimConfig, SimEnv};

#[derive(Parser)]
#[command(name = "isasim_cli")]
#[command(about = "Single-cycle RV32IM instruction-set simulator")]
#[command(version)]
struct Args {
    /// Program image (flat binary or ELF)
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Image format: auto, bin or elf
    #[arg(long, default_value = "auto")]
    format: ImageFormat,

    /// Load address for flat binaries
    #[arg(long, value_parser = parse_num, default_value = "0")]
    load_addr: u32,

    /// Entry PC (default: load address, or the ELF entry point)
    #[arg(long, value_parser = parse_num)]
    entry: Option<u32>,

    /// Initial stack pointer (x2)
    #[arg(long, value_parser = parse_num, default_value = "0x7fffffff")]
    sp: u32,

    /// Instruction set: rv32i or rv32im
    #[arg(long, default_value = "rv32im")]
    isa: String,

    /// Stop after this many instructions (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_instructions: u64,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,

    /// Expected register file (32 little-endian words); defaults to <IMAGE stem>.res if present
    #[arg(long, value_name = "PATH")]
    expected: Option<PathBuf>,

    /// Register dump path (default: <IMAGE stem>_reg.txt)
    #[arg(long, value_name = "PATH")]
    dump: Option<PathBuf>,

    /// Also write the registers as 32 little-endian words
    #[arg(long, value_name = "PATH")]
    binary_dump: Option<PathBuf>,

    /// Do not write the text register dump
    #[arg(long)]
    no_dump: bool,
}

fn parse_num(s: &str) -> Result<u32, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16)
    } else {
        s.replace('_', "").parse()
    }
}

fn init_logging(trace: bool) {
    let default = if trace { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.trace);

    let mut config = SimConfig::new()
        .with_image_path(&args.image)
        .with_format(args.format)
        .with_load_addr(args.load_addr)
        .with_stack_pointer(args.sp)
        .with_isa_config(parse_isa(&args.isa).context("invalid --isa")?)
        .with_max_instructions(args.max_instructions)
        .with_trace(args.trace);
    if let Some(entry) = args.entry {
        config = config.with_entry_pc(entry);
    }

    let mut env = SimEnv::from_config(config)
        .with_context(|| format!("failed to load {}", args.image.display()))?;

    let run = env.run_until_halt();
    let regs = env.register_snapshot();

    let expected_path = args
        .expected
        .clone()
        .or_else(|| Some(report::default_expected_path(&args.image)).filter(|p| p.exists()));
    let expected = expected_path
        .as_deref()
        .map(report::read_expected)
        .transpose()
        .context("failed to read expected registers")?;

    if !args.no_dump {
        let dump_path = args
            .dump
            .clone()
            .unwrap_or_else(|| report::default_dump_path(&args.image));
        report::write_dump_file(&dump_path, &regs, expected.as_ref())?;
        info!("register dump written to {}", dump_path.display());
    }
    if let Some(path) = &args.binary_dump {
        report::write_binary_file(path, &regs)?;
    }

    let summary = run.context("simulation aborted")?;
    match summary.state {
        CpuState::Exited { code } => info!("program exited with code {code}"),
        CpuState::EndOfProgram => info!("end of program at 0x{:08x}", summary.pc),
        CpuState::Running => warn!(
            "instruction limit reached after {} instruction(s)",
            summary.executed
        ),
    }
    if summary.misaligned_pc != 0 {
        warn!("{} jump(s) to a misaligned pc", summary.misaligned_pc);
    }
    println!("Program exit");

    if let Some(expected) = expected {
        let mismatches = report::compare(&regs, &expected);
        for m in &mismatches {
            error!("{m}");
        }
        if !mismatches.is_empty() {
            bail!("{} register(s) differ from the expected result", mismatches.len());
        }
        info!("all registers match the expected result");
    }

    Ok(())
}
