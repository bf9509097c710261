//! 仿真环境初始化模块
//!
//! 本模块负责：
//! - 读取并解析仿真配置
//! - 加载平坦二进制或 ELF 镜像
//! - 初始化 CPU 和内存
//! - 驱动运行循环
//!
//! # 示例
//!
//! ```no_run
//! use isasim::sim_env::{SimConfig, SimEnv};
//!
//! let config = SimConfig::new()
//!     .with_image_path("program.bin")
//!     .with_max_instructions(1_000_000);
//!
//! let mut env = SimEnv::from_config(config).expect("Failed to create sim env");
//! let summary = env.run_until_halt().expect("simulation fault");
//! println!("{summary:?}");
//! ```

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use elf::abi::{EM_RISCV, PF_W, PF_X, PT_LOAD};
use elf::endian::AnyEndian;
use elf::ElfBytes;
use thiserror::Error;
use tracing::{debug, info};

use crate::cpu::{CpuBuilder, CpuCore, CpuError, CpuState, StepOutcome, DEFAULT_STACK_POINTER};
use crate::isa::{IsaConfig, IsaConfigError};
use crate::memory::{MemError, SparseMemory};

/// ELF 文件头魔数
const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// 单个 PT_LOAD 段在内存中的最大尺寸（64 MiB）
pub const MAX_SEGMENT_SIZE: u64 = 64 << 20;

/// 仿真配置错误
#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ELF parse error: {0}")]
    ElfParse(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("no image configured")]
    NoImage,
    #[error(transparent)]
    Isa(#[from] IsaConfigError),
}

/// 镜像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// 按文件头魔数判断
    #[default]
    Auto,
    /// 平坦二进制，逐字加载
    Bin,
    /// 32 位 RISC-V ELF
    Elf,
}

impl ImageFormat {
    /// 把 `Auto` 解析为具体格式
    pub fn resolve(self, bytes: &[u8]) -> Self {
        match self {
            ImageFormat::Auto if bytes.starts_with(ELF_MAGIC) => ImageFormat::Elf,
            ImageFormat::Auto => ImageFormat::Bin,
            other => other,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ImageFormat::Auto),
            "bin" | "raw" => Ok(ImageFormat::Bin),
            "elf" => Ok(ImageFormat::Elf),
            other => Err(format!("unknown image format `{other}` (expected auto, bin or elf)")),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Auto => "auto",
            ImageFormat::Bin => "bin",
            ImageFormat::Elf => "elf",
        })
    }
}

/// 从字符串解析 ISA 配置
///
/// 格式示例: "rv32i", "rv32im", "im"
pub fn parse_isa(s: &str) -> Result<IsaConfig, SimError> {
    let s = s.to_ascii_lowercase();
    let rest = s.strip_prefix("rv32").unwrap_or(&s);

    let mut chars = rest.chars();
    if chars.next() != Some('i') {
        return Err(SimError::Config(format!(
            "ISA string `{s}` must start with the I base"
        )));
    }

    let mut config = IsaConfig::new();
    for c in chars {
        match c {
            'm' => config = config.with_m_extension(),
            '_' => {}
            other => {
                return Err(SimError::Config(format!(
                    "unsupported ISA extension `{other}` in `{s}`"
                )));
            }
        }
    }

    Ok(config)
}

/// 仿真配置
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// 镜像路径
    pub image_path: Option<PathBuf>,
    /// 镜像格式
    pub format: ImageFormat,
    /// 平坦二进制的加载地址
    pub load_addr: u32,
    /// 入口点 PC（默认取加载地址或 ELF 入口）
    pub entry_pc: Option<u32>,
    /// x2 初始值
    pub stack_pointer: u32,
    /// ISA 扩展
    pub isa: IsaConfig,
    /// 最大执行指令数（0 表示无限制）
    pub max_instructions: u64,
    /// 逐条指令输出 debug 日志
    pub trace: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            format: ImageFormat::Auto,
            load_addr: 0,
            entry_pc: None,
            stack_pointer: DEFAULT_STACK_POINTER,
            isa: IsaConfig::rv32im(),
            max_instructions: 0,
            trace: false,
        }
    }
}

impl SimConfig {
    /// 创建新配置
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_load_addr(mut self, addr: u32) -> Self {
        self.load_addr = addr;
        self
    }

    /// 设置入口 PC
    pub fn with_entry_pc(mut self, pc: u32) -> Self {
        self.entry_pc = Some(pc);
        self
    }

    pub fn with_stack_pointer(mut self, sp: u32) -> Self {
        self.stack_pointer = sp;
        self
    }

    /// 设置 ISA 扩展
    pub fn with_isa_config(mut self, isa: IsaConfig) -> Self {
        self.isa = isa;
        self
    }

    /// 从字符串设置 ISA 扩展
    pub fn with_isa(mut self, isa: &str) -> Result<Self, SimError> {
        self.isa = parse_isa(isa)?;
        Ok(self)
    }

    /// 设置最大执行指令数
    pub fn with_max_instructions(mut self, max: u64) -> Self {
        self.max_instructions = max;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// ELF 程序段信息
#[derive(Debug, Clone)]
pub struct ElfSegment {
    /// 虚拟地址
    pub vaddr: u32,
    /// 文件中的大小
    pub file_size: usize,
    /// 内存中的大小
    pub mem_size: usize,
    /// 段数据
    pub data: Vec<u8>,
    /// 是否可执行
    pub executable: bool,
    /// 是否可写
    pub writable: bool,
}

/// ELF 文件解析结果
#[derive(Debug, Clone)]
pub struct ElfInfo {
    /// 入口点地址
    pub entry: u32,
    /// 可加载段
    pub segments: Vec<ElfSegment>,
}

impl ElfInfo {
    /// 解析 ELF 文件
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let data = read_file(path.as_ref())?;
        Self::parse_bytes(&data)
    }

    /// 从字节数组解析 ELF（使用 elf crate）
    pub fn parse_bytes(data: &[u8]) -> Result<Self, SimError> {
        let elf_file = ElfBytes::<AnyEndian>::minimal_parse(data)
            .map_err(|e| SimError::ElfParse(format!("failed to parse ELF: {e}")))?;

        let header = &elf_file.ehdr;

        if header.e_machine != EM_RISCV {
            return Err(SimError::ElfParse(format!(
                "not a RISC-V ELF (machine type: 0x{:x}, expected 0x{:x})",
                header.e_machine, EM_RISCV
            )));
        }
        if header.class != elf::file::Class::ELF32 {
            return Err(SimError::ElfParse("only 32-bit ELF is supported".into()));
        }
        if header.endianness != AnyEndian::Little {
            return Err(SimError::ElfParse("only little-endian ELF is supported".into()));
        }

        let mut segments = Vec::new();

        if let Some(phdrs) = elf_file.segments() {
            for phdr in phdrs.iter().filter(|p| p.p_type == PT_LOAD) {
                if phdr.p_memsz > MAX_SEGMENT_SIZE {
                    return Err(SimError::ElfParse(format!(
                        "segment at 0x{:08x} needs 0x{:x} bytes, limit is 0x{MAX_SEGMENT_SIZE:x}",
                        phdr.p_vaddr, phdr.p_memsz
                    )));
                }
                let data = elf_file
                    .segment_data(&phdr)
                    .map_err(|e| SimError::ElfParse(format!("failed to read segment data: {e}")))?
                    .to_vec();

                segments.push(ElfSegment {
                    vaddr: phdr.p_vaddr as u32,
                    file_size: phdr.p_filesz as usize,
                    mem_size: phdr.p_memsz as usize,
                    data,
                    executable: (phdr.p_flags & PF_X) != 0,
                    writable: (phdr.p_flags & PF_W) != 0,
                });
            }
        }

        Ok(ElfInfo {
            entry: header.e_entry as u32,
            segments,
        })
    }

    /// 获取程序使用的最小和最大地址
    pub fn address_range(&self) -> Option<(u32, u32)> {
        let min_addr = self.segments.iter().map(|s| s.vaddr).min()?;
        let max_addr = self
            .segments
            .iter()
            .map(|s| s.vaddr.wrapping_add(s.mem_size as u32))
            .max()?;
        Some((min_addr, max_addr))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, SimError> {
    std::fs::read(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn range_end(addr: u32, len: usize) -> Result<u32, SimError> {
    u32::try_from(len)
        .ok()
        .and_then(|len| addr.checked_add(len))
        .ok_or_else(|| {
            SimError::Config(format!(
                "address range overflow: start=0x{addr:08x}, len=0x{len:x}"
            ))
        })
}

fn load_segments_into_memory(
    memory: &mut SparseMemory,
    segments: &[ElfSegment],
) -> Result<(), SimError> {
    for seg in segments {
        range_end(seg.vaddr, seg.mem_size)?;
        if seg.mem_size == 0 {
            continue;
        }

        let file_part = seg.file_size.min(seg.data.len()).min(seg.mem_size);
        memory.write_bytes(seg.vaddr, &seg.data[..file_part]);

        // .bss 清零
        if seg.mem_size > file_part {
            let bss_start = range_end(seg.vaddr, file_part)?;
            memory.fill(bss_start, seg.mem_size - file_part, 0);
        }

        debug!(
            "segment 0x{:08x}+0x{:x} {}{}",
            seg.vaddr,
            seg.mem_size,
            if seg.executable { "X" } else { "-" },
            if seg.writable { "W" } else { "R" },
        );
    }
    Ok(())
}

/// 把镜像放入内存，返回入口地址
fn load_image(
    memory: &mut SparseMemory,
    bytes: &[u8],
    config: &SimConfig,
) -> Result<u32, SimError> {
    match config.format.resolve(bytes) {
        ImageFormat::Elf => {
            let elf = ElfInfo::parse_bytes(bytes)?;
            load_segments_into_memory(memory, &elf.segments)?;
            info!(
                "loaded ELF image: {} segment(s), entry 0x{:08x}",
                elf.segments.len(),
                elf.entry
            );
            Ok(config.entry_pc.unwrap_or(elf.entry))
        }
        _ => {
            let words = memory.load_image(bytes, config.load_addr);
            info!(
                "loaded flat image: {words} word(s) at 0x{:08x}",
                config.load_addr
            );
            Ok(config.entry_pc.unwrap_or(config.load_addr))
        }
    }
}

/// 一次完整运行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// 本次执行的指令数
    pub executed: u64,
    /// 最终状态；达到指令上限时仍为 `Running`
    pub state: CpuState,
    /// 最终 pc
    pub pc: u32,
    /// 跳转到非对齐地址的次数
    pub misaligned_pc: u64,
}

/// 仿真环境
///
/// 封装了 CPU、内存和仿真配置，提供统一的仿真接口
pub struct SimEnv {
    /// CPU 核心
    pub cpu: CpuCore,
    /// 主内存
    pub memory: SparseMemory,
    /// 配置
    pub config: SimConfig,
    /// 已执行的指令数
    pub instructions_executed: u64,
    /// 原始镜像，用于 reset
    image: Vec<u8>,
}

impl SimEnv {
    /// 从配置创建仿真环境，镜像从 `image_path` 读取
    pub fn from_config(config: SimConfig) -> Result<Self, SimError> {
        let path = config.image_path.clone().ok_or(SimError::NoImage)?;
        let image = read_file(&path)?;
        info!("reading image {}", path.display());
        Self::from_image(image, config)
    }

    /// 从内存中的镜像创建仿真环境
    pub fn from_image(image: Vec<u8>, config: SimConfig) -> Result<Self, SimError> {
        let mut memory = SparseMemory::new();
        let entry_pc = load_image(&mut memory, &image, &config)?;
        let cpu = Self::build_cpu(&config, entry_pc)?;

        Ok(SimEnv {
            cpu,
            memory,
            config,
            instructions_executed: 0,
            image,
        })
    }

    /// 根据配置构建 CPU
    fn build_cpu(config: &SimConfig, entry_pc: u32) -> Result<CpuCore, SimError> {
        let cpu = CpuBuilder::new(entry_pc)
            .with_isa_config(config.isa.clone())
            .with_stack_pointer(config.stack_pointer)
            .with_trace(config.trace)
            .build()?;
        Ok(cpu)
    }

    /// 替换环境调用的输出
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        drop(self.cpu.set_console(console));
        self
    }

    /// 执行单步
    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        let before = self.cpu.retired();
        let result = self.cpu.step(&mut self.memory);
        self.instructions_executed += self.cpu.retired() - before;
        result
    }

    /// 运行指定数量的指令（0 表示不限制）
    ///
    /// 中途出错时，出错前已完成的指令仍计入 `instructions_executed`。
    pub fn run(&mut self, max_instructions: u64) -> Result<(u64, CpuState), CpuError> {
        let before = self.cpu.retired();
        let result = self.cpu.run(&mut self.memory, max_instructions);
        self.instructions_executed += self.cpu.retired() - before;
        result
    }

    /// 按配置的指令上限运行到停止
    pub fn run_until_halt(&mut self) -> Result<RunSummary, CpuError> {
        let (executed, state) = self.run(self.config.max_instructions)?;
        let summary = RunSummary {
            executed,
            state,
            pc: self.cpu.pc(),
            misaligned_pc: self.cpu.misaligned_pc_count(),
        };
        info!(
            "run finished: {:?} after {} instruction(s), pc=0x{:08x}",
            summary.state, summary.executed, summary.pc
        );
        Ok(summary)
    }

    /// 所有寄存器的有符号快照
    pub fn register_snapshot(&self) -> [i32; 32] {
        self.cpu.register_snapshot()
    }

    /// 读取一段内存，遇到未映射字节时报错
    pub fn read_memory_range(&self, addr: u32, len: usize) -> Result<Vec<u8>, MemError> {
        self.memory.read_range(addr, len)
    }

    /// 获取 CPU 引用
    pub fn cpu(&self) -> &CpuCore {
        &self.cpu
    }

    /// 获取 CPU 可变引用
    pub fn cpu_mut(&mut self) -> &mut CpuCore {
        &mut self.cpu
    }

    /// 获取内存引用
    pub fn memory(&self) -> &SparseMemory {
        &self.memory
    }

    /// 获取内存可变引用
    pub fn memory_mut(&mut self) -> &mut SparseMemory {
        &mut self.memory
    }

    /// 重置仿真环境：重新加载镜像并重建 CPU，保留环境调用输出
    pub fn reset(&mut self) -> Result<(), SimError> {
        let mut memory = SparseMemory::new();
        let entry_pc = load_image(&mut memory, &self.image, &self.config)?;
        let mut cpu = Self::build_cpu(&self.config, entry_pc)?;

        let console = self.cpu.set_console(Box::new(io::sink()));
        drop(cpu.set_console(console));

        self.cpu = cpu;
        self.memory = memory;
        self.instructions_executed = 0;
        Ok(())
    }
}

impl fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimEnv")
            .field("cpu", &self.cpu)
            .field("mapped_bytes", &self.memory.mapped_len())
            .field("config", &self.config)
            .field("instructions_executed", &self.instructions_executed)
            .finish()
    }
}
