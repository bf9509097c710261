//! CPU 核心与执行引擎
//!
//! 本模块定义了单周期 RV32IM CPU 核心 `CpuCore`，
//! 包含寄存器文件、程序计数器以及执行引擎。

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::isa::{AluOp, DecodedInstr, DecoderRegistry, RvInstr};
use crate::memory::{MemError, Memory};

mod builder;
mod exu;
pub mod regfile;

pub use builder::{CpuBuilder, DEFAULT_STACK_POINTER};
pub use exu::ecall::EcallService;
use exu::Flow;
use regfile::RegFile;

/// CPU 执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// 正常运行中
    Running,
    /// 环境调用请求退出
    Exited { code: i32 },
    /// 下一条指令地址没有映射的内存
    EndOfProgram,
}

impl CpuState {
    /// 是否已终止（终止状态不可逆）
    pub fn is_terminated(self) -> bool {
        !matches!(self, CpuState::Running)
    }
}

/// 单步执行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// 执行后的 pc
    pub pc: u32,
    /// 本条指令是否改写了 pc（跳转或分支成立）
    pub redirected: bool,
    /// 执行后的状态
    pub state: CpuState,
}

/// 中止单步执行的错误
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("instruction fetch at pc 0x{pc:08x} failed")]
    Fetch {
        pc: u32,
        #[source]
        source: MemError,
    },
    #[error("load in instruction at pc 0x{pc:08x} failed")]
    Load {
        pc: u32,
        #[source]
        source: MemError,
    },
    #[error("console write failed")]
    Console(#[from] io::Error),
}

impl CpuError {
    /// 是否由访问未映射内存引起
    pub fn is_unmapped_access(&self) -> bool {
        matches!(
            self,
            CpuError::Fetch { source: MemError::Unmapped { .. }, .. }
                | CpuError::Load { source: MemError::Unmapped { .. }, .. }
        )
    }
}

/// 单线程 CPU 核心
///
/// 包含 RV32IM 的最小状态：
/// - 32 个 32-bit 通用寄存器 x0..x31
/// - 32-bit 程序计数器
///
/// 设计约定：
/// - 每个周期结束时 x0 被清零
/// - PC 为字节地址，跳转目标不是 4 的倍数时只告警
/// - 核心状态不依赖全局变量，多个实例互不影响
pub struct CpuCore {
    regs: RegFile,
    pc: u32,
    state: CpuState,
    decoder: Arc<DecoderRegistry>,
    /// 逐条指令输出 debug 日志
    trace: bool,
    /// 环境调用的输出
    console: Box<dyn Write + Send>,
    misaligned_pc: u64,
    /// 已完成的指令数，出错的那一步不计入
    retired: u64,
}

impl CpuCore {
    /// 使用给定解码器创建 CPU 核心，输出到 stdout
    ///
    /// 一般通过 [`CpuBuilder`] 构建。
    pub fn new(entry_pc: u32, decoder: Arc<DecoderRegistry>) -> Self {
        CpuCore {
            regs: RegFile::new(),
            pc: entry_pc,
            state: CpuState::Running,
            decoder,
            trace: false,
            console: Box::new(io::stdout()),
            misaligned_pc: 0,
            retired: 0,
        }
    }

    /// 获取当前程序计数器值
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// 设置程序计数器
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// 获取当前 CPU 状态
    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn read_reg(&self, reg: u8) -> u32 {
        self.regs.read(reg)
    }

    /// 周期外的寄存器写入，写 x0 被忽略
    pub fn write_reg(&mut self, reg: u8, value: u32) {
        if reg & 0x1F != regfile::abi::ZERO {
            self.regs.write(reg, value);
        }
    }

    /// 所有寄存器的有符号快照
    pub fn register_snapshot(&self) -> [i32; 32] {
        self.regs.snapshot()
    }

    /// 自创建以来完成的指令数
    pub fn retired(&self) -> u64 {
        self.retired
    }

    /// 跳转到非 4 字节对齐地址的次数
    pub fn misaligned_pc_count(&self) -> u64 {
        self.misaligned_pc
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// 替换环境调用的输出，返回原来的输出
    pub fn set_console(&mut self, console: Box<dyn Write + Send>) -> Box<dyn Write + Send> {
        std::mem::replace(&mut self.console, console)
    }

    /// 使用的解码器
    pub fn decoder(&self) -> &DecoderRegistry {
        &self.decoder
    }

    /// 执行单步指令
    ///
    /// # 流程
    ///
    /// 1. 从 PC 处取指并解码
    /// 2. 执行指令
    /// 3. 更新 PC（跳转目标或 PC + 4）
    /// 4. 清零 x0
    /// 5. 检查退出请求，再检查新 PC 处是否有映射的内存
    ///
    /// 取指或 load 访问未映射内存时返回 `Err`，寄存器与 PC 保持不变。
    pub fn step(&mut self, mem: &mut dyn Memory) -> Result<StepOutcome, CpuError> {
        if self.state.is_terminated() {
            return Ok(StepOutcome {
                pc: self.pc,
                redirected: false,
                state: self.state,
            });
        }

        let current_pc = self.pc;
        let raw = mem
            .read_word(current_pc)
            .map_err(|source| CpuError::Fetch { pc: current_pc, source })?;
        let decoded = self.decoder.decode(raw);

        if self.trace {
            debug!(
                "pc=0x{current_pc:08x} raw=0x{raw:08x} {}: {:?}",
                decoded.instr.group(),
                decoded.instr
            );
        }

        let flow = self.execute(mem, decoded, current_pc)?;

        let redirected = match flow {
            Flow::Jump(target) => {
                if target % 4 != 0 {
                    self.misaligned_pc += 1;
                    warn!(
                        "instruction fetch exception; pc not multiple of 4 bytes: \
                         0x{target:08x} (jump at 0x{current_pc:08x})"
                    );
                }
                self.pc = target;
                true
            }
            Flow::Next | Flow::Exit => {
                self.pc = current_pc.wrapping_add(4);
                false
            }
        };

        self.regs.reset_zero();
        self.retired += 1;

        if flow == Flow::Exit {
            self.state = CpuState::Exited { code: 0 };
        } else if !mem.contains(self.pc) {
            self.state = CpuState::EndOfProgram;
        }

        Ok(StepOutcome {
            pc: self.pc,
            redirected,
            state: self.state,
        })
    }

    /// 运行多条指令
    ///
    /// `max_instructions` 为 0 表示不限制。
    ///
    /// # 返回
    ///
    /// 执行的指令数量和最终 CPU 状态
    pub fn run(
        &mut self,
        mem: &mut dyn Memory,
        max_instructions: u64,
    ) -> Result<(u64, CpuState), CpuError> {
        let mut executed = 0;
        while !self.state.is_terminated() {
            if max_instructions != 0 && executed >= max_instructions {
                break;
            }
            self.step(mem)?;
            executed += 1;
        }
        Ok((executed, self.state))
    }

    /// 执行已解码的指令
    fn execute(
        &mut self,
        mem: &mut dyn Memory,
        decoded: DecodedInstr,
        current_pc: u32,
    ) -> Result<Flow, CpuError> {
        use exu::rv32i::{alu, branch_taken, effective_addr, load, store};

        let flow = match decoded.instr {
            RvInstr::Lui { rd, imm } => {
                self.regs.write(rd, imm as u32);
                Flow::Next
            }
            RvInstr::Auipc { rd, imm } => {
                self.regs.write(rd, current_pc.wrapping_add(imm as u32));
                Flow::Next
            }
            RvInstr::Jal { rd, offset } => {
                self.regs.write(rd, current_pc.wrapping_add(4));
                Flow::Jump(current_pc.wrapping_add(offset as u32))
            }
            RvInstr::Jalr { rd, rs1, offset } => {
                // 先算目标再写 rd，rd == rs1 时仍使用旧值
                let target = effective_addr(self.regs.read(rs1), offset) & !1;
                self.regs.write(rd, current_pc.wrapping_add(4));
                Flow::Jump(target)
            }
            RvInstr::Branch { op, rs1, rs2, offset } => {
                if branch_taken(op, self.regs.read(rs1), self.regs.read(rs2)) {
                    Flow::Jump(current_pc.wrapping_add(offset as u32))
                } else {
                    Flow::Next
                }
            }
            RvInstr::Load { op, rd, rs1, offset } => {
                let addr = effective_addr(self.regs.read(rs1), offset);
                let value = load(mem, op, addr)
                    .map_err(|source| CpuError::Load { pc: current_pc, source })?;
                self.regs.write(rd, value);
                Flow::Next
            }
            RvInstr::Store { op, rs1, rs2, offset } => {
                let addr = effective_addr(self.regs.read(rs1), offset);
                store(mem, op, addr, self.regs.read(rs2));
                Flow::Next
            }
            RvInstr::OpImm { op, rd, rs1, imm } => {
                self.regs.write(rd, alu(op, self.regs.read(rs1), imm as u32));
                Flow::Next
            }
            RvInstr::Op { op: AluOp::Sltu, rd, rs1: 0, rs2 } => {
                // SLTU rd, x0, rs2 即 rs2 != 0
                self.regs.write(rd, (self.regs.read(rs2) != 0) as u32);
                Flow::Next
            }
            RvInstr::Op { op, rd, rs1, rs2 } => {
                self.regs
                    .write(rd, alu(op, self.regs.read(rs1), self.regs.read(rs2)));
                Flow::Next
            }
            RvInstr::MulDiv { op, rd, rs1, rs2 } => {
                let result = exu::rv32m::muldiv(op, self.regs.read(rs1), self.regs.read(rs2));
                self.regs.write(rd, result);
                Flow::Next
            }
            // 单核模型中视为立即完成
            RvInstr::Fence { .. } | RvInstr::FenceI => Flow::Next,
            RvInstr::Ecall => exu::ecall::execute(self)?,
            RvInstr::Csr { raw } => {
                debug!("csr access ignored at 0x{current_pc:08x}: 0x{raw:08x}");
                Flow::Next
            }
            RvInstr::Illegal { raw } => {
                warn!(
                    "illegal {} encoding 0x{raw:08x} at 0x{current_pc:08x}, skipped",
                    decoded.instr.group()
                );
                Flow::Next
            }
            RvInstr::Unimplemented { opcode, raw } => {
                warn!(
                    "unimplemented opcode 0x{opcode:02x} (0x{raw:08x}) at 0x{current_pc:08x}, skipped"
                );
                Flow::Next
            }
        };

        Ok(flow)
    }
}

impl fmt::Debug for CpuCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuCore")
            .field("pc", &format_args!("0x{:08x}", self.pc))
            .field("state", &self.state)
            .field("regs", &self.regs)
            .field("decoder", &self.decoder)
            .field("trace", &self.trace)
            .field("misaligned_pc", &self.misaligned_pc)
            .field("retired", &self.retired)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// 可共享的内存输出，用于捕获环境调用的打印
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
