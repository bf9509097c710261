//! 环境调用：由 a0 选择服务，参数在 a1

use std::io::Write;

use tracing::debug;

use super::Flow;
use crate::cpu::regfile::abi::{A0, A1};
use crate::cpu::{CpuCore, CpuError};

/// 环境调用服务号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcallService {
    /// 1: 以有符号十进制打印 a1
    PrintInt,
    /// 4: 打印字符串，不建模
    PrintString,
    /// 9: sbrk，不建模
    Sbrk,
    /// 10: 结束运行
    Exit,
    /// 11: 打印 a1 低字节对应的字符
    PrintChar,
    /// 其余服务号：a1 清零后结束运行
    Other(u32),
}

impl EcallService {
    pub fn from_a0(a0: u32) -> Self {
        match a0 {
            1 => Self::PrintInt,
            4 => Self::PrintString,
            9 => Self::Sbrk,
            10 => Self::Exit,
            11 => Self::PrintChar,
            n => Self::Other(n),
        }
    }
}

/// 执行一次环境调用
pub fn execute(cpu: &mut CpuCore) -> Result<Flow, CpuError> {
    let service = EcallService::from_a0(cpu.regs.read(A0));
    let arg = cpu.regs.read(A1);
    debug!("ecall {service:?} a1=0x{arg:08x}");

    match service {
        EcallService::PrintInt => {
            writeln!(cpu.console, "{}", arg as i32)?;
            cpu.console.flush()?;
            Ok(Flow::Next)
        }
        EcallService::PrintChar => {
            writeln!(cpu.console, "{}", arg as u8 as char)?;
            cpu.console.flush()?;
            Ok(Flow::Next)
        }
        EcallService::PrintString | EcallService::Sbrk => Ok(Flow::Next),
        EcallService::Exit => Ok(Flow::Exit),
        EcallService::Other(_) => {
            cpu.regs.write(A1, 0);
            Ok(Flow::Exit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_numbers() {
        assert_eq!(EcallService::from_a0(1), EcallService::PrintInt);
        assert_eq!(EcallService::from_a0(4), EcallService::PrintString);
        assert_eq!(EcallService::from_a0(9), EcallService::Sbrk);
        assert_eq!(EcallService::from_a0(10), EcallService::Exit);
        assert_eq!(EcallService::from_a0(11), EcallService::PrintChar);
        assert_eq!(EcallService::from_a0(17), EcallService::Other(17));
        assert_eq!(EcallService::from_a0(0), EcallService::Other(0));
    }
}
