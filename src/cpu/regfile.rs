//! 整数寄存器文件 x0..x31

/// 通用寄存器数量
pub const NUM_REGS: usize = 32;

/// ABI 名称对应的寄存器编号
pub mod abi {
    pub const ZERO: u8 = 0;
    pub const RA: u8 = 1;
    pub const SP: u8 = 2;
    pub const A0: u8 = 10;
    pub const A1: u8 = 11;
}

/// Integer register file.
///
/// 写 x0 不会被拒绝：值在本周期内暂存，由 `reset_zero` 在周期末清零。
/// 因此取指边界上 x0 始终为 0。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegFile {
    regs: [u32; NUM_REGS],
}

impl RegFile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn read(&self, reg: u8) -> u32 {
        self.regs[reg as usize & (NUM_REGS - 1)]
    }

    #[inline]
    pub fn write(&mut self, reg: u8, value: u32) {
        self.regs[reg as usize & (NUM_REGS - 1)] = value;
    }

    /// 周期末把 x0 拉回 0
    #[inline]
    pub fn reset_zero(&mut self) {
        self.regs[abi::ZERO as usize] = 0;
    }

    /// 以有符号值导出全部寄存器，x0 恒为 0
    pub fn snapshot(&self) -> [i32; NUM_REGS] {
        let mut snap = self.regs.map(|v| v as i32);
        snap[abi::ZERO as usize] = 0;
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x0_write_is_transient() {
        let mut rf = RegFile::new();
        rf.write(0, 42);
        // 周期内可见，快照中不可见
        assert_eq!(rf.read(0), 42);
        assert_eq!(rf.snapshot()[0], 0);
        rf.reset_zero();
        assert_eq!(rf.read(0), 0);
        assert_eq!(rf.snapshot()[0], 0);
    }

    #[test]
    fn test_snapshot_is_signed() {
        let mut rf = RegFile::new();
        rf.write(abi::A0, 0xFFFF_FFFF);
        rf.write(31, 7);
        let snap = rf.snapshot();
        assert_eq!(snap[10], -1);
        assert_eq!(snap[31], 7);
    }
}
