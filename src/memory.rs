//! 内存抽象层
//!
//! 本模块定义了内存访问的统一接口 `Memory` trait，
//! 以及基于哈希表的稀疏字节寻址实现 `SparseMemory`。
//!
//! 多字节数据一律按小端序存放：`addr` 处为最低有效字节。

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

/// 访存粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSize {
    Byte,
    Half,
    Word,
}

impl AccessSize {
    pub fn bytes(self) -> u32 {
        match self {
            AccessSize::Byte => 1,
            AccessSize::Half => 2,
            AccessSize::Word => 4,
        }
    }
}

/// 内存访问错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemError {
    /// 读取的地址范围内存在未映射的字节
    #[error("unmapped {access:?} access at 0x{addr:08x}")]
    Unmapped { addr: u32, access: AccessSize },
}

impl MemError {
    /// 出错的（第一个未映射的）字节地址
    pub fn addr(&self) -> u32 {
        match self {
            MemError::Unmapped { addr, .. } => *addr,
        }
    }
}

pub type MemResult<T> = Result<T, MemError>;

/// 内存访问的统一接口
///
/// 读操作只有在所有组成字节都已映射时才成功；
/// 写操作总是成功，按需创建映射。
pub trait Memory {
    /// 检查某个字节地址是否已映射
    fn contains(&self, addr: u32) -> bool;

    /// 从指定地址读取 8 位数据
    fn read_byte(&self, addr: u32) -> MemResult<u8>;

    /// 从指定地址读取 16 位数据（小端序）
    fn read_half(&self, addr: u32) -> MemResult<u16>;

    /// 从指定地址读取 32 位数据（小端序）
    fn read_word(&self, addr: u32) -> MemResult<u32>;

    /// 向指定地址写入 8 位数据
    fn store_byte(&mut self, addr: u32, value: u8);

    /// 向指定地址写入 16 位数据（小端序）
    fn store_half(&mut self, addr: u32, value: u16);

    /// 向指定地址写入 32 位数据（小端序）
    fn store_word(&mut self, addr: u32, value: u32);
}

/// 稀疏内存实现
///
/// 使用 `HashMap<u32, u8>` 只保存实际写入过的字节，
/// 无需预留完整的 4 GiB 地址空间，同时支持任意绝对地址的访存。
///
/// 地址运算按 2^32 回绕。
#[derive(Debug, Clone, Default)]
pub struct SparseMemory {
    cells: HashMap<u32, u8>,
}

impl SparseMemory {
    /// 创建空内存
    ///
    /// # 示例
    ///
    /// ```
    /// use isasim::memory::{Memory, SparseMemory};
    ///
    /// let mut mem = SparseMemory::new();
    /// mem.store_word(0x100, 0xDEAD_BEEF);
    /// assert_eq!(mem.read_word(0x100), Ok(0xDEAD_BEEF));
    /// assert!(!mem.contains(0x104));
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// 已映射的字节数
    pub fn mapped_len(&self) -> usize {
        self.cells.len()
    }

    /// 读取 `N` 个连续字节；任一字节未映射时返回第一个缺失地址
    fn read_array<const N: usize>(&self, addr: u32, access: AccessSize) -> MemResult<[u8; N]> {
        let mut out = [0u8; N];
        for (i, byte) in out.iter_mut().enumerate() {
            let a = addr.wrapping_add(i as u32);
            *byte = *self
                .cells
                .get(&a)
                .ok_or(MemError::Unmapped { addr: a, access })?;
        }
        Ok(out)
    }

    fn write_array(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.cells.insert(addr.wrapping_add(i as u32), b);
        }
    }

    /// 加载扁平程序镜像
    ///
    /// 镜像按 4 字节一个字处理。磁盘上的每个字以与存储相反的字节序读出，
    /// 再翻转字节后以小端序写入，因此文件字节最终按原顺序落在
    /// `base_addr` 起的递增地址上，`read_word` 能重新拼出原始指令编码。
    ///
    /// 末尾不足 4 字节的残余部分被丢弃。
    ///
    /// # 返回
    ///
    /// 实际加载的字数
    pub fn load_image(&mut self, bytes: &[u8], base_addr: u32) -> usize {
        let chunks = bytes.chunks_exact(4);
        let tail = chunks.remainder().len();
        let mut addr = base_addr;
        let mut words = 0;

        for chunk in chunks {
            let wire = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.store_word(addr, wire.swap_bytes());
            addr = addr.wrapping_add(4);
            words += 1;
        }

        if tail != 0 {
            warn!("image length is not a multiple of 4, {tail} trailing byte(s) discarded");
        }

        words
    }

    /// 批量写入数据到内存
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) {
        self.write_array(addr, data);
    }

    /// 将指定范围填充为固定字节
    pub fn fill(&mut self, addr: u32, len: usize, value: u8) {
        for i in 0..len {
            self.cells.insert(addr.wrapping_add(i as u32), value);
        }
    }

    /// 批量读取数据
    ///
    /// 范围内任意字节未映射都会返回 `MemError::Unmapped`
    pub fn read_range(&self, addr: u32, len: usize) -> MemResult<Vec<u8>> {
        (0..len)
            .map(|i| {
                let a = addr.wrapping_add(i as u32);
                self.cells.get(&a).copied().ok_or(MemError::Unmapped {
                    addr: a,
                    access: AccessSize::Byte,
                })
            })
            .collect()
    }
}

impl Memory for SparseMemory {
    fn contains(&self, addr: u32) -> bool {
        self.cells.contains_key(&addr)
    }

    fn read_byte(&self, addr: u32) -> MemResult<u8> {
        let [b] = self.read_array::<1>(addr, AccessSize::Byte)?;
        Ok(b)
    }

    fn read_half(&self, addr: u32) -> MemResult<u16> {
        Ok(u16::from_le_bytes(self.read_array(addr, AccessSize::Half)?))
    }

    fn read_word(&self, addr: u32) -> MemResult<u32> {
        Ok(u32::from_le_bytes(self.read_array(addr, AccessSize::Word)?))
    }

    fn store_byte(&mut self, addr: u32, value: u8) {
        self.cells.insert(addr, value);
    }

    fn store_half(&mut self, addr: u32, value: u16) {
        self.write_array(addr, &value.to_le_bytes());
    }

    fn store_word(&mut self, addr: u32, value: u32) {
        self.write_array(addr, &value.to_le_bytes());
    }
}
