//! ISA 配置与冲突检测
//!
//! 选择启用的扩展，检查不同扩展的定义表之间没有重叠编码，
//! 再把对应的解码器注册到 [`DecoderRegistry`]。

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::decoder::{DecoderRegistry, RegistryError};
use super::instr_def::{InstrDef, TableDrivenDecoder};
use super::rv32i::{RV32I_DECODER, RV32I_INSTRS};
use super::rv32m::{RV32M_DECODER, RV32M_INSTRS};

/// 支持的 ISA 扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IsaExtension {
    /// 基础整数指令集，始终启用
    RV32I,
    /// 乘除法
    RV32M,
}

impl IsaExtension {
    /// 扩展的指令定义表
    pub fn instrs(self) -> &'static [InstrDef] {
        match self {
            IsaExtension::RV32I => RV32I_INSTRS,
            IsaExtension::RV32M => RV32M_INSTRS,
        }
    }

    fn decoder(self) -> &'static TableDrivenDecoder {
        match self {
            IsaExtension::RV32I => &RV32I_DECODER,
            IsaExtension::RV32M => &RV32M_DECODER,
        }
    }

    /// ISA 字符串中的字母
    pub fn letter(self) -> char {
        match self {
            IsaExtension::RV32I => 'I',
            IsaExtension::RV32M => 'M',
        }
    }
}

impl fmt::Display for IsaExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// 两个扩展中可能匹配同一指令字的定义
#[derive(Debug, Clone)]
pub struct ConflictInfo {
    pub first: (IsaExtension, &'static InstrDef),
    pub second: (IsaExtension, &'static InstrDef),
    /// 同时匹配两者的一个编码
    pub example_raw: u32,
}

impl fmt::Display for ConflictInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (ext_a, a) = self.first;
        let (ext_b, b) = self.second;
        write!(
            f,
            "冲突: {ext_a}:{} 与 {ext_b}:{} (示例: 0x{:08X})",
            a.name, b.name, self.example_raw
        )
    }
}

/// 构建解码器失败
#[derive(Debug, Error)]
pub enum IsaConfigError {
    #[error("{} instruction conflict(s), first: {}", .0.len(), .0[0])]
    Conflicts(Vec<ConflictInfo>),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// ISA 配置
///
/// ```
/// use isasim::isa::IsaConfig;
///
/// let registry = IsaConfig::new()
///     .with_m_extension()
///     .build()
///     .expect("无冲突");
/// assert_eq!(registry.decoder_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsaConfig {
    extensions: BTreeSet<IsaExtension>,
}

impl IsaConfig {
    /// 只有 RV32I
    pub fn new() -> Self {
        Self {
            extensions: BTreeSet::from([IsaExtension::RV32I]),
        }
    }

    pub fn rv32im() -> Self {
        Self::new().with_m_extension()
    }

    /// 启用 M 扩展，重复调用无影响
    pub fn with_m_extension(mut self) -> Self {
        self.extensions.insert(IsaExtension::RV32M);
        self
    }

    pub fn has(&self, ext: IsaExtension) -> bool {
        self.extensions.contains(&ext)
    }

    /// 列出不同扩展之间的重叠定义
    ///
    /// 同一扩展内的重叠按表顺序消解（如 ECALL 先于 CSR 兜底项），不算冲突。
    pub fn detect_conflicts(&self) -> Vec<ConflictInfo> {
        let entries: Vec<(IsaExtension, &'static InstrDef)> = self
            .extensions
            .iter()
            .flat_map(|&ext| ext.instrs().iter().map(move |def| (ext, def)))
            .collect();

        let mut conflicts = Vec::new();
        for (i, &(ext_a, a)) in entries.iter().enumerate() {
            for &(ext_b, b) in &entries[i + 1..] {
                if ext_a != ext_b && a.conflicts_with(b) {
                    conflicts.push(ConflictInfo {
                        first: (ext_a, a),
                        second: (ext_b, b),
                        example_raw: (a.match_val & a.mask) | (b.match_val & b.mask),
                    });
                }
            }
        }
        conflicts
    }

    pub fn is_valid(&self) -> bool {
        self.detect_conflicts().is_empty()
    }

    /// 如 "RV32IM"
    pub fn isa_string(&self) -> String {
        let letters: String = self.extensions.iter().map(|ext| ext.letter()).collect();
        format!("RV32{letters}")
    }

    /// 构建解码器注册表，有冲突时返回错误
    pub fn build(self) -> Result<DecoderRegistry, IsaConfigError> {
        let conflicts = self.detect_conflicts();
        if !conflicts.is_empty() {
            return Err(IsaConfigError::Conflicts(conflicts));
        }

        let mut registry = DecoderRegistry::new();
        for ext in &self.extensions {
            registry.register(Arc::new(*ext.decoder()))?;
        }
        Ok(registry)
    }
}

impl Default for IsaConfig {
    fn default() -> Self {
        Self::rv32im()
    }
}
