//! 解码器框架
//!
//! 提供按 opcode 分桶的可扩展指令解码系统

use std::sync::Arc;

use thiserror::Error;

use crate::isa::fields::opcode;
use crate::isa::{DecodedInstr, RvInstr};

/// 指令解码器 trait
///
/// 实现此 trait 以创建自定义解码器
pub trait InstrDecoder: Send + Sync {
    /// 解码器名称
    fn name(&self) -> &str;

    /// 尝试解码指令
    ///
    /// 返回 `Some(decoded)` 如果能解码，否则返回 `None`
    fn decode(&self, raw: u32) -> Option<DecodedInstr>;

    /// 此解码器处理的 opcode 列表
    fn handled_opcodes(&self) -> &[u32];

    /// 是否允许与其他解码器在同一 opcode 上共存
    fn allow_opcode_overlap(&self) -> bool {
        false
    }
}

/// 解码器注册失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("opcode 0x{opcode:02X} already handled; rejecting decoder {decoder}")]
    OpcodeTaken { opcode: u32, decoder: String },
    #[error("decoder {decoder} declares out-of-range opcode 0x{opcode:X}")]
    InvalidOpcode { opcode: u32, decoder: String },
}

/// 解码器注册表
///
/// 管理多个解码器，按 opcode 分桶，桶内按注册顺序尝试
pub struct DecoderRegistry {
    /// 注册的解码器列表（按注册顺序）
    decoders: Vec<Arc<dyn InstrDecoder>>,
    /// 按 opcode 分桶的解码器索引
    opcode_map: [Vec<usize>; 128],
}

impl DecoderRegistry {
    /// 创建空的解码器注册表
    pub fn new() -> Self {
        Self {
            decoders: Vec::new(),
            opcode_map: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// 注册一个解码器；若声明的 opcode 已被独占则返回 Err
    pub fn register(&mut self, decoder: Arc<dyn InstrDecoder>) -> Result<(), RegistryError> {
        // 先做冲突检测，避免错误时污染注册表
        for &op in decoder.handled_opcodes() {
            let Some(bucket) = self.opcode_map.get(op as usize) else {
                return Err(RegistryError::InvalidOpcode {
                    opcode: op,
                    decoder: decoder.name().to_string(),
                });
            };
            let blocked = bucket
                .iter()
                .any(|&i| !self.decoders[i].allow_opcode_overlap());
            if !bucket.is_empty() && (blocked || !decoder.allow_opcode_overlap()) {
                return Err(RegistryError::OpcodeTaken {
                    opcode: op,
                    decoder: decoder.name().to_string(),
                });
            }
        }

        let idx = self.decoders.len();
        for &op in decoder.handled_opcodes() {
            self.opcode_map[op as usize].push(idx);
        }
        self.decoders.push(decoder);

        Ok(())
    }

    /// 解码指令
    ///
    /// - opcode 没有任何解码器认领：`RvInstr::Unimplemented`
    /// - opcode 已认领但无定义匹配：`RvInstr::Illegal`
    pub fn decode(&self, raw: u32) -> DecodedInstr {
        let op = opcode(raw);
        let bucket = &self.opcode_map[op as usize];

        if bucket.is_empty() {
            return DecodedInstr {
                raw,
                instr: RvInstr::Unimplemented { opcode: op as u8, raw },
            };
        }

        bucket
            .iter()
            .find_map(|&idx| self.decoders[idx].decode(raw))
            .unwrap_or(DecodedInstr {
                raw,
                instr: RvInstr::Illegal { raw },
            })
    }

    /// 获取已注册的解码器数量
    pub fn decoder_count(&self) -> usize {
        self.decoders.len()
    }

    /// 列出所有已注册的解码器名称
    pub fn decoder_names(&self) -> Vec<&str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("decoders", &self.decoder_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{RV32I_DECODER, RV32M_DECODER};

    struct Exclusive;

    impl InstrDecoder for Exclusive {
        fn name(&self) -> &str {
            "EXCLUSIVE"
        }

        fn decode(&self, _raw: u32) -> Option<DecodedInstr> {
            None
        }

        fn handled_opcodes(&self) -> &[u32] {
            &[0x33]
        }
    }

    #[test]
    fn test_shared_opcode_registration() {
        let mut registry = DecoderRegistry::new();
        registry.register(Arc::new(RV32I_DECODER)).unwrap();
        registry.register(Arc::new(RV32M_DECODER)).unwrap();
        assert_eq!(registry.decoder_names(), vec!["RV32I", "RV32M"]);
    }

    #[test]
    fn test_exclusive_decoder_rejected() {
        let mut registry = DecoderRegistry::new();
        registry.register(Arc::new(RV32I_DECODER)).unwrap();

        let err = registry.register(Arc::new(Exclusive)).unwrap_err();
        assert!(matches!(err, RegistryError::OpcodeTaken { opcode: 0x33, .. }));
        // 失败的注册不应留下痕迹
        assert_eq!(registry.decoder_count(), 1);
    }

    #[test]
    fn test_unclaimed_opcode_is_unimplemented() {
        let registry = DecoderRegistry::new();
        let decoded = registry.decode(0x0000_0013);
        assert_eq!(
            decoded.instr,
            RvInstr::Unimplemented { opcode: 0x13, raw: 0x13 }
        );
    }
}
