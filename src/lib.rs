//! isasim: 单周期 RV32IM 指令集仿真库
//!
//! 每个周期完整执行一条指令（取指、译码、执行、回写），
//! 不建模流水线、缓存或特权态。
//!
//! # 模块结构
//!
//! - `isa`: RISC-V 指令字段提取与表驱动解码
//! - `cpu`: CPU 核心、寄存器文件与执行单元
//! - `memory`: 稀疏字节寻址内存
//! - `sim_env`: 仿真环境（配置、镜像/ELF 加载、运行循环）
//! - `report`: 寄存器结果转储与期望结果比对

pub mod cpu;
pub mod isa;
pub mod memory;
pub mod report;
pub mod sim_env;
