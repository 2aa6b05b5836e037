//! `cinder-codec-lz4` 提供基于 LZ4 块格式的流水线压缩步骤。
//!
//! # 教案背景（Why）
//! - 缓存值在写出前压缩可以显著降低网络与存储占用；压缩必须是一个可逆、无状态的步骤，
//!   才能与其它步骤任意组合；
//! - LZ4 块格式本身不记录原始长度，因此在块前附加 4 字节大端长度头，读取时据此精确分配输出缓冲。
//!
//! # 使用概览（How）
//! - 手工装配：`PipelineCodec::builder(inner).step(CompressionStep::new()).build()`；
//! - 声明式装配：调用 [`register`] 把 `"lz4"` 工厂加入 `StepRegistry`，再由配置中的
//!   `[[steps]] kind = "lz4"` 条目构造。
//!
//! # 合约说明（What）
//! - 解压使用 `lz4_flex` 的安全解码路径并开启边界检查，恶意或损坏的块只会返回 `pipeline.format`；
//! - 头部声明的长度在分配前按块的最大膨胀比校验，输出缓冲的大小受线上帧长度约束；
//! - 所有失败都先以 [`CompressionError`] 描述，再转换为 `CoreError` 向上传播。

#![deny(unsafe_code)]

mod error;
mod step;

pub use error::CompressionError;
pub use step::{
    CompressionStep, HEADER_LEN, Lz4StepFactory, STEP_KIND, max_decompressed_len_for, register,
};
