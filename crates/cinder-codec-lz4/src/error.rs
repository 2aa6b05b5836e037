//! 压缩步骤的本地错误域。
//!
//! ## 角色定位（Why）
//! - 流水线只认识 [`CoreError`]，但排障时需要知道是“头部截断”还是“块损坏”；
//!   细粒度枚举保留这些信息，并在转换为 `CoreError` 时作为底层原因挂上。
//!
//! ## 设计要求（What）
//! - 格式类问题统一映射到 `pipeline.format`，包括压缩块不可能还原出的声明长度；
//! - 声明长度超过配置上限属于分配失败，映射到 `buffer.allocation`，在真正申请内存之前报告。

use cinder_core::CoreError;
use cinder_core::error::codes;
use lz4_flex::block::{CompressError, DecompressError};
use thiserror::Error;

/// LZ4 压缩步骤可能产生的失败。
#[derive(Debug, Error)]
pub enum CompressionError {
    /// 载荷长度无法用 4 字节无符号头部表示。
    #[error("payload of {len} bytes does not fit the 4-byte length header")]
    PayloadTooLarge { len: usize },

    /// 可读字节不足以容纳长度头部。
    #[error("compressed frame holds {available} bytes, fewer than the 4-byte length header")]
    TruncatedHeader { available: usize },

    /// 声明的原始长度超出压缩块按 LZ4 最大膨胀比所能还原的长度。
    #[error(
        "declared decompressed length {declared} exceeds the {bound} bytes a {compressed}-byte lz4 block can expand to"
    )]
    DeclaredLengthExceedsBlockBound {
        declared: usize,
        compressed: usize,
        bound: usize,
    },

    /// 头部声明的原始长度超过配置上限。
    #[error("declared decompressed length {declared} exceeds the configured limit of {limit} bytes")]
    DeclaredLengthExceedsLimit { declared: usize, limit: usize },

    /// 压缩器无法写入预留的输出区域。
    #[error("lz4 block compression failed")]
    Compress(#[source] CompressError),

    /// 压缩块被截断、损坏，或解压结果超出头部声明的长度。
    #[error("lz4 block is truncated or corrupt")]
    Decompress(#[source] DecompressError),

    /// 解压产出的字节数与头部声明不一致。
    #[error("header declares {declared} bytes but the block decoded to {produced} bytes")]
    LengthMismatch { declared: usize, produced: usize },
}

impl CompressionError {
    /// 对应的稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            CompressionError::DeclaredLengthExceedsLimit { .. } => codes::BUFFER_ALLOCATION,
            CompressionError::PayloadTooLarge { .. }
            | CompressionError::TruncatedHeader { .. }
            | CompressionError::DeclaredLengthExceedsBlockBound { .. }
            | CompressionError::Compress(_)
            | CompressionError::Decompress(_)
            | CompressionError::LengthMismatch { .. } => codes::PIPELINE_FORMAT,
        }
    }
}

impl From<CompressionError> for CoreError {
    fn from(value: CompressionError) -> Self {
        CoreError::new(value.code(), value.to_string()).with_cause(value)
    }
}
