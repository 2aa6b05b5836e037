use std::fmt;

use super::metadata::CodecDescriptor;
use crate::buffer::{BufferAllocator, ErasedBuf, ErasedBufMut};
use crate::error::codes;
use crate::{CoreError, Result};

/// `EncodeContext` 为编码过程提供共享资源视图。
///
/// # 设计背景（Why）
/// - 编码器与流水线步骤都从同一个分配器租借缓冲，统一由上下文携带，
///   使实现聚焦于序列化或变换本身。
/// - 可选的帧长上限用于在写出前拒绝异常巨大的负载。
///
/// # 契约说明（What）
/// - **前置条件**：分配器线程安全；
/// - **后置条件**：上下文不持有任何租借的缓冲，可在多次编码之间复用。
pub struct EncodeContext<'a> {
    allocator: &'a dyn BufferAllocator,
    max_frame_size: Option<usize>,
}

impl<'a> EncodeContext<'a> {
    /// 使用分配器构建上下文。
    pub fn new(allocator: &'a dyn BufferAllocator) -> Self {
        Self {
            allocator,
            max_frame_size: None,
        }
    }

    /// 附带可选的最大帧尺寸约束。
    pub fn with_max_frame_size(
        allocator: &'a dyn BufferAllocator,
        max_frame_size: Option<usize>,
    ) -> Self {
        Self {
            allocator,
            max_frame_size,
        }
    }

    /// 租借一个满足最小容量的可写缓冲区。
    pub fn acquire_buffer(&self, min_capacity: usize) -> Result<Box<ErasedBufMut>> {
        self.allocator.acquire(min_capacity)
    }

    /// 返回底层分配器，供流水线步骤使用。
    pub fn allocator(&self) -> &'a dyn BufferAllocator {
        self.allocator
    }

    /// 返回最大帧尺寸。
    pub fn max_frame_size(&self) -> Option<usize> {
        self.max_frame_size
    }

    /// 校验即将写出的帧长，超限时返回 `pipeline.frame_too_large`。
    pub fn check_frame_constraints(&self, frame_len: usize) -> Result<()> {
        check_frame_len(self.max_frame_size, frame_len, "encoder")
    }
}

impl fmt::Debug for EncodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeContext")
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}

pub(crate) fn check_frame_len(limit: Option<usize>, frame_len: usize, side: &str) -> Result<()> {
    match limit {
        Some(max) if frame_len > max => Err(CoreError::new(
            codes::PIPELINE_FRAME_TOO_LARGE,
            format!("frame length {frame_len} exceeds configured {side} limit {max} bytes"),
        )),
        _ => Ok(()),
    }
}

/// `EncodedPayload` 表示编码完成、可写往存储的只读缓冲。
///
/// 结构体不对缓冲做额外处理；调用方通过 [`into_buffer`](Self::into_buffer) 取回所有权。
pub struct EncodedPayload {
    buffer: Box<ErasedBuf>,
}

impl EncodedPayload {
    /// 使用已经冻结的只读缓冲创建负载。
    pub fn from_buffer(buffer: Box<ErasedBuf>) -> Self {
        Self { buffer }
    }

    /// 负载字节数。
    pub fn len(&self) -> usize {
        self.buffer.remaining()
    }

    /// 负载是否为空。
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 只读访问负载字节。
    pub fn as_slice(&self) -> &[u8] {
        self.buffer.chunk()
    }

    /// 取回底层缓冲。
    pub fn into_buffer(self) -> Box<ErasedBuf> {
        self.buffer
    }
}

impl fmt::Debug for EncodedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedPayload")
            .field("remaining", &self.buffer.remaining())
            .finish()
    }
}

/// `Encoder` 定义将值转换为字节缓冲的契约。
///
/// # 契约说明（What）
/// - **后置条件**：返回的负载完整代表 `item` 的序列化结果；失败时通过 [`CoreError`] 携带稳定错误码；
/// - 接口只要求 `&self`，实现者以无状态单例形式共享，若内部需要缓存须自行保证并发安全。
pub trait Encoder: Send + Sync {
    /// 编码输入的值类型。
    type Item;

    /// 将值编码为字节负载。
    fn encode(&self, item: &Self::Item, ctx: &mut EncodeContext<'_>) -> Result<EncodedPayload>;
}
