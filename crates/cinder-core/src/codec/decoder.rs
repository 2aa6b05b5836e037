use std::fmt;

use super::encoder::check_frame_len;
use crate::Result;
use crate::buffer::{BufferAllocator, ErasedBuf};

/// `DecodeContext` 是解码时随调用传递的解码状态。
///
/// # 设计背景（Why）
/// - 解码器可能需要临时缓冲（例如流水线复制入站缓冲、解压输出），统一从上下文的分配器租借；
/// - 流水线不解释上下文内容，而是将同一个上下文原样交给内层解码器。
///
/// # 契约说明（What）
/// - 上下文不保存租借的缓冲，可在多次解码之间复用；
/// - `max_frame_size` 用于在复制入站数据之前拒绝超长帧。
pub struct DecodeContext<'a> {
    allocator: &'a dyn BufferAllocator,
    max_frame_size: Option<usize>,
}

impl<'a> DecodeContext<'a> {
    /// 使用分配器构建解码上下文。
    pub fn new(allocator: &'a dyn BufferAllocator) -> Self {
        Self {
            allocator,
            max_frame_size: None,
        }
    }

    /// 附加可选帧长上限。
    pub fn with_max_frame_size(
        allocator: &'a dyn BufferAllocator,
        max_frame_size: Option<usize>,
    ) -> Self {
        Self {
            allocator,
            max_frame_size,
        }
    }

    /// 返回底层分配器。
    pub fn allocator(&self) -> &'a dyn BufferAllocator {
        self.allocator
    }

    /// 返回帧长上限。
    pub fn max_frame_size(&self) -> Option<usize> {
        self.max_frame_size
    }

    /// 校验入站帧长，超限时返回 `pipeline.frame_too_large`。
    pub fn check_frame_constraints(&self, frame_len: usize) -> Result<()> {
        check_frame_len(self.max_frame_size, frame_len, "decoder")
    }
}

impl fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}

/// `Decoder` 定义从完整字节缓冲还原值的契约。
///
/// # 契约说明（What）
/// - `src` 是已经拼装完整的缓冲，本层不处理半包；
/// - 解码器可以推进 `src` 的读游标，但不拥有它，释放由调用方负责。
pub trait Decoder: Send + Sync {
    /// 解码产出的值类型。
    type Item;

    /// 从缓冲解码一个值。
    fn decode(&self, src: &mut ErasedBuf, ctx: &mut DecodeContext<'_>) -> Result<Self::Item>;
}
