use crate::Result;

/// 类型擦除后的只读缓冲，流水线步骤之间传递的统一形态。
pub type ErasedBuf = dyn ReadableBuffer;

/// `ReadableBuffer` 定义了对象安全的只读缓冲契约。
///
/// # 设计背景（Why）
/// - 流水线的各个步骤（压缩、标记、内层解码）都需要统一的读取视图，避免在热路径中做类型转换；
/// - 压缩器与解压器需要一次性看到完整的可读区域，因此契约要求实现为连续内存。
///
/// # 契约说明（What）
/// - `chunk()` 返回 **全部** 剩余可读字节，`chunk().len() == remaining()`；
/// - `split_to(len)`/`advance(len)`/`copy_into_slice(dst)` 的长度必须不超过 `remaining()`，
///   否则返回 `buffer.out_of_range`，且不修改读游标；
/// - 释放由 `Drop` 完成：最后一个持有者丢弃缓冲时，底层容量归还给分配方。
pub trait ReadableBuffer: Send + Sync + 'static {
    /// 返回剩余可读字节数（写游标 − 读游标）。
    fn remaining(&self) -> usize;

    /// 返回全部剩余可读字节。
    fn chunk(&self) -> &[u8];

    /// 拆分出前 `len` 字节，返回新的缓冲区实例。
    fn split_to(&mut self, len: usize) -> Result<Box<ErasedBuf>>;

    /// 将读游标前移 `len` 字节。
    fn advance(&mut self, len: usize) -> Result<()>;

    /// 将前 `dst.len()` 字节复制到 `dst` 并推进读游标。
    fn copy_into_slice(&mut self, dst: &mut [u8]) -> Result<()>;

    /// 将剩余数据扁平化为 `Vec<u8>`，消费缓冲本身。
    fn try_into_vec(self: Box<Self>) -> Result<Vec<u8>>;

    /// 判断缓冲区是否已读空。
    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// 读取 4 字节大端无符号整数并推进读游标。
    ///
    /// 与 [`WritableBuffer::put_u32`](super::WritableBuffer::put_u32) 使用同一字节序，
    /// 保证同一部署内写入与读取自洽。
    fn read_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        self.copy_into_slice(&mut raw)?;
        Ok(u32::from_be_bytes(raw))
    }
}
