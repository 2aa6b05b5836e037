use crate::Result;

use super::ErasedBuf;

/// 类型擦除后的可写缓冲。
pub type ErasedBufMut = dyn WritableBuffer;

/// `WritableBuffer` 描述统一的可写缓冲契约。
///
/// # 设计背景（Why）
/// - 压缩步骤事先只知道输出的上界（`maxCompressedLength`），真正写入多少要等压缩器返回后才知道；
///   契约因此提供 [`write_with`](Self::write_with)：先暴露上界大小的区域，再按实际产出推进写游标。
/// - `freeze` 把写完的缓冲转换为只读视图，确保所有权安全转移给下一个步骤。
///
/// # 契约说明（What）
/// - **前置条件**：顺序写入，不允许并发写同一实例；
/// - **后置条件**：成功写入后 `written()` 立即可见；`freeze` 之后原对象不可再写；
/// - 冻结后的写操作返回 `buffer.invalid_state`。
pub trait WritableBuffer: Send + Sync + 'static {
    /// 总容量（包含已写入字节）。
    fn capacity(&self) -> usize;

    /// 剩余可写空间。
    fn remaining_mut(&self) -> usize;

    /// 已写入的字节数。
    fn written(&self) -> usize;

    /// 确保至少还能追加 `additional` 字节。
    fn reserve(&mut self, additional: usize) -> Result<()>;

    /// 将切片写入缓冲末尾。
    fn put_slice(&mut self, src: &[u8]) -> Result<()>;

    /// 以回调方式直接写入缓冲尾部。
    ///
    /// # 执行步骤（How）
    /// 1. 在写游标之后暴露 `max_len` 字节的已清零区域给 `fill`；
    /// 2. `fill` 返回实际产出的字节数 `n`（必须 `n <= max_len`）；
    /// 3. 写游标推进 `n`，多余区域被丢弃，不属于逻辑负载。
    ///
    /// # 契约说明（What）
    /// - `fill` 返回错误时不保留任何字节，错误原样返回；
    /// - `n > max_len` 视为实现缺陷，返回 `buffer.out_of_range`。
    fn write_with(
        &mut self,
        max_len: usize,
        fill: &mut dyn FnMut(&mut [u8]) -> Result<usize>,
    ) -> Result<usize>;

    /// 清空已写内容但保留容量。
    fn clear(&mut self);

    /// 冻结缓冲区，转换为只读视图。
    fn freeze(self: Box<Self>) -> Result<Box<ErasedBuf>>;

    /// 以大端序写入 4 字节无符号整数。
    fn put_u32(&mut self, value: u32) -> Result<()> {
        self.put_slice(&value.to_be_bytes())
    }
}
