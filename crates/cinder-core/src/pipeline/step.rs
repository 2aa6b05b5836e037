use crate::Result;
use crate::buffer::{BufferAllocator, ErasedBuf};

/// `PipelineStep` 是包裹在内层编解码器外的一次可逆字节变换。
///
/// # 设计背景（Why）
/// - 压缩等变换以“整块缓冲进、整块缓冲出”的方式工作，多个变换按顺序串联；
/// - 所有权以值的形式移交：步骤拿到输入后即成为其唯一所有者，无论成功还是失败，
///   输入都在步骤返回前被释放（`Drop`），不需要调用方补做清理。
///
/// # 契约说明（What）
/// - `write`：出站（序列化）方向的变换；`read`：入站方向的逆变换；
/// - **往返律**：对任意内容 `b`，`read(write(b))` 的内容等于 `b`，缓冲身份无需保持；
/// - **输出**：成功时返回新租借的缓冲，所有权交给调用方；失败时不返回任何缓冲，
///   步骤内部已分配的缓冲同样在返回前释放；
/// - 步骤不得保留跨调用的可变状态，同一实例会被多个线程并发调用。
pub trait PipelineStep: Send + Sync + 'static {
    /// 步骤名称，用于日志与配置中的类型标识。
    fn name(&self) -> &str;

    /// 出站变换：消费 `input`，返回变换后的缓冲。
    fn write(
        &self,
        input: Box<ErasedBuf>,
        allocator: &dyn BufferAllocator,
    ) -> Result<Box<ErasedBuf>>;

    /// 入站逆变换：消费 `input`，返回还原后的缓冲。
    fn read(
        &self,
        input: Box<ErasedBuf>,
        allocator: &dyn BufferAllocator,
    ) -> Result<Box<ErasedBuf>>;
}
