use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Buf, Bytes, BytesMut};
use cinder_core::{
    CoreError, Result,
    buffer::{ErasedBuf, ReadableBuffer, WritableBuffer},
    error::codes,
};
use spin::Mutex;

/// `BufferRecycler` 描述缓冲池在租约结束时的回收入口。
///
/// # 设计初衷（Why）
/// - 流水线里每个步骤都会“消费一个缓冲、产出一个新缓冲”，被消费的缓冲必须恰好归还一次；
///   把归还动作挂在 `Drop` 上，就不存在“忘记释放”或“重复释放”的调用路径。
/// - [`BufferPool`](cinder_core::BufferPool) 只约束租借侧，回收侧由本接口补齐。
///
/// # 使用方式（How）
/// - 池把自身（或内部回收句柄）封装为 `Arc<dyn BufferRecycler>`，在构造 [`PooledBuffer`] 时注入；
/// - 同一租约的所有视图都释放后，`reclaim` 恰好被调用一次。
///
/// # 契约定义（What）
/// - **前置条件**：实现必须线程安全且不得 panic，`Drop` 路径上的 panic 会直接终止进程；
/// - **后置条件**：调用返回后池已经记录该租约结束。
pub trait BufferRecycler: Send + Sync + 'static {
    /// 通知池一次租约已经结束。
    fn reclaim(&self, reclaimed: ReclaimedBuffer);
}

/// 一次回收动作携带的上下文。
///
/// - `capacity`：租约最终记录的容量（随扩容刷新）；
/// - `leased_capacity`：租借时的容量，即池在租借时计入统计的字节数；
/// - `buffer`：若成功夺回底层 `BytesMut` 所有权则为 `Some`，仍有别名时为 `None`，
///   池只能更新统计而无法复用这块内存。
#[derive(Debug)]
pub struct ReclaimedBuffer {
    capacity: usize,
    leased_capacity: usize,
    buffer: Option<BytesMut>,
}

impl ReclaimedBuffer {
    /// 租借容量默认等于 `capacity`。
    pub fn new(capacity: usize, buffer: Option<BytesMut>) -> Self {
        Self {
            capacity,
            leased_capacity: capacity,
            buffer,
        }
    }

    pub fn with_leased_capacity(mut self, leased_capacity: usize) -> Self {
        self.leased_capacity = leased_capacity;
        self
    }

    /// 本次回收的容量。
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 租借时的容量。
    pub fn leased_capacity(&self) -> usize {
        self.leased_capacity
    }

    /// 是否夺回了可复用的底层内存。
    pub fn is_reusable(&self) -> bool {
        self.buffer.is_some()
    }

    /// 消耗结构并返回可复用的 `BytesMut`。
    pub fn into_buffer(self) -> Option<BytesMut> {
        self.buffer
    }
}

/// `Lease` 追踪一次租借，并在最后一个视图释放时触发回收。
///
/// # 结构设计（How）
/// - `split_to` 产生的前缀与剩余部分共享同一个 `Arc<Lease>`，引用计数归零即“最后一个持有者”；
/// - `capacity` 随扩容刷新，回收时报告最新值；`leased_capacity` 固定为租借时的容量；
/// - `buffer` 暂存某个视图在 `Drop` 时夺回的 `BytesMut`，交由 `Lease::drop` 一并归还。
struct Lease {
    recycler: Arc<dyn BufferRecycler>,
    leased_capacity: usize,
    capacity: AtomicUsize,
    buffer: Mutex<Option<BytesMut>>,
}

impl Lease {
    fn new(initial_capacity: usize, recycler: Arc<dyn BufferRecycler>) -> Self {
        Self {
            recycler,
            leased_capacity: initial_capacity,
            capacity: AtomicUsize::new(initial_capacity),
            buffer: Mutex::new(None),
        }
    }

    fn update_capacity(&self, new_capacity: usize) {
        self.capacity.store(new_capacity, Ordering::Relaxed);
    }

    /// 保留容量最大的那块内存；拆分出的较小视图让位给原始分配。
    fn store_buffer(&self, buffer: Option<BytesMut>) {
        if let Some(buf) = buffer {
            let mut slot = self.buffer.lock();
            match slot.as_ref() {
                Some(existing) if existing.capacity() >= buf.capacity() => {}
                _ => *slot = Some(buf),
            }
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let capacity = self.capacity.load(Ordering::Relaxed);
        let buffer = self.buffer.lock().take();
        self.recycler.reclaim(
            ReclaimedBuffer::new(capacity, buffer).with_leased_capacity(self.leased_capacity),
        );
    }
}

/// 缓冲当前的读写状态：写态持有 `BytesMut`，冻结后持有 `Bytes`。
#[derive(Debug)]
enum BufferState {
    Writable(BytesMut),
    ReadOnly(Bytes),
}

impl BufferState {
    fn len(&self) -> usize {
        match self {
            BufferState::Writable(buf) => buf.len(),
            BufferState::ReadOnly(bytes) => bytes.len(),
        }
    }

    fn chunk(&self) -> &[u8] {
        match self {
            BufferState::Writable(buf) => buf.as_ref(),
            BufferState::ReadOnly(bytes) => bytes.as_ref(),
        }
    }

    /// 前 `len` 字节拆分为新的只读状态。
    fn split_to(&mut self, len: usize) -> BufferState {
        match self {
            BufferState::Writable(buf) => BufferState::ReadOnly(buf.split_to(len).freeze()),
            BufferState::ReadOnly(bytes) => BufferState::ReadOnly(bytes.split_to(len)),
        }
    }

    fn advance(&mut self, len: usize) {
        match self {
            BufferState::Writable(buf) => buf.advance(len),
            BufferState::ReadOnly(bytes) => bytes.advance(len),
        }
    }

    fn copy_into_slice(&mut self, dst: &mut [u8]) {
        dst.copy_from_slice(&self.chunk()[..dst.len()]);
        self.advance(dst.len());
    }
}

/// `PooledBuffer` 是面向池化场景的缓冲，同时实现读写两套契约。
///
/// # 设计动机（Why）
/// - 步骤先以写态填充输出，再 `freeze` 成只读视图交给下一个步骤；同一类型覆盖两个阶段，
///   无需额外包装；
/// - 借助 `BytesMut`/`Bytes` 的引用计数，`split_to`、`advance` 不复制数据；
/// - 内部 `Lease` 在最后一个视图 `Drop` 时通知池，调用方无需显式释放。
///
/// # 契约说明（What）
/// - `remaining` 始终等于当前可读字节数，`chunk` 返回完整的可读区域；
/// - 冻结后的写操作返回 `buffer.invalid_state`，越界读取返回 `buffer.out_of_range`；
/// - 同一租约无论拆分出多少视图，`reclaim` 恰好调用一次。
pub struct PooledBuffer {
    state: BufferState,
    lease: Arc<Lease>,
}

impl PooledBuffer {
    /// 使用池分配的 `BytesMut` 与回收句柄创建写态缓冲。
    ///
    /// # 前置条件
    /// - `inner` 为独占所有权（新分配或刚从自由链表取出）；
    /// - `recycler` 的生命周期不短于缓冲。
    pub fn new(inner: BytesMut, recycler: Arc<dyn BufferRecycler>) -> Self {
        let lease = Arc::new(Lease::new(inner.capacity(), recycler));
        Self {
            state: BufferState::Writable(inner),
            lease,
        }
    }

    fn from_state(state: BufferState, lease: Arc<Lease>) -> Self {
        Self { state, lease }
    }

    /// 取得写态内部缓冲，冻结后返回 `buffer.invalid_state`。
    fn writable_mut(&mut self, op: &'static str) -> Result<&mut BytesMut> {
        match &mut self.state {
            BufferState::Writable(buf) => Ok(buf),
            BufferState::ReadOnly(_) => Err(CoreError::new(
                codes::BUFFER_INVALID_STATE,
                format!("PooledBuffer is frozen, cannot {op}"),
            )),
        }
    }

    fn ensure_readable(&self, len: usize, op: &'static str) -> Result<()> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(CoreError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!("PooledBuffer::{op} requested {len} bytes but only {remaining} remain"),
            ));
        }
        Ok(())
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        // 尽量夺回底层 `BytesMut` 交给租约；只读态仍有别名时 `try_into_mut` 失败，
        // 此时只上报容量。
        let state = mem::replace(&mut self.state, BufferState::ReadOnly(Bytes::new()));
        let reclaimed = match state {
            BufferState::Writable(mut buf) => {
                buf.clear();
                Some(buf)
            }
            BufferState::ReadOnly(bytes) => bytes.try_into_mut().ok().map(|mut writable| {
                writable.clear();
                writable
            }),
        };
        self.lease.store_buffer(reclaimed);
    }
}

impl ReadableBuffer for PooledBuffer {
    fn remaining(&self) -> usize {
        self.state.len()
    }

    fn chunk(&self) -> &[u8] {
        self.state.chunk()
    }

    fn split_to(&mut self, len: usize) -> Result<Box<ErasedBuf>> {
        self.ensure_readable(len, "split_to")?;
        let split_state = self.state.split_to(len);
        Ok(Box::new(Self::from_state(
            split_state,
            Arc::clone(&self.lease),
        )))
    }

    fn advance(&mut self, len: usize) -> Result<()> {
        self.ensure_readable(len, "advance")?;
        self.state.advance(len);
        Ok(())
    }

    fn copy_into_slice(&mut self, dst: &mut [u8]) -> Result<()> {
        self.ensure_readable(dst.len(), "copy_into_slice")?;
        self.state.copy_into_slice(dst);
        Ok(())
    }

    fn try_into_vec(self: Box<Self>) -> Result<Vec<u8>> {
        Ok(self.state.chunk().to_vec())
    }
}

impl WritableBuffer for PooledBuffer {
    fn capacity(&self) -> usize {
        match &self.state {
            BufferState::Writable(buf) => buf.capacity(),
            BufferState::ReadOnly(bytes) => bytes.len(),
        }
    }

    fn remaining_mut(&self) -> usize {
        match &self.state {
            BufferState::Writable(buf) => buf.capacity().saturating_sub(buf.len()),
            BufferState::ReadOnly(_) => 0,
        }
    }

    fn written(&self) -> usize {
        self.state.len()
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        let buf = self.writable_mut("reserve")?;
        if additional == 0 {
            return Ok(());
        }
        let before = buf.capacity();
        buf.reserve(additional);
        let after = buf.capacity();
        if after != before {
            self.lease.update_capacity(after);
        }
        Ok(())
    }

    fn put_slice(&mut self, src: &[u8]) -> Result<()> {
        let buf = self.writable_mut("put_slice")?;
        if src.is_empty() {
            return Ok(());
        }
        let before = buf.capacity();
        buf.extend_from_slice(src);
        let after = buf.capacity();
        if after != before {
            self.lease.update_capacity(after);
        }
        Ok(())
    }

    fn write_with(
        &mut self,
        max_len: usize,
        fill: &mut dyn FnMut(&mut [u8]) -> Result<usize>,
    ) -> Result<usize> {
        let buf = self.writable_mut("write_with")?;
        let start = buf.len();
        let before = buf.capacity();
        buf.resize(start + max_len, 0);
        let outcome = match fill(&mut buf[start..]) {
            Ok(produced) if produced <= max_len => Ok(produced),
            Ok(produced) => Err(CoreError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!("write_with produced {produced} bytes into a {max_len}-byte window"),
            )),
            Err(err) => Err(err),
        };
        let kept = outcome.as_ref().map_or(0, |produced| *produced);
        buf.truncate(start + kept);
        let after = buf.capacity();
        if after != before {
            self.lease.update_capacity(after);
        }
        outcome
    }

    fn clear(&mut self) {
        if let BufferState::Writable(buf) = &mut self.state {
            buf.clear();
        }
    }

    fn freeze(mut self: Box<Self>) -> Result<Box<ErasedBuf>> {
        if let BufferState::Writable(buf) = &mut self.state {
            let frozen = mem::take(buf).freeze();
            self.state = BufferState::ReadOnly(frozen);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Discard;

    impl BufferRecycler for Discard {
        fn reclaim(&self, _reclaimed: ReclaimedBuffer) {}
    }

    fn writable(capacity: usize) -> PooledBuffer {
        PooledBuffer::new(BytesMut::with_capacity(capacity), Arc::new(Discard))
    }

    #[test]
    fn write_with_keeps_only_reported_bytes() {
        let mut buffer = writable(4);
        buffer.put_slice(b"ab").expect("写入前缀");
        let produced = buffer
            .write_with(16, &mut |window| {
                assert_eq!(window.len(), 16);
                assert!(window.iter().all(|b| *b == 0), "暴露区域应已清零");
                window[..3].copy_from_slice(b"xyz");
                Ok(3)
            })
            .expect("回调成功时应推进写游标");
        assert_eq!(produced, 3);
        assert_eq!(buffer.chunk(), b"abxyz");
    }

    #[test]
    fn write_with_discards_window_on_error() {
        let mut buffer = writable(8);
        buffer.put_slice(b"ab").expect("写入前缀");
        let err = buffer
            .write_with(8, &mut |window| {
                window[0] = 0xFF;
                Err(CoreError::new(codes::PIPELINE_FORMAT, "boom"))
            })
            .expect_err("回调失败应原样返回");
        assert_eq!(err.code(), codes::PIPELINE_FORMAT);
        assert_eq!(buffer.chunk(), b"ab");

        let err = buffer
            .write_with(2, &mut |_| Ok(3))
            .expect_err("超出窗口的产出应被拒绝");
        assert_eq!(err.code(), codes::BUFFER_OUT_OF_RANGE);
        assert_eq!(buffer.written(), 2);
    }

    #[test]
    fn frozen_buffer_rejects_writes() {
        let mut buffer = writable(4);
        buffer.put_slice(b"x").expect("写入");
        let frozen = Box::new(buffer).freeze().expect("冻结");
        assert_eq!(frozen.chunk(), b"x");

        let mut state = PooledBuffer::from_state(
            BufferState::ReadOnly(Bytes::from_static(b"x")),
            Arc::new(Lease::new(1, Arc::new(Discard))),
        );
        let err = state.put_slice(b"y").expect_err("只读态写入应失败");
        assert_eq!(err.code(), codes::BUFFER_INVALID_STATE);
    }
}
