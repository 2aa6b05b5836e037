use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use bytes::BytesMut;
use cinder_core::{
    CoreError, Result,
    buffer::{
        BufferAllocator, BufferPool, ErasedBuf, ErasedBufMut, PoolStatDimension, PoolStats,
        WritableBuffer,
    },
    error::codes,
};
use serde::Deserialize;
use spin::Mutex;
use tracing::{debug, trace};

use crate::pooled_buffer::{BufferRecycler, PooledBuffer, ReclaimedBuffer};

/// 自由链表默认最多缓存的空闲块数量。
pub const DEFAULT_MAX_CACHED_BUFFERS: usize = 64;

/// [`SlabBufferPool`] 的配置。
///
/// ```toml
/// max_lease_bytes = 16777216
/// max_cached_buffers = 32
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// 单次租借的容量上限；超过时租借失败并返回 `buffer.allocation`，不会退而分配更小的块。
    pub max_lease_bytes: Option<usize>,
    /// 自由链表最多保留的空闲块数，超出的回收块直接释放。
    pub max_cached_buffers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_lease_bytes: None,
            max_cached_buffers: DEFAULT_MAX_CACHED_BUFFERS,
        }
    }
}

/// `SlabBufferPool` 是基于自由链表的缓冲池，复用 `BytesMut` 以减少堆分配。
///
/// # 模块角色（Why）
/// - 作为流水线步骤的默认分配器：压缩/解压每一步都要申请新的输出缓冲，复用内存块能显著降低抖动；
/// - 借助 [`PooledBuffer`] 的 `Drop` 钩子自动回收，步骤无需显式释放；
/// - 统计快照把“每个缓冲恰好释放一次”变成可观测的事实：一次完整的编码或解码结束后，
///   `active_leases` 必然回到调用前的值。
///
/// # 核心机制（How）
/// - `spin::Mutex<Vec<BytesMut>>` 作为自由链表，租借时优先复用容量足够的块；
/// - `PoolMetrics` 用原子计数跟踪字节、租约与命中情况；
/// - `BufferRecycler` 实现把夺回的 `BytesMut` 放回链表，链表满或无法夺回时只更新统计。
///
/// # 契约说明（What）
/// - **线程安全**：共享状态由自旋锁与原子计数保护，池可以被任意线程并发使用；
/// - **后置条件**：`alloc_writable(n)` 返回的缓冲满足 `remaining_mut() >= n`；
///   超过 `max_lease_bytes` 的请求返回 `buffer.allocation` 并累加 `failed_acquisitions`。
///
/// # 设计权衡（Trade-offs）
/// - 自旋锁临界区只有链表的一次查找与交换，竞争窗口很短；
/// - `shrink_to_fit` 直接清空自由链表，便于在峰值过后归还内存。
#[derive(Clone)]
pub struct SlabBufferPool {
    inner: Arc<PoolInner>,
}

impl Default for SlabBufferPool {
    fn default() -> Self {
        Self::with_config(PoolConfig::default())
    }
}

impl SlabBufferPool {
    /// 使用默认配置创建空池。
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner::new(config)),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// 分配并填充一个只读缓冲，`remaining()` 等于 `data.len()`。
    pub fn alloc_readable(&self, data: &[u8]) -> Result<Box<ErasedBuf>> {
        let mut writable = Box::new(self.allocate_pooled(data.len())?);
        writable.put_slice(data)?;
        writable.freeze()
    }

    /// 分配一个至少能写入 `min_capacity` 字节的缓冲。
    pub fn alloc_writable(&self, min_capacity: usize) -> Result<Box<ErasedBufMut>> {
        Ok(Box::new(self.allocate_pooled(min_capacity)?))
    }

    /// 当前统计快照；与 [`BufferPool::statistics`] 等价，但不经过 `Result`。
    pub fn stats(&self) -> PoolStats {
        self.inner.snapshot()
    }

    fn allocate_pooled(&self, min_capacity: usize) -> Result<PooledBuffer> {
        let raw = self.inner.acquire_buffer(min_capacity)?;
        let recycler: Arc<dyn BufferRecycler> = self.inner.clone();
        Ok(PooledBuffer::new(raw, recycler))
    }
}

impl BufferAllocator for SlabBufferPool {
    fn acquire(&self, min_capacity: usize) -> Result<Box<ErasedBufMut>> {
        self.alloc_writable(min_capacity)
    }
}

impl BufferPool for SlabBufferPool {
    fn shrink_to_fit(&self) -> Result<usize> {
        Ok(self.inner.shrink_free_list())
    }

    fn statistics(&self) -> Result<PoolStats> {
        Ok(self.inner.snapshot())
    }
}

impl std::fmt::Debug for SlabBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlabBufferPool")
            .field("config", &self.inner.config)
            .field("stats", &self.inner.snapshot())
            .finish()
    }
}

struct PoolInner {
    config: PoolConfig,
    free_list: Mutex<Vec<BytesMut>>,
    metrics: PoolMetrics,
}

impl PoolInner {
    fn new(config: PoolConfig) -> Self {
        Self {
            config,
            free_list: Mutex::new(Vec::new()),
            metrics: PoolMetrics::default(),
        }
    }

    /// 从自由链表或堆上获取一个满足容量的 `BytesMut`。
    fn acquire_buffer(&self, min_capacity: usize) -> Result<BytesMut> {
        if let Some(limit) = self.config.max_lease_bytes
            && min_capacity > limit
        {
            self.metrics
                .failed_acquisitions
                .fetch_add(1, Ordering::Relaxed);
            debug!(
                requested = min_capacity,
                limit, "buffer acquisition rejected by lease limit"
            );
            return Err(CoreError::new(
                codes::BUFFER_ALLOCATION,
                format!("requested {min_capacity} bytes exceeds lease limit of {limit} bytes"),
            ));
        }

        // 最佳适配：取满足容量的最小块，大块留给大请求。
        let reused = {
            let mut list = self.free_list.lock();
            list.iter()
                .enumerate()
                .filter(|(_, buf)| buf.capacity() >= min_capacity)
                .min_by_key(|(_, buf)| buf.capacity())
                .map(|(index, _)| index)
                .map(|index| list.swap_remove(index))
        };

        let mut buffer = match reused {
            Some(buf) => {
                self.metrics.decrease_available(buf.capacity());
                buf
            }
            None => {
                let buf = BytesMut::with_capacity(min_capacity);
                self.metrics.increase_on_new_allocation(buf.capacity());
                buf
            }
        };
        buffer.clear();
        self.metrics.increase_active_leases();
        Ok(buffer)
    }

    fn shrink_free_list(&self) -> usize {
        let mut list = self.free_list.lock();
        let reclaimed: usize = list.iter().map(BytesMut::capacity).sum();
        let slots = list.len();
        list.clear();
        self.metrics.decrease_on_shrink(reclaimed);
        trace!(slots, bytes = reclaimed, "slab free list drained");
        reclaimed
    }

    fn snapshot(&self) -> PoolStats {
        let free_slots = self.free_list.lock().len();
        let metrics = &self.metrics;
        PoolStats {
            allocated_bytes: metrics.allocated_bytes.load(Ordering::Relaxed),
            resident_bytes: metrics.resident_bytes.load(Ordering::Relaxed),
            active_leases: metrics.active_leases.load(Ordering::Relaxed),
            available_bytes: metrics.available_bytes.load(Ordering::Relaxed),
            failed_acquisitions: metrics.failed_acquisitions.load(Ordering::Relaxed),
            custom_dimensions: vec![
                dimension("slab_free_slots", free_slots),
                dimension(
                    "total_allocated",
                    metrics.total_allocated.load(Ordering::Relaxed),
                ),
                dimension(
                    "total_recycled",
                    metrics.total_recycled.load(Ordering::Relaxed),
                ),
                dimension("pool_misses", metrics.pool_misses.load(Ordering::Relaxed)),
            ],
        }
    }
}

fn dimension(key: &'static str, value: usize) -> PoolStatDimension {
    PoolStatDimension {
        key: Cow::Borrowed(key),
        value,
    }
}

impl BufferRecycler for PoolInner {
    fn reclaim(&self, reclaimed: ReclaimedBuffer) {
        self.metrics.decrease_active_leases();
        self.metrics.total_recycled.fetch_add(1, Ordering::Relaxed);
        // 统计在租借时按 `leased_capacity` 计入，回收时以同一数值扣除。
        let leased = reclaimed.leased_capacity();
        let Some(mut buf) = reclaimed.into_buffer() else {
            self.metrics.decrease_on_loss(leased);
            return;
        };

        let mut list = self.free_list.lock();
        if list.len() >= self.config.max_cached_buffers {
            drop(list);
            self.metrics.decrease_on_loss(leased);
            return;
        }
        buf.clear();
        let cached = buf.capacity();
        self.metrics.rebase(leased, cached);
        self.metrics.increase_available(cached);
        list.push(buf);
    }
}

#[derive(Default)]
struct PoolMetrics {
    allocated_bytes: AtomicUsize,
    resident_bytes: AtomicUsize,
    available_bytes: AtomicUsize,
    active_leases: AtomicUsize,
    failed_acquisitions: AtomicU64,
    total_allocated: AtomicUsize,
    total_recycled: AtomicUsize,
    pool_misses: AtomicUsize,
}

impl PoolMetrics {
    fn increase_on_new_allocation(&self, capacity: usize) {
        self.allocated_bytes.fetch_add(capacity, Ordering::Relaxed);
        self.resident_bytes.fetch_add(capacity, Ordering::Relaxed);
        self.pool_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn increase_available(&self, capacity: usize) {
        self.available_bytes.fetch_add(capacity, Ordering::Relaxed);
    }

    fn decrease_available(&self, capacity: usize) {
        saturating_sub(&self.available_bytes, capacity);
    }

    fn decrease_on_loss(&self, capacity: usize) {
        saturating_sub(&self.allocated_bytes, capacity);
        saturating_sub(&self.resident_bytes, capacity);
    }

    /// 夺回的块容量可能因扩容或 `advance` 与租借时不同，驻留统计改按实际容量记账。
    fn rebase(&self, leased: usize, actual: usize) {
        self.decrease_on_loss(leased);
        self.allocated_bytes.fetch_add(actual, Ordering::Relaxed);
        self.resident_bytes.fetch_add(actual, Ordering::Relaxed);
    }

    fn decrease_on_shrink(&self, capacity: usize) {
        self.decrease_available(capacity);
        self.decrease_on_loss(capacity);
    }

    fn increase_active_leases(&self) {
        self.active_leases.fetch_add(1, Ordering::Relaxed);
        self.total_allocated.fetch_add(1, Ordering::Relaxed);
    }

    fn decrease_active_leases(&self) {
        saturating_sub(&self.active_leases, 1);
    }
}

fn saturating_sub(target: &AtomicUsize, value: usize) {
    let _ = target.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(value))
    });
}
