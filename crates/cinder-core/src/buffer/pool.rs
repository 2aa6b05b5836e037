use std::borrow::Cow;

use crate::Result;

use super::{ErasedBuf, ErasedBufMut};

/// `BufferAllocator` 是流水线步骤唯一需要的分配入口。
///
/// # 设计背景（Why）
/// - 步骤只需要“按容量租借一块可写缓冲”，不需要了解池的统计或收缩能力；
///   把分配入口单独抽出，测试可以用最小实现替换真实池。
///
/// # 契约说明（What）
/// - `acquire(min_capacity)` 成功时返回 `remaining_mut() >= min_capacity` 的可写缓冲；
/// - 无法满足容量时返回 `buffer.allocation`，不得退而返回更小的缓冲；
/// - 实现必须线程安全，多个调用方可以并发租借。
pub trait BufferAllocator: Send + Sync {
    /// 租借一块满足最小容量的可写缓冲。
    fn acquire(&self, min_capacity: usize) -> Result<Box<ErasedBufMut>>;

    /// 复制 `src` 的全部剩余字节到新租借的缓冲，返回游标独立的只读副本。
    ///
    /// 副本与原缓冲不共享任何状态：之后对副本的推进、拆分或释放都不会影响 `src`。
    fn duplicate(&self, src: &ErasedBuf) -> Result<Box<ErasedBuf>> {
        let mut copy = self.acquire(src.remaining())?;
        copy.put_slice(src.chunk())?;
        copy.freeze()
    }
}

/// `BufferPool` 在分配之上补充收缩与统计能力。
pub trait BufferPool: BufferAllocator + 'static {
    /// 释放池内缓存的空闲容量，返回回收的字节数。
    fn shrink_to_fit(&self) -> Result<usize>;

    /// 返回池的统计快照。
    fn statistics(&self) -> Result<PoolStats>;
}

/// 缓冲池统计快照。
///
/// # 契约说明（What）
/// - `active_leases`：尚未归还的租约数；流水线一次调用结束后应回到调用前的值，
///   据此可以观察“每个缓冲恰好释放一次”；
/// - `failed_acquisitions`：因容量上限被拒绝的租借次数；
/// - `custom_dimensions`：实现自定义的附加计数。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub allocated_bytes: usize,
    pub resident_bytes: usize,
    pub active_leases: usize,
    pub available_bytes: usize,
    pub failed_acquisitions: u64,
    pub custom_dimensions: Vec<PoolStatDimension>,
}

impl PoolStats {
    /// 按名称查找自定义维度，不存在时返回 0。
    pub fn dimension(&self, key: &str) -> usize {
        self.custom_dimensions
            .iter()
            .find(|dim| dim.key == key)
            .map(|dim| dim.value)
            .unwrap_or_default()
    }
}

/// 命名的附加统计项。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolStatDimension {
    pub key: Cow<'static, str>,
    pub value: usize,
}
