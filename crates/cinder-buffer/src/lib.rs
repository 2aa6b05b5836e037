//! `cinder-buffer` 提供面向 `cinder-core` 缓冲契约的池化实现。
//!
//! # 模块定位（Why）
//! - `cinder-core` 只定义读写缓冲与分配器接口，本 crate 给出基于 `bytes::BytesMut` 的落地实现，
//!   流水线步骤借此获得可复用的输出缓冲；
//! - 租约统计让“每个缓冲恰好释放一次”在测试与运行期都可以被观测。
//!
//! # 设计概要（How）
//! - `pooled_buffer` 实现 [`PooledBuffer`]：写态持有 `BytesMut`，冻结后持有 `Bytes`，
//!   所有视图共享一个租约，最后一个视图释放时通过 [`BufferRecycler`] 通知池；
//! - `pool` 实现 [`SlabBufferPool`]：自由链表 + 原子统计，可由 [`PoolConfig`] 限制单次租借上限
//!   与缓存块数量。

#![deny(unsafe_code)]

mod pool;
mod pooled_buffer;

pub use pool::{DEFAULT_MAX_CACHED_BUFFERS, PoolConfig, SlabBufferPool};
pub use pooled_buffer::{BufferRecycler, PooledBuffer, ReclaimedBuffer};
