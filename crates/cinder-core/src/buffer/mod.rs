//! 缓冲区契约模块。
//!
//! # 模块架构（Why）
//! - 流水线的每个步骤都以“消费一个缓冲、产出一个新缓冲”的方式工作，因此需要一套与具体内存策略
//!   无关的读写契约，让压缩等步骤不必关心缓冲来自池还是堆。
//! - 释放即 `Drop`：缓冲以值（`Box`）的形式在步骤间移动，所有权转移即责任转移，
//!   任何退出路径（包括错误路径）都由编译器保证恰好释放一次。
//!
//! # 设计总览（How）
//! - [`readable`] 定义只读缓冲协议：读游标、整体可读区域、头部整数读取；
//! - [`writable`] 定义可写缓冲协议：追加写入、按实际产出推进写游标、冻结为只读；
//! - [`pool`] 约束缓冲池与分配器接口，并提供带独立游标的复制能力。

pub mod pool;
pub mod readable;
pub mod writable;

pub use pool::{BufferAllocator, BufferPool, PoolStatDimension, PoolStats};
pub use readable::{ErasedBuf, ReadableBuffer};
pub use writable::{ErasedBufMut, WritableBuffer};
