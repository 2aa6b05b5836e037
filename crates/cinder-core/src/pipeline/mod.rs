//! 字节变换流水线。
//!
//! # 模块定位（Why）
//! - 值先由内层编解码器序列化，再依次经过若干可逆字节变换写出；读取时按相反顺序撤销变换，
//!   最后交给内层解码。最后施加的变换必须最先撤销，这一顺序就是整个正确性契约。
//!
//! # 组成（How）
//! - [`PipelineStep`]：单个可逆变换；
//! - [`PipelineCodec`]：按固定顺序串联步骤并包装内层编解码器，本身也是一个 [`Codec`](crate::codec::Codec)；
//! - [`StepRegistry`]/[`StepFactory`]：由声明式配置装配步骤。

mod codec;
mod registry;
mod step;

pub use codec::{PipelineCodec, PipelineCodecBuilder};
pub use registry::{StepFactory, StepRegistry};
pub use step::PipelineStep;
