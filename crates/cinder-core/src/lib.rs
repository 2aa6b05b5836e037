#![deny(unsafe_code)]
#![doc = "cinder-core: 缓存值编解码流水线的核心契约。"]
#![doc = ""]
#![doc = "== 分层 =="]
#![doc = "1. `buffer`：与内存策略无关的读写缓冲契约与分配器接口；"]
#![doc = "2. `codec`：值编解码器契约，流水线与内层编解码器共用；"]
#![doc = "3. `pipeline`：可逆字节变换步骤及其串联器 `PipelineCodec`；"]
#![doc = "4. `config`：声明式装配流水线所需的配置结构。"]
#![doc = ""]
#![doc = "具体的池化缓冲见 `cinder-buffer`，LZ4 压缩步骤见 `cinder-codec-lz4`。"]

pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod pipeline;
/// 测试桩命名空间，集中提供流水线契约测试复用的编解码器与步骤。
///
/// # 设计背景（Why）
/// - 各 crate 的契约测试都需要一个“内层编解码器”与若干可观察的步骤；
///   单点维护避免在每个测试文件里重复定义。
///
/// # 使用方式（How）
/// - `use cinder_core::test_stubs::{Utf8StringCodec, TagStep, FailingStep};`
pub mod test_stubs;

pub use buffer::{
    BufferAllocator, BufferPool, ErasedBuf, ErasedBufMut, PoolStatDimension, PoolStats,
    ReadableBuffer, WritableBuffer,
};
pub use codec::{
    BytesCodec, Codec, CodecDescriptor, CodecRole, ContentEncoding, ContentType, DecodeContext,
    Decoder, EncodeContext, EncodedPayload, Encoder,
};
pub use config::{PipelineConfig, StepSpec};
pub use error::{CoreError, ErrorCause, ErrorKind, Result};
pub use pipeline::{PipelineCodec, PipelineCodecBuilder, PipelineStep, StepFactory, StepRegistry};
