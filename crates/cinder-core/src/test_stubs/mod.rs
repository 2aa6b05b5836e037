//! 流水线契约测试使用的桩实现。
//!
//! # 设计定位（Why）
//! - 流水线的正确性只取决于“步骤顺序”与“缓冲释放”，用可读的标记步骤就能直接观察顺序，
//!   不必依赖压缩这种输出不可读的变换；
//! - [`FailingStep`] 记录调用次数，用来断言失败之后剩余链路确实没有被执行。
//!
//! # 契约说明（What）
//! - 所有桩都满足生产契约（`Send + Sync + 'static`），可以在多线程测试中共享；
//! - 桩只用于测试与示例，生产代码不应依赖。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::buffer::{BufferAllocator, ErasedBuf};
use crate::codec::{
    Codec, CodecDescriptor, CodecRole, ContentEncoding, ContentType, DecodeContext, Decoder,
    EncodeContext, EncodedPayload, Encoder,
};
use crate::error::codes;
use crate::pipeline::{PipelineStep, StepFactory};
use crate::{CoreError, Result};

/// 以 UTF-8 编码 `String` 的内层编解码器。
#[derive(Clone, Debug)]
pub struct Utf8StringCodec {
    descriptor: CodecDescriptor,
}

impl Utf8StringCodec {
    pub fn new() -> Self {
        Self {
            descriptor: CodecDescriptor::new(
                ContentType::new("text/plain; charset=utf-8"),
                ContentEncoding::identity(),
            ),
        }
    }
}

impl Default for Utf8StringCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for Utf8StringCodec {
    type Item = String;

    fn encode(&self, item: &String, ctx: &mut EncodeContext<'_>) -> Result<EncodedPayload> {
        let mut buffer = ctx.acquire_buffer(item.len())?;
        buffer.put_slice(item.as_bytes())?;
        Ok(EncodedPayload::from_buffer(buffer.freeze()?))
    }
}

impl Decoder for Utf8StringCodec {
    type Item = String;

    fn decode(&self, src: &mut ErasedBuf, _ctx: &mut DecodeContext<'_>) -> Result<String> {
        let text = std::str::from_utf8(src.chunk())
            .map_err(|err| {
                CoreError::new(codes::CODEC_INNER, "payload is not valid UTF-8").with_cause(err)
            })?
            .to_owned();
        src.advance(text.len())?;
        Ok(text)
    }
}

impl Codec for Utf8StringCodec {
    type Value = String;

    fn descriptor(&self) -> &CodecDescriptor {
        &self.descriptor
    }

    fn encoder(&self, _role: CodecRole) -> &dyn Encoder<Item = String> {
        self
    }

    fn decoder(&self, _role: CodecRole) -> &dyn Decoder<Item = String> {
        self
    }
}

/// 写出时在尾部追加固定标记，读取时校验并剥离该标记。
///
/// 两个不同标记的步骤串联后，线上字节直接呈现写出顺序，例如 `payload + "X" + "Y"`。
/// 读取时若尾部不是本步骤的标记，返回 `pipeline.format`。
#[derive(Clone, Debug)]
pub struct TagStep {
    name: String,
    tag: Vec<u8>,
}

impl TagStep {
    pub fn new(tag: impl AsRef<[u8]>) -> Self {
        let tag = tag.as_ref().to_vec();
        Self {
            name: format!("tag:{}", String::from_utf8_lossy(&tag)),
            tag,
        }
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }
}

impl PipelineStep for TagStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(
        &self,
        input: Box<ErasedBuf>,
        allocator: &dyn BufferAllocator,
    ) -> Result<Box<ErasedBuf>> {
        let mut output = allocator.acquire(input.remaining() + self.tag.len())?;
        output.put_slice(input.chunk())?;
        output.put_slice(&self.tag)?;
        output.freeze()
    }

    fn read(
        &self,
        input: Box<ErasedBuf>,
        allocator: &dyn BufferAllocator,
    ) -> Result<Box<ErasedBuf>> {
        let bytes = input.chunk();
        let Some(body) = bytes.strip_suffix(self.tag.as_slice()) else {
            return Err(CoreError::new(
                codes::PIPELINE_FORMAT,
                format!("payload does not end with tag of step `{}`", self.name),
            ));
        };
        let mut output = allocator.acquire(body.len())?;
        output.put_slice(body)?;
        output.freeze()
    }
}

/// 由 `kind = "tag"` 条目构造 [`TagStep`]，选项 `tag` 为必填字符串。
#[derive(Clone, Copy, Debug, Default)]
pub struct TagStepFactory;

impl StepFactory for TagStepFactory {
    fn kind(&self) -> &'static str {
        "tag"
    }

    fn build(&self, options: &toml::Table) -> Result<Arc<dyn PipelineStep>> {
        let tag = options
            .get("tag")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                CoreError::new(codes::CONFIG_INVALID, "tag step requires a string `tag` option")
            })?;
        Ok(Arc::new(TagStep::new(tag)))
    }
}

/// 无论方向都以给定错误码失败的步骤，并记录被调用的次数。
#[derive(Debug)]
pub struct FailingStep {
    code: &'static str,
    calls: AtomicUsize,
}

impl FailingStep {
    pub fn new(code: &'static str) -> Self {
        Self {
            code,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self, direction: &str) -> Result<Box<ErasedBuf>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::new(
            self.code,
            format!("failing step rejected {direction}"),
        ))
    }
}

impl PipelineStep for FailingStep {
    fn name(&self) -> &str {
        "failing"
    }

    fn write(
        &self,
        _input: Box<ErasedBuf>,
        _allocator: &dyn BufferAllocator,
    ) -> Result<Box<ErasedBuf>> {
        self.fail("write")
    }

    fn read(
        &self,
        _input: Box<ErasedBuf>,
        _allocator: &dyn BufferAllocator,
    ) -> Result<Box<ErasedBuf>> {
        self.fail("read")
    }
}
