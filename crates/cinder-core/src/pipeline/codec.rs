use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::{PipelineStep, StepRegistry};
use crate::buffer::ErasedBuf;
use crate::codec::encoder::check_frame_len;
use crate::codec::{
    Codec, CodecDescriptor, CodecRole, DecodeContext, Decoder, EncodeContext, EncodedPayload,
    Encoder,
};
use crate::config::PipelineConfig;
use crate::{CoreError, Result};

/// `PipelineCodec` 把有序的字节变换串联在一个内层编解码器外面。
///
/// # 设计背景（Why）
/// - 缓存客户端期待的是一个普通的值编解码器；流水线实现同一个 [`Codec`] 契约，
///   因此可以在任何需要值编解码器的地方直接替换内层实现。
/// - 流水线对内容不做假设，值、映射键、映射值三种角色统一映射到同一对编码/解码实现。
///
/// # 逻辑解析（How）
/// - 编码：内层值编码器 → 按配置顺序依次调用每个步骤的 `write`，上一步的输出即下一步的输入；
/// - 解码：先复制调用方的缓冲，再按 **相反** 顺序调用每个步骤的 `read`，最后交给内层值解码器；
/// - 步骤序列在构造时固定为 `Arc<[...]>`，之后不再变更，并发调用无需加锁。
///
/// # 契约说明（What）
/// - 对于步骤 `[S1..Sn]` 与内层能表示的任意值 `v`：`decode(encode(v)) == v`；
/// - 空步骤序列退化为直通；
/// - 任一步骤失败都会中止剩余链路并原样向上传播，不重试、不返回部分结果；
///   失败前已经分配的缓冲在错误到达调用方之前均已释放。
pub struct PipelineCodec<C> {
    inner: C,
    steps: Arc<[Arc<dyn PipelineStep>]>,
    max_frame_size: Option<usize>,
}

impl<C: Codec> PipelineCodec<C> {
    /// 以给定步骤顺序（即写出顺序）包装内层编解码器。
    pub fn new(steps: impl IntoIterator<Item = Arc<dyn PipelineStep>>, inner: C) -> Self {
        Self {
            inner,
            steps: steps.into_iter().collect(),
            max_frame_size: None,
        }
    }

    /// 以链式方式逐个追加步骤。
    pub fn builder(inner: C) -> PipelineCodecBuilder<C> {
        PipelineCodecBuilder {
            inner,
            steps: Vec::new(),
            max_frame_size: None,
        }
    }

    /// 按声明式配置装配流水线。
    ///
    /// 每个 `[[steps]]` 条目交给注册表中同名工厂构造；任一条目无法解析则整体失败，
    /// 返回 `config.invalid`。
    pub fn from_config(inner: C, config: &PipelineConfig, registry: &StepRegistry) -> Result<Self> {
        let steps = config
            .steps
            .iter()
            .map(|spec| registry.resolve(spec))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            steps = steps.len(),
            max_frame_size = ?config.max_frame_size,
            "pipeline codec assembled from configuration"
        );
        Ok(Self {
            inner,
            steps: steps.into(),
            max_frame_size: config.max_frame_size,
        })
    }

    /// 按写出顺序排列的步骤。
    pub fn steps(&self) -> &[Arc<dyn PipelineStep>] {
        &self.steps
    }

    /// 被包装的内层编解码器。
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// 流水线级别的帧长上限。
    pub fn max_frame_size(&self) -> Option<usize> {
        self.max_frame_size
    }

    pub fn value_encoder(&self) -> &dyn Encoder<Item = C::Value> {
        self
    }

    pub fn value_decoder(&self) -> &dyn Decoder<Item = C::Value> {
        self
    }

    pub fn map_key_encoder(&self) -> &dyn Encoder<Item = C::Value> {
        self.value_encoder()
    }

    pub fn map_key_decoder(&self) -> &dyn Decoder<Item = C::Value> {
        self.value_decoder()
    }

    pub fn map_value_encoder(&self) -> &dyn Encoder<Item = C::Value> {
        self.value_encoder()
    }

    pub fn map_value_decoder(&self) -> &dyn Decoder<Item = C::Value> {
        self.value_decoder()
    }

    fn check_frame(&self, frame_len: usize) -> Result<()> {
        check_frame_len(self.max_frame_size, frame_len, "pipeline")
    }
}

impl<C: Codec> Encoder for PipelineCodec<C> {
    type Item = C::Value;

    fn encode(&self, item: &C::Value, ctx: &mut EncodeContext<'_>) -> Result<EncodedPayload> {
        let payload = self.inner.encoder(CodecRole::Value).encode(item, ctx)?;
        let mut buffer = payload.into_buffer();
        for (index, step) in self.steps.iter().enumerate() {
            let input_len = buffer.remaining();
            buffer = step
                .write(buffer, ctx.allocator())
                .inspect_err(|err| report_step_failure(&**step, index, "write", err))?;
            trace!(
                step = step.name(),
                index,
                input_len,
                output_len = buffer.remaining(),
                "applied pipeline write step"
            );
        }

        // 超限时 `buffer` 随错误返回一起释放。
        let frame_len = buffer.remaining();
        self.check_frame(frame_len)?;
        ctx.check_frame_constraints(frame_len)?;
        Ok(EncodedPayload::from_buffer(buffer))
    }
}

impl<C: Codec> Decoder for PipelineCodec<C> {
    type Item = C::Value;

    fn decode(&self, src: &mut ErasedBuf, ctx: &mut DecodeContext<'_>) -> Result<C::Value> {
        let wire_len = src.remaining();
        self.check_frame(wire_len)?;
        ctx.check_frame_constraints(wire_len)?;

        // 步骤会消费并释放自己的输入；调用方保留 `src` 的所有权，
        // 因此链路必须在一份游标独立的副本上运行。
        let mut buffer = ctx.allocator().duplicate(src)?;
        for (index, step) in self.steps.iter().enumerate().rev() {
            let input_len = buffer.remaining();
            buffer = step
                .read(buffer, ctx.allocator())
                .inspect_err(|err| report_step_failure(&**step, index, "read", err))?;
            trace!(
                step = step.name(),
                index,
                input_len,
                output_len = buffer.remaining(),
                "applied pipeline read step"
            );
        }

        self.inner
            .decoder(CodecRole::Value)
            .decode(&mut *buffer, ctx)
    }
}

impl<C: Codec> Codec for PipelineCodec<C> {
    type Value = C::Value;

    /// 类型解析信息与流水线无关，原样透传内层描述符。
    fn descriptor(&self) -> &CodecDescriptor {
        self.inner.descriptor()
    }

    fn encoder(&self, _role: CodecRole) -> &dyn Encoder<Item = C::Value> {
        self
    }

    fn decoder(&self, _role: CodecRole) -> &dyn Decoder<Item = C::Value> {
        self
    }
}

impl<C: Clone> Clone for PipelineCodec<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            steps: Arc::clone(&self.steps),
            max_frame_size: self.max_frame_size,
        }
    }
}

impl<C> fmt::Debug for PipelineCodec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineCodec")
            .field(
                "steps",
                &self.steps.iter().map(|step| step.name()).collect::<Vec<_>>(),
            )
            .field("max_frame_size", &self.max_frame_size)
            .finish_non_exhaustive()
    }
}

fn report_step_failure(step: &dyn PipelineStep, index: usize, direction: &str, err: &CoreError) {
    debug!(
        step = step.name(),
        index,
        direction,
        code = err.code(),
        error = %err,
        "pipeline step failed, aborting chain"
    );
}

/// [`PipelineCodec`] 的构建器，步骤按追加顺序成为写出顺序。
pub struct PipelineCodecBuilder<C> {
    inner: C,
    steps: Vec<Arc<dyn PipelineStep>>,
    max_frame_size: Option<usize>,
}

impl<C: Codec> PipelineCodecBuilder<C> {
    /// 追加一个步骤。
    pub fn step(mut self, step: impl PipelineStep) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// 追加一个已共享的步骤实例。
    pub fn shared_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// 设置流水线级别的帧长上限。
    pub fn max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = Some(limit);
        self
    }

    pub fn build(self) -> PipelineCodec<C> {
        PipelineCodec {
            inner: self.inner,
            steps: self.steps.into(),
            max_frame_size: self.max_frame_size,
        }
    }
}
