use std::sync::Arc;

use cinder_core::buffer::{BufferAllocator, ErasedBuf};
use cinder_core::error::codes;
use cinder_core::pipeline::{PipelineStep, StepFactory, StepRegistry};
use cinder_core::{CoreError, Result};
use lz4_flex::block;
use serde::Deserialize;
use tracing::trace;

use crate::error::CompressionError;

/// 长度头部的字节数：`u32` 大端序，记录压缩前的原始长度。
pub const HEADER_LEN: usize = 4;

/// LZ4 块的最大膨胀比：每个长度扩展字节最多还原 255 个字节。
const MAX_BLOCK_EXPANSION: usize = 255;

/// 膨胀比之外，任意块还可能额外还原的常数字节（末尾字面量与最短匹配）。
const BLOCK_EXPANSION_SLACK: usize = 16;

/// `compressed_len` 字节的 LZ4 块最多能还原出的字节数。
pub fn max_decompressed_len_for(compressed_len: usize) -> usize {
    compressed_len
        .saturating_mul(MAX_BLOCK_EXPANSION)
        .saturating_add(BLOCK_EXPANSION_SLACK)
}

/// 注册到 [`StepRegistry`] 时使用的步骤类型名。
pub const STEP_KIND: &str = "lz4";

/// `CompressionStep` 以 LZ4 块格式压缩整段载荷，并在前面写入原始长度。
///
/// # 线上格式（What）
/// ```text
/// [0..4)   u32 大端序，压缩前的载荷长度
/// [4..end) LZ4 块（无额外分帧）
/// ```
///
/// # 逻辑解析（How）
/// - 写出：按 `get_maximum_output_size(n)` 预留上界，先写头部，再把整段可读区域压缩进剩余空间，
///   写游标只推进实际产出的字节数；
/// - 读取：读出头部声明的长度，先与压缩块的最大膨胀长度比对，再按该长度精确申请输出缓冲，
///   用带边界检查的解压器还原，产出字节数必须与声明一致；
/// - 两个方向都会消费输入缓冲：输入在任何退出路径上都随作用域结束而释放。
///
/// # 契约说明（What）
/// - 无内部可变状态，同一实例可被任意多个流水线与线程共享；
/// - 头部截断、块损坏、长度不一致均返回 `pipeline.format`；
/// - 声明长度超过 [`max_decompressed_len_for`] 给出的膨胀上界时，在分配前以 `pipeline.format` 拒绝；
/// - 配置了 `max_decompressed_len` 时，超限的声明长度在分配前以 `buffer.allocation` 拒绝。
#[derive(Clone, Debug, Default)]
pub struct CompressionStep {
    max_decompressed_len: Option<usize>,
}

impl CompressionStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// 限制头部可声明的最大原始长度，防止恶意头部触发超大分配。
    pub fn with_max_decompressed_len(limit: usize) -> Self {
        Self {
            max_decompressed_len: Some(limit),
        }
    }

    pub fn max_decompressed_len(&self) -> Option<usize> {
        self.max_decompressed_len
    }

    fn check_declared_len(
        &self,
        declared: usize,
        compressed: usize,
    ) -> Result<(), CompressionError> {
        let bound = max_decompressed_len_for(compressed);
        if declared > bound {
            return Err(CompressionError::DeclaredLengthExceedsBlockBound {
                declared,
                compressed,
                bound,
            });
        }
        match self.max_decompressed_len {
            Some(limit) if declared > limit => {
                Err(CompressionError::DeclaredLengthExceedsLimit { declared, limit })
            }
            _ => Ok(()),
        }
    }
}

impl PipelineStep for CompressionStep {
    fn name(&self) -> &str {
        STEP_KIND
    }

    fn write(
        &self,
        input: Box<ErasedBuf>,
        allocator: &dyn BufferAllocator,
    ) -> Result<Box<ErasedBuf>> {
        let payload = input.chunk();
        let declared = u32::try_from(payload.len())
            .map_err(|_| CompressionError::PayloadTooLarge { len: payload.len() })?;
        let max_block = block::get_maximum_output_size(payload.len());

        let mut output = allocator.acquire(HEADER_LEN + max_block)?;
        output.put_u32(declared)?;
        let compressed = output.write_with(max_block, &mut |window| {
            block::compress_into(payload, window)
                .map_err(|err| CoreError::from(CompressionError::Compress(err)))
        })?;
        trace!(
            original_len = payload.len(),
            compressed_len = compressed,
            max_block,
            "lz4 block written"
        );
        output.freeze()
    }

    fn read(
        &self,
        mut input: Box<ErasedBuf>,
        allocator: &dyn BufferAllocator,
    ) -> Result<Box<ErasedBuf>> {
        let available = input.remaining();
        if available < HEADER_LEN {
            return Err(CompressionError::TruncatedHeader { available }.into());
        }
        let declared = input.read_u32()? as usize;
        self.check_declared_len(declared, input.remaining())?;

        let mut output = allocator.acquire(declared)?;
        let compressed = input.chunk();
        let produced = output.write_with(declared, &mut |window| {
            block::decompress_into(compressed, window)
                .map_err(|err| CoreError::from(CompressionError::Decompress(err)))
        })?;
        if produced != declared {
            return Err(CompressionError::LengthMismatch { declared, produced }.into());
        }
        trace!(
            compressed_len = compressed.len(),
            decompressed_len = produced,
            "lz4 block read"
        );
        output.freeze()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompressionOptions {
    max_decompressed_len: Option<usize>,
}

/// 由 `kind = "lz4"` 条目构造 [`CompressionStep`]。
///
/// 可选项：`max_decompressed_len`（非负整数）。未知选项或类型不符返回 `config.invalid`。
#[derive(Clone, Copy, Debug, Default)]
pub struct Lz4StepFactory;

impl StepFactory for Lz4StepFactory {
    fn kind(&self) -> &'static str {
        STEP_KIND
    }

    fn build(&self, options: &toml::Table) -> Result<Arc<dyn PipelineStep>> {
        let options: CompressionOptions = toml::Value::Table(options.clone())
            .try_into()
            .map_err(|err| {
                CoreError::new(codes::CONFIG_INVALID, "invalid lz4 step options").with_cause(err)
            })?;
        let step = match options.max_decompressed_len {
            Some(limit) => CompressionStep::with_max_decompressed_len(limit),
            None => CompressionStep::new(),
        };
        Ok(Arc::new(step))
    }
}

/// 把 [`Lz4StepFactory`] 注册到给定注册表。
pub fn register(registry: &mut StepRegistry) -> Result<()> {
    registry.register(Arc::new(Lz4StepFactory))
}
