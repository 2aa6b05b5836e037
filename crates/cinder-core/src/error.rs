use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// 底层原因的对象安全别名，要求可跨线程传播。
pub type ErrorCause = Box<dyn StdError + Send + Sync + 'static>;

/// 统一的结果别名，默认错误类型为 [`CoreError`]。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;

/// `CoreError` 是流水线、缓冲池与编解码器共享的稳定错误域。
///
/// # 设计背景（Why）
/// - 流水线中的任意步骤、缓冲分配与内层编解码器都可能失败，调用方（集群客户端）只关心
///   “这一次编码/解码失败了”以及失败属于哪一类，以便自行决定重试或重连。
/// - 稳定的错误码让日志、告警可以直接按码聚合，而不必解析自然语言消息。
///
/// # 逻辑解析（How）
/// - `code` 为 `'static` 字符串，遵循 `<域>.<语义>` 约定，取值见 [`codes`]；
/// - `message` 面向排障人员；
/// - `cause` 保存底层错误（例如 LZ4 解码错误），通过 [`StdError::source`] 暴露。
///
/// # 契约说明（What）
/// - **前置条件**：构造时应使用 [`codes`] 中登记的错误码；内层编解码器可以使用自定义码值，
///   流水线不会改写它们。
/// - **后置条件**：实例满足 `Send + Sync + 'static`，可安全跨线程移动。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
}

impl CoreError {
    /// 构造核心错误。
    ///
    /// # 示例
    /// ```rust
    /// use cinder_core::{CoreError, ErrorKind};
    /// use cinder_core::error::codes;
    ///
    /// let err = CoreError::new(codes::PIPELINE_FORMAT, "header truncated");
    /// assert_eq!(err.code(), codes::PIPELINE_FORMAT);
    /// assert_eq!(err.kind(), ErrorKind::Format);
    /// assert!(err.cause().is_none());
    /// ```
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的核心错误。
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 返回排障消息。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 返回底层原因（若存在）。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// 按错误码前缀归类。
    ///
    /// # 契约说明（What）
    /// - `pipeline.*` → [`ErrorKind::Format`]，`buffer.allocation` → [`ErrorKind::Allocation`]，
    ///   其余 `buffer.*` → [`ErrorKind::Buffer`]，`config.*` → [`ErrorKind::Configuration`]；
    /// - 无法识别的码值视为内层编解码器透传的错误，归入 [`ErrorKind::Codec`]。
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_code(self.code)
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause.as_ref() as &(dyn StdError + 'static))
    }
}

/// 错误的粗粒度分类，对应流水线对外承诺的三类失败以及缓冲/配置两类辅助失败。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 头部/长度不一致、压缩块截断或损坏、帧超限。
    Format,
    /// 请求的缓冲容量无法满足。
    Allocation,
    /// 游标越界或对冻结缓冲写入等缓冲契约违例。
    Buffer,
    /// 内层编解码器失败，原样透传。
    Codec,
    /// 配置无法解析或解析后无法落地。
    Configuration,
}

impl ErrorKind {
    fn from_code(code: &str) -> Self {
        if code == codes::BUFFER_ALLOCATION {
            ErrorKind::Allocation
        } else if code.starts_with("pipeline.") {
            ErrorKind::Format
        } else if code.starts_with("buffer.") {
            ErrorKind::Buffer
        } else if code.starts_with("config.") {
            ErrorKind::Configuration
        } else {
            ErrorKind::Codec
        }
    }
}

/// 稳定错误码清单。
pub mod codes {
    /// 头部与长度不一致、压缩块截断或被篡改。
    pub const PIPELINE_FORMAT: &str = "pipeline.format";
    /// 线上帧超过配置的帧长上限。
    pub const PIPELINE_FRAME_TOO_LARGE: &str = "pipeline.frame_too_large";
    /// 缓冲池无法满足请求容量。
    pub const BUFFER_ALLOCATION: &str = "buffer.allocation";
    /// 读/写游标越过有效区域。
    pub const BUFFER_OUT_OF_RANGE: &str = "buffer.out_of_range";
    /// 对已冻结的缓冲执行写操作。
    pub const BUFFER_INVALID_STATE: &str = "buffer.invalid_state";
    /// 内层编解码器失败。
    pub const CODEC_INNER: &str = "codec.inner";
    /// 配置解析或装配失败。
    pub const CONFIG_INVALID: &str = "config.invalid";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Upstream;

    impl fmt::Display for Upstream {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("upstream failure")
        }
    }

    impl StdError for Upstream {}

    #[test]
    fn kind_follows_code_prefix() {
        let cases = [
            (codes::PIPELINE_FORMAT, ErrorKind::Format),
            (codes::PIPELINE_FRAME_TOO_LARGE, ErrorKind::Format),
            (codes::BUFFER_ALLOCATION, ErrorKind::Allocation),
            (codes::BUFFER_OUT_OF_RANGE, ErrorKind::Buffer),
            (codes::BUFFER_INVALID_STATE, ErrorKind::Buffer),
            (codes::CODEC_INNER, ErrorKind::Codec),
            (codes::CONFIG_INVALID, ErrorKind::Configuration),
            ("serde.custom", ErrorKind::Codec),
        ];
        for (code, expected) in cases {
            assert_eq!(CoreError::new(code, "x").kind(), expected, "code {code}");
        }
    }

    #[test]
    fn cause_is_exposed_as_source() {
        let err = CoreError::new(codes::CODEC_INNER, "inner failed").with_cause(Upstream);
        let source = err.source().expect("应携带底层原因");
        assert_eq!(source.to_string(), "upstream failure");
        assert_eq!(err.to_string(), "[codec.inner] inner failed");
    }
}
