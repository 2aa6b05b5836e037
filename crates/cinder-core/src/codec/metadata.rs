use std::borrow::Cow;

/// `ContentType` 以 `media-type` 约定描述负载的主语义。
///
/// 通过 `Cow<'static, str>` 兼容静态常量与运行时拼出的类型，避免多余复制。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    /// 创建新的内容类型。
    pub fn new(value: impl Into<Cow<'static, str>>) -> Self {
        Self(value.into())
    }

    /// 返回底层字符串表示。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `ContentEncoding` 表达压缩等内容层附加算法，`identity` 表示未做处理。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentEncoding(Cow<'static, str>);

impl ContentEncoding {
    /// 等价于 HTTP `identity`。
    pub fn identity() -> Self {
        Self(Cow::Borrowed("identity"))
    }

    /// 创建新的编码标识。
    pub fn new(value: impl Into<Cow<'static, str>>) -> Self {
        Self(value.into())
    }

    /// 返回底层字符串。
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 是否与 `identity` 等价。
    pub fn is_identity(&self) -> bool {
        self.0 == "identity"
    }
}

/// `CodecDescriptor` 聚合内容类型与内容编码，是编解码器的最小识别单元。
///
/// # 设计背景（Why）
/// - 内层编解码器需要向外暴露“我产出的是什么”，以便嵌入方做类型解析；
///   流水线包装后仍原样透传该描述符，它对负载语义不做任何假设。
///
/// # 契约说明（What）
/// - 内容类型与编码必须与实际负载匹配；
/// - 实例不可变，可在线程间共享。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecDescriptor {
    content_type: ContentType,
    content_encoding: ContentEncoding,
}

impl CodecDescriptor {
    /// 构建新的描述符。
    pub fn new(content_type: ContentType, content_encoding: ContentEncoding) -> Self {
        Self {
            content_type,
            content_encoding,
        }
    }

    /// 获取内容类型。
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// 获取内容编码。
    pub fn content_encoding(&self) -> &ContentEncoding {
        &self.content_encoding
    }
}
