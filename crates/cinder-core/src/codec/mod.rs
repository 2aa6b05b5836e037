//! 编解码契约。
//!
//! # 模块定位（Why）
//! - 流水线包在一个“内层编解码器”外面，对外暴露与内层完全相同的接口，
//!   因此两者共享本模块的 [`Codec`]、[`Encoder`]、[`Decoder`] 契约；
//! - 内层格式不在本层定义，[`BytesCodec`] 仅提供字节透传这一最小实现。
//!
//! # 角色（How）
//! - 缓存客户端按用途区分值、映射键、映射值三种编解码角色（[`CodecRole`]）；
//!   内层编解码器可以为不同角色提供不同实现，流水线则对所有角色一视同仁。

mod bytes;
pub mod decoder;
pub mod encoder;
pub mod metadata;

pub use bytes::BytesCodec;
pub use decoder::{DecodeContext, Decoder};
pub use encoder::{EncodeContext, EncodedPayload, Encoder};
pub use metadata::{CodecDescriptor, ContentEncoding, ContentType};

/// 编解码器在缓存客户端中的用途。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecRole {
    /// 普通值。
    Value,
    /// 映射结构的键。
    MapKey,
    /// 映射结构的值。
    MapValue,
}

impl CodecRole {
    /// 全部角色，便于遍历。
    pub const ALL: [CodecRole; 3] = [CodecRole::Value, CodecRole::MapKey, CodecRole::MapValue];
}

/// `Codec` 聚合描述符与按角色划分的编码器/解码器。
///
/// # 契约说明（What）
/// - `descriptor` 是类型解析入口，包装者应原样透传；
/// - `encoder(role)`/`decoder(role)` 对同一角色必须互逆：
///   `decoder(r).decode(encoder(r).encode(v))` 还原 `v`；
/// - 实现须 `Send + Sync`，同一实例会被多个调用方并发使用。
pub trait Codec: Send + Sync + 'static {
    /// 编解码的值类型。
    type Value;

    /// 返回编解码描述符。
    fn descriptor(&self) -> &CodecDescriptor;

    /// 返回指定角色的编码器。
    fn encoder(&self, role: CodecRole) -> &dyn Encoder<Item = Self::Value>;

    /// 返回指定角色的解码器。
    fn decoder(&self, role: CodecRole) -> &dyn Decoder<Item = Self::Value>;
}
