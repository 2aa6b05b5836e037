use super::{
    Codec, CodecDescriptor, CodecRole, ContentEncoding, ContentType, DecodeContext, Decoder,
    EncodeContext, EncodedPayload, Encoder,
};
use crate::Result;
use crate::buffer::ErasedBuf;

/// 原样透传字节的内层编解码器。
///
/// 适合值本身已是序列化字节（例如上游已完成序列化）的场景，
/// 与流水线组合后只剩下字节变换本身。
#[derive(Clone, Debug)]
pub struct BytesCodec {
    descriptor: CodecDescriptor,
}

impl BytesCodec {
    pub fn new() -> Self {
        Self {
            descriptor: CodecDescriptor::new(
                ContentType::new("application/octet-stream"),
                ContentEncoding::identity(),
            ),
        }
    }
}

impl Default for BytesCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for BytesCodec {
    type Item = Vec<u8>;

    fn encode(&self, item: &Vec<u8>, ctx: &mut EncodeContext<'_>) -> Result<EncodedPayload> {
        let mut buffer = ctx.acquire_buffer(item.len())?;
        buffer.put_slice(item)?;
        Ok(EncodedPayload::from_buffer(buffer.freeze()?))
    }
}

impl Decoder for BytesCodec {
    type Item = Vec<u8>;

    fn decode(&self, src: &mut ErasedBuf, _ctx: &mut DecodeContext<'_>) -> Result<Vec<u8>> {
        let bytes = src.chunk().to_vec();
        src.advance(bytes.len())?;
        Ok(bytes)
    }
}

impl Codec for BytesCodec {
    type Value = Vec<u8>;

    fn descriptor(&self) -> &CodecDescriptor {
        &self.descriptor
    }

    fn encoder(&self, _role: CodecRole) -> &dyn Encoder<Item = Vec<u8>> {
        self
    }

    fn decoder(&self, _role: CodecRole) -> &dyn Decoder<Item = Vec<u8>> {
        self
    }
}
