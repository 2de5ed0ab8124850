// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Frame + serialize typed messages between master and slave: a 4-byte
//! big-endian length prefix followed by that many UTF-8 JSON bytes.
//! Framing itself is delegated to `tokio_util`'s `LengthDelimitedCodec`,
//! which is exactly this shape by default; this module only adds the
//! JSON (de)serialization of `Message` on top.

use bytes::{Bytes, BytesMut};
use judge_protocol::Message;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encodes/decodes `Message` values as length-prefixed JSON frames.
pub struct MessageCodec {
    framing: LengthDelimitedCodec,
}

impl Default for MessageCodec {
    fn default() -> Self {
        MessageCodec { framing: LengthDelimitedCodec::new() }
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        let Some(frame) = self.framing.decode(src)? else { return Ok(None) };
        let message = serde_json::from_slice(&frame)?;
        Ok(Some(message))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let payload = serde_json::to_vec(&item)?;
        self.framing.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}
