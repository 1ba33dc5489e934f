//! JSON message framing for `tokio_util::codec`.
//!
//! Two framings are supported: newline-delimited JSON (the default) and a
//! 4-byte big-endian length prefix followed by the JSON payload. Decoding
//! never fails on a bad payload; it yields [`Frame::Malformed`] so the
//! connection survives. Only framing violations (oversized frames, a
//! truncated length-prefixed frame at EOF) are stream errors.

use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::AtaxxError;

/// Upper bound for a single frame unless configured otherwise.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

const LENGTH_PREFIX_LEN: usize = 4;

// ── Configuration ────────────────────────────────────────────────

/// How messages are delimited on the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One JSON object per line.
    #[default]
    Lines,
    /// `u32` big-endian length, then the JSON payload.
    LengthPrefixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub framing: Framing,
    pub max_frame_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            framing: Framing::Lines,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

// ── Frame ────────────────────────────────────────────────────────

/// One decoded unit from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<M> {
    Message(M),
    /// The frame was delimited correctly but its payload is not a valid
    /// message. The reason is for logging only.
    Malformed(String),
}

// ── MessageCodec ─────────────────────────────────────────────────

/// Decodes `In` messages and encodes `Out` messages.
#[derive(Debug)]
pub struct MessageCodec<In, Out> {
    config: CodecConfig,
    /// Where to resume the newline scan on the next call.
    next_index: usize,
    _marker: PhantomData<fn(Out) -> In>,
}

impl<In, Out> MessageCodec<In, Out> {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            next_index: 0,
            _marker: PhantomData,
        }
    }

    fn too_large(&self, size: usize) -> AtaxxError {
        AtaxxError::FrameTooLarge {
            size,
            max: self.config.max_frame_len,
        }
    }

    /// Split the next complete payload off `src`, if one is buffered.
    fn next_payload(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, AtaxxError> {
        let max = self.config.max_frame_len;
        match self.config.framing {
            Framing::Lines => {
                let start = self.next_index.min(src.len());
                match src[start..].iter().position(|b| *b == b'\n') {
                    Some(offset) => {
                        let newline = start + offset;
                        self.next_index = 0;
                        if newline > max {
                            return Err(self.too_large(newline));
                        }
                        let mut line = src.split_to(newline + 1);
                        line.truncate(newline);
                        if line.last() == Some(&b'\r') {
                            line.truncate(newline - 1);
                        }
                        Ok(Some(line))
                    }
                    None => {
                        if src.len() > max {
                            return Err(self.too_large(src.len()));
                        }
                        self.next_index = src.len();
                        Ok(None)
                    }
                }
            }
            Framing::LengthPrefixed => {
                if src.len() < LENGTH_PREFIX_LEN {
                    return Ok(None);
                }
                let mut prefix = [0u8; LENGTH_PREFIX_LEN];
                prefix.copy_from_slice(&src[..LENGTH_PREFIX_LEN]);
                let len = u32::from_be_bytes(prefix) as usize;
                if len > max {
                    return Err(self.too_large(len));
                }
                if src.len() < LENGTH_PREFIX_LEN + len {
                    src.reserve(LENGTH_PREFIX_LEN + len - src.len());
                    return Ok(None);
                }
                src.advance(LENGTH_PREFIX_LEN);
                Ok(Some(src.split_to(len)))
            }
        }
    }
}

/// Check shape first (object with a string `type`), then the typed union.
fn parse_frame<M: DeserializeOwned>(payload: &[u8]) -> Frame<M> {
    let value: Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(e) => return Frame::Malformed(format!("invalid json: {e}")),
    };
    if !value.is_object() {
        return Frame::Malformed("not a JSON object".to_string());
    }
    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_string(),
        None => return Frame::Malformed("missing string `type` field".to_string()),
    };
    match serde_json::from_value(value) {
        Ok(message) => Frame::Message(message),
        Err(e) => Frame::Malformed(format!("bad `{kind}` message: {e}")),
    }
}

fn is_blank(payload: &[u8]) -> bool {
    payload.iter().all(u8::is_ascii_whitespace)
}

impl<In: DeserializeOwned, Out> Decoder for MessageCodec<In, Out> {
    type Item = Frame<In>;
    type Error = AtaxxError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(payload) = self.next_payload(src)? {
            if !is_blank(&payload) {
                return Ok(Some(parse_frame(&payload)));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        match self.config.framing {
            // A final line without its newline still counts.
            Framing::Lines => {
                let rest = src.split();
                self.next_index = 0;
                if is_blank(&rest) {
                    Ok(None)
                } else {
                    Ok(Some(parse_frame(&rest)))
                }
            }
            Framing::LengthPrefixed => Err(AtaxxError::Connection(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("stream closed inside a frame ({} bytes buffered)", src.len()),
            ))),
        }
    }
}

impl<In, Out: Serialize> Encoder<Out> for MessageCodec<In, Out> {
    type Error = AtaxxError;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = serde_json::to_vec(&item)?;
        if payload.len() > self.config.max_frame_len {
            return Err(self.too_large(payload.len()));
        }
        match self.config.framing {
            Framing::Lines => {
                dst.reserve(payload.len() + 1);
                dst.extend_from_slice(&payload);
                dst.put_u8(b'\n');
            }
            Framing::LengthPrefixed => {
                dst.reserve(LENGTH_PREFIX_LEN + payload.len());
                dst.put_u32(payload.len() as u32);
                dst.extend_from_slice(&payload);
            }
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
