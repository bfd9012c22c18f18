//! Self-delimiting JSON framing for worker communication.
//!
//! Frames are complete top-level JSON documents (object or array). The worker
//! separates them with newlines, but the decoder does not rely on that: it
//! finds frame boundaries by scanning brackets and string literals, so a pipe
//! read may carry any number of frames and a frame may span any number of
//! reads.
//!
//! Two front ends share the same [`Scanner`]:
//! - [`FrameDecoder`]: push-style `write` / `read` over untyped values.
//! - [`JsonCodec`]: a `tokio_util` codec for `FramedRead` / `FramedWrite`.

use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use tokio_util::bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Error, Result};

/// Largest frame the decoder will buffer before giving up on the stream.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Resumable structural scan over the bytes of one frame.
///
/// Only ASCII bytes are structural, and UTF-8 continuation bytes never
/// collide with ASCII, so scanning byte by byte is safe for split multi-byte
/// characters. A backslash consumes exactly the next byte, which covers
/// `\"` and the first byte of `\uXXXX`; the hex digits are plain string
/// content.
#[derive(Debug, Default)]
struct Scanner {
    /// Offset of the next unscanned byte, relative to the frame start.
    pos: usize,
    /// Expected closing delimiters, innermost last.
    closers: Vec<u8>,
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    fn reset(&mut self) {
        self.pos = 0;
        self.closers.clear();
        self.in_string = false;
        self.escaped = false;
    }

    /// Scan `buf`, which starts at a frame's first byte. Returns the frame
    /// length once its closing delimiter has been seen.
    fn scan(&mut self, buf: &[u8]) -> Result<Option<usize>> {
        while self.pos < buf.len() {
            let byte = buf[self.pos];
            self.pos += 1;
            if self.pos > MAX_FRAME_BYTES {
                return Err(Error::protocol(format!(
                    "frame exceeds {MAX_FRAME_BYTES} bytes"
                )));
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' if !self.closers.is_empty() => self.in_string = true,
                b'{' => self.closers.push(b'}'),
                b'[' => self.closers.push(b']'),
                b'}' | b']' => match self.closers.pop() {
                    Some(expected) if expected == byte => {
                        if self.closers.is_empty() {
                            return Ok(Some(self.pos));
                        }
                    }
                    Some(expected) => {
                        return Err(Error::protocol(format!(
                            "mismatched '{}' at byte {}, expected '{}'",
                            byte as char,
                            self.pos - 1,
                            expected as char
                        )));
                    }
                    None => {
                        return Err(Error::protocol(format!(
                            "unexpected '{}' outside of a document",
                            byte as char
                        )));
                    }
                },
                _ if self.closers.is_empty() => {
                    return Err(Error::protocol(format!(
                        "frame must start with '{{' or '[', found {:?}",
                        byte as char
                    )));
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

/// Skip inter-frame whitespace at the front of `src`.
fn skip_whitespace(src: &mut BytesMut) {
    let n = src
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    src.advance(n);
}

/// Split the next complete frame off the front of `src`, if there is one.
fn next_frame(scanner: &mut Scanner, src: &mut BytesMut) -> Result<Option<BytesMut>> {
    if scanner.pos == 0 {
        skip_whitespace(src);
        if src.is_empty() {
            return Ok(None);
        }
    }
    match scanner.scan(src)? {
        Some(len) => {
            scanner.reset();
            Ok(Some(src.split_to(len)))
        }
        None => Ok(None),
    }
}

fn check_eof(src: &mut BytesMut) -> Result<()> {
    skip_whitespace(src);
    if src.is_empty() {
        Ok(())
    } else {
        Err(Error::protocol(format!(
            "stream ended inside a frame ({} bytes buffered)",
            src.len()
        )))
    }
}

/// Push-style decoder: feed raw chunks with [`write`](Self::write), collect
/// finished documents with [`read`](Self::read).
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    scanner: Scanner,
    /// First decode failure. Once set, the stream is unusable.
    failure: Option<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Remove and return every complete document buffered so far, oldest
    /// first. A trailing partial document stays buffered.
    ///
    /// Documents that precede a malformed frame are still returned; the
    /// failure is reported by the next call, and by every call after it.
    pub fn read(&mut self) -> Result<Vec<serde_json::Value>> {
        if let Some(reason) = &self.failure {
            return Err(Error::Protocol(reason.clone()));
        }
        let mut values = Vec::new();
        loop {
            match self.next_value() {
                Ok(Some(value)) => values.push(value),
                Ok(None) => return Ok(values),
                Err(e) => {
                    let reason = match e {
                        Error::Protocol(reason) => reason,
                        other => other.to_string(),
                    };
                    self.failure = Some(reason.clone());
                    if values.is_empty() {
                        return Err(Error::Protocol(reason));
                    }
                    return Ok(values);
                }
            }
        }
    }

    fn next_value(&mut self) -> Result<Option<serde_json::Value>> {
        match next_frame(&mut self.scanner, &mut self.buffer)? {
            Some(frame) => serde_json::from_slice(&frame)
                .map(Some)
                .map_err(|e| Error::protocol(format!("invalid JSON frame: {e}"))),
            None => Ok(None),
        }
    }

    /// Declare end of stream. Fails if anything but whitespace is left over,
    /// or if the stream already failed.
    pub fn finish(&mut self) -> Result<()> {
        if let Some(reason) = &self.failure {
            return Err(Error::Protocol(reason.clone()));
        }
        check_eof(&mut self.buffer)
    }

    /// Bytes held back waiting for the rest of a document.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Codec that frames messages as newline-terminated JSON documents.
///
/// Decoding uses the structural scanner, so it tolerates frames that are not
/// aligned with pipe reads. Encoding writes compact JSON plus `\n`.
pub struct JsonCodec<T> {
    scanner: Scanner,
    _phantom: PhantomData<T>,
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            scanner: Scanner::default(),
            _phantom: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Decoder for JsonCodec<T> {
    type Item = T;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match next_frame(&mut self.scanner, src)? {
            Some(frame) => {
                tracing::trace!(frame_size_bytes = frame.len(), "Decoded frame");
                let item = serde_json::from_slice(&frame)
                    .map_err(|e| Error::protocol(format!("invalid message: {e}")))?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => {
                check_eof(src)?;
                Ok(None)
            }
        }
    }
}

impl<T: Serialize> Encoder<T> for JsonCodec<T> {
    type Error = Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<()> {
        let json = serde_json::to_vec(&item)
            .map_err(|e| Error::protocol(format!("failed to serialize message: {e}")))?;
        tracing::trace!(json_size_bytes = json.len(), "Encoding frame");
        dst.reserve(json.len() + 1);
        dst.extend_from_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}
