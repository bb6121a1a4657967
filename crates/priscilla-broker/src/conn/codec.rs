//! Streaming JSON codec for envelopes.
//!
//! Clients write JSON objects back to back with arbitrary whitespace (usually a
//! newline) between them. Each decoded item is itself a `Result` so a single
//! malformed object is reported without tearing down the connection.

use std::io;

use bytes::{Buf, BufMut, BytesMut};
use priscilla_core::config::MAX_FRAME_BYTES;
use priscilla_protocol::Envelope;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    max_frame: usize,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self {
            max_frame: MAX_FRAME_BYTES,
        }
    }

    /// Cap on bytes buffered while waiting for one object to complete.
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self { max_frame }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Result<Envelope, serde_json::Error>;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        let leading = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        buf.advance(leading);
        if buf.is_empty() {
            return Ok(None);
        }

        let (next, consumed) = {
            let mut stream = serde_json::Deserializer::from_slice(&buf[..]).into_iter::<Value>();
            let next = stream.next();
            (next, stream.byte_offset())
        };

        match next {
            None => Ok(None),
            Some(Ok(value)) => {
                buf.advance(consumed);
                Ok(Some(serde_json::from_value(value)))
            }
            Some(Err(e)) if e.is_eof() => {
                if buf.len() > self.max_frame {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "frame too large: {} bytes buffered (max {})",
                            buf.len(),
                            self.max_frame
                        ),
                    ));
                }
                Ok(None)
            }
            Some(Err(e)) => {
                // Resynchronise on the next line; without one, drop everything buffered.
                let skip = buf
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(buf.len(), |i| i + 1);
                buf.advance(skip);
                Ok(Some(Err(e)))
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        match self.decode(buf)? {
            Some(item) => Ok(Some(item)),
            None => {
                if !buf.is_empty() {
                    warn!(bytes = buf.len(), "discarding incomplete envelope at end of stream");
                    buf.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), io::Error> {
        let json = serde_json::to_vec(&item)?;
        dst.reserve(json.len() + 1);
        dst.extend_from_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}
