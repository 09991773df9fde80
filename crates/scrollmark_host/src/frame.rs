//! Native-messaging framing: a `u32` length in native byte order followed by
//! that many bytes of UTF-8 JSON.

use std::io::{self, Read, Write};

use serde::Serialize;
use thiserror::Error;

/// Largest frame accepted from the browser.
pub const MAX_INCOMING_FRAME: usize = 64 * 1024 * 1024;
/// Largest frame the browser accepts from a host.
pub const MAX_OUTGOING_FRAME: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
    #[error("stream ended inside a {expected} byte frame")]
    Truncated { expected: usize },
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reads the next frame payload. Returns `None` once the stream ends
/// between frames.
pub fn read_frame(reader: &mut impl Read) -> Result<Option<Vec<u8>>, FrameError> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_INCOMING_FRAME {
        return Err(FrameError::TooLarge {
            len,
            max: MAX_INCOMING_FRAME,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::Truncated { expected: len }
        } else {
            FrameError::Io(err)
        }
    })?;
    Ok(Some(payload))
}

pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(value)?;
    if payload.len() > MAX_OUTGOING_FRAME {
        return Err(FrameError::TooLarge {
            len: payload.len(),
            max: MAX_OUTGOING_FRAME,
        });
    }
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn write_frame<T: Serialize>(writer: &mut impl Write, value: &T) -> Result<(), FrameError> {
    let frame = encode_frame(value)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}
