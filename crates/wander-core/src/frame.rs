//! Binary snapshot frames for out-of-process renderers.
//!
//! Each frame is a bitcode-encoded [`Snapshot`] behind a versioned header.
//! On a byte stream frames are length-prefixed (u32, little endian). Frames
//! are a transport encoding for live observers, not a save format.

use crate::sim::Ticks;
use crate::sink::{SinkControl, SnapshotSink};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a snapshot frame.
pub const FRAME_MAGIC: u32 = 0x57A1_0001;

/// Current frame format version. Increment when breaking the wire format.
pub const FRAME_VERSION: u32 = 1;

/// Largest frame body accepted on a stream, in bytes.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", FRAME_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported frame version: expected {}, got {}", FRAME_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("frame of {} bytes exceeds the {} byte limit", .0, MAX_FRAME_LEN)]
    TooLarge(usize),
    #[error("stream ended {0} bytes into a frame length prefix")]
    TruncatedPrefix(usize),
    #[error("frame i/o failed: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Frame header
// ---------------------------------------------------------------------------

/// Header carried by every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick of the enclosed snapshot.
    pub tick: Ticks,
}

impl FrameHeader {
    pub fn new(tick: Ticks) -> Self {
        Self {
            magic: FRAME_MAGIC,
            version: FRAME_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        if self.magic != FRAME_MAGIC {
            return Err(FrameError::InvalidMagic(self.magic));
        }
        if self.version != FRAME_VERSION {
            return Err(FrameError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Frame {
    header: FrameHeader,
    snapshot: Snapshot,
}

/// Encode a snapshot into a single frame.
pub fn encode_frame(snapshot: &Snapshot) -> Result<Vec<u8>, FrameError> {
    let frame = Frame {
        header: FrameHeader::new(snapshot.tick),
        snapshot: snapshot.clone(),
    };
    bitcode::serialize(&frame).map_err(|e| FrameError::Encode(e.to_string()))
}

/// Decode a single frame, validating its header.
pub fn decode_frame(data: &[u8]) -> Result<Snapshot, FrameError> {
    // bitcode has no partial decoding, so the header is checked after the
    // whole frame decodes.
    let frame: Frame =
        bitcode::deserialize(data).map_err(|e| FrameError::Decode(e.to_string()))?;
    frame.header.validate()?;
    Ok(frame.snapshot)
}

// ---------------------------------------------------------------------------
// Stream encoder / reader
// ---------------------------------------------------------------------------

/// A sink that writes each snapshot as a length-prefixed frame.
///
/// An encoding or write failure stops the run; the error is kept for the
/// caller in [`FrameEncoder::error`].
#[derive(Debug)]
pub struct FrameEncoder<W: Write> {
    writer: W,
    frames_written: u64,
    error: Option<FrameError>,
}

impl<W: Write> FrameEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_written: 0,
            error: None,
        }
    }

    /// Write one frame.
    pub fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), FrameError> {
        let bytes = encode_frame(snapshot)?;
        let len = u32::try_from(bytes.len())
            .ok()
            .filter(|&len| len <= MAX_FRAME_LEN)
            .ok_or(FrameError::TooLarge(bytes.len()))?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&bytes)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// The failure that stopped this encoder, if any.
    pub fn error(&self) -> Option<&FrameError> {
        self.error.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SnapshotSink for FrameEncoder<W> {
    fn accept(&mut self, snapshot: &Arc<Snapshot>) -> SinkControl {
        if self.error.is_some() {
            return SinkControl::Stop;
        }
        match self.write_snapshot(snapshot) {
            Ok(()) => SinkControl::Continue,
            Err(err) => {
                tracing::warn!(tick = snapshot.tick, %err, "frame encoder failed, stopping");
                self.error = Some(err);
                SinkControl::Stop
            }
        }
    }
}

/// Reads length-prefixed frames back from a byte stream.
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    reader: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next frame. Returns `Ok(None)` only when the stream ends
    /// exactly on a frame boundary.
    pub fn read_snapshot(&mut self) -> Result<Option<Snapshot>, FrameError> {
        let mut prefix = [0u8; 4];
        let mut filled = 0;
        while filled < prefix.len() {
            match self.reader.read(&mut prefix[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        match filled {
            0 => return Ok(None),
            4 => {}
            partial => return Err(FrameError::TruncatedPrefix(partial)),
        }

        let len = u32::from_le_bytes(prefix);
        if len > MAX_FRAME_LEN {
            return Err(FrameError::TooLarge(len as usize));
        }
        let mut bytes = vec![0u8; len as usize];
        self.reader.read_exact(&mut bytes)?;
        decode_frame(&bytes).map(Some)
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Snapshot, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_snapshot().transpose()
    }
}
