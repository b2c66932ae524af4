use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use super::schema::{decode_schema, encode_schema};
use super::slice_reader::LeSliceReader;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::Schema;

pub const END_OF_DATA: i32 = -1;
pub const PEER_EXCEPTION: i32 = -2;
pub const TIMING_DATA: i32 = -3;
pub const START_OF_STREAM: i32 = -6;

pub const KIND_SCHEMA: u8 = 1;
pub const KIND_BATCH: u8 = 2;

/// Worker timing report, epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingData {
    pub boot_ms: i64,
    pub init_ms: i64,
    pub finish_ms: i64,
}

/// One unit of the exchange stream.
///
/// `Batch` carries the batch message body after its kind byte; it is decoded
/// against the stream schema by [`super::decode_batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    StartOfStream,
    Schema(Schema),
    Batch(Bytes),
    Timing(TimingData),
    PeerException(String),
    EndOfData,
}

impl Frame {
    pub fn name(&self) -> &'static str {
        match self {
            Frame::StartOfStream => "start-of-stream",
            Frame::Schema(_) => "schema",
            Frame::Batch(_) => "batch",
            Frame::Timing(_) => "timing",
            Frame::PeerException(_) => "exception",
            Frame::EndOfData => "end-of-data",
        }
    }

    /// Appends the complete wire encoding of this frame to `out`.
    pub fn encode(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            Frame::StartOfStream => out.put_i32_le(START_OF_STREAM),
            Frame::EndOfData => out.put_i32_le(END_OF_DATA),
            Frame::Timing(timing) => {
                out.put_i32_le(TIMING_DATA);
                out.put_i64_le(timing.boot_ms);
                out.put_i64_le(timing.init_ms);
                out.put_i64_le(timing.finish_ms);
            }
            Frame::PeerException(message) => {
                out.put_i32_le(PEER_EXCEPTION);
                out.put_i32_le(message_len(message.len())?);
                out.put_slice(message.as_bytes());
            }
            Frame::Schema(schema) => {
                let message = encode_schema(schema)?;
                out.put_i32_le(message_len(message.len() + 1)?);
                out.put_u8(KIND_SCHEMA);
                out.put_slice(&message);
            }
            Frame::Batch(body) => {
                out.put_i32_le(message_len(body.len() + 1)?);
                out.put_u8(KIND_BATCH);
                out.put_slice(body);
            }
        }
        Ok(())
    }
}

fn message_len(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| ExchangeError::Capacity(format!("message of {len} bytes exceeds i32 length")))
}

/// Writes frames, each fully encoded before the first byte hits the stream.
pub struct FrameWriter<W: Write> {
    inner: W,
    scratch: BytesMut,
    bytes_written: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: BytesMut::with_capacity(4096),
            bytes_written: 0,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.scratch.clear();
        frame.encode(&mut self.scratch)?;
        self.inner.write_all(&self.scratch)?;
        self.inner.flush()?;
        self.bytes_written += self.scratch.len() as u64;
        trace!(
            target: "batch_exchange::frame",
            frame = frame.name(),
            bytes = self.scratch.len(),
            "Frame written"
        );
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads frames off a byte stream.
pub struct FrameReader<R: Read> {
    inner: R,
    bytes_read: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Next frame, or `None` when the stream ends cleanly between frames.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut head = [0u8; 4];
        if !self.fill_or_eof(&mut head)? {
            return Ok(None);
        }
        let length = i32::from_le_bytes(head);
        let frame = match length {
            START_OF_STREAM => Frame::StartOfStream,
            END_OF_DATA => Frame::EndOfData,
            TIMING_DATA => {
                let raw = self.read_exact_vec(24)?;
                let mut reader = LeSliceReader::new(&raw);
                Frame::Timing(TimingData {
                    boot_ms: reader.read_i64()?,
                    init_ms: reader.read_i64()?,
                    finish_ms: reader.read_i64()?,
                })
            }
            PEER_EXCEPTION => {
                let raw = self.read_exact_vec(4)?;
                let len = LeSliceReader::new(&raw).read_i32()?;
                let len = usize::try_from(len).map_err(|_| {
                    ExchangeError::format(format!("negative exception length {len}"))
                })?;
                let message = self.read_exact_vec(len)?;
                Frame::PeerException(String::from_utf8_lossy(&message).into_owned())
            }
            len if len >= 0 => self.read_message(len as usize)?,
            other => {
                return Err(ExchangeError::format(format!(
                    "unknown stream sentinel {other}"
                )));
            }
        };
        trace!(target: "batch_exchange::frame", frame = frame.name(), "Frame read");
        Ok(Some(frame))
    }

    fn read_message(&mut self, len: usize) -> Result<Frame> {
        if len == 0 {
            return Err(ExchangeError::format("empty data message"));
        }
        let message = Bytes::from(self.read_exact_vec(len)?);
        match message[0] {
            KIND_SCHEMA => Ok(Frame::Schema(decode_schema(&message[1..])?)),
            KIND_BATCH => Ok(Frame::Batch(message.slice(1..))),
            other => Err(ExchangeError::format(format!(
                "unknown message kind {other}"
            ))),
        }
    }

    /// Fills `buf`; `Ok(false)` if the stream was already at EOF.
    fn fill_or_eof(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(ExchangeError::format(format!(
                        "stream ended inside a frame header after {filled} bytes"
                    )));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.bytes_read += buf.len() as u64;
        Ok(true)
    }

    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|e| {
            ExchangeError::Capacity(format!("cannot buffer a {len} byte message: {e}"))
        })?;
        buf.resize(len, 0);
        match self.inner.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(ExchangeError::format(format!(
                    "stream ended inside a {len} byte message"
                )));
            }
            Err(e) => return Err(e.into()),
        }
        self.bytes_read += len as u64;
        Ok(buf)
    }
}
