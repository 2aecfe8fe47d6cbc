//! # Chunker
//!
//! Splits an unbounded byte stream into fixed-size chunks with contiguous
//! indices starting at zero. Every chunk is exactly `max_chunk_size` bytes
//! except the last one of a session, which is flushed by [`Chunker::finish`].

use super::errors::ChunkSourceError;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

/// Plaintext chunk ready for compression and encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u64,
    pub data: Vec<u8>,
}

/// Stateful splitter for one session.
#[derive(Debug)]
pub struct Chunker {
    max_chunk_size: usize,
    buffer: Vec<u8>,
    next_index: u64,
}

impl Chunker {
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size,
            buffer: Vec::with_capacity(max_chunk_size),
            next_index: 0,
        }
    }

    /// Buffer `data` and return every chunk that became full.
    pub fn push(&mut self, mut data: &[u8]) -> Vec<Chunk> {
        let mut ready = Vec::new();
        while !data.is_empty() {
            let room = self.max_chunk_size - self.buffer.len();
            let take = room.min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.buffer.len() == self.max_chunk_size {
                ready.push(self.emit());
            }
        }
        ready
    }

    /// Flush the trailing partial chunk, if any bytes are buffered.
    pub fn finish(&mut self) -> Option<Chunk> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.emit())
        }
    }

    /// Drop buffered bytes. Returns how many were discarded.
    pub fn discard(&mut self) -> u64 {
        let dropped = self.buffer.len() as u64;
        self.buffer.clear();
        dropped
    }

    /// Bytes waiting for the next chunk boundary.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Index the next emitted chunk will carry.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    fn emit(&mut self) -> Chunk {
        let data = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.max_chunk_size));
        let chunk = Chunk {
            index: self.next_index,
            data,
        };
        self.next_index += 1;
        chunk
    }
}

// =============================================================================
// CHUNK SOURCES
// =============================================================================

/// One item read from an upstream byte source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFrame {
    Data(Vec<u8>),
    /// Explicit end of session.
    Stop,
}

/// Upstream byte stream feeding a session.
#[async_trait]
pub trait ChunkSource: Send {
    /// Next frame. A source that ends without [`SourceFrame::Stop`] must
    /// return [`ChunkSourceError::UnexpectedEof`].
    async fn next_frame(&mut self) -> Result<SourceFrame, ChunkSourceError>;
}

/// Source backed by an `mpsc` channel. Dropping the sender without a
/// `Stop` frame is an unexpected end of stream.
pub struct ChannelSource {
    receiver: mpsc::Receiver<SourceFrame>,
    received: u64,
}

impl ChannelSource {
    pub fn new(receiver: mpsc::Receiver<SourceFrame>) -> Self {
        Self {
            receiver,
            received: 0,
        }
    }

    /// Bounded channel plus the source reading from it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<SourceFrame>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl ChunkSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<SourceFrame, ChunkSourceError> {
        match self.receiver.recv().await {
            Some(frame) => {
                if let SourceFrame::Data(bytes) = &frame {
                    self.received += bytes.len() as u64;
                }
                Ok(frame)
            }
            None => Err(ChunkSourceError::UnexpectedEof {
                received: self.received,
            }),
        }
    }
}

/// Source reading a finite `AsyncRead` (a recorded file). End of file is
/// the end of the session.
pub struct ReaderSource<R> {
    reader: R,
    read_size: usize,
    done: bool,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R, read_size: usize) -> Self {
        Self {
            reader,
            read_size: read_size.max(1),
            done: false,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ChunkSource for ReaderSource<R> {
    async fn next_frame(&mut self) -> Result<SourceFrame, ChunkSourceError> {
        if self.done {
            return Ok(SourceFrame::Stop);
        }
        let mut buf = vec![0u8; self.read_size];
        let n = self
            .reader
            .read(&mut buf)
            .await
            .map_err(|e| ChunkSourceError::Io(e.to_string()))?;
        if n == 0 {
            self.done = true;
            return Ok(SourceFrame::Stop);
        }
        buf.truncate(n);
        Ok(SourceFrame::Data(buf))
    }
}
