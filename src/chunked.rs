//! Chunked line reader: the header line on its own, then the rest of the source in
//! groups of whole lines bounded by a byte budget.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::util::open_with_backoff;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One block of raw lines, terminators included.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    pub bytes: Vec<u8>,
    pub lines: usize,
}

/// Lazy, finite, non-restartable sequence of line chunks.
///
/// Lines are appended to a chunk until it holds at least `chunk_bytes` bytes, so a
/// single line longer than the budget still forms a chunk of its own. Line order is
/// preserved across chunks. The first line of the source is split off as the header
/// when the reader is built and never appears in a chunk.
pub struct ChunkedReader<R> {
    rdr: R,
    chunk_bytes: usize,
    header: Vec<u8>,
    bytes_read: u64,
    chunks_read: u64,
    done: bool,
}

impl ChunkedReader<BufReader<File>> {
    pub fn open(path: &Path, chunk_bytes: usize, buf_bytes: usize) -> Result<Self> {
        let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
        let rdr = BufReader::with_capacity(buf_bytes.max(8 * 1024), f);
        Self::new(rdr, chunk_bytes).with_context(|| format!("read header of {}", path.display()))
    }
}

impl<R: BufRead> ChunkedReader<R> {
    /// Wrap `rdr` and consume its header line. An empty source yields an empty header.
    pub fn new(mut rdr: R, chunk_bytes: usize) -> io::Result<Self> {
        let mut header = Vec::new();
        let n = rdr.read_until(b'\n', &mut header)?;
        if header.ends_with(b"\n") {
            header.pop();
            if header.ends_with(b"\r") {
                header.pop();
            }
        }
        if header.starts_with(UTF8_BOM) {
            header.drain(..UTF8_BOM.len());
        }
        Ok(Self {
            rdr,
            chunk_bytes: chunk_bytes.max(1),
            header,
            bytes_read: n as u64,
            chunks_read: 0,
            done: n == 0,
        })
    }

    /// The header line, without its terminator.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Total bytes consumed from the source so far, header included.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// Next chunk, or `None` once the source is exhausted.
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }
        let mut chunk = Chunk::default();
        loop {
            let n = self.rdr.read_until(b'\n', &mut chunk.bytes)?;
            if n == 0 {
                self.done = true;
                break;
            }
            self.bytes_read += n as u64;
            chunk.lines += 1;
            if chunk.bytes.len() >= self.chunk_bytes {
                break;
            }
        }
        if chunk.lines == 0 {
            return Ok(None);
        }
        self.chunks_read += 1;
        tracing::debug!(
            "chunk {}: {} lines, {} bytes",
            self.chunks_read,
            chunk.lines,
            chunk.bytes.len()
        );
        Ok(Some(chunk))
    }
}

impl<R: BufRead> Iterator for ChunkedReader<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(c)) => Some(Ok(c)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
