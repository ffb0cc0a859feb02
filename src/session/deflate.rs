use flate2::{Compress, Status};

use crate::status::StatusCode;

use super::{Coder, Fault, FlushMode, Format, Level, Progress};

#[cfg(feature = "gzip")]
use super::gzip;

const STASH_CHUNK_SIZE: usize = 4096;

/// Bytes waiting for room in the destination
#[derive(Debug, Default)]
struct Pending {
    bytes: Vec<u8>,
    position: usize
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.position == self.bytes.len()
    }

    fn push(&mut self, bytes: &[u8]) {
        self.bytes.drain(..self.position);
        self.position = 0;
        self.bytes.extend_from_slice(bytes);
    }

    fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let count = std::cmp::min(self.bytes.len() - self.position, output.len());
        output[..count].copy_from_slice(&self.bytes[self.position..(self.position + count)]);
        self.position += count;
        count
    }
}

pub struct Deflater {
    inner: Compress,
    pending: Pending,

    #[cfg(feature = "gzip")]
    summary: Option<gzip::Summary>,

    total_in: u64,
    total_out: u64,

    /// Strongest flush completed since the engine last took input
    last_flush: Option<FlushMode>,

    body_done: bool,
    finished: bool
}

impl std::fmt::Debug for Deflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deflater")
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Deflater {
    #[cfg_attr(not(feature = "gzip"), allow(unused_mut))]
    pub fn new(level: Level, format: Format) -> Result<Self, Fault> {
        let mut pending = Pending::default();

        #[cfg(feature = "gzip")]
        let mut summary = None;

        let zlib_header = match format {
            Format::Zlib => true,
            Format::Raw => false,

            #[cfg(feature = "gzip")]
            Format::Gzip => {
                pending.push(&gzip::header_bytes(level));
                summary = Some(gzip::Summary::default());
                false
            },

            #[cfg(feature = "gzip")]
            Format::Auto => return Err(Fault::new(StatusCode::StreamError, "format detection is only available for decompression"))
        };

        Ok(Self {
            inner: Compress::new(level.compression(), zlib_header),
            pending,

            #[cfg(feature = "gzip")]
            summary,

            total_in: 0,
            total_out: 0,

            last_flush: None,

            body_done: false,
            finished: false
        })
    }

    fn compress_body(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<(usize, usize), Fault> {
        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();

        let status = self.inner.compress(input, output, flush.for_compress())
            .map_err(|e| Fault::new(StatusCode::StreamError, e.to_string()))?;

        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;

        #[cfg(feature = "gzip")]
        if let Some(summary) = &mut self.summary {
            summary.update(&input[..consumed]);
        }

        if status == Status::StreamEnd {
            self.body_done = true;
            self.push_trailer();
        }

        Ok((consumed, produced))
    }

    #[cfg(feature = "gzip")]
    fn push_trailer(&mut self) {
        if let Some(summary) = self.summary.take() {
            let (crc, size) = summary.finish();
            self.pending.push(&gzip::trailer_bytes(crc, size));
        }
    }

    #[cfg(not(feature = "gzip"))]
    fn push_trailer(&mut self) {}

    fn stash_engine_output(&mut self) -> Result<(), Fault> {
        let mut chunk = [0u8; STASH_CHUNK_SIZE];
        loop {
            let (_, produced) = self.compress_body(&[], &mut chunk, FlushMode::NoFlush)?;
            self.pending.push(&chunk[..produced]);
            if produced < chunk.len() {
                return Ok(());
            }
        }
    }

    /// A flush with no new input that is not stronger than the last
    /// completed one has nothing to do
    fn is_repeated_flush(&self, input: &[u8], flush: FlushMode) -> bool {
        let Some(last) = self.last_flush else {
            return false;
        };
        input.is_empty() && flush != FlushMode::Finish && flush.rank() <= last.rank()
    }
}

impl Coder for Deflater {
    fn advance(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Progress, Fault> {
        if self.body_done && !input.is_empty() {
            return Err(match flush {
                FlushMode::Finish => Fault::new(StatusCode::BufError, "input after the end of the stream"),
                _ => Fault::new(StatusCode::StreamError, "stream already finished")
            });
        }

        let mut consumed = 0;
        let mut produced = self.pending.drain_into(output);

        let idle = self.is_repeated_flush(input, flush);
        if !self.body_done && !idle && self.pending.is_empty() && produced < output.len() {
            let (used_in, used_out) = self.compress_body(input, &mut output[produced..], flush)?;
            consumed += used_in;
            produced += used_out;

            self.last_flush = if consumed < input.len() {
                None
            } else if produced < output.len() {
                Some(flush)
            } else if matches!(flush, FlushMode::SyncFlush | FlushMode::FullFlush | FlushMode::Block) {
                // Move the rest of the flushed data out of the engine, so
                // that flushing again cannot emit a second marker
                self.stash_engine_output()?;
                Some(flush)
            } else {
                None
            };
        }

        if self.body_done {
            produced += self.pending.drain_into(&mut output[produced..]);
            self.finished = self.pending.is_empty();
        }

        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        Ok(Progress::new(consumed, produced, self.finished))
    }

    fn release(&mut self) -> Result<(), Fault> {
        let started = self.total_in > 0 || self.total_out > 0;
        if started && !self.finished {
            return Err(Fault::data("stream freed prematurely"));
        }
        Ok(())
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }
}
