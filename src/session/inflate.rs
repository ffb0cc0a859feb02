use flate2::{Decompress, DecompressError, Status};

use crate::status::StatusCode;

use super::{Coder, Fault, FlushMode, Format, Progress, WindowBits};

#[cfg(feature = "gzip")]
use super::gzip::{self, GzipHeader, HeaderParser, TrailerReader};

const ZLIB_METHOD_DEFLATE: u8 = 8;

enum Phase {
    /// Waiting for the first byte of a wrapped stream
    Detect,

    #[cfg(feature = "gzip")]
    Header(HeaderParser),

    Body(Decompress),

    #[cfg(feature = "gzip")]
    Trailer(TrailerReader),

    Done,

    /// The stream is broken, every further advance reports the same fault
    Failed(Fault)
}

/// What resuming a phase did, and where the stream goes next
struct Turn {
    next: Phase,
    consumed: usize,
    produced: usize,
    proceed: bool
}

impl Turn {
    fn proceed(next: Phase, consumed: usize, produced: usize) -> Self {
        Self { next, consumed, produced, proceed: true }
    }

    fn wait(next: Phase, consumed: usize, produced: usize) -> Self {
        Self { next, consumed, produced, proceed: false }
    }
}

pub struct Inflater {
    window_bits: WindowBits,
    phase: Phase,

    #[cfg(feature = "gzip")]
    summary: Option<gzip::Summary>,

    #[cfg(feature = "gzip")]
    header: Option<GzipHeader>,

    total_in: u64,
    total_out: u64
}

impl std::fmt::Debug for Inflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inflater")
            .field("window_bits", &self.window_bits)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish()
    }
}

impl Inflater {
    pub fn new(window_bits: WindowBits) -> Self {
        let mut inflater = Self {
            window_bits,
            phase: Phase::Detect,

            #[cfg(feature = "gzip")]
            summary: None,

            #[cfg(feature = "gzip")]
            header: None,

            total_in: 0,
            total_out: 0
        };

        inflater.phase = match window_bits.format() {
            Format::Raw => Phase::Body(Decompress::new(false)),
            Format::Zlib => Phase::Detect,

            #[cfg(feature = "gzip")]
            Format::Gzip => inflater.start_gzip(),

            #[cfg(feature = "gzip")]
            Format::Auto => Phase::Detect
        };
        inflater
    }

    #[cfg(feature = "gzip")]
    fn start_gzip(&mut self) -> Phase {
        self.summary = Some(gzip::Summary::default());
        Phase::Header(HeaderParser::new())
    }

    /// Picks the wrapper from the first byte of the stream and checks
    /// the zlib window size against the configured one
    fn detect(&mut self, first: u8) -> Result<Phase, Fault> {
        #[cfg(feature = "gzip")]
        if self.window_bits.format() == Format::Auto && first == gzip::GZIP_MAGIC[0] {
            return Ok(self.start_gzip());
        }

        if first & 0x0f != ZLIB_METHOD_DEFLATE {
            return Err(Fault::data("unknown compression method"));
        }

        let window = (first >> 4) + 8;
        let limit = self.window_bits.bits().unwrap_or(WindowBits::MAX_BITS);
        if window > limit {
            return Err(Fault::data("invalid window size"));
        }

        Ok(Phase::Body(Decompress::new(true)))
    }

    fn resume(&mut self, phase: Phase, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Turn, Fault> {
        match phase {
            Phase::Detect => match input.first() {
                Some(first) => Ok(Turn::proceed(self.detect(*first)?, 0, 0)),
                None => Ok(Turn::wait(Phase::Detect, 0, 0))
            },

            #[cfg(feature = "gzip")]
            Phase::Header(mut parser) => {
                let used = parser.feed(input).map_err(Fault::data)?;
                if !parser.is_complete() {
                    return Ok(Turn::wait(Phase::Header(parser), used, 0));
                }

                self.header = Some(parser.into_header());
                Ok(Turn::proceed(Phase::Body(Decompress::new(false)), used, 0))
            },

            Phase::Body(mut inner) => {
                let before_in = inner.total_in();
                let before_out = inner.total_out();

                let status = inner.decompress(input, output, flush.for_decompress())
                    .map_err(decompress_fault)?;

                let consumed = (inner.total_in() - before_in) as usize;
                let produced = (inner.total_out() - before_out) as usize;

                #[cfg(feature = "gzip")]
                if let Some(summary) = &mut self.summary {
                    summary.update(&output[..produced]);
                }

                if status == Status::StreamEnd {
                    Ok(Turn::proceed(self.after_body(), consumed, produced))
                } else {
                    Ok(Turn::wait(Phase::Body(inner), consumed, produced))
                }
            },

            #[cfg(feature = "gzip")]
            Phase::Trailer(mut reader) => {
                let used = reader.feed(input);
                if !reader.is_complete() {
                    return Ok(Turn::wait(Phase::Trailer(reader), used, 0));
                }

                let (crc, size) = self.summary.take().unwrap_or_default().finish();
                reader.verify(crc, size).map_err(Fault::data)?;
                Ok(Turn::wait(Phase::Done, used, 0))
            },

            Phase::Done => Ok(Turn::wait(Phase::Done, 0, 0)),

            Phase::Failed(fault) => Err(fault)
        }
    }

    #[cfg(feature = "gzip")]
    fn after_body(&self) -> Phase {
        if self.summary.is_some() {
            Phase::Trailer(TrailerReader::default())
        } else {
            Phase::Done
        }
    }

    #[cfg(not(feature = "gzip"))]
    fn after_body(&self) -> Phase {
        Phase::Done
    }
}

fn decompress_fault(e: DecompressError) -> Fault {
    if e.needs_dictionary().is_some() {
        return Fault::new(StatusCode::NeedDict, "need dictionary");
    }
    Fault::data(e.to_string())
}

impl Coder for Inflater {
    fn advance(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Progress, Fault> {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            let phase = std::mem::replace(&mut self.phase, Phase::Done);
            let turn = match self.resume(phase, &input[consumed..], &mut output[produced..], flush) {
                Ok(turn) => turn,
                Err(fault) => {
                    self.phase = Phase::Failed(fault.clone());
                    return Err(fault);
                }
            };

            consumed += turn.consumed;
            produced += turn.produced;
            self.phase = turn.next;

            if !turn.proceed {
                break;
            }
        }

        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        let ended = matches!(self.phase, Phase::Done);
        Ok(Progress::new(consumed, produced, ended))
    }

    fn release(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }

    #[cfg(feature = "gzip")]
    fn gzip_header(&self) -> Option<&GzipHeader> {
        self.header.as_ref()
    }
}
