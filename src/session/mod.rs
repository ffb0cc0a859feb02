use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{slice::{BufferSlice, BufferSliceMut, SliceError}, status::StatusCode};

use self::{deflate::Deflater, inflate::Inflater};

pub use self::params::{FlushMode, Format, Level, WindowBits};

#[cfg(feature = "gzip")]
pub use self::gzip::GzipHeader;

mod params;

/// Compressing engine built on [flate2::Compress]
mod deflate;

/// Decompressing engine built on [flate2::Decompress]
mod inflate;

/// gzip member header and trailer handling
#[cfg(feature = "gzip")]
mod gzip;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{op} failed: {status}: {message}")]
    Init {
        op: &'static str,
        status: StatusCode,
        message: String
    },

    #[error("{op} failed: {status}: {message}")]
    Codec {
        op: &'static str,
        status: StatusCode,
        message: String
    },

    #[error("invalid buffer slice: {0}")]
    InvalidSlice(#[from] SliceError),

    #[error("session is closed")]
    SessionClosed,

    #[error("{op} reported {status}: {message}")]
    Teardown {
        op: &'static str,
        status: StatusCode,
        message: String
    }
}

impl SessionError {
    /// Returns the engine status carried by this error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Init { status, .. } | Self::Codec { status, .. } | Self::Teardown { status, .. } => Some(*status),
            Self::InvalidSlice(..) | Self::SessionClosed => None
        }
    }

    /// Returns whether the stream can be continued by calling step again
    /// with a larger destination, the same flush mode and the remaining source
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Codec { status, .. } if status.is_recoverable())
    }
}

/// An error reported by an engine, before it is attributed to an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fault {
    pub status: StatusCode,
    pub message: String
}

impl Fault {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into()
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(StatusCode::DataError, message)
    }
}

/// What a single engine advance did. The status is one of
/// [StatusCode::Ok], [StatusCode::StreamEnd] or [StatusCode::BufError],
/// the latter meaning that no progress was possible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    pub consumed: usize,
    pub produced: usize,
    pub status: StatusCode
}

impl Progress {
    pub fn new(consumed: usize, produced: usize, ended: bool) -> Self {
        let status = if ended {
            StatusCode::StreamEnd
        } else if consumed == 0 && produced == 0 {
            StatusCode::BufError
        } else {
            StatusCode::Ok
        };

        Self {
            consumed,
            produced,
            status
        }
    }
}

/// One coder's exclusively owned state
pub(crate) trait Coder: Send {
    /// Advances the stream once, reading from input and writing to output
    fn advance(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Progress, Fault>;

    /// Checks whether the state can be released cleanly. The state
    /// itself is freed when the coder is dropped
    fn release(&mut self) -> Result<(), Fault>;

    fn total_in(&self) -> u64;

    fn total_out(&self) -> u64;

    #[cfg(feature = "gzip")]
    fn gzip_header(&self) -> Option<&GzipHeader> {
        None
    }
}

/// Whether a session compresses or decompresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compressing,
    Decompressing
}

impl Mode {
    fn init_op(self) -> &'static str {
        match self {
            Self::Compressing => "deflateInit",
            Self::Decompressing => "inflateInit"
        }
    }

    fn step_op(self) -> &'static str {
        match self {
            Self::Compressing => "deflate",
            Self::Decompressing => "inflate"
        }
    }

    fn end_op(self) -> &'static str {
        match self {
            Self::Compressing => "deflateEnd",
            Self::Decompressing => "inflateEnd"
        }
    }
}

/// The parameters a session was created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Params {
    Compress {
        level: Level,
        format: Format
    },

    Decompress {
        window_bits: WindowBits
    }
}

/// The result of a single [Session::step]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepResult {
    /// Whether the engine reached the logical end of the stream
    pub stream_ended: bool,

    /// How many bytes of the source were used
    pub bytes_consumed: usize,

    /// How many bytes were written to the start of the destination
    pub bytes_produced: usize
}

enum Lifecycle {
    Active(Box<dyn Coder>),
    Ended
}

/// One open compression or decompression stream
///
/// A session is created with [Session::compressor] or [Session::decompressor],
/// driven by repeated calls to [Session::step] and closed with [Session::end].
/// Dropping a session releases its state as well
pub struct Session {
    params: Params,
    lifecycle: Lifecycle,
    finished: bool
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("params", &self.params)
            .field("finished", &self.finished)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Session {
    /// Creates a new compressing session producing a zlib stream
    pub fn compressor(level: Level) -> Result<Self, SessionError> {
        Self::compressor_with_format(level, Format::Zlib)
    }

    /// Creates a new compressing session producing the specified format.
    /// [Format::Auto] is only meaningful for decompression and is rejected
    pub fn compressor_with_format(level: Level, format: Format) -> Result<Self, SessionError> {
        let mode = Mode::Compressing;
        let coder = Deflater::new(level, format)
            .map_err(|fault| init_error(mode, fault))?;

        debug!(?level, ?format, "created compressing session");
        Ok(Self::with_coder(Params::Compress { level, format }, Box::new(coder)))
    }

    /// Creates a new decompressing session. Without window bits the
    /// session expects a zlib stream with a window of up to 32 KiB
    pub fn decompressor(window_bits: Option<i32>) -> Result<Self, SessionError> {
        let mode = Mode::Decompressing;
        let window_bits = match window_bits {
            Some(raw) => WindowBits::from_raw(raw)
                .ok_or_else(|| init_error(mode, Fault::new(StatusCode::StreamError, format!("invalid window bits {raw}"))))?,
            None => WindowBits::default()
        };

        debug!(window_bits = window_bits.raw(), "created decompressing session");
        Ok(Self::with_coder(Params::Decompress { window_bits }, Box::new(Inflater::new(window_bits))))
    }

    fn with_coder(params: Params, coder: Box<dyn Coder>) -> Self {
        Self {
            params,
            lifecycle: Lifecycle::Active(coder),
            finished: false
        }
    }

    pub fn params(&self) -> Params {
        self.params
    }

    pub fn mode(&self) -> Mode {
        match self.params {
            Params::Compress { .. } => Mode::Compressing,
            Params::Decompress { .. } => Mode::Decompressing
        }
    }

    /// Returns whether the engine has signalled the end of the stream
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns whether [Session::end] has been called
    pub fn is_closed(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Ended)
    }

    /// Total amount of bytes consumed by all steps so far
    pub fn total_in(&self) -> u64 {
        match &self.lifecycle {
            Lifecycle::Active(coder) => coder.total_in(),
            Lifecycle::Ended => 0
        }
    }

    /// Total amount of bytes produced by all steps so far
    pub fn total_out(&self) -> u64 {
        match &self.lifecycle {
            Lifecycle::Active(coder) => coder.total_out(),
            Lifecycle::Ended => 0
        }
    }

    /// Advances the stream once. Reads from the start of source and
    /// writes to the start of dest
    ///
    /// The result tells how much of each buffer was used. If the stream
    /// has not ended, the caller should call step again with the rest of
    /// the source and a fresh destination. Calling step with an empty
    /// source and [FlushMode::NoFlush] is a no-op
    pub fn step(&mut self, flush: FlushMode, source: &[u8], dest: &mut [u8]) -> Result<StepResult, SessionError> {
        let mode = self.mode();
        let Lifecycle::Active(coder) = &mut self.lifecycle else {
            return Err(SessionError::SessionClosed);
        };

        let progress = coder.advance(source, dest, flush)
            .map_err(|fault| codec_error(mode, fault))?;

        match progress.status {
            StatusCode::Ok | StatusCode::StreamEnd => {},
            StatusCode::BufError if source.is_empty() && flush == FlushMode::NoFlush => {},
            status => return Err(codec_error(mode, Fault::new(status, status.describe())))
        }

        let stream_ended = progress.status == StatusCode::StreamEnd;
        self.finished |= stream_ended;

        trace!(
            ?flush,
            consumed = progress.consumed,
            produced = progress.produced,
            stream_ended,
            "{} step", mode.step_op()
        );

        Ok(StepResult {
            stream_ended,
            bytes_consumed: progress.consumed,
            bytes_produced: progress.produced
        })
    }

    /// Same as [Session::step], but takes (buffer, offset, length) views.
    /// Both views are checked before the engine is touched
    pub fn step_slices(&mut self, flush: FlushMode, source: BufferSlice, mut dest: BufferSliceMut) -> Result<StepResult, SessionError> {
        if self.is_closed() {
            return Err(SessionError::SessionClosed);
        }

        let source = source.bind()?;
        let dest = dest.bind()?;
        self.step(flush, source, dest)
    }

    /// Closes the session and releases its state. The state is released
    /// even if an error is returned. Fails with [SessionError::SessionClosed]
    /// if the session was already closed
    pub fn end(&mut self) -> Result<(), SessionError> {
        let mode = self.mode();
        let Lifecycle::Active(mut coder) = std::mem::replace(&mut self.lifecycle, Lifecycle::Ended) else {
            return Err(SessionError::SessionClosed);
        };

        let released = coder.release();
        drop(coder);

        match released {
            Ok(()) => {
                debug!(?mode, "ended session");
                Ok(())
            },
            Err(fault) => {
                warn!(?mode, status = %fault.status, message = %fault.message, "session ended with an error");
                Err(SessionError::Teardown {
                    op: mode.end_op(),
                    status: fault.status,
                    message: fault.message
                })
            }
        }
    }

    /// Returns the header of the gzip member being decompressed,
    /// once it has been read completely
    #[cfg(feature = "gzip")]
    pub fn gzip_header(&self) -> Option<&GzipHeader> {
        match &self.lifecycle {
            Lifecycle::Active(coder) => coder.gzip_header(),
            Lifecycle::Ended => None
        }
    }
}

fn init_error(mode: Mode, fault: Fault) -> SessionError {
    SessionError::Init {
        op: mode.init_op(),
        status: fault.status,
        message: fault.message
    }
}

fn codec_error(mode: Mode, fault: Fault) -> SessionError {
    SessionError::Codec {
        op: mode.step_op(),
        status: fault.status,
        message: fault.message
    }
}
