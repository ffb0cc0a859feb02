/// Provides the streaming compression and decompression session
pub mod session;

/// Provides (buffer, offset, length) views over caller-owned memory
pub mod slice;

/// Provides the engine status codes
pub mod status;

/// Provides CRC-32 and engine version utilities
pub mod checksum;

/// Provides single call decompression
pub mod oneshot;

/// Provides a handle based arena of sessions
pub mod manager;

/// Provides a driver that runs a session over whole buffers
pub mod pump;

pub use checksum::{crc32, engine_version};
pub use manager::{Handle, SessionManager};
pub use oneshot::decompress_one_shot;
pub use pump::{compress_to_vec, decompress_to_vec, Pump, PumpConfig, PumpError};
pub use session::{FlushMode, Format, Level, Mode, Params, Session, SessionError, StepResult, WindowBits};
pub use slice::{BufferSlice, BufferSliceMut};
pub use status::StatusCode;

#[cfg(feature = "gzip")]
pub use session::GzipHeader;

/// Creates a compressing session producing a zlib stream
pub fn create_compressor(level: Level) -> Result<Session, SessionError> {
    Session::compressor(level)
}

/// Creates a decompressing session. See [WindowBits] for the accepted values
pub fn create_decompressor(window_bits: Option<i32>) -> Result<Session, SessionError> {
    Session::decompressor(window_bits)
}

/// Advances the session once over the viewed buffers
pub fn step(session: &mut Session, flush: FlushMode, source: BufferSlice, dest: BufferSliceMut) -> Result<StepResult, SessionError> {
    session.step_slices(flush, source, dest)
}

/// Closes the session, releasing its state
pub fn end(session: &mut Session) -> Result<(), SessionError> {
    session.end()
}
