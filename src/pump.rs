use thiserror::Error;

use crate::{session::{FlushMode, Level, Session, SessionError}, status::StatusCode};

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("session failed: {0}")]
    Session(#[from] SessionError),

    #[error("pump was created with a zero chunk size")]
    ZeroChunkSize,

    #[error("error within callback: {0}")]
    FromCallback(#[from] anyhow::Error)
}

/// Settings for a [Pump]
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Size of the output buffer handed to every step (default: 64 KiB)
    pub chunk_size: usize
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024
        }
    }
}

/// Drives a [Session] over whole input buffers, handing produced
/// data to a callback in chunks of at most [PumpConfig::chunk_size]
pub struct Pump<'a> {
    session: Session,
    buffer: Vec<u8>,

    #[allow(clippy::type_complexity)]
    on_output: Option<Box<dyn FnMut(&[u8]) -> anyhow::Result<()> + 'a>>
}

impl std::fmt::Debug for Pump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pump")
            .field("session", &self.session)
            .field("chunk_size", &self.buffer.len())
            .finish()
    }
}

impl<'a> Pump<'a> {
    /// Creates a new Pump around the session
    pub fn new(session: Session, config: PumpConfig) -> Result<Self, PumpError> {
        if config.chunk_size == 0 {
            return Err(PumpError::ZeroChunkSize);
        }

        Ok(Self {
            session,
            buffer: vec![0; config.chunk_size],
            on_output: None
        })
    }

    /// Sets the output callback. The passed closure will be invoked
    /// with every chunk of data produced by the session
    pub fn set_callback(&mut self, on_output: impl FnMut(&[u8]) -> anyhow::Result<()> + 'a) {
        self.on_output = Some(Box::new(on_output));
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the session. It is not ended
    pub fn into_session(self) -> Session {
        self.session
    }

    /// Feeds data to the session. The callback may be fired any number of times
    ///
    /// The first return value is how much of the data was consumed, and the
    /// second one determines whether the stream has ended. Data is consumed
    /// completely unless the stream ends before its end
    pub fn update(&mut self, data: impl AsRef<[u8]>) -> Result<(usize, bool), PumpError> {
        let data = data.as_ref();

        let mut offset = 0;
        loop {
            let step = self.session.step(FlushMode::NoFlush, &data[offset..], &mut self.buffer)?;
            offset += step.bytes_consumed;
            self.emit(step.bytes_produced)?;

            if step.stream_ended {
                return Ok((offset, true));
            }

            // Input is used up and the buffer was not filled, nothing is pending
            if offset == data.len() && step.bytes_produced < self.buffer.len() {
                return Ok((offset, false));
            }
        }
    }

    /// Ends the stream, emitting all pending output. For decompression
    /// this fails if the data fed so far does not complete the stream
    pub fn finish(&mut self) -> Result<(), PumpError> {
        loop {
            let step = match self.session.step(FlushMode::Finish, &[], &mut self.buffer) {
                Ok(step) => step,
                Err(SessionError::Codec { op, status: StatusCode::BufError, .. }) => {
                    return Err(SessionError::Codec {
                        op,
                        status: StatusCode::BufError,
                        message: "stream ended before it was complete".into()
                    }.into());
                },
                Err(e) => return Err(e.into())
            };
            self.emit(step.bytes_produced)?;

            if step.stream_ended {
                return Ok(());
            }
        }
    }

    fn emit(&mut self, produced: usize) -> Result<(), PumpError> {
        if produced == 0 {
            return Ok(());
        }

        if let Some(on_output) = &mut self.on_output {
            (on_output)(&self.buffer[..produced])?;
        }
        Ok(())
    }
}

/// Runs data through a fresh session and collects the whole output
fn run(session: Session, data: &[u8]) -> Result<Vec<u8>, PumpError> {
    let mut output = Vec::new();
    let mut session = {
        let mut pump = Pump::new(session, PumpConfig::default())?;
        pump.set_callback(|chunk| {
            output.extend_from_slice(chunk);
            Ok(())
        });

        pump.update(data)?;
        pump.finish()?;
        pump.into_session()
    };

    session.end()?;
    Ok(output)
}

/// Compresses data into a complete zlib stream
pub fn compress_to_vec(data: impl AsRef<[u8]>, level: Level) -> Result<Vec<u8>, PumpError> {
    run(Session::compressor(level)?, data.as_ref())
}

/// Decompresses a complete stream of the format selected by window bits
/// (see [crate::session::WindowBits]). Bytes after the end of the stream are ignored
pub fn decompress_to_vec(data: impl AsRef<[u8]>, window_bits: Option<i32>) -> Result<Vec<u8>, PumpError> {
    run(Session::decompressor(window_bits)?, data.as_ref())
}
