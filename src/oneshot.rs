use tracing::debug;

use crate::{session::{FlushMode, Session, SessionError}, status::StatusCode};

const OP: &str = "uncompress";

fn error(status: StatusCode, message: impl Into<String>) -> SessionError {
    SessionError::Codec {
        op: OP,
        status,
        message: message.into()
    }
}

/// Decompresses a complete zlib stream into dest in a single call and
/// returns how many bytes were written. The whole result must fit into dest
pub fn decompress_one_shot(dest: &mut [u8], source: &[u8]) -> Result<usize, SessionError> {
    let mut session = Session::decompressor(None)?;

    let outcome = session.step(FlushMode::Finish, source, dest);
    drop(session);

    let result = match outcome {
        Ok(step) if step.stream_ended => Ok(step.bytes_produced),
        Ok(step) if step.bytes_produced == dest.len() => Err(error(StatusCode::BufError, "output buffer too small")),
        Ok(..) => Err(error(StatusCode::DataError, "unexpected end of input")),

        Err(SessionError::Codec { status: StatusCode::BufError, .. }) if dest.is_empty() && !source.is_empty() => {
            Err(error(StatusCode::BufError, "output buffer too small"))
        },
        Err(SessionError::Codec { status: StatusCode::BufError, .. }) => Err(error(StatusCode::DataError, "unexpected end of input")),
        Err(SessionError::Codec { status, message, .. }) => Err(error(status, message)),
        Err(e) => Err(e)
    };

    if let Err(e) = &result {
        debug!(error = %e, source_len = source.len(), capacity = dest.len(), "one-shot decompression failed");
    }
    result
}

/// Same as [decompress_one_shot], but allocates a buffer of the
/// specified capacity and returns it truncated to the written length
pub fn decompress_to_capacity(capacity: usize, source: &[u8]) -> Result<Vec<u8>, SessionError> {
    let mut dest = vec![0u8; capacity];
    let written = decompress_one_shot(&mut dest, source)?;
    dest.truncate(written);
    Ok(dest)
}
