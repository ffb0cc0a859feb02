#![allow(dead_code)]

use stream_deflate::{BufferSlice, BufferSliceMut, FlushMode, Level, Session};

/// Compresses data fed in pieces of in_chunk bytes, applying flush after
/// every piece, into destinations of out_chunk bytes
pub fn compress_chunked(data: &[u8], level: Level, flush: FlushMode, in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut session = stream_deflate::create_compressor(level).unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; out_chunk];

    for piece in data.chunks(in_chunk) {
        let mut rest = piece;
        loop {
            let step = match stream_deflate::step(&mut session, flush, BufferSlice::whole(rest), BufferSliceMut::whole(&mut buf)) {
                Ok(step) => step,
                // Nothing left to flush
                Err(e) if e.is_recoverable() && rest.is_empty() => break,
                Err(e) => panic!("compression failed: {e}")
            };

            assert!(step.bytes_consumed <= rest.len());
            assert!(step.bytes_produced <= buf.len());

            rest = &rest[step.bytes_consumed..];
            out.extend_from_slice(&buf[..step.bytes_produced]);

            if rest.is_empty() && step.bytes_produced < buf.len() {
                break;
            }
        }
    }

    finish(&mut session, &mut buf, &mut out);
    stream_deflate::end(&mut session).unwrap();
    out
}

fn finish(session: &mut Session, buf: &mut [u8], out: &mut Vec<u8>) {
    loop {
        let step = session.step(FlushMode::Finish, &[], buf).unwrap();
        out.extend_from_slice(&buf[..step.bytes_produced]);
        if step.stream_ended {
            return;
        }
    }
}

/// Decompresses a complete stream fed in pieces of in_chunk bytes into
/// destinations of out_chunk bytes
pub fn decompress_chunked(stream: &[u8], window_bits: Option<i32>, in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut session = stream_deflate::create_decompressor(window_bits).unwrap();
    let out = inflate_with(&mut session, stream, in_chunk, out_chunk);
    stream_deflate::end(&mut session).unwrap();
    out
}

pub fn inflate_with(session: &mut Session, stream: &[u8], in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; out_chunk];
    let mut rest = stream;

    loop {
        let piece = &rest[..std::cmp::min(in_chunk, rest.len())];
        let step = session.step(FlushMode::NoFlush, piece, &mut buf).unwrap();

        assert!(step.bytes_consumed <= piece.len());
        assert!(step.bytes_produced <= buf.len());

        rest = &rest[step.bytes_consumed..];
        out.extend_from_slice(&buf[..step.bytes_produced]);

        if step.stream_ended {
            assert!(rest.is_empty(), "{} bytes left after the end of the stream", rest.len());
            return out;
        }

        if rest.is_empty() && step.bytes_produced == 0 {
            panic!("stream did not end");
        }
    }
}
