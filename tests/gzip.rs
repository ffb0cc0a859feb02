#![cfg(feature = "gzip")]

use stream_deflate::{crc32, decompress_to_vec, FlushMode, Format, Level, Session, SessionError, StatusCode};

mod common;

const FLAG_HCRC: u8 = 0x02;
const FLAG_EXTRA: u8 = 0x04;
const FLAG_NAME: u8 = 0x08;
const FLAG_COMMENT: u8 = 0x10;

/// Builds a gzip member around a raw deflate body by hand
fn member(data: &[u8], flags: u8) -> Vec<u8> {
    let mut stream = vec![0x1f, 0x8b, 8, flags, 0x78, 0x56, 0x34, 0x12, 0, 3];

    if flags & FLAG_EXTRA != 0 {
        stream.extend_from_slice(&[4, 0, b'A', b'B', 0, 0]);
    }
    if flags & FLAG_NAME != 0 {
        stream.extend_from_slice(b"hello.txt\0");
    }
    if flags & FLAG_COMMENT != 0 {
        stream.extend_from_slice(b"a comment\0");
    }
    if flags & FLAG_HCRC != 0 {
        let header_crc = crc32(0, &stream) as u16;
        stream.extend_from_slice(&header_crc.to_le_bytes());
    }

    stream.extend_from_slice(&raw_deflate(data));
    stream.extend_from_slice(&crc32(0, data).to_le_bytes());
    stream.extend_from_slice(&(data.len() as u32).to_le_bytes());
    stream
}

fn raw_deflate(data: &[u8]) -> Vec<u8> {
    let mut session = Session::compressor_with_format(Level::Default, Format::Raw).unwrap();
    let mut buf = vec![0u8; data.len() + 64];
    let step = session.step(FlushMode::Finish, data, &mut buf).unwrap();
    assert!(step.stream_ended);
    buf.truncate(step.bytes_produced);
    buf
}

#[test]
fn hand_built_member_with_every_field() {
    let data = b"gzip member with all the optional header fields".repeat(4);
    let stream = member(&data, FLAG_HCRC | FLAG_EXTRA | FLAG_NAME | FLAG_COMMENT);

    let mut session = stream_deflate::create_decompressor(Some(31)).unwrap();
    assert_eq!(common::inflate_with(&mut session, &stream, 3, 5), data);

    let header = session.gzip_header().unwrap();
    assert_eq!(header.mtime, 0x12345678);
    assert_eq!(header.os, 3);
    assert_eq!(header.extra.as_deref(), Some(&[b'A', b'B', 0, 0][..]));
    assert_eq!(header.filename.as_deref(), Some(&b"hello.txt"[..]));
    assert_eq!(header.comment.as_deref(), Some(&b"a comment"[..]));
    assert!(header.header_crc);

    assert_eq!(session.total_in(), stream.len() as u64);
    stream_deflate::end(&mut session).unwrap();
}

#[test]
fn auto_detection_handles_both_wrappers() {
    let data = b"detected, detected, detected".to_vec();

    let gzip = member(&data, FLAG_NAME);
    assert_eq!(decompress_to_vec(&gzip, Some(47)).unwrap(), data);

    let zlib = stream_deflate::compress_to_vec(&data, Level::BestSpeed).unwrap();
    assert_eq!(decompress_to_vec(&zlib, Some(47)).unwrap(), data);
}

#[test]
fn compressed_gzip_is_readable() {
    let data = b"written as gzip, read back as gzip ".repeat(100);

    let mut session = Session::compressor_with_format(Level::BestCompression, Format::Gzip).unwrap();
    let mut stream = Vec::new();
    let mut buf = [0u8; 3];
    let mut rest = &data[..];
    loop {
        let step = session.step(FlushMode::Finish, rest, &mut buf).unwrap();
        rest = &rest[step.bytes_consumed..];
        stream.extend_from_slice(&buf[..step.bytes_produced]);
        if step.stream_ended {
            break;
        }
    }
    session.end().unwrap();

    assert_eq!(&stream[..3], &[0x1f, 0x8b, 8]);
    assert_eq!(common::decompress_chunked(&stream, Some(31), 11, 13), data);
}

#[test]
fn corrupted_header_crc_is_rejected() {
    let mut stream = member(b"abc", FLAG_HCRC);
    stream[10] ^= 0xff;

    let mut buf = [0u8; 64];
    let mut session = stream_deflate::create_decompressor(Some(31)).unwrap();
    let err = session.step(FlushMode::NoFlush, &stream, &mut buf).unwrap_err();
    assert!(matches!(&err, SessionError::Codec { status: StatusCode::DataError, .. }), "{err}");
    assert!(err.to_string().contains("header crc mismatch"), "{err}");
}

#[test]
fn corrupted_trailer_is_rejected() {
    let mut stream = member(b"trailer check", 0);
    let last = stream.len() - 1;
    stream[last] ^= 0x01;

    let mut buf = [0u8; 64];
    let mut session = stream_deflate::create_decompressor(Some(31)).unwrap();
    let err = session.step(FlushMode::Finish, &stream, &mut buf).unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::DataError));
    assert!(err.to_string().contains("incorrect length check"), "{err}");
}

#[test]
fn reserved_flags_are_rejected() {
    let mut stream = member(b"reserved", 0);
    stream[3] = 0x20;

    let mut buf = [0u8; 64];
    let mut session = stream_deflate::create_decompressor(Some(31)).unwrap();
    let err = session.step(FlushMode::NoFlush, &stream, &mut buf).unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::DataError));
}

#[test]
fn auto_format_cannot_compress() {
    let err = Session::compressor_with_format(Level::Default, Format::Auto).unwrap_err();
    assert!(matches!(err, SessionError::Init { op: "deflateInit", status: StatusCode::StreamError, .. }));
}
