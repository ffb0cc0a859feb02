use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher;

use super::params::Level;

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
pub const GZIP_HEADER_CONSTANT_SIZE: usize = 10;
pub const GZIP_TRAILER_SIZE: usize = 8;

const METHOD_DEFLATE: u8 = 8;
const OS_UNKNOWN: u8 = 255;

/// Longest file name or comment kept from a header. The rest is skipped
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

const FLAG_TEXT: u8 = 0x01;
const FLAG_HCRC: u8 = 0x02;
const FLAG_EXTRA: u8 = 0x04;
const FLAG_NAME: u8 = 0x08;
const FLAG_COMMENT: u8 = 0x10;
const FLAG_RESERVED: u8 = 0xe0;

/// The decoded header of a gzip member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GzipHeader {
    pub text: bool,
    pub mtime: u32,
    pub extra_flags: u8,
    pub os: u8,

    pub extra: Option<Vec<u8>>,
    pub filename: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,

    /// Whether the header carried its own CRC-16 (which was verified)
    pub header_crc: bool
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Constant,
    ExtraLength,
    Extra(usize),
    Name,
    Comment,
    Crc,
    Complete
}

/// Incremental gzip header reader. Bytes may arrive in pieces of any size
#[derive(Debug)]
pub struct HeaderParser {
    field: Field,
    scratch: Vec<u8>,
    terminated: bool,
    flags: u8,
    header: GzipHeader,
    hasher: Hasher
}

impl HeaderParser {
    pub fn new() -> Self {
        Self {
            field: Field::Constant,
            scratch: Vec::with_capacity(GZIP_HEADER_CONSTANT_SIZE),
            terminated: false,
            flags: 0,
            header: GzipHeader::default(),
            hasher: Hasher::new()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.field == Field::Complete
    }

    pub fn into_header(self) -> GzipHeader {
        self.header
    }

    /// Consumes header bytes from data. Returns how many bytes
    /// were used, which may be less than provided if the header
    /// ends inside of data
    pub fn feed(&mut self, data: &[u8]) -> Result<usize, &'static str> {
        let mut used = 0;
        while used < data.len() && self.field != Field::Complete {
            let rest = &data[used..];
            let taken = match self.field {
                Field::Constant => self.fill(rest, GZIP_HEADER_CONSTANT_SIZE),
                Field::ExtraLength => self.fill(rest, 2),
                Field::Extra(length) => self.fill(rest, length),
                Field::Crc => self.fill(rest, 2),
                Field::Name | Field::Comment => self.fill_string(rest),
                Field::Complete => 0
            };

            if self.field != Field::Crc {
                self.hasher.update(&rest[..taken]);
            }
            used += taken;

            self.advance()?;
        }

        Ok(used)
    }

    fn fill(&mut self, data: &[u8], size: usize) -> usize {
        let wanted = size - self.scratch.len();
        let taken = std::cmp::min(wanted, data.len());
        self.scratch.extend_from_slice(&data[..taken]);
        taken
    }

    fn fill_string(&mut self, data: &[u8]) -> usize {
        let (end, taken) = match data.iter().position(|b| *b == 0) {
            Some(end) => (end, end + 1),
            None => (data.len(), data.len())
        };

        let room = MAX_STRING_LEN.saturating_sub(self.scratch.len());
        self.scratch.extend_from_slice(&data[..std::cmp::min(end, room)]);
        self.terminated = taken > end;
        taken
    }

    fn field_done(&self) -> bool {
        match self.field {
            Field::Constant => self.scratch.len() == GZIP_HEADER_CONSTANT_SIZE,
            Field::ExtraLength | Field::Crc => self.scratch.len() == 2,
            Field::Extra(length) => self.scratch.len() == length,
            Field::Name | Field::Comment => self.terminated,
            Field::Complete => true
        }
    }

    fn advance(&mut self) -> Result<(), &'static str> {
        if !self.field_done() {
            return Ok(());
        }

        let scratch = std::mem::take(&mut self.scratch);
        self.terminated = false;
        match self.field {
            Field::Constant => {
                if scratch[..2] != GZIP_MAGIC {
                    return Err("incorrect header check");
                }
                if scratch[2] != METHOD_DEFLATE {
                    return Err("unknown compression method");
                }

                self.flags = scratch[3];
                if self.flags & FLAG_RESERVED != 0 {
                    return Err("unknown header flags set");
                }

                self.header.text = self.flags & FLAG_TEXT != 0;
                self.header.mtime = LittleEndian::read_u32(&scratch[4..8]);
                self.header.extra_flags = scratch[8];
                self.header.os = scratch[9];
            },

            Field::ExtraLength => {
                let length = LittleEndian::read_u16(&scratch) as usize;
                if length != 0 {
                    self.field = Field::Extra(length);
                    return Ok(());
                }
                self.header.extra = Some(Vec::new());
            },

            Field::Extra(..) => self.header.extra = Some(scratch),

            Field::Name => self.header.filename = Some(scratch),

            Field::Comment => self.header.comment = Some(scratch),

            Field::Crc => {
                let expected = LittleEndian::read_u16(&scratch);
                let actual = self.hasher.clone().finalize() as u16;
                if expected != actual {
                    return Err("header crc mismatch");
                }
                self.header.header_crc = true;
            },

            Field::Complete => {}
        }

        self.field = self.next_field();
        Ok(())
    }

    fn next_field(&self) -> Field {
        let order = [
            (Field::Constant, 0),
            (Field::ExtraLength, FLAG_EXTRA),
            (Field::Name, FLAG_NAME),
            (Field::Comment, FLAG_COMMENT),
            (Field::Crc, FLAG_HCRC)
        ];

        let current = match self.field {
            Field::Extra(..) => Field::ExtraLength,
            field => field
        };

        order.iter()
            .skip_while(|(field, _)| *field != current)
            .skip(1)
            .find(|(_, flag)| self.flags & flag != 0)
            .map(|(field, _)| *field)
            .unwrap_or(Field::Complete)
    }
}

/// Incremental reader of the 8 byte member trailer
#[derive(Debug, Default)]
pub struct TrailerReader {
    bytes: Vec<u8>
}

impl TrailerReader {
    pub fn feed(&mut self, data: &[u8]) -> usize {
        let taken = std::cmp::min(GZIP_TRAILER_SIZE - self.bytes.len(), data.len());
        self.bytes.extend_from_slice(&data[..taken]);
        taken
    }

    pub fn is_complete(&self) -> bool {
        self.bytes.len() == GZIP_TRAILER_SIZE
    }

    /// Checks the trailer against the CRC-32 and length of the
    /// produced data
    pub fn verify(&self, crc: u32, size: u32) -> Result<(), &'static str> {
        if LittleEndian::read_u32(&self.bytes[..4]) != crc {
            return Err("incorrect data check");
        }
        if LittleEndian::read_u32(&self.bytes[4..]) != size {
            return Err("incorrect length check");
        }
        Ok(())
    }
}

/// CRC-32 and length of the uncompressed data of a member
#[derive(Debug, Default)]
pub struct Summary {
    hasher: Hasher,
    size: u32
}

impl Summary {
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.size = self.size.wrapping_add(data.len() as u32);
    }

    /// Returns the CRC-32 and the length modulo 2^32
    pub fn finish(self) -> (u32, u32) {
        (self.hasher.finalize(), self.size)
    }
}

/// Builds the header written in front of a compressed member
pub fn header_bytes(level: Level) -> Vec<u8> {
    let extra_flags = match level {
        Level::BestCompression => 2,
        Level::BestSpeed | Level::NoCompression => 4,
        Level::Default => 0
    };

    let mut header = Vec::with_capacity(GZIP_HEADER_CONSTANT_SIZE);
    header.extend_from_slice(&GZIP_MAGIC);
    header.extend_from_slice(&[METHOD_DEFLATE, 0]);
    header.extend_from_slice(&[0; 4]);
    header.extend_from_slice(&[extra_flags, OS_UNKNOWN]);
    header
}

/// Builds the trailer written after a compressed member
pub fn trailer_bytes(crc: u32, size: u32) -> [u8; GZIP_TRAILER_SIZE] {
    let mut trailer = [0; GZIP_TRAILER_SIZE];
    LittleEndian::write_u32(&mut trailer[..4], crc);
    LittleEndian::write_u32(&mut trailer[4..], size);
    trailer
}

#[cfg(test)]
mod tests {
    use super::{header_bytes, trailer_bytes, GzipHeader, HeaderParser, TrailerReader, MAX_STRING_LEN};
    use crate::session::params::Level;

    fn full_header() -> Vec<u8> {
        let mut bytes = vec![0x1f, 0x8b, 8, 0x1e, 0x78, 0x56, 0x34, 0x12, 0, 3];
        bytes.extend_from_slice(&[3, 0, b'a', b'b', b'c']);
        bytes.extend_from_slice(b"name.txt\0");
        bytes.extend_from_slice(b"hi\0");

        let crc = crate::crc32(0, &bytes) as u16;
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes
    }

    #[test]
    fn parses_header_byte_by_byte() {
        let bytes = full_header();

        let mut parser = HeaderParser::new();
        for (i, byte) in bytes.iter().enumerate() {
            assert!(!parser.is_complete(), "{i}");
            assert_eq!(parser.feed(std::slice::from_ref(byte)), Ok(1));
        }
        assert!(parser.is_complete());

        assert_eq!(parser.into_header(), GzipHeader {
            text: false,
            mtime: 0x12345678,
            extra_flags: 0,
            os: 3,
            extra: Some(b"abc".to_vec()),
            filename: Some(b"name.txt".to_vec()),
            comment: Some(b"hi".to_vec()),
            header_crc: true
        });
    }

    #[test]
    fn stops_at_end_of_header() {
        let mut bytes = header_bytes(Level::Default);
        bytes.extend_from_slice(&[0xaa, 0xbb]);

        let mut parser = HeaderParser::new();
        assert_eq!(parser.feed(&bytes), Ok(10));
        assert!(parser.is_complete());
        assert_eq!(parser.into_header().os, 255);
    }

    #[test]
    fn rejects_bad_headers() {
        let mut bytes = header_bytes(Level::Default);
        bytes[1] = 0x8c;
        assert_eq!(HeaderParser::new().feed(&bytes), Err("incorrect header check"));

        let mut bytes = header_bytes(Level::Default);
        bytes[2] = 7;
        assert_eq!(HeaderParser::new().feed(&bytes), Err("unknown compression method"));

        let mut bytes = header_bytes(Level::Default);
        bytes[3] = 0x20;
        assert_eq!(HeaderParser::new().feed(&bytes), Err("unknown header flags set"));

        let mut bytes = full_header();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert_eq!(HeaderParser::new().feed(&bytes), Err("header crc mismatch"));
    }

    #[test]
    fn long_names_are_truncated() {
        let mut bytes = header_bytes(Level::Default);
        bytes[3] = 0x08;

        let mut parser = HeaderParser::new();
        assert_eq!(parser.feed(&bytes), Ok(10));

        let name = vec![b'n'; 3 * MAX_STRING_LEN];
        for piece in name.chunks(5000) {
            assert_eq!(parser.feed(piece), Ok(piece.len()));
            assert!(!parser.is_complete());
            assert!(parser.scratch.len() <= MAX_STRING_LEN);
        }

        assert_eq!(parser.feed(b"\0rest"), Ok(1));
        assert!(parser.is_complete());

        let filename = parser.into_header().filename.unwrap();
        assert_eq!(filename.len(), MAX_STRING_LEN);
        assert!(filename.iter().all(|b| *b == b'n'));
    }

    #[test]
    fn trailer_checks() {
        let mut reader = TrailerReader::default();
        let trailer = trailer_bytes(0xdeadbeef, 42);
        assert_eq!(reader.feed(&trailer[..3]), 3);
        assert!(!reader.is_complete());
        assert_eq!(reader.feed(&trailer[3..]), 5);
        assert!(reader.is_complete());

        assert_eq!(reader.verify(0xdeadbeef, 42), Ok(()));
        assert_eq!(reader.verify(0xdeadbeee, 42), Err("incorrect data check"));
        assert_eq!(reader.verify(0xdeadbeef, 41), Err("incorrect length check"));
    }
}
