use flate2::{Compression, FlushCompress, FlushDecompress};

/// Compression levels a compressing session can be created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    NoCompression,
    BestSpeed,
    BestCompression,

    #[default]
    Default
}

impl Level {
    /// Returns the zlib numeric value of this level
    pub fn code(self) -> i32 {
        match self {
            Self::NoCompression => 0,
            Self::BestSpeed => 1,
            Self::BestCompression => 9,
            Self::Default => -1
        }
    }

    pub(crate) fn compression(self) -> Compression {
        match self {
            Self::NoCompression => Compression::none(),
            Self::BestSpeed => Compression::fast(),
            Self::BestCompression => Compression::best(),
            Self::Default => Compression::default()
        }
    }
}

impl TryFrom<i32> for Level {
    type Error = i32;

    /// Accepts the zlib numeric values of the four levels. The
    /// default level is accepted both as -1 and as 6
    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::NoCompression),
            1 => Ok(Self::BestSpeed),
            9 => Ok(Self::BestCompression),
            -1 | 6 => Ok(Self::Default),
            _ => Err(code)
        }
    }
}

/// The container wrapped around a DEFLATE body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// RFC 1950 header and Adler-32 trailer
    #[default]
    Zlib,

    /// Bare RFC 1951 data
    Raw,

    /// RFC 1952 header and CRC-32/size trailer
    #[cfg(feature = "gzip")]
    Gzip,

    /// Gzip or zlib, decided by the first byte. Decompression only
    #[cfg(feature = "gzip")]
    Auto
}

/// Decompression window bits, following the zlib integer convention
///
/// * `0`: zlib wrapper, window size read from the stream header
/// * `8..=15`: zlib wrapper with a window of `2^n` bytes
/// * `-8..=-15`: raw DEFLATE
/// * `16 + n`: gzip wrapper only
/// * `32 + n`: gzip or zlib, detected from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBits {
    format: Format,
    bits: u8
}

impl Default for WindowBits {
    /// zlib wrapper with a 32 KiB window
    fn default() -> Self {
        Self {
            format: Format::Zlib,
            bits: Self::MAX_BITS
        }
    }
}

impl WindowBits {
    pub const MIN_BITS: u8 = 8;
    pub const MAX_BITS: u8 = 15;

    /// Parses a zlib window bits value. Returns None if it is
    /// out of range or names a wrapper this build does not support
    pub fn from_raw(raw: i32) -> Option<Self> {
        let (format, bits) = if raw < 0 {
            (Format::Raw, raw.checked_neg()?)
        } else {
            let format = match raw >> 4 {
                0 => Format::Zlib,

                #[cfg(feature = "gzip")]
                1 => Format::Gzip,

                #[cfg(feature = "gzip")]
                2 => Format::Auto,

                _ => return None
            };
            (format, raw & 15)
        };

        let bits = u8::try_from(bits).ok()?;
        let from_header = bits == 0 && format != Format::Raw;
        if !from_header && !(Self::MIN_BITS..=Self::MAX_BITS).contains(&bits) {
            return None;
        }

        Some(Self {
            format,
            bits
        })
    }

    /// Returns the zlib integer this value was parsed from
    pub fn raw(self) -> i32 {
        let bits = self.bits as i32;
        match self.format {
            Format::Zlib => bits,
            Format::Raw => -bits,

            #[cfg(feature = "gzip")]
            Format::Gzip => 16 + bits,

            #[cfg(feature = "gzip")]
            Format::Auto => 32 + bits
        }
    }

    pub fn format(self) -> Format {
        self.format
    }

    /// Returns the configured window exponent, or None if
    /// it is taken from the stream header
    pub fn bits(self) -> Option<u8> {
        (self.bits != 0).then_some(self.bits)
    }
}

/// How aggressively the engine should emit pending output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    #[default]
    NoFlush,
    SyncFlush,
    FullFlush,
    Finish,
    Block
}

impl FlushMode {
    /// Orders flush modes by strength, same ranking as zlib
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::NoFlush => 0,
            Self::Block => 1,
            Self::SyncFlush => 2,
            Self::FullFlush => 3,
            Self::Finish => 4
        }
    }

    pub(crate) fn for_compress(self) -> FlushCompress {
        match self {
            Self::NoFlush => FlushCompress::None,
            Self::SyncFlush => FlushCompress::Sync,
            Self::FullFlush => FlushCompress::Full,
            Self::Finish => FlushCompress::Finish,
            Self::Block => FlushCompress::Partial
        }
    }

    // Finish is a hint here: the rust engine turns a first-call
    // Finish into a single-shot decode that cannot be resumed
    pub(crate) fn for_decompress(self) -> FlushDecompress {
        match self {
            Self::SyncFlush | Self::FullFlush => FlushDecompress::Sync,
            Self::NoFlush | Self::Finish | Self::Block => FlushDecompress::None
        }
    }
}
