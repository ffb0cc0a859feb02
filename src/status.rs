use num_enum::FromPrimitive;

/// A status code reported by the compression engine
///
/// Codes outside of the known table are kept verbatim in
/// [StatusCode::Other], so they can still be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    StreamEnd = 1,
    NeedDict = 2,
    ErrNo = -1,
    StreamError = -2,
    DataError = -3,
    MemError = -4,
    BufError = -5,
    VersionError = -6,

    #[num_enum(catch_all)]
    Other(i32) = i32::MIN
}

impl StatusCode {
    /// Returns the raw numeric value of this status
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::StreamEnd => 1,
            Self::NeedDict => 2,
            Self::ErrNo => -1,
            Self::StreamError => -2,
            Self::DataError => -3,
            Self::MemError => -4,
            Self::BufError => -5,
            Self::VersionError => -6,
            Self::Other(code) => code
        }
    }

    /// Returns whether the engine considers this status an error
    pub fn is_error(self) -> bool {
        self.code() < 0
    }

    /// Returns whether a stream that reported this status can be
    /// continued by retrying with more buffer space
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::BufError)
    }

    /// A short human readable description, same wording as zlib
    pub fn describe(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::StreamEnd => "stream end",
            Self::NeedDict => "need dictionary",
            Self::ErrNo => "file error",
            Self::StreamError => "stream error",
            Self::DataError => "data error",
            Self::MemError => "insufficient memory",
            Self::BufError => "buffer error",
            Self::VersionError => "incompatible version",
            Self::Other(_) => "unknown status"
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(code) => write!(f, "unknown status ({code})"),
            _ => write!(f, "{} ({})", self.describe(), self.code())
        }
    }
}
