//! Error types surfaced by the tag model, codec, file wrapper, and region container.

use std::fmt;
use std::io;
use std::string::FromUtf8Error;

/// Errors that may be encountered when constructing, parsing, or encoding
/// `NbtTag` trees, or when reading/writing a standalone NBT file.
#[derive(Debug)]
pub enum NbtError {
    /// Wraps errors emitted by methods during I/O operations.
    IoError(io::Error),
    /// The wire format was violated: truncated input, a declared length that exceeds the
    /// remaining bytes, an unknown tag or compression id, or invalid UTF-8.
    MalformedData(String),
    /// A scalar value (or array element) fell outside the range its variant allows.
    ValueConstraint(String),
    /// A `List` insertion used a tag whose variant doesn't match the list's element type, or a
    /// `merge`/`update` encountered tags of differing variants under the same name.
    TypeMismatch(String),
    /// `Compound::add` was called with `replace = false` for a name that already exists.
    DuplicateName(String),
    /// An unknown file-open mode, compression selector, or malformed caller-supplied template.
    InvalidArgument(String),
    /// Indexed access into a compound for a name that isn't present.
    NotFound(String),
}

impl fmt::Display for NbtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NbtError::IoError(e) => write!(f, "I/O error: {}", e),
            NbtError::MalformedData(msg) => write!(f, "malformed NBT data: {}", msg),
            NbtError::ValueConstraint(msg) => write!(f, "value out of range: {}", msg),
            NbtError::TypeMismatch(msg) => write!(f, "tag type mismatch: {}", msg),
            NbtError::DuplicateName(name) => write!(f, "duplicate tag name: {}", name),
            NbtError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            NbtError::NotFound(name) => write!(f, "no tag named {:?}", name),
        }
    }
}

impl std::error::Error for NbtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NbtError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NbtError {
    fn from(e: io::Error) -> NbtError {
        NbtError::IoError(e)
    }
}

impl From<FromUtf8Error> for NbtError {
    fn from(_: FromUtf8Error) -> NbtError {
        NbtError::MalformedData("string is not valid UTF-8".into())
    }
}

/// Errors specific to the Region container, layered on top of `NbtError` for the codec failures
/// that can occur while decoding or encoding an individual chunk blob.
#[derive(Debug)]
pub enum RegionError {
    /// Wraps errors emitted by methods during I/O operations.
    IoError(io::Error),
    /// The chunk blob itself, or the NBT payload inside it, violated the wire format.
    MalformedData(String),
    /// `save_chunk`/`save_all` was called with a compression selector other than
    /// `gzip`/`zlib`/`none`.
    InvalidArgument(String),
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::IoError(e) => write!(f, "I/O error: {}", e),
            RegionError::MalformedData(msg) => write!(f, "malformed region data: {}", msg),
            RegionError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for RegionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegionError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RegionError {
    fn from(e: io::Error) -> RegionError {
        RegionError::IoError(e)
    }
}

impl From<NbtError> for RegionError {
    fn from(e: NbtError) -> RegionError {
        match e {
            NbtError::IoError(e) => RegionError::IoError(e),
            NbtError::MalformedData(msg) => RegionError::MalformedData(msg),
            other => RegionError::MalformedData(other.to_string()),
        }
    }
}
