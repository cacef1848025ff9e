//! Error types for GIF container parsing and LZW decoding.
//!
//! The shape mirrors what `netvl-immeta` hand-rolled for its own format
//! errors (a small enum of format-level kinds, built through terse
//! constructor macros that attach a `format!`-style context string), kept
//! here as a manual `Display` impl plus `std::error::Error` rather than the
//! teacher's pre-`?`-operator `try_if_eof!` built on `byteorder::Error`.
//! The LZW-internal error kinds are a separate, smaller enum derived with
//! `thiserror` (grounded in `examples/other_examples/…gered-ggdt…lzwgif.rs`,
//! which implements the same GIF-variant LZW algorithm family).

use std::borrow::Cow;
use std::fmt;

use thiserror::Error as ThisError;

/// Errors that can occur while walking the GIF container (header, block
/// dispatch, sub-block framing). LZW-internal failures are a distinct type,
/// [`LzwError`], because they carry the §7 recoverability distinction.
#[derive(Debug)]
pub enum Error {
    /// The first six bytes are not `GIF87a` or `GIF89a`.
    InvalidSignature([u8; 6]),

    /// A structurally well-formed-looking block failed a specific check
    /// (e.g. a graphics control extension whose declared block size isn't 4).
    InvalidFormat(Cow<'static, str>),

    /// The cursor ran out of bytes before a read could complete, optionally
    /// annotated with what was being read at the time.
    UnexpectedEndOfFile(Option<Cow<'static, str>>),

    /// Propagated from the LZW decoder while decoding one frame's image data.
    Lzw(LzwError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSignature(sig) => write!(f, "invalid GIF signature: {sig:?}"),
            Error::InvalidFormat(s) => write!(f, "{s}"),
            Error::UnexpectedEndOfFile(Some(ctx)) => {
                write!(f, "unexpected end of file when {ctx}")
            }
            Error::UnexpectedEndOfFile(None) => write!(f, "unexpected end of file"),
            Error::Lzw(e) => write!(f, "LZW decoding failed: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Lzw(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LzwError> for Error {
    #[inline]
    fn from(e: LzwError) -> Error {
        Error::Lzw(e)
    }
}

macro_rules! invalid_format {
    ($s:expr) => {
        $crate::error::Error::InvalidFormat($s.into())
    };
    ($fmt:expr, $($args:tt)*) => {
        $crate::error::Error::InvalidFormat(format!($fmt, $($args)*).into())
    };
}

macro_rules! unexpected_eof {
    () => {
        $crate::error::Error::UnexpectedEndOfFile(None)
    };
    ($s:expr) => {
        $crate::error::Error::UnexpectedEndOfFile(Some($s.into()))
    };
    ($fmt:expr, $($args:tt)*) => {
        $crate::error::Error::UnexpectedEndOfFile(Some(format!($fmt, $($args)*).into()))
    };
}

pub(crate) use invalid_format;
pub(crate) use unexpected_eof;

/// The five LZW decoding failure kinds from §7, kept distinct from
/// container-level [`Error`] because `UnterminatedStream` is explicitly
/// recoverable: the caller still gets the partially-filled frame.
#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum LzwError {
    /// Stream ended without an END code following the terminating zero-length
    /// sub-block. The frame decoded so far is still handed to the sink.
    #[error("LZW stream ended without an END code")]
    UnterminatedStream,

    /// The first code read was not the CLEAR code (`2^min_code_size`).
    #[error("initial LZW code was not the CLEAR code")]
    BadInitialCode,

    /// `min_code_size` was outside `[2, 8]`.
    #[error("initial LZW code size {0} is outside [2, 8]")]
    BadCodeSize(u8),

    /// The first sub-block of the image data was empty.
    #[error("first LZW sub-block is empty")]
    EmptySubBlock,

    /// The byte stream was exhausted mid-code, with no terminator in sight.
    #[error("unexpected end of data mid-code")]
    UnexpectedEnd,
}

pub type Result<T> = std::result::Result<T, Error>;
