//! A streaming, resumable decoder for the GIF (87a/89a) image format.
//!
//! [`decode`] walks a byte buffer holding a whole or partial GIF file and
//! invokes a caller-supplied frame sink once per decoded frame with its
//! palette-indexed pixel grid and animation metadata (delay, disposal,
//! transparency, frame geometry). On truncated input it reports how many
//! frames were extracted so far so the caller can resume later by skipping
//! that many frames.
//!
//! Encoding, compositing (disposal/transparency blending), RGB conversion,
//! de-interlacing, and rendering are all out of scope — they are the
//! responsibility of the frame sink.

pub use crate::decoder::{decode, DecodeOutcome, Frame};
pub use crate::error::{Error, LzwError, Result};
pub use crate::extension::{
    ApplicationExtensionData, ApplicationIdentity, BlockKind, DisposalMethod, GraphicControlState,
};
pub use crate::header::{ImageDescriptor, Palette, ScreenDescriptor, Version};

mod cursor;
mod decoder;
mod error;
mod extension;
mod header;
mod lzw;
mod subblock;
