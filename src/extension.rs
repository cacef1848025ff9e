//! Extension dispatcher: classifies extension blocks (`0x21`) by their
//! label byte into graphics-control (captured), application (forwarded to
//! the metadata sink), and everything else (skipped). Grounded on
//! `netvl-immeta::formats::gif::{GraphicControlExtension, ApplicationExtension}::load`,
//! generalized from `BufRead` onto [`Cursor`].

use crate::cursor::Cursor;
use crate::error::{invalid_format, unexpected_eof, Result};
use crate::subblock::skip_sub_blocks;

pub const LABEL_PLAIN_TEXT: u8 = 0x01;
pub const LABEL_GRAPHIC_CONTROL: u8 = 0xF9;
pub const LABEL_COMMENT: u8 = 0xFE;
pub const LABEL_APPLICATION: u8 = 0xFF;

/// How the previous frame should be treated before the next one is drawn.
/// Kept as a dedicated enum with an `Unknown` catch-all rather than masking
/// away out-of-range values, following `netvl-immeta::formats::gif::DisposalMethod`
/// rather than `gif_load.h`'s bit-masked `GIF_NONE..GIF_PREV`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum DisposalMethod {
    /// The decoder is not required to take any action.
    #[default]
    None,
    /// The graphic is left in place (do not dispose).
    Keep,
    /// The frame's area is restored to the background color.
    RestoreBackground,
    /// The frame's area is restored to what it looked like before this frame.
    RestorePrevious,
    /// Reserved value 4..=7, not defined by the GIF89a spec.
    Unknown(u8),
}

impl DisposalMethod {
    fn from_bits(n: u8) -> DisposalMethod {
        match n {
            0 => DisposalMethod::None,
            1 => DisposalMethod::Keep,
            2 => DisposalMethod::RestoreBackground,
            3 => DisposalMethod::RestorePrevious,
            n => DisposalMethod::Unknown(n),
        }
    }
}

/// Transient per-frame state captured by a graphics control extension and
/// consumed by the next image descriptor.
#[derive(Copy, Clone, Debug, Default)]
pub struct GraphicControlState {
    pub disposal: DisposalMethod,
    pub user_input: bool,
    pub transparent_color_index: Option<u8>,
    /// Delay before the next frame, in 10ms units.
    pub delay: u16,
}

impl GraphicControlState {
    pub fn parse(cursor: &mut Cursor<'_>) -> Result<GraphicControlState> {
        let block_size = cursor
            .read_u8()
            .map_err(|_| unexpected_eof!("reading graphic control extension size"))?;
        if block_size != 4 {
            return Err(invalid_format!(
                "invalid graphic control extension block size: {}",
                block_size
            ));
        }

        let packed_flags = cursor
            .read_u8()
            .map_err(|_| unexpected_eof!("reading graphic control extension flags"))?;
        let disposal = DisposalMethod::from_bits((packed_flags & 0b0001_1100) >> 2);
        let user_input = packed_flags & 0b0000_0010 != 0;
        let has_transparent_color = packed_flags & 0b0000_0001 != 0;

        let delay = cursor
            .read_u16_le()
            .map_err(|_| unexpected_eof!("reading graphic control extension delay"))?;
        let transparent_color_index = cursor
            .read_u8()
            .map_err(|_| unexpected_eof!("reading transparent color index"))?;

        skip_sub_blocks(cursor)?;

        Ok(GraphicControlState {
            disposal,
            user_input,
            transparent_color_index: has_transparent_color.then_some(transparent_color_index),
            delay,
        })
    }
}

/// Raw view of an application extension's payload, starting at the
/// block-size byte — the sink walks it itself: two bytes past the
/// `0xFF` label mark, which lands inside the 11-byte identifier+auth-code.
#[derive(Clone, Copy, Debug)]
pub struct ApplicationExtensionData<'a> {
    raw: &'a [u8],
}

/// The application identifier and authentication code of a parsed
/// application extension, plus the offset its sub-block chain starts at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplicationIdentity {
    pub identifier: [u8; 8],
    pub authentication_code: [u8; 3],
}

impl<'a> ApplicationExtensionData<'a> {
    pub(crate) fn new(raw: &'a [u8]) -> Self {
        ApplicationExtensionData { raw }
    }

    /// The unparsed bytes as handed to the sink: block-size byte, 8-byte
    /// identifier, 3-byte authentication code, then the sub-block chain.
    #[inline]
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// Convenience parse of the 11-byte identifier/auth-code pair, for
    /// callers that don't want to hand-roll it (mirrors
    /// `netvl-immeta::formats::gif::ApplicationExtension`).
    pub fn identity(&self) -> Result<ApplicationIdentity> {
        let mut cursor = Cursor::new(self.raw);
        let block_size = cursor
            .read_u8()
            .map_err(|_| unexpected_eof!("reading application extension size"))?;
        if block_size != 0x0B {
            return Err(invalid_format!(
                "invalid application extension block size: {}",
                block_size
            ));
        }
        let id_bytes = cursor
            .read_bytes(8)
            .map_err(|_| unexpected_eof!("reading application identifier"))?;
        let auth_bytes = cursor
            .read_bytes(3)
            .map_err(|_| unexpected_eof!("reading application authentication code"))?;
        let mut identifier = [0u8; 8];
        identifier.copy_from_slice(id_bytes);
        let mut authentication_code = [0u8; 3];
        authentication_code.copy_from_slice(auth_bytes);
        Ok(ApplicationIdentity {
            identifier,
            authentication_code,
        })
    }
}

/// Identifies which kind of extension block a label byte names, for the
/// blocks this crate never interprets. Mirrors `netvl-immeta::formats::gif`
/// modeling `PlainTextExtension`/`CommentExtension` as distinct, named block
/// kinds rather than collapsing everything non-graphics-control into an
/// opaque skip — useful for a caller inspecting why a block was dropped,
/// even though none of these payloads is ever parsed (§1 non-goal for plain
/// text; comment has no structured payload at all).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BlockKind {
    PlainText,
    Comment,
    /// Any other label, including the unassigned `0x00`.
    Unknown(u8),
}

impl BlockKind {
    pub fn from_label(label: u8) -> BlockKind {
        match label {
            LABEL_PLAIN_TEXT => BlockKind::PlainText,
            LABEL_COMMENT => BlockKind::Comment,
            n => BlockKind::Unknown(n),
        }
    }
}

/// Skips an extension block whose label isn't graphics-control or
/// application (plain text `0x01`, comment `0xFE`, any reserved/unknown
/// label including `0x00` — all fall through to the generic sub-block skip).
/// Returns the classified [`BlockKind`] for callers that want to know what
/// was dropped without altering the skip behavior.
pub fn skip_extension(cursor: &mut Cursor<'_>, label: u8) -> Result<BlockKind> {
    skip_sub_blocks(cursor)?;
    Ok(BlockKind::from_label(label))
}
