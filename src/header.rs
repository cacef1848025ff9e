//! Header parser: master signature, logical screen descriptor, optional
//! global palette, and per-frame image descriptors with their optional local
//! palette. Grounded directly on `netvl-immeta::formats::gif::Metadata::load`
//! and `ImageDescriptor::load` — same packed-flag bit layout and color table
//! sizing formula (`2^(n+1)`), generalized from `BufRead` onto [`Cursor`].

use crate::cursor::Cursor;
use crate::error::{unexpected_eof, Error, Result};

const SIGNATURE_LEN: usize = 6;

/// GIF version read from the trailing three signature bytes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Version {
    V87a,
    V89a,
}

impl Version {
    fn from_bytes(b: &[u8]) -> Option<Version> {
        match b {
            b"87a" => Some(Version::V87a),
            b"89a" => Some(Version::V89a),
            _ => None,
        }
    }
}

/// A borrowed, ordered sequence of up to 256 RGB triples.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Palette<'a> {
    /// Raw `size * 3` bytes, `[r, g, b, r, g, b, ...]`.
    rgb: &'a [u8],
    /// Whether the table is sorted by decreasing importance (informational).
    pub sorted: bool,
}

impl<'a> Palette<'a> {
    pub(crate) fn new(rgb: &'a [u8], sorted: bool) -> Palette<'a> {
        debug_assert!(rgb.len() % 3 == 0);
        Palette { rgb, sorted }
    }

    /// Number of color entries (a power of two in `2..=256`).
    #[inline]
    pub fn size(&self) -> u16 {
        (self.rgb.len() / 3) as u16
    }

    /// Looks up the `(r, g, b)` triple for a palette index.
    #[inline]
    pub fn get(&self, index: u8) -> Option<(u8, u8, u8)> {
        let i = index as usize * 3;
        self.rgb.get(i..i + 3).map(|c| (c[0], c[1], c[2]))
    }

    #[inline]
    pub fn as_rgb_bytes(&self) -> &'a [u8] {
        self.rgb
    }
}

/// Logical screen descriptor, parsed once per stream.
#[derive(Debug)]
pub struct ScreenDescriptor<'a> {
    pub version: Version,
    pub width: u16,
    pub height: u16,
    pub background_color_index: u8,
    /// Factor approximating the pixel aspect ratio; 0 means "not specified".
    pub pixel_aspect_ratio: u8,
    pub global_palette: Option<Palette<'a>>,
}

impl<'a> ScreenDescriptor<'a> {
    /// Computes the pixel aspect ratio approximation per the GIF89a spec
    /// text: `(byte + 15) / 64`. `None` if the byte is zero (unspecified).
    pub fn pixel_aspect_ratio_approx(&self) -> Option<f64> {
        if self.pixel_aspect_ratio == 0 {
            None
        } else {
            Some((self.pixel_aspect_ratio as f64 + 15.0) / 64.0)
        }
    }

    pub fn parse(cursor: &mut Cursor<'a>) -> Result<ScreenDescriptor<'a>> {
        let signature = cursor
            .read_bytes(SIGNATURE_LEN)
            .map_err(|_| unexpected_eof!("reading GIF signature"))?;
        if &signature[..3] != b"GIF" {
            let mut sig = [0u8; 6];
            sig.copy_from_slice(signature);
            return Err(Error::InvalidSignature(sig));
        }
        let version = Version::from_bytes(&signature[3..]).ok_or_else(|| {
            let mut sig = [0u8; 6];
            sig.copy_from_slice(signature);
            Error::InvalidSignature(sig)
        })?;

        let width = cursor.read_u16_le().map_err(|_| unexpected_eof!("reading logical width"))?;
        let height = cursor.read_u16_le().map_err(|_| unexpected_eof!("reading logical height"))?;

        let packed_flags = cursor.read_u8().map_err(|_| unexpected_eof!("reading global flags"))?;
        let has_global_palette = packed_flags & 0b1000_0000 != 0;
        let global_palette_sorted = packed_flags & 0b0000_1000 != 0;
        let global_palette_size_exp = packed_flags & 0b0000_0111;

        let background_color_index = cursor
            .read_u8()
            .map_err(|_| unexpected_eof!("reading background color index"))?;
        let pixel_aspect_ratio = cursor
            .read_u8()
            .map_err(|_| unexpected_eof!("reading pixel aspect ratio"))?;

        let global_palette = if has_global_palette {
            let size = 2u16 << global_palette_size_exp;
            let rgb = cursor
                .read_bytes(size as usize * 3)
                .map_err(|_| unexpected_eof!("reading global color table"))?;
            Some(Palette::new(rgb, global_palette_sorted))
        } else {
            None
        };

        Ok(ScreenDescriptor {
            version,
            width,
            height,
            background_color_index,
            pixel_aspect_ratio,
            global_palette,
        })
    }
}

/// Per-frame image descriptor: offset, size, interlace flag, and optional
/// local palette overriding the global one.
#[derive(Debug)]
pub struct ImageDescriptor<'a> {
    pub x_offset: u16,
    pub y_offset: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub local_palette: Option<Palette<'a>>,
}

impl<'a> ImageDescriptor<'a> {
    /// Parses the image descriptor fields and, if present, its local
    /// palette. Does *not* touch the LZW minimum-code-size byte or the
    /// image-data sub-blocks that follow — those belong to the LZW decoder.
    pub fn parse(cursor: &mut Cursor<'a>) -> Result<ImageDescriptor<'a>> {
        let x_offset = cursor.read_u16_le().map_err(|_| unexpected_eof!("reading frame x offset"))?;
        let y_offset = cursor.read_u16_le().map_err(|_| unexpected_eof!("reading frame y offset"))?;
        let width = cursor.read_u16_le().map_err(|_| unexpected_eof!("reading frame width"))?;
        let height = cursor.read_u16_le().map_err(|_| unexpected_eof!("reading frame height"))?;

        let packed_flags = cursor.read_u8().map_err(|_| unexpected_eof!("reading frame flags"))?;
        let has_local_palette = packed_flags & 0b1000_0000 != 0;
        let interlaced = packed_flags & 0b0100_0000 != 0;
        let local_palette_sorted = packed_flags & 0b0010_0000 != 0;
        let local_palette_size_exp = packed_flags & 0b0000_0111;

        let local_palette = if has_local_palette {
            let size = 2u16 << local_palette_size_exp;
            let rgb = cursor
                .read_bytes(size as usize * 3)
                .map_err(|_| unexpected_eof!("reading local color table"))?;
            Some(Palette::new(rgb, local_palette_sorted))
        } else {
            None
        };

        Ok(ImageDescriptor {
            x_offset,
            y_offset,
            width,
            height,
            interlaced,
            local_palette,
        })
    }
}
