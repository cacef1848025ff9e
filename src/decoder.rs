//! Frame loop controller: the two-pass driver that ties the header
//! parser, extension dispatcher and LZW decoder together.
//! Pass A counts frames and finds the largest frame extent; pass B decodes
//! and delivers them, honoring a resume/skip counter. Grounded on
//! `examples/original_source/gif_load.h`'s `GIF_Load` (same two-pass shape,
//! same sentinel-sign convention for truncation), with a tagged
//! `DecodeOutcome` replacing that sentinel-sign `int` return.

use crate::cursor::Cursor;
use crate::error::LzwError;
use crate::extension::{
    skip_extension, ApplicationExtensionData, DisposalMethod, GraphicControlState,
    LABEL_APPLICATION, LABEL_GRAPHIC_CONTROL,
};
use crate::header::{ImageDescriptor, Palette, ScreenDescriptor};
use crate::lzw;
use crate::subblock::skip_sub_blocks;

const IMAGE_DESCRIPTOR_MARK: u8 = 0x2C;
const EXTENSION_MARK: u8 = 0x21;
const TRAILER_MARK: u8 = 0x3B;

/// A fully assembled frame, handed to the frame sink. Borrows both the
/// decoded pixel scratch area and the palette bytes from the input/scratch
/// buffers for the duration of the sink call — a sink that needs to
/// keep the data must copy it.
pub struct Frame<'a> {
    pub screen_width: u16,
    pub screen_height: u16,
    pub x_offset: u16,
    pub y_offset: u16,
    pub width: u16,
    pub height: u16,

    pub palette: Palette<'a>,
    pub background_color_index: u8,
    pub transparent_color_index: Option<u8>,

    pub disposal: DisposalMethod,
    /// Delay before the next frame, in 10ms units. Negative iff the
    /// graphics-control user-input flag was set, with magnitude
    /// `abs(delay) - 1` in that case.
    pub delay: i32,
    pub interlaced: bool,

    /// 0-based index of this frame among all frames in the stream.
    pub frame_index: usize,
    /// Total frame count; negative if the stream is truncated.
    pub frame_count: i64,

    pub pixels: &'a [u8],
}

/// Tagged result of a [`decode`] call — a typed stand-in for the C
/// original's sentinel-sign integer return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The stream ran to its `0x3B` trailer. Carries the total number of
    /// frames handed to the sink, including any skipped ones.
    Complete(usize),
    /// The input was exhausted before the trailer. Carries the number of
    /// frames delivered so far; the caller can resume with `skip` set to
    /// this count once more bytes arrive.
    Partial(usize),
    /// A validation failure that the C original reports by returning 0:
    /// null/too-short input, bad signature, or negative skip (not
    /// representable in this API — `skip` is `usize`).
    Invalid,
}

impl DecodeOutcome {
    /// Reconstructs the original C sentinel-sign convention: `0` for
    /// `Invalid`, `n` for `Complete(n)`, `-n` for `Partial(n)`.
    pub fn as_legacy_count(&self) -> i64 {
        match *self {
            DecodeOutcome::Complete(n) => n as i64,
            DecodeOutcome::Partial(n) => -(n as i64),
            DecodeOutcome::Invalid => 0,
        }
    }

    pub fn frames_delivered(&self) -> usize {
        match *self {
            DecodeOutcome::Complete(n) | DecodeOutcome::Partial(n) => n,
            DecodeOutcome::Invalid => 0,
        }
    }
}

/// Minimum bytes needed before a signature check is even attempted: 6-byte
/// signature + 7-byte logical screen descriptor fields.
const MIN_HEADER_LEN: usize = 13;

/// Decodes a GIF stream, invoking `frame_sink` once per delivered frame in
/// source order and (if given) `metadata_sink` once per application
/// extension, with its raw sub-block-chain bytes (§4.4/§6/§9). `skip`
/// frames are parsed and decoded like any other but not handed to
/// `frame_sink` — this is the resume mechanism of §4.6/§8.
///
/// Returns [`DecodeOutcome::Invalid`] for the validation failures of §6
/// that don't involve the frame sink at all (too-short input, bad
/// signature); `null frame sink`/`negative skip` from the C API are
/// eliminated by construction (`frame_sink: &mut dyn FnMut`, `skip: usize`).
pub fn decode(
    data: &[u8],
    skip: usize,
    frame_sink: &mut dyn FnMut(&Frame<'_>),
    mut metadata_sink: Option<&mut dyn FnMut(ApplicationExtensionData<'_>)>,
) -> DecodeOutcome {
    if data.len() <= MIN_HEADER_LEN {
        return DecodeOutcome::Invalid;
    }

    let screen = {
        let mut cursor = Cursor::new(data);
        match ScreenDescriptor::parse(&mut cursor) {
            Ok(sd) => sd,
            // Bad signature or a header too short to hold the fixed-size
            // screen descriptor fields both fall through to Invalid (§6).
            Err(_) => return DecodeOutcome::Invalid,
        }
    };
    let body_start = screen_body_offset(data);

    let (frame_count, max_w, max_h, complete) = match pass_a_count(data, body_start) {
        Some(v) => v,
        None => return DecodeOutcome::Invalid,
    };
    if frame_count == 0 {
        return if complete {
            DecodeOutcome::Complete(0)
        } else {
            DecodeOutcome::Partial(0)
        };
    }

    let mut scratch = vec![0u8; max_w as usize * max_h as usize];
    let reported_count: i64 = if complete {
        frame_count as i64
    } else {
        -(frame_count as i64)
    };

    let delivered = pass_b_extract(
        data,
        body_start,
        &screen,
        skip,
        reported_count,
        &mut scratch,
        frame_sink,
        &mut metadata_sink,
    );

    if complete {
        DecodeOutcome::Complete(delivered)
    } else {
        DecodeOutcome::Partial(delivered)
    }
}

/// Re-parses just the screen descriptor to find where the block stream
/// starts (right after the optional global palette). Cheap compared to a
/// full pass, and keeps pass A/B from needing to carry a parsed
/// `ScreenDescriptor` across two independent cursor walks.
fn screen_body_offset(data: &[u8]) -> usize {
    let mut cursor = Cursor::new(data);
    // Signature + width/height/flags/bg/aspect already validated by the
    // caller; re-parsing here cannot fail.
    let _ = ScreenDescriptor::parse(&mut cursor);
    cursor.position()
}

/// Pass A (§4.6): walks the block stream once, counting frames and the
/// largest frame extent without decoding any pixel data.
fn pass_a_count(data: &[u8], body_start: usize) -> Option<(usize, u16, u16, bool)> {
    let mut cursor = Cursor::new(&data[body_start..]);
    let mut frame_count = 0usize;
    let mut max_w = 0u16;
    let mut max_h = 0u16;

    loop {
        let mark = match cursor.read_u8() {
            Ok(b) => b,
            Err(_) => return Some((frame_count, max_w, max_h, false)),
        };
        match mark {
            IMAGE_DESCRIPTOR_MARK => {
                let desc = match ImageDescriptor::parse(&mut cursor) {
                    Ok(d) => d,
                    Err(_) => return Some((frame_count, max_w, max_h, false)),
                };
                // LZW min-code-size byte, then the image-data sub-blocks.
                if cursor.read_u8().is_err() || skip_sub_blocks(&mut cursor).is_err() {
                    return Some((frame_count, max_w, max_h, false));
                }
                frame_count += 1;
                max_w = max_w.max(desc.width);
                max_h = max_h.max(desc.height);
            }
            EXTENSION_MARK => {
                if cursor.read_u8().is_err() || skip_sub_blocks(&mut cursor).is_err() {
                    return Some((frame_count, max_w, max_h, false));
                }
            }
            TRAILER_MARK => return Some((frame_count, max_w, max_h, true)),
            _ => return Some((frame_count, max_w, max_h, false)),
        }
    }
}

/// Pass B (§4.6): re-walks the block stream, decoding each image
/// descriptor's pixels into `scratch` and invoking `frame_sink` for every
/// frame whose index is `>= skip`. Stops at the first LZW failure, the
/// `0x3B` trailer, or input exhaustion.
#[allow(clippy::too_many_arguments)]
fn pass_b_extract(
    data: &[u8],
    body_start: usize,
    screen: &ScreenDescriptor<'_>,
    skip: usize,
    frame_count: i64,
    scratch: &mut [u8],
    frame_sink: &mut dyn FnMut(&Frame<'_>),
    metadata_sink: &mut Option<&mut dyn FnMut(ApplicationExtensionData<'_>)>,
) -> usize {
    let mut cursor = Cursor::new(&data[body_start..]);
    let mut pending_gce: Option<GraphicControlState> = None;
    let mut frame_index = 0usize;
    let mut delivered = 0usize;

    loop {
        let mark = match cursor.read_u8() {
            Ok(b) => b,
            Err(_) => break,
        };
        match mark {
            IMAGE_DESCRIPTOR_MARK => {
                let desc = match ImageDescriptor::parse(&mut cursor) {
                    Ok(d) => d,
                    Err(_) => break,
                };
                let palette = desc
                    .local_palette
                    .or(screen.global_palette)
                    .unwrap_or_else(|| Palette::new(&[], false));
                let w = desc.width as usize;
                let h = desc.height as usize;
                let pixel_area = &mut scratch[..w * h];

                let decode_result = lzw::decode_frame(&mut cursor, pixel_area);

                let gce = pending_gce.take().unwrap_or_default();
                let (delay, transparent) = encode_delay(&gce);

                match decode_result {
                    Ok(()) => {
                        let frame = Frame {
                            screen_width: screen.width,
                            screen_height: screen.height,
                            x_offset: desc.x_offset,
                            y_offset: desc.y_offset,
                            width: desc.width,
                            height: desc.height,
                            palette,
                            background_color_index: screen.background_color_index,
                            transparent_color_index: transparent,
                            disposal: gce.disposal,
                            delay,
                            interlaced: desc.interlaced,
                            frame_index,
                            frame_count,
                            pixels: pixel_area,
                        };
                        if frame_index >= skip {
                            frame_sink(&frame);
                        }
                        delivered = frame_index + 1;
                        frame_index += 1;
                    }
                    Err(LzwError::UnterminatedStream) | Err(LzwError::UnexpectedEnd) => {
                        // Partial decode: whatever pixels were written
                        // before the failure are still delivered (§7).
                        let frame = Frame {
                            screen_width: screen.width,
                            screen_height: screen.height,
                            x_offset: desc.x_offset,
                            y_offset: desc.y_offset,
                            width: desc.width,
                            height: desc.height,
                            palette,
                            background_color_index: screen.background_color_index,
                            transparent_color_index: transparent,
                            disposal: gce.disposal,
                            delay,
                            interlaced: desc.interlaced,
                            frame_index,
                            frame_count,
                            pixels: pixel_area,
                        };
                        if frame_index >= skip {
                            frame_sink(&frame);
                        }
                        delivered = frame_index + 1;
                        break;
                    }
                    Err(LzwError::BadCodeSize(_))
                    | Err(LzwError::BadInitialCode)
                    | Err(LzwError::EmptySubBlock) => {
                        // No pixels were ever written for this frame; drop
                        // it and stop the pass.
                        break;
                    }
                }
            }
            EXTENSION_MARK => {
                let label = match cursor.read_u8() {
                    Ok(b) => b,
                    Err(_) => break,
                };
                match label {
                    LABEL_GRAPHIC_CONTROL => match GraphicControlState::parse(&mut cursor) {
                        Ok(state) => pending_gce = Some(state),
                        Err(_) => break,
                    },
                    LABEL_APPLICATION => {
                        let raw = cursor.remaining_slice();
                        if let Some(sink) = metadata_sink.as_deref_mut() {
                            sink(ApplicationExtensionData::new(raw));
                        }
                        if skip_extension(&mut cursor, LABEL_APPLICATION).is_err() {
                            break;
                        }
                    }
                    other => {
                        // Classified but not acted on: plain text, comment,
                        // and any reserved/unknown label all skip the same
                        // way (§4.4/§9's `0x00` open question included).
                        if skip_extension(&mut cursor, other).is_err() {
                            break;
                        }
                    }
                }
            }
            TRAILER_MARK => break,
            _ => break,
        }
    }

    delivered
}

/// Encodes the graphics-control delay/user-input pair per §3/§6: the
/// stored delay is negated (magnitude shifted by one) when the user-input
/// flag was set.
fn encode_delay(gce: &GraphicControlState) -> (i32, Option<u8>) {
    let delay = if gce.user_input {
        -((gce.delay as i32) + 1)
    } else {
        gce.delay as i32
    };
    (delay, gce.transparent_color_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Appends a minimal LZW-encoded image block: CLEAR, one root code per
    /// pixel (no compression), END, for a `min_code_size`-bit table.
    fn push_code(code: u16, width: u32, bitbuf: &mut u32, bitcount: &mut u32, bytes: &mut Vec<u8>) {
        *bitbuf |= (code as u32) << *bitcount;
        *bitcount += width;
        while *bitcount >= 8 {
            bytes.push((*bitbuf & 0xFF) as u8);
            *bitbuf >>= 8;
            *bitcount -= 8;
        }
    }

    fn lzw_block(min_code_size: u8, pixels: &[u8]) -> Vec<u8> {
        let clear = 1u16 << min_code_size;
        let end = clear + 1;

        let mut bitbuf: u32 = 0;
        let mut bitcount: u32 = 0;
        let mut bytes = Vec::new();

        let mut width = (min_code_size + 1) as u32;
        let mut next_code = end as usize + 1;
        // No compressible repeats are modeled here (one root code per
        // pixel), so a table entry is inserted on every real code after
        // the first — exactly the `prev_code.is_some()` branch of
        // `lzw::decode_frame` — and the bit width grows in lockstep.
        let mut prev: Option<u16> = None;

        push_code(clear, width, &mut bitbuf, &mut bitcount, &mut bytes);
        for &p in pixels {
            let code = p as u16;
            push_code(code, width, &mut bitbuf, &mut bitcount, &mut bytes);
            if prev.is_some() && next_code < 4096 {
                next_code += 1;
                if next_code == (1usize << width) && width < 12 {
                    width += 1;
                }
            }
            prev = Some(code);
        }
        push_code(end, width, &mut bitbuf, &mut bitcount, &mut bytes);

        if bitcount > 0 {
            bytes.push((bitbuf & 0xFF) as u8);
        }

        let mut block = vec![min_code_size];
        for chunk in bytes.chunks(255) {
            block.push(chunk.len() as u8);
            block.extend_from_slice(chunk);
        }
        block.push(0);
        block
    }

    fn gif_header(width: u16, height: u16, global_palette: &[[u8; 3]]) -> Vec<u8> {
        let mut v = b"GIF89a".to_vec();
        v.extend_from_slice(&width.to_le_bytes());
        v.extend_from_slice(&height.to_le_bytes());
        let size_exp = (global_palette.len().max(2).next_power_of_two().trailing_zeros() - 1) as u8;
        v.push(0b1000_0000 | size_exp);
        v.push(0);
        v.push(0);
        for c in global_palette {
            v.extend_from_slice(c);
        }
        v
    }

    fn image_descriptor(x: u16, y: u16, w: u16, h: u16) -> Vec<u8> {
        let mut v = vec![IMAGE_DESCRIPTOR_MARK];
        v.extend_from_slice(&x.to_le_bytes());
        v.extend_from_slice(&y.to_le_bytes());
        v.extend_from_slice(&w.to_le_bytes());
        v.extend_from_slice(&h.to_le_bytes());
        v.push(0); // no local palette, no interlace
        v
    }

    fn graphic_control(delay: u16, disposal: u8, transparent: Option<u8>) -> Vec<u8> {
        let mut v = vec![EXTENSION_MARK, LABEL_GRAPHIC_CONTROL, 4];
        let flags = (disposal << 2) | if transparent.is_some() { 1 } else { 0 };
        v.push(flags);
        v.extend_from_slice(&delay.to_le_bytes());
        v.push(transparent.unwrap_or(0));
        v.push(0);
        v
    }

    #[test]
    fn single_frame_3x3_no_extensions() {
        let palette = [[0, 0, 0], [255, 255, 255], [255, 0, 0], [0, 255, 0]];
        let mut data = gif_header(3, 3, &palette);
        data.extend(image_descriptor(0, 0, 3, 3));
        data.extend(lzw_block(2, &[0, 1, 2, 3, 0, 1, 2, 3, 0]));
        data.push(TRAILER_MARK);

        let mut frames = Vec::new();
        let outcome = decode(&data, 0, &mut |f| frames.push(f.pixels.to_vec()), None);

        assert_eq!(outcome, DecodeOutcome::Complete(1));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], vec![0, 1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn two_frame_animation_with_graphics_control() {
        let palette = [[0, 0, 0], [255, 255, 255]];
        let mut data = gif_header(2, 1, &palette);
        data.extend(graphic_control(10, 2, None));
        data.extend(image_descriptor(0, 0, 2, 1));
        data.extend(lzw_block(2, &[0, 1]));
        data.extend(graphic_control(20, 3, None));
        data.extend(image_descriptor(0, 0, 2, 1));
        data.extend(lzw_block(2, &[1, 0]));
        data.push(TRAILER_MARK);

        let mut delays = Vec::new();
        let mut disposals = Vec::new();
        let outcome = decode(
            &data,
            0,
            &mut |f| {
                delays.push(f.delay);
                disposals.push(f.disposal);
            },
            None,
        );

        assert_eq!(outcome, DecodeOutcome::Complete(2));
        assert_eq!(delays, vec![10, 20]);
        assert_eq!(
            disposals,
            vec![DisposalMethod::RestoreBackground, DisposalMethod::RestorePrevious]
        );
    }

    #[test]
    fn truncated_after_first_frame_mid_sub_block() {
        let palette = [[0, 0, 0], [255, 255, 255]];
        let mut data = gif_header(2, 1, &palette);
        data.extend(image_descriptor(0, 0, 2, 1));
        let mut block = lzw_block(2, &[0, 1]);
        // Cut the block off mid-sub-block: drop the terminator and the
        // trailing payload bytes the real encoder would have written.
        block.truncate(block.len() - 2);
        data.extend(block);

        let mut frames = Vec::new();
        let outcome = decode(&data, 0, &mut |f| frames.push(f.pixels.to_vec()), None);

        assert_eq!(frames.len(), 1);
        match outcome {
            DecodeOutcome::Partial(1) => {}
            other => panic!("expected Partial(1), got {other:?}"),
        }
    }

    #[test]
    fn skip_one_on_three_frame_file() {
        let palette = [[0, 0, 0], [255, 255, 255]];
        let mut data = gif_header(1, 1, &palette);
        for px in [0u8, 1, 0] {
            data.extend(image_descriptor(0, 0, 1, 1));
            data.extend(lzw_block(2, &[px]));
        }
        data.push(TRAILER_MARK);

        let mut frames = Vec::new();
        let outcome = decode(&data, 1, &mut |f| frames.push(f.frame_index), None);

        assert_eq!(outcome, DecodeOutcome::Complete(3));
        assert_eq!(frames, vec![1, 2]);
    }

    #[test]
    fn application_extension_forwarded_to_metadata_sink() {
        let palette = [[0, 0, 0], [255, 255, 255]];
        let mut data = gif_header(1, 1, &palette);
        data.push(EXTENSION_MARK);
        data.push(LABEL_APPLICATION);
        data.push(0x0B);
        data.extend_from_slice(b"NETSCAPE");
        data.extend_from_slice(b"2.0");
        data.push(3);
        data.extend_from_slice(&[1, 0, 0]);
        data.push(0);
        data.extend(image_descriptor(0, 0, 1, 1));
        data.extend(lzw_block(2, &[0]));
        data.push(TRAILER_MARK);

        let mut seen_identifier: Option<[u8; 8]> = None;
        let mut frame_seen = false;
        let outcome = decode(
            &data,
            0,
            &mut |_f| frame_seen = true,
            Some(&mut |app: ApplicationExtensionData<'_>| {
                seen_identifier = Some(app.identity().unwrap().identifier);
            }),
        );

        assert_eq!(outcome, DecodeOutcome::Complete(1));
        assert!(frame_seen);
        assert_eq!(seen_identifier, Some(*b"NETSCAPE"));
    }

    #[test]
    fn invalid_on_short_input() {
        let outcome = decode(&[1, 2, 3], 0, &mut |_| {}, None);
        assert_eq!(outcome, DecodeOutcome::Invalid);
    }

    #[test]
    fn invalid_on_bad_signature() {
        let mut data = gif_header(1, 1, &[[0, 0, 0], [1, 1, 1]]);
        data[0] = b'X';
        let outcome = decode(&data, 0, &mut |_| {}, None);
        assert_eq!(outcome, DecodeOutcome::Invalid);
    }

    #[test]
    fn legacy_count_matches_sentinel_convention() {
        assert_eq!(DecodeOutcome::Complete(3).as_legacy_count(), 3);
        assert_eq!(DecodeOutcome::Partial(2).as_legacy_count(), -2);
        assert_eq!(DecodeOutcome::Invalid.as_legacy_count(), 0);
    }
}
