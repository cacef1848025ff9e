//! Sub-block reader: walks GIF's `<len><len bytes>…<0>` chained
//! encoding without interpreting the payload. Generalizes `netvl-immeta`'s
//! `skip_blocks` (`formats/gif.rs`) from `BufRead` onto [`Cursor`]. The LZW
//! decoder does not use this: a code can straddle a sub-block boundary,
//! so it drives its own sub-block walk while refilling its bit accumulator.

use crate::cursor::Cursor;
use crate::error::Result;

/// Skips one full sub-block chain, advancing past the terminating
/// zero-length byte. Fails if the cursor is exhausted before the terminator.
pub fn skip_sub_blocks(cursor: &mut Cursor<'_>) -> Result<()> {
    loop {
        let len = cursor.read_u8()? as usize;
        if len == 0 {
            return Ok(());
        }
        cursor.advance(len)?;
    }
}
