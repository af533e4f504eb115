//! Delta patching: reconstruct an object from a base plus a copy/insert
//! instruction stream.
//!
//! The delta format is:
//!
//! ```text
//! [base_size: varint] [result_size: varint] [instructions...]
//! ```
//!
//! Every reconstructed byte is also streamed through a SHA-1 seeded with
//! the object preamble, so each link of a delta chain is self-checking.

use gitview_hash::{Hasher, ObjectId};
use gitview_object::ObjectType;

use crate::PackError;

/// Read a little-endian 7-bit-group varint. Returns (value, bytes consumed).
pub fn read_varint(data: &[u8]) -> Option<(usize, usize)> {
    let mut value: usize = 0;
    let mut shift = 0;
    let mut pos = 0;
    loop {
        let byte = *data.get(pos)?;
        pos += 1;
        value |= ((byte & 0x7f) as usize) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Some((value, pos));
        }
    }
}

/// Write a varint in the delta size-header encoding.
pub fn write_varint(mut value: usize) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return out;
        }
    }
}

/// Encode a copy instruction. Only the non-zero bytes of offset and size
/// are emitted, selected by bits in the opcode.
pub fn encode_copy(offset: usize, size: usize) -> Vec<u8> {
    let mut out = vec![0x80u8];
    for (i, shift) in [0, 8, 16, 24].iter().enumerate() {
        let byte = ((offset >> shift) & 0xff) as u8;
        if byte != 0 {
            out[0] |= 1 << i;
            out.push(byte);
        }
    }
    for (i, shift) in [0, 8, 16].iter().enumerate() {
        let byte = ((size >> shift) & 0xff) as u8;
        if byte != 0 {
            out[0] |= 0x10 << i;
            out.push(byte);
        }
    }
    out
}

/// Encode an insert instruction (1–127 bytes).
pub fn encode_insert(data: &[u8]) -> Vec<u8> {
    assert!(!data.is_empty() && data.len() <= 127, "insert length out of range");
    let mut out = vec![data.len() as u8];
    out.extend_from_slice(data);
    out
}

/// Apply a delta to `base`, producing the reconstructed object and the id
/// of `"<kind> <result_size>\0<result>"`.
///
/// `kind` is the kind of the resolved base, which is also the kind of the
/// reconstructed object. `offset` is the pack offset of the delta entry,
/// used only for error reporting.
pub fn apply(
    kind: ObjectType,
    base: &[u8],
    delta: &[u8],
    offset: u64,
) -> Result<(Vec<u8>, ObjectId), PackError> {
    let bad = |reason: String| PackError::InvalidDelta { offset, reason };

    let mut pos = 0;

    let (base_size, consumed) =
        read_varint(delta).ok_or_else(|| bad("truncated base size".into()))?;
    pos += consumed;
    let (result_size, consumed) =
        read_varint(&delta[pos..]).ok_or_else(|| bad("truncated result size".into()))?;
    pos += consumed;

    if base_size != base.len() {
        return Err(bad(format!(
            "base size mismatch: delta says {base_size}, base is {}",
            base.len()
        )));
    }

    let mut output = Vec::with_capacity(result_size);
    let mut check = Hasher::for_object(kind.as_str(), result_size);

    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;

        if cmd & 0x80 != 0 {
            // Copy from base. Bits 0-3 select offset bytes, bits 4-6 size
            // bytes, both little-endian.
            let mut copy_offset: usize = 0;
            let mut copy_size: usize = 0;

            for (i, shift) in [0usize, 8, 16, 24].iter().enumerate() {
                if cmd & (1 << i) != 0 {
                    let byte = *delta
                        .get(pos)
                        .ok_or_else(|| bad("truncated copy offset".into()))?;
                    copy_offset |= (byte as usize) << shift;
                    pos += 1;
                }
            }
            for (i, shift) in [0usize, 8, 16].iter().enumerate() {
                if cmd & (0x10 << i) != 0 {
                    let byte = *delta
                        .get(pos)
                        .ok_or_else(|| bad("truncated copy size".into()))?;
                    copy_size |= (byte as usize) << shift;
                    pos += 1;
                }
            }

            // A size of zero means a 64 KiB chunk.
            if copy_size == 0 {
                copy_size = 0x10000;
            }

            let end = copy_offset
                .checked_add(copy_size)
                .filter(|&e| e <= base.len())
                .ok_or_else(|| {
                    bad(format!(
                        "copy out of bounds: offset={copy_offset}, size={copy_size}, base_len={}",
                        base.len()
                    ))
                })?;

            output.extend_from_slice(&base[copy_offset..end]);
            check.update(&base[copy_offset..end]);
        } else if cmd != 0 {
            // Insert the next `cmd` bytes of the delta verbatim.
            let n = cmd as usize;
            if pos + n > delta.len() {
                return Err(bad("truncated insert data".into()));
            }
            output.extend_from_slice(&delta[pos..pos + n]);
            check.update(&delta[pos..pos + n]);
            pos += n;
        } else {
            return Err(bad("reserved opcode 0".into()));
        }
    }

    if output.len() != result_size {
        return Err(bad(format!(
            "result size mismatch: delta says {result_size}, got {}",
            output.len()
        )));
    }

    let id = check.finalize()?;
    Ok((output, id))
}
