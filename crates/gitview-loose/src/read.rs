use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use gitview_hash::{Hasher, ObjectId};
use gitview_object::{header, Object, ObjectType};

use crate::{LooseError, LooseStore};

impl LooseStore {
    /// Read the kind and payload of a loose object.
    ///
    /// Returns `Ok(None)` if the object does not exist (a miss, not an
    /// error). Returns `Err` if the object exists but cannot be decoded.
    pub fn read_raw(&self, id: &ObjectId) -> Result<Option<(ObjectType, Vec<u8>)>, LooseError> {
        let compressed = match fs::read(self.object_path(id)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        let decompressed = decompress_all(&compressed, id)?;
        split_payload(&decompressed, id).map(Some)
    }

    /// Read a loose object and parse it into structured form.
    pub fn read(&self, id: &ObjectId) -> Result<Option<Object>, LooseError> {
        match self.read_raw(id)? {
            Some((obj_type, payload)) => {
                Ok(Some(Object::parse_content(obj_type, &payload)?))
            }
            None => Ok(None),
        }
    }

    /// Read the kind and payload, verifying the SHA-1 of the full
    /// `"<kind> <len>\0<payload>"` bytes against the requested id.
    pub fn read_verified(
        &self,
        id: &ObjectId,
    ) -> Result<Option<(ObjectType, Vec<u8>)>, LooseError> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        let decompressed = decompress_all(&compressed, id)?;

        let actual = Hasher::digest(&decompressed)?;
        if actual != *id {
            return Err(LooseError::HashMismatch {
                path,
                expected: id.to_hex(),
                actual: actual.to_hex(),
            });
        }

        split_payload(&decompressed, id).map(Some)
    }
}

/// Split inflated bytes into kind and payload, validating the declared length.
fn split_payload(data: &[u8], id: &ObjectId) -> Result<(ObjectType, Vec<u8>), LooseError> {
    let (obj_type, content_size, header_len) = header::parse_header(data)?;
    let content = &data[header_len..];
    if content.len() != content_size {
        return Err(LooseError::Corrupt {
            id: id.to_hex(),
            reason: format!(
                "declared length {content_size} but payload is {} bytes",
                content.len()
            ),
        });
    }
    Ok((obj_type, content.to_vec()))
}

/// Zlib-decompress the full contents of a loose object file.
fn decompress_all(compressed: &[u8], id: &ObjectId) -> Result<Vec<u8>, LooseError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| LooseError::Decompress {
            id: id.to_hex(),
            source: e,
        })?;
    Ok(decompressed)
}
