use bstr::{BStr, BString};
use gitview_hash::ObjectId;

use crate::{ObjectError, ObjectType, Stamp};

/// A git annotated tag object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Id of the tagged object.
    pub target: ObjectId,
    /// Kind of the tagged object.
    pub target_type: ObjectType,
    /// Tag name.
    pub tag_name: BString,
    /// Tagger identity and timestamp (absent on some very old tags).
    pub tagger: Option<Stamp>,
    /// Tag message.
    pub message: BString,
}

impl Tag {
    /// Parse tag payload bytes (no object header).
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut target: Option<ObjectId> = None;
        let mut target_type: Option<ObjectType> = None;
        let mut tag_name: Option<BString> = None;
        let mut tagger: Option<Stamp> = None;

        let data = content;
        let mut pos = 0;

        loop {
            if pos >= data.len() {
                break;
            }
            if data[pos] == b'\n' {
                pos += 1;
                break;
            }

            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| p + pos)
                .unwrap_or(data.len());
            let line = &data[pos..line_end];
            pos = if line_end < data.len() {
                line_end + 1
            } else {
                data.len()
            };

            if line.first() == Some(&b' ') {
                continue;
            }
            let Some(space_pos) = line.iter().position(|&b| b == b' ') else {
                continue;
            };
            let key = &line[..space_pos];
            let value = &line[space_pos + 1..];

            match key {
                b"object" => {
                    let hex = std::str::from_utf8(value).map_err(|_| {
                        ObjectError::InvalidHeader("non-UTF8 target id".into())
                    })?;
                    target = Some(ObjectId::from_hex(hex)?);
                }
                b"type" => {
                    target_type = Some(ObjectType::from_bytes(value)?);
                }
                b"tag" => {
                    tag_name = Some(BString::from(value));
                }
                b"tagger" => {
                    tagger = Some(Stamp::parse(BStr::new(value))?);
                }
                _ => {}
            }
        }

        let target = target.ok_or(ObjectError::MissingTagField { field: "object" })?;
        let target_type = target_type.ok_or(ObjectError::MissingTagField { field: "type" })?;
        let tag_name = tag_name.ok_or(ObjectError::MissingTagField { field: "tag" })?;

        Ok(Self {
            target,
            target_type,
            tag_name,
            tagger,
            message: BString::from(&data[pos..]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tag_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"object da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        out.extend_from_slice(b"type commit\n");
        out.extend_from_slice(b"tag v1.0.0\n");
        out.extend_from_slice(b"tagger Rel Eng <rel@example.com> 1600000000 +0200\n");
        out.extend_from_slice(b"\n");
        out.extend_from_slice(b"Release 1.0.0\n");
        out
    }

    #[test]
    fn parse_tag() {
        let tag = Tag::parse(&sample_tag_bytes()).unwrap();
        assert_eq!(
            tag.target.to_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(tag.target_type, ObjectType::Commit);
        assert_eq!(tag.tag_name, "v1.0.0");
        assert_eq!(tag.tagger.as_ref().unwrap().email, "rel@example.com");
        assert_eq!(tag.message, "Release 1.0.0\n");
    }

    #[test]
    fn tagger_is_optional() {
        let mut data = Vec::new();
        data.extend_from_slice(b"object da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"type blob\n");
        data.extend_from_slice(b"tag old-style\n");
        data.extend_from_slice(b"\nold\n");

        let tag = Tag::parse(&data).unwrap();
        assert!(tag.tagger.is_none());
        assert_eq!(tag.target_type, ObjectType::Blob);
    }

    #[test]
    fn missing_object_errors() {
        let data = b"type commit\ntag broken\n\nmsg\n";
        assert!(matches!(
            Tag::parse(data).unwrap_err(),
            ObjectError::MissingTagField { field: "object" }
        ));
    }
}
