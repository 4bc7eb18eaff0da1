// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Framed record codec for the two segment files.
//!
//! All integers are little-endian. Each frame starts with a fixed u32 tag;
//! the forward scan on open uses the tag both as a format check and as a
//! corruption tripwire. An incomplete tag at the end of a file is a torn
//! tail and terminates the scan cleanly; a complete tag that mismatches, or
//! truncated fields after a valid tag, is [`StoreError::CorruptSegment`].

use std::io::Read;

use crate::error::StoreError;
use crate::ident::{ObjectId, ObjectRef, TypeId, Version};
use crate::record::{EdgeRecord, ObjectRecord};

/// Object frame tag: the bytes `OBJ1` read as a little-endian u32.
pub(crate) const OBJECT_TAG: u32 = 0x314a_424f;
/// Edge frame tag: the bytes `EDG1` read as a little-endian u32.
pub(crate) const EDGE_TAG: u32 = 0x3147_4445;

fn frame_len(raw: usize, context: &str) -> Result<u32, StoreError> {
    u32::try_from(raw).map_err(|_| StoreError::Decode(format!("{context} exceeds frame limit")))
}

/// Encodes one object record as a segment frame.
pub(crate) fn encode_object_frame(record: &ObjectRecord) -> Result<Vec<u8>, StoreError> {
    let payload_size = frame_len(record.payload.len(), "object payload")?;
    let mut out = Vec::with_capacity(64 + record.payload.len());
    out.extend_from_slice(&OBJECT_TAG.to_le_bytes());
    out.extend_from_slice(&payload_size.to_le_bytes());
    out.extend_from_slice(&record.object_ref.version.0.to_le_bytes());
    out.extend_from_slice(&record.type_id.0.to_le_bytes());
    out.extend_from_slice(&record.created_at_ms.to_le_bytes());
    out.extend_from_slice(record.object_ref.id.as_bytes());
    out.extend_from_slice(record.definition_id.as_bytes());
    out.extend_from_slice(&record.payload);
    Ok(out)
}

/// Encodes one edge record as a segment frame.
pub(crate) fn encode_edge_frame(record: &EdgeRecord) -> Result<Vec<u8>, StoreError> {
    let name_len = frame_len(record.name.len(), "edge name")?;
    let role_len = frame_len(record.role.len(), "edge role")?;
    let props_len = frame_len(record.props.len(), "edge props")?;
    let mut out = Vec::with_capacity(
        72 + record.name.len() + record.role.len() + record.props.len(),
    );
    out.extend_from_slice(&EDGE_TAG.to_le_bytes());
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(&role_len.to_le_bytes());
    out.extend_from_slice(&props_len.to_le_bytes());
    out.extend_from_slice(&record.created_at_ms.to_le_bytes());
    out.extend_from_slice(record.from.id.as_bytes());
    out.extend_from_slice(&record.from.version.0.to_le_bytes());
    out.extend_from_slice(record.to.id.as_bytes());
    out.extend_from_slice(&record.to.version.0.to_le_bytes());
    out.extend_from_slice(record.name.as_bytes());
    out.extend_from_slice(record.role.as_bytes());
    out.extend_from_slice(&record.props);
    Ok(out)
}

/// Result of a forward scan: recovered records with their frame offsets, and
/// the offset one past the last whole record (a torn tail, if any, starts
/// there).
#[derive(Debug)]
pub(crate) struct ScanOutcome<T> {
    pub records: Vec<(u64, T)>,
    pub valid_end: u64,
}

enum TagRead {
    /// Clean end of stream, or a torn partial tag.
    End,
    Tag(u32),
}

fn read_tag<R: Read>(reader: &mut R) -> Result<TagRead, StoreError> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(TagRead::End);
        }
        filled += n;
    }
    Ok(TagRead::Tag(u32::from_le_bytes(buf)))
}

fn read_body<R: Read>(reader: &mut R, buf: &mut [u8], offset: u64) -> Result<(), StoreError> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            StoreError::CorruptSegment { offset }
        } else {
            StoreError::Io(err)
        }
    })
}

fn take_u32(buf: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn take_u64(buf: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(raw)
}

fn take_id(buf: &[u8], at: usize) -> ObjectId {
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&buf[at..at + 16]);
    ObjectId(raw)
}

/// Scans an object segment from the start.
pub(crate) fn scan_object_segment<R: Read>(
    reader: &mut R,
) -> Result<ScanOutcome<ObjectRecord>, StoreError> {
    let mut records = Vec::new();
    let mut offset = 0u64;
    loop {
        match read_tag(reader)? {
            TagRead::End => break,
            TagRead::Tag(tag) if tag != OBJECT_TAG => {
                return Err(StoreError::CorruptSegment { offset });
            }
            TagRead::Tag(_) => {}
        }

        // payload_size + version + type_id + created_ms + object_id + definition_id
        let mut head = [0u8; 4 + 8 + 8 + 8 + 16 + 16];
        read_body(reader, &mut head, offset)?;
        let payload_size = take_u32(&head, 0) as usize;
        let version = take_u64(&head, 4);
        let type_id = take_u64(&head, 12);
        let created_at_ms = take_u64(&head, 20);
        let object_id = take_id(&head, 28);
        let definition_id = take_id(&head, 44);

        let mut payload = vec![0u8; payload_size];
        read_body(reader, &mut payload, offset)?;

        records.push((
            offset,
            ObjectRecord {
                object_ref: ObjectRef {
                    id: object_id,
                    version: Version(version),
                },
                type_id: TypeId(type_id),
                definition_id,
                payload,
                created_at_ms,
            },
        ));
        offset += 4 + head.len() as u64 + payload_size as u64;
    }
    Ok(ScanOutcome {
        records,
        valid_end: offset,
    })
}

/// Scans an edge segment from the start.
pub(crate) fn scan_edge_segment<R: Read>(
    reader: &mut R,
) -> Result<ScanOutcome<EdgeRecord>, StoreError> {
    let mut records = Vec::new();
    let mut offset = 0u64;
    loop {
        match read_tag(reader)? {
            TagRead::End => break,
            TagRead::Tag(tag) if tag != EDGE_TAG => {
                return Err(StoreError::CorruptSegment { offset });
            }
            TagRead::Tag(_) => {}
        }

        // name_len + role_len + props_len + created_ms + from + from_ver + to + to_ver
        let mut head = [0u8; 4 + 4 + 4 + 8 + 16 + 8 + 16 + 8];
        read_body(reader, &mut head, offset)?;
        let name_len = take_u32(&head, 0) as usize;
        let role_len = take_u32(&head, 4) as usize;
        let props_len = take_u32(&head, 8) as usize;
        let created_at_ms = take_u64(&head, 12);
        let from_id = take_id(&head, 20);
        let from_ver = take_u64(&head, 36);
        let to_id = take_id(&head, 44);
        let to_ver = take_u64(&head, 60);

        let mut tail = vec![0u8; name_len + role_len + props_len];
        read_body(reader, &mut tail, offset)?;
        let name = String::from_utf8(tail[..name_len].to_vec())
            .map_err(|_| StoreError::CorruptSegment { offset })?;
        let role = String::from_utf8(tail[name_len..name_len + role_len].to_vec())
            .map_err(|_| StoreError::CorruptSegment { offset })?;
        let props = tail[name_len + role_len..].to_vec();

        records.push((
            offset,
            EdgeRecord {
                from: ObjectRef {
                    id: from_id,
                    version: Version(from_ver),
                },
                to: ObjectRef {
                    id: to_id,
                    version: Version(to_ver),
                },
                name,
                role,
                props,
                created_at_ms,
            },
        ));
        offset += 4 + head.len() as u64 + (name_len + role_len + props_len) as u64;
    }
    Ok(ScanOutcome {
        records,
        valid_end: offset,
    })
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_object() -> ObjectRecord {
        ObjectRecord {
            object_ref: ObjectRef::new(ObjectId::random(), 1),
            type_id: TypeId(0x1234),
            definition_id: ObjectId::random(),
            payload: vec![0x01, 0x02, 0x03],
            created_at_ms: 1_700_000_000_000,
        }
    }

    fn sample_edge() -> EdgeRecord {
        EdgeRecord {
            from: ObjectRef::new(ObjectId::random(), 1),
            to: ObjectRef::new(ObjectId::random(), 1),
            name: "link".into(),
            role: "test".into(),
            props: vec![0xa1],
            created_at_ms: 1_700_000_000_001,
        }
    }

    #[test]
    fn object_frame_round_trips() {
        let record = sample_object();
        let frame = encode_object_frame(&record).unwrap();
        let scan = scan_object_segment(&mut Cursor::new(&frame)).unwrap();
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].0, 0);
        assert_eq!(scan.records[0].1, record);
        assert_eq!(scan.valid_end, frame.len() as u64);
    }

    #[test]
    fn edge_frame_round_trips() {
        let record = sample_edge();
        let frame = encode_edge_frame(&record).unwrap();
        let scan = scan_edge_segment(&mut Cursor::new(&frame)).unwrap();
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].1, record);
    }

    #[test]
    fn torn_tail_terminates_the_scan_cleanly() {
        let record = sample_object();
        let mut bytes = encode_object_frame(&record).unwrap();
        let whole = bytes.len() as u64;
        // A second frame truncated inside its tag.
        bytes.extend_from_slice(&OBJECT_TAG.to_le_bytes()[..2]);
        let scan = scan_object_segment(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.valid_end, whole);
    }

    #[test]
    fn wrong_tag_is_fatal_with_the_frame_offset() {
        let record = sample_object();
        let mut bytes = encode_object_frame(&record).unwrap();
        let second = bytes.len() as u64;
        bytes.extend_from_slice(&0xdead_beef_u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 60]);
        match scan_object_segment(&mut Cursor::new(&bytes)) {
            Err(StoreError::CorruptSegment { offset }) => assert_eq!(offset, second),
            other => panic!("expected corrupt segment, got {other:?}"),
        }
    }

    #[test]
    fn truncated_fields_after_a_valid_tag_are_fatal() {
        let record = sample_object();
        let frame = encode_object_frame(&record).unwrap();
        // Cut inside the fixed header, past the tag.
        let cut = &frame[..10];
        assert!(matches!(
            scan_object_segment(&mut Cursor::new(cut)),
            Err(StoreError::CorruptSegment { offset: 0 })
        ));
    }
}
