//! The `.p2rec` file layout (bit-exact): a fixed 64-byte header, a JSON
//! metadata blob, then a stream of length-prefixed entries. Read/write both
//! live here so the recorder and the player can never drift apart on the
//! wire shape.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

pub const MAGIC: &[u8; 4] = b"P2RC";
pub const VERSION: u32 = 1;
pub const HEADER_LEN: usize = 64;
/// The only `data_type` this engine ever writes; the field exists in the
/// format for future payload kinds the player does not yet need to special-case.
pub const DATA_TYPE_RAW_BYTES: u8 = 1;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Metadata {
    #[serde(default, rename = "deviceName")]
    pub device_name: String,
    #[serde(default, rename = "recordingDate")]
    pub recording_date: String,
    #[serde(default, rename = "totalDuration")]
    pub total_duration_ms: u64,
    #[serde(default, rename = "entryCount")]
    pub entry_count: u64,
}

pub struct Entry {
    pub delta_ms: u32,
    pub data_type: u8,
    pub bytes: Vec<u8>,
}

pub fn write_header<W: Write>(w: &mut W, start_ns: u64, metadata_json: &[u8]) -> io::Result<()> {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(MAGIC);
    header[4..8].copy_from_slice(&VERSION.to_le_bytes());
    header[8..16].copy_from_slice(&start_ns.to_le_bytes());
    header[16..20].copy_from_slice(&(metadata_json.len() as u32).to_le_bytes());
    w.write_all(&header)?;
    w.write_all(metadata_json)?;
    Ok(())
}

pub struct ParsedHeader {
    pub start_ns: u64,
    pub metadata: Metadata,
}

pub fn read_header<R: Read>(r: &mut R) -> Result<ParsedHeader, RecordError> {
    let mut header = [0u8; HEADER_LEN];
    r.read_exact(&mut header).map_err(|_| RecordError::Truncated)?;
    if &header[0..4] != MAGIC {
        return Err(RecordError::BadMagic);
    }
    let version = u32::from_le_bytes(header[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(RecordError::UnsupportedVersion { version });
    }
    let start_ns = u64::from_le_bytes(header[8..16].try_into().unwrap());
    let metadata_len = u32::from_le_bytes(header[16..20].try_into().unwrap()) as usize;

    let mut metadata_buf = vec![0u8; metadata_len];
    r.read_exact(&mut metadata_buf).map_err(|_| RecordError::Truncated)?;
    let metadata: Metadata = if metadata_buf.is_empty() {
        Metadata::default()
    } else {
        serde_json::from_slice(&metadata_buf)?
    };

    Ok(ParsedHeader { start_ns, metadata })
}

pub fn write_entry<W: Write>(w: &mut W, delta_ms: u32, data_type: u8, bytes: &[u8]) -> io::Result<()> {
    w.write_all(&delta_ms.to_le_bytes())?;
    w.write_all(&[data_type])?;
    w.write_all(&(bytes.len() as u32).to_le_bytes())?;
    w.write_all(bytes)?;
    Ok(())
}

/// Reads one entry. `Ok(None)` means a clean end of stream (no bytes read at
/// all before EOF); anything read followed by EOF is `Truncated`. EOF on an
/// entry boundary is valid; EOF mid-entry is truncation.
pub fn read_entry<R: Read>(r: &mut R) -> Result<Option<Entry>, RecordError> {
    let mut delta_buf = [0u8; 4];
    if !read_exact_or_clean_eof(r, &mut delta_buf)? {
        return Ok(None);
    }
    let delta_ms = u32::from_le_bytes(delta_buf);

    let mut data_type_buf = [0u8; 1];
    r.read_exact(&mut data_type_buf).map_err(|_| RecordError::Truncated)?;
    let data_type = data_type_buf[0];

    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf).map_err(|_| RecordError::Truncated)?;
    let length = u32::from_le_bytes(len_buf) as usize;

    let mut bytes = vec![0u8; length];
    r.read_exact(&mut bytes).map_err(|_| RecordError::Truncated)?;

    Ok(Some(Entry { delta_ms, data_type, bytes }))
}

/// Reads exactly `buf.len()` bytes. Returns `Ok(true)` on success, `Ok(false)`
/// if EOF hit with zero bytes consumed (a clean end of the entry stream), or
/// `Err(Truncated)` if EOF hit partway through `buf` (a cut-off entry).
fn read_exact_or_clean_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<bool, RecordError> {
    let mut read = 0;
    while read < buf.len() {
        match r.read(&mut buf[read..]) {
            Ok(0) => {
                return if read == 0 { Ok(false) } else { Err(RecordError::Truncated) };
            }
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RecordError::Io { path: String::new(), source: e }),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trips_through_a_cursor() {
        let metadata = br#"{"deviceName":"P2-Eval","recordingDate":"2026-01-01","totalDuration":10,"entryCount":1}"#;
        let mut buf = Vec::new();
        write_header(&mut buf, 123_456, metadata).unwrap();
        assert_eq!(&buf[0..4], MAGIC);

        let mut cursor = Cursor::new(buf);
        let parsed = read_header(&mut cursor).unwrap();
        assert_eq!(parsed.start_ns, 123_456);
        assert_eq!(parsed.metadata.device_name, "P2-Eval");
        assert_eq!(parsed.metadata.entry_count, 1);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(b"NOPE");
        let mut cursor = Cursor::new(buf);
        assert!(matches!(read_header(&mut cursor), Err(RecordError::BadMagic)));
    }

    #[test]
    fn entries_round_trip_and_eof_after_a_full_entry_is_clean() {
        let mut buf = Vec::new();
        write_entry(&mut buf, 5, DATA_TYPE_RAW_BYTES, b"hello").unwrap();
        let mut cursor = Cursor::new(buf);
        let entry = read_entry(&mut cursor).unwrap().unwrap();
        assert_eq!(entry.delta_ms, 5);
        assert_eq!(entry.bytes, b"hello");
        assert!(read_entry(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn a_partial_entry_is_truncation_not_clean_eof() {
        let mut buf = Vec::new();
        write_entry(&mut buf, 5, DATA_TYPE_RAW_BYTES, b"hello").unwrap();
        buf.truncate(buf.len() - 2);
        let mut cursor = Cursor::new(buf);
        assert!(matches!(read_entry(&mut cursor), Err(RecordError::Truncated)));
    }
}
