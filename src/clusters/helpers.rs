//! Serialization helpers shared by the generated cluster wrappers.
//!
//! Raw tlv payloads and octet-string attributes serialize as hex strings so
//! that response dumps stay printable.

/// Serialize Vec<u8> as a hex string for JSON output
pub fn serialize_bytes_as_hex<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}
