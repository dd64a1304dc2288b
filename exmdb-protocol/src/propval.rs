//! Tagged property values.
//!
//! A [`TaggedPropval`] is a property tag, a type code and a value of one of
//! eight storage kinds. Text and binary payloads are held in a [`Cow`], so a
//! value either owns its storage or borrows it from the caller for `'a`. The
//! borrow checker keeps a borrowed value from outliving its source; use
//! [`TaggedPropval::into_owned`] to detach it.

use crate::buffer::{ByteBuffer, Decode, Encode, LENGTH_PREFIX_SIZE};
use crate::error::ProtocolError;
use crate::util;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Property type codes, stored in the low 16 bits of a tag.
pub mod prop_type {
    pub const UNSPECIFIED: u16 = 0x0000;
    pub const SHORT: u16 = 0x0002;
    pub const LONG: u16 = 0x0003;
    pub const FLOAT: u16 = 0x0004;
    pub const DOUBLE: u16 = 0x0005;
    pub const CURRENCY: u16 = 0x0006;
    pub const FLOATINGTIME: u16 = 0x0007;
    pub const ERROR: u16 = 0x000a;
    pub const BYTE: u16 = 0x000b;
    pub const LONGLONG: u16 = 0x0014;
    pub const STRING: u16 = 0x001e;
    pub const WSTRING: u16 = 0x001f;
    pub const FILETIME: u16 = 0x0040;
    pub const BINARY: u16 = 0x0102;

    pub const MV_FLAG: u16 = 0x1000;
    pub const MV_INSTANCE: u16 = 0x2000;
}

/// Type code carried in the low 16 bits of `tag`.
pub const fn tag_type(tag: u32) -> u16 {
    (tag & 0xffff) as u16
}

/// Property id carried in the high 16 bits of `tag`.
pub const fn tag_id(tag: u32) -> u16 {
    (tag >> 16) as u16
}

/// Builds a tag from a property id and type code.
pub const fn make_tag(id: u16, prop_type: u16) -> u32 {
    (id as u32) << 16 | prop_type as u32
}

/// Strips the multi-value instance bits from a type code.
pub const fn storage_type(prop_type: u16) -> u16 {
    const MV_BITS: u16 = prop_type::MV_FLAG | prop_type::MV_INSTANCE;
    if prop_type & MV_BITS == MV_BITS {
        prop_type & !MV_BITS
    } else {
        prop_type
    }
}

/// Value of a tagged property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropvalValue<'a> {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(Cow<'a, str>),
    #[serde(serialize_with = "serialize_hex")]
    Binary(Cow<'a, [u8]>),
}

fn serialize_hex<T, S>(data: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(data.as_ref()))
}

impl PropvalValue<'_> {
    /// Type code used when a value is paired with an UNSPECIFIED tag.
    pub fn canonical_type(&self) -> u16 {
        match self {
            PropvalValue::U8(_) => prop_type::BYTE,
            PropvalValue::U16(_) => prop_type::SHORT,
            PropvalValue::U32(_) => prop_type::LONG,
            PropvalValue::U64(_) => prop_type::LONGLONG,
            PropvalValue::F32(_) => prop_type::FLOAT,
            PropvalValue::F64(_) => prop_type::DOUBLE,
            PropvalValue::Str(_) => prop_type::WSTRING,
            PropvalValue::Binary(_) => prop_type::BINARY,
        }
    }

    fn matches(&self, storage: u16) -> Result<bool, ProtocolError> {
        use prop_type::*;
        Ok(match storage {
            BYTE => matches!(self, PropvalValue::U8(_)),
            SHORT => matches!(self, PropvalValue::U16(_)),
            LONG | ERROR => matches!(self, PropvalValue::U32(_)),
            LONGLONG | CURRENCY | FILETIME => matches!(self, PropvalValue::U64(_)),
            FLOAT => matches!(self, PropvalValue::F32(_)),
            DOUBLE | FLOATINGTIME => matches!(self, PropvalValue::F64(_)),
            STRING | WSTRING => matches!(self, PropvalValue::Str(_)),
            BINARY => matches!(self, PropvalValue::Binary(_)),
            other => return Err(ProtocolError::UnsupportedPropType(other)),
        })
    }

    /// `true` if text or binary storage is held by the value itself.
    /// Scalars always count as owned.
    pub fn is_owned(&self) -> bool {
        match self {
            PropvalValue::Str(s) => matches!(s, Cow::Owned(_)),
            PropvalValue::Binary(b) => matches!(b, Cow::Owned(_)),
            _ => true,
        }
    }

    pub fn into_owned(self) -> PropvalValue<'static> {
        match self {
            PropvalValue::U8(v) => PropvalValue::U8(v),
            PropvalValue::U16(v) => PropvalValue::U16(v),
            PropvalValue::U32(v) => PropvalValue::U32(v),
            PropvalValue::U64(v) => PropvalValue::U64(v),
            PropvalValue::F32(v) => PropvalValue::F32(v),
            PropvalValue::F64(v) => PropvalValue::F64(v),
            PropvalValue::Str(s) => PropvalValue::Str(Cow::Owned(s.into_owned())),
            PropvalValue::Binary(b) => PropvalValue::Binary(Cow::Owned(b.into_owned())),
        }
    }
}

/// A property tag with its type code and value.
///
/// `prop_type` normally equals the low 16 bits of `tag`. Tags whose type field
/// is UNSPECIFIED carry the real type separately, and that type is written to
/// the wire right after the tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedPropval<'a> {
    pub tag: u32,
    #[serde(rename = "type")]
    pub prop_type: u16,
    pub value: PropvalValue<'a>,
}

impl<'a> TaggedPropval<'a> {
    /// Pairs `tag` with `value`, taking the type from the tag or, for an
    /// UNSPECIFIED tag, from the value kind.
    pub fn new(tag: u32, value: PropvalValue<'a>) -> Self {
        let prop_type = match tag_type(tag) {
            prop_type::UNSPECIFIED => value.canonical_type(),
            t => t,
        };
        Self {
            tag,
            prop_type,
            value,
        }
    }

    /// Like [`new`](Self::new) but with an explicit type code.
    pub fn with_type(tag: u32, prop_type: u16, value: PropvalValue<'a>) -> Self {
        Self {
            tag,
            prop_type,
            value,
        }
    }

    pub fn u8(tag: u32, value: u8) -> Self {
        Self::new(tag, PropvalValue::U8(value))
    }

    pub fn u16(tag: u32, value: u16) -> Self {
        Self::new(tag, PropvalValue::U16(value))
    }

    pub fn u32(tag: u32, value: u32) -> Self {
        Self::new(tag, PropvalValue::U32(value))
    }

    pub fn u64(tag: u32, value: u64) -> Self {
        Self::new(tag, PropvalValue::U64(value))
    }

    pub fn f32(tag: u32, value: f32) -> Self {
        Self::new(tag, PropvalValue::F32(value))
    }

    pub fn f64(tag: u32, value: f64) -> Self {
        Self::new(tag, PropvalValue::F64(value))
    }

    /// Text value. Passing `&'a str` borrows, passing `String` owns.
    pub fn string(tag: u32, value: impl Into<Cow<'a, str>>) -> Self {
        Self::new(tag, PropvalValue::Str(value.into()))
    }

    /// Binary payload (without length prefix). Passing `&'a [u8]` borrows,
    /// passing `Vec<u8>` owns.
    pub fn binary(tag: u32, value: impl Into<Cow<'a, [u8]>>) -> Self {
        Self::new(tag, PropvalValue::Binary(value.into()))
    }

    /// Binary value borrowed from a buffer built with
    /// [`ByteBuffer::start`] / [`ByteBuffer::finalize`].
    ///
    /// The buffer must stay alive and unmodified for as long as the value
    /// exists; the borrow checker enforces this.
    pub fn binary_from_buffer(tag: u32, buf: &'a ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self::binary(tag, framed_payload(buf)?))
    }

    /// Owning counterpart of [`binary_from_buffer`](Self::binary_from_buffer).
    pub fn binary_from_buffer_copied(
        tag: u32,
        buf: &ByteBuffer,
    ) -> Result<TaggedPropval<'static>, ProtocolError> {
        Ok(TaggedPropval::binary(tag, framed_payload(buf)?.to_vec()))
    }

    /// Storage kind after stripping multi-value instance bits.
    pub fn storage_type(&self) -> u16 {
        storage_type(self.prop_type)
    }

    /// `true` if the type code is written after the tag on the wire.
    pub fn has_explicit_type(&self) -> bool {
        tag_type(self.tag) == prop_type::UNSPECIFIED
    }

    pub fn is_owned(&self) -> bool {
        self.value.is_owned()
    }

    /// Deep-copies any borrowed storage.
    pub fn into_owned(self) -> TaggedPropval<'static> {
        TaggedPropval {
            tag: self.tag,
            prop_type: self.prop_type,
            value: self.value.into_owned(),
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self.value {
            PropvalValue::U8(v) => Some(v.into()),
            PropvalValue::U16(v) => Some(v.into()),
            PropvalValue::U32(v) => Some(v.into()),
            PropvalValue::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropvalValue::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            PropvalValue::Binary(b) => Some(b.as_ref()),
            _ => None,
        }
    }

    /// Human readable value. FILETIME values are shown as a UTC calendar
    /// date, long binary values are abbreviated.
    pub fn print_value(&self) -> String {
        match (self.storage_type(), &self.value) {
            (prop_type::FILETIME, PropvalValue::U64(v)) => util::filetime_to_datetime(*v)
                .map(|dt| dt.format("%a %b %e %H:%M:%S %Y").to_string())
                .unwrap_or_else(|| v.to_string()),
            (_, PropvalValue::Binary(b)) => abbreviate_binary(b),
            _ => self.plain_value(),
        }
    }

    /// Value without any interpretation: integers (FILETIME included) in
    /// decimal, binary as full hex.
    pub fn plain_value(&self) -> String {
        match &self.value {
            PropvalValue::U8(v) => v.to_string(),
            PropvalValue::U16(v) => v.to_string(),
            PropvalValue::U32(v) => v.to_string(),
            PropvalValue::U64(v) => v.to_string(),
            PropvalValue::F32(v) => format!("{:.6}", v),
            PropvalValue::F64(v) => format!("{:.6}", v),
            PropvalValue::Str(s) => s.to_string(),
            PropvalValue::Binary(b) => hex::encode(b),
        }
    }

    fn encode_value(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        match &self.value {
            PropvalValue::U8(v) => buf.push_u8(*v),
            PropvalValue::U16(v) => buf.push_u16(*v),
            PropvalValue::U32(v) => buf.push_u32(*v),
            PropvalValue::U64(v) => buf.push_u64(*v),
            PropvalValue::F32(v) => buf.push_f32(*v),
            PropvalValue::F64(v) => buf.push_f64(*v),
            PropvalValue::Str(s) => buf.push_str(s)?,
            PropvalValue::Binary(b) => {
                let len = u32::try_from(b.len()).map_err(|_| ProtocolError::TooManyElements {
                    count: b.len(),
                    max: u32::MAX as usize,
                })?;
                buf.push_u32(len);
                buf.push_raw(b);
            }
        }
        Ok(())
    }
}

const ABBREVIATE_AFTER: usize = 16;

fn abbreviate_binary(data: &[u8]) -> String {
    if data.len() <= ABBREVIATE_AFTER {
        hex::encode(data)
    } else {
        format!("{}... ({} bytes)", hex::encode(&data[..8]), data.len())
    }
}

/// Payload of a finalized buffer, after its length prefix.
fn framed_payload(buf: &ByteBuffer) -> Result<&[u8], ProtocolError> {
    let data = buf.as_slice();
    if data.len() < LENGTH_PREFIX_SIZE {
        return Err(ProtocolError::MalformedBinary);
    }
    let (prefix, payload) = data.split_at(LENGTH_PREFIX_SIZE);
    let mut declared = [0u8; LENGTH_PREFIX_SIZE];
    declared.copy_from_slice(prefix);
    if u32::from_le_bytes(declared) as usize != payload.len() {
        return Err(ProtocolError::MalformedBinary);
    }
    Ok(payload)
}

impl Encode for TaggedPropval<'_> {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        if !self.value.matches(self.storage_type())? {
            return Err(ProtocolError::ValueTypeMismatch {
                tag: self.tag,
                prop_type: self.prop_type,
            });
        }
        buf.push_u32(self.tag);
        if self.has_explicit_type() {
            buf.push_u16(self.prop_type);
        }
        self.encode_value(buf)
    }
}

impl Decode for TaggedPropval<'static> {
    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let tag = buf.pop_u32()?;
        let prop_type = match tag_type(tag) {
            prop_type::UNSPECIFIED => buf.pop_u16()?,
            t => t,
        };
        let value = match storage_type(prop_type) {
            prop_type::BYTE => PropvalValue::U8(buf.pop_u8()?),
            prop_type::SHORT => PropvalValue::U16(buf.pop_u16()?),
            prop_type::LONG | prop_type::ERROR => PropvalValue::U32(buf.pop_u32()?),
            prop_type::LONGLONG | prop_type::CURRENCY | prop_type::FILETIME => {
                PropvalValue::U64(buf.pop_u64()?)
            }
            prop_type::FLOAT => PropvalValue::F32(buf.pop_f32()?),
            prop_type::DOUBLE | prop_type::FLOATINGTIME => PropvalValue::F64(buf.pop_f64()?),
            prop_type::STRING | prop_type::WSTRING => {
                PropvalValue::Str(Cow::Owned(buf.pop_string()?))
            }
            prop_type::BINARY => {
                let len = buf.pop_u32()? as usize;
                PropvalValue::Binary(Cow::Owned(buf.pop_raw(len)?.to_vec()))
            }
            other => return Err(ProtocolError::UnsupportedPropType(other)),
        };
        Ok(Self {
            tag,
            prop_type,
            value,
        })
    }
}

impl fmt::Display for TaggedPropval<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x} = {}", self.tag, self.print_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;
    use proptest::prelude::*;

    fn roundtrip(propval: &TaggedPropval<'_>) -> TaggedPropval<'static> {
        let mut buf = ByteBuffer::new();
        buf.push(propval).unwrap();
        let decoded: TaggedPropval<'static> = buf.pop().unwrap();
        assert_eq!(buf.remaining(), 0);
        decoded
    }

    #[test]
    fn test_type_helpers() {
        assert_eq!(tag_type(tags::DISPLAYNAME), prop_type::WSTRING);
        assert_eq!(tag_id(tags::DISPLAYNAME), 0x3001);
        assert_eq!(make_tag(0x3001, prop_type::WSTRING), tags::DISPLAYNAME);
        assert_eq!(storage_type(0x3003), prop_type::LONG);
        // A single MV bit is not stripped
        assert_eq!(storage_type(0x1003), 0x1003);
    }

    #[test]
    fn test_scalar_layout() {
        let mut buf = ByteBuffer::new();
        buf.push(&TaggedPropval::u32(0x3602_0003, 0x0102_0304)).unwrap();
        assert_eq!(
            buf.as_slice(),
            &[0x03, 0x00, 0x02, 0x36, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn test_string_layout() {
        let mut buf = ByteBuffer::new();
        buf.push(&TaggedPropval::string(tags::DISPLAYNAME, "Inbox"))
            .unwrap();
        assert_eq!(&buf.as_slice()[4..], b"Inbox\0");
    }

    #[test]
    fn test_string_with_zero_byte_is_error() {
        let mut buf = ByteBuffer::new();
        let result = buf.push(&TaggedPropval::string(tags::DISPLAYNAME, "ab\0cd"));
        assert!(matches!(
            result,
            Err(ProtocolError::InteriorNul { position: 2 })
        ));
    }

    #[test]
    fn test_binary_is_length_prefixed() {
        let mut buf = ByteBuffer::new();
        buf.push(&TaggedPropval::binary(tags::CHANGEKEY, &[0xaa, 0xbb][..]))
            .unwrap();
        assert_eq!(&buf.as_slice()[4..], &[2, 0, 0, 0, 0xaa, 0xbb]);
    }

    #[test]
    fn test_unspecified_tag_writes_explicit_type() {
        let propval = TaggedPropval::u64(0x6748_0000, 7);
        assert_eq!(propval.prop_type, prop_type::LONGLONG);
        assert!(propval.has_explicit_type());

        let mut buf = ByteBuffer::new();
        buf.push(&propval).unwrap();
        assert_eq!(&buf.as_slice()[4..6], &[0x14, 0x00]);
        assert_eq!(buf.len(), 4 + 2 + 8);

        let decoded = roundtrip(&propval);
        assert_eq!(decoded, propval);
    }

    #[test]
    fn test_multivalue_instance_decodes_as_storage_kind() {
        let mut buf = ByteBuffer::new();
        buf.push_u32(0x0e17_3003);
        buf.push_u32(99);
        let decoded: TaggedPropval<'static> = buf.pop().unwrap();
        assert_eq!(decoded.prop_type, 0x3003);
        assert_eq!(decoded.value, PropvalValue::U32(99));
    }

    #[test]
    fn test_unsupported_type_is_error() {
        let mut buf = ByteBuffer::new();
        buf.push_u32(0x0001_0048); // GUID
        buf.push_raw(&[0u8; 16]);
        let result: Result<TaggedPropval<'static>, _> = buf.pop();
        assert!(matches!(
            result,
            Err(ProtocolError::UnsupportedPropType(0x0048))
        ));
    }

    #[test]
    fn test_value_type_mismatch() {
        let propval = TaggedPropval::with_type(
            tags::DISPLAYNAME,
            prop_type::WSTRING,
            PropvalValue::U32(1),
        );
        let mut buf = ByteBuffer::new();
        assert!(matches!(
            buf.push(&propval),
            Err(ProtocolError::ValueTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_owned_string_survives_source() {
        let propval = {
            let source = String::from("temporary");
            TaggedPropval::string(tags::DISPLAYNAME, source.clone())
        };
        assert!(propval.is_owned());
        assert_eq!(propval.as_str(), Some("temporary"));
    }

    #[test]
    fn test_borrowed_string_into_owned() {
        let source = String::from("borrowed");
        let borrowed = TaggedPropval::string(tags::DISPLAYNAME, source.as_str());
        assert!(!borrowed.is_owned());

        let owned = borrowed.clone().into_owned();
        drop(source);
        assert!(owned.is_owned());
        assert_eq!(owned.as_str(), Some("borrowed"));
    }

    #[test]
    fn test_binary_from_buffer() {
        let mut blob = ByteBuffer::new();
        blob.start();
        blob.push_raw(&[1, 2, 3]);
        blob.finalize().unwrap();

        let borrowed = TaggedPropval::binary_from_buffer(tags::CHANGEKEY, &blob).unwrap();
        assert!(!borrowed.is_owned());
        assert_eq!(borrowed.as_bytes(), Some(&[1u8, 2, 3][..]));

        let copied = TaggedPropval::binary_from_buffer_copied(tags::CHANGEKEY, &blob).unwrap();
        drop(blob);
        assert!(copied.is_owned());

        let mut buf = ByteBuffer::new();
        buf.push(&copied).unwrap();
        assert_eq!(&buf.as_slice()[4..], &[3, 0, 0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_binary_from_unframed_buffer() {
        let blob = ByteBuffer::from_slice(&[9, 0, 0, 0, 1]);
        assert!(matches!(
            TaggedPropval::binary_from_buffer(tags::CHANGEKEY, &blob),
            Err(ProtocolError::MalformedBinary)
        ));
    }

    #[test]
    fn test_print_value() {
        let filetime = util::nt_time(0);
        let propval = TaggedPropval::u64(tags::CREATIONTIME, filetime);
        assert_eq!(propval.print_value(), "Thu Jan  1 00:00:00 1970");
        assert_eq!(propval.plain_value(), filetime.to_string());

        assert_eq!(TaggedPropval::f64(0x0001_0005, 1.5).print_value(), "1.500000");
        assert_eq!(TaggedPropval::u8(0x0001_000b, 1).print_value(), "1");

        let long = TaggedPropval::binary(tags::CHANGEKEY, vec![0xab; 22]);
        assert_eq!(long.print_value(), "abababababababab... (22 bytes)");
        let short = TaggedPropval::binary(tags::CHANGEKEY, vec![0x01, 0x02]);
        assert_eq!(short.print_value(), "0102");
    }

    #[test]
    fn test_serialize_json() {
        let propval = TaggedPropval::binary(tags::CHANGEKEY, vec![0xde, 0xad]);
        let json = serde_json::to_value(&propval).unwrap();
        assert_eq!(json["value"], "dead");
        assert_eq!(json["type"], prop_type::BINARY);
    }

    fn arb_propval() -> impl Strategy<Value = TaggedPropval<'static>> {
        let id = 0x0001u16..0x7fff;
        prop_oneof![
            (id.clone(), any::<u8>())
                .prop_map(|(id, v)| TaggedPropval::u8(make_tag(id, prop_type::BYTE), v)),
            (id.clone(), any::<u16>())
                .prop_map(|(id, v)| TaggedPropval::u16(make_tag(id, prop_type::SHORT), v)),
            (id.clone(), any::<u32>())
                .prop_map(|(id, v)| TaggedPropval::u32(make_tag(id, prop_type::LONG), v)),
            (id.clone(), any::<u64>())
                .prop_map(|(id, v)| TaggedPropval::u64(make_tag(id, prop_type::FILETIME), v)),
            (id.clone(), any::<u64>())
                .prop_map(|(id, v)| TaggedPropval::u64(make_tag(id, prop_type::UNSPECIFIED), v)),
            (id.clone(), -1.0e6f32..1.0e6)
                .prop_map(|(id, v)| TaggedPropval::f32(make_tag(id, prop_type::FLOAT), v)),
            (id.clone(), -1.0e12f64..1.0e12)
                .prop_map(|(id, v)| TaggedPropval::f64(make_tag(id, prop_type::DOUBLE), v)),
            (id.clone(), "\\PC{0,32}")
                .prop_map(|(id, v)| TaggedPropval::string(make_tag(id, prop_type::WSTRING), v)),
            (id, proptest::collection::vec(any::<u8>(), 0..64))
                .prop_map(|(id, v)| TaggedPropval::binary(make_tag(id, prop_type::BINARY), v)),
        ]
    }

    proptest! {
        #[test]
        fn test_propval_roundtrip(propval in arb_propval()) {
            prop_assert_eq!(roundtrip(&propval), propval);
        }
    }
}
