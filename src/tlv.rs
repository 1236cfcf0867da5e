//! Matter tlv encoder/decoder.
//!
//! [TlvWriter] builds a tlv byte stream with explicit container bracketing,
//! [TlvReader] walks one with a forward-only cursor. Integers are encoded with
//! the smallest width that holds the value; readers accept any valid width for
//! a given logical type.
//!
//! ```
//! # use matim::tlv::{Tag, TlvWriter, TlvReader};
//! # use anyhow::Result;
//! # fn main() -> Result<()> {
//! let mut w = TlvWriter::new();
//! w.start_structure(Tag::Anonymous)?;
//! w.put_u32(Tag::Context(0), 100)?;
//! w.put_string(Tag::Context(1), "test")?;
//! w.end_structure()?;
//! let encoded = w.into_encoded()?;
//!
//! let mut r = TlvReader::new(&encoded);
//! r.enter_structure(Tag::Anonymous)?;
//! assert_eq!(r.get_u32(Tag::Context(0))?, 100);
//! assert_eq!(r.get_string(Tag::Context(1))?, "test");
//! r.exit_container()?;
//! # Ok(())
//! # }
//! ```

use byteorder::{ByteOrder, LittleEndian};
use core::fmt;
use thiserror::Error;

const TYPE_INT_1: u8 = 0x00;
const TYPE_INT_2: u8 = 0x01;
const TYPE_INT_4: u8 = 0x02;
const TYPE_INT_8: u8 = 0x03;
const TYPE_UINT_1: u8 = 0x04;
const TYPE_UINT_2: u8 = 0x05;
const TYPE_UINT_4: u8 = 0x06;
const TYPE_UINT_8: u8 = 0x07;
const TYPE_BOOL_FALSE: u8 = 0x08;
const TYPE_BOOL_TRUE: u8 = 0x09;
const TYPE_FLOAT_4: u8 = 0x0a;
const TYPE_FLOAT_8: u8 = 0x0b;
const TYPE_UTF8_L1: u8 = 0x0c;
const TYPE_OCTET_STRING_L1: u8 = 0x10;
const TYPE_NULL: u8 = 0x14;
const TYPE_STRUCT: u8 = 0x15;
const TYPE_ARRAY: u8 = 0x16;
const TYPE_LIST: u8 = 0x17;
const TYPE_END_CONTAINER: u8 = 0x18;

const TAGCTRL_CONTEXT: u8 = 1;

/// Errors raised by the tlv codec: malformed input, tag/type mismatches and
/// unbalanced containers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("unexpected end of tlv data at offset {0}")]
    UnexpectedEnd(usize),
    #[error("unknown tlv element type 0x{0:02x}")]
    UnknownElementType(u8),
    #[error("unsupported tag control {0}")]
    UnsupportedTagControl(u8),
    #[error("expected tag {expected}, found {found}")]
    TagMismatch { expected: Tag, found: Tag },
    #[error("expected {expected} element, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("integer value does not fit requested type")]
    IntegerOutOfRange,
    #[error("utf8 string element contains invalid utf8")]
    InvalidUtf8,
    #[error("tlv container left open")]
    UnclosedContainer,
    #[error("container end does not match innermost open container")]
    ContainerMismatch,
    #[error("cursor is not positioned at end of container")]
    NotAtEndOfContainer,
    #[error("cursor is not inside a container")]
    NotInContainer,
    #[error("context tag not allowed on array entry")]
    TagInArray,
}

/// Tag of a tlv element. Context tags address fields inside a structure or
/// list; array entries and top level payloads are anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Anonymous,
    Context(u8),
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Anonymous => write!(f, "anonymous"),
            Tag::Context(n) => write!(f, "ctx({})", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Structure,
    Array,
    List,
}

impl ContainerKind {
    fn name(&self) -> &'static str {
        match self {
            ContainerKind::Structure => "structure",
            ContainerKind::Array => "array",
            ContainerKind::List => "list",
        }
    }
}

fn element_type_name(t: u8) -> &'static str {
    match t {
        TYPE_INT_1..=TYPE_INT_8 => "signed integer",
        TYPE_UINT_1..=TYPE_UINT_8 => "unsigned integer",
        TYPE_BOOL_FALSE | TYPE_BOOL_TRUE => "boolean",
        TYPE_FLOAT_4 => "float",
        TYPE_FLOAT_8 => "double",
        TYPE_UTF8_L1..=0x0f => "utf8 string",
        TYPE_OCTET_STRING_L1..=0x13 => "octet string",
        TYPE_NULL => "null",
        TYPE_STRUCT => "structure",
        TYPE_ARRAY => "array",
        TYPE_LIST => "list",
        TYPE_END_CONTAINER => "end of container",
        _ => "unknown",
    }
}

/// Encoder building a tlv byte stream. Open containers are tracked so that
/// mismatched or missing end calls fail before the encoded bytes can leak out.
pub struct TlvWriter {
    data: Vec<u8>,
    open: Vec<ContainerKind>,
}

impl TlvWriter {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(1024),
            open: Vec::new(),
        }
    }

    fn write_control(&mut self, tag: Tag, element_type: u8) -> Result<(), FormatError> {
        if tag != Tag::Anonymous && self.open.last() == Some(&ContainerKind::Array) {
            return Err(FormatError::TagInArray);
        }
        match tag {
            Tag::Anonymous => self.data.push(element_type),
            Tag::Context(n) => {
                self.data.push((TAGCTRL_CONTEXT << 5) | element_type);
                self.data.push(n);
            }
        }
        Ok(())
    }

    fn start_container(
        &mut self,
        tag: Tag,
        element_type: u8,
        kind: ContainerKind,
    ) -> Result<(), FormatError> {
        self.write_control(tag, element_type)?;
        self.open.push(kind);
        Ok(())
    }

    fn end_container(&mut self, kind: ContainerKind) -> Result<(), FormatError> {
        match self.open.last() {
            Some(k) if *k == kind => {
                self.open.pop();
                self.data.push(TYPE_END_CONTAINER);
                Ok(())
            }
            Some(_) => Err(FormatError::ContainerMismatch),
            None => Err(FormatError::NotInContainer),
        }
    }

    pub fn start_structure(&mut self, tag: Tag) -> Result<(), FormatError> {
        self.start_container(tag, TYPE_STRUCT, ContainerKind::Structure)
    }

    pub fn start_array(&mut self, tag: Tag) -> Result<(), FormatError> {
        self.start_container(tag, TYPE_ARRAY, ContainerKind::Array)
    }

    pub fn start_list(&mut self, tag: Tag) -> Result<(), FormatError> {
        self.start_container(tag, TYPE_LIST, ContainerKind::List)
    }

    pub fn end_structure(&mut self) -> Result<(), FormatError> {
        self.end_container(ContainerKind::Structure)
    }

    pub fn end_array(&mut self) -> Result<(), FormatError> {
        self.end_container(ContainerKind::Array)
    }

    pub fn end_list(&mut self) -> Result<(), FormatError> {
        self.end_container(ContainerKind::List)
    }

    /// Unsigned integer, smallest width that holds the value.
    pub fn put_u64(&mut self, tag: Tag, value: u64) -> Result<(), FormatError> {
        if value <= u8::MAX as u64 {
            self.write_control(tag, TYPE_UINT_1)?;
            self.data.push(value as u8);
        } else if value <= u16::MAX as u64 {
            self.write_control(tag, TYPE_UINT_2)?;
            self.data.extend_from_slice(&(value as u16).to_le_bytes());
        } else if value <= u32::MAX as u64 {
            self.write_control(tag, TYPE_UINT_4)?;
            self.data.extend_from_slice(&(value as u32).to_le_bytes());
        } else {
            self.write_control(tag, TYPE_UINT_8)?;
            self.data.extend_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    pub fn put_u8(&mut self, tag: Tag, value: u8) -> Result<(), FormatError> {
        self.put_u64(tag, value as u64)
    }

    pub fn put_u16(&mut self, tag: Tag, value: u16) -> Result<(), FormatError> {
        self.put_u64(tag, value as u64)
    }

    pub fn put_u32(&mut self, tag: Tag, value: u32) -> Result<(), FormatError> {
        self.put_u64(tag, value as u64)
    }

    /// Signed integer, smallest width that holds the value.
    pub fn put_i64(&mut self, tag: Tag, value: i64) -> Result<(), FormatError> {
        if value >= i8::MIN as i64 && value <= i8::MAX as i64 {
            self.write_control(tag, TYPE_INT_1)?;
            self.data.push(value as i8 as u8);
        } else if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
            self.write_control(tag, TYPE_INT_2)?;
            self.data.extend_from_slice(&(value as i16).to_le_bytes());
        } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
            self.write_control(tag, TYPE_INT_4)?;
            self.data.extend_from_slice(&(value as i32).to_le_bytes());
        } else {
            self.write_control(tag, TYPE_INT_8)?;
            self.data.extend_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    pub fn put_i8(&mut self, tag: Tag, value: i8) -> Result<(), FormatError> {
        self.put_i64(tag, value as i64)
    }

    pub fn put_i16(&mut self, tag: Tag, value: i16) -> Result<(), FormatError> {
        self.put_i64(tag, value as i64)
    }

    pub fn put_i32(&mut self, tag: Tag, value: i32) -> Result<(), FormatError> {
        self.put_i64(tag, value as i64)
    }

    pub fn put_bool(&mut self, tag: Tag, value: bool) -> Result<(), FormatError> {
        let t = if value { TYPE_BOOL_TRUE } else { TYPE_BOOL_FALSE };
        self.write_control(tag, t)
    }

    pub fn put_f32(&mut self, tag: Tag, value: f32) -> Result<(), FormatError> {
        self.write_control(tag, TYPE_FLOAT_4)?;
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn put_f64(&mut self, tag: Tag, value: f64) -> Result<(), FormatError> {
        self.write_control(tag, TYPE_FLOAT_8)?;
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn put_length_prefixed(
        &mut self,
        tag: Tag,
        base: u8,
        payload: &[u8],
    ) -> Result<(), FormatError> {
        let len = payload.len();
        if len <= u8::MAX as usize {
            self.write_control(tag, base)?;
            self.data.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.write_control(tag, base + 1)?;
            self.data.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.write_control(tag, base + 2)?;
            self.data.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.data.extend_from_slice(payload);
        Ok(())
    }

    pub fn put_string(&mut self, tag: Tag, value: &str) -> Result<(), FormatError> {
        self.put_length_prefixed(tag, TYPE_UTF8_L1, value.as_bytes())
    }

    pub fn put_bytes(&mut self, tag: Tag, value: &[u8]) -> Result<(), FormatError> {
        self.put_length_prefixed(tag, TYPE_OCTET_STRING_L1, value)
    }

    /// Raw pre-encoded tlv, spliced in as-is.
    pub fn put_raw(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Finish encoding. Fails if any container is still open.
    pub fn into_encoded(self) -> Result<Vec<u8>, FormatError> {
        if !self.open.is_empty() {
            return Err(FormatError::UnclosedContainer);
        }
        Ok(self.data)
    }
}

impl Default for TlvWriter {
    fn default() -> Self {
        Self::new()
    }
}

struct ElementHead {
    tag: Tag,
    element_type: u8,
    value_pos: usize,
}

/// Forward-only cursor over an encoded tlv byte stream. Containers are
/// entered and exited explicitly; malformed input fails at the point of
/// divergence.
pub struct TlvReader<'a> {
    data: &'a [u8],
    pos: usize,
    open: Vec<ContainerKind>,
}

impl<'a> TlvReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn byte_at(&self, pos: usize) -> Result<u8, FormatError> {
        self.data
            .get(pos)
            .copied()
            .ok_or(FormatError::UnexpectedEnd(pos))
    }

    fn peek_head(&self) -> Result<ElementHead, FormatError> {
        let ctrl = self.byte_at(self.pos)?;
        let element_type = ctrl & 0x1f;
        if element_type > TYPE_END_CONTAINER {
            return Err(FormatError::UnknownElementType(element_type));
        }
        let tagctrl = ctrl >> 5;
        let (tag, value_pos) = match tagctrl {
            0 => (Tag::Anonymous, self.pos + 1),
            TAGCTRL_CONTEXT => (Tag::Context(self.byte_at(self.pos + 1)?), self.pos + 2),
            other => return Err(FormatError::UnsupportedTagControl(other)),
        };
        Ok(ElementHead {
            tag,
            element_type,
            value_pos,
        })
    }

    fn check_tag(expected: Tag, head: &ElementHead) -> Result<(), FormatError> {
        if head.tag != expected {
            return Err(FormatError::TagMismatch {
                expected,
                found: head.tag,
            });
        }
        Ok(())
    }

    fn value_slice(&self, start: usize, len: usize) -> Result<&'a [u8], FormatError> {
        let end = start
            .checked_add(len)
            .ok_or(FormatError::UnexpectedEnd(self.data.len()))?;
        if end > self.data.len() {
            return Err(FormatError::UnexpectedEnd(self.data.len()));
        }
        Ok(&self.data[start..end])
    }

    fn enter(&mut self, tag: Tag, element_type: u8, kind: ContainerKind) -> Result<(), FormatError> {
        let head = self.peek_head()?;
        Self::check_tag(tag, &head)?;
        if head.element_type != element_type {
            return Err(FormatError::TypeMismatch {
                expected: kind.name(),
                found: element_type_name(head.element_type),
            });
        }
        self.pos = head.value_pos;
        self.open.push(kind);
        Ok(())
    }

    pub fn enter_structure(&mut self, tag: Tag) -> Result<(), FormatError> {
        self.enter(tag, TYPE_STRUCT, ContainerKind::Structure)
    }

    pub fn enter_array(&mut self, tag: Tag) -> Result<(), FormatError> {
        self.enter(tag, TYPE_ARRAY, ContainerKind::Array)
    }

    pub fn enter_list(&mut self, tag: Tag) -> Result<(), FormatError> {
        self.enter(tag, TYPE_LIST, ContainerKind::List)
    }

    /// Consume the terminator of the current container and return to the
    /// parent level. The caller must have read all children first.
    pub fn exit_container(&mut self) -> Result<(), FormatError> {
        if self.open.is_empty() {
            return Err(FormatError::NotInContainer);
        }
        if self.byte_at(self.pos)? != TYPE_END_CONTAINER {
            return Err(FormatError::NotAtEndOfContainer);
        }
        self.pos += 1;
        self.open.pop();
        Ok(())
    }

    /// True when the next element at the current level is the container
    /// terminator (or, at top level, the end of input).
    pub fn is_end_of_container(&self) -> bool {
        if self.open.is_empty() {
            return self.pos >= self.data.len();
        }
        // Truncated input also reads as "end"; exit_container reports it.
        matches!(self.data.get(self.pos), Some(&TYPE_END_CONTAINER) | None)
    }

    /// Peek whether the next element carries the given tag, without
    /// advancing. Absent optional fields are detected this way.
    pub fn is_next_tag(&self, tag: Tag) -> bool {
        if self.is_end_of_container() {
            return false;
        }
        match self.peek_head() {
            Ok(head) => head.tag == tag,
            Err(_) => false,
        }
    }

    fn take_unsigned(&mut self, tag: Tag) -> Result<u64, FormatError> {
        let head = self.peek_head()?;
        Self::check_tag(tag, &head)?;
        let width = match head.element_type {
            TYPE_UINT_1 => 1,
            TYPE_UINT_2 => 2,
            TYPE_UINT_4 => 4,
            TYPE_UINT_8 => 8,
            other => {
                return Err(FormatError::TypeMismatch {
                    expected: "unsigned integer",
                    found: element_type_name(other),
                })
            }
        };
        let raw = self.value_slice(head.value_pos, width)?;
        let value = match width {
            1 => raw[0] as u64,
            2 => LittleEndian::read_u16(raw) as u64,
            4 => LittleEndian::read_u32(raw) as u64,
            _ => LittleEndian::read_u64(raw),
        };
        self.pos = head.value_pos + width;
        Ok(value)
    }

    fn take_signed(&mut self, tag: Tag) -> Result<i64, FormatError> {
        let head = self.peek_head()?;
        Self::check_tag(tag, &head)?;
        let width = match head.element_type {
            TYPE_INT_1 => 1,
            TYPE_INT_2 => 2,
            TYPE_INT_4 => 4,
            TYPE_INT_8 => 8,
            other => {
                return Err(FormatError::TypeMismatch {
                    expected: "signed integer",
                    found: element_type_name(other),
                })
            }
        };
        let raw = self.value_slice(head.value_pos, width)?;
        let value = match width {
            1 => raw[0] as i8 as i64,
            2 => LittleEndian::read_u16(raw) as i16 as i64,
            4 => LittleEndian::read_u32(raw) as i32 as i64,
            _ => LittleEndian::read_u64(raw) as i64,
        };
        self.pos = head.value_pos + width;
        Ok(value)
    }

    pub fn get_u8(&mut self, tag: Tag) -> Result<u8, FormatError> {
        u8::try_from(self.take_unsigned(tag)?).map_err(|_| FormatError::IntegerOutOfRange)
    }

    pub fn get_u16(&mut self, tag: Tag) -> Result<u16, FormatError> {
        u16::try_from(self.take_unsigned(tag)?).map_err(|_| FormatError::IntegerOutOfRange)
    }

    pub fn get_u32(&mut self, tag: Tag) -> Result<u32, FormatError> {
        u32::try_from(self.take_unsigned(tag)?).map_err(|_| FormatError::IntegerOutOfRange)
    }

    pub fn get_u64(&mut self, tag: Tag) -> Result<u64, FormatError> {
        self.take_unsigned(tag)
    }

    pub fn get_i8(&mut self, tag: Tag) -> Result<i8, FormatError> {
        i8::try_from(self.take_signed(tag)?).map_err(|_| FormatError::IntegerOutOfRange)
    }

    pub fn get_i16(&mut self, tag: Tag) -> Result<i16, FormatError> {
        i16::try_from(self.take_signed(tag)?).map_err(|_| FormatError::IntegerOutOfRange)
    }

    pub fn get_i32(&mut self, tag: Tag) -> Result<i32, FormatError> {
        i32::try_from(self.take_signed(tag)?).map_err(|_| FormatError::IntegerOutOfRange)
    }

    pub fn get_i64(&mut self, tag: Tag) -> Result<i64, FormatError> {
        self.take_signed(tag)
    }

    pub fn get_bool(&mut self, tag: Tag) -> Result<bool, FormatError> {
        let head = self.peek_head()?;
        Self::check_tag(tag, &head)?;
        let value = match head.element_type {
            TYPE_BOOL_FALSE => false,
            TYPE_BOOL_TRUE => true,
            other => {
                return Err(FormatError::TypeMismatch {
                    expected: "boolean",
                    found: element_type_name(other),
                })
            }
        };
        self.pos = head.value_pos;
        Ok(value)
    }

    pub fn get_f32(&mut self, tag: Tag) -> Result<f32, FormatError> {
        let head = self.peek_head()?;
        Self::check_tag(tag, &head)?;
        if head.element_type != TYPE_FLOAT_4 {
            return Err(FormatError::TypeMismatch {
                expected: "float",
                found: element_type_name(head.element_type),
            });
        }
        let raw = self.value_slice(head.value_pos, 4)?;
        self.pos = head.value_pos + 4;
        Ok(LittleEndian::read_f32(raw))
    }

    /// Doubles also accept a single precision encoding (widening is lossless).
    pub fn get_f64(&mut self, tag: Tag) -> Result<f64, FormatError> {
        let head = self.peek_head()?;
        Self::check_tag(tag, &head)?;
        match head.element_type {
            TYPE_FLOAT_8 => {
                let raw = self.value_slice(head.value_pos, 8)?;
                self.pos = head.value_pos + 8;
                Ok(LittleEndian::read_f64(raw))
            }
            TYPE_FLOAT_4 => {
                let raw = self.value_slice(head.value_pos, 4)?;
                self.pos = head.value_pos + 4;
                Ok(LittleEndian::read_f32(raw) as f64)
            }
            other => Err(FormatError::TypeMismatch {
                expected: "double",
                found: element_type_name(other),
            }),
        }
    }

    fn take_length_prefixed(
        &mut self,
        tag: Tag,
        base: u8,
        expected: &'static str,
    ) -> Result<&'a [u8], FormatError> {
        let head = self.peek_head()?;
        Self::check_tag(tag, &head)?;
        let idx = head.element_type.wrapping_sub(base);
        if idx > 3 {
            return Err(FormatError::TypeMismatch {
                expected,
                found: element_type_name(head.element_type),
            });
        }
        let len_width = 1usize << idx;
        let len_raw = self.value_slice(head.value_pos, len_width)?;
        let len = match len_width {
            1 => len_raw[0] as u64,
            2 => LittleEndian::read_u16(len_raw) as u64,
            4 => LittleEndian::read_u32(len_raw) as u64,
            _ => LittleEndian::read_u64(len_raw),
        };
        let len = usize::try_from(len).map_err(|_| FormatError::UnexpectedEnd(self.data.len()))?;
        let start = head.value_pos + len_width;
        let payload = self.value_slice(start, len)?;
        self.pos = start + len;
        Ok(payload)
    }

    pub fn get_string(&mut self, tag: Tag) -> Result<String, FormatError> {
        let raw = self.take_length_prefixed(tag, TYPE_UTF8_L1, "utf8 string")?;
        String::from_utf8(raw.to_vec()).map_err(|_| FormatError::InvalidUtf8)
    }

    pub fn get_bytes(&mut self, tag: Tag) -> Result<Vec<u8>, FormatError> {
        Ok(self
            .take_length_prefixed(tag, TYPE_OCTET_STRING_L1, "octet string")?
            .to_vec())
    }
}

/// Value with a tlv wire representation. Implemented for the primitive wire
/// types, [OctetString], and arrays of encodable values; generated cluster
/// structs implement it by hand.
pub trait TlvEncode {
    fn encode_tlv(&self, writer: &mut TlvWriter, tag: Tag) -> Result<(), FormatError>;
}

/// Decode side of [TlvEncode].
pub trait TlvDecode: Sized {
    fn decode_tlv(reader: &mut TlvReader<'_>, tag: Tag) -> Result<Self, FormatError>;
}

macro_rules! impl_tlv_primitive {
    ($t:ty, $put:ident, $get:ident) => {
        impl TlvEncode for $t {
            fn encode_tlv(&self, writer: &mut TlvWriter, tag: Tag) -> Result<(), FormatError> {
                writer.$put(tag, *self)
            }
        }
        impl TlvDecode for $t {
            fn decode_tlv(reader: &mut TlvReader<'_>, tag: Tag) -> Result<Self, FormatError> {
                reader.$get(tag)
            }
        }
    };
}

impl_tlv_primitive!(u8, put_u8, get_u8);
impl_tlv_primitive!(u16, put_u16, get_u16);
impl_tlv_primitive!(u32, put_u32, get_u32);
impl_tlv_primitive!(u64, put_u64, get_u64);
impl_tlv_primitive!(i8, put_i8, get_i8);
impl_tlv_primitive!(i16, put_i16, get_i16);
impl_tlv_primitive!(i32, put_i32, get_i32);
impl_tlv_primitive!(i64, put_i64, get_i64);
impl_tlv_primitive!(bool, put_bool, get_bool);
impl_tlv_primitive!(f32, put_f32, get_f32);
impl_tlv_primitive!(f64, put_f64, get_f64);

impl TlvEncode for String {
    fn encode_tlv(&self, writer: &mut TlvWriter, tag: Tag) -> Result<(), FormatError> {
        writer.put_string(tag, self)
    }
}

impl TlvDecode for String {
    fn decode_tlv(reader: &mut TlvReader<'_>, tag: Tag) -> Result<Self, FormatError> {
        reader.get_string(tag)
    }
}

/// Octet string wire type. A dedicated wrapper so that `Vec<u8>` keeps its
/// array-of-uint8 meaning in the generic impls below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetString(pub Vec<u8>);

impl TlvEncode for OctetString {
    fn encode_tlv(&self, writer: &mut TlvWriter, tag: Tag) -> Result<(), FormatError> {
        writer.put_bytes(tag, &self.0)
    }
}

impl TlvDecode for OctetString {
    fn decode_tlv(reader: &mut TlvReader<'_>, tag: Tag) -> Result<Self, FormatError> {
        Ok(OctetString(reader.get_bytes(tag)?))
    }
}

impl<T: TlvEncode> TlvEncode for Vec<T> {
    fn encode_tlv(&self, writer: &mut TlvWriter, tag: Tag) -> Result<(), FormatError> {
        writer.start_array(tag)?;
        for item in self {
            item.encode_tlv(writer, Tag::Anonymous)?;
        }
        writer.end_array()
    }
}

impl<T: TlvDecode> TlvDecode for Vec<T> {
    fn decode_tlv(reader: &mut TlvReader<'_>, tag: Tag) -> Result<Self, FormatError> {
        reader.enter_array(tag)?;
        let mut out = Vec::new();
        while !reader.is_end_of_container() {
            out.push(T::decode_tlv(reader, Tag::Anonymous)?);
        }
        reader.exit_container()?;
        Ok(out)
    }
}

/// Encode a single value under the anonymous tag, the framing used for
/// attribute payloads.
pub fn encode_anonymous<T: TlvEncode>(value: &T) -> Result<Vec<u8>, FormatError> {
    let mut writer = TlvWriter::new();
    value.encode_tlv(&mut writer, Tag::Anonymous)?;
    writer.into_encoded()
}

/// Decode a single anonymous-tagged value from an attribute payload.
pub fn decode_anonymous<T: TlvDecode>(data: &[u8]) -> Result<T, FormatError> {
    let mut reader = TlvReader::new(data);
    T::decode_tlv(&mut reader, Tag::Anonymous)
}

fn json_value(reader: &mut TlvReader<'_>) -> Result<serde_json::Value, FormatError> {
    use serde_json::Value;
    let head = reader.peek_head()?;
    let tag = head.tag;
    Ok(match head.element_type {
        TYPE_UINT_1..=TYPE_UINT_8 => Value::from(reader.take_unsigned(tag)?),
        TYPE_INT_1..=TYPE_INT_8 => Value::from(reader.take_signed(tag)?),
        TYPE_BOOL_FALSE | TYPE_BOOL_TRUE => Value::from(reader.get_bool(tag)?),
        TYPE_FLOAT_4 => Value::from(reader.get_f32(tag)? as f64),
        TYPE_FLOAT_8 => Value::from(reader.get_f64(tag)?),
        TYPE_UTF8_L1..=0x0f => Value::from(reader.get_string(tag)?),
        TYPE_OCTET_STRING_L1..=0x13 => Value::from(hex::encode(reader.get_bytes(tag)?)),
        TYPE_NULL => {
            reader.pos = head.value_pos;
            Value::Null
        }
        TYPE_STRUCT | TYPE_ARRAY | TYPE_LIST => {
            let kind = match head.element_type {
                TYPE_STRUCT => ContainerKind::Structure,
                TYPE_ARRAY => ContainerKind::Array,
                _ => ContainerKind::List,
            };
            reader.pos = head.value_pos;
            reader.open.push(kind);
            let mut children = Vec::new();
            while !reader.is_end_of_container() {
                children.push(json_entry(reader)?);
            }
            reader.exit_container()?;
            Value::Array(children)
        }
        other => return Err(FormatError::UnknownElementType(other)),
    })
}

fn json_entry(reader: &mut TlvReader<'_>) -> Result<serde_json::Value, FormatError> {
    let head = reader.peek_head()?;
    let tag = head.tag;
    let value = json_value(reader)?;
    Ok(match tag {
        Tag::Anonymous => value,
        Tag::Context(n) => serde_json::json!({ "tag": n, "value": value }),
    })
}

/// Decode a raw tlv payload into a json value for logging and diagnostics.
/// Octet strings render as hex strings, containers as arrays of tagged
/// entries.
pub fn decode_to_json(data: &[u8]) -> Result<serde_json::Value, FormatError> {
    let mut reader = TlvReader::new(data);
    let mut out = Vec::new();
    while !reader.is_end_of_container() {
        out.push(json_entry(&mut reader)?);
    }
    if out.len() == 1 {
        return Ok(out.swap_remove(0));
    }
    Ok(serde_json::Value::Array(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_roundtrip() {
        let mut w = TlvWriter::new();
        w.start_structure(Tag::Anonymous).unwrap();
        w.put_u8(Tag::Context(0), 0xab).unwrap();
        w.put_u16(Tag::Context(1), 0x1234).unwrap();
        w.put_u32(Tag::Context(2), 0xdead_beef).unwrap();
        w.put_u64(Tag::Context(3), u64::MAX).unwrap();
        w.put_i8(Tag::Context(4), -5).unwrap();
        w.put_i32(Tag::Context(5), -70_000).unwrap();
        w.put_bool(Tag::Context(6), true).unwrap();
        w.put_bool(Tag::Context(7), false).unwrap();
        w.put_f32(Tag::Context(8), 1.5).unwrap();
        w.put_f64(Tag::Context(9), -2.25).unwrap();
        w.put_string(Tag::Context(10), "matter").unwrap();
        w.put_bytes(Tag::Context(11), &[1, 2, 3]).unwrap();
        w.end_structure().unwrap();
        let data = w.into_encoded().unwrap();

        let mut r = TlvReader::new(&data);
        r.enter_structure(Tag::Anonymous).unwrap();
        assert_eq!(r.get_u8(Tag::Context(0)).unwrap(), 0xab);
        assert_eq!(r.get_u16(Tag::Context(1)).unwrap(), 0x1234);
        assert_eq!(r.get_u32(Tag::Context(2)).unwrap(), 0xdead_beef);
        assert_eq!(r.get_u64(Tag::Context(3)).unwrap(), u64::MAX);
        assert_eq!(r.get_i8(Tag::Context(4)).unwrap(), -5);
        assert_eq!(r.get_i32(Tag::Context(5)).unwrap(), -70_000);
        assert!(r.get_bool(Tag::Context(6)).unwrap());
        assert!(!r.get_bool(Tag::Context(7)).unwrap());
        assert_eq!(r.get_f32(Tag::Context(8)).unwrap(), 1.5);
        assert_eq!(r.get_f64(Tag::Context(9)).unwrap(), -2.25);
        assert_eq!(r.get_string(Tag::Context(10)).unwrap(), "matter");
        assert_eq!(r.get_bytes(Tag::Context(11)).unwrap(), vec![1, 2, 3]);
        r.exit_container().unwrap();
        assert!(r.is_end_of_container());
    }

    #[test]
    fn test_minimal_width_encoding() {
        // value 5 under a u32 putter still encodes as a one byte uint
        let mut w = TlvWriter::new();
        w.put_u32(Tag::Context(1), 5).unwrap();
        assert_eq!(hex::encode(w.into_encoded().unwrap()), "240105");

        let mut w = TlvWriter::new();
        w.put_u32(Tag::Anonymous, 0x10000).unwrap();
        assert_eq!(hex::encode(w.into_encoded().unwrap()), "0600000100");
    }

    #[test]
    fn test_width_tolerance() {
        // an 8 byte encoding of a small value decodes through get_u8
        let mut w = TlvWriter::new();
        w.write_control(Tag::Context(0), TYPE_UINT_8).unwrap();
        w.data.extend_from_slice(&3u64.to_le_bytes());
        let data = w.into_encoded().unwrap();
        let mut r = TlvReader::new(&data);
        assert_eq!(r.get_u8(Tag::Context(0)).unwrap(), 3);

        // an over-range value does not
        let mut w = TlvWriter::new();
        w.put_u16(Tag::Context(0), 300).unwrap();
        let data = w.into_encoded().unwrap();
        let mut r = TlvReader::new(&data);
        assert_eq!(
            r.get_u8(Tag::Context(0)).unwrap_err(),
            FormatError::IntegerOutOfRange
        );
    }

    #[test]
    fn test_tag_and_type_mismatch() {
        let mut w = TlvWriter::new();
        w.put_u8(Tag::Context(1), 7).unwrap();
        let data = w.into_encoded().unwrap();

        let mut r = TlvReader::new(&data);
        assert!(matches!(
            r.get_u8(Tag::Context(2)),
            Err(FormatError::TagMismatch { .. })
        ));
        let mut r = TlvReader::new(&data);
        assert!(matches!(
            r.get_string(Tag::Context(1)),
            Err(FormatError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_container_balance() {
        let mut w = TlvWriter::new();
        w.start_structure(Tag::Anonymous).unwrap();
        assert_eq!(w.end_array().unwrap_err(), FormatError::ContainerMismatch);
        assert_eq!(w.into_encoded().unwrap_err(), FormatError::UnclosedContainer);

        let mut w = TlvWriter::new();
        assert_eq!(w.end_structure().unwrap_err(), FormatError::NotInContainer);
    }

    #[test]
    fn test_nested_containers() {
        let mut w = TlvWriter::new();
        w.start_structure(Tag::Anonymous).unwrap();
        w.start_array(Tag::Context(0)).unwrap();
        w.start_structure(Tag::Anonymous).unwrap();
        w.put_string(Tag::Context(0), "a").unwrap();
        w.end_structure().unwrap();
        w.end_array().unwrap();
        w.start_list(Tag::Context(1)).unwrap();
        w.put_u8(Tag::Context(2), 9).unwrap();
        w.end_list().unwrap();
        w.end_structure().unwrap();
        let data = w.into_encoded().unwrap();

        let mut r = TlvReader::new(&data);
        r.enter_structure(Tag::Anonymous).unwrap();
        r.enter_array(Tag::Context(0)).unwrap();
        r.enter_structure(Tag::Anonymous).unwrap();
        assert_eq!(r.get_string(Tag::Context(0)).unwrap(), "a");
        r.exit_container().unwrap();
        r.exit_container().unwrap();
        r.enter_list(Tag::Context(1)).unwrap();
        assert_eq!(r.get_u8(Tag::Context(2)).unwrap(), 9);
        r.exit_container().unwrap();
        r.exit_container().unwrap();
    }

    #[test]
    fn test_exit_with_unread_children() {
        let mut w = TlvWriter::new();
        w.start_structure(Tag::Anonymous).unwrap();
        w.put_u8(Tag::Context(0), 1).unwrap();
        w.end_structure().unwrap();
        let data = w.into_encoded().unwrap();

        let mut r = TlvReader::new(&data);
        r.enter_structure(Tag::Anonymous).unwrap();
        assert_eq!(
            r.exit_container().unwrap_err(),
            FormatError::NotAtEndOfContainer
        );
    }

    #[test]
    fn test_tag_in_array_rejected() {
        let mut w = TlvWriter::new();
        w.start_array(Tag::Anonymous).unwrap();
        assert_eq!(
            w.put_u8(Tag::Context(0), 1).unwrap_err(),
            FormatError::TagInArray
        );
        w.put_u8(Tag::Anonymous, 1).unwrap();
        w.end_array().unwrap();
        w.into_encoded().unwrap();
    }

    #[test]
    fn test_optional_field_omission() {
        // optional ctx(1) omitted entirely; its tag must not appear
        let mut w = TlvWriter::new();
        w.start_structure(Tag::Anonymous).unwrap();
        w.put_u8(Tag::Context(0), 1).unwrap();
        w.put_u8(Tag::Context(2), 3).unwrap();
        w.end_structure().unwrap();
        let data = w.into_encoded().unwrap();

        let mut r = TlvReader::new(&data);
        r.enter_structure(Tag::Anonymous).unwrap();
        assert_eq!(r.get_u8(Tag::Context(0)).unwrap(), 1);
        assert!(!r.is_next_tag(Tag::Context(1)));
        assert!(r.is_next_tag(Tag::Context(2)));
        // the peek did not advance the cursor
        assert_eq!(r.get_u8(Tag::Context(2)).unwrap(), 3);
        r.exit_container().unwrap();
    }

    #[test]
    fn test_array_iteration() {
        let values: Vec<u32> = vec![10, 2000, 300_000];
        let data = encode_anonymous(&values).unwrap();

        let mut r = TlvReader::new(&data);
        r.enter_array(Tag::Anonymous).unwrap();
        let mut n = 0;
        let mut out = Vec::new();
        while !r.is_end_of_container() {
            out.push(r.get_u32(Tag::Anonymous).unwrap());
            n += 1;
        }
        r.exit_container().unwrap();
        assert_eq!(n, 3);
        assert_eq!(out, values);

        let decoded: Vec<u32> = decode_anonymous(&data).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_octet_string_wire_type() {
        let value = OctetString(vec![0xde, 0xad, 0xbe, 0xef]);
        let encoded = encode_anonymous(&value).unwrap();
        assert_eq!(hex::encode(&encoded), "1004deadbeef");
        let decoded: OctetString = decode_anonymous(&encoded).unwrap();
        assert_eq!(decoded, value);

        // Vec<u8> keeps its array-of-uint8 meaning next to it
        let array = encode_anonymous(&vec![0xdeu8, 0xad]).unwrap();
        assert_eq!(hex::encode(&array), "1604de04ad18");
    }

    #[test]
    fn test_raw_splice() {
        let mut inner = TlvWriter::new();
        inner.put_bytes(Tag::Context(1), &[1, 2]).unwrap();
        let pre_encoded = inner.into_encoded().unwrap();

        let mut w = TlvWriter::new();
        w.start_structure(Tag::Anonymous).unwrap();
        w.put_u8(Tag::Context(0), 9).unwrap();
        w.put_raw(&pre_encoded);
        w.end_structure().unwrap();
        let data = w.into_encoded().unwrap();

        let mut r = TlvReader::new(&data);
        r.enter_structure(Tag::Anonymous).unwrap();
        assert_eq!(r.get_u8(Tag::Context(0)).unwrap(), 9);
        assert_eq!(r.get_bytes(Tag::Context(1)).unwrap(), vec![1, 2]);
        r.exit_container().unwrap();
    }

    #[test]
    fn test_truncated_stream() {
        let mut w = TlvWriter::new();
        w.put_string(Tag::Context(0), "hello").unwrap();
        let mut data = w.into_encoded().unwrap();
        data.truncate(data.len() - 2);

        let mut r = TlvReader::new(&data);
        assert!(matches!(
            r.get_string(Tag::Context(0)),
            Err(FormatError::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_unknown_type_and_tag_control() {
        // element type 0x1f does not exist
        let mut r = TlvReader::new(&[0x1f]);
        assert_eq!(
            r.get_u8(Tag::Anonymous).unwrap_err(),
            FormatError::UnknownElementType(0x1f)
        );
        // common profile tag control (2) is not handled
        let mut r = TlvReader::new(&[0x44, 0, 0, 5]);
        assert_eq!(
            r.get_u8(Tag::Anonymous).unwrap_err(),
            FormatError::UnsupportedTagControl(2)
        );
    }

    #[test]
    fn test_decode_to_json() {
        let mut w = TlvWriter::new();
        w.start_structure(Tag::Anonymous).unwrap();
        w.put_u8(Tag::Context(0), 7).unwrap();
        w.put_string(Tag::Context(1), "x").unwrap();
        w.put_bytes(Tag::Context(2), &[0xab, 0xcd]).unwrap();
        w.end_structure().unwrap();
        let data = w.into_encoded().unwrap();

        let v = decode_to_json(&data).unwrap();
        assert_eq!(
            v,
            serde_json::json!([
                { "tag": 0, "value": 7 },
                { "tag": 1, "value": "x" },
                { "tag": 2, "value": "abcd" },
            ])
        );
    }
}
