//! # Binary tag format (NBT)
//!
//! A closed, recursively nestable tree of typed values. Every tag kind has a
//! one-byte id and a fixed payload layout:
//!
//! ```text
//! id  kind        payload
//!  0  End         (none)
//!  1  Byte        i8
//!  2  Short       i16 BE
//!  3  Int         i32 BE
//!  4  Long        i64 BE
//!  5  Float       f32 BE (IEEE-754)
//!  6  Double      f64 BE (IEEE-754)
//!  7  ByteArray   i32 count, count x i8
//!  8  String      u16 byte length, modified UTF-8
//!  9  List        u8 element id, i32 count, count x payload
//! 10  Compound    named tags..., End
//! 11  IntArray    i32 count, count x i32
//! 12  LongArray   i32 count, count x i64
//! ```
//!
//! A named tag is written as `{id}{u16 name length}{name}{payload}`. List
//! elements are payload-only; the element id is written once in the list
//! header.
//!
//! # Invariants
//!
//! Checked when a tree is built, so encoding never re-validates:
//! - End never appears inside a List or Compound
//! - All List elements share one kind; an empty List has element kind End
//! - A Compound holds each name once (last write wins)

use crate::mutf8;
use bytes::{Buf, BufMut};
use mcping_core::{Result, StatusError};
use std::collections::BTreeMap;

/// Deepest List/Compound nesting accepted by the decoder
pub const MAX_DEPTH: usize = 512;

/// Tag kind identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagKind {
    pub fn from_u8(id: u8) -> Option<Self> {
        match id {
            0 => Some(TagKind::End),
            1 => Some(TagKind::Byte),
            2 => Some(TagKind::Short),
            3 => Some(TagKind::Int),
            4 => Some(TagKind::Long),
            5 => Some(TagKind::Float),
            6 => Some(TagKind::Double),
            7 => Some(TagKind::ByteArray),
            8 => Some(TagKind::String),
            9 => Some(TagKind::List),
            10 => Some(TagKind::Compound),
            11 => Some(TagKind::IntArray),
            12 => Some(TagKind::LongArray),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Smallest possible payload, used to sanity-check untrusted counts
    fn min_payload_len(self) -> usize {
        match self {
            TagKind::End => 0,
            TagKind::Byte | TagKind::Compound => 1,
            TagKind::Short | TagKind::String => 2,
            TagKind::Int | TagKind::Float => 4,
            TagKind::ByteArray | TagKind::IntArray | TagKind::LongArray => 4,
            TagKind::List => 5,
            TagKind::Long | TagKind::Double => 8,
        }
    }
}

/// A tag value
///
/// Names live in the containing [`Compound`] (or [`NamedTag`] at the root),
/// since list elements have none on the wire.
///
/// Floats compare by bit pattern, so `NaN == NaN` and `0.0 != -0.0`: two
/// tags are equal exactly when they encode to the same bytes.
#[derive(Debug, Clone)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(TagList),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::End => TagKind::End,
            Tag::Byte(_) => TagKind::Byte,
            Tag::Short(_) => TagKind::Short,
            Tag::Int(_) => TagKind::Int,
            Tag::Long(_) => TagKind::Long,
            Tag::Float(_) => TagKind::Float,
            Tag::Double(_) => TagKind::Double,
            Tag::ByteArray(_) => TagKind::ByteArray,
            Tag::String(_) => TagKind::String,
            Tag::List(_) => TagKind::List,
            Tag::Compound(_) => TagKind::Compound,
            Tag::IntArray(_) => TagKind::IntArray,
            Tag::LongArray(_) => TagKind::LongArray,
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Tag::End, Tag::End) => true,
            (Tag::Byte(a), Tag::Byte(b)) => a == b,
            (Tag::Short(a), Tag::Short(b)) => a == b,
            (Tag::Int(a), Tag::Int(b)) => a == b,
            (Tag::Long(a), Tag::Long(b)) => a == b,
            (Tag::Float(a), Tag::Float(b)) => a.to_bits() == b.to_bits(),
            (Tag::Double(a), Tag::Double(b)) => a.to_bits() == b.to_bits(),
            (Tag::ByteArray(a), Tag::ByteArray(b)) => a == b,
            (Tag::String(a), Tag::String(b)) => a == b,
            (Tag::List(a), Tag::List(b)) => a == b,
            (Tag::Compound(a), Tag::Compound(b)) => a == b,
            (Tag::IntArray(a), Tag::IntArray(b)) => a == b,
            (Tag::LongArray(a), Tag::LongArray(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Tag {}

impl From<TagList> for Tag {
    fn from(list: TagList) -> Self {
        Tag::List(list)
    }
}

impl From<Compound> for Tag {
    fn from(compound: Compound) -> Self {
        Tag::Compound(compound)
    }
}

/// Homogeneous list of tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList {
    element_kind: TagKind,
    items: Vec<Tag>,
}

impl TagList {
    /// Build a list, rejecting End elements and mixed kinds
    pub fn new(items: Vec<Tag>) -> Result<Self> {
        let element_kind = match items.first() {
            Some(first) => first.kind(),
            None => return Ok(Self::empty()),
        };

        if element_kind == TagKind::End {
            return Err(StatusError::Validation("List may not contain End tags".into()));
        }

        if let Some((index, odd)) = items.iter().enumerate().find(|(_, t)| t.kind() != element_kind) {
            return Err(StatusError::Validation(format!(
                "List of {:?} has a {:?} element at index {}",
                element_kind,
                odd.kind(),
                index
            )));
        }

        Ok(Self { element_kind, items })
    }

    pub fn empty() -> Self {
        Self {
            element_kind: TagKind::End,
            items: Vec::new(),
        }
    }

    pub fn element_kind(&self) -> TagKind {
        self.element_kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }
}

/// Name-to-tag mapping
///
/// Entries are kept sorted by name, so encoding is deterministic and
/// equality ignores insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    entries: BTreeMap<String, Tag>,
}

impl Compound {
    /// Build a compound from `(name, tag)` pairs
    ///
    /// A repeated name keeps its last tag. End tags are rejected.
    pub fn new<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Tag)>,
        K: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, tag) in entries {
            let name = name.into();
            if tag.kind() == TagKind::End {
                return Err(StatusError::Validation(format!(
                    "Compound entry '{}' may not be an End tag",
                    name
                )));
            }
            map.insert(name, tag);
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Root tag together with its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTag {
    pub name: String,
    pub tag: Tag,
}

impl NamedTag {
    pub fn new(name: impl Into<String>, tag: Tag) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }

    /// Encode to a fresh byte vector
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_named_tag(&mut out, &self.name, &self.tag)?;
        Ok(out)
    }

    /// Decode one named tag from the front of `bytes`
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        read_named_tag(&mut bytes)
    }
}

/// Write `{id}{name}{payload}`, or a single `0` for an End tag
pub fn write_named_tag(buf: &mut impl BufMut, name: &str, tag: &Tag) -> Result<()> {
    buf.put_u8(tag.kind().as_u8());
    if let Tag::End = tag {
        return Ok(());
    }
    write_tag_string(buf, name)?;
    write_payload(buf, tag)
}

/// Read a named tag; a leading `0` yields an unnamed End
pub fn read_named_tag(buf: &mut impl Buf) -> Result<NamedTag> {
    read_named_at_depth(buf, 0)
}

fn read_named_at_depth(buf: &mut impl Buf, depth: usize) -> Result<NamedTag> {
    let kind = read_kind(buf)?;
    if kind == TagKind::End {
        return Ok(NamedTag::new(String::new(), Tag::End));
    }
    let name = read_tag_string(buf)?;
    let tag = read_payload(buf, kind, depth)?;
    Ok(NamedTag { name, tag })
}

fn write_tag_string(buf: &mut impl BufMut, s: &str) -> Result<()> {
    let len = mutf8::encoded_len(s);
    if len > u16::MAX as usize {
        return Err(StatusError::format(format!(
            "Tag string of {} bytes exceeds 65535",
            len
        )));
    }
    buf.put_u16(len as u16);
    buf.put_slice(&mutf8::encode(s));
    Ok(())
}

fn read_tag_string(buf: &mut impl Buf) -> Result<String> {
    need(buf, 2, "string length")?;
    let len = buf.get_u16() as usize;
    need(buf, len, "string bytes")?;
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    mutf8::decode(&bytes)
}

fn write_count(buf: &mut impl BufMut, count: usize) -> Result<()> {
    let count = i32::try_from(count)
        .map_err(|_| StatusError::format(format!("Collection of {} elements is too large", count)))?;
    buf.put_i32(count);
    Ok(())
}

fn write_payload(buf: &mut impl BufMut, tag: &Tag) -> Result<()> {
    match tag {
        Tag::End => {}
        Tag::Byte(v) => buf.put_i8(*v),
        Tag::Short(v) => buf.put_i16(*v),
        Tag::Int(v) => buf.put_i32(*v),
        Tag::Long(v) => buf.put_i64(*v),
        Tag::Float(v) => buf.put_f32(*v),
        Tag::Double(v) => buf.put_f64(*v),
        Tag::ByteArray(values) => {
            write_count(buf, values.len())?;
            values.iter().for_each(|v| buf.put_i8(*v));
        }
        Tag::String(s) => write_tag_string(buf, s)?,
        Tag::List(list) => {
            buf.put_u8(list.element_kind().as_u8());
            write_count(buf, list.len())?;
            for item in list.iter() {
                write_payload(buf, item)?;
            }
        }
        Tag::Compound(compound) => {
            for (name, child) in compound.iter() {
                write_named_tag(buf, name, child)?;
            }
            buf.put_u8(TagKind::End.as_u8());
        }
        Tag::IntArray(values) => {
            write_count(buf, values.len())?;
            values.iter().for_each(|v| buf.put_i32(*v));
        }
        Tag::LongArray(values) => {
            write_count(buf, values.len())?;
            values.iter().for_each(|v| buf.put_i64(*v));
        }
    }
    Ok(())
}

fn need(buf: &impl Buf, len: usize, what: &str) -> Result<()> {
    if buf.remaining() < len {
        return Err(StatusError::format(format!(
            "Not enough bytes for {}: need {}, have {}",
            what,
            len,
            buf.remaining()
        )));
    }
    Ok(())
}

fn read_kind(buf: &mut impl Buf) -> Result<TagKind> {
    need(buf, 1, "tag id")?;
    let id = buf.get_u8();
    TagKind::from_u8(id).ok_or_else(|| StatusError::format(format!("Unknown tag id: {}", id)))
}

/// Read an element count and check the input could hold that many elements
fn read_count(buf: &mut impl Buf, element: TagKind) -> Result<usize> {
    need(buf, 4, "element count")?;
    let count = buf.get_i32();
    if count < 0 {
        return Err(StatusError::format(format!("Negative element count: {}", count)));
    }
    let count = count as usize;
    let min_len = count.saturating_mul(element.min_payload_len());
    need(buf, min_len, "elements")?;
    Ok(count)
}

fn read_payload(buf: &mut impl Buf, kind: TagKind, depth: usize) -> Result<Tag> {
    let tag = match kind {
        TagKind::End => Tag::End,
        TagKind::Byte => {
            need(buf, 1, "Byte")?;
            Tag::Byte(buf.get_i8())
        }
        TagKind::Short => {
            need(buf, 2, "Short")?;
            Tag::Short(buf.get_i16())
        }
        TagKind::Int => {
            need(buf, 4, "Int")?;
            Tag::Int(buf.get_i32())
        }
        TagKind::Long => {
            need(buf, 8, "Long")?;
            Tag::Long(buf.get_i64())
        }
        TagKind::Float => {
            need(buf, 4, "Float")?;
            Tag::Float(buf.get_f32())
        }
        TagKind::Double => {
            need(buf, 8, "Double")?;
            Tag::Double(buf.get_f64())
        }
        TagKind::ByteArray => {
            let count = read_count(buf, TagKind::Byte)?;
            Tag::ByteArray((0..count).map(|_| buf.get_i8()).collect())
        }
        TagKind::String => Tag::String(read_tag_string(buf)?),
        TagKind::IntArray => {
            let count = read_count(buf, TagKind::Int)?;
            Tag::IntArray((0..count).map(|_| buf.get_i32()).collect())
        }
        TagKind::LongArray => {
            let count = read_count(buf, TagKind::Long)?;
            Tag::LongArray((0..count).map(|_| buf.get_i64()).collect())
        }
        TagKind::List => {
            let depth = enter(depth)?;
            let element = read_kind(buf)?;
            let count = read_count(buf, element)?;

            if element == TagKind::End {
                if count > 0 {
                    return Err(StatusError::format(format!(
                        "List of End tags with {} elements",
                        count
                    )));
                }
                return Ok(Tag::List(TagList::empty()));
            }
            if count == 0 {
                // Canonical empty list, whatever element id was declared
                return Ok(Tag::List(TagList::empty()));
            }

            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_payload(buf, element, depth)?);
            }
            Tag::List(TagList {
                element_kind: element,
                items,
            })
        }
        TagKind::Compound => {
            let depth = enter(depth)?;
            let mut entries = BTreeMap::new();
            loop {
                let child = read_named_at_depth(buf, depth)?;
                if let Tag::End = child.tag {
                    break;
                }
                entries.insert(child.name, child.tag);
            }
            Tag::Compound(Compound { entries })
        }
    };
    Ok(tag)
}

fn enter(depth: usize) -> Result<usize> {
    if depth >= MAX_DEPTH {
        return Err(StatusError::format(format!(
            "Tag nesting deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(depth + 1)
}
