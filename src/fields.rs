//! Typed fixed-width bit fields.
//!
//! A [`BitField`] is a logical sequence of bits backed by a `BitVec<u8, Msb0>`
//! so the MSB-first byte view and the bit view can never disagree. Every
//! field carries an ordered list of subfield descriptors, which is what lets
//! a concatenated message payload be queried back by field name.

use bitvec::prelude::*;
use snafu::Snafu;

use crate::constants::FT8_GRAY_CODE;

/// Bit storage shared by the codecs: MSB of byte 0 is bit 0.
pub type Bits = BitVec<u8, Msb0>;

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[snafu(display("value {value} does not fit in {bits} bits"))]
    Overflow { value: u64, bits: usize },

    #[snafu(display("bit vector length {got} does not match field width {bits}"))]
    LengthMismatch { got: usize, bits: usize },

    #[snafu(display("subfield tags cover {covered} bits of a {bits}-bit field"))]
    TagMismatch { covered: usize, bits: usize },
}

/// The six FT8 message layouts. The numeric value is the i3 message type
/// (type 0 distinguishes sub-types through n3, which does not change the
/// field layout used here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    FreeText = 0,
    Std = 1,
    StdEu = 2,
    Contest = 3,
    HashCall = 4,
    StdAlt = 5,
}

/// Field layout of every message type except the non-standard-call type.
const SCHEMA_STD: &[(&str, usize)] = &[
    ("c28", 28),
    ("r1", 1),
    ("c28", 28),
    ("r1", 1),
    ("R1", 1),
    ("g15", 15),
    ("i3", 3),
    ("cs14", 14),
    ("ldpc83", 83),
];

/// Field layout of type 4 (hashed non-standard callsign exchange).
const SCHEMA_HASH_CALL: &[(&str, usize)] =
    &[("h12", 12), ("c58", 58), ("h1", 1), ("r2", 2), ("c1", 1)];

impl MessageType {
    /// Ordered `(tag, width)` table for this message type.
    pub fn schema(self) -> &'static [(&'static str, usize)] {
        match self {
            MessageType::HashCall => SCHEMA_HASH_CALL,
            _ => SCHEMA_STD,
        }
    }
}

/// Descriptor of one named region inside a [`BitField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub tag: &'static str,
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitField {
    bits: Bits,
    subfields: Vec<Subfield>,
}

impl BitField {
    /// An all-zero field of the given width with no subfield descriptors.
    pub fn zeroed(bits: usize) -> Self {
        BitField {
            bits: BitVec::repeat(false, bits),
            subfields: Vec::new(),
        }
    }

    /// Build a field from the low `bits` bits of `data`, MSB first.
    pub fn from_value(bits: usize, data: u64) -> Result<Self, FieldError> {
        if bits < 64 && data >= 1u64 << bits {
            return Err(FieldError::Overflow { value: data, bits });
        }
        let mut v: Bits = BitVec::with_capacity(bits);
        for i in (0..bits).rev() {
            v.push((data >> i) & 1 != 0);
        }
        Ok(BitField {
            bits: v,
            subfields: Vec::new(),
        })
    }

    /// Same as [`BitField::from_value`] but records a single subfield
    /// descriptor spanning the whole field.
    pub fn tagged(bits: usize, data: u64, tag: &'static str) -> Result<Self, FieldError> {
        let mut field = Self::from_value(bits, data)?;
        field.subfields.push(Subfield {
            tag,
            offset: 0,
            len: bits,
        });
        Ok(field)
    }

    /// Build a field from an explicit bit vector.
    pub fn from_bits(bits: usize, data: Bits) -> Result<Self, FieldError> {
        if data.len() != bits {
            return Err(FieldError::LengthMismatch {
                got: data.len(),
                bits,
            });
        }
        Ok(BitField {
            bits: data,
            subfields: Vec::new(),
        })
    }

    /// Build a field from a bit vector and an ordered list of subfield tags;
    /// the tag widths must tile the field exactly.
    pub fn from_bits_tagged(
        bits: usize,
        data: Bits,
        tags: &[(&'static str, usize)],
    ) -> Result<Self, FieldError> {
        let covered: usize = tags.iter().map(|(_, len)| len).sum();
        if covered != bits {
            return Err(FieldError::TagMismatch { covered, bits });
        }
        let mut field = Self::from_bits(bits, data)?;
        let mut offset = 0;
        for &(tag, len) in tags {
            field.subfields.push(Subfield { tag, offset, len });
            offset += len;
        }
        Ok(field)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of bytes in the byte view (`ceil(bits / 8)`).
    pub fn byte_len(&self) -> usize {
        (self.bits.len() + 7) / 8
    }

    pub fn as_bits(&self) -> &BitSlice<u8, Msb0> {
        &self.bits
    }

    /// MSB-first packed bytes; the low bits of the last byte are zero when
    /// the width is not a multiple of eight.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    pub fn subfields(&self) -> &[Subfield] {
        &self.subfields
    }

    /// The field interpreted as an unsigned integer, MSB first. Only valid
    /// for widths up to 64 bits.
    pub fn value(&self) -> u64 {
        self.bits.iter().fold(0u64, |acc, b| (acc << 1) | *b as u64)
    }

    /// Concatenate, appending `rhs` on the right. Subfield descriptors of
    /// `rhs` are carried over with their offsets shifted by `self.len()`.
    pub fn concat(&self, rhs: &BitField) -> BitField {
        let mut bits = self.bits.clone();
        bits.extend_from_bitslice(&rhs.bits);
        let mut subfields = self.subfields.clone();
        for sf in &rhs.subfields {
            subfields.push(Subfield {
                tag: sf.tag,
                offset: sf.offset + self.bits.len(),
                len: sf.len,
            });
        }
        BitField { bits, subfields }
    }

    /// The `instance`-th subfield with the given tag as a standalone field
    /// (with one descriptor covering it).
    pub fn select(&self, tag: &str, instance: usize) -> Option<BitField> {
        let sf = self
            .subfields
            .iter()
            .filter(|sf| sf.tag == tag)
            .nth(instance)?;
        let bits: Bits = self.bits[sf.offset..sf.offset + sf.len].to_bitvec();
        Some(BitField {
            bits,
            subfields: vec![Subfield {
                tag: sf.tag,
                offset: 0,
                len: sf.len,
            }],
        })
    }

    /// Address a named field through a message-type schema rather than the
    /// field's own descriptors. Returns an empty vector when the schema has
    /// no such field or the payload is too short.
    pub fn overlay(&self, message_type: MessageType, tag: &str, instance: usize) -> Bits {
        let mut remaining = instance;
        let mut offset = 0;
        for &(schema_tag, len) in message_type.schema() {
            if schema_tag == tag {
                if remaining == 0 {
                    if offset + len <= self.bits.len() {
                        return self.bits[offset..offset + len].to_bitvec();
                    }
                    return Bits::new();
                }
                remaining -= 1;
            }
            offset += len;
        }
        Bits::new()
    }

    /// Map a 3-bit value through the FT8 Gray code.
    pub fn to_gray(n: u8) -> u8 {
        FT8_GRAY_CODE[(n & 7) as usize]
    }
}
