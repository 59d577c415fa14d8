//! NaN-boxed 64-bit value representation
//!
//! Every runtime value fits in one 64-bit slot: either a raw IEEE 754 double,
//! or a quiet-NaN bit pattern carrying a 3-bit tag and a 48-bit payload.
//!
//! # Encoding
//!
//! ```text
//! [ marker:13 ][ tag:3 ][ payload:48 ]
//!
//! marker = 0x0FFF (sign 0, exponent all ones, quiet bit set). Any word whose
//! top 13 bits differ — including negative NaNs — is an ordinary float.
//!
//!   - ObjectLo: word address in the low canonical half   [tag=000]
//!   - ObjectHi: word address in the high canonical half  [tag=001]
//!   - Class:    class id                                 [tag=010]
//!   - Buffer:   buffer length header                     [tag=011]
//!   - Vector:   vector length header                     [tag=100]
//!   - Literal:  null=0, false=1, true=2, NaN=3           [tag=101]
//! ```
//!
//! Object references split over two sub-tags so a full 64-bit canonical
//! address survives the 48-bit payload: `ObjectLo` zero-extends on decode,
//! `ObjectHi` fills the top 16 bits back in.

/// Quiet-NaN marker occupying the top 13 bits.
const MARKER: u64 = 0x0FFF;
const MARKER_SHIFT: u32 = 51;
const MARKER_BITS: u64 = MARKER << MARKER_SHIFT; // 0x7FF8_0000_0000_0000

const TAG_SHIFT: u32 = 48;
const TAG_MASK: u64 = 0x7 << TAG_SHIFT;
const PAYLOAD_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Addresses at or above this boundary use the `ObjectHi` sub-tag.
const CANONICAL_BOUNDARY: u64 = 1 << 48;

/// High-half decode fills the truncated top bits back in.
const HIGH_EXTENSION: u64 = 0xFFFF << 48;

/// Literal payloads.
const LIT_NULL: u64 = 0;
const LIT_FALSE: u64 = 1;
const LIT_TRUE: u64 = 2;
const LIT_NAN: u64 = 3;

/// Tag of an encoded (non-float) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// Object reference, low canonical half
    ObjectLo = 0,
    /// Object reference, high canonical half
    ObjectHi = 1,
    /// Class reference (payload is the class id)
    Class = 2,
    /// Buffer length header
    Buffer = 3,
    /// Vector length header
    Vector = 4,
    /// Small literal (null, false, true, NaN)
    Literal = 5,
}

impl Tag {
    const fn from_bits(bits: u64) -> Option<Tag> {
        match bits {
            0 => Some(Tag::ObjectLo),
            1 => Some(Tag::ObjectHi),
            2 => Some(Tag::Class),
            3 => Some(Tag::Buffer),
            4 => Some(Tag::Vector),
            5 => Some(Tag::Literal),
            _ => None,
        }
    }
}

/// A 64-bit runtime value: a raw double or a tagged quiet-NaN word.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Value(u64);

impl Value {
    /// The null literal
    pub const NULL: Value = Value::tagged(Tag::Literal, LIT_NULL);

    /// The false literal
    pub const FALSE: Value = Value::tagged(Tag::Literal, LIT_FALSE);

    /// The true literal
    pub const TRUE: Value = Value::tagged(Tag::Literal, LIT_TRUE);

    /// The canonical NaN literal
    pub const NAN: Value = Value::tagged(Tag::Literal, LIT_NAN);

    // ========================================================================
    // Constructors
    // ========================================================================

    /// Pack a tag and payload into a quiet-NaN word. Payload is masked to
    /// 48 bits.
    #[inline]
    pub const fn tagged(tag: Tag, payload: u64) -> Self {
        Self(MARKER_BITS | ((tag as u64) << TAG_SHIFT) | (payload & PAYLOAD_MASK))
    }

    /// Create a number value. NaN inputs are canonicalized to the NaN
    /// literal so an arithmetic NaN can never alias a tagged word.
    #[inline]
    pub fn number(f: f64) -> Self {
        if f.is_nan() {
            Value::NAN
        } else {
            Self(f.to_bits())
        }
    }

    /// Create a boolean literal
    #[inline]
    pub const fn boolean(b: bool) -> Self {
        if b {
            Value::TRUE
        } else {
            Value::FALSE
        }
    }

    /// Create an object reference. The sub-tag is selected by which
    /// canonical half the address falls in, so decode is lossless.
    #[inline]
    pub const fn object(addr: u64) -> Self {
        if addr >= CANONICAL_BOUNDARY {
            Value::tagged(Tag::ObjectHi, addr)
        } else {
            Value::tagged(Tag::ObjectLo, addr)
        }
    }

    /// Create a class reference carrying a class id
    #[inline]
    pub const fn class_ref(id: u32) -> Self {
        Value::tagged(Tag::Class, id as u64)
    }

    /// Create a vector length header (element count)
    #[inline]
    pub const fn vector_header(len: u64) -> Self {
        Value::tagged(Tag::Vector, len)
    }

    /// Create a buffer length header (packed element count, 8 per slot)
    #[inline]
    pub const fn buffer_header(len: u64) -> Self {
        Value::tagged(Tag::Buffer, len)
    }

    /// Reinterpret raw bits as a value
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bit pattern
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// True if this word is a tagged encoding rather than an ordinary float
    #[inline]
    pub const fn is_encoded(self) -> bool {
        (self.0 >> MARKER_SHIFT) == MARKER
    }

    /// Tag of an encoded value, `None` for ordinary floats
    #[inline]
    pub const fn tag(self) -> Option<Tag> {
        if self.is_encoded() {
            Tag::from_bits((self.0 & TAG_MASK) >> TAG_SHIFT)
        } else {
            None
        }
    }

    /// 48-bit payload of an encoded value, `None` for ordinary floats
    #[inline]
    pub const fn payload(self) -> Option<u64> {
        if self.is_encoded() {
            Some(self.0 & PAYLOAD_MASK)
        } else {
            None
        }
    }

    #[inline]
    const fn has_tag(self, tag: Tag) -> bool {
        self.is_encoded() && ((self.0 & TAG_MASK) >> TAG_SHIFT) == tag as u64
    }

    /// True for either object-reference sub-tag
    #[inline]
    pub const fn is_object(self) -> bool {
        self.has_tag(Tag::ObjectLo) || self.has_tag(Tag::ObjectHi)
    }

    /// True for a class reference
    #[inline]
    pub const fn is_class_ref(self) -> bool {
        self.has_tag(Tag::Class)
    }

    /// True for a vector length header
    #[inline]
    pub const fn is_vector_header(self) -> bool {
        self.has_tag(Tag::Vector)
    }

    /// True for a buffer length header
    #[inline]
    pub const fn is_buffer_header(self) -> bool {
        self.has_tag(Tag::Buffer)
    }

    /// True for the null literal
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == Value::NULL.0
    }

    /// True for either boolean literal
    #[inline]
    pub const fn is_boolean(self) -> bool {
        self.0 == Value::TRUE.0 || self.0 == Value::FALSE.0
    }

    /// True for an ordinary float or the NaN literal
    #[inline]
    pub const fn is_number(self) -> bool {
        !self.is_encoded() || self.0 == Value::NAN.0
    }

    /// Extract the float, treating the NaN literal as NaN
    #[inline]
    pub fn as_number(self) -> Option<f64> {
        if !self.is_encoded() {
            Some(f64::from_bits(self.0))
        } else if self.0 == Value::NAN.0 {
            Some(f64::NAN)
        } else {
            None
        }
    }

    /// Extract a boolean literal
    #[inline]
    pub const fn as_boolean(self) -> Option<bool> {
        if self.0 == Value::TRUE.0 {
            Some(true)
        } else if self.0 == Value::FALSE.0 {
            Some(false)
        } else {
            None
        }
    }

    /// Reconstruct the full address of an object reference, extending the
    /// missing high bits per sub-tag
    #[inline]
    pub const fn object_addr(self) -> Option<u64> {
        if self.has_tag(Tag::ObjectLo) {
            Some(self.0 & PAYLOAD_MASK)
        } else if self.has_tag(Tag::ObjectHi) {
            Some((self.0 & PAYLOAD_MASK) | HIGH_EXTENSION)
        } else {
            None
        }
    }

    /// Extract the class id from a class reference
    #[inline]
    pub const fn class_id(self) -> Option<u32> {
        if self.has_tag(Tag::Class) {
            Some((self.0 & PAYLOAD_MASK) as u32)
        } else {
            None
        }
    }

    // ========================================================================
    // Equality
    // ========================================================================

    /// Semantic equality: bitwise float comparison first (`-0.0 == 0.0`
    /// holds, NaN patterns fall through), then identical tag and payload.
    #[inline]
    pub fn equals(self, other: Value) -> bool {
        if f64::from_bits(self.0) == f64::from_bits(other.0) {
            return true;
        }
        // Everything left lives in NaN space, where tag + payload is the
        // sole identity key — and that collapses to the raw bit pattern.
        self.0 == other.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::NULL
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_encoded() {
            return write!(f, "Value::Number({})", f64::from_bits(self.0));
        }
        match self.tag() {
            Some(Tag::ObjectLo) | Some(Tag::ObjectHi) => {
                write!(f, "Value::Object({:#x})", self.object_addr().unwrap_or(0))
            }
            Some(Tag::Class) => write!(f, "Value::Class({})", self.0 & PAYLOAD_MASK),
            Some(Tag::Buffer) => write!(f, "Value::BufferHeader({})", self.0 & PAYLOAD_MASK),
            Some(Tag::Vector) => write!(f, "Value::VectorHeader({})", self.0 & PAYLOAD_MASK),
            Some(Tag::Literal) => match self.0 & PAYLOAD_MASK {
                LIT_NULL => write!(f, "Value::Null"),
                LIT_FALSE => write!(f, "Value::False"),
                LIT_TRUE => write!(f, "Value::True"),
                LIT_NAN => write!(f, "Value::NaN"),
                other => write!(f, "Value::Literal({})", other),
            },
            None => write!(f, "Value::Unknown({:#x})", self.0),
        }
    }
}
