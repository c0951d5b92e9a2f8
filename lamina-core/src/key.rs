//! Composite cache keys
//!
//! A [`CacheKey`] is an order- and count-sensitive fingerprint built
//! incrementally from a sequence of contributions. Callers must feed the
//! contributions in a stable order (statement id, offset/limit, then each
//! bound parameter) so that equal lookups produce equal keys.
//!
//! # Example
//!
//! ```rust,ignore
//! use lamina_core::key::CacheKey;
//!
//! let mut key = CacheKey::new();
//! key.update("users.by_id");
//! key.update(0i64);
//! key.update(42i64);
//! let lookup = key.clone(); // frozen copy for use as a map key
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

const DEFAULT_MULTIPLIER: i64 = 37;
const DEFAULT_HASHCODE: i64 = 17;

/// A single contribution to a [`CacheKey`]
///
/// Floats compare and hash by bit pattern so that `KeyPart` can be `Eq`.
/// Lists compare element by element.
#[derive(Debug, Clone)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<KeyPart>),
}

impl KeyPart {
    /// Deterministic per-process hash of this contribution; `Null` hashes to 1
    pub fn scalar_hash(&self) -> i64 {
        match self {
            KeyPart::Null => 1,
            other => {
                let mut hasher = DefaultHasher::new();
                other.hash(&mut hasher);
                hasher.finish() as i64
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, KeyPart::Null)
    }
}

impl PartialEq for KeyPart {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyPart::Null, KeyPart::Null) => true,
            (KeyPart::Bool(a), KeyPart::Bool(b)) => a == b,
            (KeyPart::Int(a), KeyPart::Int(b)) => a == b,
            (KeyPart::UInt(a), KeyPart::UInt(b)) => a == b,
            (KeyPart::Float(a), KeyPart::Float(b)) => a.to_bits() == b.to_bits(),
            (KeyPart::Str(a), KeyPart::Str(b)) => a == b,
            (KeyPart::Bytes(a), KeyPart::Bytes(b)) => a == b,
            (KeyPart::List(a), KeyPart::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for KeyPart {}

impl Hash for KeyPart {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            KeyPart::Null => {}
            KeyPart::Bool(b) => b.hash(state),
            KeyPart::Int(i) => i.hash(state),
            KeyPart::UInt(u) => u.hash(state),
            KeyPart::Float(f) => f.to_bits().hash(state),
            KeyPart::Str(s) => s.hash(state),
            KeyPart::Bytes(b) => b.hash(state),
            KeyPart::List(items) => items.hash(state),
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Null => write!(f, "null"),
            KeyPart::Bool(b) => write!(f, "{}", b),
            KeyPart::Int(i) => write!(f, "{}", i),
            KeyPart::UInt(u) => write!(f, "{}", u),
            KeyPart::Float(x) => write!(f, "{}", x),
            KeyPart::Str(s) => write!(f, "{}", s),
            KeyPart::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            KeyPart::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! key_part_from {
    ($($ty:ty => $variant:ident as $cast:ty),* $(,)?) => {
        $(
            impl From<$ty> for KeyPart {
                fn from(value: $ty) -> Self {
                    KeyPart::$variant(value as $cast)
                }
            }
        )*
    };
}

key_part_from! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    isize => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    usize => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<&String> for KeyPart {
    fn from(value: &String) -> Self {
        KeyPart::Str(value.clone())
    }
}

impl From<Vec<u8>> for KeyPart {
    fn from(value: Vec<u8>) -> Self {
        KeyPart::Bytes(value)
    }
}

impl From<&[u8]> for KeyPart {
    fn from(value: &[u8]) -> Self {
        KeyPart::Bytes(value.to_vec())
    }
}

impl From<Vec<KeyPart>> for KeyPart {
    fn from(value: Vec<KeyPart>) -> Self {
        KeyPart::List(value)
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(KeyPart::Null)
    }
}

/// Composite cache key
///
/// Two keys are equal iff they saw the same number of contributions, their
/// accumulators agree, and every positional contribution is equal. `Clone`
/// copies the accumulator and deep-copies the contribution list.
#[derive(Debug, Clone)]
pub struct CacheKey {
    multiplier: i64,
    hashcode: i64,
    checksum: i64,
    count: usize,
    parts: Vec<KeyPart>,
}

impl CacheKey {
    pub fn new() -> Self {
        Self {
            multiplier: DEFAULT_MULTIPLIER,
            hashcode: DEFAULT_HASHCODE,
            checksum: 0,
            count: 0,
            parts: Vec::new(),
        }
    }

    /// Build a key from a sequence of contributions, in order
    pub fn from_parts<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        let mut key = Self::new();
        key.update_all(parts);
        key
    }

    /// Fold one contribution into the key
    pub fn update(&mut self, part: impl Into<KeyPart>) {
        let part = part.into();
        let mut base = part.scalar_hash();

        self.count += 1;
        self.checksum = self.checksum.wrapping_add(base);
        base = base.wrapping_mul(self.count as i64);

        self.hashcode = self.hashcode.wrapping_mul(self.multiplier).wrapping_add(base);
        self.parts.push(part);
    }

    pub fn update_all<I, P>(&mut self, parts: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        for part in parts {
            self.update(part);
        }
    }

    /// Number of contributions folded so far
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    pub fn hashcode(&self) -> i64 {
        self.hashcode
    }

    pub fn checksum(&self) -> i64 {
        self.checksum
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.hashcode == other.hashcode
            && self.checksum == other.checksum
            && self.count == other.count
            && self.parts == other.parts
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hashcode.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hashcode, self.checksum)?;
        for part in &self.parts {
            write!(f, ":{}", part)?;
        }
        Ok(())
    }
}
