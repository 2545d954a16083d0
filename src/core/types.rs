//! core::types
//!
//! Strong types for values that cross the worker boundary.
//!
//! # Types
//!
//! - [`ObjectId`] - Engine object identifier (raw SHA-1 or SHA-256 bytes)
//! - [`TaskId`] - Identifier of one asynchronous task within a runtime
//!
//! # Validation
//!
//! These types enforce validity at construction time. An `ObjectId` can only
//! hold 20 or 32 bytes, so a task carrying one never needs to re-check it on
//! the worker thread.
//!
//! # Examples
//!
//! ```
//! use gitteh::core::types::ObjectId;
//!
//! let oid = ObjectId::from_hex("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(oid.as_bytes().len(), 20);
//!
//! assert!(ObjectId::from_hex("not-a-sha").is_err());
//! assert!(ObjectId::from_bytes(&[0u8; 7]).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// Length of a SHA-1 object id in bytes.
pub const SHA1_LEN: usize = 20;

/// Length of a SHA-256 object id in bytes.
pub const SHA256_LEN: usize = 32;

/// A Git object identifier, stored as raw bytes.
///
/// Hex input is accepted in either case; output is always lowercase.
///
/// # Example
///
/// ```
/// use gitteh::core::types::ObjectId;
///
/// let oid = ObjectId::from_hex("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.to_hex(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
///
/// let zero = ObjectId::zero();
/// assert!(zero.is_zero());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId {
    bytes: [u8; SHA256_LEN],
    len: u8,
}

impl ObjectId {
    /// Create an object id from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` unless `bytes` is exactly 20 or 32
    /// bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != SHA1_LEN && bytes.len() != SHA256_LEN {
            return Err(TypeError::InvalidOid(format!(
                "expected {} or {} bytes, got {}",
                SHA1_LEN,
                SHA256_LEN,
                bytes.len()
            )));
        }
        let mut buf = [0u8; SHA256_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            bytes: buf,
            len: bytes.len() as u8,
        })
    }

    /// Create an object id from a hex string (40 or 64 characters).
    pub fn from_hex(hex: &str) -> Result<Self, TypeError> {
        if hex.len() != SHA1_LEN * 2 && hex.len() != SHA256_LEN * 2 {
            return Err(TypeError::InvalidOid(format!(
                "expected {} or {} hex characters, got {}",
                SHA1_LEN * 2,
                SHA256_LEN * 2,
                hex.len()
            )));
        }
        let bytes = hex::decode(hex)
            .map_err(|_| TypeError::InvalidOid("object id must be hexadecimal".into()))?;
        Self::from_bytes(&bytes)
    }

    /// The zero/null SHA-1 object id.
    pub fn zero() -> Self {
        Self {
            bytes: [0u8; SHA256_LEN],
            len: SHA1_LEN as u8,
        }
    }

    /// Check if this is the zero/null object id.
    pub fn is_zero(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }

    /// The raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Abbreviated hex form.
    ///
    /// Returns the first `len` hex characters, or the full id if `len`
    /// exceeds its length.
    pub fn short(&self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len);
        hex
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ObjectId> for String {
    fn from(oid: ObjectId) -> Self {
        oid.to_hex()
    }
}

impl std::str::FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

/// Anything a caller may name an object by.
///
/// Conversion happens during prepare, so a malformed id is rejected before
/// any work is scheduled.
pub trait IntoObjectId {
    fn into_object_id(self) -> Result<ObjectId, TypeError>;
}

impl IntoObjectId for ObjectId {
    fn into_object_id(self) -> Result<ObjectId, TypeError> {
        Ok(self)
    }
}

impl IntoObjectId for &ObjectId {
    fn into_object_id(self) -> Result<ObjectId, TypeError> {
        Ok(*self)
    }
}

impl IntoObjectId for &str {
    fn into_object_id(self) -> Result<ObjectId, TypeError> {
        ObjectId::from_hex(self)
    }
}

impl IntoObjectId for &String {
    fn into_object_id(self) -> Result<ObjectId, TypeError> {
        ObjectId::from_hex(self)
    }
}

impl IntoObjectId for &[u8] {
    fn into_object_id(self) -> Result<ObjectId, TypeError> {
        ObjectId::from_bytes(self)
    }
}

/// Identifier of an asynchronous task.
///
/// Ids are allocated in submission order by a single runtime and are never
/// reused within it. Completion order carries no relation to id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The numeric id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}
