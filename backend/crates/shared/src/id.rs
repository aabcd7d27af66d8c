//! Typed record identifiers
//!
//! Every persisted record is keyed by a positive 64-bit integer. `Id<T>`
//! keeps a listing id from being passed where an order id is expected.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::app_error::{AppError, AppResult};

/// Generic typed integer id
///
/// Usage:
/// ```
/// use kernel::id::Id;
/// pub struct ListingMarker;
/// type ListingId = Id<ListingMarker>;
///
/// let id = ListingId::new(42).unwrap();
/// assert_eq!(id.get(), 42);
/// assert!(ListingId::new(0).is_err());
/// ```
pub struct Id<T> {
    value: i64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Validate a caller-supplied identifier (must be positive)
    pub fn new(value: i64) -> AppResult<Self> {
        if value <= 0 {
            return Err(AppError::bad_request(format!("Invalid identifier: {value}")));
        }
        Ok(Self::from_db(value))
    }

    /// Wrap a value read back from storage
    pub const fn from_db(value: i64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub const fn get(&self) -> i64 {
        self.value
    }
}

// Manual impls: deriving would require `T: Clone`, `T: Eq`, ... on the marker.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> FromStr for Id<T> {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| AppError::bad_request(format!("Invalid identifier: {s}")))?;
        Self::new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.value)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::from_db)
    }
}

impl<T> From<Id<T>> for i64 {
    fn from(id: Id<T>) -> Self {
        id.value
    }
}
