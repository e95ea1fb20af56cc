//! The JSON-RPC 2.0 `id` member, modeled as a four-state value.
//!
//! JSON-RPC identifiers are awkward to represent faithfully: the wire format
//! allows a string, a number, an explicit `null`, or the field's outright
//! absence (a notification), and a naive `Option<serde_json::Value>` loses
//! the distinction that matters most in practice — large integer ids must
//! round-trip byte-for-byte, not through an `f64` that would silently lose
//! precision past 2^53. [`Id`] keeps the original decimal text for numbers
//! and never re-parses it on the way back out.
//!
//! # Examples
//!
//! ```
//! use jsonrpc_runtime::id::Id;
//!
//! let id = Id::from(42i64);
//! assert_eq!(serde_json::to_string(&id).unwrap(), "42");
//!
//! let notification = Id::default();
//! assert!(notification.is_absent());
//! ```

use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A JSON-RPC request/response identifier.
///
/// Four logically distinct states, matching the wire protocol exactly:
///
/// * [`Id::Num`] — a number, stored as its original decimal text so that an
///   echoed id is byte-identical to the one received.
/// * [`Id::Str`] — a string.
/// * [`Id::Null`] — the field was present on the wire with value `null`.
/// * [`Id::Absent`] — the field was omitted entirely (a notification).
///
/// `Id` is a plain value: cheap to clone, cheap to compare, and safe to share
/// across threads without synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Id {
    /// A number, preserved as the decimal text it was built or decoded from.
    Num(String),
    /// A string identifier.
    Str(String),
    /// Explicit `null` on the wire.
    Null,
    /// The `id` member was omitted (notification).
    Absent,
}

impl Default for Id {
    /// The default id is absent, i.e. a notification.
    fn default() -> Self {
        Id::Absent
    }
}

impl Id {
    /// True iff this id was omitted from the wire entirely.
    pub fn is_absent(&self) -> bool {
        matches!(self, Id::Absent)
    }

    /// True iff this id is present (string, number, or explicit null).
    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    /// An explicit-null id, as used when the decoder synthesizes a response
    /// for a request whose own id could not be determined.
    pub fn null() -> Self {
        Id::Null
    }

    /// The decimal lexeme of a numeric id, or `None` for non-numeric states.
    pub fn as_number_text(&self) -> Option<&str> {
        match self {
            Id::Num(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// The string value of a string id, or `None` for non-string states.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Id::Str(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Parses a numeric id as `i64`. Fails for non-numeric states or ids
    /// whose lexeme doesn't fit.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number_text()?.parse().ok()
    }

    /// Parses a numeric id as `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_number_text()?.parse().ok()
    }

    /// Parses a numeric id as `i32`.
    pub fn as_i32(&self) -> Option<i32> {
        self.as_number_text()?.parse().ok()
    }

    /// Parses a numeric id as `u32`.
    pub fn as_u32(&self) -> Option<u32> {
        self.as_number_text()?.parse().ok()
    }

    /// Parses a numeric id as `f32`.
    pub fn as_f32(&self) -> Option<f32> {
        self.as_number_text()?.parse().ok()
    }

    /// Parses a numeric id as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_number_text()?.parse().ok()
    }

    /// Structural equality against a native value.
    ///
    /// Succeeds iff `self` is the matching state (number vs. the integer
    /// family, string vs. `&str`/`String`, null/absent vs. `None`) *and* the
    /// parses/values match. A numeric id never equals a string, even if
    /// their text happens to coincide.
    pub fn equals<T: IdEquatable>(&self, other: T) -> bool {
        other.equals_id(self)
    }
}

/// Types that can be compared against an [`Id`] via [`Id::equals`].
///
/// Implemented for the integer family, floats, string-likes, and `Option`
/// (where `None` matches explicit-null or absent).
pub trait IdEquatable {
    /// Returns true iff `id` structurally equals `self`.
    fn equals_id(&self, id: &Id) -> bool;
}

macro_rules! impl_id_equatable_int {
    ($($t:ty),+) => {
        $(
            impl IdEquatable for $t {
                fn equals_id(&self, id: &Id) -> bool {
                    match id.as_number_text().and_then(|t| t.parse::<$t>().ok()) {
                        Some(v) => v == *self,
                        None => false,
                    }
                }
            }
        )+
    };
}

impl_id_equatable_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128);

impl IdEquatable for f32 {
    fn equals_id(&self, id: &Id) -> bool {
        match id.as_f32() {
            Some(v) => v == *self,
            None => false,
        }
    }
}

impl IdEquatable for f64 {
    fn equals_id(&self, id: &Id) -> bool {
        match id.as_f64() {
            Some(v) => v == *self,
            None => false,
        }
    }
}

impl IdEquatable for &str {
    fn equals_id(&self, id: &Id) -> bool {
        id.as_str() == Some(*self)
    }
}

impl IdEquatable for String {
    fn equals_id(&self, id: &Id) -> bool {
        id.as_str() == Some(self.as_str())
    }
}

impl<T: IdEquatable> IdEquatable for Option<T> {
    fn equals_id(&self, id: &Id) -> bool {
        match self {
            Some(v) => v.equals_id(id),
            None => matches!(id, Id::Null | Id::Absent),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Id {
                fn from(value: $t) -> Self {
                    Id::Num(value.to_string())
                }
            }
        )+
    };
}

impl_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize);

impl From<f32> for Id {
    /// Normalizes the float to its shortest round-trippable decimal form.
    fn from(value: f32) -> Self {
        Id::Num(ryu_shortest_f32(value))
    }
}

impl From<f64> for Id {
    /// Normalizes the float to its shortest round-trippable decimal form.
    fn from(value: f64) -> Self {
        Id::Num(ryu_shortest_f64(value))
    }
}

// Rust's default float Display already produces the shortest round-trippable
// decimal text (unlike Go's strconv without 'g'), so no external crate is
// needed here; named for clarity at the call site above.
fn ryu_shortest_f32(value: f32) -> String {
    format!("{value}")
}

fn ryu_shortest_f64(value: f64) -> String {
    format!("{value}")
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::Str(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Str(value.to_string())
    }
}

impl<T: Into<Id>> From<Option<T>> for Id {
    /// `None` maps to explicit-null, matching the construction rule that nil
    /// input means "present id, null value" rather than "absent".
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Id::Null,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(text) => f.write_str(text),
            Id::Str(text) => f.write_str(text),
            Id::Null | Id::Absent => f.write_str("null"),
        }
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Id::Num(text) => {
                // Routed through RawValue so the stored lexeme is emitted
                // verbatim — never re-parsed — and a well-formed incoming
                // number echoes back byte-identical.
                let raw = serde_json::value::RawValue::from_string(text.clone())
                    .map_err(serde::ser::Error::custom)?;
                raw.serialize(serializer)
            }
            Id::Str(text) => serializer.serialize_str(text),
            Id::Null | Id::Absent => serializer.serialize_unit(),
        }
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON-RPC id: a string, a number, or null")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Id::Null)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Id::Str(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Id::Str(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Id::Num(v.to_string()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Id::Num(v.to_string()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Id::Num(v.to_string()))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        // serde_json's arbitrary-precision number representation arrives
        // here as a single-key map; preserve the lexeme untouched.
        let value: Option<(String, String)> = map.next_entry()?;
        match value {
            Some((key, text)) if key == "$serde_json::private::Number" => Ok(Id::Num(text)),
            _ => Err(serde::de::Error::custom("invalid id representation")),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_absent() {
        assert_eq!(Id::default(), Id::Absent);
        assert!(Id::default().is_absent());
    }

    #[test]
    fn numeric_round_trip_preserves_large_integer_text() {
        let id: Id = serde_json::from_str("9007199254740993").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "9007199254740993");
    }

    #[test]
    fn string_round_trip() {
        let id: Id = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert!(id.equals("abc"));
        assert!(!id.equals("abd"));
    }

    #[test]
    fn explicit_null_round_trip() {
        let id: Id = serde_json::from_str("null").unwrap();
        assert_eq!(id, Id::Null);
        assert_eq!(serde_json::to_string(&id).unwrap(), "null");
    }

    #[test]
    fn equals_type_matching_semantics() {
        let id = Id::from(7i64);
        assert!(id.equals(7i32));
        assert!(id.equals(7u64));
        assert!(!id.equals("7"));
        assert!(!Id::from("7").equals(7i32));
    }

    #[test]
    fn option_equals_null_or_absent() {
        assert!(Id::Null.equals(None::<i32>));
        assert!(Id::Absent.equals(None::<i32>));
        assert!(!Id::from(1i32).equals(None::<i32>));
    }
}
