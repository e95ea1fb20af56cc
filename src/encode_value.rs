//! The value encoder shared by [`crate::request::Request`] and
//! [`crate::response::Response`].
//!
//! Integers, floats, and booleans get a fast numeric or literal append
//! straight onto the buffer; everything else goes through the [`Json`]
//! wrapper, which opts an arbitrary `Serialize` type into the generic
//! `serde_json` fallback path.

use crate::bufferpool::{self, Buffer};

/// Failure to encode a value into the wire representation used by a
/// request's `params` or a response's `result`.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The generic `serde_json` fallback path failed.
    #[error("failed to encode value as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A value that knows how to append its JSON representation onto a
/// [`Buffer`] without going through `serde_json`'s generic (de)serializer
/// machinery.
///
/// Implemented directly for integer, float, and boolean scalars (the fast
/// path); anything else should be wrapped in [`Json`].
pub trait EncodeValue {
    /// Appends this value's JSON text onto `buf`.
    fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError>;
}

macro_rules! impl_encode_int {
    ($($t:ty),+) => {
        $(
            impl EncodeValue for $t {
                fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError> {
                    buf.append_i64(*self as i64);
                    Ok(())
                }
            }
        )+
    };
}

macro_rules! impl_encode_uint {
    ($($t:ty),+) => {
        $(
            impl EncodeValue for $t {
                fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError> {
                    buf.append_u64(*self as u64);
                    Ok(())
                }
            }
        )+
    };
}

impl_encode_int!(i8, i16, i32, i64);
impl_encode_uint!(u8, u16, u32, u64);

impl EncodeValue for f32 {
    fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError> {
        buf.append_f64(*self as f64);
        Ok(())
    }
}

impl EncodeValue for f64 {
    fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError> {
        buf.append_f64(*self);
        Ok(())
    }
}

impl EncodeValue for bool {
    fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError> {
        buf.append_bool(*self);
        Ok(())
    }
}

/// Opts an arbitrary `Serialize` value into the generic fallback path.
///
/// Strings go through here too: correct quoting/escaping dominates the cost
/// for strings, so a hand-rolled fast path buys nothing over just calling
/// into `serde_json`.
pub struct Json<T>(pub T);

impl<T: serde::Serialize> EncodeValue for Json<T> {
    fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError> {
        serde_json::to_writer(&mut *buf, &self.0)?;
        Ok(())
    }
}

impl EncodeValue for serde_json::Value {
    fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError> {
        serde_json::to_writer(&mut *buf, self)?;
        Ok(())
    }
}

impl EncodeValue for Box<serde_json::value::RawValue> {
    fn encode_value(&self, buf: &mut Buffer) -> Result<(), EncodeError> {
        buf.append_str(self.get());
        Ok(())
    }
}

/// Encodes `value` into a standalone `RawValue`, for callers that need an
/// owned, pre-encoded JSON fragment (e.g. to stash as `Response::result`).
pub fn encode<T: EncodeValue>(value: &T) -> Result<Box<serde_json::value::RawValue>, EncodeError> {
    let mut buf = bufferpool::get();
    value.encode_value(&mut buf)?;
    let text = String::from_utf8(buf.as_bytes().to_vec())
        .map_err(|e| EncodeError::Json(serde_json::Error::io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        ))))?;
    buf.release();
    serde_json::value::RawValue::from_string(text).map_err(EncodeError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_ints() {
        assert_eq!(encode(&42i32).unwrap().get(), "42");
        assert_eq!(encode(&(-7i64)).unwrap().get(), "-7");
        assert_eq!(encode(&9u64).unwrap().get(), "9");
    }

    #[test]
    fn fast_path_bool_and_float() {
        assert_eq!(encode(&true).unwrap().get(), "true");
        assert_eq!(encode(&1.5f64).unwrap().get(), "1.5");
    }

    #[test]
    fn generic_path_for_strings_and_structs() {
        assert_eq!(encode(&Json("hi")).unwrap().get(), "\"hi\"");
        let v = serde_json::json!({"a": 1});
        assert_eq!(encode(&v).unwrap().get(), r#"{"a":1}"#);
    }
}
