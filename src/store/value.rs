//! Stored value representation

use serde::Serialize;

use crate::buff::Buff;
use crate::identity::Identity;

/// A value held by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean flag
    Bool(bool),
    /// Single byte
    Byte(u8),
    /// Signed 32-bit integer
    Int(i32),
    /// Unsigned 32-bit integer
    UInt(u32),
    /// Signed 64-bit integer
    Long(i64),
    /// Single-precision float
    Float(f32),
    /// Double-precision float
    Double(f64),
    /// Entity identity
    Identity(Identity),
    /// Status modifier
    Buff(Buff),
}

/// Conversion between Rust types and [`Value`].
///
/// `from_value` returns `None` on a variant mismatch; the store then treats
/// the read like an absent key.
pub trait StoreValue: Sized + Default {
    /// Wraps `self` in a [`Value`].
    fn into_value(self) -> Value;

    /// Unwraps a [`Value`] of the matching variant.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! store_value {
    ($ty:ty, $variant:ident) => {
        impl StoreValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

store_value!(bool, Bool);
store_value!(u8, Byte);
store_value!(i32, Int);
store_value!(u32, UInt);
store_value!(i64, Long);
store_value!(f32, Float);
store_value!(f64, Double);
store_value!(Identity, Identity);
store_value!(Buff, Buff);
