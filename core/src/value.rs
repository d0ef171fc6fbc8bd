//! Value kinds and converted values.
//!
//! [`ValueKind`] selects the verifier applied to a token; [`Value`] is the
//! converted result stored in a [`Binding`](crate::Binding).

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use crate::choice::{Choice, Subcommand};

/// Byte size of pointer-like list elements (strings, paths, choice refs).
const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// The closed set of value kinds understood by the engine.
///
/// # Examples
///
/// ```
/// use argwright_core::ValueKind;
///
/// assert_eq!(ValueKind::default(), ValueKind::String);
/// assert_eq!(ValueKind::Int32.item_size(), Some(4));
/// assert_eq!(ValueKind::Custom.item_size(), None);
/// assert_eq!(ValueKind::TimeNanoseconds.name(), "time_ns");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int8,
    #[serde(rename = "uint8")]
    UInt8,
    Int32,
    #[serde(rename = "uint32")]
    UInt32,
    Int64,
    #[serde(rename = "uint64")]
    UInt64,
    Double,
    #[default]
    String,
    Path,
    File,
    Dir,
    /// Byte count with optional unit suffix.
    Size,
    /// Duration stored as whole seconds.
    #[serde(rename = "time_s")]
    TimeSeconds,
    /// Duration stored as whole nanoseconds.
    #[serde(rename = "time_ns")]
    TimeNanoseconds,
    Choice,
    Subcommand,
    Custom,
}

impl ValueKind {
    /// Element byte size a list of this kind must be configured with.
    ///
    /// `None` for [`ValueKind::Custom`] (any size is accepted) and for
    /// [`ValueKind::Subcommand`] (cannot be a list).
    pub fn item_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int32 | Self::UInt32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Size | Self::TimeSeconds | Self::TimeNanoseconds => {
                Some(8)
            }
            Self::Double => Some(std::mem::size_of::<f64>()),
            Self::String | Self::Path | Self::File | Self::Dir | Self::Choice => Some(POINTER_SIZE),
            Self::Subcommand | Self::Custom => None,
        }
    }

    /// Short name shown in usage output and schema documents.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Double => "double",
            Self::String => "string",
            Self::Path => "path",
            Self::File => "file",
            Self::Dir => "dir",
            Self::Size => "size",
            Self::TimeSeconds => "time_s",
            Self::TimeNanoseconds => "time_ns",
            Self::Choice => "choice",
            Self::Subcommand => "subcommand",
            Self::Custom => "custom",
        }
    }

    /// Returns `true` if `value` is a valid converted value for this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Custom, _) => true,
            (Self::Bool, Value::Bool(_))
            | (Self::Int8, Value::Int8(_))
            | (Self::UInt8, Value::UInt8(_))
            | (Self::Int32, Value::Int32(_))
            | (Self::UInt32, Value::UInt32(_))
            | (Self::Int64, Value::Int64(_))
            | (Self::Double, Value::Double(_))
            | (Self::Choice, Value::Choice(_))
            | (Self::Subcommand, Value::Subcommand(_)) => true,
            (Self::UInt64 | Self::Size | Self::TimeSeconds | Self::TimeNanoseconds, Value::UInt64(_)) => true,
            (Self::String | Self::Path | Self::File | Self::Dir, Value::Text(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A converted argument value.
///
/// Size and time kinds convert to [`Value::UInt64`]; string-like kinds to
/// [`Value::Text`]. Choice and subcommand values share the entry of their set
/// rather than copying it.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Text(Arc<str>),
    Choice(Arc<Choice>),
    Subcommand(Arc<Subcommand>),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wraps an arbitrary value produced by a custom verifier.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Self::Custom(Arc::new(value))
    }

    /// Borrows the text of a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Downcasts a [`Value::Custom`] payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Converts into `T` if the variant matches.
    pub fn get<T: FromValue>(&self) -> Option<T> {
        T::from_value(self)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int8(v) => f.debug_tuple("Int8").field(v).finish(),
            Self::UInt8(v) => f.debug_tuple("UInt8").field(v).finish(),
            Self::Int32(v) => f.debug_tuple("Int32").field(v).finish(),
            Self::UInt32(v) => f.debug_tuple("UInt32").field(v).finish(),
            Self::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            Self::UInt64(v) => f.debug_tuple("UInt64").field(v).finish(),
            Self::Double(v) => f.debug_tuple("Double").field(v).finish(),
            Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Self::Choice(c) => f.debug_tuple("Choice").field(&c.value).finish(),
            Self::Subcommand(s) => f.debug_tuple("Subcommand").field(&s.name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int8(a), Self::Int8(b)) => a == b,
            (Self::UInt8(a), Self::UInt8(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::UInt32(a), Self::UInt32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::UInt64(a), Self::UInt64(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Choice(a), Self::Choice(b)) => Arc::ptr_eq(a, b),
            (Self::Subcommand(a), Self::Subcommand(b)) => Arc::ptr_eq(a, b),
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int8(v) => serializer.serialize_i8(*v),
            Self::UInt8(v) => serializer.serialize_u8(*v),
            Self::Int32(v) => serializer.serialize_i32(*v),
            Self::UInt32(v) => serializer.serialize_u32(*v),
            Self::Int64(v) => serializer.serialize_i64(*v),
            Self::UInt64(v) => serializer.serialize_u64(*v),
            Self::Double(v) => serializer.serialize_f64(*v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Choice(c) => serializer.serialize_str(&c.value),
            Self::Subcommand(s) => serializer.serialize_str(&s.name),
            Self::Custom(_) => serializer.serialize_none(),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

/// Conversion from a bound [`Value`] back to a plain Rust type.
pub trait FromValue: Sized {
    /// Returns `None` if the variant does not match.
    fn from_value(value: &Value) -> Option<Self>;
}

value_from! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(Arc::from(v))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Self::Text(v)
    }
}

impl From<Arc<Choice>> for Value {
    fn from(v: Arc<Choice>) -> Self {
        Self::Choice(v)
    }
}

impl FromValue for Arc<str> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for PathBuf {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(PathBuf::from)
    }
}

impl FromValue for Arc<Choice> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Choice(c) => Some(Arc::clone(c)),
            _ => None,
        }
    }
}

impl FromValue for Arc<Subcommand> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Subcommand(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }
}
