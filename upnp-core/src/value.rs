//! Typed values carried by action arguments and state variables
//!
//! UPnP declares a handful of scalar data types for state variables. The
//! dispatch core models the subset it needs as [`DataType`] and carries
//! concrete values as [`Value`]. Conversion to and from the UPnP text form
//! is provided so a transport can move values over the wire without
//! knowing their types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared data type of a state variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    I1,
    I2,
    I4,
    Ui1,
    Ui2,
    Ui4,
    String,
}

impl DataType {
    /// Map a UPnP `dataType` name onto a `DataType`
    ///
    /// `int` is accepted as an alias of `i4`.
    pub fn from_upnp(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Boolean),
            "i1" => Some(Self::I1),
            "i2" => Some(Self::I2),
            "i4" | "int" => Some(Self::I4),
            "ui1" => Some(Self::Ui1),
            "ui2" => Some(Self::Ui2),
            "ui4" => Some(Self::Ui4),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    /// The UPnP `dataType` name
    pub fn upnp_name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::I1 => "i1",
            Self::I2 => "i2",
            Self::I4 => "i4",
            Self::Ui1 => "ui1",
            Self::Ui2 => "ui2",
            Self::Ui4 => "ui4",
            Self::String => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.bounds().is_some()
    }

    /// Implicit inclusive bounds of integer types
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::I1 => Some((i8::MIN.into(), i8::MAX.into())),
            Self::I2 => Some((i16::MIN.into(), i16::MAX.into())),
            Self::I4 => Some((i32::MIN.into(), i32::MAX.into())),
            Self::Ui1 => Some((0, u8::MAX.into())),
            Self::Ui2 => Some((0, u16::MAX.into())),
            Self::Ui4 => Some((0, u32::MAX.into())),
            Self::Boolean | Self::String => None,
        }
    }

    /// The kind of [`Value`] this type holds, as used in error messages
    pub fn value_kind(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            _ => "integer",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.upnp_name())
    }
}

/// A typed argument or state-variable value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
}

impl Value {
    /// Parse a value from its UPnP text form
    ///
    /// Booleans accept `1/0`, `true/false` and `yes/no` (case-insensitive).
    /// Integers must fit the type's bounds.
    pub fn from_text(data_type: DataType, text: &str) -> Option<Self> {
        match data_type {
            DataType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(Self::Bool(true)),
                "0" | "false" | "no" => Some(Self::Bool(false)),
                _ => None,
            },
            DataType::String => Some(Self::String(text.to_string())),
            numeric => {
                let value = text.trim().parse::<i64>().ok()?;
                let (min, max) = numeric.bounds()?;
                (min..=max).contains(&value).then_some(Self::Int(value))
            }
        }
    }

    /// Render the value in UPnP text form
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Short name of the value's kind, matching [`DataType::value_kind`]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::String(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("1"),
            Self::Bool(false) => f.write_str("0"),
            Self::Int(value) => write!(f, "{}", value),
            Self::String(value) => f.write_str(value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

macro_rules! int_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

int_value_from!(i8, i16, i32, i64, u8, u16, u32);

/// Types that can be extracted from a [`Value`]
pub trait FromValue: Sized {
    /// Value kind expected by this type, used in type-mismatch errors
    const KIND: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const KIND: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    const KIND: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Value {
    const KIND: &'static str = "any";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

macro_rules! int_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                const KIND: &'static str = "integer";

                fn from_value(value: &Value) -> Option<Self> {
                    value.as_int().and_then(|v| <$ty>::try_from(v).ok())
                }
            }
        )*
    };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", true)]
    #[case("true", true)]
    #[case("Yes", true)]
    #[case("0", false)]
    #[case("FALSE", false)]
    #[case("no", false)]
    fn test_boolean_text_forms(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(
            Value::from_text(DataType::Boolean, text),
            Some(Value::Bool(expected))
        );
    }

    #[test]
    fn test_integer_text_respects_bounds() {
        assert_eq!(Value::from_text(DataType::Ui1, "255"), Some(Value::Int(255)));
        assert_eq!(Value::from_text(DataType::Ui1, "256"), None);
        assert_eq!(Value::from_text(DataType::Ui2, "-1"), None);
        assert_eq!(Value::from_text(DataType::I1, "-128"), Some(Value::Int(-128)));
        assert_eq!(Value::from_text(DataType::I4, "abc"), None);
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(DataType::from_upnp("int"), Some(DataType::I4));
        assert_eq!(DataType::from_upnp("ui4"), Some(DataType::Ui4));
        assert_eq!(DataType::from_upnp("float"), None);
        assert_eq!(DataType::Ui2.to_string(), "ui2");
        assert!(DataType::Ui2.is_numeric());
        assert!(!DataType::Boolean.is_numeric());
    }

    #[test]
    fn test_display_uses_upnp_text_form() {
        assert_eq!(Value::Bool(true).to_text(), "1");
        assert_eq!(Value::Bool(false).to_text(), "0");
        assert_eq!(Value::from(42u16).to_text(), "42");
        assert_eq!(Value::from("Master").to_text(), "Master");
    }

    #[test]
    fn test_typed_extraction() {
        assert_eq!(bool::from_value(&Value::Bool(true)), Some(true));
        assert_eq!(u8::from_value(&Value::Int(300)), None);
        assert_eq!(u32::from_value(&Value::Int(300)), Some(300));
        assert_eq!(String::from_value(&Value::Int(1)), None);
        assert_eq!(i32::from_value(&Value::from("1")), None);
    }
}
