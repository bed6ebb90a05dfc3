//! Partially-populated, string-keyed property records.
//!
//! ModemManager only reports the values the hardware actually knows. A
//! [`PropertyBag`] keeps that distinction intact: a key is either absent
//! ("not reported") or present with exactly one concrete [`PropertyValue`].
//! Typed readers fail with [`ModemError::KeyNotFound`] for absent keys and
//! with [`ModemError::TypeMismatch`] for present keys of the wrong type.

use log::debug;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use zvariant::{OwnedObjectPath, Value};

use crate::Result;
use crate::api::models::ModemError;

/// The kind of value stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A boolean.
    Bool,
    /// A signed or unsigned integer.
    Int,
    /// A floating point number.
    Float,
    /// A string.
    Str,
    /// A reference to another remote object (a D-Bus object path).
    Path,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "string"),
            Self::Path => write!(f, "object path"),
        }
    }
}

/// A single dynamically-typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(String),
}

impl PropertyValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Path(_) => ValueKind::Path,
        }
    }

    /// Converts a D-Bus value into a property value.
    ///
    /// Containers (arrays, dicts, structs) and file descriptors have no
    /// property representation and yield `None`.
    pub(crate) fn from_dbus(value: &Value<'_>) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::U8(v) => Some(Self::Int(i64::from(*v))),
            Value::I16(v) => Some(Self::Int(i64::from(*v))),
            Value::U16(v) => Some(Self::Int(i64::from(*v))),
            Value::I32(v) => Some(Self::Int(i64::from(*v))),
            Value::U32(v) => Some(Self::Int(i64::from(*v))),
            Value::I64(v) => Some(Self::Int(*v)),
            Value::U64(v) => i64::try_from(*v).ok().map(Self::Int),
            Value::F64(v) => Some(Self::Float(*v)),
            Value::Str(s) => Some(Self::Str(s.as_str().to_owned())),
            Value::ObjectPath(p) => Some(Self::Path(p.as_str().to_owned())),
            Value::Value(inner) => Self::from_dbus(inner),
            _ => None,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) | Self::Path(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Types that can be read from and written into a [`PropertyBag`].
pub trait PropertyType: Sized {
    /// Human readable type name used in mismatch errors.
    const NAME: &'static str;

    /// Extracts `Self` from a value, or `None` if the value has another type.
    fn from_value(value: &PropertyValue) -> Option<Self>;

    /// Wraps `self` into a property value.
    fn into_value(self) -> PropertyValue;
}

impl PropertyType for bool {
    const NAME: &'static str = "bool";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Bool(self)
    }
}

impl PropertyType for f64 {
    const NAME: &'static str = "f64";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Float(self)
    }
}

impl PropertyType for String {
    const NAME: &'static str = "string";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Str(self)
    }
}

impl PropertyType for OwnedObjectPath {
    const NAME: &'static str = "object path";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Path(p) => OwnedObjectPath::try_from(p.as_str()).ok(),
            _ => None,
        }
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Path(self.as_str().to_owned())
    }
}

// Integers share one storage kind; a value that does not fit the requested
// width is a type mismatch, not a silent truncation.
macro_rules! integer_property {
    ($($ty:ty),*) => {
        $(
            impl PropertyType for $ty {
                const NAME: &'static str = stringify!($ty);

                fn from_value(value: &PropertyValue) -> Option<Self> {
                    match value {
                        PropertyValue::Int(v) => <$ty>::try_from(*v).ok(),
                        _ => None,
                    }
                }

                fn into_value(self) -> PropertyValue {
                    PropertyValue::Int(i64::from(self))
                }
            }

            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    PropertyValue::Int(i64::from(value))
                }
            }
        )*
    };
}

integer_property!(i64, i32, u32, u16, u8);

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_owned())
    }
}

/// A string-keyed mapping of optional, dynamically-typed values.
///
/// # Example
///
/// ```
/// use mmrs::{ModemError, PropertyBag};
///
/// let mut bag = PropertyBag::new();
/// bag.insert("rsrp", -95.0);
///
/// assert_eq!(bag.get::<f64>("rsrp").unwrap(), -95.0);
/// assert!(matches!(bag.get::<f64>("rsrq"), Err(ModemError::KeyNotFound(_))));
/// assert!(matches!(bag.get::<bool>("rsrp"), Err(ModemError::TypeMismatch { .. })));
/// assert_eq!(bag.get_or_default("rsrq", -10.0), -10.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    values: HashMap<String, PropertyValue>,
}

impl PropertyBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Reads a value of type `T`.
    ///
    /// # Errors
    ///
    /// Returns `ModemError::KeyNotFound` if the key is absent and
    /// `ModemError::TypeMismatch` if it holds a value of another type.
    pub fn get<T: PropertyType>(&self, key: &str) -> Result<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ModemError::KeyNotFound(key.to_string()))?;

        T::from_value(value).ok_or_else(|| ModemError::TypeMismatch {
            key: key.to_string(),
            expected: T::NAME,
            found: value.kind(),
        })
    }

    /// Reads a value of type `T`, treating an absent key as `None`.
    ///
    /// # Errors
    ///
    /// Returns `ModemError::TypeMismatch` if the key holds a value of another type.
    pub fn get_optional<T: PropertyType>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Ok(v) => Ok(Some(v)),
            Err(ModemError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reads a value of type `T`, falling back to `default` when the key is
    /// absent or holds another type.
    pub fn get_or_default<T: PropertyType>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Returns `true` if a value is present for `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the untyped value for `key`, if present.
    pub fn raw(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    /// Returns the keys of all present values, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of present values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies `key` from `source` as a `T` if it is present there.
    ///
    /// Returns whether a value was copied.
    ///
    /// # Errors
    ///
    /// Returns `ModemError::TypeMismatch` if the source value is not a `T`.
    pub fn maybe_insert_from<T: PropertyType>(
        &mut self,
        source: &PropertyBag,
        key: &str,
    ) -> Result<bool> {
        self.maybe_insert_from_as::<T>(source, key, key)
    }

    /// Copies `from_key` from `source` as a `T` under `as_key`, if present.
    ///
    /// Returns whether a value was copied.
    ///
    /// # Errors
    ///
    /// Returns `ModemError::TypeMismatch` if the source value is not a `T`.
    pub fn maybe_insert_from_as<T: PropertyType>(
        &mut self,
        source: &PropertyBag,
        from_key: &str,
        as_key: &str,
    ) -> Result<bool> {
        match source.get_optional::<T>(from_key)? {
            Some(value) => {
                self.values.insert(as_key.to_string(), value.into_value());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Builds a bag from D-Bus dictionary entries.
    ///
    /// Entries whose values have no property representation are skipped.
    pub(crate) fn from_dbus<'v, 'a: 'v, K, I>(entries: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, &'v Value<'a>)>,
    {
        let mut bag = Self::new();
        for (key, value) in entries {
            match PropertyValue::from_dbus(value) {
                Some(v) => {
                    bag.values.insert(key.as_ref().to_string(), v);
                }
                None => debug!(
                    "Skipping property '{}' with unsupported signature",
                    key.as_ref()
                ),
            }
        }
        bag
    }
}

/// Formats as `{key: value, ...}` with keys sorted.
impl Display for PropertyBag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, key) in self.keys().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {}", self.values[key])?;
        }
        write!(f, "}}")
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyBag
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PropertyBag {
        let mut bag = PropertyBag::new();
        bag.insert("serving", true);
        bag.insert("earfcn", 1300u32);
        bag.insert("rsrp", -101.5);
        bag.insert("ci", "1A2B");
        bag
    }

    #[test]
    fn get_returns_typed_value() {
        let bag = sample();
        assert!(bag.get::<bool>("serving").unwrap());
        assert_eq!(bag.get::<u32>("earfcn").unwrap(), 1300);
        assert_eq!(bag.get::<f64>("rsrp").unwrap(), -101.5);
        assert_eq!(bag.get::<String>("ci").unwrap(), "1A2B");
    }

    #[test]
    fn get_absent_key_is_key_not_found() {
        let bag = sample();
        match bag.get::<f64>("rsrq") {
            Err(ModemError::KeyNotFound(key)) => assert_eq!(key, "rsrq"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn get_wrong_type_is_type_mismatch() {
        let bag = sample();
        match bag.get::<String>("rsrp") {
            Err(ModemError::TypeMismatch {
                key,
                expected,
                found,
            }) => {
                assert_eq!(key, "rsrp");
                assert_eq!(expected, "string");
                assert_eq!(found, ValueKind::Float);
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn integer_out_of_range_is_type_mismatch() {
        let mut bag = PropertyBag::new();
        bag.insert("pci", 70_000u32);
        assert!(matches!(
            bag.get::<u16>("pci"),
            Err(ModemError::TypeMismatch { .. })
        ));
        assert_eq!(bag.get::<u32>("pci").unwrap(), 70_000);
    }

    #[test]
    fn get_or_default_covers_absent_and_mismatch() {
        let bag = sample();
        assert_eq!(bag.get_or_default("missing", 7u32), 7);
        assert_eq!(bag.get_or_default("rsrp", 7u32), 7);
        assert_eq!(bag.get_or_default("earfcn", 7u32), 1300);
    }

    #[test]
    fn get_optional_distinguishes_absent_from_mismatch() {
        let bag = sample();
        assert_eq!(bag.get_optional::<f64>("rsrq").unwrap(), None);
        assert!(bag.get_optional::<bool>("rsrp").is_err());
    }

    #[test]
    fn insert_overwrites() {
        let mut bag = sample();
        let previous = bag.insert("rsrp", -90.0);
        assert_eq!(previous, Some(PropertyValue::Float(-101.5)));
        assert_eq!(bag.get::<f64>("rsrp").unwrap(), -90.0);
        assert_eq!(bag.len(), 4);
    }

    #[test]
    fn maybe_insert_copies_only_present_keys() {
        let source = sample();
        let mut target = PropertyBag::new();

        assert!(target.maybe_insert_from::<f64>(&source, "rsrp").unwrap());
        assert!(!target.maybe_insert_from::<f64>(&source, "rsrq").unwrap());
        assert!(target.has_key("rsrp"));
        assert!(!target.has_key("rsrq"));
    }

    #[test]
    fn maybe_insert_as_renames() {
        let mut source = PropertyBag::new();
        source.insert("snr", 12.0);
        let mut target = PropertyBag::new();

        target
            .maybe_insert_from_as::<f64>(&source, "snr", "sinr")
            .unwrap();
        assert_eq!(target.keys(), vec!["sinr"]);
    }

    #[test]
    fn maybe_insert_rejects_wrong_type() {
        let source = sample();
        let mut target = PropertyBag::new();
        assert!(target.maybe_insert_from::<f64>(&source, "ci").is_err());
        assert!(target.is_empty());
    }

    #[test]
    fn from_dbus_converts_scalars_and_skips_containers() {
        let entries = vec![
            ("serving", Value::from(true)),
            ("earfcn", Value::from(1300u32)),
            ("rsrp", Value::from(-99.0f64)),
            ("ci", Value::from("00FF")),
            ("bands", Value::from(vec![1u32, 3, 20])),
        ];
        let bag = PropertyBag::from_dbus(entries.iter().map(|(k, v)| (*k, v)));

        assert_eq!(bag.keys(), vec!["ci", "earfcn", "rsrp", "serving"]);
        assert_eq!(bag.get::<u32>("earfcn").unwrap(), 1300);
        assert_eq!(bag.get::<String>("ci").unwrap(), "00FF");
    }

    #[test]
    fn from_dbus_unwraps_nested_variants() {
        let nested = Value::Value(Box::new(Value::from(42i32)));
        let bag = PropertyBag::from_dbus([("v", &nested)]);
        assert_eq!(bag.get::<i32>("v").unwrap(), 42);
    }

    #[test]
    fn object_paths_round_trip_as_paths() {
        let mut bag = PropertyBag::new();
        let path = OwnedObjectPath::try_from("/org/freedesktop/ModemManager1/SIM/0").unwrap();
        bag.insert("sim", path.clone().into_value());

        assert_eq!(bag.raw("sim").map(PropertyValue::kind), Some(ValueKind::Path));
        assert_eq!(bag.get::<OwnedObjectPath>("sim").unwrap(), path);
        assert!(bag.get::<String>("sim").is_err());
    }

    #[test]
    fn display_sorts_keys() {
        let mut bag = PropertyBag::new();
        bag.insert("rsrq", -11.0);
        bag.insert("mcc", "262");
        assert_eq!(bag.to_string(), "{mcc: \"262\", rsrq: -11}");
    }
}
