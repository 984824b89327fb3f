/// This module provides `PathParams`, the parameter bindings extracted while matching
/// a request path against a route pattern.
///
/// Bindings keep the order in which their placeholders appear in the pattern, so a
/// handler can consume them positionally as well as by name. They are also stored in
/// the request extensions before the middleware pipeline runs.
use std::str::FromStr;

use serde::{
    de::{
        self, DeserializeOwned, Deserializer, IntoDeserializer, Unexpected, Visitor,
        value::{Error as ValueError, MapDeserializer},
    },
    forward_to_deserialize_any,
};
use smallvec::SmallVec;

use crate::types::Request;

/// Ordered `name -> raw segment` bindings for one dispatched request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathParams(SmallVec<[(String, String); 4]>);

impl PathParams {
    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }

    /// Returns the raw value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parses the value bound to `name`, returning `None` if it is missing or malformed.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserializes the bindings into a typed structure.
    ///
    /// Values stay strings unless the target field asks for a number or a bool, so a
    /// `u64` field accepts `"42"` and a `String` field accepts `"2024"` as text.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct UserPath {
    ///     id: u64,
    /// }
    ///
    /// # fn run(params: perch::params::PathParams) -> anyhow::Result<()> {
    /// let path: UserPath = params.deserialize()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        let pairs = self.0.iter().map(|(k, v)| (k.as_str(), ParamValue(v.as_str())));
        T::deserialize(MapDeserializer::new(pairs))
    }

    /// Reads the bindings a dispatcher stored on the request.
    pub fn from_request(req: &Request) -> Option<&PathParams> {
        req.extensions().get::<PathParams>()
    }
}

/// One raw segment, parsed only when the target type asks for a scalar.
struct ParamValue<'a>(&'a str);

macro_rules! parse_scalar {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0.parse::<$ty>() {
                Ok(v) => visitor.$visit(v),
                Err(_) => Err(de::Error::invalid_value(Unexpected::Str(self.0), &visitor)),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for ParamValue<'_> {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_str(self.0)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    parse_scalar! {
        deserialize_bool => visit_bool(bool),
        deserialize_u8 => visit_u64(u64),
        deserialize_u16 => visit_u64(u64),
        deserialize_u32 => visit_u64(u64),
        deserialize_u64 => visit_u64(u64),
        deserialize_i8 => visit_i64(i64),
        deserialize_i16 => visit_i64(i64),
        deserialize_i32 => visit_i64(i64),
        deserialize_i64 => visit_i64(i64),
        deserialize_f32 => visit_f64(f64),
        deserialize_f64 => visit_f64(f64),
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, ValueError> for ParamValue<'_> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'a> IntoIterator for &'a PathParams {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize, Debug, PartialEq)]
    struct PostPath {
        id: u32,
        slug: String,
    }

    fn params() -> PathParams {
        let mut p = PathParams::default();
        p.push("id", "42");
        p.push("slug", "hello-world");
        p
    }

    #[test]
    fn lookup_keeps_pattern_order() {
        let p = params();
        assert_eq!(p.get("slug"), Some("hello-world"));
        assert_eq!(p.parse::<u32>("id"), Some(42));
        assert_eq!(p.parse::<u32>("slug"), None);
        assert_eq!(p.iter().map(|(k, _)| k).collect::<Vec<_>>(), ["id", "slug"]);
    }

    #[test]
    fn deserializes_with_numeric_coercion() {
        let typed: PostPath = params().deserialize().unwrap();
        assert_eq!(
            typed,
            PostPath {
                id: 42,
                slug: "hello-world".into()
            }
        );
    }

    #[test]
    fn numeric_segments_stay_text_for_string_fields() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct ArchivePath {
            slug: String,
            page: Option<u16>,
        }

        let mut p = PathParams::default();
        p.push("slug", "2024");
        p.push("page", "3");

        let typed: ArchivePath = p.deserialize().unwrap();
        assert_eq!(
            typed,
            ArchivePath {
                slug: "2024".into(),
                page: Some(3)
            }
        );
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut p = PathParams::default();
        p.push("id", "abc");
        p.push("slug", "x");
        assert!(p.deserialize::<PostPath>().is_err());
    }
}
