//! Typed record decoding
//!
//! Upstream APIs add, drop and rename keys between releases. A [`Record`] is a
//! schema with a fixed set of declared fields, each with a default, plus an
//! open `extra` map that carries every undeclared key through untouched.
//! Missing keys never fail a decode; only a value whose shape cannot fit its
//! declared type does, and that failure is scoped to the one item.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::error;

use crate::errors::DecodeError;

/// A schema-backed record decoded from one JSON object
pub trait Record: DeserializeOwned {
    /// Schema name used in error messages
    const NAME: &'static str;

    /// Declared JSON field names, in declaration order
    const FIELDS: &'static [&'static str];

    /// Undeclared keys carried through from the payload
    fn extra(&self) -> &Map<String, Value>;

    /// Look up an undeclared key by name
    fn attribute(&self, key: &str) -> Option<&Value> {
        self.extra().get(key)
    }
}

/// Declares a [`Record`] schema.
///
/// Each field is written as `"jsonName" => rust_name: Type`. The generated
/// struct derives serde with `#[serde(default)]`, so every field falls back to
/// its type's `Default` whether the key is missing or `null`, and gains an
/// `extra` map for undeclared keys. A field may instead name its own
/// deserializer with a leading `#[serde(deserialize_with = "...")]`, which
/// then owns the handling of `null`.
macro_rules! record {
    (@fields $metas:tt $vis:tt $name:ident [$($fields:tt)*] [$($json_names:literal)*]
        #[serde(deserialize_with = $with:literal)]
        $json:literal => $field:ident : $ty:ty
        $(, $($rest:tt)*)?
    ) => {
        record!(@fields $metas $vis $name
            [$($fields)* #[serde(rename = $json, deserialize_with = $with)] pub $field: $ty,]
            [$($json_names)* $json]
            $($($rest)*)?);
    };
    (@fields $metas:tt $vis:tt $name:ident [$($fields:tt)*] [$($json_names:literal)*]
        $json:literal => $field:ident : $ty:ty
        $(, $($rest:tt)*)?
    ) => {
        record!(@fields $metas $vis $name
            [$($fields)*
                #[serde(
                    rename = $json,
                    deserialize_with = "crate::structures::lenient::default_on_null"
                )]
                pub $field: $ty,
            ]
            [$($json_names)* $json]
            $($($rest)*)?);
    };
    (@fields [$(#[$meta:meta])*] [$vis:vis] $name:ident [$($fields:tt)*] [$($json_names:literal)*]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $($fields)*
            /// Keys present in the payload but not declared by the schema
            #[serde(flatten)]
            pub extra: ::serde_json::Map<String, ::serde_json::Value>,
        }

        impl $crate::structures::Record for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [&'static str] = &[$($json_names),*];

            fn extra(&self) -> &::serde_json::Map<String, ::serde_json::Value> {
                &self.extra
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        record!(@fields [$(#[$meta])*] [$vis] $name [] [] $($body)*);
    };
}

pub(crate) use record;

/// Decode one JSON value into a typed record.
///
/// Objects are matched by key. Arrays are treated as positional input and
/// must supply exactly one value per declared field.
pub fn decode<R: Record>(input: &Value) -> Result<R, DecodeError> {
    match input {
        Value::Object(_) => R::deserialize(input).map_err(|e| DecodeError::Shape {
            schema: R::NAME,
            reason: e.to_string(),
            input: DecodeError::preview(input),
        }),
        Value::Array(values) => {
            if values.len() != R::FIELDS.len() {
                return Err(DecodeError::Arity {
                    schema: R::NAME,
                    expected: R::FIELDS.len(),
                    actual: values.len(),
                    input: DecodeError::preview(input),
                });
            }
            let keyed: Map<String, Value> = R::FIELDS
                .iter()
                .map(|name| (*name).to_string())
                .zip(values.iter().cloned())
                .collect();
            let keyed = Value::Object(keyed);
            R::deserialize(&keyed).map_err(|e| DecodeError::Shape {
                schema: R::NAME,
                reason: e.to_string(),
                input: DecodeError::preview(input),
            })
        }
        other => Err(DecodeError::NotAnObject {
            schema: R::NAME,
            input: DecodeError::preview(other),
        }),
    }
}

/// Decode every item of a response, logging and dropping the ones that fail.
pub fn decode_all<R: Record>(items: &[Value]) -> Vec<R> {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match decode::<R>(item) {
            Ok(record) => records.push(record),
            Err(e) => error!(
                schema = e.schema(),
                "Dropping item that failed to decode: {}", e
            ),
        }
    }
    records
}

/// Lenient field deserializers for services whose JSON types drift
/// between strings and numbers.
pub mod lenient {
    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer};
    use std::fmt;

    /// Deserialize `T`, falling back to `T::default()` when the value is `null`
    pub fn default_on_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Accept a string, number, boolean or null as an optional string
    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringVisitor;

        impl<'de> Visitor<'de> for StringVisitor {
            type Value = Option<String>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, number or null")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(Some(value.to_string()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Some(value.to_string()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Some(value.to_string()))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Some(value.to_string()))
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
                Ok(Some(value.to_string()))
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(StringVisitor)
    }

    /// Accept a number, a numeric string, an empty string or null as an optional float
    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NumberVisitor;

        impl<'de> Visitor<'de> for NumberVisitor {
            type Value = Option<f64>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number, a numeric string or null")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Some(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Some(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Some(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| de::Error::custom(format!("'{value}' is not numeric")))
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(NumberVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    record! {
        struct Show {
            "title" => title: Option<String>,
            "seasonCount" => season_count: i64,
            "monitored" => monitored: Option<bool>,
            "network" => network: Option<Network>,
            "genres" => genres: Vec<String>,
        }
    }

    record! {
        struct Network {
            "name" => name: Option<String>,
        }
    }

    record! {
        struct Loose {
            #[serde(deserialize_with = "lenient::number")]
            "bandwidth" => bandwidth: Option<f64>,
            #[serde(deserialize_with = "lenient::string")]
            "user" => user: Option<String>,
        }
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let show: Show = decode(&json!({"title": "Andor"})).unwrap();
        assert_eq!(show.title.as_deref(), Some("Andor"));
        assert_eq!(show.season_count, 0);
        assert_eq!(show.monitored, None);
        assert_eq!(show.network, None);
        assert!(show.extra.is_empty());
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let show: Show = decode(&json!({
            "title": null,
            "seasonCount": null,
            "genres": null,
            "network": null
        }))
        .unwrap();
        assert_eq!(show, Show::default());

        let show: Show = decode(&json!([null, null, null, null, null])).unwrap();
        assert_eq!(show.season_count, 0);
        assert!(show.genres.is_empty());
    }

    #[test]
    fn test_empty_object_equals_default() {
        let show: Show = decode(&json!({})).unwrap();
        assert_eq!(show, Show::default());
    }

    #[test]
    fn test_undeclared_keys_are_carried_through() {
        let show: Show = decode(&json!({
            "title": "Andor",
            "originalLanguage": {"id": 1, "name": "English"},
            "runtime": 45
        }))
        .unwrap();

        assert_eq!(show.attribute("runtime"), Some(&json!(45)));
        assert_eq!(
            show.attribute("originalLanguage"),
            Some(&json!({"id": 1, "name": "English"}))
        );
        assert_eq!(show.extra.len(), 2);
    }

    #[test]
    fn test_nested_record_supplied_as_scalar_fails() {
        let err = decode::<Show>(&json!({"title": "Andor", "network": "HBO"})).unwrap_err();
        assert!(matches!(err, DecodeError::Shape { schema: "Show", .. }));
        assert!(err.to_string().contains("HBO"));
    }

    #[test]
    fn test_positional_input_maps_to_declared_order() {
        let show: Show = decode(&json!(["Andor", 2, true, {"name": "Disney+"}, ["Drama"]])).unwrap();
        assert_eq!(show.title.as_deref(), Some("Andor"));
        assert_eq!(show.season_count, 2);
        assert_eq!(show.monitored, Some(true));
        assert_eq!(
            show.network.and_then(|n| n.name).as_deref(),
            Some("Disney+")
        );
        assert_eq!(show.genres, vec!["Drama".to_string()]);
    }

    #[test]
    fn test_positional_input_with_wrong_arity_fails() {
        let err = decode::<Show>(&json!(["Andor", 2])).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Arity {
                schema: "Show",
                expected: 5,
                actual: 2,
                input: r#"["Andor",2]"#.to_string(),
            }
        );
    }

    #[test]
    fn test_scalar_input_is_rejected() {
        let err = decode::<Show>(&json!("Andor")).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject { .. }));
    }

    #[test]
    fn test_decode_all_drops_only_the_bad_items() {
        let items = vec![
            json!({"title": "Andor"}),
            json!({"title": "Broken", "network": 7}),
            json!(42),
            json!({"title": "Severance"}),
        ];
        let shows: Vec<Show> = decode_all(&items);
        let titles: Vec<_> = shows.iter().filter_map(|s| s.title.as_deref()).collect();
        assert_eq!(titles, vec!["Andor", "Severance"]);
    }

    #[test]
    fn test_lenient_fields_accept_strings_and_numbers() {
        let loose: Loose = decode(&json!({"bandwidth": "2500", "user": 12})).unwrap();
        assert_eq!(loose.bandwidth, Some(2500.0));
        assert_eq!(loose.user.as_deref(), Some("12"));

        let loose: Loose = decode(&json!({"bandwidth": "", "user": null})).unwrap();
        assert_eq!(loose.bandwidth, None);
        assert_eq!(loose.user, None);

        assert!(decode::<Loose>(&json!({"bandwidth": "fast"})).is_err());
    }

    #[test]
    fn test_fields_list_follows_declaration_order() {
        assert_eq!(
            Show::FIELDS,
            &["title", "seasonCount", "monitored", "network", "genres"]
        );
        assert_eq!(Show::NAME, "Show");
    }
}
