//! Recipe parameters and the serialized parameter blob stored on each connection group
//!
//! The blob is a small XML document:
//!
//! ```text
//! <connection_parameters>
//!   <parameter><description>Overlap</description><value>0</value></parameter>
//!   ...
//!   <min_delay>1</min_delay>
//!   <max_delay>5</max_delay>
//! </connection_parameters>
//! ```

use crate::error::{BuildError, Result};

use std::collections::BTreeMap;
use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named recipe parameters.
///
/// Recipes look parameters up by name only; order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ParameterMap {
    values: BTreeMap<String, f64>,
}

impl ParameterMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Value of a parameter
    pub fn get(&self, name: &str) -> Result<f64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| BuildError::missing_parameter(name))
    }

    /// Parameter read as a flag; any non-zero value is true
    pub fn flag(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)? != 0.0)
    }

    /// Parameter read as a whole number of lattice steps
    pub fn integer(&self, name: &str) -> Result<i64> {
        let value = self.get(name)?;
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(BuildError::invalid_parameters(format!(
                "{:?} must be a whole number, got {}",
                name, value
            )));
        }
        Ok(value as i64)
    }

    /// Whether a parameter is present
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Parameters and delay bounds as persisted on a connection group
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterBlob {
    /// Recipe parameters
    pub parameters: ParameterMap,
    /// Smallest delay handed to new connections
    pub min_delay: u32,
    /// Largest delay handed to new connections
    pub max_delay: u32,
}

const ROOT: &str = "connection_parameters";

impl ParameterBlob {
    /// Serialize to the stored XML form
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str("<connection_parameters>");
        for (name, value) in self.parameters.iter() {
            // writing into a String cannot fail
            let _ = write!(
                out,
                "<parameter><description>{}</description><value>{}</value></parameter>",
                escape(name),
                value
            );
        }
        let _ = write!(
            out,
            "<min_delay>{}</min_delay><max_delay>{}</max_delay></connection_parameters>",
            self.min_delay, self.max_delay
        );
        out
    }

    /// Parse the stored XML form
    pub fn decode(blob: &str) -> Result<Self> {
        let (body, rest) = element(blob.trim(), ROOT)?;
        if !rest.trim().is_empty() {
            return Err(BuildError::invalid_blob("trailing content after root element"));
        }

        let mut parameters = ParameterMap::new();
        let mut min_delay = None;
        let mut max_delay = None;
        let mut cursor = body.trim_start();
        while !cursor.is_empty() {
            if cursor.starts_with("<parameter>") {
                let (param, rest) = element(cursor, "parameter")?;
                let (description, after) = element(param.trim_start(), "description")?;
                let (value, after) = element(after.trim_start(), "value")?;
                if !after.trim().is_empty() {
                    return Err(BuildError::invalid_blob("unexpected content in <parameter>"));
                }
                parameters.insert(unescape(description)?, parse_number(value, "value")?);
                cursor = rest;
            } else if cursor.starts_with("<min_delay>") {
                let (value, rest) = element(cursor, "min_delay")?;
                min_delay = Some(parse_number(value, "min_delay")?);
                cursor = rest;
            } else if cursor.starts_with("<max_delay>") {
                let (value, rest) = element(cursor, "max_delay")?;
                max_delay = Some(parse_number(value, "max_delay")?);
                cursor = rest;
            } else {
                let snippet: String = cursor.chars().take(24).collect();
                return Err(BuildError::invalid_blob(format!("unexpected content {:?}", snippet)));
            }
            cursor = cursor.trim_start();
        }

        Ok(Self {
            parameters,
            min_delay: min_delay.ok_or_else(|| BuildError::invalid_blob("missing <min_delay>"))?,
            max_delay: max_delay.ok_or_else(|| BuildError::invalid_blob("missing <max_delay>"))?,
        })
    }
}

/// Split `<tag>content</tag>rest` into `(content, rest)`
fn element<'a>(input: &'a str, tag: &str) -> Result<(&'a str, &'a str)> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let inner = input
        .strip_prefix(open.as_str())
        .ok_or_else(|| BuildError::invalid_blob(format!("expected {}", open)))?;
    let end = inner
        .find(close.as_str())
        .ok_or_else(|| BuildError::invalid_blob(format!("unterminated {}", open)))?;
    Ok((&inner[..end], &inner[end + close.len()..]))
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    let text = unescape(text.trim())?;
    text.parse()
        .map_err(|_| BuildError::invalid_blob(format!("bad {} {:?}", what, text)))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let entity_end = rest[start..]
            .find(';')
            .ok_or_else(|| BuildError::invalid_blob("unterminated entity"))?;
        let entity = &rest[start + 1..start + entity_end];
        out.push(match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            other => return Err(BuildError::invalid_blob(format!("unknown entity &{};", other))),
        });
        rest = &rest[start + entity_end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> ParameterBlob {
        ParameterBlob {
            parameters: ParameterMap::new()
                .with("Average weight", 0.5)
                .with("Weight range", 0.25)
                .with("Overlap", -1.0),
            min_delay: 1,
            max_delay: 5,
        }
    }

    #[test]
    fn test_encode_shape() {
        let text = blob().encode();
        assert!(text.starts_with("<connection_parameters><parameter><description>"));
        assert!(text.contains("<description>Overlap</description><value>-1</value>"));
        assert!(text.ends_with(concat!(
            "<min_delay>1</min_delay><max_delay>5</max_delay>",
            "</connection_parameters>"
        )));
    }

    #[test]
    fn test_decode_encoded() {
        let original = blob();
        assert_eq!(ParameterBlob::decode(&original.encode()).unwrap(), original);
    }

    #[test]
    fn test_decode_tolerates_whitespace() {
        let text = "
            <connection_parameters>
              <parameter>
                <description>Connection density</description>
                <value> 0.1 </value>
              </parameter>
              <min_delay>2</min_delay>
              <max_delay>3</max_delay>
            </connection_parameters>
        ";
        let decoded = ParameterBlob::decode(text).unwrap();
        assert_eq!(decoded.parameters.get("Connection density").unwrap(), 0.1);
        assert_eq!((decoded.min_delay, decoded.max_delay), (2, 3));
    }

    #[test]
    fn test_names_are_escaped() {
        let original = ParameterBlob {
            parameters: ParameterMap::new().with("a<b & \"c\"", 1.0),
            min_delay: 0,
            max_delay: 0,
        };
        let text = original.encode();
        assert!(text.contains("a&lt;b &amp; &quot;c&quot;"));
        assert_eq!(ParameterBlob::decode(&text).unwrap(), original);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(ParameterBlob::decode("").is_err());
        assert!(ParameterBlob::decode("<connection_parameters>").is_err());
        for text in [
            "<connection_parameters><min_delay>1</min_delay></connection_parameters>",
            concat!(
                "<connection_parameters><min_delay>x</min_delay><max_delay>1</max_delay>",
                "</connection_parameters>"
            ),
            concat!(
                "<connection_parameters><bogus/><min_delay>1</min_delay><max_delay>1</max_delay>",
                "</connection_parameters>"
            ),
        ] {
            assert!(ParameterBlob::decode(text).is_err(), "{}", text);
        }
    }

    #[test]
    fn test_parameter_lookup() {
        let params = ParameterMap::new().with("Rotate", 1.0).with("Overlap", 1.5);
        assert!(params.flag("Rotate").unwrap());
        assert!(params.integer("Overlap").is_err());
        assert!(matches!(params.get("Missing"), Err(BuildError::MissingParameter { .. })));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_shape() {
        let blob = ParameterBlob {
            parameters: ParameterMap::new().with("Average weight", 0.5),
            min_delay: 1,
            max_delay: 4,
        };
        let json = serde_json::to_value(&blob).unwrap();
        assert_eq!(json["parameters"]["Average weight"], 0.5);
        assert_eq!(json["max_delay"], 4);
        assert_eq!(serde_json::from_value::<ParameterBlob>(json).unwrap(), blob);
    }
}
