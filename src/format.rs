//! Serializers that marshal settings to and from stored text.
//!
//! A serializer only translates between text and a `serde_json::Value`
//! document, which keeps the trait object-safe. Typed conversion lives in
//! [`SerializerExt`].

use crate::error::SerializeError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Text format of stored settings.
pub trait SettingsSerializer: Send + Sync {
    /// Parse stored text into a document.
    fn parse(&self, data: &str) -> Result<Value, SerializeError>;

    /// Render a document into stored text.
    fn render(&self, document: &Value) -> Result<String, SerializeError>;

    /// File extension for this format, without the dot.
    fn extension(&self) -> &'static str;

    /// Whether freshly rendered text matches what is stored.
    fn are_identical(&self, rendered: &str, stored: &str) -> bool {
        rendered == stored
    }
}

/// Typed helpers available on every serializer.
pub trait SerializerExt {
    /// Deserialize `data` into `T`, optionally returning the raw document.
    fn deserialize<T: DeserializeOwned>(&self, data: &str, capture_raw: bool) -> Result<(T, Option<Value>), SerializeError>;

    fn serialize<T: Serialize>(&self, settings: &T) -> Result<String, SerializeError>;

    /// Would re-serializing `settings` reproduce `data` exactly?
    fn matches_stored<T: Serialize>(&self, settings: &T, data: &str) -> Result<bool, SerializeError>;
}

impl<S: SettingsSerializer + ?Sized> SerializerExt for S {
    fn deserialize<T: DeserializeOwned>(&self, data: &str, capture_raw: bool) -> Result<(T, Option<Value>), SerializeError> {
        let document = self.parse(data)?;
        if capture_raw {
            let settings = serde_json::from_value(document.clone())?;
            Ok((settings, Some(document)))
        } else {
            Ok((serde_json::from_value(document)?, None))
        }
    }

    fn serialize<T: Serialize>(&self, settings: &T) -> Result<String, SerializeError> {
        let document = serde_json::to_value(settings)?;
        self.render(&document)
    }

    fn matches_stored<T: Serialize>(&self, settings: &T, data: &str) -> Result<bool, SerializeError> {
        let rendered = self.serialize(settings)?;
        Ok(self.are_identical(&rendered, data))
    }
}

/// Pretty-printed JSON with a trailing newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl SettingsSerializer for JsonSerializer {
    fn parse(&self, data: &str) -> Result<Value, SerializeError> {
        Ok(serde_json::from_str(data)?)
    }

    fn render(&self, document: &Value) -> Result<String, SerializeError> {
        let mut text = serde_json::to_string_pretty(document)?;
        text.push('\n');
        Ok(text)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

/// TOML documents. Null values are dropped on render since TOML cannot
/// express them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlSerializer;

impl SettingsSerializer for TomlSerializer {
    fn parse(&self, data: &str) -> Result<Value, SerializeError> {
        let table: toml::Table = toml::from_str(data)?;
        Ok(serde_json::to_value(table)?)
    }

    fn render(&self, document: &Value) -> Result<String, SerializeError> {
        let stripped = strip_nulls(document);
        if !stripped.is_object() {
            return Err(SerializeError::Shape(
                "TOML documents must be tables at the top level".to_string(),
            ));
        }
        Ok(toml::to_string_pretty(&stripped)?)
    }

    fn extension(&self) -> &'static str {
        "toml"
    }
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().filter(|v| !v.is_null()).map(strip_nulls).collect()),
        other => other.clone(),
    }
}

/// Stored format selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Toml,
}

impl Format {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Format::Json),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Toml => "toml",
        }
    }

    pub fn serializer(&self) -> std::sync::Arc<dyn SettingsSerializer> {
        match self {
            Format::Json => std::sync::Arc::new(JsonSerializer),
            Format::Toml => std::sync::Arc::new(TomlSerializer),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        port: u16,
        #[serde(default)]
        note: Option<String>,
    }

    fn sample() -> Sample {
        Sample {
            name: "svc".into(),
            port: 8080,
            note: None,
        }
    }

    #[test]
    fn test_json_roundtrip_is_identical() {
        let json = JsonSerializer;
        let text = json.serialize(&sample()).unwrap();
        let (parsed, raw): (Sample, _) = json.deserialize(&text, false).unwrap();
        assert_eq!(parsed, sample());
        assert!(raw.is_none());
        assert!(json.matches_stored(&parsed, &text).unwrap());
    }

    #[test]
    fn test_json_drift_detected() {
        let json = JsonSerializer;
        let stored = r#"{"name": "svc", "port": 8080, "legacy": true}"#;
        let (parsed, raw): (Sample, _) = json.deserialize(stored, true).unwrap();
        assert_eq!(raw.unwrap()["legacy"], Value::Bool(true));
        assert!(!json.matches_stored(&parsed, stored).unwrap());
    }

    #[test]
    fn test_toml_roundtrip_drops_nulls() {
        let toml = TomlSerializer;
        let text = toml.serialize(&sample()).unwrap();
        assert!(!text.contains("note"));
        let (parsed, _): (Sample, _) = toml.deserialize(&text, false).unwrap();
        assert_eq!(parsed, sample());
        assert!(toml.matches_stored(&parsed, &text).unwrap());
    }

    #[test]
    fn test_toml_rejects_scalar_documents() {
        assert!(matches!(
            TomlSerializer.render(&Value::from(3)),
            Err(SerializeError::Shape(_))
        ));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("JSON"), Some(Format::Json));
        assert_eq!(Format::parse("toml"), Some(Format::Toml));
        assert_eq!(Format::parse("yaml"), None);
        assert_eq!(Format::Toml.serializer().extension(), "toml");
    }
}
