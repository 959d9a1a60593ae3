//! Format decoders
//!
//! Each decoder turns raw text into a [`Value`] tree. Decoders are selected at
//! runtime by format tag through a [`DecoderRegistry`]; an unknown tag is a
//! format error, not a panic.
//!
//! XML has no native notion of mappings or lists, so the document element is
//! decoded as a mapping of its child elements:
//! - a tag with no child elements becomes its text content (`null` if empty);
//! - repeated sibling tags collapse into a sequence, in document order;
//! - attributes, comments and processing instructions are ignored.
//!
//! All XML scalars are strings.
//!
//! YAML allows non-string mapping keys; scalar keys are kept as their text
//! (`80:` becomes `"80"`) and collection keys are rejected.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::path::Path;
use crate::value::{Mapping, Value};

/// Decodes raw text of one format into a config tree
pub trait Decoder: Send + Sync {
    fn decode(&self, text: &str) -> Result<Value>;
}

impl<F> Decoder for F
where
    F: Fn(&str) -> Result<Value> + Send + Sync,
{
    fn decode(&self, text: &str) -> Result<Value> {
        self(text)
    }
}

/// JSON decoder backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, text: &str) -> Result<Value> {
        serde_json::from_str(text).map_err(|e| Error::format("json", e.to_string()))
    }
}

/// YAML decoder backed by serde_yaml
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

impl Decoder for YamlDecoder {
    fn decode(&self, text: &str) -> Result<Value> {
        // An empty YAML document is null, not an error
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let raw: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| Error::format("yaml", e.to_string()))?;
        from_yaml_value(raw, &Path::root())
    }
}

/// Convert a YAML node, turning scalar mapping keys into their text
fn from_yaml_value(raw: serde_yaml::Value, at: &Path) -> Result<Value> {
    Ok(match raw {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| from_yaml_value(item, &at.child(i.to_string())))
                .collect::<Result<_>>()?,
        ),
        serde_yaml::Value::Mapping(entries) => {
            let mut map = Mapping::new();
            for (key, value) in entries {
                let key = yaml_key(key, at)?;
                let child = at.child(key.as_str());
                map.insert(key, from_yaml_value(value, &child)?);
            }
            Value::Mapping(map)
        }
        serde_yaml::Value::Tagged(tagged) => from_yaml_value(tagged.value, at)?,
    })
}

fn yaml_key(key: serde_yaml::Value, at: &Path) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value, at),
        other => {
            let shown = serde_yaml::to_string(&other).unwrap_or_default();
            Err(Error::format(
                "yaml",
                format!("Mapping key must be a scalar, found {}", shown.trim_end()),
            )
            .with_path(at.to_string()))
        }
    }
}

/// XML decoder backed by roxmltree
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDecoder;

impl Decoder for XmlDecoder {
    fn decode(&self, text: &str) -> Result<Value> {
        let doc =
            roxmltree::Document::parse(text).map_err(|e| Error::format("xml", e.to_string()))?;
        Ok(decode_xml_children(doc.root_element()))
    }
}

fn decode_xml_children(element: roxmltree::Node<'_, '_>) -> Value {
    let mut map = Mapping::new();

    for child in element.children().filter(|n| n.is_element()) {
        let tag = child.tag_name().name().to_string();
        let decoded = decode_xml_element(child);

        // Elements never decode to sequences, so an existing sequence
        // means the tag has already repeated
        match map.get_mut(&tag) {
            Some(Value::Sequence(items)) => items.push(decoded),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::Sequence(vec![first, decoded]);
            }
            None => {
                map.insert(tag, decoded);
            }
        }
    }

    Value::Mapping(map)
}

fn decode_xml_element(element: roxmltree::Node<'_, '_>) -> Value {
    if element.children().any(|n| n.is_element()) {
        decode_xml_children(element)
    } else {
        element.text().map(Value::from).unwrap_or(Value::Null)
    }
}

/// Registry of decoders keyed by format tag
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Arc<dyn Decoder>>,
}

impl DecoderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in decoders (json, xml, yaml, yml)
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let yaml: Arc<dyn Decoder> = Arc::new(YamlDecoder);
        registry.register("json", Arc::new(JsonDecoder));
        registry.register("xml", Arc::new(XmlDecoder));
        registry.register("yaml", Arc::clone(&yaml));
        registry.register("yml", yaml);
        registry
    }

    /// Register a decoder for a format tag (case-insensitive), replacing any existing one
    pub fn register(&mut self, format: impl Into<String>, decoder: Arc<dyn Decoder>) {
        let format = format.into().to_ascii_lowercase();
        if self.decoders.insert(format.clone(), decoder).is_some() {
            log::debug!("Replaced decoder for format '{}'", format);
        }
    }

    pub fn contains(&self, format: &str) -> bool {
        self.decoders.contains_key(&format.to_ascii_lowercase())
    }

    /// Registered format tags, sorted
    pub fn formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.decoders.keys().cloned().collect();
        formats.sort_unstable();
        formats
    }

    /// Decode `text` with the decoder registered for `format`
    pub fn decode(&self, format: &str, text: &str) -> Result<Value> {
        let decoder = self
            .decoders
            .get(&format.to_ascii_lowercase())
            .ok_or_else(|| Error::unsupported_format(format, &self.formats()))?;
        log::debug!("Decoding {} bytes as {}", text.len(), format);
        decoder.decode(text)
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}
