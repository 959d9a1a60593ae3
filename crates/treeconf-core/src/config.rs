//! Config type - the main entry point for reading a resolved tree

use std::any::Any;
use std::path::Path as FsPath;

use serde::de::DeserializeOwned;

use crate::access;
use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::path::Path;
use crate::registry::{ClassRegistry, Instance, TypeRegistry};
use crate::resolver::{self, ResolveOptions, ResolveReport};
use crate::value::{Mapping, Value, ValueKind};

/// A decoded configuration tree
///
/// Configs built through a [`Loader`] (or the `from_*` shortcuts) have already
/// had their references resolved; [`Config::new`] wraps a tree untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Value,
    report: ResolveReport,
}

impl Config {
    /// Wrap a tree without resolving references
    pub fn new(root: Value) -> Self {
        Self::with_report(root, ResolveReport::default())
    }

    pub(crate) fn with_report(root: Value, report: ResolveReport) -> Self {
        Self { root, report }
    }

    /// Wrap a tree and resolve its references
    pub fn resolved(mut root: Value, options: &ResolveOptions) -> Result<Self> {
        let report = resolver::resolve_with(&mut root, options)?;
        Ok(Self { root, report })
    }

    /// Load a config from text in any registered format
    pub fn parse(text: &str, format: &str) -> Result<Self> {
        Loader::new().load_str(text, format)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::parse(json, "json")
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse(yaml, "yaml")
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        Self::parse(xml, "xml")
    }

    /// Load a config file; the format comes from its extension
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        Loader::new().load_file(path)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Report from the last resolution pass
    pub fn report(&self) -> &ResolveReport {
        &self.report
    }

    /// Run another resolution pass in place
    ///
    /// Single-hop resolution leaves chained markers one hop closer each pass,
    /// so repeated calls walk a chain down to its end.
    pub fn resolve(&mut self, options: &ResolveOptions) -> Result<&ResolveReport> {
        self.report = resolver::resolve_with(&mut self.root, options)?;
        Ok(&self.report)
    }

    /// Markers still present in the tree, as (location, target) pairs
    pub fn references(&self) -> Vec<(Path, Path)> {
        let options = ResolveOptions::default().with_descend_sequences(true);
        resolver::find_references(&self.root, &options)
    }

    /// Merge another config into this one; later values win
    pub fn merge(&mut self, other: Config) {
        self.root.merge(other.root);
    }

    // -------------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------------

    /// Get the value at `path`, checked against `kind`
    pub fn get(&self, path: impl Into<Path>, kind: ValueKind) -> Result<&Value> {
        access::get(&self.root, path, kind)
    }

    /// Get the value at `path`, or `None` if it is absent
    pub fn get_optional(&self, path: impl Into<Path>) -> Result<Option<&Value>> {
        access::get_optional(&self.root, path)
    }

    /// Get the value at `path`, falling back to `default` when absent
    pub fn get_or(&self, path: impl Into<Path>, default: Value) -> Result<Value> {
        Ok(self.get_optional(path)?.cloned().unwrap_or(default))
    }

    pub fn get_str(&self, path: impl Into<Path>) -> Result<&str> {
        access::get_str(&self.root, path)
    }

    pub fn get_i64(&self, path: impl Into<Path>) -> Result<i64> {
        access::get_i64(&self.root, path)
    }

    pub fn get_f64(&self, path: impl Into<Path>) -> Result<f64> {
        access::get_f64(&self.root, path)
    }

    pub fn get_bool(&self, path: impl Into<Path>) -> Result<bool> {
        access::get_bool(&self.root, path)
    }

    pub fn get_mapping(&self, path: impl Into<Path>) -> Result<&Mapping> {
        access::get_mapping(&self.root, path)
    }

    pub fn get_sequence(&self, path: impl Into<Path>) -> Result<&[Value]> {
        access::get_sequence(&self.root, path)
    }

    /// Deserialize the subtree at `path` into any serde type
    pub fn get_as<T: DeserializeOwned>(&self, path: impl Into<Path>) -> Result<T> {
        access::get_as(&self.root, path)
    }

    // -------------------------------------------------------------------------
    // Validation and construction
    // -------------------------------------------------------------------------

    /// Check the value at `path` with an arbitrary predicate
    pub fn validate_with<F>(&self, path: impl Into<Path>, predicate: F) -> Result<()>
    where
        F: Fn(&Value) -> bool,
    {
        access::validate_with_predicate(&self.root, path, predicate)
    }

    /// Check the value at `path` against a named type
    pub fn validate_type(
        &self,
        types: &TypeRegistry,
        path: impl Into<Path>,
        type_name: &str,
    ) -> Result<()> {
        types.validate_at(&self.root, path, type_name)
    }

    /// Build an instance of a named class from the mapping at `path`
    pub fn instantiate(
        &self,
        classes: &ClassRegistry,
        path: impl Into<Path>,
        class_name: &str,
    ) -> Result<Instance> {
        classes.instantiate_at(&self.root, path, class_name)
    }

    /// Build an instance of a named class and downcast it to `T`
    pub fn instantiate_as<T: Any>(
        &self,
        classes: &ClassRegistry,
        path: impl Into<Path>,
        class_name: &str,
    ) -> Result<T> {
        let args = self.get_mapping(path)?;
        classes.instantiate_as(class_name, args)
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.root).map_err(|e| Error::internal(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.root).map_err(|e| Error::internal(e.to_string()))
    }
}

impl From<Value> for Config {
    fn from(root: Value) -> Self {
        Config::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::resolver::ResolvePolicy;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[test]
    fn test_reference_example() {
        let config = Config::from_json(
            r#"{"server": {"host": "localhost", "alias": "$ref:server.host"}}"#,
        )
        .unwrap();

        assert_eq!(
            config.get("server.alias", ValueKind::String).unwrap(),
            &Value::from("localhost")
        );
        assert_eq!(config.report().substituted, 1);
        assert!(config.references().is_empty());
    }

    #[test]
    fn test_new_does_not_resolve() {
        let root: Value = serde_json::from_str(r#"{"a": "$ref:b", "b": 1}"#).unwrap();
        let config = Config::new(root);

        assert_eq!(config.get_str("a").unwrap(), "$ref:b");
        let refs = config.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0.to_string(), "a");
        assert_eq!(refs[0].1.to_string(), "b");
    }

    #[test]
    fn test_resolve_again_walks_chain() {
        let mut config = Config::from_yaml("a: $ref:b\nb: $ref:c\nc: end\n").unwrap();
        assert_eq!(config.get_str("a").unwrap(), "$ref:c");

        config.resolve(&ResolveOptions::default()).unwrap();
        assert_eq!(config.get_str("a").unwrap(), "end");
    }

    #[test]
    fn test_resolved_chained() {
        let root: Value = serde_yaml::from_str("a: $ref:b\nb: $ref:c\nc: end\n").unwrap();
        let options = ResolveOptions::default().with_policy(ResolvePolicy::Chained);
        let config = Config::resolved(root, &options).unwrap();
        assert_eq!(config.get_str("a").unwrap(), "end");
    }

    #[test]
    fn test_get_or_default() {
        let config = Config::from_yaml("a: 1\n").unwrap();
        assert_eq!(config.get_or("b", Value::from(5)).unwrap(), Value::from(5));
        assert_eq!(config.get_or("a", Value::from(5)).unwrap(), Value::from(1));
    }

    #[test]
    fn test_validate_type_and_with() {
        let config = Config::from_yaml("server:\n  host: db.example.com\n  port: 70000\n").unwrap();
        let types = TypeRegistry::with_builtins();

        assert!(config.validate_type(&types, "server.host", "hostname").is_ok());

        let err = config.validate_type(&types, "server.port", "port").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationFailed);
        assert_eq!(err.path.as_deref(), Some("server.port"));

        let err = config.validate_type(&types, "server.port", "uuid").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownType { name: "uuid".into() });

        assert!(config
            .validate_with("server.port", |v| v.as_i64().is_some())
            .is_ok());
    }

    #[test]
    fn test_instantiate() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Database {
            host: String,
            port: u16,
        }

        let mut classes = ClassRegistry::new();
        classes.define_deserialize::<Database>("Database");

        let config = Config::from_yaml("db:\n  host: localhost\n  port: 5432\n").unwrap();
        let db: Database = config.instantiate_as(&classes, "db", "Database").unwrap();
        assert_eq!(
            db,
            Database {
                host: "localhost".into(),
                port: 5432
            }
        );

        let err = config.instantiate(&classes, "db", "Cache").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedClass { name: "Cache".into() });
    }

    #[test]
    fn test_merge_configs() {
        let mut base = Config::from_yaml("db:\n  host: a\n  port: 1\n").unwrap();
        let over = Config::from_json(r#"{"db": {"host": "b"}}"#).unwrap();
        base.merge(over);

        assert_eq!(base.get_str("db.host").unwrap(), "b");
        assert_eq!(base.get_i64("db.port").unwrap(), 1);
    }

    #[test]
    fn test_output_formats() {
        let config = Config::from_xml("<c><name>svc</name></c>").unwrap();

        let json = config.to_json().unwrap();
        assert!(json.contains("\"name\": \"svc\""));

        let yaml = config.to_yaml().unwrap();
        assert_eq!(yaml, "name: svc\n");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.yml");
        std::fs::write(&path, "x: $ref:y\ny: 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.get_i64("x").unwrap(), 3);
    }
}
