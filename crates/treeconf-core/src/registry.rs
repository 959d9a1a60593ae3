//! Type and class registries
//!
//! A [`TypeRegistry`] maps type names to validation predicates; a
//! [`ClassRegistry`] maps class names to constructors that build domain objects
//! from keyword-style config fragments. Both are plain owned values: pass them
//! by reference to the code that needs them. Registration is last-writer-wins.
//!
//! Neither registry synchronizes internally. Wrap one in [`Shared`] when it has
//! to be registered into and read from several threads.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;

use crate::access;
use crate::error::{Error, Result};
use crate::path::Path;
use crate::value::{Mapping, Value, ValueKind};

// =============================================================================
// Type registry
// =============================================================================

/// A validation predicate for a named type
pub trait TypeValidator: Send + Sync {
    fn check(&self, value: &Value) -> bool;
}

impl<F> TypeValidator for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn check(&self, value: &Value) -> bool {
        self(value)
    }
}

/// Registry of named value types
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<dyn TypeValidator>>,
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in types
    ///
    /// `string`, `integer`, `number`, `boolean`, `mapping`, `sequence`,
    /// `hostname` (non-empty string) and `port` (integer in 1..=65535).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_fn("string", Value::is_string);
        registry.register_fn("integer", Value::is_integer);
        registry.register_fn("number", |v: &Value| v.is_integer() || v.is_float());
        registry.register_fn("boolean", Value::is_bool);
        registry.register_fn("mapping", Value::is_mapping);
        registry.register_fn("sequence", Value::is_sequence);
        registry.register_fn("hostname", is_valid_hostname);
        registry.register_fn("port", |v: &Value| {
            v.as_i64().is_some_and(|p| (1..=65535).contains(&p))
        });
        registry
    }

    /// Register a type, replacing any existing type with the same name
    pub fn register(&mut self, name: impl Into<String>, validator: Arc<dyn TypeValidator>) {
        let name = name.into();
        if self.types.insert(name.clone(), validator).is_some() {
            log::debug!("Replaced type validator '{}'", name);
        }
    }

    /// Register a closure as a type validator
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.register(name, Arc::new(func));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check `value` against the type registered as `type_name`
    pub fn validate(&self, value: &Value, type_name: &str) -> Result<()> {
        let validator = self
            .types
            .get(type_name)
            .ok_or_else(|| Error::unknown_type(type_name))?;

        if !validator.check(value) {
            return Err(Error::validation(
                "",
                format!("Validation failed for type '{}'. Data: {}", type_name, value),
            ));
        }
        Ok(())
    }

    /// Check the value at `path` against a registered type
    pub fn validate_at(&self, root: &Value, path: impl Into<Path>, type_name: &str) -> Result<()> {
        let path = path.into();
        let value = access::get(root, &path, ValueKind::Any)?;
        self.validate(value, type_name)
            .map_err(|e| e.with_path(path.to_string()))
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}

/// A hostname is any non-empty string
pub fn is_valid_hostname(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}

// =============================================================================
// Class registry
// =============================================================================

/// An object produced by a class constructor
pub type Instance = Box<dyn Any + Send + Sync>;

/// A constructor for a named class
pub trait ClassConstructor: Send + Sync {
    /// Build an instance from named arguments
    ///
    /// Errors returned here reach the caller of
    /// [`ClassRegistry::instantiate`] unchanged.
    fn construct(&self, args: &Mapping) -> Result<Instance>;
}

impl<F> ClassConstructor for F
where
    F: Fn(&Mapping) -> Result<Instance> + Send + Sync,
{
    fn construct(&self, args: &Mapping) -> Result<Instance> {
        self(args)
    }
}

/// Builds any serde type from its named arguments
struct DeserializeConstructor<T> {
    class_name: String,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> ClassConstructor for DeserializeConstructor<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn construct(&self, args: &Mapping) -> Result<Instance> {
        let value: T = access::from_value(&Value::Mapping(args.clone())).map_err(|e| {
            e.with_help(format!(
                "Check the arguments passed to class '{}'",
                self.class_name
            ))
        })?;
        Ok(Box::new(value))
    }
}

/// Registry of named class constructors
#[derive(Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, Arc<dyn ClassConstructor>>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a class, replacing any existing class with the same name
    pub fn define(&mut self, name: impl Into<String>, constructor: Arc<dyn ClassConstructor>) {
        let name = name.into();
        if self.classes.insert(name.clone(), constructor).is_some() {
            log::debug!("Replaced class constructor '{}'", name);
        }
    }

    /// Define a class from a closure
    pub fn define_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Mapping) -> Result<Instance> + Send + Sync + 'static,
    {
        self.define(name, Arc::new(func));
    }

    /// Define a class whose instances are deserialized from the named arguments
    pub fn define_deserialize<T>(&mut self, name: impl Into<String>)
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let name = name.into();
        let constructor = DeserializeConstructor::<T> {
            class_name: name.clone(),
            _marker: std::marker::PhantomData,
        };
        self.define(name, Arc::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Defined class names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build an instance of `class_name`
    pub fn instantiate(&self, class_name: &str, args: &Mapping) -> Result<Instance> {
        let constructor = self
            .classes
            .get(class_name)
            .ok_or_else(|| Error::undefined_class(class_name))?;
        constructor.construct(args)
    }

    /// Build an instance and downcast it to a concrete type
    pub fn instantiate_as<T: Any>(&self, class_name: &str, args: &Mapping) -> Result<T> {
        let instance = self.instantiate(class_name, args)?;
        instance.downcast::<T>().map(|b| *b).map_err(|_| {
            Error::internal(format!(
                "Class '{}' did not produce a {}",
                class_name,
                std::any::type_name::<T>()
            ))
        })
    }

    /// Build an instance from the mapping found at `path`
    pub fn instantiate_at(
        &self,
        root: &Value,
        path: impl Into<Path>,
        class_name: &str,
    ) -> Result<Instance> {
        let args = access::get_mapping(root, path)?;
        self.instantiate(class_name, args)
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.names())
            .finish()
    }
}

// =============================================================================
// Sharing
// =============================================================================

/// A registry shared between threads behind a read/write lock
///
/// Registration takes the write lock; validation and instantiation take the
/// read lock. A poisoned lock surfaces as an internal error.
pub struct Shared<R> {
    inner: Arc<RwLock<R>>,
}

pub type SharedTypeRegistry = Shared<TypeRegistry>;
pub type SharedClassRegistry = Shared<ClassRegistry>;

impl<R> Shared<R> {
    pub fn new(registry: R) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, R>> {
        self.inner
            .read()
            .map_err(|_| Error::internal("Registry lock poisoned"))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, R>> {
        self.inner
            .write()
            .map_err(|_| Error::internal("Registry lock poisoned"))
    }
}

impl<R> Clone for Shared<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Default> Default for Shared<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

impl<R> From<R> for Shared<R> {
    fn from(registry: R) -> Self {
        Self::new(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;

    #[derive(Debug, PartialEq)]
    struct Server {
        host: String,
        port: i64,
    }

    fn server_args(host: &str, port: i64) -> Mapping {
        let mut args = Mapping::new();
        args.insert("host".into(), Value::from(host));
        args.insert("port".into(), Value::from(port));
        args
    }

    fn build_server(args: &Mapping) -> Result<Instance> {
        let host = args
            .get("host")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("host", "host is required"))?;
        let port = args.get("port").and_then(Value::as_i64).unwrap_or(80);
        Ok(Box::new(Server {
            host: host.to_string(),
            port,
        }))
    }

    #[test]
    fn test_validate_unregistered_type() {
        let registry = TypeRegistry::new();
        for value in [Value::Null, Value::from("x"), Value::Integer(1)] {
            let err = registry.validate(&value, "unregisteredName").unwrap_err();
            assert_eq!(
                err.kind,
                ErrorKind::UnknownType {
                    name: "unregisteredName".into()
                }
            );
        }
    }

    #[test]
    fn test_validate_registered_type() {
        let mut registry = TypeRegistry::new();
        registry.register_fn("hostname", is_valid_hostname);

        assert!(registry.validate(&Value::from("localhost"), "hostname").is_ok());

        let err = registry.validate(&Value::from(""), "hostname").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationFailed);

        let err = registry.validate(&Value::Integer(42), "hostname").unwrap_err();
        assert!(err.to_string().contains("Data: 42"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = TypeRegistry::new();
        registry.register_fn("flag", |_: &Value| false);
        registry.register_fn("flag", Value::is_bool);

        assert!(registry.validate(&Value::Bool(true), "flag").is_ok());
        assert_eq!(registry.names(), vec!["flag"]);
    }

    #[test]
    fn test_builtin_types() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.validate(&Value::Integer(8080), "port").is_ok());
        assert!(registry.validate(&Value::Integer(0), "port").is_err());
        assert!(registry.validate(&Value::Integer(70000), "port").is_err());
        assert!(registry.validate(&Value::Float(1.5), "number").is_ok());
        assert!(registry.validate(&Value::from("a"), "integer").is_err());
        assert!(registry.contains("hostname"));
    }

    #[test]
    fn test_validate_at_path() {
        let root: Value = serde_json::from_str(r#"{"server": {"port": 99999}}"#).unwrap();
        let registry = TypeRegistry::with_builtins();

        let err = registry.validate_at(&root, "server.port", "port").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationFailed);
        assert_eq!(err.path.as_deref(), Some("server.port"));

        let err = registry.validate_at(&root, "server.host", "hostname").unwrap_err();
        assert_eq!(err.kind, ErrorKind::PathNotFound);
    }

    #[test]
    fn test_instantiate_undefined_class() {
        let registry = ClassRegistry::new();
        let err = registry.instantiate("Undefined", &Mapping::new()).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::UndefinedClass {
                name: "Undefined".into()
            }
        );
    }

    #[test]
    fn test_instantiate_defined_class() {
        let mut registry = ClassRegistry::new();
        registry.define_fn("Server", build_server);

        let server: Server = registry
            .instantiate_as("Server", &server_args("localhost", 8080))
            .unwrap();
        assert_eq!(
            server,
            Server {
                host: "localhost".into(),
                port: 8080
            }
        );
    }

    #[test]
    fn test_constructor_error_passes_through() {
        let mut registry = ClassRegistry::new();
        registry.define_fn("Server", build_server);

        let err = registry.instantiate("Server", &Mapping::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationFailed);
        assert_eq!(err.path.as_deref(), Some("host"));
        assert!(err.to_string().contains("host is required"));
    }

    #[test]
    fn test_instantiate_as_wrong_type() {
        let mut registry = ClassRegistry::new();
        registry.define_fn("Server", build_server);

        let err = registry
            .instantiate_as::<String>("Server", &server_args("a", 1))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_define_deserialize() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Endpoint {
            host: String,
            port: u16,
        }

        let mut registry = ClassRegistry::new();
        registry.define_deserialize::<Endpoint>("Endpoint");

        let endpoint: Endpoint = registry
            .instantiate_as("Endpoint", &server_args("db", 5432))
            .unwrap();
        assert_eq!(endpoint.host, "db");
        assert_eq!(endpoint.port, 5432);

        let err = registry
            .instantiate("Endpoint", &server_args("db", -1))
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
        assert!(err.path.is_none());
        assert!(!err.to_string().contains("Path:"));
    }

    #[test]
    fn test_instantiate_at_path() {
        let root: Value =
            serde_json::from_str(r#"{"db": {"host": "db.local", "port": 5432}, "name": "x"}"#)
                .unwrap();
        let mut registry = ClassRegistry::new();
        registry.define_fn("Server", build_server);

        let instance = registry.instantiate_at(&root, "db", "Server").unwrap();
        let server = instance.downcast_ref::<Server>().unwrap();
        assert_eq!(server.host, "db.local");

        let err = registry.instantiate_at(&root, "name", "Server").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn test_shared_registry_across_threads() {
        let shared = SharedTypeRegistry::new(TypeRegistry::new());

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared
                        .write()
                        .unwrap()
                        .register_fn(format!("t{}", i), Value::is_integer);
                })
            })
            .collect();
        for handle in writers {
            handle.join().unwrap();
        }

        let registry = shared.read().unwrap();
        assert_eq!(registry.names(), vec!["t0", "t1", "t2", "t3"]);
        assert!(registry.validate(&Value::Integer(1), "t2").is_ok());
    }
}
