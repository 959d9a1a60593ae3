//! treeconf-core: configuration trees with cross-references
//!
//! This crate decodes JSON, YAML and XML documents into a single [`Value`]
//! tree, replaces `$ref:` markers with the values they point to, and offers
//! checked, path-based access plus named type and class registries.
//!
//! # Example
//!
//! ```rust
//! use treeconf_core::{Config, ValueKind};
//!
//! let yaml = r#"
//! server:
//!   host: localhost
//!   alias: $ref:server.host
//! "#;
//!
//! let config = Config::from_yaml(yaml).unwrap();
//! let alias = config.get("server.alias", ValueKind::String).unwrap();
//! assert_eq!(alias.as_str(), Some("localhost"));
//! ```

pub mod access;
pub mod decode;
pub mod error;
pub mod helpers;
pub mod loader;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod value;

mod config;

pub use config::Config;
pub use decode::{Decoder, DecoderRegistry};
pub use error::{Error, ErrorKind, Result};
pub use loader::{FileSpec, Loader, LoaderOptions, Preprocessor};
pub use path::Path;
pub use registry::{
    ClassConstructor, ClassRegistry, Instance, SharedClassRegistry, SharedTypeRegistry,
    TypeRegistry, TypeValidator,
};
pub use resolver::{ResolveOptions, ResolvePolicy, ResolveReport};
pub use value::{Mapping, Value, ValueKind};
