//! Loading pipeline: pre-process, decode, resolve
//!
//! A [`Loader`] owns the decoder table and an optional caller-supplied
//! [`Preprocessor`] (for example a template engine) that rewrites the raw text
//! before it is decoded. Files are located relative to
//! [`LoaderOptions::base_path`] and their format is taken from the extension.

use std::fmt;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::decode::DecoderRegistry;
use crate::error::{Error, Result};
use crate::resolver::{self, ResolveOptions, ResolveReport};
use crate::value::{Mapping, Value};

/// Rewrites raw configuration text before it is decoded
pub trait Preprocessor: Send + Sync {
    fn process(&self, text: &str) -> Result<String>;
}

impl<F> Preprocessor for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn process(&self, text: &str) -> Result<String> {
        self(text)
    }
}

/// Options for loading configs
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Directory that relative file names are resolved against
    pub base_path: Option<PathBuf>,
    /// Reference resolution to run after decoding; `None` keeps markers as-is
    pub resolve: Option<ResolveOptions>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            base_path: None,
            resolve: Some(ResolveOptions::default()),
        }
    }
}

impl LoaderOptions {
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn with_resolve(mut self, resolve: Option<ResolveOptions>) -> Self {
        self.resolve = resolve;
        self
    }
}

/// Specifies a file to load, either required or optional
#[derive(Debug, Clone)]
pub enum FileSpec {
    /// A required file - error if not found
    Required(PathBuf),
    /// An optional file - silently skip if not found
    Optional(PathBuf),
}

impl FileSpec {
    pub fn required(path: impl Into<PathBuf>) -> Self {
        FileSpec::Required(path.into())
    }

    pub fn optional(path: impl Into<PathBuf>) -> Self {
        FileSpec::Optional(path.into())
    }

    pub fn path(&self) -> &FsPath {
        match self {
            FileSpec::Required(p) => p,
            FileSpec::Optional(p) => p,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FileSpec::Optional(_))
    }
}

impl<P: Into<PathBuf>> From<P> for FileSpec {
    fn from(path: P) -> Self {
        FileSpec::Required(path.into())
    }
}

/// Determine a format tag from a file extension
pub fn format_from_path(path: &FsPath) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Decodes and resolves configuration sources
#[derive(Clone)]
pub struct Loader {
    decoders: DecoderRegistry,
    preprocessor: Option<Arc<dyn Preprocessor>>,
    options: LoaderOptions,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Create a loader with the built-in decoders and default options
    pub fn new() -> Self {
        Self::with_options(LoaderOptions::default())
    }

    pub fn with_options(options: LoaderOptions) -> Self {
        Self {
            decoders: DecoderRegistry::with_builtins(),
            preprocessor: None,
            options,
        }
    }

    /// Replace the decoder table
    pub fn with_decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = decoders;
        self
    }

    /// Install a pre-processor applied to every source before decoding
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn decoders(&self) -> &DecoderRegistry {
        &self.decoders
    }

    pub fn decoders_mut(&mut self) -> &mut DecoderRegistry {
        &mut self.decoders
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Pre-process and decode text without resolving references
    pub fn decode(&self, text: &str, format: &str) -> Result<Value> {
        match &self.preprocessor {
            Some(pre) => {
                let rendered = pre.process(text)?;
                self.decoders.decode(format, &rendered)
            }
            None => self.decoders.decode(format, text),
        }
    }

    /// Load a config from text in the given format
    pub fn load_str(&self, text: &str, format: &str) -> Result<Config> {
        let value = self.decode(text, format)?;
        self.finish(value)
    }

    /// Load a config file; the format comes from its extension
    pub fn load_file(&self, path: impl AsRef<FsPath>) -> Result<Config> {
        let value = self.read_file(path.as_ref())?;
        self.finish(value)
    }

    /// Load and merge multiple required files
    ///
    /// Files are merged in order, later files overriding earlier ones; see
    /// [`Value::merge`]. References are resolved once, on the merged tree.
    pub fn load_merged<P: AsRef<FsPath>>(&self, paths: &[P]) -> Result<Config> {
        let specs: Vec<FileSpec> = paths
            .iter()
            .map(|p| FileSpec::Required(p.as_ref().to_path_buf()))
            .collect();
        self.load_merged_with_specs(&specs)
    }

    /// Load and merge multiple files, skipping optional files that do not exist
    pub fn load_merged_with_specs(&self, specs: &[FileSpec]) -> Result<Config> {
        let mut merged: Option<Value> = None;

        for spec in specs {
            let full_path = self.locate(spec.path());
            if spec.is_optional() && !full_path.exists() {
                log::debug!("Skipping missing optional file {}", full_path.display());
                continue;
            }

            let value = self.read_file(spec.path())?;
            match &mut merged {
                Some(base) => base.merge(value),
                None => merged = Some(value),
            }
        }

        self.finish(merged.unwrap_or_else(|| Value::Mapping(Mapping::new())))
    }

    fn locate(&self, path: &FsPath) -> PathBuf {
        match &self.options.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn read_file(&self, path: &FsPath) -> Result<Value> {
        let full_path = self.locate(path);
        let format = format_from_path(&full_path)
            .ok_or_else(|| Error::unsupported_format("(no extension)", &self.decoders.formats()))?;

        let content = std::fs::read_to_string(&full_path)
            .map_err(|e| Error::io(full_path.display().to_string(), e.to_string()))?;

        self.decode(&content, &format)
            .map_err(|e| e.with_help(format!("While loading {}", full_path.display())))
    }

    fn finish(&self, mut value: Value) -> Result<Config> {
        let report = match &self.options.resolve {
            Some(options) => resolver::resolve_with(&mut value, options)?,
            None => ResolveReport::default(),
        };
        Ok(Config::with_report(value, report))
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("decoders", &self.decoders)
            .field("preprocessor", &self.preprocessor.is_some())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_load_str_resolves() {
        let config = Loader::new()
            .load_str(
                r#"{"server": {"host": "localhost", "alias": "$ref:server.host"}}"#,
                "json",
            )
            .unwrap();
        assert_eq!(config.get_str("server.alias").unwrap(), "localhost");
    }

    #[test]
    fn test_load_str_without_resolution() {
        let loader = Loader::with_options(LoaderOptions::default().with_resolve(None));
        let config = loader.load_str("alias: $ref:host\nhost: h\n", "yaml").unwrap();
        assert_eq!(config.get_str("alias").unwrap(), "$ref:host");
    }

    #[test]
    fn test_preprocessor_runs_before_decoding() {
        let loader = Loader::new().with_preprocessor(Arc::new(|text: &str| -> Result<String> {
            Ok(text.replace("{{ env }}", "prod"))
        }));

        let config = loader.load_str("stage: \"{{ env }}\"\n", "yaml").unwrap();
        assert_eq!(config.get_str("stage").unwrap(), "prod");
    }

    #[test]
    fn test_preprocessor_error_propagates() {
        let loader = Loader::new().with_preprocessor(Arc::new(|_: &str| -> Result<String> {
            Err(Error::format("template", "unclosed tag"))
        }));

        let err = loader.load_str("{}", "json").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Format {
                format: "template".into()
            }
        );
    }

    #[test]
    fn test_unsupported_format() {
        let err = Loader::new().load_str("a = 1", "toml").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Format { .. }));
    }

    #[test]
    fn test_load_file_relative_to_base_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("app.xml"),
            "<app><db><host>db.local</host></db><primary>$ref:db.host</primary></app>",
        )
        .unwrap();

        let loader = Loader::with_options(LoaderOptions::default().with_base_path(dir.path()));
        let config = loader.load_file("app.xml").unwrap();

        assert_eq!(config.get_str("primary").unwrap(), "db.local");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Loader::with_options(LoaderOptions::default().with_base_path(dir.path()));

        let err = loader.load_file("missing.yaml").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
    }

    #[test]
    fn test_load_file_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config"), "a: 1").unwrap();

        let err = Loader::new().load_file(dir.path().join("config")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Format { .. }));
    }

    #[test]
    fn test_load_merged_resolves_after_merge() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.yaml"),
            "db:\n  host: localhost\n  port: 5432\napp:\n  db_host: $ref:db.host\n",
        )
        .unwrap();
        fs::write(dir.path().join("prod.json"), r#"{"db": {"host": "prod-db"}}"#).unwrap();

        let loader = Loader::with_options(LoaderOptions::default().with_base_path(dir.path()));
        let config = loader.load_merged(&["base.yaml", "prod.json"]).unwrap();

        assert_eq!(config.get_str("app.db_host").unwrap(), "prod-db");
        assert_eq!(config.get_i64("db.port").unwrap(), 5432);
    }

    #[test]
    fn test_load_merged_optional_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.yaml"), "a: 1\n").unwrap();

        let loader = Loader::with_options(LoaderOptions::default().with_base_path(dir.path()));
        let config = loader
            .load_merged_with_specs(&[
                FileSpec::required("base.yaml"),
                FileSpec::optional("local.yaml"),
            ])
            .unwrap();
        assert_eq!(config.get_i64("a").unwrap(), 1);

        let err = loader
            .load_merged_with_specs(&[FileSpec::required("local.yaml")])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(format_from_path(FsPath::new("a/b.YAML")).as_deref(), Some("yaml"));
        assert_eq!(format_from_path(FsPath::new("noext")), None);
    }
}
