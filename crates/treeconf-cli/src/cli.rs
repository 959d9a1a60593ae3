//! treeconf CLI - inspect configuration trees from the command line
//!
//! Usage:
//!   treeconf get config.yaml database.host
//!   treeconf dump base.yaml prod.json --format json
//!   treeconf check config.xml
//!   treeconf refs config.yaml

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use treeconf_core::{
    Config, Loader, LoaderOptions, ResolveOptions, ResolvePolicy, Value, ValueKind,
};

/// treeconf - Configuration trees with cross-references
#[derive(Parser)]
#[command(name = "treeconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a specific value from the configuration
    Get {
        /// Configuration file
        file: PathBuf,

        /// Path to the value (e.g., database.host)
        path: String,

        /// Required kind: any, string, integer, float, number, bool, scalar, sequence, mapping
        #[arg(short, long, default_value = "any")]
        kind: String,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Default value if the path is absent
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Export the merged configuration
    Dump {
        /// Configuration file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Keep reference markers instead of resolving them
        #[arg(long)]
        raw: bool,

        /// Follow chained references to their end
        #[arg(long, conflicts_with = "raw")]
        chained: bool,

        /// Also resolve markers inside sequences
        #[arg(long, conflicts_with = "raw")]
        sequences: bool,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Quick syntax check without resolving references
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the reference markers in a file before resolution
    Refs {
        /// Configuration file
        file: PathBuf,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Get {
            file,
            path,
            kind,
            format,
            default,
        } => cmd_get(file, &path, &kind, &format, default),

        Commands::Dump {
            files,
            format,
            raw,
            chained,
            sequences,
            output,
        } => {
            let resolve = if raw {
                None
            } else {
                Some(resolve_options(chained, sequences))
            };
            cmd_dump(files, &format, resolve, output)
        }

        Commands::Check { files } => cmd_check(files),

        Commands::Refs { file } => cmd_refs(file),
    }
}

fn resolve_options(chained: bool, sequences: bool) -> ResolveOptions {
    let policy = if chained {
        ResolvePolicy::Chained
    } else {
        ResolvePolicy::SingleHop
    };
    ResolveOptions::default()
        .with_policy(policy)
        .with_descend_sequences(sequences)
}

fn load_config(files: &[PathBuf], resolve: Option<ResolveOptions>) -> Result<Config, String> {
    if files.is_empty() {
        return Err("No configuration files specified".to_string());
    }

    let loader = Loader::with_options(LoaderOptions::default().with_resolve(resolve));
    loader.load_merged(files).map_err(|e| {
        let names: Vec<_> = files.iter().map(|f| f.display().to_string()).collect();
        format!("Failed to load {}: {}", names.join(", "), e)
    })
}

/// Warn about markers that a resolution pass soft-missed
fn warn_missing(config: &Config) {
    for path in &config.report().missing {
        eprintln!(
            "{} reference at '{}' points to a missing value",
            "warning:".yellow(),
            path
        );
    }
}

/// Render a value for the `text`, `json` or `yaml` output formats
fn render_value(value: &Value, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
        "yaml" => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        _ => match value {
            Value::String(s) => Ok(format!("{}\n", s)),
            Value::Integer(_) | Value::Float(_) | Value::Bool(_) | Value::Null => {
                Ok(format!("{}\n", value))
            }
            // Complex values fall back to YAML
            _ => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        },
    }
}

fn write_output(content: &str, output: Option<PathBuf>) -> ExitCode {
    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }
    ExitCode::SUCCESS
}

fn cmd_get(
    file: PathBuf,
    path: &str,
    kind: &str,
    format: &str,
    default: Option<String>,
) -> ExitCode {
    let kind: ValueKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(1);
        }
    };

    let config = match load_config(&[file], Some(ResolveOptions::default())) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };
    warn_missing(&config);

    let value = match (config.get_optional(path), default) {
        (Ok(Some(v)), _) => match config.get(path, kind) {
            Ok(_) => v.clone(),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        },
        (Ok(None), Some(default_val)) => Value::String(default_val),
        (Ok(None), None) => {
            eprintln!("{}: Path '{}' not found", "Error".red(), path);
            return ExitCode::from(1);
        }
        (Err(e), _) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(1);
        }
    };

    match render_value(&value, format) {
        Ok(content) => write_output(&content, None),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_dump(
    files: Vec<PathBuf>,
    format: &str,
    resolve: Option<ResolveOptions>,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(&files, resolve) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };
    warn_missing(&config);

    let result = match format {
        "json" => config.to_json().map(|s| s + "\n"),
        _ => config.to_yaml(),
    };

    match result {
        Ok(content) => write_output(&content, output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let loader = Loader::with_options(LoaderOptions::default().with_resolve(None));
    let mut all_valid = true;

    for file in files {
        match loader.load_file(&file) {
            Ok(_) => {
                let format = treeconf_core::loader::format_from_path(&file)
                    .unwrap_or_default()
                    .to_uppercase();
                println!("{} {}: valid {}", "✓".green(), file.display(), format);
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn cmd_refs(file: PathBuf) -> ExitCode {
    let config = match load_config(&[file], None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let refs = config.references();
    if refs.is_empty() {
        eprintln!("No references found");
    }
    for (location, target) in refs {
        let status = match config.get_optional(&target) {
            Ok(Some(_)) => "✓".green(),
            _ => "✗".red(),
        };
        println!("{} {} -> {}", status, location, target);
    }
    ExitCode::SUCCESS
}
