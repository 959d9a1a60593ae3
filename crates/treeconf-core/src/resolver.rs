//! Reference resolution
//!
//! A string scalar of the form `$ref:path.to.node` is a reference marker.
//! [`resolve`] walks the tree depth-first over mapping nesting and replaces
//! every marker with the value found at the target path of the same root.
//!
//! Semantics:
//! - Every lookup reads a snapshot of the root taken before the pass, so the
//!   result never depends on the order in which sibling keys are visited.
//! - A target that does not exist resolves to `Value::Null` (soft-miss) and is
//!   recorded in the [`ResolveReport`].
//! - With [`ResolvePolicy::SingleHop`] (the default) a target is copied as-is:
//!   if it is itself a marker, or a subtree containing markers, those are left
//!   for a later pass. Cycles therefore terminate trivially.
//! - With [`ResolvePolicy::Chained`] marker-to-marker chains are followed and
//!   copied subtrees are expanded, and a chain that revisits a path fails
//!   with a cycle error.
//! - Sequence elements are only visited when
//!   [`ResolveOptions::descend_sequences`] is set.

use std::sync::OnceLock;

use regex::Regex;

use crate::access;
use crate::error::{Error, Result};
use crate::path::Path;
use crate::value::Value;

/// Prefix that marks a string scalar as a reference
pub const REFERENCE_PREFIX: &str = "$ref:";

static MARKER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn marker_pattern() -> &'static Regex {
    MARKER_PATTERN.get_or_init(|| {
        Regex::new(r"^\$ref:(.+)$").expect("reference marker pattern is valid")
    })
}

/// Parse a reference marker, returning the path it points at
pub fn parse_reference(value: &Value) -> Option<Path> {
    let s = value.as_str()?;
    let captures = marker_pattern().captures(s)?;
    captures.get(1).map(|m| Path::parse(m.as_str()))
}

/// Check whether a value is a reference marker
pub fn is_reference(value: &Value) -> bool {
    parse_reference(value).is_some()
}

/// How far a single pass follows references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvePolicy {
    /// Substitute exactly one level of indirection
    #[default]
    SingleHop,
    /// Follow chains of references to a final value, failing on cycles
    Chained,
}

/// Options controlling a resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub policy: ResolvePolicy,
    /// Also substitute markers found inside sequences
    pub descend_sequences: bool,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_descend_sequences(mut self, descend: bool) -> Self {
        self.descend_sequences = descend;
        self
    }
}

/// Summary of a resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Number of markers replaced (including soft-misses)
    pub substituted: usize,
    /// Paths of markers whose target was absent
    pub missing: Vec<String>,
}

/// Resolve all references in `tree` in place with the default options
pub fn resolve(tree: &mut Value) -> Result<ResolveReport> {
    resolve_with(tree, &ResolveOptions::default())
}

/// Resolve all references in `tree` in place
pub fn resolve_with(tree: &mut Value, options: &ResolveOptions) -> Result<ResolveReport> {
    let snapshot = tree.clone();
    let mut pass = Pass {
        snapshot: &snapshot,
        options,
        report: ResolveReport::default(),
    };

    log::debug!("Resolving references ({:?})", options.policy);
    pass.walk(tree, &Path::root())?;
    log::debug!(
        "Resolved {} reference(s), {} missing",
        pass.report.substituted,
        pass.report.missing.len()
    );

    Ok(pass.report)
}

/// List every marker a pass with `options` would visit, as (location, target)
pub fn find_references(tree: &Value, options: &ResolveOptions) -> Vec<(Path, Path)> {
    let mut found = Vec::new();
    collect_references(tree, &Path::root(), options, &mut found);
    found
}

fn collect_references(
    value: &Value,
    at: &Path,
    options: &ResolveOptions,
    found: &mut Vec<(Path, Path)>,
) {
    let children: Vec<(Path, &Value)> = match value {
        Value::Mapping(map) => map.iter().map(|(k, v)| (at.child(k.as_str()), v)).collect(),
        Value::Sequence(seq) if options.descend_sequences => seq
            .iter()
            .enumerate()
            .map(|(i, v)| (at.child(i.to_string()), v))
            .collect(),
        _ => return,
    };

    for (path, child) in children {
        match parse_reference(child) {
            Some(target) => found.push((path, target)),
            None => collect_references(child, &path, options, found),
        }
    }
}

struct Pass<'a> {
    snapshot: &'a Value,
    options: &'a ResolveOptions,
    report: ResolveReport,
}

impl<'a> Pass<'a> {
    fn walk(&mut self, value: &mut Value, at: &Path) -> Result<()> {
        match value {
            Value::Mapping(map) => {
                for (key, child) in map.iter_mut() {
                    let child_path = at.child(key.as_str());
                    self.visit(child, &child_path)?;
                }
            }
            Value::Sequence(seq) if self.options.descend_sequences => {
                for (i, child) in seq.iter_mut().enumerate() {
                    let child_path = at.child(i.to_string());
                    self.visit(child, &child_path)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn visit(&mut self, value: &mut Value, at: &Path) -> Result<()> {
        match parse_reference(value) {
            Some(target) => {
                let resolved = self.substitute(at, target)?;
                *value = resolved;
                self.report.substituted += 1;
                Ok(())
            }
            None => self.walk(value, at),
        }
    }

    fn substitute(&mut self, at: &Path, target: Path) -> Result<Value> {
        match self.options.policy {
            ResolvePolicy::SingleHop => match self.fetch(&target) {
                Some(found) => {
                    log::trace!("{} -> {}", at, target);
                    Ok(found.clone())
                }
                None => Ok(self.soft_miss(at, &target)),
            },
            ResolvePolicy::Chained => {
                let mut chain = vec![at.to_string()];
                self.follow(at, target, &mut chain)
            }
        }
    }

    /// Follow `target` to a non-marker value, expanding any copied subtree
    fn follow(&mut self, origin: &Path, target: Path, chain: &mut Vec<String>) -> Result<Value> {
        let key = target.to_string();
        if chain.contains(&key) {
            let mut cycle = chain.clone();
            cycle.push(key);
            return Err(Error::cycle_detected(origin.to_string(), cycle));
        }

        let Some(found) = self.fetch(&target) else {
            return Ok(self.soft_miss(origin, &target));
        };

        chain.push(key);
        let result = match parse_reference(found) {
            Some(next) => self.follow(origin, next, chain),
            None => {
                log::trace!("{} -> {}", origin, target);
                let mut copy = found.clone();
                self.expand(&mut copy, origin, chain).map(|_| copy)
            }
        };
        chain.pop();

        result
    }

    /// Replace markers inside a copied subtree, sharing the caller's chain
    fn expand(&mut self, value: &mut Value, origin: &Path, chain: &mut Vec<String>) -> Result<()> {
        let children: Vec<&mut Value> = match value {
            Value::Mapping(map) => map.values_mut().collect(),
            Value::Sequence(seq) if self.options.descend_sequences => seq.iter_mut().collect(),
            _ => return Ok(()),
        };

        for child in children {
            match parse_reference(child) {
                Some(target) => *child = self.follow(origin, target, chain)?,
                None => self.expand(child, origin, chain)?,
            }
        }
        Ok(())
    }

    fn fetch(&self, target: &Path) -> Option<&'a Value> {
        access::lookup(self.snapshot, target).ok().flatten()
    }

    fn soft_miss(&mut self, at: &Path, target: &Path) -> Value {
        log::warn!("Reference at '{}' points to missing path '{}'", at, target);
        self.report.missing.push(at.to_string());
        Value::Null
    }
}
