//! Resolve include/exclude patterns to a sorted set of files.
//!
//! Each include glob is walked from its literal prefix (the leading components without glob
//! metacharacters). `*` never crosses a `/`; `**` matches any number of directories. A path
//! matches when the glob matches and, if given, the regex finds a match anywhere in the path.

use anyhow::Result;
use globset::{GlobBuilder, GlobMatcher};
use log::{debug, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::config::{IncludeSpec, InitialLoadConfig};
use crate::TrackError;
use crate::engine::tools::{is_os_hidden_file, path_to_db_string};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Matched path (forward slashes, as written relative to the pattern) → tags from its include specs.
pub type MatchSet = BTreeMap<String, Vec<String>>;

/// One compiled include spec.
struct IncludeMatcher {
    spec: IncludeSpec,
    glob: GlobMatcher,
    regex: Option<Regex>,
    base: PathBuf,
    /// Base was not written in the pattern (`*.csv`); walked paths drop the leading `./`.
    implicit_base: bool,
    max_depth: Option<usize>,
    allow_hidden: bool,
}

impl IncludeMatcher {
    fn compile(spec: &IncludeSpec) -> Result<Self, TrackError> {
        let pattern = spec.path.replace('\\', "/");
        let glob = compile_glob(&pattern)?;
        let regex = spec
            .regex
            .as_deref()
            .map(|r| Regex::new(r).map_err(|e| TrackError::invalid_pattern(r, e)))
            .transpose()?;

        let components: Vec<&str> = pattern.split('/').collect();
        let literal_len = components
            .iter()
            .take_while(|c| !c.contains(GLOB_META))
            .count();
        let (base, implicit_base) = match literal_len {
            0 => (PathBuf::from("."), true),
            n if n == components.len() => (PathBuf::from(&pattern), false),
            n if n == 1 && components[0].is_empty() => (PathBuf::from("/"), false),
            n => (PathBuf::from(components[..n].join("/")), false),
        };
        let max_depth = (!pattern.contains("**")).then(|| components.len() - literal_len);

        Ok(Self {
            spec: spec.clone(),
            glob,
            regex,
            base,
            implicit_base,
            max_depth,
            allow_hidden: mentions_hidden(&components[literal_len..]),
        })
    }

    fn matches(&self, candidate: &str) -> bool {
        self.glob.is_match(candidate) && self.regex.as_ref().is_none_or(|r| r.is_match(candidate))
    }

    /// Candidate path strings under this matcher's base. Symlinks are followed; walk errors
    /// (broken links, link loops) are logged and skipped.
    fn candidates(&self) -> Vec<String> {
        if self.base.is_file() {
            return vec![path_to_db_string(&self.base)];
        }
        if !self.base.is_dir() {
            debug!("Pattern base {} does not exist", self.base.display());
            return Vec::new();
        }
        let mut walker = WalkDir::new(&self.base).follow_links(true);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }
        let allow_hidden = self.allow_hidden;
        let mut out = Vec::new();
        let iter = walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || allow_hidden || !is_dot_name(e.path()));
        for entry in iter {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!("Skipping unreadable path: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() || is_os_hidden_file(entry.path()) {
                continue;
            }
            let path = if self.implicit_base {
                entry.path().strip_prefix(".").unwrap_or(entry.path())
            } else {
                entry.path()
            };
            out.push(path_to_db_string(path));
        }
        out
    }
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher, TrackError> {
    let glob = GlobBuilder::new(pattern).literal_separator(true).build()?;
    Ok(glob.compile_matcher())
}

fn is_dot_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// The walked part of the pattern names a dot-component itself (`*/.cache/*.csv`), so hidden
/// entries are walked too.
fn mentions_hidden(walked: &[&str]) -> bool {
    walked
        .iter()
        .any(|c| c.starts_with('.') && *c != "." && *c != "..")
}

/// Exclusion globs, matched against the full path string and the file name.
struct ExcludeSet {
    globs: Vec<GlobMatcher>,
}

impl ExcludeSet {
    fn compile(patterns: &[String]) -> Result<Self, TrackError> {
        let globs = patterns
            .iter()
            .map(|p| compile_glob(&p.replace('\\', "/")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { globs })
    }

    fn is_excluded(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.globs
            .iter()
            .any(|g| g.is_match(path) || g.is_match(name))
    }
}

/// Union of the include matches minus the exclusions, sorted by path.
///
/// Returns [`TrackError::InvalidPattern`] for a malformed glob or regex and
/// [`TrackError::NoMatch`] when nothing remains.
pub fn collect_matches(config: &InitialLoadConfig) -> Result<MatchSet, TrackError> {
    let specs = config.include_specs();
    if specs.is_empty() {
        return Err(TrackError::InvalidConfig(
            "initial_load needs a path or at least one include".to_string(),
        ));
    }
    let matchers = specs
        .iter()
        .map(IncludeMatcher::compile)
        .collect::<Result<Vec<_>, _>>()?;
    let excludes = ExcludeSet::compile(&config.exclude)?;

    let mut set = MatchSet::new();
    for matcher in &matchers {
        let mut hits = 0_usize;
        for candidate in matcher.candidates() {
            if !matcher.matches(&candidate) || excludes.is_excluded(&candidate) {
                continue;
            }
            hits += 1;
            let tags = set.entry(candidate).or_default();
            for tag in &matcher.spec.tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        debug!("Pattern {} matched {} file(s)", matcher.spec.path, hits);
    }

    if set.is_empty() {
        let patterns: Vec<&str> = specs.iter().map(|s| s.path.as_str()).collect();
        return Err(TrackError::NoMatch(patterns.join(", ")));
    }
    Ok(set)
}
