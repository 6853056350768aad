//! Copybook lookup and expansion bookkeeping.
//!
//! Copybook names resolve against an ordered list of directories. Within a
//! directory, any file whose stem equals the requested name
//! (case-insensitively) and whose extension is on the configured list is a
//! candidate; the extension list order breaks ties. The first directory
//! with a candidate wins.
//!
//! The resolver also carries the stack of names currently being expanded
//! (re-entry is a [`AsgError::RecursiveCopybook`]) and a cache of finished
//! expansions keyed by name and a digest of the search path, valid for one
//! preprocessor invocation. Expansions are cached as logical lines rather
//! than joined text, so a trailing blank line (a blanked comment at the
//! end of a copybook) survives repeated inclusion.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::error::{AsgError, Result};
use crate::span::Location;

/// Resolves copybook names to files and tracks expansion state.
#[derive(Debug)]
pub struct CopybookResolver {
    dirs: Vec<PathBuf>,
    extensions: Vec<String>,
    max_depth: usize,
    stack: Vec<String>,
    cache: HashMap<(String, u64), Vec<String>>,
    dirs_digest: u64,
}

impl CopybookResolver {
    /// Create a resolver over an ordered directory list.
    pub fn new(dirs: Vec<PathBuf>, extensions: Vec<String>, max_depth: usize) -> Self {
        let mut hasher = DefaultHasher::new();
        for dir in &dirs {
            dir.hash(&mut hasher);
        }
        let dirs_digest = hasher.finish();
        Self {
            dirs,
            extensions,
            max_depth,
            stack: Vec::new(),
            cache: HashMap::new(),
            dirs_digest,
        }
    }

    /// Find the file for a copybook name.
    pub fn resolve(&self, name: &str, location: &Location) -> Result<PathBuf> {
        for dir in &self.dirs {
            if let Some(path) = self.resolve_in(dir, name) {
                return Ok(path);
            }
        }
        Err(AsgError::CopybookNotFound {
            name: name.to_string(),
            searched: self.dirs.clone(),
            location: location.clone(),
        })
    }

    /// Find the best candidate within one directory.
    fn resolve_in(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;

        let mut candidates: Vec<(usize, String, PathBuf)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s,
                None => continue,
            };
            if !stem.eq_ignore_ascii_case(name) {
                continue;
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_default();
            if let Some(priority) = self.extensions.iter().position(|allowed| *allowed == ext) {
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                candidates.push((priority, file_name, path));
            }
        }

        candidates.sort();
        candidates.into_iter().next().map(|(_, _, path)| path)
    }

    /// Enter a copybook expansion, checking the cycle and depth limits.
    pub fn push(&mut self, name: &str, location: &Location) -> Result<()> {
        let upper = name.to_ascii_uppercase();
        if self.stack.contains(&upper) {
            let mut chain = self.stack.clone();
            chain.push(upper);
            return Err(AsgError::RecursiveCopybook {
                chain,
                location: location.clone(),
            });
        }
        if self.stack.len() >= self.max_depth {
            return Err(AsgError::CopyDepthExceeded {
                max_depth: self.max_depth,
                location: location.clone(),
            });
        }
        self.stack.push(upper);
        Ok(())
    }

    /// Leave the innermost copybook expansion.
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Look up a finished expansion from this invocation.
    pub fn cached(&self, name: &str) -> Option<&[String]> {
        self.cache
            .get(&(name.to_ascii_lowercase(), self.dirs_digest))
            .map(|lines| lines.as_slice())
    }

    /// Record a finished expansion.
    pub fn insert_cache(&mut self, name: &str, expanded: Vec<String>) {
        self.cache
            .insert((name.to_ascii_lowercase(), self.dirs_digest), expanded);
    }
}
