// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::errors::{FileExecError, Result};
use crate::fs::FileSystem;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A compiled filesystem glob.
///
/// Semantics follow the usual unix rules: `*`, `?` and `[...]` never cross a
/// path separator, while `**` is a "super asterisk" that matches across
/// directories:
///
/// - `/var/log/**.log`   -> every `.log` file below `/var/log`
/// - `/var/log/*/*.log`  -> `.log` files with a parent dir in `/var/log`
/// - `/var/log/app.log`  -> just that file
///
/// Expansion walks the filesystem from the longest literal directory prefix
/// of the pattern, descending only as deep as the pattern can match.
#[derive(Clone)]
pub struct GlobPattern {
    pattern: String,
    base: PathBuf,
    matcher: Option<GlobMatcher>,
    max_depth: Option<usize>,
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobPattern")
            .field("pattern", &self.pattern)
            .field("base", &self.base)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl GlobPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let Some(meta_idx) = pattern.find(GLOB_META) else {
            // No wildcards: the pattern names exactly one path.
            return Ok(Self {
                pattern: pattern.to_string(),
                base: PathBuf::from(pattern),
                matcher: None,
                max_depth: Some(0),
            });
        };

        let (base, rest) = match pattern[..meta_idx].rfind('/') {
            Some(0) => ("/", &pattern[1..]),
            Some(slash) => (&pattern[..slash], &pattern[slash + 1..]),
            None => ("", pattern),
        };

        let max_depth = if rest.contains("**") {
            None
        } else {
            Some(rest.split('/').filter(|c| !c.is_empty()).count())
        };

        let normalized = normalize_super_asterisk(pattern);
        let glob = GlobBuilder::new(&normalized)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map_err(|source| FileExecError::GlobCompile {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            base: PathBuf::from(base),
            matcher: Some(glob.compile_matcher()),
            max_depth,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns true if the pattern contains no wildcards.
    pub fn is_literal(&self) -> bool {
        self.matcher.is_none()
    }

    /// Whether `path` (as produced by [`GlobPattern::expand`]) matches.
    pub fn is_match(&self, path: &Path) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(path_str(path)),
            None => path == self.base,
        }
    }

    /// All existing filesystem entries matching this pattern, in
    /// lexicographic order.
    ///
    /// A missing or unreadable base directory simply yields no matches.
    pub fn expand(&self, fs: &dyn FileSystem) -> Vec<PathBuf> {
        let Some(matcher) = &self.matcher else {
            return if fs.exists(&self.base) {
                vec![self.base.clone()]
            } else {
                Vec::new()
            };
        };

        let mut matches = Vec::new();
        let mut stack: Vec<(PathBuf, usize)> = vec![(self.base.clone(), 0)];

        while let Some((dir, depth)) = stack.pop() {
            let listing_dir = if dir.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                dir.clone()
            };

            let entries = match fs.read_dir(&listing_dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(pattern = %self.pattern, dir = ?listing_dir, error = %err, "skipping unreadable directory");
                    continue;
                }
            };

            for entry in entries {
                let Some(name) = entry.file_name() else {
                    continue;
                };
                // Keep relative patterns relative: "a.log", not "./a.log".
                let path = dir.join(name);
                let child_depth = depth + 1;

                if matcher.is_match(path_str(&path)) {
                    matches.push(path.clone());
                }

                let can_descend = self.max_depth.is_none_or(|max| child_depth < max);
                if can_descend && fs.is_dir(&path) {
                    stack.push((path, child_depth));
                }
            }
        }

        matches.sort();
        matches.dedup();
        matches
    }
}

/// Convert a path into a string with forward slashes for matching.
fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Rewrite `**` that is glued to other characters inside a path component
/// (e.g. `logs/**.log`) into a form where `**` is a whole component, which is
/// the only place a recursive wildcard is meaningful to the matcher.
///
/// `pre**suf` becomes `{pre*suf,pre*/**/*suf}`: either within the component
/// itself or spanning one or more directories.
fn normalize_super_asterisk(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|component| {
            if component == "**" || !component.contains("**") {
                return component.to_string();
            }
            let (pre, suf) = component
                .split_once("**")
                .unwrap_or((component, ""));
            if pre.is_empty() {
                format!("**/*{suf}")
            } else {
                format!("{{{pre}*{suf},{pre}*/**/*{suf}}}")
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
