// src/exec/expand.rs

//! Command template expansion.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::FileExecError;
use crate::fs::FileSystem;
use crate::watch::patterns::GlobPattern;

/// Token replaced by the changed file's path in every command template.
pub const FILEPATH_PLACEHOLDER: &str = "{filepath}";

/// Concrete command lines for one changed file, plus any templates that had
/// to be skipped.
#[derive(Debug, Default)]
pub struct Expansion {
    pub commands: Vec<String>,
    pub errors: Vec<FileExecError>,
}

/// Turns command templates into runnable command lines.
///
/// A template is split at its first space into an executable and the rest.
/// The executable may be a glob (`/opt/collectors/*.sh {filepath}`): each
/// match becomes its own command line, in lexicographic order. When nothing
/// matches, the template is used as-is and the executable is left for `PATH`
/// lookup. Finally every `{filepath}` is replaced by the changed path.
#[derive(Debug, Clone)]
pub struct CommandExpander {
    fs: Arc<dyn FileSystem>,
}

impl CommandExpander {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn expand(&self, templates: &[String], changed_path: &Path) -> Expansion {
        let changed = changed_path.to_string_lossy();
        let mut expansion = Expansion::default();

        for template in templates {
            let (program, args) = match template.split_once(' ') {
                Some((program, args)) => (program, Some(args)),
                None => (template.as_str(), None),
            };

            let pattern = match GlobPattern::compile(program) {
                Ok(p) => p,
                Err(err) => {
                    warn!(template = %template, error = %err, "skipping command template");
                    expansion.errors.push(err);
                    continue;
                }
            };

            let matches = pattern.expand(self.fs.as_ref());
            if matches.is_empty() {
                // Assume the executable lives on PATH and run it as written.
                expansion
                    .commands
                    .push(substitute_placeholder(template, &changed));
                continue;
            }

            for program in matches {
                let program = program.to_string_lossy();
                let line = match args {
                    Some(args) => format!("{program} {args}"),
                    None => program.into_owned(),
                };
                expansion.commands.push(substitute_placeholder(&line, &changed));
            }
        }

        debug!(path = %changed, commands = ?expansion.commands, "expanded command templates");
        expansion
    }
}

/// Replace every occurrence of [`FILEPATH_PLACEHOLDER`] with `path`.
pub fn substitute_placeholder(template: &str, path: &str) -> String {
    template.replace(FILEPATH_PLACEHOLDER, path)
}
