//! Include/exclude filtering of operations by path regex and HTTP method.

use regex::Regex;
use tracing::warn;

use crate::config::ApiConfig;

/// Compile path patterns, skipping (and logging) any that are not valid regexes
pub fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Skipping invalid path pattern");
                None
            }
        })
        .collect()
}

/// Whether `path` passes the include/exclude path patterns.
///
/// An empty include list admits every path; any exclude match rejects.
pub fn should_include_path(path: &str, include: &[Regex], exclude: &[Regex]) -> bool {
    let included = include.is_empty() || include.iter().any(|re| re.is_match(path));
    included && !exclude.iter().any(|re| re.is_match(path))
}

/// Whether `method` passes the include/exclude method lists (exact, case-insensitive)
pub fn should_include_method(method: &str, include: &[String], exclude: &[String]) -> bool {
    let method = method.trim();
    let matches = |candidate: &String| candidate.trim().eq_ignore_ascii_case(method);
    let included = include.is_empty() || include.iter().any(matches);
    included && !exclude.iter().any(matches)
}

/// Pre-compiled filters for one compilation pass
#[derive(Debug, Clone, Default)]
pub struct OperationFilter {
    include_paths: Vec<Regex>,
    exclude_paths: Vec<Regex>,
    include_methods: Vec<String>,
    exclude_methods: Vec<String>,
}

impl OperationFilter {
    pub fn new(
        include_paths: &[String],
        exclude_paths: &[String],
        include_methods: &[String],
        exclude_methods: &[String],
    ) -> Self {
        Self {
            include_paths: compile_patterns(include_paths),
            exclude_paths: compile_patterns(exclude_paths),
            include_methods: include_methods.to_vec(),
            exclude_methods: exclude_methods.to_vec(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            &config.include_paths,
            &config.exclude_paths,
            &config.include_methods,
            &config.exclude_methods,
        )
    }

    pub fn include_path(&self, path: &str) -> bool {
        should_include_path(path, &self.include_paths, &self.exclude_paths)
    }

    pub fn include_method(&self, method: &str) -> bool {
        should_include_method(method, &self.include_methods, &self.exclude_methods)
    }

    /// Whether the `(path, method)` operation is eligible for a tool
    pub fn admits(&self, path: &str, method: &str) -> bool {
        self.include_path(path) && self.include_method(method)
    }
}
