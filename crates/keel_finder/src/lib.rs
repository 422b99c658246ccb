//! Source file discovery for the Keel scanner core.
//!
//! [`FileFinder`] turns a user-supplied file pattern — which may contain
//! shell-style wildcards in any path segment and may use either separator
//! convention — into a deduplicated, order-stable list of file paths.
//! Filesystem faults never abort a search; the affected directory is
//! logged at debug level and skipped.

#![warn(missing_docs)]

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use globset::{GlobBuilder, GlobMatcher};
use keel_config::ScanConfig;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Characters that trigger glob semantics in a path segment.
const WILDCARDS: [char; 3] = ['*', '?', '['];

/// Locates source files matching wildcard patterns.
///
/// Results accumulate across [`FileFinder::find_files`] calls in first-seen
/// order, deduplicated by full resolved path. Patterns are resolved against
/// the configured base path (empty in GUI mode, so patterns are taken as
/// given).
pub struct FileFinder {
    base_path: PathBuf,
    results: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl FileFinder {
    /// Creates an empty finder resolving patterns against the configured
    /// base path.
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            base_path: config.base_path().to_path_buf(),
            results: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Creates a finder and immediately runs a non-recursive search.
    ///
    /// A pattern that names a directory is logged as a warning and skipped,
    /// leaving the finder empty.
    pub fn with_pattern(config: &ScanConfig, pattern: &str) -> Self {
        let mut finder = Self::new(config);
        if Path::new(pattern).is_dir() {
            warn!(pattern, "file pattern is a directory");
        } else {
            finder.find_files(pattern, false);
        }
        finder
    }

    /// Finds all files matching `pattern`, case-insensitively.
    ///
    /// Accepts both `/` and `\` separators. Wildcards in the directory
    /// portion expand to every matching existing directory (processed in
    /// sorted order); without wildcards the directory is targeted exactly.
    /// A missing directory or empty expansion is a silent no-op. With
    /// `recursive` set each resolved directory is walked fully; otherwise
    /// only its single-level listing is matched.
    pub fn find_files(&mut self, pattern: &str, recursive: bool) {
        let normalized = pattern.replace(['\\', '/'], &MAIN_SEPARATOR.to_string());
        let search_path = lexical_normalize(&self.base_path.join(normalized));

        let Some(file_pattern) = search_path.file_name().map(|n| n.to_string_lossy().into_owned())
        else {
            return;
        };
        let search_dir = match search_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let dirs = if has_wildcards(&search_dir.to_string_lossy()) {
            expand_wildcard_dirs(&search_dir)
        } else if search_dir.is_dir() {
            vec![search_dir]
        } else {
            return;
        };
        if dirs.is_empty() {
            return;
        }

        let matcher = match GlobBuilder::new(&file_pattern).case_insensitive(true).build() {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                debug!(pattern = %file_pattern, error = %e, "invalid file pattern");
                return;
            }
        };

        for dir in &dirs {
            if recursive {
                self.search_recursive(dir, &matcher);
            } else {
                self.search_flat(dir, &matcher);
            }
        }
    }

    /// Matches the single-level listing of `dir`, in sorted entry order.
    fn search_flat(&mut self, dir: &Path, matcher: &GlobMatcher) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "finder failed to list directory");
                return;
            }
        };

        let mut names: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name())
            .collect();
        names.sort();

        for name in names {
            if matcher.is_match(&name) {
                self.push_result(dir.join(name));
            }
        }
    }

    /// Matches every file under `dir`, walking in sorted order.
    fn search_recursive(&mut self, dir: &Path, matcher: &GlobMatcher) {
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Abandon this directory's walk; remaining directories
                    // are still searched.
                    debug!(dir = %dir.display(), error = %e, "finder failed during walk");
                    return;
                }
            };
            if entry.file_type().is_file() && matcher.is_match(entry.file_name()) {
                self.push_result(entry.into_path());
            }
        }
    }

    fn push_result(&mut self, path: PathBuf) {
        if self.seen.insert(path.clone()) {
            self.results.push(path);
        }
    }

    /// The accumulated matches, in first-seen order.
    pub fn results(&self) -> &[PathBuf] {
        &self.results
    }

    /// Takes the accumulated matches, leaving the finder empty.
    pub fn take_results(&mut self) -> Vec<PathBuf> {
        self.seen.clear();
        std::mem::take(&mut self.results)
    }
}

/// Returns `true` if the string contains any glob metacharacter.
fn has_wildcards(segment: &str) -> bool {
    segment.contains(WILDCARDS)
}

/// Resolves `.` and `..` components lexically, without touching the
/// filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(comp),
            },
            other => parts.push(other),
        }
    }
    let mut out = PathBuf::new();
    for part in parts {
        out.push(part.as_os_str());
    }
    out
}

/// Expands a directory path containing wildcards to the sorted list of
/// existing directories it matches.
///
/// Each wildcard segment is matched against the directory entries of the
/// paths accumulated so far; unreadable directories are logged and skipped.
fn expand_wildcard_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut bases = vec![PathBuf::new()];

    for comp in dir.components() {
        match comp {
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                for base in &mut bases {
                    base.push(comp.as_os_str());
                }
            }
            Component::CurDir => {}
            Component::Normal(segment) => {
                let segment = segment.to_string_lossy();
                if !has_wildcards(&segment) {
                    for base in &mut bases {
                        base.push(segment.as_ref());
                    }
                    continue;
                }

                let matcher = match GlobBuilder::new(&segment).build() {
                    Ok(glob) => glob.compile_matcher(),
                    Err(e) => {
                        debug!(pattern = %segment, error = %e, "invalid directory pattern");
                        return Vec::new();
                    }
                };

                let mut expanded = Vec::new();
                for base in &bases {
                    let listing = if base.as_os_str().is_empty() {
                        Path::new(".")
                    } else {
                        base.as_path()
                    };
                    let entries = match std::fs::read_dir(listing) {
                        Ok(entries) => entries,
                        Err(e) => {
                            debug!(dir = %listing.display(), error = %e, "finder failed to expand directory pattern");
                            continue;
                        }
                    };
                    for entry in entries.filter_map(|entry| entry.ok()) {
                        if entry.path().is_dir() && matcher.is_match(entry.file_name()) {
                            expanded.push(base.join(entry.file_name()));
                        }
                    }
                }
                bases = expanded;
                if bases.is_empty() {
                    return Vec::new();
                }
            }
        }
    }

    bases.retain(|base| base.is_dir());
    bases.sort();
    bases
}
