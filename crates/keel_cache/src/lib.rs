//! Persistent parse-result cache for the Keel scanner core.
//!
//! Maps a file path to the content fingerprint and plain-data scan
//! snapshot from its last scan, letting callers skip re-scanning
//! unchanged files across process invocations. All reads are fail-safe:
//! a corrupt, truncated, or incompatible cache file results in starting
//! empty, never in an error — caching is a performance optimization,
//! never a correctness requirement.

#![warn(missing_docs)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use keel_common::Fingerprint;
use keel_config::ScanConfig;
use keel_scan::{ScanSnapshot, SourceScanner};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Magic bytes identifying a Keel parse-cache file.
const CACHE_MAGIC: [u8; 4] = *b"KEEL";

/// Cache file format version. Increment on breaking changes; older or
/// newer files then fail closed to an empty cache.
const CACHE_FORMAT_VERSION: u32 = 1;

/// One cached scan result.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    /// Fingerprint of the file content when it was last scanned.
    fingerprint: Fingerprint,

    /// The scan snapshot produced from that content.
    snapshot: ScanSnapshot,
}

/// Content-fingerprint-keyed store of scan snapshots.
///
/// Keys are file paths used verbatim — not case-normalized, since on a
/// case-sensitive filesystem two differently-cased paths are genuinely
/// different files. Fingerprinting content rather than trusting mtimes
/// avoids false misses from touched-but-unchanged files and false hits
/// from copies that preserve timestamps.
///
/// The cache is a single-threaded owner; concurrent scan phases merge
/// their results afterwards or wrap the cache in a mutex.
pub struct ParseCache {
    cache_file: Option<PathBuf>,
    entries: HashMap<String, CacheEntry>,
}

impl ParseCache {
    /// Creates a cache backed by the given file, loading it eagerly.
    ///
    /// A missing, unreadable, or incompatible file starts the cache
    /// empty. Pass `None` for a purely in-memory cache.
    pub fn new(cache_file: Option<PathBuf>) -> Self {
        let entries = cache_file
            .as_deref()
            .and_then(load_entries)
            .unwrap_or_default();
        Self {
            cache_file,
            entries,
        }
    }

    /// Creates a cache at the configured location.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(Some(config.cache_file().to_path_buf()))
    }

    /// Returns the stored snapshot for `path` if its stored fingerprint
    /// matches the fingerprint of `content`.
    ///
    /// Any other case is a miss: an unknown path, or a known path whose
    /// content has changed. A stale entry is left untouched until
    /// explicitly overwritten by [`ParseCache::store`].
    pub fn lookup(&self, path: &str, content: &str) -> Option<&ScanSnapshot> {
        self.lookup_fingerprint(path, Fingerprint::of_str(content))
    }

    /// [`ParseCache::lookup`] for content supplied as lines.
    pub fn lookup_lines<S: AsRef<str>>(&self, path: &str, lines: &[S]) -> Option<&ScanSnapshot> {
        self.lookup_fingerprint(path, Fingerprint::of_lines(lines))
    }

    /// Lookup against a pre-computed fingerprint.
    pub fn lookup_fingerprint(&self, path: &str, fingerprint: Fingerprint) -> Option<&ScanSnapshot> {
        let entry = self.entries.get(path)?;
        if entry.fingerprint == fingerprint {
            Some(&entry.snapshot)
        } else {
            None
        }
    }

    /// Stores a scan snapshot for `path`, overwriting unconditionally.
    pub fn store(&mut self, path: &str, content: &str, snapshot: ScanSnapshot) {
        self.store_fingerprint(path, Fingerprint::of_str(content), snapshot);
    }

    /// [`ParseCache::store`] for content supplied as lines.
    pub fn store_lines<S: AsRef<str>>(&mut self, path: &str, lines: &[S], snapshot: ScanSnapshot) {
        self.store_fingerprint(path, Fingerprint::of_lines(lines), snapshot);
    }

    /// Store against a pre-computed fingerprint.
    pub fn store_fingerprint(&mut self, path: &str, fingerprint: Fingerprint, snapshot: ScanSnapshot) {
        self.entries.insert(
            path.to_string(),
            CacheEntry {
                fingerprint,
                snapshot,
            },
        );
    }

    /// Writes the whole table to the configured cache file.
    ///
    /// Parent directories are created as needed. Failures are logged at
    /// debug level and swallowed: losing the cache file must never abort
    /// the tool. Should run once, after all parallel scanning completes.
    pub fn persist(&self) {
        let Some(path) = self.cache_file.as_deref() else {
            return;
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    debug!(path = %path.display(), error = %e, "failed to create cache directory");
                    return;
                }
            }
        }

        let table = match bincode::serde::encode_to_vec(&self.entries, bincode::config::standard())
        {
            Ok(table) => table,
            Err(e) => {
                debug!(error = %e, "failed to encode parse cache");
                return;
            }
        };

        let mut output = Vec::with_capacity(8 + table.len());
        output.extend_from_slice(&CACHE_MAGIC);
        output.extend_from_slice(&CACHE_FORMAT_VERSION.to_le_bytes());
        output.extend_from_slice(&table);

        if let Err(e) = std::fs::write(path, &output) {
            debug!(path = %path.display(), error = %e, "failed to write parse cache");
        }
    }

    /// Empties the in-memory table. The on-disk file is untouched until
    /// the next [`ParseCache::persist`].
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and validates a persisted cache table.
///
/// Fail-safe: any problem — wrong magic, wrong version, truncation,
/// undecodable payload — yields `None` and an empty cache.
fn load_entries(path: &Path) -> Option<HashMap<String, CacheEntry>> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %path.display(), error = %e, "failed to read parse cache");
            }
            return None;
        }
    };

    if raw.len() < 8 || raw[..4] != CACHE_MAGIC {
        debug!(path = %path.display(), "parse cache has invalid header, starting empty");
        return None;
    }
    let version = u32::from_le_bytes(raw[4..8].try_into().ok()?);
    if version != CACHE_FORMAT_VERSION {
        debug!(
            path = %path.display(),
            version, "parse cache format version mismatch, starting empty"
        );
        return None;
    }

    match bincode::serde::decode_from_slice(&raw[8..], bincode::config::standard()) {
        Ok((entries, _)) => Some(entries),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "failed to decode parse cache, starting empty");
            None
        }
    }
}

/// Runs `scanner` over `content` unless the cache already holds a valid
/// snapshot for `(path, content)`.
///
/// On a hit the snapshot is imported into the scanner, bypassing the
/// scan; on a miss the file is scanned and the exported snapshot stored.
/// Either way the returned snapshot reflects the scanner's final state.
pub fn scan_with_cache<S: SourceScanner>(
    cache: &mut ParseCache,
    scanner: &mut S,
    path: &str,
    content: &str,
) -> ScanSnapshot {
    if let Some(snapshot) = cache.lookup(path, content) {
        let snapshot = snapshot.clone();
        scanner.import_state(&snapshot);
        return snapshot;
    }

    scanner.scan(content);
    let snapshot = scanner.state().export_state();
    cache.store(path, content, snapshot.clone());
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_scan::{DesignUnit, ScannerState, VhdlScanner};
    use std::path::Path;

    fn snapshot_with_unit(name: &str) -> ScanSnapshot {
        let mut state = ScannerState::new("work", Path::new("rtl/test.vhd"));
        state.register_unit(DesignUnit::entity(name));
        state.add_library_dep("ieee");
        state.export_state()
    }

    #[test]
    fn store_then_lookup_hits() {
        let mut cache = ParseCache::new(None);
        let snapshot = snapshot_with_unit("uart");
        cache.store("rtl/uart.vhd", "entity uart is end;", snapshot.clone());
        assert_eq!(
            cache.lookup("rtl/uart.vhd", "entity uart is end;"),
            Some(&snapshot)
        );
    }

    #[test]
    fn changed_content_misses() {
        let mut cache = ParseCache::new(None);
        cache.store("a.vhd", "old content", snapshot_with_unit("a"));
        assert!(cache.lookup("a.vhd", "new content").is_none());
        // The stale entry survives until overwritten.
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup("a.vhd", "old content").is_some());
    }

    #[test]
    fn unknown_path_misses() {
        let cache = ParseCache::new(None);
        assert!(cache.lookup("never/seen.vhd", "anything").is_none());
    }

    #[test]
    fn paths_are_case_sensitive_keys() {
        let mut cache = ParseCache::new(None);
        cache.store("a.vhd", "content", snapshot_with_unit("a"));
        assert!(cache.lookup("A.VHD", "content").is_none());
    }

    #[test]
    fn lines_and_joined_string_are_equivalent() {
        let mut cache = ParseCache::new(None);
        cache.store("a.vhd", "line one\nline two", snapshot_with_unit("a"));
        assert!(cache
            .lookup_lines("a.vhd", &["line one", "line two"])
            .is_some());
    }

    #[test]
    fn persist_roundtrip_through_fresh_instance() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sub").join("parse_cache.bin");
        let snapshot = snapshot_with_unit("uart");

        let mut cache = ParseCache::new(Some(file.clone()));
        cache.store("rtl/uart.vhd", "entity uart is end;", snapshot.clone());
        cache.persist();
        assert!(file.exists());

        let reloaded = ParseCache::new(Some(file));
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.lookup("rtl/uart.vhd", "entity uart is end;"),
            Some(&snapshot)
        );
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("parse_cache.bin");
        std::fs::write(&file, b"definitely not a cache").unwrap();
        let cache = ParseCache::new(Some(file));
        assert!(cache.is_empty());
    }

    #[test]
    fn version_mismatch_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("parse_cache.bin");

        let mut cache = ParseCache::new(Some(file.clone()));
        cache.store("a.vhd", "content", snapshot_with_unit("a"));
        cache.persist();

        let mut raw = std::fs::read(&file).unwrap();
        raw[4..8].copy_from_slice(&99u32.to_le_bytes());
        std::fs::write(&file, &raw).unwrap();

        let reloaded = ParseCache::new(Some(file));
        assert!(reloaded.is_empty());
    }

    #[test]
    fn clear_leaves_disk_untouched_until_persist() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("parse_cache.bin");

        let mut cache = ParseCache::new(Some(file.clone()));
        cache.store("a.vhd", "content", snapshot_with_unit("a"));
        cache.persist();

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(ParseCache::new(Some(file.clone())).len(), 1);

        cache.persist();
        assert!(ParseCache::new(Some(file)).is_empty());
    }

    #[test]
    fn persist_without_configured_file_is_noop() {
        let mut cache = ParseCache::new(None);
        cache.store("a.vhd", "content", snapshot_with_unit("a"));
        cache.persist();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn scan_with_cache_skips_rescan_on_hit() {
        let config = keel_config::ScanConfig::default();
        let src = "library ieee;\nentity uart is\nend entity uart;\n";
        let mut cache = ParseCache::new(None);

        let mut scanner = VhdlScanner::new(&config, "work", Path::new("rtl/uart.vhd"));
        let first = scan_with_cache(&mut cache, &mut scanner, "rtl/uart.vhd", src);
        assert_eq!(first.units.len(), 1);
        assert_eq!(cache.len(), 1);

        // Second run imports the cached snapshot instead of scanning.
        let mut fresh = VhdlScanner::new(&config, "work", Path::new("rtl/uart.vhd"));
        let second = scan_with_cache(&mut cache, &mut fresh, "rtl/uart.vhd", src);
        assert_eq!(second, first);
        assert!(fresh.state().units().exists("uart"));

        // Changed content forces a re-scan and overwrites the entry.
        let changed = "library ieee;\nentity uart2 is\nend entity uart2;\n";
        let mut third_scanner = VhdlScanner::new(&config, "work", Path::new("rtl/uart.vhd"));
        let third = scan_with_cache(&mut cache, &mut third_scanner, "rtl/uart.vhd", changed);
        assert!(third.units.iter().any(|u| u.name == "uart2"));
        assert!(cache.lookup("rtl/uart.vhd", changed).is_some());
        assert!(cache.lookup("rtl/uart.vhd", src).is_none());
    }
}
