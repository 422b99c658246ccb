//! Shared scanner bookkeeping and the dialect scanner trait.
//!
//! [`ScannerState`] holds everything a scan accumulates for one file:
//! the discovered design units, the dependency and test-case lists,
//! and the assertion counters. Dialect scanners compose it rather than
//! inherit it; the grammar itself lives behind [`SourceScanner`].

use keel_common::Registry;
use std::path::{Path, PathBuf};

use crate::snapshot::{AssertionCounts, ScanSnapshot, UnitKindRecord, UnitRecord};
use crate::unit::{DesignUnit, UnitKind};

/// Assertion severity levels tallied during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational assertion.
    Note,
    /// Warning-severity assertion.
    Warning,
    /// Error-severity assertion.
    Error,
    /// Failure/fatal-severity assertion.
    Failure,
}

impl Severity {
    /// Maps a severity keyword (VHDL severity name) to a level.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_lowercase().as_str() {
            "note" => Some(Self::Note),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Per-file scan accumulator shared by all dialect scanners.
pub struct ScannerState {
    library: String,
    filename: Option<PathBuf>,
    units: Registry<DesignUnit>,
    library_deps: Vec<String>,
    internal_deps: Vec<String>,
    testcases: Vec<String>,
    assertions: AssertionCounts,
}

impl ScannerState {
    /// Creates the accumulator for one file scanned into `library`.
    pub fn new(library: &str, filename: &Path) -> Self {
        Self {
            library: library.to_lowercase(),
            filename: Some(filename.to_path_buf()),
            units: Registry::new(),
            library_deps: Vec::new(),
            internal_deps: Vec::new(),
            testcases: Vec::new(),
            assertions: AssertionCounts::default(),
        }
    }

    /// The target library name.
    pub fn library(&self) -> &str {
        &self.library
    }

    /// The source file this state belongs to.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Replaces the source file reference.
    pub fn set_filename(&mut self, filename: &Path) {
        self.filename = Some(filename.to_path_buf());
    }

    /// The registry of discovered design units.
    pub fn units(&self) -> &Registry<DesignUnit> {
        &self.units
    }

    /// Appends a library-level dependency, lowercased and deduplicated.
    pub fn add_library_dep(&mut self, name: &str) {
        push_unique(&mut self.library_deps, &name.to_lowercase());
    }

    /// Appends an internal use dependency, lowercased and deduplicated.
    pub fn add_internal_dep(&mut self, name: &str) {
        push_unique(&mut self.internal_deps, &name.to_lowercase());
    }

    /// Takes the accumulated library dependencies, leaving the list empty.
    ///
    /// This is a one-shot drain, not a peek: the list is consumed exactly
    /// once per discovered unit as it is handed to the dependency graph
    /// builder. A repeated call without intervening adds returns an empty
    /// list.
    pub fn drain_library_deps(&mut self) -> Vec<String> {
        std::mem::take(&mut self.library_deps)
    }

    /// Takes the accumulated internal use dependencies. Same drain
    /// contract as [`ScannerState::drain_library_deps`].
    pub fn drain_internal_deps(&mut self) -> Vec<String> {
        std::mem::take(&mut self.internal_deps)
    }

    /// Appends a test-case identifier, deduplicated with case preserved.
    pub fn add_testcase(&mut self, id: &str) {
        push_unique(&mut self.testcases, id);
    }

    /// The test-case identifiers discovered so far.
    pub fn testcases(&self) -> &[String] {
        &self.testcases
    }

    /// Stamps the scanner's source file on the unit and inserts it into
    /// the unit registry (subject to name deduplication).
    ///
    /// Registering an architecture also links it into its entity's
    /// architecture list when that entity is already registered; an entity
    /// defined in another file is left to downstream name resolution.
    pub fn register_unit(&mut self, mut unit: DesignUnit) -> bool {
        unit.set_filename(self.filename.clone());

        if let UnitKind::Architecture { entity, .. } = unit.kind() {
            if let Some(owner) = self.units.get(entity) {
                let mut owner = owner.clone();
                owner.add_architecture(unit.unit_name());
                // Position-preserving by the registry's update contract.
                let _ = self.units.update(owner);
            }
        }

        self.units.add(unit)
    }

    /// Bumps the counter for one assertion of the given severity.
    pub fn increment_assertion(&mut self, severity: Severity) {
        match severity {
            Severity::Note => self.assertions.note += 1,
            Severity::Warning => self.assertions.warning += 1,
            Severity::Error => self.assertions.error += 1,
            Severity::Failure => self.assertions.failure += 1,
        }
    }

    /// The assertion tallies accumulated so far.
    pub fn assertions(&self) -> AssertionCounts {
        self.assertions
    }

    /// Exports the state as a plain-data snapshot (no live references).
    ///
    /// The kind match must stay exhaustive: anything omitted here is
    /// silently lost across a cache round-trip.
    pub fn export_state(&self) -> ScanSnapshot {
        let units = self
            .units
            .items()
            .iter()
            .map(|unit| {
                let kind = match unit.kind() {
                    UnitKind::Entity {
                        generics,
                        architectures,
                    } => UnitKindRecord::Entity {
                        generics: generics.clone(),
                        architectures: architectures.clone(),
                    },
                    UnitKind::Architecture { entity, testcases } => UnitKindRecord::Architecture {
                        entity: entity.clone(),
                        testcases: testcases.clone(),
                    },
                    UnitKind::Module {
                        parameters,
                        testcases,
                    } => UnitKindRecord::Module {
                        parameters: parameters.clone(),
                        testcases: testcases.clone(),
                    },
                };
                UnitRecord {
                    name: unit.unit_name().to_string(),
                    is_testbench: unit.is_testbench(),
                    internal_deps: unit.internal_deps().to_vec(),
                    external_deps: unit.external_deps().to_vec(),
                    filename: unit.filename().map(Path::to_path_buf),
                    kind,
                }
            })
            .collect();

        ScanSnapshot {
            units,
            library_deps: self.library_deps.clone(),
            internal_deps: self.internal_deps.clone(),
            testcases: self.testcases.clone(),
            assertions: self.assertions,
        }
    }

    /// Rebuilds the state from a snapshot, replacing all accumulators.
    ///
    /// Units are reconstructed with their recorded kind through the
    /// exhaustive mirror of [`ScannerState::export_state`].
    pub fn restore(&mut self, snapshot: &ScanSnapshot) {
        self.units.clear();
        for record in &snapshot.units {
            let kind = match &record.kind {
                UnitKindRecord::Entity {
                    generics,
                    architectures,
                } => UnitKind::Entity {
                    generics: generics.clone(),
                    architectures: architectures.clone(),
                },
                UnitKindRecord::Architecture { entity, testcases } => UnitKind::Architecture {
                    entity: entity.clone(),
                    testcases: testcases.clone(),
                },
                UnitKindRecord::Module {
                    parameters,
                    testcases,
                } => UnitKind::Module {
                    parameters: parameters.clone(),
                    testcases: testcases.clone(),
                },
            };
            let mut unit = DesignUnit::with_kind(&record.name, kind);
            unit.set_testbench(record.is_testbench);
            unit.set_filename(record.filename.clone());
            for dep in &record.internal_deps {
                unit.add_internal_dep(dep);
            }
            for dep in &record.external_deps {
                unit.add_external_dep(dep);
            }
            self.units.add(unit);
        }
        self.library_deps = snapshot.library_deps.clone();
        self.internal_deps = snapshot.internal_deps.clone();
        self.testcases = snapshot.testcases.clone();
        self.assertions = snapshot.assertions;
    }
}

/// A dialect-specific source scanner.
///
/// The shared bookkeeping lives in [`ScannerState`]; implementations
/// supply the cleaning pass, the tokenization pass, and snapshot import.
/// Malformed content must never error: a scanner is tolerant of partial
/// or garbled input and produces a best-effort (possibly empty) result.
pub trait SourceScanner {
    /// Read access to the shared bookkeeping.
    fn state(&self) -> &ScannerState;

    /// Write access to the shared bookkeeping.
    fn state_mut(&mut self) -> &mut ScannerState;

    /// Dialect-specific comment stripping and whitespace normalization.
    fn clean_code(&self, content: &str) -> Vec<String>;

    /// Dialect-specific extraction pass over cleaned lines.
    fn tokenize(&mut self, lines: &[String]);

    /// Reconstructs concrete design units from cached plain data.
    fn import_state(&mut self, snapshot: &ScanSnapshot);

    /// Runs a full scan: clean, then tokenize.
    fn scan(&mut self, content: &str) {
        let lines = self.clean_code(content);
        self.tokenize(&lines);
    }
}

/// Extracts quoted strings compared against `identifier` on this line.
///
/// Matches `identifier = "value"` and `identifier == "value"` forms; the
/// `:=` of a default assignment does not count as a comparison. Used by
/// the dialect scanners for test-case discovery.
pub(crate) fn extract_quoted_comparisons(line: &str, identifier: &str) -> Vec<String> {
    let mut found = Vec::new();
    let lower = line.to_lowercase();
    // Byte offsets below index into `line`; fall back to the lowered text
    // for the rare non-ASCII line where lowering changes byte lengths.
    let source: &str = if line.len() == lower.len() { line } else { &lower };
    let needle = identifier.to_lowercase();
    let mut search_from = 0;

    while let Some(pos) = lower[search_from..].find(&needle) {
        let start = search_from + pos;
        let end = start + needle.len();
        search_from = end;

        // Must be a standalone identifier occurrence.
        let before = lower[..start].chars().next_back();
        let after = lower[end..].chars().next();
        if before.is_some_and(|c| c.is_alphanumeric() || c == '_')
            || after.is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            continue;
        }

        let rest = source[end..].trim_start();
        let rest = match rest.strip_prefix("==") {
            Some(rest) => rest,
            None => match rest.strip_prefix('=') {
                // Reject ':=' style defaults; the ':' sits before the
                // identifier's '=' only in caller-stripped forms, so also
                // reject '=>' association arrows here.
                Some(rest) if !rest.starts_with('>') => rest,
                _ => continue,
            },
        };
        let rest = rest.trim_start();
        if let Some(stripped) = rest.strip_prefix('"') {
            if let Some(close) = stripped.find('"') {
                let value = &stripped[..close];
                if !value.is_empty() {
                    found.push(value.to_string());
                }
            }
        }
    }
    found
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn state() -> ScannerState {
        ScannerState::new("work", Path::new("rtl/top.vhd"))
    }

    #[test]
    fn library_deps_drain_once() {
        let mut st = state();
        st.add_library_dep("ieee");
        st.add_library_dep("IEEE");
        assert_eq!(st.drain_library_deps(), vec!["ieee".to_string()]);
        assert!(st.drain_library_deps().is_empty());
    }

    #[test]
    fn internal_deps_drain_once() {
        let mut st = state();
        st.add_internal_dep("uart_pkg");
        st.add_internal_dep("Uart_Pkg");
        assert_eq!(st.drain_internal_deps(), vec!["uart_pkg".to_string()]);
        assert!(st.drain_internal_deps().is_empty());
    }

    #[test]
    fn testcases_dedup_with_case_preserved() {
        let mut st = state();
        st.add_testcase("Read_Test");
        st.add_testcase("Read_Test");
        st.add_testcase("write_test");
        assert_eq!(
            st.testcases(),
            &["Read_Test".to_string(), "write_test".to_string()]
        );
    }

    #[test]
    fn register_unit_stamps_filename() {
        let mut st = state();
        st.register_unit(DesignUnit::entity("uart_tx"));
        let unit = st.units().get("uart_tx").unwrap();
        assert_eq!(unit.filename(), Some(Path::new("rtl/top.vhd")));
    }

    #[test]
    fn register_unit_dedups_by_name() {
        let mut st = state();
        assert!(st.register_unit(DesignUnit::entity("dut")));
        assert!(!st.register_unit(DesignUnit::entity("DUT")));
        assert_eq!(st.units().len(), 1);
    }

    #[test]
    fn registering_architecture_links_known_entity() {
        let mut st = state();
        st.register_unit(DesignUnit::entity("uart_tx"));
        st.register_unit(DesignUnit::architecture("rtl", "uart_tx"));
        match st.units().get("uart_tx").unwrap().kind() {
            crate::unit::UnitKind::Entity { architectures, .. } => {
                assert_eq!(architectures, &["rtl".to_string()]);
            }
            other => panic!("expected entity, got {other:?}"),
        }
    }

    #[test]
    fn assertion_counters_accumulate() {
        let mut st = state();
        st.increment_assertion(Severity::Note);
        st.increment_assertion(Severity::Error);
        st.increment_assertion(Severity::Error);
        st.increment_assertion(Severity::Failure);
        let counts = st.assertions();
        assert_eq!(counts.note, 1);
        assert_eq!(counts.error, 2);
        assert_eq!(counts.failure, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn severity_keyword_mapping() {
        assert_eq!(Severity::from_keyword("NOTE"), Some(Severity::Note));
        assert_eq!(Severity::from_keyword("failure"), Some(Severity::Failure));
        assert_eq!(Severity::from_keyword("fatal"), None);
    }

    #[test]
    fn export_restore_roundtrip_covers_every_kind() {
        let mut st = state();
        let mut entity = DesignUnit::entity("uart");
        entity.add_generic("gc_baud");
        st.register_unit(entity);

        let mut arch = DesignUnit::architecture("rtl", "uart");
        arch.add_testcase("read_test");
        arch.add_internal_dep("fifo");
        st.register_unit(arch);

        let mut module = DesignUnit::module("tb_top");
        module.add_parameter("width");
        module.add_external_dep("vendor_ram");
        st.register_unit(module);

        st.add_library_dep("ieee");
        st.add_internal_dep("uart_pkg");
        st.add_testcase("read_test");
        st.increment_assertion(Severity::Warning);

        let snapshot = st.export_state();

        let mut restored = ScannerState::new("work", Path::new("other.vhd"));
        restored.restore(&snapshot);
        assert_eq!(restored.export_state(), snapshot);

        let tb = restored.units().get("tb_top").unwrap();
        assert!(tb.is_testbench());
        assert_eq!(tb.filename(), Some(Path::new("rtl/top.vhd")));
        assert_eq!(restored.drain_library_deps(), vec!["ieee".to_string()]);
    }

    #[test]
    fn quoted_comparison_extraction() {
        assert_eq!(
            extract_quoted_comparisons("if gc_testcase = \"read_test\" then", "gc_testcase"),
            vec!["read_test".to_string()]
        );
        assert_eq!(
            extract_quoted_comparisons("if (testcase == \"smoke\") begin", "testcase"),
            vec!["smoke".to_string()]
        );
        // Default assignments and association arrows are not comparisons.
        assert!(
            extract_quoted_comparisons("gc_testcase : string := \"default\";", "gc_testcase")
                .is_empty()
        );
        assert!(
            extract_quoted_comparisons("gc_testcase => \"mapped\"", "gc_testcase").is_empty()
        );
        // Substring occurrences of the identifier do not match.
        assert!(
            extract_quoted_comparisons("my_gc_testcase = \"x\"", "gc_testcase").is_empty()
        );
    }
}
