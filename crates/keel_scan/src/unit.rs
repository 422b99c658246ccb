//! Design units discovered by the dialect scanners.

use keel_common::RegistryItem;
use std::path::{Path, PathBuf};

/// Kind-specific payload of a [`DesignUnit`].
///
/// A tagged variant rather than optional fields, so that snapshot export
/// and import are each a single exhaustive match.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    /// A VHDL entity with its generic list and the architectures
    /// implementing it.
    Entity {
        /// Generic names declared in the entity's generic clause.
        generics: Vec<String>,
        /// Names of architectures discovered for this entity.
        architectures: Vec<String>,
    },
    /// A VHDL architecture. The entity is referenced by name only (a weak
    /// reference, resolved by name lookup downstream — never by this core).
    Architecture {
        /// Name of the entity this architecture implements.
        entity: String,
        /// Test-case identifiers discovered in the architecture body.
        testcases: Vec<String>,
    },
    /// A Verilog module with its parameter list.
    Module {
        /// Parameter names declared by the module.
        parameters: Vec<String>,
        /// Test-case identifiers discovered in the module body.
        testcases: Vec<String>,
    },
}

/// A single design unit extracted from one source file.
///
/// Created during a scan pass, immutable once exported to the cache; a
/// fresh unit is reconstructed from plain data on a cache hit.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignUnit {
    name: String,
    is_testbench: bool,
    internal_deps: Vec<String>,
    external_deps: Vec<String>,
    filename: Option<PathBuf>,
    kind: UnitKind,
}

impl DesignUnit {
    /// Creates an entity unit with empty generic and architecture lists.
    pub fn entity(name: &str) -> Self {
        Self::with_kind(
            name,
            UnitKind::Entity {
                generics: Vec::new(),
                architectures: Vec::new(),
            },
        )
    }

    /// Creates an architecture unit implementing the named entity.
    pub fn architecture(name: &str, entity: &str) -> Self {
        Self::with_kind(
            name,
            UnitKind::Architecture {
                entity: entity.to_string(),
                testcases: Vec::new(),
            },
        )
    }

    /// Creates a Verilog module unit with an empty parameter list.
    pub fn module(name: &str) -> Self {
        Self::with_kind(
            name,
            UnitKind::Module {
                parameters: Vec::new(),
                testcases: Vec::new(),
            },
        )
    }

    /// Creates a unit with an explicit kind payload.
    pub fn with_kind(name: &str, kind: UnitKind) -> Self {
        let is_testbench = is_testbench_name(name);
        Self {
            name: name.to_string(),
            is_testbench,
            internal_deps: Vec::new(),
            external_deps: Vec::new(),
            filename: None,
            kind,
        }
    }

    /// The unit's name.
    pub fn unit_name(&self) -> &str {
        &self.name
    }

    /// The kind-specific payload.
    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    /// Whether this unit is a testbench.
    pub fn is_testbench(&self) -> bool {
        self.is_testbench
    }

    /// Marks the unit as a testbench.
    pub fn set_testbench(&mut self, is_testbench: bool) {
        self.is_testbench = is_testbench;
    }

    /// The file this unit was discovered in, once registered.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Stamps the originating file.
    pub fn set_filename(&mut self, filename: Option<PathBuf>) {
        self.filename = filename;
    }

    /// Intra-project dependencies (instantiated units, used packages).
    pub fn internal_deps(&self) -> &[String] {
        &self.internal_deps
    }

    /// Dependencies on units outside the project's libraries.
    pub fn external_deps(&self) -> &[String] {
        &self.external_deps
    }

    /// Appends an intra-project dependency, case-insensitively deduplicated.
    pub fn add_internal_dep(&mut self, name: &str) {
        push_unique(&mut self.internal_deps, &name.to_lowercase());
    }

    /// Appends an external dependency, case-insensitively deduplicated.
    pub fn add_external_dep(&mut self, name: &str) {
        push_unique(&mut self.external_deps, &name.to_lowercase());
    }

    /// Appends a generic name. No-op for non-entity units.
    pub fn add_generic(&mut self, name: &str) {
        if let UnitKind::Entity { generics, .. } = &mut self.kind {
            push_unique(generics, &name.to_lowercase());
        }
    }

    /// Appends an implementing architecture name. No-op for non-entity units.
    pub fn add_architecture(&mut self, name: &str) {
        if let UnitKind::Entity { architectures, .. } = &mut self.kind {
            push_unique(architectures, &name.to_lowercase());
        }
    }

    /// Appends a parameter name. No-op for non-module units.
    pub fn add_parameter(&mut self, name: &str) {
        if let UnitKind::Module { parameters, .. } = &mut self.kind {
            push_unique(parameters, &name.to_lowercase());
        }
    }

    /// Appends a test-case identifier (case preserved). No-op for entity
    /// units, which carry no test cases of their own.
    pub fn add_testcase(&mut self, id: &str) {
        match &mut self.kind {
            UnitKind::Architecture { testcases, .. } | UnitKind::Module { testcases, .. } => {
                push_unique(testcases, id);
            }
            UnitKind::Entity { .. } => {}
        }
    }
}

impl RegistryItem for DesignUnit {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// Naming convention for testbench units: `tb_` prefix or `_tb` suffix.
pub fn is_testbench_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name == "tb" || name.starts_with("tb_") || name.ends_with("_tb")
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testbench_naming_convention() {
        assert!(is_testbench_name("tb_uart"));
        assert!(is_testbench_name("uart_TB"));
        assert!(is_testbench_name("tb"));
        assert!(!is_testbench_name("uart_tx"));
        assert!(!is_testbench_name("stable"));
    }

    #[test]
    fn entity_collects_generics_and_architectures() {
        let mut unit = DesignUnit::entity("uart_tx");
        unit.add_generic("GC_BAUD");
        unit.add_generic("gc_baud");
        unit.add_architecture("rtl");
        assert_eq!(
            unit.kind(),
            &UnitKind::Entity {
                generics: vec!["gc_baud".to_string()],
                architectures: vec!["rtl".to_string()],
            }
        );
    }

    #[test]
    fn architecture_records_entity_by_name() {
        let mut unit = DesignUnit::architecture("behav", "tb_uart");
        unit.add_testcase("read_test");
        unit.add_testcase("read_test");
        match unit.kind() {
            UnitKind::Architecture { entity, testcases } => {
                assert_eq!(entity, "tb_uart");
                assert_eq!(testcases, &["read_test".to_string()]);
            }
            other => panic!("expected architecture, got {other:?}"),
        }
    }

    #[test]
    fn kind_mismatched_mutators_are_noops() {
        let mut entity = DesignUnit::entity("e");
        entity.add_parameter("width");
        entity.add_testcase("tc");
        assert_eq!(
            entity.kind(),
            &UnitKind::Entity {
                generics: vec![],
                architectures: vec![],
            }
        );
    }

    #[test]
    fn dep_lists_dedup_case_insensitively() {
        let mut unit = DesignUnit::module("dut");
        unit.add_internal_dep("fifo");
        unit.add_internal_dep("FIFO");
        unit.add_external_dep("vendor_ram");
        assert_eq!(unit.internal_deps(), &["fifo".to_string()]);
        assert_eq!(unit.external_deps(), &["vendor_ram".to_string()]);
    }
}
