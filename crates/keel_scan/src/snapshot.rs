//! Plain-data snapshot of scanner state.
//!
//! This is the serialization boundary that makes caching safe: a snapshot
//! carries no live references, only the fields enumerated here. Export and
//! import are each a single exhaustive match on the unit kind — any field
//! omitted from both sides is silently lost across a cache round-trip, so
//! new kind fields must be added here in the same change that introduces
//! them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The exact unit stored and retrieved by the parse cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    /// All design units discovered in the scanned file, in discovery order.
    pub units: Vec<UnitRecord>,

    /// Accumulated library-level dependencies, not yet drained.
    pub library_deps: Vec<String>,

    /// Accumulated internal use dependencies, not yet drained.
    pub internal_deps: Vec<String>,

    /// All test-case identifiers discovered in the file.
    pub testcases: Vec<String>,

    /// Assertion severity tallies.
    pub assertions: AssertionCounts,
}

/// Plain-data record of one design unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// The unit's name.
    pub name: String,

    /// Whether the unit is a testbench.
    pub is_testbench: bool,

    /// Intra-project dependencies.
    pub internal_deps: Vec<String>,

    /// External dependencies.
    pub external_deps: Vec<String>,

    /// The file the unit was discovered in.
    pub filename: Option<PathBuf>,

    /// Kind discriminant plus kind-specific fields.
    pub kind: UnitKindRecord,
}

/// Plain-data mirror of the unit kind payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitKindRecord {
    /// A VHDL entity.
    Entity {
        /// Generic names.
        generics: Vec<String>,
        /// Architectures implementing the entity.
        architectures: Vec<String>,
    },
    /// A VHDL architecture.
    Architecture {
        /// The implemented entity, by name.
        entity: String,
        /// Test-case identifiers.
        testcases: Vec<String>,
    },
    /// A Verilog module.
    Module {
        /// Parameter names.
        parameters: Vec<String>,
        /// Test-case identifiers.
        testcases: Vec<String>,
    },
}

/// Assertion severity counters accumulated during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionCounts {
    /// Note-severity assertions.
    pub note: u32,
    /// Warning-severity assertions.
    pub warning: u32,
    /// Error-severity assertions.
    pub error: u32,
    /// Failure-severity assertions.
    pub failure: u32,
}

impl AssertionCounts {
    /// The running total across all severities.
    pub fn total(&self) -> u32 {
        self.note + self.warning + self.error + self.failure
    }
}
