//! Source scanning core for the Keel HDL regression tool.
//!
//! Dialect scanners extract per-file structural facts — declared design
//! units, inter-unit dependencies, embedded test-case identifiers, and
//! assertion tallies — without a full compiler front end. The shared
//! bookkeeping lives in [`ScannerState`]; [`VhdlScanner`] and
//! [`VerilogScanner`] supply the dialect-specific cleaning and
//! tokenization passes. [`ScanSnapshot`] is the plain-data export of a
//! scan, safe to persist in the parse cache and reload without carrying
//! live references.

#![warn(missing_docs)]

pub mod scanner;
pub mod snapshot;
pub mod unit;
pub mod verilog;
pub mod vhdl;

pub use scanner::{ScannerState, Severity, SourceScanner};
pub use snapshot::{AssertionCounts, ScanSnapshot, UnitKindRecord, UnitRecord};
pub use unit::{is_testbench_name, DesignUnit, UnitKind};
pub use verilog::VerilogScanner;
pub use vhdl::VhdlScanner;
