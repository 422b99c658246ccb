//! Best-effort VHDL scanner.
//!
//! Extracts the structural facts needed for dependency ordering and test
//! discovery: library/use clauses, entities with their generics,
//! architectures with their entity references, instantiations, test-case
//! comparisons, and assertion severities. This is deliberately not a
//! parser: garbled input produces a partial result, never an error.
//! VHDL is case-insensitive, so cleaned lines are lowercased before
//! matching.

use std::path::Path;

use keel_config::ScanConfig;

use crate::scanner::{extract_quoted_comparisons, ScannerState, Severity, SourceScanner};
use crate::snapshot::ScanSnapshot;
use crate::unit::{is_testbench_name, DesignUnit, UnitKind};

/// Keywords that can follow `end` without closing the current design unit.
const END_KEYWORDS: [&str; 12] = [
    "if", "loop", "case", "process", "generate", "block", "component", "function", "procedure",
    "record", "units", "protected",
];

/// Names that rule a `name : rhs` line out as a component instantiation:
/// port modes, common types, and labelled concurrent statements.
const NON_INSTANCE_RHS: [&str; 25] = [
    "in",
    "out",
    "inout",
    "buffer",
    "linkage",
    "std_logic",
    "std_logic_vector",
    "std_ulogic",
    "std_ulogic_vector",
    "signed",
    "unsigned",
    "integer",
    "natural",
    "positive",
    "boolean",
    "bit",
    "string",
    "real",
    "time",
    "process",
    "block",
    "for",
    "if",
    "entity",
    "configuration",
];

/// Scanner for the VHDL dialect.
pub struct VhdlScanner {
    state: ScannerState,
    testcase_identifier: String,
    current: Option<DesignUnit>,
    generic_depth: i32,
    generic_buf: String,
}

impl VhdlScanner {
    /// Creates a scanner for one file compiled into `library`.
    pub fn new(config: &ScanConfig, library: &str, filename: &Path) -> Self {
        Self {
            state: ScannerState::new(library, filename),
            testcase_identifier: config.testcase_identifier().to_lowercase(),
            current: None,
            generic_depth: 0,
            generic_buf: String::new(),
        }
    }

    fn flush_current(&mut self) {
        self.generic_depth = 0;
        self.generic_buf.clear();
        if let Some(unit) = self.current.take() {
            self.state.register_unit(unit);
        }
    }

    fn scan_line(&mut self, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = tokens.first() else {
            return;
        };
        // `end;` tokenizes with the semicolon attached.
        let first = first.trim_end_matches(';');

        if self.generic_depth > 0 {
            self.consume_generic_text(line);
            return;
        }

        match first {
            "library" => self.scan_library_clause(line),
            "use" => self.scan_use_clause(&tokens),
            "entity" if tokens.len() >= 3 && tokens[2] == "is" => {
                self.flush_current();
                self.current = Some(DesignUnit::entity(tokens[1]));
            }
            "architecture" if tokens.len() >= 4 && tokens[2] == "of" => {
                self.flush_current();
                let name = tokens[1];
                let entity = tokens[3].trim_end_matches(';');
                let mut unit = DesignUnit::architecture(name, entity);
                if is_testbench_name(entity) {
                    unit.set_testbench(true);
                }
                self.current = Some(unit);
            }
            "component" if tokens.len() >= 2 => {
                if let Some(unit) = &mut self.current {
                    unit.add_internal_dep(tokens[1].trim_end_matches(';'));
                }
            }
            "end" => {
                if self.ends_current_unit(&tokens) {
                    self.flush_current();
                }
            }
            _ => {}
        }

        if matches!(self.current.as_ref().map(DesignUnit::kind), Some(UnitKind::Entity { .. }))
            && first == "generic"
        {
            if let Some(open) = line.find('(') {
                self.consume_generic_text(&line[open..]);
            }
        }

        self.scan_instantiation(line);
        self.scan_testcases(line);
        self.scan_assertion(&tokens);
    }

    fn scan_library_clause(&mut self, line: &str) {
        let rest = line["library".len()..].trim().trim_end_matches(';');
        for name in rest.split(',') {
            let name = name.trim();
            if !name.is_empty() && name != "work" {
                self.state.add_library_dep(name);
            }
        }
    }

    fn scan_use_clause(&mut self, tokens: &[&str]) {
        let Some(target) = tokens.get(1) else {
            return;
        };
        let target = target.trim_end_matches(';');
        let mut parts = target.split('.');
        match (parts.next(), parts.next()) {
            (Some("work"), Some(package)) => self.state.add_internal_dep(package),
            (Some(library), _) if !library.is_empty() => self.state.add_library_dep(library),
            _ => {}
        }
    }

    /// `end <kw>` stays inside the current unit for nested-construct
    /// keywords (`end process;`, `end if;`, ...); a bare `end`, a
    /// unit-level keyword, or any other label closes it. The name-optional
    /// `end <label>;` form is only legal at unit level, so an unknown
    /// label means the unit is over even when it does not match the
    /// declared name.
    fn ends_current_unit(&self, tokens: &[&str]) -> bool {
        let Some(unit) = &self.current else {
            return false;
        };
        match tokens.get(1).map(|t| t.trim_end_matches(';')) {
            None | Some("") => true,
            Some("entity") | Some("architecture") => true,
            Some(name) if name == unit.unit_name() => true,
            Some(keyword) if END_KEYWORDS.contains(&keyword) => false,
            _ => true,
        }
    }

    /// Accumulates generic-clause text across lines until the outer
    /// parenthesis closes, then harvests the generic names.
    fn consume_generic_text(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '(' => {
                    self.generic_depth += 1;
                    if self.generic_depth == 1 {
                        continue;
                    }
                }
                ')' => {
                    self.generic_depth -= 1;
                    if self.generic_depth == 0 {
                        let clause = std::mem::take(&mut self.generic_buf);
                        self.harvest_generics(&clause);
                        return;
                    }
                }
                _ => {}
            }
            if self.generic_depth >= 1 {
                self.generic_buf.push(ch);
            }
        }
        if self.generic_depth > 0 {
            self.generic_buf.push('\n');
        }
    }

    fn harvest_generics(&mut self, clause: &str) {
        let Some(unit) = &mut self.current else {
            return;
        };
        for decl in clause.split(';') {
            let Some((names, _)) = decl.split_once(':') else {
                continue;
            };
            for name in names.split(',') {
                let name = name.trim();
                if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    unit.add_generic(name);
                }
            }
        }
    }

    fn scan_instantiation(&mut self, line: &str) {
        // Direct instantiation: `u0 : entity work.uart_tx(rtl) port map (...)`.
        if let Some(idx) = line.find(": entity ") {
            let target = line[idx + ": entity ".len()..]
                .split_whitespace()
                .next()
                .unwrap_or("");
            let target = target.split('(').next().unwrap_or("");
            let mut parts = target.split('.');
            if let (Some(library), Some(name)) = (parts.next(), parts.next()) {
                if let Some(unit) = &mut self.current {
                    if library == "work" {
                        unit.add_internal_dep(name);
                    } else {
                        unit.add_external_dep(name);
                        self.state.add_library_dep(library);
                    }
                }
            }
            return;
        }

        // Component instantiation: `u0 : uart_tx port map (...)` inside an
        // architecture body. Port and generic declarations share the
        // `name : rhs` shape, so the right-hand side is keyword-filtered.
        if !matches!(
            self.current.as_ref().map(DesignUnit::kind),
            Some(UnitKind::Architecture { .. })
        ) {
            return;
        }
        let Some((lhs, rhs)) = line.split_once(':') else {
            return;
        };
        let lhs_tokens: Vec<&str> = lhs.split_whitespace().collect();
        let rhs_tokens: Vec<&str> = rhs.split_whitespace().collect();
        if lhs_tokens.len() != 1 || rhs_tokens.is_empty() {
            return;
        }
        let target = rhs_tokens[0].trim_end_matches(';');
        if !target.chars().all(|c| c.is_alphanumeric() || c == '_')
            || target.is_empty()
            || NON_INSTANCE_RHS.contains(&target)
        {
            return;
        }
        let looks_like_map = rhs.contains("port map") || rhs.contains("generic map");
        if looks_like_map || rhs_tokens.len() == 1 {
            if let Some(unit) = &mut self.current {
                unit.add_internal_dep(target);
            }
        }
    }

    fn scan_testcases(&mut self, line: &str) {
        for testcase in extract_quoted_comparisons(line, &self.testcase_identifier) {
            if let Some(unit) = &mut self.current {
                unit.add_testcase(&testcase);
            }
            self.state.add_testcase(&testcase);
        }
    }

    fn scan_assertion(&mut self, tokens: &[&str]) {
        let has_assert = tokens.contains(&"assert");
        let has_report = tokens.first() == Some(&"report");
        if !has_assert && !has_report {
            return;
        }
        let severity = tokens
            .iter()
            .position(|t| *t == "severity")
            .and_then(|i| tokens.get(i + 1))
            .map(|t| t.trim_end_matches(';'))
            .and_then(Severity::from_keyword)
            .unwrap_or(if has_assert {
                Severity::Error
            } else {
                Severity::Note
            });
        self.state.increment_assertion(severity);
    }
}

impl SourceScanner for VhdlScanner {
    fn state(&self) -> &ScannerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ScannerState {
        &mut self.state
    }

    /// Strips `--` line comments and VHDL-2008 `/* */` block comments,
    /// lowercases, and collapses whitespace.
    fn clean_code(&self, content: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut in_block = false;
        for raw in content.lines() {
            let mut cleaned = String::new();
            let mut chars = raw.chars().peekable();
            while let Some(c) = chars.next() {
                if in_block {
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        in_block = false;
                    }
                    continue;
                }
                match c {
                    '-' if chars.peek() == Some(&'-') => break,
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        in_block = true;
                    }
                    _ => cleaned.push(c),
                }
            }
            let collapsed = cleaned
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(collapsed);
        }
        lines
    }

    fn tokenize(&mut self, lines: &[String]) {
        self.current = None;
        self.generic_depth = 0;
        self.generic_buf.clear();
        for line in lines {
            if !line.is_empty() {
                self.scan_line(line);
            }
        }
        self.flush_current();
    }

    fn import_state(&mut self, snapshot: &ScanSnapshot) {
        self.state.restore(snapshot);
    }
}
