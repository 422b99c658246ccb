//! Best-effort Verilog scanner.
//!
//! Extracts module declarations with their parameters, include and
//! instantiation dependencies, test-case comparisons, and severity system
//! tasks. Like the VHDL scanner this is not a parser: garbled input
//! yields a partial result. Verilog identifiers are case-sensitive, so
//! cleaned lines keep their case; dependency names are still lowercased
//! on dedup like everywhere else in the scanner core.

use std::path::Path;

use keel_config::ScanConfig;

use crate::scanner::{extract_quoted_comparisons, ScannerState, Severity, SourceScanner};
use crate::snapshot::ScanSnapshot;
use crate::unit::DesignUnit;

/// Severity system tasks and the level each one tallies.
const SEVERITY_TASKS: [(&str, Severity); 4] = [
    ("$info", Severity::Note),
    ("$warning", Severity::Warning),
    ("$error", Severity::Error),
    ("$fatal", Severity::Failure),
];

/// Leading keywords that rule a line out as a module instantiation.
const VERILOG_KEYWORDS: [&str; 44] = [
    "module",
    "macromodule",
    "endmodule",
    "input",
    "output",
    "inout",
    "wire",
    "reg",
    "logic",
    "assign",
    "always",
    "initial",
    "begin",
    "end",
    "if",
    "else",
    "case",
    "casex",
    "casez",
    "endcase",
    "default",
    "for",
    "while",
    "repeat",
    "forever",
    "integer",
    "real",
    "realtime",
    "time",
    "genvar",
    "generate",
    "endgenerate",
    "task",
    "endtask",
    "function",
    "endfunction",
    "parameter",
    "localparam",
    "defparam",
    "signed",
    "unsigned",
    "fork",
    "join",
    "wait",
];

/// Type keywords that may precede a parameter name.
const PARAM_TYPE_KEYWORDS: [&str; 6] =
    ["integer", "real", "realtime", "time", "signed", "unsigned"];

/// Scanner for the Verilog dialect.
pub struct VerilogScanner {
    state: ScannerState,
    testcase_identifier: String,
    current: Option<DesignUnit>,
}

impl VerilogScanner {
    /// Creates a scanner for one file compiled into `library`.
    pub fn new(config: &ScanConfig, library: &str, filename: &Path) -> Self {
        Self {
            state: ScannerState::new(library, filename),
            testcase_identifier: config.testcase_identifier().to_string(),
            current: None,
        }
    }

    fn flush_current(&mut self) {
        if let Some(unit) = self.current.take() {
            self.state.register_unit(unit);
        }
    }

    fn scan_line(&mut self, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = tokens.first() else {
            return;
        };

        match first {
            "module" | "macromodule" => {
                self.flush_current();
                if let Some(name) = tokens.get(1).map(|t| identifier_prefix(t)) {
                    if !name.is_empty() {
                        self.current = Some(DesignUnit::module(name));
                    }
                }
            }
            "endmodule" => self.flush_current(),
            "`include" => {
                if let Some(file) = quoted_value(line) {
                    if let Some(stem) = Path::new(file).file_stem() {
                        self.state.add_internal_dep(&stem.to_string_lossy());
                    }
                }
            }
            _ => {}
        }

        self.scan_parameters(line);
        self.scan_instantiation(line, &tokens);
        self.scan_testcases(line);
        self.scan_severity_tasks(line);
    }

    fn scan_parameters(&mut self, line: &str) {
        if self.current.is_none() {
            return;
        }
        for name in extract_parameters(line) {
            if let Some(unit) = &mut self.current {
                unit.add_parameter(&name);
            }
        }
    }

    /// `fifo u_fifo (...)` style instantiation: an unknown identifier in
    /// statement position followed by an instance name and a port list.
    fn scan_instantiation(&mut self, line: &str, tokens: &[&str]) {
        let Some(unit) = &mut self.current else {
            return;
        };
        let Some(&first) = tokens.first() else {
            return;
        };
        if !is_identifier(first) || VERILOG_KEYWORDS.contains(&first) {
            return;
        }
        let Some(&second) = tokens.get(1) else {
            return;
        };
        let second_ok = second.starts_with("#(") || is_identifier(identifier_prefix(second));
        if second_ok && line.contains('(') && first != unit.unit_name() {
            unit.add_internal_dep(first);
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

    fn scan_severity_tasks(&mut self, line: &str) {
        for (task, severity) in SEVERITY_TASKS {
            for _ in line.match_indices(task) {
                self.state.increment_assertion(severity);
            }
        }
    }
}

impl SourceScanner for VerilogScanner {
    fn state(&self) -> &ScannerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ScannerState {
        &mut self.state
    }

    /// Strips `//` line comments and `/* */` block comments and collapses
    /// whitespace, preserving case.
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
                    '/' if chars.peek() == Some(&'/') => break,
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        in_block = true;
                    }
                    _ => cleaned.push(c),
                }
            }
            let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
            lines.push(collapsed);
        }
        lines
    }

    fn tokenize(&mut self, lines: &[String]) {
        self.current = None;
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

/// The leading identifier characters of a token.
fn identifier_prefix(token: &str) -> &str {
    let end = token
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(token.len());
    &token[..end]
}

fn is_identifier(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !token.starts_with(|c: char| c.is_ascii_digit())
}

/// Extracts the first double-quoted value on the line.
fn quoted_value(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let end = start + line[start..].find('"')?;
    Some(&line[start..end])
}

/// Harvests parameter names from `parameter` declarations on the line.
fn extract_parameters(line: &str) -> Vec<String> {
    let mut names = Vec::new();
    for (idx, keyword) in line.match_indices("parameter") {
        let before_ok = line[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        let rest = &line[idx + keyword.len()..];
        if !before_ok || !rest.starts_with(|c: char| c.is_whitespace()) {
            continue;
        }
        let end = rest.find([')', ';']).unwrap_or(rest.len());
        for decl in rest[..end].split(',') {
            let name_part = match decl.split_once('=') {
                Some((lhs, _)) => lhs,
                None => decl,
            };
            if let Some(name) = name_part.split_whitespace().last() {
                if is_identifier(name) && !PARAM_TYPE_KEYWORDS.contains(&name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitKind;
    use std::path::Path;

    fn scanner() -> VerilogScanner {
        let mut config = ScanConfig::default();
        config.project.testcase_identifier = "TESTCASE".to_string();
        VerilogScanner::new(&config, "work", Path::new("rtl/counter.v"))
    }

    const COUNTER_SRC: &str = r#"
`include "defines.vh"

module counter #(parameter WIDTH = 8, DEPTH = 16) (
  input  wire             clk,
  input  wire             rst_n,
  output reg [WIDTH-1:0]  count
);
  // synchronous counter
  always @(posedge clk) begin
    if (!rst_n) count <= 0;
    else count <= count + 1;
  end
endmodule

module tb_counter;
  parameter TESTCASE = "";

  counter #(.WIDTH(16)) u_counter (
    .clk(clk)
  );

  initial begin
    if (TESTCASE == "overflow_test") begin
      $error("overflow");
    end
    $info("done");
    $fatal(1, "unreachable");
  end
endmodule
"#;

    #[test]
    fn extracts_modules_with_parameters() {
        let mut scanner = scanner();
        scanner.scan(COUNTER_SRC);
        assert_eq!(scanner.state().units().len(), 2);

        let counter = scanner.state().units().get("counter").unwrap();
        match counter.kind() {
            UnitKind::Module { parameters, .. } => {
                assert_eq!(parameters, &["width".to_string(), "depth".to_string()]);
            }
            other => panic!("expected module, got {other:?}"),
        }
        assert!(!counter.is_testbench());
        assert_eq!(counter.filename(), Some(Path::new("rtl/counter.v")));
    }

    #[test]
    fn include_becomes_internal_dep() {
        let mut scanner = scanner();
        scanner.scan(COUNTER_SRC);
        // Included files are project-local source: the stem lands on the
        // internal list, never the library list.
        assert!(scanner.state_mut().drain_library_deps().is_empty());
        assert_eq!(
            scanner.state_mut().drain_internal_deps(),
            vec!["defines".to_string()]
        );
    }

    #[test]
    fn instantiation_recorded_on_enclosing_module() {
        let mut scanner = scanner();
        scanner.scan(COUNTER_SRC);
        let tb = scanner.state().units().get("tb_counter").unwrap();
        assert!(tb.is_testbench());
        assert_eq!(tb.internal_deps(), &["counter".to_string()]);
    }

    #[test]
    fn testcases_and_severity_tasks() {
        let mut scanner = scanner();
        scanner.scan(COUNTER_SRC);
        assert_eq!(
            scanner.state().testcases(),
            &["overflow_test".to_string()]
        );
        let counts = scanner.state().assertions();
        assert_eq!(counts.note, 1);
        assert_eq!(counts.error, 1);
        assert_eq!(counts.failure, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn declarations_are_not_instantiations() {
        let src = "module m;\n  wire foo (bad);\n  reg r;\n  my_ip u0 (.a(a));\nendmodule\n";
        let mut scanner = scanner();
        scanner.scan(src);
        let m = scanner.state().units().get("m").unwrap();
        assert_eq!(m.internal_deps(), &["my_ip".to_string()]);
    }

    #[test]
    fn comments_are_stripped() {
        let src = "// module ghost;\nmodule real_one; /* $error(\"no\") */\nendmodule\n";
        let mut scanner = scanner();
        scanner.scan(src);
        assert_eq!(scanner.state().units().len(), 1);
        assert!(scanner.state().units().exists("real_one"));
        assert_eq!(scanner.state().assertions().total(), 0);
    }

    #[test]
    fn import_state_rebuilds_units() {
        let mut scanner = scanner();
        scanner.scan(COUNTER_SRC);
        let snapshot = scanner.state().export_state();

        let mut fresh = VerilogScanner::new(
            &ScanConfig::default(),
            "work",
            Path::new("unused.v"),
        );
        fresh.import_state(&snapshot);
        assert_eq!(fresh.state().export_state(), snapshot);
    }
}
