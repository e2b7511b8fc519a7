//! Per-scenario outcomes and the suite-level report.

use crate::Result;
use fareflow_scenario::BookingStage;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of one scenario, across all of its attempts.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub id: String,
    pub description: String,
    pub passed: bool,
    /// Stage the scenario was asked to reach.
    pub target: BookingStage,
    /// Stage the last attempt actually completed.
    pub reached: Option<BookingStage>,
    pub pnr: Option<String>,
    pub duration_ms: u64,
    pub retries: u32,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
}

/// Aggregated results for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub started_at: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteReport {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            started_at: chrono::Local::now().to_rfc3339(),
            total: 0,
            passed: 0,
            failed: 0,
            duration_ms: 0,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, result: ScenarioResult) {
        self.total += 1;
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.duration_ms += result.duration_ms;
        self.results.push(result);
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Write the report as pretty JSON for CI archiving.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.results {
            let mark = if r.passed { "✓" } else { "✗" };
            write!(f, "{mark} {}", r.id)?;
            if !r.description.is_empty() {
                write!(f, " - {}", r.description)?;
            }
            match r.reached {
                Some(stage) => write!(f, " [{stage}/{}]", r.target)?,
                None => write!(f, " [-/{}]", r.target)?,
            }
            if let Some(ref pnr) = r.pnr {
                write!(f, " PNR {pnr}")?;
            }
            if r.retries > 0 {
                write!(f, " ({} retries)", r.retries)?;
            }
            if let Some(ref error) = r.error {
                write!(f, "\n    {error}")?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        write!(
            f,
            "{}: {}/{} passed in {}ms",
            self.suite, self.passed, self.total, self.duration_ms
        )
    }
}
