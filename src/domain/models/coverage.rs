//! Coverage model.
//!
//! Parses a fastcov-style JSON report into per-file [`CoverageRecord`]s.
//! The report keys every numeric field (line numbers, branch ids) as text,
//! so parsing coerces those keys to integers and rejects anything that does
//! not fit.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a coverage report.
#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("Failed to read coverage report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed coverage report: {0}")]
    MalformedReport(String),
}

/// Coverage of a single function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCoverage {
    /// Number of times the function was entered
    pub execution_count: u64,
    /// 1-based line where the function starts
    pub start_line: u32,
}

/// Coverage data for one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageRecord {
    /// Line number → execution count
    pub lines: BTreeMap<u32, u64>,
    /// Branch line → taken counts for each outcome
    pub branches: BTreeMap<u32, Vec<u64>>,
    /// Function name → execution count and start line
    pub functions: IndexMap<String, FunctionCoverage>,
}

impl CoverageRecord {
    /// Number of instrumented lines.
    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    /// Number of instrumented lines executed at least once.
    pub fn covered_lines(&self) -> usize {
        self.lines.values().filter(|count| **count > 0).count()
    }

    /// Line coverage in percent. A record without lines is 0% covered.
    pub fn line_coverage_percent(&self) -> f64 {
        let total = self.total_lines();
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let percent = self.covered_lines() as f64 / total as f64 * 100.0;
        percent
    }

    /// Functions that were never entered, in report order.
    pub fn unexecuted_functions(&self) -> impl Iterator<Item = (&str, &FunctionCoverage)> {
        self.functions
            .iter()
            .filter(|(_, info)| info.execution_count == 0)
            .map(|(name, info)| (name.as_str(), info))
    }

    /// Compact `{line: count, ...}` rendering of the line map, used as the
    /// coverage excerpt handed to the model.
    pub fn line_excerpt(&self) -> String {
        let body = self
            .lines
            .iter()
            .map(|(line, count)| format!("{line}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{body}}}")
    }
}

/// Parsed coverage report: source path → record, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    files: IndexMap<String, CoverageRecord>,
}

impl Coverage {
    /// Load and parse a report from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoverageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CoverageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Parse a report from its JSON text.
    pub fn parse(raw: &str) -> Result<Self, CoverageError> {
        let report: RawReport = serde_json::from_str(raw)
            .map_err(|e| CoverageError::MalformedReport(e.to_string()))?;

        let mut files = IndexMap::with_capacity(report.sources.len());
        for (source, mut per_test) in report.sources {
            // fastcov stores the merged record under the empty test name.
            let file = match per_test.shift_remove("") {
                Some(file) => file,
                None => per_test.into_values().next().ok_or_else(|| {
                    CoverageError::MalformedReport(format!("source '{source}' has no coverage entry"))
                })?,
            };
            let record = file.into_record(&source)?;
            files.insert(source, record);
        }

        Ok(Self { files })
    }

    /// Build a coverage snapshot directly from records.
    pub fn from_records(records: impl IntoIterator<Item = (String, CoverageRecord)>) -> Self {
        Self {
            files: records.into_iter().collect(),
        }
    }

    /// Iterate files in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CoverageRecord)> {
        self.files.iter().map(|(path, record)| (path.as_str(), record))
    }

    pub fn get(&self, path: &str) -> Option<&CoverageRecord> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawReport {
    sources: IndexMap<String, IndexMap<String, RawCoverageFile>>,
}

#[derive(Debug, Deserialize)]
struct RawCoverageFile {
    #[serde(default)]
    branches: IndexMap<String, Vec<u64>>,
    #[serde(default)]
    functions: IndexMap<String, FunctionCoverage>,
    #[serde(default)]
    lines: IndexMap<String, u64>,
}

impl RawCoverageFile {
    fn into_record(self, source: &str) -> Result<CoverageRecord, CoverageError> {
        let mut lines = BTreeMap::new();
        for (line, count) in self.lines {
            lines.insert(parse_key(source, "line", &line)?, count);
        }

        let mut branches = BTreeMap::new();
        for (branch, taken) in self.branches {
            branches.insert(parse_key(source, "branch", &branch)?, taken);
        }

        Ok(CoverageRecord {
            lines,
            branches,
            functions: self.functions,
        })
    }
}

fn parse_key(source: &str, kind: &str, key: &str) -> Result<u32, CoverageError> {
    key.trim().parse::<u32>().map_err(|_| {
        CoverageError::MalformedReport(format!(
            "{kind} key '{key}' in '{source}' is not a non-negative integer"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "sources": {
            "src/odb/defin.cpp": {
                "": {
                    "branches": {"12": [1, 0], "40": [0, 0]},
                    "functions": {
                        "defin::readChip": {"execution_count": 3, "start_line": 10},
                        "defin::replaceWires": {"execution_count": 0, "start_line": 38}
                    },
                    "lines": {"10": 3, "11": 3, "12": 1, "38": 0, "39": 0}
                }
            },
            "src/odb/empty.cpp": {
                "": {"branches": {}, "functions": {}, "lines": {}}
            }
        }
    }"#;

    #[test]
    fn test_parse_coerces_numeric_keys() {
        let coverage = Coverage::parse(REPORT).unwrap();
        let record = coverage.get("src/odb/defin.cpp").unwrap();

        assert_eq!(record.lines.get(&10), Some(&3));
        assert_eq!(record.lines.get(&38), Some(&0));
        assert_eq!(record.branches.get(&12), Some(&vec![1, 0]));
        assert_eq!(record.functions["defin::replaceWires"].start_line, 38);
    }

    #[test]
    fn test_parse_preserves_report_order() {
        let coverage = Coverage::parse(REPORT).unwrap();
        let paths: Vec<_> = coverage.iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["src/odb/defin.cpp", "src/odb/empty.cpp"]);
    }

    #[test]
    fn test_line_coverage_percent() {
        let coverage = Coverage::parse(REPORT).unwrap();
        let record = coverage.get("src/odb/defin.cpp").unwrap();
        assert_eq!(record.total_lines(), 5);
        assert_eq!(record.covered_lines(), 3);
        assert!((record.line_coverage_percent() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_record_is_zero_percent() {
        let coverage = Coverage::parse(REPORT).unwrap();
        let record = coverage.get("src/odb/empty.cpp").unwrap();
        assert!(record.line_coverage_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn test_unexecuted_functions() {
        let coverage = Coverage::parse(REPORT).unwrap();
        let record = coverage.get("src/odb/defin.cpp").unwrap();
        let names: Vec<_> = record.unexecuted_functions().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["defin::replaceWires"]);
    }

    #[test]
    fn test_falls_back_to_first_test_name() {
        let raw = r#"{"sources": {"a.cpp": {"unit": {"lines": {"1": 1}}}}}"#;
        let coverage = Coverage::parse(raw).unwrap();
        assert_eq!(coverage.get("a.cpp").unwrap().covered_lines(), 1);
    }

    #[test]
    fn test_missing_sources_is_malformed() {
        let err = Coverage::parse(r#"{"files": {}}"#).unwrap_err();
        assert!(matches!(err, CoverageError::MalformedReport(_)));
    }

    #[test]
    fn test_non_integer_line_key_is_malformed() {
        let raw = r#"{"sources": {"a.cpp": {"": {"lines": {"ten": 1}}}}}"#;
        let err = Coverage::parse(raw).unwrap_err();
        assert!(err.to_string().contains("line key 'ten'"));
    }

    #[test]
    fn test_empty_test_map_is_malformed() {
        let err = Coverage::parse(r#"{"sources": {"a.cpp": {}}}"#).unwrap_err();
        assert!(matches!(err, CoverageError::MalformedReport(_)));
    }

    #[test]
    fn test_line_excerpt() {
        let record = CoverageRecord {
            lines: BTreeMap::from([(1, 0), (2, 4)]),
            ..Default::default()
        };
        assert_eq!(record.line_excerpt(), "{1: 0, 2: 4}");
    }
}
