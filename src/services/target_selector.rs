//! Target selection from a coverage snapshot.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::errors::SelectionError;
use crate::domain::models::{Coverage, Target, TargetMode};

/// Half-open coverage window `[min, max)` in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionWindow {
    min: f64,
    max: f64,
}

impl SelectionWindow {
    /// Both bounds must lie in `[0, 100]` and `min` must be below `max`.
    pub fn new(min: f64, max: f64) -> Result<Self, SelectionError> {
        for (name, value) in [("min-threshold", min), ("threshold", max)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(SelectionError::ThresholdOutOfRange { name, value });
            }
        }
        if min >= max {
            return Err(SelectionError::InvertedWindow { min, max });
        }
        Ok(Self { min, max })
    }

    pub const fn min(&self) -> f64 {
        self.min
    }

    pub const fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, percent: f64) -> bool {
        self.min <= percent && percent < self.max
    }
}

/// Turns a coverage snapshot into an ordered list of targets.
///
/// Files that are missing on disk never become targets.
pub struct TargetSelector {
    window: SelectionWindow,
    exists: fn(&Path) -> bool,
}

impl TargetSelector {
    pub fn new(window: SelectionWindow) -> Self {
        Self {
            window,
            exists: Path::exists,
        }
    }

    /// Replace the on-disk existence check.
    pub fn with_existence_check(mut self, exists: fn(&Path) -> bool) -> Self {
        self.exists = exists;
        self
    }

    pub const fn window(&self) -> SelectionWindow {
        self.window
    }

    pub fn select(&self, coverage: &Coverage, mode: TargetMode) -> Vec<Target> {
        match mode {
            TargetMode::File => self.select_files(coverage),
            TargetMode::Function => self.select_functions(coverage),
        }
    }

    /// Files whose line coverage lies inside the window, in report order.
    pub fn select_files(&self, coverage: &Coverage) -> Vec<Target> {
        let targets: Vec<Target> = coverage
            .iter()
            .filter_map(|(path, record)| {
                let path = PathBuf::from(path);
                if !(self.exists)(&path) {
                    debug!(path = %path.display(), "Skipping missing source file");
                    return None;
                }
                let coverage_percent = record.line_coverage_percent();
                self.window.contains(coverage_percent).then(|| Target::File {
                    path,
                    coverage_percent,
                    record: record.clone(),
                })
            })
            .collect();

        info!(
            selected = targets.len(),
            files = coverage.len(),
            min = self.window.min,
            max = self.window.max,
            "Selected low-coverage files"
        );
        targets
    }

    /// Every function that was never executed, in report order.
    pub fn select_functions(&self, coverage: &Coverage) -> Vec<Target> {
        let mut targets = Vec::new();
        for (path, record) in coverage.iter() {
            let path = PathBuf::from(path);
            if !(self.exists)(&path) {
                warn!(path = %path.display(), "Target file not found, skipping its functions");
                continue;
            }
            targets.extend(record.unexecuted_functions().map(|(name, info)| {
                Target::Function {
                    path: path.clone(),
                    name: name.to_string(),
                    start_line: info.start_line,
                }
            }));
        }

        info!(selected = targets.len(), "Selected zero-coverage functions");
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CoverageRecord, FunctionCoverage};

    fn everything_exists(_: &Path) -> bool {
        true
    }

    fn record(covered: u32, total: u32) -> CoverageRecord {
        CoverageRecord {
            lines: (1..=total).map(|l| (l, u64::from(l <= covered))).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_window_bounds() {
        let window = SelectionWindow::new(10.0, 40.0).unwrap();
        assert!(window.contains(10.0));
        assert!(window.contains(39.99));
        assert!(!window.contains(40.0));
        assert!(!window.contains(9.99));
    }

    #[test]
    fn test_window_validation() {
        assert_eq!(
            SelectionWindow::new(50.0, 40.0).unwrap_err(),
            SelectionError::InvertedWindow { min: 50.0, max: 40.0 }
        );
        assert!(matches!(
            SelectionWindow::new(40.0, 40.0),
            Err(SelectionError::InvertedWindow { .. })
        ));
        assert!(matches!(
            SelectionWindow::new(0.0, 101.0),
            Err(SelectionError::ThresholdOutOfRange { name: "threshold", .. })
        ));
        assert!(matches!(
            SelectionWindow::new(-1.0, 40.0),
            Err(SelectionError::ThresholdOutOfRange { name: "min-threshold", .. })
        ));
        assert!(SelectionWindow::new(0.0, 100.0).is_ok());
    }

    #[test]
    fn test_select_files_in_report_order() {
        let coverage = Coverage::from_records([
            ("b.cpp".to_string(), record(1, 10)),
            ("a.cpp".to_string(), record(10, 50)),
            ("full.cpp".to_string(), record(5, 5)),
            ("empty.cpp".to_string(), CoverageRecord::default()),
        ]);
        let selector = TargetSelector::new(SelectionWindow::new(0.0, 40.0).unwrap())
            .with_existence_check(everything_exists);

        let paths: Vec<_> = selector
            .select_files(&coverage)
            .iter()
            .map(|t| t.path().to_path_buf())
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("b.cpp"),
                PathBuf::from("a.cpp"),
                PathBuf::from("empty.cpp")
            ]
        );
    }

    #[test]
    fn test_missing_files_are_excluded() {
        let coverage = Coverage::from_records([(
            "/definitely/not/here.cpp".to_string(),
            record(0, 10),
        )]);
        let selector = TargetSelector::new(SelectionWindow::new(0.0, 100.0).unwrap());
        assert!(selector.select(&coverage, TargetMode::File).is_empty());
        assert!(selector.select(&coverage, TargetMode::Function).is_empty());
    }

    #[test]
    fn test_select_functions() {
        let mut rec = record(1, 4);
        rec.functions.insert(
            "odb::defin::readChip".to_string(),
            FunctionCoverage {
                execution_count: 0,
                start_line: 12,
            },
        );
        rec.functions.insert(
            "odb::defin::defin".to_string(),
            FunctionCoverage {
                execution_count: 3,
                start_line: 2,
            },
        );
        let coverage = Coverage::from_records([("defin.cpp".to_string(), rec)]);
        let selector = TargetSelector::new(SelectionWindow::new(0.0, 40.0).unwrap())
            .with_existence_check(everything_exists);

        let targets = selector.select(&coverage, TargetMode::Function);
        assert_eq!(
            targets,
            vec![Target::Function {
                path: PathBuf::from("defin.cpp"),
                name: "odb::defin::readChip".to_string(),
                start_line: 12,
            }]
        );
    }
}
