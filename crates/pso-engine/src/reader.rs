//! Reads the tabular artifacts the engine leaves behind after a run.

use csv::{ReaderBuilder, Trim};
use pso_types::{OptimizationResult, PsoError, PsoResult, VARIABLE_COUNT};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Best-parameters table: row 0 normalized, row 1 physical.
pub const BEST_PARAMS_ARTIFACT: &str = "gbest_param.csv";
/// Objective table: elements 4 and 5 are acceleration time and fuel consumption.
pub const OBJECTIVE_ARTIFACT: &str = "Pareto_result.csv";
/// Convergence history of the weighted objective.
pub const HISTORY_ARTIFACT: &str = "gbest_hist.csv";

pub const ARTIFACTS: [&str; 3] = [BEST_PARAMS_ARTIFACT, OBJECTIVE_ARTIFACT, HISTORY_ARTIFACT];

const ACCELERATION_INDEX: usize = 4;
const FUEL_INDEX: usize = 5;

/// Result fields plus any per-artifact parse problems.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub result: OptimizationResult,
    pub issues: Vec<PsoError>,
}

/// Reads artifacts from a single directory.
#[derive(Debug, Clone)]
pub struct ResultReader {
    dir: PathBuf,
}

impl ResultReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Names of the artifacts currently present.
    pub fn present_artifacts(&self) -> Vec<&'static str> {
        ARTIFACTS
            .into_iter()
            .filter(|name| self.dir.join(name).is_file())
            .collect()
    }

    /// Remove artifacts left behind by an earlier run, so that a run which
    /// writes fewer files reports the rest as absent. Returns what was removed.
    pub fn clear_artifacts(&self) -> PsoResult<Vec<&'static str>> {
        let mut removed = Vec::new();
        for name in ARTIFACTS {
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => removed.push(name),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if !removed.is_empty() {
            debug!("Removed stale artifacts {:?}", removed);
        }
        Ok(removed)
    }

    /// Read whatever artifacts exist. Missing artifacts leave their fields
    /// unset; malformed ones are reported in `issues` without discarding the
    /// fields read from the others.
    pub fn read_results(&self) -> ReadOutcome {
        let mut outcome = ReadOutcome::default();

        if let Some(table) = self.load(BEST_PARAMS_ARTIFACT, &mut outcome.issues) {
            match best_params(&table) {
                Ok((normalized, physical)) => {
                    outcome.result.normalized_params = Some(normalized);
                    outcome.result.physical_params = Some(physical);
                }
                Err(message) => outcome
                    .issues
                    .push(PsoError::parse(BEST_PARAMS_ARTIFACT, message)),
            }
        }

        if let Some(table) = self.load(OBJECTIVE_ARTIFACT, &mut outcome.issues) {
            let flat: Vec<f64> = table.into_iter().flatten().collect();
            match (flat.get(ACCELERATION_INDEX), flat.get(FUEL_INDEX)) {
                (Some(&acceleration), Some(&fuel)) => {
                    outcome.result.acceleration_time_s = Some(acceleration);
                    outcome.result.fuel_consumption = Some(fuel);
                }
                _ => outcome.issues.push(PsoError::parse(
                    OBJECTIVE_ARTIFACT,
                    format!("expected at least {} values, found {}", FUEL_INDEX + 1, flat.len()),
                )),
            }
        }

        if let Some(table) = self.load(HISTORY_ARTIFACT, &mut outcome.issues) {
            match table.last().and_then(|row| row.last()) {
                Some(&objective) => outcome.result.final_objective = Some(objective),
                None => outcome
                    .issues
                    .push(PsoError::parse(HISTORY_ARTIFACT, "convergence history is empty")),
            }
        }

        for issue in &outcome.issues {
            warn!("{}", issue);
        }
        outcome
    }

    /// Like [`read_results`](Self::read_results) but fails on the first malformed artifact.
    pub fn read_strict(&self) -> PsoResult<OptimizationResult> {
        let mut outcome = self.read_results();
        if outcome.issues.is_empty() {
            Ok(outcome.result)
        } else {
            Err(outcome.issues.remove(0))
        }
    }

    fn load(&self, artifact: &'static str, issues: &mut Vec<PsoError>) -> Option<Vec<Vec<f64>>> {
        let path = self.dir.join(artifact);
        if !path.is_file() {
            debug!("Artifact {} not present, skipping", artifact);
            return None;
        }
        match read_table(&path, artifact) {
            Ok(table) => Some(table),
            Err(e) => {
                issues.push(e);
                None
            }
        }
    }
}

/// Parse a comma-delimited numeric table. Blank lines are ignored and rows
/// may differ in length.
pub fn read_table(path: &Path, artifact: &str) -> PsoResult<Vec<Vec<f64>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| PsoError::parse(artifact, e.to_string()))?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PsoError::parse(artifact, e.to_string()))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(column, cell)| {
                cell.parse::<f64>().map_err(|_| {
                    PsoError::parse(
                        artifact,
                        format!("row {line}, column {column}: '{cell}' is not a number"),
                    )
                })
            })
            .collect::<PsoResult<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

type ParamRow = [f64; VARIABLE_COUNT];

fn best_params(table: &[Vec<f64>]) -> Result<(ParamRow, ParamRow), String> {
    let row = |index: usize| -> Result<ParamRow, String> {
        let values = table
            .get(index)
            .ok_or_else(|| format!("expected at least 2 rows, found {}", table.len()))?;
        values
            .get(..VARIABLE_COUNT)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| {
                format!(
                    "row {index} has {} columns, expected at least {VARIABLE_COUNT}",
                    values.len()
                )
            })
    };
    Ok((row(0)?, row(1)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn reads_all_artifacts_at_fixed_positions() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            BEST_PARAMS_ARTIFACT,
            "0.1,0.2,0.3,0.4,0.99\n62.5,21.0,1.8,5.0,123\n",
        );
        write(dir.path(), OBJECTIVE_ARTIFACT, "0.1,0.2,0.3,0.4,7.9,455.2,0.6\n");
        write(dir.path(), HISTORY_ARTIFACT, "1.9,1.7\n1.5,1.2\n");

        let outcome = ResultReader::new(dir.path()).read_results();
        assert!(outcome.issues.is_empty());

        let result = outcome.result;
        assert!(result.is_complete());
        assert_eq!(result.normalized_params, Some([0.1, 0.2, 0.3, 0.4]));
        assert_eq!(result.physical_params, Some([62.5, 21.0, 1.8, 5.0]));
        assert_eq!(result.acceleration_time_s, Some(7.9));
        assert_eq!(result.fuel_consumption, Some(455.2));
        assert_eq!(result.final_objective, Some(1.2));
    }

    #[test]
    fn objective_positions_span_rows() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), OBJECTIVE_ARTIFACT, "0.1,0.2,0.3\n0.4,8.1,460.0\n");

        let result = ResultReader::new(dir.path()).read_strict().unwrap();
        assert_eq!(result.acceleration_time_s, Some(8.1));
        assert_eq!(result.fuel_consumption, Some(460.0));
    }

    #[test]
    fn only_best_params_gives_partial_result() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), BEST_PARAMS_ARTIFACT, "0.5,0.5,0.5,0.5\n60,25,1.85,5\n");

        let reader = ResultReader::new(dir.path());
        assert_eq!(reader.present_artifacts(), vec![BEST_PARAMS_ARTIFACT]);

        let outcome = reader.read_results();
        assert!(outcome.issues.is_empty());
        let result = outcome.result;
        assert!(!result.is_complete());
        assert_eq!(result.physical_params, Some([60.0, 25.0, 1.85, 5.0]));
        assert_eq!(result.acceleration_time_s, None);
        assert_eq!(result.fuel_consumption, None);
        assert_eq!(result.final_objective, None);
    }

    #[test]
    fn no_artifacts_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ResultReader::new(dir.path()).read_results();
        assert!(outcome.issues.is_empty());
        assert!(outcome.result.is_empty());
    }

    #[test]
    fn malformed_artifact_is_reported_without_dropping_others() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), BEST_PARAMS_ARTIFACT, "0.5,0.5,0.5,0.5\n60,25,1.85,5\n");
        write(dir.path(), HISTORY_ARTIFACT, "1.5\nnot-a-number\n");

        let outcome = ResultReader::new(dir.path()).read_results();
        assert_eq!(outcome.issues.len(), 1);
        match &outcome.issues[0] {
            PsoError::Parse { artifact, message } => {
                assert_eq!(artifact, HISTORY_ARTIFACT);
                assert!(message.contains("not-a-number"));
            }
            other => panic!("Expected Parse error, got {other:?}"),
        }
        assert!(outcome.result.physical_params.is_some());
        assert!(outcome.result.final_objective.is_none());
    }

    #[test]
    fn short_best_params_table_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), BEST_PARAMS_ARTIFACT, "0.5,0.5,0.5\n");

        let err = ResultReader::new(dir.path()).read_strict().unwrap_err();
        assert!(matches!(err, PsoError::Parse { ref artifact, .. } if artifact == BEST_PARAMS_ARTIFACT));
    }

    #[test]
    fn short_objective_table_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), OBJECTIVE_ARTIFACT, "1,2,3,4,5\n");

        let err = ResultReader::new(dir.path()).read_strict().unwrap_err();
        assert!(matches!(err, PsoError::Parse { ref artifact, .. } if artifact == OBJECTIVE_ARTIFACT));
    }

    #[test]
    fn clearing_removes_only_known_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), HISTORY_ARTIFACT, "9.99\n");
        write(dir.path(), "notes.csv", "keep me\n");

        let reader = ResultReader::new(dir.path());
        assert_eq!(reader.clear_artifacts().unwrap(), vec![HISTORY_ARTIFACT]);
        assert!(reader.present_artifacts().is_empty());
        assert!(dir.path().join("notes.csv").exists());
        assert!(reader.clear_artifacts().unwrap().is_empty());
    }
}
