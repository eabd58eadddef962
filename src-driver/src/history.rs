//! Evaluation history: store every callback result in a CSV file and replay a
//! stored file on a later run (hot start).
//!
//! Rows have no header and a variable number of fields:
//!
//! ```text
//! kind, fail, n_x, n_obj, x_0..x_{n_x-1}, values...
//! ```
//!
//! `kind` is `eval` or `grad`. For `eval` the values are the objectives followed
//! by the constraints. For `grad` they are the objective rows then the
//! constraint rows of the Jacobian, row-major, `n_x` columns each.
//!
//! Replay is positional: the stored record is used only while the solver asks
//! for the same kind at the same point, in the same order. The first mismatch
//! ends the replay for the rest of the run.

use ndarray::Array2;
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::callbacks::{Evaluation, Gradient};
use crate::error::DriverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Eval,
    Grad,
}

impl RecordKind {
    fn as_str(self) -> &'static str {
        match self {
            RecordKind::Eval => "eval",
            RecordKind::Grad => "grad",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Record {
    kind: RecordKind,
    fail: bool,
    x: Vec<f64>,
    n_obj: usize,
    values: Vec<f64>,
}

pub struct History {
    writer: Option<csv::Writer<File>>,
    store_path: Option<PathBuf>,
    replay: VecDeque<Record>,
    replayed: usize,
}

impl History {
    /// Open the history files for a run.
    ///
    /// `hot_start` is read completely before `store` is created, so both may
    /// point to the same file. Returns `None` when neither is set.
    pub fn open(hot_start: Option<&Path>, store: Option<&Path>) -> Result<Option<History>, DriverError> {
        if hot_start.is_none() && store.is_none() {
            return Ok(None);
        }
        let replay = match hot_start {
            Some(path) if path.exists() => read_records(path)?,
            Some(path) => {
                log::warn!("hot start file {} does not exist, starting cold", path.display());
                VecDeque::new()
            }
            None => VecDeque::new(),
        };
        if let Some(path) = hot_start {
            log::info!("hot start: {} stored records from {}", replay.len(), path.display());
        }
        let writer = match store {
            Some(path) => Some(
                csv::WriterBuilder::new()
                    .has_headers(false)
                    .flexible(true)
                    .from_path(path)
                    .map_err(|e| history_error(path, e))?,
            ),
            None => None,
        };
        Ok(Some(History {
            writer,
            store_path: store.map(Path::to_path_buf),
            replay,
            replayed: 0,
        }))
    }

    /// Number of callbacks answered from the hot start file
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    fn next_matching(&mut self, kind: RecordKind, x: &[f64]) -> Option<Record> {
        let front = self.replay.front()?;
        if front.kind == kind && front.x == x {
            self.replayed += 1;
            return self.replay.pop_front();
        }
        log::info!(
            "hot start diverged after {} records ({} requested at {:?}), evaluating from here",
            self.replayed,
            kind.as_str(),
            x
        );
        self.replay.clear();
        None
    }

    /// Stored evaluation for `x`, if replay is still in step with the solver
    pub fn replay_eval(&mut self, x: &[f64]) -> Option<Evaluation> {
        let rec = self.next_matching(RecordKind::Eval, x)?;
        let n_obj = rec.n_obj.min(rec.values.len());
        let evaluation = Evaluation {
            objectives: rec.values[..n_obj].to_vec(),
            constraints: rec.values[n_obj..].to_vec(),
            fail: rec.fail,
        };
        self.record_eval(x, &evaluation);
        Some(evaluation)
    }

    /// Stored gradient for `x`, if replay is still in step with the solver
    pub fn replay_gradient(&mut self, x: &[f64]) -> Option<Gradient> {
        let rec = self.next_matching(RecordKind::Grad, x)?;
        let n = rec.x.len();
        let gradient = if n == 0 || rec.values.len() % n != 0 || rec.n_obj * n > rec.values.len() {
            log::warn!("malformed gradient record in hot start file, ignoring it");
            return None;
        } else {
            let split = rec.n_obj * n;
            let n_con = (rec.values.len() - split) / n;
            let objectives = Array2::from_shape_vec((rec.n_obj, n), rec.values[..split].to_vec());
            let constraints = Array2::from_shape_vec((n_con, n), rec.values[split..].to_vec());
            match (objectives, constraints) {
                (Ok(objectives), Ok(constraints)) => Gradient {
                    objectives,
                    constraints,
                    fail: rec.fail,
                },
                _ => return None,
            }
        };
        self.record_gradient(x, &gradient);
        Some(gradient)
    }

    pub fn record_eval(&mut self, x: &[f64], evaluation: &Evaluation) {
        let mut values = evaluation.objectives.clone();
        values.extend_from_slice(&evaluation.constraints);
        self.write(RecordKind::Eval, evaluation.fail, x, evaluation.objectives.len(), &values);
    }

    pub fn record_gradient(&mut self, x: &[f64], gradient: &Gradient) {
        let mut values: Vec<f64> = gradient.objectives.iter().copied().collect();
        values.extend(gradient.constraints.iter().copied());
        self.write(RecordKind::Grad, gradient.fail, x, gradient.objectives.nrows(), &values);
    }

    fn write(&mut self, kind: RecordKind, fail: bool, x: &[f64], n_obj: usize, values: &[f64]) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let mut row: Vec<String> = Vec::with_capacity(4 + x.len() + values.len());
        row.push(kind.as_str().to_string());
        row.push(if fail { "1" } else { "0" }.to_string());
        row.push(x.len().to_string());
        row.push(n_obj.to_string());
        row.extend(x.iter().map(|v| v.to_string()));
        row.extend(values.iter().map(|v| v.to_string()));
        if let Err(e) = writer.write_record(&row) {
            log::warn!("failed to write history record: {}", e);
        }
    }

    /// Flush the store file
    pub fn finish(mut self) -> Result<(), DriverError> {
        if let (Some(writer), Some(path)) = (self.writer.as_mut(), self.store_path.as_ref()) {
            writer.flush().map_err(|e| history_error(path, e))?;
        }
        Ok(())
    }
}

fn history_error(path: &Path, e: impl std::fmt::Display) -> DriverError {
    DriverError::History {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn read_records(path: &Path) -> Result<VecDeque<Record>, DriverError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| history_error(path, e))?;
    let mut records = VecDeque::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| history_error(path, e))?;
        let bad = |what: &str| history_error(path, format!("line {}: {}", line + 1, what));
        let kind = match row.get(0) {
            Some("eval") => RecordKind::Eval,
            Some("grad") => RecordKind::Grad,
            _ => return Err(bad("unknown record kind")),
        };
        let fail = row.get(1) == Some("1");
        let n_x: usize = row
            .get(2)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| bad("bad variable count"))?;
        let n_obj: usize = row
            .get(3)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| bad("bad objective count"))?;
        let numbers = row
            .iter()
            .skip(4)
            .map(|s| s.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| bad(&e.to_string()))?;
        if numbers.len() < n_x {
            return Err(bad("truncated record"));
        }
        records.push_back(Record {
            kind,
            fail,
            x: numbers[..n_x].to_vec(),
            n_obj,
            values: numbers[n_x..].to_vec(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn eval(obj: f64, con: f64) -> Evaluation {
        Evaluation {
            objectives: vec![obj],
            constraints: vec![con],
            fail: false,
        }
    }

    #[test]
    fn store_then_replay_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.csv");
        {
            let mut h = History::open(None, Some(&path)).unwrap().unwrap();
            h.record_eval(&[1.0, 2.0], &eval(3.0, -1.0));
            h.record_gradient(
                &[1.0, 2.0],
                &Gradient {
                    objectives: array![[0.5, 0.25]],
                    constraints: array![[1.0, -1.0]],
                    fail: false,
                },
            );
            h.record_eval(&[0.1, 0.2], &eval(f64::INFINITY, 0.0));
            h.finish().unwrap();
        }

        let mut h = History::open(Some(&path), None).unwrap().unwrap();
        assert_eq!(h.replay_eval(&[1.0, 2.0]), Some(eval(3.0, -1.0)));
        let g = h.replay_gradient(&[1.0, 2.0]).unwrap();
        assert_eq!(g.objectives, array![[0.5, 0.25]]);
        assert_eq!(g.constraints, array![[1.0, -1.0]]);
        let e = h.replay_eval(&[0.1, 0.2]).unwrap();
        assert!(e.objectives[0].is_infinite());
        assert_eq!(h.replayed(), 3);
        assert_eq!(h.replay_eval(&[0.1, 0.2]), None);
    }

    #[test]
    fn divergence_stops_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.csv");
        {
            let mut h = History::open(None, Some(&path)).unwrap().unwrap();
            h.record_eval(&[1.0], &eval(1.0, 0.0));
            h.record_eval(&[2.0], &eval(2.0, 0.0));
            h.finish().unwrap();
        }
        let mut h = History::open(Some(&path), None).unwrap().unwrap();
        assert_eq!(h.replay_eval(&[1.5]), None);
        // the matching record for [2.0] is gone too
        assert_eq!(h.replay_eval(&[2.0]), None);
        assert_eq!(h.replayed(), 0);
    }

    #[test]
    fn same_file_for_hot_start_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.csv");
        {
            let mut h = History::open(None, Some(&path)).unwrap().unwrap();
            h.record_eval(&[1.0], &eval(1.0, 0.0));
            h.finish().unwrap();
        }
        {
            let mut h = History::open(Some(&path), Some(&path)).unwrap().unwrap();
            assert!(h.replay_eval(&[1.0]).is_some());
            h.record_eval(&[3.0], &eval(9.0, 0.0));
            h.finish().unwrap();
        }
        let mut h = History::open(Some(&path), None).unwrap().unwrap();
        assert!(h.replay_eval(&[1.0]).is_some());
        assert_eq!(h.replay_eval(&[3.0]), Some(eval(9.0, 0.0)));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "eval,0,1,1,abc,1\n").unwrap();
        assert!(matches!(
            History::open(Some(&path), None),
            Err(DriverError::History { .. })
        ));
    }
}
