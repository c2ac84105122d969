//! Gradient-boosted regression trees with early stopping.
//!
//! Squared-error boosting: the ensemble starts at the mean of the training
//! targets and each round fits one depth-limited tree to the current
//! residuals, added with a shrinkage factor. When an evaluation set is given,
//! training stops once its RMSE has not improved for
//! `early_stopping_rounds` rounds and the ensemble is cut back to the best
//! round.

use crate::forecast::error::BoostingError;
use bon::Builder;
use log::debug;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

type RegressionTree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct BoostingParams {
    /// Upper bound on the number of trees.
    #[builder(default = 1000)]
    pub max_rounds: usize,
    #[builder(default = 0.01)]
    pub learning_rate: f64,
    /// Rounds without evaluation improvement before stopping. `0` disables.
    #[builder(default = 50)]
    pub early_stopping_rounds: usize,
    #[builder(default = 6)]
    pub max_depth: u16,
    #[builder(default = 1)]
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// How a fit went.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    /// Trees fitted before stopping, including any cut afterwards.
    pub rounds_trained: usize,
    /// Trees kept. Equals `rounds_trained` without an evaluation set.
    pub best_round: usize,
    /// Evaluation RMSE at `best_round`, if an evaluation set was given.
    pub best_eval_rmse: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    base_score: f64,
    learning_rate: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fits on `(x_train, y_train)`, stopping early against `eval` if given.
    pub fn fit(
        params: &BoostingParams,
        x_train: &[Vec<f64>],
        y_train: &[f64],
        eval: Option<(&[Vec<f64>], &[f64])>,
    ) -> Result<(Self, FitReport), BoostingError> {
        let n_features = validate(x_train, y_train)?;
        let eval = match eval {
            Some((x_eval, y_eval)) if !x_eval.is_empty() => {
                check_rows(x_eval, n_features)?;
                check_targets(x_eval, y_eval)?;
                Some((DenseMatrix::from_2d_vec(&x_eval.to_vec()), y_eval))
            }
            _ => None,
        };

        let base_score = y_train.iter().sum::<f64>() / y_train.len() as f64;
        let x = DenseMatrix::from_2d_vec(&x_train.to_vec());
        let tree_params = DecisionTreeRegressorParameters::default()
            .with_max_depth(params.max_depth)
            .with_min_samples_leaf(params.min_samples_leaf);

        let mut train_pred = vec![base_score; y_train.len()];
        let mut eval_pred = eval
            .as_ref()
            .map(|(_, y_eval)| vec![base_score; y_eval.len()]);
        let mut best: Option<(usize, f64)> = None;
        let mut trees: Vec<RegressionTree> = Vec::new();

        for round in 1..=params.max_rounds {
            let residuals: Vec<f64> = y_train
                .iter()
                .zip(&train_pred)
                .map(|(y, p)| y - p)
                .collect();
            let tree = RegressionTree::fit(&x, &residuals, tree_params.clone())
                .map_err(|e| BoostingError::Tree(e.to_string()))?;
            add_scaled(&mut train_pred, &predict_tree(&tree, &x)?, params.learning_rate);

            let mut stale = false;
            if let (Some((x_eval, y_eval)), Some(eval_pred)) = (&eval, eval_pred.as_mut()) {
                add_scaled(eval_pred, &predict_tree(&tree, x_eval)?, params.learning_rate);
                let score = rmse(eval_pred, y_eval);
                if best.is_none_or(|(_, best_score)| score < best_score) {
                    best = Some((round, score));
                } else if params.early_stopping_rounds > 0 {
                    let best_round = best.map_or(0, |(r, _)| r);
                    stale = round - best_round >= params.early_stopping_rounds;
                }
            }
            trees.push(tree);
            if stale {
                debug!("Early stopping after {} rounds", round);
                break;
            }
        }

        let rounds_trained = trees.len();
        if let Some((best_round, _)) = best {
            trees.truncate(best_round);
        }
        let report = FitReport {
            rounds_trained,
            best_round: trees.len(),
            best_eval_rmse: best.map(|(_, score)| score),
        };
        let model = Self {
            base_score,
            learning_rate: params.learning_rate,
            n_features,
            trees,
        };
        Ok((model, report))
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, BoostingError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        check_rows(rows, self.n_features)?;
        let x = DenseMatrix::from_2d_vec(&rows.to_vec());
        let mut predictions = vec![self.base_score; rows.len()];
        for tree in &self.trees {
            add_scaled(&mut predictions, &predict_tree(tree, &x)?, self.learning_rate);
        }
        Ok(predictions)
    }

    pub fn predict_one(&self, row: &[f64]) -> Result<f64, BoostingError> {
        let predictions = self.predict(&[row.to_vec()])?;
        predictions
            .first()
            .copied()
            .ok_or(BoostingError::EmptyTrainingSet)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Root mean squared error; `0.0` for empty input.
pub fn rmse(predicted: &[f64], actual: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    (sum / actual.len() as f64).sqrt()
}

fn predict_tree(tree: &RegressionTree, x: &DenseMatrix<f64>) -> Result<Vec<f64>, BoostingError> {
    tree.predict(x).map_err(|e| BoostingError::Tree(e.to_string()))
}

fn add_scaled(target: &mut [f64], update: &[f64], scale: f64) {
    for (t, u) in target.iter_mut().zip(update) {
        *t += scale * u;
    }
}

fn validate(x: &[Vec<f64>], y: &[f64]) -> Result<usize, BoostingError> {
    let n_features = x.first().map(Vec::len).ok_or(BoostingError::EmptyTrainingSet)?;
    if n_features == 0 {
        return Err(BoostingError::ShapeMismatch {
            expected: 1,
            found: 0,
        });
    }
    check_rows(x, n_features)?;
    check_targets(x, y)?;
    Ok(n_features)
}

fn check_rows(rows: &[Vec<f64>], n_features: usize) -> Result<(), BoostingError> {
    for row in rows {
        if row.len() != n_features {
            return Err(BoostingError::ShapeMismatch {
                expected: n_features,
                found: row.len(),
            });
        }
        if !row.iter().all(|v| v.is_finite()) {
            return Err(BoostingError::NonFinite);
        }
    }
    Ok(())
}

fn check_targets(x: &[Vec<f64>], y: &[f64]) -> Result<(), BoostingError> {
    if x.len() != y.len() {
        return Err(BoostingError::LengthMismatch {
            rows: x.len(),
            targets: y.len(),
        });
    }
    if !y.iter().all(|v| v.is_finite()) {
        return Err(BoostingError::NonFinite);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| 3.0 * i as f64).collect();
        (x, y)
    }

    #[test]
    fn test_default_params() {
        let params = BoostingParams::default();
        assert_eq!(params.max_rounds, 1000);
        assert_relative_eq!(params.learning_rate, 0.01);
        assert_eq!(params.early_stopping_rounds, 50);
        assert_eq!(params.max_depth, 6);
    }

    #[test]
    fn test_fit_reduces_error() {
        let (x, y) = linear(40);
        let params = BoostingParams::builder()
            .max_rounds(200)
            .learning_rate(0.1)
            .build();

        let (model, report) = GradientBoostedRegressor::fit(&params, &x, &y, None).unwrap();

        assert_eq!(report.rounds_trained, 200);
        assert_eq!(report.best_round, 200);
        assert!(report.best_eval_rmse.is_none());
        let predicted = model.predict(&x).unwrap();
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let baseline = rmse(&vec![mean; y.len()], &y);
        assert!(rmse(&predicted, &y) < baseline * 0.05);
    }

    #[test]
    fn test_early_stopping_keeps_best_round() {
        let (x, y) = linear(20);
        // Every round moves predictions further away from these targets.
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let y_eval = vec![mean; y.len()];
        let params = BoostingParams::builder()
            .max_rounds(100)
            .learning_rate(0.1)
            .early_stopping_rounds(5)
            .build();

        let (model, report) =
            GradientBoostedRegressor::fit(&params, &x, &y, Some((&x, &y_eval))).unwrap();

        assert_eq!(report.rounds_trained, 6);
        assert_eq!(report.best_round, 1);
        assert_eq!(model.n_trees(), 1);
        assert!(report.best_eval_rmse.unwrap() > 0.0);
    }

    #[test]
    fn test_empty_training_set() {
        let err = GradientBoostedRegressor::fit(&BoostingParams::default(), &[], &[], None)
            .unwrap_err();
        assert!(matches!(err, BoostingError::EmptyTrainingSet));
    }

    #[test]
    fn test_rejects_non_finite_targets() {
        let (x, mut y) = linear(10);
        y[3] = f64::NAN;
        let err = GradientBoostedRegressor::fit(&BoostingParams::default(), &x, &y, None)
            .unwrap_err();
        assert!(matches!(err, BoostingError::NonFinite));
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = linear(10);
        let params = BoostingParams::builder().max_rounds(3).build();
        let (model, _) = GradientBoostedRegressor::fit(&params, &x, &y, None).unwrap();

        assert_eq!(model.n_features(), 2);
        let err = model.predict_one(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            BoostingError::ShapeMismatch {
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn test_rmse() {
        assert_relative_eq!(rmse(&[1.0, 2.0], &[1.0, 4.0]), 2.0_f64.sqrt());
        assert_relative_eq!(rmse(&[], &[]), 0.0);
    }
}
