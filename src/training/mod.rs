//! Supervised regression: partition, standardize, fit, score.
//!
//! Every [`train`] call builds a fresh pipeline; nothing is cached between
//! requests.

pub mod linear;
pub mod metrics;
pub mod preprocess;
pub mod split;
pub mod tree;

use std::fmt;

use crate::config::TrainingConfig;
use crate::data::Table;
use crate::error::{AnalysisError, Result};

pub use linear::LinearModel;
pub use metrics::{metric_labels, EvaluationResult};
pub use preprocess::Standardizer;
pub use split::{train_test_split, Partition};
pub use tree::RegressionTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    LinearRegression,
    DecisionTreeRegression,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::LinearRegression, ModelKind::DecisionTreeRegression];
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::LinearRegression => write!(f, "Linear Regression"),
            ModelKind::DecisionTreeRegression => write!(f, "Decision Tree Regression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingRequest {
    pub features: Vec<String>,
    pub target: String,
    pub model: ModelKind,
}

impl TrainingRequest {
    pub fn new<I, S>(features: I, target: impl Into<String>, model: ModelKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            target: target.into(),
            model,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Regressor {
    Linear(LinearModel),
    Tree(RegressionTree),
}

impl Regressor {
    fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Regressor::Linear(m) => m.predict_row(row),
            Regressor::Tree(t) => t.predict_row(row),
        }
    }
}

/// Fitted standardization composed with a fitted regressor.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    kind: ModelKind,
    features: Vec<String>,
    target: String,
    standardizer: Standardizer,
    regressor: Regressor,
    partition: Partition,
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Parameters fitted on the training partition.
    pub fn standardizer(&self) -> &Standardizer {
        &self.standardizer
    }

    /// Table row indices used for fitting and for evaluation.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Linear coefficients in standardized feature space, if linear.
    pub fn linear(&self) -> Option<&LinearModel> {
        match &self.regressor {
            Regressor::Linear(m) => Some(m),
            Regressor::Tree(_) => None,
        }
    }

    /// Predict from raw (unstandardized) feature rows, one value per feature
    /// in [`features`](Self::features) order.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let width = self.features.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(AnalysisError::validation(format!(
                "Row {i} has {} values, expected {width} ({})",
                row.len(),
                self.features.join(", ")
            )));
        }
        Ok(rows
            .iter()
            .map(|r| self.regressor.predict_row(&self.standardizer.transform_row(r)))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Training {
    pub model: TrainedModel,
    pub evaluation: EvaluationResult,
}

/// Validate the request, split the complete rows with a fixed seed, fit the
/// standardizer and regressor on the training rows, and score the held-out
/// rows.
pub fn train(table: &Table, request: &TrainingRequest, config: &TrainingConfig) -> Result<Training> {
    if request.features.is_empty() {
        return Err(AnalysisError::validation("Select at least one feature column"));
    }
    let target = table
        .require(&request.target)?
        .as_numeric()
        .ok_or_else(|| {
            AnalysisError::validation(format!(
                "Target column '{}' must be numeric",
                request.target
            ))
        })?;
    if request.features.contains(&request.target) {
        return Err(AnalysisError::validation(format!(
            "Column '{}' cannot be both a feature and the target",
            request.target
        )));
    }
    let mut features = Vec::with_capacity(request.features.len());
    for name in &request.features {
        let values = table.require(name)?.as_numeric().ok_or_else(|| {
            AnalysisError::validation(format!("Feature column '{name}' must be numeric"))
        })?;
        features.push(values);
    }

    // Complete rows only: (table row index, features, target).
    let mut rows: Vec<usize> = Vec::new();
    let mut x: Vec<Vec<f64>> = Vec::new();
    let mut y: Vec<f64> = Vec::new();
    for row in 0..table.row_count() {
        let Some(t) = target[row] else { continue };
        let Some(xs) = features.iter().map(|f| f[row]).collect::<Option<Vec<f64>>>() else {
            continue;
        };
        rows.push(row);
        x.push(xs);
        y.push(t);
    }
    let dropped = table.row_count() - rows.len();
    if dropped > 0 {
        log::warn!("Dropped {dropped} rows with missing feature or target values");
    }
    if rows.len() < 2 {
        return Err(AnalysisError::validation(format!(
            "Need at least two complete rows to train, found {}",
            rows.len()
        )));
    }

    let local = train_test_split(rows.len(), config.test_fraction, config.seed);
    if local.train.is_empty() || local.test.is_empty() {
        return Err(AnalysisError::validation(format!(
            "{} rows cannot be split into training and held-out partitions",
            rows.len()
        )));
    }
    log::debug!(
        "Split {} rows: {} train, {} held out",
        rows.len(),
        local.train.len(),
        local.test.len()
    );

    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        (
            idx.iter().map(|&i| x[i].clone()).collect(),
            idx.iter().map(|&i| y[i]).collect(),
        )
    };
    let (x_train, y_train) = pick(&local.train);
    let (x_test, y_test) = pick(&local.test);

    let standardizer = Standardizer::fit(&x_train);
    let z_train = standardizer.transform(&x_train);
    let regressor = match request.model {
        ModelKind::LinearRegression => Regressor::Linear(LinearModel::fit(&z_train, &y_train)?),
        ModelKind::DecisionTreeRegression => Regressor::Tree(RegressionTree::fit(
            &z_train,
            &y_train,
            &config.tree,
            config.seed,
        )),
    };

    let model = TrainedModel {
        kind: request.model,
        features: request.features.clone(),
        target: request.target.clone(),
        standardizer,
        regressor,
        partition: Partition {
            train: local.train.iter().map(|&i| rows[i]).collect(),
            test: local.test.iter().map(|&i| rows[i]).collect(),
        },
    };
    let evaluation = EvaluationResult::score(&y_test, &model.predict(&x_test)?);

    log::info!(
        "Trained {} on {} rows ({} held out): mse={:.4}, r2={:.4}",
        request.model,
        x_train.len(),
        x_test.len(),
        evaluation.mse,
        evaluation.r2
    );
    Ok(Training { model, evaluation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn income_table() -> Table {
        Table::new(vec![
            Column::numeric("age", vec![Some(20.0), Some(30.0), Some(40.0), Some(50.0)]),
            Column::numeric(
                "income",
                vec![Some(30000.0), Some(45000.0), Some(60000.0), Some(58000.0)],
            ),
        ])
        .unwrap()
    }

    fn synthetic(n: usize) -> Table {
        let a: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64)).collect();
        let b: Vec<Option<f64>> = (0..n).map(|i| Some(((i * 37) % 11) as f64)).collect();
        let y: Vec<Option<f64>> = (0..n)
            .map(|i| Some(2.0 * i as f64 + ((i * 37) % 11) as f64 + ((i * 13) % 5) as f64))
            .collect();
        Table::new(vec![
            Column::numeric("a", a),
            Column::numeric("b", b),
            Column::numeric("y", y),
        ])
        .unwrap()
    }

    fn same_bits(a: f64, b: f64) -> bool {
        a.to_bits() == b.to_bits()
    }

    #[test]
    fn age_income_runs_are_bit_identical() {
        let table = income_table();
        let req = TrainingRequest::new(["age"], "income", ModelKind::LinearRegression);
        let config = TrainingConfig::default();
        let first = train(&table, &req, &config).unwrap();
        let second = train(&table, &req, &config).unwrap();

        assert_eq!(first.model.partition().train.len(), 3);
        assert_eq!(first.model.partition().test.len(), 1);
        assert!(first.evaluation.mse.is_finite());
        assert!(same_bits(first.evaluation.mse, second.evaluation.mse));
        // A single held-out row has zero variance, so r2 is undefined.
        assert!(first.evaluation.r2.is_nan());
        assert!(same_bits(first.evaluation.r2, second.evaluation.r2));
    }

    #[test]
    fn tree_training_is_deterministic() {
        let table = synthetic(40);
        let req = TrainingRequest::new(["a", "b"], "y", ModelKind::DecisionTreeRegression);
        let config = TrainingConfig::default();
        let first = train(&table, &req, &config).unwrap();
        let second = train(&table, &req, &config).unwrap();
        assert_eq!(first, second);
        assert!(same_bits(first.evaluation.mse, second.evaluation.mse));
        assert!(same_bits(first.evaluation.r2, second.evaluation.r2));
    }

    #[test]
    fn linear_fit_scores_well_on_linear_data() {
        let table = synthetic(50);
        let req = TrainingRequest::new(["a", "b"], "y", ModelKind::LinearRegression);
        let result = train(&table, &req, &TrainingConfig::default()).unwrap();
        assert_eq!(result.model.partition().test.len(), 10);
        assert!(result.evaluation.r2 > 0.95, "r2 = {}", result.evaluation.r2);
    }

    #[test]
    fn held_out_rows_do_not_move_standardization() {
        let table = synthetic(30);
        let req = TrainingRequest::new(["a", "b"], "y", ModelKind::LinearRegression);
        let config = TrainingConfig::default();
        let base = train(&table, &req, &config).unwrap();

        // Replace held-out feature values with wild outliers.
        let held_out = base.model.partition().test.clone();
        let perturb = |name: &str| {
            let values = table.column(name).unwrap().as_numeric().unwrap();
            let values = values
                .iter()
                .enumerate()
                .map(|(i, v)| if held_out.contains(&i) { Some(1e9) } else { *v })
                .collect();
            Column::numeric(name, values)
        };
        let perturbed = Table::new(vec![
            perturb("a"),
            perturb("b"),
            table.column("y").unwrap().clone(),
        ])
        .unwrap();

        let refit = train(&perturbed, &req, &config).unwrap();
        assert_eq!(refit.model.partition(), base.model.partition());
        assert_eq!(refit.model.standardizer(), base.model.standardizer());
        assert_eq!(refit.model.linear(), base.model.linear());
    }

    #[test]
    fn text_target_is_rejected_by_name() {
        let table = Table::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::text("y", vec![Some("a".into()), Some("b".into()), Some("c".into())]),
        ])
        .unwrap();
        let req = TrainingRequest::new(["x"], "y", ModelKind::LinearRegression);
        let err = train(&table, &req, &TrainingConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Validation("Target column 'y' must be numeric".into())
        );
    }

    #[test]
    fn first_text_feature_is_named() {
        let table = Table::new(vec![
            Column::numeric("n", vec![Some(1.0), Some(2.0)]),
            Column::text("t1", vec![Some("a".into()), Some("b".into())]),
            Column::text("t2", vec![Some("c".into()), Some("d".into())]),
            Column::numeric("y", vec![Some(1.0), Some(2.0)]),
        ])
        .unwrap();
        let req = TrainingRequest::new(["n", "t1", "t2"], "y", ModelKind::LinearRegression);
        let err = train(&table, &req, &TrainingConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Validation("Feature column 't1' must be numeric".into())
        );
    }

    #[test]
    fn target_cannot_be_a_feature() {
        let req = TrainingRequest::new(["age", "income"], "income", ModelKind::LinearRegression);
        assert!(matches!(
            train(&income_table(), &req, &TrainingConfig::default()),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn empty_feature_set_is_rejected() {
        let req = TrainingRequest::new(Vec::<String>::new(), "income", ModelKind::LinearRegression);
        assert!(train(&income_table(), &req, &TrainingConfig::default()).is_err());
    }

    #[test]
    fn incomplete_rows_are_dropped_before_splitting() {
        let table = Table::new(vec![
            Column::numeric("x", vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)]),
            Column::numeric("y", vec![Some(2.0), Some(4.0), None, Some(8.0), Some(10.0)]),
        ])
        .unwrap();
        let req = TrainingRequest::new(["x"], "y", ModelKind::LinearRegression);
        let result = train(&table, &req, &TrainingConfig::default()).unwrap();
        let p = result.model.partition();
        let mut used: Vec<usize> = p.train.iter().chain(&p.test).copied().collect();
        used.sort_unstable();
        assert_eq!(used, vec![0, 3, 4]);
    }

    #[test]
    fn predict_applies_the_standardizer() {
        let table = synthetic(20);
        let req = TrainingRequest::new(["a"], "y", ModelKind::LinearRegression);
        let model = train(&table, &req, &TrainingConfig::default()).unwrap().model;
        let lin = model.linear().unwrap();
        let s = model.standardizer();
        let expected = lin.intercept + lin.coefficients[0] * ((7.0 - s.means[0]) / s.scales[0]);
        assert_eq!(model.predict(&[vec![7.0]]).unwrap(), vec![expected]);
    }

    #[test]
    fn predict_rejects_rows_of_the_wrong_width() {
        let table = synthetic(20);
        for kind in ModelKind::ALL {
            let req = TrainingRequest::new(["a", "b"], "y", kind);
            let model = train(&table, &req, &TrainingConfig::default()).unwrap().model;
            assert!(matches!(
                model.predict(&[vec![1.0]]),
                Err(AnalysisError::Validation(_))
            ));
            assert!(matches!(
                model.predict(&[vec![1.0, 2.0, 3.0]]),
                Err(AnalysisError::Validation(_))
            ));
            assert_eq!(model.predict(&[vec![1.0, 2.0]]).unwrap().len(), 1);
        }
    }
}
