use serde::Serialize;

/// Scores against the held-out partition. Serialises as `{"mse": .., "r2": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub mse: f64,
    /// NaN when the held-out targets have zero variance.
    pub r2: f64,
}

impl EvaluationResult {
    pub fn score(y_true: &[f64], y_pred: &[f64]) -> Self {
        Self {
            mse: mean_squared_error(y_true, y_pred),
            r2: r2_score(y_true, y_pred),
        }
    }

    /// `(key, value)` pairs in display order.
    pub fn entries(&self) -> [(&'static str, f64); 2] {
        [("mse", self.mse), ("r2", self.r2)]
    }
}

/// Metric keys with their default English labels.
pub fn metric_labels() -> [(&'static str, &'static str); 2] {
    [("mse", "Mean Squared Error"), ("r2", "R² Score")]
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}

/// `1 - SS_res / SS_tot`; NaN when `SS_tot` is zero.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return f64::NAN;
    }
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let y = [1.0, 2.0, 3.0];
        let result = EvaluationResult::score(&y, &y);
        assert_eq!(result.mse, 0.0);
        assert_eq!(result.r2, 1.0);
    }

    #[test]
    fn mean_prediction_scores_zero_r2() {
        let result = EvaluationResult::score(&[1.0, 3.0], &[2.0, 2.0]);
        assert_eq!(result.mse, 1.0);
        assert_eq!(result.r2, 0.0);
    }

    #[test]
    fn constant_truth_leaves_r2_undefined() {
        assert!(r2_score(&[4.0, 4.0], &[3.0, 5.0]).is_nan());
        assert!(r2_score(&[4.0], &[4.0]).is_nan());
    }

    #[test]
    fn serialises_with_literal_keys() {
        let json = serde_json::to_value(EvaluationResult { mse: 1.5, r2: 0.25 }).unwrap();
        assert_eq!(json, serde_json::json!({"mse": 1.5, "r2": 0.25}));
    }
}
