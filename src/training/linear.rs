use crate::error::{AnalysisError, Result};

/// Ordinary least squares with an intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

/// Below this pivot magnitude a direction counts as collinear.
const PIVOT_EPS: f64 = 1e-10;

impl LinearModel {
    /// Solve the normal equations on centred data. Collinear directions get a
    /// zero coefficient.
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(AnalysisError::validation(
                "linear regression needs one target per training row",
            ));
        }
        let n = x.len() as f64;
        let p = x[0].len();

        let x_mean: Vec<f64> = (0..p).map(|j| x.iter().map(|r| r[j]).sum::<f64>() / n).collect();
        let y_mean = y.iter().sum::<f64>() / n;

        // Augmented [XᵀX | Xᵀy] over centred columns.
        let mut a = vec![vec![0.0; p + 1]; p];
        for (row, &target) in x.iter().zip(y) {
            for i in 0..p {
                let xi = row[i] - x_mean[i];
                for j in 0..p {
                    a[i][j] += xi * (row[j] - x_mean[j]);
                }
                a[i][p] += xi * (target - y_mean);
            }
        }

        let coefficients = solve(a, p);
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(b, m)| b * m)
                .sum::<f64>();
        Ok(LinearModel {
            intercept,
            coefficients,
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }
}

/// Gauss-Jordan elimination with partial pivoting on an `p × (p + 1)` system.
fn solve(mut a: Vec<Vec<f64>>, p: usize) -> Vec<f64> {
    let scale = (0..p).map(|i| a[i][i].abs()).fold(0.0, f64::max).max(1.0);
    let mut pivot_cols: Vec<Option<usize>> = vec![None; p];
    let mut row = 0;
    for col in 0..p {
        if row == p {
            break;
        }
        let best = (row..p)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(row);
        if a[best][col].abs() <= PIVOT_EPS * scale {
            continue;
        }
        a.swap(row, best);
        let pivot = a[row][col];
        for v in a[row].iter_mut() {
            *v /= pivot;
        }
        for other in 0..p {
            if other != row {
                let factor = a[other][col];
                if factor != 0.0 {
                    for k in col..=p {
                        a[other][k] -= factor * a[row][k];
                    }
                }
            }
        }
        pivot_cols[row] = Some(col);
        row += 1;
    }

    let mut beta = vec![0.0; p];
    for (r, col) in pivot_cols.iter().enumerate() {
        if let Some(c) = col {
            beta[*c] = a[r][p];
        }
    }
    beta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_an_exact_plane() {
        let x: Vec<Vec<f64>> = (0..6)
            .map(|i| vec![i as f64, (i * i % 5) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let model = LinearModel::fit(&x, &y).unwrap();
        assert!((model.intercept - 3.0).abs() < 1e-9);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients[1] + 0.5).abs() < 1e-9);
    }

    #[test]
    fn duplicated_feature_gets_zero_weight() {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..5).map(|i| 1.0 + i as f64).collect();
        let model = LinearModel::fit(&x, &y).unwrap();
        assert_eq!(model.coefficients[1], 0.0);
        assert!((model.predict_row(&[10.0, 10.0]) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn single_row_predicts_its_target() {
        let model = LinearModel::fit(&[vec![0.0]], &[7.0]).unwrap();
        assert_eq!(model.predict_row(&[5.0]), 7.0);
    }
}
