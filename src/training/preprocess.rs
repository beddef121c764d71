use serde::Serialize;

/// Per-feature z-score transform: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standardizer {
    pub means: Vec<f64>,
    /// Population standard deviations; a constant feature gets 1.0.
    pub scales: Vec<f64>,
}

impl Standardizer {
    /// Fit on training rows only.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let means: Vec<f64> = (0..width)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let scales = (0..width)
            .map(|j| {
                let var = rows.iter().map(|r| (r[j] - means[j]).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Standardizer { means, scales }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardized_training_rows_have_zero_mean_unit_variance() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 10.0], vec![3.0, 10.0]];
        let s = Standardizer::fit(&rows);
        assert_eq!(s.means, vec![2.0, 10.0]);
        assert_eq!(s.scales[1], 1.0);

        let z = s.transform(&rows);
        let mean: f64 = z.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        let var: f64 = z.iter().map(|r| r[0].powi(2)).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
        assert_eq!(z[0][1], 0.0);
    }
}
