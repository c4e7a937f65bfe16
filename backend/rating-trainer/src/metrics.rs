use serde::Serialize;

/// Regression quality of predicted ratings against observed ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(targets: &[f32], predictions: &[f32]) -> Self {
        let n = targets.len().min(predictions.len());
        if n == 0 {
            return Self {
                mse: 0.0,
                rmse: 0.0,
                mae: 0.0,
                r2: 0.0,
            };
        }

        let pairs = || {
            targets[..n]
                .iter()
                .zip(&predictions[..n])
                .map(|(&t, &p)| (t as f64, p as f64))
        };

        let mean = pairs().map(|(t, _)| t).sum::<f64>() / n as f64;
        let ss_res: f64 = pairs().map(|(t, p)| (t - p).powi(2)).sum();
        let ss_tot: f64 = pairs().map(|(t, _)| (t - mean).powi(2)).sum();
        let abs_err: f64 = pairs().map(|(t, p)| (t - p).abs()).sum();

        // Constant targets: perfect fit scores 1, anything else 0.
        let r2 = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        let mse = ss_res / n as f64;
        Self {
            mse,
            rmse: mse.sqrt(),
            mae: abs_err / n as f64,
            r2,
        }
    }
}

/// Mean squared error, as used for the validation loss.
pub fn mse(targets: &[f32], predictions: &[f32]) -> f32 {
    RegressionMetrics::compute(targets, predictions).mse as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let metrics = RegressionMetrics::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(metrics.mse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn test_known_errors() {
        let metrics = RegressionMetrics::compute(&[3.0, 5.0], &[4.0, 3.0]);
        assert!((metrics.mse - 2.5).abs() < 1e-9);
        assert!((metrics.rmse - 2.5f64.sqrt()).abs() < 1e-9);
        assert!((metrics.mae - 1.5).abs() < 1e-9);
        // ss_tot = 2, ss_res = 5
        assert!((metrics.r2 - (1.0 - 5.0 / 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_constant_targets() {
        assert_eq!(RegressionMetrics::compute(&[2.0, 2.0], &[2.0, 2.0]).r2, 1.0);
        assert_eq!(RegressionMetrics::compute(&[2.0, 2.0], &[1.0, 3.0]).r2, 0.0);
    }
}
