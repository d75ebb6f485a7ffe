//! Next-month spending forecasts
//!
//! [`forecast_next_month`] is a pure function: it fits a fresh
//! ordinary-least-squares regression over the caller-supplied monthly
//! totals on every call and carries no state between calls, so concurrent
//! forecasts never interfere. The stored [`SpendingTemplate`] only gates
//! availability; its coefficients are not reused for the per-call fit.

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Forecast;
use crate::store::ModelStore;

/// The linear trend template trained offline on synthetic monthly totals
/// (one model artifact). Serves as the availability signal for forecasting.
#[derive(Serialize, Deserialize)]
pub struct SpendingTemplate {
    model: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    trained_months: usize,
}

impl SpendingTemplate {
    /// Fit a template on a series of monthly totals (month index 1..=n)
    pub fn fit(monthly_totals: &[f64]) -> Result<Self> {
        if monthly_totals.len() < 2 {
            return Err(Error::Training(
                "Spending template requires at least two monthly totals".to_string(),
            ));
        }
        let model = fit_trend(monthly_totals)?;
        Ok(Self {
            model,
            trained_months: monthly_totals.len(),
        })
    }

    pub fn trained_months(&self) -> usize {
        self.trained_months
    }
}

/// Predict next month's spending from chronologically ascending monthly
/// totals.
///
/// Returns the zero sentinel when fewer than 2 points are supplied or no
/// forecaster template is loaded. The predicted amount and the R²
/// confidence are both floored at 0.
pub fn forecast_next_month(store: &ModelStore, monthly_totals: &[f64]) -> Forecast {
    if store.forecaster().is_none() || monthly_totals.len() < 2 {
        return Forecast::zero();
    }

    match fit_and_project(monthly_totals) {
        Ok(forecast) => forecast,
        Err(e) => {
            warn!(error = %e, "Spending forecast fit failed, returning sentinel");
            Forecast::zero()
        }
    }
}

fn fit_trend(
    monthly_totals: &[f64],
) -> Result<LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>> {
    let x: Vec<Vec<f64>> = (1..=monthly_totals.len())
        .map(|month| vec![month as f64])
        .collect();
    let xm = DenseMatrix::from_2d_vec(&x).map_err(|e| Error::Model(e.to_string()))?;
    LinearRegression::fit(
        &xm,
        &monthly_totals.to_vec(),
        LinearRegressionParameters::default(),
    )
    .map_err(|e| Error::Model(e.to_string()))
}

fn fit_and_project(monthly_totals: &[f64]) -> Result<Forecast> {
    let n = monthly_totals.len();
    let model = fit_trend(monthly_totals)?;

    let x: Vec<Vec<f64>> = (1..=n).map(|month| vec![month as f64]).collect();
    let xm = DenseMatrix::from_2d_vec(&x).map_err(|e| Error::Model(e.to_string()))?;
    let fitted = model.predict(&xm).map_err(|e| Error::Model(e.to_string()))?;

    let next = DenseMatrix::from_2d_vec(&vec![vec![(n + 1) as f64]])
        .map_err(|e| Error::Model(e.to_string()))?;
    let predicted = model
        .predict(&next)
        .map_err(|e| Error::Model(e.to_string()))?
        .first()
        .copied()
        .unwrap_or(0.0);

    Ok(Forecast {
        predicted_amount: predicted.max(0.0),
        confidence: r_squared(monthly_totals, &fitted).max(0.0),
    })
}

/// Coefficient of determination of a fit against the observed values
fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let ss_tot: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = observed
        .iter()
        .zip(fitted.iter())
        .map(|(y, f)| (y - f).powi(2))
        .sum();

    if ss_tot == 0.0 {
        // Constant series: perfect residuals count as a perfect fit
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}
