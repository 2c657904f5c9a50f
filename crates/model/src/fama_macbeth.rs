//! Fama-MacBeth cross-sectional regressions.
//!
//! Each month the response (typically next month's excess return) is
//! regressed on an intercept and the characteristics across entities. The
//! time series of each coefficient is then averaged, with naive and
//! Newey-West standard errors.
//!
//! # References
//! - Fama, E. F., & MacBeth, J. D. (1973). "Risk, Return, and Equilibrium:
//!   Empirical Tests." Journal of Political Economy, 81(3), 607-636.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use portsort_panel::{Panel, PanelColumns, date_column};
use portsort_primitives::{Observation, Period, RiskPremiumEstimate};
use portsort_traits::{CrossSectionEstimator, EstimatorError, PanelEstimator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{CrossSectionConfig, ModelError, NeweyWest, OlsCrossSection, SeriesSummary};

/// Name of the intercept term.
pub const INTERCEPT: &str = "intercept";

/// Configuration for Fama-MacBeth estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamaMacBethConfig {
    /// Characteristic holding the response, e.g. the lead excess return.
    pub response: String,
    /// Regressors, in output order after the intercept.
    pub characteristics: Vec<String>,
    /// Minimum valid rows per period; `k + 2` when `None`.
    #[serde(default)]
    pub min_observations: Option<usize>,
    /// Standard error settings for the time-series step.
    #[serde(default)]
    pub newey_west: NeweyWest,
    /// Cross-sectional winsorization percentile of the characteristics.
    #[serde(default)]
    pub winsorize: Option<f64>,
}

impl FamaMacBethConfig {
    /// Regress `response` on `characteristics` with default settings.
    #[must_use]
    pub fn new<I, S>(response: impl Into<String>, characteristics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            response: response.into(),
            characteristics: characteristics.into_iter().map(Into::into).collect(),
            min_observations: None,
            newey_west: NeweyWest::default(),
            winsorize: None,
        }
    }

    /// Minimum valid rows required to fit a period.
    #[must_use]
    pub fn required_observations(&self) -> usize {
        self.min_observations.unwrap_or(self.characteristics.len() + 2)
    }

    /// Term names, intercept first.
    #[must_use]
    pub fn terms(&self) -> Vec<String> {
        std::iter::once(INTERCEPT.to_string()).chain(self.characteristics.iter().cloned()).collect()
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// Returns `ModelError::ConfigurationError` for an empty characteristic
    /// list, duplicate or empty names, a minimum below `k + 1`, or a
    /// winsorization percentile outside (0, 0.5).
    pub fn validate(&self) -> Result<(), ModelError> {
        let k = self.characteristics.len();
        if k == 0 {
            return Err(ModelError::ConfigurationError("no characteristics to regress on".to_string()));
        }
        let mut names: Vec<&str> = self.characteristics.iter().map(String::as_str).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) || names.iter().any(|n| n.trim().is_empty()) {
            return Err(ModelError::ConfigurationError(
                "characteristic names must be unique and non-empty".to_string(),
            ));
        }
        if self.response.trim().is_empty() {
            return Err(ModelError::ConfigurationError("response name is empty".to_string()));
        }
        if self.required_observations() < k + 1 {
            return Err(ModelError::ConfigurationError(format!(
                "min_observations must be at least {}, got {}",
                k + 1,
                self.required_observations()
            )));
        }
        if let Some(pct) = self.winsorize {
            if !(pct > 0.0 && pct < 0.5) {
                return Err(ModelError::ConfigurationError(format!(
                    "winsorize percentile must be in (0, 0.5), got {pct}"
                )));
            }
        }
        Ok(())
    }
}

/// Why a period has no estimates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OmissionReason {
    /// Fewer valid rows than required.
    TooFewObservations {
        /// Required rows.
        required: usize,
        /// Rows with all values defined.
        actual: usize,
    },
    /// The characteristics are collinear in this period.
    Singular,
    /// Any other estimation failure.
    Failed(String),
}

/// Result of one period's regression.
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodOutcome {
    /// Coefficients were estimated.
    Estimated {
        /// One estimate per term, intercept first.
        estimates: Vec<RiskPremiumEstimate>,
        /// Rows used in the fit.
        observations: usize,
    },
    /// The period was left out.
    Omitted(OmissionReason),
}

/// Time-series summary of one term.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskPremiumSummary {
    /// Term name.
    pub term: String,
    /// Mean and standard errors of the coefficient series.
    pub summary: SeriesSummary,
}

/// Output of a full Fama-MacBeth run.
#[derive(Debug, Clone)]
pub struct FamaMacBethOutput {
    /// Per-period outcomes, ordered by period.
    pub outcomes: BTreeMap<Period, PeriodOutcome>,
    /// Per-term summaries, intercept first.
    pub summary: Vec<RiskPremiumSummary>,
}

impl FamaMacBethOutput {
    /// Estimates of every estimated period, ordered by period then term.
    #[must_use]
    pub fn estimates(&self) -> Vec<&RiskPremiumEstimate> {
        self.outcomes
            .values()
            .filter_map(|o| match o {
                PeriodOutcome::Estimated { estimates, .. } => Some(estimates),
                PeriodOutcome::Omitted(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Omitted periods and their reasons.
    #[must_use]
    pub fn omitted(&self) -> Vec<(Period, &OmissionReason)> {
        self.outcomes
            .iter()
            .filter_map(|(p, o)| match o {
                PeriodOutcome::Omitted(reason) => Some((*p, reason)),
                PeriodOutcome::Estimated { .. } => None,
            })
            .collect()
    }

    /// Per-period coefficients as a `month, term, coefficient` frame.
    ///
    /// # Errors
    /// Returns error if frame construction fails.
    pub fn premia_frame(&self) -> Result<DataFrame, ModelError> {
        let estimates = self.estimates();
        Ok(DataFrame::new(vec![
            date_column("month", estimates.iter().map(|e| e.period.first_day()))?,
            Column::new("term".into(), estimates.iter().map(|e| e.term.as_str()).collect::<Vec<_>>()),
            Column::new("coefficient".into(), estimates.iter().map(|e| e.coefficient).collect::<Vec<_>>()),
        ])?)
    }

    /// Summary table with columns `term, mean, naive_standard_error,
    /// naive_t_statistic, robust_standard_error, robust_t_statistic, periods`.
    ///
    /// # Errors
    /// Returns error if frame construction fails.
    pub fn summary_frame(&self) -> Result<DataFrame, ModelError> {
        let rows = &self.summary;
        Ok(DataFrame::new(vec![
            Column::new("term".into(), rows.iter().map(|r| r.term.as_str()).collect::<Vec<_>>()),
            Column::new("mean".into(), rows.iter().map(|r| r.summary.mean).collect::<Vec<_>>()),
            Column::new(
                "naive_standard_error".into(),
                rows.iter().map(|r| r.summary.naive_standard_error).collect::<Vec<_>>(),
            ),
            Column::new(
                "naive_t_statistic".into(),
                rows.iter().map(|r| r.summary.naive_t_statistic).collect::<Vec<_>>(),
            ),
            Column::new(
                "robust_standard_error".into(),
                rows.iter().map(|r| r.summary.robust_standard_error).collect::<Vec<_>>(),
            ),
            Column::new(
                "robust_t_statistic".into(),
                rows.iter().map(|r| r.summary.robust_t_statistic).collect::<Vec<_>>(),
            ),
            Column::new("periods".into(), rows.iter().map(|r| r.summary.periods as u64).collect::<Vec<_>>()),
        ])?)
    }
}

/// Fama-MacBeth runner over a typed panel.
#[derive(Debug, Clone)]
pub struct FamaMacBeth<E = OlsCrossSection> {
    config: FamaMacBethConfig,
    estimator: E,
}

impl FamaMacBeth<OlsCrossSection> {
    /// Create a runner with OLS cross-sections.
    ///
    /// # Errors
    /// Returns `ModelError::ConfigurationError` if the configuration is invalid.
    pub fn new(config: FamaMacBethConfig) -> Result<Self, ModelError> {
        let estimator = OlsCrossSection::with_config(CrossSectionConfig { winsorize: config.winsorize });
        Self::with_estimator(config, estimator)
    }
}

impl<E: CrossSectionEstimator> FamaMacBeth<E> {
    /// Create a runner with a custom cross-sectional estimator.
    ///
    /// # Errors
    /// Returns `ModelError::ConfigurationError` if the configuration is invalid.
    pub fn with_estimator(config: FamaMacBethConfig, estimator: E) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self { config, estimator })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &FamaMacBethConfig {
        &self.config
    }

    /// Regress every period of `panel` independently.
    #[must_use]
    pub fn estimate_periods(&self, panel: &Panel) -> BTreeMap<Period, PeriodOutcome> {
        let periods: Vec<(Period, Vec<&Observation>)> = panel.by_period().into_iter().collect();
        periods.par_iter().map(|(period, rows)| (*period, self.estimate_period(*period, rows))).collect()
    }

    /// Regress one period.
    #[must_use]
    pub fn estimate_period(&self, period: Period, rows: &[&Observation]) -> PeriodOutcome {
        let k = self.config.characteristics.len();
        let valid: Vec<(f64, Vec<f64>)> = rows
            .iter()
            .filter_map(|obs| {
                let response = obs.characteristic(&self.config.response)?;
                let values = self
                    .config
                    .characteristics
                    .iter()
                    .map(|name| obs.characteristic(name))
                    .collect::<Option<Vec<f64>>>()?;
                Some((response, values))
            })
            .collect();

        let required = self.config.required_observations();
        if valid.len() < required {
            warn!(%period, required, actual = valid.len(), "period omitted: too few observations");
            return PeriodOutcome::Omitted(OmissionReason::TooFewObservations {
                required,
                actual: valid.len(),
            });
        }

        let n = valid.len();
        let response = Array1::from_iter(valid.iter().map(|(y, _)| *y));
        let regressors = Array2::from_shape_fn((n, k), |(i, j)| valid[i].1[j]);

        match self.estimator.estimate_single(&response, &regressors) {
            Ok((coefficients, _)) => {
                debug!(%period, observations = n, "cross-section estimated");
                let estimates = self
                    .config
                    .terms()
                    .into_iter()
                    .zip(coefficients.iter())
                    .map(|(term, coefficient)| RiskPremiumEstimate::new(period, term, *coefficient))
                    .collect();
                PeriodOutcome::Estimated { estimates, observations: n }
            }
            Err(err) => {
                warn!(%period, error = %err, "period omitted");
                let reason = match err {
                    EstimatorError::Singular { .. } => OmissionReason::Singular,
                    EstimatorError::InsufficientData { required, actual } => {
                        OmissionReason::TooFewObservations { required, actual }
                    }
                    other => OmissionReason::Failed(other.to_string()),
                };
                PeriodOutcome::Omitted(reason)
            }
        }
    }

    /// Time-series summary of each term over estimated periods.
    ///
    /// # Errors
    /// Returns `ModelError::InsufficientData` if too few periods were estimated.
    pub fn summarize(
        &self,
        outcomes: &BTreeMap<Period, PeriodOutcome>,
    ) -> Result<Vec<RiskPremiumSummary>, ModelError> {
        let mut series: Vec<Vec<f64>> = vec![Vec::new(); self.config.characteristics.len() + 1];
        for outcome in outcomes.values() {
            if let PeriodOutcome::Estimated { estimates, .. } = outcome {
                for (slot, estimate) in series.iter_mut().zip(estimates) {
                    slot.push(estimate.coefficient);
                }
            }
        }

        self.config
            .terms()
            .into_iter()
            .zip(&series)
            .map(|(term, values)| {
                Ok(RiskPremiumSummary {
                    term,
                    summary: SeriesSummary::compute(values, &self.config.newey_west)?,
                })
            })
            .collect()
    }

    /// Estimate every period and summarize.
    ///
    /// # Errors
    /// Returns `ModelError::InsufficientData` if too few periods were estimated.
    pub fn run(&self, panel: &Panel) -> Result<FamaMacBethOutput, ModelError> {
        let outcomes = self.estimate_periods(panel);
        let summary = self.summarize(&outcomes)?;

        let omitted = outcomes.values().filter(|o| matches!(o, PeriodOutcome::Omitted(_))).count();
        info!(periods = outcomes.len(), omitted, terms = summary.len(), "fama-macbeth complete");

        Ok(FamaMacBethOutput { outcomes, summary })
    }
}

impl<E: CrossSectionEstimator> PanelEstimator for FamaMacBeth<E> {
    fn estimate(&self, panel: LazyFrame) -> Result<(DataFrame, DataFrame), EstimatorError> {
        let df = panel.collect()?;
        let columns = PanelColumns::default()
            .with_characteristics(std::iter::once(&self.config.response).chain(&self.config.characteristics).cloned());

        let panel = Panel::from_frame(&df, &columns).map_err(|err| match err {
            portsort_panel::PanelError::MissingColumn(name) => EstimatorError::MissingColumn(name),
            portsort_panel::PanelError::Polars(err) => EstimatorError::Polars(err),
            other => EstimatorError::InvalidConfig(other.to_string()),
        })?;

        let output = self.run(&panel).map_err(into_estimator_error)?;
        let premia = output.premia_frame().map_err(into_estimator_error)?;
        let summary = output.summary_frame().map_err(into_estimator_error)?;
        Ok((premia, summary))
    }

    fn terms(&self) -> Vec<String> {
        self.config.terms()
    }
}

fn into_estimator_error(err: ModelError) -> EstimatorError {
    match err {
        ModelError::Estimator(err) => err,
        ModelError::Polars(err) => EstimatorError::Polars(err),
        ModelError::InsufficientData { required, actual } => {
            EstimatorError::InsufficientData { required, actual }
        }
        other => EstimatorError::InvalidConfig(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use portsort_primitives::EntityId;

    use super::*;

    fn row(entity: i64, period: Period, y: Option<f64>, x: Option<f64>) -> Observation {
        let mut obs = Observation::new(EntityId::new(entity), period);
        obs.set_characteristic("ret_lead", y);
        obs.set_characteristic("beta", x);
        obs
    }

    fn runner() -> FamaMacBeth {
        FamaMacBeth::new(FamaMacBethConfig::new("ret_lead", ["beta"])).unwrap()
    }

    #[test]
    fn config_validation() {
        assert!(FamaMacBethConfig::new("ret_lead", Vec::<String>::new()).validate().is_err());
        assert!(FamaMacBethConfig::new("ret_lead", ["a", "a"]).validate().is_err());

        let mut config = FamaMacBethConfig::new("ret_lead", ["a", "b"]);
        assert_eq!(config.required_observations(), 4);
        config.min_observations = Some(2);
        assert!(config.validate().is_err());
        config.min_observations = Some(3);
        config.winsorize = Some(0.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn perfect_fit_each_period() {
        let mut rows = Vec::new();
        for m in 1..=3 {
            let period = Period::new(2021, m).unwrap();
            for e in 0..5 {
                let x = f64::from(e) * 0.3 - 0.4 + f64::from(m) * 0.01;
                rows.push(row(i64::from(e), period, Some(x), Some(x)));
            }
        }
        let output = runner().run(&Panel::new(rows).unwrap()).unwrap();

        assert_eq!(output.outcomes.len(), 3);
        assert_eq!(output.summary[0].term, INTERCEPT);
        assert_relative_eq!(output.summary[0].summary.mean, 0.0, epsilon = 1e-10);
        assert_relative_eq!(output.summary[1].summary.mean, 1.0, epsilon = 1e-10);
        assert_relative_eq!(output.summary[1].summary.naive_standard_error, 0.0, epsilon = 1e-10);
        assert_eq!(output.summary[1].summary.periods, 3);
    }

    #[test]
    fn sparse_period_is_omitted_not_zero_filled() {
        let p1 = Period::new(2021, 1).unwrap();
        let p2 = Period::new(2021, 2).unwrap();
        let p3 = Period::new(2021, 3).unwrap();
        let mut rows = Vec::new();
        for (i, p) in [p1, p3].into_iter().enumerate() {
            let slope = 0.5 + i as f64;
            for e in 0..4 {
                let x = f64::from(e);
                rows.push(row(i64::from(e), p, Some(0.01 + slope * x), Some(x)));
            }
        }
        // Two usable rows and one with an undefined characteristic
        rows.push(row(0, p2, Some(0.1), Some(1.0)));
        rows.push(row(1, p2, Some(0.2), Some(2.0)));
        rows.push(row(2, p2, Some(0.3), None));

        let output = runner().run(&Panel::new(rows).unwrap()).unwrap();

        assert_eq!(
            output.outcomes[&p2],
            PeriodOutcome::Omitted(OmissionReason::TooFewObservations { required: 3, actual: 2 })
        );
        assert_eq!(output.omitted().len(), 1);
        assert_eq!(output.summary[1].summary.periods, 2);
        assert_relative_eq!(output.summary[1].summary.mean, 1.0, epsilon = 1e-10);
        assert_eq!(output.estimates().len(), 4);
    }

    #[test]
    fn collinear_period_is_singular() {
        let period = Period::new(2021, 1).unwrap();
        let rows: Vec<Observation> =
            (0..5).map(|e| row(e, period, Some(0.01 * e as f64), Some(1.0))).collect();
        let panel = Panel::new(rows).unwrap();
        let outcomes = runner().estimate_periods(&panel);
        assert_eq!(outcomes[&period], PeriodOutcome::Omitted(OmissionReason::Singular));
        assert!(matches!(runner().run(&panel), Err(ModelError::InsufficientData { .. })));
    }

    #[test]
    fn frames_have_expected_columns() {
        let mut rows = Vec::new();
        for m in 1..=4 {
            let period = Period::new(2021, m).unwrap();
            for e in 0..6 {
                let x = f64::from(e);
                let noise = f64::from((e * 7 + m as i32) % 5) * 0.001;
                rows.push(row(i64::from(e), period, Some(0.02 * x + noise), Some(x)));
            }
        }
        let output = runner().run(&Panel::new(rows).unwrap()).unwrap();

        let summary = output.summary_frame().unwrap();
        let names: Vec<String> = summary.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "term",
                "mean",
                "naive_standard_error",
                "naive_t_statistic",
                "robust_standard_error",
                "robust_t_statistic",
                "periods"
            ]
        );
        assert_eq!(summary.height(), 2);
        assert_eq!(output.premia_frame().unwrap().height(), 8);
    }
}
