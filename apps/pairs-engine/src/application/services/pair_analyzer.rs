//! Pair Analyzer
//!
//! One analytics pass over a pair: resample both legs from the repository,
//! align their closes, estimate the hedge ratio, build the spread, z-score and
//! rolling correlation, optionally run the stationarity test, backtest the
//! z-score and evaluate the alert. Nothing computed here is persisted.

use std::sync::Arc;

use crate::application::ports::TickRepository;
use crate::domain::alerts::{Alert, AlertEvaluator, DEFAULT_ALERT_THRESHOLD};
use crate::domain::analytics::{
    AdfResult, RegressionKind, align, mean_reversion_backtest, rolling_corr, rolling_zscore,
    spread, stationarity_test,
};
use crate::domain::market::{Bar, Timeframe, canonical_symbol};
use crate::domain::series::TimeSeries;

// =============================================================================
// Request
// =============================================================================

/// Parameters of one analytics pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRequest {
    /// Dependent leg (`y` in the regression).
    pub leg_a: String,
    /// Independent leg (`x` in the regression).
    pub leg_b: String,
    /// Bar width.
    pub timeframe: Timeframe,
    /// How far back to resample.
    pub lookback_minutes: u32,
    /// Rolling window for z-score and correlation, in bars.
    pub window: usize,
    /// Backtest entry band.
    pub entry_z: f64,
    /// Backtest exit band.
    pub exit_z: f64,
    /// Alert band.
    pub alert_threshold: f64,
    /// Whether to run the (comparatively slow) stationarity test.
    pub run_stationarity: bool,
    /// Hedge-ratio estimator.
    pub regression: RegressionKind,
}

impl PairRequest {
    /// Request with the default analytics parameters.
    #[must_use]
    pub fn new(leg_a: impl Into<String>, leg_b: impl Into<String>) -> Self {
        Self {
            leg_a: leg_a.into(),
            leg_b: leg_b.into(),
            timeframe: Timeframe::OneMinute,
            lookback_minutes: 60,
            window: 100,
            entry_z: 2.0,
            exit_z: 0.0,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            run_stationarity: false,
            regression: RegressionKind::Ols,
        }
    }

    /// Check the legs and return their canonical forms.
    pub fn validate(&self) -> Result<(String, String), PairError> {
        let a = canonical_symbol(&self.leg_a);
        let b = canonical_symbol(&self.leg_b);
        if a.is_empty() || b.is_empty() {
            return Err(PairError::EmptyLeg);
        }
        if a == b {
            return Err(PairError::IdenticalLegs(a));
        }
        Ok((a, b))
    }
}

/// Analyzer errors.
#[derive(Debug, thiserror::Error)]
pub enum PairError {
    /// One of the legs is blank.
    #[error("pair leg is empty")]
    EmptyLeg,

    /// Both legs name the same instrument.
    #[error("pair legs are identical: {0}")]
    IdenticalLegs(String),

    /// The repository query failed.
    #[error("tick repository error: {0}")]
    Repository(#[source] Box<dyn std::error::Error + Send + Sync>),
}

// =============================================================================
// Result
// =============================================================================

/// Everything one pass computes.
#[derive(Debug, Clone)]
pub struct PairSnapshot {
    /// Canonical dependent leg.
    pub leg_a: String,
    /// Canonical independent leg.
    pub leg_b: String,
    /// Bars of `leg_a`.
    pub bars_a: Vec<Bar>,
    /// Bars of `leg_b`.
    pub bars_b: Vec<Bar>,
    /// `leg_a` on `leg_b` slope.
    pub hedge_ratio: f64,
    /// `a - hedge_ratio * b` on the aligned index.
    pub spread: TimeSeries,
    /// Rolling z-score of the spread.
    pub zscore: TimeSeries,
    /// Rolling correlation of the closes.
    pub correlation: TimeSeries,
    /// Stationarity test of the spread, when requested.
    pub stationarity: Option<AdfResult>,
    /// Backtest equity curve.
    pub equity: TimeSeries,
    /// Last defined z-score.
    pub latest_zscore: Option<f64>,
    /// Alert fired by the latest z-score.
    pub alert: Option<Alert>,
}

impl PairSnapshot {
    /// Number of aligned bars the statistics were computed on.
    #[must_use]
    pub fn aligned_len(&self) -> usize {
        self.spread.len()
    }

    /// Final equity, `0.0` when the backtest never had a defined z-score.
    #[must_use]
    pub fn final_equity(&self) -> f64 {
        self.equity.last_defined().unwrap_or(0.0)
    }
}

/// Outcome of [`PairAnalyzer::analyze`].
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// Statistics computed.
    Ready(Box<PairSnapshot>),
    /// A leg has no bars in the lookback window yet.
    WaitingForData {
        /// The canonical symbol with no data.
        leg: String,
    },
}

// =============================================================================
// Analyzer
// =============================================================================

/// Runs analytics passes against a tick repository.
#[derive(Debug)]
pub struct PairAnalyzer<R> {
    repository: Arc<R>,
}

impl<R> Clone for PairAnalyzer<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: TickRepository> PairAnalyzer<R> {
    /// Create an analyzer over a shared repository.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Run one pass over the last `lookback_minutes` of wall-clock time.
    pub fn analyze(&self, request: &PairRequest) -> Result<AnalysisOutcome, PairError> {
        self.analyze_at(request, chrono::Utc::now().timestamp_millis())
    }

    /// Run one pass with an explicit "now".
    pub fn analyze_at(
        &self,
        request: &PairRequest,
        now_ms: i64,
    ) -> Result<AnalysisOutcome, PairError> {
        let (leg_a, leg_b) = request.validate()?;

        let bars_a = self.bars(&leg_a, request, now_ms)?;
        if bars_a.is_empty() {
            return Ok(AnalysisOutcome::WaitingForData { leg: leg_a });
        }
        let bars_b = self.bars(&leg_b, request, now_ms)?;
        if bars_b.is_empty() {
            return Ok(AnalysisOutcome::WaitingForData { leg: leg_b });
        }

        let (y, x) = align(&TimeSeries::closes(&bars_a), &TimeSeries::closes(&bars_b));
        let hedge_ratio = request.regression.hedge_ratio(&y, &x);
        let spread = spread(&y, &x, hedge_ratio);
        let zscore = rolling_zscore(&spread, request.window);
        let correlation = rolling_corr(&y, &x, request.window);
        let stationarity = request.run_stationarity.then(|| stationarity_test(&spread));
        let equity = mean_reversion_backtest(&zscore, request.entry_z, request.exit_z);
        let latest_zscore = zscore.last_defined();
        let alert = AlertEvaluator::new(request.alert_threshold).check(latest_zscore);

        tracing::debug!(
            leg_a = %leg_a,
            leg_b = %leg_b,
            aligned = spread.len(),
            hedge_ratio,
            "Pair analytics pass complete"
        );

        Ok(AnalysisOutcome::Ready(Box::new(PairSnapshot {
            leg_a,
            leg_b,
            bars_a,
            bars_b,
            hedge_ratio,
            spread,
            zscore,
            correlation,
            stationarity,
            equity,
            latest_zscore,
            alert,
        })))
    }

    fn bars(&self, symbol: &str, request: &PairRequest, now_ms: i64) -> Result<Vec<Bar>, PairError> {
        self.repository
            .resample_at(symbol, request.timeframe, request.lookback_minutes, now_ms)
            .map_err(|e| PairError::Repository(Box::new(e)))
    }
}
