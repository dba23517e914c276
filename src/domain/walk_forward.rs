//! Walk-forward study.
//!
//! History is cut into consecutive windows of `window_months × 30` days. For
//! each step the training window is followed by a test window of the same
//! length; candidates proposed from the training window's market context are
//! optimized on the training window and the winner is scored, unchanged, on
//! the test window. Both evaluations simulate from a warmup start so
//! indicators are formed when scoring begins. The study then advances by one
//! window, so test windows are contiguous and never overlap.
//!
//! A window that cannot be evaluated is recorded as skipped or failed and the
//! study continues.

use chrono::{Duration, NaiveDate};
use std::fmt;
use tracing::{info, warn};

use crate::domain::bootstrap::BootstrapConfig;
use crate::domain::context::MarketContext;
use crate::domain::error::ForwardtestError;
use crate::domain::evaluation::{AssetBook, EvaluationResult, EvaluationWindow, Evaluator};
use crate::domain::optimizer::{GridSearch, RejectedCandidate, ScoredCandidate, ScoringMode};
use crate::domain::params::format_params;
use crate::domain::price_series::PriceSeries;
use crate::ports::proposal_port::ProposalSource;

pub const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkForwardConfig {
    pub window_months: u32,
    pub warmup_days: i64,
    pub min_window_bars: usize,
    pub scoring: ScoringMode,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        WalkForwardConfig {
            window_months: 6,
            warmup_days: 252,
            min_window_bars: 50,
            scoring: ScoringMode::Bootstrap(BootstrapConfig::default()),
        }
    }
}

impl WalkForwardConfig {
    pub fn window_length(&self) -> Option<Duration> {
        i64::from(self.window_months)
            .checked_mul(DAYS_PER_MONTH)
            .and_then(Duration::try_days)
    }
}

/// Boundaries of one walk-forward step.
///
/// `warmup_start <= train_start < train_end == test_start < test_end`, and
/// `test_warmup_start <= test_start`. Both warmup starts are clamped to the
/// first available date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDescriptor {
    pub index: usize,
    pub warmup_start: NaiveDate,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_warmup_start: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

impl WindowDescriptor {
    /// Test period label, e.g. `2021-07`.
    pub fn period_label(&self) -> String {
        self.test_start.format("%Y-%m").to_string()
    }

    pub fn train_window(&self) -> EvaluationWindow {
        EvaluationWindow {
            warmup_start: self.warmup_start,
            start: self.train_start,
            end: self.train_end,
        }
    }

    pub fn test_window(&self) -> EvaluationWindow {
        EvaluationWindow {
            warmup_start: self.test_warmup_start,
            start: self.test_start,
            end: self.test_end,
        }
    }
}

/// Windows between `first` and `last`; a step exists while
/// `current + 2 × window <= last`. Warmup starts that fall before `first`,
/// or outside the calendar, are clamped to `first`.
pub fn plan_windows(
    first: NaiveDate,
    last: NaiveDate,
    config: &WalkForwardConfig,
) -> Vec<WindowDescriptor> {
    let Some(window) = config.window_length().filter(|w| *w > Duration::zero()) else {
        return Vec::new();
    };
    let warmup = Duration::try_days(config.warmup_days.max(0));
    let warmup_start = |from: NaiveDate| {
        warmup
            .and_then(|w| from.checked_sub_signed(w))
            .map_or(first, |start| start.max(first))
    };

    let mut windows = Vec::new();
    let mut current = first;
    loop {
        let Some(train_end) = current.checked_add_signed(window) else {
            break;
        };
        let Some(test_end) = train_end.checked_add_signed(window) else {
            break;
        };
        if test_end > last {
            break;
        }
        windows.push(WindowDescriptor {
            index: windows.len(),
            warmup_start: warmup_start(current),
            train_start: current,
            train_end,
            test_warmup_start: warmup_start(train_end),
            test_start: train_end,
            test_end,
        });
        current = train_end;
    }
    windows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Completed,
    Skipped,
    Failed,
}

impl fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WindowStatus::Completed => "completed",
            WindowStatus::Skipped => "skipped",
            WindowStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowRecord {
    pub descriptor: WindowDescriptor,
    pub status: WindowStatus,
    pub context: Option<MarketContext>,
    pub candidates: usize,
    pub selected: Option<ScoredCandidate>,
    pub rejected: Vec<RejectedCandidate>,
    pub test: Option<EvaluationResult>,
    pub note: Option<String>,
}

impl WindowRecord {
    fn new(descriptor: WindowDescriptor) -> Self {
        WindowRecord {
            descriptor,
            status: WindowStatus::Failed,
            context: None,
            candidates: 0,
            selected: None,
            rejected: Vec::new(),
            test: None,
            note: None,
        }
    }

    fn skip(mut self, note: String) -> Self {
        self.status = WindowStatus::Skipped;
        self.note = Some(note);
        self
    }

    fn fail(mut self, note: String) -> Self {
        self.status = WindowStatus::Failed;
        self.note = Some(note);
        self
    }
}

/// One row of tabular study output.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub window: usize,
    pub period: String,
    pub train_start: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    pub strategy: String,
    pub params: String,
    pub train_score: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub total_return: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub num_trades: Option<usize>,
    pub status: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardSummary {
    pub windows: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub mean_test_sharpe: f64,
    pub median_test_sharpe: f64,
    pub mean_test_return: f64,
}

impl WalkForwardSummary {
    pub fn completion_rate(&self) -> f64 {
        if self.windows == 0 {
            0.0
        } else {
            self.completed as f64 / self.windows as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardReport {
    pub ticker: String,
    pub scoring: ScoringMode,
    pub records: Vec<WindowRecord>,
}

impl WalkForwardReport {
    pub fn completed(&self) -> impl Iterator<Item = &WindowRecord> {
        self.records.iter().filter(|r| r.status == WindowStatus::Completed)
    }

    pub fn summary(&self) -> WalkForwardSummary {
        let count =
            |status: WindowStatus| self.records.iter().filter(|r| r.status == status).count();
        let mut sharpes: Vec<f64> = self
            .completed()
            .filter_map(|r| r.test.as_ref())
            .map(|t| t.metrics.sharpe_ratio)
            .collect();
        let returns: Vec<f64> = self
            .completed()
            .filter_map(|r| r.test.as_ref())
            .map(|t| t.metrics.total_return)
            .collect();

        WalkForwardSummary {
            windows: self.records.len(),
            completed: count(WindowStatus::Completed),
            skipped: count(WindowStatus::Skipped),
            failed: count(WindowStatus::Failed),
            mean_test_sharpe: mean(&sharpes),
            median_test_sharpe: median(&mut sharpes),
            mean_test_return: mean(&returns),
        }
    }

    /// Selected candidate per window with its test metrics, followed by a row
    /// per rejected candidate. Windows without a selection get one row.
    pub fn to_report_records(&self) -> Vec<ReportRecord> {
        let mut rows = Vec::new();
        for record in &self.records {
            let d = &record.descriptor;
            let base = ReportRecord {
                window: d.index,
                period: d.period_label(),
                train_start: d.train_start,
                test_start: d.test_start,
                test_end: d.test_end,
                strategy: String::new(),
                params: String::new(),
                train_score: None,
                sharpe_ratio: None,
                total_return: None,
                max_drawdown: None,
                num_trades: None,
                status: record.status.to_string(),
                note: record.note.clone().unwrap_or_default(),
            };

            match &record.selected {
                Some(selected) => {
                    let test = record.test.as_ref().map(|t| t.metrics);
                    rows.push(ReportRecord {
                        strategy: selected.candidate.strategy.clone(),
                        params: format_params(&selected.candidate.params),
                        train_score: Some(selected.score),
                        sharpe_ratio: test.map(|m| m.sharpe_ratio),
                        total_return: test.map(|m| m.total_return),
                        max_drawdown: test.map(|m| m.max_drawdown),
                        num_trades: test.map(|m| m.num_trades),
                        ..base.clone()
                    });
                }
                None => rows.push(base.clone()),
            }

            for rejected in &record.rejected {
                rows.push(ReportRecord {
                    strategy: rejected.candidate.strategy.clone(),
                    params: format_params(&rejected.candidate.params),
                    status: "rejected".to_string(),
                    note: rejected.reason.clone(),
                    ..base.clone()
                });
            }
        }
        rows
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

pub struct WalkForward<'a> {
    evaluator: Evaluator<'a>,
    config: WalkForwardConfig,
}

impl<'a> WalkForward<'a> {
    pub fn new(evaluator: Evaluator<'a>, config: WalkForwardConfig) -> Self {
        WalkForward { evaluator, config }
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Runs every planned window in chronological order.
    ///
    /// Fails only when `series` is empty; problems inside a window are
    /// recorded on that window.
    pub fn run(
        &self,
        series: &PriceSeries,
        book: &mut AssetBook<'_>,
        proposals: &mut dyn ProposalSource,
    ) -> Result<WalkForwardReport, ForwardtestError> {
        let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
            return Err(ForwardtestError::data_unavailable(&series.ticker, "empty price series"));
        };

        let windows = plan_windows(first, last, &self.config);
        info!(
            ticker = %series.ticker,
            windows = windows.len(),
            window_months = self.config.window_months,
            scoring = %self.config.scoring,
            "starting walk-forward study"
        );

        let mut search = GridSearch::new(self.config.scoring);
        let mut records = Vec::with_capacity(windows.len());
        for descriptor in windows {
            let record = self.run_window(series, book, proposals, &mut search, descriptor);
            match record.status {
                WindowStatus::Completed => info!(
                    window = descriptor.index,
                    period = %descriptor.period_label(),
                    strategy = record
                        .selected
                        .as_ref()
                        .map(|s| s.candidate.strategy.as_str())
                        .unwrap_or(""),
                    test_sharpe = record
                        .test
                        .as_ref()
                        .map(|t| t.metrics.sharpe_ratio)
                        .unwrap_or(0.0),
                    "window completed"
                ),
                status => warn!(
                    window = descriptor.index,
                    period = %descriptor.period_label(),
                    %status,
                    note = record.note.as_deref().unwrap_or(""),
                    "window not completed"
                ),
            }
            records.push(record);
        }

        Ok(WalkForwardReport {
            ticker: series.ticker.clone(),
            scoring: self.config.scoring,
            records,
        })
    }

    fn run_window(
        &self,
        series: &PriceSeries,
        book: &mut AssetBook<'_>,
        proposals: &mut dyn ProposalSource,
        search: &mut GridSearch,
        descriptor: WindowDescriptor,
    ) -> WindowRecord {
        let mut record = WindowRecord::new(descriptor);
        let min_bars = self.config.min_window_bars;

        let train_range = series.index_range(descriptor.train_start, descriptor.train_end);
        let test_range = series.index_range(descriptor.test_start, descriptor.test_end);
        if train_range.len() < min_bars || test_range.len() < min_bars {
            return record.skip(format!(
                "train window has {} bars, test window has {} (minimum {})",
                train_range.len(),
                test_range.len(),
                min_bars
            ));
        }

        let Some(context) = MarketContext::summarize(series, train_range) else {
            return record.skip("no bars in train window".to_string());
        };

        let mut candidates = match proposals.propose(&context) {
            Ok(candidates) => candidates,
            Err(err) => return record.fail(format!("proposal source failed: {}", err)),
        };
        for candidate in &mut candidates {
            context.bind(&mut candidate.params);
        }
        record.context = Some(context);
        record.candidates = candidates.len();
        if candidates.is_empty() {
            return record.skip("no candidates proposed".to_string());
        }

        let train_window = descriptor.train_window();
        let optimization = match search.run(&candidates, |candidate| {
            self.evaluator
                .evaluate_candidate(book, series, candidate, &train_window)
        }) {
            Ok(optimization) => optimization,
            Err(err) => return record.fail(err.to_string()),
        };

        record.rejected = optimization.rejected.clone();
        let Some(best) = optimization.best().cloned() else {
            return record.fail(format!("all {} candidates were rejected", candidates.len()));
        };

        let test = self
            .evaluator
            .evaluate_candidate(book, series, &best.candidate, &descriptor.test_window());
        record.selected = Some(best);
        match test {
            Ok(result) => {
                record.test = Some(result);
                record.status = WindowStatus::Completed;
                record
            }
            Err(err) => record.fail(format!("test evaluation failed: {}", err)),
        }
    }
}
