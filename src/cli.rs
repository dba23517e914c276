//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::config_proposal_adapter::ConfigProposalAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::ForwardtestError;
use crate::domain::evaluation::{AssetBook, EvaluationResult, Evaluator};
use crate::domain::normalizer::{DefaultValue, ParamKind};
use crate::domain::params::{format_params, ParamValue, ParameterSet};
use crate::domain::registry::StrategyRegistry;
use crate::domain::settings::StudyConfig;
use crate::domain::walk_forward::{WalkForward, WalkForwardReport};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "forwardtest", about = "Walk-forward strategy evaluation and optimization")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a walk-forward study over the configured proposals
    WalkForward {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV file receiving one row per window and candidate
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate one strategy over the full configured period
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: String,
        /// Strategy parameter as key=value; repeatable
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
        /// Comma-separated tickers traded as an equal-weight portfolio
        #[arg(long, value_delimiter = ',')]
        assets: Vec<String>,
    },
    /// Validate a study configuration and its proposals
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List built-in strategies and their parameters
    Strategies,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::WalkForward { config, output } => run_walk_forward(&config, output.as_deref()),
        Command::Evaluate {
            config,
            strategy,
            params,
            assets,
        } => run_evaluate(&config, &strategy, &params, &assets),
        Command::Validate { config } => run_validate(&config),
        Command::Strategies => {
            run_strategies();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            (&err).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ForwardtestError> {
    FileConfigAdapter::from_file(path).map_err(|e| ForwardtestError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_lowercase(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn run_walk_forward(config_path: &Path, output: Option<&Path>) -> Result<(), ForwardtestError> {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    let study = StudyConfig::from_config(&adapter)?;

    // Stage 2: Proposals
    let mut proposals = ConfigProposalAdapter::from_config(&adapter)?;
    if proposals.is_empty() {
        return Err(ForwardtestError::ProposalParse {
            section: "proposal".to_string(),
            reason: "no [proposal.*] or [grid.*] sections configured".to_string(),
        });
    }
    eprintln!("{} candidate(s) per window", proposals.candidates().len());

    // Stage 3: Load reference data
    let data = CsvAdapter::new(study.data.path.clone());
    let reference = data.fetch_series(
        &study.data.reference_asset,
        study.data.start_date,
        study.data.end_date,
    )?;
    eprintln!(
        "Loaded {} bars for {} ({} to {})",
        reference.len(),
        reference.ticker,
        reference.first_date().map(|d| d.to_string()).unwrap_or_default(),
        reference.last_date().map(|d| d.to_string()).unwrap_or_default(),
    );

    // Stage 4: Run
    let registry = StrategyRegistry::builtin();
    let evaluator = Evaluator::new(&registry, study.simulation);
    let walk_forward = WalkForward::new(evaluator, study.walk_forward);
    let mut book = AssetBook::new(Some(&data as &dyn DataPort));
    book.insert(reference.clone());
    let report = walk_forward.run(&reference, &mut book, &mut proposals)?;

    print_summary(&report);

    // Stage 5: Report
    if let Some(path) = output {
        let records = report.to_report_records();
        CsvReportAdapter.write(&records, &path.to_string_lossy())?;
        eprintln!("Report written to {} ({} rows)", path.display(), records.len());
    }
    Ok(())
}

fn print_summary(report: &WalkForwardReport) {
    let summary = report.summary();
    eprintln!();
    eprintln!("=== Walk-Forward: {} ({} scoring) ===", report.ticker, report.scoring);
    for record in &report.records {
        let d = &record.descriptor;
        match (&record.selected, &record.test) {
            (Some(selected), Some(test)) => eprintln!(
                "  [{:>2}] {}  {:<14} sharpe {:>7.3}  return {:>8.2}%  {}",
                d.index,
                d.period_label(),
                selected.candidate.strategy,
                test.metrics.sharpe_ratio,
                test.metrics.total_return * 100.0,
                format_params(&selected.candidate.params),
            ),
            _ => eprintln!(
                "  [{:>2}] {}  {}: {}",
                d.index,
                d.period_label(),
                record.status,
                record.note.as_deref().unwrap_or(""),
            ),
        }
    }
    eprintln!();
    eprintln!(
        "Windows:        {} ({} completed, {} skipped, {} failed)",
        summary.windows, summary.completed, summary.skipped, summary.failed
    );
    eprintln!("Completion:     {:.1}%", summary.completion_rate() * 100.0);
    eprintln!("Mean Sharpe:    {:.4}", summary.mean_test_sharpe);
    eprintln!("Median Sharpe:  {:.4}", summary.median_test_sharpe);
    eprintln!("Mean Return:    {:.2}%", summary.mean_test_return * 100.0);
}

fn run_evaluate(
    config_path: &Path,
    strategy: &str,
    raw_params: &[(String, String)],
    assets: &[String],
) -> Result<(), ForwardtestError> {
    let adapter = load_config(config_path)?;
    let study = StudyConfig::from_config(&adapter)?;
    let params: ParameterSet = raw_params
        .iter()
        .map(|(key, value)| (key.clone(), ParamValue::parse(value)))
        .collect();

    let data = CsvAdapter::new(study.data.path.clone());
    let registry = StrategyRegistry::builtin();
    let evaluator = Evaluator::new(&registry, study.simulation);

    let result = if assets.is_empty() {
        let series = data.fetch_series(
            &study.data.reference_asset,
            study.data.start_date,
            study.data.end_date,
        )?;
        evaluator.evaluate(&series, strategy, &params)?
    } else {
        let series = data.fetch_many(assets, study.data.start_date, study.data.end_date)?;
        let legs: Vec<_> = assets.iter().filter_map(|ticker| series.get(ticker)).collect();
        evaluator.evaluate_portfolio(&legs, None, strategy, &params, None)?
    };

    print_evaluation(&result);
    Ok(())
}

fn print_evaluation(result: &EvaluationResult) {
    let m = &result.metrics;
    eprintln!("=== {} on {} ===", result.strategy, result.assets.join("+"));
    eprintln!("Parameters:     {}", format_params(&result.params));
    if let (Some(first), Some(last)) = (result.dates.first(), result.dates.last()) {
        eprintln!("Period:         {} to {} ({} bars)", first, last, result.dates.len());
    }
    eprintln!("Total Return:   {:.2}%", m.total_return * 100.0);
    eprintln!("Sharpe Ratio:   {:.4}", m.sharpe_ratio);
    eprintln!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    eprintln!("Trades:         {}", m.num_trades);
}

fn run_validate(config_path: &Path) -> Result<(), ForwardtestError> {
    let adapter = load_config(config_path)?;
    let study = StudyConfig::from_config(&adapter)?;
    let proposals = ConfigProposalAdapter::from_config(&adapter)?;

    let registry = StrategyRegistry::builtin();
    let mut first_error = None;
    for (i, candidate) in proposals.candidates().iter().enumerate() {
        let checked = registry
            .lookup(&candidate.strategy)
            .and_then(|strategy| strategy.normalize(&candidate.params));
        match checked {
            Ok(params) => {
                eprintln!("  [{}] ok: {} {}", i, candidate.strategy, format_params(&params))
            }
            Err(err) => {
                eprintln!("  [{}] invalid: {}: {}", i, candidate, err);
                first_error.get_or_insert(err);
            }
        }
    }

    let mut tickers = vec![study.data.reference_asset.clone()];
    for candidate in proposals.candidates() {
        tickers.extend(candidate.assets.iter().cloned());
    }
    let data = CsvAdapter::new(study.data.path.clone());
    if let Err(err) = check_data_available(&data, &tickers) {
        first_error.get_or_insert(err);
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    eprintln!(
        "Configuration valid: {} candidate(s)",
        proposals.candidates().len()
    );
    Ok(())
}

/// Fails on the first ticker without a price file among the port's symbols.
fn check_data_available(data: &dyn DataPort, tickers: &[String]) -> Result<(), ForwardtestError> {
    let symbols = data.list_symbols().map_err(|err| {
        let ticker = tickers.first().map(String::as_str).unwrap_or_default();
        ForwardtestError::data_unavailable(ticker, format!("cannot list symbols: {}", err))
    })?;
    for ticker in tickers {
        let stripped = ticker.trim_start_matches('^');
        if !symbols.iter().any(|s| s == ticker || s == stripped) {
            return Err(ForwardtestError::data_unavailable(ticker, "no price file"));
        }
    }
    eprintln!("Data available for {} ticker(s)", tickers.len());
    Ok(())
}

fn run_strategies() {
    let registry = StrategyRegistry::builtin();
    for strategy in registry.iter() {
        eprintln!("{:<14} {}", strategy.name, strategy.description);
        for spec in strategy.schema.params {
            let kind = match spec.kind {
                ParamKind::Integer { min } => format!("integer >= {}", min),
                ParamKind::Float { min, max } => format!("number in [{}, {}]", min, max),
                ParamKind::Regime => "regime label or mapping".to_string(),
            };
            let default = match spec.default {
                Some(DefaultValue::Int(i)) => format!("default {}", i),
                Some(DefaultValue::Float(f)) => format!("default {}", f),
                None if spec.required => "required".to_string(),
                None => "optional".to_string(),
            };
            eprintln!("    {:<14} {:<24} {}", spec.key, kind, default);
        }
    }
}
