//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::openai_oracle::OpenAiOracle;
use crate::adapters::script_oracle::ScriptOracle;
use crate::adapters::svg_chart_adapter::SvgChartAdapter;
use crate::adapters::yahoo_adapter::YahooDataAdapter;
use crate::domain::agent_config::{
    AgentConfig, DataConfig, DataProvider, OracleConfig, OracleProvider,
};
use crate::domain::command_parser;
use crate::domain::config_validation::validate_agent_config;
use crate::domain::error::AgentError;
use crate::domain::executor::Executor;
use crate::domain::session::{Agent, SessionOutcome, Step, StopReason};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::decision_port::DecisionPort;

#[derive(Parser, Debug)]
#[command(name = "quantagent", about = "Oracle-driven trading research agent")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the decide/execute loop until FINISH or a backtest completes
    Run {
        #[arg(short, long, env = "QUANTAGENT_CONFIG")]
        config: Option<PathBuf>,
        #[arg(short, long)]
        goal: Option<String>,
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// Parse and execute a single command without the oracle
    Exec {
        #[arg(short, long, env = "QUANTAGENT_CONFIG")]
        config: Option<PathBuf>,
        command: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run {
            config,
            goal,
            max_steps,
        } => run_agent(config.as_deref(), goal, max_steps),
        Command::Exec { config, command } => run_exec(config.as_deref(), &command),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Diagnostics go to stderr; stdout carries only the transcript.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("quantagent=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quantagent=info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Loads the INI file when given, then applies `QUANTAGENT_*` overrides.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, AgentError> {
    let adapter = match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path)?
        }
        None => FileConfigAdapter::empty(),
    };
    Ok(adapter.with_env_overrides())
}

pub fn build_agent_config(config: &dyn ConfigPort) -> Result<AgentConfig, AgentError> {
    validate_agent_config(config)?;
    let defaults = AgentConfig::default();

    let max_steps = match config.get_int("agent", "max_steps", 0) {
        n if n > 0 => Some(n as usize),
        _ => None,
    };

    let oracle = OracleConfig {
        provider: config
            .get_trimmed("oracle", "provider")
            .and_then(|p| OracleProvider::parse(&p))
            .unwrap_or(defaults.oracle.provider),
        model: config
            .get_trimmed("oracle", "model")
            .unwrap_or(defaults.oracle.model),
        base_url: config
            .get_trimmed("oracle", "base_url")
            .unwrap_or(defaults.oracle.base_url),
        temperature: config.get_double("oracle", "temperature", defaults.oracle.temperature),
        timeout_secs: config.get_int("oracle", "timeout_secs", defaults.oracle.timeout_secs as i64)
            as u64,
        script_path: config.get_trimmed("oracle", "script_path").map(PathBuf::from),
    };

    let data = DataConfig {
        provider: config
            .get_trimmed("data", "provider")
            .and_then(|p| DataProvider::parse(&p))
            .unwrap_or(defaults.data.provider),
        csv_dir: config.get_trimmed("data", "csv_dir").map(PathBuf::from),
        timeout_secs: config.get_int("data", "timeout_secs", defaults.data.timeout_secs as i64)
            as u64,
    };

    Ok(AgentConfig {
        goal: config.get_trimmed("agent", "goal").unwrap_or(defaults.goal),
        max_steps,
        chart_dir: config
            .get_trimmed("agent", "chart_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.chart_dir),
        oracle,
        data,
    })
}

pub fn build_oracle(config: &OracleConfig) -> Result<Box<dyn DecisionPort>, AgentError> {
    match config.provider {
        OracleProvider::OpenAi => Ok(Box::new(OpenAiOracle::from_env(config)?)),
        OracleProvider::Script => {
            let path = config
                .script_path
                .as_ref()
                .ok_or_else(|| AgentError::ConfigInvalid {
                    section: "oracle".into(),
                    key: "script_path".into(),
                    reason: "script_path is required for the script provider".into(),
                })?;
            Ok(Box::new(ScriptOracle::from_file(path)?))
        }
    }
}

pub fn build_data_port(config: &DataConfig) -> Result<Box<dyn MarketDataPort>, AgentError> {
    match config.provider {
        DataProvider::Yahoo => Ok(Box::new(YahooDataAdapter::new(config.timeout_secs)?)),
        DataProvider::Csv => {
            let dir = config
                .csv_dir
                .as_ref()
                .ok_or_else(|| AgentError::ConfigInvalid {
                    section: "data".into(),
                    key: "csv_dir".into(),
                    reason: "csv_dir is required for the csv provider".into(),
                })?;
            Ok(Box::new(CsvDataAdapter::new(dir)))
        }
    }
}

/// One transcript block, numbered from 1.
pub fn render_step(number: usize, step: &Step) -> String {
    format!(
        "--- Step {} ---\nAction: {}\nResult: {}\n",
        number, step.command, step.result
    )
}

pub fn render_outcome(outcome: &SessionOutcome) -> String {
    let heading = match outcome.stop {
        StopReason::Finished => "--- Finished ---",
        StopReason::BacktestCompleted => "--- Finished (backtest completed) ---",
        StopReason::StepLimit => "--- Stopped (step limit) ---",
    };
    format!("{}\n{}", heading, outcome.final_answer)
}

/// One-line stderr message. Setup failures get a `setup error:` prefix.
pub fn error_message(err: &AgentError) -> String {
    if err.is_fatal_setup() {
        format!("setup error: {err}")
    } else {
        format!("error: {err}")
    }
}

fn run_agent(
    config_path: Option<&Path>,
    goal: Option<String>,
    max_steps: Option<usize>,
) -> ExitCode {
    let setup = load_config(config_path).and_then(|adapter| build_agent_config(&adapter));
    let mut config = match setup {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", error_message(&e));
            return (&e).into();
        }
    };
    if let Some(goal) = goal {
        config.goal = goal;
    }
    if max_steps.is_some() {
        config.max_steps = max_steps;
    }

    let ports = build_oracle(&config.oracle)
        .and_then(|oracle| Ok((oracle, build_data_port(&config.data)?)));
    let (oracle, data) = match ports {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", error_message(&e));
            return (&e).into();
        }
    };
    let charts = SvgChartAdapter::new(&config.chart_dir);

    let executor = Executor::new(data.as_ref(), &charts);
    let agent = Agent::new(oracle.as_ref(), executor).with_max_steps(config.max_steps);

    println!("Goal: {}\n", config.goal);
    let mut number = 0;
    let outcome = agent.run_with_observer(&config.goal, |step| {
        number += 1;
        println!("{}", render_step(number, step));
    });

    match outcome {
        Ok(outcome) => {
            println!("{}", render_outcome(&outcome));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "session aborted");
            eprintln!("{}", error_message(&e));
            (&e).into()
        }
    }
}

fn run_exec(config_path: Option<&Path>, command: &str) -> ExitCode {
    let action = match command_parser::parse(command) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error:\n{}", e.display_with_context());
            return (&AgentError::from(e)).into();
        }
    };

    let setup = load_config(config_path)
        .and_then(|adapter| build_agent_config(&adapter))
        .and_then(|config| Ok((build_data_port(&config.data)?, config)));
    let (data, config) = match setup {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", error_message(&e));
            return (&e).into();
        }
    };
    let charts = SvgChartAdapter::new(&config.chart_dir);

    let result = Executor::new(data.as_ref(), &charts).execute(&action);
    println!("{}", result);
    if result.starts_with("ERROR") {
        ExitCode::from(5)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(Some(config_path)).and_then(|a| build_agent_config(&a)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", error_message(&e));
            return (&e).into();
        }
    };

    eprintln!("\nAgent:");
    eprintln!("  goal:      {}", config.goal);
    match config.max_steps {
        Some(n) => eprintln!("  max_steps: {}", n),
        None => eprintln!("  max_steps: unbounded"),
    }
    eprintln!("  chart_dir: {}", config.chart_dir.display());

    eprintln!("\nOracle:");
    match config.oracle.provider {
        OracleProvider::OpenAi => {
            eprintln!("  provider:    openai");
            eprintln!("  model:       {}", config.oracle.model);
            eprintln!("  base_url:    {}", config.oracle.base_url);
            eprintln!("  temperature: {}", config.oracle.temperature);
        }
        OracleProvider::Script => {
            let path = config
                .oracle
                .script_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            eprintln!("  provider: script ({})", path);
        }
    }

    eprintln!("\nData:");
    match (&config.data.provider, &config.data.csv_dir) {
        (DataProvider::Csv, Some(dir)) => eprintln!("  provider: csv ({})", dir.display()),
        _ => eprintln!("  provider: yahoo"),
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
