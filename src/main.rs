use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use u_assign::allocation::{BatchAllocator, ExemptionSet, SequentialAllocator};
use u_assign::compliance::{error_count, ComplianceValidator, Diagnostic};
use u_assign::cp::SolverConfig;
use u_assign::eligibility::ResolvedConfig;
use u_assign::models::{AssignmentTable, ProcessConfig};
use u_assign::{io, telemetry};

#[derive(Parser, Debug)]
#[command(
    name = "u-assign",
    about = "Assign persons to recurring process steps under SoD, binding and fairness rules",
    version
)]
struct Cli {
    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produce an assignment table and validate it
    Solve(SolveArgs),
    /// Validate an existing assignment table
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Configuration file (JSON bundle or single snapshot)
    #[arg(long)]
    config: PathBuf,
    /// Snapshot name (defaults to the bundle's active snapshot)
    #[arg(long)]
    snapshot: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    Batch,
    Sequential,
}

#[derive(Args, Debug)]
struct SolveArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Allocation strategy
    #[arg(long, value_enum, default_value_t = Strategy::Batch)]
    strategy: Strategy,
    /// Override the configured instance count
    #[arg(long)]
    instances: Option<usize>,
    /// Wall-clock limit for the batch strategy
    #[arg(long, default_value_t = 30_000)]
    time_limit_ms: i64,
    /// RNG seed for reproducible batch tie-breaking
    #[arg(long)]
    seed: Option<u64>,
    /// Exempt PERSON:TASK from the sequential exclusion history (repeatable)
    #[arg(long = "exempt", value_parser = parse_exemption)]
    exemptions: Vec<(String, String)>,
    /// Write the table as CSV to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Assignment table CSV
    #[arg(long)]
    table: PathBuf,
}

fn parse_exemption(value: &str) -> Result<(String, String), String> {
    match value.split_once(':') {
        Some((person, task)) if !person.is_empty() && !task.is_empty() => {
            Ok((person.to_string(), task.to_string()))
        }
        _ => Err(format!("expected PERSON:TASK, got '{value}'")),
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = telemetry::init(&cli.log_level) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Solve(args) => solve(args),
        Command::Validate(args) => validate(args),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "run failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &ConfigArgs) -> CliResult<ProcessConfig> {
    let bundle = io::load_bundle(&args.config)?;
    let config = bundle.select(args.snapshot.as_deref())?.clone();
    info!(version = %config.version, path = %args.config.display(), "configuration loaded");
    Ok(config)
}

fn solve(args: SolveArgs) -> CliResult<ExitCode> {
    let mut config = load_config(&args.config)?;
    if let Some(n) = args.instances {
        config.rules.instance_count = n;
    }
    let resolved = ResolvedConfig::resolve(&config)?;

    let mut solver_config = SolverConfig::default().with_time_limit_ms(args.time_limit_ms);
    if let Some(seed) = args.seed {
        solver_config = solver_config.with_seed(seed);
    }

    let table = match args.strategy {
        Strategy::Batch => {
            let outcome = BatchAllocator::new()
                .with_config(solver_config)
                .allocate(&resolved)?;
            println!(
                "status: {:?}, objective: {:.3}, lower bound: {}",
                outcome.status,
                outcome.objective_value,
                outcome
                    .lower_bound
                    .map_or_else(|| "n/a".to_string(), |b| format!("{b:.3}"))
            );
            outcome.table
        }
        Strategy::Sequential => {
            let mut exemptions = ExemptionSet::new();
            for (person, task) in args.exemptions {
                exemptions.insert(person, task);
            }
            let outcome = SequentialAllocator::new()
                .with_exemptions(exemptions)
                .allocate(&resolved)?;
            println!("status: Feasible, exclusions: {}", outcome.history.len());
            outcome.table
        }
    };

    match &args.out {
        Some(path) => {
            io::save_table(&table, path)?;
            info!(path = %path.display(), "table written");
        }
        None => io::write_table(&table, std::io::stdout().lock())?,
    }

    report(&resolved, &table)
}

fn validate(args: ValidateArgs) -> CliResult<ExitCode> {
    let config = load_config(&args.config)?;
    let resolved = ResolvedConfig::resolve(&config)?;
    let table = io::load_table(&args.table)?;
    report(&resolved, &table)
}

fn report(resolved: &ResolvedConfig, table: &AssignmentTable) -> CliResult<ExitCode> {
    let diagnostics: Vec<Diagnostic> = ComplianceValidator::new(resolved).validate(table)?;
    for diagnostic in &diagnostics {
        println!("{diagnostic}");
    }

    let errors = error_count(&diagnostics);
    if diagnostics.is_empty() {
        println!("all {} instance(s) comply", table.instance_count());
    } else {
        println!(
            "{} error(s), {} warning(s)",
            errors,
            diagnostics.len() - errors
        );
    }

    Ok(if errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
