mod instance;
mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use instance::{BuiltModel, Instance};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tandem_core::{Method, SolverConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Solve optimization instances with a MIP engine, a CP engine or both"
)]
struct Cli {
    /// Log filter (overrides TANDEM_TRACE), for example `tandem_core=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Minimize the objective of a JSON instance
    Solve(SolveArgs),
}

#[derive(Parser, Debug)]
struct SolveArgs {
    /// JSON instance file
    instance: PathBuf,

    /// Strategy: bc, lbbd, mip or cp
    #[arg(long, default_value = "bc")]
    method: Method,

    /// CPU time limit in seconds
    #[arg(long, default_value_t = 60.0)]
    time_limit: f64,

    /// Maximum nodes per backend search
    #[arg(long)]
    node_limit: Option<u64>,

    /// Maximum master/subproblem rounds for lbbd
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Write the MIP problem in LP format before solving
    #[arg(long)]
    lp_out: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

/// What `solve` prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct SolveReport {
    method: String,
    status: String,
    /// `None` when no solution was found.
    objective: Option<f64>,
    bound: Option<f64>,
    run_time: f64,
    booleans: BTreeMap<String, Option<bool>>,
    integers: BTreeMap<String, Option<i64>>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref())?;
    match cli.command {
        Command::Solve(args) => solve_command(args),
    }
}

fn solve_command(args: SolveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let instance = Instance::from_path(&args.instance)?;
    let mut built = instance.build(config_from_args(&args))?;
    if let Some(path) = &args.lp_out {
        built.model.write_lp(path)?;
    }
    built.model.minimize(built.objective, args.time_limit)?;
    let report = build_report(&instance, &built)?;
    built.model.close()?;

    info!(
        component = "cli",
        operation = "solve",
        status = report.status.as_str(),
        instance = %args.instance.display(),
        "Solve finished"
    );
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Pretty => print!("{}", render_pretty(&report)),
    }
    Ok(())
}

fn config_from_args(args: &SolveArgs) -> SolverConfig {
    let mut config = SolverConfig::for_method(args.method);
    if let Some(nodes) = args.node_limit {
        config = config.with_node_limit(nodes);
    }
    if let Some(rounds) = args.max_iterations {
        config = config.with_max_decomposition_iterations(rounds);
    }
    config
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn build_report(
    instance: &Instance,
    built: &BuiltModel,
) -> Result<SolveReport, Box<dyn std::error::Error>> {
    let model = &built.model;
    let mut booleans = BTreeMap::new();
    for (name, &var) in instance.booleans.iter().zip(&built.booleans) {
        booleans.insert(name.clone(), model.bool_value(var)?);
    }
    let mut integers = BTreeMap::new();
    for (spec, &var) in instance.integers.iter().zip(&built.integers) {
        integers.insert(spec.name.clone(), model.int_value(var)?);
    }
    Ok(SolveReport {
        method: model.method().to_string(),
        status: model.status().as_str().to_string(),
        objective: finite(model.objective_value()),
        bound: finite(model.objective_bound()),
        run_time: model.run_time(),
        booleans,
        integers,
    })
}

fn render_pretty(report: &SolveReport) -> String {
    let mut out = String::new();
    let fmt_value = |value: Option<f64>| value.map_or("-".to_string(), |v| format!("{v}"));
    out.push_str(&format!("method     {}\n", report.method));
    out.push_str(&format!("status     {}\n", report.status));
    out.push_str(&format!("objective  {}\n", fmt_value(report.objective)));
    out.push_str(&format!("bound      {}\n", fmt_value(report.bound)));
    out.push_str(&format!("run time   {:.3}s\n", report.run_time));
    if report.booleans.is_empty() && report.integers.is_empty() {
        return out;
    }
    let width = report
        .booleans
        .keys()
        .chain(report.integers.keys())
        .map(String::len)
        .max()
        .unwrap_or(0);
    out.push('\n');
    for (name, value) in &report.booleans {
        let value = value.map_or("-".to_string(), |v| u8::from(v).to_string());
        out.push_str(&format!("{name:<width$}  {value}\n"));
    }
    for (name, value) in &report.integers {
        let value = value.map_or("-".to_string(), |v| v.to_string());
        out.push_str(&format!("{name:<width$}  {value}\n"));
    }
    out
}
