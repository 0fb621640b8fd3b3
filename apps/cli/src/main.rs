//! Command-line runner for DMN decision models (spec.md §6.4).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use dmn_feel::value::{Type, Value};
use dmn_model::Definition;

#[derive(Parser)]
#[command(name = "dmn", about = "Evaluate DMN decision models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a definition once, or batch-evaluate it over a CSV of input rows.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to a DMN `<definitions>` XML file.
    definition_file: PathBuf,

    /// Decision to evaluate. Required in `--csv` mode; if omitted in single-shot mode,
    /// every root decision is evaluated.
    #[arg(long)]
    decision: Option<String>,

    /// `key=value` input binding; may be repeated.
    #[arg(long = "input", value_name = "KEY=VALUE")]
    inputs: Vec<String>,

    /// Evaluate one row per CSV record instead of a single pass.
    #[arg(long, value_name = "INPUTS.csv")]
    csv: Option<PathBuf>,

    /// Where to write the CSV results (defaults to stdout).
    #[arg(long)]
    out: Option<PathBuf>,
}

const EXIT_SUCCESS: u8 = 0;
const EXIT_CSV_ROW_FAILURE: u8 = 1;
const EXIT_LOAD_ERROR: u8 = 2;
const EXIT_EVAL_ERROR: u8 = 3;
const EXIT_USAGE_ERROR: u8 = 64;

enum Failure {
    Usage(String),
    Load(anyhow::Error),
    Eval(anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Usage(_) => EXIT_USAGE_ERROR,
            Failure::Load(_) => EXIT_LOAD_ERROR,
            Failure::Eval(_) => EXIT_EVAL_ERROR,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Usage(message) => write!(f, "{message}"),
            Failure::Load(e) | Failure::Eval(e) => write!(f, "{e:#}"),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let Command::Run(args) = cli.command;

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(failure) => {
            tracing::error!("{failure}");
            eprintln!("error: {failure}");
            ExitCode::from(failure.exit_code())
        }
    }
}

fn run(args: &RunArgs) -> Result<u8, Failure> {
    let xml = fs::read_to_string(&args.definition_file)
        .with_context(|| format!("reading {}", args.definition_file.display()))
        .map_err(Failure::Load)?;
    let definition = dmn_xml::read_definitions(&xml)
        .map_err(|e| Failure::Load(anyhow::anyhow!(e)))?;

    if let Some(csv_path) = &args.csv {
        let decision = args
            .decision
            .as_deref()
            .ok_or_else(|| Failure::Usage("--csv requires --decision NAME".to_string()))?;
        return run_csv(&definition, decision, csv_path, args.out.as_deref());
    }

    let mut bindings = Vec::with_capacity(args.inputs.len());
    for raw in &args.inputs {
        let (key, raw_value) = raw
            .split_once('=')
            .ok_or_else(|| Failure::Usage(format!("--input '{raw}' is not KEY=VALUE")))?;
        let value = coerce_input(&definition, key, raw_value)
            .map_err(|e| Failure::Usage(e.to_string()))?;
        bindings.push((key.to_string(), value));
    }

    let result = match &args.decision {
        Some(name) => dmn_model::evaluate(&definition, name, bindings),
        None => dmn_model::evaluate_all_roots(&definition, bindings),
    }
    .map_err(|e| Failure::Eval(anyhow::anyhow!(e)))?;

    for (name, value) in &result.outputs {
        println!("{name} = {value}");
    }
    println!();
    print!("{}", dmn_model::render(&result.trace));

    Ok(EXIT_SUCCESS)
}

fn run_csv(
    definition: &Definition,
    decision: &str,
    csv_path: &Path,
    out_path: Option<&Path>,
) -> Result<u8, Failure> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("reading {}", csv_path.display()))
        .map_err(Failure::Load)?;
    let headers = reader
        .headers()
        .map_err(|e| Failure::Load(anyhow::anyhow!(e)))?
        .clone();

    let mut out_header: Vec<String> = headers.iter().map(str::to_string).collect();
    out_header.extend(["status".to_string(), "outputs".to_string(), "error".to_string()]);

    let sink: Box<dyn std::io::Write> = match out_path {
        Some(path) => Box::new(
            fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))
                .map_err(Failure::Load)?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record(&out_header)
        .map_err(|e| Failure::Eval(anyhow::anyhow!(e)))?;

    let mut all_succeeded = true;
    for record in reader.records() {
        let record = record.map_err(|e| Failure::Eval(anyhow::anyhow!(e)))?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();

        let mut bindings = Vec::with_capacity(headers.len());
        let mut row_error = None;
        for (key, raw_value) in headers.iter().zip(record.iter()) {
            match coerce_input(definition, key, raw_value) {
                Ok(value) => bindings.push((key.to_string(), value)),
                Err(e) => {
                    row_error = Some(e.to_string());
                    break;
                }
            }
        }

        match row_error {
            Some(message) => {
                all_succeeded = false;
                row.extend(["error".to_string(), String::new(), message]);
            }
            None => match dmn_model::evaluate(definition, decision, bindings) {
                Ok(result) => {
                    let outputs = result
                        .outputs
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(";");
                    row.extend(["ok".to_string(), outputs, String::new()]);
                }
                Err(e) => {
                    all_succeeded = false;
                    row.extend(["error".to_string(), String::new(), e.to_string()]);
                }
            },
        }

        writer
            .write_record(&row)
            .map_err(|e| Failure::Eval(anyhow::anyhow!(e)))?;
    }
    writer.flush().map_err(|e| Failure::Eval(anyhow::anyhow!(e)))?;

    Ok(if all_succeeded {
        EXIT_SUCCESS
    } else {
        EXIT_CSV_ROW_FAILURE
    })
}

fn coerce_input(definition: &Definition, name: &str, raw: &str) -> anyhow::Result<Value> {
    let type_ref = definition
        .input(name)
        .map(|v| &v.type_ref)
        .ok_or_else(|| anyhow::anyhow!("unknown input '{name}'"))?;
    match type_ref {
        Type::Number => raw
            .parse::<Decimal>()
            .map(Value::Number)
            .map_err(|e| anyhow::anyhow!("invalid number '{raw}': {e}")),
        Type::Boolean => match raw {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => anyhow::bail!("invalid boolean '{raw}'"),
        },
        Type::Date => dmn_feel::temporal::parse_date(raw).map_err(|e| anyhow::anyhow!(e)),
        Type::Time => dmn_feel::temporal::parse_time(raw).map_err(|e| anyhow::anyhow!(e)),
        Type::DateTime => dmn_feel::temporal::parse_date_time(raw).map_err(|e| anyhow::anyhow!(e)),
        Type::DayTimeDuration | Type::YearMonthDuration => {
            dmn_feel::temporal::try_parse_duration(raw)
                .ok_or_else(|| anyhow::anyhow!("invalid duration '{raw}'"))
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}
