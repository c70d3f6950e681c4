use clap::{Args, Parser, Subcommand};
use hcleval::value::json::{from_json, to_json};
use hcleval::{EngineConfig, Error, InternalResult, Provider, Value};
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to an engine config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an expression
    Expr(Input),
    /// Evaluate a template
    Template(Input),
    /// Evaluate the attributes of a configuration body
    Attrs(Input),
    /// Decode a configuration body with a spec file
    Config {
        #[command(flatten)]
        input: Input,

        /// Spec file describing how to decode the configuration
        #[arg(short, long)]
        spec: PathBuf,
    },
}

#[derive(Args)]
struct Input {
    /// Source file; standard input when omitted
    file: Option<PathBuf>,

    /// JSON file holding an object of variables
    #[arg(long)]
    vars: Option<PathBuf>,
}

impl Input {
    fn source(&self) -> InternalResult<String> {
        match &self.file {
            Some(path) => Ok(std::fs::read_to_string(path)?),
            None => {
                let mut src = String::new();
                std::io::stdin().read_to_string(&mut src)?;
                Ok(src)
            }
        }
    }

    fn variables(&self) -> InternalResult<Value> {
        let Some(path) = &self.vars else {
            return Ok(Value::empty_object());
        };
        let content = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        from_json(&json)
    }
}

fn run(cli: &Cli) -> InternalResult<serde_json::Value> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    debug!("config: {:?}", config);
    let provider = Provider::new(config);

    let (name, args) = match &cli.command {
        Command::Expr(input) => ("evalexpr", vec![Value::string(input.source()?), input.variables()?]),
        Command::Template(input) => (
            "evaltemplate",
            vec![Value::string(input.source()?), input.variables()?],
        ),
        Command::Attrs(input) => (
            "evalconfigattrs",
            vec![Value::string(input.source()?), input.variables()?],
        ),
        Command::Config { input, spec } => (
            "evalconfig",
            vec![
                Value::string(input.source()?),
                Value::string(spec.display().to_string()),
                input.variables()?,
            ],
        ),
    };

    debug!("calling {}", name);
    let result = provider.call(name, &args)?;
    if !result.is_wholly_known() {
        return Err(Error::UnknownValue(
            "the result depends on values that are not known".to_string(),
        ));
    }
    to_json(&result)
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(json) => match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
