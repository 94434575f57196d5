use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser as ClapParser, ValueEnum};
use ndjson_select::EngineKind;
use ndjson_select::cli::{self, CheckOptions, CheckResult, CliError};

#[derive(ClapParser)]
#[command(name = "ndsel")]
#[command(about = "Run a SELECT query over newline-delimited JSON")]
#[command(version)]
struct Cli {
    /// The query, e.g. "SELECT s.name FROM S3Object s WHERE s.age > 30"
    query: String,

    /// NDJSON input file (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Evaluation engine
    #[arg(short, long, value_enum, default_value_t = EngineArg::Indexed)]
    engine: EngineArg,

    /// Only validate the query, don't execute
    #[arg(long)]
    syntax_only: bool,

    /// Print the canonical query and its slot map
    #[arg(long)]
    explain: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineArg {
    /// Parse every record in full
    Naive,
    /// Capture referenced paths, parse on demand
    Indexed,
    /// Capture referenced paths, parse while streaming
    Eager,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Naive => EngineKind::Naive,
            EngineArg::Indexed => EngineKind::Indexed,
            EngineArg::Eager => EngineKind::Eager,
        }
    }
}

fn main() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .try_init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_input(path: Option<PathBuf>) -> Result<Option<Vec<u8>>, CliError> {
    match path {
        Some(path) => Ok(Some(std::fs::read(path)?)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let needs_input = !(cli.syntax_only || cli.explain);
    let options = CheckOptions {
        query: cli.query,
        input: if needs_input { read_input(cli.input)? } else { None },
        engine: cli.engine.into(),
        syntax_only: cli.syntax_only,
        explain: cli.explain,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Explained(text) => print!("{}", text),
        CheckResult::Success(output) => io::stdout().lock().write_all(&output)?,
    }
    Ok(())
}
