use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sandpit::external::CommandInterpreter;
use sandpit::input::{language_from_path, read_source};
use sandpit::output::print_envelope;
use sandpit::{ExecutionRequest, Executor, SandboxConfig};

#[derive(Parser, Debug)]
#[command(name = "sandpit")]
#[command(about = "Run learner JavaScript against mocked host objects")]
struct Args {
    /// Source file, or `-` for stdin (default)
    input: Option<PathBuf>,

    /// Declared language (inferred from the file extension, else javascript)
    #[arg(long)]
    language: Option<String>,

    /// Wall-clock budget in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Largest accepted source, in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_source_bytes: usize,

    /// Deepest bracket/operator nesting accepted
    #[arg(long, default_value_t = 128)]
    max_nesting_depth: usize,

    /// External interpreter for a language, e.g. `python=python3 -`
    #[arg(long = "interpreter", value_name = "LANG=COMMAND")]
    interpreters: Vec<String>,

    /// Print the raw result envelope as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = SandboxConfig::default()
        .with_timeout(Duration::from_millis(args.timeout_ms))
        .with_max_source_bytes(args.max_source_bytes)
        .with_max_nesting_depth(args.max_nesting_depth);
    let timeout = config.timeout;

    let mut executor = Executor::new(config);
    for entry in &args.interpreters {
        let Some((language, command)) = entry.split_once('=') else {
            bail!("Invalid --interpreter value {:?}, expected LANG=COMMAND", entry);
        };
        let interpreter = CommandInterpreter::parse(command, timeout)
            .with_context(|| format!("Invalid interpreter for {}", language))?;
        executor = executor.with_interpreter(language, interpreter);
    }

    let language = args
        .language
        .clone()
        .or_else(|| {
            args.input
                .as_deref()
                .and_then(language_from_path)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "javascript".to_string());

    let source = read_source(args.input.as_deref())?;
    let envelope = executor
        .execute(ExecutionRequest::new(source, language.clone()))
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        print_envelope(&envelope, &language);
    }

    if !envelope.success {
        std::process::exit(1);
    }
    Ok(())
}
