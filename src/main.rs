use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mimalloc::MiMalloc;
use rewrite::{Properties, RewriteConfig, RewriteSession, RuleSet, SessionStats};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const READ_CHUNK: usize = 64 * 1024;

#[derive(Parser)]
#[command(
    name = "retag",
    about = "Rewrite HTML tags by rule and export their content as properties",
    version
)]
struct Cli {
    /// Rule configuration (TOML).
    #[arg(short, long)]
    rules: PathBuf,

    /// Where to write the rewritten document (stdout when omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to write exported properties; `-` for stderr.
    #[arg(short, long)]
    properties: Option<String>,

    /// Property output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Input document; `-` reads stdin.
    #[arg(default_value = "-")]
    input: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = RewriteConfig::load(&cli.rules)
        .with_context(|| format!("loading rules from {}", cli.rules.display()))?;
    let rules = config.build_rule_set().context("building rule set")?;
    log::debug!("rule set: {rules:?}");

    let input: Box<dyn Read> = if cli.input == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(&cli.input).with_context(|| format!("opening {}", cli.input))?)
    };
    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let (properties, stats) = run(input, BufWriter::new(writer), &rules)?;
    log::info!("rewrite finished: {stats:?}");

    if let Some(target) = &cli.properties {
        write_properties(target, cli.format, &properties)?;
    }
    Ok(())
}

fn run(
    mut input: impl Read,
    writer: impl Write,
    rules: &RuleSet,
) -> Result<(Properties, SessionStats)> {
    let mut session = RewriteSession::new(rules, writer);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("reading input"),
        };
        session
            .push_bytes(&chunk[..read])
            .context("rewriting document")?;
    }
    let outcome = session.finish().context("finishing document")?;
    Ok((outcome.properties, outcome.stats))
}

fn write_properties(target: &str, format: Format, properties: &Properties) -> Result<()> {
    let mut out: Box<dyn Write> = if target == "-" {
        Box::new(io::stderr().lock())
    } else {
        let path = Path::new(target);
        Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ))
    };
    match format {
        Format::Text => {
            for (key, value) in properties.iter() {
                writeln!(out, "{key}={}", escape_value(value))?;
            }
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, properties).context("encoding properties")?;
            writeln!(out)?;
        }
    }
    out.flush().context("writing properties")?;
    Ok(())
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
