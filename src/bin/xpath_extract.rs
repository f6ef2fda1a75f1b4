//! Command-line front-end: pick a saved page, infer selectors, extract.
//!
//! JSON goes to stdout, logs to stderr (`RUST_LOG`, default `info`).
//! A FILE argument of `-` reads the page from stdin.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rs_xpath_extract::{
    evaluate, list_candidates, reduce, ApiCredential, Options, Pipeline, RawDocument,
    SelectorInference, SelectorSet,
};

#[derive(Parser, Debug)]
#[command(name = "xpath_extract", version, about = "LLM-assisted title/date/content extraction from news HTML")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Maximum characters of extracted content (overrides the config)
    #[arg(long, global = true)]
    content_limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List candidate .html documents
    List {
        /// Directory to scan (defaults to the configured html_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the reduced document sent to the model
    Reduce { file: PathBuf },
    /// Print the first characters of the raw document
    Preview { file: PathBuf },
    /// Infer selectors and print them as JSON
    Infer { file: PathBuf },
    /// Infer selectors, apply them, print both as JSON
    Extract { file: PathBuf },
    /// Apply given selectors without calling the model
    Evaluate {
        file: PathBuf,
        #[command(flatten)]
        selectors: SelectorArgs,
    },
}

#[derive(Args, Debug)]
struct SelectorArgs {
    /// JSON file holding a selector set (e.g. saved `infer` output)
    #[arg(long, conflicts_with_all = ["title", "date", "content"])]
    selectors: Option<PathBuf>,

    #[arg(long, requires_all = ["date", "content"])]
    title: Option<String>,

    #[arg(long)]
    date: Option<String>,

    #[arg(long)]
    content: Option<String>,

    #[arg(long, default_value = "unspecified")]
    date_format: String,
}

impl SelectorArgs {
    fn resolve(&self) -> Result<SelectorSet> {
        if let Some(path) = &self.selectors {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            // `extract` output nests the set under "selectors"
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            let set = value.get("selectors").cloned().unwrap_or(value);
            return serde_json::from_value(set)
                .with_context(|| format!("invalid selector set in {}", path.display()));
        }
        match (&self.title, &self.date, &self.content) {
            (Some(title), Some(date), Some(content)) => {
                Ok(SelectorSet::new(title, date, &self.date_format, content)?)
            }
            _ => bail!("pass --selectors FILE or all of --title, --date and --content"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut options = match &cli.config {
        Some(path) => Options::from_file(path)?,
        None => Options::default(),
    };
    if let Some(limit) = cli.content_limit {
        options.content_limit = limit;
    }
    options.validate()?;

    match &cli.command {
        Command::List { dir } => {
            let dir = dir.as_deref().unwrap_or(&options.html_dir);
            for path in list_candidates(dir)? {
                println!("{}", path.display());
            }
        }
        Command::Reduce { file } => {
            println!("{}", reduce(&load(file)?)?);
        }
        Command::Preview { file } => {
            println!("{}", load(file)?.preview());
        }
        Command::Infer { file } => {
            // Credential first: no work happens without one.
            let key = credential(&cli)?;
            let raw = load(file)?;
            let reduced = rs_xpath_extract::reducer::reduce_with_limit(&raw, options.max_reduced_chars)?;
            let inference = SelectorInference::from_options(&options)?;
            let selectors = inference.infer(&reduced, &key);
            inference.flush_traces();
            print_json(&selectors?)?;
        }
        Command::Extract { file } => {
            let key = credential(&cli)?;
            let raw = load(file)?;
            let pipeline = Pipeline::from_options(&options)?;
            let output = pipeline.run(&raw, &key);
            pipeline.flush_traces();
            print_json(&output?)?;
        }
        Command::Evaluate { file, selectors } => {
            let selectors = selectors.resolve()?;
            let raw = load(file)?;
            print_json(&evaluate(&raw, &selectors, options.content_limit))?;
        }
    }
    Ok(())
}

fn credential(cli: &Cli) -> Result<ApiCredential> {
    ApiCredential::from_optional(cli.api_key.as_deref())
        .context("an API key is required: pass --api-key or set OPENAI_API_KEY")
}

fn load(path: &Path) -> Result<RawDocument> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("reading document from stdin")?;
        return Ok(RawDocument::from_bytes(&bytes));
    }
    RawDocument::load(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
