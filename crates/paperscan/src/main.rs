use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paperscan_core::{PipelineConfig, ScorerKind};
use paperscan_local::input::{load_works, WorksFormat};
use paperscan_local::report::{SummaryBuilder, DEFAULT_TOP_HOSTS};
use paperscan_local::sink::{JsonlSink, RunArtifacts};
use paperscan_local::Pipeline;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "paperscan")]
#[command(
    about = "Download open-access papers and extract topic mentions (JSONL artifacts)",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a works file: acquire full text, match topics, write attempts/outcomes/mentions.
    Run(RunCmd),
    /// Summarize the artifacts of a previous run (json).
    Summarize(SummarizeCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct RunCmd {
    /// Works file: JSON array, JSON Lines, or an OpenAlex `/works` response page.
    #[arg(long, env = "PAPERSCAN_WORKS")]
    works: PathBuf,

    /// auto|json|jsonl|openalex
    #[arg(long, env = "PAPERSCAN_WORKS_FORMAT", default_value = "auto")]
    works_format: WorksFormat,

    /// Directory for attempts.jsonl, outcomes.jsonl and mentions.jsonl (truncated on start).
    #[arg(long, env = "PAPERSCAN_OUT_DIR", default_value = "paperscan-out")]
    out_dir: PathBuf,

    /// JSON `PipelineConfig`; flags below override its fields.
    #[arg(long, env = "PAPERSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Topic term (repeatable; env is comma-separated).
    #[arg(long = "topic", env = "PAPERSCAN_TOPICS", value_delimiter = ',')]
    topics: Vec<String>,

    /// Minimum similarity for a FuzzyStrong match, in [0, 1].
    #[arg(long, env = "PAPERSCAN_STRONG_THRESHOLD")]
    strong_threshold: Option<f64>,

    /// Minimum similarity for a FuzzyWeak match, in [0, 1].
    #[arg(long, env = "PAPERSCAN_WEAK_THRESHOLD")]
    weak_threshold: Option<f64>,

    #[arg(long, env = "PAPERSCAN_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[arg(long, env = "PAPERSCAN_MAX_BYTES")]
    max_bytes: Option<u64>,

    #[arg(long, env = "PAPERSCAN_MAX_URLS_PER_WORK")]
    max_urls_per_work: Option<usize>,

    /// Required document language (ISO 639-3, e.g. eng).
    #[arg(long, env = "PAPERSCAN_LANGUAGE")]
    language: Option<String>,

    /// Characters of context on each side of a match.
    #[arg(long, env = "PAPERSCAN_CONTEXT_CHARS")]
    context_chars: Option<usize>,

    /// Drop mentions whose context has fewer words (0 disables).
    #[arg(long, env = "PAPERSCAN_MIN_CONTEXT_WORDS")]
    min_context_words: Option<usize>,

    /// levenshtein|jaro-winkler
    #[arg(long, env = "PAPERSCAN_SCORER")]
    scorer: Option<ScorerKind>,

    /// Fall back to `pdftotext` when the built-in PDF extractor finds no text.
    #[arg(long, env = "PAPERSCAN_PDF_SHELLOUT", action = clap::ArgAction::Set)]
    pdf_shellout: Option<bool>,

    /// User-Agent to rotate through (repeatable; env is `|`-separated).
    #[arg(long = "user-agent", env = "PAPERSCAN_USER_AGENTS", value_delimiter = '|')]
    user_agents: Vec<String>,

    /// Only process the first N works.
    #[arg(long)]
    limit: Option<usize>,

    /// How many failing hosts to list in the summary.
    #[arg(long, default_value_t = DEFAULT_TOP_HOSTS)]
    top_hosts: usize,
}

#[derive(clap::Args, Debug)]
struct SummarizeCmd {
    #[arg(long, env = "PAPERSCAN_OUT_DIR", default_value = "paperscan-out")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_TOP_HOSTS)]
    top_hosts: usize,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing() {
    let filter = std::env::var("PAPERSCAN_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("paperscan=info,paperscan_local=info"));
    // stdout carries the JSON result.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
}

impl RunCmd {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut cfg = load_config(self.config.as_deref())?;
        let topics: Vec<String> = self
            .topics
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !topics.is_empty() {
            cfg.matching.topics = topics;
        }
        if let Some(v) = self.strong_threshold {
            cfg.matching.strong_threshold = v;
        }
        if let Some(v) = self.weak_threshold {
            cfg.matching.weak_threshold = v;
        }
        if let Some(v) = self.context_chars {
            cfg.matching.context_chars = v;
        }
        if let Some(v) = self.scorer {
            cfg.matching.scorer = v;
        }
        if let Some(v) = self.timeout_ms {
            cfg.fetch.timeout_ms = v;
        }
        if let Some(v) = self.max_bytes {
            cfg.fetch.max_bytes = v;
        }
        if self.max_urls_per_work.is_some() {
            cfg.fetch.max_urls_per_work = self.max_urls_per_work;
        }
        if !self.user_agents.is_empty() {
            cfg.fetch.user_agents = self.user_agents.clone();
        }
        if let Some(v) = &self.language {
            cfg.validation.required_language = v.trim().to_string();
        }
        if let Some(v) = self.pdf_shellout {
            cfg.validation.pdf_shellout = v;
        }
        if let Some(v) = self.min_context_words {
            cfg.filter.min_context_words = v;
        }
        Ok(cfg)
    }

    async fn execute(self) -> Result<()> {
        let cfg = self.pipeline_config()?;
        // Config errors surface here, before any input is read or output created.
        let pipeline = Pipeline::local(&cfg)?.with_top_hosts(self.top_hosts);

        let mut works = load_works(&self.works, self.works_format)?;
        if let Some(n) = self.limit {
            works.truncate(n);
        }
        tracing::info!(
            works = works.len(),
            topics = cfg.matching.topics.len(),
            out_dir = %self.out_dir.display(),
            "starting run"
        );

        let mut sink = JsonlSink::create(&self.out_dir)?;
        let summary = pipeline.run(works, &mut sink).await?;
        let v = serde_json::json!({
            "schema_version": 1,
            "kind": "run",
            "ok": true,
            "out_dir": self.out_dir.display().to_string(),
            "config": cfg,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        Ok(())
    }
}

impl SummarizeCmd {
    fn execute(self) -> Result<()> {
        let artifacts = RunArtifacts::load(&self.out_dir)?;
        let mut b = SummaryBuilder::new(self.top_hosts);
        for a in &artifacts.attempts {
            b.add_attempt(a);
        }
        for row in &artifacts.outcomes {
            b.add_outcome(&row.outcome, &row.mention_stats);
        }
        let v = serde_json::json!({
            "schema_version": 1,
            "kind": "summary",
            "ok": true,
            "out_dir": self.out_dir.display().to_string(),
            "mention_rows": artifacts.mentions.len(),
            "summary": b.finish(),
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Run(cmd) => cmd.execute().await?,
        Commands::Summarize(cmd) => cmd.execute()?,
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "paperscan",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("paperscan {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}
