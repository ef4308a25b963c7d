//! CLI entry point for `mailingest`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use mailingest::catalog::JsonlCatalog;
use mailingest::config::{self, Config};
use mailingest::model::mail::ParsedEmail;
use mailingest::parser::MessageParser;
use mailingest::pipeline::Ingestor;
use mailingest::store::fs::FsObjectStore;

#[derive(Parser)]
#[command(name = "mailingest", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Object store root (overrides the config file)
    #[arg(long, global = true, env = "MAILINGEST_STORE_DIR", value_name = "DIR")]
    store: Option<PathBuf>,

    /// Catalog directory (overrides the config file)
    #[arg(long, global = true, env = "MAILINGEST_CATALOG_DIR", value_name = "DIR")]
    catalog: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a local .eml file and show what would be extracted
    Parse {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Process one message from the object store
    Process {
        /// Object key, e.g. emails/user@example.com/Inbox/123.eml
        key: String,
        #[arg(long)]
        json: bool,
    },
    /// Process every .eml message under a key prefix
    Batch {
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Report that the tool runs and whether storage is reachable
    Health,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config();
    if let Some(dir) = cli.store.clone() {
        config.storage.store_dir = Some(dir);
    }
    if let Some(dir) = cli.catalog.clone() {
        config.storage.catalog_dir = Some(dir);
    }

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Parse { path, json } => cmd_parse(&path, json, &config),
        Commands::Process { key, json } => cmd_process(&key, json, &config),
        Commands::Batch { prefix } => cmd_batch(&prefix, &config),
        Commands::Health => cmd_health(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_target = log_path.parent().zip(log_path.file_name());
    if let Some((log_dir, log_file)) =
        log_target.filter(|(dir, _)| std::fs::create_dir_all(dir).is_ok())
    {
        let file_appender = tracing_appender::rolling::never(log_dir, log_file);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn open_ingestor(config: &Config) -> anyhow::Result<Ingestor<FsObjectStore, JsonlCatalog>> {
    let store = FsObjectStore::new(config::store_dir(config));
    let catalog = JsonlCatalog::open(config::catalog_dir(config))?;
    let parser = MessageParser::new(&config.parser)?;
    Ok(Ingestor::new(
        store,
        catalog,
        parser,
        config.performance.max_message_size,
    ))
}

/// Parse a local file and print the extracted data.
fn cmd_parse(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let raw = std::fs::read(path)?;
    let parser = MessageParser::new(&config.parser)?;
    let parsed = parser.parse(&raw);

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        print_parsed_table(path, raw.len() as u64, &parsed);
    }
    Ok(())
}

/// Process one stored message and print the outcome.
fn cmd_process(key: &str, json: bool, config: &Config) -> anyhow::Result<()> {
    let mut ingestor = open_ingestor(config)?;
    let outcome = ingestor.process(key)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!();
        println!("  {:<12} {}", "Email", outcome.email_path);
        println!("  {:<12} {}", "Id", outcome.email_id);
        println!("  {:<12} {}", "Attachments", outcome.attachment_count);
        println!();
    }
    Ok(())
}

/// Process every message under a prefix, continuing past failures.
fn cmd_batch(prefix: &str, config: &Config) -> anyhow::Result<()> {
    let mut ingestor = open_ingestor(config)?;
    let keys = ingestor.store().list_messages(prefix)?;

    if keys.is_empty() {
        println!("  No messages found under '{prefix}'.");
        return Ok(());
    }

    let pb = ProgressBar::new(keys.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Processing [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut processed = 0usize;
    let mut attachments = 0usize;
    let mut failed = 0usize;

    for key in &keys {
        match ingestor.process(key) {
            Ok(outcome) => {
                processed += 1;
                attachments += outcome.attachment_count;
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(key = %key, error = %e, "Failed to process email");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!();
    println!("  {:<20} {}", "Processed", processed);
    println!("  {:<20} {}", "Attachments", attachments);
    println!("  {:<20} {}", "Failed", failed);
    println!("  {:<20} {:.2?}", "Elapsed", start.elapsed());
    println!();

    Ok(())
}

/// Always succeeds when the binary runs; reports storage locations.
fn cmd_health(config: &Config) -> anyhow::Result<()> {
    let store = config::store_dir(config);
    let catalog = config::catalog_dir(config);

    println!("OK");
    println!("  {:<10} {} ({})", "Store", store.display(), presence(&store));
    println!("  {:<10} {} ({})", "Catalog", catalog.display(), presence(&catalog));
    Ok(())
}

fn presence(dir: &Path) -> &'static str {
    if dir.is_dir() {
        "present"
    } else {
        "missing"
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailingest", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print parse results as a human-readable table.
fn print_parsed_table(path: &Path, size: u64, parsed: &ParsedEmail) {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!();
    println!("  {:<12} {}", "File", path.display());
    println!("  {:<12} {}", "Size", format_size(size, BINARY));
    println!("  {:<12} {}", "CC", show(&parsed.headers.cc));
    println!("  {:<12} {}", "BCC", show(&parsed.headers.bcc));
    println!("  {:<12} {}", "Reply-To", show(&parsed.headers.reply_to));
    for (name, value) in &parsed.headers.extra {
        let name: String = name.chars().take(12).collect();
        println!("  {name:<12} {value}");
    }
    println!("  {:<12} {}", "Preview", parsed.preview_text);
    println!();

    println!("  {} attachment(s)", parsed.attachments.len());
    if parsed.attachments.is_empty() {
        println!();
        return;
    }

    println!();
    println!("  {:<4} {:<40} {:<30} {:>10}", "#", "Filename", "Type", "Size");
    println!("  {}", "-".repeat(87));
    for (i, att) in parsed.attachments.iter().enumerate() {
        let name: String = att.filename().chars().take(39).collect();
        let ctype: String = att.content_type().chars().take(29).collect();
        println!(
            "  {:<4} {:<40} {:<30} {:>10}",
            i + 1,
            name,
            ctype,
            format_size(att.size(), BINARY)
        );
    }
    println!();
}
