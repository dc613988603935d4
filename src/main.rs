//! CLI entry point for `attfetch`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use attfetch::config::{self, FileConfig, Settings};
use attfetch::pipeline::{self, CancelToken, MAX_WORKERS};
use attfetch::session::TlsSessionFactory;

const DEFAULT_PORT: u16 = 993;
const DEFAULT_WORKERS: usize = 4;

/// Download and save attachments from an IMAP mailbox.
#[derive(Debug, Parser)]
#[command(name = "attfetch", version, about)]
struct Cli {
    /// IMAP server name
    #[arg(long)]
    server: Option<String>,

    /// IMAP port (default 993, IMAP over SSL)
    #[arg(long)]
    port: Option<u16>,

    /// Login for the account
    #[arg(long)]
    login: Option<String>,

    /// Password for the account (prompted when omitted)
    #[arg(long)]
    password: Option<String>,

    /// Remote mailbox to pull attachments from
    #[arg(long)]
    mbox: Option<String>,

    /// Local directory for storing attachments
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Worker sessions to run in parallel
    #[arg(long)]
    workers: Option<usize>,

    /// How many messages to process, newest first (default: all of them)
    #[arg(long, value_name = "COUNT")]
    n: Option<usize>,

    /// Delete each message after its attachments are saved
    #[arg(long)]
    delete: bool,

    /// Skip attachments embedded inline in the message body
    #[arg(long)]
    no_inline: bool,

    /// Print the resolved options and exit
    #[arg(long)]
    dump: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let file = config::load_file_config();
    let settings = resolve(&cli, file)?;

    if cli.dump {
        print_dump(&settings);
        return Ok(());
    }

    let cancel = CancelToken::new();
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, cancel.flag())
            .context("cannot install signal handler")?;
    }

    let factory = Arc::new(TlsSessionFactory::new(
        &settings.server,
        settings.port,
        &settings.login,
        &settings.password,
    ));
    let settings = Arc::new(settings);

    println!("- Connecting to {}...", settings.server);
    pipeline::run(&settings, &factory, &cancel)?;

    Ok(())
}

/// Merge CLI flags over file defaults and validate the result.
fn resolve(cli: &Cli, file: FileConfig) -> anyhow::Result<Settings> {
    let server = cli
        .server
        .clone()
        .or(file.account.server)
        .context("--server is required (flag or config file)")?;
    let port = cli.port.or(file.account.port).unwrap_or(DEFAULT_PORT);
    let login = cli
        .login
        .clone()
        .or(file.account.login)
        .context("--login is required (flag or config file)")?;
    let mailbox = cli
        .mbox
        .clone()
        .or(file.account.mailbox)
        .unwrap_or_else(|| "INBOX".to_string());

    let dir = cli
        .dir
        .clone()
        .or(file.download.dir)
        .context("--dir is required (flag or config file)")?;
    anyhow::ensure!(dir.is_dir(), "No such directory: {}", dir.display());

    let workers = cli
        .workers
        .or(file.download.workers)
        .unwrap_or(DEFAULT_WORKERS);
    anyhow::ensure!(
        (1..=MAX_WORKERS).contains(&workers),
        "--workers must be between 1 and {MAX_WORKERS}"
    );

    let skip_inline = cli.no_inline || file.download.skip_inline.unwrap_or(false);

    // Prompting is skipped for --dump so the options can be inspected
    // without touching the terminal or the network.
    let password = match (&cli.password, cli.dump) {
        (Some(p), _) => p.clone(),
        (None, true) => String::new(),
        (None, false) => {
            rpassword::prompt_password("Password: ").context("cannot read password")?
        }
    };

    Ok(Settings {
        server,
        port,
        login,
        password,
        mailbox,
        dir,
        workers,
        max_messages: cli.n,
        delete: cli.delete,
        skip_inline,
    })
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(verbose: u8) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "attfetch.log");
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

/// Print the resolved options, password excluded.
fn print_dump(settings: &Settings) {
    println!();
    println!("Options dump:");
    println!();
    println!("  {:<12} = {}", "server", settings.server);
    println!("  {:<12} = {}", "port", settings.port);
    println!("  {:<12} = {}", "login", settings.login);
    println!("  {:<12} = {}", "mbox", settings.mailbox);
    println!("  {:<12} = {}", "dir", settings.dir.display());
    println!("  {:<12} = {}", "workers", settings.workers);
    match settings.max_messages {
        Some(n) => println!("  {:<12} = {}", "n", n),
        None => println!("  {:<12} = all", "n"),
    }
    println!("  {:<12} = {}", "delete", settings.delete);
    println!("  {:<12} = {}", "no-inline", settings.skip_inline);
    println!();
}
