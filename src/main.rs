//! CLI entry point for `mailtidy`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::warn;

use mailtidy::actions::console::{TerminalConsole, UnattendedConsole, UnattendedMode};
use mailtidy::actions::{ActionsSink, Console};
use mailtidy::browser::SystemBrowser;
use mailtidy::calendar::google::GoogleCalendar;
use mailtidy::calendar::{CalendarImporter, DisabledCalendar};
use mailtidy::classify::ClassificationChain;
use mailtidy::config::{self, Config, Credentials};
use mailtidy::dedup::{DedupStore, STORE_FILE_NAME};
use mailtidy::flush::flush;
use mailtidy::scan::Scanner;
use mailtidy::session::imap::ImapSession;
use mailtidy::session::MailSession;

#[derive(Parser)]
#[command(
    name = "mailtidy",
    version,
    about = "Tidy an IMAP mailbox: drop stale notices, import invites, answer RSVPs"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Account user name
    #[arg(long)]
    user: Option<String>,

    /// Account password
    #[arg(long)]
    pass: Option<String>,

    /// IMAP server as host[:port] (port defaults to 993)
    #[arg(long)]
    server: Option<String>,

    /// Mailbox to scan
    #[arg(long)]
    mailbox: Option<String>,

    /// Examine at most this many messages
    #[arg(long, value_name = "N")]
    max_messages: Option<u32>,

    /// Answer yes to every yes/no question; still ask about RSVPs
    #[arg(short, long, conflicts_with = "skip")]
    force: bool,

    /// Ask nothing: answer yes to yes/no questions and ignore RSVPs
    #[arg(short, long)]
    skip: bool,

    /// JSON file with "User", "Pass" and "Serv"; its values win over flags
    #[arg(long, value_name = "FILE", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Do not remember answered invitations between runs
    #[arg(long)]
    no_dedup: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => return cmd_completions(shell),
        Some(Commands::Manpage) => return cmd_manpage(),
        None => {}
    }

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    cmd_tidy(&cli, config)
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = log_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let log_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "mailtidy.log".into());
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<ExitCode> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailtidy", &mut std::io::stdout());
    Ok(ExitCode::SUCCESS)
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<ExitCode> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(ExitCode::SUCCESS)
}

/// Scan the mailbox, then apply what the operator agreed to.
fn cmd_tidy(cli: &Cli, mut config: Config) -> anyhow::Result<ExitCode> {
    // Config file < flags < credentials file.
    let account = &mut config.account;
    if cli.user.is_some() {
        account.user = cli.user.clone();
    }
    if cli.pass.is_some() {
        account.pass = cli.pass.clone();
    }
    if cli.server.is_some() {
        account.server = cli.server.clone();
    }
    if let Some(ref mailbox) = cli.mailbox {
        account.mailbox = mailbox.clone();
    }
    if let Some(max) = cli.max_messages {
        config.scan.max_messages = max;
    }
    if let Some(creds) = Credentials::load(&cli.credentials)? {
        creds.apply_to(&mut config.account);
    }

    let (Some(user), Some(pass), Some(server)) = (
        config.account.user.clone(),
        config.account.pass.clone(),
        config.account.server.clone(),
    ) else {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                format!(
                    "user, password and server are required.\n\
                     Pass --user, --pass and --server, set them under [account] in the \
                     config file, or provide {} with \"User\", \"Pass\" and \"Serv\".",
                    cli.credentials.display()
                ),
            )
            .exit();
    };

    let mut sink = ActionsSink::new(console(cli), calendar(&config), Box::new(SystemBrowser));
    if config.scan.dedup && !cli.no_dedup {
        let dir = config::cache_dir(&config);
        std::fs::create_dir_all(&dir)?;
        sink = sink.with_dedup(DedupStore::open(dir.join(STORE_FILE_NAME))?);
    }

    let mut session = ImapSession::connect(&server, &user, &pass)?;
    let scanner = Scanner::new(ClassificationChain::default(), config.scan_options());

    let scan = match scanner.run(&mut session, &mut sink) {
        Ok(scan) => scan,
        Err(e) => {
            if let Err(logout) = session.logout() {
                warn!(error = %logout, "Logout failed");
            }
            return Err(e.into());
        }
    };

    let report = flush(&mut session, &mut sink);
    if let Err(e) = session.logout() {
        warn!(error = %e, "Logout failed");
    }

    println!();
    println!("  {:<22} {}", "Messages examined", scan.classified);
    if !scan.skipped.is_empty() {
        println!("  {:<22} {}", "Messages skipped", scan.skipped.len());
    }
    println!("  {:<22} {}", "Messages deleted", report.deleted.len());
    println!("  {:<22} {}", "Links opened", report.opened.len());
    for failure in &scan.failures {
        eprintln!(
            "  message {} ({}): {}",
            failure.sequence,
            failure.classifier.name(),
            failure.error
        );
    }
    for failure in &report.failures {
        eprintln!("  {failure}");
    }
    println!();

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn console(cli: &Cli) -> Box<dyn Console> {
    let terminal = TerminalConsole::stdio();
    if cli.skip {
        Box::new(UnattendedConsole::new(UnattendedMode::Skip, terminal))
    } else if cli.force {
        Box::new(UnattendedConsole::new(UnattendedMode::Force, terminal))
    } else {
        Box::new(terminal)
    }
}

fn calendar(config: &Config) -> Box<dyn CalendarImporter> {
    let calendar = &config.calendar;
    if calendar.credentials_file.exists() {
        Box::new(GoogleCalendar::new(
            calendar.credentials_file.clone(),
            config::token_file_path(config),
            calendar.calendar_id.clone(),
        ))
    } else {
        Box::new(DisabledCalendar)
    }
}
