//! AEMS CLI - symmetric text and file encryption
//!
//! Usage:
//!   aems                      - Start the interactive session
//!   aems keygen               - Print a fresh hex key
//!   aems encrypt --key <hex>  - Encrypt --text or --file
//!   aems decrypt --key <hex>  - Decrypt --text or --file

mod command;
mod config;
mod session;

use std::io::{self, Write};
use std::path::PathBuf;

use aems_crypto::{CipherKind, EnvelopeFormat, FileReport};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AemsConfig;
use crate::session::Session;

#[derive(Parser)]
#[command(name = "aems")]
#[command(author = "Tebee")]
#[command(version)]
#[command(about = "Symmetric text and file encryption", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.aems/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Block cipher: aes-256 or aems
    #[arg(long, global = true)]
    cipher: Option<CipherKind>,

    /// Envelope format: standard or hex
    #[arg(long, global = true)]
    format: Option<EnvelopeFormat>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive session
    Shell,

    /// Generate a key and print it as hex
    Keygen,

    /// Encrypt text or a file
    Encrypt(Operation),

    /// Decrypt a token or a .aems file
    Decrypt(Operation),
}

#[derive(Args)]
struct Operation {
    /// 64-digit hex key
    #[arg(long, env = "AEMS_KEY", hide_env_values = true)]
    key: String,

    #[command(flatten)]
    input: Input,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Input {
    /// Text (encrypt) or token (decrypt)
    #[arg(short, long)]
    text: Option<String>,

    /// File to process line by line
    #[arg(short, long)]
    file: Option<PathBuf>,
}

fn init_tracing(verbose: bool, fallback: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AemsConfig::load(cli.config.as_deref())?;
    if let Some(cipher) = cli.cipher {
        config.cipher = cipher;
    }
    if let Some(format) = cli.format {
        config.envelope = format;
    }
    init_tracing(cli.verbose, &config.log_level);

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let mut session = Session::new(config.cipher, config.envelope);
            let mut stdout = io::stdout().lock();
            if config.banner {
                session::print_banner(&mut stdout)?;
            }
            session.run(io::stdin().lock(), &mut stdout)?;
        }

        Commands::Keygen => {
            let key = config.cipher.provider().generate_key()?;
            println!("{}", key.to_hex().as_str());
        }

        Commands::Encrypt(op) => {
            let mut session = open_session(&config, op.key)?;
            match (op.input.text, op.input.file) {
                (Some(text), _) => println!("{}", session.encrypt_text(&text)?),
                (None, Some(path)) => {
                    let report = session
                        .encrypt_file(&path)
                        .with_context(|| format!("failed to encrypt {}", path.display()))?;
                    print_report(&report)?;
                }
                (None, None) => anyhow::bail!("one of --text or --file is required"),
            }
        }

        Commands::Decrypt(op) => {
            let mut session = open_session(&config, op.key)?;
            match (op.input.text, op.input.file) {
                (Some(token), _) => println!(
                    "{}",
                    session
                        .decrypt_text(&token)
                        .context("decryption failed, check the token and key")?
                ),
                (None, Some(path)) => {
                    let report = session
                        .decrypt_file(&path)
                        .with_context(|| format!("failed to decrypt {}", path.display()))?;
                    print_report(&report)?;
                    if report.skipped > 0 {
                        eprintln!("{} record(s) could not be decrypted", report.skipped);
                    }
                }
                (None, None) => anyhow::bail!("one of --text or --file is required"),
            }
        }
    }

    Ok(())
}

fn open_session(config: &AemsConfig, key: String) -> anyhow::Result<Session> {
    let key = SecretString::new(key);
    let mut session = Session::new(config.cipher, config.envelope);
    session.load_hex_key(&key).context("invalid key")?;
    Ok(session)
}

fn print_report(report: &FileReport) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", report.output.display())
}
