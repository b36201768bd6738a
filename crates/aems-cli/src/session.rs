//! Interactive session
//!
//! Owns at most one open [`CipherEngine`]. Every command failure is printed
//! and the prompt comes back; only `exit`/`quit` or end of input end the loop.

use std::io::{self, BufRead, Write};
use std::path::Path;

use aems_crypto::{
    decrypt_file, decrypt_text, encrypt_file, encrypt_text, CipherEngine, CipherKind,
    CryptoError, EnvelopeFormat, FileReport, Key,
};
use crossterm::style::Stylize;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::command::{self, Command};

const PROMPT: &str = "aems> ";

const BANNER: &str = r"
    _    _____ __  __ ____
   / \  | ____|  \/  / ___|
  / _ \ |  _| | |\/| \___ \
 / ___ \| |___| |  | |___) |
/_/   \_\_____|_|  |_|____/
";

const HELP: &str = "\
Commands:
  create --new            generate a fresh key and open the engine
  create --key <hex>      open the engine with an existing 64-digit hex key
  encrypt -t <text...>    encrypt text, print a token
  encrypt -f <path>       encrypt a file line by line into <path>.aems
  decrypt -t <token>      decrypt a token
  decrypt -f <path>       decrypt a .aems file
  status                  show engine state and settings
  close                   close the engine and wipe the key schedule
  help                    show this list
  exit | quit             leave";

/// Whether the read loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Session {
    cipher: CipherKind,
    format: EnvelopeFormat,
    engine: Option<CipherEngine>,
}

impl Session {
    pub fn new(cipher: CipherKind, format: EnvelopeFormat) -> Self {
        Self {
            cipher,
            format,
            engine: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.engine.as_ref().is_some_and(CipherEngine::is_open)
    }

    /// Generate a key with the configured provider and open the engine with it
    pub fn generate_key(&mut self) -> aems_crypto::Result<Key> {
        let key = self.cipher.provider().generate_key()?;
        self.load_key(&key)?;
        Ok(key)
    }

    /// Replace the engine. The previous one is closed before the new one opens.
    pub fn load_key(&mut self, key: &Key) -> aems_crypto::Result<()> {
        if let Some(mut previous) = self.engine.take() {
            previous.close();
        }
        self.engine = Some(CipherEngine::open(self.cipher.provider(), key)?);
        info!(cipher = %self.cipher, "engine opened");
        Ok(())
    }

    /// Parse and load a hex key. On a malformed key the current engine is kept.
    pub fn load_hex_key(&mut self, hex: &SecretString) -> aems_crypto::Result<()> {
        let key = Key::from_hex(hex.expose_secret())?;
        self.load_key(&key)
    }

    pub fn close(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.close();
        }
    }

    pub fn encrypt_text(&mut self, text: &str) -> aems_crypto::Result<String> {
        let encoding = self.format.text_encoding();
        encrypt_text(self.engine()?, text, encoding)
    }

    pub fn decrypt_text(&mut self, token: &str) -> aems_crypto::Result<String> {
        let encoding = self.format.text_encoding();
        decrypt_text(self.engine()?, token, encoding)
    }

    pub fn encrypt_file(&mut self, path: &Path) -> aems_crypto::Result<FileReport> {
        let encoding = self.format.record_encoding();
        encrypt_file(self.engine()?, path, encoding)
    }

    pub fn decrypt_file(&mut self, path: &Path) -> aems_crypto::Result<FileReport> {
        let encoding = self.format.record_encoding();
        decrypt_file(self.engine()?, path, encoding)
    }

    fn engine(&mut self) -> aems_crypto::Result<&mut CipherEngine> {
        self.engine.as_mut().ok_or(CryptoError::NotReady)
    }

    // -----------------------------------------------------------------------
    // Read loop
    // -----------------------------------------------------------------------

    /// Read commands until `exit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> io::Result<()> {
        let mut line = String::new();
        loop {
            write!(out, "{}", PROMPT.green().bold())?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break;
            }

            let flow = match command::parse(&line) {
                Ok(command) => self.execute(command, out)?,
                Err(e) => {
                    report_error(out, &e)?;
                    Flow::Continue
                }
            };
            if flow == Flow::Exit {
                break;
            }
        }
        self.close();
        system(out, "Goodbye.")
    }

    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<Flow> {
        match command {
            Command::Empty => {}
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Exit => return Ok(Flow::Exit),
            Command::Status => self.print_status(out)?,
            Command::Close => {
                self.close();
                system(out, "Engine closed.")?;
            }
            Command::CreateNew => match self.generate_key() {
                Ok(key) => {
                    system(out, "New key generated. Keep it safe, it is not stored anywhere:")?;
                    writeln!(out, "{}", key.to_hex().as_str().yellow())?;
                }
                Err(e) => report_crypto(out, &e)?,
            },
            Command::CreateKey(hex) => match self.load_hex_key(&hex) {
                Ok(()) => system(out, "Key loaded.")?,
                Err(e) => report_crypto(out, &e)?,
            },
            Command::EncryptText(text) => {
                let text = Zeroizing::new(text);
                match self.encrypt_text(&text) {
                    Ok(token) => labelled(out, "[Encrypted]:", &token)?,
                    Err(e) => report_crypto(out, &e)?,
                }
            }
            Command::DecryptText(token) => match self.decrypt_text(&token) {
                Ok(text) => {
                    let text = Zeroizing::new(text);
                    labelled(out, "[Decrypted]:", &text)?;
                }
                Err(e @ CryptoError::NotReady) => report_crypto(out, &e)?,
                Err(e) => {
                    debug!(error = %e, "text decryption failed");
                    report_error(out, &format!("decryption failed ({e}). Check the token and key"))?;
                }
            },
            Command::EncryptFile(path) | Command::DecryptFile(path) if !path.is_file() => {
                report_error(out, &format!("file not found: {}", path.display()))?;
            }
            Command::EncryptFile(path) => match self.encrypt_file(&path) {
                Ok(report) => system(
                    out,
                    &format!(
                        "Encrypted {} line(s) into {} ({} line(s) skipped).",
                        report.records,
                        report.output.display(),
                        report.skipped
                    ),
                )?,
                Err(e) => report_crypto(out, &e)?,
            },
            Command::DecryptFile(path) => match self.decrypt_file(&path) {
                Ok(report) => {
                    system(
                        out,
                        &format!(
                            "Decrypted {} line(s) into {}.",
                            report.records,
                            report.output.display()
                        ),
                    )?;
                    if report.skipped > 0 {
                        report_error(
                            out,
                            &format!("{} record(s) could not be decrypted and were skipped", report.skipped),
                        )?;
                    }
                }
                Err(e) => report_crypto(out, &e)?,
            },
        }
        Ok(Flow::Continue)
    }

    fn print_status<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let state = if self.is_open() {
            "open".green()
        } else {
            "closed".red()
        };
        writeln!(out, "  engine:   {state}")?;
        writeln!(out, "  cipher:   {}", self.cipher)?;
        writeln!(out, "  envelope: {}", self.format)
    }
}

pub fn print_banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", BANNER.magenta().bold())?;
    writeln!(out, "Symmetric text and file encryption. Type 'help' for commands.")?;
    writeln!(out)
}

fn system<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "[System]:".cyan(), message)
}

fn labelled<W: Write>(out: &mut W, label: &str, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", label.blue().bold(), message)
}

fn report_error<W: Write>(out: &mut W, error: &dyn std::fmt::Display) -> io::Result<()> {
    writeln!(out, "{} {}", "[Error]:".red().bold(), error)
}

fn report_crypto<W: Write>(out: &mut W, error: &CryptoError) -> io::Result<()> {
    match error {
        CryptoError::NotReady => report_error(
            out,
            &format!("{error}. Run 'create --new' or 'create --key <hex>' first"),
        ),
        _ => report_error(out, error),
    }
}
