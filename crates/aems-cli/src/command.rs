//! Session command parsing
//!
//! A line is split into words the way a shell would for the simple cases:
//! whitespace separates, single and double quotes group, and a backslash
//! outside single quotes escapes the next character.

use std::path::PathBuf;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unterminated quote")]
    UnterminatedQuote,

    #[error("unknown command '{0}'. Type 'help' for the command list")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("nothing to encrypt")]
    EmptyText,
}

#[derive(Debug)]
pub enum Command {
    Empty,
    Help,
    Exit,
    Status,
    Close,
    CreateNew,
    CreateKey(SecretString),
    EncryptText(String),
    EncryptFile(PathBuf),
    DecryptText(String),
    DecryptFile(PathBuf),
}

const CREATE_USAGE: &str = "create --new | create --key <hex>";
const ENCRYPT_USAGE: &str = "encrypt -t <text...> | encrypt -f <path>";
const DECRYPT_USAGE: &str = "decrypt -t <token> | decrypt -f <path>";

pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('"'), '"') => quote = None,
            (Some('"') | None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let words = tokenize(line)?;
    let Some((name, args)) = words.split_first() else {
        return Ok(Command::Empty);
    };

    match name.to_ascii_lowercase().as_str() {
        "help" | "/help" => Ok(Command::Help),
        "exit" | "quit" => Ok(Command::Exit),
        "status" => Ok(Command::Status),
        "close" => Ok(Command::Close),
        "create" => match args {
            [flag] if flag == "--new" => Ok(Command::CreateNew),
            [flag, hex] if flag == "--key" => Ok(Command::CreateKey(SecretString::new(hex.clone()))),
            _ => Err(ParseError::Usage(CREATE_USAGE)),
        },
        "encrypt" => match args {
            [flag, rest @ ..] if flag == "-t" => {
                let text = rest.join(" ");
                if text.is_empty() {
                    Err(ParseError::EmptyText)
                } else {
                    Ok(Command::EncryptText(text))
                }
            }
            [flag, path] if flag == "-f" => Ok(Command::EncryptFile(PathBuf::from(path))),
            _ => Err(ParseError::Usage(ENCRYPT_USAGE)),
        },
        "decrypt" => match args {
            [flag, token] if flag == "-t" => Ok(Command::DecryptText(token.clone())),
            [flag, path] if flag == "-f" => Ok(Command::DecryptFile(PathBuf::from(path))),
            _ => Err(ParseError::Usage(DECRYPT_USAGE)),
        },
        _ => Err(ParseError::UnknownCommand(name.clone())),
    }
}
