//! Line-oriented record streams
//!
//! Every non-blank source line becomes one independent record:
//! `armor(nonce || ciphertext) '\n'`. There is no header and no chaining between
//! records, so each one decodes on its own.
//!
//! Both directions are lazy iterators holding one line at a time, so file size
//! does not bound memory. Lines are read as raw bytes: a line that is not UTF-8
//! is logged, counted and skipped in either direction instead of ending the
//! stream. Blank source lines are dropped on encryption; a decrypted file
//! therefore equals its source minus the blank lines.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str;

use tracing::{info, warn};

use crate::armor::Encoding;
use crate::cipher::CipherEngine;
use crate::envelope::Envelope;
use crate::{CryptoError, Result};

const ENCRYPTED_SUFFIX: &str = ".aems";
const DECRYPTED_SUFFIX: &str = ".txt";

fn is_blank(line: &[u8]) -> bool {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    end == 0
}

/// Raw lines of a reader with their terminators kept
pub struct SourceLines<R> {
    reader: R,
    done: bool,
}

pub fn source_lines<R: BufRead>(reader: R) -> SourceLines<R> {
    SourceLines {
        reader,
        done: false,
    }
}

impl<R: BufRead> Iterator for SourceLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => Some(Ok(line)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Turns source lines into armored records, one per non-blank line
pub struct RecordEncoder<'e, I> {
    engine: &'e mut CipherEngine,
    lines: I,
    encoding: Encoding,
    line_no: usize,
    records: usize,
    blank: usize,
    invalid: usize,
}

impl<'e, I, L> RecordEncoder<'e, I>
where
    I: Iterator<Item = io::Result<L>>,
    L: AsRef<[u8]>,
{
    pub fn new<S>(engine: &'e mut CipherEngine, lines: S, encoding: Encoding) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            engine,
            lines: lines.into_iter(),
            encoding,
            line_no: 0,
            records: 0,
            blank: 0,
            invalid: 0,
        }
    }

    /// Records produced so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Blank source lines dropped so far
    pub fn blank_lines(&self) -> usize {
        self.blank
    }

    /// Source lines skipped because they are not UTF-8
    pub fn invalid_lines(&self) -> usize {
        self.invalid
    }
}

impl<I, L> Iterator for RecordEncoder<'_, I>
where
    I: Iterator<Item = io::Result<L>>,
    L: AsRef<[u8]>,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            let bytes = line.as_ref();
            if is_blank(bytes) {
                self.blank += 1;
                continue;
            }
            if let Err(e) = str::from_utf8(bytes) {
                self.invalid += 1;
                warn!(line = self.line_no, error = %e, "skipping source line that is not UTF-8");
                continue;
            }

            let envelope = match Envelope::seal(self.engine, bytes) {
                Ok(envelope) => envelope,
                Err(e) => return Some(Err(e)),
            };
            self.records += 1;
            let mut record = envelope.armor(self.encoding);
            record.push('\n');
            return Some(Ok(record));
        }
    }
}

/// Turns armored records back into source lines
///
/// A record that is not UTF-8, cannot be decoded, is shorter than a nonce, or
/// does not decrypt to UTF-8 is logged, counted and skipped. Only read failures
/// of the underlying source and a closed engine end the stream with an error.
pub struct RecordDecoder<'e, I> {
    engine: &'e mut CipherEngine,
    lines: I,
    encoding: Encoding,
    line_no: usize,
    recovered: usize,
    skipped: usize,
}

impl<'e, I, L> RecordDecoder<'e, I>
where
    I: Iterator<Item = io::Result<L>>,
    L: AsRef<[u8]>,
{
    pub fn new<S>(engine: &'e mut CipherEngine, lines: S, encoding: Encoding) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            engine,
            lines: lines.into_iter(),
            encoding,
            line_no: 0,
            recovered: 0,
            skipped: 0,
        }
    }

    pub fn recovered(&self) -> usize {
        self.recovered
    }

    /// Records skipped because they could not be decoded
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn skip(&mut self, error: &dyn std::fmt::Display) {
        self.skipped += 1;
        warn!(line = self.line_no, error = %error, "skipping undecodable record");
    }
}

impl<I, L> Iterator for RecordDecoder<'_, I>
where
    I: Iterator<Item = io::Result<L>>,
    L: AsRef<[u8]>,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            let record = match str::from_utf8(line.as_ref()) {
                Ok(record) => record.trim(),
                Err(e) => {
                    self.skip(&e);
                    continue;
                }
            };
            if record.is_empty() {
                continue;
            }

            match Envelope::unarmor(record, self.encoding).and_then(|e| e.open_text(self.engine)) {
                Ok(text) => {
                    self.recovered += 1;
                    return Some(Ok(text));
                }
                Err(CryptoError::NotReady) => return Some(Err(CryptoError::NotReady)),
                Err(e) => self.skip(&e),
            }
        }
    }
}

fn write_items<T, I>(output: &Path, items: I) -> Result<()>
where
    T: AsRef<[u8]>,
    I: Iterator<Item = Result<T>>,
{
    let mut writer = BufWriter::new(File::create(output)?);
    for item in items {
        writer.write_all(item?.as_ref())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every item to `output`. On failure the partial file is removed.
fn write_all_or_remove<T, I>(output: &Path, items: I) -> Result<()>
where
    T: AsRef<[u8]>,
    I: Iterator<Item = Result<T>>,
{
    let written = write_items(output, items);
    if written.is_err() && output.exists() {
        if let Err(e) = fs::remove_file(output) {
            warn!(output = %output.display(), error = %e, "failed to remove partial output");
        }
    }
    written
}

/// Outcome of a file transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub output: PathBuf,
    /// Records written (encryption) or lines recovered (decryption)
    pub records: usize,
    /// Blank or non-UTF-8 lines dropped (encryption), bad records skipped (decryption)
    pub skipped: usize,
}

/// `notes.txt` -> `notes.txt.aems`
pub fn encrypted_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_os_string();
    path.push(ENCRYPTED_SUFFIX);
    PathBuf::from(path)
}

/// Replace the first `.aems` with `.txt`, or append `.txt` when there is none
pub fn decrypted_path(input: &Path) -> PathBuf {
    match input.to_str() {
        Some(s) if s.contains(ENCRYPTED_SUFFIX) => {
            PathBuf::from(s.replacen(ENCRYPTED_SUFFIX, DECRYPTED_SUFFIX, 1))
        }
        _ => {
            let mut path = input.as_os_str().to_os_string();
            path.push(DECRYPTED_SUFFIX);
            PathBuf::from(path)
        }
    }
}

/// Encrypt a text file line by line into `<input>.aems`
pub fn encrypt_file(
    engine: &mut CipherEngine,
    input: &Path,
    encoding: Encoding,
) -> Result<FileReport> {
    if !engine.is_open() {
        return Err(CryptoError::NotReady);
    }
    let output = encrypted_path(input);
    let reader = BufReader::new(File::open(input)?);

    let mut encoder = RecordEncoder::new(engine, source_lines(reader), encoding);
    write_all_or_remove(&output, encoder.by_ref())?;

    if encoder.invalid_lines() > 0 {
        warn!(
            input = %input.display(),
            skipped = encoder.invalid_lines(),
            "some source lines are not UTF-8 and were not encrypted"
        );
    }
    let report = FileReport {
        output,
        records: encoder.records(),
        skipped: encoder.blank_lines() + encoder.invalid_lines(),
    };
    info!(
        input = %input.display(),
        output = %report.output.display(),
        records = report.records,
        blank_lines = encoder.blank_lines(),
        "file encrypted"
    );
    Ok(report)
}

/// Decrypt a record file produced by [`encrypt_file`]
pub fn decrypt_file(
    engine: &mut CipherEngine,
    input: &Path,
    encoding: Encoding,
) -> Result<FileReport> {
    if !engine.is_open() {
        return Err(CryptoError::NotReady);
    }
    let output = decrypted_path(input);
    let reader = BufReader::new(File::open(input)?);

    let mut decoder = RecordDecoder::new(engine, source_lines(reader), encoding);
    write_all_or_remove(&output, decoder.by_ref())?;

    let report = FileReport {
        output,
        records: decoder.recovered(),
        skipped: decoder.skipped(),
    };
    if report.skipped > 0 {
        warn!(
            input = %input.display(),
            skipped = report.skipped,
            "some records could not be decrypted"
        );
    }
    info!(
        input = %input.display(),
        output = %report.output.display(),
        lines = report.records,
        "file decrypted"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Key;
    use crate::provider::CipherKind;
    use std::io::Cursor;

    fn engine() -> CipherEngine {
        CipherEngine::open(CipherKind::Aes256.provider(), &Key::generate().unwrap()).unwrap()
    }

    fn owned(lines: &[&str]) -> Vec<io::Result<String>> {
        lines.iter().map(|l| Ok(l.to_string())).collect()
    }

    #[test]
    fn test_source_lines_keep_terminators() {
        let lines: Vec<Vec<u8>> = source_lines(Cursor::new(&b"a\n\nb\r\n\xffc"[..]))
            .collect::<io::Result<_>>()
            .unwrap();
        let expected: Vec<Vec<u8>> = vec![
            b"a\n".to_vec(),
            b"\n".to_vec(),
            b"b\r\n".to_vec(),
            b"\xffc".to_vec(),
        ];
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_blank_detection() {
        assert!(is_blank(b""));
        assert!(is_blank(b"\n"));
        assert!(is_blank(b"\r\n"));
        assert!(!is_blank(b" \n"));
        assert!(!is_blank(b"x"));
    }

    #[test]
    fn test_records_are_newline_terminated() {
        let mut engine = engine();
        let records: Vec<String> =
            RecordEncoder::new(&mut engine, owned(&["one", "two"]), Encoding::Base85)
                .collect::<Result<_>>()
                .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.ends_with('\n') && r.matches('\n').count() == 1));
    }

    #[test]
    fn test_encoder_counts_blank_lines() {
        let mut engine = engine();
        let mut encoder =
            RecordEncoder::new(&mut engine, owned(&["", "x\n", "\n", "y"]), Encoding::Base85);
        let produced = encoder.by_ref().count();
        assert_eq!(produced, 2);
        assert_eq!(encoder.records(), 2);
        assert_eq!(encoder.blank_lines(), 2);
    }

    #[test]
    fn test_encoder_skips_lines_that_are_not_utf8() {
        let mut engine = engine();
        let lines: Vec<io::Result<Vec<u8>>> =
            vec![Ok(b"ok\n".to_vec()), Ok(b"\xff\xfe\n".to_vec()), Ok(b"fine".to_vec())];
        let mut encoder = RecordEncoder::new(&mut engine, lines, Encoding::Base85);
        assert_eq!(encoder.by_ref().filter(|r| r.is_ok()).count(), 2);
        assert_eq!(encoder.invalid_lines(), 1);
        assert_eq!(encoder.blank_lines(), 0);
    }

    #[test]
    fn test_failed_write_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("partial.aems");
        let items: Vec<Result<String>> = vec![Ok("first\n".into()), Err(CryptoError::Random)];

        assert!(matches!(
            write_all_or_remove(&output, items.into_iter()),
            Err(CryptoError::Random)
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_decrypted_path_rules() {
        assert_eq!(
            decrypted_path(Path::new("notes.txt.aems")),
            PathBuf::from("notes.txt.txt")
        );
        assert_eq!(
            decrypted_path(Path::new("a.aems/b.aems")),
            PathBuf::from("a.txt/b.aems")
        );
        assert_eq!(decrypted_path(Path::new("plain")), PathBuf::from("plain.txt"));
        assert_eq!(
            encrypted_path(Path::new("dir/notes.txt")),
            PathBuf::from("dir/notes.txt.aems")
        );
    }

    #[test]
    fn test_read_error_surfaces() {
        let mut engine = engine();
        let lines: Vec<io::Result<String>> = vec![Err(io::Error::other("disk gone"))];
        let mut decoder = RecordDecoder::new(&mut engine, lines, Encoding::Base85);
        assert!(matches!(decoder.next(), Some(Err(CryptoError::Io(_)))));
        assert!(decoder.next().is_none());
    }
}
