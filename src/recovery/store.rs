//! Flat-file persistence for challenge questions.
//!
//! One record per line, four comma-separated fields in the order
//! `question_id,question,question_set_id,locale`, UTF-8. Fields holding a
//! comma, a double quote or a line break are wrapped in double quotes with
//! embedded quotes doubled; everything else is written bare.
//!
//! Every save rewrites the whole file through a temp file and a rename, so
//! a crash never leaves a half-written catalog behind. The store does no
//! locking of its own, callers must serialize read-modify-write sequences.

use super::error::{ErrorCode, RecoveryError, Result};
use super::question::ChallengeQuestion;
use std::{
    io::ErrorKind as IoErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument};

const SEPARATOR: char = ',';
const QUOTE: char = '"';
const FIELD_COUNT: usize = 4;

/// Relative location of the question file under the platform home.
pub const QUESTIONS_RELATIVE_PATH: &str = "repository/conf/identity/challenge-questions.csv";

/// How a locale-filtered read treats records whose locale matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LocaleFilter {
    /// Keep only records in the requested locale.
    #[default]
    Matching,
    /// Drop records in the requested locale and keep the rest (legacy polarity).
    ExcludeMatching,
}

impl LocaleFilter {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Matching => "matching",
            Self::ExcludeMatching => "exclude-matching",
        }
    }

    #[must_use]
    pub fn accepts(self, question: &ChallengeQuestion, locale: &str) -> bool {
        match self {
            Self::Matching => question.has_locale(locale),
            Self::ExcludeMatching => !question.has_locale(locale),
        }
    }
}

impl FromStr for LocaleFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "matching" => Ok(Self::Matching),
            "exclude-matching" | "exclude" | "legacy" => Ok(Self::ExcludeMatching),
            other => Err(format!("invalid locale filter: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuestionStore {
    path: PathBuf,
}

impl QuestionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located at the fixed relative path under `home`.
    pub fn under_home(home: impl AsRef<Path>) -> Self {
        Self::new(home.as_ref().join(QUESTIONS_RELATIVE_PATH))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with `questions`.
    ///
    /// # Errors
    /// Returns `question_store_io` if the temp file cannot be written or renamed.
    #[instrument(skip(self, questions), fields(path = %self.path.display(), count = questions.len()))]
    pub async fn save(&self, questions: &[ChallengeQuestion]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("failed to create question store directory", e))?;
        }

        let mut content = String::new();
        for question in questions {
            content.push_str(&encode_record(question));
            content.push('\n');
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| io_error("failed to create temp question file", e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| io_error("failed to write temp question file", e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("failed to sync temp question file", e))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| io_error("failed to replace question file", e))?;

        debug!("saved challenge questions");

        Ok(())
    }

    /// Read every record. A missing file reads as empty.
    ///
    /// # Errors
    /// Returns `question_store_io` on read failure and
    /// `malformed_challenge_question` when a record has fewer than four fields.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load_all(&self) -> Result<Vec<ChallengeQuestion>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                debug!("question file does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_error("failed to read question file", e)),
        };

        decode(&content)
    }

    /// Read records and apply `filter` against `locale`.
    ///
    /// # Errors
    /// Same as [`QuestionStore::load_all`].
    pub async fn load_by_locale(
        &self,
        locale: &str,
        filter: LocaleFilter,
    ) -> Result<Vec<ChallengeQuestion>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|question| filter.accepts(question, locale))
            .collect())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(message: &str, source: std::io::Error) -> RecoveryError {
    RecoveryError::new(ErrorCode::QuestionStoreIo, message).with_source(source)
}

fn encode_field(field: &str) -> String {
    if field.contains([SEPARATOR, QUOTE, '\n', '\r']) {
        format!("{QUOTE}{}{QUOTE}", field.replace(QUOTE, "\"\""))
    } else {
        field.to_string()
    }
}

/// Encode one record as a row without the trailing newline.
#[must_use]
pub fn encode_record(question: &ChallengeQuestion) -> String {
    [
        question.question_id.as_str(),
        question.question.as_str(),
        question.question_set_id.as_str(),
        question.locale.as_str(),
    ]
    .iter()
    .map(|field| encode_field(field))
    .collect::<Vec<_>>()
    .join(",")
}

/// Decode the full file content.
///
/// # Errors
/// Returns `malformed_challenge_question` naming the 1-based line of the
/// first short record.
pub fn decode(content: &str) -> Result<Vec<ChallengeQuestion>> {
    split_records(content)
        .into_iter()
        .map(|(line, fields)| into_question(line, fields))
        .collect()
}

fn into_question(line: usize, fields: Vec<String>) -> Result<ChallengeQuestion> {
    if fields.len() < FIELD_COUNT {
        return Err(RecoveryError::new(
            ErrorCode::MalformedChallengeQuestion,
            format!(
                "challenge question record on line {line} has {} fields, expected {FIELD_COUNT}",
                fields.len()
            ),
        ));
    }

    let mut fields = fields.into_iter();
    let mut next = || fields.next().unwrap_or_default();
    let question_id = next();
    let question = next();
    let question_set_id = next();
    let locale = next();

    Ok(ChallengeQuestion {
        question_set_id,
        question_id,
        question,
        locale,
    })
}

/// Split content into records tagged with their starting line. Blank lines
/// are skipped.
///
/// A field is quoted only when it opens with a quote and its closing quote
/// is followed by a separator or the end of the line; quoted fields may span
/// lines. Anything else is taken literally, which keeps rows from the legacy
/// writer (quotes doubled in place, never wrapped) as that writer's reader
/// saw them.
fn split_records(content: &str) -> Vec<(usize, Vec<String>)> {
    let chars: Vec<char> = content.chars().collect();
    let mut records = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while pos < chars.len() {
        let start = pos;
        let record_line = line;
        let mut fields = Vec::new();

        loop {
            let (field, end) = read_field(&chars, pos);
            line += chars[pos..end].iter().filter(|&&ch| ch == '\n').count();
            fields.push(field);
            pos = end;
            match chars.get(pos) {
                Some(&SEPARATOR) => pos += 1,
                Some(&'\r') => {
                    pos += 2;
                    line += 1;
                    break;
                }
                Some(_) => {
                    pos += 1;
                    line += 1;
                    break;
                }
                None => break,
            }
        }

        let blank =
            fields.len() == 1 && fields[0].is_empty() && chars.get(start) != Some(&QUOTE);
        if !blank {
            records.push((record_line, fields));
        }
    }

    records
}

/// Field starting at `start`, with the index of the delimiter (or end of
/// input) that follows it.
fn read_field(chars: &[char], start: usize) -> (String, usize) {
    if chars.get(start) == Some(&QUOTE) {
        if let Some(close) = closing_quote(chars, start) {
            let field: String = chars[start + 1..close].iter().collect();
            return (field.replace("\"\"", "\""), close + 1);
        }
    }

    let end = chars[start..]
        .iter()
        .position(|&ch| ch == SEPARATOR || ch == '\n')
        .map_or(chars.len(), |offset| start + offset);
    let mut field: String = chars[start..end].iter().collect();
    if chars.get(end) == Some(&'\n') && field.ends_with('\r') {
        field.pop();
    }
    (field, end)
}

/// Index of the quote closing the field opened at `start`, if that quote
/// ends the field.
fn closing_quote(chars: &[char], start: usize) -> Option<usize> {
    let mut pos = start + 1;
    while let Some(&ch) = chars.get(pos) {
        if ch == QUOTE {
            if chars.get(pos + 1) == Some(&QUOTE) {
                pos += 2;
                continue;
            }
            return ends_field(chars, pos + 1).then_some(pos);
        }
        pos += 1;
    }
    None
}

fn ends_field(chars: &[char], pos: usize) -> bool {
    match chars.get(pos) {
        None | Some(&(SEPARATOR | '\n')) => true,
        Some(&'\r') => chars.get(pos + 1) == Some(&'\n'),
        Some(_) => false,
    }
}
