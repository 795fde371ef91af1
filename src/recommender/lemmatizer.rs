use std::fmt::Debug;
use std::io::Write;
use std::process::{Command, Stdio};

use aprender::text::stem::{PorterStemmer, Stemmer};
use tracing::debug;

use crate::error::{RecommendError, Result};

/// Reduces words to their dictionary form.
///
/// Implementations receive already cleaned text (lowercase words separated by
/// whitespace) and must return the lemmas in the original word order,
/// separated by single spaces.
pub trait Lemmatizer: Send + Sync + Debug {
    fn lemmatize(&self, text: &str) -> Result<String>;
}

/// Built-in English lemmatizer.
/// Irregular forms are mapped through a fixed table first, then every word
/// is reduced by the Porter stemmer, so inflected and base forms share one
/// token ("stored" and "store", "mice" and "mouse").
#[derive(Debug, Clone, Default)]
pub struct PorterLemmatizer {
    stemmer: PorterStemmer,
}

/// irregular form -> base form
const IRREGULAR: &[(&str, &str)] = &[
    ("am", "be"), ("is", "be"), ("are", "be"), ("was", "be"), ("were", "be"), ("been", "be"), ("being", "be"),
    ("has", "have"), ("had", "have"), ("having", "have"),
    ("does", "do"), ("did", "do"), ("done", "do"), ("doing", "do"),
    ("goes", "go"), ("went", "go"), ("gone", "go"),
    ("made", "make"), ("took", "take"), ("taken", "take"),
    ("gave", "give"), ("given", "give"),
    ("got", "get"), ("gotten", "get"), ("ran", "run"),
    ("wrote", "write"), ("written", "write"),
    ("built", "build"), ("bought", "buy"), ("brought", "bring"),
    ("found", "find"), ("kept", "keep"), ("knew", "know"), ("known", "know"),
    ("left", "leave"), ("lost", "lose"), ("meant", "mean"), ("met", "meet"),
    ("paid", "pay"), ("said", "say"), ("saw", "see"), ("seen", "see"),
    ("sent", "send"), ("spent", "spend"), ("thought", "think"), ("told", "tell"),
    ("better", "good"), ("best", "good"), ("worse", "bad"), ("worst", "bad"),
    ("children", "child"), ("men", "man"), ("women", "woman"), ("people", "person"),
    ("feet", "foot"), ("teeth", "tooth"), ("mice", "mouse"),
    ("indices", "index"), ("criteria", "criterion"),
];

impl PorterLemmatizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lemma of a single lowercase word
    pub fn lemma(&self, word: &str) -> Result<String> {
        let base = IRREGULAR
            .iter()
            .find(|(form, _)| *form == word)
            .map_or(word, |(_, base)| *base);
        self.stemmer
            .stem(base)
            .map_err(|e| RecommendError::Lemmatizer(format!("cannot stem `{word}`: {e}")))
    }
}

impl Lemmatizer for PorterLemmatizer {
    fn lemmatize(&self, text: &str) -> Result<String> {
        let lemmas = text
            .split_whitespace()
            .map(|w| self.lemma(w))
            .collect::<Result<Vec<_>>>()?;
        Ok(lemmas.join(" "))
    }
}

/// Lemmatizer backed by an external program.
///
/// The cleaned text is written to the program's stdin from a scoped thread
/// while stdout is drained, so inputs larger than a pipe buffer cannot
/// deadlock. Stdout is read as whitespace separated lemmas. Any spawn failure,
/// write failure or non-zero exit aborts the request.
#[derive(Debug, Clone)]
pub struct CommandLemmatizer {
    program: String,
    args: Vec<String>,
}

impl CommandLemmatizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Lemmatizer for CommandLemmatizer {
    fn lemmatize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecommendError::Lemmatizer(format!("failed to start `{}`: {e}", self.program)))?;
        // stdout は別途読み出すので、stdin への書き込みはスレッドで行う
        let stdin = child.stdin.take();
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(text.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (output, writer.join())
        });
        let output =
            output.map_err(|e| RecommendError::Lemmatizer(format!("`{}` did not finish: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecommendError::Lemmatizer(format!(
                "`{}` exited with status {:?}: {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(RecommendError::Lemmatizer(format!(
                    "failed to write to `{}`: {e}",
                    self.program
                )))
            }
            Err(_) => {
                return Err(RecommendError::Lemmatizer(format!(
                    "stdin writer for `{}` panicked",
                    self.program
                )))
            }
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let lemmas = stdout.split_whitespace().collect::<Vec<_>>().join(" ");
        debug!(program = %self.program, input_len = text.len(), "external lemmatizer finished");
        Ok(lemmas)
    }
}
