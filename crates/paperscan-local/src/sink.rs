use paperscan_core::{
    DownloadAttempt, Error, Mention, MentionStats, RecordSink, Result, WorkOutcome, WorkReport,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const ATTEMPTS_FILE: &str = "attempts.jsonl";
pub const OUTCOMES_FILE: &str = "outcomes.jsonl";
pub const MENTIONS_FILE: &str = "mentions.jsonl";

/// One line of `outcomes.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeRow {
    #[serde(flatten)]
    pub outcome: WorkOutcome,
    #[serde(default)]
    pub mention_stats: MentionStats,
}

fn sink_err(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Sink(format!("{}: {e}", path.display()))
}

/// Appends reports to three JSON Lines files in one directory.
#[derive(Debug)]
pub struct JsonlSink {
    dir: PathBuf,
    attempts: BufWriter<File>,
    outcomes: BufWriter<File>,
    mentions: BufWriter<File>,
}

impl JsonlSink {
    /// Creates `dir` if needed and truncates any existing artifacts.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| sink_err(&dir, e))?;
        let open = |name: &str| -> Result<BufWriter<File>> {
            let path = dir.join(name);
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|e| sink_err(&path, e))
        };
        Ok(Self {
            attempts: open(ATTEMPTS_FILE)?,
            outcomes: open(OUTCOMES_FILE)?,
            mentions: open(MENTIONS_FILE)?,
            dir,
        })
    }
}

fn write_line<T: Serialize>(w: &mut BufWriter<File>, path: &Path, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *w, value).map_err(|e| sink_err(path, e))?;
    w.write_all(b"\n").map_err(|e| sink_err(path, e))
}

impl RecordSink for JsonlSink {
    fn write_report(&mut self, report: &WorkReport) -> Result<()> {
        let path = self.dir.join(ATTEMPTS_FILE);
        for a in &report.attempts {
            write_line(&mut self.attempts, &path, a)?;
        }
        let path = self.dir.join(MENTIONS_FILE);
        for m in &report.mentions {
            write_line(&mut self.mentions, &path, m)?;
        }
        let row = OutcomeRow {
            outcome: report.outcome.clone(),
            mention_stats: report.mention_stats,
        };
        write_line(&mut self.outcomes, &self.dir.join(OUTCOMES_FILE), &row)
    }

    fn flush(&mut self) -> Result<()> {
        for (w, name) in [
            (&mut self.attempts, ATTEMPTS_FILE),
            (&mut self.outcomes, OUTCOMES_FILE),
            (&mut self.mentions, MENTIONS_FILE),
        ] {
            w.flush().map_err(|e| sink_err(&self.dir.join(name), e))?;
        }
        Ok(())
    }
}

/// Reads a JSON Lines file; blank lines are skipped, a malformed line is an error naming it.
pub fn read_jsonl<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| Error::Input(format!("{}: {e}", path.display())))?;
    let mut out = Vec::new();
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line.map_err(|e| Error::Input(format!("{}: {e}", path.display())))?;
        if line.trim().is_empty() {
            continue;
        }
        let v = serde_json::from_str(&line)
            .map_err(|e| Error::Input(format!("{}:{}: {e}", path.display(), i + 1)))?;
        out.push(v);
    }
    Ok(out)
}

/// Artifacts of a finished run, as written by `JsonlSink`.
#[derive(Debug, Clone, Default)]
pub struct RunArtifacts {
    pub attempts: Vec<DownloadAttempt>,
    pub outcomes: Vec<OutcomeRow>,
    pub mentions: Vec<Mention>,
}

impl RunArtifacts {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            attempts: read_jsonl(dir.join(ATTEMPTS_FILE))?,
            outcomes: read_jsonl(dir.join(OUTCOMES_FILE))?,
            mentions: read_jsonl(dir.join(MENTIONS_FILE))?,
        })
    }
}
