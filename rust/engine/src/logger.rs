use serde::{Deserialize, Serialize};

use crate::game::RoundReport;
use crate::round::{ActionRecord, RoundEnd};

/// Complete record of one finished round.
/// Serialized to JSONL format for round history storage and replay.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Unique identifier for this round (format: YYYYMMDD-NNNNNN)
    pub round_id: String,
    /// Round number within its game
    pub round: u32,
    /// Seed the deck was shuffled with (enables deterministic replay)
    pub seed: Option<u64>,
    pub players: Vec<String>,
    /// Chronological public actions
    pub actions: Vec<ActionRecord>,
    /// Final hand values per player
    pub hands: Vec<Vec<u8>>,
    pub end: RoundEnd,
    pub scores: Vec<u32>,
    /// Cumulative scores after the round
    pub totals: Vec<u32>,
    /// Timestamp when the round was played (RFC3339 format)
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

impl RoundRecord {
    pub fn from_report(round_id: String, players: Vec<String>, report: &RoundReport) -> Self {
        Self {
            round_id,
            round: report.outcome.round,
            seed: Some(report.seed),
            players,
            actions: report.outcome.actions.clone(),
            hands: report.outcome.hands.clone(),
            end: report.outcome.end,
            scores: report.outcome.scores.clone(),
            totals: report.totals.clone(),
            ts: None,
            meta: None,
        }
    }
}

pub fn format_round_id(yyyymmdd: &str, seq: u32) -> String {
    format!("{}-{:06}", yyyymmdd, seq)
}

use chrono::{SecondsFormat, Utc};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct RoundLogger {
    writer: Option<BufWriter<File>>,
    date: String,
    seq: u32,
}

impl RoundLogger {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let f = File::create(path)?;
        Ok(Self {
            writer: Some(BufWriter::new(f)),
            date: Utc::now().format("%Y%m%d").to_string(),
            seq: 0,
        })
    }

    /// Logger that only hands out ids, for tests and dry runs.
    pub fn detached(date: &str) -> Self {
        Self {
            writer: None,
            date: date.to_string(),
            seq: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        self.seq += 1;
        format_round_id(&self.date, self.seq)
    }

    pub fn write(&mut self, record: &RoundRecord) -> std::io::Result<()> {
        // inject timestamp if missing
        let mut rec = record.clone();
        if rec.ts.is_none() {
            rec.ts = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        let line = serde_json::to_string(&rec).map_err(std::io::Error::other)?;
        if let Some(w) = &mut self.writer {
            w.write_all(line.as_bytes())?;
            w.write_all(b"\n")?;
            w.flush()?;
        }
        Ok(())
    }
}
