use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use tracing::warn;

use crate::error::Result;
use crate::types::UsageRecord;

/// Append-only usage record store: one NDJSON file per local calendar day,
/// `<YYYY-MM-DD>.jsonl`, one serialized record per line.
///
/// Appends from overlapping writers interleave at line granularity instead
/// of racing a whole-file rewrite, and a torn or corrupt line costs only
/// that line on read.
pub struct RecordStore {
    dir: PathBuf,
}

/// Record filter for range loads. Timestamps are exact bounds: records near
/// midnight can land in a neighboring day file, so bounds are re-checked
/// per record, never assumed from the filename.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub agent_id: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl RecordFilter {
    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            agent_id: None,
            provider: None,
            model: None,
        }
    }

    fn matches(&self, r: &UsageRecord) -> bool {
        if r.timestamp < self.start || r.timestamp > self.end {
            return false;
        }
        if let Some(ref agent) = self.agent_id {
            if &r.agent_id != agent {
                return false;
            }
        }
        if let Some(ref provider) = self.provider {
            if &r.provider != provider {
                return false;
            }
        }
        if let Some(ref model) = self.model {
            if &r.model != model {
                return false;
            }
        }
        true
    }
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Append one record to its day file, keyed by the record's local date.
    pub fn append(&self, record: &UsageRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let date = record.timestamp.with_timezone(&Local).date_naive();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.day_path(date))?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Load every record matching the filter. Iterates each calendar day in
    /// the window inclusive; a missing or corrupt day file degrades to "no
    /// records for that day".
    pub fn load(&self, filter: &RecordFilter) -> Vec<UsageRecord> {
        let mut records = Vec::new();

        let first = filter.start.with_timezone(&Local).date_naive();
        let last = filter.end.with_timezone(&Local).date_naive();
        let mut day = first;
        while day <= last {
            let path = self.day_path(day);
            if path.exists() {
                read_day_file(&path, filter, &mut records);
            }
            day += Duration::days(1);
        }

        records
    }
}

fn read_day_file(path: &Path, filter: &RecordFilter, out: &mut Vec<UsageRecord>) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open usage day file");
            return;
        }
    };

    let reader = BufReader::new(file);
    for (line_no, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<UsageRecord>(&line) {
            Ok(record) => {
                if filter.matches(&record) {
                    out.push(record);
                }
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "skipping corrupt usage record line"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(agent: &str, provider: &str, model: &str, ts: DateTime<Utc>) -> UsageRecord {
        UsageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent.to_string(),
            session_id: "s1".to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            input_tokens: 100,
            output_tokens: 50,
            cache_read_tokens: 0,
            cache_write_tokens: 0,
            total_tokens: 150,
            cost: 0.01,
            timestamp: ts,
            task_type: "general".to_string(),
            duration_ms: 420,
            success: true,
            error: None,
        }
    }

    #[test]
    fn append_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        let now = Utc::now();

        store.append(&record("a1", "anthropic", "m1", now)).unwrap();
        store.append(&record("a2", "openai", "m2", now)).unwrap();

        let all = store.load(&RecordFilter::range(now - Duration::hours(1), now));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn filters_by_agent_provider_model() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        let now = Utc::now();

        store.append(&record("a1", "anthropic", "m1", now)).unwrap();
        store.append(&record("a1", "openai", "m2", now)).unwrap();
        store.append(&record("a2", "openai", "m2", now)).unwrap();

        let mut filter = RecordFilter::range(now - Duration::hours(1), now);
        filter.agent_id = Some("a1".to_string());
        filter.provider = Some("openai".to_string());
        let got = store.load(&filter);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].model, "m2");
    }

    #[test]
    fn timestamp_bounds_are_exact() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        let now = Utc::now();

        store
            .append(&record("a1", "anthropic", "m1", now - Duration::hours(3)))
            .unwrap();
        store.append(&record("a1", "anthropic", "m1", now)).unwrap();

        // Both records may share a day file; only the in-window one returns.
        let got = store.load(&RecordFilter::range(now - Duration::hours(1), now));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        let now = Utc::now();

        store.append(&record("a1", "anthropic", "m1", now)).unwrap();

        let date = now.with_timezone(&Local).date_naive();
        let path = dir.path().join(format!("{}.jsonl", date.format("%Y-%m-%d")));
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        store.append(&record("a1", "anthropic", "m1", now)).unwrap();

        let got = store.load(&RecordFilter::range(now - Duration::hours(1), now));
        assert_eq!(got.len(), 2);
    }
}
