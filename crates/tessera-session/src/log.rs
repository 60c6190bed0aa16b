//! Append-only logs stored as one pretty-printed JSON array per feature.
//!
//! Every append is a read-modify-write of the whole array. Content that cannot
//! be parsed as an array is discarded and the log restarts from the new entry;
//! the caller can see that this happened through [`LogStatus::Recovered`].

use crate::error::LogError;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tessera_types::{Feature, LogRecord};
use tokio::sync::Mutex;

/// State of a log file as found before an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStatus {
    /// The file was missing or empty.
    Fresh,
    /// A valid array was found and preserved.
    Intact,
    /// The file held something other than a JSON array; it was discarded.
    Recovered { reason: String },
}

/// Entries currently in a log.
#[derive(Debug, Clone)]
pub struct LoadedLog {
    pub entries: Vec<Value>,
    pub status: LogStatus,
}

impl LoadedLog {
    fn fresh() -> Self {
        Self {
            entries: Vec::new(),
            status: LogStatus::Fresh,
        }
    }
}

/// Outcome of a successful append.
#[derive(Debug, Clone)]
pub struct AppendReport {
    pub path: PathBuf,
    /// Number of entries in the log after the append.
    pub entries: usize,
    pub status: LogStatus,
}

/// Read a log without modifying it.
pub async fn read_entries(path: &Path) -> Result<LoadedLog, LogError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LoadedLog::fresh()),
        Err(source) => {
            return Err(LogError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(parse_log(&bytes))
}

fn parse_log(bytes: &[u8]) -> LoadedLog {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return LoadedLog::fresh();
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(entries)) => LoadedLog {
            entries,
            status: LogStatus::Intact,
        },
        Ok(other) => LoadedLog {
            entries: Vec::new(),
            status: LogStatus::Recovered {
                reason: format!("expected a JSON array, found {}", json_kind(&other)),
            },
        },
        Err(e) => LoadedLog {
            entries: Vec::new(),
            status: LogStatus::Recovered {
                reason: e.to_string(),
            },
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Append `entry` to the JSON array at `path`, creating the file and its
/// directory if needed.
///
/// Not safe for concurrent writers on the same path; go through
/// [`LogStore`] for that.
pub async fn append_entry(path: &Path, entry: Value) -> Result<AppendReport, LogError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| LogError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let LoadedLog {
        mut entries,
        status,
    } = read_entries(path).await?;
    if let LogStatus::Recovered { reason } = &status {
        tracing::warn!(
            "Discarding unreadable log {}: {}",
            path.display(),
            reason
        );
    }

    entries.push(entry);
    let json = to_pretty_json(&entries)?;
    write_atomic(path, &json).await?;

    Ok(AppendReport {
        path: path.to_path_buf(),
        entries: entries.len(),
        status,
    })
}

/// Serialize with 4-space indentation.
fn to_pretty_json(entries: &[Value]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entries.serialize(&mut ser)?;
    Ok(buf)
}

/// Write via `.tmp` + rename so readers never see a torn array.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), LogError> {
    let tmp_path = path.with_extension("tmp");
    let to_write_error = |source| LogError::Write {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(to_write_error)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(to_write_error)?;
    Ok(())
}

/// Feature logs under a single outputs directory.
///
/// All appends go through one lock, so concurrent callers are serialized
/// and no entry is lost to a read-modify-write race.
pub struct LogStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LogStore {
    /// Create a store rooted at `dir`. The directory is created on first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file owned by `feature`.
    pub fn path_for(&self, feature: Feature) -> PathBuf {
        self.dir.join(feature.log_file_name())
    }

    /// Append a raw JSON entry to a feature's log.
    pub async fn append(&self, feature: Feature, entry: Value) -> Result<AppendReport, LogError> {
        let path = self.path_for(feature);
        let _guard = self.write_lock.lock().await;
        let report = append_entry(&path, entry).await?;
        tracing::debug!(
            "Appended {} log entry #{} to {}",
            feature,
            report.entries,
            path.display()
        );
        Ok(report)
    }

    /// Append a typed record to the log of its feature.
    pub async fn record<R: LogRecord>(&self, record: &R) -> Result<AppendReport, LogError> {
        let value = serde_json::to_value(record)?;
        self.append(R::FEATURE, value).await
    }

    /// Read a feature's log.
    pub async fn read(&self, feature: Feature) -> Result<LoadedLog, LogError> {
        read_entries(&self.path_for(feature)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tessera_types::{InputMode, SynthesisRecord};

    async fn read_json(path: &Path) -> Value {
        let data = tokio::fs::read_to_string(path).await.unwrap();
        serde_json::from_str(&data).unwrap()
    }

    #[tokio::test]
    async fn append_to_missing_file_creates_directory_and_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("outputs").join("tts_log.json");
        let entry = json!({"timestamp": "20240101_000000", "text": "hi", "audio_file": "a.wav"});

        let report = append_entry(&path, entry.clone()).await.unwrap();

        assert_eq!(report.status, LogStatus::Fresh);
        assert_eq!(report.entries, 1);
        assert_eq!(read_json(&path).await, json!([entry]));
    }

    #[tokio::test]
    async fn second_append_preserves_first_entry() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tts_log.json");
        let first = json!({"timestamp": "20240101_000000", "text": "hi", "audio_file": "a.wav"});
        let second = json!({"timestamp": "20240101_000001", "text": "bye", "audio_file": "b.wav"});

        append_entry(&path, first.clone()).await.unwrap();
        let report = append_entry(&path, second.clone()).await.unwrap();

        assert_eq!(report.status, LogStatus::Intact);
        assert_eq!(report.entries, 2);
        assert_eq!(read_json(&path).await, json!([first, second]));
    }

    #[tokio::test]
    async fn sequential_appends_keep_order() {
        let tmp = TempDir::new().unwrap();
        let store = LogStore::new(tmp.path());
        let entries: Vec<Value> = (0..6).map(|i| json!({ "seq": i })).collect();

        for (i, entry) in entries.iter().enumerate() {
            let report = store.append(Feature::Speech, entry.clone()).await.unwrap();
            assert_eq!(report.entries, i + 1);
        }

        let loaded = store.read(Feature::Speech).await.unwrap();
        assert_eq!(loaded.status, LogStatus::Intact);
        assert_eq!(loaded.entries, entries);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_lose_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = std::sync::Arc::new(LogStore::new(tmp.path()));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..20 {
            let store = std::sync::Arc::clone(&store);
            tasks.spawn(async move { store.append(Feature::Image, json!({ "seq": i })).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let loaded = store.read(Feature::Image).await.unwrap();
        let mut seen: Vec<i64> = loaded
            .entries
            .iter()
            .map(|e| e["seq"].as_i64().unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn invalid_json_is_replaced_by_new_entry() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("llm_log.json");
        tokio::fs::write(&path, "[{\"timestamp\": \"2024").await.unwrap();
        let entry = json!({"timestamp": "20240101_000000"});

        let report = append_entry(&path, entry.clone()).await.unwrap();

        assert!(matches!(report.status, LogStatus::Recovered { .. }));
        assert_eq!(read_json(&path).await, json!([entry]));
    }

    #[tokio::test]
    async fn non_array_json_is_recovered() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("image_log.json");
        tokio::fs::write(&path, r#"{"not": "an array"}"#).await.unwrap();

        let report = append_entry(&path, json!({"n": 1})).await.unwrap();

        match report.status {
            LogStatus::Recovered { reason } => assert!(reason.contains("an object")),
            other => panic!("expected Recovered, got {other:?}"),
        }
        assert_eq!(read_json(&path).await, json!([{"n": 1}]));
    }

    #[tokio::test]
    async fn invalid_utf8_is_recovered() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("speech_log.json");
        tokio::fs::write(&path, [0xff, 0xfe, 0x00, 0x5b]).await.unwrap();

        let report = append_entry(&path, json!({"n": 1})).await.unwrap();
        assert!(matches!(report.status, LogStatus::Recovered { .. }));
    }

    #[tokio::test]
    async fn empty_and_whitespace_files_are_fresh() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty.json");
        let blank = tmp.path().join("blank.json");
        tokio::fs::write(&empty, "").await.unwrap();
        tokio::fs::write(&blank, "  \n").await.unwrap();

        assert_eq!(
            append_entry(&empty, json!(1)).await.unwrap().status,
            LogStatus::Fresh
        );
        assert_eq!(
            append_entry(&blank, json!(1)).await.unwrap().status,
            LogStatus::Fresh
        );
    }

    #[tokio::test]
    async fn output_uses_four_space_indent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tts_log.json");
        append_entry(&path, json!({"text": "hi"})).await.unwrap();

        let data = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(data, "[\n    {\n        \"text\": \"hi\"\n    }\n]");
    }

    #[tokio::test]
    async fn no_tmp_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tts_log.json");
        append_entry(&path, json!({})).await.unwrap();
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn read_missing_log_is_fresh_and_empty() {
        let tmp = TempDir::new().unwrap();
        let loaded = read_entries(&tmp.path().join("nope.json")).await.unwrap();
        assert!(loaded.entries.is_empty());
        assert_eq!(loaded.status, LogStatus::Fresh);
    }

    #[tokio::test]
    async fn read_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let result = read_entries(tmp.path()).await;
        assert!(matches!(result, Err(LogError::Read { .. })));
    }

    #[tokio::test]
    async fn store_routes_records_to_feature_files() {
        let tmp = TempDir::new().unwrap();
        let store = LogStore::new(tmp.path().join("outputs"));
        let record = SynthesisRecord {
            timestamp: "20240101_000000".into(),
            text: "hi".into(),
            audio_file: "a.wav".into(),
        };

        let report = store.record(&record).await.unwrap();

        assert_eq!(report.path, tmp.path().join("outputs").join("tts_log.json"));
        let loaded = store.read(Feature::Synthesis).await.unwrap();
        assert_eq!(loaded.entries, vec![serde_json::to_value(&record).unwrap()]);
        assert!(store.read(Feature::Chat).await.unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn store_keeps_record_field_order() {
        let tmp = TempDir::new().unwrap();
        let store = LogStore::new(tmp.path());
        store
            .record(&tessera_types::ChatRecord {
                timestamp: "20240101_000000".into(),
                user_input: "hello".into(),
                response: "hi".into(),
                mode: InputMode::Text,
            })
            .await
            .unwrap();

        let data = tokio::fs::read_to_string(store.path_for(Feature::Chat))
            .await
            .unwrap();
        let ts = data.find("timestamp").unwrap();
        let input = data.find("user_input").unwrap();
        let response = data.find("response").unwrap();
        let mode = data.find("mode").unwrap();
        assert!(ts < input && input < response && response < mode);
    }
}
