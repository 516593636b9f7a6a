#![forbid(unsafe_code)]

//! JSONL run ledger.
//!
//! Every line is a self-contained JSON object carrying the same core fields:
//!
//! ```json
//! {"schema_version":1,"seq":0,"ts":"T000000","event":"oracle.run.start","run_id":"smellproof_seed0","seed":0,"deterministic":true}
//! {"schema_version":1,"seq":1,"ts":"T000001","event":"oracle.verdict","run_id":"smellproof_seed0","seed":0,"deterministic":true,"rule_id":"no-array-delete","status":"errored"}
//! ```
//!
//! In pinned mode timestamps are sequence counters so two runs with the same
//! seed produce byte-identical ledgers.

use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::determinism::SourceMode;

pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// Append-only JSONL writer.
pub struct JsonlLedger {
    sink: Mutex<Box<dyn Write + Send>>,
    run_id: String,
    mode: SourceMode,
    seq: AtomicU64,
}

impl std::fmt::Debug for JsonlLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlLedger")
            .field("run_id", &self.run_id)
            .field("mode", &self.mode)
            .field("seq", &self.seq.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl JsonlLedger {
    pub fn new(prefix: &str, mode: SourceMode, sink: Box<dyn Write + Send>) -> Self {
        let run_id = match mode {
            SourceMode::Pinned { seed } => format!("{prefix}_seed{seed}"),
            SourceMode::Live => format!(
                "{prefix}_{}_{}",
                std::process::id(),
                chrono::Utc::now().timestamp()
            ),
        };
        Self {
            sink: Mutex::new(sink),
            run_id,
            mode,
            seq: AtomicU64::new(0),
        }
    }

    /// Ledger that discards everything (still counts lines).
    pub fn noop(mode: SourceMode) -> Self {
        Self::new("smellproof", mode, Box::new(std::io::sink()))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emitted_count(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Build one line without writing it.
    pub fn emit_line(&self, event: &str, fields: Map<String, Value>) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut line = Map::new();
        line.insert("schema_version".into(), Value::from(LEDGER_SCHEMA_VERSION));
        line.insert("seq".into(), Value::from(seq));
        line.insert("ts".into(), Value::from(self.timestamp(seq)));
        line.insert("event".into(), Value::from(event));
        line.insert("run_id".into(), Value::from(self.run_id.as_str()));
        line.insert(
            "seed".into(),
            self.mode.seed().map_or(Value::Null, Value::from),
        );
        line.insert("deterministic".into(), Value::from(self.mode.is_pinned()));
        for (key, value) in fields {
            line.insert(key, value);
        }
        Value::Object(line).to_string()
    }

    /// Write one line to the sink.
    pub fn log(&self, event: &str, fields: Map<String, Value>) -> std::io::Result<()> {
        let line = self.emit_line(event, fields);
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| std::io::Error::other("ledger sink poisoned"))?;
        writeln!(sink, "{line}")?;
        sink.flush()
    }

    fn timestamp(&self, seq: u64) -> String {
        if self.mode.is_pinned() {
            format!("T{seq:06}")
        } else {
            chrono::Utc::now().to_rfc3339()
        }
    }
}

/// Convenience: build a field map from `(key, value)` pairs.
pub fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn pinned_run_id_embeds_seed() {
        let ledger = JsonlLedger::noop(SourceMode::Pinned { seed: 4242 });
        assert_eq!(ledger.run_id(), "smellproof_seed4242");
    }

    #[test]
    fn lines_carry_core_fields() {
        let ledger = JsonlLedger::noop(SourceMode::Pinned { seed: 9 });
        let line = ledger.emit_line("oracle.verdict", fields([("rule_id", json!("x"))]));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["schema_version"], 1);
        assert_eq!(parsed["seq"], 0);
        assert_eq!(parsed["ts"], "T000000");
        assert_eq!(parsed["event"], "oracle.verdict");
        assert_eq!(parsed["seed"], 9);
        assert_eq!(parsed["deterministic"], true);
        assert_eq!(parsed["rule_id"], "x");
    }

    #[test]
    fn sequence_increments_per_line() {
        let ledger = JsonlLedger::noop(SourceMode::Pinned { seed: 1 });
        let _ = ledger.emit_line("a", Map::new());
        let second = ledger.emit_line("b", Map::new());
        assert!(second.contains("\"seq\":1"), "{second}");
        assert_eq!(ledger.emitted_count(), 2);
    }

    #[test]
    fn live_lines_have_null_seed() {
        let ledger = JsonlLedger::noop(SourceMode::Live);
        let parsed: Value = serde_json::from_str(&ledger.emit_line("e", Map::new())).unwrap();
        assert!(parsed["seed"].is_null());
        assert_eq!(parsed["deterministic"], false);
    }

    #[test]
    fn log_writes_newline_terminated_json() {
        let buf = SharedBuf::default();
        let ledger = JsonlLedger::new(
            "t",
            SourceMode::Pinned { seed: 0 },
            Box::new(buf.clone()),
        );
        ledger.log("one", Map::new()).unwrap();
        ledger.log("two", Map::new()).unwrap();
        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<Value>(line).expect("each line is JSON");
        }
    }
}
