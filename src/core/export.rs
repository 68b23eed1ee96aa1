//! Session Exporter
//!
//! Records become a flat CSV table plus summary statistics. The payload is
//! a pure function of the records and the session id (apart from the
//! `generated_at` stamp), so it can be rebuilt and re-sent at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Block, ExportError, OutcomeRecord};

/// Table columns, in order
pub const COLUMNS: [&str; 8] = [
    "session_id",
    "block",
    "index",
    "stimulus",
    "response_key",
    "response_meaning",
    "rt_ms",
    "correct",
];

/// Form field holding the number of data chunks
pub const CHUNK_COUNT_FIELD: &str = "data_chunks";

/// One table row as read back by `parse_table`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub session_id: String,
    pub block: Block,
    pub index: usize,
    pub stimulus: String,
    pub response_key: Option<char>,
    pub response_meaning: Option<bool>,
    pub rt_ms: Option<u64>,
    pub correct: Option<bool>,
}

impl TableRow {
    pub fn from_record(session_id: &str, record: &OutcomeRecord) -> Self {
        Self {
            session_id: session_id.to_string(),
            block: record.block(),
            index: record.trial_index(),
            stimulus: record.presented_text().to_string(),
            response_key: record.response_key(),
            response_meaning: record.response_meaning(),
            rt_ms: record.reaction_time_ms(),
            correct: record.correct(),
        }
    }

    fn fields(&self) -> [String; 8] {
        [
            self.session_id.clone(),
            self.block.as_str().to_string(),
            self.index.to_string(),
            self.stimulus.clone(),
            opt(self.response_key),
            opt(self.response_meaning),
            opt(self.rt_ms),
            opt(self.correct),
        ]
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// =============================================================================
// TABLE
// =============================================================================

/// CSV with header; every line ends with '\n'
pub fn to_table(session_id: &str, records: &[OutcomeRecord]) -> String {
    let mut out = String::new();
    push_line(&mut out, COLUMNS.iter().map(|c| c.to_string()));
    for record in records {
        push_line(&mut out, TableRow::from_record(session_id, record).fields());
    }
    out
}

fn push_line(out: &mut String, fields: impl IntoIterator<Item = String>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote(&field));
    }
    out.push('\n');
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Inverse of `to_table`
pub fn parse_table(table: &str) -> Result<Vec<TableRow>, ExportError> {
    let mut lines = split_records(table)?.into_iter();

    let header = lines
        .next()
        .ok_or_else(|| ExportError::Header("missing header".to_string()))?;
    if header.iter().map(String::as_str).ne(COLUMNS.iter().copied()) {
        return Err(ExportError::Header(header.join(",")));
    }

    lines
        .enumerate()
        .map(|(i, fields)| parse_row(i + 1, fields))
        .collect()
}

fn parse_row(row: usize, fields: Vec<String>) -> Result<TableRow, ExportError> {
    let err = |message: String| ExportError::Row { row, message };

    let [session_id, block, index, stimulus, key, meaning, rt, correct]: [String; 8] = fields
        .try_into()
        .map_err(|f: Vec<String>| err(format!("expected {} fields, found {}", COLUMNS.len(), f.len())))?;

    let block = block.parse::<Block>().map_err(err)?;
    let index = index
        .parse::<usize>()
        .map_err(|e| err(format!("index: {}", e)))?;

    let mut key_chars = key.chars();
    let response_key = match (key_chars.next(), key_chars.next()) {
        (None, _) => None,
        (Some(c), None) => Some(c),
        _ => return Err(err(format!("response_key '{}' is not a single key", key))),
    };

    Ok(TableRow {
        session_id,
        block,
        index,
        stimulus,
        response_key,
        response_meaning: parse_opt(&meaning).map_err(|e| err(format!("response_meaning: {}", e)))?,
        rt_ms: parse_opt(&rt).map_err(|e| err(format!("rt_ms: {}", e)))?,
        correct: parse_opt(&correct).map_err(|e| err(format!("correct: {}", e)))?,
    })
}

fn parse_opt<T: std::str::FromStr>(field: &str) -> Result<Option<T>, T::Err> {
    if field.is_empty() {
        Ok(None)
    } else {
        field.parse().map(Some)
    }
}

/// Split CSV text into records of unquoted fields
fn split_records(table: &str) -> Result<Vec<Vec<String>>, ExportError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = table.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut fields));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ExportError::UnterminatedQuote);
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(fields);
    }
    Ok(records)
}

// =============================================================================
// SUMMARY + PAYLOAD
// =============================================================================

/// Session-level statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Over every practice record; None without practice data
    pub practice_accuracy: Option<f64>,
    pub main_trial_count: usize,
    /// Responded main trials only
    pub mean_main_rt_ms: Option<f64>,
}

impl Summary {
    pub fn from_records(records: &[OutcomeRecord]) -> Self {
        let practice: Vec<&OutcomeRecord> =
            records.iter().filter(|r| r.block() == Block::Practice).collect();
        let practice_accuracy = if practice.is_empty() {
            None
        } else {
            let correct = practice.iter().filter(|r| r.is_correct()).count();
            Some(correct as f64 / practice.len() as f64)
        };

        let main: Vec<&OutcomeRecord> = records.iter().filter(|r| r.block() == Block::Main).collect();
        let rts: Vec<u64> = main.iter().filter_map(|r| r.reaction_time_ms()).collect();
        let mean_main_rt_ms = if rts.is_empty() {
            None
        } else {
            Some(rts.iter().sum::<u64>() as f64 / rts.len() as f64)
        };

        Self {
            practice_accuracy,
            main_trial_count: main.len(),
            mean_main_rt_ms,
        }
    }
}

/// Everything handed to a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub session_id: String,
    pub table: String,
    pub summary: Summary,
    /// Hex SHA-256 of `table`
    pub checksum: String,
    pub generated_at: DateTime<Utc>,
}

impl ExportPayload {
    pub fn build(session_id: &str, records: &[OutcomeRecord]) -> Self {
        let table = to_table(session_id, records);
        Self {
            session_id: session_id.to_string(),
            checksum: checksum(&table),
            summary: Summary::from_records(records),
            table,
            generated_at: Utc::now(),
        }
    }

    /// Table still matches its checksum
    pub fn verify(&self) -> bool {
        checksum(&self.table) == self.checksum
    }

    /// Flat key/value fields for a form POST
    pub fn to_form_fields(&self, max_field_len: usize) -> Vec<(String, String)> {
        let chunks = chunk_rows(&self.table, max_field_len);
        let mut fields = vec![
            ("session_id".to_string(), self.session_id.clone()),
            (
                "practice_accuracy".to_string(),
                opt(self.summary.practice_accuracy),
            ),
            (
                "main_trial_count".to_string(),
                self.summary.main_trial_count.to_string(),
            ),
            (
                "mean_main_rt_ms".to_string(),
                opt(self.summary.mean_main_rt_ms),
            ),
            ("checksum".to_string(), self.checksum.clone()),
            (CHUNK_COUNT_FIELD.to_string(), chunks.len().to_string()),
        ];
        fields.extend(
            chunks
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| (format!("data_{}", i), chunk)),
        );
        fields
    }
}

pub fn checksum(table: &str) -> String {
    let digest = Sha256::digest(table.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Pack whole rows into chunks of at most `max` chars; rows longer than
/// `max` are split at char boundaries
fn chunk_rows(table: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in table.split_inclusive('\n') {
        let len = line.chars().count();
        if current_len + len > max && current_len > 0 {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if len <= max {
            current.push_str(line);
            current_len += len;
            continue;
        }
        for c in line.chars() {
            if current_len == max {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(c);
            current_len += 1;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Rebuild the table from form fields; None if a chunk is missing
pub fn reassemble(fields: &[(String, String)]) -> Option<String> {
    let lookup = |key: &str| fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
    let count: usize = lookup(CHUNK_COUNT_FIELD)?.parse().ok()?;
    (0..count)
        .map(|i| lookup(&format!("data_{}", i)))
        .collect::<Option<Vec<&str>>>()
        .map(|parts| parts.concat())
}

// =============================================================================
// TESTS
// =============================================================================
