//! Integration tests for Slice 4 - Session export
//!
//! Tests the full path: records → table → payload → form fields → table

use pretty_assertions::assert_eq;

use stereoprobe::core::{checksum, parse_table, reassemble, to_table, ExportPayload, Summary};
use stereoprobe::core::export::{CHUNK_COUNT_FIELD, COLUMNS};
use stereoprobe::types::{
    Block, CatalogEntry, Category, ExportError, OutcomeRecord, PracticeItem, PracticeTrial,
    Statement, SubjectNouns, TrialSpec,
};

fn practice(index: usize, text: &str, truth: bool, answer: Option<bool>) -> OutcomeRecord {
    let trial = PracticeTrial {
        index,
        item: PracticeItem::new(text, truth),
    };
    match answer {
        Some(meaning) => {
            let key = if meaning { 'j' } else { 'f' };
            OutcomeRecord::responded(&trial, Block::Practice, key, meaning, 800)
        }
        None => OutcomeRecord::timed_out(&trial, Block::Practice),
    }
}

fn main_trial(index: usize, text: &str, rt: Option<u64>) -> OutcomeRecord {
    let entry = CatalogEntry::new(text, Category::Trait);
    let trial = TrialSpec::new(index, Statement::from_entry(&entry, &SubjectNouns::default()).unwrap());
    match rt {
        Some(ms) => OutcomeRecord::responded(&trial, Block::Main, 'f', false, ms),
        None => OutcomeRecord::timed_out(&trial, Block::Main),
    }
}

fn session() -> Vec<OutcomeRecord> {
    vec![
        practice(0, "Dogs are Animals", true, Some(true)),
        practice(1, "Fish are Mammals", false, Some(true)),
        practice(2, "Rocks are Alive", false, None),
        main_trial(17, "Democrats are Kind", Some(400)),
        main_trial(3, "Republicans are \"Working Class\", mostly", Some(600)),
        main_trial(51, "Democrats are Pro-Gun", None),
    ]
}

/// Header first, one line per record
#[test]
fn test_table_layout() {
    let table = to_table("abc", &session());
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some(COLUMNS.join(",").as_str()));
    assert_eq!(lines.next(), Some("abc,practice,0,Dogs are Animals,j,true,800,true"));
    assert_eq!(table.lines().count(), 7);
    assert!(table.ends_with('\n'));
}

/// Parsing the table gives back every field
#[test]
fn test_parse_round_trip() {
    let records = session();
    let rows = parse_table(&to_table("abc", &records)).unwrap();

    assert_eq!(rows.len(), records.len());
    for (row, record) in rows.iter().zip(&records) {
        assert_eq!(row.session_id, "abc");
        assert_eq!(row.block, record.block());
        assert_eq!(row.index, record.trial_index());
        assert_eq!(row.stimulus, record.presented_text());
        assert_eq!(row.response_key, record.response_key());
        assert_eq!(row.response_meaning, record.response_meaning());
        assert_eq!(row.rt_ms, record.reaction_time_ms());
        assert_eq!(row.correct, record.correct());
    }
}

/// Malformed rows are reported with their row number
#[test]
fn test_parse_rejects_bad_rows() {
    let header = COLUMNS.join(",");
    let short = format!("{}\nabc,main,1\n", header);
    assert!(matches!(
        parse_table(&short),
        Err(ExportError::Row { row: 1, .. })
    ));

    let bad_block = format!("{}\nabc,warmup,1,x,,,,\n", header);
    assert!(matches!(parse_table(&bad_block), Err(ExportError::Row { .. })));
}

/// Summary statistics over the sample session
#[test]
fn test_summary_values() {
    let summary = Summary::from_records(&session());
    assert_eq!(summary.practice_accuracy, Some(1.0 / 3.0));
    assert_eq!(summary.main_trial_count, 3);
    assert_eq!(summary.mean_main_rt_ms, Some(500.0));
}

/// Form fields carry the summary and a reassemblable table
#[test]
fn test_form_fields() {
    let payload = ExportPayload::build("abc", &session());
    let fields = payload.to_form_fields(64);
    let get = |key: &str| {
        fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    assert_eq!(get("session_id").as_deref(), Some("abc"));
    assert_eq!(get("main_trial_count").as_deref(), Some("3"));
    assert_eq!(get("checksum"), Some(payload.checksum.clone()));

    let chunks: usize = get(CHUNK_COUNT_FIELD).unwrap().parse().unwrap();
    assert!(chunks > 1);
    assert_eq!(reassemble(&fields), Some(payload.table.clone()));
}

/// A missing chunk cannot be reassembled
#[test]
fn test_reassemble_missing_chunk() {
    let payload = ExportPayload::build("abc", &session());
    let mut fields = payload.to_form_fields(32);
    fields.retain(|(k, _)| k != "data_1");
    assert_eq!(reassemble(&fields), None);
}

/// Rebuilding from the same records gives the same payload content
#[test]
fn test_regeneration_is_deterministic() {
    let records = session();
    let first = ExportPayload::build("abc", &records);
    let second = ExportPayload::build("abc", &records);

    assert_eq!(first.table, second.table);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(first.checksum, checksum(&first.table));
    assert_eq!(first.checksum.len(), 64);
}

/// Tampering with the table breaks verification
#[test]
fn test_verify_detects_change() {
    let mut payload = ExportPayload::build("abc", &session());
    assert!(payload.verify());
    payload.table.push_str("abc,main,99,x,,,,\n");
    assert!(!payload.verify());
}
