//! Integration tests for Slice 5 - Full session
//!
//! Tests the full path: plan → practice gate → main timeline → export → transport

use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::UnboundedSender;

use stereoprobe::core::session::PRACTICE_FAILED_NOTICE;
use stereoprobe::core::{
    parse_table, FormPostTransport, Keyboard, RecordingScreen, RenderTransport, Screen, Session,
    SessionOutcome, SessionPlan, StatementPool, Transport,
};
use stereoprobe::types::{Block, KeyConfig, StudyConfig, TimingConfig, TransportError};

/// Answers practice items correctly and main items with the true key
struct Participant {
    tx: UnboundedSender<char>,
    keys: KeyConfig,
    truth: HashMap<String, bool>,
    stimuli: usize,
}

impl Screen for Participant {
    fn show_stimulus(&mut self, text: &str) {
        self.stimuli += 1;
        let key = self.keys.key_for(self.truth.get(text).copied().unwrap_or(true));
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            let _ = tx.send(key);
        });
    }

    fn show_blank(&mut self) {}

    fn show_feedback(&mut self, _correct: bool) {}

    fn show_notice(&mut self, _text: &str) {}
}

fn fast_config(timeout_ms: u64) -> StudyConfig {
    let mut config = StudyConfig::default();
    config.timing = TimingConfig {
        trial_timeout_ms: Some(timeout_ms),
        iti_ms: 0,
        iti_jitter_ms: 0,
        feedback_ms: 0,
        post_response_delay_ms: 0,
    };
    config
}

fn plan(config: &StudyConfig, seed: u64) -> SessionPlan {
    let pool = StatementPool::with_default_catalog().unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    SessionPlan::build("session-under-test", &pool, config, &mut rng).unwrap()
}

/// Failing practice never reaches the main timeline
#[tokio::test]
async fn test_practice_failure_locks_main_task() {
    let config = fast_config(5);
    let plan = plan(&config, 1);
    let (_tx, keyboard) = Keyboard::channel(config.keys);
    let mut rng = StdRng::seed_from_u64(1);

    let (screen, report) = Session::new(&config, &plan)
        .run(RecordingScreen::new(), keyboard, &mut rng)
        .await;

    assert!(matches!(report.outcome, SessionOutcome::PracticeFailed { .. }));
    assert!(report.records.iter().all(|r| r.block() == Block::Practice));
    assert_eq!(
        report.records.len(),
        config.practice.items.len() * config.practice.attempt_budget as usize
    );
    assert_eq!(screen.notices().last().copied(), Some(PRACTICE_FAILED_NOTICE));
    assert!(screen
        .stimuli()
        .iter()
        .all(|s| plan.trials.iter().all(|t| t.statement.text() != *s)));

    // practice data is still exported
    assert_eq!(report.payload.summary.main_trial_count, 0);
    assert_eq!(report.payload.summary.practice_accuracy, Some(0.0));
}

/// Passing practice runs every planned trial once, in plan order
#[tokio::test]
async fn test_completed_session() {
    let config = fast_config(1_000);
    let plan = plan(&config, 2);
    let (tx, keyboard) = Keyboard::channel(config.keys);
    let participant = Participant {
        tx,
        keys: config.keys,
        truth: config
            .practice
            .items
            .iter()
            .map(|i| (i.text.clone(), i.truth))
            .collect(),
        stimuli: 0,
    };
    let mut rng = StdRng::seed_from_u64(2);

    let (participant, report) = Session::new(&config, &plan)
        .run(participant, keyboard, &mut rng)
        .await;

    assert!(report.outcome.is_completed());
    assert_eq!(participant.stimuli, config.practice.items.len() + plan.len());

    let main: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.block() == Block::Main)
        .collect();
    assert_eq!(main.len(), plan.len());
    for (record, trial) in main.iter().zip(&plan.trials) {
        assert_eq!(record.trial_index(), trial.index);
        assert_eq!(record.presented_text(), trial.statement.text());
        assert_eq!(record.response_meaning(), Some(true));
        assert_eq!(record.correct(), None);
    }

    let rows = parse_table(&report.payload.table).unwrap();
    assert_eq!(rows.len(), report.records.len());
    assert!(rows.iter().all(|r| r.session_id == "session-under-test"));
    assert_eq!(report.payload.summary.practice_accuracy, Some(1.0));
    assert_eq!(report.payload.summary.main_trial_count, plan.len());
}

/// Rendering shows the session and its checksum
#[tokio::test]
async fn test_render_transport() {
    colored::control::set_override(false);
    let config = fast_config(5);
    let plan = plan(&config, 3);
    let (_tx, keyboard) = Keyboard::channel(config.keys);
    let mut rng = StdRng::seed_from_u64(3);
    let (_, report) = Session::new(&config, &plan)
        .run(RecordingScreen::new(), keyboard, &mut rng)
        .await;

    let transport = RenderTransport::new();
    let text = transport.render(&report.payload);
    assert!(text.contains("session-under-test"));
    assert!(text.contains(&report.payload.checksum));
    assert!(transport.deliver(&report.payload).await.is_ok());
}

/// Unreachable endpoint is surfaced to the caller, payload untouched
#[tokio::test]
async fn test_form_post_failure_is_returned() {
    let config = fast_config(5);
    let plan = plan(&config, 4);
    let (_tx, keyboard) = Keyboard::channel(config.keys);
    let mut rng = StdRng::seed_from_u64(4);
    let (_, report) = Session::new(&config, &plan)
        .run(RecordingScreen::new(), keyboard, &mut rng)
        .await;

    let transport = FormPostTransport::new("http://127.0.0.1:9/submit", config.export.max_field_len);
    let result = transport.deliver(&report.payload).await;
    assert!(matches!(result, Err(TransportError::Http(_))));
    assert!(report.payload.verify());
}
