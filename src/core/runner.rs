//! Trial Runner
//!
//! One live trial at a time. Each trial renders its stimulus, races the
//! next accepted key against the timeout, appends exactly one
//! `OutcomeRecord`, then blanks the screen for the inter-trial interval.
//!
//! Keys only count while an `InputCapture` is held. Acquiring a capture
//! discards stale presses and dropping it discards whatever is left, so a
//! key pressed during the ITI or after a timeout never leaks into the next
//! trial.

use std::time::Duration;

use colored::Colorize;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::types::{Block, KeyConfig, OutcomeRecord, SentenceParts, Stimulus, StudyConfig, TimingConfig};

// =============================================================================
// INPUT
// =============================================================================

/// Raw key source fed by the front-end (stdin reader, test script)
#[derive(Debug)]
pub struct Keyboard {
    rx: mpsc::UnboundedReceiver<char>,
    keys: KeyConfig,
}

impl Keyboard {
    pub fn new(rx: mpsc::UnboundedReceiver<char>, keys: KeyConfig) -> Self {
        Self { rx, keys }
    }

    /// New keyboard plus the sender that feeds it
    pub fn channel(keys: KeyConfig) -> (mpsc::UnboundedSender<char>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx, keys))
    }

    /// Start accepting keys; stale presses are discarded first
    pub fn capture(&mut self) -> InputCapture<'_> {
        let stale = self.drain();
        if stale > 0 {
            debug!(stale, "discarded keys pressed outside a trial");
        }
        InputCapture { keyboard: self }
    }

    fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

/// Scoped permission to read keys. Dropping it flushes the channel.
#[derive(Debug)]
pub struct InputCapture<'a> {
    keyboard: &'a mut Keyboard,
}

impl InputCapture<'_> {
    /// Next mapped key and its meaning. Unmapped keys are skipped.
    /// None once the key source has closed.
    pub async fn next_key(&mut self) -> Option<(char, bool)> {
        loop {
            let key = self.keyboard.rx.recv().await?;
            match self.keyboard.keys.meaning(key) {
                Some(meaning) => return Some((key, meaning)),
                None => debug!(?key, "ignored unmapped key"),
            }
        }
    }
}

impl Drop for InputCapture<'_> {
    fn drop(&mut self) {
        self.keyboard.drain();
    }
}

// =============================================================================
// SCREEN
// =============================================================================

/// Rendering surface for the participant
pub trait Screen {
    fn show_stimulus(&mut self, text: &str);
    fn show_blank(&mut self);
    fn show_feedback(&mut self, correct: bool);
    fn show_notice(&mut self, text: &str);
}

/// Plain terminal rendering; colour follows `colored`'s global override
#[derive(Debug, Default)]
pub struct TerminalScreen {
    keys: KeyConfig,
}

impl TerminalScreen {
    pub fn new(keys: KeyConfig) -> Self {
        Self { keys }
    }
}

impl Screen for TerminalScreen {
    fn show_stimulus(&mut self, text: &str) {
        let parts = SentenceParts::split(text);
        println!();
        println!("    {}", parts.subject.bold());
        if let (Some(connector), Some(rest)) = (parts.connector, parts.rest) {
            println!("    {}", connector);
            println!("    {}", rest.bold());
        }
        println!(
            "{}",
            format!(
                "  [{}] False    [{}] True",
                self.keys.false_key, self.keys.true_key
            )
            .dimmed()
        );
    }

    fn show_blank(&mut self) {
        println!();
    }

    fn show_feedback(&mut self, correct: bool) {
        if correct {
            println!("  {}", "Correct".green().bold());
        } else {
            println!("  {}", "Incorrect".red().bold());
        }
    }

    fn show_notice(&mut self, text: &str) {
        println!();
        println!("{}", text.yellow());
    }
}

/// What a `RecordingScreen` was asked to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    Stimulus(String),
    Blank,
    Feedback(bool),
    Notice(String),
}

/// Headless screen that keeps every call, for scripted runs
#[derive(Debug, Default)]
pub struct RecordingScreen {
    pub events: Vec<ScreenEvent>,
}

impl RecordingScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stimuli(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ScreenEvent::Stimulus(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ScreenEvent::Notice(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Screen for RecordingScreen {
    fn show_stimulus(&mut self, text: &str) {
        self.events.push(ScreenEvent::Stimulus(text.to_string()));
    }

    fn show_blank(&mut self) {
        self.events.push(ScreenEvent::Blank);
    }

    fn show_feedback(&mut self, correct: bool) {
        self.events.push(ScreenEvent::Feedback(correct));
    }

    fn show_notice(&mut self, text: &str) {
        self.events.push(ScreenEvent::Notice(text.to_string()));
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Presents trials and owns the append-only record list
pub struct TrialRunner<S: Screen> {
    screen: S,
    keyboard: Keyboard,
    timing: TimingConfig,
    feedback: bool,
    records: Vec<OutcomeRecord>,
}

impl<S: Screen> TrialRunner<S> {
    pub fn new(screen: S, keyboard: Keyboard, config: &StudyConfig) -> Self {
        Self {
            screen,
            keyboard,
            timing: config.timing,
            feedback: config.practice.feedback,
            records: Vec::new(),
        }
    }

    /// Present one trial and record its outcome
    pub async fn present(&mut self, stimulus: &dyn Stimulus, block: Block) -> &OutcomeRecord {
        self.screen.show_stimulus(stimulus.text());
        let started = Instant::now();

        let response = {
            let mut capture = self.keyboard.capture();
            match self.timing.trial_timeout_ms {
                Some(ms) => tokio::select! {
                    key = capture.next_key() => key,
                    _ = sleep(Duration::from_millis(ms)) => None,
                },
                None => capture.next_key().await,
            }
        };

        let record = match response {
            Some((key, meaning)) => {
                let rt = started.elapsed().as_millis() as u64;
                OutcomeRecord::responded(stimulus, block, key, meaning, rt)
            }
            None => OutcomeRecord::timed_out(stimulus, block),
        };
        debug!(
            index = record.trial_index(),
            block = %block,
            rt_ms = ?record.reaction_time_ms(),
            "trial recorded"
        );

        if record.response_key().is_some() && self.timing.post_response_delay_ms > 0 {
            pause(self.timing.post_response_delay_ms).await;
        }
        if self.feedback {
            if let Some(correct) = record.correct() {
                self.screen.show_feedback(correct);
                pause(self.timing.feedback_ms).await;
            }
        }

        self.screen.show_blank();
        pause(self.iti_ms()).await;

        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// Present every item in order; returns the records just appended
    pub async fn run_all<T: Stimulus>(&mut self, items: &[T], block: Block) -> &[OutcomeRecord] {
        let start = self.records.len();
        for item in items {
            self.present(item, block).await;
        }
        &self.records[start..]
    }

    fn iti_ms(&self) -> u64 {
        let jitter = match self.timing.iti_jitter_ms {
            0 => 0,
            max => rand::thread_rng().gen_range(0..=max),
        };
        self.timing.iti_ms + jitter
    }

    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    /// Screen and records, consuming the runner
    pub fn into_parts(self) -> (S, Vec<OutcomeRecord>) {
        (self.screen, self.records)
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        sleep(Duration::from_millis(ms)).await;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PracticeItem, PracticeTrial};

    fn fast_config(timeout_ms: Option<u64>) -> StudyConfig {
        let mut config = StudyConfig::default();
        config.timing = TimingConfig {
            trial_timeout_ms: timeout_ms,
            iti_ms: 0,
            iti_jitter_ms: 0,
            feedback_ms: 0,
            post_response_delay_ms: 0,
        };
        config
    }

    fn item(text: &str, truth: bool) -> PracticeTrial {
        PracticeTrial {
            index: 0,
            item: PracticeItem::new(text, truth),
        }
    }

    #[tokio::test]
    async fn test_accepts_mapped_key_after_ignoring_others() {
        let config = fast_config(Some(2_000));
        let (tx, keyboard) = Keyboard::channel(config.keys);
        let mut runner = TrialRunner::new(RecordingScreen::new(), keyboard, &config);

        tokio::spawn(async move {
            sleep(Duration::from_millis(5)).await;
            let _ = tx.send('x');
            let _ = tx.send('J');
        });

        let record = runner.present(&item("Dogs are Animals", true), Block::Practice).await;
        assert_eq!(record.response_key(), Some('J'));
        assert_eq!(record.response_meaning(), Some(true));
        assert_eq!(record.correct(), Some(true));
        assert!(record.reaction_time_ms().unwrap_or(u64::MAX) < 2_000);
    }

    #[tokio::test]
    async fn test_timeout_records_no_response() {
        let config = fast_config(Some(20));
        let (_tx, keyboard) = Keyboard::channel(config.keys);
        let mut runner = TrialRunner::new(RecordingScreen::new(), keyboard, &config);

        let record = runner.present(&item("Fish are Mammals", false), Block::Practice).await;
        assert_eq!(record.response_key(), None);
        assert_eq!(record.reaction_time_ms(), None);
        assert_eq!(record.correct(), Some(false));
        assert_eq!(runner.records().len(), 1);
    }

    #[tokio::test]
    async fn test_keys_before_capture_are_discarded() {
        let config = fast_config(Some(20));
        let (tx, keyboard) = Keyboard::channel(config.keys);
        let mut runner = TrialRunner::new(RecordingScreen::new(), keyboard, &config);

        tx.send('j').unwrap();
        let record = runner.present(&item("Dogs are Animals", true), Block::Practice).await;
        assert_eq!(record.response_key(), None);
    }

    #[tokio::test]
    async fn test_no_timeout_waits_for_close() {
        let config = fast_config(None);
        let (tx, keyboard) = Keyboard::channel(config.keys);
        let mut runner = TrialRunner::new(RecordingScreen::new(), keyboard, &config);
        drop(tx);

        let record = runner.present(&item("Dogs are Animals", true), Block::Practice).await;
        assert_eq!(record.response_key(), None);
    }

    #[tokio::test]
    async fn test_feedback_shown_for_practice() {
        let config = fast_config(Some(20));
        let (_tx, keyboard) = Keyboard::channel(config.keys);
        let mut runner = TrialRunner::new(RecordingScreen::new(), keyboard, &config);

        runner.present(&item("Dogs are Animals", true), Block::Practice).await;
        assert_eq!(
            runner.screen().events,
            vec![
                ScreenEvent::Stimulus("Dogs are Animals".to_string()),
                ScreenEvent::Feedback(false),
                ScreenEvent::Blank,
            ]
        );
    }
}
