//! Core modules for stereoprobe

pub mod pool;
pub mod sampler;
pub mod sequence;
pub mod runner;
pub mod practice;
pub mod export;
pub mod transport;
pub mod session;

pub use pool::{default_catalog, load_catalog, StatementPool};
pub use sampler::{derive_counterpart, sample_without_replacement, AssembledSet, Sampler, SamplingReport};
pub use sequence::{is_valid, repair, try_satisfy, validate, RunTracker, SequenceBuilder, SequenceOutcome, SequenceStrategy, Violation};
pub use runner::{InputCapture, Keyboard, RecordingScreen, Screen, ScreenEvent, TerminalScreen, TrialRunner};
pub use practice::{transition, PracticeGate, PracticeOutcome};
pub use export::{checksum, parse_table, reassemble, to_table, ExportPayload, Summary, TableRow};
pub use transport::{deliver_or_keep, FormPostTransport, RenderTransport, Transport};
pub use session::{generate_session_id, Session, SessionOutcome, SessionPlan, SessionReport};
