//! Core types for stereoprobe

mod statement;
mod trial;
mod practice;
mod reason;
mod config;
mod error;

pub use statement::{Party, Category, SubjectNouns, CatalogEntry, Statement, SentenceParts};
pub use trial::{Block, Stimulus, TrialSpec, PracticeItem, PracticeTrial, OutcomeRecord};
pub use practice::{PracticeState, GatePhase, PassEvaluation};
pub use reason::ReasonCode;
pub use config::{
    StudyConfig, SamplingConfig, SequenceConfig, PracticeConfig, KeyConfig, TimingConfig,
    ExportConfig, PerParty,
};
pub use error::{PoolError, SampleError, ConfigError, ExportError, TransportError, StudyError};
