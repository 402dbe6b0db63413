//! Raffle draw web app: library with models, configuration and the elimination draw.

pub mod config;
pub mod logic;
pub mod models;

pub use config::{AppConfig, ConfigError};
pub use logic::{
    CelebrationTrigger, DrawError, DrawMachine, DrawSession, DrawTiming, EffectCue, EffectLog,
    ManualScheduler, PredeterminedWinner, Scheduler, Selection, StaticWinnerSource,
    TokioScheduler, WinnerIdSource,
};
pub use models::{
    Candidate, CandidateId, DrawPhase, DrawSnapshot, DrawStage, Registration, RegistrationError,
    Registry, SlotView, TOTAL_ROUNDS,
};
