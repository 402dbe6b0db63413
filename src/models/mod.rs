//! Data structures for the raffle: candidates, the registry, and draw session views.

mod candidate;
mod draw;
mod registry;

pub use candidate::{Candidate, CandidateId};
pub use draw::{DrawPhase, DrawSnapshot, DrawStage, DrawStats, SlotView, TOTAL_ROUNDS};
pub use registry::{Registration, RegistrationError, Registry};
