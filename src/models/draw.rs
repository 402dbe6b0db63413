//! Draw session view types: phase, stage, slot cells and the read-only snapshot.

use crate::models::candidate::Candidate;
use serde::Serialize;

/// Rounds per draw. Rounds before the last eliminate one candidate each.
pub const TOTAL_ROUNDS: u8 = 3;

/// Current step of the round/elimination state machine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawPhase {
    /// Waiting for the next start.
    #[default]
    Idle,
    /// Spin animation running.
    Spinning,
    /// Cursor landed on the selected candidate; result not announced yet.
    Settling,
    /// Selected candidate is flagged as "being eliminated".
    EliminationAnnounce,
    /// Candidate already moved to `eliminated`; flag still shown.
    Cooldown,
    /// Winner declared. Terminal for the session.
    Finished,
}

impl DrawPhase {
    /// True while a spin cycle is in flight (start requests are rejected).
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            DrawPhase::Spinning
                | DrawPhase::Settling
                | DrawPhase::EliminationAnnounce
                | DrawPhase::Cooldown
        )
    }
}

/// Coarse status for headings and the main button.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawStage {
    Spinning,
    Completed,
    FinalRound,
    Elimination,
}

/// One cell of the slot window.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub candidate: Candidate,
    pub is_center: bool,
    /// Position relative to the cursor (negative above, positive below).
    pub offset: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawStats {
    pub total_participants: usize,
    pub remaining_count: usize,
    pub eliminated_count: usize,
    pub current_round: u8,
    pub total_rounds: u8,
    pub progress_percentage: f64,
}

/// Everything the presentation layer needs to render a draw, at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawSnapshot {
    pub visible: bool,
    pub phase: DrawPhase,
    pub stage: DrawStage,
    pub round: u8,
    pub is_spinning: bool,
    pub show_result: bool,
    pub show_sad_emojis: bool,
    pub is_elimination_phase: bool,
    pub can_start: bool,
    pub cursor: Option<usize>,
    pub highlighted: Option<Candidate>,
    pub remaining: Vec<Candidate>,
    pub eliminated: Vec<Candidate>,
    pub eliminating: Option<Candidate>,
    pub winner: Option<Candidate>,
    pub slots: Vec<SlotView>,
    pub stats: DrawStats,
}
