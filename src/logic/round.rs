//! Round/elimination state machine, free of timers.
//!
//! `Idle -> Spinning -> Settling -> EliminationAnnounce -> Cooldown -> Idle` for
//! rounds 1 and 2, `Idle -> Spinning -> Settling -> Finished` for the final round.
//! [`crate::logic::DrawMachine`] drives these transitions on a scheduler; tests
//! can drive them directly.

use crate::logic::resolver::PredeterminedWinner;
use crate::logic::selection::{self, Selection};
use crate::logic::slots::{slot_window, VISIBLE_SLOTS};
use crate::models::{Candidate, DrawPhase, DrawSnapshot, DrawStage, DrawStats, TOTAL_ROUNDS};
use rand::Rng;
use thiserror::Error;

/// Why a spin could not start.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum DrawError {
    #[error("No candidates left to draw from")]
    NoCandidates,
    #[error("A spin is already in progress ({0:?})")]
    Busy(DrawPhase),
    #[error("The draw already has a winner")]
    Finished,
    #[error("The draw is not open")]
    Hidden,
}

/// What a landed spin means for the round.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    Eliminating(Candidate),
    Winner(Candidate),
}

/// Mutable state of one draw run.
#[derive(Clone, Debug)]
pub struct DrawSession {
    source: Vec<Candidate>,
    remaining: Vec<Candidate>,
    eliminated: Vec<Candidate>,
    round: u8,
    cursor: usize,
    phase: DrawPhase,
    target: Option<Selection>,
    eliminating: Option<Candidate>,
    winner: Option<Candidate>,
}

impl DrawSession {
    /// Fresh session over a copy of `candidates`.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            remaining: candidates.clone(),
            source: candidates,
            eliminated: Vec::new(),
            round: 1,
            cursor: 0,
            phase: DrawPhase::Idle,
            target: None,
            eliminating: None,
            winner: None,
        }
    }

    /// Back to the initial shape, whatever the current phase.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.source));
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.source
    }

    pub fn remaining(&self) -> &[Candidate] {
        &self.remaining
    }

    pub fn eliminated(&self) -> &[Candidate] {
        &self.eliminated
    }

    pub fn round(&self) -> u8 {
        self.round
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    pub fn winner(&self) -> Option<&Candidate> {
        self.winner.as_ref()
    }

    pub fn eliminating(&self) -> Option<&Candidate> {
        self.eliminating.as_ref()
    }

    /// Landing target of the spin in flight.
    pub fn target(&self) -> Option<&Selection> {
        self.target.as_ref()
    }

    /// Highlighted index, `None` when nobody is left.
    pub fn cursor(&self) -> Option<usize> {
        (!self.remaining.is_empty()).then_some(self.cursor)
    }

    pub fn highlighted(&self) -> Option<&Candidate> {
        self.cursor().map(|i| &self.remaining[i])
    }

    /// The last round, or the only candidate left (rounds collapse).
    pub fn is_final_round(&self) -> bool {
        self.round >= TOTAL_ROUNDS || self.remaining.len() <= 1
    }

    pub fn check_start(&self) -> Result<(), DrawError> {
        match self.phase {
            DrawPhase::Finished => Err(DrawError::Finished),
            phase if phase.is_busy() => Err(DrawError::Busy(phase)),
            _ if self.remaining.is_empty() => Err(DrawError::NoCandidates),
            _ => Ok(()),
        }
    }

    pub fn can_start(&self) -> bool {
        self.check_start().is_ok()
    }

    /// Decide where the next spin lands.
    pub fn select<R: Rng + ?Sized>(
        &self,
        predetermined: &PredeterminedWinner,
        rng: &mut R,
    ) -> Option<Selection> {
        selection::select_for_round(
            &self.remaining,
            self.is_final_round(),
            predetermined.id(),
            rng,
        )
    }

    /// `Idle -> Spinning` with a pre-decided landing target.
    pub fn begin_spin(&mut self, target: Selection) -> Result<(), DrawError> {
        self.check_start()?;
        if target.index >= self.remaining.len() {
            return Err(DrawError::NoCandidates);
        }
        log::debug!(
            "Round {}: spinning over {} candidates",
            self.round,
            self.remaining.len()
        );
        self.target = Some(target);
        self.phase = DrawPhase::Spinning;
        Ok(())
    }

    /// One animation tick: move the highlight down by one.
    pub fn advance_cursor(&mut self) {
        if self.phase == DrawPhase::Spinning && !self.remaining.is_empty() {
            self.cursor = (self.cursor + 1) % self.remaining.len();
        }
    }

    /// `Spinning -> Settling`, snapping the cursor to the target.
    pub fn land(&mut self) {
        if self.phase != DrawPhase::Spinning {
            return;
        }
        if let Some(target) = &self.target {
            self.cursor = target.index;
        }
        self.phase = DrawPhase::Settling;
    }

    /// Announce the landed candidate: elimination for early rounds, winner for the last.
    pub fn resolve(&mut self) -> Option<Resolution> {
        if self.phase != DrawPhase::Settling {
            return None;
        }
        let target = self.target.take()?;
        if self.is_final_round() {
            log::debug!("Round {}: winner {}", self.round, target.candidate.id);
            self.round = TOTAL_ROUNDS;
            self.winner = Some(target.candidate.clone());
            self.phase = DrawPhase::Finished;
            Some(Resolution::Winner(target.candidate))
        } else {
            log::debug!("Round {}: eliminating {}", self.round, target.candidate.id);
            self.eliminating = Some(target.candidate.clone());
            self.phase = DrawPhase::EliminationAnnounce;
            Some(Resolution::Eliminating(target.candidate))
        }
    }

    /// `EliminationAnnounce -> Cooldown`: move the flagged candidate and advance the round.
    pub fn commit_elimination(&mut self) -> Option<Candidate> {
        if self.phase != DrawPhase::EliminationAnnounce {
            return None;
        }
        let flagged = self.eliminating.clone()?;
        let idx = self.remaining.iter().position(|c| c.id == flagged.id)?;
        let removed = self.remaining.remove(idx);
        self.eliminated.push(removed.clone());
        self.round = (self.round + 1).min(TOTAL_ROUNDS);
        if self.remaining.is_empty() {
            self.cursor = 0;
        } else {
            self.cursor %= self.remaining.len();
        }
        self.phase = DrawPhase::Cooldown;
        Some(removed)
    }

    /// `Cooldown -> Idle`.
    pub fn finish_cooldown(&mut self) {
        if self.phase == DrawPhase::Cooldown {
            self.eliminating = None;
            self.phase = DrawPhase::Idle;
        }
    }

    pub fn stage(&self) -> DrawStage {
        match self.phase {
            DrawPhase::Spinning => DrawStage::Spinning,
            DrawPhase::Finished => DrawStage::Completed,
            _ if self.is_final_round() => DrawStage::FinalRound,
            _ => DrawStage::Elimination,
        }
    }

    pub fn stats(&self) -> DrawStats {
        let progress_percentage = if self.phase == DrawPhase::Finished {
            100.0
        } else {
            f64::from(self.round - 1) / f64::from(TOTAL_ROUNDS) * 100.0
        };
        DrawStats {
            total_participants: self.source.len(),
            remaining_count: self.remaining.len(),
            eliminated_count: self.eliminated.len(),
            current_round: self.round,
            total_rounds: TOTAL_ROUNDS,
            progress_percentage,
        }
    }

    pub fn snapshot(&self, visible: bool) -> DrawSnapshot {
        let announcing = matches!(
            self.phase,
            DrawPhase::EliminationAnnounce | DrawPhase::Cooldown
        );
        DrawSnapshot {
            visible,
            phase: self.phase,
            stage: self.stage(),
            round: self.round,
            is_spinning: self.phase == DrawPhase::Spinning,
            show_result: self.phase == DrawPhase::Finished,
            show_sad_emojis: announcing,
            is_elimination_phase: announcing,
            can_start: visible && self.can_start(),
            cursor: self.cursor(),
            highlighted: self.highlighted().cloned(),
            remaining: self.remaining.clone(),
            eliminated: self.eliminated.clone(),
            eliminating: self.eliminating.clone(),
            winner: self.winner.clone(),
            slots: slot_window(&self.remaining, self.cursor, VISIBLE_SLOTS),
            stats: self.stats(),
        }
    }
}
