//! Confetti and haptic cues fired on draw transitions. Fire-and-forget: a failing
//! effect sink never reaches the state machine.

use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Vibration pattern (on/off milliseconds) played on eliminations and on the win.
pub const HAPTIC_PATTERN_MS: [u64; 3] = [100, 50, 100];

/// One visual or haptic effect for the presentation layer to play.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectCue {
    /// Layered confetti explosions (center, wide, both sides, final rain).
    LayeredBurst,
    /// Continuous light confetti for the given time.
    Shower { duration_ms: u64 },
    /// Device vibration, best effort.
    Vibrate { pattern_ms: Vec<u64> },
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EffectError {
    #[error("effect capability unavailable: {0}")]
    Unavailable(String),
}

/// Something that can play effect cues.
pub trait Effects: Send + Sync {
    fn play(&self, cue: &EffectCue) -> Result<(), EffectError>;
}

/// Discards every cue.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEffects;

impl Effects for NoEffects {
    fn play(&self, _cue: &EffectCue) -> Result<(), EffectError> {
        Ok(())
    }
}

/// A cue with its position in the log.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LoggedCue {
    pub seq: u64,
    #[serde(flatten)]
    pub cue: EffectCue,
}

/// Records cues so a remote client can replay them (`since` the last one it saw).
#[derive(Debug, Default)]
pub struct EffectLog {
    cues: Mutex<Vec<LoggedCue>>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cues with `seq > after`, oldest first.
    pub fn since(&self, after: u64) -> Vec<LoggedCue> {
        self.cues
            .lock()
            .map(|cues| cues.iter().filter(|c| c.seq > after).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cues.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Effects for EffectLog {
    fn play(&self, cue: &EffectCue) -> Result<(), EffectError> {
        let mut cues = self
            .cues
            .lock()
            .map_err(|_| EffectError::Unavailable("effect log poisoned".into()))?;
        let seq = cues.len() as u64 + 1;
        cues.push(LoggedCue {
            seq,
            cue: cue.clone(),
        });
        Ok(())
    }
}

/// Fires the celebration sequences, swallowing sink failures.
pub struct CelebrationTrigger {
    effects: std::sync::Arc<dyn Effects>,
    shower: Duration,
}

impl CelebrationTrigger {
    pub fn new(effects: std::sync::Arc<dyn Effects>, shower: Duration) -> Self {
        Self { effects, shower }
    }

    /// Winner declared: full burst, continuous shower, vibration.
    pub fn winner(&self) {
        self.fire(EffectCue::LayeredBurst);
        self.fire(EffectCue::Shower {
            duration_ms: self.shower.as_millis() as u64,
        });
        self.fire(EffectCue::Vibrate {
            pattern_ms: HAPTIC_PATTERN_MS.to_vec(),
        });
    }

    /// Candidate flagged for elimination: vibration only.
    pub fn elimination(&self) {
        self.fire(EffectCue::Vibrate {
            pattern_ms: HAPTIC_PATTERN_MS.to_vec(),
        });
    }

    fn fire(&self, cue: EffectCue) {
        if let Err(e) = self.effects.play(&cue) {
            log::debug!("Ignoring failed effect {cue:?}: {e}");
        }
    }
}

impl std::fmt::Debug for CelebrationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CelebrationTrigger")
            .field("shower", &self.shower)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Broken;

    impl Effects for Broken {
        fn play(&self, _cue: &EffectCue) -> Result<(), EffectError> {
            Err(EffectError::Unavailable("no canvas".into()))
        }
    }

    #[test]
    fn winner_fires_burst_shower_and_vibration() {
        let log = Arc::new(EffectLog::new());
        let trigger = CelebrationTrigger::new(log.clone(), Duration::from_secs(3));
        trigger.winner();
        let cues: Vec<_> = log.since(0).into_iter().map(|c| c.cue).collect();
        assert_eq!(
            cues,
            vec![
                EffectCue::LayeredBurst,
                EffectCue::Shower { duration_ms: 3000 },
                EffectCue::Vibrate {
                    pattern_ms: vec![100, 50, 100]
                },
            ]
        );
        assert_eq!(log.since(2).len(), 1);
    }

    #[test]
    fn failing_sink_is_swallowed() {
        let trigger = CelebrationTrigger::new(Arc::new(Broken), Duration::from_secs(3));
        trigger.winner();
        trigger.elimination();
    }
}
