//! Draw machine: runs a [`DrawSession`] on a scheduler.
//!
//! One spin cycle is a chain of delayed steps, each holding the single pending
//! timer handle:
//!
//! 1. spin ticks (cursor moves, interval lengthens near the end)
//! 2. settle pause, then the landed candidate is announced
//! 3. rounds 1-2: elimination flag shown, candidate moved after `announce_delay`,
//!    flag cleared after `cooldown_delay`
//! 4. final round: winner declared and celebrated, no further spins
//!
//! Closing or resetting cancels the pending handle and bumps a generation
//! counter so a callback that already fired cannot touch the fresh session.

use crate::logic::celebration::{CelebrationTrigger, Effects, NoEffects};
use crate::logic::resolver::{PredeterminedWinner, WinnerIdSource};
use crate::logic::round::{DrawError, DrawSession, Resolution};
use crate::logic::scheduler::{Scheduler, TaskHandle};
use crate::logic::spin::{SpinAnimator, SpinStep, SpinTiming};
use crate::models::{Candidate, DrawSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Delays between the steps of one spin cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawTiming {
    pub spin: SpinTiming,
    /// After the cursor lands, before the result is announced.
    pub settle_delay: Duration,
    /// How long the "being eliminated" flag shows before the candidate is removed.
    pub announce_delay: Duration,
    /// After removal, before the flag clears and the next round can start.
    pub cooldown_delay: Duration,
    /// Length of the continuous confetti shower for the winner.
    pub shower_duration: Duration,
}

impl Default for DrawTiming {
    fn default() -> Self {
        Self {
            spin: SpinTiming::default(),
            settle_delay: Duration::from_millis(1000),
            announce_delay: Duration::from_millis(1500),
            cooldown_delay: Duration::from_millis(1000),
            shower_duration: Duration::from_secs(3),
        }
    }
}

/// Called once with the declared winner.
pub type WinnerCallback = Box<dyn Fn(&Candidate) + Send + Sync>;

#[derive(Clone, Copy, Debug)]
enum Step {
    Tick,
    Settle,
    Eliminate,
    Cooldown,
}

struct Inner {
    session: DrawSession,
    visible: bool,
    predetermined: PredeterminedWinner,
    rng: StdRng,
    spin: Option<SpinAnimator>,
    pending: Option<TaskHandle>,
    generation: u64,
}

impl Inner {
    fn teardown(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
        self.spin = None;
        self.generation += 1;
    }
}

struct Shared {
    inner: Mutex<Inner>,
    scheduler: Arc<dyn Scheduler>,
    celebration: CelebrationTrigger,
    timing: DrawTiming,
    on_winner: Option<WinnerCallback>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule(self: &Arc<Self>, inner: &mut Inner, delay: Duration, step: Step) {
        let weak: Weak<Shared> = Arc::downgrade(self);
        let generation = inner.generation;
        let handle = self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.run(generation, step);
                }
            }),
        );
        inner.pending = Some(handle);
    }

    fn run(self: &Arc<Self>, generation: u64, step: Step) {
        let announced = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if inner.generation != generation {
                log::debug!("Dropping stale draw step {step:?}");
                return;
            }
            inner.pending = None;
            match step {
                Step::Tick => {
                    inner.session.advance_cursor();
                    let next = inner
                        .spin
                        .as_mut()
                        .map_or(SpinStep::Landed, SpinAnimator::tick);
                    match next {
                        SpinStep::Continue(delay) => self.schedule(inner, delay, Step::Tick),
                        SpinStep::Landed => {
                            inner.spin = None;
                            inner.session.land();
                            self.schedule(inner, self.timing.settle_delay, Step::Settle);
                        }
                    }
                    None
                }
                Step::Settle => {
                    let resolution = inner.session.resolve();
                    if let Some(Resolution::Eliminating(_)) = resolution {
                        self.schedule(inner, self.timing.announce_delay, Step::Eliminate);
                    }
                    resolution
                }
                Step::Eliminate => {
                    if let Some(out) = inner.session.commit_elimination() {
                        log::info!(
                            "Eliminated {} ({} remaining)",
                            out.full_name,
                            inner.session.remaining().len()
                        );
                    }
                    self.schedule(inner, self.timing.cooldown_delay, Step::Cooldown);
                    None
                }
                Step::Cooldown => {
                    inner.session.finish_cooldown();
                    None
                }
            }
        };

        // Effects and the winner callback run without the lock held.
        match announced {
            Some(Resolution::Eliminating(_)) => self.celebration.elimination(),
            Some(Resolution::Winner(winner)) => {
                log::info!("Winner: {} <{}>", winner.full_name, winner.email);
                self.celebration.winner();
                if let Some(on_winner) = &self.on_winner {
                    on_winner(&winner);
                }
            }
            None => {}
        }
    }
}

/// Configures a [`DrawMachine`].
pub struct DrawMachineBuilder {
    candidates: Vec<Candidate>,
    scheduler: Arc<dyn Scheduler>,
    effects: Arc<dyn Effects>,
    timing: DrawTiming,
    rng: Option<StdRng>,
    on_winner: Option<WinnerCallback>,
}

impl DrawMachineBuilder {
    pub fn effects(mut self, effects: Arc<dyn Effects>) -> Self {
        self.effects = effects;
        self
    }

    pub fn timing(mut self, timing: DrawTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Reproducible draws (tests, demos).
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn on_winner(mut self, callback: impl Fn(&Candidate) + Send + Sync + 'static) -> Self {
        self.on_winner = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> DrawMachine {
        let inner = Inner {
            session: DrawSession::new(self.candidates),
            visible: false,
            predetermined: PredeterminedWinner::none(),
            rng: self.rng.unwrap_or_else(StdRng::from_entropy),
            spin: None,
            pending: None,
            generation: 0,
        };
        DrawMachine {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                scheduler: self.scheduler,
                celebration: CelebrationTrigger::new(self.effects, self.timing.shower_duration),
                timing: self.timing,
                on_winner: self.on_winner,
            }),
        }
    }
}

/// Elimination draw over a fixed candidate list. Hidden until [`DrawMachine::open`].
pub struct DrawMachine {
    shared: Arc<Shared>,
}

impl DrawMachine {
    pub fn builder(candidates: Vec<Candidate>, scheduler: Arc<dyn Scheduler>) -> DrawMachineBuilder {
        DrawMachineBuilder {
            candidates,
            scheduler,
            effects: Arc::new(NoEffects),
            timing: DrawTiming::default(),
            rng: None,
            on_winner: None,
        }
    }

    /// Show the draw: fetch the predetermined winner once, then start a fresh session.
    pub async fn open(&self, source: &dyn WinnerIdSource) {
        let predetermined = PredeterminedWinner::fetch(source).await;
        self.show(predetermined);
    }

    /// Show the draw with an already resolved predetermined winner.
    pub fn show(&self, predetermined: PredeterminedWinner) {
        let mut inner = self.shared.lock();
        inner.teardown();
        inner.session.reset();
        inner.predetermined = predetermined;
        inner.visible = true;
        log::info!(
            "Draw opened with {} candidates",
            inner.session.candidates().len()
        );
    }

    /// Hide the draw. Discards the session and any pending timer.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        inner.teardown();
        inner.session.reset();
        inner.visible = false;
        log::info!("Draw closed");
    }

    /// Same as toggling visibility: `false` closes, `true` reopens without refetching.
    pub fn set_visible(&self, visible: bool) {
        if visible {
            let predetermined = self.shared.lock().predetermined.clone();
            self.show(predetermined);
        } else {
            self.close();
        }
    }

    /// Back to round 1 with every candidate remaining, from any phase.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        inner.teardown();
        inner.session.reset();
    }

    /// Start the next spin. Rejected requests change nothing.
    pub fn try_start(&self) -> Result<(), DrawError> {
        let mut guard = self.shared.lock();
        let inner = &mut *guard;
        if !inner.visible {
            return Err(DrawError::Hidden);
        }
        inner.session.check_start()?;
        let target = inner
            .session
            .select(&inner.predetermined, &mut inner.rng)
            .ok_or(DrawError::NoCandidates)?;
        inner.session.begin_spin(target)?;
        let spin = SpinAnimator::new(&self.shared.timing.spin, &mut inner.rng);
        let first_tick = spin.interval();
        inner.spin = Some(spin);
        self.shared.schedule(inner, first_tick, Step::Tick);
        Ok(())
    }

    /// [`DrawMachine::try_start`] as a plain "did it start" flag.
    pub fn start_draw(&self) -> bool {
        match self.try_start() {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Start ignored: {e}");
                false
            }
        }
    }

    pub fn snapshot(&self) -> DrawSnapshot {
        let inner = self.shared.lock();
        inner.session.snapshot(inner.visible)
    }

    pub fn is_visible(&self) -> bool {
        self.shared.lock().visible
    }

    /// Whether a timer step is waiting to run.
    pub fn has_pending_timer(&self) -> bool {
        self.shared
            .lock()
            .pending
            .as_ref()
            .is_some_and(|h| !h.is_cancelled())
    }
}

impl Drop for DrawMachine {
    fn drop(&mut self) {
        self.shared.lock().teardown();
    }
}
