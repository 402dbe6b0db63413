//! Draw logic: selection, spin pacing, the round state machine and the timer-driven machine.

mod celebration;
mod machine;
mod resolver;
mod round;
mod scheduler;
mod selection;
mod slots;
mod spin;

pub use celebration::{
    CelebrationTrigger, EffectCue, EffectError, EffectLog, Effects, LoggedCue, NoEffects,
    HAPTIC_PATTERN_MS,
};
pub use machine::{DrawMachine, DrawMachineBuilder, DrawTiming, WinnerCallback};
pub use resolver::{NoWinnerSource, PredeterminedWinner, StaticWinnerSource, WinnerIdSource};
pub use round::{DrawError, DrawSession, Resolution};
pub use scheduler::{ManualScheduler, Scheduler, Task, TaskHandle, TokioScheduler};
pub use selection::{pick_uniform, select_for_round, Selection};
pub use slots::{slot_window, VISIBLE_SLOTS};
pub use spin::{SpinAnimator, SpinStep, SpinTiming};
