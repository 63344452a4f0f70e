mod behavior;
mod lifecycle;
pub(crate) mod mating;
pub(crate) mod needs;
mod speed_schedule;
mod timers;
pub(crate) mod vegetation;

pub use behavior::{pick_wander_target, BehaviorSystem};
pub use lifecycle::LifecycleSystem;
pub use speed_schedule::{SpeedChangeAt, SpeedScheduleSystem};
pub use timers::TimerSystem;
pub use vegetation::spread_candidates;
