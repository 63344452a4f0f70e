//! Timer queue - every recurring or deferred action in the simulation
//!
//! Timers are entries in a single priority queue ordered by fire time. The
//! queue is advanced once per tick and yields due events one at a time.
//! Scaled timers divide their base period by the global speed factor and are
//! rescaled in place when the factor changes; fixed timers run on plain tick
//! time.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

use crate::speed::effective_factor;
use crate::world::{AgentId, PatchId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What happens when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Hunger(AgentId),
    Thirst(AgentId),
    Energy(AgentId),
    Growth(PatchId),
    SpreadGrass,
    SpawnGrass,
    DayEnd,
    RemoveRemains(AgentId),
    ClearLabel(AgentId),
    EndMating { male: AgentId, female: AgentId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Base period divided by the (floored) speed factor.
    Scaled,
    /// Base period in tick seconds, ignores the speed factor.
    Fixed,
}

#[derive(Debug, Clone)]
struct Timer {
    event: TimerEvent,
    period: f64,
    repeating: bool,
    pace: Pace,
    fire_at: f64,
    generation: u32,
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    fire_at: f64,
    seq: u64,
    id: TimerId,
    generation: u32,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .total_cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

pub struct TimerQueue {
    now: f64,
    next_id: u64,
    next_seq: u64,
    timers: BTreeMap<TimerId, Timer>,
    queue: BinaryHeap<Reverse<QueueEntry>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_id: 0,
            next_seq: 0,
            timers: BTreeMap::new(),
            queue: BinaryHeap::new(),
        }
    }

    /// Elapsed tick time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn advance(&mut self, dt_seconds: f64) {
        self.now += dt_seconds.max(0.0);
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn schedule_repeating(
        &mut self,
        event: TimerEvent,
        period: f64,
        pace: Pace,
        speed: f32,
    ) -> TimerId {
        self.insert(event, period, true, pace, speed)
    }

    pub fn schedule_once(
        &mut self,
        event: TimerEvent,
        delay: f64,
        pace: Pace,
        speed: f32,
    ) -> TimerId {
        self.insert(event, delay, false, pace, speed)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Restarts a timer from now with its full base period.
    pub fn restart(&mut self, id: TimerId, speed: f32) {
        let now = self.now;
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.fire_at = now + wait_for(timer.period, timer.pace, speed);
            timer.generation += 1;
            let entry = QueueEntry {
                fire_at: timer.fire_at,
                seq: self.next_seq,
                id,
                generation: timer.generation,
            };
            self.next_seq += 1;
            self.queue.push(Reverse(entry));
        }
    }

    /// Seconds until the timer fires, if it is still pending.
    pub fn remaining(&self, id: TimerId) -> Option<f64> {
        self.timers
            .get(&id)
            .map(|timer| (timer.fire_at - self.now).max(0.0))
    }

    /// Pops the next due event. Repeating timers are re-armed from their
    /// previous fire time using the current factor.
    pub fn pop_due(&mut self, speed: f32) -> Option<TimerEvent> {
        loop {
            let Reverse(entry) = *self.queue.peek()?;
            if entry.fire_at > self.now {
                return None;
            }
            self.queue.pop();

            let Some(timer) = self.timers.get_mut(&entry.id) else {
                continue;
            };
            if timer.generation != entry.generation {
                continue;
            }

            let event = timer.event;
            if timer.repeating {
                timer.fire_at = entry.fire_at + wait_for(timer.period, timer.pace, speed);
                timer.generation += 1;
                let next = QueueEntry {
                    fire_at: timer.fire_at,
                    seq: self.next_seq,
                    id: entry.id,
                    generation: timer.generation,
                };
                self.next_seq += 1;
                self.queue.push(Reverse(next));
            } else {
                self.timers.remove(&entry.id);
            }
            return Some(event);
        }
    }

    /// Rescales the remaining wait of every scaled timer by `old / new`, so
    /// progress made under the old factor is kept.
    pub fn rescale(&mut self, old_speed: f32, new_speed: f32) {
        let ratio = effective_factor(old_speed) as f64 / effective_factor(new_speed) as f64;
        let now = self.now;
        for (id, timer) in self.timers.iter_mut() {
            if timer.pace != Pace::Scaled {
                continue;
            }
            let remaining = (timer.fire_at - now).max(0.0);
            timer.fire_at = now + remaining * ratio;
            timer.generation += 1;
            self.queue.push(Reverse(QueueEntry {
                fire_at: timer.fire_at,
                seq: self.next_seq,
                id: *id,
                generation: timer.generation,
            }));
            self.next_seq += 1;
        }
    }

    fn insert(
        &mut self,
        event: TimerEvent,
        period: f64,
        repeating: bool,
        pace: Pace,
        speed: f32,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let fire_at = self.now + wait_for(period, pace, speed);
        self.timers.insert(
            id,
            Timer {
                event,
                period,
                repeating,
                pace,
                fire_at,
                generation: 0,
            },
        );
        self.queue.push(Reverse(QueueEntry {
            fire_at,
            seq: self.next_seq,
            id,
            generation: 0,
        }));
        self.next_seq += 1;
        id
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn wait_for(period: f64, pace: Pace, speed: f32) -> f64 {
    // A zero period would re-arm at the same instant forever.
    let period = period.max(1e-6);
    match pace {
        Pace::Scaled => period / effective_factor(speed) as f64,
        Pace::Fixed => period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut TimerQueue, speed: f32) -> Vec<TimerEvent> {
        let mut fired = Vec::new();
        while let Some(event) = queue.pop_due(speed) {
            fired.push(event);
        }
        fired
    }

    #[test]
    fn test_repeating_timer_fires_each_period() {
        let mut queue = TimerQueue::new();
        queue.schedule_repeating(TimerEvent::SpreadGrass, 2.0, Pace::Scaled, 1.0);

        queue.advance(1.5);
        assert!(drain(&mut queue, 1.0).is_empty());

        queue.advance(0.5);
        assert_eq!(drain(&mut queue, 1.0), vec![TimerEvent::SpreadGrass]);

        queue.advance(4.0);
        assert_eq!(drain(&mut queue, 1.0).len(), 2);
    }

    #[test]
    fn test_scaled_period_divides_by_speed() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_repeating(TimerEvent::DayEnd, 240.0, Pace::Scaled, 4.0);
        assert_eq!(queue.remaining(id), Some(60.0));
    }

    #[test]
    fn test_fixed_pace_ignores_speed() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_once(TimerEvent::SpawnGrass, 2.0, Pace::Fixed, 20.0);
        assert_eq!(queue.remaining(id), Some(2.0));

        queue.rescale(20.0, 1.0);
        assert_eq!(queue.remaining(id), Some(2.0));
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_once(TimerEvent::SpawnGrass, 1.0, Pace::Scaled, 1.0);
        queue.advance(5.0);
        assert_eq!(drain(&mut queue, 1.0), vec![TimerEvent::SpawnGrass]);
        assert!(!queue.is_pending(id));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_rescale_keeps_progress() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_repeating(TimerEvent::SpreadGrass, 10.0, Pace::Scaled, 1.0);

        queue.advance(4.0);
        queue.rescale(1.0, 2.0);
        assert_eq!(queue.remaining(id), Some(3.0));

        queue.advance(2.9);
        assert!(drain(&mut queue, 2.0).is_empty());
        queue.advance(0.2);
        assert_eq!(drain(&mut queue, 2.0), vec![TimerEvent::SpreadGrass]);

        // Next period uses the new factor.
        let remaining = queue.remaining(id).unwrap();
        assert!((remaining - 4.9).abs() < 1e-9, "remaining was {remaining}");
    }

    #[test]
    fn test_cancel_drops_stale_entries() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_repeating(TimerEvent::SpreadGrass, 1.0, Pace::Scaled, 1.0);
        assert!(queue.cancel(id));
        queue.advance(3.0);
        assert!(drain(&mut queue, 1.0).is_empty());
        assert!(!queue.cancel(id));
    }

    #[test]
    fn test_restart_resets_from_now() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_repeating(TimerEvent::SpreadGrass, 5.0, Pace::Scaled, 1.0);
        queue.advance(4.0);
        queue.restart(id, 1.0);
        assert_eq!(queue.remaining(id), Some(5.0));

        queue.advance(1.5);
        assert!(drain(&mut queue, 1.0).is_empty());
    }

    #[test]
    fn test_simultaneous_timers_fire_in_schedule_order() {
        let mut queue = TimerQueue::new();
        queue.schedule_once(TimerEvent::SpawnGrass, 1.0, Pace::Fixed, 1.0);
        queue.schedule_once(TimerEvent::SpreadGrass, 1.0, Pace::Fixed, 1.0);
        queue.schedule_once(TimerEvent::DayEnd, 0.5, Pace::Fixed, 1.0);
        queue.advance(1.0);
        assert_eq!(
            drain(&mut queue, 1.0),
            vec![
                TimerEvent::DayEnd,
                TimerEvent::SpawnGrass,
                TimerEvent::SpreadGrass
            ]
        );
    }
}
