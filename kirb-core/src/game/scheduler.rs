//! Timed Callbacks
//!
//! Deferred actions keyed by owner entity and fired on a future tick.
//! Replaces suspended "wait, then continue" sequences: an action that
//! must happen later is queued here and executed by the tick loop.
//!
//! Destroying an owner cancels its timers (see `World::destroy`).

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::game::enemy::EnemyStateLabel;
use crate::game::entity::EntityId;
use crate::game::map::SpawnPoint;

/// Handle to a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

/// What happens when a timer fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAction {
    /// Timed state-chart transition of the owning enemy
    EnterEnemyState(EnemyStateLabel),
    /// Return the owning player to the idle animation
    PlayIdleAnimation,
    /// Spawn a flyer at a level spawn point
    SpawnFlyer {
        /// Spawn point in level space
        origin: SpawnPoint,
    },
}

#[derive(Clone, Debug)]
struct Timer {
    id: TimerId,
    owner: Option<EntityId>,
    action: TimerAction,
    interval: Option<u32>,
}

/// A timer whose fire tick has been reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DueTimer {
    /// Timer handle
    pub id: TimerId,
    /// Owning entity (None for level-wide timers)
    pub owner: Option<EntityId>,
    /// Action to run
    pub action: TimerAction,
}

/// Tick-ordered timer queue.
///
/// Keyed by (fire tick, timer id) so timers due on the same tick fire
/// in scheduling order.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    queue: BTreeMap<(u32, TimerId), Timer>,
    next_id: u64,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Fire `action` once, `delay` ticks after `now`.
    pub fn schedule(
        &mut self,
        owner: Option<EntityId>,
        now: u32,
        delay: u32,
        action: TimerAction,
    ) -> TimerId {
        let id = self.allocate_id();
        self.queue.insert(
            (now.saturating_add(delay), id),
            Timer { id, owner, action, interval: None },
        );
        id
    }

    /// Fire `action` every `interval` ticks, first at `now + interval`.
    pub fn schedule_repeating(
        &mut self,
        owner: Option<EntityId>,
        now: u32,
        interval: u32,
        action: TimerAction,
    ) -> TimerId {
        let interval = interval.max(1);
        let id = self.allocate_id();
        self.queue.insert(
            (now.saturating_add(interval), id),
            Timer { id, owner, action, interval: Some(interval) },
        );
        id
    }

    /// Remove and return every timer due at or before `now`.
    ///
    /// Repeating timers are re-queued for their next period.
    pub fn take_due(&mut self, now: u32) -> Vec<DueTimer> {
        let mut due = Vec::new();

        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((fire_tick, _), timer) = entry.remove_entry();

            due.push(DueTimer {
                id: timer.id,
                owner: timer.owner,
                action: timer.action.clone(),
            });

            // A period that runs past the last tick is dropped
            if let Some(next) = timer.interval.and_then(|interval| fire_tick.checked_add(interval)) {
                self.queue.insert((next, timer.id), timer);
            }
        }

        due
    }

    /// Cancel one timer. Returns false if it was not pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self
            .queue
            .iter()
            .find(|(_, t)| t.id == id)
            .map(|(k, _)| *k);

        match key {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    /// Cancel every timer owned by `owner`. Returns how many were removed.
    pub fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|_, t| t.owner != Some(owner));
        before - self.queue.len()
    }

    /// Number of pending timers owned by `owner`.
    pub fn pending_for(&self, owner: EntityId) -> usize {
        self.queue
            .values()
            .filter(|t| t.owner == Some(owner))
            .count()
    }

    /// Earliest fire tick among `owner`'s timers.
    pub fn next_fire_for(&self, owner: EntityId) -> Option<u32> {
        self.queue
            .iter()
            .find(|(_, t)| t.owner == Some(owner))
            .map(|((tick, _), _)| *tick)
    }

    /// Total pending timers.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// No pending timers.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_on_due_tick() {
        let mut scheduler = Scheduler::new();
        let owner = EntityId(3);
        scheduler.schedule(Some(owner), 0, 60, TimerAction::PlayIdleAnimation);

        assert!(scheduler.take_due(59).is_empty());
        let due = scheduler.take_due(60);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].owner, Some(owner));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_same_tick_fires_in_schedule_order() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule(Some(EntityId(9)), 0, 10, TimerAction::PlayIdleAnimation);
        let second = scheduler.schedule(
            Some(EntityId(1)),
            0,
            10,
            TimerAction::EnterEnemyState(EnemyStateLabel::Left),
        );

        let due = scheduler.take_due(10);
        assert_eq!(due.iter().map(|d| d.id).collect::<Vec<_>>(), vec![first, second]);
    }

    #[test]
    fn test_repeating_timer() {
        let mut scheduler = Scheduler::new();
        let origin = SpawnPoint { x: 0, y: 0 };
        scheduler.schedule_repeating(None, 0, 600, TimerAction::SpawnFlyer { origin });

        assert!(scheduler.take_due(599).is_empty());
        assert_eq!(scheduler.take_due(600).len(), 1);
        assert!(scheduler.take_due(1199).is_empty());
        assert_eq!(scheduler.take_due(1200).len(), 1);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_delays_past_last_tick_saturate() {
        let mut scheduler = Scheduler::new();
        let owner = EntityId(2);
        scheduler.schedule(Some(owner), u32::MAX - 10, 600, TimerAction::PlayIdleAnimation);
        assert_eq!(scheduler.next_fire_for(owner), Some(u32::MAX));

        let origin = SpawnPoint { x: 0, y: 0 };
        scheduler.schedule_repeating(None, u32::MAX - 600, 600, TimerAction::SpawnFlyer { origin });
        assert_eq!(scheduler.take_due(u32::MAX).len(), 2);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancel_owner() {
        let mut scheduler = Scheduler::new();
        let owner = EntityId(5);
        scheduler.schedule(Some(owner), 0, 5, TimerAction::PlayIdleAnimation);
        scheduler.schedule(Some(owner), 0, 9, TimerAction::PlayIdleAnimation);
        scheduler.schedule(Some(EntityId(6)), 0, 5, TimerAction::PlayIdleAnimation);

        assert_eq!(scheduler.pending_for(owner), 2);
        assert_eq!(scheduler.next_fire_for(owner), Some(5));
        assert_eq!(scheduler.cancel_owner(owner), 2);
        assert_eq!(scheduler.cancel_owner(owner), 0);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_cancel_single() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule(None, 0, 5, TimerAction::PlayIdleAnimation);

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(scheduler.take_due(10).is_empty());
    }
}
