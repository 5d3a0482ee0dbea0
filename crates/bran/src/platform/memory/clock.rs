//! Virtual time for deterministic debounce tests.
//!
//! Sleeps resolve only when the clock is advanced past their deadline, and
//! the executor is drained between deadlines so timers registered by woken
//! tasks are measured from the time they were registered at.

use futures_executor::{LocalPool, LocalSpawner};
use futures_util::future::LocalBoxFuture;
use futures_util::task::LocalSpawnExt;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use crate::runtime::Scheduler;

#[derive(Default)]
struct ClockState {
    now_ms: u64,
    sleepers: Vec<(u64, Waker)>,
}

#[derive(Clone, Default)]
pub struct ManualClock {
    state: Rc<RefCell<ClockState>>,
}

impl ManualClock {
    pub fn now_ms(&self) -> u64 {
        self.state.borrow().now_ms
    }

    pub fn sleep(&self, duration: Duration) -> Sleep {
        Sleep {
            wake_at_ms: self.now_ms() + duration.as_millis() as u64,
            clock: self.clone(),
        }
    }

    fn next_deadline(&self, until_ms: u64) -> Option<u64> {
        self.state
            .borrow()
            .sleepers
            .iter()
            .map(|(wake_at_ms, _)| *wake_at_ms)
            .filter(|wake_at_ms| *wake_at_ms <= until_ms)
            .min()
    }

    fn set_time_and_wake(&self, now_ms: u64) {
        let due: Vec<Waker> = {
            let mut state = self.state.borrow_mut();
            state.now_ms = now_ms;
            let (due, waiting): (Vec<_>, Vec<_>) = state
                .sleepers
                .drain(..)
                .partition(|(wake_at_ms, _)| *wake_at_ms <= now_ms);
            state.sleepers = waiting;
            due.into_iter().map(|(_, waker)| waker).collect()
        };
        for waker in due {
            waker.wake();
        }
    }
}

pub struct Sleep {
    wake_at_ms: u64,
    clock: ManualClock,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.clock.state.borrow_mut();
        if state.now_ms >= self.wake_at_ms {
            return Poll::Ready(());
        }
        state.sleepers.push((self.wake_at_ms, cx.waker().clone()));
        Poll::Pending
    }
}

/// Single-threaded executor driven by the test.
pub struct MemoryScheduler {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    clock: ManualClock,
}

impl Default for MemoryScheduler {
    fn default() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
            clock: ManualClock::default(),
        }
    }
}

impl MemoryScheduler {
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Polls every task until none can make progress.
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Moves virtual time forward, firing due sleeps deadline by deadline.
    pub fn advance_by(&self, duration: Duration) {
        let until_ms = self.clock.now_ms() + duration.as_millis() as u64;
        loop {
            self.run_until_stalled();
            let Some(deadline) = self.clock.next_deadline(until_ms) else {
                break;
            };
            self.clock.set_time_and_wake(deadline);
        }
        self.clock.set_time_and_wake(until_ms);
        self.run_until_stalled();
    }
}

impl Scheduler for MemoryScheduler {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if self.spawner.spawn_local(task).is_err() {
            eprintln!("[bran memory] executor shut down, task dropped");
        }
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(self.clock.sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn sleeps_fire_only_when_time_passes() {
        let scheduler = MemoryScheduler::default();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let sleep = scheduler.sleep(Duration::from_millis(800));
        scheduler.spawn(Box::pin(async move {
            sleep.await;
            flag.set(true);
        }));
        scheduler.advance_by(Duration::from_millis(799));
        assert!(!fired.get());
        scheduler.advance_by(Duration::from_millis(1));
        assert!(fired.get());
        assert_eq!(scheduler.clock().now_ms(), 800);
    }

    #[test]
    fn chained_sleeps_within_one_advance() {
        let scheduler = MemoryScheduler::default();
        let ticks = Rc::new(Cell::new(0));
        let counter = ticks.clone();
        let clock = scheduler.clock().clone();
        scheduler.spawn(Box::pin(async move {
            for _ in 0..3 {
                clock.sleep(Duration::from_millis(100)).await;
                counter.set(counter.get() + 1);
            }
        }));
        scheduler.advance_by(Duration::from_millis(250));
        assert_eq!(ticks.get(), 2);
        scheduler.advance_by(Duration::from_millis(50));
        assert_eq!(ticks.get(), 3);
    }
}
