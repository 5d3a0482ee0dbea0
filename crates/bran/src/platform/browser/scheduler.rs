use futures_util::future::LocalBoxFuture;
use std::time::Duration;
use zoon::{Task, Timer};

use crate::runtime::Scheduler;

/// Spawns on the zoon executor and sleeps with zoon timers.
pub struct TaskScheduler;

impl Scheduler for TaskScheduler {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        Task::start(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        Box::pin(Timer::sleep(ms))
    }
}
