//! Virtual clock and scheduler
//!
//! Time only moves when told to. [`ManualClock::advance`] fires due timers
//! in time order, which makes tick-driven behaviour deterministic in tests
//! and simulations. [`ManualClock::set_now`] jumps without firing anything,
//! modelling a suspended or closed app.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{Clock, Scheduler};

type Task = Rc<RefCell<Box<dyn FnMut()>>>;

struct Timer {
    id: u64,
    period_ms: u64,
    due: u64,
    task: Task,
}

struct Timeline {
    now: u64,
    next_id: u64,
    timers: Vec<Timer>,
}

/// Shared virtual clock; clones observe the same time
#[derive(Clone)]
pub struct ManualClock {
    timeline: Rc<RefCell<Timeline>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            timeline: Rc::new(RefCell::new(Timeline {
                now: start_ms,
                next_id: 0,
                timers: Vec::new(),
            })),
        }
    }

    /// Jump to `now_ms` without firing timers. Pending timers are
    /// rescheduled one period after the new time, like a resumed tab.
    pub fn set_now(&self, now_ms: u64) {
        let mut timeline = self.timeline.borrow_mut();
        timeline.now = now_ms;
        for timer in &mut timeline.timers {
            timer.due = now_ms.saturating_add(timer.period_ms);
        }
    }

    /// Move time forward by `ms`, firing every timer that falls due.
    /// Returns how many task runs happened.
    pub fn advance(&self, ms: u64) -> usize {
        let target = self.timeline.borrow().now.saturating_add(ms);
        let mut fired = 0;
        loop {
            let task = {
                let mut timeline = self.timeline.borrow_mut();
                let Some(timer) = timeline
                    .timers
                    .iter_mut()
                    .filter(|t| t.due <= target)
                    .min_by_key(|t| (t.due, t.id))
                else {
                    break;
                };
                let due = timer.due;
                timer.due = due.saturating_add(timer.period_ms);
                let task = Rc::clone(&timer.task);
                timeline.now = due;
                task
            };
            // Timeline is released so the task can read the clock or drop timers
            let mut task = task.borrow_mut();
            (*task)();
            fired += 1;
        }
        self.timeline.borrow_mut().now = target;
        fired
    }

    /// Number of live timers
    pub fn pending_timers(&self) -> usize {
        self.timeline.borrow().timers.len()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.timeline.borrow().now
    }
}

/// Cancels its timer when dropped
pub struct ManualTimer {
    id: u64,
    timeline: Weak<RefCell<Timeline>>,
}

impl Drop for ManualTimer {
    fn drop(&mut self) {
        if let Some(timeline) = self.timeline.upgrade() {
            timeline.borrow_mut().timers.retain(|t| t.id != self.id);
        }
    }
}

impl Scheduler for ManualClock {
    type Handle = ManualTimer;

    fn every(&self, period_ms: u32, task: Box<dyn FnMut()>) -> ManualTimer {
        let mut timeline = self.timeline.borrow_mut();
        let id = timeline.next_id;
        timeline.next_id += 1;
        let period_ms = u64::from(period_ms.max(1));
        let due = timeline.now.saturating_add(period_ms);
        timeline.timers.push(Timer {
            id,
            period_ms,
            due,
            task: Rc::new(RefCell::new(task)),
        });
        ManualTimer {
            id,
            timeline: Rc::downgrade(&self.timeline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<RefCell<Vec<u64>>>, Rc<RefCell<Vec<u64>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Rc::clone(&log), log)
    }

    #[test]
    fn test_advance_fires_in_order() {
        let clock = ManualClock::new(0);
        let (log, sink) = counter();
        let c = clock.clone();
        let _t = clock.every(1000, Box::new(move || sink.borrow_mut().push(c.now_ms())));

        assert_eq!(clock.advance(999), 0);
        assert_eq!(clock.advance(2001), 2);
        assert_eq!(*log.borrow(), vec![1000, 2000]);
        assert_eq!(clock.now_ms(), 3000);
    }

    #[test]
    fn test_interleaves_timers() {
        let clock = ManualClock::new(0);
        let (log, sink_a) = counter();
        let sink_b = Rc::clone(&log);
        let _a = clock.every(300, Box::new(move || sink_a.borrow_mut().push(300)));
        let _b = clock.every(500, Box::new(move || sink_b.borrow_mut().push(500)));
        clock.advance(1000);
        assert_eq!(*log.borrow(), vec![300, 500, 300, 300, 500]);
    }

    #[test]
    fn test_drop_cancels() {
        let clock = ManualClock::new(0);
        let (log, sink) = counter();
        let timer = clock.every(10, Box::new(move || sink.borrow_mut().push(0)));
        clock.advance(10);
        drop(timer);
        assert_eq!(clock.pending_timers(), 0);
        clock.advance(100);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_set_now_skips_without_firing() {
        let clock = ManualClock::new(0);
        let (log, sink) = counter();
        let _t = clock.every(1000, Box::new(move || sink.borrow_mut().push(0)));
        clock.set_now(1_000_000);
        assert!(log.borrow().is_empty());
        assert_eq!(clock.now_ms(), 1_000_000);
        assert_eq!(clock.advance(1000), 1);
    }
}
