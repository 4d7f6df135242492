// Copyright (C) 2025  Rafael Carvalho <contact@rafaelrc.com>

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as published by
// the Free Software Foundation.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

// SPDX-License-Identifier: GPL-3.0-only

//! Single-threaded cooperative timer reactor. Timer callbacks receive the
//! current event time and return their next waketime, or [NEVER] to stay
//! disarmed until rescheduled with [Reactor::update_timer].

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Instant,
};

use log::trace;

/// Waketime sentinel meaning "do not reschedule".
pub const NEVER: f64 = 9e99;

pub type TimerCallback = Box<dyn FnMut(f64) -> f64>;

/// Source of monotonic time, in seconds. Split out so tests can drive the
/// reactor with a settable clock.
pub trait Clock {
    fn monotonic(&self) -> f64;
}

pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn monotonic(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

struct TimerSlot {
    waketime: Cell<f64>,
    // Taken out of the slot while its callback runs, so the callback may
    // reschedule timers reentrantly without hitting a live borrow.
    callback: RefCell<Option<TimerCallback>>,
}

/// Opaque handle to a registered timer. Timers are never destroyed, only
/// deferred indefinitely by a [NEVER] waketime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerHandle(usize);

pub struct Reactor {
    clock: Rc<dyn Clock>,
    timers: RefCell<Vec<Rc<TimerSlot>>>,
}

impl Reactor {
    pub fn new() -> Self {
        Self::with_clock(Rc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: RefCell::new(Vec::new()),
        }
    }

    pub fn monotonic(&self) -> f64 {
        self.clock.monotonic()
    }

    /// Registers a new timer, initially disarmed.
    pub fn register_timer(&self, callback: TimerCallback) -> TimerHandle {
        let mut timers = self.timers.borrow_mut();
        timers.push(Rc::new(TimerSlot {
            waketime: Cell::new(NEVER),
            callback: RefCell::new(Some(callback)),
        }));
        let handle = TimerHandle(timers.len() - 1);
        trace!(target: "Reactor::register_timer", "Registered timer {:?}", handle);
        handle
    }

    /// Reschedules a timer. A single store of the deadline: a timer updated
    /// before its old waketime elapses never fires at the stale deadline.
    pub fn update_timer(&self, handle: TimerHandle, waketime: f64) {
        if let Some(slot) = self.timers.borrow().get(handle.0) {
            slot.waketime.set(waketime);
        }
    }

    /// Runs every timer that is due at the current monotonic time. The value
    /// returned by a callback becomes its new waketime. Returns the earliest
    /// pending waketime, or [NEVER] when every timer is disarmed.
    pub fn dispatch(&self) -> f64 {
        let eventtime = self.monotonic();
        let slots: Vec<Rc<TimerSlot>> = self.timers.borrow().iter().cloned().collect();
        for slot in &slots {
            if slot.waketime.get() > eventtime {
                continue;
            }
            let callback = slot.callback.borrow_mut().take();
            if let Some(mut callback) = callback {
                let waketime = callback(eventtime);
                slot.waketime.set(waketime);
                *slot.callback.borrow_mut() = Some(callback);
            }
        }
        self.next_waketime()
    }

    /// Earliest pending waketime over all timers.
    pub fn next_waketime(&self) -> f64 {
        self.timers
            .borrow()
            .iter()
            .map(|slot| slot.waketime.get())
            .fold(NEVER, f64::min)
    }
}

#[cfg(test)]
pub(crate) mod testclock {
    use std::{cell::Cell, rc::Rc};

    use super::Clock;

    pub(crate) struct FakeClock {
        now: Cell<f64>,
    }

    impl FakeClock {
        pub(crate) fn new() -> Rc<Self> {
            Rc::new(Self { now: Cell::new(0.0) })
        }

        pub(crate) fn set(&self, now: f64) {
            self.now.set(now);
        }
    }

    impl Clock for FakeClock {
        fn monotonic(&self) -> f64 {
            self.now.get()
        }
    }
}
