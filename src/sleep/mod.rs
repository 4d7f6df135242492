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

//! Idle-triggered display blanking.
//!
//! [SleepController] owns the sleep/wake state machine and the idle timer.
//! Once the host is ready it decorates every display's render slot (see
//! [render]) and the shared navigation handler table (see [input]): while
//! sleeping, frames are blanked and the first input event wakes the display
//! instead of reaching the menu.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use chrono::Duration;
use log::{debug, info};

use crate::{
    commands::CommandRegistry,
    display::{
        menu::{MenuHandlers, NavSnapshot},
        Display, DisplayRegistry, RenderOp,
    },
    events::{EventBus, HostEvent},
    job::{JobMonitor, JobState},
    reactor::{Reactor, TimerHandle, NEVER},
};

mod input;
mod render;

const CMD_DISPLAY_SLEEP_HELP: &str =
    "Blanks the display until a key is pressed, or DISPLAY_WAKE is called";
const CMD_DISPLAY_WAKE_HELP: &str = "Wakes the display";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepState {
    Awake,
    Sleeping,
}

#[derive(Clone, Copy, Debug)]
pub struct SleepConfig {
    sleep_timeout: Option<Duration>,
    sleep_while_printing: bool,
}

impl SleepConfig {
    /// A `sleep_timeout` of [None] disables idle blanking entirely.
    pub fn new(sleep_timeout: Option<Duration>, sleep_while_printing: bool) -> Self {
        Self {
            sleep_timeout,
            sleep_while_printing,
        }
    }

    fn timeout_seconds(&self) -> Option<f64> {
        self.sleep_timeout.map(|timeout| timeout.num_seconds() as f64)
    }
}

pub struct SleepController {
    config: SleepConfig,
    reactor: Rc<Reactor>,
    displays: Rc<DisplayRegistry>,
    menu_handlers: Rc<MenuHandlers>,
    job: Rc<JobMonitor>,
    state: Cell<SleepState>,
    sleep_timer: TimerHandle,
    // Snapshots of the operations replaced by the interceptors. Restored
    // before wrapping again, so repeated Ready events never stack wrappers.
    saved_nav: RefCell<Option<NavSnapshot>>,
    saved_render: RefCell<Vec<(Rc<Display>, RenderOp)>>,
    weak: Weak<SleepController>,
}

impl SleepController {
    /// Registers the idle timer, the lifecycle subscriptions and the
    /// `DISPLAY_SLEEP` / `DISPLAY_WAKE` commands. The interceptors are only
    /// installed once the host emits [HostEvent::Ready].
    pub fn new(
        config: SleepConfig,
        reactor: Rc<Reactor>,
        displays: Rc<DisplayRegistry>,
        menu_handlers: Rc<MenuHandlers>,
        job: Rc<JobMonitor>,
        events: &EventBus,
        commands: &CommandRegistry,
    ) -> Rc<Self> {
        let controller = Rc::new_cyclic(|weak: &Weak<Self>| {
            let sleep_timer = reactor.register_timer(Box::new({
                let weak = weak.clone();
                move |eventtime| match weak.upgrade() {
                    Some(controller) => controller.sleep_event(eventtime, false),
                    None => NEVER,
                }
            }));
            Self {
                config,
                reactor: reactor.clone(),
                displays,
                menu_handlers,
                job,
                state: Cell::new(SleepState::Awake),
                sleep_timer,
                saved_nav: RefCell::new(None),
                saved_render: RefCell::new(Vec::new()),
                weak: weak.clone(),
            }
        });

        events.register(HostEvent::Ready, {
            let weak = Rc::downgrade(&controller);
            Rc::new(move |eventtime| {
                if let Some(controller) = weak.upgrade() {
                    controller.handle_ready(eventtime);
                }
            })
        });
        events.register(HostEvent::PrintingStarted, {
            let weak = Rc::downgrade(&controller);
            Rc::new(move |eventtime| {
                if let Some(controller) = weak.upgrade() {
                    controller.handle_printing(eventtime);
                }
            })
        });
        commands.register("DISPLAY_SLEEP", CMD_DISPLAY_SLEEP_HELP, {
            let weak = Rc::downgrade(&controller);
            Rc::new(move |eventtime| {
                if let Some(controller) = weak.upgrade() {
                    controller.force_sleep(eventtime);
                }
            })
        });
        commands.register("DISPLAY_WAKE", CMD_DISPLAY_WAKE_HELP, {
            let weak = Rc::downgrade(&controller);
            Rc::new(move |_eventtime| {
                if let Some(controller) = weak.upgrade() {
                    controller.reset_idle_timer();
                    controller.wake();
                }
            })
        });

        controller
    }

    pub fn state(&self) -> SleepState {
        self.state.get()
    }

    pub fn is_sleeping(&self) -> bool {
        self.state() == SleepState::Sleeping
    }

    /// Reschedules the idle timer to fire one timeout from now. No-op when
    /// idle blanking is disabled.
    pub fn reset_idle_timer(&self) {
        if let Some(timeout) = self.config.timeout_seconds() {
            self.reactor
                .update_timer(self.sleep_timer, self.reactor.monotonic() + timeout);
        }
    }

    /// Transitions to Sleeping immediately, bypassing the printing check.
    pub fn force_sleep(&self, eventtime: f64) {
        self.sleep_event(eventtime, true);
    }

    /// Transitions to Awake. Idempotent, but always requests a redraw so
    /// normal content resumes on the next frame.
    pub fn wake(&self) {
        if self.state.replace(SleepState::Awake) == SleepState::Sleeping {
            debug!(target: "SleepController::wake", "Waking display");
        }
        for display in self.displays.displays() {
            display.request_redraw();
        }
    }

    /// Idle timer callback. Defers (and reschedules) while a print is
    /// running and blanking during prints is disallowed; otherwise goes to
    /// sleep and disarms the timer.
    fn sleep_event(&self, eventtime: f64, force: bool) -> f64 {
        let status = self.job.status(eventtime);
        if status.state == JobState::Printing && !force && !self.config.sleep_while_printing {
            debug!(target: "SleepController::sleep_event", "Sleep deferred while printing");
            return match self.config.timeout_seconds() {
                Some(timeout) => eventtime + timeout,
                None => NEVER,
            };
        }
        if self.state.replace(SleepState::Sleeping) == SleepState::Awake {
            debug!(target: "SleepController::sleep_event", "Blanking display");
        }
        for display in self.displays.displays() {
            display.request_redraw();
        }
        NEVER
    }

    fn handle_ready(&self, _eventtime: f64) {
        if let Some(controller) = self.weak.upgrade() {
            input::install(&controller);
            render::install(&controller);
        }
        self.reset_idle_timer();
        match self.config.timeout_seconds() {
            Some(timeout) => {
                info!(target: "SleepController::handle_ready", "Display will blank after {timeout:.0}s of inactivity")
            }
            None => {
                info!(target: "SleepController::handle_ready", "Idle display blanking is disabled")
            }
        }
    }

    /// A display must never stay blanked while a print runs if blanking
    /// during prints is disallowed.
    fn handle_printing(&self, _eventtime: f64) {
        if !self.config.sleep_while_printing {
            self.wake();
        }
    }
}

#[cfg(test)]
pub(crate) mod testrig {
    use std::{cell::RefCell, rc::Rc};

    use chrono::Duration;

    use super::{SleepConfig, SleepController};
    use crate::{
        commands::CommandRegistry,
        display::{
            menu::{Menu, MenuHandlers},
            testchip::{ChipOp, RecordingChip},
            Display, DisplayRegistry,
        },
        events::{EventBus, HostEvent},
        job::JobMonitor,
        reactor::{testclock::FakeClock, Reactor},
    };

    /// Full collaborator stack around a [SleepController], driven by a fake
    /// clock. The display's own update timer is not registered; frames are
    /// produced by calling `display.render_tick` directly.
    pub(crate) struct Rig {
        pub clock: Rc<FakeClock>,
        pub reactor: Rc<Reactor>,
        pub display: Rc<Display>,
        pub ops: Rc<RefCell<Vec<ChipOp>>>,
        pub menu: Rc<Menu>,
        pub handlers: Rc<MenuHandlers>,
        pub job: Rc<JobMonitor>,
        pub events: EventBus,
        pub commands: CommandRegistry,
        pub controller: Rc<SleepController>,
    }

    impl Rig {
        pub(crate) fn new(sleep_timeout: i64, sleep_while_printing: bool) -> Self {
            let clock = FakeClock::new();
            let reactor = Rc::new(Reactor::with_clock(clock.clone()));
            let handlers = MenuHandlers::new();
            let menu = Rc::new(Menu::new(
                handlers.clone(),
                vec!["Home".into(), "Tune".into()],
            ));
            let (chip, ops) = RecordingChip::new();
            let display = Display::new(reactor.clone(), Box::new(chip), Some(menu.clone()));
            display.set_templates(vec![Box::new(|_| Ok("content".into()))]);
            let registry = DisplayRegistry::new();
            registry.add(display.clone());
            let job = JobMonitor::new();
            let events = EventBus::new();
            let commands = CommandRegistry::new();
            let config = SleepConfig::new(
                (sleep_timeout > 0).then(|| Duration::seconds(sleep_timeout)),
                sleep_while_printing,
            );
            let controller = SleepController::new(
                config,
                reactor.clone(),
                registry,
                handlers.clone(),
                job.clone(),
                &events,
                &commands,
            );
            Self {
                clock,
                reactor,
                display,
                ops,
                menu,
                handlers,
                job,
                events,
                commands,
                controller,
            }
        }

        /// Emits the host Ready event, installing the interceptors.
        pub(crate) fn ready(&self) {
            self.events.emit(HostEvent::Ready, self.reactor.monotonic());
        }

        /// Advances the clock and runs due timers; returns the next waketime.
        pub(crate) fn fire_timers(&self, now: f64) -> f64 {
            self.clock.set(now);
            self.reactor.dispatch()
        }
    }
}
