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

//! Input interceptor: wraps the four shared navigation slots so that every
//! input event counts as activity, and the first event after the display
//! blanked wakes it instead of reaching the menu.

use std::rc::{Rc, Weak};

use log::debug;

use super::SleepController;
use crate::display::menu::Menu;

/// Resets the idle timer; returns whether the event must be swallowed as a
/// wake gesture.
fn intercept(controller: &Weak<SleepController>) -> bool {
    match controller.upgrade() {
        Some(controller) => {
            controller.reset_idle_timer();
            if controller.is_sleeping() {
                controller.wake();
                true
            } else {
                false
            }
        }
        None => false,
    }
}

/// Wraps the shared navigation handler table. The table is patched once, not
/// per menu instance; the caller restores any previous snapshot first, so
/// repeated installation never stacks wrappers.
pub(super) fn install(controller: &Rc<SleepController>) {
    let handlers = &controller.menu_handlers;
    if let Some(snapshot) = controller.saved_nav.borrow_mut().take() {
        handlers.restore(&snapshot);
    }
    debug!(target: "sleep::input::install", "Wrapping navigation handlers");

    let snapshot = handlers.snapshot();
    let weak = Rc::downgrade(controller);
    handlers.set_click({
        let previous = snapshot.click.clone();
        let controller = weak.clone();
        Rc::new(move |menu: &Menu, eventtime| {
            if !intercept(&controller) {
                previous(menu, eventtime);
            }
        })
    });
    handlers.set_up({
        let previous = snapshot.up.clone();
        let controller = weak.clone();
        Rc::new(move |menu: &Menu, fast| {
            if !intercept(&controller) {
                previous(menu, fast);
            }
        })
    });
    handlers.set_down({
        let previous = snapshot.down.clone();
        let controller = weak.clone();
        Rc::new(move |menu: &Menu, fast| {
            if !intercept(&controller) {
                previous(menu, fast);
            }
        })
    });
    handlers.set_back({
        let previous = snapshot.back.clone();
        let controller = weak;
        Rc::new(move |menu: &Menu| {
            if !intercept(&controller) {
                previous(menu);
            }
        })
    });
    *controller.saved_nav.borrow_mut() = Some(snapshot);
}

#[cfg(test)]
mod tests {
    use crate::{reactor::NEVER, sleep::testrig::Rig, sleep::SleepState};

    #[test]
    fn every_entry_point_resets_the_idle_timer() {
        let rig = Rig::new(300, false);
        rig.ready();

        rig.clock.set(10.0);
        rig.menu.up(false);
        assert_eq!(rig.reactor.next_waketime(), 310.0);

        rig.clock.set(20.0);
        rig.menu.down(false);
        assert_eq!(rig.reactor.next_waketime(), 320.0);

        rig.clock.set(30.0);
        rig.menu.back();
        assert_eq!(rig.reactor.next_waketime(), 330.0);

        rig.clock.set(40.0);
        rig.menu.click(40.0);
        assert_eq!(rig.reactor.next_waketime(), 340.0);
    }

    #[test]
    fn first_event_after_sleep_is_swallowed_then_forwarded() {
        let rig = Rig::new(300, false);
        rig.ready();
        rig.fire_timers(300.0);
        assert_eq!(rig.controller.state(), SleepState::Sleeping);

        rig.clock.set(310.0);
        rig.menu.click(310.0);
        assert_eq!(rig.controller.state(), SleepState::Awake);
        assert!(!rig.menu.is_active());

        rig.menu.click(311.0);
        assert!(rig.menu.is_active());
    }

    #[test]
    fn scroll_and_back_also_wake_without_forwarding() {
        for event in ["up", "down", "back"] {
            let rig = Rig::new(300, false);
            rig.ready();
            // Open the menu and move the cursor so forwarding would be visible.
            rig.menu.click(0.0);
            rig.menu.down(false);
            rig.fire_timers(300.0);
            assert_eq!(rig.controller.state(), SleepState::Sleeping);

            rig.clock.set(310.0);
            match event {
                "up" => rig.menu.up(false),
                "down" => rig.menu.down(false),
                _ => rig.menu.back(),
            }
            assert_eq!(rig.controller.state(), SleepState::Awake, "{event}");
            assert!(rig.menu.is_active(), "{event} must not reach the menu");
            assert_eq!(rig.menu.cursor(), 1, "{event} must not reach the menu");
        }
    }

    #[test]
    fn input_does_not_arm_timer_when_disabled() {
        let rig = Rig::new(-1, false);
        rig.ready();
        rig.clock.set(10.0);
        rig.menu.click(10.0);
        assert_eq!(rig.reactor.next_waketime(), NEVER);
        assert!(rig.menu.is_active());
    }
}
