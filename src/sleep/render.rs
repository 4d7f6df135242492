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

//! Render interceptor: wraps each display's render slot so that, while
//! sleeping, the frame is cleared and flushed without running the wrapped
//! renderer. The wrapped operation and its redraw bookkeeping are left
//! untouched, so rendering resumes unchanged on wake.

use std::rc::Rc;

use log::debug;

use super::SleepController;
use crate::display::{Display, REDRAW_TIME};

/// Wraps the render slot of every registered display. Restores any
/// previously saved operations first, so installation is idempotent.
pub(super) fn install(controller: &Rc<SleepController>) {
    for (display, op) in controller.saved_render.borrow_mut().drain(..) {
        display.set_render_op(op);
    }

    let displays = controller.displays.displays();
    debug!(target: "sleep::render::install", "Wrapping render slot of {} display(s)", displays.len());
    let mut saved = Vec::with_capacity(displays.len());
    for display in displays {
        let previous = display.render_op();
        display.set_render_op(Rc::new({
            let previous = previous.clone();
            let controller = Rc::downgrade(controller);
            move |display: &Display, eventtime: f64| {
                display.clear();
                let sleeping = controller
                    .upgrade()
                    .is_some_and(|controller| controller.is_sleeping());
                if sleeping {
                    display.flush();
                    return eventtime + REDRAW_TIME;
                }
                previous(display, eventtime)
            }
        }));
        saved.push((display, previous));
    }
    *controller.saved_render.borrow_mut() = saved;
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{
        display::{testchip::ChipOp, REDRAW_TIME},
        sleep::testrig::Rig,
    };

    #[test]
    fn awake_frame_delegates_to_wrapped_renderer() {
        let rig = Rig::new(300, false);
        rig.ready();
        let next = rig.display.render_tick(1.0);
        assert_eq!(next, 1.0 + REDRAW_TIME);
        assert!(rig
            .ops
            .borrow()
            .contains(&ChipOp::Write(0, "content".into())));
    }

    #[test]
    fn sleeping_frame_is_blank_and_flushed() {
        let rig = Rig::new(300, false);
        rig.ready();
        rig.fire_timers(300.0);
        rig.ops.borrow_mut().clear();
        let next = rig.display.render_tick(301.0);
        assert_eq!(next, 301.0 + REDRAW_TIME);
        assert_eq!(*rig.ops.borrow(), vec![ChipOp::Clear, ChipOp::Flush]);
    }

    #[test]
    fn sleeping_frame_preserves_redraw_bookkeeping() {
        let rig = Rig::new(300, false);
        rig.ready();
        rig.fire_timers(300.0);
        let redraw_time = rig.display.redraw_time();
        assert!(rig.display.redraw_request_pending());
        rig.display.render_tick(301.0);
        assert!(rig.display.redraw_request_pending());
        assert_eq!(rig.display.redraw_time(), redraw_time);
    }

    #[test]
    fn waking_resumes_normal_rendering() {
        let rig = Rig::new(300, false);
        rig.ready();
        rig.fire_timers(300.0);
        rig.display.render_tick(301.0);
        rig.controller.wake();
        rig.ops.borrow_mut().clear();
        rig.display.render_tick(302.0);
        assert!(rig
            .ops
            .borrow()
            .contains(&ChipOp::Write(0, "content".into())));
    }

    #[test]
    fn repeated_install_saves_the_original_operation() {
        let rig = Rig::new(300, false);
        let base = rig.display.render_op();
        rig.ready();
        rig.ready();
        let saved = rig.controller.saved_render.borrow();
        assert_eq!(saved.len(), 1);
        assert!(Rc::ptr_eq(&saved[0].1, &base));
    }
}
