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

//! Display instances and their registry.
//!
//! A [Display] owns a character chip behind the [DisplayChip] trait, an
//! optional menu overlay and a list of content templates. Its per-frame
//! render operation lives in a replaceable slot so other components can wrap
//! it, keeping the option to delegate to the previous implementation.

use std::{
    cell::{Cell, RefCell},
    error::Error,
    io::{self, Write},
    rc::Rc,
};

use log::error;

use crate::reactor::{Reactor, TimerHandle, NEVER};

pub mod menu;
use menu::Menu;

/// Time between ordinary screen redraws.
pub const REDRAW_TIME: f64 = 0.500;
/// Minimum time between redraws forced by [Display::request_redraw].
pub const REDRAW_MIN_TIME: f64 = 0.100;

/// Character-cell display hardware interface.
pub trait DisplayChip {
    /// Blanks the frame buffer. Nothing reaches the device until [flush].
    fn clear(&mut self);
    fn write_line(&mut self, row: usize, text: &str);
    /// Pushes the frame buffer to the device.
    fn flush(&mut self);
}

/// The per-frame render operation: takes the event time, returns the next
/// time the display timer should fire.
pub type RenderOp = Rc<dyn Fn(&Display, f64) -> f64>;

/// A fallible line of display content, rendered once per frame.
pub type ContentTemplate = Box<dyn Fn(f64) -> Result<String, Box<dyn Error>>>;

pub struct Display {
    reactor: Rc<Reactor>,
    chip: RefCell<Box<dyn DisplayChip>>,
    menu: Option<Rc<Menu>>,
    templates: RefCell<Vec<ContentTemplate>>,
    redraw_time: Cell<f64>,
    redraw_request_pending: Cell<bool>,
    render_op: RefCell<RenderOp>,
    update_timer: Cell<Option<TimerHandle>>,
}

impl Display {
    pub fn new(
        reactor: Rc<Reactor>,
        chip: Box<dyn DisplayChip>,
        menu: Option<Rc<Menu>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            reactor,
            chip: RefCell::new(chip),
            menu,
            templates: RefCell::new(Vec::new()),
            redraw_time: Cell::new(0.0),
            redraw_request_pending: Cell::new(false),
            render_op: RefCell::new(Rc::new(Self::native_render)),
            update_timer: Cell::new(None),
        })
    }

    pub fn set_templates(&self, templates: Vec<ContentTemplate>) {
        *self.templates.borrow_mut() = templates;
    }

    /// Registers the display's update timer with the reactor and schedules
    /// the first frame immediately.
    pub fn start(self: &Rc<Self>) {
        let timer = self.reactor.register_timer(Box::new({
            let display = Rc::downgrade(self);
            move |eventtime| match display.upgrade() {
                Some(display) => display.render_tick(eventtime),
                None => NEVER,
            }
        }));
        self.update_timer.set(Some(timer));
        self.reactor.update_timer(timer, self.reactor.monotonic());
    }

    /// Runs one frame through whatever operation currently occupies the
    /// render slot.
    pub fn render_tick(&self, eventtime: f64) -> f64 {
        let op = self.render_op.borrow().clone();
        op(self, eventtime)
    }

    pub fn render_op(&self) -> RenderOp {
        self.render_op.borrow().clone()
    }

    pub fn set_render_op(&self, op: RenderOp) {
        *self.render_op.borrow_mut() = op;
    }

    /// Asks for a redraw earlier than the ordinary interval, throttled to
    /// [REDRAW_MIN_TIME] after the last frame.
    pub fn request_redraw(&self) {
        if self.redraw_request_pending.replace(true) {
            return;
        }
        if let Some(timer) = self.update_timer.get() {
            self.reactor.update_timer(timer, self.redraw_time.get());
        }
    }

    pub fn clear(&self) {
        self.chip.borrow_mut().clear();
    }

    pub fn flush(&self) {
        self.chip.borrow_mut().flush();
    }

    /// The native render operation: menu overlay if one is open, content
    /// templates otherwise. A failing template loses its row but never the
    /// frame.
    fn native_render(display: &Display, eventtime: f64) -> f64 {
        if display.redraw_request_pending.replace(false) {
            display.redraw_time.set(eventtime + REDRAW_MIN_TIME);
        }
        let mut chip = display.chip.borrow_mut();
        chip.clear();
        if let Some(menu) = &display.menu {
            if menu.render(&mut **chip, eventtime) {
                chip.flush();
                return eventtime + REDRAW_TIME;
            }
        }
        for (row, template) in display.templates.borrow().iter().enumerate() {
            match template(eventtime) {
                Ok(text) => chip.write_line(row, &text),
                Err(err) => {
                    error!(target: "Display::render", "Error during screen update: {err}")
                }
            }
        }
        chip.flush();
        eventtime + REDRAW_TIME
    }

    #[cfg(test)]
    pub(crate) fn redraw_request_pending(&self) -> bool {
        self.redraw_request_pending.get()
    }

    #[cfg(test)]
    pub(crate) fn redraw_time(&self) -> f64 {
        self.redraw_time.get()
    }
}

/// Read-mostly collection of the displays attached to the host. An empty
/// registry is valid; every operation over it is a no-op then.
pub struct DisplayRegistry {
    displays: RefCell<Vec<Rc<Display>>>,
}

impl DisplayRegistry {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            displays: RefCell::new(Vec::new()),
        })
    }

    pub fn add(&self, display: Rc<Display>) {
        self.displays.borrow_mut().push(display);
    }

    /// Snapshot of the registered displays for iteration.
    pub fn displays(&self) -> Vec<Rc<Display>> {
        self.displays.borrow().clone()
    }
}

/// Chip that renders the frame buffer to the terminal, for running the
/// daemon without LCD hardware. Frames are only printed when they changed.
pub struct ConsoleChip {
    columns: usize,
    frame: Vec<String>,
    last_flushed: Option<Vec<String>>,
}

impl ConsoleChip {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            columns,
            frame: vec![String::new(); rows],
            last_flushed: None,
        }
    }
}

impl DisplayChip for ConsoleChip {
    fn clear(&mut self) {
        for line in &mut self.frame {
            line.clear();
        }
    }

    fn write_line(&mut self, row: usize, text: &str) {
        if let Some(line) = self.frame.get_mut(row) {
            *line = text.chars().take(self.columns).collect();
        }
    }

    fn flush(&mut self) {
        if self.last_flushed.as_ref() == Some(&self.frame) {
            return;
        }
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "+{}+", "-".repeat(self.columns));
        for line in &self.frame {
            let _ = writeln!(stdout, "|{:width$}|", line, width = self.columns);
        }
        let _ = writeln!(stdout, "+{}+", "-".repeat(self.columns));
        let _ = stdout.flush();
        self.last_flushed = Some(self.frame.clone());
    }
}

#[cfg(test)]
pub(crate) mod testchip {
    use std::{cell::RefCell, rc::Rc};

    use super::DisplayChip;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum ChipOp {
        Clear,
        Write(usize, String),
        Flush,
    }

    /// Chip that records every operation for assertions.
    pub(crate) struct RecordingChip {
        ops: Rc<RefCell<Vec<ChipOp>>>,
    }

    impl RecordingChip {
        pub(crate) fn new() -> (Self, Rc<RefCell<Vec<ChipOp>>>) {
            let ops = Rc::new(RefCell::new(Vec::new()));
            (Self { ops: ops.clone() }, ops)
        }
    }

    impl DisplayChip for RecordingChip {
        fn clear(&mut self) {
            self.ops.borrow_mut().push(ChipOp::Clear);
        }

        fn write_line(&mut self, row: usize, text: &str) {
            self.ops.borrow_mut().push(ChipOp::Write(row, text.into()));
        }

        fn flush(&mut self) {
            self.ops.borrow_mut().push(ChipOp::Flush);
        }
    }
}
