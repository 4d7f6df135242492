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

//! Host lifecycle events and their subscription bus.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostEvent {
    /// Fired once when the host finished startup.
    Ready,
    /// Fired when a job enters the printing state.
    PrintingStarted,
}

pub type EventHandler = Rc<dyn Fn(f64)>;

pub struct EventBus {
    handlers: RefCell<HashMap<HostEvent, Vec<EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(HashMap::new()),
        }
    }

    pub fn register(&self, event: HostEvent, handler: EventHandler) {
        self.handlers
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(handler);
    }

    /// Runs every handler subscribed to `event`, in registration order, on
    /// the calling thread. The handler list is cloned out first so handlers
    /// may register further subscriptions.
    pub fn emit(&self, event: HostEvent, eventtime: f64) {
        trace!(target: "EventBus::emit", "Emitting {event:?} at {eventtime:.3}");
        let handlers: Vec<EventHandler> = self
            .handlers
            .borrow()
            .get(&event)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler(eventtime);
        }
    }
}
