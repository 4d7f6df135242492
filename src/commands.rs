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

//! Operator-facing command registry.

use std::{cell::RefCell, collections::HashMap, error::Error, fmt, rc::Rc};

use log::{debug, info};

pub type CommandHandler = Rc<dyn Fn(f64)>;

struct Command {
    help: String,
    handler: CommandHandler,
}

#[derive(Debug)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown command: {}", self.0)
    }
}

impl Error for UnknownCommand {}

pub struct CommandRegistry {
    commands: RefCell<HashMap<String, Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: RefCell::new(HashMap::new()),
        }
    }

    /// Registers a command handler. Re-registering a name replaces the
    /// previous handler.
    pub fn register(&self, name: &str, help: &str, handler: CommandHandler) {
        let previous = self.commands.borrow_mut().insert(
            name.to_owned(),
            Command {
                help: help.to_owned(),
                handler,
            },
        );
        if previous.is_some() {
            debug!(target: "CommandRegistry::register", "Replaced handler for {name}");
        }
    }

    pub fn run(&self, name: &str, eventtime: f64) -> Result<(), UnknownCommand> {
        let handler = self
            .commands
            .borrow()
            .get(name)
            .map(|command| command.handler.clone())
            .ok_or_else(|| UnknownCommand(name.to_owned()))?;
        info!(target: "CommandRegistry::run", "Running {name}");
        handler(eventtime);
        Ok(())
    }

    /// Name and help text of every registered command, sorted by name.
    pub fn help(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .commands
            .borrow()
            .iter()
            .map(|(name, command)| (name.clone(), command.help.clone()))
            .collect();
        entries.sort();
        entries
    }
}
