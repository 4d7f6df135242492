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

//! Job status collaborator: tracks whether the host is running a print job.

use std::{cell::Cell, fmt, rc::Rc};

use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Standby,
    Ready,
    Printing,
    Idle,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Standby => write!(f, "Standby"),
            JobState::Ready => write!(f, "Ready"),
            JobState::Printing => write!(f, "Printing"),
            JobState::Idle => write!(f, "Idle"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct JobStatus {
    pub state: JobState,
}

pub struct JobMonitor {
    state: Cell<JobState>,
}

impl JobMonitor {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            state: Cell::new(JobState::Standby),
        })
    }

    pub fn status(&self, _eventtime: f64) -> JobStatus {
        JobStatus {
            state: self.state.get(),
        }
    }

    pub fn set_state(&self, state: JobState) {
        if self.state.replace(state) != state {
            debug!(target: "JobMonitor::set_state", "Job state is now {state}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{JobMonitor, JobState};

    #[test]
    fn starts_in_standby() {
        let monitor = JobMonitor::new();
        assert_eq!(monitor.status(0.0).state, JobState::Standby);
    }

    #[test]
    fn state_changes_are_visible() {
        let monitor = JobMonitor::new();
        monitor.set_state(JobState::Printing);
        assert_eq!(monitor.status(1.0).state, JobState::Printing);
    }
}
