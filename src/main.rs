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

//! Blank an idle LCD/menu front-end after a configurable timeout and wake it
//! on the first input event, with optional deferral while a job is printing

use std::{
    error::Error,
    io::{self, BufRead},
    process::ExitCode,
    rc::Rc,
    sync::{
        atomic::{self, AtomicBool},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::Duration,
};

mod commands;
mod display;
mod events;
mod job;
mod reactor;
mod settings;
mod sleep;

use commands::CommandRegistry;
use display::{
    menu::{Menu, MenuHandlers},
    ConsoleChip, Display, DisplayRegistry,
};
use events::{EventBus, HostEvent};
use job::{JobMonitor, JobState};
use reactor::Reactor;
use settings::Settings;
use sleep::{SleepConfig, SleepController};

const DISPLAY_ROWS: usize = 4;
const DISPLAY_COLUMNS: usize = 20;

#[derive(Clone, Copy, Debug)]
enum NavEvent {
    Click,
    Up { fast: bool },
    Down { fast: bool },
    Back,
}

#[derive(Clone, Debug)]
enum Msg {
    Nav(NavEvent),
    Job(JobState),
    Command(String),
    Help,
    Quit,
}

/// Parses one line of console input into a message. Uppercase words are
/// treated as command names, a trailing `!` on up/down scrolls fast.
fn parse_msg(line: &str) -> Option<Msg> {
    let word = line.trim();
    match word {
        "" => None,
        "click" | "c" => Some(Msg::Nav(NavEvent::Click)),
        "up" | "u" => Some(Msg::Nav(NavEvent::Up { fast: false })),
        "up!" => Some(Msg::Nav(NavEvent::Up { fast: true })),
        "down" | "d" => Some(Msg::Nav(NavEvent::Down { fast: false })),
        "down!" => Some(Msg::Nav(NavEvent::Down { fast: true })),
        "back" | "b" => Some(Msg::Nav(NavEvent::Back)),
        "print" => Some(Msg::Job(JobState::Printing)),
        "idle" => Some(Msg::Job(JobState::Idle)),
        "ready" => Some(Msg::Job(JobState::Ready)),
        "standby" => Some(Msg::Job(JobState::Standby)),
        "help" | "h" | "?" => Some(Msg::Help),
        "quit" | "exit" | "q" => Some(Msg::Quit),
        word if word.chars().all(|c| c.is_ascii_uppercase() || c == '_') => {
            Some(Msg::Command(word.to_owned()))
        }
        _ => {
            log::warn!(target: "main", "Unrecognised input: {word}");
            None
        }
    }
}

impl Msg {
    fn handle(
        &self,
        reactor: &Reactor,
        menu: &Menu,
        job: &JobMonitor,
        events: &EventBus,
        commands: &CommandRegistry,
        term: &AtomicBool,
    ) {
        let eventtime = reactor.monotonic();
        match self {
            Msg::Nav(nav) => match nav {
                NavEvent::Click => menu.click(eventtime),
                NavEvent::Up { fast } => menu.up(*fast),
                NavEvent::Down { fast } => menu.down(*fast),
                NavEvent::Back => menu.back(),
            },
            Msg::Job(state) => {
                let was = job.status(eventtime).state;
                job.set_state(*state);
                if *state == JobState::Printing && was != JobState::Printing {
                    events.emit(HostEvent::PrintingStarted, eventtime);
                }
            }
            Msg::Command(name) => {
                if let Err(err) = commands.run(name, eventtime) {
                    log::warn!(target: "main", "{err}");
                }
            }
            Msg::Help => {
                println!("Input events: click/c, up/u, up!, down/d, down!, back/b");
                println!("Job states:   print, idle, ready, standby");
                println!("Other:        help, quit");
                for (name, help) in commands.help() {
                    println!("{name:14} {help}");
                }
            }
            Msg::Quit => term.store(true, atomic::Ordering::Relaxed),
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let settings = Settings::new()?;

    simplelog::TermLogger::init(
        settings.get_verbosity(),
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let reactor = Rc::new(Reactor::new());

    let menu_handlers = MenuHandlers::new();
    let menu = Rc::new(Menu::new(
        menu_handlers.clone(),
        vec![
            "Home".into(),
            "Tune".into(),
            "Pause print".into(),
            "Shutdown".into(),
        ],
    ));

    let job = JobMonitor::new();
    let display = Display::new(
        reactor.clone(),
        Box::new(ConsoleChip::new(DISPLAY_ROWS, DISPLAY_COLUMNS)),
        Some(menu.clone()),
    );
    display.set_templates(vec![
        Box::new({
            let job = job.clone();
            move |eventtime| Ok(format!("Printer: {}", job.status(eventtime).state))
        }),
        Box::new(|eventtime| Ok(format!("Up: {eventtime:>7.1}s"))),
        Box::new(|_| Ok("'help' for input".into())),
    ]);
    display.start();

    let registry = DisplayRegistry::new();
    registry.add(display);

    let events = EventBus::new();
    let commands = CommandRegistry::new();
    let _sleep_controller = SleepController::new(
        SleepConfig::new(
            settings.get_sleep_timeout(),
            settings.get_sleep_while_printing(),
        ),
        reactor.clone(),
        registry,
        menu_handlers,
        job.clone(),
        &events,
        &commands,
    );

    let term = Arc::new(AtomicBool::new(false));
    for sig in signal_hook::consts::TERM_SIGNALS {
        signal_hook::flag::register(*sig, Arc::clone(&term))?;
    }

    let (msg_sender, msg_receiver) = mpsc::channel::<Msg>();
    spawn_console_reader(msg_sender);

    events.emit(HostEvent::Ready, reactor.monotonic());

    // All callbacks run on this thread only: timers between input events,
    // message handlers in between.
    while !term.load(atomic::Ordering::Relaxed) {
        let next_waketime = reactor.dispatch();
        let timeout = (next_waketime - reactor.monotonic()).clamp(0.0, 1.0);
        match msg_receiver.recv_timeout(Duration::from_secs_f64(timeout)) {
            Ok(msg) => msg.handle(&reactor, &menu, &job, &events, &commands, &term),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Feeds console lines into the message channel from a reader thread. The
/// messages are handled on the main thread.
fn spawn_console_reader(sender: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if let Some(msg) = parse_msg(&line) {
                if sender.send(msg).is_err() {
                    break;
                }
            }
        }
    });
}
