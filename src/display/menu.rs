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

//! Menu overlay and its navigation handler table.
//!
//! Every [Menu] instance shares one [MenuHandlers] table, so replacing a
//! handler slot affects all menus at once. The four slots (click, up, down,
//! back) are the seams other components may wrap; the default slot values
//! delegate to the menu's own navigation logic.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use log::{debug, info};

use super::DisplayChip;

/// Number of rows scrolled by a "fast" up/down event.
const FAST_SCROLL_STEP: usize = 5;

pub type ClickOp = Rc<dyn Fn(&Menu, f64)>;
pub type ScrollOp = Rc<dyn Fn(&Menu, bool)>;
pub type BackOp = Rc<dyn Fn(&Menu)>;

/// Snapshot of all four navigation slots, used for the restore-before-wrap
/// protocol when the table is decorated.
#[derive(Clone)]
pub struct NavSnapshot {
    pub click: ClickOp,
    pub up: ScrollOp,
    pub down: ScrollOp,
    pub back: BackOp,
}

/// Shared table of replaceable navigation operation slots.
pub struct MenuHandlers {
    click: RefCell<ClickOp>,
    up: RefCell<ScrollOp>,
    down: RefCell<ScrollOp>,
    back: RefCell<BackOp>,
}

impl MenuHandlers {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            click: RefCell::new(Rc::new(|menu: &Menu, eventtime| menu.do_click(eventtime))),
            up: RefCell::new(Rc::new(|menu: &Menu, fast| menu.do_up(fast))),
            down: RefCell::new(Rc::new(|menu: &Menu, fast| menu.do_down(fast))),
            back: RefCell::new(Rc::new(|menu: &Menu| menu.do_back())),
        })
    }

    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            click: self.click.borrow().clone(),
            up: self.up.borrow().clone(),
            down: self.down.borrow().clone(),
            back: self.back.borrow().clone(),
        }
    }

    pub fn restore(&self, snapshot: &NavSnapshot) {
        debug!(target: "MenuHandlers::restore", "Restoring previous navigation handlers");
        *self.click.borrow_mut() = snapshot.click.clone();
        *self.up.borrow_mut() = snapshot.up.clone();
        *self.down.borrow_mut() = snapshot.down.clone();
        *self.back.borrow_mut() = snapshot.back.clone();
    }

    pub fn set_click(&self, op: ClickOp) {
        *self.click.borrow_mut() = op;
    }

    pub fn set_up(&self, op: ScrollOp) {
        *self.up.borrow_mut() = op;
    }

    pub fn set_down(&self, op: ScrollOp) {
        *self.down.borrow_mut() = op;
    }

    pub fn set_back(&self, op: BackOp) {
        *self.back.borrow_mut() = op;
    }
}

/// A small list menu drawn over the display content while active.
pub struct Menu {
    handlers: Rc<MenuHandlers>,
    items: Vec<String>,
    cursor: Cell<usize>,
    active: Cell<bool>,
}

impl Menu {
    pub fn new(handlers: Rc<MenuHandlers>, items: Vec<String>) -> Self {
        Self {
            handlers,
            items,
            cursor: Cell::new(0),
            active: Cell::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.get()
    }

    // Entry points invoked by the host on input events. Each clones the
    // current slot out of the table before calling it, so a slot may be
    // replaced from within a handler.

    pub fn click(&self, eventtime: f64) {
        let op = self.handlers.click.borrow().clone();
        op(self, eventtime);
    }

    pub fn up(&self, fast: bool) {
        let op = self.handlers.up.borrow().clone();
        op(self, fast);
    }

    pub fn down(&self, fast: bool) {
        let op = self.handlers.down.borrow().clone();
        op(self, fast);
    }

    pub fn back(&self) {
        let op = self.handlers.back.borrow().clone();
        op(self);
    }

    fn do_click(&self, _eventtime: f64) {
        if !self.active.get() {
            self.active.set(true);
            debug!(target: "Menu::click", "Menu opened");
        } else if let Some(item) = self.items.get(self.cursor.get()) {
            info!(target: "Menu::click", "Selected menu item: {item}");
        }
    }

    fn do_up(&self, fast: bool) {
        if !self.is_active() {
            return;
        }
        let step = if fast { FAST_SCROLL_STEP } else { 1 };
        self.cursor.set(self.cursor.get().saturating_sub(step));
    }

    fn do_down(&self, fast: bool) {
        if !self.is_active() || self.items.is_empty() {
            return;
        }
        let step = if fast { FAST_SCROLL_STEP } else { 1 };
        self.cursor
            .set((self.cursor.get() + step).min(self.items.len() - 1));
    }

    fn do_back(&self) {
        if self.active.replace(false) {
            debug!(target: "Menu::back", "Menu closed");
        }
    }

    /// Paints the menu if it is active. Returns whether anything was drawn,
    /// so the display knows to fall through to its normal content.
    pub fn render(&self, chip: &mut dyn DisplayChip, _eventtime: f64) -> bool {
        if !self.is_active() {
            return false;
        }
        for (row, item) in self.items.iter().enumerate() {
            let marker = if row == self.cursor() { '>' } else { ' ' };
            chip.write_line(row, &format!("{marker}{item}"));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Menu, MenuHandlers};

    fn menu() -> Menu {
        Menu::new(
            MenuHandlers::new(),
            vec!["Home".into(), "Tune".into(), "Pause".into()],
        )
    }

    #[test]
    fn click_opens_menu() {
        let menu = menu();
        assert!(!menu.is_active());
        menu.click(0.0);
        assert!(menu.is_active());
    }

    #[test]
    fn scroll_moves_cursor_within_bounds() {
        let menu = menu();
        menu.click(0.0);
        menu.down(false);
        assert_eq!(menu.cursor(), 1);
        menu.down(true);
        assert_eq!(menu.cursor(), 2);
        menu.up(false);
        assert_eq!(menu.cursor(), 1);
        menu.up(true);
        assert_eq!(menu.cursor(), 0);
    }

    #[test]
    fn scroll_is_ignored_while_closed() {
        let menu = menu();
        menu.down(false);
        assert_eq!(menu.cursor(), 0);
    }

    #[test]
    fn back_closes_menu() {
        let menu = menu();
        menu.click(0.0);
        menu.back();
        assert!(!menu.is_active());
    }

    #[test]
    fn replaced_slot_is_shared_between_menus() {
        use std::{cell::Cell, rc::Rc};

        let handlers = MenuHandlers::new();
        let first = Menu::new(handlers.clone(), vec!["A".into()]);
        let second = Menu::new(handlers.clone(), vec!["B".into()]);
        let hits = Rc::new(Cell::new(0));
        handlers.set_back(Rc::new({
            let hits = hits.clone();
            move |_menu: &Menu| hits.set(hits.get() + 1)
        }));
        first.back();
        second.back();
        assert_eq!(hits.get(), 2);
    }
}
