//! Menu and panel state.
//!
//! Three panels hang off the menu bar: the menu itself, the edit panel
//! (mode picker) and the image controls panel (filters). The edit and
//! controls panels are mutually exclusive. Closing the edit panel, directly
//! or by closing the menu or opening controls, parks the current mode in
//! [`Session::last_mode`] and drops to [`EditMode::Off`]; reopening it
//! restores the parked mode.

#[cfg(test)]
#[path = "menu_test.rs"]
mod menu_test;

use crate::input::EditMode;
use crate::session::Session;

/// Open/closed state of the menu panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Menu {
    pub open: bool,
    pub edit_open: bool,
    pub controls_open: bool,
    /// Diagram is shown in the comparison page: no menu at all.
    pub hidden: bool,
}

impl Menu {
    #[must_use]
    pub fn new(open: bool) -> Self {
        Self { open, edit_open: false, controls_open: false, hidden: false }
    }

    /// Menu grip clicked.
    pub fn toggle_menu(&mut self, session: &mut Session) {
        self.open = !self.open;
        if !self.open {
            self.controls_open = false;
            if self.edit_open {
                self.close_edit(session);
            }
        }
    }

    /// Edit menu item clicked.
    pub fn toggle_edit(&mut self, session: &mut Session) {
        if self.edit_open {
            self.close_edit(session);
        } else {
            self.edit_open = true;
            self.controls_open = false;
            session.mode = session.last_mode;
        }
    }

    /// Image controls menu item clicked.
    pub fn toggle_controls(&mut self, session: &mut Session) {
        self.controls_open = !self.controls_open;
        if self.controls_open && self.edit_open {
            self.close_edit(session);
        }
    }

    /// Filters saved; the controls panel closes.
    pub fn close_controls(&mut self) {
        self.controls_open = false;
    }

    /// A mode picked from the edit panel.
    pub fn select_mode(&mut self, session: &mut Session, mode: EditMode) {
        session.mode = mode;
        session.reset_gesture();
    }

    fn close_edit(&mut self, session: &mut Session) {
        self.edit_open = false;
        session.last_mode = session.mode;
        session.mode = EditMode::Off;
        session.reset_gesture();
    }

    /// Whether the SVG/PNG export items are offered. Built-in diagrams only
    /// offer them while editing; saved diagrams always do.
    #[must_use]
    pub fn exports_visible(session: &Session, saved: bool) -> bool {
        saved || session.mode != EditMode::Off
    }
}
