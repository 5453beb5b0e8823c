//! Keyboard input model.
//!
//! Platform key events are normalized into a [`KeyCombo`] before they reach
//! a monitor. Monitors only ask two questions of a combo: is it a devtools
//! shortcut, and is it a restricted clipboard/print/save action.

use vigil_core::RestrictedAction;

/// Keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Escape key.
    Escape,
    /// Enter/Return key.
    Enter,
    /// Tab key.
    Tab,
    /// Backspace key.
    Backspace,
    /// Space bar.
    Space,
    /// Alphanumeric key, stored lowercase.
    Char(char),
    /// Function key `F1..=F24`.
    Function(u8),
    /// Anything the monitors do not care about.
    Other,
}

impl Key {
    /// Builds a character key, folding case.
    #[must_use]
    pub fn char(c: char) -> Self {
        Self::Char(c.to_ascii_lowercase())
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Control key is held.
    pub ctrl: bool,
    /// Alt key is held.
    pub alt: bool,
    /// Super/Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Returns true if the platform "command" modifier is held.
    #[must_use]
    pub const fn command(&self, meta_as_ctrl: bool) -> bool {
        self.ctrl || (meta_as_ctrl && self.meta)
    }
}

/// What the platform should do with an event after a monitor handled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Let the default action run.
    PassThrough,
    /// Cancel the default action.
    Suppress,
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    /// Pressed key.
    pub key: Key,
    /// Held modifiers.
    pub modifiers: Modifiers,
}

impl KeyCombo {
    /// Bare key press.
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self { key, modifiers: Modifiers::default() }
    }

    /// `Ctrl+<c>`.
    #[must_use]
    pub fn ctrl(c: char) -> Self {
        Self::new(Key::char(c)).with_ctrl()
    }

    /// Adds Ctrl.
    #[must_use]
    pub fn with_ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    /// Adds Shift.
    #[must_use]
    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    /// Adds Meta.
    #[must_use]
    pub fn with_meta(mut self) -> Self {
        self.modifiers.meta = true;
        self
    }

    /// F12, `Ctrl+Shift+{I,J,C}` or `Ctrl+U`.
    #[must_use]
    pub fn is_devtools(&self, meta_as_ctrl: bool) -> bool {
        let command = self.modifiers.command(meta_as_ctrl);
        match self.key {
            Key::Function(12) => true,
            Key::Char('i' | 'j' | 'c') => command && self.modifiers.shift,
            Key::Char('u') => command,
            _ => false,
        }
    }

    /// Maps the combo to the restricted action it would perform, if any.
    ///
    /// Devtools shortcuts take precedence, so `Ctrl+Shift+C` is
    /// [`RestrictedAction::DevTools`] rather than a copy.
    #[must_use]
    pub fn restricted_action(&self, meta_as_ctrl: bool) -> Option<RestrictedAction> {
        if self.is_devtools(meta_as_ctrl) {
            return Some(RestrictedAction::DevTools);
        }
        if !self.modifiers.command(meta_as_ctrl) {
            return None;
        }
        match self.key {
            Key::Char('c') => Some(RestrictedAction::Copy),
            Key::Char('v') => Some(RestrictedAction::Paste),
            Key::Char('x') => Some(RestrictedAction::Cut),
            Key::Char('a') => Some(RestrictedAction::SelectAll),
            Key::Char('p') => Some(RestrictedAction::Print),
            Key::Char('s') => Some(RestrictedAction::Save),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipboard_combos() {
        assert_eq!(KeyCombo::ctrl('c').restricted_action(false), Some(RestrictedAction::Copy));
        assert_eq!(KeyCombo::ctrl('V').restricted_action(false), Some(RestrictedAction::Paste));
        assert_eq!(KeyCombo::ctrl('x').restricted_action(false), Some(RestrictedAction::Cut));
        assert_eq!(KeyCombo::ctrl('a').restricted_action(false), Some(RestrictedAction::SelectAll));
        assert_eq!(KeyCombo::ctrl('p').restricted_action(false), Some(RestrictedAction::Print));
        assert_eq!(KeyCombo::ctrl('s').restricted_action(false), Some(RestrictedAction::Save));
        assert_eq!(KeyCombo::ctrl('z').restricted_action(false), None);
        assert_eq!(KeyCombo::new(Key::char('c')).restricted_action(false), None);
    }

    #[test]
    fn test_meta_only_counts_when_enabled() {
        let cmd_c = KeyCombo::new(Key::char('c')).with_meta();
        assert_eq!(cmd_c.restricted_action(false), None);
        assert_eq!(cmd_c.restricted_action(true), Some(RestrictedAction::Copy));
    }

    #[test]
    fn test_devtools_precedence() {
        let inspect = KeyCombo::ctrl('c').with_shift();
        assert!(inspect.is_devtools(false));
        assert_eq!(inspect.restricted_action(false), Some(RestrictedAction::DevTools));
        assert!(KeyCombo::new(Key::Function(12)).is_devtools(false));
        assert!(KeyCombo::ctrl('u').is_devtools(false));
        assert!(!KeyCombo::ctrl('i').is_devtools(false));
        assert!(!KeyCombo::new(Key::Function(5)).is_devtools(false));
    }
}
