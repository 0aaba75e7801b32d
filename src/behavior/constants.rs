//! Named input constants accepted in event tables
//!
//! Event table entries may spell their attributes as `Type_*`, `BS_*` and
//! `Key_*` names instead of raw numbers. The values follow the Qt numbering
//! that platform adapters deliver.

use crate::{Error, Result};

/// Raw event type codes
pub mod event_type {
    pub const NONE: i32 = 0;
    pub const TIMER: i32 = 1;
    pub const MOUSE_BUTTON_PRESS: i32 = 2;
    pub const MOUSE_BUTTON_RELEASE: i32 = 3;
    pub const MOUSE_BUTTON_DBL_CLICK: i32 = 4;
    pub const MOUSE_MOVE: i32 = 5;
    pub const KEY_PRESS: i32 = 6;
    pub const KEY_RELEASE: i32 = 7;
    pub const WHEEL: i32 = 31;
    pub const USER: i32 = 1000;
    pub const TD_MOUSE_INPUT: i32 = 1094;
    pub const TD_MOUSE_KEY_DOWN: i32 = 1095;
    pub const MAX_USER: i32 = 65535;
}

/// Mouse button and modifier bits
pub mod button {
    pub const NO_BUTTON: i32 = 0x0000;
    pub const LEFT: i32 = 0x0001;
    pub const RIGHT: i32 = 0x0002;
    pub const MID: i32 = 0x0004;
    pub const MOUSE_BUTTON_MASK: i32 = 0x0007;
    pub const SHIFT: i32 = 0x0100;
    pub const CONTROL: i32 = 0x0200;
    pub const ALT: i32 = 0x0400;
    pub const META: i32 = 0x0800;
    pub const KEY_BUTTON_MASK: i32 = 0x0f00;
    pub const KEYPAD: i32 = 0x4000;
}

/// Key codes
pub mod key {
    pub const ESCAPE: i32 = 0x1000;
    pub const TAB: i32 = 0x1001;
    pub const BACKSPACE: i32 = 0x1003;
    pub const RETURN: i32 = 0x1004;
    pub const ENTER: i32 = 0x1005;
    pub const DELETE: i32 = 0x1007;
    pub const LEFT: i32 = 0x1012;
    pub const UP: i32 = 0x1013;
    pub const RIGHT: i32 = 0x1014;
    pub const DOWN: i32 = 0x1015;
    pub const SPACE: i32 = 0x20;
    pub const NONE: i32 = 0xffff;
}

const TYPES: &[(&str, i32)] = &[
    ("Type_None", event_type::NONE),
    ("Type_Timer", event_type::TIMER),
    ("Type_MouseButtonPress", event_type::MOUSE_BUTTON_PRESS),
    ("Type_MouseButtonRelease", event_type::MOUSE_BUTTON_RELEASE),
    ("Type_MouseButtonDblClick", event_type::MOUSE_BUTTON_DBL_CLICK),
    ("Type_MouseMove", event_type::MOUSE_MOVE),
    ("Type_KeyPress", event_type::KEY_PRESS),
    ("Type_KeyRelease", event_type::KEY_RELEASE),
    ("Type_FocusIn", 8),
    ("Type_FocusOut", 9),
    ("Type_Enter", 10),
    ("Type_Leave", 11),
    ("Type_Wheel", event_type::WHEEL),
    ("Type_DragEnter", 60),
    ("Type_DragMove", 61),
    ("Type_DragLeave", 62),
    ("Type_Drop", 63),
    ("Type_ContextMenu", 82),
    ("Type_TabletMove", 87),
    ("Type_TabletPress", 92),
    ("Type_TabletRelease", 93),
    ("Type_User", event_type::USER),
    ("Type_TDMouseInput", event_type::TD_MOUSE_INPUT),
    ("Type_TDMouseKeyDown", event_type::TD_MOUSE_KEY_DOWN),
    ("Type_MaxUser", event_type::MAX_USER),
];

const BUTTONS: &[(&str, i32)] = &[
    ("BS_NoButton", button::NO_BUTTON),
    ("BS_LeftButton", button::LEFT),
    ("BS_RightButton", button::RIGHT),
    ("BS_MidButton", button::MID),
    ("BS_MouseButtonMask", button::MOUSE_BUTTON_MASK),
    ("BS_ShiftButton", button::SHIFT),
    ("BS_ControlButton", button::CONTROL),
    ("BS_AltButton", button::ALT),
    ("BS_MetaButton", button::META),
    ("BS_KeyButtonMask", button::KEY_BUTTON_MASK),
    ("BS_Keypad", button::KEYPAD),
];

const KEYS: &[(&str, i32)] = &[
    ("Key_Escape", key::ESCAPE),
    ("Key_Tab", key::TAB),
    ("Key_Backtab", 0x1002),
    ("Key_Backspace", key::BACKSPACE),
    ("Key_Return", key::RETURN),
    ("Key_Enter", key::ENTER),
    ("Key_Insert", 0x1006),
    ("Key_Delete", key::DELETE),
    ("Key_Pause", 0x1008),
    ("Key_Print", 0x1009),
    ("Key_Home", 0x1010),
    ("Key_End", 0x1011),
    ("Key_Left", key::LEFT),
    ("Key_Up", key::UP),
    ("Key_Right", key::RIGHT),
    ("Key_Down", key::DOWN),
    ("Key_PageUp", 0x1016),
    ("Key_Prior", 0x1016),
    ("Key_PageDown", 0x1017),
    ("Key_Next", 0x1017),
    ("Key_Shift", 0x1020),
    ("Key_Control", 0x1021),
    ("Key_Meta", 0x1022),
    ("Key_Alt", 0x1023),
    ("Key_Space", key::SPACE),
    ("Key_Any", key::SPACE),
    ("Key_Plus", 0x2b),
    ("Key_Minus", 0x2d),
    ("Key_unknown", key::NONE),
    ("Key_none", key::NONE),
];

/// Resolve a constant name such as `BS_LeftButton` or `Key_F5`
pub fn lookup(name: &str) -> Option<i32> {
    TYPES
        .iter()
        .chain(BUTTONS)
        .chain(KEYS)
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, value)| *value)
        .or_else(|| generated_key(name))
}

/// Letters, digits and function keys follow fixed arithmetic ranges.
fn generated_key(name: &str) -> Option<i32> {
    let suffix = name.strip_prefix("Key_")?;
    let mut chars = suffix.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() || c.is_ascii_digit() => Some(c as i32),
        _ => {
            let n: i32 = suffix.strip_prefix('F')?.parse().ok()?;
            (1..=35).contains(&n).then_some(0x1030 + n - 1)
        }
    }
}

/// Parse a decimal or `0x` hexadecimal literal
pub fn parse_int(text: &str) -> Option<i32> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i32>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Resolve an attribute that may be either a literal or a constant name
pub fn resolve(text: &str) -> Result<i32> {
    parse_int(text)
        .or_else(|| lookup(text.trim()))
        .ok_or_else(|| Error::UnknownConstant(text.trim().to_string()))
}
