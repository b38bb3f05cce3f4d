use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub key: &'static str,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    NavigateUp,
    NavigateDown,
    ClearSelection,
    RemoveJob,
    Quit,
}

pub const DASHBOARD_BINDINGS: [HotkeyBinding; 5] = [
    HotkeyBinding {
        key: "↑",
        action: "up",
    },
    HotkeyBinding {
        key: "↓",
        action: "down",
    },
    HotkeyBinding {
        key: "esc",
        action: "clear selection",
    },
    HotkeyBinding {
        key: "d",
        action: "remove",
    },
    HotkeyBinding {
        key: "q",
        action: "quit",
    },
];

pub fn dashboard_controls_legend() -> String {
    format_bindings("Keys: ", &DASHBOARD_BINDINGS)
}

/// Letter keys match in either case. Releases and repeats are ignored.
pub fn action_for_key(key: &KeyEvent) -> Option<HotkeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(HotkeyAction::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Up => Some(HotkeyAction::NavigateUp),
        KeyCode::Down => Some(HotkeyAction::NavigateDown),
        KeyCode::Esc => Some(HotkeyAction::ClearSelection),
        KeyCode::Delete | KeyCode::Char('d') | KeyCode::Char('D') => Some(HotkeyAction::RemoveJob),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(HotkeyAction::Quit),
        _ => None,
    }
}

fn format_bindings(prefix: &str, bindings: &[HotkeyBinding]) -> String {
    let parts = bindings
        .iter()
        .map(|binding| format!("{} {}", binding.key, binding.action))
        .collect::<Vec<_>>();
    format!("{prefix}{}", parts.join("  "))
}
