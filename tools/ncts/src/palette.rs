use crate::types::JobState;
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowColor {
    Normal,
    Error,
    Queued,
    Running,
}

impl RowColor {
    pub fn for_state(state: JobState) -> Self {
        match state {
            JobState::Running => Self::Running,
            JobState::Queued => Self::Queued,
            JobState::FinishedError => Self::Error,
            JobState::FinishedOk => Self::Normal,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Normal => Color::White,
            Self::Error => Color::Red,
            Self::Queued => Color::Yellow,
            Self::Running => Color::Green,
        }
    }
}

/// Row color plus whether the selection overlay inverts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub color: RowColor,
    pub inverted: bool,
}

impl Highlight {
    pub fn style(self) -> Style {
        let color = self.color.color();
        if self.inverted {
            Style::default().fg(Color::Black).bg(color)
        } else {
            Style::default().fg(color).bg(Color::Black)
        }
    }
}

/// Selection swaps foreground and background of the state color; it never
/// changes the hue.
pub fn highlight(row: usize, state: JobState, selected_row: Option<usize>) -> Highlight {
    Highlight {
        color: RowColor::for_state(state),
        inverted: selected_row == Some(row),
    }
}

pub fn header_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}
