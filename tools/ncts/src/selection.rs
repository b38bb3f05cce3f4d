/// Highlighted job row. Rows are 1-based to match display rows below the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    NavigateUp,
    NavigateDown,
    Escape,
    JobListShrunk(usize),
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    job_count: usize,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn selected_row(&self) -> Option<usize> {
        match self.state {
            SelectionState::Unselected => None,
            SelectionState::Selected(row) => Some(row),
        }
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.state == SelectionState::Selected(row)
    }

    pub fn apply(&mut self, event: SelectionEvent) -> SelectionState {
        self.state = match (self.state, event) {
            (_, SelectionEvent::Escape) => SelectionState::Unselected,
            (state, SelectionEvent::NavigateUp) => self.step(state, -1),
            (state, SelectionEvent::NavigateDown) => self.step(state, 1),
            (state, SelectionEvent::JobListShrunk(count)) => {
                self.job_count = count;
                match state {
                    _ if count == 0 => SelectionState::Unselected,
                    SelectionState::Selected(row) if row > count => {
                        SelectionState::Selected(count)
                    }
                    other => other,
                }
            }
        };
        self.state
    }

    fn step(&self, state: SelectionState, delta: isize) -> SelectionState {
        if self.job_count == 0 {
            return SelectionState::Unselected;
        }
        let current = match state {
            SelectionState::Unselected => 0,
            SelectionState::Selected(row) => row,
        };
        let target = current.saturating_add_signed(delta);
        SelectionState::Selected(target.clamp(1, self.job_count))
    }
}
