use ratatui::layout::Rect;

/// Share of the screen height given to the job list. Fixed: the list is what
/// the operator scans, the output pane gets the rest.
pub const JOB_LIST_SHARE: f64 = 0.4;
pub const MIN_JOB_LIST_HEIGHT: u16 = 5;
/// Row 0 is left to the key legend.
pub const JOB_LIST_TOP: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenGeometry {
    pub height: u16,
    pub width: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub job_list: Rect,
    pub output: Rect,
}

impl Regions {
    pub fn for_screen(height: u16, width: u16) -> Self {
        let list_height = job_list_height(height);
        let output_height = height.saturating_sub(list_height).saturating_sub(1);
        Self {
            job_list: Rect::new(0, JOB_LIST_TOP, width, list_height),
            output: Rect::new(0, list_height + 1, width, output_height),
        }
    }
}

pub fn job_list_height(screen_height: u16) -> u16 {
    let share = (JOB_LIST_SHARE * f64::from(screen_height)).floor() as u16;
    share.max(MIN_JOB_LIST_HEIGHT)
}

/// Remembers the last observed terminal size and only produces new regions
/// when it changes.
#[derive(Debug, Default)]
pub struct DimensionPlanner {
    last: Option<ScreenGeometry>,
}

impl DimensionPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry(&self) -> Option<ScreenGeometry> {
        self.last
    }

    pub fn recompute(&mut self, height: u16, width: u16) -> Option<Regions> {
        let observed = ScreenGeometry { height, width };
        if self.last == Some(observed) {
            return None;
        }
        self.last = Some(observed);
        Some(Regions::for_screen(height, width))
    }
}
