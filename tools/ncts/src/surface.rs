use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Widget};

const TAB_STOP: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PadRow {
    text: String,
    style: Style,
}

/// Off-screen row buffer. Rows past `height` are dropped on write; long rows
/// are kept whole and only cut when projected onto a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pad {
    height: u16,
    width: u16,
    rows: Vec<Option<PadRow>>,
}

impl Pad {
    pub fn new(height: u16, width: u16) -> Self {
        Self {
            height,
            width,
            rows: vec![None; usize::from(height)],
        }
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    /// Returns false when `row` is outside the pad.
    pub fn put(&mut self, row: u16, text: &str, style: Style) -> bool {
        let Some(slot) = self.rows.get_mut(usize::from(row)) else {
            return false;
        };
        *slot = Some(PadRow {
            text: expand_tabs(text),
            style,
        });
        true
    }

    pub fn clear(&mut self) {
        self.rows.iter_mut().for_each(|row| *row = None);
    }

    pub fn row_text(&self, row: u16) -> Option<&str> {
        self.row(row).map(|row| row.text.as_str())
    }

    pub fn row_style(&self, row: u16) -> Option<Style> {
        self.row(row).map(|row| row.style)
    }

    fn row(&self, row: u16) -> Option<&PadRow> {
        self.rows.get(usize::from(row)).and_then(Option::as_ref)
    }

    fn grow(&mut self, height: u16, width: u16) {
        if height > self.height {
            self.height = height;
            self.rows.resize(usize::from(height), None);
        }
        if width > self.width {
            self.width = width;
        }
    }
}

fn expand_tabs(text: &str) -> String {
    if !text.contains('\t') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + TAB_STOP);
    let mut column = 0usize;
    for ch in text.chars() {
        if ch == '\t' {
            let pad = TAB_STOP - column % TAB_STOP;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

/// A bordered window on screen paired with the pad it shows.
///
/// Rendering writes into the frame buffer only; nothing reaches the terminal
/// until the owning terminal flushes the frame, so several surfaces can be
/// updated per cycle and shown in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    y: u16,
    x: u16,
    height: u16,
    width: u16,
    top: u16,
    pad: Pad,
}

impl Surface {
    pub fn new(y: u16, x: u16, height: u16, width: u16) -> Self {
        Self {
            y,
            x,
            height,
            width,
            top: 0,
            pad: Pad::new(height, width),
        }
    }

    /// Swaps in a fresh pad, never smaller than the window.
    pub fn attach_pad(&mut self, height: u16, width: u16) {
        self.pad = Pad::new(height.max(self.height), width.max(self.width));
    }

    pub fn pad(&self) -> &Pad {
        &self.pad
    }

    pub fn pad_mut(&mut self) -> &mut Pad {
        &mut self.pad
    }

    pub fn area(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// The pad only ever grows, so rows already written wider than the new
    /// window survive a shrink-then-grow.
    pub fn resize(&mut self, height: u16, width: u16) {
        self.height = height;
        self.width = width;
        self.pad.grow(height, width);
    }

    pub fn move_to(&mut self, y: u16, x: u16) {
        self.y = y;
        self.x = x;
    }

    /// First pad row shown in the window.
    pub fn top(&self) -> u16 {
        self.top
    }

    /// Scrolls the projection as little as possible so `row` is inside the
    /// window interior.
    pub fn scroll_to_show(&mut self, row: u16) {
        let visible = self.height.saturating_sub(2).max(1);
        if row < self.top {
            self.top = row;
        } else if row >= self.top.saturating_add(visible) {
            self.top = row - visible + 1;
        }
    }

    pub fn render(&self, buf: &mut Buffer) {
        let window = self.area().intersection(buf.area);
        if window.is_empty() {
            return;
        }
        let block = Block::bordered();
        let inner = block.inner(window);
        block.render(window, buf);

        let visible_width = usize::from(inner.width.min(self.pad.width));
        for offset in 0..inner.height {
            if let Some(row) = self.pad.row(self.top.saturating_add(offset)) {
                buf.set_stringn(inner.x, inner.y + offset, &row.text, visible_width, row.style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Pad, Surface};
    use ratatui::buffer::Buffer;
    use ratatui::layout::Rect;
    use ratatui::style::{Color, Style};

    fn row_string(buf: &Buffer, y: u16) -> String {
        (buf.area.x..buf.area.x + buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn pad_width_never_shrinks() {
        let mut surface = Surface::new(1, 0, 10, 40);
        surface.attach_pad(500, 80);
        assert_eq!(surface.pad().width(), 80);

        surface.resize(10, 60);
        assert_eq!(surface.pad().width(), 80);

        surface.resize(12, 120);
        assert_eq!(surface.pad().width(), 120);
        assert_eq!(surface.pad().height(), 500);

        surface.resize(12, 30);
        assert_eq!(surface.pad().width(), 120);
    }

    #[test]
    fn attach_pad_is_never_smaller_than_window() {
        let mut surface = Surface::new(0, 0, 30, 100);
        surface.attach_pad(10, 80);
        assert_eq!(surface.pad().height(), 30);
        assert_eq!(surface.pad().width(), 100);
    }

    #[test]
    fn move_keeps_pad_contents() {
        let mut surface = Surface::new(1, 0, 5, 20);
        surface.pad_mut().put(0, "hello", Style::default());
        surface.move_to(7, 2);
        assert_eq!(surface.area(), Rect::new(2, 7, 20, 5));
        assert_eq!(surface.pad().row_text(0), Some("hello"));
    }

    #[test]
    fn writes_past_the_row_budget_are_dropped() {
        let mut pad = Pad::new(2, 10);
        assert!(pad.put(1, "last", Style::default()));
        assert!(!pad.put(2, "overflow", Style::default()));
        pad.clear();
        assert_eq!(pad.row_text(1), None);
    }

    #[test]
    fn tabs_expand_to_eight_column_stops() {
        let mut pad = Pad::new(1, 40);
        pad.put(0, "a\tb", Style::default());
        assert_eq!(pad.row_text(0), Some("a       b"));
    }

    #[test]
    fn render_draws_border_and_clips_long_rows_to_interior() {
        let mut surface = Surface::new(0, 0, 4, 10);
        surface.attach_pad(50, 80);
        let style = Style::default().fg(Color::Green);
        surface.pad_mut().put(0, "0123456789abcdef", style);
        surface.pad_mut().put(1, "second", Style::default());
        surface.pad_mut().put(2, "hidden below the fold", Style::default());

        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 4));
        surface.render(&mut buf);

        assert_eq!(row_string(&buf, 0), "┌────────┐");
        assert_eq!(row_string(&buf, 1), "│01234567│");
        assert_eq!(row_string(&buf, 2), "│second  │");
        assert_eq!(row_string(&buf, 3), "└────────┘");
        assert_eq!(buf[(1, 1)].fg, Color::Green);
    }

    #[test]
    fn scrolling_projects_the_rows_around_the_target() {
        let mut surface = Surface::new(0, 0, 4, 12);
        surface.attach_pad(20, 12);
        for row in 0..10u16 {
            surface.pad_mut().put(row, &format!("row {row}"), Style::default());
        }

        surface.scroll_to_show(1);
        assert_eq!(surface.top(), 0);
        surface.scroll_to_show(5);
        assert_eq!(surface.top(), 4);
        surface.scroll_to_show(4);
        assert_eq!(surface.top(), 4);
        surface.scroll_to_show(2);
        assert_eq!(surface.top(), 2);

        surface.scroll_to_show(7);
        let mut buf = Buffer::empty(Rect::new(0, 0, 12, 4));
        surface.render(&mut buf);
        assert_eq!(row_string(&buf, 1), "│row 6     │");
        assert_eq!(row_string(&buf, 2), "│row 7     │");
    }

    #[test]
    fn render_outside_the_buffer_is_a_no_op() {
        let surface = Surface::new(20, 0, 5, 10);
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 10));
        surface.render(&mut buf);
        assert_eq!(buf, Buffer::empty(Rect::new(0, 0, 10, 10)));
    }
}
