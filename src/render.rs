//! A small drawing interface for the printer screen.
//!
//! The screen only ever fills rectangles, draws single lines of text and
//! stretches nine-patch textures, so any toolkit that can do those three
//! things can host it.

use std::fmt::{self, Display, Formatter};

use derive_more::{Constructor, Display as DisplayDerive};

/// A 32-bit ARGB color.
pub type Color = u32;

pub const WHITE: Color = 0xFF_FF_FF_FF;
pub const YELLOW: Color = 0xFF_FF_FF_00;
pub const LABEL_GRAY: Color = 0xFF_40_40_40;

/// An axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Constructor)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Whether the point lies inside the rectangle, edges included.
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// A rectangle of the given size centered in this one.
    pub const fn centered(&self, width: i32, height: i32) -> Self {
        Self {
            x: self.x + (self.width - width) / 2,
            y: self.y + (self.height - height) / 2,
            width,
            height,
        }
    }
}

/// A texture known to the host renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DisplayDerive)]
pub struct TextureId(pub &'static str);

impl TextureId {
    pub const PRINTER_GUI: Self = Self("printer:textures/gui/printer_gui.png");
    pub const PRINTER_SIDE_PANEL: Self = Self("printer:textures/gui/second_image.png");
}

/// One thing to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Fill { rect: Rect, color: Color },
    Text { x: i32, y: i32, text: String, color: Color },
    NinePatch { texture: TextureId, rect: Rect },
}

/// A surface the screen draws on.
pub trait Canvas {
    fn fill(&mut self, rect: Rect, color: Color);
    /// Draws a line of text with its top-left corner at `(x, y)`.
    fn text(&mut self, x: i32, y: i32, text: &str, color: Color);
    fn nine_patch(&mut self, texture: TextureId, rect: Rect);

    /// Draws a one pixel outline just inside `rect`.
    fn border(&mut self, rect: Rect, color: Color) {
        self.fill(Rect::new(rect.x, rect.y, rect.width, 1), color);
        self.fill(Rect::new(rect.x, rect.bottom() - 1, rect.width, 1), color);
        self.fill(Rect::new(rect.x, rect.y, 1, rect.height), color);
        self.fill(Rect::new(rect.right() - 1, rect.y, 1, rect.height), color);
    }
}

/// Measures text the way the host's font renders it.
pub trait FontMetrics {
    fn width(&self, text: &str) -> i32;
    fn line_height(&self) -> i32;
}

/// A font where every character has the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct MonospaceFont {
    pub glyph_width: i32,
    pub line_height: i32,
}

impl Default for MonospaceFont {
    fn default() -> Self {
        Self {
            glyph_width: 6,
            line_height: 9,
        }
    }
}

impl FontMetrics for MonospaceFont {
    fn width(&self, text: &str) -> i32 {
        text.chars().count() as i32 * self.glyph_width
    }

    fn line_height(&self) -> i32 {
        self.line_height
    }
}

/// A canvas that records commands for the host to replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandList {
    pub commands: Vec<DrawCommand>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// All text drawn so far, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Replays the recorded commands onto another canvas.
    pub fn replay(&self, canvas: &mut impl Canvas) {
        for command in &self.commands {
            match command {
                DrawCommand::Fill { rect, color } => canvas.fill(*rect, *color),
                DrawCommand::Text { x, y, text, color } => canvas.text(*x, *y, text, *color),
                DrawCommand::NinePatch { texture, rect } => canvas.nine_patch(*texture, *rect),
            }
        }
    }
}

impl Canvas for CommandList {
    fn fill(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::Fill { rect, color });
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            text: text.to_owned(),
            color,
        });
    }

    fn nine_patch(&mut self, texture: TextureId, rect: Rect) {
        self.commands.push(DrawCommand::NinePatch { texture, rect });
    }
}

/// A canvas that draws with characters, one cell per `cell` pixels.
///
/// Thin fills become `-`, `|` or `+` lines, translucent fills clear their
/// area, opaque fills become `#` and nine-patches become `.`. Text is laid
/// out one character per cell, so pair it with a [`MonospaceFont`] whose
/// glyph width is the cell width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiCanvas {
    columns: usize,
    rows: usize,
    cell_width: i32,
    cell_height: i32,
    cells: Vec<char>,
}

impl AsciiCanvas {
    pub fn new(width: i32, height: i32, cell_width: i32, cell_height: i32) -> Self {
        let cell_width = cell_width.max(1);
        let cell_height = cell_height.max(1);
        let columns = (width.max(0) / cell_width) as usize;
        let rows = (height.max(0) / cell_height) as usize;
        Self {
            columns,
            rows,
            cell_width,
            cell_height,
            cells: vec![' '; columns * rows],
        }
    }

    /// A font whose glyphs line up with this canvas's cells.
    pub fn font(&self) -> MonospaceFont {
        MonospaceFont::new(self.cell_width, self.cell_height)
    }

    pub fn get(&self, column: usize, row: usize) -> Option<char> {
        (column < self.columns && row < self.rows).then(|| self.cells[row * self.columns + column])
    }

    fn put(&mut self, column: i32, row: i32, c: char) {
        if let (Ok(column), Ok(row)) = (usize::try_from(column), usize::try_from(row)) {
            if column < self.columns && row < self.rows {
                self.cells[row * self.columns + column] = c;
            }
        }
    }

    fn cell_span(start: i32, end: i32, cell: i32) -> (i32, i32) {
        let first = start.div_euclid(cell);
        let last = (end - 1).div_euclid(cell);
        (first, last.max(first))
    }

    fn paint(&mut self, rect: Rect, mut brush: impl FnMut(char) -> char) {
        if rect.width <= 0 || rect.height <= 0 {
            return;
        }
        let (first_column, last_column) = Self::cell_span(rect.x, rect.right(), self.cell_width);
        let (first_row, last_row) = Self::cell_span(rect.y, rect.bottom(), self.cell_height);
        for row in first_row..=last_row {
            for column in first_column..=last_column {
                let current = self.get_signed(column, row);
                if let Some(current) = current {
                    self.put(column, row, brush(current));
                }
            }
        }
    }

    fn get_signed(&self, column: i32, row: i32) -> Option<char> {
        self.get(usize::try_from(column).ok()?, usize::try_from(row).ok()?)
    }
}

impl Canvas for AsciiCanvas {
    fn fill(&mut self, rect: Rect, color: Color) {
        let opaque = color >> 24 == 0xFF;
        if rect.height == 1 && rect.width > 1 {
            self.paint(rect, |c| if matches!(c, '|' | '+') { '+' } else { '-' });
        } else if rect.width == 1 && rect.height > 1 {
            self.paint(rect, |c| if matches!(c, '-' | '+') { '+' } else { '|' });
        } else if opaque {
            self.paint(rect, |_| '#');
        } else {
            self.paint(rect, |_| ' ');
        }
    }

    fn text(&mut self, x: i32, y: i32, text: &str, _color: Color) {
        let row = y.div_euclid(self.cell_height);
        let first_column = x.div_euclid(self.cell_width);
        for (i, c) in text.chars().enumerate() {
            self.put(first_column + i as i32, row, c);
        }
    }

    fn nine_patch(&mut self, _texture: TextureId, rect: Rect) {
        self.paint(rect, |_| '.');
    }
}

impl Display for AsciiCanvas {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.columns.max(1)) {
            let line: String = row.iter().collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_edges() {
        let rect = Rect::new(10, 10, 8, 80);
        assert!(rect.contains(10, 10));
        assert!(rect.contains(18, 90));
        assert!(!rect.contains(19, 50));
        assert!(!rect.contains(9, 50));
    }

    #[test]
    fn rect_centered() {
        let screen = Rect::new(0, 0, 400, 300);
        assert_eq!(screen.centered(200, 50), Rect::new(100, 125, 200, 50));
    }

    #[test]
    fn border_is_four_fills() {
        let mut list = CommandList::new();
        list.border(Rect::new(0, 0, 10, 5), WHITE);
        assert_eq!(
            list.commands,
            [
                DrawCommand::Fill { rect: Rect::new(0, 0, 10, 1), color: WHITE },
                DrawCommand::Fill { rect: Rect::new(0, 4, 10, 1), color: WHITE },
                DrawCommand::Fill { rect: Rect::new(0, 0, 1, 5), color: WHITE },
                DrawCommand::Fill { rect: Rect::new(9, 0, 1, 5), color: WHITE },
            ]
        );
    }

    #[test]
    fn monospace_width_counts_characters() {
        let font = MonospaceFont::default();
        assert_eq!(font.width("Missing Items:"), 14 * 6);
        assert_eq!(font.width("90°"), 18);
    }

    #[test]
    fn ascii_box_with_text() {
        let mut canvas = AsciiCanvas::new(60, 50, 6, 10);
        canvas.fill(Rect::new(0, 0, 60, 50), 0xAA000000);
        canvas.border(Rect::new(0, 0, 60, 50), WHITE);
        canvas.text(12, 20, "hi", WHITE);
        assert_eq!(
            canvas.to_string(),
            "+--------+\n|        |\n| hi     |\n|        |\n+--------+\n"
        );
    }

    #[test]
    fn ascii_clips_out_of_bounds() {
        let mut canvas = AsciiCanvas::new(12, 10, 6, 10);
        canvas.text(-6, 0, "abcd", WHITE);
        canvas.fill(Rect::new(-100, -100, 50, 50), WHITE);
        assert_eq!(canvas.to_string(), "bc\n");
    }

    #[test]
    fn replay_reproduces_commands() {
        let mut list = CommandList::new();
        list.nine_patch(TextureId::PRINTER_GUI, Rect::new(0, 0, 10, 10));
        list.text(1, 2, "x", YELLOW);
        let mut copy = CommandList::new();
        list.replay(&mut copy);
        assert_eq!(copy, list);
        assert_eq!(copy.texts().collect::<Vec<_>>(), ["x"]);
    }
}
