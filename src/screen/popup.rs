//! Status overlays drawn on top of the printer screen.
//!
//! Popups hold no state of their own: the screen lays them out again every
//! frame from the block entity's current state.

use derive_more::Display;

use crate::block_entity::{MissingItems, TICKS_PER_SECOND};
use crate::render::{Canvas, Color, FontMetrics, Rect, WHITE};

const BACKGROUND: Color = 0xAA_00_00_00;
const PADDING: i32 = 10;
const FIXED_WIDTH: i32 = 200;
const FIXED_HEIGHT: i32 = 50;
const MISSING_ITEMS_MIN_WIDTH: i32 = 150;
const MISSING_ITEMS_TITLE: &str = "Missing Items:";
const MISSING_ITEMS_TITLE_HEIGHT: i32 = 15;
const LINE_HEIGHT: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PopupKind {
    MissingItems,
    NotEnoughEnergy,
    PlacementDelay,
}

/// A line of popup text, positioned in screen pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupLine {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

/// A laid-out popup: a bordered box and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub kind: PopupKind,
    pub rect: Rect,
    pub lines: Vec<PopupLine>,
}

impl Popup {
    pub fn draw(&self, canvas: &mut impl Canvas) {
        canvas.fill(self.rect, BACKGROUND);
        canvas.border(self.rect, WHITE);
        for line in &self.lines {
            canvas.text(line.x, line.y, &line.text, WHITE);
        }
    }
}

fn missing_item_line(item: &str, count: u32) -> String {
    format!("{count} x {item}")
}

/// Lists the items the server is missing, one per line, sized to the
/// longest line.
pub fn missing_items(items: &MissingItems, font: &impl FontMetrics, screen: Rect) -> Popup {
    let lines = items
        .iter()
        .map(|(item, &count)| missing_item_line(item, count))
        .collect::<Vec<_>>();
    let widest = lines
        .iter()
        .map(|line| font.width(line))
        .fold(font.width(MISSING_ITEMS_TITLE), i32::max);

    let width = MISSING_ITEMS_MIN_WIDTH.max(widest + PADDING * 2);
    let height = MISSING_ITEMS_TITLE_HEIGHT + lines.len() as i32 * LINE_HEIGHT + PADDING * 2;
    let rect = screen.centered(width, height);

    let x = rect.x + PADDING;
    let mut y = rect.y + PADDING;
    let mut popup_lines = vec![PopupLine {
        x,
        y,
        text: MISSING_ITEMS_TITLE.to_owned(),
    }];
    y += MISSING_ITEMS_TITLE_HEIGHT;
    for text in lines {
        popup_lines.push(PopupLine { x, y, text });
        y += LINE_HEIGHT;
    }

    Popup {
        kind: PopupKind::MissingItems,
        rect,
        lines: popup_lines,
    }
}

/// Tells the player the printer lacks the energy to place the structure.
pub fn not_enough_energy(font: &impl FontMetrics, screen: Rect) -> Popup {
    let rect = screen.centered(FIXED_WIDTH, FIXED_HEIGHT);
    // Both lines start where the first one is centered.
    let first = "Not enough energy ";
    let x = rect.x + (rect.width - font.width(first)) / 2;
    let y = rect.y + (rect.height - font.line_height()) / 2;
    Popup {
        kind: PopupKind::NotEnoughEnergy,
        rect,
        lines: vec![
            PopupLine {
                x,
                y,
                text: first.to_owned(),
            },
            PopupLine {
                x,
                y: y + LINE_HEIGHT,
                text: "to place the structure!".to_owned(),
            },
        ],
    }
}

/// Formats ticks as seconds with one decimal, rounding halves up.
pub fn format_seconds(ticks: u32) -> String {
    // One tick is 0.05s, so tenths = ticks / 2 rounded half up.
    let tenths = (u64::from(ticks) * 10 + u64::from(TICKS_PER_SECOND) / 2) / u64::from(TICKS_PER_SECOND);
    format!("{}.{}s", tenths / 10, tenths % 10)
}

/// Counts down to a pending placement.
pub fn placement_delay(ticks: u32, font: &impl FontMetrics, screen: Rect) -> Popup {
    let rect = screen.centered(FIXED_WIDTH, FIXED_HEIGHT);
    let centered = |text: &str| rect.x + (rect.width - font.width(text)) / 2;

    let title = "Placing Structure...";
    let time = format!("Time remaining: {}", format_seconds(ticks));
    let title_y = rect.y + PADDING;
    Popup {
        kind: PopupKind::PlacementDelay,
        rect,
        lines: vec![
            PopupLine {
                x: centered(title),
                y: title_y,
                text: title.to_owned(),
            },
            PopupLine {
                x: centered(&time),
                y: title_y + 20,
                text: time,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{AsciiCanvas, MonospaceFont};

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 400,
        height: 300,
    };

    #[test]
    fn missing_items_grows_with_longest_line() {
        let font = MonospaceFont::default();
        let mut items = MissingItems::new();
        items.insert("minecraft:stone".to_owned(), 64);
        let popup = missing_items(&items, &font, SCREEN);
        // Shorter than the minimum width.
        assert_eq!(popup.rect.width, 150);
        assert_eq!(popup.rect.height, 15 + 10 + 20);

        items.insert("minecraft:polished_blackstone_brick_stairs".to_owned(), 1200);
        let popup = missing_items(&items, &font, SCREEN);
        let longest = "1200 x minecraft:polished_blackstone_brick_stairs";
        assert_eq!(popup.rect.width, font.width(longest) + 20);
        assert_eq!(popup.rect.height, 15 + 20 + 20);
        assert_eq!(
            popup.lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>(),
            ["Missing Items:", longest, "64 x minecraft:stone"]
        );
        assert_eq!(popup.lines[1].y, popup.rect.y + 10 + 15);
        assert_eq!(popup.lines[2].y, popup.lines[1].y + 10);
    }

    #[test]
    fn fixed_popups_are_centered() {
        let font = MonospaceFont::default();
        let popup = not_enough_energy(&font, SCREEN);
        assert_eq!(popup.rect, Rect::new(100, 125, 200, 50));
        assert_eq!(popup.lines[0].x, popup.lines[1].x);

        let popup = placement_delay(30, &font, SCREEN);
        assert_eq!(popup.rect, Rect::new(100, 125, 200, 50));
        assert_eq!(popup.lines[1].text, "Time remaining: 1.5s");
        assert_eq!(popup.lines[1].y, popup.lines[0].y + 20);
    }

    #[test]
    fn seconds_round_half_up() {
        assert_eq!(format_seconds(0), "0.0s");
        assert_eq!(format_seconds(1), "0.1s");
        assert_eq!(format_seconds(5), "0.3s");
        assert_eq!(format_seconds(20), "1.0s");
        assert_eq!(format_seconds(199), "10.0s");
    }

    #[test]
    fn energy_popup_as_ascii() {
        let mut canvas = AsciiCanvas::new(240, 60, 6, 10);
        let screen = Rect::new(0, 0, 240, 60);
        not_enough_energy(&canvas.font(), screen).draw(&mut canvas);
        let art = canvas.to_string();
        assert!(art.contains("Not enough energy"));
        assert!(art.contains("to place the structure!"));
        assert!(art.lines().next().unwrap().contains("+----"));
    }
}
