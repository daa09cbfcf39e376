//! The printer's configuration screen.
//!
//! [`PrinterScreen`] is a plain controller: the host feeds it input through
//! [`PrinterScreen::update`] once per frame and asks it to draw itself onto a
//! [`Canvas`]. Everything the player does that the server must know about
//! becomes a message sent through the injected [`ClientConnection`].

use std::time::Instant;

use crate::block::{BlockPos, Rotation};
use crate::block_entity::{MissingItems, PrinterView};
use crate::catalog::SchematicCatalog;
use crate::config::PrinterConfig;
use crate::connection::messages::{
    PlaceStructure, PositionUpdate, PrinterMessage, RotationChange, SchematicSelection,
};
use crate::connection::{ClientConnection, Transport};
use crate::render::{Canvas, FontMetrics, Rect, TextureId, LABEL_GRAY, WHITE, YELLOW};

pub mod popup;
pub mod validation;

use popup::{Popup, PopupKind};
pub use validation::{Axis, Debounce, PositionFields, Validation};

// MARK: Layout

const IMAGE_WIDTH: i32 = 8 + 12 * 18 + 8;
const IMAGE_HEIGHT: i32 = 18 + 7 * 18 + 4 + 3 * 18 + 4 + 18 + 4 + 28;
const SIDE_PANEL_OFFSET: i32 = 185;
const SIDE_PANEL_WIDTH: i32 = 180;
const FIELD_WIDTH: i32 = 50;
const FIELD_HEIGHT: i32 = 20;
const FIELD_SPACING: i32 = 10;
const BUTTON_HEIGHT: i32 = 20;
const PLACE_BUTTON_WIDTH: i32 = 100;
const SCHEMATIC_LIST_TOP: i32 = 120;
const SCHEMATIC_BUTTON_HEIGHT: i32 = 10;
const SCHEMATIC_BUTTON_SPACING: i32 = 2;
const ENERGY_BAR: Rect = Rect {
    x: 200,
    y: 170,
    width: 8,
    height: 80,
};
const ENERGY_FILL: u32 = 0xFF_FF_FF_CC;
const FIELD_BACKGROUND: u32 = 0xFF_00_00_00;
const SEPARATOR: u32 = 0xFF_40_40_40;
const TITLE: &str = "Printer";
const INVENTORY_TITLE: &str = "Inventory";

// MARK: Input and state

/// Something the player did on the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenInput {
    /// The text of a position field changed.
    EditField { axis: Axis, value: String },
    /// A schematic button was clicked.
    SelectSchematic(usize),
    SetRotation(Rotation),
    /// The rotation button was clicked, advancing a quarter turn.
    CycleRotation,
    /// The "Place Structure" button was clicked.
    Place,
    MouseMoved { x: i32, y: i32 },
    /// The window was resized.
    Resize { width: i32, height: i32 },
    Close,
}

/// What the screen is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Idle,
    /// A position field was edited and is waiting to be validated.
    EditingPosition,
    /// The server is counting down to a placement.
    Placing { ticks: u32 },
    PopupShown(PopupKind),
}

/// Whether the host should keep the screen open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenFlow {
    Open,
    Closed,
}

/// Why a place action did not send anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceRejection {
    InvalidPosition,
    NoSchematicSelected,
}

// MARK: Screen

/// The client-side controller of a printer's screen.
#[derive(Debug)]
pub struct PrinterScreen<V: PrinterView, T: Transport> {
    config: PrinterConfig,
    connection: ClientConnection<T>,
    view: V,
    catalog: SchematicCatalog,
    fields: PositionFields,
    rotation: Rotation,
    selected: Option<usize>,
    debounce: Debounce,
    missing_items: MissingItems,
    not_enough_energy: bool,
    mouse: Option<(i32, i32)>,
    screen: Rect,
    closed: bool,
}

impl<V: PrinterView, T: Transport> PrinterScreen<V, T> {
    /// Opens the screen for the printer behind `view`.
    ///
    /// The position fields start at the player's position unless the printer
    /// already stores a target; the selection and rotation are restored from
    /// the printer.
    pub fn new(
        config: PrinterConfig,
        connection: ClientConnection<T>,
        view: V,
        catalog: SchematicCatalog,
        player_pos: BlockPos,
        screen_size: (i32, i32),
    ) -> Self {
        let target = view.stored_target().unwrap_or(player_pos);
        let selected = view
            .stored_schematic()
            .and_then(|name| catalog.index_of(name));
        let rotation = view.stored_rotation().unwrap_or_default();
        let debounce = Debounce::new(config.validation_delay);
        Self {
            config,
            connection,
            view,
            catalog,
            fields: PositionFields::from_pos(&target),
            rotation,
            selected,
            debounce,
            missing_items: MissingItems::new(),
            not_enough_energy: false,
            mouse: None,
            screen: Rect::new(0, 0, screen_size.0, screen_size.1),
            closed: false,
        }
    }

    /// Handles one input, if any, then runs the per-frame checks.
    ///
    /// Call once per frame with the current time.
    pub fn update(&mut self, now: Instant, input: Option<ScreenInput>) -> ScreenFlow {
        if self.closed {
            return ScreenFlow::Closed;
        }

        if let Some(input) = input {
            match input {
                ScreenInput::EditField { axis, value } => self.edit_field(now, axis, value),
                ScreenInput::SelectSchematic(index) => self.select_schematic(index),
                ScreenInput::SetRotation(rotation) => self.set_rotation(rotation),
                ScreenInput::CycleRotation => self.set_rotation(self.rotation.next()),
                ScreenInput::Place => {
                    _ = self.place();
                }
                ScreenInput::MouseMoved { x, y } => self.mouse = Some((x, y)),
                ScreenInput::Resize { width, height } => {
                    self.screen = Rect::new(0, 0, width, height);
                }
                ScreenInput::Close => {
                    self.close();
                    return ScreenFlow::Closed;
                }
            }
        }

        if self.debounce.poll(now) {
            self.validate();
        }
        ScreenFlow::Open
    }

    fn edit_field(&mut self, now: Instant, axis: Axis, value: String) {
        self.fields.set(axis, value);
        self.debounce.touch(now);
    }

    fn validate(&mut self) -> Validation {
        let origin = self.view.block_pos();
        let validation = validation::validate(&mut self.fields, &origin, self.config.max_distance);
        match validation {
            Validation::Unchanged => {}
            Validation::OutOfRange { distance } => log::debug!(
                "Target {distance:.1} blocks from printer at {origin}, resetting"
            ),
            Validation::Malformed => log::debug!("Invalid target position, resetting"),
        }
        validation
    }

    fn send(&self, message: impl Into<PrinterMessage>) {
        let message = message.into();
        let kind = message.kind();
        if let Err(err) = self.connection.send(message) {
            log::warn!("Failed to send {kind}: {err}");
        }
    }

    fn select_schematic(&mut self, index: usize) {
        let Some(entry) = self.catalog.get(index) else {
            log::debug!("Ignoring click on missing schematic #{index}");
            return;
        };
        self.selected = Some(index);
        self.send(SchematicSelection {
            block_entity: self.view.block_pos(),
            name: entry.name.clone(),
        });
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.send(RotationChange {
            block_entity: self.view.block_pos(),
            rotation,
        });
    }

    /// Sends a placement request for the selected schematic.
    ///
    /// Nothing is sent if a position field is not an integer or no schematic
    /// is selected; the player only sees that nothing happened.
    pub fn place(&mut self) -> Result<(), PlaceRejection> {
        let Some(target) = self.fields.parse() else {
            log::info!("Invalid position");
            return Err(PlaceRejection::InvalidPosition);
        };
        let Some(schematic) = self.selected_schematic() else {
            log::info!("No schematic selected");
            return Err(PlaceRejection::NoSchematicSelected);
        };
        let message = PlaceStructure {
            block_entity: self.view.block_pos(),
            target,
            rotation: self.rotation,
            schematic: schematic.to_owned(),
        };
        self.send(message);
        Ok(())
    }

    /// Validates the position regardless of the debounce timer and sends it
    /// to the server.
    fn close(&mut self) {
        self.closed = true;
        self.debounce.cancel();
        self.validate();
        match self.fields.parse() {
            Some(target) => self.send(PositionUpdate {
                block_entity: self.view.block_pos(),
                target,
            }),
            None => log::info!("Invalid position"),
        }
    }

    // MARK: Accessors

    pub fn state(&self) -> ScreenState {
        if self.debounce.is_pending() {
            return ScreenState::EditingPosition;
        }
        let ticks = self.view.placement_delay_ticks();
        if ticks > 0 {
            return ScreenState::Placing { ticks };
        }
        if !self.missing_items.is_empty() {
            return ScreenState::PopupShown(PopupKind::MissingItems);
        }
        if self.not_enough_energy {
            return ScreenState::PopupShown(PopupKind::NotEnoughEnergy);
        }
        ScreenState::Idle
    }

    pub fn fields(&self) -> &PositionFields {
        &self.fields
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_schematic(&self) -> Option<&str> {
        self.selected
            .and_then(|index| self.catalog.get(index))
            .map(|entry| entry.name.as_str())
    }

    pub fn catalog(&self) -> &SchematicCatalog {
        &self.catalog
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Gives access to the printer state the screen reads each frame, so the
    /// host can apply updates from the server.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn connection(&self) -> &ClientConnection<T> {
        &self.connection
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Replaces the missing-items report pushed by the server.
    pub fn set_missing_items(&mut self, items: MissingItems) {
        self.missing_items = items;
    }

    pub fn show_not_enough_energy(&mut self) {
        self.not_enough_energy = true;
    }

    // MARK: Layout

    fn left(&self) -> i32 {
        (self.screen.width - IMAGE_WIDTH) / 2
    }

    fn top(&self) -> i32 {
        (self.screen.height - IMAGE_HEIGHT) / 2
    }

    fn field_rect(&self, axis: Axis) -> Rect {
        let slots_from_left = match axis {
            Axis::X => 3,
            Axis::Y => 2,
            Axis::Z => 1,
        };
        Rect::new(
            self.left() - slots_from_left * (FIELD_WIDTH + FIELD_SPACING),
            self.top() + FIELD_HEIGHT + 15,
            FIELD_WIDTH,
            FIELD_HEIGHT,
        )
    }

    fn energy_bar(&self) -> Rect {
        Rect::new(
            self.left() + ENERGY_BAR.x,
            self.top() + ENERGY_BAR.y,
            ENERGY_BAR.width,
            ENERGY_BAR.height,
        )
    }

    /// Height of the filled part of the energy bar.
    pub fn energy_fill_height(&self) -> i32 {
        let max = self.view.max_energy_stored();
        if max == 0 {
            return 0;
        }
        let ratio = f64::from(self.view.energy_stored()) / f64::from(max);
        (ratio * f64::from(ENERGY_BAR.height)) as i32
    }

    /// The energy tooltip, if the mouse is over the energy bar.
    pub fn energy_tooltip(&self) -> Option<String> {
        let (x, y) = self.mouse?;
        self.energy_bar().contains(x, y).then(|| {
            format!(
                "{} / {} FE",
                self.view.energy_stored(),
                self.view.max_energy_stored()
            )
        })
    }

    /// Lays out the popups that are currently visible, bottom first.
    pub fn popups(&self, font: &impl FontMetrics) -> Vec<Popup> {
        let mut popups = Vec::new();
        if !self.missing_items.is_empty() {
            popups.push(popup::missing_items(&self.missing_items, font, self.screen));
        }
        if self.not_enough_energy {
            popups.push(popup::not_enough_energy(font, self.screen));
        }
        let ticks = self.view.placement_delay_ticks();
        if ticks > 0 {
            popups.push(popup::placement_delay(ticks, font, self.screen));
        }
        popups
    }

    // MARK: Rendering

    /// Draws the whole screen.
    pub fn render(&self, canvas: &mut impl Canvas, font: &impl FontMetrics) {
        let left = self.left();
        let top = self.top();

        canvas.nine_patch(
            TextureId::PRINTER_GUI,
            Rect::new(left, top, IMAGE_WIDTH, IMAGE_HEIGHT),
        );
        canvas.nine_patch(
            TextureId::PRINTER_SIDE_PANEL,
            Rect::new(left - SIDE_PANEL_OFFSET, top, SIDE_PANEL_WIDTH, IMAGE_HEIGHT),
        );

        let fill = self.energy_fill_height();
        let bar = self.energy_bar();
        canvas.fill(
            Rect::new(bar.x, bar.bottom() - fill, bar.width, fill),
            ENERGY_FILL,
        );

        let separator_y = top + 18 + 7 * 18 + 4 + 6;
        canvas.text(left + 8, top + 6, TITLE, LABEL_GRAY);
        canvas.fill(
            Rect::new(left + 8, separator_y, IMAGE_WIDTH - 16, 1),
            SEPARATOR,
        );
        canvas.text(left + 8, separator_y + 8, INVENTORY_TITLE, LABEL_GRAY);

        for axis in Axis::ALL {
            let rect = self.field_rect(axis);
            canvas.fill(rect, FIELD_BACKGROUND);
            canvas.border(rect, WHITE);
            let text_y = rect.y + (rect.height - font.line_height()) / 2;
            canvas.text(rect.x + 4, text_y, self.fields.get(axis), WHITE);
        }

        let rotation_button = Rect::new(left - 9 - FIELD_WIDTH, top + 5, FIELD_WIDTH, BUTTON_HEIGHT);
        self.render_button(canvas, font, rotation_button, &self.rotation.to_string());
        let place_button = Rect::new(
            left - PLACE_BUTTON_WIDTH - 31 - FIELD_WIDTH,
            top + 5,
            PLACE_BUTTON_WIDTH,
            BUTTON_HEIGHT,
        );
        self.render_button(canvas, font, place_button, "Place Structure");

        let list_x = left - PLACE_BUTTON_WIDTH - 31 - FIELD_WIDTH;
        for (i, name) in self.catalog.names().enumerate() {
            let color = if self.selected == Some(i) { YELLOW } else { WHITE };
            let y = top
                + SCHEMATIC_LIST_TOP
                + i as i32 * (SCHEMATIC_BUTTON_HEIGHT + SCHEMATIC_BUTTON_SPACING);
            canvas.text(list_x, y, name, color);
        }

        for popup in self.popups(font) {
            popup.draw(canvas);
        }

        if let (Some(tooltip), Some((x, y))) = (self.energy_tooltip(), self.mouse) {
            canvas.text(x + 12, y - 12, &tooltip, WHITE);
        }
    }

    fn render_button(
        &self,
        canvas: &mut impl Canvas,
        font: &impl FontMetrics,
        rect: Rect,
        label: &str,
    ) {
        canvas.border(rect, WHITE);
        let x = rect.x + (rect.width - font.width(label)) / 2;
        let y = rect.y + (rect.height - font.line_height()) / 2;
        canvas.text(x, y, label, WHITE);
    }
}
