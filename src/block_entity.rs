//! Server-side state of printer blocks.
//!
//! The level owns every block entity and is only touched from the
//! simulation thread. Messages from clients reach it through
//! [`WorkQueue::drain`](crate::connection::queued::WorkQueue::drain).

use std::collections::{BTreeMap, HashMap};

use crate::block::{BlockPos, Rotation};
use crate::connection::messages::{
    PlaceStructure, PositionUpdate, PrinterMessage, RotationChange, SchematicSelection,
};
use crate::connection::queued::{Envelope, WorkQueue};

/// Items the server still needs before it can place a structure, keyed by
/// item identifier.
pub type MissingItems = BTreeMap<String, u32>;

/// The game ticks in one second.
pub const TICKS_PER_SECOND: u32 = 20;

/// A request to place a schematic, handed to the placement workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    pub target: BlockPos,
    pub rotation: Rotation,
    pub schematic: String,
}

impl From<PlaceStructure> for PlacementRequest {
    fn from(message: PlaceStructure) -> Self {
        Self {
            target: message.target,
            rotation: message.rotation,
            schematic: message.schematic,
        }
    }
}

/// What the printer screen reads from its block entity every frame.
pub trait PrinterView {
    /// Position of the printer block itself.
    fn block_pos(&self) -> BlockPos;
    fn stored_target(&self) -> Option<BlockPos>;
    fn stored_rotation(&self) -> Option<Rotation>;
    fn stored_schematic(&self) -> Option<&str>;
    fn energy_stored(&self) -> u32;
    fn max_energy_stored(&self) -> u32;
    /// Ticks left before a pending placement happens, zero if none.
    fn placement_delay_ticks(&self) -> u32;
}

/// The printer block entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterBlockEntity {
    pos: BlockPos,
    target: Option<BlockPos>,
    rotation: Option<Rotation>,
    schematic: Option<String>,
    energy_stored: u32,
    max_energy_stored: u32,
    placement_delay_ticks: u32,
    pending_placement: Option<PlacementRequest>,
}

impl PrinterBlockEntity {
    pub const fn new(pos: BlockPos, max_energy_stored: u32) -> Self {
        Self {
            pos,
            target: None,
            rotation: None,
            schematic: None,
            energy_stored: 0,
            max_energy_stored,
            placement_delay_ticks: 0,
            pending_placement: None,
        }
    }

    pub fn set_target(&mut self, target: BlockPos) {
        self.target = Some(target);
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = Some(rotation);
    }

    pub fn set_schematic(&mut self, name: impl Into<String>) {
        self.schematic = Some(name.into());
    }

    /// Sets the stored energy, capped at the capacity.
    pub fn set_energy_stored(&mut self, energy: u32) {
        self.energy_stored = energy.min(self.max_energy_stored);
    }

    pub fn set_placement_delay_ticks(&mut self, ticks: u32) {
        self.placement_delay_ticks = ticks;
    }

    /// Stores the request's parameters and queues it for the placement
    /// workflow, replacing any request that has not been picked up yet.
    pub fn request_placement(&mut self, request: PlacementRequest) {
        self.target = Some(request.target);
        self.rotation = Some(request.rotation);
        self.schematic = Some(request.schematic.clone());
        if let Some(replaced) = self.pending_placement.replace(request) {
            log::debug!(
                "Printer at {} replaced pending placement of `{}`",
                self.pos,
                replaced.schematic
            );
        }
    }

    /// Takes the placement request waiting for the placement workflow.
    pub fn take_pending_placement(&mut self) -> Option<PlacementRequest> {
        self.pending_placement.take()
    }

    pub fn pending_placement(&self) -> Option<&PlacementRequest> {
        self.pending_placement.as_ref()
    }

    fn apply(&mut self, message: PrinterMessage) {
        match message {
            PrinterMessage::PositionUpdate(PositionUpdate { target, .. }) => {
                self.set_target(target);
            }
            PrinterMessage::SchematicSelection(SchematicSelection { name, .. }) => {
                self.set_schematic(name);
            }
            PrinterMessage::RotationChange(RotationChange { rotation, .. }) => {
                self.set_rotation(rotation);
            }
            PrinterMessage::PlaceStructure(message) => {
                self.request_placement(message.into());
            }
        }
    }
}

impl PrinterView for PrinterBlockEntity {
    fn block_pos(&self) -> BlockPos {
        self.pos
    }

    fn stored_target(&self) -> Option<BlockPos> {
        self.target
    }

    fn stored_rotation(&self) -> Option<Rotation> {
        self.rotation
    }

    fn stored_schematic(&self) -> Option<&str> {
        self.schematic.as_deref()
    }

    fn energy_stored(&self) -> u32 {
        self.energy_stored
    }

    fn max_energy_stored(&self) -> u32 {
        self.max_energy_stored
    }

    fn placement_delay_ticks(&self) -> u32 {
        self.placement_delay_ticks
    }
}

/// Any block entity in the level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockEntity {
    Printer(PrinterBlockEntity),
    /// A block entity of some other kind, which printer messages ignore.
    Other { kind: String },
}

/// The block entities of one level, keyed by position.
#[derive(Debug, Default)]
pub struct Level {
    block_entities: HashMap<BlockPos, BlockEntity>,
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a block entity, returning the one it replaced.
    pub fn insert(&mut self, pos: BlockPos, entity: BlockEntity) -> Option<BlockEntity> {
        self.block_entities.insert(pos, entity)
    }

    pub fn insert_printer(&mut self, printer: PrinterBlockEntity) -> Option<BlockEntity> {
        self.insert(printer.block_pos(), BlockEntity::Printer(printer))
    }

    pub fn remove(&mut self, pos: &BlockPos) -> Option<BlockEntity> {
        self.block_entities.remove(pos)
    }

    pub fn get(&self, pos: &BlockPos) -> Option<&BlockEntity> {
        self.block_entities.get(pos)
    }

    pub fn printer(&self, pos: &BlockPos) -> Option<&PrinterBlockEntity> {
        match self.block_entities.get(pos)? {
            BlockEntity::Printer(printer) => Some(printer),
            BlockEntity::Other { .. } => None,
        }
    }

    pub fn printer_mut(&mut self, pos: &BlockPos) -> Option<&mut PrinterBlockEntity> {
        match self.block_entities.get_mut(pos)? {
            BlockEntity::Printer(printer) => Some(printer),
            BlockEntity::Other { .. } => None,
        }
    }

    /// Applies a message to the printer it is addressed to.
    ///
    /// If there is no printer at the message's position the message is
    /// ignored and the sender is not told. Returns whether a printer was
    /// updated.
    pub fn handle(&mut self, envelope: Envelope) -> bool {
        let pos = envelope.message.block_entity();
        let Some(printer) = self.printer_mut(&pos) else {
            log::debug!(
                "Ignoring {} from player {}: no printer at {pos}",
                envelope.message.kind(),
                envelope.sender
            );
            return false;
        };
        printer.apply(envelope.message);
        true
    }

    /// Handles every message waiting in the work queue. Call once per tick
    /// before running game logic.
    pub fn drain(&mut self, queue: &mut WorkQueue) -> usize {
        queue.drain(|envelope| {
            self.handle(envelope);
        })
    }

    /// Counts down every printer's placement delay by one tick.
    pub fn tick(&mut self) {
        for entity in self.block_entities.values_mut() {
            if let BlockEntity::Printer(printer) = entity {
                printer.placement_delay_ticks = printer.placement_delay_ticks.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::PlayerId;

    fn envelope(message: impl Into<PrinterMessage>) -> Envelope {
        Envelope {
            sender: PlayerId(1),
            message: message.into(),
        }
    }

    fn level_with_printer(pos: BlockPos) -> Level {
        let mut level = Level::new();
        level.insert_printer(PrinterBlockEntity::new(pos, 100_000));
        level
    }

    #[test]
    fn position_update_stores_target() {
        let pos = BlockPos::new(10, 64, 10);
        let mut level = level_with_printer(pos);
        assert!(level.handle(envelope(PositionUpdate {
            block_entity: pos,
            target: BlockPos::new(20, 64, 20),
        })));
        assert_eq!(
            level.printer(&pos).unwrap().stored_target(),
            Some(BlockPos::new(20, 64, 20))
        );
    }

    #[test]
    fn selection_and_rotation_are_stored() {
        let pos = BlockPos::new(0, 70, 0);
        let mut level = level_with_printer(pos);
        level.handle(envelope(SchematicSelection {
            block_entity: pos,
            name: "tower.nbt".to_owned(),
        }));
        level.handle(envelope(RotationChange {
            block_entity: pos,
            rotation: Rotation::Clockwise180,
        }));
        let printer = level.printer(&pos).unwrap();
        assert_eq!(printer.stored_schematic(), Some("tower.nbt"));
        assert_eq!(printer.stored_rotation(), Some(Rotation::Clockwise180));
        assert_eq!(printer.pending_placement(), None);
    }

    #[test]
    fn place_structure_stores_and_queues_placement() {
        let pos = BlockPos::new(0, 70, 0);
        let mut level = level_with_printer(pos);
        level.handle(envelope(PlaceStructure {
            block_entity: pos,
            target: BlockPos::new(5, 70, 5),
            rotation: Rotation::CounterClockwise90,
            schematic: "house.schematic".to_owned(),
        }));
        let printer = level.printer_mut(&pos).unwrap();
        assert_eq!(printer.stored_target(), Some(BlockPos::new(5, 70, 5)));
        assert_eq!(printer.stored_schematic(), Some("house.schematic"));
        assert_eq!(
            printer.take_pending_placement(),
            Some(PlacementRequest {
                target: BlockPos::new(5, 70, 5),
                rotation: Rotation::CounterClockwise90,
                schematic: "house.schematic".to_owned(),
            })
        );
        assert_eq!(printer.take_pending_placement(), None);
    }

    #[test]
    fn missing_block_entity_is_ignored() {
        let mut level = level_with_printer(BlockPos::new(0, 0, 0));
        let before = level.printer(&BlockPos::new(0, 0, 0)).cloned();
        assert!(!level.handle(envelope(PositionUpdate {
            block_entity: BlockPos::new(1, 0, 0),
            target: BlockPos::new(2, 0, 0),
        })));
        assert_eq!(level.printer(&BlockPos::new(0, 0, 0)).cloned(), before);
        assert!(level.get(&BlockPos::new(1, 0, 0)).is_none());
    }

    #[test]
    fn other_block_entity_kind_is_ignored() {
        let pos = BlockPos::new(3, 3, 3);
        let mut level = Level::new();
        let chest = BlockEntity::Other {
            kind: "chest".to_owned(),
        };
        level.insert(pos, chest.clone());
        assert!(!level.handle(envelope(RotationChange {
            block_entity: pos,
            rotation: Rotation::Clockwise90,
        })));
        assert_eq!(level.get(&pos), Some(&chest));
    }

    #[test]
    fn energy_is_capped_and_delay_counts_down() {
        let pos = BlockPos::new(0, 0, 0);
        let mut level = level_with_printer(pos);
        let printer = level.printer_mut(&pos).unwrap();
        printer.set_energy_stored(200_000);
        printer.set_placement_delay_ticks(2);
        assert_eq!(printer.energy_stored(), 100_000);

        level.tick();
        assert_eq!(level.printer(&pos).unwrap().placement_delay_ticks(), 1);
        level.tick();
        level.tick();
        assert_eq!(level.printer(&pos).unwrap().placement_delay_ticks(), 0);
    }
}
