//! A printer block that places schematics into the world.
//!
//! The client opens a [`PrinterScreen`] to pick a schematic from the
//! [`SchematicCatalog`], a target position and a rotation. Each choice is
//! sent to the server over the `printer:main` [`Channel`], queued by the
//! transport task on a [`WorkQueue`] and applied to the printer's block entity
//! when the simulation thread drains the queue.

pub mod block;
pub mod block_entity;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod render;
pub mod screen;

pub use block::{BlockPos, Rotation};
pub use block_entity::{Level, PrinterBlockEntity, PrinterView};
pub use catalog::{SchematicCatalog, SchematicEntry};
pub use config::PrinterConfig;
pub use connection::messages::PrinterMessage;
pub use connection::queued::WorkQueue;
pub use connection::{Channel, ClientConnection, Transport};
pub use screen::{PrinterScreen, ScreenInput, ScreenState};
