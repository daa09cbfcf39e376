use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options that change the behavior of the printer on either side.
#[derive(Debug, Clone, PartialEq)]
pub struct PrinterConfig {
    /// How far, in blocks, the target position may be from the printer.
    /// Targets further away are reset to the printer's own position.
    ///
    /// Defaults to 50.
    pub max_distance: f64,
    /// Schematics with more blocks than this are left out of the catalog.
    ///
    /// Defaults to 11000.
    pub max_blocks: usize,
    /// How long the position fields must be left alone before they are
    /// validated.
    ///
    /// Defaults to 500 milliseconds.
    pub validation_delay: Duration,
    /// Directory the schematic catalog is loaded from, relative to the
    /// installation root.
    pub schematics_dir: PathBuf,
    /// How many received messages may wait for the simulation thread before
    /// new ones are dropped.
    pub work_queue_capacity: usize,
}

impl PrinterConfig {
    /// Resolves the schematics directory against the installation root.
    pub fn schematics_path(&self, root: &Path) -> PathBuf {
        root.join(&self.schematics_dir)
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            max_distance: 50.0,
            max_blocks: 11_000,
            validation_delay: Duration::from_millis(500),
            schematics_dir: PathBuf::from("schematics"),
            work_queue_capacity: 256,
        }
    }
}
