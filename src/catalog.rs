//! The list of schematics the printer screen offers.
//!
//! A schematic is a gzip-compressed NBT file whose root compound holds a
//! `blocks` list with one compound per block. Files that cannot be read or
//! hold too many blocks are left out; the player never sees an error for
//! them, only the log does.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use quartz_nbt::io::{read_nbt, Flavor, NbtIoError};
use quartz_nbt::NbtTag;
use snafu::{ensure, OptionExt, ResultExt, Snafu};

/// File extensions the catalog picks up.
pub const SCHEMATIC_EXTENSIONS: [&str; 2] = ["schematic", "nbt"];

const BLOCKS_TAG: &str = "blocks";

/// Why a schematic file was left out of the catalog.
#[derive(Debug, Snafu)]
pub enum CatalogError {
    #[snafu(display("Failed to read schematic file `{}`: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse schematic file `{}`: {source}", path.display()))]
    Parse { path: PathBuf, source: NbtIoError },
    #[snafu(display("Schematic file `{}` has no valid block data.", path.display()))]
    NoBlockData { path: PathBuf },
    #[snafu(display(
        "Schematic file `{}` contains {count} blocks (over the {max} limit).",
        path.display()
    ))]
    TooManyBlocks {
        path: PathBuf,
        count: usize,
        max: usize,
    },
    #[snafu(display("Schematic file name `{}` is not valid UTF-8.", path.display()))]
    InvalidName { path: PathBuf },
}

/// A schematic that passed the catalog's checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchematicEntry {
    /// The file name, which is also the name sent to the server.
    pub name: String,
    pub path: PathBuf,
    pub block_count: usize,
}

/// Returns whether the path has one of the [`SCHEMATIC_EXTENSIONS`].
pub fn is_schematic_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| SCHEMATIC_EXTENSIONS.contains(&ext))
}

/// Counts the blocks in a schematic file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if its root has
/// no `blocks` list of compounds.
pub fn inspect(path: &Path) -> Result<usize, CatalogError> {
    let file = File::open(path).context(ReadSnafu { path })?;
    let (root, _) =
        read_nbt(&mut BufReader::new(file), Flavor::GzCompressed).context(ParseSnafu { path })?;

    let Some(NbtTag::List(blocks)) = root.inner().get(BLOCKS_TAG) else {
        return NoBlockDataSnafu { path }.fail();
    };
    ensure!(
        blocks.iter().all(|tag| matches!(tag, NbtTag::Compound(_))),
        NoBlockDataSnafu { path }
    );
    Ok(blocks.len())
}

/// Checks a schematic file against the block limit.
///
/// # Errors
///
/// Returns an error if [`inspect`] fails or the file has more than
/// `max_blocks` blocks.
pub fn admit(path: &Path, max_blocks: usize) -> Result<SchematicEntry, CatalogError> {
    let name = path
        .file_name()
        .and_then(OsStr::to_str)
        .context(InvalidNameSnafu { path })?
        .to_owned();
    let count = inspect(path)?;
    ensure!(
        count <= max_blocks,
        TooManyBlocksSnafu {
            path,
            count,
            max: max_blocks
        }
    );
    Ok(SchematicEntry {
        name,
        path: path.to_owned(),
        block_count: count,
    })
}

/// The schematics a player can choose from, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchematicCatalog {
    entries: Vec<SchematicEntry>,
}

impl SchematicCatalog {
    /// Loads every admissible schematic in `dir`.
    ///
    /// A missing directory gives an empty catalog. The directory is read
    /// once; later changes are not picked up.
    pub fn load(dir: &Path, max_blocks: usize) -> Self {
        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                log::info!("No schematics loaded from `{}`: {err}", dir.display());
                return Self::default();
            }
        };

        let entries = read_dir
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(err) => {
                    log::warn!("Failed to list `{}`: {err}", dir.display());
                    None
                }
            })
            .filter(|path| is_schematic_file(path))
            .sorted()
            .filter_map(|path| match admit(&path, max_blocks) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("Skipping schematic: {err}");
                    None
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Loaded {} schematics from `{}`",
            entries.len(),
            dir.display()
        );
        Self { entries }
    }

    /// Creates a catalog from entries that were already checked.
    pub fn from_entries(entries: impl IntoIterator<Item = SchematicEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .sorted_by(|a, b| a.name.cmp(&b.name))
                .collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&SchematicEntry> {
        self.entries.get(index)
    }

    /// Finds the position of a schematic by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchematicEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
