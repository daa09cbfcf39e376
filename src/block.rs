use std::fmt::{self, Display, Formatter};

use nalgebra::Point3;
use snafu::Snafu;

/// The integer coordinates of a block in the world.
pub type BlockPos = Point3<i32>;

const PACKED_XZ_BITS: u32 = 26;
const PACKED_Y_BITS: u32 = 12;
const PACKED_XZ_MASK: i64 = (1 << PACKED_XZ_BITS) - 1;
const PACKED_Y_MASK: i64 = (1 << PACKED_Y_BITS) - 1;
const PACKED_Z_SHIFT: u32 = PACKED_Y_BITS;
const PACKED_X_SHIFT: u32 = PACKED_Y_BITS + PACKED_XZ_BITS;

const MAX_XZ: i32 = (1 << (PACKED_XZ_BITS - 1)) - 1;
const MAX_Y: i32 = (1 << (PACKED_Y_BITS - 1)) - 1;

/// Packs a block position into the 64-bit form used on the wire.
///
/// The layout is 26 bits of X, 26 bits of Z and 12 bits of Y, from the most
/// significant bit down. Returns `None` if a coordinate does not fit.
#[must_use]
pub fn pack_block_pos(pos: &BlockPos) -> Option<i64> {
    let fits_xz = |v: i32| (-MAX_XZ - 1..=MAX_XZ).contains(&v);
    if !fits_xz(pos.x) || !fits_xz(pos.z) || !(-MAX_Y - 1..=MAX_Y).contains(&pos.y) {
        return None;
    }

    Some(
        ((i64::from(pos.x) & PACKED_XZ_MASK) << PACKED_X_SHIFT)
            | ((i64::from(pos.z) & PACKED_XZ_MASK) << PACKED_Z_SHIFT)
            | (i64::from(pos.y) & PACKED_Y_MASK),
    )
}

/// Unpacks a block position from its 64-bit wire form.
#[must_use]
pub fn unpack_block_pos(packed: i64) -> BlockPos {
    // Shift each field to the top of the word, then arithmetic-shift it back
    // down to sign-extend it.
    let x = packed >> PACKED_X_SHIFT;
    let z = (packed << (64 - PACKED_X_SHIFT)) >> (64 - PACKED_XZ_BITS);
    let y = (packed << (64 - PACKED_Y_BITS)) >> (64 - PACKED_Y_BITS);
    BlockPos::new(x as i32, y as i32, z as i32)
}

/// Euclidean distance between two block positions.
///
/// Computed in floating point so that coordinates at opposite ends of the
/// `i32` range do not overflow.
#[must_use]
pub fn distance(a: &BlockPos, b: &BlockPos) -> f64 {
    nalgebra::distance(&a.cast::<f64>(), &b.cast::<f64>())
}

/// Failed to convert a rotation ordinal or angle to a [`Rotation`].
#[derive(Debug, Snafu)]
pub enum InvalidRotationError {
    #[snafu(display("Invalid rotation ordinal `{ordinal}`"))]
    Ordinal { ordinal: i32 },
    #[snafu(display("Invalid rotation angle `{degrees}`, expected 0, 90, 180 or 270"))]
    Degrees { degrees: i32 },
}

/// How a structure is turned around the vertical axis when it is placed.
///
/// The discriminants are the ordinals the game uses on the wire.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rotation {
    #[default]
    None = 0,
    Clockwise90,
    Clockwise180,
    CounterClockwise90,
}

impl Rotation {
    /// All rotations, in the order the rotation button cycles through them.
    pub const ALL: [Self; 4] = [
        Self::None,
        Self::Clockwise90,
        Self::Clockwise180,
        Self::CounterClockwise90,
    ];

    /// The clockwise angle of this rotation.
    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Clockwise90 => 90,
            Self::Clockwise180 => 180,
            Self::CounterClockwise90 => 270,
        }
    }

    /// Converts a clockwise angle to a rotation.
    ///
    /// # Errors
    ///
    /// Returns an error unless `degrees` is one of 0, 90, 180 or 270.
    pub fn from_degrees(degrees: i32) -> Result<Self, InvalidRotationError> {
        Ok(match degrees {
            0 => Self::None,
            90 => Self::Clockwise90,
            180 => Self::Clockwise180,
            270 => Self::CounterClockwise90,
            degrees => DegreesSnafu { degrees }.fail()?,
        })
    }

    /// The next rotation, a quarter turn clockwise.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::Clockwise90,
            Self::Clockwise90 => Self::Clockwise180,
            Self::Clockwise180 => Self::CounterClockwise90,
            Self::CounterClockwise90 => Self::None,
        }
    }

    #[must_use]
    pub const fn ordinal(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Rotation {
    type Error = InvalidRotationError;

    fn try_from(ordinal: i32) -> Result<Self, InvalidRotationError> {
        Ok(match ordinal {
            0 => Self::None,
            1 => Self::Clockwise90,
            2 => Self::Clockwise180,
            3 => Self::CounterClockwise90,
            ordinal => OrdinalSnafu { ordinal }.fail()?,
        })
    }
}

impl Display for Rotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}
