use std::time::{Duration, Instant};

use derive_more::Display;

use crate::block::{distance, BlockPos};

/// One of the three position fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// The text of the X, Y and Z position fields, as the player typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionFields {
    values: [String; 3],
}

impl PositionFields {
    pub fn from_pos(pos: &BlockPos) -> Self {
        let mut fields = Self::default();
        fields.reset_to(pos);
        fields
    }

    pub fn get(&self, axis: Axis) -> &str {
        &self.values[axis.index()]
    }

    pub fn set(&mut self, axis: Axis, value: impl Into<String>) {
        self.values[axis.index()] = value.into();
    }

    /// Overwrites all three fields with a position's coordinates.
    pub fn reset_to(&mut self, pos: &BlockPos) {
        for axis in Axis::ALL {
            self.set(axis, pos[axis.index()].to_string());
        }
    }

    /// Parses the fields as a position, or `None` if any field is not an
    /// integer.
    pub fn parse(&self) -> Option<BlockPos> {
        let [x, y, z] = &self.values;
        Some(BlockPos::new(
            x.parse().ok()?,
            y.parse().ok()?,
            z.parse().ok()?,
        ))
    }
}

/// What validating the position fields did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Validation {
    /// The fields hold a position close enough to the printer.
    Unchanged,
    /// The position was too far away and the fields were reset.
    OutOfRange { distance: f64 },
    /// A field was not an integer and the fields were reset.
    Malformed,
}

/// Resets the fields to `origin` if they do not hold a position within
/// `max_distance` of it.
pub fn validate(fields: &mut PositionFields, origin: &BlockPos, max_distance: f64) -> Validation {
    let Some(pos) = fields.parse() else {
        fields.reset_to(origin);
        return Validation::Malformed;
    };

    let distance = distance(&pos, origin);
    if distance > max_distance {
        fields.reset_to(origin);
        return Validation::OutOfRange { distance };
    }
    Validation::Unchanged
}

/// Waits for input to settle before validating it.
///
/// Every edit restarts the delay; [`Debounce::poll`] reports `true` once the
/// delay has passed since the last edit, then goes quiet until the next
/// edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounce {
    delay: Duration,
    last_edit: Option<Instant>,
}

impl Debounce {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_edit: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_edit = Some(now);
    }

    pub const fn is_pending(&self) -> bool {
        self.last_edit.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_edit {
            Some(last_edit) if now.saturating_duration_since(last_edit) >= self.delay => {
                self.last_edit = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.last_edit = None;
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    const MAX_DISTANCE: f64 = 50.0;

    fn typed(x: &str, y: &str, z: &str) -> PositionFields {
        let mut fields = PositionFields::default();
        fields.set(Axis::X, x);
        fields.set(Axis::Y, y);
        fields.set(Axis::Z, z);
        fields
    }

    #[test]
    fn positions_in_range_are_left_alone() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let origin = BlockPos::new(
                rng.gen_range(-1_000_000..1_000_000),
                rng.gen_range(-64..320),
                rng.gen_range(-1_000_000..1_000_000),
            );
            let pos = BlockPos::new(
                origin.x + rng.gen_range(-28..=28),
                origin.y + rng.gen_range(-28..=28),
                origin.z + rng.gen_range(-28..=28),
            );
            // Every offset is at most 28 per axis, so at most ~48.5 blocks.
            let mut fields = PositionFields::from_pos(&pos);
            assert_eq!(validate(&mut fields, &origin, MAX_DISTANCE), Validation::Unchanged);
            assert_eq!(fields.parse(), Some(pos));
        }
    }

    #[test]
    fn positions_out_of_range_are_reset() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let origin = BlockPos::new(
                rng.gen_range(-1_000_000..1_000_000),
                rng.gen_range(-64..320),
                rng.gen_range(-1_000_000..1_000_000),
            );
            let pos = BlockPos::new(
                origin.x + rng.gen_range(51..10_000) * if rng.gen() { 1 } else { -1 },
                origin.y + rng.gen_range(-100..100),
                origin.z + rng.gen_range(-100..100),
            );
            let mut fields = PositionFields::from_pos(&pos);
            assert!(matches!(
                validate(&mut fields, &origin, MAX_DISTANCE),
                Validation::OutOfRange { .. }
            ));
            assert_eq!(fields, PositionFields::from_pos(&origin));
        }
    }

    #[test]
    fn distance_limit_is_inclusive() {
        let origin = BlockPos::new(0, 64, 0);
        let mut fields = typed("30", "64", "40");
        assert_eq!(validate(&mut fields, &origin, MAX_DISTANCE), Validation::Unchanged);

        let mut fields = PositionFields::from_pos(&BlockPos::new(30, 65, 40));
        assert!(matches!(
            validate(&mut fields, &origin, MAX_DISTANCE),
            Validation::OutOfRange { .. }
        ));
        assert_eq!(fields.get(Axis::Y), "64");
    }

    #[test]
    fn non_integers_are_reset() {
        let origin = BlockPos::new(7, 70, -7);
        for (x, y, z) in [
            ("", "70", "-7"),
            ("7", "seventy", "-7"),
            ("7", "70", "-7.5"),
            (" 7", "70", "-7"),
            ("7", "70", "99999999999"),
        ] {
            let mut fields = typed(x, y, z);
            assert_eq!(validate(&mut fields, &origin, MAX_DISTANCE), Validation::Malformed);
            assert_eq!(fields, typed("7", "70", "-7"));
        }
    }

    #[test]
    fn signed_integers_parse() {
        assert_eq!(
            typed("+5", "-3", "0").parse(),
            Some(BlockPos::new(5, -3, 0))
        );
    }

    #[test]
    fn debounce_fires_once_after_last_edit() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(500));
        assert!(!debounce.poll(start));

        for i in 0..10 {
            debounce.touch(start + Duration::from_millis(i * 100));
        }
        let last_edit = start + Duration::from_millis(900);
        assert!(!debounce.poll(last_edit + Duration::from_millis(499)));
        assert!(debounce.is_pending());
        assert!(debounce.poll(last_edit + Duration::from_millis(500)));
        assert!(!debounce.is_pending());
        assert!(!debounce.poll(last_edit + Duration::from_secs(10)));
    }

    #[test]
    fn debounce_cancel() {
        let now = Instant::now();
        let mut debounce = Debounce::new(Duration::ZERO);
        debounce.touch(now);
        debounce.cancel();
        assert!(!debounce.poll(now));
    }
}
