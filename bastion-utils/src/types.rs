//! Wrapper types making it harder to accidentally mix up worlds and coordinates.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use thiserror::Error;

use crate::math::Vector3;

/// A block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos(pub Vector3<i32>);

impl BlockPos {
    /// Creates a new block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The x coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.0.x
    }

    /// The y coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.0.y
    }

    /// The z coordinate.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.0.z
    }
}

/// A block cell: a world name plus integer block coordinates.
///
/// Encoded as `world:x:y:z`. The world name may itself contain `:`, so
/// decoding splits the three coordinates off the right-hand side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockCell {
    /// The world this cell belongs to.
    pub world: String,
    /// The block coordinates.
    pub pos: BlockPos,
}

impl BlockCell {
    /// Creates a new cell.
    pub fn new(world: impl Into<String>, pos: BlockPos) -> Self {
        Self {
            world: world.into(),
            pos,
        }
    }

    /// Encodes the cell into its persisted key form.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Returns the cell offset by the given amounts, in the same world.
    #[must_use]
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            world: self.world.clone(),
            pos: BlockPos(self.pos.0 + Vector3::new(dx, dy, dz)),
        }
    }
}

impl Display for BlockCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.world,
            self.pos.x(),
            self.pos.y(),
            self.pos.z()
        )
    }
}

/// A cell key that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed cell key {0:?}")]
pub struct CellKeyError(pub String);

impl FromStr for BlockCell {
    type Err = CellKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(4, ':');
        let (Some(z), Some(y), Some(x), Some(world)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CellKeyError(s.to_string()));
        };

        if world.is_empty() {
            return Err(CellKeyError(s.to_string()));
        }

        let coord = |part: &str| part.parse::<i32>().map_err(|_| CellKeyError(s.to_string()));

        Ok(Self {
            world: world.to_string(),
            pos: BlockPos::new(coord(x)?, coord(y)?, coord(z)?),
        })
    }
}
