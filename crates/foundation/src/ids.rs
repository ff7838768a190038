use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::GRID_SIZE;

/// Cell of the fixed zoom-14 tile grid.
///
/// Ordering is `(x, y)` so sets of tiles iterate column by column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId {
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTileIdError(pub String);

impl fmt::Display for ParseTileIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid tile id {:?} (expected \"x_y\" below {GRID_SIZE})",
            self.0
        )
    }
}

impl std::error::Error for ParseTileIdError {}

impl FromStr for TileId {
    type Err = ParseTileIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTileIdError(s.to_string());
        let (x, y) = s.trim().split_once('_').ok_or_else(err)?;
        let x = x.parse::<u32>().map_err(|_| err())?;
        let y = y.parse::<u32>().map_err(|_| err())?;
        if x >= GRID_SIZE || y >= GRID_SIZE {
            return Err(err());
        }
        Ok(TileId { x, y })
    }
}

impl Serialize for TileId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TileId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Monotonic epoch used to invalidate stale asynchronous continuations.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

/// Stable identity of a saved trace.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TraceId(pub u64);

#[cfg(test)]
mod tests {
    use super::{Generation, TileId};

    #[test]
    fn tile_id_string_form() {
        let t = TileId::new(8299, 5639);
        assert_eq!(t.to_string(), "8299_5639");
        assert_eq!("8299_5639".parse::<TileId>().unwrap(), t);
    }

    #[test]
    fn tile_id_rejects_garbage() {
        assert!("8299".parse::<TileId>().is_err());
        assert!("a_b".parse::<TileId>().is_err());
        assert!("-1_3".parse::<TileId>().is_err());
    }

    #[test]
    fn tile_id_must_lie_on_the_grid() {
        assert!("16383_16383".parse::<TileId>().is_ok());
        assert!("16384_0".parse::<TileId>().is_err());
        assert!("0_16384".parse::<TileId>().is_err());
        assert!("4294967295_4294967295".parse::<TileId>().is_err());
    }

    #[test]
    fn tile_id_serializes_as_string() {
        let json = serde_json::to_string(&vec![TileId::new(1, 2)]).unwrap();
        assert_eq!(json, r#"["1_2"]"#);
        let back: Vec<TileId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![TileId::new(1, 2)]);
    }

    #[test]
    fn generation_advances() {
        assert_eq!(Generation(3).next(), Generation(4));
    }
}
