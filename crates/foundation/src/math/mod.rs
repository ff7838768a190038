pub mod geodesy;
pub mod tile_grid;

pub use geodesy::*;
pub use tile_grid::*;
