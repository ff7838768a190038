pub mod facets;
pub mod registry;
pub mod style;
pub mod tile_set;

pub use facets::*;
pub use registry::*;
pub use style::*;
pub use tile_set::*;
