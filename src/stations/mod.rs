//! Station reference data: name normalization, the per-system lookup
//! index, and the static-store loader that feeds it.

mod index;
mod normalize;
mod store;

pub use index::{StationIndex, StationRef};
pub use normalize::normalize_name;
pub use store::{JsonStationStore, MemoryStationStore, StationStore};
