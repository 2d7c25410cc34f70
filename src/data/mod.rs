pub mod key;
pub mod mutation;
pub mod range;

pub use key::{Cell, CellKey};
pub use mutation::{ColumnUpdate, Mutation, UpdateKind};
pub use range::ScanRange;
