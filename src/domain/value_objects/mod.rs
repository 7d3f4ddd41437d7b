pub mod offline;

pub use offline::*;
