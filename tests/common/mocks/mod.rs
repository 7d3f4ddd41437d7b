pub mod failing_store;
pub mod mock_remote;

pub use failing_store::*;
pub use mock_remote::*;
