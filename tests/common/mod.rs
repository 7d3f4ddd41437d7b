pub mod mocks;
pub mod sync_support;
