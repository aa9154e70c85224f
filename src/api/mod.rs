pub mod conversion;
pub mod errors;
pub mod state;
