pub mod deal;
pub mod snapshot;
