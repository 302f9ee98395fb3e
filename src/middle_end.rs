pub mod analysis;
pub mod cfg;
pub mod optimization;
