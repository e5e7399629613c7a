pub mod export;
pub mod reporting;
