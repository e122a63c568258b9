pub mod flags;
pub mod plan;
