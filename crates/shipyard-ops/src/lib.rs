pub mod engine;
pub mod ops_plan;
pub mod ops_release;
pub mod publication;
