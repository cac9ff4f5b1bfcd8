pub mod projection_accumulator;
pub mod projection_mode;
