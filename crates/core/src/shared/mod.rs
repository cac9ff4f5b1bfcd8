pub mod constants;
pub mod error;
pub mod frame;
pub mod normalize;
pub mod padding;
pub mod video_metadata;
