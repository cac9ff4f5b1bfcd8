//! Frame-by-frame video processing: decode a frame range, push each frame
//! through a chain of transforms, and either fold the stream into one
//! projected image or re-encode it to a video or TIFF sequence.

pub mod pipeline;
pub mod projection;
pub mod recording;
pub mod shared;
pub mod transform;
pub mod video;
