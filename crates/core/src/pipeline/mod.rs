pub mod color_converter;
pub mod frame_driver;
pub mod frame_range;
pub mod infrastructure;
pub mod pipeline_logger;
pub mod project_video_use_case;
pub mod record_video_use_case;
