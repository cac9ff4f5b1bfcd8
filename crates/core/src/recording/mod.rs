pub mod output_format;
pub mod recording_sink;
