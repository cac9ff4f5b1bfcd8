pub mod ffmpeg_source;
pub mod ffmpeg_writer;
pub mod image_file_reader;
pub mod image_file_writer;
pub mod media;
pub mod tiff_sequence_writer;
pub mod writer_factory;

#[cfg(test)]
pub(crate) mod test_video;
