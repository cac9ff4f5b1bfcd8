/// Frames decoded and discarded before the range start when warm-up is on.
pub const WARM_UP_FRAMES: i64 = 2;

/// Frame rate used by writers when the source reports none.
pub const DEFAULT_FPS: i32 = 30;

/// libx264 constant rate factor for MP4 output.
pub const H264_CRF: &str = "18";
pub const H264_PRESET: &str = "fast";

pub const DEFAULT_PROGRESS_LABEL: &str = "Processing frames";

/// Extensions accepted for still projection output and mask/background input.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Extensions whose encoders keep 16-bit samples.
pub const SIXTEEN_BIT_IMAGE_EXTENSIONS: &[&str] = &["png", "tiff", "tif"];
