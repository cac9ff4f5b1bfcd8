pub mod background_subtract;
pub mod brightness_map;
pub mod grayscale;
pub mod invert;
pub mod threshold;
