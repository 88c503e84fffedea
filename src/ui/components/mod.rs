mod error_display;
mod key_result;
mod status_picker;

pub use error_display::ErrorDisplay;
pub use key_result::KeyResult;
pub use status_picker::{StatusPicker, StatusPickerEvent};
