pub mod keymap;
pub mod window;

pub use window::{PlatformError, WinitPlatform};
