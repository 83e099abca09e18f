pub mod keyboard;
pub mod midi;

pub use keyboard::{KeyPress, KeyboardAdapter};
