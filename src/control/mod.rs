// Operator control: control modes, input mapping and the keyboard console

pub mod input;
pub mod keyboard;
pub mod mode;

pub use input::{InputMapper, Knob, KnobIndicator, PadKey};
pub use keyboard::{KeyAction, Keyboard};
pub use mode::ControlMode;
