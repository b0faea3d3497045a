// Control modes: how much of the operator's stick range reaches Guidance
//
// The Start button cycles Disabled -> Unlimited -> Limited -> Disabled on
// each press. Releases are ignored.

use std::fmt;

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// Inputs scaled to zero; knobs pinned to the current goals
    Disabled,
    /// Full stick range
    Unlimited,
    /// Half stick range
    #[default]
    Limited,
}

impl ControlMode {
    /// Scale applied to every operator intent
    pub fn factor(self) -> f32 {
        match self {
            ControlMode::Disabled => 0.0,
            ControlMode::Unlimited => 1.0,
            ControlMode::Limited => 0.5,
        }
    }

    pub fn next(self) -> Self {
        match self {
            ControlMode::Disabled => ControlMode::Unlimited,
            ControlMode::Unlimited => ControlMode::Limited,
            ControlMode::Limited => ControlMode::Disabled,
        }
    }

    /// Feed a mode-button value; advances only on a press (non-zero).
    /// Returns true if the mode changed.
    pub fn on_button(&mut self, value: i16) -> bool {
        if value == 0 {
            return false;
        }
        *self = self.next();
        info!("Control mode: {}", self);
        true
    }

    pub fn label(self) -> &'static str {
        match self {
            ControlMode::Disabled => "Disabled",
            ControlMode::Unlimited => "Unlimited",
            ControlMode::Limited => "Limited",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
