// Motor control module for the omniwheel base
//
// Provides:
// - Guidance: operator intent -> wheel RPM goals through the wheel matrix
// - A simulated base that turns goals into RPM/Power telemetry on the robot

pub mod kinematics;
pub mod sim;

pub use kinematics::{Guidance, Intent, WheelGoals};
pub use sim::SimBase;
