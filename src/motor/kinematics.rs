// Omniwheel guidance for the 3-wheel base
// Converts an operator intent (vx, vy, spin) into left/right/rear wheel goals.
//
// The wheel matrix comes from "Motion Planning for Omnidirectional Wheeled
// Mobile Robot by Potential Field Method", equation (7).

use tracing::debug;

use crate::config::GuidanceConfig;
use crate::domain::{Domain, EntityId, PropertyId};

/// Desired bot motion: translation in mm/s, spin in rad/s
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    pub vx: f32,
    pub vy: f32,
    pub w: f32,
}

impl Intent {
    pub fn new(vx: f32, vy: f32, w: f32) -> Self {
        Self { vx, vy, w }
    }
}

/// Wheel RPM goals as written to the motors (mounting signs applied)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelGoals {
    pub left: i16,
    pub right: i16,
    pub rear: i16,
}

impl WheelGoals {
    /// Returns goals as [(entity, goal)] in motor order
    pub fn as_writes(&self) -> [(EntityId, i16); 3] {
        [
            (EntityId::LeftMotor, self.left),
            (EntityId::RightMotor, self.right),
            (EntityId::RearMotor, self.rear),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct Guidance {
    config: GuidanceConfig,
}

impl Guidance {
    pub fn new(config: GuidanceConfig) -> Self {
        Self { config }
    }

    /// Wheel speeds in RPM, one per matrix row, before sign flips or limits
    pub fn wheel_rpms(&self, intent: Intent) -> [i32; 3] {
        let velocity = [intent.vx, intent.vy, intent.w];
        self.config.matrix.map(|row| {
            let rad_s: f32 = row.iter().zip(velocity).map(|(m, v)| m * v).sum();
            (rad_s * self.config.rad_s_to_rpm).round() as i32
        })
    }

    /// Compute wheel goals, or None if any wheel would exceed max_rpm.
    ///
    /// The whole set is rejected rather than clamped so the robot never gets
    /// a partial, inconsistent command.
    pub fn wheel_goals(&self, intent: Intent) -> Option<WheelGoals> {
        let rpms = self.wheel_rpms(intent);
        // a negative limit from config rejects everything but a standstill
        let max = u32::try_from(self.config.max_rpm).unwrap_or(0);
        if rpms.iter().any(|rpm| rpm.unsigned_abs() > max) {
            debug!("Guidance rejected {:?}: wheel rpms {:?}", intent, rpms);
            return None;
        }

        // The left wheel is mounted mirrored
        Some(WheelGoals {
            left: -rpms[0] as i16,
            right: rpms[1] as i16,
            rear: rpms[2] as i16,
        })
    }

    /// Compute and write the three motor goals. Returns false, leaving the
    /// previous goals untouched, if the intent was rejected.
    pub fn apply(&self, intent: Intent, domain: &mut Domain) -> bool {
        let Some(goals) = self.wheel_goals(intent) else {
            return false;
        };
        for (motor, goal) in goals.as_writes() {
            domain.write(motor, PropertyId::Goal, goal);
        }
        true
    }
}
