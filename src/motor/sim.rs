// Simulated robot base
//
// Stands in for the wheel controllers on the robot node: each tick it reads
// the goals the console sent, moves the wheel speeds toward them, and writes
// RPM / Power / head Position back into the Domain as telemetry.

use tracing::{debug, warn};

use crate::domain::{Domain, EntityId, PropertyId};

/// Motor no-load speed at 100% power
pub const MOTOR_MAX_RPM: f32 = 120.0;

/// Max wheel speed change per tick (acceleration limit)
pub const RPM_SLEW_PER_TICK: f32 = 8.0;

/// Head position range in encoder ticks, centred on 0
pub const HEAD_TRAVEL: i16 = 1000;

#[derive(Debug, Clone, Default)]
pub struct SimBase {
    rpm: [f32; 3], // left, right, rear
    head_position: i16,
}

impl SimBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the model one tick
    pub fn step(&mut self, domain: &mut Domain) {
        for (i, motor) in EntityId::MOTORS.into_iter().enumerate() {
            let (Some(goal), Some(direct)) = (
                domain.get(motor, PropertyId::Goal),
                domain.get(motor, PropertyId::DirectDrive),
            ) else {
                warn!("{} missing from robot domain", motor);
                continue;
            };

            // Direct drive: goal is a raw power percent. Otherwise goal is RPM.
            let target = if direct != 0 {
                f32::from(goal.clamp(-100, 100)) * MOTOR_MAX_RPM / 100.0
            } else {
                f32::from(goal).clamp(-MOTOR_MAX_RPM, MOTOR_MAX_RPM)
            };

            let rpm = &mut self.rpm[i];
            *rpm += (target - *rpm).clamp(-RPM_SLEW_PER_TICK, RPM_SLEW_PER_TICK);

            let power = (*rpm * 100.0 / MOTOR_MAX_RPM).round() as i16;
            domain.write(motor, PropertyId::Rpm, rpm.round() as i16);
            domain.write(motor, PropertyId::Power, power);
        }

        if let Some(power) = domain.get(EntityId::Head, PropertyId::Power) {
            self.head_position = (self.head_position + power / 10).clamp(-HEAD_TRAVEL, HEAD_TRAVEL);
            domain.write(EntityId::Head, PropertyId::Position, self.head_position);
        }
    }

    /// Zero every goal locally (link lost / shutdown)
    pub fn stop(&mut self, domain: &mut Domain) {
        debug!("Stopping all motors");
        domain.write(EntityId::AllMotors, PropertyId::Goal, 0);
        domain.write(EntityId::Head, PropertyId::Power, 0);
    }

    /// Current wheel speeds [left, right, rear]
    pub fn wheel_rpms(&self) -> [i16; 3] {
        self.rpm.map(|r| r.round() as i16)
    }
}
