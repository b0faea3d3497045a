// Loop rate, topics, limits and tunable constants
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// Control loop frequency (one flush per tick)
pub const LOOP_HZ: u64 = 50;
pub const TICK: Duration = Duration::from_millis(1000 / LOOP_HZ);

// Teleplot-style dump of goals/RPMs
pub const PLOT_PERIOD: Duration = Duration::from_secs(1);

// Keyboard console: re-centre sticks after this long with no movement key
pub const INPUT_TIMEOUT: Duration = Duration::from_millis(100);

// Zenoh topics, one per direction
pub const TOPIC_CONSOLE: &str = "omnibot/link/console"; // console -> robot writes
pub const TOPIC_ROBOT: &str = "omnibot/link/robot"; // robot -> console telemetry

// Max records in one outbound payload
pub const PACKET_CAPACITY: usize = 10;

// Largest wheel goal magnitude Guidance will emit
pub const MAX_GOAL_RPM: i16 = 100;

// rad/s -> RPM
pub const RAD_S_TO_RPM: f32 = 60.0 / (2.0 * std::f32::consts::PI);

/// Wheel velocity matrix: one row per wheel (left, right, rear), columns
/// (vx, vy, w). Maps bot velocity in mm/s and spin in rad/s to wheel rad/s.
pub const OMNI_MATRIX: [[f32; 3]; 3] = [
    [-0.0110, -0.0235, 2.7273],
    [-0.0110, 0.0235, 2.7273],
    [0.0260, 0.0000, 3.7662],
];

// Stick [-100..100] -> bot translation speed (mm/s)
pub const FACTOR_TRANSLATE: f32 = 4.031;
// Right stick x [-100..100] -> spin (rad/s), "tractor" driving
pub const FACTOR_TRACTOR_SPIN: f32 = 0.027;
// Analog button [0..255] -> spin (rad/s)
pub const FACTOR_BUTTON_SPIN: f32 = (0.027 * 100.0) / 255.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    pub matrix: [[f32; 3]; 3],
    pub rad_s_to_rpm: f32,
    pub max_rpm: i16,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            matrix: OMNI_MATRIX,
            rad_s_to_rpm: RAD_S_TO_RPM,
            max_rpm: MAX_GOAL_RPM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub translate: f32,
    pub tractor_spin: f32,
    pub button_spin: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            translate: FACTOR_TRANSLATE,
            tractor_spin: FACTOR_TRACTOR_SPIN,
            button_spin: FACTOR_BUTTON_SPIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topics {
    pub console: String,
    pub robot: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            console: TOPIC_CONSOLE.to_string(),
            robot: TOPIC_ROBOT.to_string(),
        }
    }
}

/// Runtime configuration. Every field has a default, so a config file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub guidance: GuidanceConfig,
    pub input: InputConfig,
    pub topics: Topics,
    pub packet_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            guidance: GuidanceConfig::default(),
            input: InputConfig::default(),
            topics: Topics::default(),
            packet_capacity: PACKET_CAPACITY,
        }
    }
}

impl LinkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
