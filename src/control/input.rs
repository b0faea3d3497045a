// Input mapping: controller events -> Guidance intents and direct writes
//
// Events arrive already debounced and deadzone-filtered:
// - sticks: x, y in [-100..100], positive y is up
// - buttons: x in [0..255] (analog pressure or 0/255), released = 0
// - knobs: x is the knob's current value, knob buttons 0/255

use tracing::debug;

use super::mode::ControlMode;
use crate::config::{GuidanceConfig, InputConfig};
use crate::domain::{Domain, EntityId, PropertyId};
use crate::motor::kinematics::{Guidance, Intent};

/// A rotary knob on the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Knob {
    K0,
    K1,
    K2,
    K3,
}

impl Knob {
    pub const ALL: [Knob; 4] = [Knob::K0, Knob::K1, Knob::K2, Knob::K3];

    /// The motor whose goal this knob drives; K3 is spare
    pub fn motor(self) -> Option<EntityId> {
        match self {
            Knob::K0 => Some(EntityId::LeftMotor),
            Knob::K1 => Some(EntityId::RightMotor),
            Knob::K2 => Some(EntityId::RearMotor),
            Knob::K3 => None,
        }
    }
}

/// Logical console controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadKey {
    Select,
    L3,
    R3,
    Start,
    Up,
    Right,
    Down,
    Left,
    L2,
    R2,
    L1,
    R1,
    Triangle,
    Circle,
    Cross,
    Square,
    Analog,
    LeftStick,
    RightStick,
    KnobButton(Knob),
    Knob(Knob),
}

/// Something that can show / hold a knob value (the knob's own position
/// and any indicator attached to it)
pub trait KnobIndicator {
    fn set_knob(&mut self, knob: Knob, value: i16);
}

/// Consoles without knobs
impl KnobIndicator for () {
    fn set_knob(&mut self, _knob: Knob, _value: i16) {}
}

pub struct InputMapper {
    mode: ControlMode,
    raw: Intent,    // operator intent before the mode factor
    intent: Intent, // last intent handed to Guidance
    guidance: Guidance,
    factors: InputConfig,
}

impl InputMapper {
    pub fn new(guidance: GuidanceConfig, factors: InputConfig) -> Self {
        Self {
            mode: ControlMode::default(),
            raw: Intent::default(),
            intent: Intent::default(),
            guidance: Guidance::new(guidance),
            factors,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Last intent handed to Guidance
    pub fn intent(&self) -> Intent {
        self.intent
    }

    /// Handle one control event
    pub fn on_input(
        &mut self,
        key: PadKey,
        x: i16,
        y: i16,
        domain: &mut Domain,
        knobs: &mut dyn KnobIndicator,
    ) {
        if key == PadKey::Start {
            self.mode.on_button(x);
            return;
        }

        let (x, y) = (f32::from(x), f32::from(y));

        match key {
            // 'translate' along the left stick vector
            PadKey::LeftStick => {
                self.raw.vx = x * self.factors.translate;
                self.raw.vy = y * self.factors.translate;
                self.guide(domain);
            }
            // 'tractor': x spins, y drives forward
            PadKey::RightStick => {
                self.raw.w = -x * self.factors.tractor_spin;
                self.raw.vy = y * self.factors.translate;
                self.guide(domain);
            }
            PadKey::Left => {
                self.raw.w = x * self.factors.button_spin;
                self.guide(domain);
            }
            PadKey::Right => {
                self.raw.w = -x * self.factors.button_spin;
                self.guide(domain);
            }
            _ if self.mode == ControlMode::Disabled => self.pin_knob(key, domain, knobs),
            // kill all motion
            PadKey::Cross => {
                self.raw = Intent::default();
                self.intent = Intent::default();
                domain.write(EntityId::AllMotors, PropertyId::Goal, 0);
                for knob in Knob::ALL {
                    knobs.set_knob(knob, 0);
                }
            }
            // head moves while held
            PadKey::Up => {
                domain.write(EntityId::Head, PropertyId::Power, head_power(x));
            }
            PadKey::Down => {
                domain.write(EntityId::Head, PropertyId::Power, -head_power(x));
            }
            // pressing a knob zeroes its motor goal
            PadKey::KnobButton(knob) => {
                if let (Some(motor), true) = (knob.motor(), x != 0.0) {
                    domain.write(motor, PropertyId::Goal, 0);
                    knobs.set_knob(knob, 0);
                }
            }
            // turning a knob sets its motor goal directly
            PadKey::Knob(knob) => {
                if let Some(motor) = knob.motor() {
                    domain.write(motor, PropertyId::Goal, x as i16);
                }
            }
            _ => {}
        }
    }

    fn guide(&mut self, domain: &mut Domain) {
        let scale = self.mode.factor();
        self.intent = Intent::new(self.raw.vx * scale, self.raw.vy * scale, self.raw.w * scale);
        if !self.guidance.apply(self.intent, domain) {
            debug!("Intent {:?} over the wheel limit, goals unchanged", self.intent);
        }
    }

    // While disabled a knob may not move its goal: put the knob back on the
    // motor's current goal
    fn pin_knob(&self, key: PadKey, domain: &mut Domain, knobs: &mut dyn KnobIndicator) {
        let PadKey::Knob(knob) = key else {
            return;
        };
        let Some(motor) = knob.motor() else {
            return;
        };
        if let Some(goal) = domain.get(motor, PropertyId::Goal) {
            domain.write(motor, PropertyId::Goal, goal);
            knobs.set_knob(knob, goal);
        }
    }
}

// Analog button [0..255] -> head power [0..100]
fn head_power(x: f32) -> i16 {
    (x * 100.0 / 255.0).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Knobs(HashMap<Knob, i16>);

    impl KnobIndicator for Knobs {
        fn set_knob(&mut self, knob: Knob, value: i16) {
            self.0.insert(knob, value);
        }
    }

    fn setup() -> (InputMapper, Domain, Knobs) {
        (
            InputMapper::new(GuidanceConfig::default(), InputConfig::default()),
            Domain::omnibot(Role::Console),
            Knobs::default(),
        )
    }

    fn goals(domain: &Domain) -> [i16; 3] {
        EntityId::MOTORS.map(|m| domain.get(m, PropertyId::Goal).unwrap())
    }

    #[test]
    fn test_start_cycles_modes_on_press_only() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        assert_eq!(mapper.mode(), ControlMode::Disabled);
        mapper.on_input(PadKey::Start, 0, 0, &mut domain, &mut knobs);
        assert_eq!(mapper.mode(), ControlMode::Disabled);
        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        assert_eq!(mapper.mode(), ControlMode::Unlimited);
        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        assert_eq!(mapper.mode(), ControlMode::Limited);
    }

    #[test]
    fn test_left_stick_translates_at_half_range() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::LeftStick, 100, 0, &mut domain, &mut knobs);
        // vx = 100 * 4.031 * 0.5 = 201.55 mm/s
        assert!((mapper.intent().vx - 201.55).abs() < 1e-3);
        // -0.0110 * 201.55 rad/s = -21.17 RPM, left wheel mirrored
        assert_eq!(goals(&domain), [21, -21, 50]);
    }

    #[test]
    fn test_full_diagonal_is_rejected_unlimited() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        assert_eq!(mapper.mode(), ControlMode::Unlimited);

        mapper.on_input(PadKey::LeftStick, 0, 50, &mut domain, &mut knobs);
        let before = goals(&domain);
        assert_ne!(before, [0, 0, 0]);

        // both axes at full range puts the left wheel past 100 RPM
        mapper.on_input(PadKey::LeftStick, 100, 100, &mut domain, &mut knobs);
        assert_eq!(goals(&domain), before);
    }

    #[test]
    fn test_disabled_sticks_yield_zero_goals() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::LeftStick, 60, 60, &mut domain, &mut knobs);
        assert_ne!(goals(&domain), [0, 0, 0]);

        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::LeftStick, 100, 100, &mut domain, &mut knobs);
        assert_eq!(goals(&domain), [0, 0, 0]);
    }

    #[test]
    fn test_disabled_scales_whole_intent() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::Left, 255, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        // spin from before the mode change must not survive
        mapper.on_input(PadKey::LeftStick, 10, 0, &mut domain, &mut knobs);
        assert_eq!(mapper.intent(), Intent::default());
        assert_eq!(goals(&domain), [0, 0, 0]);
    }

    #[test]
    fn test_disabled_pins_knob_to_goal() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::Knob(Knob::K1), 30, 0, &mut domain, &mut knobs);
        assert_eq!(domain.get(EntityId::RightMotor, PropertyId::Goal), Some(30));
        domain.flush(|_, _, _| {});

        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Knob(Knob::K1), 75, 0, &mut domain, &mut knobs);

        assert_eq!(domain.get(EntityId::RightMotor, PropertyId::Goal), Some(30));
        assert!(!domain.take_changed(EntityId::RightMotor, PropertyId::Goal));
        assert_eq!(knobs.0.get(&Knob::K1), Some(&30));
    }

    #[test]
    fn test_disabled_ignores_kill_and_head() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::Knob(Knob::K0), 40, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Start, 255, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Cross, 255, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Up, 255, 0, &mut domain, &mut knobs);
        assert_eq!(domain.get(EntityId::LeftMotor, PropertyId::Goal), Some(40));
        assert_eq!(domain.get(EntityId::Head, PropertyId::Power), Some(0));
    }

    #[test]
    fn test_cross_kills_motion() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::LeftStick, 50, -50, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Knob(Knob::K2), 20, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Cross, 255, 0, &mut domain, &mut knobs);
        assert_eq!(goals(&domain), [0, 0, 0]);
        assert_eq!(mapper.intent(), Intent::default());
        assert!(Knob::ALL.iter().all(|k| knobs.0.get(k) == Some(&0)));
    }

    #[test]
    fn test_knob_button_zeroes_one_motor() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::Knob(Knob::K0), 25, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::Knob(Knob::K2), 35, 0, &mut domain, &mut knobs);
        mapper.on_input(PadKey::KnobButton(Knob::K0), 0, 0, &mut domain, &mut knobs);
        assert_eq!(goals(&domain), [25, 0, 35], "release must not zero");
        mapper.on_input(PadKey::KnobButton(Knob::K0), 255, 0, &mut domain, &mut knobs);
        assert_eq!(goals(&domain), [0, 0, 35]);
        assert_eq!(knobs.0.get(&Knob::K0), Some(&0));
    }

    #[test]
    fn test_head_power_from_dpad() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::Up, 255, 0, &mut domain, &mut knobs);
        assert_eq!(domain.get(EntityId::Head, PropertyId::Power), Some(100));
        mapper.on_input(PadKey::Down, 128, 0, &mut domain, &mut knobs);
        assert_eq!(domain.get(EntityId::Head, PropertyId::Power), Some(-50));
        mapper.on_input(PadKey::Down, 0, 0, &mut domain, &mut knobs);
        assert_eq!(domain.get(EntityId::Head, PropertyId::Power), Some(0));
    }

    #[test]
    fn test_dpad_spin() {
        let (mut mapper, mut domain, mut knobs) = setup();
        mapper.on_input(PadKey::Left, 255, 0, &mut domain, &mut knobs);
        // w = 255 * (2.7 / 255) * 0.5 = 1.35 rad/s
        assert!((mapper.intent().w - 1.35).abs() < 1e-4);
        let [left, right, rear] = goals(&domain);
        assert!(left < 0 && right > 0 && rear > 0);

        mapper.on_input(PadKey::Right, 255, 0, &mut domain, &mut knobs);
        assert!((mapper.intent().w + 1.35).abs() < 1e-4);
    }
}
