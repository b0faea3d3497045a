// Entities: named groups of synchronized properties
//
// Two kinds exist: the three wheel motors and the head. Which properties an
// entity has, and which direction each one travels over the link, is fixed
// by its kind.

use std::fmt;

use super::Role;
use super::property::{Property, PropertyId};

/// Entity identifiers, unique within a Domain.
///
/// `None` and `AllMotors` own no storage: `None` marks non-entity display
/// rows, `AllMotors` is a broadcast target for writes to every motor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityId {
    None = 0,
    LeftMotor = 1,
    RightMotor = 2,
    RearMotor = 3,
    Head = 4,
    AllMotors = 15,
}

impl EntityId {
    pub const MOTORS: [EntityId; 3] = [EntityId::LeftMotor, EntityId::RightMotor, EntityId::RearMotor];

    pub fn name(self) -> &'static str {
        match self {
            EntityId::LeftMotor => "Left Motor",
            EntityId::RightMotor => "Right Motor",
            EntityId::RearMotor => "Rear Motor",
            EntityId::Head => "Head",
            EntityId::AllMotors => "All Motors",
            EntityId::None => "***",
        }
    }
}

impl TryFrom<u8> for EntityId {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(EntityId::None),
            1 => Ok(EntityId::LeftMotor),
            2 => Ok(EntityId::RightMotor),
            3 => Ok(EntityId::RearMotor),
            4 => Ok(EntityId::Head),
            15 => Ok(EntityId::AllMotors),
            other => Err(other),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One omni wheel motor
#[derive(Debug, Clone, Default)]
pub struct Motor {
    goal: Property,         // target RPM, set by the operator
    rpm: Property,          // measured RPM, reported by the robot
    power: Property,        // drive power percent, reported by the robot
    direct_drive: Property, // 0/1: goal is a raw power rather than an RPM
}

impl Motor {
    const PROPERTIES: [PropertyId; 4] = [
        PropertyId::Goal,
        PropertyId::Rpm,
        PropertyId::Power,
        PropertyId::DirectDrive,
    ];

    fn property(&self, id: PropertyId) -> Option<&Property> {
        match id {
            PropertyId::Goal => Some(&self.goal),
            PropertyId::Rpm => Some(&self.rpm),
            PropertyId::Power => Some(&self.power),
            PropertyId::DirectDrive => Some(&self.direct_drive),
            PropertyId::Position => None,
        }
    }

    fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        match id {
            PropertyId::Goal => Some(&mut self.goal),
            PropertyId::Rpm => Some(&mut self.rpm),
            PropertyId::Power => Some(&mut self.power),
            PropertyId::DirectDrive => Some(&mut self.direct_drive),
            PropertyId::Position => None,
        }
    }

    fn to_robot(id: PropertyId) -> bool {
        matches!(id, PropertyId::Goal | PropertyId::DirectDrive)
    }

    fn from_robot(id: PropertyId) -> bool {
        matches!(id, PropertyId::Rpm | PropertyId::Power)
    }
}

/// The pan head
#[derive(Debug, Clone, Default)]
pub struct Head {
    power: Property,    // drive power, operator-set
    position: Property, // measured position, reported by the robot
}

impl Head {
    const PROPERTIES: [PropertyId; 2] = [PropertyId::Power, PropertyId::Position];

    fn property(&self, id: PropertyId) -> Option<&Property> {
        match id {
            PropertyId::Power => Some(&self.power),
            PropertyId::Position => Some(&self.position),
            _ => None,
        }
    }

    fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        match id {
            PropertyId::Power => Some(&mut self.power),
            PropertyId::Position => Some(&mut self.position),
            _ => None,
        }
    }

    fn to_robot(id: PropertyId) -> bool {
        id == PropertyId::Power
    }

    // Power has a single writer, the console, so it is never echoed back
    fn from_robot(id: PropertyId) -> bool {
        id == PropertyId::Position
    }
}

#[derive(Debug, Clone)]
pub enum Kind {
    Motor(Motor),
    Head(Head),
}

/// A storage-owning entity
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    kind: Kind,
}

impl Entity {
    pub fn motor(id: EntityId) -> Self {
        Self {
            id,
            kind: Kind::Motor(Motor::default()),
        }
    }

    pub fn head(id: EntityId) -> Self {
        Self {
            id,
            kind: Kind::Head(Head::default()),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn is_motor(&self) -> bool {
        matches!(self.kind, Kind::Motor(_))
    }

    /// Properties of this entity in canonical (ascending id) order
    pub fn properties(&self) -> &'static [PropertyId] {
        match self.kind {
            Kind::Motor(_) => &Motor::PROPERTIES,
            Kind::Head(_) => &Head::PROPERTIES,
        }
    }

    fn property(&self, id: PropertyId) -> Option<&Property> {
        match &self.kind {
            Kind::Motor(m) => m.property(id),
            Kind::Head(h) => h.property(id),
        }
    }

    fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        match &mut self.kind {
            Kind::Motor(m) => m.property_mut(id),
            Kind::Head(h) => h.property_mut(id),
        }
    }

    pub fn has(&self, id: PropertyId) -> bool {
        self.property(id).is_some()
    }

    /// Write a property. Returns false if this kind has no such property.
    pub fn set(&mut self, id: PropertyId, value: i16) -> bool {
        // DirectDrive is a flag; any non-zero write means "on"
        let value = match id {
            PropertyId::DirectDrive => (value != 0) as i16,
            _ => value,
        };
        match self.property_mut(id) {
            Some(p) => {
                p.set(value);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: PropertyId) -> Option<i16> {
        self.property(id).map(Property::get)
    }

    /// Returns the changed flag and clears it; false for unknown properties
    pub fn take_changed(&mut self, id: PropertyId) -> bool {
        self.property_mut(id).is_some_and(Property::take_changed)
    }

    /// Whether a node in `role` transmits this property when it changes
    pub fn is_outbound(&self, id: PropertyId, role: Role) -> bool {
        match (&self.kind, role) {
            (Kind::Motor(_), Role::Console) => Motor::to_robot(id),
            (Kind::Motor(_), Role::Robot) => Motor::from_robot(id),
            (Kind::Head(_), Role::Console) => Head::to_robot(id),
            (Kind::Head(_), Role::Robot) => Head::from_robot(id),
        }
    }
}
