// Change-tracked scalar properties
//
// A Property is a value plus a "changed since last observed" flag. The flag
// is raised by any write that changes the value and is only lowered by
// take_changed(), so exactly one consumer can observe each transition.

use std::fmt;

/// Property identifiers, unique within an entity kind.
///
/// Discriminants are the wire ids and also define the canonical flush order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyId {
    Goal = 0,
    Rpm = 1,
    Power = 2,
    DirectDrive = 3,
    Position = 4,
}

impl PropertyId {
    pub const ALL: [PropertyId; 5] = [
        PropertyId::Goal,
        PropertyId::Rpm,
        PropertyId::Power,
        PropertyId::DirectDrive,
        PropertyId::Position,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PropertyId::Goal => "Goal",
            PropertyId::Rpm => "RPM",
            PropertyId::Power => "Power",
            PropertyId::DirectDrive => "DirectDrive",
            PropertyId::Position => "Position",
        }
    }
}

impl TryFrom<u8> for PropertyId {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        PropertyId::ALL
            .into_iter()
            .find(|&id| id as u8 == raw)
            .ok_or(raw)
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Property {
    value: i16,
    changed: bool,
}

impl Property {
    pub fn new(value: i16) -> Self {
        Self {
            value,
            changed: false,
        }
    }

    /// Store a value; the changed flag is raised only if it differs
    pub fn set(&mut self, value: i16) {
        self.changed |= self.value != value;
        self.value = value;
    }

    pub fn get(&self) -> i16 {
        self.value
    }

    /// Return the changed flag and clear it
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }

    /// Peek at the changed flag without consuming it
    pub fn is_changed(&self) -> bool {
        self.changed
    }
}
