// Domain: the mirrored property set of one link endpoint
//
// Console and robot each own a Domain with the same entities. Local writes
// raise dirty flags; flush() drains them once per tick into a single bounded
// payload for the peer, and apply() turns a received payload back into
// writes. Delivery is best-effort: no acks, no retries, a change is sent at
// most once.

pub mod entity;
pub mod property;

use tracing::{debug, error, info, warn};

use crate::config::PACKET_CAPACITY;
use crate::error::{LinkError, Result};
use crate::messages::{Packet, decode_packets, encode_packets};
use crate::transport::Transport;

pub use entity::{Entity, EntityId};
pub use property::{Property, PropertyId};

/// Which end of the link a Domain lives on. Decides which changed
/// properties are transmitted by flush().
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Console,
    Robot,
}

/// Outcome of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records handed to the transport
    pub sent: usize,
    /// Transmittable changes that did not fit in the payload
    pub dropped: usize,
    /// Change notifications delivered to the observer
    pub notified: usize,
    /// The transport refused the payload
    pub send_failed: bool,
}

pub struct Domain {
    role: Role,
    entities: Vec<Entity>, // sorted by id
    capacity: usize,
    transport: Option<Box<dyn Transport>>,
}

impl Domain {
    pub fn new(role: Role, mut entities: Vec<Entity>) -> Self {
        entities.sort_by_key(Entity::id);
        Self {
            role,
            entities,
            capacity: PACKET_CAPACITY,
            transport: None,
        }
    }

    /// The standard robot: three wheel motors and a head
    pub fn omnibot(role: Role) -> Self {
        Self::new(
            role,
            vec![
                Entity::motor(EntityId::LeftMotor),
                Entity::motor(EntityId::RightMotor),
                Entity::motor(EntityId::RearMotor),
                Entity::head(EntityId::Head),
            ],
        )
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Register the transport to the peer. Until then flushes still clear
    /// dirty flags but nothing is sent.
    pub fn init(&mut self, transport: Box<dyn Transport>) {
        info!("{:?} domain linked to peer", self.role);
        self.transport = Some(transport);
    }

    pub fn is_initialized(&self) -> bool {
        self.transport.is_some()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    /// Write a property. `AllMotors` fans the write out to every motor.
    pub fn set(&mut self, entity: EntityId, property: PropertyId, value: i16) -> Result<()> {
        if entity == EntityId::AllMotors {
            let mut any = false;
            for motor in self.entities.iter_mut().filter(|e| e.is_motor()) {
                any |= motor.set(property, value);
            }
            if !any {
                return Err(LinkError::UnknownProperty {
                    entity: entity as u8,
                    property: property as u8,
                });
            }
            return Ok(());
        }

        let target = self
            .entity_mut(entity)
            .ok_or(LinkError::UnknownEntity(entity as u8))?;
        if !target.set(property, value) {
            return Err(LinkError::UnknownProperty {
                entity: entity as u8,
                property: property as u8,
            });
        }
        Ok(())
    }

    /// `set` for callers with no use for the error: an invalid pair is
    /// logged and the write dropped. Returns whether it was applied.
    pub fn write(&mut self, entity: EntityId, property: PropertyId, value: i16) -> bool {
        match self.set(entity, property, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Write to {}.{} dropped: {}", entity, property, e);
                false
            }
        }
    }

    /// Read a property; None (logged) for an invalid entity/property pair.
    /// Never touches the dirty flag.
    pub fn get(&self, entity: EntityId, property: PropertyId) -> Option<i16> {
        let value = self.entity(entity).and_then(|e| e.get(property));
        if value.is_none() {
            warn!("Invalid property read: {}.{}", entity, property);
        }
        value
    }

    /// Return the dirty flag for a property and clear it
    pub fn take_changed(&mut self, entity: EntityId, property: PropertyId) -> bool {
        self.entity_mut(entity)
            .is_some_and(|e| e.take_changed(property))
    }

    /// Drain every dirty property in (entity, property) order.
    ///
    /// Each cleared flag is reported to `on_change`. Changes this role
    /// transmits are packed into one payload of at most `capacity` records;
    /// changes past that are dropped for good, not deferred.
    pub fn flush(&mut self, mut on_change: impl FnMut(EntityId, PropertyId, i16)) -> FlushReport {
        let mut report = FlushReport::default();
        let mut packets = Vec::with_capacity(self.capacity);

        for entity in &mut self.entities {
            let id = entity.id();
            for &property in entity.properties() {
                if !entity.take_changed(property) {
                    continue;
                }
                let value = entity.get(property).unwrap_or_default();

                if entity.is_outbound(property, self.role) {
                    if packets.len() < self.capacity {
                        packets.push(Packet::new(id as u8, property as u8, value));
                    } else {
                        report.dropped += 1;
                    }
                }

                on_change(id, property, value);
                report.notified += 1;
            }
        }

        if report.dropped > 0 {
            warn!("{}", LinkError::Overflow { dropped: report.dropped });
        }

        if packets.is_empty() {
            return report;
        }

        let Some(transport) = self.transport.as_mut() else {
            debug!("No peer registered, discarding {} packets", packets.len());
            return report;
        };

        match transport.send(encode_packets(&packets)) {
            Ok(()) => report.sent = packets.len(),
            Err(e) => {
                error!("Error sending {} packets: {}", packets.len(), e);
                report.send_failed = true;
            }
        }
        report
    }

    /// Apply a payload received from the peer. Returns the number of writes
    /// applied. A framing error discards the whole payload; unknown ids only
    /// skip their own record. Records for properties this role transmits are
    /// skipped too: the local node is their only writer.
    pub fn apply(&mut self, payload: &[u8]) -> Result<usize> {
        let packets = decode_packets(payload).inspect_err(|e| warn!("Discarding payload: {}", e))?;

        let mut applied = 0;
        for packet in packets {
            match self.apply_packet(packet) {
                Ok(true) => applied += 1,
                Ok(false) => debug!("Skipping write to locally owned {:?}", packet),
                Err(e) => warn!("Ignoring received packet {:?}: {}", packet, e),
            }
        }
        Ok(applied)
    }

    /// Returns false when the property is owned by this side
    fn apply_packet(&mut self, packet: Packet) -> Result<bool> {
        let entity = EntityId::try_from(packet.entity).map_err(LinkError::UnknownEntity)?;
        let property = PropertyId::try_from(packet.property).map_err(|raw| {
            LinkError::UnknownProperty {
                entity: packet.entity,
                property: raw,
            }
        })?;
        if self.is_local(entity, property) {
            return Ok(false);
        }
        self.set(entity, property, packet.value)?;
        Ok(true)
    }

    /// True when this role is the writer of the property
    fn is_local(&self, entity: EntityId, property: PropertyId) -> bool {
        let target = if entity == EntityId::AllMotors {
            self.entities.iter().find(|e| e.is_motor())
        } else {
            self.entity(entity)
        };
        target.is_some_and(|e| e.has(property) && e.is_outbound(property, self.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::PACKET_SIZE;
    use crate::transport::ChannelTransport;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn linked(role: Role) -> (Domain, UnboundedReceiver<Vec<u8>>) {
        let (transport, rx) = ChannelTransport::new();
        let mut domain = Domain::omnibot(role);
        domain.init(Box::new(transport));
        (domain, rx)
    }

    fn sent(rx: &mut UnboundedReceiver<Vec<u8>>) -> Vec<Packet> {
        decode_packets(&rx.try_recv().expect("expected a payload")).unwrap()
    }

    #[test]
    fn test_clean_flush_sends_nothing() {
        let (mut domain, mut rx) = linked(Role::Console);
        let report = domain.flush(|_, _, _| panic!("nothing changed"));
        assert_eq!(report, FlushReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_last_write_between_flushes_wins() {
        let (mut domain, mut rx) = linked(Role::Console);
        for v in [5, 17, -3, 40] {
            domain.set(EntityId::RightMotor, PropertyId::Goal, v).unwrap();
        }
        domain.flush(|_, _, _| {});
        assert_eq!(sent(&mut rx), vec![Packet::new(2, 0, 40)]);
    }

    #[test]
    fn test_flush_clears_flags() {
        let (mut domain, mut rx) = linked(Role::Console);
        domain.set(EntityId::LeftMotor, PropertyId::Goal, 9).unwrap();
        domain.flush(|_, _, _| {});
        assert!(!domain.take_changed(EntityId::LeftMotor, PropertyId::Goal));
        let _ = rx.try_recv();

        domain.set(EntityId::LeftMotor, PropertyId::Goal, 9).unwrap();
        assert_eq!(domain.flush(|_, _, _| {}).sent, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_flush_uses_canonical_order() {
        let (mut domain, mut rx) = linked(Role::Console);
        domain.set(EntityId::Head, PropertyId::Power, 20).unwrap();
        domain.set(EntityId::RearMotor, PropertyId::DirectDrive, 1).unwrap();
        domain.set(EntityId::RearMotor, PropertyId::Goal, 3).unwrap();
        domain.set(EntityId::LeftMotor, PropertyId::Goal, 1).unwrap();

        let mut seen = Vec::new();
        domain.flush(|e, p, _| seen.push((e, p)));
        assert_eq!(
            seen,
            vec![
                (EntityId::LeftMotor, PropertyId::Goal),
                (EntityId::RearMotor, PropertyId::Goal),
                (EntityId::RearMotor, PropertyId::DirectDrive),
                (EntityId::Head, PropertyId::Power),
            ]
        );
        assert_eq!(
            sent(&mut rx),
            vec![
                Packet::new(1, 0, 1),
                Packet::new(3, 0, 3),
                Packet::new(3, 3, 1),
                Packet::new(4, 2, 20),
            ]
        );
    }

    #[test]
    fn test_console_notifies_but_never_sends_telemetry() {
        let (mut domain, mut rx) = linked(Role::Console);
        domain.set(EntityId::LeftMotor, PropertyId::Rpm, 55).unwrap();
        domain.set(EntityId::LeftMotor, PropertyId::Power, 30).unwrap();

        let mut notified = Vec::new();
        let report = domain.flush(|e, p, v| notified.push((e, p, v)));
        assert_eq!(report.notified, 2);
        assert_eq!(report.sent, 0);
        assert_eq!(notified[0], (EntityId::LeftMotor, PropertyId::Rpm, 55));
        assert!(rx.try_recv().is_err(), "telemetry must stay local");
    }

    #[test]
    fn test_overflow_sends_prefix_and_drops_rest() {
        let (transport, mut rx) = ChannelTransport::new();
        let mut domain = Domain::omnibot(Role::Console).with_capacity(2);
        domain.init(Box::new(transport));

        domain.set(EntityId::LeftMotor, PropertyId::Goal, 1).unwrap();
        domain.set(EntityId::RightMotor, PropertyId::Goal, 2).unwrap();
        domain.set(EntityId::RearMotor, PropertyId::Goal, 3).unwrap();
        domain.set(EntityId::Head, PropertyId::Power, 4).unwrap();

        let report = domain.flush(|_, _, _| {});
        assert_eq!(report.sent, 2);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.notified, 4);
        assert_eq!(
            sent(&mut rx),
            vec![Packet::new(1, 0, 1), Packet::new(2, 0, 2)]
        );

        // the dropped changes are not resent
        assert_eq!(domain.flush(|_, _, _| {}), FlushReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_failure_is_not_retried() {
        let (mut domain, rx) = linked(Role::Console);
        drop(rx);
        domain.set(EntityId::LeftMotor, PropertyId::Goal, 12).unwrap();
        let report = domain.flush(|_, _, _| {});
        assert!(report.send_failed);
        assert_eq!(report.sent, 0);
        assert!(!domain.take_changed(EntityId::LeftMotor, PropertyId::Goal));
    }

    #[test]
    fn test_flush_without_peer_still_clears() {
        let mut domain = Domain::omnibot(Role::Console);
        assert!(!domain.is_initialized());
        domain.set(EntityId::LeftMotor, PropertyId::Goal, 12).unwrap();
        let report = domain.flush(|_, _, _| {});
        assert_eq!(report.notified, 1);
        assert_eq!(report.sent, 0);
        assert!(!domain.take_changed(EntityId::LeftMotor, PropertyId::Goal));
    }

    #[test]
    fn test_robot_reports_telemetry_not_goals() {
        let (mut domain, mut rx) = linked(Role::Robot);
        domain.set(EntityId::LeftMotor, PropertyId::Goal, 50).unwrap();
        domain.set(EntityId::LeftMotor, PropertyId::Rpm, 48).unwrap();
        domain.set(EntityId::Head, PropertyId::Position, -7).unwrap();
        domain.flush(|_, _, _| {});
        assert_eq!(
            sent(&mut rx),
            vec![Packet::new(1, 1, 48), Packet::new(4, 4, -7)]
        );
    }

    #[test]
    fn test_write_reports_invalid_pairs() {
        let mut domain = Domain::omnibot(Role::Robot);
        assert!(domain.write(EntityId::Head, PropertyId::Position, 5));
        assert!(!domain.write(EntityId::Head, PropertyId::Goal, 5));
        assert!(!domain.write(EntityId::None, PropertyId::Goal, 5));
        assert!(!domain.take_changed(EntityId::Head, PropertyId::Goal));
    }

    #[test]
    fn test_apply_is_last_write_wins() {
        let mut domain = Domain::omnibot(Role::Robot);
        let payload = encode_packets(&[
            Packet::new(1, 0, 10),
            Packet::new(2, 0, 20),
            Packet::new(1, 0, -30),
        ]);
        assert_eq!(domain.apply(&payload).unwrap(), 3);
        assert_eq!(domain.get(EntityId::LeftMotor, PropertyId::Goal), Some(-30));
        assert_eq!(domain.get(EntityId::RightMotor, PropertyId::Goal), Some(20));
        assert!(domain.take_changed(EntityId::LeftMotor, PropertyId::Goal));
    }

    #[test]
    fn test_apply_fans_out_all_motors() {
        let mut domain = Domain::omnibot(Role::Robot);
        let payload = encode_packets(&[Packet::new(EntityId::AllMotors as u8, 0, 25)]);
        assert_eq!(domain.apply(&payload).unwrap(), 1);
        for motor in EntityId::MOTORS {
            assert_eq!(domain.get(motor, PropertyId::Goal), Some(25));
        }
        assert_eq!(domain.get(EntityId::Head, PropertyId::Power), Some(0));
    }

    #[test]
    fn test_apply_skips_locally_owned_properties() {
        let mut console = Domain::omnibot(Role::Console);
        console.set(EntityId::Head, PropertyId::Power, 100).unwrap();
        console.flush(|_, _, _| {});
        console.set(EntityId::Head, PropertyId::Power, 0).unwrap();

        let payload = encode_packets(&[
            Packet::new(EntityId::Head as u8, PropertyId::Power as u8, 100),
            Packet::new(EntityId::AllMotors as u8, PropertyId::Goal as u8, 70),
            Packet::new(EntityId::Head as u8, PropertyId::Position as u8, 12),
        ]);
        assert_eq!(console.apply(&payload).unwrap(), 1);
        assert_eq!(console.get(EntityId::Head, PropertyId::Power), Some(0));
        assert_eq!(console.get(EntityId::LeftMotor, PropertyId::Goal), Some(0));
        assert_eq!(console.get(EntityId::Head, PropertyId::Position), Some(12));

        let mut robot = Domain::omnibot(Role::Robot);
        let payload = encode_packets(&[Packet::new(1, PropertyId::Rpm as u8, 33)]);
        assert_eq!(robot.apply(&payload).unwrap(), 0);
        assert_eq!(robot.get(EntityId::LeftMotor, PropertyId::Rpm), Some(0));
    }

    #[test]
    fn test_apply_rejects_bad_framing() {
        let mut domain = Domain::omnibot(Role::Robot);
        let mut payload = encode_packets(&[Packet::new(1, 0, 10), Packet::new(2, 0, 20)]);
        payload.truncate(PACKET_SIZE + 1);
        assert!(matches!(
            domain.apply(&payload),
            Err(LinkError::Framing { len: 5, .. })
        ));
        assert_eq!(domain.get(EntityId::LeftMotor, PropertyId::Goal), Some(0));
        assert!(!domain.take_changed(EntityId::LeftMotor, PropertyId::Goal));
    }

    #[test]
    fn test_apply_skips_unknown_ids() {
        let mut domain = Domain::omnibot(Role::Robot);
        let payload = encode_packets(&[
            Packet::new(9, 0, 1),  // no such entity
            Packet::new(4, 0, 2),  // head has no Goal
            Packet::new(1, 12, 3), // no such property
            Packet::new(0, 0, 4),  // the None sentinel
            Packet::new(3, 0, 5),
        ]);
        assert_eq!(domain.apply(&payload).unwrap(), 1);
        assert_eq!(domain.get(EntityId::RearMotor, PropertyId::Goal), Some(5));
    }

    #[test]
    fn test_invalid_reads_and_writes() {
        let mut domain = Domain::omnibot(Role::Console);
        assert_eq!(domain.get(EntityId::None, PropertyId::Goal), None);
        assert_eq!(domain.get(EntityId::AllMotors, PropertyId::Goal), None);
        assert_eq!(domain.get(EntityId::LeftMotor, PropertyId::Position), None);
        assert!(matches!(
            domain.set(EntityId::None, PropertyId::Goal, 1),
            Err(LinkError::UnknownEntity(0))
        ));
        assert!(matches!(
            domain.set(EntityId::AllMotors, PropertyId::Position, 1),
            Err(LinkError::UnknownProperty { .. })
        ));
    }
}
