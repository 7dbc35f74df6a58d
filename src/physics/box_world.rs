//! Axis-aligned box world: gravity, static box collision and sensor contacts

use std::collections::{BTreeMap, BTreeSet};

use super::{
    BodyHandle, BodySpec, BoxSpec, ContactEvent, ContactPhase, PhysicsError, PhysicsWorld, Vec3,
};

/// Gravity in world units per second squared
pub const GRAVITY: f32 = -9.81;

/// Penetration below this depth does not count as a collision, so resting bodies can slide
const CONTACT_SLOP: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Static,
    Dynamic,
    Sensor,
}

#[derive(Debug, Clone)]
struct Body {
    name: String,
    kind: BodyKind,
    center: Vec3,
    half: Vec3,
    velocity: Vec3,
    /// Anchor body and offset from its center
    locked_to: Option<(BodyHandle, Vec3)>,
    watched: bool,
    contacts: BTreeSet<BodyHandle>,
}

impl Body {
    fn new(name: String, kind: BodyKind, center: Vec3, size: Vec3) -> Self {
        Self {
            name,
            kind,
            center,
            half: size * 0.5,
            velocity: Vec3::ZERO,
            locked_to: None,
            watched: false,
            contacts: BTreeSet::new(),
        }
    }

    fn overlaps(&self, other: &Body, slop: f32) -> bool {
        (0..3).all(|axis| {
            let distance = (self.center.axis(axis) - other.center.axis(axis)).abs();
            distance < self.half.axis(axis) + other.half.axis(axis) - slop
        })
    }
}

/// Built-in physics world for rooms.
///
/// Dynamic bodies fall under gravity and are pushed out of static boxes one axis at a time,
/// zeroing the velocity along the blocked axis. Bodies never rotate. Sensors follow their
/// lock anchor and only report overlaps.
#[derive(Debug)]
pub struct BoxWorld {
    bodies: BTreeMap<BodyHandle, Body>,
    next_id: u32,
    gravity: f32,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::with_gravity(GRAVITY)
    }

    pub fn with_gravity(gravity: f32) -> Self {
        Self {
            bodies: BTreeMap::new(),
            next_id: 0,
            gravity,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn insert(&mut self, body: Body) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;
        self.bodies.insert(handle, body);
        handle
    }

    fn body(&self, handle: BodyHandle) -> Result<&Body, PhysicsError> {
        self.bodies
            .get(&handle)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body, PhysicsError> {
        self.bodies
            .get_mut(&handle)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Integrates one dynamic body and resolves it against static boxes
    fn integrate(&mut self, handle: BodyHandle, dt: f32) {
        let Some(mut body) = self.bodies.get(&handle).cloned() else {
            return;
        };

        body.velocity.y += self.gravity * dt;

        for axis in 0..3 {
            let step = body.velocity.axis(axis) * dt;
            if step == 0.0 {
                continue;
            }
            *body.center.axis_mut(axis) += step;

            for other in self.bodies.values() {
                if other.kind != BodyKind::Static || !body.overlaps(other, CONTACT_SLOP) {
                    continue;
                }
                let reach = body.half.axis(axis) + other.half.axis(axis);
                let resolved = if step > 0.0 {
                    other.center.axis(axis) - reach
                } else {
                    other.center.axis(axis) + reach
                };
                *body.center.axis_mut(axis) = resolved;
                *body.velocity.axis_mut(axis) = 0.0;
            }
        }

        self.bodies.insert(handle, body);
    }

    /// Moves locked bodies onto their anchors
    fn apply_locks(&mut self) {
        let anchors: Vec<(BodyHandle, BodyHandle, Vec3)> = self
            .bodies
            .iter()
            .filter_map(|(handle, body)| body.locked_to.map(|(a, offset)| (*handle, a, offset)))
            .collect();

        for (follower, anchor, offset) in anchors {
            let Some(anchor_body) = self.bodies.get(&anchor) else {
                continue;
            };
            let (center, velocity) = (anchor_body.center + offset, anchor_body.velocity);
            if let Some(body) = self.bodies.get_mut(&follower) {
                body.center = center;
                body.velocity = velocity;
            }
        }
    }

    /// Diffs each watched sensor's overlaps against the previous step
    fn collect_contacts(&mut self) -> Vec<ContactEvent> {
        let mut events = Vec::new();
        let sensors: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.watched)
            .map(|(h, _)| *h)
            .collect();

        for sensor in sensors {
            let Some(body) = self.bodies.get(&sensor) else {
                continue;
            };
            let anchor = body.locked_to.map(|(a, _)| a);

            let current: BTreeSet<BodyHandle> = self
                .bodies
                .iter()
                .filter(|(h, other)| {
                    **h != sensor
                        && Some(**h) != anchor
                        && other.kind != BodyKind::Sensor
                        && body.overlaps(other, 0.0)
                })
                .map(|(h, _)| *h)
                .collect();

            for began in current.difference(&body.contacts) {
                events.push(ContactEvent {
                    sensor,
                    other: self.bodies[began].name.clone(),
                    phase: ContactPhase::Begin,
                });
            }
            for ended in body.contacts.difference(&current) {
                if let Some(other) = self.bodies.get(ended) {
                    events.push(ContactEvent {
                        sensor,
                        other: other.name.clone(),
                        phase: ContactPhase::End,
                    });
                }
            }

            if let Some(body) = self.bodies.get_mut(&sensor) {
                body.contacts = current;
            }
        }

        events
    }
}

impl Default for BoxWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld for BoxWorld {
    fn add_static_box(&mut self, spec: BoxSpec) -> BodyHandle {
        self.insert(Body::new(spec.name, BodyKind::Static, spec.center, spec.size))
    }

    fn add_dynamic_body(&mut self, spec: BodySpec) -> BodyHandle {
        let kind = if spec.sensor {
            BodyKind::Sensor
        } else {
            BodyKind::Dynamic
        };
        self.insert(Body::new(spec.name, kind, spec.center, spec.size))
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        if self.bodies.remove(&body).is_none() {
            return;
        }
        for other in self.bodies.values_mut() {
            other.contacts.remove(&body);
            if matches!(other.locked_to, Some((anchor, _)) if anchor == body) {
                other.locked_to = None;
            }
        }
    }

    fn velocity(&self, body: BodyHandle) -> Result<Vec3, PhysicsError> {
        Ok(self.body(body)?.velocity)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<(), PhysicsError> {
        let body = self.body_mut(body)?;
        if body.kind == BodyKind::Dynamic {
            body.velocity = velocity;
        }
        Ok(())
    }

    fn position(&self, body: BodyHandle) -> Result<Vec3, PhysicsError> {
        Ok(self.body(body)?.center)
    }

    fn lock_constraint(
        &mut self,
        anchor: BodyHandle,
        follower: BodyHandle,
    ) -> Result<(), PhysicsError> {
        let anchor_center = self.body(anchor)?.center;
        let follower = self.body_mut(follower)?;
        follower.locked_to = Some((anchor, follower.center - anchor_center));
        Ok(())
    }

    fn watch_contacts(&mut self, sensor: BodyHandle) -> Result<(), PhysicsError> {
        self.body_mut(sensor)?.watched = true;
        Ok(())
    }

    fn step(&mut self, delta_ms: f32) -> Result<Vec<ContactEvent>, PhysicsError> {
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            return Err(PhysicsError::InvalidDelta(delta_ms));
        }
        let dt = delta_ms / 1000.0;

        let dynamic: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.kind == BodyKind::Dynamic && b.locked_to.is_none())
            .map(|(h, _)| *h)
            .collect();

        for handle in dynamic {
            self.integrate(handle, dt);
        }
        self.apply_locks();

        if let Some(body) = self
            .bodies
            .values()
            .find(|b| !b.center.is_finite() || !b.velocity.is_finite())
        {
            return Err(PhysicsError::NonFinite {
                name: body.name.clone(),
            });
        }

        Ok(self.collect_contacts())
    }
}
