//! Deterministic physics stand-in for simulation tests.
//! No collision math: bodies drift by their velocity, contacts are scripted.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    BodyHandle, BodySpec, BoxSpec, ContactEvent, ContactPhase, PhysicsError, PhysicsWorld, Vec3,
};

#[derive(Debug, Clone)]
pub struct FakeBody {
    pub spec: BodySpec,
    pub position: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Default)]
pub struct FakeWorld {
    next_id: u32,
    pub statics: Vec<BoxSpec>,
    pub bodies: BTreeMap<BodyHandle, FakeBody>,
    pub locks: Vec<(BodyHandle, BodyHandle)>,
    pub watched: BTreeSet<BodyHandle>,
    pub scripted_contacts: Vec<ContactEvent>,
    /// Every delta passed to `step`, in milliseconds
    pub steps: Vec<f32>,
    pub created: usize,
    pub destroyed: usize,
    pub fail_next_step: bool,
}

impl FakeWorld {
    /// Delivers a contact from the next `step`
    pub fn script_contact(&mut self, sensor: BodyHandle, other: &str, phase: ContactPhase) {
        self.scripted_contacts.push(ContactEvent {
            sensor,
            other: other.to_string(),
            phase,
        });
    }

    pub fn live_bodies(&self) -> usize {
        self.bodies.len()
    }

    fn next_handle(&mut self) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;
        handle
    }
}

impl PhysicsWorld for FakeWorld {
    fn add_static_box(&mut self, spec: BoxSpec) -> BodyHandle {
        self.statics.push(spec);
        self.next_handle()
    }

    fn add_dynamic_body(&mut self, spec: BodySpec) -> BodyHandle {
        let handle = self.next_handle();
        self.created += 1;
        self.bodies.insert(
            handle,
            FakeBody {
                position: spec.center,
                velocity: Vec3::ZERO,
                spec,
            },
        );
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        if self.bodies.remove(&body).is_some() {
            self.destroyed += 1;
            self.watched.remove(&body);
            self.locks.retain(|(a, b)| *a != body && *b != body);
        }
    }

    fn velocity(&self, body: BodyHandle) -> Result<Vec3, PhysicsError> {
        self.bodies
            .get(&body)
            .map(|b| b.velocity)
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> Result<(), PhysicsError> {
        let body = self
            .bodies
            .get_mut(&body)
            .ok_or(PhysicsError::UnknownBody(body))?;
        body.velocity = velocity;
        Ok(())
    }

    fn position(&self, body: BodyHandle) -> Result<Vec3, PhysicsError> {
        self.bodies
            .get(&body)
            .map(|b| b.position)
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn lock_constraint(
        &mut self,
        anchor: BodyHandle,
        follower: BodyHandle,
    ) -> Result<(), PhysicsError> {
        for handle in [anchor, follower] {
            if !self.bodies.contains_key(&handle) {
                return Err(PhysicsError::UnknownBody(handle));
            }
        }
        self.locks.push((anchor, follower));
        Ok(())
    }

    fn watch_contacts(&mut self, sensor: BodyHandle) -> Result<(), PhysicsError> {
        if !self.bodies.contains_key(&sensor) {
            return Err(PhysicsError::UnknownBody(sensor));
        }
        self.watched.insert(sensor);
        Ok(())
    }

    fn step(&mut self, delta_ms: f32) -> Result<Vec<ContactEvent>, PhysicsError> {
        self.steps.push(delta_ms);
        if std::mem::take(&mut self.fail_next_step) {
            return Err(PhysicsError::Fault("scripted failure".to_string()));
        }

        let dt = delta_ms / 1000.0;
        for body in self.bodies.values_mut() {
            body.position = body.position + body.velocity * dt;
        }

        Ok(std::mem::take(&mut self.scripted_contacts))
    }
}
