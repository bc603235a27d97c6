//! Circle rigid-body simulator backing the canvas. The engine drives it
//! exclusively through the [`Simulation`] trait; the pointer-drag spring is an
//! extra inherent surface the UI layer uses directly.

use std::collections::BTreeMap;

use glam::{DVec2, dvec2};

use crate::engine::sim::{BodyId, BodySnapshot, DEFAULT_DRAG_STIFFNESS, Simulation};

const GRAVITY: f64 = 420.0;
const RESTITUTION: f64 = 0.35;
const LINEAR_DAMPING: f64 = 0.995;
const ANGULAR_DAMPING: f64 = 0.98;
const MAX_SPEED: f64 = 2_400.0;
const SOLVER_ITERATIONS: usize = 4;
/// Fraction of tangential slip converted into spin on impact.
const SPIN_TRANSFER: f64 = 0.3;
const CORRECTION_PERCENT: f64 = 0.8;
const CORRECTION_SLOP: f64 = 0.05;
/// One step never integrates more than this; a stalled frame is split instead
/// of tunneling bodies through each other.
const MAX_SUBSTEP: f64 = 1.0 / 60.0;
/// Walls are huge static circles; at this radius their arc is flat across the
/// whole world edge.
const WALL_RADIUS_FACTOR: f64 = 16.0;

struct Body {
    position: DVec2,
    velocity: DVec2,
    angular_velocity: f64,
    rotation: f64,
    radius: f64,
    is_static: bool,
}

impl Body {
    /// Inverse mass with mass proportional to area; statics are immovable.
    fn inv_mass(&self) -> f64 {
        if self.is_static {
            0.0
        } else {
            1.0 / (self.radius * self.radius).max(f64::EPSILON)
        }
    }
}

pub struct BallSim {
    bodies: BTreeMap<BodyId, Body>,
    next_id: u64,
    stepping: bool,
    drag_stiffness: f64,
    drag: Option<(BodyId, DVec2)>,
}

impl BallSim {
    /// A simulator boxed into `world`, with four static wall circles just
    /// outside each edge.
    pub fn new(world: DVec2) -> Self {
        let mut sim = Self {
            bodies: BTreeMap::new(),
            next_id: 1,
            stepping: true,
            drag_stiffness: DEFAULT_DRAG_STIFFNESS,
            drag: None,
        };

        sim.build_walls(world);
        sim
    }

    fn build_walls(&mut self, world: DVec2) {
        self.bodies.retain(|_, body| !body.is_static);

        let wall_radius = world.x.max(world.y) * WALL_RADIUS_FACTOR;
        let centers = [
            dvec2(world.x / 2.0, -wall_radius),
            dvec2(world.x / 2.0, world.y + wall_radius),
            dvec2(-wall_radius, world.y / 2.0),
            dvec2(world.x + wall_radius, world.y / 2.0),
        ];
        for center in centers {
            let id = self.allocate_id();
            self.bodies.insert(
                id,
                Body {
                    position: center,
                    velocity: DVec2::ZERO,
                    angular_velocity: 0.0,
                    rotation: 0.0,
                    radius: wall_radius,
                    is_static: true,
                },
            );
        }
    }

    fn allocate_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Accumulated rotation of a body, for drawing oriented detail on discs.
    pub fn rotation(&self, id: BodyId) -> Option<f64> {
        self.bodies.get(&id).map(|body| body.rotation)
    }

    /// Grabs the dynamic body under `world`, if any. Inert while the drag
    /// stiffness is zero.
    pub fn begin_drag(&mut self, world: DVec2) -> Option<BodyId> {
        if self.drag_stiffness <= 0.0 {
            return None;
        }

        let id = self
            .bodies
            .iter()
            .filter(|(_, body)| !body.is_static)
            .filter(|(_, body)| body.position.distance(world) <= body.radius)
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(world)
                    .total_cmp(&b.position.distance_squared(world))
            })
            .map(|(id, _)| *id)?;

        self.drag = Some((id, world));
        Some(id)
    }

    pub fn update_drag(&mut self, world: DVec2) {
        if let Some((_, target)) = self.drag.as_mut() {
            *target = world;
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    fn substep(&mut self, dt: f64) {
        let damping = LINEAR_DAMPING.powf(dt * 60.0);
        let spin_damping = ANGULAR_DAMPING.powf(dt * 60.0);

        if let Some((id, target)) = self.drag
            && self.drag_stiffness > 0.0
            && let Some(body) = self.bodies.get_mut(&id)
        {
            // Spring toward the pointer; stiffness is the fraction of the
            // remaining distance closed per 60 Hz step.
            body.velocity = (target - body.position) * (self.drag_stiffness * 60.0);
        }

        for body in self.bodies.values_mut() {
            if body.is_static {
                continue;
            }
            body.velocity.y += GRAVITY * dt;
            body.velocity *= damping;
            let speed = body.velocity.length();
            if speed > MAX_SPEED {
                body.velocity *= MAX_SPEED / speed;
            }
            body.position += body.velocity * dt;
            body.angular_velocity *= spin_damping;
            body.rotation += body.angular_velocity * dt;
        }

        let ids: Vec<BodyId> = self.bodies.keys().copied().collect();
        for _ in 0..SOLVER_ITERATIONS {
            for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    self.resolve_pair(ids[i], ids[j]);
                }
            }
        }
    }

    fn resolve_pair(&mut self, a: BodyId, b: BodyId) {
        let (pa, pb, ra, rb, inv_a, inv_b) = {
            let Some(body_a) = self.bodies.get(&a) else {
                return;
            };
            let Some(body_b) = self.bodies.get(&b) else {
                return;
            };
            if body_a.is_static && body_b.is_static {
                return;
            }
            (
                body_a.position,
                body_b.position,
                body_a.radius,
                body_b.radius,
                body_a.inv_mass(),
                body_b.inv_mass(),
            )
        };

        let delta = pb - pa;
        let distance = delta.length();
        let overlap = ra + rb - distance;
        if overlap <= 0.0 {
            return;
        }

        let normal = if distance > f64::EPSILON {
            delta / distance
        } else {
            dvec2(0.0, -1.0)
        };
        let inv_sum = inv_a + inv_b;
        if inv_sum <= 0.0 {
            return;
        }

        let relative = {
            let va = self.bodies[&a].velocity;
            let vb = self.bodies[&b].velocity;
            (vb - va).dot(normal)
        };
        if relative < 0.0 {
            let impulse = -(1.0 + RESTITUTION) * relative / inv_sum;
            let change = normal * impulse;
            let tangent = dvec2(-normal.y, normal.x);
            let slip = {
                let va = self.bodies[&a].velocity;
                let vb = self.bodies[&b].velocity;
                (vb - va).dot(tangent)
            };
            if let Some(body) = self.bodies.get_mut(&a) {
                body.velocity -= change * body.inv_mass();
                if !body.is_static {
                    body.angular_velocity += slip / body.radius * SPIN_TRANSFER;
                }
            }
            if let Some(body) = self.bodies.get_mut(&b) {
                body.velocity += change * body.inv_mass();
                if !body.is_static {
                    body.angular_velocity += slip / body.radius * SPIN_TRANSFER;
                }
            }
        }

        // Positional correction keeps stacked discs from sinking into each
        // other between impulse rounds.
        let correction =
            normal * ((overlap - CORRECTION_SLOP).max(0.0) / inv_sum * CORRECTION_PERCENT);
        if let Some(body) = self.bodies.get_mut(&a) {
            let inv = body.inv_mass();
            body.position -= correction * inv;
        }
        if let Some(body) = self.bodies.get_mut(&b) {
            let inv = body.inv_mass();
            body.position += correction * inv;
        }
    }

    fn snapshot(id: BodyId, body: &Body) -> BodySnapshot {
        BodySnapshot {
            id,
            position: body.position,
            velocity: body.velocity,
            radius: body.radius,
            is_static: body.is_static,
        }
    }
}

impl Simulation for BallSim {
    fn add_body(&mut self, position: DVec2, radius: f64) -> BodyId {
        let id = self.allocate_id();
        self.bodies.insert(
            id,
            Body {
                position,
                velocity: DVec2::ZERO,
                angular_velocity: 0.0,
                rotation: 0.0,
                radius: radius.max(f64::EPSILON),
                is_static: false,
            },
        );
        id
    }

    fn remove_body(&mut self, id: BodyId) {
        self.bodies.remove(&id);
        if self.drag.is_some_and(|(dragged, _)| dragged == id) {
            self.drag = None;
        }
    }

    fn body(&self, id: BodyId) -> Option<BodySnapshot> {
        self.bodies.get(&id).map(|body| Self::snapshot(id, body))
    }

    fn bodies(&self) -> Vec<BodySnapshot> {
        self.bodies
            .iter()
            .map(|(id, body)| Self::snapshot(*id, body))
            .collect()
    }

    fn set_position(&mut self, id: BodyId, position: DVec2) {
        if let Some(body) = self.bodies.get_mut(&id)
            && !body.is_static
        {
            body.position = position;
        }
    }

    fn set_velocity(&mut self, id: BodyId, velocity: DVec2) {
        if let Some(body) = self.bodies.get_mut(&id)
            && !body.is_static
        {
            body.velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, id: BodyId, angular_velocity: f64) {
        if let Some(body) = self.bodies.get_mut(&id)
            && !body.is_static
        {
            body.angular_velocity = angular_velocity;
        }
    }

    fn scale_body(&mut self, id: BodyId, ratio: f64) {
        if let Some(body) = self.bodies.get_mut(&id)
            && !body.is_static
            && ratio.is_finite()
            && ratio > 0.0
        {
            body.radius *= ratio;
        }
    }

    fn set_world_size(&mut self, world: DVec2) {
        self.build_walls(world);
    }

    fn set_stepping_enabled(&mut self, enabled: bool) {
        self.stepping = enabled;
    }

    fn stepping_enabled(&self) -> bool {
        self.stepping
    }

    fn set_drag_stiffness(&mut self, stiffness: f64) {
        self.drag_stiffness = stiffness.max(0.0);
        if self.drag_stiffness <= 0.0 {
            self.drag = None;
        }
    }

    fn step(&mut self, dt: f64) {
        if !self.stepping || !(dt > 0.0) {
            return;
        }

        let mut remaining = dt.min(0.25);
        while remaining > 0.0 {
            let slice = remaining.min(MAX_SUBSTEP);
            self.substep(slice);
            remaining -= slice;
        }
    }
}
