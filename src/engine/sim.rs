use glam::DVec2;

/// Identifier handed out by the simulator. Never reused within one run, so a
/// hidden marker can never collide with a body id it held before.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

#[derive(Clone, Copy, Debug)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub position: DVec2,
    pub velocity: DVec2,
    pub radius: f64,
    pub is_static: bool,
}

/// The narrow interface the engine needs from a rigid-body simulator. The
/// engine only ever queries body state and issues the commands below; collision
/// response, gravity and restitution live entirely behind this trait.
pub trait Simulation {
    fn add_body(&mut self, position: DVec2, radius: f64) -> BodyId;
    fn remove_body(&mut self, id: BodyId);
    fn body(&self, id: BodyId) -> Option<BodySnapshot>;
    fn bodies(&self) -> Vec<BodySnapshot>;
    fn set_position(&mut self, id: BodyId, position: DVec2);
    fn set_velocity(&mut self, id: BodyId, velocity: DVec2);
    fn set_angular_velocity(&mut self, id: BodyId, angular_velocity: f64);
    /// Multiplies the body radius by `ratio`.
    fn scale_body(&mut self, id: BodyId, ratio: f64);
    /// Moves the enclosing walls to a new world rectangle.
    fn set_world_size(&mut self, world: DVec2);
    fn set_stepping_enabled(&mut self, enabled: bool);
    fn stepping_enabled(&self) -> bool;
    /// 0.0 disables pointer dragging entirely; `DEFAULT_DRAG_STIFFNESS`
    /// restores the default grab strength.
    fn set_drag_stiffness(&mut self, stiffness: f64);
    fn step(&mut self, dt: f64);
}

pub const DEFAULT_DRAG_STIFFNESS: f64 = 0.2;
