use glam::DVec2;

use super::Bounds;
use super::sim::BodySnapshot;

pub fn screen_to_world(screen: DVec2, bounds: &Bounds, view: DVec2) -> DVec2 {
    bounds.min + screen / view * bounds.size()
}

pub fn world_to_screen(world: DVec2, bounds: &Bounds, view: DVec2) -> DVec2 {
    (world - bounds.min) / bounds.size() * view
}

/// Nearest non-static body to `point`, or `None` when only static bodies (or
/// none at all) exist. Used instead of holding a body reference across frames.
pub fn closest_dynamic_body(bodies: &[BodySnapshot], point: DVec2) -> Option<BodySnapshot> {
    bodies
        .iter()
        .filter(|body| !body.is_static)
        .min_by(|a, b| {
            a.position
                .distance_squared(point)
                .total_cmp(&b.position.distance_squared(point))
        })
        .copied()
}
