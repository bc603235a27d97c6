use super::sim::Simulation;
use super::{Engine, WRAP_VELOCITY_DAMPING};

impl<S: Simulation> Engine<S> {
    /// Teleports runaway bodies back in from the opposite edge. A body counts
    /// as escaped once its center is more than two radii past a world edge,
    /// so a ball resting against a wall is never touched. Re-entry damps the
    /// velocity to keep a fast escapee from immediately escaping again.
    pub(in crate::engine) fn wrap_escaped_bodies(&mut self) {
        let world = self.world;
        let escaped: Vec<_> = self
            .sim
            .bodies()
            .into_iter()
            .filter(|body| !body.is_static)
            .filter_map(|body| {
                let r = body.radius;
                let p = body.position;
                let mut wrapped = p;

                if p.x < -2.0 * r {
                    wrapped.x = world.x + r;
                } else if p.x > world.x + 2.0 * r {
                    wrapped.x = -r;
                }
                if p.y < -2.0 * r {
                    wrapped.y = world.y + r;
                } else if p.y > world.y + 2.0 * r {
                    wrapped.y = -r;
                }

                (wrapped != p).then_some((body.id, wrapped, body.velocity))
            })
            .collect();

        for (id, position, velocity) in escaped {
            self.sim.set_position(id, position);
            self.sim
                .set_velocity(id, velocity * WRAP_VELOCITY_DAMPING);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::dvec2;

    use super::*;
    use crate::sim::BallSim;

    fn engine() -> Engine<BallSim> {
        let sim = BallSim::new(dvec2(800.0, 600.0));
        Engine::new(sim, 800.0, 600.0)
    }

    #[test]
    fn body_past_left_edge_reenters_on_the_right() {
        let mut engine = engine();
        let id = engine.spawn(10.0, None, None, None);
        let body = engine.marker(id).unwrap().body_id().unwrap();
        let radius = engine.marker(id).unwrap().display_radius;

        engine
            .sim_mut()
            .set_position(body, dvec2(-2.0 * radius - 1.0, 300.0));
        engine.sim_mut().set_velocity(body, dvec2(-80.0, 20.0));
        engine.wrap_escaped_bodies();

        let snapshot = engine.sim().body(body).unwrap();
        assert!((snapshot.position.x - (800.0 + radius)).abs() < 1e-9);
        assert!((snapshot.position.y - 300.0).abs() < 1e-9);
        assert!((snapshot.velocity - dvec2(-40.0, 10.0)).length() < 1e-9);
    }

    #[test]
    fn body_past_bottom_edge_reenters_on_top() {
        let mut engine = engine();
        let id = engine.spawn(10.0, None, None, None);
        let body = engine.marker(id).unwrap().body_id().unwrap();
        let radius = engine.marker(id).unwrap().display_radius;

        engine
            .sim_mut()
            .set_position(body, dvec2(400.0, 600.0 + 2.0 * radius + 5.0));
        engine.wrap_escaped_bodies();

        let snapshot = engine.sim().body(body).unwrap();
        assert!((snapshot.position.y - (-radius)).abs() < 1e-9);
        assert!((snapshot.position.x - 400.0).abs() < 1e-9);
    }

    #[test]
    fn body_leaning_past_an_edge_is_left_alone() {
        let mut engine = engine();
        let id = engine.spawn(10.0, None, None, None);
        let body = engine.marker(id).unwrap().body_id().unwrap();
        let radius = engine.marker(id).unwrap().display_radius;

        // Center one radius outside: still within the escape slack.
        let position = dvec2(-radius, 200.0);
        engine.sim_mut().set_position(body, position);
        engine.wrap_escaped_bodies();

        let snapshot = engine.sim().body(body).unwrap();
        assert!((snapshot.position - position).length() < 1e-9);
    }

    #[test]
    fn walls_never_wrap() {
        let mut engine = engine();
        let before: Vec<_> = engine
            .sim()
            .bodies()
            .into_iter()
            .filter(|body| body.is_static)
            .map(|body| (body.id, body.position))
            .collect();
        assert!(!before.is_empty());

        engine.wrap_escaped_bodies();
        for (id, position) in before {
            let snapshot = engine.sim().body(id).unwrap();
            assert!((snapshot.position - position).length() < 1e-9);
        }
    }
}
