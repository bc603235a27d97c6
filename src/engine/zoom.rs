use glam::{DVec2, dvec2};

use super::geometry::{closest_dynamic_body, screen_to_world};
use super::sim::{BodySnapshot, Simulation};
use super::{
    ABSOLUTE_MIN_ZOOM, BALL_VISIBLE_RATIO, Bounds, Engine, FALLBACK_MIN_ZOOM, MAX_ZOOM,
    TRACKPAD_DELTA_THRESHOLD, TRACKPAD_ZOOM_STEP, WHEEL_ZOOM_STEP, ZOOM_ANIMATION_SECS,
    ZOOM_EPSILON,
};

/// Eased programmatic bounds transition. Driven by `advance`; at most one is
/// in flight, starting a new one replaces it.
pub(in crate::engine) struct BoundsAnimation {
    from: Bounds,
    to: Bounds,
    elapsed: f64,
    duration: f64,
    resume_on_finish: bool,
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

impl<S: Simulation> Engine<S> {
    /// Normalized zoom: 1.0 shows the full world, smaller ratios are zoomed in.
    pub fn zoom_ratio(&self) -> f64 {
        self.bounds.width() / self.world.x
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom_ratio() < MAX_ZOOM - ZOOM_EPSILON
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Lowest reachable zoom ratio: the smallest visible marker's diameter can
    /// always fill BALL_VISIBLE_RATIO of the smaller viewport dimension.
    pub fn dynamic_min_zoom(&self) -> f64 {
        let Some(radius) = self.markers.visible_min_radius() else {
            return FALLBACK_MIN_ZOOM;
        };

        let min_dim = self.view.x.min(self.view.y);
        let ratio = (2.0 * radius * self.view.x) / (self.world.x * BALL_VISIBLE_RATIO * min_dim);
        ratio.clamp(ABSOLUTE_MIN_ZOOM, MAX_ZOOM)
    }

    /// Wheel zoom anchored at the pointer. A positive `delta_y` zooms in.
    pub fn wheel(&mut self, pos: DVec2, delta_y: f64) {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }

        let step = if delta_y.abs() < TRACKPAD_DELTA_THRESHOLD {
            TRACKPAD_ZOOM_STEP
        } else {
            WHEEL_ZOOM_STEP
        };
        let factor = if delta_y > 0.0 { 1.0 - step } else { 1.0 + step };

        let zoom = self.zoom_ratio();
        let new_zoom = (zoom * factor).clamp(self.dynamic_min_zoom(), MAX_ZOOM);
        if (new_zoom - zoom).abs() <= ZOOM_EPSILON {
            return;
        }

        self.animation = None;
        self.following = false;
        self.apply_anchored_zoom(pos, new_zoom);
    }

    /// Pinch step: `distance_ratio` is current over previous two-finger
    /// distance; spreading fingers (> 1.0) zooms in. Anchored at the centroid.
    pub fn pinch_zoom(&mut self, center: DVec2, distance_ratio: f64) {
        if !(distance_ratio > 0.0) || !distance_ratio.is_finite() {
            return;
        }

        let zoom = self.zoom_ratio();
        let new_zoom = (zoom / distance_ratio).clamp(self.dynamic_min_zoom(), MAX_ZOOM);
        if (new_zoom - zoom).abs() <= ZOOM_EPSILON {
            return;
        }

        self.animation = None;
        self.following = false;
        self.apply_anchored_zoom(center, new_zoom);
    }

    /// Rebuilds bounds for `new_zoom` so the world point under `anchor` stays
    /// at the same screen pixel. Reaching full zoom snaps to the exact world
    /// rectangle and hands the bodies back to the simulation.
    fn apply_anchored_zoom(&mut self, anchor: DVec2, new_zoom: f64) {
        let anchor_world = screen_to_world(anchor, &self.bounds, self.view);
        let size = self.world * new_zoom;
        let min = anchor_world - anchor / self.view * size;
        self.bounds = Bounds::new(min, min + size);

        if new_zoom >= MAX_ZOOM - ZOOM_EPSILON {
            self.snap_to_full_world();
            self.resume_simulation();
        } else {
            self.freeze_simulation();
        }
    }

    /// Dynamic body whose disc contains the screen point, closest hit first.
    pub(in crate::engine) fn body_at_screen(&self, pos: DVec2) -> Option<BodySnapshot> {
        let world = screen_to_world(pos, &self.bounds, self.view);
        self.sim
            .bodies()
            .into_iter()
            .filter(|body| !body.is_static)
            .filter(|body| body.position.distance(world) <= body.radius)
            .min_by(|a, b| {
                a.position
                    .distance_squared(world)
                    .total_cmp(&b.position.distance_squared(world))
            })
    }

    /// Double-click / tap zoom: animate onto the hit marker, if any.
    pub fn double_click(&mut self, pos: DVec2) {
        if let Some(body) = self.body_at_screen(pos) {
            self.zoom_to_circle(body.position, body.radius);
        }
    }

    /// Animated zoom so a circle of `radius` at `center` fills
    /// BALL_VISIBLE_RATIO of the smaller viewport dimension. The simulation is
    /// frozen at the start of the animation, not its end, so the target cannot
    /// drift mid-flight.
    pub(in crate::engine) fn zoom_to_circle(&mut self, center: DVec2, radius: f64) {
        if radius <= 0.0 {
            return;
        }

        let size = if self.view.x < self.view.y {
            let width = 2.0 * radius / BALL_VISIBLE_RATIO;
            dvec2(width, width * self.view.y / self.view.x)
        } else {
            let height = 2.0 * radius / BALL_VISIBLE_RATIO;
            dvec2(height * self.view.x / self.view.y, height)
        };

        self.freeze_simulation();
        self.following = true;
        self.start_bounds_animation(Bounds::centered(center, size), false);
    }

    /// Animated return to the full-world view. The simulation resumes when the
    /// animation completes (never inside comparison mode).
    pub fn zoom_out(&mut self) {
        self.following = false;
        let full = Bounds::full(self.world);
        if self.bounds == full && self.animation.is_none() {
            return;
        }
        self.start_bounds_animation(full, true);
    }

    /// Shared click/tap resolution: a miss while zoomed returns to the full
    /// view; a miss at exactly full zoom inside comparison mode exits it.
    pub(in crate::engine) fn handle_click(&mut self, pos: DVec2) {
        if self.body_at_screen(pos).is_some() {
            return;
        }

        if !self.is_zoomed() {
            if self.comparison.is_some() {
                self.exit_comparison();
            }
            return;
        }

        self.zoom_out();
    }

    pub(in crate::engine) fn snap_to_full_world(&mut self) {
        self.bounds = Bounds::full(self.world);
    }

    pub(in crate::engine) fn start_bounds_animation(&mut self, to: Bounds, resume_on_finish: bool) {
        self.animation = Some(BoundsAnimation {
            from: self.bounds,
            to,
            elapsed: 0.0,
            duration: ZOOM_ANIMATION_SECS,
            resume_on_finish,
        });
    }

    pub(in crate::engine) fn advance_animation(&mut self, dt: f64) {
        let Some(animation) = &mut self.animation else {
            return;
        };

        animation.elapsed += dt;
        let t = (animation.elapsed / animation.duration).min(1.0);
        self.bounds = Bounds::lerp(&animation.from, &animation.to, ease_out_cubic(t));

        if t >= 1.0 {
            let resume = animation.resume_on_finish;
            let target = animation.to;
            self.bounds = target;
            self.animation = None;
            if resume && target == Bounds::full(self.world) {
                self.resume_simulation();
            }
        }
    }

    /// While zoomed onto a marker, keep the fixed-size viewport centered on
    /// the dynamic body nearest the view center. No body reference is stored,
    /// so marker removal cannot leave a dangling follow target.
    pub(in crate::engine) fn follow_update(&mut self) {
        if !self.following || self.panning || self.animation.is_some() || !self.is_zoomed() {
            return;
        }

        let bodies = self.sim.bodies();
        if let Some(body) = closest_dynamic_body(&bodies, self.bounds.center()) {
            self.bounds = Bounds::centered(body.position, self.bounds.size());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::geometry::world_to_screen;
    use crate::sim::BallSim;

    fn engine() -> Engine<BallSim> {
        let sim = BallSim::new(dvec2(800.0, 600.0));
        Engine::new(sim, 800.0, 600.0)
    }

    fn finish_animation(engine: &mut Engine<BallSim>) {
        for _ in 0..120 {
            engine.advance(1.0 / 60.0);
            if !engine.is_animating() {
                break;
            }
        }
    }

    #[test]
    fn wheel_in_at_center_keeps_center_fixed() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);

        let center = dvec2(400.0, 300.0);
        engine.wheel(center, 120.0);

        assert!((engine.zoom_ratio() - (1.0 - WHEEL_ZOOM_STEP)).abs() < 1e-9);
        let world_under_center = screen_to_world(center, &engine.bounds(), engine.view());
        assert!((world_under_center - dvec2(400.0, 300.0)).length() < 1e-6);
    }

    #[test]
    fn wheel_out_at_full_view_is_a_no_op() {
        let mut engine = engine();
        let before = engine.bounds();
        engine.wheel(dvec2(100.0, 100.0), -120.0);
        assert_eq!(engine.bounds(), before);
    }

    #[test]
    fn wheel_preserves_anchor_world_point() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);

        let anchor = dvec2(613.0, 127.0);
        let world_before = screen_to_world(anchor, &engine.bounds(), engine.view());
        engine.wheel(anchor, 120.0);
        engine.wheel(anchor, 120.0);

        let reprojected = world_to_screen(world_before, &engine.bounds(), engine.view());
        assert!((reprojected - anchor).length() < 1.0);
    }

    #[test]
    fn trackpad_deltas_use_smaller_step() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);
        engine.wheel(dvec2(400.0, 300.0), 10.0);
        assert!((engine.zoom_ratio() - (1.0 - TRACKPAD_ZOOM_STEP)).abs() < 1e-9);
    }

    #[test]
    fn zoom_clamps_at_dynamic_min() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);

        let min_zoom = engine.dynamic_min_zoom();
        for _ in 0..500 {
            engine.wheel(dvec2(400.0, 300.0), 120.0);
        }

        assert!((engine.zoom_ratio() - min_zoom).abs() < 1e-9);
        let before = engine.bounds();
        engine.wheel(dvec2(400.0, 300.0), 120.0);
        assert_eq!(engine.bounds(), before);
    }

    #[test]
    fn dynamic_min_zoom_fills_viewport_with_smallest_marker() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);
        engine.spawn(40.0, None, None, None);

        let smallest = 37.5;
        let min_zoom = engine.dynamic_min_zoom();
        // At the minimum, the smallest diameter in screen px covers
        // BALL_VISIBLE_RATIO of the smaller view dimension.
        let px_per_world = engine.view().x / (engine.world().x * min_zoom);
        assert!((2.0 * smallest * px_per_world - BALL_VISIBLE_RATIO * 600.0).abs() < 1e-6);
    }

    #[test]
    fn zooming_in_freezes_simulation() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);
        assert!(engine.sim().stepping_enabled());

        engine.wheel(dvec2(400.0, 300.0), 120.0);
        assert!(!engine.sim().stepping_enabled());

        for _ in 0..10 {
            engine.wheel(dvec2(400.0, 300.0), -120.0);
        }
        assert!((engine.zoom_ratio() - MAX_ZOOM).abs() < 1e-12);
        assert_eq!(engine.bounds(), Bounds::full(engine.world()));
        assert!(engine.sim().stepping_enabled());
    }

    #[test]
    fn double_click_zooms_onto_marker() {
        let mut engine = engine();
        let id = engine.spawn(10.0, None, None, None);
        let body = engine.marker(id).unwrap().body_id().unwrap();
        engine.sim_mut().set_position(body, dvec2(200.0, 200.0));

        let screen = world_to_screen(dvec2(200.0, 200.0), &engine.bounds(), engine.view());
        engine.double_click(screen);
        assert!(engine.is_animating());
        assert!(!engine.sim().stepping_enabled());

        finish_animation(&mut engine);
        let bounds = engine.bounds();
        assert!((bounds.center() - dvec2(200.0, 200.0)).length() < 1e-6);
        // Landscape view: the marker diameter fills half the bounds height.
        assert!((bounds.height() - 2.0 * 150.0 / BALL_VISIBLE_RATIO).abs() < 1e-6);
    }

    #[test]
    fn click_miss_while_zoomed_returns_to_full_view() {
        let mut engine = engine();
        let id = engine.spawn(10.0, None, None, None);
        let body = engine.marker(id).unwrap().body_id().unwrap();
        engine.sim_mut().set_position(body, dvec2(200.0, 200.0));

        engine.wheel(dvec2(400.0, 300.0), 120.0);
        assert!(engine.is_zoomed());

        engine.handle_click(dvec2(780.0, 580.0));
        assert!(engine.is_animating());
        finish_animation(&mut engine);

        assert_eq!(engine.bounds(), Bounds::full(engine.world()));
        assert!(engine.sim().stepping_enabled());
    }

    #[test]
    fn wheel_cancels_running_animation() {
        let mut engine = engine();
        let id = engine.spawn(10.0, None, None, None);
        let body = engine.marker(id).unwrap().body_id().unwrap();
        engine.sim_mut().set_position(body, dvec2(200.0, 200.0));

        let screen = world_to_screen(dvec2(200.0, 200.0), &engine.bounds(), engine.view());
        engine.double_click(screen);
        assert!(engine.is_animating());

        engine.wheel(dvec2(400.0, 300.0), 120.0);
        assert!(!engine.is_animating());
    }

    #[test]
    fn pinch_cancels_running_animation_and_follow() {
        let mut engine = engine();
        let id = engine.spawn(10.0, None, None, None);
        let body = engine.marker(id).unwrap().body_id().unwrap();
        engine.sim_mut().set_position(body, dvec2(200.0, 200.0));

        let screen = world_to_screen(dvec2(200.0, 200.0), &engine.bounds(), engine.view());
        engine.double_click(screen);
        assert!(engine.is_animating());

        engine.pinch_zoom(dvec2(400.0, 300.0), 1.1);
        assert!(!engine.is_animating());

        // Neither a resumed animation nor the follow update may override the
        // pinched bounds on the next frame.
        let bounds = engine.bounds();
        engine.advance(1.0 / 60.0);
        assert_eq!(engine.bounds(), bounds);
    }

    #[test]
    fn follow_recenters_on_closest_body() {
        let mut engine = engine();
        let id = engine.spawn(10.0, None, None, None);
        let body = engine.marker(id).unwrap().body_id().unwrap();
        engine.sim_mut().set_position(body, dvec2(200.0, 200.0));

        let screen = world_to_screen(dvec2(200.0, 200.0), &engine.bounds(), engine.view());
        engine.double_click(screen);
        finish_animation(&mut engine);

        engine.sim_mut().set_position(body, dvec2(260.0, 240.0));
        engine.advance(1.0 / 60.0);
        assert!((engine.bounds().center() - dvec2(260.0, 240.0)).length() < 1e-6);
    }

    #[test]
    fn zoom_bounds_invariant_holds_under_wheel_sequences() {
        let mut engine = engine();
        engine.spawn(3.0, None, None, None);
        engine.spawn(70.0, None, None, None);

        let deltas = [120.0, 120.0, -120.0, 120.0, 10.0, -10.0, 120.0, -120.0];
        for (index, delta) in deltas.iter().cycle().take(200).enumerate() {
            let pos = dvec2((index % 800) as f64, (index % 600) as f64);
            engine.wheel(pos, *delta);
            let zoom = engine.zoom_ratio();
            assert!(zoom <= MAX_ZOOM + 1e-9);
            assert!(zoom >= engine.dynamic_min_zoom() - 1e-9);
        }
    }
}
