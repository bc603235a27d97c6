use std::collections::BTreeMap;
use std::collections::HashSet;

use eframe::egui::Color32;
use glam::{DVec2, dvec2};
use rand::Rng;

use super::sim::{BodyId, Simulation};
use super::{Engine, SCALE_EPSILON, SPAWN_TOP_OFFSET, TARGET_RATIO};

/// Stable opaque marker handle. Survives hide/show; the simulator body id
/// behind it does not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub(in crate::engine) u32);

#[derive(Clone, Debug)]
pub struct Marker {
    pub name: String,
    pub units: Option<String>,
    pub source: Option<String>,
    pub magnitude: f64,
    pub display_radius: f64,
    pub color: Color32,
    pub(in crate::engine) body: Option<BodyId>,
}

impl Marker {
    pub fn is_visible(&self) -> bool {
        self.body.is_some()
    }

    pub fn body_id(&self) -> Option<BodyId> {
        self.body
    }
}

const PALETTE: [Color32; 12] = [
    Color32::from_rgb(86, 156, 214),
    Color32::from_rgb(220, 130, 86),
    Color32::from_rgb(120, 190, 110),
    Color32::from_rgb(200, 110, 180),
    Color32::from_rgb(230, 200, 90),
    Color32::from_rgb(100, 200, 200),
    Color32::from_rgb(180, 120, 230),
    Color32::from_rgb(230, 110, 110),
    Color32::from_rgb(140, 160, 90),
    Color32::from_rgb(90, 130, 220),
    Color32::from_rgb(210, 160, 120),
    Color32::from_rgb(130, 210, 160),
];

pub(in crate::engine) struct MarkerStore {
    entries: BTreeMap<MarkerId, Marker>,
    next_id: u32,
    pub(in crate::engine) scale_factor: f64,
}

impl MarkerStore {
    pub(in crate::engine) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
            scale_factor: 1.0,
        }
    }

    fn allocate_id(&mut self) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(in crate::engine) fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.entries.get(&id)
    }

    pub(in crate::engine) fn iter(&self) -> impl Iterator<Item = (MarkerId, &Marker)> {
        self.entries.iter().map(|(id, marker)| (*id, marker))
    }

    pub(in crate::engine) fn visible(&self) -> impl Iterator<Item = (MarkerId, &Marker)> {
        self.iter().filter(|(_, marker)| marker.is_visible())
    }

    pub(in crate::engine) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(in crate::engine) fn visible_count(&self) -> usize {
        self.visible().count()
    }

    pub(in crate::engine) fn visible_max_magnitude(&self) -> Option<f64> {
        self.visible()
            .map(|(_, marker)| marker.magnitude)
            .max_by(f64::total_cmp)
    }

    pub(in crate::engine) fn visible_min_radius(&self) -> Option<f64> {
        self.visible()
            .map(|(_, marker)| marker.display_radius)
            .min_by(f64::total_cmp)
    }

    fn pick_color(&self) -> Color32 {
        let used: HashSet<Color32> = self.entries.values().map(|marker| marker.color).collect();
        for color in PALETTE {
            if !used.contains(&color) {
                return color;
            }
        }
        PALETTE[rand::thread_rng().gen_range(0..PALETTE.len())]
    }
}

impl<S: Simulation> Engine<S> {
    /// Largest visible marker radius at full zoom: half of TARGET_RATIO times
    /// the smaller viewport dimension.
    pub fn target_display_radius(&self) -> f64 {
        self.view.x.min(self.view.y) * TARGET_RATIO / 2.0
    }

    /// Spawns a marker for a positive finite magnitude (callers validate input
    /// before it gets here). Rescales every existing visible marker when the
    /// new magnitude changes the global maximum.
    pub fn spawn(
        &mut self,
        magnitude: f64,
        name: Option<String>,
        units: Option<String>,
        source: Option<String>,
    ) -> MarkerId {
        let id = self.markers.allocate_id();
        let max_magnitude = self
            .markers
            .visible_max_magnitude()
            .unwrap_or(0.0)
            .max(magnitude);
        self.apply_scale_factor(self.target_display_radius() / max_magnitude);

        let radius = magnitude * self.markers.scale_factor;
        let body = self.sim.add_body(self.spawn_position(radius), radius);
        let color = self.markers.pick_color();

        self.markers.entries.insert(
            id,
            Marker {
                name: name.unwrap_or_else(|| format!("Ball {}", id.0)),
                units,
                source,
                magnitude,
                display_radius: radius,
                color,
                body: Some(body),
            },
        );

        self.note_visible_set_changed();
        id
    }

    pub fn remove(&mut self, id: MarkerId) {
        let Some(marker) = self.markers.entries.remove(&id) else {
            return;
        };
        if let Some(body) = marker.body {
            self.sim.remove_body(body);
        }

        if self.markers.is_empty() {
            self.markers.scale_factor = 1.0;
        } else {
            self.rescale_visible();
        }
        self.note_visible_set_changed();
    }

    /// Removes the marker's body from the simulation but keeps its metadata.
    /// The body id is gone for good; `show` mints a fresh one.
    pub fn hide(&mut self, id: MarkerId) {
        let Some(marker) = self.markers.entries.get_mut(&id) else {
            return;
        };
        let Some(body) = marker.body.take() else {
            return;
        };

        self.sim.remove_body(body);
        self.rescale_visible();
        self.note_visible_set_changed();
    }

    pub fn show(&mut self, id: MarkerId) {
        let Some(marker) = self.markers.entries.get(&id) else {
            return;
        };
        if marker.is_visible() {
            return;
        }

        let magnitude = marker.magnitude;
        let max_magnitude = self
            .markers
            .visible_max_magnitude()
            .unwrap_or(0.0)
            .max(magnitude);
        self.apply_scale_factor(self.target_display_radius() / max_magnitude);

        let radius = magnitude * self.markers.scale_factor;
        let body = self.sim.add_body(self.spawn_position(radius), radius);
        if let Some(marker) = self.markers.entries.get_mut(&id) {
            marker.display_radius = radius;
            marker.body = Some(body);
        }

        self.note_visible_set_changed();
    }

    pub fn clear(&mut self) {
        let bodies: Vec<BodyId> = self
            .markers
            .entries
            .values()
            .filter_map(|marker| marker.body)
            .collect();
        for body in bodies {
            self.sim.remove_body(body);
        }

        self.markers.entries.clear();
        self.markers.scale_factor = 1.0;
        self.comparison = None;
        self.relayout_delay = None;
        self.animation = None;
        self.following = false;
        self.snap_to_full_world();
        self.resume_simulation();
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerId, &Marker)> {
        self.markers.iter()
    }

    pub fn visible_marker_count(&self) -> usize {
        self.markers.visible_count()
    }

    pub fn scale_factor(&self) -> f64 {
        self.markers.scale_factor
    }

    pub fn marker_world_position(&self, id: MarkerId) -> Option<DVec2> {
        let body = self.markers.get(id)?.body?;
        Some(self.sim.body(body)?.position)
    }

    /// Screen-space position for tooltip placement; `None` for hidden markers.
    pub fn marker_screen_position(&self, id: MarkerId) -> Option<DVec2> {
        let world = self.marker_world_position(id)?;
        Some(super::geometry::world_to_screen(
            world,
            &self.bounds,
            self.view,
        ))
    }

    /// Recomputes the scale factor so the largest visible marker hits the
    /// target radius again. No-op for an empty visible set.
    pub(in crate::engine) fn rescale_visible(&mut self) {
        if let Some(max_magnitude) = self.markers.visible_max_magnitude()
            && max_magnitude > 0.0
        {
            self.apply_scale_factor(self.target_display_radius() / max_magnitude);
        }
    }

    fn apply_scale_factor(&mut self, new_factor: f64) {
        if !new_factor.is_finite() || new_factor <= 0.0 {
            return;
        }

        let old_factor = self.markers.scale_factor;
        let ratio = new_factor / old_factor;
        if (ratio - 1.0).abs() <= SCALE_EPSILON {
            return;
        }

        for marker in self.markers.entries.values_mut() {
            if let Some(body) = marker.body {
                self.sim.scale_body(body, ratio);
                marker.display_radius = marker.magnitude * new_factor;
            }
        }
        self.markers.scale_factor = new_factor;
    }

    fn spawn_position(&self, radius: f64) -> DVec2 {
        let lo = radius;
        let hi = self.world.x - radius;
        let x = if hi > lo {
            rand::thread_rng().gen_range(lo..hi)
        } else {
            self.world.x / 2.0
        };
        dvec2(x, radius + SPAWN_TOP_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Bounds;
    use crate::sim::BallSim;

    fn engine() -> Engine<BallSim> {
        let sim = BallSim::new(dvec2(800.0, 600.0));
        Engine::new(sim, 800.0, 600.0)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn spawn_scales_against_largest_magnitude() {
        let mut engine = engine();
        assert!(approx(engine.target_display_radius(), 150.0));

        let small = engine.spawn(10.0, None, None, None);
        assert!(approx(engine.marker(small).unwrap().display_radius, 150.0));

        let large = engine.spawn(40.0, None, None, None);
        assert!(approx(engine.scale_factor(), 3.75));
        assert!(approx(engine.marker(large).unwrap().display_radius, 150.0));
        assert!(approx(engine.marker(small).unwrap().display_radius, 37.5));
    }

    #[test]
    fn spawn_rescales_simulator_bodies() {
        let mut engine = engine();
        let small = engine.spawn(10.0, None, None, None);
        engine.spawn(40.0, None, None, None);

        let body = engine.marker(small).unwrap().body_id().unwrap();
        let snapshot = engine.sim().body(body).unwrap();
        assert!(approx(snapshot.radius, 37.5));
    }

    #[test]
    fn remove_largest_grows_survivors() {
        let mut engine = engine();
        let small = engine.spawn(10.0, None, None, None);
        let large = engine.spawn(40.0, None, None, None);

        engine.remove(large);
        assert!(approx(engine.marker(small).unwrap().display_radius, 150.0));
    }

    #[test]
    fn removing_last_marker_resets_scale() {
        let mut engine = engine();
        let id = engine.spawn(42.0, None, None, None);
        engine.remove(id);
        assert!(approx(engine.scale_factor(), 1.0));
    }

    #[test]
    fn equal_magnitude_spawn_keeps_factor() {
        let mut engine = engine();
        engine.spawn(40.0, None, None, None);
        let factor = engine.scale_factor();
        engine.spawn(40.0, None, None, None);
        assert!(approx(engine.scale_factor(), factor));
    }

    #[test]
    fn hide_show_round_trip_preserves_metadata() {
        let mut engine = engine();
        let id = engine.spawn(25.0, Some("Moon".to_owned()), Some("km".to_owned()), None);
        let before = engine.marker(id).unwrap().clone();
        let old_body = before.body_id().unwrap();

        engine.hide(id);
        let hidden = engine.marker(id).unwrap();
        assert!(!hidden.is_visible());
        assert_eq!(engine.visible_marker_count(), 0);

        engine.show(id);
        let after = engine.marker(id).unwrap();
        assert!(after.is_visible());
        assert_eq!(after.name, before.name);
        assert_eq!(after.color, before.color);
        assert!(approx(after.magnitude, before.magnitude));
        assert_ne!(after.body_id().unwrap(), old_body);
    }

    #[test]
    fn hiding_largest_rescales_visible_set() {
        let mut engine = engine();
        let small = engine.spawn(10.0, None, None, None);
        let large = engine.spawn(40.0, None, None, None);

        engine.hide(large);
        assert!(approx(engine.marker(small).unwrap().display_radius, 150.0));

        engine.show(large);
        assert!(approx(engine.marker(small).unwrap().display_radius, 37.5));
        assert!(approx(engine.marker(large).unwrap().display_radius, 150.0));
    }

    #[test]
    fn colors_prefer_unused_palette_entries() {
        let mut engine = engine();
        let a = engine.spawn(1.0, None, None, None);
        let b = engine.spawn(2.0, None, None, None);
        let c = engine.spawn(3.0, None, None, None);

        let ca = engine.marker(a).unwrap().color;
        let cb = engine.marker(b).unwrap().color;
        let cc = engine.marker(c).unwrap().color;
        assert_ne!(ca, cb);
        assert_ne!(cb, cc);
        assert_ne!(ca, cc);
    }

    #[test]
    fn clear_resets_everything() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);
        engine.spawn(40.0, None, None, None);

        engine.clear();
        assert_eq!(engine.markers().count(), 0);
        assert!(approx(engine.scale_factor(), 1.0));
        assert_eq!(engine.bounds(), Bounds::full(engine.world()));
        assert!(engine.sim().bodies().iter().all(|body| body.is_static));
    }
}
