use std::f64::consts::TAU;

use glam::{DVec2, dvec2};

use super::markers::MarkerId;
use super::sim::Simulation;
use super::{COMPARISON_GAP, COMPARISON_SETTLE_SECS, Engine};

/// Frozen side-by-side layout. Saved positions restore the scattered
/// arrangement on exit.
pub(in crate::engine) struct ComparisonState {
    saved: Vec<(MarkerId, DVec2)>,
    /// Visible markers ordered by ascending magnitude, id as tiebreak.
    order: Vec<MarkerId>,
    focused: Option<usize>,
}

/// Relative-size callout shown next to a neighbor of the focused marker.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonTooltip {
    pub marker: MarkerId,
    /// Neighbor magnitude over focused magnitude.
    pub ratio: f64,
    pub larger: bool,
}

impl<S: Simulation> Engine<S> {
    pub fn is_comparing(&self) -> bool {
        self.comparison.is_some()
    }

    pub fn focused_marker(&self) -> Option<MarkerId> {
        let state = self.comparison.as_ref()?;
        state.focused.map(|index| state.order[index])
    }

    /// Arranges all visible markers around the largest one and freezes the
    /// simulation. Needs at least two visible markers; re-entry is a no-op.
    pub fn enter_comparison(&mut self) {
        if self.comparison.is_some() || self.markers.visible_count() < 2 {
            return;
        }

        let saved: Vec<(MarkerId, DVec2)> = self
            .markers
            .visible()
            .filter_map(|(id, marker)| {
                let body = marker.body_id()?;
                Some((id, self.sim.body(body)?.position))
            })
            .collect();

        self.comparison = Some(ComparisonState {
            saved,
            order: Vec::new(),
            focused: None,
        });

        self.animation = None;
        self.following = false;
        self.snap_to_full_world();
        self.freeze_simulation();
        self.layout_comparison();
    }

    /// Restores the saved scatter and hands the bodies back to the simulation.
    /// Exit always lands on the full-world view, where the simulation runs.
    pub fn exit_comparison(&mut self) {
        let Some(state) = self.comparison.take() else {
            return;
        };

        for (id, position) in state.saved {
            if let Some(marker) = self.markers.get(id)
                && let Some(body) = marker.body_id()
            {
                self.sim.set_position(body, position);
                self.sim.set_velocity(body, DVec2::ZERO);
                self.sim.set_angular_velocity(body, 0.0);
            }
        }

        self.relayout_delay = None;
        self.animation = None;
        self.following = false;
        self.snap_to_full_world();
        self.resume_simulation();
    }

    /// Moves keyboard focus to the next marker up the magnitude order,
    /// wrapping around. The first press focuses the centered largest marker.
    pub fn comparison_next(&mut self) {
        self.step_focus(1);
    }

    pub fn comparison_prev(&mut self) {
        self.step_focus(-1);
    }

    fn step_focus(&mut self, direction: isize) {
        let Some(state) = self.comparison.as_mut() else {
            return;
        };
        let len = state.order.len();
        if len == 0 {
            return;
        }

        let index = match state.focused {
            Some(current) => (current as isize + direction).rem_euclid(len as isize) as usize,
            None => len - 1,
        };
        state.focused = Some(index);

        let id = state.order[index];
        if let Some(center) = self.marker_world_position(id)
            && let Some(marker) = self.markers.get(id)
        {
            let radius = marker.display_radius;
            self.zoom_to_circle(center, radius);
        }
    }

    /// Callouts for the markers adjacent to the focused one in magnitude
    /// order: how many times smaller or larger each neighbor is.
    pub fn comparison_tooltips(&self) -> Vec<ComparisonTooltip> {
        let Some(state) = self.comparison.as_ref() else {
            return Vec::new();
        };
        let Some(focused) = state.focused else {
            return Vec::new();
        };
        let Some(focused_marker) = self.markers.get(state.order[focused]) else {
            return Vec::new();
        };
        if focused_marker.magnitude <= 0.0 {
            return Vec::new();
        }

        let mut tooltips = Vec::new();
        let neighbors = [focused.checked_sub(1), focused.checked_add(1)];
        for neighbor in neighbors.into_iter().flatten() {
            let Some(id) = state.order.get(neighbor).copied() else {
                continue;
            };
            let Some(marker) = self.markers.get(id) else {
                continue;
            };
            let ratio = marker.magnitude / focused_marker.magnitude;
            tooltips.push(ComparisonTooltip {
                marker: id,
                ratio,
                larger: ratio > 1.0,
            });
        }
        tooltips
    }

    /// Marker set changed while comparing: too few left means the mode ends,
    /// otherwise the layout re-runs after a short settle delay.
    pub(in crate::engine) fn note_visible_set_changed(&mut self) {
        if self.comparison.is_none() {
            return;
        }
        if self.markers.visible_count() < 2 {
            self.exit_comparison();
        } else {
            self.schedule_comparison_relayout();
        }
    }

    pub(in crate::engine) fn schedule_comparison_relayout(&mut self) {
        if self.comparison.is_some() {
            self.relayout_delay = Some(COMPARISON_SETTLE_SECS);
        }
    }

    pub(in crate::engine) fn tick_comparison_settle(&mut self, dt: f64) {
        let Some(delay) = self.relayout_delay.as_mut() else {
            return;
        };
        *delay -= dt;
        if *delay <= 0.0 {
            self.relayout_delay = None;
            self.layout_comparison();
        }
    }

    /// Places the largest visible marker at the world center and the rest on a
    /// ring around it, each at its own touching distance plus a fixed gap.
    /// Deterministic for a given visible set, so re-entry reproduces the same
    /// picture.
    fn layout_comparison(&mut self) {
        if self.comparison.is_none() {
            return;
        }

        let mut order: Vec<MarkerId> = self.markers.visible().map(|(id, _)| id).collect();
        order.sort_by(|a, b| {
            let ma = self.markers.get(*a).map(|m| m.magnitude).unwrap_or(0.0);
            let mb = self.markers.get(*b).map(|m| m.magnitude).unwrap_or(0.0);
            ma.total_cmp(&mb).then(a.cmp(b))
        });

        let Some(largest) = order.last().copied() else {
            return;
        };
        let center = dvec2(self.world.x / 2.0, self.world.y / 2.0);
        let largest_radius = self
            .markers
            .get(largest)
            .map(|m| m.display_radius)
            .unwrap_or(0.0);

        let others: Vec<MarkerId> = order
            .iter()
            .rev()
            .skip(1)
            .copied()
            .collect();
        let start_angle = if self.view.x < self.view.y {
            // Portrait stacks along the tall axis, starting above the center.
            -TAU / 4.0
        } else {
            TAU / 2.0
        };
        let angle_step = if others.is_empty() {
            0.0
        } else {
            TAU / others.len() as f64
        };

        self.place_comparison_body(largest, center);
        for (index, id) in others.iter().enumerate() {
            let Some(marker) = self.markers.get(*id) else {
                continue;
            };
            let distance = largest_radius + marker.display_radius + COMPARISON_GAP;
            let angle = start_angle + angle_step * index as f64;
            let position = center + dvec2(angle.cos(), angle.sin()) * distance;
            self.place_comparison_body(*id, position);
        }

        if let Some(state) = self.comparison.as_mut() {
            // Keep focus on the same marker across relayouts when possible.
            let focused_id = state
                .focused
                .and_then(|index| state.order.get(index).copied());
            state.order = order;
            state.focused =
                focused_id.and_then(|id| state.order.iter().position(|other| *other == id));
        }
    }

    fn place_comparison_body(&mut self, id: MarkerId, position: DVec2) {
        if let Some(marker) = self.markers.get(id)
            && let Some(body) = marker.body_id()
        {
            self.sim.set_position(body, position);
            self.sim.set_velocity(body, DVec2::ZERO);
            self.sim.set_angular_velocity(body, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::BallSim;

    fn engine() -> Engine<BallSim> {
        let sim = BallSim::new(dvec2(800.0, 600.0));
        Engine::new(sim, 800.0, 600.0)
    }

    fn approx(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-6
    }

    #[test]
    fn needs_two_visible_markers() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);
        engine.enter_comparison();
        assert!(!engine.is_comparing());
    }

    #[test]
    fn three_markers_flank_the_largest() {
        let mut engine = engine();
        let small = engine.spawn(10.0, None, None, None);
        let large = engine.spawn(40.0, None, None, None);
        let middle = engine.spawn(20.0, None, None, None);

        engine.enter_comparison();
        assert!(engine.is_comparing());
        assert!(!engine.sim().stepping_enabled());

        let center = dvec2(400.0, 300.0);
        assert!(approx(
            engine.marker_world_position(large).unwrap(),
            center
        ));

        // Landscape view: the ring starts to the left, and with two others the
        // step is a half turn, so they end up on opposite sides.
        let middle_pos = engine.marker_world_position(middle).unwrap();
        assert!(approx(middle_pos, dvec2(400.0 - (150.0 + 75.0 + 30.0), 300.0)));

        let small_pos = engine.marker_world_position(small).unwrap();
        assert!(approx(small_pos, dvec2(400.0 + (150.0 + 37.5 + 30.0), 300.0)));
    }

    #[test]
    fn layout_is_deterministic() {
        let build = || {
            let mut engine = engine();
            let a = engine.spawn(5.0, None, None, None);
            let b = engine.spawn(15.0, None, None, None);
            let c = engine.spawn(25.0, None, None, None);
            engine.enter_comparison();
            [a, b, c].map(|id| engine.marker_world_position(id).unwrap())
        };

        let first = build();
        let second = build();
        for (a, b) in first.iter().zip(second.iter()) {
            assert!(approx(*a, *b));
        }
    }

    #[test]
    fn exit_restores_saved_positions() {
        let mut engine = engine();
        let a = engine.spawn(10.0, None, None, None);
        let b = engine.spawn(40.0, None, None, None);

        let body_a = engine.marker(a).unwrap().body_id().unwrap();
        let body_b = engine.marker(b).unwrap().body_id().unwrap();
        engine.sim_mut().set_position(body_a, dvec2(120.0, 450.0));
        engine.sim_mut().set_position(body_b, dvec2(600.0, 380.0));

        engine.enter_comparison();
        engine.exit_comparison();

        assert!(!engine.is_comparing());
        assert!(engine.sim().stepping_enabled());
        assert!(approx(
            engine.marker_world_position(a).unwrap(),
            dvec2(120.0, 450.0)
        ));
        assert!(approx(
            engine.marker_world_position(b).unwrap(),
            dvec2(600.0, 380.0)
        ));
    }

    #[test]
    fn navigation_cycles_by_magnitude() {
        let mut engine = engine();
        let small = engine.spawn(10.0, None, None, None);
        let large = engine.spawn(40.0, None, None, None);
        let middle = engine.spawn(20.0, None, None, None);

        engine.enter_comparison();
        assert_eq!(engine.focused_marker(), None);

        engine.comparison_next();
        assert_eq!(engine.focused_marker(), Some(large));
        assert!(engine.is_animating());

        engine.comparison_next();
        assert_eq!(engine.focused_marker(), Some(small));
        engine.comparison_next();
        assert_eq!(engine.focused_marker(), Some(middle));

        engine.comparison_prev();
        assert_eq!(engine.focused_marker(), Some(small));
    }

    #[test]
    fn tooltips_compare_against_focused_magnitude() {
        let mut engine = engine();
        let small = engine.spawn(10.0, None, None, None);
        let large = engine.spawn(40.0, None, None, None);
        let middle = engine.spawn(20.0, None, None, None);

        engine.enter_comparison();
        // Focus the middle marker: largest, wrap to smallest, then middle.
        engine.comparison_next();
        engine.comparison_next();
        engine.comparison_next();
        assert_eq!(engine.focused_marker(), Some(middle));

        let tooltips = engine.comparison_tooltips();
        assert_eq!(tooltips.len(), 2);

        let smaller = tooltips.iter().find(|t| t.marker == small).unwrap();
        assert!((smaller.ratio - 0.5).abs() < 1e-9);
        assert!(!smaller.larger);

        let larger = tooltips.iter().find(|t| t.marker == large).unwrap();
        assert!((larger.ratio - 2.0).abs() < 1e-9);
        assert!(larger.larger);
    }

    #[test]
    fn hiding_down_to_one_marker_exits() {
        let mut engine = engine();
        let a = engine.spawn(10.0, None, None, None);
        engine.spawn(40.0, None, None, None);

        engine.enter_comparison();
        engine.hide(a);
        assert!(!engine.is_comparing());
        assert!(engine.sim().stepping_enabled());
    }

    #[test]
    fn spawn_while_comparing_relayouts_after_settle() {
        let mut engine = engine();
        engine.spawn(10.0, None, None, None);
        engine.spawn(40.0, None, None, None);
        engine.enter_comparison();

        let added = engine.spawn(20.0, None, None, None);
        // Not yet placed on the ring; the settle delay is still running.
        engine.advance(COMPARISON_SETTLE_SECS + 0.05);

        let center = dvec2(400.0, 300.0);
        let position = engine.marker_world_position(added).unwrap();
        let expected_distance = 150.0 + 75.0 + COMPARISON_GAP;
        assert!((position.distance(center) - expected_distance).abs() < 1e-6);
        assert!(engine.is_comparing());
    }
}
