use glam::{DVec2, dvec2};

pub mod geometry;
pub mod sim;

mod comparison;
mod input;
mod markers;
mod pan;
mod wrap;
mod zoom;

pub use comparison::ComparisonTooltip;
pub use input::PointerButton;
pub use markers::{Marker, MarkerId};

use comparison::ComparisonState;
use input::GestureState;
use markers::MarkerStore;
use sim::{DEFAULT_DRAG_STIFFNESS, Simulation};
use zoom::BoundsAnimation;

/// Zoom ratio of the full-world view. Ratios below this mean zoomed in.
pub const MAX_ZOOM: f64 = 1.0;
/// Hard floor under the marker-derived dynamic minimum.
pub(in crate::engine) const ABSOLUTE_MIN_ZOOM: f64 = 1e-4;
/// Minimum zoom when no markers exist to derive one from.
pub(in crate::engine) const FALLBACK_MIN_ZOOM: f64 = 0.01;

/// The largest visible marker's diameter fills this fraction of the smaller
/// viewport dimension at full zoom.
pub(in crate::engine) const TARGET_RATIO: f64 = 0.5;
/// A zoomed-on marker's diameter fills this fraction of the smaller viewport
/// dimension.
pub(in crate::engine) const BALL_VISIBLE_RATIO: f64 = 0.8;

pub(in crate::engine) const WHEEL_ZOOM_STEP: f64 = 0.12;
pub(in crate::engine) const TRACKPAD_ZOOM_STEP: f64 = 0.04;
pub(in crate::engine) const TRACKPAD_DELTA_THRESHOLD: f64 = 40.0;
pub(in crate::engine) const ZOOM_ANIMATION_SECS: f64 = 0.6;
pub(in crate::engine) const ZOOM_EPSILON: f64 = 1e-9;

pub(in crate::engine) const DRAG_THRESHOLD_PX: f64 = 5.0;
pub(in crate::engine) const TAP_MOVE_THRESHOLD_PX: f64 = 10.0;
pub(in crate::engine) const TAP_MAX_SECS: f64 = 0.3;
pub(in crate::engine) const PINCH_TAP_SUPPRESS_SECS: f64 = 0.05;

/// Panning may push the viewport this fraction of the world size past each
/// world edge.
pub(in crate::engine) const PAN_MARGIN_RATIO: f64 = 0.5;

pub(in crate::engine) const WRAP_VELOCITY_DAMPING: f64 = 0.5;
pub(in crate::engine) const SPAWN_TOP_OFFSET: f64 = 12.0;
pub(in crate::engine) const COMPARISON_GAP: f64 = 30.0;
pub(in crate::engine) const COMPARISON_SETTLE_SECS: f64 = 0.15;
pub(in crate::engine) const SCALE_EPSILON: f64 = 1e-9;

/// Axis-aligned world rectangle currently mapped onto the canvas. Its aspect
/// ratio always matches the view, so zoom is uniform in both axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    pub fn full(world: DVec2) -> Self {
        Self {
            min: DVec2::ZERO,
            max: world,
        }
    }

    pub fn centered(center: DVec2, size: DVec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn translated(&self, delta: DVec2) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    pub(in crate::engine) fn lerp(from: &Self, to: &Self, t: f64) -> Self {
        Self {
            min: from.min.lerp(to.min, t),
            max: from.max.lerp(to.max, t),
        }
    }
}

/// Viewport transform and ball-scaling/layout engine. One instance per canvas;
/// the single `bounds` record and the marker store are mutated in place by
/// whichever controller is active, in the order `advance` defines.
pub struct Engine<S: Simulation> {
    pub(in crate::engine) sim: S,
    pub(in crate::engine) view: DVec2,
    pub(in crate::engine) world: DVec2,
    pub(in crate::engine) bounds: Bounds,
    pub(in crate::engine) markers: MarkerStore,
    pub(in crate::engine) gestures: GestureState,
    pub(in crate::engine) animation: Option<BoundsAnimation>,
    pub(in crate::engine) following: bool,
    pub(in crate::engine) panning: bool,
    pub(in crate::engine) comparison: Option<ComparisonState>,
    pub(in crate::engine) relayout_delay: Option<f64>,
}

impl<S: Simulation> Engine<S> {
    pub fn new(mut sim: S, view_width: f64, view_height: f64) -> Self {
        let view = dvec2(view_width.max(1.0), view_height.max(1.0));
        sim.set_stepping_enabled(true);
        sim.set_drag_stiffness(DEFAULT_DRAG_STIFFNESS);

        Self {
            sim,
            view,
            world: view,
            bounds: Bounds::full(view),
            markers: MarkerStore::new(),
            gestures: GestureState::default(),
            animation: None,
            following: false,
            panning: false,
            comparison: None,
            relayout_delay: None,
        }
    }

    /// Container resize is a full re-initialization: the world rectangle takes
    /// the new dimensions, the viewport snaps back to the full world, and all
    /// markers rescale against the new target radius.
    pub fn resize(&mut self, view_width: f64, view_height: f64) {
        let view = dvec2(view_width.max(1.0), view_height.max(1.0));
        if view == self.view {
            return;
        }

        self.view = view;
        self.world = view;
        self.sim.set_world_size(view);
        self.bounds = Bounds::full(view);
        self.animation = None;
        self.following = false;
        self.panning = false;
        self.gestures = GestureState::default();

        self.rescale_visible();
        if self.comparison.is_some() {
            self.schedule_comparison_relayout();
        } else {
            self.resume_simulation();
        }
    }

    /// One cooperative frame tick. Order matters: the active animation mutates
    /// bounds before the follow update runs, and both run before the host
    /// reads bounds to paint, so a frame is never drawn mid-mutation.
    pub fn advance(&mut self, dt: f64) {
        if !(dt > 0.0) {
            return;
        }

        self.advance_animation(dt);
        self.sim.step(dt);
        self.wrap_escaped_bodies();
        self.tick_comparison_settle(dt);
        self.follow_update();
        self.tick_gestures(dt);
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn view(&self) -> DVec2 {
        self.view
    }

    pub fn world(&self) -> DVec2 {
        self.world
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    /// Screen pixels per world unit under the current bounds.
    pub fn pixels_per_world(&self) -> f64 {
        self.view.x / self.bounds.width().max(f64::EPSILON)
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub(in crate::engine) fn freeze_simulation(&mut self) {
        self.sim.set_stepping_enabled(false);
        self.sim.set_drag_stiffness(0.0);
    }

    pub(in crate::engine) fn resume_simulation(&mut self) {
        if self.comparison.is_some() {
            return;
        }
        self.sim.set_stepping_enabled(true);
        self.sim.set_drag_stiffness(DEFAULT_DRAG_STIFFNESS);
    }
}
