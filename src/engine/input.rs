use glam::DVec2;

use super::sim::Simulation;
use super::{
    DRAG_THRESHOLD_PX, Engine, PINCH_TAP_SUPPRESS_SECS, TAP_MAX_SECS, TAP_MOVE_THRESHOLD_PX,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Transient gesture tracking. Never persisted; cleared wholesale on resize
/// and teardown.
#[derive(Default)]
pub(in crate::engine) struct GestureState {
    pointer: Option<PointerPress>,
    touch: Option<SingleTouch>,
    pinch: Option<Pinch>,
    /// Counts down after a pinch ends; a tap landing inside the window is
    /// treated as a pinch remnant and dropped.
    pinch_cooldown: f64,
}

struct PointerPress {
    button: PointerButton,
    start: DVec2,
    last: DVec2,
    dragging: bool,
}

struct SingleTouch {
    start: DVec2,
    last: DVec2,
    age: f64,
    panning: bool,
}

struct Pinch {
    last_distance: f64,
}

fn pinch_metrics(points: &[DVec2]) -> (f64, DVec2) {
    let a = points[0];
    let b = points[1];
    (a.distance(b), (a + b) * 0.5)
}

impl<S: Simulation> Engine<S> {
    pub fn pointer_down(&mut self, pos: DVec2, button: PointerButton) {
        if button == PointerButton::Secondary {
            return;
        }
        self.gestures.pointer = Some(PointerPress {
            button,
            start: pos,
            last: pos,
            dragging: false,
        });
    }

    pub fn pointer_move(&mut self, pos: DVec2) {
        let Some(press) = self.gestures.pointer.as_ref() else {
            return;
        };
        let (button, start, last, mut dragging) =
            (press.button, press.start, press.last, press.dragging);

        if !dragging {
            dragging = match button {
                PointerButton::Middle => true,
                PointerButton::Primary => {
                    self.is_zoomed() && (pos - start).length() > DRAG_THRESHOLD_PX
                }
                PointerButton::Secondary => false,
            };
            if dragging {
                // A pan must not fight a running animation or follow update.
                self.animation = None;
                self.following = false;
            }
        }

        if dragging {
            self.panning = true;
            self.pan_by_screen_delta(pos - last);
        }

        if let Some(press) = self.gestures.pointer.as_mut() {
            press.dragging = dragging;
            press.last = pos;
        }
    }

    pub fn pointer_up(&mut self, pos: DVec2) {
        self.panning = false;
        let Some(press) = self.gestures.pointer.take() else {
            return;
        };
        if !press.dragging {
            self.handle_click(pos);
        }
    }

    pub fn pointer_leave(&mut self) {
        self.gestures.pointer = None;
        self.panning = false;
    }

    /// Current touch points after fingers went down.
    pub fn touch_start(&mut self, points: &[DVec2]) {
        match points {
            [] => {}
            [point] => {
                self.gestures.touch = Some(SingleTouch {
                    start: *point,
                    last: *point,
                    age: 0.0,
                    panning: false,
                });
            }
            _ => self.begin_pinch(points),
        }
    }

    pub fn touch_move(&mut self, points: &[DVec2]) {
        if points.len() >= 2 {
            if self.gestures.pinch.is_none() {
                self.begin_pinch(points);
                return;
            }

            let (distance, center) = pinch_metrics(points);
            let previous = self
                .gestures
                .pinch
                .as_ref()
                .map(|pinch| pinch.last_distance)
                .unwrap_or(0.0);
            if previous > 0.0 && distance > 0.0 {
                self.pinch_zoom(center, distance / previous);
            }
            if let Some(pinch) = self.gestures.pinch.as_mut() {
                pinch.last_distance = distance;
            }
            return;
        }

        let [point] = points else {
            return;
        };
        let Some(touch) = self.gestures.touch.as_ref() else {
            return;
        };
        let (start, last, mut panning) = (touch.start, touch.last, touch.panning);

        if !panning && self.is_zoomed() && (*point - start).length() > TAP_MOVE_THRESHOLD_PX {
            panning = true;
            self.animation = None;
            self.following = false;
        }

        if panning {
            self.panning = true;
            self.pan_by_screen_delta(*point - last);
        }

        if let Some(touch) = self.gestures.touch.as_mut() {
            touch.panning = panning;
            touch.last = *point;
        }
    }

    /// Touch points that remain after fingers lifted.
    pub fn touch_end(&mut self, remaining: &[DVec2]) {
        if self.gestures.pinch.is_some() && remaining.len() >= 2 {
            // A lifted finger changes the measured pair; re-seed the distance
            // so the next move is not a cross-pair ratio.
            self.begin_pinch(remaining);
            return;
        }

        if self.gestures.pinch.is_some() && remaining.len() < 2 {
            self.gestures.pinch = None;
            self.gestures.pinch_cooldown = PINCH_TAP_SUPPRESS_SECS;
            self.gestures.touch = None;
            self.panning = false;
            if let [point] = remaining {
                // The surviving finger may pan, but its tap is suppressed.
                self.gestures.touch = Some(SingleTouch {
                    start: *point,
                    last: *point,
                    age: 0.0,
                    panning: false,
                });
            }
            return;
        }

        if remaining.is_empty() {
            self.panning = false;
            if let Some(touch) = self.gestures.touch.take()
                && !touch.panning
                && touch.age < TAP_MAX_SECS
                && self.gestures.pinch_cooldown <= 0.0
            {
                self.tap(touch.last);
            }
        }
    }

    fn begin_pinch(&mut self, points: &[DVec2]) {
        let (distance, _) = pinch_metrics(points);
        self.gestures.pinch = Some(Pinch {
            last_distance: distance,
        });
        self.gestures.touch = None;
        self.animation = None;
        self.following = false;
        self.panning = false;
    }

    fn tap(&mut self, pos: DVec2) {
        if let Some(body) = self.body_at_screen(pos) {
            self.zoom_to_circle(body.position, body.radius);
        } else {
            self.handle_click(pos);
        }
    }

    pub(in crate::engine) fn tick_gestures(&mut self, dt: f64) {
        if let Some(touch) = self.gestures.touch.as_mut() {
            touch.age += dt;
        }
        self.gestures.pinch_cooldown = (self.gestures.pinch_cooldown - dt).max(0.0);
    }
}
