use glam::DVec2;

use super::sim::Simulation;
use super::{Engine, PAN_MARGIN_RATIO};

impl<S: Simulation> Engine<S> {
    /// Translates bounds by a screen-space drag delta, clamped so the viewport
    /// never leaves the extended margin around the world rectangle.
    pub(in crate::engine) fn pan_by_screen_delta(&mut self, screen_delta: DVec2) {
        let world_delta = -screen_delta / self.view * self.bounds.size();
        self.bounds = self.bounds.translated(world_delta);
        self.clamp_pan_bounds();
    }

    fn clamp_pan_bounds(&mut self) {
        let margin = self.world * PAN_MARGIN_RATIO;
        let size = self.bounds.size();

        let min_x = self.bounds.min.x.clamp(-margin.x, self.world.x + margin.x - size.x);
        let min_y = self.bounds.min.y.clamp(-margin.y, self.world.y + margin.y - size.y);

        self.bounds.min = DVec2::new(min_x, min_y);
        self.bounds.max = self.bounds.min + size;
    }
}
