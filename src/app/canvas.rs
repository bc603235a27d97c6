use eframe::egui::{
    self, Align2, Color32, CursorIcon, FontId, Key, Pos2, Rect, Sense, Stroke, Ui, pos2,
};
use glam::{DVec2, dvec2};

use crate::engine::PointerButton;
use crate::engine::geometry::{screen_to_world, world_to_screen};
use crate::util::format_magnitude_with_units;

use super::ViewModel;

const BACKGROUND: Color32 = Color32::from_rgb(19, 23, 29);
const GRID_LINE: Color32 = Color32::from_rgba_premultiplied(60, 70, 80, 70);
const LABEL_MIN_RADIUS_PX: f32 = 26.0;

fn local_point(rect: Rect, pos: Pos2) -> DVec2 {
    dvec2((pos.x - rect.left()) as f64, (pos.y - rect.top()) as f64)
}

fn to_screen_pos(rect: Rect, point: DVec2) -> Pos2 {
    pos2(rect.left() + point.x as f32, rect.top() + point.y as f32)
}

fn draw_text_box(painter: &egui::Painter, anchor: Pos2, text: &str) {
    let galley = painter.layout_no_wrap(
        text.to_owned(),
        FontId::proportional(12.0),
        Color32::from_gray(235),
    );
    let padding = egui::vec2(6.0, 4.0);
    let rect = Rect::from_min_size(anchor, galley.size() + padding * 2.0);
    painter.rect_filled(rect, 4.0, Color32::from_rgba_premultiplied(10, 12, 16, 230));
    painter.galley(anchor + padding, galley, Color32::from_gray(235));
}

fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

impl ViewModel {
    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.engine
            .resize(rect.width() as f64, rect.height() as f64);

        self.handle_canvas_keys(ui);
        self.handle_canvas_zoom(ui, rect, &response);
        self.handle_canvas_pointer(ui, rect, &response);

        let dt = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        self.engine.advance(dt as f64);

        let painter = ui.painter_at(rect);
        self.draw_background(&painter, rect);
        let hovered = self.draw_balls(ui, &painter, rect);
        self.draw_comparison_tooltips(&painter, rect);
        self.draw_zoom_indicator(&painter, rect);

        let grabbing = self.engine.sim().is_dragging();
        if let Some((id, pointer)) = hovered
            && !grabbing
            && !self.engine.is_panning()
        {
            self.draw_hover_tooltip(&painter, rect, id, pointer);
            ui.ctx().set_cursor_icon(CursorIcon::Grab);
        }
        if grabbing || self.engine.is_panning() {
            ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
        }

        // The simulation and animations run every frame.
        ui.ctx().request_repaint();
    }

    fn handle_canvas_keys(&mut self, ui: &Ui) {
        let (next, prev, escape) = ui.input(|input| {
            (
                input.key_pressed(Key::ArrowRight),
                input.key_pressed(Key::ArrowLeft),
                input.key_pressed(Key::Escape),
            )
        });

        if self.engine.is_comparing() {
            if next {
                self.engine.comparison_next();
            }
            if prev {
                self.engine.comparison_prev();
            }
            if escape {
                self.engine.exit_comparison();
            }
        } else if escape && self.engine.is_zoomed() {
            self.engine.zoom_out();
        }
    }

    fn handle_canvas_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let (scroll, pinch, pointer) = ui.input(|input| {
            (
                input.raw_scroll_delta.y,
                input.zoom_delta(),
                input.pointer.hover_pos(),
            )
        });
        let anchor = local_point(rect, pointer.unwrap_or_else(|| rect.center()));

        if scroll.abs() > f32::EPSILON {
            self.engine.wheel(anchor, scroll as f64);
        }
        if (pinch - 1.0).abs() > f32::EPSILON {
            self.engine.pinch_zoom(anchor, pinch as f64);
        }
    }

    fn handle_canvas_pointer(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        let pointer = ui.input(|input| input.pointer.interact_pos());

        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(pos) = pointer
        {
            let point = local_point(rect, pos);
            let world = screen_to_world(point, &self.engine.bounds(), self.engine.view());
            let grabbed =
                !self.engine.is_zoomed() && self.engine.sim_mut().begin_drag(world).is_some();
            if !grabbed {
                self.engine.pointer_down(point, PointerButton::Primary);
            }
        }
        if response.drag_started_by(egui::PointerButton::Middle)
            && let Some(pos) = pointer
        {
            self.engine
                .pointer_down(local_point(rect, pos), PointerButton::Middle);
        }

        if response.dragged()
            && let Some(pos) = pointer
        {
            let point = local_point(rect, pos);
            if self.engine.sim().is_dragging() {
                let world = screen_to_world(point, &self.engine.bounds(), self.engine.view());
                self.engine.sim_mut().update_drag(world);
            } else {
                self.engine.pointer_move(point);
            }
        }

        if response.drag_stopped() {
            self.engine.sim_mut().end_drag();
            self.engine.pointer_leave();
        }

        if response.clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            let point = local_point(rect, pos);
            self.engine.pointer_down(point, PointerButton::Primary);
            self.engine.pointer_up(point);
        }
        if response.double_clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            self.engine.double_click(local_point(rect, pos));
        }
    }

    fn draw_background(&self, painter: &egui::Painter, rect: Rect) {
        painter.rect_filled(rect, 0.0, BACKGROUND);

        let px_per_world = self.engine.pixels_per_world();
        if px_per_world <= 0.0 || !px_per_world.is_finite() {
            return;
        }

        // Decimal grid spacing that stays between 48 and 480 screen pixels.
        let mut world_step = 10.0_f64;
        while world_step * px_per_world < 48.0 {
            world_step *= 10.0;
        }
        while world_step * px_per_world >= 480.0 {
            world_step /= 10.0;
        }

        let bounds = self.engine.bounds();
        let view = self.engine.view();
        let stroke = Stroke::new(1.0, GRID_LINE);

        let mut x = (bounds.min.x / world_step).floor() * world_step;
        while x <= bounds.max.x {
            let screen = world_to_screen(dvec2(x, bounds.min.y), &bounds, view);
            let sx = rect.left() + screen.x as f32;
            painter.line_segment([pos2(sx, rect.top()), pos2(sx, rect.bottom())], stroke);
            x += world_step;
        }

        let mut y = (bounds.min.y / world_step).floor() * world_step;
        while y <= bounds.max.y {
            let screen = world_to_screen(dvec2(bounds.min.x, y), &bounds, view);
            let sy = rect.top() + screen.y as f32;
            painter.line_segment([pos2(rect.left(), sy), pos2(rect.right(), sy)], stroke);
            y += world_step;
        }
    }

    /// Paints every visible ball and returns the one under the pointer.
    fn draw_balls(
        &self,
        ui: &Ui,
        painter: &egui::Painter,
        rect: Rect,
    ) -> Option<(crate::engine::MarkerId, Pos2)> {
        let pointer = ui.input(|input| input.pointer.hover_pos());
        let bounds = self.engine.bounds();
        let view = self.engine.view();
        let px_per_world = self.engine.pixels_per_world();
        let focused = self.engine.focused_marker();

        let mut hovered: Option<(crate::engine::MarkerId, Pos2, f32)> = None;
        // (id, pointer position, pointer-to-center distance)

        for (id, marker) in self.engine.markers() {
            let Some(world) = self.engine.marker_world_position(id) else {
                continue;
            };
            let center = to_screen_pos(rect, world_to_screen(world, &bounds, view));
            let radius = (marker.display_radius * px_per_world) as f32;
            if !circle_visible(rect, center, radius) {
                continue;
            }

            painter.circle_filled(center, radius, marker.color);
            painter.circle_stroke(
                center,
                radius,
                Stroke::new(1.5, marker.color.gamma_multiply(0.55)),
            );
            // Orientation tick makes rolling and spin visible.
            if radius > 10.0
                && let Some(body) = marker.body_id()
                && let Some(rotation) = self.engine.sim().rotation(body)
            {
                let dir = egui::vec2(rotation.cos() as f32, rotation.sin() as f32);
                painter.line_segment(
                    [center, center + dir * radius * 0.85],
                    Stroke::new(1.5, marker.color.gamma_multiply(0.4)),
                );
            }
            if focused == Some(id) {
                painter.circle_stroke(center, radius + 3.0, Stroke::new(2.5, Color32::WHITE));
            }

            if radius >= LABEL_MIN_RADIUS_PX {
                painter.text(
                    center,
                    Align2::CENTER_CENTER,
                    &marker.name,
                    FontId::proportional(13.0),
                    Color32::WHITE,
                );
                painter.text(
                    center + egui::vec2(0.0, 16.0),
                    Align2::CENTER_CENTER,
                    format_magnitude_with_units(marker.magnitude, marker.units.as_deref()),
                    FontId::proportional(11.0),
                    Color32::from_gray(230),
                );
            }

            if let Some(pos) = pointer
                && rect.contains(pos)
            {
                let distance = center.distance(pos);
                if distance <= radius
                    && hovered.as_ref().is_none_or(|(_, _, best)| distance < *best)
                {
                    hovered = Some((id, pos, distance));
                }
            }
        }

        hovered.map(|(id, pos, _)| (id, pos))
    }

    fn draw_comparison_tooltips(&self, painter: &egui::Painter, rect: Rect) {
        for tooltip in self.engine.comparison_tooltips() {
            let Some(screen) = self.engine.marker_screen_position(tooltip.marker) else {
                continue;
            };
            let Some(marker) = self.engine.marker(tooltip.marker) else {
                continue;
            };

            let times = if tooltip.larger {
                tooltip.ratio
            } else {
                1.0 / tooltip.ratio
            };
            let text = format!(
                "{:.1}x {}",
                times,
                if tooltip.larger { "larger" } else { "smaller" }
            );

            let radius = (marker.display_radius * self.engine.pixels_per_world()) as f32;
            let anchor = to_screen_pos(rect, screen) - egui::vec2(0.0, radius + 10.0);
            draw_text_box(painter, anchor, &text);
        }
    }

    fn draw_hover_tooltip(
        &self,
        painter: &egui::Painter,
        _rect: Rect,
        id: crate::engine::MarkerId,
        pointer: Pos2,
    ) {
        let Some(marker) = self.engine.marker(id) else {
            return;
        };

        let mut text = format!(
            "{}: {}",
            marker.name,
            format_magnitude_with_units(marker.magnitude, marker.units.as_deref())
        );
        if let Some(source) = &marker.source {
            text.push_str(&format!("\n{source}"));
        }
        draw_text_box(painter, pointer + egui::vec2(14.0, -10.0), &text);
    }

    fn draw_zoom_indicator(&self, painter: &egui::Painter, rect: Rect) {
        if !self.engine.is_zoomed() {
            return;
        }

        let factor = 1.0 / self.engine.zoom_ratio();
        painter.text(
            rect.right_top() + egui::vec2(-10.0, 10.0),
            Align2::RIGHT_TOP,
            format!("zoom x{factor:.1}"),
            FontId::proportional(13.0),
            Color32::from_gray(200),
        );
    }
}
