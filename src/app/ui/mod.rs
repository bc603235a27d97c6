use eframe::egui::{self, Align, Context, Layout};

use super::ViewModel;

mod controls;

const FPS_SAMPLE_WINDOW: usize = 120;

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.update_fps(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("ballpark");
                    ui.separator();
                    if let Some(title) = &self.dataset.title {
                        ui.label(title.as_str());
                    }
                    ui.label(format!("balls: {}", self.engine.visible_marker_count()));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(fps) = self.average_fps() {
                            ui.label(format!("{fps:.0} fps"));
                        }
                        if self.engine.is_comparing() {
                            ui.label("comparing: arrows step, Esc exits");
                        } else if self.engine.is_zoomed() {
                            ui.label("click empty space or press Esc to zoom out");
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_canvas(ui));
    }

    fn update_fps(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt).max(f32::EPSILON);
        self.fps_samples.push_back(1.0 / dt);
        while self.fps_samples.len() > FPS_SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
    }

    fn average_fps(&self) -> Option<f32> {
        if self.fps_samples.is_empty() {
            return None;
        }
        Some(self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32)
    }
}
