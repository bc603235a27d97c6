use eframe::egui::{self, Align, Layout, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::engine::MarkerId;
use crate::util::format_magnitude_with_units;

use super::super::ViewModel;

enum MarkerAction {
    Hide(MarkerId),
    Show(MarkerId),
    Remove(MarkerId),
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Dataset");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search")
            .on_hover_text("Fuzzy-filter the dataset entries below.");
        ui.text_edit_singleline(&mut self.search);
        ui.add_space(4.0);
        self.draw_dataset_rows(ui);

        ui.add_space(8.0);
        ui.separator();
        self.draw_custom_entry(ui);

        ui.add_space(8.0);
        ui.separator();
        self.draw_marker_list(ui);

        ui.add_space(8.0);
        ui.separator();
        self.draw_actions(ui);
    }

    fn draw_dataset_rows(&mut self, ui: &mut Ui) {
        let query = self.search.trim().to_owned();
        let matcher = SkimMatcherV2::default();

        let mut rows: Vec<usize> = if query.is_empty() {
            (0..self.dataset.entries.len()).collect()
        } else {
            let mut scored: Vec<(usize, i64)> = self
                .dataset
                .entries
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| {
                    fuzzy_match_score(&matcher, &entry.name, &query).map(|score| (index, score))
                })
                .collect();
            scored.sort_by(|a, b| b.1.cmp(&a.1));
            scored.into_iter().map(|(index, _)| index).collect()
        };
        rows.truncate(200);

        let mut to_spawn = None;
        egui::ScrollArea::vertical()
            .id_salt("dataset_rows_scroll")
            .max_height(180.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for index in rows {
                    let entry = &self.dataset.entries[index];
                    ui.horizontal(|ui| {
                        if ui.button("+").on_hover_text("Spawn a ball for this entry").clicked() {
                            to_spawn = Some(index);
                        }
                        ui.label(&entry.name);
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            ui.label(format_magnitude_with_units(
                                entry.value,
                                entry.units.as_deref(),
                            ));
                        });
                    });
                }
            });

        if let Some(index) = to_spawn {
            let entry = self.dataset.entries[index].clone();
            self.engine.spawn(
                entry.value,
                Some(entry.name),
                entry.units,
                entry.source,
            );
        }
    }

    fn draw_custom_entry(&mut self, ui: &mut Ui) {
        ui.label("Custom ball");
        ui.horizontal(|ui| {
            ui.label("name");
            ui.text_edit_singleline(&mut self.custom_name);
        });
        ui.horizontal(|ui| {
            ui.label("value");
            ui.text_edit_singleline(&mut self.custom_value);
            ui.label("units");
            ui.add(
                egui::TextEdit::singleline(&mut self.custom_units).desired_width(60.0),
            );
        });

        if ui.button("Add").clicked() {
            match self.custom_value.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value > 0.0 => {
                    let name = match self.custom_name.trim() {
                        "" => None,
                        name => Some(name.to_owned()),
                    };
                    let units = match self.custom_units.trim() {
                        "" => None,
                        units => Some(units.to_owned()),
                    };
                    self.engine.spawn(value, name, units, None);
                    self.custom_error = None;
                    self.custom_value.clear();
                }
                Ok(_) => {
                    self.custom_error = Some("value must be a positive number".to_owned());
                }
                Err(_) => {
                    self.custom_error = Some("value is not a number".to_owned());
                }
            }
        }
        if let Some(error) = &self.custom_error {
            ui.colored_label(egui::Color32::LIGHT_RED, error.as_str());
        }
    }

    fn draw_marker_list(&mut self, ui: &mut Ui) {
        ui.label("Balls");

        let mut action = None;
        egui::ScrollArea::vertical()
            .id_salt("marker_list_scroll")
            .max_height(220.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (id, marker) in self.engine.markers() {
                    ui.horizontal(|ui| {
                        let (rect, _) =
                            ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
                        ui.painter().circle_filled(rect.center(), 5.0, marker.color);

                        ui.label(&marker.name);
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            if ui.button("x").on_hover_text("Remove").clicked() {
                                action = Some(MarkerAction::Remove(id));
                            }
                            if marker.is_visible() {
                                if ui.button("hide").clicked() {
                                    action = Some(MarkerAction::Hide(id));
                                }
                            } else if ui.button("show").clicked() {
                                action = Some(MarkerAction::Show(id));
                            }
                            ui.label(format_magnitude_with_units(
                                marker.magnitude,
                                marker.units.as_deref(),
                            ));
                        });
                    });
                }
            });

        match action {
            Some(MarkerAction::Hide(id)) => self.engine.hide(id),
            Some(MarkerAction::Show(id)) => self.engine.show(id),
            Some(MarkerAction::Remove(id)) => self.engine.remove(id),
            None => {}
        }
    }

    fn draw_actions(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            if self.engine.is_comparing() {
                if ui.button("Exit comparison").clicked() {
                    self.engine.exit_comparison();
                }
                if ui.button("<").on_hover_text("Focus the next smaller ball").clicked() {
                    self.engine.comparison_prev();
                }
                if ui.button(">").on_hover_text("Focus the next larger ball").clicked() {
                    self.engine.comparison_next();
                }
            } else {
                let can_compare = self.engine.visible_marker_count() >= 2;
                if ui
                    .add_enabled(can_compare, egui::Button::new("Compare"))
                    .on_hover_text("Line the balls up around the largest one")
                    .clicked()
                {
                    self.engine.enter_comparison();
                }
            }

            if self.engine.is_zoomed() && ui.button("Zoom out").clicked() {
                self.engine.zoom_out();
            }
        });

        ui.add_space(4.0);
        if ui.button("Clear all").clicked() {
            self.engine.clear();
        }
    }
}
