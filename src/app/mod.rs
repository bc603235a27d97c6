use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use eframe::egui::{self, Context};
use glam::dvec2;

use crate::data::{Dataset, builtin_dataset, load_dataset};
use crate::engine::Engine;
use crate::sim::BallSim;

mod canvas;
mod ui;

/// Fallback canvas size used until the first frame reports the real one.
const INITIAL_VIEW: (f64, f64) = (1280.0, 800.0);

pub struct BallparkApp {
    dataset_path: Option<PathBuf>,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Dataset, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    dataset: Dataset,
    engine: Engine<BallSim>,
    search: String,
    custom_name: String,
    custom_value: String,
    custom_units: String,
    custom_error: Option<String>,
    fps_samples: VecDeque<f32>,
}

impl ViewModel {
    fn new(dataset: Dataset) -> Self {
        let sim = BallSim::new(dvec2(INITIAL_VIEW.0, INITIAL_VIEW.1));
        Self {
            dataset,
            engine: Engine::new(sim, INITIAL_VIEW.0, INITIAL_VIEW.1),
            search: String::new(),
            custom_name: String::new(),
            custom_value: String::new(),
            custom_units: String::new(),
            custom_error: None,
            fps_samples: VecDeque::new(),
        }
    }
}

impl BallparkApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, dataset_path: Option<PathBuf>) -> Self {
        let state = Self::start_load(dataset_path.clone());
        Self {
            dataset_path,
            state,
        }
    }

    fn spawn_load(dataset_path: Option<PathBuf>) -> Receiver<Result<Dataset, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = match dataset_path {
                Some(path) => load_dataset(&path).map_err(|error| format!("{error:#}")),
                None => Ok(builtin_dataset()),
            };
            if let Ok(dataset) = &result {
                log::info!(
                    "loaded dataset {:?} with {} entries",
                    dataset.title.as_deref().unwrap_or("(untitled)"),
                    dataset.entries.len()
                );
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(dataset_path: Option<PathBuf>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(dataset_path),
        }
    }
}

impl eframe::App for BallparkApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(dataset) => AppState::Ready(Box::new(ViewModel::new(dataset))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading dataset...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.dataset_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                model.show(ctx);
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}
