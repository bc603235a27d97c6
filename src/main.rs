mod app;
mod data;
mod engine;
mod sim;
mod util;

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file of named magnitudes; the built-in set is used when omitted.
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Initial window width in pixels.
    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    /// Initial window height in pixels.
    #[arg(long, default_value_t = 800.0)]
    height: f32,
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.width.max(320.0), args.height.max(240.0)]),
        ..Default::default()
    };

    eframe::run_native(
        "ballpark",
        options,
        Box::new(move |cc| Ok(Box::new(app::BallparkApp::new(cc, args.dataset.clone())))),
    )
}
