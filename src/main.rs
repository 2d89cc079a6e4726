use dotenv::dotenv;
use eframe::egui;
use eframe::egui::Visuals;
use metabric_explorer::config::{DEFAULT_LOG_FILTER, Settings};
use metabric_explorer::models::AppState;
use metabric_explorer::ui;
use std::error::Error;
use tracing_subscriber::EnvFilter;

pub struct MyApp {
    state: AppState,
}

impl MyApp {
    fn new(settings: Settings) -> Self {
        let mut state = AppState::new(settings);
        ui::start_load(&mut state);
        Self { state }
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(Visuals::dark());

        ui::poll_table_load(ctx, &mut self.state);

        egui::SidePanel::left("data_panel").show(ctx, |ui| {
            ui.set_width(220.0);
            ui.heading("METABRIC Explorer");
            ui.separator();
            ui::side_panel(ui, &mut self.state);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui::page(ui, &mut self.state);
                });
        });
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let settings = Settings::from_env().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "falling back to default settings");
        Settings::default()
    });
    tracing::info!(path = %settings.data_path.display(), "starting METABRIC Explorer");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 900.0]),
        ..Default::default()
    };
    eframe::run_native(
        "METABRIC Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(settings)))),
    )?;

    Ok(())
}
