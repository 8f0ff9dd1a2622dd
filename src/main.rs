#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod config;
mod controls;
mod debug;
mod error;
mod extract;
mod fetch;
mod installer;
mod launcher;
mod miner;
mod package;
mod preferences;
mod runtime_config;
mod storage;
mod validate;

use app::WizardApp;
use config::{WINDOW_MIN_SIZE, WINDOW_SIZE, WINDOW_TITLE};
use eframe::egui;

fn main() -> eframe::Result<()> {
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([WINDOW_SIZE.0, WINDOW_SIZE.1])
        .with_min_inner_size([WINDOW_MIN_SIZE.0, WINDOW_MIN_SIZE.1])
        .with_resizable(true);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(|cc| {
            let app = WizardApp::new(cc).map_err(|e| {
                crate::debug::log(&format!("ERROR: {}", e));
                e
            })?;
            Ok(Box::new(app))
        }),
    )
}
