// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

// Module structure for the wizard application
//
// - state.rs: Core types (Screen, Dialog, WizardApp struct) and initialization
// - logic.rs: Message drain, install/run/cancel actions
// - ui.rs: UI rendering (eframe::App implementation)

mod state;
mod logic;
mod ui;

pub use state::WizardApp;
use state::{Dialog, MinerTarget, Screen};
