// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

use super::logic::miner_enabled;
use super::{Dialog, MinerTarget, Screen, WizardApp};
use crate::config::{pool_by_name, APP_NAME, BITCOIN_POOLS, UI_DRAIN_INTERVAL};
use crate::controls::{JobPhase, LogLevel};
use crate::miner::MinerDevice;
use crate::package::{PackageId, Variant};
use eframe::egui;

const GREEN: egui::Color32 = egui::Color32::from_rgb(104, 157, 106);
const RED: egui::Color32 = egui::Color32::from_rgb(251, 73, 52);
const LOG_PANEL_WIDTH: f32 = 320.0;

impl eframe::App for WizardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_messages();

        // Background jobs never wake the UI; poll on a short interval instead
        ctx.request_repaint_after(UI_DRAIN_INTERVAL);

        let show_modal = self.dialog.is_some();
        if show_modal {
            self.render_dialog(ctx);
        }

        if self.show_log {
            self.render_log_panel(ctx, show_modal);
        }

        let panel_frame = egui::Frame::central_panel(&ctx.style()).fill(ctx.style().visuals.panel_fill);

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!show_modal, |ui| match self.screen {
                    Screen::Welcome => self.render_welcome(ui),
                    Screen::Dashboard => self.render_dashboard(ui),
                });
            });
    }
}

impl WizardApp {
    fn render_welcome(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            ui.heading(format!("Welcome to {}", APP_NAME));
            ui.add_space(16.0);
            ui.label("Install and run a Bitcoin, Lightning or Whive node, and mine to a pool of your choice.");
            ui.label("Downloads go to your home folder; nothing else on the system is changed.");
            ui.add_space(16.0);

            ui.label(
                egui::RichText::new(format!("Platform: {:?}", self.installer.platform()))
                    .small()
                    .color(ui.visuals().weak_text_color()),
            );
            let terminal = self.launcher.terminal_name().unwrap_or("none found");
            ui.label(
                egui::RichText::new(format!("Terminal: {}", terminal))
                    .small()
                    .color(ui.visuals().weak_text_color()),
            );

            ui.add_space(24.0);
            let button = egui::Button::new("Get Started")
                .min_size(egui::vec2(128.0, 48.0))
                .fill(GREEN);
            if ui.add(button).clicked() {
                self.screen = Screen::Dashboard;
            }
        });
    }

    fn render_dashboard(&mut self, ui: &mut egui::Ui) {
        ui.columns(3, |columns| {
            columns[1].vertical_centered(|ui| {
                ui.add_space(8.0);
                ui.heading(APP_NAME);
            });

            if self.controls.any_busy() {
                columns[0].spinner();
            }

            columns[2].allocate_ui_with_layout(
                egui::Vec2::ZERO,
                egui::Layout::right_to_left(egui::Align::TOP),
                |ui| {
                    if ui.button("📜").on_hover_text("Toggle Log Area").clicked() {
                        self.toggle_log(ui.ctx());
                    }
                },
            );
        });

        ui.add_space(8.0);
        ui.separator();
        ui.add_space(8.0);

        ui.group(|ui| {
            ui.set_width(ui.available_width());
            self.render_bitcoin(ui);
        });
        ui.add_space(8.0);
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            self.render_lnd(ui);
        });
        ui.add_space(8.0);
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            self.render_whive(ui);
        });

        // The miner is only installed on demand; show it while that happens
        if self.controls.package(PackageId::CpuMiner).phase.is_busy() {
            ui.add_space(8.0);
            ui.group(|ui| {
                ui.set_width(ui.available_width());
                ui.horizontal(|ui| {
                    ui.strong(PackageId::CpuMiner.display_name());
                    self.render_cancel(ui, PackageId::CpuMiner);
                });
                self.render_status(ui, PackageId::CpuMiner);
            });
        }

        ui.add_space(8.0);
        ui.separator();
        self.render_output_log(ui);
    }

    fn render_bitcoin(&mut self, ui: &mut egui::Ui) {
        let package = PackageId::Bitcoin;
        let controls = self.controls.controls(package);

        ui.horizontal(|ui| {
            ui.strong(package.display_name());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                self.render_cancel(ui, package);
                self.render_install(ui, package);
            });
        });
        self.render_status(ui, package);
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            ui.add_enabled_ui(controls.run, |ui| {
                if ui.button("Run Full Node").clicked() {
                    self.run_node(package, Variant::Mainnet);
                }
                if ui.button("Run Pruned Node").clicked() {
                    self.run_node(package, Variant::Pruned);
                }
            });
        });
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("miner_device")
                .selected_text(self.prefs.miner_type.label())
                .show_ui(ui, |ui| {
                    for device in MinerDevice::ALL {
                        ui.selectable_value(&mut self.prefs.miner_type, device, device.label());
                    }
                });

            egui::ComboBox::from_id_salt("bitcoin_pool")
                .selected_text(pool_by_name(&self.prefs.bitcoin_pool).name)
                .show_ui(ui, |ui| {
                    for pool in BITCOIN_POOLS {
                        if ui
                            .selectable_label(self.prefs.bitcoin_pool == pool.name, pool.name)
                            .on_hover_text(pool.url)
                            .clicked()
                        {
                            self.prefs.bitcoin_pool = pool.name.to_string();
                        }
                    }
                });

            self.render_miner_button(ui, MinerTarget::Bitcoin);
        });
    }

    fn render_lnd(&mut self, ui: &mut egui::Ui) {
        let package = PackageId::Lnd;
        let controls = self.controls.controls(package);

        ui.horizontal(|ui| {
            ui.strong(package.display_name());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                self.render_cancel(ui, package);
                self.render_install(ui, package);
            });
        });
        self.render_status(ui, package);
        ui.add_space(4.0);

        ui.add_enabled_ui(controls.run, |ui| {
            if ui
                .button("Run Lightning")
                .on_hover_text("Starts lnd as a neutrino light client")
                .clicked()
            {
                self.run_node(package, Variant::Mainnet);
            }
        });
    }

    fn render_whive(&mut self, ui: &mut egui::Ui) {
        let package = PackageId::Whive;
        let controls = self.controls.controls(package);

        ui.horizontal(|ui| {
            ui.strong(package.display_name());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                self.render_cancel(ui, package);
                self.render_install(ui, package);
            });
        });
        self.render_status(ui, package);
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            ui.add_enabled_ui(controls.run, |ui| {
                if ui.button("Run Full Node").clicked() {
                    self.run_node(package, Variant::Mainnet);
                }
            });
            self.render_miner_button(ui, MinerTarget::Whive);
        });
    }

    fn render_install(&mut self, ui: &mut egui::Ui, package: PackageId) {
        let state = self.controls.package(package);
        let label = if state.installed { "Reinstall" } else { "Install" };
        ui.add_enabled_ui(state.controls().install, |ui| {
            if ui.add(egui::Button::new(label).fill(GREEN)).clicked() {
                self.request_install(package);
            }
        });
    }

    fn render_cancel(&mut self, ui: &mut egui::Ui, package: PackageId) {
        if self.controls.controls(package).cancel {
            if ui.add(egui::Button::new("Cancel").fill(RED)).clicked() {
                self.cancel(package);
            }
        }
    }

    fn render_miner_button(&mut self, ui: &mut egui::Ui, target: MinerTarget) {
        let enabled = miner_enabled(&self.controls, target, self.pending_miner.is_some());
        ui.add_enabled_ui(enabled, |ui| {
            if ui.button("Run Pool Miner").clicked() {
                self.address_input.clear();
                self.dialog = Some(Dialog::MinerSetup(target));
            }
        });
    }

    fn render_status(&self, ui: &mut egui::Ui, package: PackageId) {
        let state = self.controls.package(package);
        let weak = ui.visuals().weak_text_color();

        if !state.phase.is_busy() {
            let text = match (state.phase, state.installed, state.variant) {
                (JobPhase::Idle, true, _) => "Installed".to_string(),
                (JobPhase::Idle, false, _) => "Not installed".to_string(),
                (JobPhase::Done, _, Some(variant)) if package == PackageId::Bitcoin => {
                    format!("Installed ({})", variant.label())
                }
                (phase, _, _) => phase.label().to_string(),
            };
            ui.label(egui::RichText::new(text).small().color(weak));
            return;
        }

        let bar = match (state.phase, state.fraction()) {
            (JobPhase::Downloading, Some(fraction)) => egui::ProgressBar::new(fraction).text(format!(
                "Downloading {:.1} / {:.1} MB",
                state.downloaded as f64 / 1e6,
                state.total.unwrap_or(0) as f64 / 1e6
            )),
            (JobPhase::Downloading, None) => egui::ProgressBar::new(0.0)
                .animate(true)
                .text(format!("Downloading {:.1} MB", state.downloaded as f64 / 1e6)),
            (phase, _) => egui::ProgressBar::new(0.0).animate(true).text(phase.label()),
        };
        ui.add(bar.fill(ui.visuals().selection.bg_fill).desired_height(16.0));
    }

    fn render_output_log(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Output").strong());
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .max_height(ui.available_height())
            .show(ui, |ui| {
                for line in &self.log_lines {
                    let color = match line.level {
                        LogLevel::Info => ui.visuals().text_color(),
                        LogLevel::Success => GREEN,
                        LogLevel::Warning => ui.visuals().warn_fg_color,
                        LogLevel::Error => ui.visuals().error_fg_color,
                    };
                    ui.colored_label(color, &line.text);
                }
            });
    }

    fn render_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = self.dialog else {
            return;
        };

        // Background Dimmer - paint at Background layer, below everything
        let screen_rect = ctx.viewport_rect();
        ctx.layer_painter(egui::LayerId::new(
            egui::Order::Background,
            egui::Id::from("modal_dimmer"),
        ))
        .rect_filled(screen_rect, 0.0, egui::Color32::from_black_alpha(140));

        let window_frame = egui::Frame::window(&ctx.style())
            .fill(ctx.style().visuals.window_fill)
            .stroke(ctx.style().visuals.window_stroke);

        let window_title = match dialog {
            Dialog::ConfirmReinstall(package) => format!("Reinstall {}", package.display_name()),
            Dialog::MinerSetup(target) => format!("{} Pool Mining", target.label()),
        };

        egui::Window::new(window_title)
            .order(egui::Order::Foreground)
            .collapsible(false)
            .resizable(false)
            .title_bar(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .frame(window_frame)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| match dialog {
                    Dialog::ConfirmReinstall(package) => self.render_reinstall(ui, package),
                    Dialog::MinerSetup(target) => self.render_miner_setup(ui, target),
                });
            });
    }

    fn render_reinstall(&mut self, ui: &mut egui::Ui, package: PackageId) {
        ui.add_space(12.0);
        ui.colored_label(ui.visuals().warn_fg_color, "ALREADY INSTALLED");
        ui.add_space(12.0);
        ui.label(format!("{} is already installed in:", package.display_name()));
        ui.add_space(4.0);
        ui.monospace(self.installer.layout().install_root(package).display().to_string());
        ui.add_space(8.0);
        ui.label("Reinstalling downloads it again and overwrites the program files.");
        ui.label("Existing config files are kept.");
        ui.add_space(12.0);
        ui.separator();
        ui.add_space(8.0);

        ui.columns(2, |columns| {
            columns[0].allocate_ui_with_layout(
                egui::Vec2::ZERO,
                egui::Layout::right_to_left(egui::Align::Center),
                |ui| {
                    if ui.button("Cancel").clicked() {
                        self.dialog = None;
                    }
                },
            );

            columns[1].allocate_ui_with_layout(
                egui::Vec2::ZERO,
                egui::Layout::left_to_right(egui::Align::Center),
                |ui| {
                    if ui.button("Continue").clicked() {
                        self.dialog = None;
                        self.begin_install(package);
                    }
                },
            );
        });
        ui.add_space(8.0);
    }

    fn render_miner_setup(&mut self, ui: &mut egui::Ui, target: MinerTarget) {
        let stick_miner = target == MinerTarget::Bitcoin && self.prefs.miner_type == MinerDevice::StickMiner;

        ui.add_space(12.0);
        ui.colored_label(ui.visuals().warn_fg_color, "WARNING");
        ui.add_space(12.0);
        if stick_miner {
            ui.label("cgminer needs administrator rights to reach USB stick miners.");
            ui.label("You will be asked for your password in the terminal.");
        } else {
            ui.label("Mining keeps your processor at full load for as long as it runs.");
            ui.label("Expect heat, fan noise and extra wear on the hardware.");
        }
        ui.add_space(12.0);

        if target == MinerTarget::Bitcoin {
            ui.label(format!("Pool: {}", pool_by_name(&self.prefs.bitcoin_pool).name));
            ui.add_space(8.0);
        }

        egui::Grid::new("miner_inputs")
            .num_columns(2)
            .spacing([8.0, 8.0])
            .show(ui, |ui| {
                ui.label(format!("{} address", target.label()));
                ui.add(
                    egui::TextEdit::singleline(&mut self.address_input)
                        .hint_text("payout address")
                        .desired_width(320.0),
                );
                ui.end_row();

                if !stick_miner {
                    ui.label("Worker name");
                    ui.add(egui::TextEdit::singleline(&mut self.worker_input).desired_width(320.0));
                    ui.end_row();
                }
            });

        ui.add_space(12.0);
        ui.separator();
        ui.add_space(8.0);

        ui.columns(2, |columns| {
            columns[0].allocate_ui_with_layout(
                egui::Vec2::ZERO,
                egui::Layout::right_to_left(egui::Align::Center),
                |ui| {
                    if ui.button("Cancel").clicked() {
                        self.dialog = None;
                    }
                },
            );

            columns[1].allocate_ui_with_layout(
                egui::Vec2::ZERO,
                egui::Layout::left_to_right(egui::Align::Center),
                |ui| {
                    if ui.button("Start Mining").clicked() && self.start_miner(target) {
                        self.dialog = None;
                    }
                },
            );
        });
        ui.add_space(8.0);
    }

    fn toggle_log(&mut self, ctx: &egui::Context) {
        self.show_log = !self.show_log;

        // Adjust window size when toggling log
        let current_size = ctx.content_rect().size();
        let new_width = if self.show_log {
            current_size.x + LOG_PANEL_WIDTH
        } else {
            current_size.x - LOG_PANEL_WIDTH
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(new_width, current_size.y)));
    }

    fn render_log_panel(&mut self, ctx: &egui::Context, show_modal: bool) {
        egui::SidePanel::right("log_panel")
            .resizable(true)
            .default_width(LOG_PANEL_WIDTH)
            .min_width(200.0)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!show_modal, |ui| {
                    ui.vertical(|ui| {
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            ui.heading("Debug Log");
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                if ui.button("X").on_hover_text("Close Log").clicked() {
                                    self.toggle_log(ui.ctx());
                                }
                            });
                        });

                        ui.horizontal(|ui| {
                            if ui.button("📋 Copy debug log").clicked() {
                                self.copy_debug_log();
                            }
                            ui.label(format!(
                                "Log: {:?}",
                                crate::debug::get_log_path().file_name().unwrap_or_default()
                            ));
                        });

                        ui.separator();

                        egui::ScrollArea::vertical()
                            .stick_to_bottom(true)
                            .auto_shrink([false, false])
                            .show(ui, |ui| {
                                ui.set_width(ui.available_width());
                                match crate::debug::read_log() {
                                    Ok(contents) => {
                                        ui.add(
                                            egui::TextEdit::multiline(&mut contents.as_str())
                                                .font(egui::TextStyle::Monospace)
                                                .desired_width(f32::INFINITY)
                                                .interactive(false),
                                        );
                                    }
                                    Err(e) => {
                                        ui.label(e);
                                    }
                                }
                            });
                    });
                });
            });
    }
}
