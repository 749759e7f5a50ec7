//! UI composition for the ground station.
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use log::{error, info, warn};
use std::time::Duration;

use super::display::Dispatcher;
use super::link::{available_ports, spawn_connection, LinkEvent, LinkHandle};
use super::state::*;

/// How long closing a link may block the UI waiting for the reader.
const JOIN_WAIT: Duration = Duration::from_secs(1);

struct Graph {
    id: &'static str,
    title: &'static str,
    lines: &'static [(&'static str, &'static str, Color32)],
}

const GRAPHS: [Graph; 4] = [
    Graph {
        id: "altitude_graph",
        title: "Altitude",
        lines: &[("altitude", "altitude", Color32::LIGHT_BLUE)],
    },
    Graph {
        id: "temp_graph",
        title: "Temperature",
        lines: &[("temperature", "temperature", Color32::LIGHT_BLUE)],
    },
    Graph {
        id: "accel_graph",
        title: "Acceleration",
        lines: &[
            ("accel_x", "x", Color32::RED),
            ("accel_y", "y", Color32::GREEN),
            ("accel_z", "z", Color32::BLUE),
        ],
    },
    Graph {
        id: "gyro_graph",
        title: "Gyro",
        lines: &[
            ("gyro_x", "x", Color32::RED),
            ("gyro_y", "y", Color32::GREEN),
            ("gyro_z", "z", Color32::BLUE),
        ],
    },
];

/// Root eframe App implementation.
pub struct GroundStationApp {
    pub state: AppState,
    link: Option<LinkHandle>,
    dispatcher: Dispatcher,
}

impl GroundStationApp {
    pub fn new(mut state: AppState, connect_now: bool) -> Self {
        state.known_ports = available_ports();
        let mut app = Self {
            state,
            link: None,
            dispatcher: Dispatcher::new(),
        };
        if connect_now {
            app.connect();
        }
        app
    }

    fn connect(&mut self) {
        match self.state.link_config() {
            Ok(config) => {
                info!("connecting to {}", config.describe());
                self.state.status = ConnectionStatus::Connecting(config.describe());
                self.link = Some(spawn_connection(config));
            }
            Err(e) => {
                error!("bad connection settings: {}", e);
                self.state.status = ConnectionStatus::Failed(e);
            }
        }
    }

    fn disconnect(&mut self) {
        self.close_link();
        self.state.status = ConnectionStatus::Disconnected;
    }

    fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            if !link.stop(JOIN_WAIT) {
                warn!("abandoning reader thread");
            }
        }
    }

    /// Pull everything the reader has queued and apply it in order.
    fn pump_link(&mut self) {
        let events: Vec<LinkEvent> = match &self.link {
            Some(link) => link.events.try_iter().collect(),
            None => return,
        };
        for event in events {
            match event {
                LinkEvent::Connected(target) => {
                    self.state.status = ConnectionStatus::Connected(target);
                }
                LinkEvent::Frame(frame) => {
                    if let Err(e) = self.dispatcher.handle(&frame, &mut self.state) {
                        warn!("dropping telemetry frame: {}", e);
                    }
                }
                LinkEvent::ConnectionFailed(e) | LinkEvent::ReadFailed(e) => {
                    self.close_link();
                    self.state.status = ConnectionStatus::Failed(e.to_string());
                }
                LinkEvent::Closed => {
                    info!("link closed by peer");
                    self.disconnect();
                }
            }
        }
    }

    fn render_connection_bar(&mut self, ui: &mut egui::Ui) {
        let connected = self.state.is_connected();
        ui.horizontal(|ui| {
            ui.add_enabled_ui(!connected, |ui| {
                ui.radio_value(&mut self.state.link_kind, LinkKind::Serial, LinkKind::Serial.to_string());
                ui.radio_value(&mut self.state.link_kind, LinkKind::Tcp, LinkKind::Tcp.to_string());
                ui.separator();
                match self.state.link_kind {
                    LinkKind::Serial => self.render_serial_fields(ui),
                    LinkKind::Tcp => {
                        ui.label("Address");
                        ui.text_edit_singleline(&mut self.state.tcp_address_input);
                    }
                }
            });
            ui.separator();
            if !connected {
                if ui.button("Connect").clicked() {
                    self.connect();
                }
            } else if ui.button("Disconnect").clicked() {
                self.disconnect();
            }
            if ui.button("Clear").clicked() {
                self.state.clear_data();
            }
        });
        let status_color = match self.state.status {
            ConnectionStatus::Connected(_) => Color32::GREEN,
            ConnectionStatus::Failed(_) => Color32::RED,
            _ => ui.visuals().text_color(),
        };
        ui.horizontal(|ui| {
            ui.colored_label(status_color, self.state.status.to_string());
            ui.separator();
            ui.label(format!("Samples: {}", self.dispatcher.sample_index()));
        });
    }

    fn render_serial_fields(&mut self, ui: &mut egui::Ui) {
        ui.label("Port");
        egui::ComboBox::from_id_source("port_select")
            .selected_text(self.state.port_input.clone())
            .show_ui(ui, |ui| {
                for port in &self.state.known_ports {
                    ui.selectable_value(&mut self.state.port_input, port.clone(), port.as_str());
                }
            });
        ui.add(egui::TextEdit::singleline(&mut self.state.port_input).desired_width(120.0));
        if ui.small_button("Refresh").clicked() {
            self.state.known_ports = available_ports();
        }
        ui.label("Baud");
        ui.add(egui::TextEdit::singleline(&mut self.state.baud_input).desired_width(80.0));
        ui.checkbox(&mut self.state.dtr, "DTR");
    }

    fn render_graph(&self, ui: &mut egui::Ui, graph: &Graph, height: f32) {
        ui.label(graph.title);
        let mut plot = Plot::new(graph.id).height(height);
        if graph.lines.len() > 1 {
            plot = plot.legend(Legend::default());
        }
        plot.show(ui, |plot_ui| {
            for &(channel, name, color) in graph.lines {
                let points = PlotPoints::from(self.state.series(channel).to_vec());
                plot_ui.line(Line::new(points).name(name).color(color));
            }
        });
    }
}

impl Drop for GroundStationApp {
    fn drop(&mut self) {
        self.close_link();
    }
}

impl eframe::App for GroundStationApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_link();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.heading("Ground Station");
            self.render_connection_bar(ui);
        });

        egui::SidePanel::right("logs")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                let half = (ui.available_height() / 2.0 - 30.0).max(60.0);
                ui.heading("Telemetry");
                egui::ScrollArea::vertical()
                    .id_source("telemetry_log")
                    .max_height(half)
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        ui.monospace(self.state.telemetry_log.as_str());
                    });
                ui.separator();
                ui.heading("Messages");
                egui::ScrollArea::vertical()
                    .id_source("message_log")
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        ui.monospace(self.state.message_log.as_str());
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let height = (ui.available_height() / 2.0 - 40.0).max(80.0);
            ui.columns(2, |cols| {
                self.render_graph(&mut cols[0], &GRAPHS[0], height);
                self.render_graph(&mut cols[1], &GRAPHS[1], height);
                self.render_graph(&mut cols[0], &GRAPHS[2], height);
                self.render_graph(&mut cols[1], &GRAPHS[3], height);
            });
        });

        if self.link.is_some() {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}
