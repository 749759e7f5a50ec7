mod app;

use clap::Parser;
use log::info;
use std::time::Duration;

use app::state::{AppState, LinkKind};
use app::ui::GroundStationApp;

/// Live telemetry display for the flight computer.
#[derive(Parser, Debug)]
#[command(name = "ground_station", version, about)]
struct Args {
    /// Serial device to read from.
    #[arg(long)]
    port: Option<String>,

    #[arg(long, default_value_t = 2_000_000)]
    baud: u32,

    /// Leave DTR deasserted after opening the port.
    #[arg(long)]
    no_dtr: bool,

    /// Read from a TCP address (e.g. the simulator) instead of a serial port.
    #[arg(long, value_name = "ADDR")]
    tcp: Option<String>,

    #[arg(long, default_value_t = 100)]
    read_timeout_ms: u64,

    /// Points kept per plot channel.
    #[arg(long, default_value_t = 5000)]
    max_points: usize,

    /// Open the link immediately instead of waiting for the Connect button.
    #[arg(long)]
    connect: bool,
}

impl Args {
    fn into_state(self) -> AppState {
        let mut state = AppState::default();
        if let Some(port) = self.port {
            state.port_input = port;
        }
        state.baud_input = self.baud.to_string();
        state.dtr = !self.no_dtr;
        if let Some(address) = self.tcp {
            state.link_kind = LinkKind::Tcp;
            state.tcp_address_input = address;
        }
        state.read_timeout = Duration::from_millis(self.read_timeout_ms.max(1));
        state.max_points = self.max_points.max(1);
        state
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let connect_now = args.connect;
    let state = args.into_state();
    info!("starting ground station ({})", state.link_kind);

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Ground Station",
        options,
        Box::new(move |_cc| Box::new(GroundStationApp::new(state, connect_now))),
    )
}
