pub mod display;
pub mod framing;
pub mod link;
pub mod state;
pub mod telemetry;
pub mod ui;
