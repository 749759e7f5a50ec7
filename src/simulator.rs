//! Flight computer stand-in: serves a synthetic flight over TCP using the
//! same `TSP...TEP` / `MSP...MEP` framing as the real serial link.
use clap::Parser;
use log::{error, info, warn};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "telemetry_sim", version, about = "Serve a simulated flight over TCP")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:9000")]
    listen: String,

    /// Telemetry frames per second.
    #[arg(long, default_value_t = 20.0)]
    rate_hz: f64,

    /// Split every Nth frame across two writes (0 disables).
    #[arg(long, default_value_t = 7)]
    split_every: u64,
}

const GRAVITY: f64 = 9.81;
const PAD_SECONDS: f64 = 3.0;
const BURN_SECONDS: f64 = 2.5;
const THRUST_ACCEL: f64 = 60.0;
const CHUTE_DESCENT_RATE: f64 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Pad,
    Boost,
    Coast,
    Descent,
    Landed,
}

#[derive(Clone, Copy, Debug, Default)]
struct Sample {
    altitude: f64,
    temperature: f64,
    accel: [f64; 3],
    gyro: [f64; 3],
}

struct FlightSim {
    t: f64,
    altitude: f64,
    velocity: f64,
    phase: Phase,
}

impl FlightSim {
    fn new() -> Self {
        Self {
            t: 0.0,
            altitude: 0.0,
            velocity: 0.0,
            phase: Phase::Pad,
        }
    }

    /// Advance by `dt` seconds. Returns the new sample and, on a phase
    /// change, the announcement text.
    fn step(&mut self, dt: f64) -> (Sample, Option<String>) {
        self.t += dt;
        let before = self.phase;

        let accel = match self.phase {
            Phase::Pad => {
                if self.t >= PAD_SECONDS {
                    self.phase = Phase::Boost;
                }
                0.0
            }
            Phase::Boost => {
                if self.t >= PAD_SECONDS + BURN_SECONDS {
                    self.phase = Phase::Coast;
                }
                THRUST_ACCEL - GRAVITY
            }
            Phase::Coast => {
                if self.velocity <= 0.0 {
                    self.phase = Phase::Descent;
                }
                -GRAVITY
            }
            Phase::Descent | Phase::Landed => 0.0,
        };

        match self.phase {
            Phase::Descent => {
                self.velocity = -CHUTE_DESCENT_RATE;
                self.altitude = (self.altitude + self.velocity * dt).max(0.0);
                if self.altitude <= 0.0 {
                    self.phase = Phase::Landed;
                }
            }
            Phase::Landed => self.velocity = 0.0,
            _ => {
                self.velocity += accel * dt;
                self.altitude = (self.altitude + self.velocity * dt).max(0.0);
            }
        }

        let wobble = (self.t * 7.0).sin();
        let spin = if matches!(self.phase, Phase::Boost | Phase::Coast) { 0.4 } else { 0.0 };
        let sample = Sample {
            altitude: self.altitude,
            // Standard lapse rate from a 20 C ground.
            temperature: 20.0 - 0.0065 * self.altitude,
            accel: [0.05 * wobble, -0.05 * wobble, accel + GRAVITY],
            gyro: [spin * wobble, spin * (self.t * 5.0).cos(), spin],
        };

        let note = (self.phase != before).then(|| match self.phase {
            Phase::Boost => "LAUNCH DETECTED".to_string(),
            Phase::Coast => format!("BURNOUT at {:.1} m", self.altitude),
            Phase::Descent => format!("APOGEE {:.1} m, chute out", self.altitude),
            Phase::Landed => format!("LANDED after {:.1} s", self.t),
            Phase::Pad => "ON PAD".to_string(),
        });
        (sample, note)
    }
}

fn telemetry_frame(seq: u64, s: &Sample) -> String {
    format!(
        "TSP{},{:.2},{:.2},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3}TEP",
        seq,
        s.altitude,
        s.temperature,
        s.accel[0],
        s.accel[1],
        s.accel[2],
        s.gyro[0],
        s.gyro[1],
        s.gyro[2]
    )
}

fn message_frame(text: &str) -> String {
    format!("MSP{}MEP", text)
}

fn handle_client(mut stream: TcpStream, args: Args) -> std::io::Result<()> {
    let period = Duration::from_secs_f64(1.0 / args.rate_hz.max(0.1));
    let mut sim = FlightSim::new();
    let mut seq: u64 = 0;

    stream.write_all(message_frame("SIM READY").as_bytes())?;
    loop {
        let (sample, note) = sim.step(period.as_secs_f64());
        seq += 1;

        if let Some(text) = note {
            info!("{}", text);
            stream.write_all(message_frame(&text).as_bytes())?;
        }

        let frame = telemetry_frame(seq, &sample);
        if args.split_every > 0 && seq % args.split_every == 0 {
            let (head, tail) = frame.split_at(frame.len() / 2);
            stream.write_all(head.as_bytes())?;
            stream.flush()?;
            thread::sleep(Duration::from_millis(2));
            stream.write_all(tail.as_bytes())?;
        } else {
            stream.write_all(frame.as_bytes())?;
        }
        stream.flush()?;

        thread::sleep(period);
    }
}

fn main() -> std::io::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let listener = TcpListener::bind(&args.listen)?;
    info!("telemetry_sim listening on {}", args.listen);
    for incoming in listener.incoming() {
        match incoming {
            Ok(stream) => {
                match stream.peer_addr() {
                    Ok(peer) => info!("client connected: {}", peer),
                    Err(e) => warn!("client connected, peer unknown: {}", e),
                }
                let args = args.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, args) {
                        info!("client gone: {}", e);
                    }
                });
            }
            Err(e) => error!("accept error: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_frame_layout() {
        let s = Sample {
            altitude: 100.5,
            temperature: 25.0,
            accel: [1.0, 2.0, 3.0],
            gyro: [0.1, 0.2, 0.3],
        };
        assert_eq!(
            telemetry_frame(4, &s),
            "TSP4,100.50,25.00,1.000,2.000,3.000,0.100,0.200,0.300TEP"
        );
        assert_eq!(message_frame("hi"), "MSPhiMEP");
    }

    #[test]
    fn test_flight_runs_through_every_phase() {
        let mut sim = FlightSim::new();
        let mut notes = Vec::new();
        let mut peak: f64 = 0.0;
        for _ in 0..20_000 {
            let (sample, note) = sim.step(0.05);
            peak = peak.max(sample.altitude);
            notes.extend(note);
            if sim.phase == Phase::Landed {
                break;
            }
        }
        assert_eq!(sim.phase, Phase::Landed);
        assert_eq!(notes.len(), 4, "{:?}", notes);
        assert_eq!(notes[0], "LAUNCH DETECTED");
        assert!(notes[2].starts_with("APOGEE"));
        assert!(peak > 100.0);
        assert_eq!(sim.altitude, 0.0);
    }
}
