//! Link layer: opening the byte source and the background reader thread.
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, warn};
use std::io::{self, Read};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::framing::{FrameEvent, FrameExtractor};

/// Anything the reader thread can pull bytes from.
pub trait ByteSource: Read + Send {}

impl<T: Read + Send> ByteSource for T {}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] io::Error),
}

/// What the reader thread reports to the UI, in stream order.
#[derive(Debug)]
pub enum LinkEvent {
    Connected(String),
    ConnectionFailed(LinkError),
    Frame(FrameEvent),
    ReadFailed(LinkError),
    /// The source hit end of stream.
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkTarget {
    Serial { path: String, baud: u32, dtr: bool },
    Tcp { address: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    pub target: LinkTarget,
    /// Upper bound on how long a single read may block, and so on how long
    /// a stop request can go unnoticed.
    pub read_timeout: Duration,
}

impl LinkConfig {
    pub fn describe(&self) -> String {
        match &self.target {
            LinkTarget::Serial { path, baud, .. } => format!("{} @ {} baud", path, baud),
            LinkTarget::Tcp { address } => format!("tcp://{}", address),
        }
    }

    pub fn open(&self) -> Result<Box<dyn ByteSource>, LinkError> {
        let open_err = |source: io::Error| LinkError::Open {
            target: self.describe(),
            source,
        };
        match &self.target {
            LinkTarget::Serial { path, baud, dtr } => {
                let mut port = serialport::new(path.as_str(), *baud)
                    .timeout(self.read_timeout)
                    .open()
                    .map_err(|e| open_err(e.into()))?;
                if *dtr {
                    port.write_data_terminal_ready(true)
                        .map_err(|e| open_err(e.into()))?;
                }
                Ok(Box::new(port))
            }
            LinkTarget::Tcp { address } => {
                let stream = TcpStream::connect(address.as_str()).map_err(open_err)?;
                stream
                    .set_read_timeout(Some(self.read_timeout))
                    .map_err(open_err)?;
                Ok(Box::new(stream))
            }
        }
    }
}

/// Serial device names currently visible to the OS.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            warn!("failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}

/// Owner side of a running reader thread.
pub struct LinkHandle {
    pub events: Receiver<LinkEvent>,
    stop: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl LinkHandle {
    /// Ask the reader to exit and wait up to `wait` for it.
    ///
    /// Returns `false` if the thread was still inside a blocking read when
    /// the wait ran out; it is then left to finish on its own.
    pub fn stop(mut self, wait: Duration) -> bool {
        self.stop.store(true, Ordering::SeqCst);
        let Some(join) = self.join.take() else {
            return true;
        };
        let deadline = Instant::now() + wait;
        while !join.is_finished() {
            if Instant::now() >= deadline {
                warn!("reader thread did not stop within {:?}", wait);
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        if join.join().is_err() {
            error!("reader thread panicked");
        }
        true
    }
}

impl Drop for LinkHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Open `config` on a background thread and stream its frames back.
pub fn spawn_connection(config: LinkConfig) -> LinkHandle {
    let label = config.describe();
    spawn_reader(label, move || config.open())
}

/// Spawn a reader over whatever source `open` produces.
pub fn spawn_reader<F>(label: String, open: F) -> LinkHandle
where
    F: FnOnce() -> Result<Box<dyn ByteSource>, LinkError> + Send + 'static,
{
    let (tx, rx) = bounded::<LinkEvent>(1024);
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let join = thread::spawn(move || {
        let source = match open() {
            Ok(source) => source,
            Err(e) => {
                error!("{}", e);
                let _ = tx.send(LinkEvent::ConnectionFailed(e));
                return;
            }
        };
        info!("connected to {}", label);
        if tx.send(LinkEvent::Connected(label.clone())).is_err() {
            return;
        }
        read_loop(source, &tx, &stop_flag);
        info!("reader for {} exiting", label);
    });

    LinkHandle {
        events: rx,
        stop,
        join: Some(join),
    }
}

fn read_loop(mut source: Box<dyn ByteSource>, tx: &Sender<LinkEvent>, stop: &AtomicBool) {
    let mut extractor = FrameExtractor::new();
    let mut buf = [0u8; 4096];
    while !stop.load(Ordering::SeqCst) {
        match source.read(&mut buf) {
            Ok(0) => {
                let _ = tx.send(LinkEvent::Closed);
                return;
            }
            Ok(n) => {
                debug!("rx {}", hex::encode_upper(&buf[..n]));
                for event in extractor.ingest(&buf[..n]) {
                    if tx.send(LinkEvent::Frame(event)).is_err() {
                        return;
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                error!("read error: {}", e);
                let _ = tx.send(LinkEvent::ReadFailed(LinkError::Read(e)));
                return;
            }
        }
    }
    if !extractor.pending().is_empty() {
        debug!("dropping {} unframed bytes", extractor.pending().len());
    }
}
