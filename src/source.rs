//! MIDI message sources
//!
//! A source delivers Note On, Note Off and Control Change messages in the
//! order the device sent them. Filtering happens here; the controller loop
//! trusts whatever arrives.

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use midir::{Ignore, MidiInput, MidiInputPort};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::midi::{format_hex, ProtocolMessage};

/// Capacity of the queue between the MIDI driver and the controller loop
///
/// When full, the driver callback blocks until the loop catches up.
pub const SOURCE_BUFFER: usize = 256;

const CLIENT_NAME: &str = "midi-gamepad";

/// Stream of decoded MIDI messages
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message. `None` means the source has ended.
    async fn recv(&mut self) -> Option<ProtocolMessage>;

    /// Stop delivery and release the device. Called once by the owning loop,
    /// on a blocking thread, so implementations may wait for the driver.
    fn close(&mut self) {}
}

/// Find an input port by case-insensitive substring match
fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
    let pattern = pattern.to_lowercase();
    for port in midi_in.ports() {
        if let Ok(name) = midi_in.port_name(&port) {
            if name.to_lowercase().contains(&pattern) {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                return Some((port, name));
            }
        }
    }
    None
}

/// Live MIDI input port
///
/// The midir connection lives on its own thread so the source itself can
/// move into the controller task.
pub struct MidiInputSource {
    rx: mpsc::Receiver<ProtocolMessage>,
    shutdown_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    port_name: String,
}

impl MidiInputSource {
    /// Connect to the first input port whose name contains `pattern`
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if no port matches or the connection fails.
    pub fn open(pattern: &str) -> Result<Self> {
        let (msg_tx, rx) = mpsc::channel(SOURCE_BUFFER);
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<String>>(1);
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();
        let pattern_owned = pattern.to_string();

        let thread = std::thread::Builder::new()
            .name(format!("midi-in:{}", pattern))
            .spawn(move || {
                let connection = match Self::connect(&pattern_owned, msg_tx) {
                    Ok((connection, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        connection
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Park until closed or the source is dropped
                let _ = shutdown_rx.recv();
                connection.close();
            })
            .map_err(|e| Error::SourceUnavailable(format!("failed to spawn MIDI thread: {}", e)))?;

        let port_name = match ready_rx.recv() {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(Error::SourceUnavailable(format!(
                    "MIDI thread for '{}' exited during setup",
                    pattern
                )));
            }
        };

        info!("Connected to MIDI input port: {}", port_name);

        Ok(Self {
            rx,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
            port_name,
        })
    }

    fn connect(
        pattern: &str,
        msg_tx: mpsc::Sender<ProtocolMessage>,
    ) -> Result<(midir::MidiInputConnection<()>, String)> {
        let mut midi_in = MidiInput::new(CLIENT_NAME)
            .map_err(|e| Error::SourceUnavailable(format!("failed to create MIDI input: {}", e)))?;
        midi_in.ignore(Ignore::All);

        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (port, name) = find_input_port(&midi_in, pattern)
            .ok_or_else(|| Error::SourceUnavailable(format!("input port '{}' not found", pattern)))?;

        let connection = midi_in
            .connect(
                &port,
                CLIENT_NAME,
                move |_timestamp, data, _| match ProtocolMessage::parse(data) {
                    Some(msg) => {
                        // Blocks the driver thread while the loop is behind
                        if msg_tx.blocking_send(msg).is_err() {
                            trace!("Dropping {}: source closed", msg);
                        }
                    }
                    None => trace!("Ignoring MIDI: {}", format_hex(data)),
                },
                (),
            )
            .map_err(|e| {
                Error::SourceUnavailable(format!("failed to connect to '{}': {}", name, e))
            })?;

        Ok((connection, name))
    }

    /// Full name of the connected port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl MessageSource for MidiInputSource {
    async fn recv(&mut self) -> Option<ProtocolMessage> {
        self.rx.recv().await
    }

    /// Blocks until the connection thread has closed the port.
    fn close(&mut self) {
        // Closing the queue first fails any callback parked in `blocking_send`,
        // which midir waits for when the connection closes
        self.rx.close();

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("MIDI input thread for '{}' panicked", self.port_name);
            }
            debug!("MIDI input '{}' closed", self.port_name);
        }
    }
}

impl Drop for MidiInputSource {
    fn drop(&mut self) {
        // Wake the connection thread; it closes the port on its own
        self.rx.close();
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// In-process source fed through a channel
///
/// Used by tests and by code that decodes MIDI elsewhere.
pub struct ChannelSource {
    rx: mpsc::Receiver<ProtocolMessage>,
}

impl ChannelSource {
    /// Create a source and the sender that feeds it
    pub fn new(capacity: usize) -> (mpsc::Sender<ProtocolMessage>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self) -> Option<ProtocolMessage> {
        self.rx.recv().await
    }

    fn close(&mut self) {
        self.rx.close();
    }
}

/// Port discovery utilities
pub mod discovery {
    use super::*;
    use colored::*;

    /// Names of all MIDI input ports
    pub fn list_input_ports() -> anyhow::Result<Vec<String>> {
        let midi_in = MidiInput::new("midi-gamepad-discovery")?;

        let mut port_names = Vec::new();
        for port in midi_in.ports() {
            if let Ok(name) = midi_in.port_name(&port) {
                port_names.push(name);
            }
        }

        Ok(port_names)
    }

    /// Print discovered ports for the `--list-ports` flag
    pub fn print_ports() -> anyhow::Result<()> {
        let ports = list_input_ports()?;

        println!("\n{}", "=== MIDI Input Ports ===".bold().cyan());
        if ports.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for (i, name) in ports.iter().enumerate() {
            println!("  {}: {}", i, name.green());
        }
        println!();

        Ok(())
    }
}
