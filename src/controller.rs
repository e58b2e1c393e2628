//! Controller - one MIDI device translated into one virtual gamepad
//!
//! Each controller runs a single task that is the only reader of its source
//! and the only writer to its sink. Messages are dispatched one at a time, so
//! a sink never sees concurrent calls and mapping order is deterministic.
//!
//! # Lifecycle
//!
//! 1. [`Controller::open`] builds the mapping table, opens the MIDI port and
//!    registers the virtual gamepad. Any failure aborts construction.
//! 2. The loop starts immediately and runs until [`Controller::stop`] or
//!    until the source ends.
//! 3. On exit the loop closes the source and the sink exactly once.
//!
//! Cancellation is only observed between messages. A message that is being
//! dispatched is always finished first.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::mapping::{dispatch, Mapping};
use crate::sink::{GamepadSink, SinkBackend};
use crate::source::{MessageSource, MidiInputSource};

/// Translation session for one physical device
pub struct Controller {
    name: String,
    mappings: Arc<RwLock<Vec<Mapping>>>,
    cancel: CancellationToken,
    /// Loop task, taken by the first `stop` call
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    /// Build a controller from its configuration
    ///
    /// Blocks while the MIDI port is opened; see [`start`](Self::start).
    ///
    /// Mappings are validated before any device is touched, so a bad mapping
    /// file never leaves a half-registered gamepad behind.
    ///
    /// # Errors
    ///
    /// - `InvalidMappingDescriptor` if a mapping names an unknown type, button or axis
    /// - `SourceUnavailable` if the MIDI port cannot be opened
    /// - `SinkUnavailable` if the virtual gamepad cannot be created
    pub fn open(config: &ControllerConfig, backend: SinkBackend) -> Result<Self> {
        let mappings = config.build_mappings()?;

        let source = MidiInputSource::open(&config.port_name)?;
        let sink = backend.create(&config.port_name, config.identity())?;

        Ok(Self::spawn(
            config.port_name.clone(),
            Box::new(source),
            sink,
            mappings,
        ))
    }

    /// [`open`](Self::open) on the blocking pool
    ///
    /// Opening a MIDI port waits for the driver, so async callers should use
    /// this instead of calling `open` on a runtime worker.
    pub async fn start(config: ControllerConfig, backend: SinkBackend) -> Result<Self> {
        let port_name = config.port_name.clone();
        tokio::task::spawn_blocking(move || Self::open(&config, backend))
            .await
            .map_err(|e| {
                Error::SourceUnavailable(format!("setup of '{}' failed: {}", port_name, e))
            })?
    }

    /// Start translating messages from `source` into `sink`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        name: impl Into<String>,
        source: Box<dyn MessageSource>,
        sink: Box<dyn GamepadSink>,
        mappings: Vec<Mapping>,
    ) -> Self {
        let name = name.into();
        let mappings = Arc::new(RwLock::new(mappings));
        let cancel = CancellationToken::new();

        info!(
            "Controller '{}' started with {} mappings",
            name,
            mappings.read().len()
        );

        let task = tokio::spawn(Self::run(
            name.clone(),
            source,
            sink,
            mappings.clone(),
            cancel.clone(),
        ));

        Self {
            name,
            mappings,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Main consumption loop
    async fn run(
        name: String,
        mut source: Box<dyn MessageSource>,
        mut sink: Box<dyn GamepadSink>,
        mappings: Arc<RwLock<Vec<Mapping>>>,
        cancel: CancellationToken,
    ) {
        let mut processed: u64 = 0;

        loop {
            tokio::select! {
                // Checked first so nothing is dispatched once stop was requested
                biased;

                _ = cancel.cancelled() => {
                    debug!("Controller '{}' cancelled", name);
                    break;
                }

                msg = source.recv() => {
                    let Some(msg) = msg else {
                        warn!("MIDI source for '{}' ended", name);
                        break;
                    };

                    let table = mappings.read();
                    dispatch(&table, &msg, sink.as_mut());
                    processed += 1;
                }
            }
        }

        let closed = tokio::task::spawn_blocking(move || source.close()).await;
        if let Err(e) = closed {
            error!("Controller '{}': closing MIDI source failed: {}", name, e);
        }
        sink.close();
        info!(
            "Controller '{}' stopped ({} messages processed)",
            name, processed
        );
    }

    /// Append a mapping to the end of the table
    ///
    /// Takes effect from the next message on.
    pub fn add_mapping(&self, mapping: Mapping) {
        debug!(
            "Controller '{}': adding mapping \"{}\"",
            self.name,
            mapping.comment()
        );
        self.mappings.write().push(mapping);
    }

    /// Number of mappings in the table
    pub fn mapping_count(&self) -> usize {
        self.mappings.read().len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the loop is still running
    pub fn is_running(&self) -> bool {
        match self.task.try_lock() {
            Ok(guard) => guard.as_ref().is_some_and(|task| !task.is_finished()),
            // Another caller is inside `stop`
            Err(_) => false,
        }
    }

    /// Stop the loop and release the source and the sink
    ///
    /// Returns only after the loop has exited, so no sink call happens after
    /// this returns. Safe to call more than once and from several tasks.
    pub async fn stop(&self) {
        self.cancel.cancel();

        let mut task = self.task.lock().await;
        if let Some(handle) = task.as_mut() {
            // The handle stays in place until the loop has exited, so a
            // caller whose `stop` was dropped leaves the wait to the next one
            let result = handle.await;
            *task = None;
            if let Err(e) = result {
                error!("Controller '{}' loop failed: {}", self.name, e);
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// All controllers of a running process
#[derive(Default)]
pub struct ControllerList {
    controllers: Vec<Controller>,
}

impl ControllerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, controller: Controller) {
        self.controllers.push(controller);
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.iter()
    }

    /// Stop every controller. Call this for a clean shutdown.
    pub async fn stop_all(&self) {
        for controller in &self.controllers {
            controller.stop().await;
        }
    }
}

#[cfg(test)]
mod tests;
