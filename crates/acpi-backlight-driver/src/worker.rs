//! The per-panel worker thread and its handle.
//!
//! Each attached panel runs on one named thread that owns the [`Panel`].
//! Callers talk to it through a bounded command channel and wait for a reply;
//! the fade timer and the deferred-work signal are extra arms of the same
//! `select!`, so panel state is only ever touched from that thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use acpi_backlight_fade::FadePhase;
use acpi_backlight_firmware::{NodeHandle, discover};
use acpi_backlight_nvram::{PersistenceBridge, StoreLocator};
use crossbeam::channel::{
    self, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError, bounded, select,
};
use tracing::{error, info, warn};

use crate::config::PanelConfig;
use crate::error::{DriverError, DriverResult};
use crate::panel::{Panel, PanelSnapshot};
use crate::params::{DisplayParameter, ParameterSet};
use crate::properties::PropertyMap;
use crate::work::{WorkQueue, WorkRequest};

/// Commands queued before senders block.
const COMMAND_CAPACITY: usize = 16;

/// Poll interval of [`BacklightDriver::wait_idle`].
const IDLE_POLL: Duration = Duration::from_millis(2);

enum Command {
    SetParameter {
        parameter: DisplayParameter,
        value: u32,
        reply: Sender<bool>,
    },
    UpdateParameters {
        reply: Sender<ParameterSet>,
    },
    AttachDisplay {
        reply: Sender<ParameterSet>,
    },
    SetProperties {
        properties: PropertyMap,
        reply: Sender<DriverResult<()>>,
    },
    Properties {
        reply: Sender<PropertyMap>,
    },
    Snapshot {
        reply: Sender<PanelSnapshot>,
    },
    Shutdown,
}

/// Handle to an attached backlight panel.
///
/// Dropping the handle stops the worker; prefer [`Self::detach`] to observe
/// the final state.
#[derive(Debug)]
pub struct BacklightDriver {
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<Panel>>,
    work: WorkQueue,
    timeout: Duration,
    name: String,
}

impl BacklightDriver {
    /// Discover the backlight under `root`, bring it up and start its worker.
    ///
    /// Attach blocks while the persisted level is loaded, which waits up to
    /// the configured persistence timeout for the store to appear.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Discovery`] when no usable device exists,
    /// [`DriverError::InvalidConfiguration`] for a bad `config` and
    /// [`DriverError::Spawn`] if the worker thread cannot start.
    pub fn attach(
        provider: &NodeHandle,
        root: &NodeHandle,
        locator: Arc<dyn StoreLocator>,
        config: PanelConfig,
    ) -> DriverResult<Self> {
        config.validate()?;
        let device = discover(provider, root).map_err(DriverError::Discovery)?;

        let bridge = PersistenceBridge::new(locator, config.persistence.clone());
        let (work, wakeups) = WorkQueue::new();
        let timeout = config.command_timeout();
        let name = config.worker_name.clone();
        let panel = Panel::attach(device, bridge, work.clone(), config);

        let (commands, command_rx) = bounded(COMMAND_CAPACITY);
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(panel, &command_rx, &wakeups))
            .map_err(DriverError::Spawn)?;

        info!(worker = %name, "Backlight worker started");
        Ok(Self {
            commands: Some(commands),
            worker: Some(worker),
            work,
            timeout,
            name,
        })
    }

    /// Whether the worker is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Queue deferred work on this panel.
    pub fn schedule_work(&self, request: WorkRequest) {
        self.work.schedule(request);
    }

    /// Set an integer display parameter.
    ///
    /// # Errors
    ///
    /// Fails if the worker is gone or does not answer in time.
    pub fn set_integer_parameter(
        &self,
        parameter: DisplayParameter,
        value: u32,
    ) -> DriverResult<bool> {
        self.request(|reply| Command::SetParameter {
            parameter,
            value,
            reply,
        })
    }

    /// Request a brightness level in `[0, 1024]`.
    ///
    /// # Errors
    ///
    /// Fails if the worker is gone or does not answer in time.
    pub fn set_brightness(&self, level: u32) -> DriverResult<()> {
        self.set_integer_parameter(DisplayParameter::Brightness, level)
            .map(drop)
    }

    /// Commit the current target level.
    ///
    /// # Errors
    ///
    /// Fails if the worker is gone or does not answer in time.
    pub fn commit(&self) -> DriverResult<()> {
        self.set_integer_parameter(DisplayParameter::Commit, 0)
            .map(drop)
    }

    /// Parameters to publish to the display.
    ///
    /// # Errors
    ///
    /// Fails if the worker is gone or does not answer in time.
    pub fn update_parameters(&self) -> DriverResult<ParameterSet> {
        self.request(|reply| Command::UpdateParameters { reply })
    }

    /// A display was attached to this panel.
    ///
    /// # Errors
    ///
    /// Fails if the worker is gone or does not answer in time.
    pub fn attach_display(&self) -> DriverResult<ParameterSet> {
        self.request(|reply| Command::AttachDisplay { reply })
    }

    /// Write properties.
    ///
    /// # Errors
    ///
    /// Returns the panel's rejection, or fails if the worker is gone or does
    /// not answer in time.
    pub fn set_properties(&self, properties: PropertyMap) -> DriverResult<()> {
        self.request(|reply| Command::SetProperties { properties, reply })?
    }

    /// Published properties.
    ///
    /// # Errors
    ///
    /// Fails if the worker is gone or does not answer in time.
    pub fn properties(&self) -> DriverResult<PropertyMap> {
        self.request(|reply| Command::Properties { reply })
    }

    /// Current panel state.
    ///
    /// # Errors
    ///
    /// Fails if the worker is gone or does not answer in time.
    pub fn snapshot(&self) -> DriverResult<PanelSnapshot> {
        self.request(|reply| Command::Snapshot { reply })
    }

    /// Wait until no fade is running and no deferred work is pending.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Timeout`] if the panel is still busy after
    /// `timeout`.
    pub fn wait_idle(&self, timeout: Duration) -> DriverResult<PanelSnapshot> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let snapshot = self.snapshot()?;
            if snapshot.phase == FadePhase::Idle && snapshot.pending_work.is_empty() {
                return Ok(snapshot);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(DriverError::Timeout(timeout));
            }
            thread::sleep(IDLE_POLL);
        }
    }

    /// Stop the worker and return the panel's final state.
    ///
    /// Pending deferred work is processed before the worker exits; a running
    /// fade stops where it is.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::WorkerPanicked`] if the worker panicked.
    pub fn detach(mut self) -> DriverResult<PanelSnapshot> {
        match self.stop_blocking()? {
            Some(snapshot) => Ok(snapshot),
            None => Err(DriverError::WorkerStopped),
        }
    }

    fn stop_blocking(&mut self) -> DriverResult<Option<PanelSnapshot>> {
        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };

        info!(worker = %self.name, "Stopping backlight worker");
        // Dropping the sender disconnects the worker if the queue is full.
        if let Some(commands) = self.commands.take()
            && let Err(TrySendError::Full(_)) = commands.try_send(Command::Shutdown)
        {
            warn!(worker = %self.name, "Command queue full, disconnecting worker");
        }

        match worker.join() {
            Ok(panel) => {
                let snapshot = panel.snapshot();
                info!(worker = %self.name, "Backlight worker stopped cleanly");
                drop(panel);
                Ok(Some(snapshot))
            }
            Err(_panic) => {
                error!(worker = %self.name, "Backlight worker panicked");
                Err(DriverError::WorkerPanicked)
            }
        }
    }

    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Command) -> DriverResult<T> {
        let commands = self.commands.as_ref().ok_or(DriverError::WorkerStopped)?;
        let (reply, response) = bounded(1);
        match commands.send_timeout(make(reply), self.timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(DriverError::Timeout(self.timeout)),
            Err(SendTimeoutError::Disconnected(_)) => return Err(DriverError::WorkerStopped),
        }
        match response.recv_timeout(self.timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(DriverError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(DriverError::WorkerStopped),
        }
    }
}

impl Drop for BacklightDriver {
    fn drop(&mut self) {
        if self.worker.is_some() {
            warn!(worker = %self.name, "Backlight driver dropped while attached - stopping worker");
            if let Err(e) = self.stop_blocking() {
                error!(worker = %self.name, error = %e, "Failed to stop backlight worker");
            }
        }
    }
}

fn run_worker(mut panel: Panel, commands: &Receiver<Command>, wakeups: &Receiver<()>) -> Panel {
    loop {
        let timer = match panel.fade_deadline() {
            Some(deadline) => channel::at(deadline),
            None => channel::never(),
        };

        select! {
            recv(commands) -> command => match command {
                Ok(Command::Shutdown) | Err(_) => break,
                Ok(command) => handle(&mut panel, command),
            },
            recv(wakeups) -> wakeup => {
                if wakeup.is_ok() {
                    panel.process_pending_work();
                }
            },
            recv(timer) -> _ => panel.on_fade_timer(),
        }
    }

    panel.process_pending_work();
    panel
}

fn handle(panel: &mut Panel, command: Command) {
    // A caller that timed out has dropped its receiver; the reply is discarded.
    let delivered = match command {
        Command::SetParameter {
            parameter,
            value,
            reply,
        } => reply
            .send(panel.set_integer_parameter(parameter, value))
            .is_ok(),
        Command::UpdateParameters { reply } => reply.send(panel.update_parameters()).is_ok(),
        Command::AttachDisplay { reply } => reply.send(panel.attach_display()).is_ok(),
        Command::SetProperties { properties, reply } => {
            reply.send(panel.set_properties(&properties)).is_ok()
        }
        Command::Properties { reply } => reply.send(panel.properties().clone()).is_ok(),
        Command::Snapshot { reply } => reply.send(panel.snapshot()).is_ok(),
        Command::Shutdown => true,
    };
    if !delivered {
        warn!("Backlight command reply dropped, caller gave up");
    }
}
