//! Controller handle
//!
//! [`ControllerHandle`] is the public face of a grblHAL link. It is cheap to
//! clone; every clone talks to the same actor task, which owns the state
//! machine, the command channel and the transport.
//!
//! ```no_run
//! # async fn demo() -> Result<(), grbllink_core::ControllerError> {
//! use std::sync::Arc;
//! use grbllink_communication::{ControllerHandle, NetworkConnector};
//! use grbllink_core::{ConnectionPhase, ControllerConfig};
//!
//! let controller = ControllerHandle::spawn(ControllerConfig::default(), Arc::new(NetworkConnector))?;
//! controller.connect("192.168.1.50:23").await?;
//! controller
//!     .wait_for_phase(ConnectionPhase::Ready, std::time::Duration::from_secs(10))
//!     .await?;
//! let ticket = controller.submit("G0 X10").await?;
//! ticket.wait().await?;
//! # Ok(())
//! # }
//! ```

mod actor;
mod state;

use std::sync::Arc;
use std::time::Duration;

use grbllink_core::constants::{
    CYCLE_START, FEED_HOLD, HOME_COMMAND, JOG_CANCEL, SETTINGS_COMMAND, SOFT_RESET,
    UNLOCK_COMMAND,
};
use grbllink_core::{
    Axis, ConnectionPhase, ControllerConfig, ControllerError, ControllerEvent,
    ControllerSnapshot, EventBus, EventBusConfig,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::communication::{CommandTicket, Connector};
use crate::firmware::JogDirection;
use actor::{ActorInput, ControllerActor, Reply, Request};
use state::ControllerState;

/// Inbound requests buffered for the actor
const REQUEST_CAPACITY: usize = 64;

/// A jog as requested by a caller, before gating and validation
#[derive(Debug, Clone, PartialEq)]
pub enum JogRequest {
    /// Incremental move over one or more axes
    Moves {
        /// Per-axis distances in mm
        moves: Vec<(Axis, f64)>,
        /// Feed rate in mm/min
        feed_rate: f64,
    },
    /// Long move stopped by [`ControllerHandle::cancel_jog`]
    Continuous {
        /// Axis to move
        axis: Axis,
        /// Direction of travel
        direction: JogDirection,
        /// Feed rate in mm/min
        feed_rate: f64,
    },
}

/// Cloneable handle to a controller actor
#[derive(Clone)]
pub struct ControllerHandle {
    requests: mpsc::Sender<ActorInput>,
    snapshot: watch::Receiver<ControllerSnapshot>,
    events: EventBus,
}

impl std::fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("phase", &self.snapshot.borrow().phase)
            .finish()
    }
}

impl ControllerHandle {
    /// Validate `config` and spawn the controller actor on the current runtime
    pub fn spawn(
        config: ControllerConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;

        let events = EventBus::with_config(EventBusConfig {
            channel_capacity: config.event_capacity,
        });
        let (snapshot_tx, snapshot_rx) = watch::channel(ControllerSnapshot::default());
        let (requests, inbound) = mpsc::channel(REQUEST_CAPACITY);

        let state = ControllerState::new(config, events.clone(), snapshot_tx);
        let actor = ControllerActor::new(state, connector, inbound, requests.downgrade());
        tokio::spawn(actor.run());

        Ok(Self {
            requests,
            snapshot: snapshot_rx,
            events,
        })
    }

    /// Copy of the current controller state
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch channel carrying every new snapshot
    pub fn watch(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.clone()
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.receiver()
    }

    /// Event bus for filtered synchronous handlers
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Start connecting to `address`.
    ///
    /// Returns once the attempt is under way; progress is reported through
    /// the phase. Fails with [`ControllerError::AlreadyConnected`] unless
    /// the controller is `Disconnected`.
    pub async fn connect(&self, address: &str) -> Result<(), ControllerError> {
        let address = address.to_string();
        self.request(|reply| Request::Connect { address, reply })
            .await
    }

    /// Close the link, failing every pending command
    pub async fn disconnect(&self) -> Result<(), ControllerError> {
        self.request(|reply| Request::Disconnect { reply }).await
    }

    /// Queue a text command
    pub async fn submit(&self, command: &str) -> Result<CommandTicket, ControllerError> {
        let command = command.to_string();
        self.request(|reply| Request::Submit { command, reply })
            .await
    }

    /// Send a real-time byte ahead of any queued command
    pub async fn submit_realtime(&self, byte: u8) -> Result<(), ControllerError> {
        self.request(|reply| Request::Realtime { byte, reply })
            .await
    }

    /// Jog one axis by `distance` mm
    pub async fn request_jog(
        &self,
        axis: Axis,
        distance: f64,
        feed_rate: f64,
    ) -> Result<CommandTicket, ControllerError> {
        self.jog(JogRequest::Moves {
            moves: vec![(axis, distance)],
            feed_rate,
        })
        .await
    }

    /// Jog X, Y and optionally Z in one motion
    pub async fn request_multi_axis_jog(
        &self,
        dx: f64,
        dy: f64,
        dz: Option<f64>,
        feed_rate: f64,
    ) -> Result<CommandTicket, ControllerError> {
        let mut moves = vec![(Axis::X, dx), (Axis::Y, dy)];
        moves.extend(dz.map(|dz| (Axis::Z, dz)));
        self.jog(JogRequest::Moves { moves, feed_rate }).await
    }

    /// Jog until [`cancel_jog`](Self::cancel_jog) is called
    pub async fn request_continuous_jog(
        &self,
        axis: Axis,
        direction: JogDirection,
        feed_rate: f64,
    ) -> Result<CommandTicket, ControllerError> {
        self.jog(JogRequest::Continuous {
            axis,
            direction,
            feed_rate,
        })
        .await
    }

    /// Stop any jog in progress
    pub async fn cancel_jog(&self) -> Result<(), ControllerError> {
        self.submit_realtime(JOG_CANCEL).await
    }

    /// Clear an alarm lock (`$X`)
    pub async fn unlock(&self) -> Result<CommandTicket, ControllerError> {
        self.submit(UNLOCK_COMMAND).await
    }

    /// Run the homing cycle (`$H`)
    pub async fn home(&self) -> Result<CommandTicket, ControllerError> {
        self.submit(HOME_COMMAND).await
    }

    /// Soft reset the controller
    pub async fn reset(&self) -> Result<(), ControllerError> {
        self.submit_realtime(SOFT_RESET).await
    }

    /// Pause motion
    pub async fn feed_hold(&self) -> Result<(), ControllerError> {
        self.submit_realtime(FEED_HOLD).await
    }

    /// Resume after a feed hold
    pub async fn cycle_start(&self) -> Result<(), ControllerError> {
        self.submit_realtime(CYCLE_START).await
    }

    /// Ask the controller to dump its settings again
    pub async fn reload_settings(&self) -> Result<CommandTicket, ControllerError> {
        self.submit(SETTINGS_COMMAND).await
    }

    /// Wait until the controller reaches `phase`
    pub async fn wait_for_phase(
        &self,
        phase: ConnectionPhase,
        timeout: Duration,
    ) -> Result<ControllerSnapshot, ControllerError> {
        let mut rx = self.snapshot.clone();
        let wait = async move {
            rx.wait_for(|snapshot| snapshot.phase == phase)
                .await
                .map(|snapshot| ControllerSnapshot::clone(&snapshot))
                .map_err(|_| ControllerError::Shutdown)
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| {
                Err(ControllerError::Other {
                    message: format!("timed out waiting for phase {}", phase),
                })
            })
    }

    /// Disconnect and stop the actor. Other clones become inert.
    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        self.request(|reply| Request::Shutdown { reply }).await
    }

    async fn jog(&self, request: JogRequest) -> Result<CommandTicket, ControllerError> {
        self.request(|reply| Request::Jog { request, reply }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(ActorInput::Request(build(reply)))
            .await
            .map_err(|_| ControllerError::Shutdown)?;
        response.await.map_err(|_| ControllerError::Shutdown)?
    }
}
