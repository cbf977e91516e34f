//! Controller actor
//!
//! One task owns the [`ControllerState`] and the transport reader. Caller
//! requests and connect results arrive on a single inbound channel; received
//! lines, the heartbeat interval and the detection deadline are selected in
//! the same loop, so all state mutation is serialized here.

use std::future::pending;
use std::sync::Arc;

use grbllink_core::ConnectionError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

use super::state::ControllerState;
use super::JogRequest;
use crate::communication::{CommandTicket, Connector, LineSource, TransportLink};
use grbllink_core::ControllerError;

/// Reply channel for a request
pub(crate) type Reply<T> = oneshot::Sender<Result<T, ControllerError>>;

/// Requests from [`ControllerHandle`](super::ControllerHandle)
pub(crate) enum Request {
    Connect { address: String, reply: Reply<()> },
    Disconnect { reply: Reply<()> },
    Submit { command: String, reply: Reply<CommandTicket> },
    Realtime { byte: u8, reply: Reply<()> },
    Jog { request: JogRequest, reply: Reply<CommandTicket> },
    Shutdown { reply: Reply<()> },
}

/// Everything the actor reacts to besides its own timers and reader
pub(crate) enum ActorInput {
    Request(Request),
    Connected {
        attempt: u64,
        result: Result<TransportLink, ConnectionError>,
    },
}

pub(crate) struct ControllerActor {
    state: ControllerState,
    connector: Arc<dyn Connector>,
    inbound: mpsc::Receiver<ActorInput>,
    loopback: mpsc::WeakSender<ActorInput>,
    reader: Option<Box<dyn LineSource>>,
    heartbeat: Option<Interval>,
}

impl ControllerActor {
    pub(crate) fn new(
        state: ControllerState,
        connector: Arc<dyn Connector>,
        inbound: mpsc::Receiver<ActorInput>,
        loopback: mpsc::WeakSender<ActorInput>,
    ) -> Self {
        Self {
            state,
            connector,
            inbound,
            loopback,
            reader: None,
            heartbeat: None,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::debug!("Controller actor started");
        self.state.publish_snapshot();

        loop {
            let deadline = self.state.detection_deadline();
            tokio::select! {
                biased;
                input = self.inbound.recv() => match input {
                    Some(ActorInput::Request(Request::Shutdown { reply })) => {
                        self.state.shutdown();
                        let _ = reply.send(Ok(()));
                        break;
                    }
                    Some(ActorInput::Request(request)) => self.handle_request(request),
                    Some(ActorInput::Connected { attempt, result }) => {
                        self.handle_connected(attempt, result)
                    }
                    // Every handle is gone
                    None => break,
                },
                line = next_line(&mut self.reader) => match line {
                    Some(Ok(line)) => self.state.on_line(&line),
                    Some(Err(e)) => self.state.on_transport_closed(Some(e)),
                    None => self.state.on_transport_closed(None),
                },
                _ = next_tick(&mut self.heartbeat) => self.state.on_heartbeat_tick(),
                _ = wait_deadline(deadline) => self.state.on_detection_timeout(),
            }

            self.reconcile();
            self.state.publish_snapshot();
        }

        self.state.shutdown();
        self.state.publish_snapshot();
        tracing::debug!("Controller actor stopped");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Connect { address, reply } => {
                let result = self.state.begin_connect(&address);
                if let Ok(attempt) = result {
                    self.spawn_connect(attempt, address);
                }
                let _ = reply.send(result.map(|_| ()));
            }
            Request::Disconnect { reply } => {
                self.state.disconnect();
                let _ = reply.send(Ok(()));
            }
            Request::Submit { command, reply } => {
                let _ = reply.send(self.state.submit(&command));
            }
            Request::Realtime { byte, reply } => {
                let _ = reply.send(self.state.submit_realtime(byte));
            }
            Request::Jog { request, reply } => {
                let _ = reply.send(self.state.request_jog(request));
            }
            Request::Shutdown { reply } => {
                self.state.shutdown();
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn handle_connected(&mut self, attempt: u64, result: Result<TransportLink, ConnectionError>) {
        match result {
            Ok(link) => {
                let TransportLink {
                    writer,
                    reader,
                    peer,
                } = link;
                if self.state.on_transport_established(attempt, writer, &peer) {
                    self.reader = Some(reader);
                }
            }
            Err(e) => self.state.on_connect_failed(attempt, e),
        }
    }

    fn spawn_connect(&self, attempt: u64, address: String) {
        let Some(loopback) = self.loopback.upgrade() else {
            return;
        };
        let connector = Arc::clone(&self.connector);
        let timeout = self.state.config().connect_timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, connector.connect(&address)).await {
                Ok(result) => result,
                Err(_) => Err(ConnectionError::ConnectionTimeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            };
            if loopback
                .send(ActorInput::Connected { attempt, result })
                .await
                .is_err()
            {
                tracing::debug!("Controller gone before connect attempt {} finished", attempt);
            }
        });
    }

    /// Align the reader and heartbeat timer with the state machine
    fn reconcile(&mut self) {
        if !self.state.phase().transport_open() {
            self.reader = None;
        }

        match (self.state.heartbeat_active(), self.heartbeat.is_some()) {
            (true, false) => {
                let period = self.state.config().heartbeat_interval;
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.heartbeat = Some(interval);
            }
            (false, true) => self.heartbeat = None,
            _ => {}
        }
    }
}

async fn next_line(
    reader: &mut Option<Box<dyn LineSource>>,
) -> Option<Result<String, ConnectionError>> {
    match reader {
        Some(reader) => reader.next_line().await,
        None => pending().await,
    }
}

async fn next_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
