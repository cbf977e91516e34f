//! Command channel with acknowledgment tracking
//!
//! Implements the grbl send-response protocol: commands are queued, exactly
//! one is in flight, and every `ok`/`error:` completes the oldest in-flight
//! command before the next one is written.
//!
//! # Features
//! - Bounded FIFO queue
//! - One outstanding command at a time
//! - Per-command completion through a `oneshot` ticket
//! - Queue flush on disconnect and soft reset
//! - Real-time bytes bypass the queue entirely

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use grbllink_core::constants::MAX_LINE_LENGTH;
use grbllink_core::{ConnectionError, ControllerError};
use tokio::sync::oneshot;

use super::CommandSink;

/// Firmware response completing the in-flight command
#[derive(Debug, Clone, PartialEq)]
pub enum Acknowledgment {
    /// `ok`
    Ok,
    /// `error:<code>`
    Error {
        /// Numeric code, absent for textual errors
        code: Option<u16>,
        /// Human readable description
        message: String,
    },
}

/// Successful completion of a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse {
    /// Channel-assigned id
    pub id: u64,
    /// Command text as sent
    pub command: String,
    /// When the command was accepted
    pub submitted_at: DateTime<Utc>,
    /// When the `ok` arrived
    pub completed_at: DateTime<Utc>,
}

/// Outcome delivered to a [`CommandTicket`]
pub type CommandResult = Result<CommandResponse, ControllerError>;

/// Handle to a submitted command
#[derive(Debug)]
pub struct CommandTicket {
    id: u64,
    command: String,
    receiver: oneshot::Receiver<CommandResult>,
}

impl CommandTicket {
    /// Channel-assigned id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Command text as queued
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Wait for the firmware to acknowledge (or the link to drop)
    pub async fn wait(self) -> CommandResult {
        self.receiver
            .await
            .unwrap_or(Err(ControllerError::Shutdown))
    }
}

/// A command that was just written to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// Channel-assigned id
    pub id: u64,
    /// Command text
    pub command: String,
}

/// The in-flight command resolved by an acknowledgment
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Channel-assigned id
    pub id: u64,
    /// Command text
    pub command: String,
    /// What the firmware answered
    pub outcome: Acknowledgment,
}

/// A command resolved as failed without an acknowledgment
#[derive(Debug, Clone, PartialEq)]
pub struct FailedCommand {
    /// Channel-assigned id
    pub id: u64,
    /// Command text
    pub command: String,
}

#[derive(Debug)]
struct PendingCommand {
    id: u64,
    command: String,
    submitted_at: DateTime<Utc>,
    completion: oneshot::Sender<CommandResult>,
}

impl PendingCommand {
    fn resolve(self, result: CommandResult) -> FailedCommand {
        // The submitter may have dropped its ticket
        let _ = self.completion.send(result);
        FailedCommand {
            id: self.id,
            command: self.command,
        }
    }
}

/// FIFO command queue with a single in-flight slot
pub struct CommandChannel {
    queue: VecDeque<PendingCommand>,
    in_flight: Option<PendingCommand>,
    next_id: u64,
    capacity: usize,
    sink: Option<Arc<dyn CommandSink>>,
}

impl std::fmt::Debug for CommandChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandChannel")
            .field("queued", &self.queue.len())
            .field("in_flight", &self.in_flight.as_ref().map(|c| &c.command))
            .field("capacity", &self.capacity)
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

impl CommandChannel {
    /// Create an empty channel holding at most `capacity` commands
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: None,
            next_id: 1,
            capacity,
            sink: None,
        }
    }

    /// Route output through `sink`
    pub fn attach(&mut self, sink: Arc<dyn CommandSink>) {
        self.sink = Some(sink);
    }

    /// Drop the sink; nothing is dispatched until a new one is attached
    pub fn detach(&mut self) {
        self.sink = None;
    }

    /// Whether a sink is attached
    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// Queued plus in-flight commands
    pub fn pending_len(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.is_some())
    }

    /// Id and text of the command awaiting acknowledgment
    pub fn in_flight(&self) -> Option<(u64, &str)> {
        self.in_flight
            .as_ref()
            .map(|c| (c.id, c.command.as_str()))
    }

    /// Queue a command. Does not write anything; call [`dispatch_next`].
    ///
    /// [`dispatch_next`]: CommandChannel::dispatch_next
    pub fn enqueue(&mut self, command: &str) -> Result<CommandTicket, ControllerError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ControllerError::InvalidCommand {
                reason: "empty command".to_string(),
            });
        }
        if command.contains(['\n', '\r']) {
            return Err(ControllerError::InvalidCommand {
                reason: "command spans multiple lines".to_string(),
            });
        }
        if command.len() > MAX_LINE_LENGTH {
            return Err(ControllerError::InvalidCommand {
                reason: format!(
                    "command is {} bytes, limit is {}",
                    command.len(),
                    MAX_LINE_LENGTH
                ),
            });
        }
        if self.pending_len() >= self.capacity {
            return Err(ControllerError::BufferOverflow {
                capacity: self.capacity,
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = oneshot::channel();
        self.queue.push_back(PendingCommand {
            id,
            command: command.to_string(),
            submitted_at: Utc::now(),
            completion: tx,
        });

        Ok(CommandTicket {
            id,
            command: command.to_string(),
            receiver: rx,
        })
    }

    /// Write the next queued command if nothing is in flight
    pub fn dispatch_next(&mut self) -> Result<Option<Dispatched>, ConnectionError> {
        if self.in_flight.is_some() {
            return Ok(None);
        }
        let Some(sink) = self.sink.clone() else {
            return Ok(None);
        };
        let Some(next) = self.queue.pop_front() else {
            return Ok(None);
        };

        if let Err(e) = sink.send_line(&next.command) {
            tracing::warn!("Failed to send '{}': {}", next.command, e);
            next.resolve(Err(ControllerError::CommandFailed {
                reason: e.to_string(),
            }));
            return Err(e);
        }

        tracing::debug!("> {}", next.command);
        let dispatched = Dispatched {
            id: next.id,
            command: next.command.clone(),
        };
        self.in_flight = Some(next);
        Ok(Some(dispatched))
    }

    /// Resolve the in-flight command. Returns `None` for an unsolicited ack.
    pub fn on_acknowledgment(&mut self, ack: Acknowledgment) -> Option<Completion> {
        let Some(command) = self.in_flight.take() else {
            tracing::debug!("Acknowledgment with nothing in flight: {:?}", ack);
            return None;
        };

        let result = match &ack {
            Acknowledgment::Ok => Ok(CommandResponse {
                id: command.id,
                command: command.command.clone(),
                submitted_at: command.submitted_at,
                completed_at: Utc::now(),
            }),
            Acknowledgment::Error { code, message } => Err(ControllerError::CommandRejected {
                code: *code,
                message: message.clone(),
            }),
        };
        let resolved = command.resolve(result);

        Some(Completion {
            id: resolved.id,
            command: resolved.command,
            outcome: ack,
        })
    }

    /// Fail the in-flight command and everything queued behind it
    pub fn fail_all(&mut self, reason: &str) -> Vec<FailedCommand> {
        let failed: Vec<FailedCommand> = self
            .in_flight
            .take()
            .into_iter()
            .chain(self.queue.drain(..))
            .map(|command| {
                command.resolve(Err(ControllerError::CommandFailed {
                    reason: reason.to_string(),
                }))
            })
            .collect();

        if !failed.is_empty() {
            tracing::debug!("Failed {} pending command(s): {}", failed.len(), reason);
        }
        failed
    }

    /// Write a real-time byte straight to the transport
    pub fn send_realtime(&self, byte: u8) -> Result<(), ConnectionError> {
        match &self.sink {
            Some(sink) => sink.send_realtime(byte),
            None => Err(ConnectionError::ConnectionLost {
                reason: "no transport attached".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
        realtime: Mutex<Vec<u8>>,
    }

    impl CommandSink for RecordingSink {
        fn send_line(&self, line: &str) -> Result<(), ConnectionError> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }

        fn send_realtime(&self, byte: u8) -> Result<(), ConnectionError> {
            self.realtime.lock().unwrap().push(byte);
            Ok(())
        }
    }

    fn attached(capacity: usize) -> (CommandChannel, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let mut channel = CommandChannel::new(capacity);
        channel.attach(sink.clone());
        (channel, sink)
    }

    #[test]
    fn test_one_command_in_flight() {
        let (mut channel, sink) = attached(8);
        channel.enqueue("G0 X1").unwrap();
        channel.enqueue("G0 X2").unwrap();

        assert!(channel.dispatch_next().unwrap().is_some());
        assert!(channel.dispatch_next().unwrap().is_none());
        assert_eq!(*sink.lines.lock().unwrap(), vec!["G0 X1"]);
        assert_eq!(channel.pending_len(), 2);

        let done = channel.on_acknowledgment(Acknowledgment::Ok).unwrap();
        assert_eq!(done.command, "G0 X1");
        channel.dispatch_next().unwrap();
        assert_eq!(*sink.lines.lock().unwrap(), vec!["G0 X1", "G0 X2"]);
        assert_eq!(channel.in_flight().map(|(_, c)| c), Some("G0 X2"));
    }

    #[tokio::test]
    async fn test_ticket_resolution() {
        let (mut channel, _sink) = attached(8);
        let first = channel.enqueue("G0 X1").unwrap();
        let second = channel.enqueue("G4 P-1").unwrap();
        assert_eq!(second.id(), first.id() + 1);

        channel.dispatch_next().unwrap();
        channel.on_acknowledgment(Acknowledgment::Ok);
        channel.dispatch_next().unwrap();
        channel.on_acknowledgment(Acknowledgment::Error {
            code: Some(2),
            message: "Bad number format".to_string(),
        });

        let ok = first.wait().await.unwrap();
        assert_eq!(ok.command, "G0 X1");
        assert!(ok.completed_at >= ok.submitted_at);
        assert_eq!(
            second.wait().await.unwrap_err(),
            ControllerError::CommandRejected {
                code: Some(2),
                message: "Bad number format".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fail_all_resolves_everything() {
        let (mut channel, _sink) = attached(8);
        let a = channel.enqueue("G0 X1").unwrap();
        let b = channel.enqueue("G0 X2").unwrap();
        channel.dispatch_next().unwrap();

        let failed = channel.fail_all("link lost");
        assert_eq!(failed.len(), 2);
        assert_eq!(channel.pending_len(), 0);
        assert!(matches!(
            a.wait().await,
            Err(ControllerError::CommandFailed { .. })
        ));
        assert!(matches!(
            b.wait().await,
            Err(ControllerError::CommandFailed { .. })
        ));
    }

    #[test]
    fn test_enqueue_validation() {
        let mut channel = CommandChannel::new(2);
        assert!(channel.enqueue("   ").is_err());
        assert!(channel.enqueue("G0\nG1").is_err());
        assert!(channel.enqueue(&"G".repeat(MAX_LINE_LENGTH + 1)).is_err());

        let ticket = channel.enqueue("  $H  ").unwrap();
        assert_eq!(ticket.command(), "$H");
        channel.enqueue("$X").unwrap();
        assert_eq!(
            channel.enqueue("$$").unwrap_err(),
            ControllerError::BufferOverflow { capacity: 2 }
        );
    }

    #[test]
    fn test_detached_channel_holds_commands() {
        let mut channel = CommandChannel::new(4);
        channel.enqueue("$I").unwrap();
        assert!(channel.dispatch_next().unwrap().is_none());
        assert!(channel.send_realtime(b'?').is_err());
        assert_eq!(channel.pending_len(), 1);
    }

    #[test]
    fn test_unsolicited_ack_ignored() {
        let (mut channel, sink) = attached(4);
        assert!(channel.on_acknowledgment(Acknowledgment::Ok).is_none());
        channel.send_realtime(b'!').unwrap();
        assert_eq!(*sink.realtime.lock().unwrap(), vec![b'!']);
    }
}
