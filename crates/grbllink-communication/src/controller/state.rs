//! Controller state machine
//!
//! Synchronous core owned by the controller actor. Every input (caller
//! request, received line, timer) is a method call; outputs are writes to
//! the attached [`CommandSink`], events on the bus and a fresh snapshot.
//!
//! [`CommandSink`]: crate::communication::CommandSink

use std::sync::Arc;

use grbllink_core::constants::{
    is_realtime_byte, HOME_COMMAND, SOFT_RESET, STATUS_QUERY, UNLOCK_COMMAND,
};
use grbllink_core::{
    AlarmCondition, CommandEvent, ConfigurationEvent, ConfigurationSetting, ConnectionError,
    ConnectionEvent, ConnectionPhase, ControllerConfig, ControllerError, ControllerEvent,
    ControllerSnapshot, DisconnectReason, ErrorCondition, ErrorSeverity, EventBus, FaultCondition,
    FaultEvent, FirmwareError, FirmwareFamily, FirmwareInfo, FirmwareVersion,
    MachineConfiguration, MachineEvent, MachineMode, MachineStatus,
};
use tokio::sync::watch;
use tokio::time::Instant;

use super::JogRequest;
use crate::communication::{
    Acknowledgment, CommandChannel, CommandTicket, HeartbeatAction, LinkWriter, LivenessMonitor,
};
use crate::firmware::grblhal::{
    alarm_condition, apply_feedback, decode_error, decode_line, describe_setting,
    error_condition, parse_feedback, Feedback, JogCommand, ProtocolMessage, StatusParser,
};

/// Entries kept per fault ledger
const MAX_LEDGER_ENTRIES: usize = 64;

#[derive(Debug, Default)]
struct Handshake {
    pending: Vec<u64>,
    done: bool,
}

/// Canonical controller state and the rules that change it
pub(crate) struct ControllerState {
    config: ControllerConfig,
    phase: ConnectionPhase,
    attempt: u64,
    address: Option<String>,
    status: MachineStatus,
    configuration: Arc<MachineConfiguration>,
    alarms: Vec<AlarmCondition>,
    errors: Vec<ErrorCondition>,
    firmware: Option<FirmwareInfo>,
    last_error: Option<String>,
    channel: CommandChannel,
    liveness: LivenessMonitor,
    handshake: Handshake,
    consecutive_errors: u32,
    revalidating: bool,
    detection_deadline: Option<Instant>,
    events: EventBus,
    snapshot: watch::Sender<ControllerSnapshot>,
}

impl ControllerState {
    pub(crate) fn new(
        config: ControllerConfig,
        events: EventBus,
        snapshot: watch::Sender<ControllerSnapshot>,
    ) -> Self {
        Self {
            channel: CommandChannel::new(config.queue_capacity),
            liveness: LivenessMonitor::new(config.missed_heartbeat_threshold),
            config,
            phase: ConnectionPhase::Disconnected,
            attempt: 0,
            address: None,
            status: MachineStatus::default(),
            configuration: Arc::new(MachineConfiguration::new()),
            alarms: Vec::new(),
            errors: Vec::new(),
            firmware: None,
            last_error: None,
            handshake: Handshake::default(),
            consecutive_errors: 0,
            revalidating: false,
            detection_deadline: None,
            events,
            snapshot,
        }
    }

    pub(crate) fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub(crate) fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub(crate) fn heartbeat_active(&self) -> bool {
        self.liveness.is_active()
    }

    pub(crate) fn detection_deadline(&self) -> Option<Instant> {
        self.detection_deadline
    }

    // ---- connection lifecycle ----

    /// Start a connect attempt; returns its sequence id
    pub(crate) fn begin_connect(&mut self, address: &str) -> Result<u64, ControllerError> {
        if self.phase.is_active() {
            return Err(ControllerError::AlreadyConnected);
        }

        self.reset_session();
        self.attempt += 1;
        self.address = Some(address.to_string());
        self.transition(ConnectionPhase::Connecting);
        tracing::info!("Connecting to {} (attempt {})", address, self.attempt);
        Ok(self.attempt)
    }

    /// Whether `attempt` is the connect attempt still being waited for
    pub(crate) fn is_current_attempt(&self, attempt: u64) -> bool {
        attempt == self.attempt && self.phase == ConnectionPhase::Connecting
    }

    /// Transport opened for `attempt`. Returns false when the attempt is
    /// stale, in which case the caller drops the link.
    pub(crate) fn on_transport_established(
        &mut self,
        attempt: u64,
        writer: LinkWriter,
        peer: &str,
    ) -> bool {
        if !self.is_current_attempt(attempt) {
            tracing::debug!("Discarding stale connection {} (attempt {})", peer, attempt);
            return false;
        }

        self.channel.attach(Arc::new(writer));
        self.transition(ConnectionPhase::TransportUp);
        self.detection_deadline = Some(Instant::now() + self.config.detection_timeout);
        tracing::info!("Transport up to {}, waiting for controller", peer);
        self.send_realtime_internal(STATUS_QUERY);
        true
    }

    /// Transport could not be opened for `attempt`
    pub(crate) fn on_connect_failed(&mut self, attempt: u64, error: ConnectionError) {
        if !self.is_current_attempt(attempt) {
            tracing::debug!("Ignoring failure of stale attempt {}: {}", attempt, error);
            return;
        }
        let message = error.to_string();
        self.teardown(DisconnectReason::ConnectFailed(message.clone()), Some(message));
    }

    /// Read side reported EOF or an error
    pub(crate) fn on_transport_closed(&mut self, error: Option<ConnectionError>) {
        if !self.phase.transport_open() {
            return;
        }
        let reason = error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "closed by peer".to_string());
        let message = ConnectionError::ConnectionLost {
            reason: reason.clone(),
        }
        .to_string();
        self.teardown(DisconnectReason::ConnectionLost(reason), Some(message));
    }

    /// User requested disconnect; a no-op when already disconnected
    pub(crate) fn disconnect(&mut self) {
        if self.phase.is_active() {
            tracing::info!("Disconnecting on request");
            self.teardown(DisconnectReason::UserRequested, None);
        }
    }

    /// Detection window elapsed
    pub(crate) fn on_detection_timeout(&mut self) {
        self.detection_deadline = None;
        if !matches!(
            self.phase,
            ConnectionPhase::TransportUp | ConnectionPhase::ControllerDetected
        ) {
            return;
        }
        let error = ControllerError::DetectionTimeout {
            timeout_ms: u64::try_from(self.config.detection_timeout.as_millis()).unwrap_or(u64::MAX),
        };
        self.teardown(DisconnectReason::DetectionTimeout, Some(error.to_string()));
    }

    /// Heartbeat period elapsed
    pub(crate) fn on_heartbeat_tick(&mut self) {
        match self.liveness.on_tick() {
            HeartbeatAction::Idle => {}
            HeartbeatAction::Query => self.send_realtime_internal(STATUS_QUERY),
            HeartbeatAction::Dead { missed } => {
                let error = ControllerError::LivenessTimeout { missed };
                self.teardown(DisconnectReason::LivenessTimeout, Some(error.to_string()));
            }
        }
    }

    /// Final teardown when the actor exits
    pub(crate) fn shutdown(&mut self) {
        if self.phase.is_active() {
            self.teardown(DisconnectReason::Shutdown, None);
        }
    }

    /// Fail everything, stop timers, drop the transport, then go `Disconnected`
    fn teardown(&mut self, reason: DisconnectReason, error: Option<String>) {
        if self.phase == ConnectionPhase::Disconnected {
            return;
        }

        self.fail_pending(&reason.to_string());
        self.liveness.stop();
        self.detection_deadline = None;
        self.channel.detach();
        self.handshake = Handshake::default();
        self.revalidating = false;
        self.consecutive_errors = 0;

        if let Some(message) = error {
            tracing::error!("Link fault: {}", message);
            self.publish(ControllerEvent::Fault(FaultEvent::LinkFault {
                message: message.clone(),
                severity: ErrorSeverity::Critical,
            }));
            self.last_error = Some(message);
        }

        self.transition(ConnectionPhase::Disconnected);
        self.publish(ControllerEvent::Connection(ConnectionEvent::Disconnected {
            reason,
        }));
        self.publish_snapshot();
    }

    fn reset_session(&mut self) {
        self.fail_pending("new session");
        self.status = MachineStatus::default();
        if !self.configuration.is_empty() {
            Arc::make_mut(&mut self.configuration).reset();
            self.publish(ControllerEvent::Configuration(ConfigurationEvent::Reset));
        }
        self.alarms.clear();
        self.errors.clear();
        self.firmware = None;
        self.handshake = Handshake::default();
        self.consecutive_errors = 0;
        self.revalidating = false;
    }

    // ---- inbound lines ----

    /// Process one line from the controller
    pub(crate) fn on_line(&mut self, line: &str) {
        tracing::debug!("< {}", line);
        match decode_line(line) {
            ProtocolMessage::StatusReport(raw) => self.on_status_report(&raw),
            ProtocolMessage::Acknowledgment => self.on_acknowledgment(Acknowledgment::Ok, None),
            ProtocolMessage::Error { code, raw } => {
                let message = match code {
                    Some(code) => decode_error(code).1.to_string(),
                    None => raw.clone(),
                };
                self.on_acknowledgment(Acknowledgment::Error { code, message }, Some(&raw));
            }
            ProtocolMessage::Alarm { code, raw } => self.on_alarm(alarm_condition(code, &raw)),
            ProtocolMessage::Welcome {
                family,
                version,
                banner,
            } => self.on_welcome(family, version, banner),
            ProtocolMessage::ConfigurationLine {
                id,
                value,
                description,
            } => self.on_setting(id, value, description.as_deref()),
            ProtocolMessage::Other(text) => self.on_other(&text),
        }
    }

    fn on_status_report(&mut self, raw: &str) {
        let Some(update) = StatusParser::parse(raw) else {
            let error = FirmwareError::ResponseParseError {
                reason: format!("unreadable status report '{}'", raw),
            };
            tracing::warn!("{}", error);
            return;
        };

        self.liveness.on_status_report();
        let previous = self.status.mode;
        self.status.merge(&update);
        self.publish(ControllerEvent::Machine(MachineEvent::StatusUpdated(
            self.status.clone(),
        )));
        if previous != self.status.mode {
            self.publish(ControllerEvent::Machine(MachineEvent::ModeChanged {
                from: previous,
                to: self.status.mode,
            }));
        }

        let in_alarm_mode = self.status.mode == MachineMode::Alarm;
        if in_alarm_mode && self.alarms.is_empty() {
            self.record_alarm(FaultCondition::new(
                None,
                "Alarm",
                "Controller reports Alarm state",
                ErrorSeverity::Critical,
            ));
        }

        match self.phase {
            ConnectionPhase::TransportUp => self.enter_detected(),
            ConnectionPhase::ControllerDetected if self.handshake.done => {
                self.detection_deadline = None;
                self.last_error = None;
                self.transition(ConnectionPhase::Ready);
                tracing::info!("Controller ready");
                if in_alarm_mode || !self.alarms.is_empty() {
                    self.transition(ConnectionPhase::Alarm);
                }
            }
            ConnectionPhase::Ready if in_alarm_mode => {
                self.transition(ConnectionPhase::Alarm);
            }
            ConnectionPhase::Alarm | ConnectionPhase::ControllerError if self.revalidating => {
                if in_alarm_mode {
                    self.transition(ConnectionPhase::Alarm);
                } else {
                    tracing::info!("Controller re-validated in {} mode", self.status.mode);
                    self.transition(ConnectionPhase::Ready);
                }
            }
            _ => {}
        }
        self.revalidating = false;
    }

    fn on_acknowledgment(&mut self, ack: Acknowledgment, raw: Option<&str>) {
        let Some(done) = self.channel.on_acknowledgment(ack) else {
            return;
        };
        let handshake_step = self.handshake.pending.contains(&done.id);

        match done.outcome {
            Acknowledgment::Ok => {
                self.consecutive_errors = 0;
                self.publish(ControllerEvent::Command(CommandEvent::Completed {
                    id: done.id,
                    command: done.command.clone(),
                }));
                if is_recovery_command(&done.command)
                    && matches!(
                        self.phase,
                        ConnectionPhase::Alarm | ConnectionPhase::ControllerError
                    )
                {
                    tracing::info!("'{}' acknowledged, re-validating", done.command);
                    self.clear_faults();
                    self.revalidate();
                }
            }
            Acknowledgment::Error { code, message } => {
                tracing::warn!("Command '{}' rejected: {}", done.command, message);
                self.publish(ControllerEvent::Command(CommandEvent::Rejected {
                    id: done.id,
                    command: done.command.clone(),
                    code,
                    message: message.clone(),
                }));
                self.record_error(error_condition(code, raw.unwrap_or(&message)));

                if self.phase == ConnectionPhase::Ready && !handshake_step {
                    self.consecutive_errors += 1;
                    if self.consecutive_errors >= self.config.error_escalation_threshold {
                        tracing::error!(
                            "{} consecutive command errors, controller in error state",
                            self.consecutive_errors
                        );
                        self.transition(ConnectionPhase::ControllerError);
                    }
                }
            }
        }

        if handshake_step {
            self.handshake.pending.retain(|id| *id != done.id);
            if self.handshake.pending.is_empty() {
                self.finish_handshake();
            }
        }
        self.dispatch();
    }

    fn on_alarm(&mut self, alarm: AlarmCondition) {
        tracing::warn!("Controller alarm: {}", alarm);
        self.record_alarm(alarm);
        if matches!(
            self.phase,
            ConnectionPhase::Ready | ConnectionPhase::ControllerError
        ) {
            self.transition(ConnectionPhase::Alarm);
        }
    }

    fn on_welcome(
        &mut self,
        family: FirmwareFamily,
        version: Option<FirmwareVersion>,
        banner: String,
    ) {
        tracing::info!("Firmware banner: {}", banner);
        let info = match self.firmware.as_mut() {
            Some(info) => {
                info.family = family;
                info.version = version;
                info.banner = banner;
                info.clone()
            }
            None => {
                let info = FirmwareInfo::new(family, version, banner);
                self.firmware = Some(info.clone());
                info
            }
        };
        self.publish(ControllerEvent::Connection(ConnectionEvent::FirmwareIdentified(info)));

        match self.phase {
            ConnectionPhase::TransportUp => self.enter_detected(),
            ConnectionPhase::ControllerDetected => {
                // Firmware restarted mid-handshake; its buffers are gone
                self.fail_pending("controller reset");
                self.start_handshake();
            }
            phase if phase.is_operational() => {
                self.fail_pending("controller reset");
                self.consecutive_errors = 0;
                self.clear_faults();
                self.revalidate();
            }
            _ => {}
        }
    }

    fn on_setting(&mut self, id: u16, value: String, reported: Option<&str>) {
        let setting = ConfigurationSetting::new(id, value, describe_setting(id, reported));
        if Arc::make_mut(&mut self.configuration).upsert(setting.clone()) {
            self.publish(ControllerEvent::Configuration(
                ConfigurationEvent::SettingChanged(setting),
            ));
        }
    }

    fn on_other(&mut self, text: &str) {
        match parse_feedback(text) {
            Some(Feedback::Message(message)) => {
                tracing::info!("Controller message: {}", message);
                self.publish(ControllerEvent::Machine(MachineEvent::Message { text: message }));
            }
            Some(feedback) => {
                if apply_feedback(&mut self.firmware, &feedback) {
                    if let Some(info) = &self.firmware {
                        self.publish(ControllerEvent::Connection(
                            ConnectionEvent::FirmwareIdentified(info.clone()),
                        ));
                    }
                }
            }
            None => tracing::debug!("Unhandled line: {}", text),
        }
    }

    // ---- detection and handshake ----

    fn enter_detected(&mut self) {
        self.transition(ConnectionPhase::ControllerDetected);
        self.start_handshake();
    }

    fn start_handshake(&mut self) {
        self.handshake = Handshake::default();
        for command in self.config.handshake_commands.clone() {
            match self.channel.enqueue(&command) {
                Ok(ticket) => self.handshake.pending.push(ticket.id()),
                Err(e) => tracing::warn!("Handshake command '{}' not queued: {}", command, e),
            }
        }
        if self.handshake.pending.is_empty() {
            self.finish_handshake();
        } else {
            tracing::debug!("Handshake started ({} commands)", self.handshake.pending.len());
            self.dispatch();
        }
    }

    fn finish_handshake(&mut self) {
        if self.handshake.done || self.phase != ConnectionPhase::ControllerDetected {
            return;
        }
        tracing::debug!("Handshake acknowledged, starting liveness monitor");
        self.handshake.done = true;
        self.liveness.start();
        // Initial status query; its report declares Ready
        self.send_realtime_internal(STATUS_QUERY);
    }

    fn revalidate(&mut self) {
        self.revalidating = true;
        self.send_realtime_internal(STATUS_QUERY);
    }

    // ---- caller requests ----

    /// Queue a text command
    pub(crate) fn submit(&mut self, command: &str) -> Result<CommandTicket, ControllerError> {
        let command = command.trim();
        let allowed = match self.phase {
            ConnectionPhase::Ready => true,
            ConnectionPhase::Alarm | ConnectionPhase::ControllerError => {
                is_recovery_command(command)
            }
            _ => false,
        };
        if !allowed {
            tracing::warn!("Refusing '{}' in phase {}", command, self.phase);
            return Err(ControllerError::NotReady {
                phase: self.phase.to_string(),
                command: command.to_string(),
            });
        }

        let ticket = self.channel.enqueue(command)?;
        self.dispatch();
        Ok(ticket)
    }

    /// Write a real-time byte
    pub(crate) fn submit_realtime(&mut self, byte: u8) -> Result<(), ControllerError> {
        if !is_realtime_byte(byte) {
            return Err(ControllerError::InvalidCommand {
                reason: format!("0x{:02X} is not a real-time command", byte),
            });
        }
        if !self.phase.transport_open() {
            return Err(ControllerError::NotConnected);
        }

        if let Err(e) = self.channel.send_realtime(byte) {
            let reason = e.to_string();
            self.on_transport_closed(Some(e));
            return Err(ControllerError::CommandFailed { reason });
        }
        self.publish(ControllerEvent::Command(CommandEvent::RealtimeSent { byte }));

        if byte == SOFT_RESET {
            tracing::info!("Soft reset sent");
            // The firmware drops its buffers and never answers them
            self.fail_pending("soft reset");
            self.consecutive_errors = 0;
        }
        Ok(())
    }

    /// Build and queue a jog if the machine may jog right now
    pub(crate) fn request_jog(
        &mut self,
        request: JogRequest,
    ) -> Result<CommandTicket, ControllerError> {
        if self.phase != ConnectionPhase::Ready {
            return Err(self.ignore_jog(format!("phase is {}", self.phase)));
        }
        if !self.status.mode.accepts_jog() {
            return Err(self.ignore_jog(format!("machine is in {} mode", self.status.mode)));
        }

        let jog = match request {
            JogRequest::Moves { moves, feed_rate } => JogCommand::multi(&moves, feed_rate),
            JogRequest::Continuous {
                axis,
                direction,
                feed_rate,
            } => JogCommand::continuous(
                axis,
                direction,
                self.config.continuous_jog_distance,
                feed_rate,
            ),
        };
        let jog = match jog {
            Ok(jog) => jog,
            Err(ControllerError::JogRejected { reason }) => return Err(self.ignore_jog(reason)),
            Err(e) => return Err(e),
        };

        let ticket = self.channel.enqueue(&jog.to_gcode())?;
        self.dispatch();
        Ok(ticket)
    }

    fn ignore_jog(&mut self, reason: String) -> ControllerError {
        tracing::info!("Jog ignored: {}", reason);
        self.publish(ControllerEvent::Command(CommandEvent::JogIgnored {
            reason: reason.clone(),
        }));
        ControllerError::JogRejected { reason }
    }

    // ---- helpers ----

    fn dispatch(&mut self) {
        match self.channel.dispatch_next() {
            Ok(Some(sent)) => self.publish(ControllerEvent::Command(CommandEvent::Sent {
                id: sent.id,
                command: sent.command,
            })),
            Ok(None) => {}
            Err(e) => self.on_transport_closed(Some(e)),
        }
    }

    fn send_realtime_internal(&mut self, byte: u8) {
        if let Err(e) = self.channel.send_realtime(byte) {
            self.on_transport_closed(Some(e));
        }
    }

    fn fail_pending(&mut self, reason: &str) {
        for failed in self.channel.fail_all(reason) {
            self.publish(ControllerEvent::Command(CommandEvent::Failed {
                id: failed.id,
                command: failed.command,
                reason: reason.to_string(),
            }));
        }
    }

    fn record_alarm(&mut self, alarm: AlarmCondition) {
        push_bounded(&mut self.alarms, alarm.clone());
        self.publish(ControllerEvent::Fault(FaultEvent::AlarmRaised(alarm)));
    }

    fn record_error(&mut self, error: ErrorCondition) {
        push_bounded(&mut self.errors, error.clone());
        self.publish(ControllerEvent::Fault(FaultEvent::ErrorRaised(error)));
    }

    fn clear_faults(&mut self) {
        if self.alarms.is_empty() && self.errors.is_empty() {
            return;
        }
        self.alarms.clear();
        self.errors.clear();
        self.publish(ControllerEvent::Fault(FaultEvent::Cleared));
    }

    fn transition(&mut self, next: ConnectionPhase) -> bool {
        if self.phase == next {
            return false;
        }
        if !self.phase.can_transition_to(next) {
            let error = ControllerError::InvalidStateTransition {
                current: self.phase.to_string(),
                requested: next.to_string(),
            };
            tracing::warn!("{}", error);
            return false;
        }

        let from = self.phase;
        self.phase = next;
        tracing::info!("Controller phase {} -> {}", from, next);
        self.publish(ControllerEvent::Connection(ConnectionEvent::PhaseChanged {
            from,
            to: next,
        }));
        // Phase watchers see the change before any reply to the caller
        self.publish_snapshot();
        true
    }

    fn publish(&self, event: ControllerEvent) {
        // Nobody listening is fine
        let _ = self.events.publish(event);
    }

    /// Push the current state to snapshot watchers
    pub(crate) fn publish_snapshot(&self) {
        self.snapshot.send_replace(ControllerSnapshot {
            phase: self.phase,
            address: self.address.clone(),
            status: self.status.clone(),
            configuration: Arc::clone(&self.configuration),
            alarms: self.alarms.clone(),
            errors: self.errors.clone(),
            firmware: self.firmware.clone(),
            last_error: self.last_error.clone(),
            pending_commands: self.channel.pending_len(),
        });
    }
}

/// Commands accepted while the controller is alarmed or in error
fn is_recovery_command(command: &str) -> bool {
    command.eq_ignore_ascii_case(UNLOCK_COMMAND) || command.eq_ignore_ascii_case(HOME_COMMAND)
}

fn push_bounded(ledger: &mut Vec<FaultCondition>, entry: FaultCondition) {
    if ledger.len() >= MAX_LEDGER_ENTRIES {
        ledger.remove(0);
    }
    ledger.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use grbllink_core::Axis;

    fn state() -> (ControllerState, watch::Receiver<ControllerSnapshot>) {
        let (tx, rx) = watch::channel(ControllerSnapshot::default());
        (
            ControllerState::new(ControllerConfig::default(), EventBus::new(), tx),
            rx,
        )
    }

    #[test]
    fn test_recovery_commands() {
        assert!(is_recovery_command("$X"));
        assert!(is_recovery_command("$h"));
        assert!(!is_recovery_command("$$"));
        assert!(!is_recovery_command("G0 X1"));
    }

    #[test]
    fn test_submit_refused_while_disconnected() {
        let (mut state, _rx) = state();
        let err = state.submit("G0 X1").unwrap_err();
        assert!(matches!(err, ControllerError::NotReady { .. }));
        assert_eq!(
            state.submit_realtime(b'!').unwrap_err(),
            ControllerError::NotConnected
        );
        assert!(matches!(
            state.submit_realtime(b'G'),
            Err(ControllerError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_jog_refused_while_disconnected() {
        let (mut state, _rx) = state();
        let err = state
            .request_jog(JogRequest::Moves {
                moves: vec![(Axis::X, 10.0)],
                feed_rate: 1000.0,
            })
            .unwrap_err();
        assert!(matches!(err, ControllerError::JogRejected { .. }));
    }

    #[test]
    fn test_connect_attempts_are_sequenced() {
        let (mut state, rx) = state();
        let first = state.begin_connect("sim").unwrap();
        assert_eq!(
            state.begin_connect("sim").unwrap_err(),
            ControllerError::AlreadyConnected
        );
        state.disconnect();
        let second = state.begin_connect("sim").unwrap();
        assert!(second > first);
        assert!(!state.is_current_attempt(first));
        assert!(state.is_current_attempt(second));

        state.on_connect_failed(first, ConnectionError::ConnectionTimeout { timeout_ms: 10 });
        assert_eq!(state.phase(), ConnectionPhase::Connecting);

        state.on_connect_failed(
            second,
            ConnectionError::ConnectFailed {
                address: "sim".to_string(),
                reason: "refused".to_string(),
            },
        );
        assert_eq!(state.phase(), ConnectionPhase::Disconnected);
        assert!(rx.borrow().last_error.as_deref().unwrap().contains("refused"));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut state, _rx) = state();
        state.disconnect();
        assert_eq!(state.phase(), ConnectionPhase::Disconnected);
    }
}
