//! Scripted controller harness shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use grbllink_communication::{ControllerHandle, MemoryConnector, MemoryPeer, PeerInput};
use grbllink_core::{ConnectionPhase, ControllerConfig, ControllerSnapshot};
use tokio::sync::mpsc;

pub const IDLE_STATUS: &str = "<Idle|MPos:0.000,0.000,0.000|FS:0,0|Bf:15,128>";
pub const STEP: Duration = Duration::from_secs(2);

pub struct Harness {
    pub controller: ControllerHandle,
    pub connector: Arc<MemoryConnector>,
    pub peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Policy that keeps the heartbeat and detection timers out of the way
pub fn quiet_config() -> ControllerConfig {
    ControllerConfig::default()
        .with_heartbeat_interval(Duration::from_secs(600))
        .with_detection_timeout(Duration::from_secs(600))
}

pub fn harness(config: ControllerConfig) -> Harness {
    let (connector, peers) = MemoryConnector::new();
    let controller = ControllerHandle::spawn(config, connector.clone()).unwrap();
    Harness {
        controller,
        connector,
        peers,
    }
}

impl Harness {
    /// Connect and accept the transport, returning the firmware end
    pub async fn open(&mut self) -> MemoryPeer {
        self.controller.connect("sim").await.unwrap();
        let mut peer = self.peers.recv().await.unwrap();
        assert_eq!(peer.recv().await, Some(PeerInput::Realtime(b'?')));
        peer
    }

    /// Connect and play a grblHAL controller through detection and handshake
    pub async fn ready(&mut self) -> MemoryPeer {
        let mut peer = self.open().await;
        peer.send(IDLE_STATUS).await.unwrap();
        answer_handshake(&mut peer).await;

        assert_eq!(peer.next_realtime().await, Some(b'?'));
        peer.send(IDLE_STATUS).await.unwrap();
        self.wait_for(ConnectionPhase::Ready).await;
        peer
    }

    pub async fn wait_for(&self, phase: ConnectionPhase) -> ControllerSnapshot {
        self.controller.wait_for_phase(phase, STEP).await.unwrap()
    }

    /// Wait until a snapshot satisfies `check`
    pub async fn wait_until(&self, check: impl FnMut(&ControllerSnapshot) -> bool) -> ControllerSnapshot {
        let mut rx = self.controller.watch();
        tokio::time::timeout(STEP, rx.wait_for(check))
            .await
            .expect("snapshot condition not reached")
            .map(|snapshot| ControllerSnapshot::clone(&snapshot))
            .unwrap()
    }
}

/// Answer `$I`, `$10=511` and `$$` the way grblHAL does
pub async fn answer_handshake(peer: &mut MemoryPeer) {
    assert_eq!(peer.next_line().await.unwrap(), "$I");
    peer.send("[VER:1.1f.20240119:]").await.unwrap();
    peer.send("[OPT:VNMSL,35,1024,3,0]").await.unwrap();
    peer.send("[FIRMWARE:grblHAL]").await.unwrap();
    peer.send("ok").await.unwrap();

    assert_eq!(peer.next_line().await.unwrap(), "$10=511");
    peer.send("ok").await.unwrap();

    assert_eq!(peer.next_line().await.unwrap(), "$$");
    peer.send("$0=10").await.unwrap();
    peer.send("$10=511").await.unwrap();
    peer.send("$110=5000.000").await.unwrap();
    peer.send("ok").await.unwrap();
}

/// Expect no text line from the controller for a short while
pub async fn assert_no_line(peer: &mut MemoryPeer) {
    let next = tokio::time::timeout(Duration::from_millis(100), peer.next_line()).await;
    assert!(next.is_err(), "unexpected line {:?}", next);
}
