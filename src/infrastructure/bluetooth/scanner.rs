//! BLE Scanner Module
//!
//! Time-bounded advertisement scans that resolve to at most one peripheral.

use crate::domain::events::{LinkEvent, ScanEvent, ScanSessionId};
use crate::domain::models::{PeripheralHandle, PeripheralIdentity};
use crate::error::TransportError;
use crate::infrastructure::bluetooth::transport::ScanRadio;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a scan session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Matched(PeripheralHandle),
    TimedOut(Duration),
    Failed(String),
}

struct ScanSession {
    id: ScanSessionId,
    service_id: Uuid,
    started: Instant,
    deadline: Instant,
    timer: JoinHandle<()>,
}

/// Owns the radio scan and the single active [`ScanSession`].
///
/// The timeout is a scheduled event on the inbound channel, so a match and
/// a timeout race through the same queue: whichever is consumed first ends
/// the session and the other is discarded as stale.
pub struct ScanController {
    radio: Box<dyn ScanRadio>,
    events: mpsc::UnboundedSender<LinkEvent>,
    session: Option<ScanSession>,
    next_session: u64,
}

impl ScanController {
    pub fn new(radio: Box<dyn ScanRadio>, events: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            radio,
            events,
            session: None,
            next_session: 0,
        }
    }

    /// Start a scan for `identity`, cancelling any scan already running.
    ///
    /// Must be called from within a tokio runtime; the timeout is a spawned timer.
    pub fn start_scan(
        &mut self,
        identity: &PeripheralIdentity,
        timeout: Duration,
    ) -> Result<ScanSessionId, TransportError> {
        self.stop_scan();

        self.next_session += 1;
        let id = ScanSessionId(self.next_session);
        info!(
            "Starting BLE scan {} for service UUID: {}",
            id, identity.service_id
        );
        self.radio.start_scan(id, identity.service_id)?;

        let sender = self.events.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = sender.send(LinkEvent::Scan(ScanEvent::TimedOut { session: id }));
        });

        let started = Instant::now();
        self.session = Some(ScanSession {
            id,
            service_id: identity.service_id,
            started,
            deadline: started + timeout,
            timer,
        });
        Ok(id)
    }

    /// Cancel the active scan. Returns `false` if nothing was running.
    pub fn stop_scan(&mut self) -> bool {
        match self.end_session() {
            Some(id) => {
                info!("Scan {} stopped", id);
                true
            }
            None => false,
        }
    }

    /// Apply a radio or timer event. Returns the outcome if it ended the session.
    pub fn handle(&mut self, event: ScanEvent) -> Option<ScanOutcome> {
        match event {
            ScanEvent::AdvertisementReceived {
                session,
                advertisement,
            } => {
                let service_id = self.current(session)?.service_id;
                if !advertisement.advertises(service_id) {
                    debug!(
                        "Ignoring advertisement from {} without service {}",
                        advertisement.address, service_id
                    );
                    return None;
                }
                self.end_session();
                let handle = advertisement.into_handle();
                info!(
                    "Found peripheral {} ({}) rssi {:?}",
                    handle.address,
                    handle.name.as_deref().unwrap_or("Unknown"),
                    handle.rssi
                );
                Some(ScanOutcome::Matched(handle))
            }
            ScanEvent::TimedOut { session } => {
                let scan = self.current(session)?;
                let elapsed = scan.deadline - scan.started;
                self.end_session();
                info!("Scan {} timed out after {:?}", session, elapsed);
                Some(ScanOutcome::TimedOut(elapsed))
            }
            ScanEvent::Failed { session, reason } => {
                self.current(session)?;
                self.end_session();
                warn!("Scan {} failed: {}", session, reason);
                Some(ScanOutcome::Failed(reason))
            }
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.session.is_some()
    }

    pub fn active_session(&self) -> Option<ScanSessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    fn current(&self, session: ScanSessionId) -> Option<&ScanSession> {
        match &self.session {
            Some(active) if active.id == session => Some(active),
            _ => {
                debug!("Discarding event from stale scan session {}", session);
                None
            }
        }
    }

    fn end_session(&mut self) -> Option<ScanSessionId> {
        let session = self.session.take()?;
        session.timer.abort();
        if let Err(e) = self.radio.stop_scan() {
            warn!("Failed to stop radio scan: {}", e);
        }
        Some(session.id)
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.end_session();
    }
}
