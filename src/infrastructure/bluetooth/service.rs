//! Link Service Module
//!
//! The single consumer that drives the connection state machine and the
//! classification smoother. Everything that can happen (radio callbacks,
//! scan timers, user intent) arrives on one [`LinkEvent`] channel and is
//! applied strictly in order.

use crate::domain::classification::ClassificationSmoother;
use crate::domain::events::{LinkEvent, StatusEvent, TransportEvent};
use crate::domain::haptics::{HapticDecision, HapticDriver, HapticOutput};
use crate::domain::models::{ConnectionState, PeripheralIdentity};
use crate::error::{LinkError, TransportError};
use crate::infrastructure::bluetooth::connection::ConnectionStateMachine;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::scanner::ScanController;
use crate::infrastructure::bluetooth::transport::{GattTransport, ScanRadio};
use std::ops::ControlFlow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Options for the link driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkOptions {
    /// Trace every notification payload.
    pub raw_data_logging: bool,
}

/// Radio halves produced by a platform adapter.
pub type RadioParts = (Box<dyn ScanRadio>, Box<dyn GattTransport>);

/// Owns the state machine, the smoother and the haptic driver.
pub struct HapticLink<O> {
    machine: ConnectionStateMachine,
    smoother: ClassificationSmoother,
    haptics: HapticDriver<O>,
    status: mpsc::UnboundedSender<StatusEvent>,
    options: LinkOptions,
}

impl<O: HapticOutput> HapticLink<O> {
    pub fn new(
        machine: ConnectionStateMachine,
        output: O,
        status: mpsc::UnboundedSender<StatusEvent>,
        options: LinkOptions,
    ) -> Self {
        Self {
            machine,
            smoother: ClassificationSmoother::new(),
            haptics: HapticDriver::new(output),
            status,
            options,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Apply one event. Breaks once the link has been shut down.
    pub fn handle(&mut self, event: LinkEvent) -> ControlFlow<()> {
        match event {
            LinkEvent::ConnectRequested => self.machine.request_connect(),
            LinkEvent::DisconnectRequested => self.machine.request_disconnect(),
            LinkEvent::Shutdown => {
                self.machine.shutdown();
                self.smoother.reset();
                return ControlFlow::Break(());
            }
            LinkEvent::Scan(event) => self.machine.handle_scan(event),
            LinkEvent::Transport(TransportEvent::Notification(payload)) => {
                self.on_notification(payload)
            }
            LinkEvent::Transport(event) => self.machine.handle_transport(event),
        }

        // A partial batch never carries over to another link.
        if !self.machine.is_streaming() && self.smoother.pending() > 0 {
            debug!("Dropping {} buffered samples", self.smoother.pending());
            self.smoother.reset();
        }
        ControlFlow::Continue(())
    }

    /// Consume events until shutdown.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<LinkEvent>) {
        info!("Link service started");
        while let Some(event) = events.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        if self.machine.state() != ConnectionState::Idle {
            self.machine.shutdown();
        }
        info!("Link service stopped");
    }

    fn on_notification(&mut self, payload: Vec<u8>) {
        if !self.machine.is_streaming() {
            debug!(
                "Dropping notification received in state {}",
                self.machine.state()
            );
            return;
        }
        if self.options.raw_data_logging {
            trace!("Raw notification: {:02X?}", payload);
        }

        let decoded = protocol::decode_sample(&payload);
        self.emit(StatusEvent::DataAvailable(payload));

        let sample = match decoded {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Dropping malformed sample: {}", e);
                if let LinkError::PayloadDecodeError(len) = e {
                    self.emit(StatusEvent::PayloadRejected(len));
                }
                return;
            }
        };

        let decision = self.smoother.push(sample);
        if decision != HapticDecision::None && self.haptics.fire(decision) {
            self.emit(StatusEvent::HapticFired(decision));
        }
    }

    fn emit(&self, event: StatusEvent) {
        let _ = self.status.send(event);
    }
}

/// Host-facing handle to a running link.
///
/// Dropping the handle shuts the link down without waiting for it.
pub struct HapticLinkHandle {
    events: mpsc::UnboundedSender<LinkEvent>,
    task: Option<JoinHandle<()>>,
}

impl HapticLinkHandle {
    pub fn request_connect(&self) {
        let _ = self.events.send(LinkEvent::ConnectRequested);
    }

    pub fn request_disconnect(&self) {
        let _ = self.events.send(LinkEvent::DisconnectRequested);
    }

    /// Tear the link down and wait for the driver loop to finish.
    pub async fn stop(mut self) {
        let _ = self.events.send(LinkEvent::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Link service ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for HapticLinkHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.events.send(LinkEvent::Shutdown);
        }
    }
}

/// Start the core on the current tokio runtime.
///
/// `make_radio` receives the inbound sender that the platform adapter must
/// report its callbacks on. Fails only if the adapter cannot be created,
/// typically because the host has no Bluetooth LE.
pub fn start<O, F>(
    output: O,
    options: LinkOptions,
    make_radio: F,
) -> Result<(HapticLinkHandle, mpsc::UnboundedReceiver<StatusEvent>), TransportError>
where
    O: HapticOutput + 'static,
    F: FnOnce(mpsc::UnboundedSender<LinkEvent>) -> Result<RadioParts, TransportError>,
{
    start_with_identity(protocol::PERIPHERAL, output, options, make_radio)
}

pub fn start_with_identity<O, F>(
    identity: PeripheralIdentity,
    output: O,
    options: LinkOptions,
    make_radio: F,
) -> Result<(HapticLinkHandle, mpsc::UnboundedReceiver<StatusEvent>), TransportError>
where
    O: HapticOutput + 'static,
    F: FnOnce(mpsc::UnboundedSender<LinkEvent>) -> Result<RadioParts, TransportError>,
{
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = mpsc::unbounded_channel();

    let (radio, gatt) = make_radio(events_tx.clone())?;
    let scanner = ScanController::new(radio, events_tx.clone());
    let machine = ConnectionStateMachine::new(identity, scanner, gatt, status_tx.clone());
    let link = HapticLink::new(machine, output, status_tx, options);

    let task = tokio::spawn(link.run(events_rx));
    Ok((
        HapticLinkHandle {
            events: events_tx,
            task: Some(task),
        },
        status_rx,
    ))
}
