//! BLE Connection Module
//!
//! Lifecycle of the single peripheral link: scan, connect, discover,
//! subscribe, tear down. Every transition goes through
//! [`ConnectionStateMachine::transition`], which only follows the edges of
//! [`ConnectionState::can_transition_to`].

use crate::domain::events::{ScanEvent, StatusEvent, TransportEvent};
use crate::domain::models::{ConnectionState, DiscoveredService, PeripheralHandle, PeripheralIdentity};
use crate::error::{LinkError, MissingAttribute};
use crate::infrastructure::bluetooth::protocol::{ENABLE_NOTIFICATION_VALUE, SCAN_TIMEOUT};
use crate::infrastructure::bluetooth::scanner::{ScanController, ScanOutcome};
use crate::infrastructure::bluetooth::transport::GattTransport;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Subscription {
    service: Uuid,
    characteristic: Uuid,
}

pub struct ConnectionStateMachine {
    identity: PeripheralIdentity,
    state: ConnectionState,
    scanner: ScanController,
    gatt: Box<dyn GattTransport>,
    peripheral: Option<PeripheralHandle>,
    /// A GATT client is open and must be closed exactly once.
    client_open: bool,
    subscription: Option<Subscription>,
    status: mpsc::UnboundedSender<StatusEvent>,
}

impl ConnectionStateMachine {
    pub fn new(
        identity: PeripheralIdentity,
        scanner: ScanController,
        gatt: Box<dyn GattTransport>,
        status: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        Self {
            identity,
            state: ConnectionState::Idle,
            scanner,
            gatt,
            peripheral: None,
            client_open: false,
            subscription: None,
            status,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        self.peripheral.as_ref()
    }

    /// Notifications are only meaningful once the subscription is acknowledged.
    pub fn is_streaming(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// User intent: connect. While scanning this cancels the scan instead.
    pub fn request_connect(&mut self) {
        match self.state {
            ConnectionState::Idle => self.start_scan(),
            ConnectionState::Scanning => {
                info!("Connect requested while scanning, cancelling scan");
                self.scanner.stop_scan();
                self.transition(ConnectionState::Idle);
            }
            state => debug!("Ignoring connect request in state {}", state),
        }
    }

    /// User intent: disconnect, or abort whatever attempt is in flight.
    pub fn request_disconnect(&mut self) {
        match self.state {
            ConnectionState::Scanning => {
                self.scanner.stop_scan();
                self.transition(ConnectionState::Idle);
            }
            ConnectionState::Connecting => self.abort_connect(),
            ConnectionState::DiscoveringServices
            | ConnectionState::Subscribing
            | ConnectionState::Connected => self.begin_teardown(),
            state => debug!("Ignoring disconnect request in state {}", state),
        }
    }

    /// Tear down unconditionally without waiting for the transport.
    pub fn shutdown(&mut self) {
        info!("Shutting down link from state {}", self.state);
        match self.state {
            ConnectionState::Idle => {}
            ConnectionState::Scanning => {
                self.scanner.stop_scan();
                self.transition(ConnectionState::Idle);
            }
            ConnectionState::Connecting => self.abort_connect(),
            ConnectionState::DiscoveringServices
            | ConnectionState::Subscribing
            | ConnectionState::Connected => {
                self.transition(ConnectionState::Disconnecting);
                if let Err(e) = self.gatt.disconnect() {
                    debug!("Disconnect during shutdown failed: {}", e);
                }
                self.complete_teardown();
            }
            ConnectionState::Disconnecting => self.complete_teardown(),
        }
    }

    pub fn handle_scan(&mut self, event: ScanEvent) {
        let Some(outcome) = self.scanner.handle(event) else {
            return;
        };
        if self.state != ConnectionState::Scanning {
            warn!("Scan outcome {:?} arrived in state {}", outcome, self.state);
            return;
        }

        match outcome {
            ScanOutcome::Matched(handle) => {
                self.emit(StatusEvent::PeripheralFound(handle.clone()));
                self.transition(ConnectionState::Connecting);
                info!("Connecting to Bluetooth device: {}", handle.address);
                let result = self.gatt.connect(&handle);
                self.peripheral = Some(handle);
                match result {
                    Ok(()) => self.client_open = true,
                    Err(e) => self.fail_connect(LinkError::TransportLinkFailure(e.to_string())),
                }
            }
            ScanOutcome::TimedOut(after) => {
                self.emit(StatusEvent::ConnectionFailed(LinkError::ScanTimeout(after)));
                self.transition(ConnectionState::Idle);
            }
            ScanOutcome::Failed(reason) => {
                self.emit(StatusEvent::ConnectionFailed(LinkError::ScanFailed(reason)));
                self.transition(ConnectionState::Idle);
            }
        }
    }

    pub fn handle_transport(&mut self, event: TransportEvent) {
        use ConnectionState::*;

        match (self.state, event) {
            (Connecting, TransportEvent::LinkEstablished) => {
                info!("Link established, discovering services");
                self.transition(DiscoveringServices);
                if let Err(e) = self.gatt.discover_services() {
                    self.fail_link(LinkError::TransportLinkFailure(e.to_string()));
                }
            }
            (Connecting, TransportEvent::LinkFailed(reason)) => {
                self.fail_connect(LinkError::TransportLinkFailure(reason));
            }
            (Connecting, TransportEvent::Disconnected) => {
                self.fail_connect(LinkError::TransportLinkFailure(
                    "link closed while connecting".into(),
                ));
            }
            (DiscoveringServices, TransportEvent::ServicesResolved(services)) => {
                info!("Discovered {} services", services.len());
                self.emit(StatusEvent::ServicesDiscovered);
                self.transition(Subscribing);
                if let Err(err) = self.subscribe(&services) {
                    self.fail_link(err);
                }
            }
            (Subscribing, TransportEvent::DescriptorWritten) => {
                info!("Notifications enabled");
                self.transition(Connected);
                self.emit(StatusEvent::Connected);
            }
            (DiscoveringServices | Subscribing | Connected, TransportEvent::LinkFailed(reason)) => {
                self.fail_link(LinkError::TransportLinkFailure(reason));
            }
            (DiscoveringServices | Subscribing | Connected, TransportEvent::Disconnected) => {
                warn!("Link lost in state {}", self.state);
                if self.state != Connected {
                    self.emit(StatusEvent::ConnectionFailed(
                        LinkError::TransportLinkFailure("link lost".into()),
                    ));
                }
                // The link is already down: nothing to wait for.
                self.transition(Disconnecting);
                self.complete_teardown();
            }
            (Disconnecting, TransportEvent::Disconnected) => self.complete_teardown(),
            (state, event) => debug!("Ignoring {:?} in state {}", event, state),
        }
    }

    fn start_scan(&mut self) {
        self.transition(ConnectionState::Scanning);
        match self.scanner.start_scan(&self.identity, SCAN_TIMEOUT) {
            Ok(_) => self.emit(StatusEvent::ScanStarted),
            Err(e) => {
                error!("Failed to start scan: {}", e);
                self.emit(StatusEvent::ConnectionFailed(LinkError::ScanFailed(
                    e.to_string(),
                )));
                self.transition(ConnectionState::Idle);
            }
        }
    }

    /// Locate the classification characteristic and turn its notifications on.
    fn subscribe(&mut self, services: &[DiscoveredService]) -> Result<(), LinkError> {
        if let Some(existing) = self.subscription {
            debug!("Already subscribed to {}", existing.characteristic);
            return Ok(());
        }

        let identity = self.identity;
        let service = services
            .iter()
            .find(|s| s.uuid == identity.service_id)
            .ok_or(LinkError::ServiceOrCharacteristicMissing(
                MissingAttribute::Service(identity.service_id),
            ))?;
        let characteristic = service
            .characteristics
            .iter()
            .find(|c| c.uuid == identity.characteristic_id)
            .ok_or(LinkError::ServiceOrCharacteristicMissing(
                MissingAttribute::Characteristic(identity.characteristic_id),
            ))?;
        if !characteristic
            .descriptors
            .contains(&identity.notification_descriptor_id)
        {
            return Err(LinkError::ServiceOrCharacteristicMissing(
                MissingAttribute::Descriptor(identity.notification_descriptor_id),
            ));
        }

        let link_failure = |e: crate::error::TransportError| {
            LinkError::TransportLinkFailure(e.to_string())
        };
        self.gatt
            .enable_notifications(service.uuid, characteristic.uuid)
            .map_err(link_failure)?;
        self.gatt
            .write_descriptor(
                service.uuid,
                characteristic.uuid,
                identity.notification_descriptor_id,
                &ENABLE_NOTIFICATION_VALUE,
            )
            .map_err(link_failure)?;

        self.subscription = Some(Subscription {
            service: service.uuid,
            characteristic: characteristic.uuid,
        });
        info!("Subscribed to characteristic {}", characteristic.uuid);
        Ok(())
    }

    /// Failure after the link exists: go through `Disconnecting`.
    fn fail_link(&mut self, err: LinkError) {
        error!("Connection attempt failed: {}", err);
        self.emit(StatusEvent::ConnectionFailed(err));
        self.begin_teardown();
    }

    /// Failure before the link exists: straight back to `Idle`.
    fn fail_connect(&mut self, err: LinkError) {
        error!("Connection failed: {}", err);
        self.emit(StatusEvent::ConnectionFailed(err));
        self.release_client();
        self.peripheral = None;
        self.transition(ConnectionState::Idle);
    }

    fn abort_connect(&mut self) {
        info!("Aborting connection attempt");
        if let Err(e) = self.gatt.disconnect() {
            debug!("Disconnect while connecting failed: {}", e);
        }
        self.release_client();
        self.peripheral = None;
        self.transition(ConnectionState::Idle);
        self.emit(StatusEvent::Disconnected);
    }

    fn begin_teardown(&mut self) {
        self.transition(ConnectionState::Disconnecting);
        if let Err(e) = self.gatt.disconnect() {
            // Nothing left to wait for.
            warn!("Disconnect request failed: {}", e);
            self.complete_teardown();
        }
    }

    fn complete_teardown(&mut self) {
        self.release_client();
        self.subscription = None;
        if let Some(peripheral) = self.peripheral.take() {
            info!("Disconnected from device {}", peripheral.address);
        }
        self.transition(ConnectionState::Idle);
        self.emit(StatusEvent::Disconnected);
    }

    fn release_client(&mut self) {
        if std::mem::take(&mut self.client_open) {
            debug!("Releasing GATT client");
            self.gatt.close();
        }
    }

    fn transition(&mut self, next: ConnectionState) -> bool {
        let from = self.state;
        if !from.can_transition_to(next) {
            error!("Refusing illegal transition {} -> {}", from, next);
            return false;
        }
        info!("Connection state: {} -> {}", from, next);
        self.state = next;
        self.emit(StatusEvent::StateChanged { from, to: next });
        true
    }

    fn emit(&self, event: StatusEvent) {
        let _ = self.status.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{LinkEvent, ScanSessionId};
    use crate::domain::models::{Advertisement, DiscoveredCharacteristic, PeripheralAddress};
    use crate::infrastructure::bluetooth::protocol::{
        CCCD_UUID, CHARACTERISTIC_UUID, PERIPHERAL, SERVICE_UUID,
    };
    use crate::infrastructure::bluetooth::transport::mock::{CallLog, MockGatt, MockRadio, RadioCall};
    use ConnectionState::*;

    struct Harness {
        machine: ConnectionStateMachine,
        calls: CallLog,
        status: mpsc::UnboundedReceiver<StatusEvent>,
        inbound: mpsc::UnboundedReceiver<LinkEvent>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_gatt(MockGatt::default())
        }

        fn with_gatt(mut gatt: MockGatt) -> Self {
            let calls = CallLog::default();
            let (inbound_tx, inbound) = mpsc::unbounded_channel();
            let (status_tx, status) = mpsc::unbounded_channel();
            let radio = MockRadio {
                log: calls.clone(),
                fail_start: false,
            };
            gatt.log = calls.clone();
            let scanner = ScanController::new(Box::new(radio), inbound_tx);
            let machine =
                ConnectionStateMachine::new(PERIPHERAL, scanner, Box::new(gatt), status_tx);
            Self {
                machine,
                calls,
                status,
                inbound,
            }
        }

        fn drain(&mut self) -> Vec<StatusEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.status.try_recv() {
                events.push(event);
            }
            events
        }

        fn states(&mut self) -> Vec<ConnectionState> {
            self.drain()
                .into_iter()
                .filter_map(|e| match e {
                    StatusEvent::StateChanged { to, .. } => Some(to),
                    _ => None,
                })
                .collect()
        }

        fn session(&self) -> ScanSessionId {
            self.calls
                .calls()
                .iter()
                .rev()
                .find_map(|c| match c {
                    RadioCall::StartScan(id, _) => Some(*id),
                    _ => None,
                })
                .expect("no scan started")
        }

        fn advertise(&mut self, session: ScanSessionId) {
            self.machine.handle_scan(ScanEvent::AdvertisementReceived {
                session,
                advertisement: Advertisement {
                    address: PeripheralAddress(0xC0FFEE),
                    local_name: Some("Vibrowtion".into()),
                    service_uuids: vec![SERVICE_UUID],
                    rssi: Some(-48),
                },
            });
        }

        fn connect_fully(&mut self) {
            self.machine.request_connect();
            let session = self.session();
            self.advertise(session);
            self.machine
                .handle_transport(TransportEvent::LinkEstablished);
            self.machine
                .handle_transport(TransportEvent::ServicesResolved(profile()));
            self.machine
                .handle_transport(TransportEvent::DescriptorWritten);
            assert_eq!(self.machine.state(), Connected);
            self.drain();
            self.calls.clear();
        }
    }

    fn profile() -> Vec<DiscoveredService> {
        vec![
            DiscoveredService {
                uuid: Uuid::from_u128(0x1800),
                characteristics: vec![],
            },
            DiscoveredService {
                uuid: SERVICE_UUID,
                characteristics: vec![DiscoveredCharacteristic {
                    uuid: CHARACTERISTIC_UUID,
                    descriptors: vec![CCCD_UUID],
                }],
            },
        ]
    }

    #[tokio::test]
    async fn test_happy_path_walks_every_state() {
        let mut h = Harness::new();
        h.machine.request_connect();
        let session = h.session();
        h.advertise(session);
        h.machine.handle_transport(TransportEvent::LinkEstablished);
        h.machine
            .handle_transport(TransportEvent::ServicesResolved(profile()));
        h.machine.handle_transport(TransportEvent::DescriptorWritten);

        assert_eq!(
            h.states(),
            vec![Scanning, Connecting, DiscoveringServices, Subscribing, Connected]
        );
        assert_eq!(
            h.calls.calls()[1..],
            [
                RadioCall::StopScan,
                RadioCall::Connect(h.machine.peripheral().unwrap().clone()),
                RadioCall::DiscoverServices,
                RadioCall::EnableNotifications(SERVICE_UUID, CHARACTERISTIC_UUID),
                RadioCall::WriteDescriptor(
                    SERVICE_UUID,
                    CHARACTERISTIC_UUID,
                    CCCD_UUID,
                    vec![0x01, 0x00]
                ),
            ]
        );
        assert!(h.machine.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_timeout_returns_to_idle_without_connecting() {
        let mut h = Harness::new();
        h.machine.request_connect();

        let Some(LinkEvent::Scan(timeout)) = h.inbound.recv().await else {
            panic!("expected scan timeout");
        };
        h.machine.handle_scan(timeout);

        let events = h.drain();
        assert!(events.contains(&StatusEvent::ConnectionFailed(LinkError::ScanTimeout(
            SCAN_TIMEOUT
        ))));
        let states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StatusEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![Scanning, Idle]);
        assert_eq!(h.machine.state(), Idle);
        assert!(!h.calls.calls().iter().any(|c| matches!(c, RadioCall::Connect(_))));
    }

    #[tokio::test]
    async fn test_link_lost_while_connected_releases_once() {
        let mut h = Harness::new();
        h.connect_fully();

        h.machine.handle_transport(TransportEvent::Disconnected);
        assert_eq!(h.states(), vec![Disconnecting, Idle]);

        // A duplicate report from the transport must not release twice.
        h.machine.handle_transport(TransportEvent::Disconnected);
        h.machine
            .handle_transport(TransportEvent::LinkFailed("gone".into()));
        assert_eq!(h.machine.state(), Idle);
        assert_eq!(h.calls.count(&RadioCall::Close), 1);
        assert!(h.machine.peripheral().is_none());
    }

    #[tokio::test]
    async fn test_link_failure_while_connected_tears_down() {
        let mut h = Harness::new();
        h.connect_fully();

        h.machine
            .handle_transport(TransportEvent::LinkFailed("GATT_ERROR 133".into()));
        assert_eq!(h.machine.state(), Disconnecting);
        assert_eq!(h.calls.calls(), vec![RadioCall::Disconnect]);

        h.machine.handle_transport(TransportEvent::Disconnected);
        assert_eq!(h.machine.state(), Idle);
        assert_eq!(h.calls.count(&RadioCall::Close), 1);
    }

    #[tokio::test]
    async fn test_user_disconnect_waits_for_teardown() {
        let mut h = Harness::new();
        h.connect_fully();

        h.machine.request_disconnect();
        assert_eq!(h.machine.state(), Disconnecting);
        assert_eq!(h.calls.count(&RadioCall::Close), 0);

        h.machine.handle_transport(TransportEvent::Disconnected);
        let events = h.drain();
        assert_eq!(h.machine.state(), Idle);
        assert_eq!(events.last(), Some(&StatusEvent::Disconnected));
        assert_eq!(
            h.calls.calls(),
            vec![RadioCall::Disconnect, RadioCall::Close]
        );
    }

    #[tokio::test]
    async fn test_failed_disconnect_request_still_releases() {
        let mut h = Harness::with_gatt(MockGatt {
            fail_disconnect: true,
            ..Default::default()
        });
        h.connect_fully();

        h.machine.request_disconnect();
        assert_eq!(h.machine.state(), Idle);
        assert_eq!(h.calls.count(&RadioCall::Close), 1);
    }

    #[tokio::test]
    async fn test_missing_characteristic_is_fatal() {
        let mut h = Harness::new();
        h.machine.request_connect();
        let session = h.session();
        h.advertise(session);
        h.machine.handle_transport(TransportEvent::LinkEstablished);
        h.drain();

        let services = vec![DiscoveredService {
            uuid: SERVICE_UUID,
            characteristics: vec![],
        }];
        h.machine
            .handle_transport(TransportEvent::ServicesResolved(services));

        let events = h.drain();
        assert!(events.contains(&StatusEvent::ConnectionFailed(
            LinkError::ServiceOrCharacteristicMissing(MissingAttribute::Characteristic(
                CHARACTERISTIC_UUID
            ))
        )));
        assert_eq!(h.machine.state(), Disconnecting);
        assert!(!h
            .calls
            .calls()
            .iter()
            .any(|c| matches!(c, RadioCall::EnableNotifications(..))));

        h.machine.handle_transport(TransportEvent::Disconnected);
        assert_eq!(h.machine.state(), Idle);
        assert_eq!(h.calls.count(&RadioCall::Close), 1);
    }

    #[tokio::test]
    async fn test_missing_service_is_fatal() {
        let mut h = Harness::new();
        h.machine.request_connect();
        let session = h.session();
        h.advertise(session);
        h.machine.handle_transport(TransportEvent::LinkEstablished);
        h.drain();

        h.machine
            .handle_transport(TransportEvent::ServicesResolved(vec![]));
        assert!(h.drain().contains(&StatusEvent::ConnectionFailed(
            LinkError::ServiceOrCharacteristicMissing(MissingAttribute::Service(SERVICE_UUID))
        )));
        assert_eq!(h.machine.state(), Disconnecting);
    }

    #[tokio::test]
    async fn test_connect_failure_goes_straight_to_idle() {
        let mut h = Harness::new();
        h.machine.request_connect();
        let session = h.session();
        h.advertise(session);
        h.machine
            .handle_transport(TransportEvent::LinkFailed("timeout".into()));

        assert_eq!(h.states(), vec![Scanning, Connecting, Idle]);
        assert_eq!(h.calls.count(&RadioCall::Close), 1);
        // No automatic retry.
        assert_eq!(
            h.calls
                .calls()
                .iter()
                .filter(|c| matches!(c, RadioCall::StartScan(..)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_synchronous_connect_error_does_not_close() {
        let mut h = Harness::with_gatt(MockGatt {
            fail_connect: true,
            ..Default::default()
        });
        h.machine.request_connect();
        let session = h.session();
        h.advertise(session);

        assert_eq!(h.machine.state(), Idle);
        assert_eq!(h.calls.count(&RadioCall::Close), 0);
    }

    #[tokio::test]
    async fn test_late_match_after_stop_is_ignored() {
        let mut h = Harness::new();
        h.machine.request_connect();
        let session = h.session();
        h.machine.request_disconnect();
        assert_eq!(h.machine.state(), Idle);
        h.drain();

        h.advertise(session);
        assert_eq!(h.machine.state(), Idle);
        assert!(h.drain().is_empty());
        assert!(!h.calls.calls().iter().any(|c| matches!(c, RadioCall::Connect(_))));
    }

    #[tokio::test]
    async fn test_connect_request_toggles_scan_off() {
        let mut h = Harness::new();
        h.machine.request_connect();
        h.machine.request_connect();
        assert_eq!(h.states(), vec![Scanning, Idle]);
        assert_eq!(h.calls.count(&RadioCall::StopScan), 1);
    }

    #[tokio::test]
    async fn test_duplicate_services_resolved_subscribes_once() {
        let mut h = Harness::new();
        h.machine.request_connect();
        let session = h.session();
        h.advertise(session);
        h.machine.handle_transport(TransportEvent::LinkEstablished);
        h.machine
            .handle_transport(TransportEvent::ServicesResolved(profile()));
        h.machine
            .handle_transport(TransportEvent::ServicesResolved(profile()));
        h.machine.handle_transport(TransportEvent::DescriptorWritten);
        h.machine.handle_transport(TransportEvent::DescriptorWritten);

        assert_eq!(h.machine.state(), Connected);
        assert_eq!(
            h.calls.count(&RadioCall::EnableNotifications(
                SERVICE_UUID,
                CHARACTERISTIC_UUID
            )),
            1
        );
    }

    #[tokio::test]
    async fn test_disconnect_while_connecting_aborts() {
        let mut h = Harness::new();
        h.machine.request_connect();
        let session = h.session();
        h.advertise(session);
        h.machine.request_disconnect();

        assert_eq!(h.machine.state(), Idle);
        assert_eq!(h.calls.count(&RadioCall::Close), 1);

        // The transport's late answer for the aborted attempt changes nothing.
        h.machine.handle_transport(TransportEvent::LinkEstablished);
        assert_eq!(h.machine.state(), Idle);
    }

    #[tokio::test]
    async fn test_shutdown_from_connected() {
        let mut h = Harness::new();
        h.connect_fully();
        h.machine.shutdown();

        assert_eq!(h.states(), vec![Disconnecting, Idle]);
        assert_eq!(
            h.calls.calls(),
            vec![RadioCall::Disconnect, RadioCall::Close]
        );
    }

    #[tokio::test]
    async fn test_reconnect_after_teardown() {
        let mut h = Harness::new();
        h.connect_fully();
        h.machine.handle_transport(TransportEvent::Disconnected);
        h.calls.clear();

        h.machine.request_connect();
        assert_eq!(h.machine.state(), Scanning);
        let session = h.session();
        assert_eq!(session, ScanSessionId(2));
        h.advertise(session);
        assert_eq!(h.machine.state(), Connecting);
    }

    #[tokio::test]
    async fn test_scan_start_failure_reports_and_idles() {
        let calls = CallLog::default();
        let (inbound_tx, _inbound) = mpsc::unbounded_channel();
        let (status_tx, mut status) = mpsc::unbounded_channel();
        let radio = MockRadio {
            log: calls.clone(),
            fail_start: true,
        };
        let scanner = ScanController::new(Box::new(radio), inbound_tx);
        let mut machine = ConnectionStateMachine::new(
            PERIPHERAL,
            scanner,
            Box::new(MockGatt::default()),
            status_tx,
        );

        machine.request_connect();
        assert_eq!(machine.state(), Idle);
        let mut failed = false;
        while let Ok(event) = status.try_recv() {
            failed |= matches!(event, StatusEvent::ConnectionFailed(LinkError::ScanFailed(_)));
        }
        assert!(failed);
    }
}
