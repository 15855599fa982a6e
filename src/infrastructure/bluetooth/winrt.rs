//! WinRT Radio Adapter
//!
//! Implements the radio seams on top of the Windows Bluetooth LE APIs.
//! All WinRT objects live on one dedicated thread running a current-thread
//! runtime; the core talks to it through a command channel and hears back
//! through the inbound [`LinkEvent`] channel.

use crate::domain::events::{LinkEvent, ScanEvent, ScanSessionId, TransportEvent};
use crate::domain::models::{
    Advertisement, DiscoveredCharacteristic, DiscoveredService, PeripheralAddress,
    PeripheralHandle,
};
use crate::error::TransportError;
use crate::infrastructure::bluetooth::protocol::CCCD_UUID;
use crate::infrastructure::bluetooth::service::RadioParts;
use crate::infrastructure::bluetooth::transport::{GattTransport, ScanRadio};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use windows::core::{Ref, GUID};
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEAdvertisementWatcherStoppedEventArgs, BluetoothLEScanningMode,
};
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCharacteristicProperties,
    GattClientCharacteristicConfigurationDescriptorValue, GattCommunicationStatus,
    GattValueChangedEventArgs,
};
use windows::Devices::Bluetooth::{
    BluetoothAdapter, BluetoothConnectionStatus, BluetoothError, BluetoothLEDevice,
};
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::{DataReader, DataWriter};

fn to_guid(uuid: Uuid) -> GUID {
    GUID::from_u128(uuid.as_u128())
}

fn from_guid(guid: GUID) -> Uuid {
    Uuid::from_u128(guid.to_u128())
}

fn check_status(status: GattCommunicationStatus, what: &str) -> Result<(), TransportError> {
    if status == GattCommunicationStatus::Success {
        Ok(())
    } else {
        Err(TransportError::Request(format!("{what}: {status:?}")))
    }
}

#[derive(Debug)]
enum Command {
    StartScan {
        session: ScanSessionId,
        service_id: Uuid,
    },
    StopScan,
    Connect(u64),
    DiscoverServices,
    EnableNotifications {
        service: Uuid,
        characteristic: Uuid,
    },
    WriteDescriptor {
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        value: Vec<u8>,
    },
    Disconnect,
    Close,
}

/// Spawn the Bluetooth thread and return both radio halves.
///
/// Fails with [`TransportError::Unavailable`] if the host has no Bluetooth LE adapter.
pub fn radio(events: mpsc::UnboundedSender<LinkEvent>) -> Result<RadioParts, TransportError> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = std::sync::mpsc::channel();

    std::thread::Builder::new()
        .name("winrt-bluetooth".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ready_tx.send(Err(TransportError::Request(e.to_string())));
                    return;
                }
            };

            rt.block_on(async move {
                match RadioWorker::open(events).await {
                    Ok(worker) => {
                        let _ = ready_tx.send(Ok(()));
                        worker.run(command_rx).await;
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            });
        })
        .map_err(|e| TransportError::Request(e.to_string()))?;

    ready_rx
        .recv()
        .map_err(|_| TransportError::Unavailable)??;

    Ok((
        Box::new(WinRtScanner {
            commands: command_tx.clone(),
        }),
        Box::new(WinRtGatt {
            commands: command_tx,
        }),
    ))
}

fn submit(commands: &mpsc::UnboundedSender<Command>, command: Command) -> Result<(), TransportError> {
    commands
        .send(command)
        .map_err(|_| TransportError::Request("bluetooth thread stopped".into()))
}

pub struct WinRtScanner {
    commands: mpsc::UnboundedSender<Command>,
}

impl ScanRadio for WinRtScanner {
    fn start_scan(&mut self, session: ScanSessionId, service_id: Uuid) -> Result<(), TransportError> {
        submit(&self.commands, Command::StartScan { session, service_id })
    }

    fn stop_scan(&mut self) -> Result<(), TransportError> {
        submit(&self.commands, Command::StopScan)
    }
}

pub struct WinRtGatt {
    commands: mpsc::UnboundedSender<Command>,
}

impl GattTransport for WinRtGatt {
    fn connect(&mut self, peripheral: &PeripheralHandle) -> Result<(), TransportError> {
        submit(&self.commands, Command::Connect(peripheral.address.0))
    }

    fn discover_services(&mut self) -> Result<(), TransportError> {
        submit(&self.commands, Command::DiscoverServices)
    }

    fn enable_notifications(&mut self, service: Uuid, characteristic: Uuid) -> Result<(), TransportError> {
        submit(
            &self.commands,
            Command::EnableNotifications {
                service,
                characteristic,
            },
        )
    }

    fn write_descriptor(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError> {
        submit(
            &self.commands,
            Command::WriteDescriptor {
                service,
                characteristic,
                descriptor,
                value: value.to_vec(),
            },
        )
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        submit(&self.commands, Command::Disconnect)
    }

    fn close(&mut self) {
        let _ = submit(&self.commands, Command::Close);
    }
}

/// Owns every WinRT object. Runs on the Bluetooth thread only.
struct RadioWorker {
    events: mpsc::UnboundedSender<LinkEvent>,
    watcher: Option<BluetoothLEAdvertisementWatcher>,
    device: Option<BluetoothLEDevice>,
    status_token: Option<i64>,
    characteristics: Vec<(Uuid, GattCharacteristic)>,
    notifying: Option<(GattCharacteristic, i64)>,
}

impl RadioWorker {
    async fn open(events: mpsc::UnboundedSender<LinkEvent>) -> Result<Self, TransportError> {
        let adapter = BluetoothAdapter::GetDefaultAsync()
            .map_err(|_| TransportError::Unavailable)?
            .await
            .map_err(|_| TransportError::Unavailable)?;
        if !adapter.IsLowEnergySupported()? {
            return Err(TransportError::Unavailable);
        }
        info!("Bluetooth LE adapter ready");

        Ok(Self {
            events,
            watcher: None,
            device: None,
            status_token: None,
            characteristics: Vec::new(),
            notifying: None,
        })
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            debug!("Bluetooth command: {:?}", command);
            self.execute(command).await;
        }
        let _ = self.stop_scan();
        self.close();
        info!("Bluetooth thread stopped");
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::StartScan {
                session,
                service_id,
            } => {
                if let Err(e) = self.start_scan(session, service_id) {
                    error!("Failed to start scan: {}", e);
                    self.send(LinkEvent::Scan(ScanEvent::Failed {
                        session,
                        reason: e.to_string(),
                    }));
                }
            }
            Command::StopScan => {
                if let Err(e) = self.stop_scan() {
                    warn!("Failed to stop scan: {}", e);
                }
            }
            Command::Connect(address) => {
                let event = match self.connect(address).await {
                    Ok(()) => TransportEvent::LinkEstablished,
                    Err(e) => TransportEvent::LinkFailed(e.to_string()),
                };
                self.send_transport(event);
            }
            Command::DiscoverServices => {
                let event = match self.discover_services().await {
                    Ok(services) => TransportEvent::ServicesResolved(services),
                    Err(e) => TransportEvent::LinkFailed(e.to_string()),
                };
                self.send_transport(event);
            }
            Command::EnableNotifications {
                service,
                characteristic,
            } => {
                if let Err(e) = self.enable_notifications(service, characteristic) {
                    self.send_transport(TransportEvent::LinkFailed(e.to_string()));
                }
            }
            Command::WriteDescriptor {
                service,
                characteristic,
                descriptor,
                value,
            } => {
                let event = match self
                    .write_descriptor(service, characteristic, descriptor, &value)
                    .await
                {
                    Ok(()) => TransportEvent::DescriptorWritten,
                    Err(e) => TransportEvent::LinkFailed(e.to_string()),
                };
                self.send_transport(event);
            }
            Command::Disconnect => {
                self.disconnect();
                self.send_transport(TransportEvent::Disconnected);
            }
            Command::Close => self.close(),
        }
    }

    fn start_scan(&mut self, session: ScanSessionId, service_id: Uuid) -> Result<(), TransportError> {
        self.stop_scan()?;

        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;
        watcher
            .AdvertisementFilter()?
            .Advertisement()?
            .ServiceUuids()?
            .Append(to_guid(service_id))?;

        let sender = self.events.clone();
        let received = TypedEventHandler::new(
            move |_: Ref<BluetoothLEAdvertisementWatcher>,
                  args: Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let adv = args.Advertisement()?;
                    let service_uuids = adv.ServiceUuids()?;
                    let mut uuids = Vec::new();
                    for i in 0..service_uuids.Size()? {
                        uuids.push(from_guid(service_uuids.GetAt(i)?));
                    }

                    let advertisement = Advertisement {
                        address: PeripheralAddress(args.BluetoothAddress()?),
                        local_name: Some(adv.LocalName()?.to_string()),
                        service_uuids: uuids,
                        rssi: Some(args.RawSignalStrengthInDBm()?),
                    };
                    let _ = sender.send(LinkEvent::Scan(ScanEvent::AdvertisementReceived {
                        session,
                        advertisement,
                    }));
                }
                Ok(())
            },
        );
        watcher.Received(&received)?;

        let sender = self.events.clone();
        let stopped = TypedEventHandler::new(
            move |_: Ref<BluetoothLEAdvertisementWatcher>,
                  args: Ref<BluetoothLEAdvertisementWatcherStoppedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let error = args.Error()?;
                    if error != BluetoothError::Success {
                        let _ = sender.send(LinkEvent::Scan(ScanEvent::Failed {
                            session,
                            reason: format!("{error:?}"),
                        }));
                    }
                }
                Ok(())
            },
        );
        watcher.Stopped(&stopped)?;

        watcher.Start()?;
        self.watcher = Some(watcher);
        Ok(())
    }

    fn stop_scan(&mut self) -> Result<(), TransportError> {
        if let Some(watcher) = self.watcher.take() {
            info!("Stopping BLE advertisement watcher");
            watcher.Stop()?;
        }
        Ok(())
    }

    async fn connect(&mut self, address: u64) -> Result<(), TransportError> {
        // A previous client must never outlive a new attempt.
        self.close();

        let device = BluetoothLEDevice::FromBluetoothAddressAsync(address)?.await?;
        info!("Device opened: {:?}", device.Name()?);

        let sender = self.events.clone();
        let status_handler = TypedEventHandler::new(move |dev: Ref<BluetoothLEDevice>, _| {
            if let Some(dev) = dev.as_ref() {
                if dev.ConnectionStatus()? == BluetoothConnectionStatus::Disconnected {
                    let _ = sender.send(LinkEvent::Transport(TransportEvent::Disconnected));
                }
            }
            Ok(())
        });
        self.status_token = Some(device.ConnectionStatusChanged(&status_handler)?);
        self.device = Some(device);
        Ok(())
    }

    async fn discover_services(&mut self) -> Result<Vec<DiscoveredService>, TransportError> {
        let device = self.device.clone().ok_or(TransportError::NotConnected)?;

        let services_result = device.GetGattServicesAsync()?.await?;
        check_status(services_result.Status()?, "Failed to get GATT services")?;
        let services = {
            let view = services_result.Services()?;
            let mut services = Vec::new();
            for i in 0..view.Size()? {
                services.push(view.GetAt(i)?);
            }
            services
        };

        let mut discovered = Vec::new();
        let mut handles = Vec::new();
        for service in services {
            let service_uuid = from_guid(service.Uuid()?);
            let chars_result = service.GetCharacteristicsAsync()?.await?;
            if chars_result.Status()? != GattCommunicationStatus::Success {
                debug!("Skipping inaccessible service {}", service_uuid);
                discovered.push(DiscoveredService {
                    uuid: service_uuid,
                    characteristics: Vec::new(),
                });
                continue;
            }

            let chars = {
                let view = chars_result.Characteristics()?;
                let mut chars = Vec::new();
                for i in 0..view.Size()? {
                    chars.push(view.GetAt(i)?);
                }
                chars
            };

            let mut characteristics = Vec::new();
            for characteristic in chars {
                let uuid = from_guid(characteristic.Uuid()?);
                let mut descriptors = Vec::new();
                let desc_result = characteristic.GetDescriptorsAsync()?.await?;
                if desc_result.Status()? == GattCommunicationStatus::Success {
                    let view = desc_result.Descriptors()?;
                    for i in 0..view.Size()? {
                        descriptors.push(from_guid(view.GetAt(i)?.Uuid()?));
                    }
                }
                // Windows manages the CCCD itself and may leave it out of the list.
                let props = characteristic.CharacteristicProperties()?;
                if props.0 & GattCharacteristicProperties::Notify.0 != 0
                    && !descriptors.contains(&CCCD_UUID)
                {
                    descriptors.push(CCCD_UUID);
                }

                characteristics.push(DiscoveredCharacteristic { uuid, descriptors });
                handles.push((service_uuid, characteristic));
            }
            discovered.push(DiscoveredService {
                uuid: service_uuid,
                characteristics,
            });
        }

        self.characteristics = handles;
        Ok(discovered)
    }

    fn find_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<GattCharacteristic, TransportError> {
        for (service_uuid, handle) in &self.characteristics {
            if *service_uuid == service && from_guid(handle.Uuid()?) == characteristic {
                return Ok(handle.clone());
            }
        }
        Err(TransportError::Request(format!(
            "characteristic {characteristic} not discovered"
        )))
    }

    fn enable_notifications(&mut self, service: Uuid, characteristic: Uuid) -> Result<(), TransportError> {
        if self.notifying.is_some() {
            debug!("Notifications already routed");
            return Ok(());
        }
        let handle = self.find_characteristic(service, characteristic)?;

        let sender = self.events.clone();
        let handler = TypedEventHandler::new(
            move |_: Ref<GattCharacteristic>, args: Ref<GattValueChangedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let value = args.CharacteristicValue()?;
                    let reader = DataReader::FromBuffer(&value)?;
                    let mut bytes = vec![0u8; reader.UnconsumedBufferLength()? as usize];
                    reader.ReadBytes(&mut bytes)?;
                    let _ = sender.send(LinkEvent::Transport(TransportEvent::Notification(bytes)));
                }
                Ok(())
            },
        );
        let token = handle.ValueChanged(&handler)?;
        self.notifying = Some((handle, token));
        Ok(())
    }

    async fn write_descriptor(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError> {
        let handle = self.find_characteristic(service, characteristic)?;

        if descriptor == CCCD_UUID {
            let status = handle
                .WriteClientCharacteristicConfigurationDescriptorAsync(
                    GattClientCharacteristicConfigurationDescriptorValue::Notify,
                )?
                .await?;
            return check_status(status, "Failed to enable notifications");
        }

        let result = handle
            .GetDescriptorsForUuidAsync(to_guid(descriptor))?
            .await?;
        check_status(result.Status()?, "Failed to get descriptors")?;
        let target = {
            let view = result.Descriptors()?;
            if view.Size()? == 0 {
                return Err(TransportError::Request(format!(
                    "descriptor {descriptor} not found"
                )));
            }
            view.GetAt(0)?
        };

        let writer = DataWriter::new()?;
        writer.WriteBytes(value)?;
        let buffer = writer.DetachBuffer()?;
        let status = target.WriteValueAsync(&buffer)?.await?;
        check_status(status, "Descriptor write failed")
    }

    fn disconnect(&mut self) {
        // Detach the status handler first so closing does not report twice.
        if let (Some(device), Some(token)) = (self.device.as_ref(), self.status_token.take()) {
            let _ = device.RemoveConnectionStatusChanged(token);
        }
        if let Some((handle, token)) = self.notifying.take() {
            let _ = handle.RemoveValueChanged(token);
        }
        if let Some(device) = self.device.as_ref() {
            let _ = device.Close();
        }
    }

    fn close(&mut self) {
        self.disconnect();
        self.characteristics.clear();
        if self.device.take().is_some() {
            info!("GATT client released");
        }
    }

    fn send(&self, event: LinkEvent) {
        let _ = self.events.send(event);
    }

    fn send_transport(&self, event: TransportEvent) {
        self.send(LinkEvent::Transport(event));
    }
}
