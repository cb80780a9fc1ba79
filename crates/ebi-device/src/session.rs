//! Device session: the stateful side of the protocol.

use std::time::{Duration, Instant};

use ebi_protocol::*;
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::error::*;
use crate::guard::TimeoutGuard;
use crate::metrics::metric_defs;
use crate::serial::SerialTransport;
use crate::transport::Transport;

// ============================================================================
// Cached State
// ============================================================================

/// What the session knows about the module.
///
/// Fields change only on confirmed, well-formed responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleState {
    /// Link protocol implemented by the firmware.
    pub link_protocol: LinkProtocol,
    /// Module model.
    pub module_model: ModuleModel,
    /// Module UUID.
    pub uuid: Vec<u8>,
    /// Firmware version.
    pub firmware_version: FirmwareVersion,
    /// Last known operating state.
    pub operational_state: DeviceState,
    /// Last network preference read or written.
    pub preference: Option<NetworkPreference>,
}

impl Default for ModuleState {
    fn default() -> Self {
        ModuleState {
            link_protocol: LinkProtocol::Unknown(0x00),
            module_model: ModuleModel::Unknown(0x00),
            uuid: Vec::new(),
            firmware_version: FirmwareVersion::default(),
            operational_state: DeviceState::Booting,
            preference: None,
        }
    }
}

impl ModuleState {
    fn apply_info(&mut self, info: &DeviceInfo) {
        self.link_protocol = info.protocol;
        self.module_model = info.module;
        self.uuid = info.uuid.clone();
    }

    fn apply_firmware(&mut self, version: &FirmwareVersion) {
        self.firmware_version = version.clone();
    }

    fn apply_operational(&mut self, state: DeviceState) {
        if self.operational_state != state {
            debug!(from = %self.operational_state, to = %state, "operational state changed");
        }
        self.operational_state = state;
    }

    fn apply_preference(&mut self, preference: NetworkPreference) {
        self.preference = Some(preference);
    }
}

// ============================================================================
// Framed Exchange
// ============================================================================

/// Read one frame and return its payload.
///
/// `Ok(None)` means the length field did not arrive before the read timed
/// out. A frame that starts but does not complete is a [`ProtocolError::Truncated`].
pub fn read_frame<T: Transport + ?Sized>(transport: &mut T) -> DeviceResult<Option<Vec<u8>>> {
    let mut header = [0u8; LENGTH_FIELD_SIZE];
    let n = transport.read_full(&mut header)?;
    if n < LENGTH_FIELD_SIZE {
        if n > 0 {
            trace!("dropped {} byte(s) of an incomplete length field", n);
        }
        return Ok(None);
    }

    let len = FrameCodec::declared_len(header)?;
    let mut frame = vec![0u8; len];
    frame[..LENGTH_FIELD_SIZE].copy_from_slice(&header);
    let n = transport.read_full(&mut frame[LENGTH_FIELD_SIZE..])?;
    if n < len - LENGTH_FIELD_SIZE {
        return Err(ProtocolError::Truncated {
            expected: len,
            actual: LENGTH_FIELD_SIZE + n,
        }
        .into());
    }

    trace!("ans <- {}", to_colon_hex(&frame));
    let payload = FrameCodec::decode(&frame)?;
    metrics::counter!(metric_defs::FRAMES_RECEIVED.name).increment(1);
    Ok(Some(payload))
}

/// Write `command` and decode its response.
pub fn exchange<T: Transport + ?Sized>(transport: &mut T, command: &Command) -> DeviceResult<Response> {
    let frame = FrameCodec::encode(&command.encode());
    trace!("cmd -> {}", to_colon_hex(&frame));

    let started = Instant::now();
    transport.write_all(&frame)?;
    metrics::counter!(metric_defs::FRAMES_SENT.name).increment(1);

    let payload = read_frame(transport)?.ok_or(DeviceError::NoResponse {
        opcode: command.code(),
    })?;
    let response = Response::decode_payload(command, &payload)?;
    metrics::histogram!(metric_defs::EXCHANGE_DURATION.name)
        .record(started.elapsed().as_secs_f64() * 1000.0);
    Ok(response)
}

/// Reset, then wait for the boot notification under `boot_timeout`.
fn reset_exchange<T: Transport + ?Sized>(
    transport: &mut T,
    boot_timeout: Duration,
) -> DeviceResult<ResetReport> {
    let status = expect_status(exchange(transport, &Command::Reset)?)?;

    let mut guard = TimeoutGuard::new(transport, Some(boot_timeout))?;
    let payload = read_frame(&mut *guard)?.ok_or(DeviceError::NoResponse {
        opcode: NOTIFY_DEVICE_STATE,
    })?;
    let boot_state = decode_boot_state(&payload)?;

    Ok(ResetReport { status, boot_state })
}

fn expect_status(response: Response) -> DeviceResult<Status> {
    match response.status() {
        Some(status) => Ok(status),
        None => Err(DeviceError::UnexpectedResponse(Box::new(response))),
    }
}

/// Pull one variant out of a response or fail with `UnexpectedResponse`.
macro_rules! expect_response {
    ($response:expr, $variant:ident) => {
        match $response {
            Response::$variant(value) => Ok(value),
            other => Err(DeviceError::UnexpectedResponse(Box::new(other))),
        }
    };
}

// ============================================================================
// Session
// ============================================================================

/// A session with one module over an exclusively owned transport.
///
/// Dropping the session drops (and so closes) the transport.
#[derive(Debug)]
pub struct DeviceSession<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: ModuleState,
    desynchronized: bool,
}

impl DeviceSession<SerialTransport> {
    /// Open the serial port at `path` and run the identity handshake.
    pub fn connect(path: &str, config: SessionConfig) -> DeviceResult<Self> {
        let transport = SerialTransport::open(path, config.baud_rate, Some(config.timeout()))?;
        Self::open(transport, config)
    }
}

impl<T: Transport> DeviceSession<T> {
    /// Take ownership of `transport` and query device info, device state and
    /// firmware version.
    ///
    /// On failure the transport is dropped with the partially built session.
    pub fn open(mut transport: T, config: SessionConfig) -> DeviceResult<Self> {
        transport.set_timeout(Some(config.timeout()))?;
        let mut session = DeviceSession {
            transport,
            config,
            state: ModuleState::default(),
            desynchronized: false,
        };
        session.handshake()?;
        Ok(session)
    }

    fn handshake(&mut self) -> DeviceResult<()> {
        let info = self.device_info()?;
        let state = self.device_state()?;
        let version = self.firmware_version()?;
        debug!(
            protocol = %info.protocol,
            module = %info.module,
            uuid = %info.uuid_hex(),
            state = %state,
            firmware = %version,
            "module identified"
        );
        Ok(())
    }

    /// Cached module state.
    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    ///
    /// Writing through it desynchronizes the byte stream from the session.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Close the session and hand the transport back.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Whether an earlier fault has left the stream misaligned.
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    /// Drop pending input and repeat the identity handshake.
    pub fn resync(&mut self) -> DeviceResult<()> {
        self.transport.discard_input()?;
        self.desynchronized = false;
        debug!("resynchronizing");
        self.handshake()
    }

    fn ensure_synchronized(&self) -> DeviceResult<()> {
        if self.desynchronized {
            return Err(DeviceError::Desynchronized);
        }
        Ok(())
    }

    /// Record a fault; faults that misalign the stream desynchronize the session.
    fn track<R>(&mut self, result: DeviceResult<R>) -> DeviceResult<R> {
        if let Err(e) = &result {
            metrics::counter!(metric_defs::PROTOCOL_FAULTS.name, "kind" => e.kind()).increment(1);
            if e.is_desync() {
                warn!("session desynchronized: {}", e);
                self.desynchronized = true;
            }
        }
        result
    }

    fn request(&mut self, command: &Command) -> DeviceResult<Response> {
        self.ensure_synchronized()?;
        command.validate()?;
        let result = exchange(&mut self.transport, command);
        self.track(result)
    }

    fn request_status(&mut self, command: &Command) -> DeviceResult<Status> {
        let status = expect_status(self.request(command)?)?;
        if !status.is_success() {
            debug!(opcode = command.code(), %status, "module declined request");
        }
        Ok(status)
    }

    // ------------------------------------------------------------------------
    // Identity and state
    // ------------------------------------------------------------------------

    /// Query link protocol, module model and UUID.
    pub fn device_info(&mut self) -> DeviceResult<DeviceInfo> {
        let info = expect_response!(self.request(&Command::DeviceInfo)?, DeviceInfo)?;
        self.state.apply_info(&info);
        Ok(info)
    }

    /// Query the operating state.
    pub fn device_state(&mut self) -> DeviceResult<DeviceState> {
        let state = expect_response!(self.request(&Command::DeviceState)?, DeviceState)?;
        self.state.apply_operational(state);
        Ok(state)
    }

    /// Query the firmware version.
    pub fn firmware_version(&mut self) -> DeviceResult<FirmwareVersion> {
        let version = expect_response!(self.request(&Command::FirmwareVersion)?, FirmwareVersion)?;
        self.state.apply_firmware(&version);
        Ok(version)
    }

    /// Reset the module and wait for its boot notification.
    ///
    /// The boot notification is read under the reset timeout; the ambient
    /// timeout is back in place when this returns, whatever the outcome.
    pub fn reset(&mut self) -> DeviceResult<ResetReport> {
        self.ensure_synchronized()?;
        debug!("resetting module");
        let result = reset_exchange(&mut self.transport, self.config.reset_timeout());
        let report = self.track(result)?;
        self.state.apply_operational(report.boot_state);
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Radio settings
    // ------------------------------------------------------------------------

    /// Read the output power in dBm.
    pub fn output_power(&mut self) -> DeviceResult<i8> {
        expect_response!(self.request(&Command::OutputPower { power: None })?, OutputPower)
    }

    /// Set the output power in dBm.
    pub fn set_output_power(&mut self, power: i8) -> DeviceResult<Status> {
        self.request_status(&Command::OutputPower { power: Some(power) })
    }

    /// Read the operating channel.
    pub fn operating_channel(&mut self) -> DeviceResult<LoraChannel> {
        expect_response!(
            self.request(&Command::OperatingChannel { params: None })?,
            OperatingChannel
        )
    }

    /// Set channel and modulation; every field must be a listed code.
    pub fn set_operating_channel(&mut self, params: RadioParameters) -> DeviceResult<Status> {
        self.request_status(&Command::OperatingChannel {
            params: Some(params),
        })
    }

    /// Read the energy save policy.
    pub fn energy_save(&mut self) -> DeviceResult<SleepPolicy> {
        expect_response!(self.request(&Command::EnergySave { policy: None })?, EnergySave)
    }

    /// Set the energy save policy.
    pub fn set_energy_save(&mut self, policy: SleepPolicy) -> DeviceResult<Status> {
        self.request_status(&Command::EnergySave {
            policy: Some(policy),
        })
    }

    // ------------------------------------------------------------------------
    // Network settings
    // ------------------------------------------------------------------------

    /// Read the network address.
    pub fn network_address(&mut self) -> DeviceResult<Vec<u8>> {
        expect_response!(
            self.request(&Command::NetworkAddress { address: None })?,
            NetworkAddress
        )
    }

    /// Set the network address (2 or 4 bytes).
    pub fn set_network_address(&mut self, address: &[u8]) -> DeviceResult<Status> {
        self.request_status(&Command::NetworkAddress {
            address: Some(address.to_vec()),
        })
    }

    /// Read the network identifier.
    pub fn network_identifier(&mut self) -> DeviceResult<Vec<u8>> {
        expect_response!(
            self.request(&Command::NetworkIdentifier { identifier: None })?,
            NetworkIdentifier
        )
    }

    /// Set the network identifier (2 or 4 bytes).
    pub fn set_network_identifier(&mut self, identifier: &[u8]) -> DeviceResult<Status> {
        self.request_status(&Command::NetworkIdentifier {
            identifier: Some(identifier.to_vec()),
        })
    }

    /// Read the network preference and cache it.
    pub fn network_preference(&mut self) -> DeviceResult<NetworkPreference> {
        let preference = expect_response!(
            self.request(&Command::NetworkPreference { preference: None })?,
            NetworkPreference
        )?;
        self.state.apply_preference(preference);
        Ok(preference)
    }

    /// Set the network preference; cached once the module accepts it.
    pub fn set_network_preference(&mut self, preference: NetworkPreference) -> DeviceResult<Status> {
        let status = self.request_status(&Command::NetworkPreference {
            preference: Some(preference),
        })?;
        if status.is_success() {
            self.state.apply_preference(preference);
        }
        Ok(status)
    }

    /// Read the IEEE address.
    pub fn ieee_address(&mut self) -> DeviceResult<Vec<u8>> {
        expect_response!(
            self.request(&Command::IeeeAddress { address: None })?,
            IeeeAddress
        )
    }

    /// Set the IEEE address.
    pub fn set_ieee_address(&mut self, address: [u8; IEEE_ADDRESS_SIZE]) -> DeviceResult<Status> {
        self.request_status(&Command::IeeeAddress {
            address: Some(address),
        })
    }

    // ------------------------------------------------------------------------
    // Network control and data
    // ------------------------------------------------------------------------

    /// Leave the network; marks the module offline on success.
    pub fn network_stop(&mut self) -> DeviceResult<Status> {
        let status = self.request_status(&Command::NetworkStop)?;
        if status.is_success() {
            self.state.apply_operational(DeviceState::Offline);
        }
        Ok(status)
    }

    /// Join the network under the network start timeout; marks the module
    /// online on success.
    pub fn network_start(&mut self) -> DeviceResult<Status> {
        self.ensure_synchronized()?;
        let timeout = self.config.network_start_timeout();
        let result = {
            let mut guard = TimeoutGuard::new(&mut self.transport, Some(timeout))?;
            exchange(&mut *guard, &Command::NetworkStart)
        };
        let status = expect_status(self.track(result)?)?;
        if status.is_success() {
            self.state.apply_operational(DeviceState::Online);
        } else {
            debug!(%status, "network start declined");
        }
        Ok(status)
    }

    /// Send `payload` to `target`.
    pub fn send_data(&mut self, payload: &[u8], target: SendTarget) -> DeviceResult<SendReport> {
        let command = Command::SendData {
            target,
            payload: payload.to_vec(),
        };
        expect_response!(self.request(&command)?, Sent)
    }

    /// Wait for a received-data notification.
    ///
    /// `timeout` replaces the ambient timeout for this call only; `None`
    /// blocks until a frame arrives. Returns `Ok(None)` when nothing arrived.
    pub fn receive(
        &mut self,
        protocol: NetworkProtocol,
        timeout: Option<Duration>,
    ) -> DeviceResult<Option<NetworkPacket>> {
        let Some(payload) = self.read_unsolicited(timeout)? else {
            return Ok(None);
        };
        let result = decode_received(&payload, protocol).map_err(DeviceError::from);
        self.track(result).map(Some)
    }

    /// Wait for any notification: received data or a boot announcement.
    ///
    /// A boot announcement updates the cached operating state.
    pub fn listen(
        &mut self,
        protocol: NetworkProtocol,
        timeout: Option<Duration>,
    ) -> DeviceResult<Option<Notification>> {
        let Some(payload) = self.read_unsolicited(timeout)? else {
            return Ok(None);
        };
        let result = Notification::decode(&payload, protocol).map_err(DeviceError::from);
        let notification = self.track(result)?;
        if let Notification::DeviceState(state) = &notification {
            warn!(%state, "module announced a boot");
            self.state.apply_operational(*state);
        }
        Ok(Some(notification))
    }

    fn read_unsolicited(&mut self, timeout: Option<Duration>) -> DeviceResult<Option<Vec<u8>>> {
        self.ensure_synchronized()?;
        let result = {
            let mut guard = TimeoutGuard::new(&mut self.transport, timeout)?;
            read_frame(&mut *guard)
        };
        let payload = self.track(result)?;
        if payload.is_none() {
            metrics::counter!(metric_defs::RECEIVE_TIMEOUTS.name).increment(1);
        }
        Ok(payload)
    }
}
