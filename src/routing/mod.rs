//! Bluetooth audio route event dispatch
//!
//! Translates platform notifications about headsets, hearing aids and LE audio devices into
//! calls on a [`RouteSink`], which owns the actual device bookkeeping and audio routing.
//! Audio-on notifications are only forwarded while a call is in progress: outside a call
//! other applications may toggle the audio link and the router must not interfere.
//!
//! # Testing with Mocks
//!
//! ```rust,ignore
//! use call_transactions::routing::{EventDispatcher, MockRouteSink, RouteEvent, AudioState};
//!
//! let mut sink = MockRouteSink::new();
//! sink.expect_audio_lost().times(1).return_const(());
//!
//! let dispatcher = EventDispatcher::new(sink);
//! dispatcher.dispatch(&RouteEvent::AudioStateChanged {
//!     device: Some("00:11:22:33:44:55".to_string()),
//!     state: AudioState::AudioDisconnected,
//! });
//! ```

pub mod types;

pub use types::{AudioState, ConnectionState, DeviceKind, RouteEvent};

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Receiver of dispatched route changes
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait RouteSink: Send + Sync {
    fn device_connected(&self, device: &str, kind: DeviceKind);

    fn device_disconnected(&self, device: &str, kind: DeviceKind);

    /// Audio link to `device` is up
    fn audio_on(&self, device: &str);

    /// Audio link went away. `None` when the active device was cleared rather than a
    /// specific link dropping.
    fn audio_lost(&self, device: Option<String>);

    fn active_device_changed(&self, device: Option<String>, kind: DeviceKind);

    /// Ask the platform to use `device` as the LE audio communication device
    fn set_le_audio_communication_device(&self, device: &str) -> bool;

    /// Ask the platform to use the active hearing aid as communication device
    fn set_hearing_aid_communication_device(&self) -> bool;
}

pub struct EventDispatcher<S: RouteSink> {
    sink: S,
    in_call: AtomicBool,
}

impl<S: RouteSink> EventDispatcher<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            in_call: AtomicBool::new(false),
        }
    }

    pub fn set_in_call(&self, in_call: bool) {
        self.in_call.store(in_call, Ordering::Release);
    }

    pub fn is_in_call(&self) -> bool {
        self.in_call.load(Ordering::Acquire)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn dispatch(&self, event: &RouteEvent) {
        match event {
            RouteEvent::ConnectionStateChanged {
                kind,
                device,
                state,
            } => self.on_connection_state(*kind, device.as_deref(), *state),
            RouteEvent::AudioStateChanged { device, state } => {
                self.on_audio_state(device.as_deref(), *state)
            }
            RouteEvent::ActiveDeviceChanged { kind, device } => {
                self.on_active_device(*kind, device.as_deref())
            }
        }
    }

    fn on_connection_state(&self, kind: DeviceKind, device: Option<&str>, state: ConnectionState) {
        let Some(device) = device else {
            warn!(kind = %kind, "Connection state change without a device; ignoring");
            return;
        };

        info!(kind = %kind, device = %device, state = ?state, "Device connection state changed");
        match state {
            ConnectionState::Connected => self.sink.device_connected(device, kind),
            ConnectionState::Disconnected | ConnectionState::Disconnecting => {
                self.sink.device_disconnected(device, kind)
            }
            ConnectionState::Connecting => {}
        }
    }

    fn on_audio_state(&self, device: Option<&str>, state: AudioState) {
        let Some(device) = device else {
            warn!("Audio state change without a device; ignoring");
            return;
        };

        info!(device = %device, state = ?state, "Device audio state changed");
        match state {
            AudioState::AudioConnected => {
                if !self.is_in_call() {
                    info!(device = %device, "Ignoring audio on outside a call");
                    return;
                }
                self.sink.audio_on(device);
            }
            AudioState::AudioDisconnected => self.sink.audio_lost(Some(device.to_string())),
        }
    }

    fn on_active_device(&self, kind: DeviceKind, device: Option<&str>) {
        info!(kind = %kind, device = ?device, "Active device changed");
        self.sink
            .active_device_changed(device.map(str::to_string), kind);

        if !kind.activates_audio() {
            return;
        }

        let Some(device) = device else {
            self.sink.audio_lost(None);
            return;
        };

        if !self.is_in_call() {
            info!(device = %device, "Ignoring audio on outside a call");
            return;
        }

        match kind {
            // The sink reports audio on by itself once the LE device is adopted
            DeviceKind::LeAudio => {
                if !self.sink.set_le_audio_communication_device(device) {
                    warn!(device = %device, "Device cannot be used as LE audio communication device");
                }
            }
            DeviceKind::HearingAid => {
                if self.sink.set_hearing_aid_communication_device() {
                    self.sink.audio_on(device);
                } else {
                    warn!(device = %device, "Device cannot be used as hearing aid communication device");
                }
            }
            DeviceKind::Headset => {}
        }
    }
}
