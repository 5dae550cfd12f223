use serde::{Deserialize, Serialize};
use std::fmt;

/// Bluetooth profile a route event originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Headset,
    HearingAid,
    LeAudio,
}

impl DeviceKind {
    /// Hearing aids and LE audio devices carry audio as soon as they become active
    pub fn activates_audio(&self) -> bool {
        matches!(self, DeviceKind::HearingAid | DeviceKind::LeAudio)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceKind::Headset => "headset",
            DeviceKind::HearingAid => "hearing aid",
            DeviceKind::LeAudio => "le audio",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioState {
    AudioConnected,
    AudioDisconnected,
}

/// Platform notification about a Bluetooth audio device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteEvent {
    ConnectionStateChanged {
        kind: DeviceKind,
        device: Option<String>,
        state: ConnectionState,
    },
    AudioStateChanged {
        device: Option<String>,
        state: AudioState,
    },
    /// `device: None` means the active device for `kind` was cleared
    ActiveDeviceChanged {
        kind: DeviceKind,
        device: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_activating_kinds() {
        assert!(!DeviceKind::Headset.activates_audio());
        assert!(DeviceKind::HearingAid.activates_audio());
        assert!(DeviceKind::LeAudio.activates_audio());
        assert_eq!(DeviceKind::LeAudio.to_string(), "le audio");
    }
}
