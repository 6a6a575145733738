//! State-change event system.
//!
//! Every model mutation, whether applied directly by a server-side
//! sub-controller handler or observed by the client from an in-flight
//! response or unsolicited notification, is reported as a typed
//! [`StateChange`] to a single-owner sink, rather than controllers holding
//! delegate pointers to each other.

mod bridge;
mod emitter;

pub use bridge::BroadcastStateChangeBridge;
pub use emitter::{LoggingStateChangeSink, NoopStateChangeSink};

use serde::Serialize;

use crate::model::Identifier;

/// The domain attribute a [`StateChange`] reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StateChangeKind {
    ZoneName,
    ZoneVolume,
    ZoneMute,
    ZoneVolumeFixed,
    ZoneBalance,
    ZoneSource,
    ZoneSoundMode,
    ZoneEqualizerBand,
    ZoneTone,
    ZoneLowpassCrossover,
    ZoneHighpassCrossover,
    GroupName,
    GroupMembership,
    SourceName,
    FavoriteName,
    PresetName,
    PresetBand,
    FrontPanelBrightness,
    FrontPanelLocked,
    Infrared,
    Network,
    ConfigurationDirty,
    ConfigurationSaved,
}

/// One reported mutation: which attribute, which identifier (absent for
/// collection-wide or non-identified attributes like `Network`), and the
/// new value rendered as a display string (the model types themselves are
/// the source of truth; this is a notification payload, not a handle back
/// into the model).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChange {
    pub kind: StateChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
    pub new_value: String,
}

impl StateChange {
    pub fn new(kind: StateChangeKind, identifier: Option<Identifier>, new_value: impl Into<String>) -> Self {
        Self {
            kind,
            identifier,
            new_value: new_value.into(),
        }
    }
}

/// Receives state-change events without knowledge of transport.
pub trait StateChangeSink: Send + Sync {
    fn on_state_change(&self, change: StateChange);
}
