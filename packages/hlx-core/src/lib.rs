//! HLX Core - protocol engine and domain model for the HLX multi-zone
//! audio matrix control system.
//!
//! This crate is used by both the standalone server (`hlx-server`) and the
//! interactive client (`hlx-client`). Platform I/O (TCP/serial sockets,
//! the backup document's filesystem location) lives at the edges; the
//! domain model, wire protocol, and dispatch engine here have no knowledge
//! of either.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`model`]: validated value types for every domain collection (zones,
//!   sources, groups, favorites, equalizer presets, front panel, infrared,
//!   network) plus the shared [`model::IdentifierCollection`]
//! - [`protocol`]: the bracketed wire format - frame accumulation
//!   ([`protocol::FrameAccumulator`]) and the request/response catalog
//!   ([`protocol::recognize`], [`protocol::Verb`])
//! - [`connection`]: the opaque per-peer write-sink abstraction handlers
//!   and the exchange manager depend on
//! - [`dispatch`]: server-side verb-to-handler routing
//!   ([`dispatch::Dispatcher`]) and client-side request/response
//!   correlation ([`dispatch::ExchangeManager`])
//! - [`controllers`]: one sub-controller per domain area, each owning a
//!   model slice and its block of dispatcher handlers
//! - [`events`]: typed state-change notifications from sub-controller to
//!   application
//! - [`app`]: the composition root wiring controllers, dispatcher, backup
//!   storage, and a TCP transport together
//! - [`runtime`]: task spawning abstraction for async runtime independence
//! - [`error`]: the crate-wide error type
//!
//! # Abstraction Traits
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks
//! - [`connection::Connection`]: a peer connection as an opaque write-sink
//! - [`events::StateChangeSink`]: receiving domain state-change events
//!
//! Each trait has a production implementation ([`runtime::TokioSpawner`],
//! [`app::tcp::TcpConnection`]) and an in-memory one used by tests.

#![warn(clippy::all)]

pub mod app;
pub mod connection;
pub mod controllers;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod model;
pub mod protocol;
pub mod runtime;
pub mod utils;

// Re-export commonly used types at the crate root
pub use app::{bootstrap_services, BootstrappedServices};
pub use connection::{Connection, ConnectionId};
pub use controllers::{
    ConfigurationController, EqualizerPresetsController, FavoritesController, FrontPanelController,
    GroupsController, InfraredController, NetworkController, SourcesController, ZonesController,
};
pub use dispatch::{Dispatcher, ExchangeManager, Handler, Notification};
pub use error::{ErrorCode, HlxError, HlxResult};
pub use events::{BroadcastStateChangeBridge, StateChange, StateChangeKind, StateChangeSink};
pub use protocol::{render_frame, FrameAccumulator, Matched, Verb, MAX_FRAME_LEN};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use utils::now_millis;
