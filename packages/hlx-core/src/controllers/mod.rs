//! Sub-controllers: one per domain area, each owning a model slice and a
//! block of dispatcher handlers.
//!
//! Every controller follows the same five-step handler algorithm (spec
//! §4.5): verify arity, parse and range-check captures, fetch the model
//! entity, mutate, render. [`context`] holds the pieces of that algorithm
//! shared by all of them.

pub mod configuration;
pub mod context;
pub mod equalizer_presets;
pub mod favorites;
pub mod front_panel;
pub mod groups;
pub mod infrared;
pub mod network;
pub mod sources;
pub mod zones;

pub use configuration::ConfigurationController;
pub use equalizer_presets::EqualizerPresetsController;
pub use favorites::FavoritesController;
pub use front_panel::FrontPanelController;
pub use groups::GroupsController;
pub use infrared::InfraredController;
pub use network::NetworkController;
pub use sources::SourcesController;
pub use zones::ZonesController;
