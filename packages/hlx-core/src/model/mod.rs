//! Typed value objects with validated setters for every domain collection
//!. Collections are dense and 1-based; see [`collection`].

pub mod balance;
pub mod collection;
pub mod crossover;
pub mod equalizer;
pub mod equalizer_preset;
pub mod favorite;
pub mod front_panel;
pub mod group;
pub mod identifier;
pub mod infrared;
pub mod name;
pub mod network;
pub mod sound;
pub mod source;
pub mod tone;
pub mod volume;
pub mod zone;

pub use balance::{Balance, Channel};
pub use collection::IdentifierCollection;
pub use crossover::Crossover;
pub use equalizer::EqualizerBands;
pub use equalizer_preset::{EqualizerPreset, EQUALIZER_PRESET_MAX};
pub use favorite::{Favorite, FAVORITE_MAX};
pub use front_panel::FrontPanel;
pub use group::{Group, GROUP_MAX};
pub use identifier::{Identifier, MutationOutcome};
pub use infrared::Infrared;
pub use name::Name;
pub use network::Network;
pub use sound::SoundMode;
pub use source::{Source, SOURCE_MAX};
pub use tone::Tone;
pub use volume::Volume;
pub use zone::{Zone, ZONE_MAX};
