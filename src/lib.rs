//! lichen_audio orchestrates virtual audio routing on top of a
//! PipeWire/PulseAudio server, driving everything through the `pactl`
//! command-line utility.
//!
//! Two route shapes are supported: combined outputs (one virtual sink
//! fanning out to several speakers) and mixed inputs (several microphones
//! merged into one virtual capture device). On top of those sit hearback
//! (hearing your own mixed microphones through the combined output),
//! device volume persistence, startup recovery of routes left over from a
//! previous session, and force-loading of capture hardware the server
//! failed to enumerate.
//!
//! [`manager::AudioManager`] is the entry point; everything else is the
//! machinery behind it.

pub mod alsa;
pub mod control;
pub mod device;
pub mod error;
pub mod hearback;
pub mod manager;
pub mod modules;
pub mod route;
pub mod settings;
mod text;

pub use alsa::{CaptureDevice, ForcedSource};
pub use control::{CommandOutput, CommandRunner, FakeRunner, SystemRunner, FULL_VOLUME};
pub use device::{Device, DeviceKind, DeviceState};
pub use error::RouteError;
pub use manager::{AudioManager, ListenerId};
pub use route::{Route, RouteKind};
pub use settings::{JsonSettingsStore, MemoryStore, Settings, SettingsStore};
