//! Device inventory parsing for the server's sink and source listings.
//!
//! Grammar (`pactl list sinks` / `pactl list sources`): each object starts
//! with a `Sink #<n>` or `Source #<n>` header at column zero, followed by
//! one-tab-indented `Name:` / `Description:` / `State:` fields and
//! two-tab-indented properties. A block missing its number or `Name:` is
//! discarded. The `short` variants are one object per line with the name in
//! the second tab-separated column.

use crate::text;

/// Whether a device plays audio or captures it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Sink,
    Source,
}

/// Server-reported device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    Running,
    Idle,
    Suspended,
    #[default]
    Unknown,
}

impl DeviceState {
    fn parse(text: &str) -> Self {
        match text {
            "RUNNING" => Self::Running,
            "IDLE" => Self::Idle,
            "SUSPENDED" => Self::Suspended,
            _ => Self::Unknown,
        }
    }
}

/// One server-level audio endpoint. Produced fresh on every inventory
/// refresh and never mutated in place.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: u32,
    /// Server-assigned unique handle.
    pub name: String,
    /// Human label; falls back to the name when the server omits it.
    pub description: String,
    pub state: DeviceState,
    pub kind: DeviceKind,
    /// The `alsa.card` property when present. ALSA recovery compares this
    /// against the driver-level card list.
    pub alsa_card: Option<u32>,
}

/// Parse a full sink or source listing into devices.
pub fn parse_listing(output: &str, kind: DeviceKind) -> Vec<Device> {
    let mut devices = Vec::new();
    for block in text::split_blocks(output, &["Sink #", "Source #"]) {
        let Some(id) = text::header_id(block[0]) else {
            continue;
        };
        let Some(name) = text::field(&block, "Name") else {
            continue;
        };
        let description = text::field(&block, "Description").unwrap_or(name);
        let state = text::field(&block, "State")
            .map(DeviceState::parse)
            .unwrap_or_default();
        let alsa_card = text::property(&block, "alsa.card").and_then(|c| c.parse().ok());
        devices.push(Device {
            id,
            name: name.to_string(),
            description: description.to_string(),
            state,
            kind,
            alsa_card,
        });
    }
    devices
}

/// Parse a `pactl list ... short` dump into the name column. Unlike the
/// full inventory this includes monitor sources, which the orphan sweeper
/// needs to check loopback endpoints against.
pub fn parse_short_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
