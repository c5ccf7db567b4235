//! Recovery of capture devices visible at the driver level but missing from
//! the server's source list.
//!
//! Some hardware (notably certain USB devices relying on jack detection) is
//! enumerated by the kernel driver yet never shows up as a server source.
//! This module parses the driver-level capture listing (`arecord -l`),
//! diffs it against the server sources by card number, and force-loads a
//! direct hardware capture module to expose the missing device.

use std::collections::HashSet;

use crate::control::{load_module, CommandRunner};
use crate::device::Device;

/// Name prefix for sources this engine force-loads.
pub const FORCED_SOURCE_PREFIX: &str = "lichen_forced_";

/// A hardware capture device from the driver-level listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub card: u32,
    pub device: u32,
    /// Human name from the bracketed part of the listing line.
    pub name: String,
}

impl CaptureDevice {
    /// The `hw:<card>,<device>` handle the driver addresses this device by.
    pub fn hw_name(&self) -> String {
        format!("hw:{},{}", self.card, self.device)
    }
}

/// A capture module this engine force-loaded; lives only as long as the
/// underlying module stays loaded.
#[derive(Debug, Clone)]
pub struct ForcedSource {
    pub module_id: u32,
    pub card: u32,
    pub device: u32,
    pub exposed_source_name: String,
}

/// Parse an `arecord -l` capture listing.
///
/// Grammar: `card <n>: <id> [<name>], device <m>: <id> [<name>]`; anything
/// else (banners, subdevice lines) is skipped.
pub fn parse_capture_listing(output: &str) -> Vec<CaptureDevice> {
    let mut devices = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("card ") else {
            continue;
        };
        let Some((card_text, rest)) = rest.split_once(':') else {
            continue;
        };
        let Ok(card) = card_text.trim().parse() else {
            continue;
        };
        let Some((card_label, rest)) = rest.split_once(", device ") else {
            continue;
        };
        let Some((device_text, _)) = rest.split_once(':') else {
            continue;
        };
        let Ok(device) = device_text.trim().parse() else {
            continue;
        };
        let name = card_label
            .split_once('[')
            .and_then(|(_, tail)| tail.split(']').next())
            .unwrap_or(card_label.trim())
            .to_string();
        devices.push(CaptureDevice { card, device, name });
    }
    devices
}

/// Capture devices the driver reports but the server has no source for,
/// compared by card number against the sources' `alsa.card` property.
pub fn missing_capture_devices(listed: &[CaptureDevice], sources: &[Device]) -> Vec<CaptureDevice> {
    let known: HashSet<u32> = sources.iter().filter_map(|s| s.alsa_card).collect();
    listed
        .iter()
        .filter(|d| !known.contains(&d.card))
        .cloned()
        .collect()
}

/// Force-load a direct hardware capture module for `dev`. `tsched=0` turns
/// off timer-based scheduling, which glitches on the affected USB hardware.
pub fn force_load_device(runner: &dyn CommandRunner, dev: &CaptureDevice) -> Option<ForcedSource> {
    let source_name = format!("{}{}_{}", FORCED_SOURCE_PREFIX, dev.card, dev.device);
    let device_arg = format!("device={}", dev.hw_name());
    let name_arg = format!("source_name={source_name}");
    let props_arg = format!("source_properties=device.description=\"{}\"", dev.name);
    match load_module(
        runner,
        &["module-alsa-source", &device_arg, &name_arg, &props_arg, "tsched=0"],
    ) {
        Ok(module_id) => {
            log::info!(
                "Force-loaded capture device {} as {} (module {})",
                dev.hw_name(),
                source_name,
                module_id
            );
            Some(ForcedSource {
                module_id,
                card: dev.card,
                device: dev.device,
                exposed_source_name: source_name,
            })
        }
        Err(e) => {
            log::warn!("Failed to force-load {}: {}", dev.hw_name(), e);
            None
        }
    }
}
