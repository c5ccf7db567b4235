//! Hearback: routing the mixed microphone input back into the combined
//! output so the user hears their own voice.
//!
//! The feature is one loopback module bridging the input route's internal
//! mixer monitor to the output route's sink. Gain is applied to the
//! loopback's resulting sink-input stream; the module itself is not
//! volume-addressable.

use crate::text;

/// Process-wide hearback state. Volume 0 means disabled and guarantees no
/// loopback module is loaded.
#[derive(Debug, Default)]
pub struct HearbackState {
    pub loopback_module_id: Option<u32>,
    /// Index of the loopback's sink-input stream, resolved lazily from the
    /// live sink-input listing and invalidated whenever the loopback is
    /// destroyed or recreated.
    pub sink_input_index: Option<u32>,
    pub volume_percent: u32,
}

impl HearbackState {
    pub fn enabled(&self) -> bool {
        self.loopback_module_id.is_some()
    }

    /// Forget the loopback and its cached stream index.
    pub fn clear(&mut self) -> Option<u32> {
        self.volume_percent = 0;
        self.sink_input_index = None;
        self.loopback_module_id.take()
    }
}

/// Find the sink-input created by `module_id` in a `pactl list sink-inputs`
/// dump, by matching each block's `Owner Module:` field.
pub fn find_sink_input_for_module(output: &str, module_id: u32) -> Option<u32> {
    for block in text::split_blocks(output, &["Sink Input #"]) {
        let Some(index) = text::header_id(block[0]) else {
            continue;
        };
        let owner = text::field(&block, "Owner Module").and_then(|m| m.parse::<u32>().ok());
        if owner == Some(module_id) {
            return Some(index);
        }
    }
    None
}
