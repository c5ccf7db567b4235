//! Module graph parsing: indexes the server's loaded modules by role.
//!
//! The index is keyed by what a module does and what it attaches to, not by
//! raw device name, so a sink named X and a loopback targeting sink X never
//! collide:
//!
//! - `module-combine-sink` / `module-null-sink` -> the `sink_name` argument
//! - `module-loopback`                          -> `sink=<destination>`
//! - `module-remap-source`                      -> `remap-source=<source_name>`
//!
//! The index is recomputed on demand and never cached across calls; module
//! ids change whenever the server state does.

use std::collections::HashMap;

use crate::text;

/// Role-key prefix for loopback modules, keyed by destination sink.
pub const LOOPBACK_KEY: &str = "sink=";
/// Role-key prefix for remap-source modules, keyed by the exposed name.
pub const REMAP_KEY: &str = "remap-source=";

/// Endpoint detail for one loaded loopback. The orphan sweeper needs both
/// ends, which the role map alone does not carry.
#[derive(Debug, Clone)]
pub struct LoopbackInfo {
    pub module_id: u32,
    pub source: Option<String>,
    pub sink: Option<String>,
}

/// Semantic index over the currently loaded modules.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    by_role: HashMap<String, Vec<u32>>,
    loopbacks: Vec<LoopbackInfo>,
}

impl ModuleIndex {
    /// Module ids registered under a role key, empty when none.
    pub fn modules_for(&self, key: &str) -> &[u32] {
        self.by_role.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All role keys with the given prefix.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.by_role
            .keys()
            .filter_map(move |k| k.starts_with(prefix).then_some(k.as_str()))
    }

    pub fn loopbacks(&self) -> &[LoopbackInfo] {
        &self.loopbacks
    }

    fn register(&mut self, key: String, module_id: u32) {
        self.by_role.entry(key).or_default().push(module_id);
    }
}

/// Extract the value of a `<key>=<value>` module argument. Values this
/// engine cares about (names) never contain whitespace; the key must sit at
/// the start of the string or after whitespace so `name=` cannot match
/// inside `sink_name=`.
pub(crate) fn arg_value<'a>(args: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("{key}=");
    let mut search = args;
    let mut offset = 0;
    loop {
        let pos = search.find(&pattern)?;
        let absolute = offset + pos;
        let at_boundary =
            absolute == 0 || args.as_bytes()[absolute - 1].is_ascii_whitespace();
        let after = &search[pos + pattern.len()..];
        if at_boundary {
            return after.split_whitespace().next();
        }
        offset += pos + pattern.len();
        search = after;
    }
}

/// Parse a `pactl list modules` dump. Unrecognized module types are ignored
/// so unknown modules never block parsing of known ones.
pub fn parse_modules(output: &str) -> ModuleIndex {
    let mut index = ModuleIndex::default();
    for block in text::split_blocks(output, &["Module #"]) {
        let Some(id) = text::header_id(block[0]) else {
            continue;
        };
        let Some(name) = text::field(&block, "Name") else {
            continue;
        };
        let args = text::field(&block, "Argument").unwrap_or("");
        match name {
            "module-combine-sink" | "module-null-sink" => {
                if let Some(sink_name) = arg_value(args, "sink_name") {
                    index.register(sink_name.to_string(), id);
                }
            }
            "module-loopback" => {
                let source = arg_value(args, "source").map(str::to_string);
                let sink = arg_value(args, "sink").map(str::to_string);
                if let Some(sink_name) = &sink {
                    index.register(format!("{LOOPBACK_KEY}{sink_name}"), id);
                }
                index.loopbacks.push(LoopbackInfo {
                    module_id: id,
                    source,
                    sink,
                });
            }
            "module-remap-source" => {
                if let Some(source_name) = arg_value(args, "source_name") {
                    index.register(format!("{REMAP_KEY}{source_name}"), id);
                }
            }
            _ => {}
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULES: &str = "Module #23\n\
        \tName: module-combine-sink\n\
        \tArgument: sink_name=lichen_output_1 slaves=alpha,beta sink_properties=device.description=\"mix\"\n\
        Module #24\n\
        \tName: module-null-sink\n\
        \tArgument: sink_name=lichen_input_1_null sink_properties=device.description=\"LichenInternal\" device.class=\"filter\"\n\
        Module #25\n\
        \tName: module-loopback\n\
        \tArgument: source=mic1 sink=lichen_input_1_null latency_msec=1\n\
        Module #26\n\
        \tName: module-loopback\n\
        \tArgument: source=mic2 sink=lichen_input_1_null latency_msec=1\n\
        Module #27\n\
        \tName: module-remap-source\n\
        \tArgument: source_name=lichen_input_1_mic master=lichen_input_1_null.monitor source_properties=device.description=\"mix\"\n\
        Module #28\n\
        \tName: module-mystery-dsp\n\
        \tArgument: whatever=1\n";

    #[test]
    fn test_parse_modules_role_keys() {
        let index = parse_modules(MODULES);
        assert_eq!(index.modules_for("lichen_output_1"), &[23]);
        assert_eq!(index.modules_for("lichen_input_1_null"), &[24]);
        assert_eq!(index.modules_for("sink=lichen_input_1_null"), &[25, 26]);
        assert_eq!(index.modules_for("remap-source=lichen_input_1_mic"), &[27]);
        // Unknown module types are ignored, not errors
        assert!(index.modules_for("whatever").is_empty());
    }

    #[test]
    fn test_parse_modules_loopback_endpoints() {
        let index = parse_modules(MODULES);
        assert_eq!(index.loopbacks().len(), 2);
        assert_eq!(index.loopbacks()[0].module_id, 25);
        assert_eq!(index.loopbacks()[0].source.as_deref(), Some("mic1"));
        assert_eq!(
            index.loopbacks()[0].sink.as_deref(),
            Some("lichen_input_1_null")
        );
    }

    #[test]
    fn test_arg_value_key_boundaries() {
        let args = "sink_name=inner name=outer sink=dest";
        assert_eq!(arg_value(args, "sink_name"), Some("inner"));
        // `name=` must not match inside `sink_name=`
        assert_eq!(arg_value(args, "name"), Some("outer"));
        assert_eq!(arg_value(args, "sink"), Some("dest"));
        assert_eq!(arg_value(args, "missing"), None);
    }

    #[test]
    fn test_parse_modules_skips_malformed_blocks() {
        let out = "Module #5\n\tArgument: sink_name=x\nModule #6\n\tName: module-null-sink\n";
        let index = parse_modules(out);
        // #5 has no Name, #6 has no sink_name argument
        assert!(index.modules_for("x").is_empty());
    }
}
