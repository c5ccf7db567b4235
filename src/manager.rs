//! The audio route orchestration engine.
//!
//! [`AudioManager`] owns every piece of mutable engine state: the device
//! inventory, the route registry, hearback, forced capture sources and the
//! persisted settings. Every server interaction funnels through its
//! [`CommandRunner`]. Execution is single-threaded and synchronous; all
//! state is pull-based. Each mutating or refreshing call ends by re-reading
//! the live inventory, reconciling routes, sweeping stale loopbacks and
//! then notifying registered listeners in order.

use std::collections::BTreeSet;

use crate::alsa::{self, CaptureDevice, ForcedSource};
use crate::control::{load_module, pactl, percent_to_linear, unload_module, CommandRunner};
use crate::device::{self, Device, DeviceKind};
use crate::error::RouteError;
use crate::hearback::{find_sink_input_for_module, HearbackState};
use crate::modules::{parse_modules, LoopbackInfo, ModuleIndex, LOOPBACK_KEY, REMAP_KEY};
use crate::route::{
    Route, RouteKind, RouteRegistry, ENGINE_PREFIX, INPUT_PREFIX, MIC_SUFFIX, MONITOR_SUFFIX,
    NULL_MONITOR_SUFFIX, NULL_SINK_SUFFIX, OUTPUT_PREFIX,
};
use crate::settings::{Settings, SettingsStore};

/// Opaque token returned by [`AudioManager::add_listener`].
pub type ListenerId = usize;

pub struct AudioManager {
    runner: Box<dyn CommandRunner>,
    store: Box<dyn SettingsStore>,
    settings: Settings,
    sinks: Vec<Device>,
    sources: Vec<Device>,
    registry: RouteRegistry,
    hearback: HearbackState,
    forced_sources: Vec<ForcedSource>,
    listeners: Vec<(ListenerId, Box<dyn Fn()>)>,
    next_listener_id: ListenerId,
}

impl AudioManager {
    /// Build the engine: load settings, read the live server state, recover
    /// routes from a previous session, sweep stale loopbacks and expose any
    /// capture hardware the server missed.
    pub fn new(runner: Box<dyn CommandRunner>, store: Box<dyn SettingsStore>) -> Self {
        let settings = store.load();
        let mut manager = Self {
            runner,
            store,
            settings,
            sinks: Vec::new(),
            sources: Vec::new(),
            registry: RouteRegistry::default(),
            hearback: HearbackState::default(),
            forced_sources: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        };
        manager.fetch_devices();
        let index = manager.fetch_module_index();
        manager.reconcile(&index);
        manager.sweep_stale_loopbacks(&index);
        manager.recover_missing_captures();
        manager.notify_listeners();
        manager
    }

    /// Re-read the live server state and reconcile. Invoked internally after
    /// every mutation; callers invoke it to pick up external changes (a
    /// device plugged in, a module unloaded behind our back).
    pub fn refresh(&mut self) {
        self.fetch_devices();
        let index = self.fetch_module_index();
        self.reconcile(&index);
        self.sweep_stale_loopbacks(&index);
        self.notify_listeners();
    }

    // ======================== Inventory ========================

    fn fetch_devices(&mut self) {
        let out = pactl(self.runner.as_ref(), &["list", "sinks"]);
        self.sinks = device::parse_listing(&out.stdout, DeviceKind::Sink);

        let out = pactl(self.runner.as_ref(), &["list", "sources"]);
        // Monitors mirror sinks and are never legitimate capture devices.
        self.sources = device::parse_listing(&out.stdout, DeviceKind::Source)
            .into_iter()
            .filter(|s| !s.name.contains(MONITOR_SUFFIX))
            .collect();
    }

    fn fetch_module_index(&self) -> ModuleIndex {
        let out = pactl(self.runner.as_ref(), &["list", "modules"]);
        parse_modules(&out.stdout)
    }

    /// Output devices available for combining. Sinks this engine created
    /// are hidden so a virtual sink can never be routed back into itself.
    pub fn sinks(&self) -> Vec<&Device> {
        let tracked: Vec<&str> = self
            .registry
            .routes()
            .iter()
            .filter(|r| r.kind == RouteKind::Output)
            .map(|r| r.anchor_name.as_str())
            .collect();
        self.sinks
            .iter()
            .filter(|s| !tracked.contains(&s.name.as_str()) && !s.name.starts_with(ENGINE_PREFIX))
            .collect()
    }

    /// Microphones available for mixing. Internal route plumbing (combined
    /// sink monitors, mixer monitors, the exposed virtual mics) never
    /// appears here.
    pub fn sources(&self) -> Vec<&Device> {
        self.sources
            .iter()
            .filter(|s| {
                let name = s.name.as_str();
                let output_monitor =
                    name.starts_with(OUTPUT_PREFIX) && name.ends_with(MONITOR_SUFFIX);
                let mixer_monitor =
                    name.starts_with(INPUT_PREFIX) && name.ends_with(NULL_MONITOR_SUFFIX);
                let virtual_mic = name.starts_with(INPUT_PREFIX) && name.ends_with(MIC_SUFFIX);
                !output_monitor && !mixer_monitor && !virtual_mic
            })
            .collect()
    }

    /// The exposed virtual microphones created by INPUT routes.
    pub fn mixed_input_sources(&self) -> Vec<&Device> {
        self.sources
            .iter()
            .filter(|s| s.name.starts_with(INPUT_PREFIX) && s.name.ends_with(MIC_SUFFIX))
            .collect()
    }

    pub fn created_routes(&self) -> &[Route] {
        self.registry.routes()
    }

    pub fn has_active_routes(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn forced_sources(&self) -> &[ForcedSource] {
        &self.forced_sources
    }

    /// Duplicate check: an existing non-orphan route of `kind` whose member
    /// set equals `member_descriptions` as an unordered set.
    pub fn find_matching_route(
        &self,
        kind: RouteKind,
        member_descriptions: &[String],
    ) -> Option<&Route> {
        self.registry.find_matching(kind, member_descriptions)
    }

    // ======================== Route creation ========================

    /// Create a combined sink fanning out to every member sink. One
    /// combiner module; atomic, nothing to clean up on failure.
    pub fn create_combined_output(
        &mut self,
        target_name: &str,
        member_sinks: &[String],
        description: &str,
    ) -> Result<Route, RouteError> {
        if member_sinks.len() < 2 {
            return Err(RouteError::InsufficientMembers(member_sinks.len()));
        }
        let member_descriptions = describe_members(&self.sinks, member_sinks);
        if self
            .registry
            .find_matching(RouteKind::Output, &member_descriptions)
            .is_some()
        {
            return Err(RouteError::DuplicateRoute(RouteKind::Output));
        }
        let description = if description.is_empty() {
            format!("Combined: {} outputs", member_sinks.len())
        } else {
            description.to_string()
        };

        let sink_name_arg = format!("sink_name={target_name}");
        let slaves_arg = format!("slaves={}", member_sinks.join(","));
        let props_arg = format!("sink_properties=device.description=\"{description}\"");
        let module_id = load_module(
            self.runner.as_ref(),
            &["module-combine-sink", &sink_name_arg, &slaves_arg, &props_arg],
        )
        .map_err(|detail| RouteError::LoadFailed {
            module: "module-combine-sink",
            detail,
        })?;

        let route = Route {
            id: self.registry.next_route_id(RouteKind::Output),
            kind: RouteKind::Output,
            anchor_name: target_name.to_string(),
            exposed_source_name: None,
            description,
            module_ids: BTreeSet::from([module_id]),
            member_descriptions,
            is_orphan: false,
        };
        log::info!(
            "Created combined output {} ({} members, module {})",
            target_name,
            member_sinks.len(),
            module_id
        );
        self.registry.add(route.clone());
        self.refresh();
        Ok(route)
    }

    /// Create a mixed virtual microphone: a null-mixer sink, one loopback
    /// per member source into it, and a remap-source republishing the mixer
    /// monitor as a real capture device.
    ///
    /// The pipeline is not atomic. The mixer is critical and aborts the
    /// whole creation; individual loopback failures only shrink the member
    /// set; a remap failure leaves the route without an exposed virtual
    /// microphone.
    pub fn create_mixed_input(
        &mut self,
        target_name: &str,
        member_sources: &[String],
        description: &str,
    ) -> Result<Route, RouteError> {
        if member_sources.len() < 2 {
            return Err(RouteError::InsufficientMembers(member_sources.len()));
        }
        let member_descriptions = describe_members(&self.sources, member_sources);
        if self
            .registry
            .find_matching(RouteKind::Input, &member_descriptions)
            .is_some()
        {
            return Err(RouteError::DuplicateRoute(RouteKind::Input));
        }
        let description = if description.is_empty() {
            format!("Mixed: {} inputs", member_sources.len())
        } else {
            description.to_string()
        };
        let null_sink = format!("{target_name}{NULL_SINK_SUFFIX}");
        let mic_name = format!("{target_name}{MIC_SUFFIX}");

        // Stage 1: the mixing point. device.class=filter keeps it out of
        // other applications' device pickers.
        let sink_name_arg = format!("sink_name={null_sink}");
        let mixer_id = load_module(
            self.runner.as_ref(),
            &[
                "module-null-sink",
                &sink_name_arg,
                "sink_properties=device.description=\"LichenInternal\" device.class=\"filter\"",
            ],
        )
        .map_err(|detail| RouteError::LoadFailed {
            module: "module-null-sink",
            detail,
        })?;

        let mut module_ids = BTreeSet::from([mixer_id]);

        // Stage 2: one loopback per microphone. A source that fails to
        // attach is skipped; one bad microphone must not block the rest.
        let mut attached = 0;
        for source in member_sources {
            let source_arg = format!("source={source}");
            let sink_arg = format!("sink={null_sink}");
            match load_module(
                self.runner.as_ref(),
                &["module-loopback", &source_arg, &sink_arg, "latency_msec=1"],
            ) {
                Ok(id) => {
                    module_ids.insert(id);
                    attached += 1;
                }
                Err(e) => log::warn!("Skipping source {}: loopback failed: {}", source, e),
            }
        }

        // Stage 3: republish the mixer monitor as a proper capture device
        // so applications treat it as a microphone, not a monitor.
        let source_name_arg = format!("source_name={mic_name}");
        let master_arg = format!("master={null_sink}{MONITOR_SUFFIX}");
        let props_arg = format!("source_properties=device.description=\"{description}\"");
        let exposed_source_name = match load_module(
            self.runner.as_ref(),
            &["module-remap-source", &source_name_arg, &master_arg, &props_arg],
        ) {
            Ok(id) => {
                module_ids.insert(id);
                Some(mic_name)
            }
            Err(e) => {
                log::warn!(
                    "No virtual microphone for {}: remap failed: {}",
                    target_name,
                    e
                );
                None
            }
        };

        let route = Route {
            id: self.registry.next_route_id(RouteKind::Input),
            kind: RouteKind::Input,
            anchor_name: target_name.to_string(),
            exposed_source_name,
            description,
            module_ids,
            member_descriptions,
            is_orphan: false,
        };
        log::info!(
            "Created mixed input {} ({}/{} sources attached)",
            target_name,
            attached,
            member_sources.len()
        );
        self.registry.add(route.clone());
        self.refresh();
        Ok(route)
    }

    // ======================== Route teardown ========================

    /// Tear a route down, unloading every module it owns. Returns false for
    /// an unknown id without touching anything.
    pub fn remove_route(&mut self, route_id: &str) -> bool {
        let Some(route) = self.registry.get(route_id).cloned() else {
            return false;
        };

        // The hearback loopback must not outlive either endpoint route.
        if self.hearback.enabled() && self.hearback_depends_on(&route) {
            self.disable_hearback();
        }

        if route.module_ids.is_empty() {
            self.unload_by_anchor(&route);
        } else {
            for id in &route.module_ids {
                unload_module(self.runner.as_ref(), *id);
            }
        }
        self.registry.remove(route_id);
        log::info!("Removed route {} ({})", route.anchor_name, route_id);
        self.refresh();
        true
    }

    /// Fallback for routes whose module ids were lost: re-derive them from
    /// a fresh module graph pass. Loopbacks go before the mixer they feed
    /// so the server never sees a unit referencing a removed acceptor
    /// (errors there are tolerated regardless).
    fn unload_by_anchor(&self, route: &Route) {
        let index = self.fetch_module_index();
        match route.kind {
            RouteKind::Output => {
                for id in index.modules_for(&route.anchor_name) {
                    unload_module(self.runner.as_ref(), *id);
                }
            }
            RouteKind::Input => {
                let null_sink = route.null_sink_name();
                for id in index.modules_for(&format!("{LOOPBACK_KEY}{null_sink}")) {
                    unload_module(self.runner.as_ref(), *id);
                }
                for id in index.modules_for(&null_sink) {
                    unload_module(self.runner.as_ref(), *id);
                }
                for id in index.modules_for(&format!("{REMAP_KEY}{}", route.mic_name())) {
                    unload_module(self.runner.as_ref(), *id);
                }
            }
        }
    }

    /// Full-state wipe: disable hearback, unload every tracked module and
    /// forget all routes. Individual unload failures are swallowed.
    pub fn reset_to_defaults(&mut self) {
        self.disable_hearback();
        let ids: Vec<u32> = self
            .registry
            .routes()
            .iter()
            .flat_map(|r| r.module_ids.iter().copied())
            .collect();
        for id in ids {
            unload_module(self.runner.as_ref(), id);
        }
        self.registry.clear();
        log::info!("Reset: all routes removed");
        self.refresh();
    }

    // ======================== Reconciliation ========================

    /// Recover routes created by a previous session and surface orphaned
    /// pipeline fragments. Idempotent: an anchor claimed once is skipped on
    /// every later pass.
    fn reconcile(&mut self, index: &ModuleIndex) {
        // Combined output sinks carrying our naming convention.
        for sink in &self.sinks {
            if !sink.name.starts_with(OUTPUT_PREFIX) || self.registry.tracks_anchor(&sink.name) {
                continue;
            }
            self.registry.add(Route {
                id: RouteRegistry::recovered_route_id(RouteKind::Output),
                kind: RouteKind::Output,
                anchor_name: sink.name.clone(),
                exposed_source_name: None,
                description: sink.description.clone(),
                module_ids: index.modules_for(&sink.name).iter().copied().collect(),
                member_descriptions: Vec::new(),
                is_orphan: false,
            });
            log::info!("Recovered combined output {}", sink.name);
        }

        // Internal null-mixer sinks of mixed-input pipelines.
        for sink in &self.sinks {
            if !sink.name.starts_with(INPUT_PREFIX) {
                continue;
            }
            let Some(base) = sink.name.strip_suffix(NULL_SINK_SUFFIX) else {
                continue;
            };
            if self.registry.tracks_anchor(base) {
                continue;
            }
            let mic_name = format!("{base}{MIC_SUFFIX}");
            let mut module_ids: BTreeSet<u32> = BTreeSet::new();
            module_ids.extend(index.modules_for(&sink.name));
            module_ids.extend(index.modules_for(&format!("{LOOPBACK_KEY}{}", sink.name)));
            let remap_ids = index.modules_for(&format!("{REMAP_KEY}{mic_name}"));
            module_ids.extend(remap_ids);
            let description = self
                .sources
                .iter()
                .find(|s| s.name == mic_name)
                .map(|s| s.description.clone())
                .unwrap_or_else(|| "Mixed Input".to_string());
            self.registry.add(Route {
                id: RouteRegistry::recovered_route_id(RouteKind::Input),
                kind: RouteKind::Input,
                anchor_name: base.to_string(),
                exposed_source_name: (!remap_ids.is_empty()).then(|| mic_name.clone()),
                description,
                module_ids,
                member_descriptions: Vec::new(),
                is_orphan: false,
            });
            log::info!("Recovered mixed input {}", base);
        }

        // A surviving remap module whose mixer is gone: surface it for
        // manual cleanup instead of leaking the module forever.
        for key in index.keys_with_prefix(REMAP_KEY) {
            let mic_name = &key[REMAP_KEY.len()..];
            if !mic_name.starts_with(INPUT_PREFIX) {
                continue;
            }
            let Some(base) = mic_name.strip_suffix(MIC_SUFFIX) else {
                continue;
            };
            if self.registry.tracks_anchor(base) {
                continue;
            }
            self.registry.add(Route {
                id: RouteRegistry::recovered_route_id(RouteKind::Input),
                kind: RouteKind::Input,
                anchor_name: base.to_string(),
                exposed_source_name: Some(mic_name.to_string()),
                description: "Orphaned virtual microphone".to_string(),
                module_ids: index.modules_for(key).iter().copied().collect(),
                member_descriptions: Vec::new(),
                is_orphan: true,
            });
            log::warn!("Found orphaned remap source {} (its mixer is gone)", mic_name);
        }
    }

    // ======================== Orphan sweeping ========================

    /// Unload hearback-style loopbacks whose endpoints no longer exist. A
    /// crash can leave one behind; it leaks latency and can mis-route audio
    /// if a new device later reuses the name.
    fn sweep_stale_loopbacks(&self, index: &ModuleIndex) {
        let candidates: Vec<&LoopbackInfo> = index
            .loopbacks()
            .iter()
            .filter(|lb| {
                is_hearback_loopback(lb) && Some(lb.module_id) != self.hearback.loopback_module_id
            })
            .collect();
        if candidates.is_empty() {
            return;
        }

        // The short listings include monitors, which the inventory filters
        // out, so endpoint existence is checked against these.
        let sink_names =
            device::parse_short_names(&pactl(self.runner.as_ref(), &["list", "sinks", "short"]).stdout);
        let source_names =
            device::parse_short_names(&pactl(self.runner.as_ref(), &["list", "sources", "short"]).stdout);

        for lb in candidates {
            let (Some(source), Some(sink)) = (&lb.source, &lb.sink) else {
                continue;
            };
            if !source_names.contains(source) || !sink_names.contains(sink) {
                log::warn!(
                    "Sweeping stale hearback loopback {} ({} -> {})",
                    lb.module_id,
                    source,
                    sink
                );
                unload_module(self.runner.as_ref(), lb.module_id);
            }
        }
    }

    // ======================== Hearback ========================

    /// Hearback needs both a mixed input and a combined output to bridge.
    pub fn can_enable_hearback(&self) -> bool {
        self.registry.first_of(RouteKind::Input).is_some()
            && self.registry.first_of(RouteKind::Output).is_some()
    }

    pub fn hearback_enabled(&self) -> bool {
        self.hearback.enabled()
    }

    /// The current hearback level while enabled, otherwise the persisted
    /// level a UI should offer as the default.
    pub fn hearback_volume(&self) -> u32 {
        if self.hearback.enabled() {
            self.hearback.volume_percent
        } else {
            self.settings.hearback_volume
        }
    }

    /// Set the hearback gain, clamped to 0..=100. Zero disables the feature
    /// and unloads the loopback; anything above zero makes sure the
    /// loopback exists and then applies the gain to its stream.
    pub fn set_hearback_volume(&mut self, percent: u32) {
        let percent = percent.min(100);
        self.settings.hearback_volume = percent;
        self.persist_settings();

        if percent == 0 {
            let was_enabled = self.hearback.enabled();
            self.disable_hearback();
            if was_enabled {
                self.refresh();
            }
            return;
        }
        if !self.ensure_hearback_loopback() {
            return;
        }
        self.hearback.volume_percent = percent;
        self.apply_hearback_gain(percent);
    }

    fn hearback_depends_on(&self, route: &Route) -> bool {
        self.registry
            .first_of(route.kind)
            .is_some_and(|first| first.id == route.id)
    }

    fn disable_hearback(&mut self) {
        if let Some(id) = self.hearback.clear() {
            unload_module(self.runner.as_ref(), id);
            log::info!("Hearback disabled (module {} unloaded)", id);
        }
    }

    /// Create the loopback from the first INPUT route's mixer monitor to
    /// the first OUTPUT route's sink, unless one already exists.
    fn ensure_hearback_loopback(&mut self) -> bool {
        if self.hearback.enabled() {
            return true;
        }
        let endpoints = {
            let input = self.registry.first_of(RouteKind::Input);
            let output = self.registry.first_of(RouteKind::Output);
            match (input, output) {
                (Some(i), Some(o)) => Some((
                    format!("{}{MONITOR_SUFFIX}", i.null_sink_name()),
                    o.anchor_name.clone(),
                )),
                _ => None,
            }
        };
        let Some((monitor, sink)) = endpoints else {
            log::warn!("Hearback needs both a mixed input and a combined output route");
            return false;
        };

        let source_arg = format!("source={monitor}");
        let sink_arg = format!("sink={sink}");
        match load_module(
            self.runner.as_ref(),
            &["module-loopback", &source_arg, &sink_arg, "latency_msec=1"],
        ) {
            Ok(id) => {
                self.hearback.loopback_module_id = Some(id);
                self.hearback.sink_input_index = None;
                log::info!("Hearback enabled: {} -> {} (module {})", monitor, sink, id);
                self.refresh();
                true
            }
            Err(e) => {
                log::warn!("Failed to create hearback loopback: {}", e);
                false
            }
        }
    }

    fn apply_hearback_gain(&mut self, percent: u32) {
        let Some(module_id) = self.hearback.loopback_module_id else {
            return;
        };
        // The loopback module is not volume-addressable; its sink-input
        // stream is. The index survives gain changes, so resolve it once
        // per loopback.
        if self.hearback.sink_input_index.is_none() {
            let out = pactl(self.runner.as_ref(), &["list", "sink-inputs"]);
            self.hearback.sink_input_index = find_sink_input_for_module(&out.stdout, module_id);
            if self.hearback.sink_input_index.is_none() {
                log::warn!("No sink-input found for hearback module {}", module_id);
                return;
            }
        }
        if let Some(index) = self.hearback.sink_input_index {
            let index_arg = index.to_string();
            let volume_arg = percent_to_linear(percent).to_string();
            pactl(
                self.runner.as_ref(),
                &["set-sink-input-volume", &index_arg, &volume_arg],
            );
        }
    }

    // ======================== Device volume ========================

    /// The remembered volume for a device; unlisted devices are 100.
    pub fn device_volume(&self, name: &str) -> u32 {
        self.settings.device_volume(name)
    }

    /// Set a device's volume and remember it. Sink versus source is
    /// resolved from the current inventory; an unknown name is a reported
    /// failure, not an error.
    pub fn set_device_volume(&mut self, name: &str, percent: u32) -> bool {
        let percent = percent.min(100);
        let command = if self.sinks.iter().any(|s| s.name == name) {
            "set-sink-volume"
        } else if self.sources.iter().any(|s| s.name == name) {
            "set-source-volume"
        } else {
            log::warn!("Cannot set volume for unknown device {}", name);
            return false;
        };
        let volume_arg = percent_to_linear(percent).to_string();
        let out = pactl(self.runner.as_ref(), &[command, name, &volume_arg]);
        if out.succeeded {
            self.settings.device_volumes.insert(name.to_string(), percent);
            self.persist_settings();
        }
        out.succeeded
    }

    fn persist_settings(&self) {
        if let Err(e) = self.store.save(&self.settings) {
            log::warn!("Failed to persist settings: {:#}", e);
        }
    }

    // ======================== ALSA recovery ========================

    /// Hardware capture devices the driver sees but the server does not.
    pub fn find_missing_capture_devices(&self) -> Vec<CaptureDevice> {
        let out = self.runner.run("arecord", &["-l"]);
        if !out.succeeded {
            return Vec::new();
        }
        let listed = alsa::parse_capture_listing(&out.stdout);
        alsa::missing_capture_devices(&listed, &self.sources)
    }

    /// Expose a missing capture device by force-loading a direct hardware
    /// module. Forced sources are never removed automatically.
    pub fn force_load_capture_device(&mut self, dev: &CaptureDevice) -> bool {
        match alsa::force_load_device(self.runner.as_ref(), dev) {
            Some(record) => {
                self.forced_sources.push(record);
                self.refresh();
                true
            }
            None => false,
        }
    }

    fn recover_missing_captures(&mut self) {
        for dev in self.find_missing_capture_devices() {
            self.force_load_capture_device(&dev);
        }
    }

    // ======================== Defaults and streams ========================

    /// Move an application's stream to a sink.
    pub fn move_sink_input(&self, stream_index: u32, sink_name: &str) -> bool {
        let index_arg = stream_index.to_string();
        pactl(self.runner.as_ref(), &["move-sink-input", &index_arg, sink_name]).succeeded
    }

    pub fn set_default_sink(&self, sink_name: &str) -> bool {
        pactl(self.runner.as_ref(), &["set-default-sink", sink_name]).succeeded
    }

    pub fn set_default_source(&self, source_name: &str) -> bool {
        pactl(self.runner.as_ref(), &["set-default-source", source_name]).succeeded
    }

    // ======================== Listeners ========================

    /// Register a callback invoked once per refresh cycle, after all
    /// internal state is consistent.
    pub fn add_listener(&mut self, callback: impl Fn() + 'static) -> ListenerId {
        self.next_listener_id += 1;
        let id = self.next_listener_id;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    fn notify_listeners(&self) {
        for (_, callback) in &self.listeners {
            callback();
        }
    }
}

/// Map member device names to their human labels, falling back to the name
/// for devices that vanished between refresh and creation.
fn describe_members(devices: &[Device], names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| {
            devices
                .iter()
                .find(|d| d.name == *name)
                .map(|d| d.description.clone())
                .unwrap_or_else(|| name.clone())
        })
        .collect()
}

/// Both endpoints carry the internal naming convention: this is a hearback
/// bridge, not a user route's loopback.
fn is_hearback_loopback(lb: &LoopbackInfo) -> bool {
    let (Some(source), Some(sink)) = (&lb.source, &lb.sink) else {
        return false;
    };
    source.starts_with(INPUT_PREFIX)
        && source.ends_with(NULL_MONITOR_SUFFIX)
        && sink.starts_with(OUTPUT_PREFIX)
}
