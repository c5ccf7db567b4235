//! End-to-end session against a scripted `pactl`: create both route
//! shapes, run hearback, tear down, and come back up with persisted
//! settings.

use lichen_audio::{
    AudioManager, FakeRunner, JsonSettingsStore, MemoryStore, RouteKind,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SINKS: &str = "Sink #1\n\
    \tState: RUNNING\n\
    \tName: alpha\n\
    \tDescription: Alpha Speakers\n\
    Sink #2\n\
    \tState: IDLE\n\
    \tName: beta\n\
    \tDescription: Beta Headphones\n";

const SOURCES: &str = "Source #3\n\
    \tState: RUNNING\n\
    \tName: mic1\n\
    \tDescription: Mic One\n\
    Source #4\n\
    \tState: RUNNING\n\
    \tName: mic2\n\
    \tDescription: Mic Two\n";

fn stub_session(runner: &FakeRunner) {
    runner.stub("pactl list sinks", SINKS);
    runner.stub("pactl list sources", SOURCES);
    runner.stub(
        "pactl load-module module-combine-sink sink_name=lichen_output_1 \
         slaves=alpha,beta sink_properties=device.description=\"Everywhere\"",
        "42\n",
    );
    runner.stub(
        "pactl load-module module-null-sink sink_name=lichen_input_1_null \
         sink_properties=device.description=\"LichenInternal\" device.class=\"filter\"",
        "50\n",
    );
    runner.stub(
        "pactl load-module module-loopback source=mic1 sink=lichen_input_1_null latency_msec=1",
        "51\n",
    );
    runner.stub(
        "pactl load-module module-loopback source=mic2 sink=lichen_input_1_null latency_msec=1",
        "52\n",
    );
    runner.stub(
        "pactl load-module module-remap-source source_name=lichen_input_1_mic \
         master=lichen_input_1_null.monitor \
         source_properties=device.description=\"All Mics\"",
        "53\n",
    );
    runner.stub(
        "pactl load-module module-loopback source=lichen_input_1_null.monitor \
         sink=lichen_output_1 latency_msec=1",
        "68\n",
    );
    runner.stub(
        "pactl list sink-inputs",
        "Sink Input #227\n\tDriver: module-loopback.c\n\tOwner Module: 68\n",
    );
}

#[test]
fn full_routing_session() {
    init_logging();
    let runner = FakeRunner::new();
    stub_session(&runner);
    let mut manager = AudioManager::new(Box::new(runner.clone()), Box::new(MemoryStore::new()));

    assert_eq!(manager.sinks().len(), 2);
    assert_eq!(manager.sources().len(), 2);
    assert!(!manager.has_active_routes());
    assert!(!manager.can_enable_hearback());

    let output = manager
        .create_combined_output(
            "lichen_output_1",
            &["alpha".to_string(), "beta".to_string()],
            "Everywhere",
        )
        .unwrap();
    let input = manager
        .create_mixed_input(
            "lichen_input_1",
            &["mic1".to_string(), "mic2".to_string()],
            "All Mics",
        )
        .unwrap();

    assert_eq!(output.kind, RouteKind::Output);
    assert_eq!(input.exposed_source_name.as_deref(), Some("lichen_input_1_mic"));
    assert_eq!(manager.created_routes().len(), 2);

    // With both route shapes live, hearback can bridge them.
    assert!(manager.can_enable_hearback());
    manager.set_hearback_volume(70);
    assert!(manager.hearback_enabled());
    assert!(runner
        .calls()
        .contains(&"pactl set-sink-input-volume 227 45875".to_string()));

    // Tearing down the mixed input takes the hearback bridge with it.
    runner.clear_calls();
    assert!(manager.remove_route(&input.id));
    assert!(!manager.hearback_enabled());
    let unloads = runner.calls_matching("pactl unload-module");
    assert_eq!(unloads[0], "pactl unload-module 68");
    for id in [50, 51, 52, 53] {
        assert!(unloads.contains(&format!("pactl unload-module {id}")));
    }

    manager.reset_to_defaults();
    assert!(!manager.has_active_routes());
    assert!(runner
        .calls()
        .contains(&"pactl unload-module 42".to_string()));
}

#[test]
fn settings_survive_engine_restart() {
    init_logging();
    let path = std::env::temp_dir().join(format!("lichen_engine_{}.json", uuid::Uuid::new_v4()));
    let runner = FakeRunner::new();
    runner.stub("pactl list sinks", SINKS);
    runner.stub("pactl list sources", SOURCES);

    {
        let mut manager = AudioManager::new(
            Box::new(runner.clone()),
            Box::new(JsonSettingsStore::new(&path)),
        );
        assert!(manager.set_device_volume("alpha", 35));
        manager.set_hearback_volume(0);
    }

    let manager = AudioManager::new(
        Box::new(runner.clone()),
        Box::new(JsonSettingsStore::new(&path)),
    );
    assert_eq!(manager.device_volume("alpha"), 35);
    assert_eq!(manager.hearback_volume(), 0);
    std::fs::remove_file(&path).ok();
}
