mod common;

use common::*;
use framehost_core::abi::MemoryOrigin;
use framehost_core::{
    ApiError, BootError, Bridge, Button, FrameScheduler, GateError, HostConfig, InitError,
    IntervalPacer, LoadError, ModuleSource, Phase, SchedulerState,
};
use std::path::PathBuf;

#[tokio::test]
async fn boots_then_init_and_cls_succeed() {
    let (bridge, hooks) = bridge(TICKING_GUEST, HostConfig::default());
    assert_eq!(bridge.phase(), Phase::Uninitialized);
    assert_eq!(bridge.try_api().unwrap_err(), GateError::NotReady);

    let api = bridge.ready().await.unwrap();
    assert_eq!(bridge.phase(), Phase::Ready);

    api.init(160, 120).unwrap();
    api.cls(0).unwrap();

    assert_eq!(api.screen_size(), Some((160, 120)));
    assert_eq!(hooks.lines(), ["booted", "init", "cls"]);
}

#[tokio::test]
async fn concurrent_awaiters_share_one_instance() {
    let (bridge, hooks) = bridge(TICKING_GUEST, HostConfig::default());

    let (a, b) = tokio::join!(bridge.ready(), bridge.ready());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(a.same_instance(&b));
    assert!(a.same_instance(&bridge.try_api().unwrap()));
    // The start function ran exactly once.
    assert_eq!(hooks.lines(), ["booted"]);
}

#[tokio::test]
async fn init_is_legal_exactly_once() {
    let (bridge, _hooks) = bridge(TICKING_GUEST, HostConfig::default());
    let api = bridge.ready().await.unwrap();

    assert!(matches!(
        api.cls(0),
        Err(ApiError::Init(InitError::NotInitialized))
    ));
    api.init(160, 120).unwrap();
    assert!(matches!(
        api.init(320, 240),
        Err(ApiError::Init(InitError::AlreadyInitialized))
    ));
    assert_eq!(api.screen_size(), Some((160, 120)));
}

#[tokio::test]
async fn trapping_init_is_not_retried() {
    let (bridge, _hooks) = bridge(TRAPPING_INIT_GUEST, HostConfig::default());
    let api = bridge.ready().await.unwrap();

    assert!(matches!(
        api.init(160, 120),
        Err(ApiError::Trap { export: "init", .. })
    ));
    assert!(!api.is_initialized());
    assert!(matches!(
        api.init(160, 120),
        Err(ApiError::Init(InitError::AlreadyInitialized))
    ));
}

#[tokio::test(start_paused = true)]
async fn frame_loop_alternates_update_and_draw() {
    let (bridge, hooks) = bridge(TICKING_GUEST, HostConfig::default());
    let mut api = bridge.ready().await.unwrap();
    api.init(160, 120).unwrap();

    let (pacer, _stop) = IntervalPacer::new(30);
    let mut pacer = pacer.with_frame_limit(3);
    let mut scheduler = FrameScheduler::new();
    let ticks = scheduler.run(&mut api, &mut pacer).await.unwrap();

    assert_eq!(ticks, 3);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(
        hooks.lines(),
        ["booted", "init", "update", "draw", "update", "draw", "update", "draw"]
    );
}

#[tokio::test]
async fn gamepad_state_reaches_the_guest() {
    let (bridge, hooks) = bridge(TICKING_GUEST, HostConfig::default());
    let api = bridge.ready().await.unwrap();

    api.update().unwrap();
    bridge.gamepad().set(Button::A, true);
    api.update().unwrap();
    api.gamepad().release_all();
    api.update().unwrap();

    assert_eq!(
        hooks.lines(),
        ["booted", "update", "update", "A", "update"]
    );
}

#[tokio::test]
async fn exported_and_provided_memory() {
    let (exported, _) = bridge(TICKING_GUEST, HostConfig::default());
    let api = exported.ready().await.unwrap();
    assert_eq!(api.memory_origin(), MemoryOrigin::Exported);
    assert_eq!(api.memory_size(), 65536);

    let (provided, hooks) = bridge(PROVIDED_MEMORY_GUEST, HostConfig::default());
    let api = provided.ready().await.unwrap();
    assert_eq!(api.memory_origin(), MemoryOrigin::Provided);
    assert_eq!(api.memory_size(), 256 * 65536);

    api.init(160, 120).unwrap();
    assert_eq!(hooks.lines(), ["hi from provided memory"]);
}

#[tokio::test]
async fn missing_required_export_fails_instantiation() {
    let (bridge, _) = bridge(MISSING_DRAW_GUEST, HostConfig::default());
    let err = bridge.ready().await.unwrap_err();

    match err {
        BootError::Load(LoadError::Instantiate(message)) => assert!(message.contains("draw")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(bridge.phase(), Phase::Instantiating);
}

#[tokio::test]
async fn guest_without_any_memory_is_rejected() {
    let (bridge, _) = bridge(NO_MEMORY_GUEST, HostConfig::default());
    assert!(matches!(
        bridge.ready().await,
        Err(BootError::Load(LoadError::Instantiate(_)))
    ));
}

#[tokio::test]
async fn malformed_module_fails_to_compile() {
    let (bridge, _) = bridge("(module (func $oops", HostConfig::default());
    assert!(matches!(
        bridge.ready().await,
        Err(BootError::Load(LoadError::Compile(_)))
    ));
}

#[tokio::test]
async fn fetch_failure_is_sticky() {
    let config = HostConfig {
        fetch_retries: 2,
        ..HostConfig::default()
    };
    let bridge = Bridge::new(
        ModuleSource::File(PathBuf::from("/no/such/guest.wasm")),
        config,
    );

    let first = bridge.ready().await.unwrap_err();
    let second = bridge.ready().await.unwrap_err();

    assert!(matches!(first, BootError::Load(LoadError::Fetch { .. })));
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(bridge.try_api().unwrap_err(), GateError::NotReady);
}

#[tokio::test]
async fn provided_memory_respects_the_guest_maximum() {
    let (bridge, hooks) = bridge(CAPPED_MEMORY_GUEST, HostConfig::default());
    let api = bridge.ready().await.unwrap();

    assert_eq!(api.memory_origin(), MemoryOrigin::Provided);
    assert_eq!(api.memory_size(), 2 * 65536);
    api.init(160, 120).unwrap();
    assert_eq!(hooks.lines(), ["capped"]);
}

#[tokio::test]
async fn oversized_memory_import_is_refused() {
    let (bridge, _) = bridge(OVERSIZED_MEMORY_GUEST, HostConfig::default());
    match bridge.ready().await.unwrap_err() {
        BootError::Load(LoadError::Instantiate(message)) => {
            assert!(message.contains("exceeds the maximum"), "{message}")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn guest_owned_memory_growth_is_capped_by_config() {
    let (bridge, hooks) = bridge(GROWING_GUEST, HostConfig::default());
    let api = bridge.ready().await.unwrap();

    api.update().unwrap();
    api.draw().unwrap();

    assert_eq!(hooks.lines(), ["refused", "grew one", "intact"]);
    assert_eq!(api.memory_size(), 2 * 65536);
}
