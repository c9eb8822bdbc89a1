//! End-to-end scenarios: hook -> broker -> overlay, and preferences ->
//! store -> every surface.

mod common;

use std::sync::{Arc, Mutex};

use common::{FakeKeyboard, FixedPointer, TestHost, POINTER};
use typespark::data::{ChromeOffset, FileBlobStore, MemoryBlobStore};
use typespark::platform::NoPointer;
use typespark::ui::{
    ChannelSurfaceFactory, KeydownEvent, SurfaceKind, SurfaceLink, SurfaceMessage,
    SurfaceRegistry, SurfaceRequest,
};
use typespark::{
    BrokerError, BrokerHandle, GlobalKeyHook, Lifecycle, LifecycleError, LifecycleState,
    PartialSettings, Settings, SettingsStore,
};

struct App {
    lifecycle: Lifecycle,
    broker: BrokerHandle,
    keyboard: FakeKeyboard,
    host: TestHost,
}

fn launch(store: SettingsStore) -> App {
    let keyboard = FakeKeyboard::default();
    let host = TestHost::default();
    let mut lifecycle = Lifecycle::new(GlobalKeyHook::new(Box::new(keyboard.clone())));
    let broker = lifecycle
        .ready(
            store,
            SurfaceRegistry::new(Box::new(host.clone())),
            Box::new(FixedPointer),
        )
        .unwrap();
    lifecycle.start().unwrap();
    App {
        lifecycle,
        broker,
        keyboard,
        host,
    }
}

fn volume(v: i64) -> PartialSettings {
    PartialSettings {
        volume: Some(v),
        ..PartialSettings::default()
    }
}

#[tokio::test]
async fn empty_store_serves_defaults_and_update_reaches_every_surface() {
    let blob = Arc::new(MemoryBlobStore::new());
    let mut app = launch(SettingsStore::new(blob.clone()));

    assert_eq!(app.broker.get_settings().await.unwrap(), Settings::default());
    assert!(app.broker.open_preferences().await.unwrap().created);

    let merged = app.broker.update_settings_confirmed(volume(80)).await.unwrap();

    let expected = Settings {
        volume: 80,
        ..Settings::default()
    };
    assert_eq!(merged, expected);
    assert_eq!(app.broker.cached_settings(), expected);
    assert_eq!(SettingsStore::new(blob.clone()).load(), expected);
    assert_eq!(
        app.host.next(SurfaceKind::Overlay).await,
        Some(SurfaceMessage::SettingsUpdated(expected.clone()))
    );
    assert_eq!(
        app.host.next(SurfaceKind::Preferences).await,
        Some(SurfaceMessage::SettingsUpdated(expected))
    );

    app.lifecycle.quit().await;
}

#[tokio::test]
async fn pointer_is_sampled_only_when_enabled() {
    let mut app = launch(SettingsStore::new(MemoryBlobStore::new()));

    assert!(app.keyboard.press(13));
    assert_eq!(
        app.host.next(SurfaceKind::Overlay).await,
        Some(SurfaceMessage::Keydown(KeydownEvent {
            keycode: 13,
            pointer: None
        }))
    );

    app.broker
        .update_settings_confirmed(PartialSettings {
            use_mouse_pos: Some(true),
            ..PartialSettings::default()
        })
        .await
        .unwrap();
    assert!(matches!(
        app.host.next(SurfaceKind::Overlay).await,
        Some(SurfaceMessage::SettingsUpdated(_))
    ));

    assert!(app.keyboard.press(13));
    assert_eq!(
        app.host.next(SurfaceKind::Overlay).await,
        Some(SurfaceMessage::Keydown(KeydownEvent {
            keycode: 13,
            pointer: Some(POINTER)
        }))
    );

    app.lifecycle.quit().await;
}

#[tokio::test]
async fn key_presses_arrive_in_order() {
    let mut app = launch(SettingsStore::new(MemoryBlobStore::new()));

    for keycode in [72, 69, 76, 76, 79] {
        app.keyboard.press(keycode);
    }

    let mut received = Vec::new();
    for _ in 0..5 {
        match app.host.next(SurfaceKind::Overlay).await {
            Some(SurfaceMessage::Keydown(event)) => received.push(event.keycode),
            other => panic!("unexpected overlay message: {:?}", other),
        }
    }
    assert_eq!(received, vec![72, 69, 76, 76, 79]);

    app.lifecycle.quit().await;
}

#[tokio::test]
async fn destroyed_overlay_drops_events_silently() {
    let mut app = launch(SettingsStore::new(MemoryBlobStore::new()));
    assert!(app.keyboard.press(12));
    assert!(matches!(
        app.host.next(SurfaceKind::Overlay).await,
        Some(SurfaceMessage::Keydown(_))
    ));

    app.host.destroy(SurfaceKind::Overlay);
    assert!(app.keyboard.press(13));
    app.broker.update_settings(volume(70));

    // The broker is still serving requests after the dropped pushes.
    assert_eq!(app.broker.get_settings().await.unwrap().volume, 70);
    assert!(app.host.drain(SurfaceKind::Overlay).is_empty());
    assert_eq!(app.host.created(SurfaceKind::Overlay), 1);

    app.lifecycle.quit().await;
    assert_eq!(*app.lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn preferences_is_a_singleton_that_focuses() {
    let mut app = launch(SettingsStore::new(MemoryBlobStore::new()));

    assert!(app.broker.open_preferences().await.unwrap().created);
    assert!(!app.broker.open_preferences().await.unwrap().created);
    assert_eq!(app.host.created(SurfaceKind::Preferences), 1);
    assert_eq!(
        app.host.next(SurfaceKind::Preferences).await,
        Some(SurfaceMessage::Focus)
    );

    app.host.destroy(SurfaceKind::Preferences);
    assert!(app.broker.open_preferences().await.unwrap().created);
    assert_eq!(app.host.created(SurfaceKind::Preferences), 2);

    app.lifecycle.quit().await;
}

#[tokio::test]
async fn window_button_position_moves_live_preferences() {
    let mut app = launch(SettingsStore::new(MemoryBlobStore::new()));
    app.broker.open_preferences().await.unwrap();

    let partial: PartialSettings = serde_json::from_str(
        r#"{ "trafficLightPosition": { "x": "22", "y": 31 } }"#,
    )
    .unwrap();
    let merged = app.broker.update_settings_confirmed(partial).await.unwrap();

    let offset = ChromeOffset { x: 22, y: 31 };
    assert_eq!(merged.traffic_light_position, offset);
    assert_eq!(
        app.host.drain(SurfaceKind::Preferences),
        vec![
            SurfaceMessage::SettingsUpdated(merged),
            SurfaceMessage::SetWindowButtonPosition(offset),
        ]
    );

    app.lifecycle.quit().await;
}

#[tokio::test]
async fn decoded_update_request_is_broadcast() {
    let mut app = launch(SettingsStore::new(MemoryBlobStore::new()));
    app.broker.open_preferences().await.unwrap();

    let request: SurfaceRequest =
        serde_json::from_str(r#"{"channel":"update-settings","payload":{"volume":80}}"#).unwrap();
    assert_eq!(app.broker.serve(request).await.unwrap(), None);

    let expected = Settings {
        volume: 80,
        ..Settings::default()
    };
    assert_eq!(
        app.host.next(SurfaceKind::Overlay).await,
        Some(SurfaceMessage::SettingsUpdated(expected.clone()))
    );
    assert_eq!(
        app.host.next(SurfaceKind::Preferences).await,
        Some(SurfaceMessage::SettingsUpdated(expected.clone()))
    );
    assert_eq!(
        app.broker.serve(SurfaceRequest::GetSettings).await.unwrap(),
        Some(expected)
    );

    app.lifecycle.quit().await;
}

#[tokio::test]
async fn attached_surface_pulls_and_pushes_through_its_link() {
    let links: Arc<Mutex<Vec<SurfaceLink>>> = Arc::default();
    let sink = links.clone();
    let factory = ChannelSurfaceFactory::new(Box::new(move |link| {
        sink.lock().unwrap().push(link);
    }));
    let mut lifecycle = Lifecycle::new(GlobalKeyHook::new(Box::new(FakeKeyboard::default())));
    lifecycle
        .ready(
            SettingsStore::new(MemoryBlobStore::new()),
            SurfaceRegistry::new(Box::new(factory)),
            Box::new(NoPointer),
        )
        .unwrap();

    let mut overlay = links.lock().unwrap().remove(0);
    assert_eq!(overlay.kind, SurfaceKind::Overlay);

    let pulled = overlay.broker.serve(SurfaceRequest::GetSettings).await.unwrap();
    assert_eq!(pulled, Some(Settings::default()));

    overlay
        .broker
        .serve(SurfaceRequest::UpdateSettings(PartialSettings {
            bounce: Some(true),
            ..PartialSettings::default()
        }))
        .await
        .unwrap();
    match overlay.messages.recv().await {
        Some(SurfaceMessage::SettingsUpdated(settings)) => assert!(settings.bounce),
        other => panic!("unexpected overlay message: {:?}", other),
    }

    lifecycle.quit().await;
}

#[tokio::test]
async fn fire_and_forget_update_is_applied_before_later_requests() {
    let blob = Arc::new(MemoryBlobStore::new());
    let mut app = launch(SettingsStore::new(blob.clone()));

    app.broker.update_settings(volume(10));
    app.broker.update_settings(PartialSettings {
        gravity: Some(true),
        ..PartialSettings::default()
    });

    let pulled = app.broker.get_settings().await.unwrap();
    assert_eq!(pulled.volume, 10);
    assert!(pulled.gravity);
    assert_eq!(app.broker.cached_settings(), pulled);

    app.lifecycle.quit().await;
}

#[tokio::test]
async fn write_failure_reaches_caller_and_cache_stays_advanced() {
    let blob = Arc::new(MemoryBlobStore::new());
    let mut app = launch(SettingsStore::new(blob.clone()));
    blob.set_fail_writes(true);

    let err = app
        .broker
        .update_settings_confirmed(volume(5))
        .await
        .unwrap_err();

    assert!(matches!(err, BrokerError::Store(_)));
    assert_eq!(app.broker.cached_settings().volume, 5);
    assert_eq!(app.broker.get_settings().await.unwrap().volume, 50);
    assert!(app.host.drain(SurfaceKind::Overlay).is_empty());

    app.lifecycle.quit().await;
}

#[tokio::test]
async fn permission_failure_never_reaches_running() {
    let keyboard = FakeKeyboard::denied();
    let host = TestHost::default();
    let mut lifecycle = Lifecycle::new(GlobalKeyHook::new(Box::new(keyboard.clone())));
    lifecycle
        .ready(
            SettingsStore::new(MemoryBlobStore::new()),
            SurfaceRegistry::new(Box::new(host.clone())),
            Box::new(FixedPointer),
        )
        .unwrap();

    let err = lifecycle.start().unwrap_err();

    assert!(matches!(err, LifecycleError::Hook(_)));
    assert!(matches!(lifecycle.state(), LifecycleState::Failed(_)));
    assert!(!keyboard.press(13));
    assert!(host.drain(SurfaceKind::Overlay).is_empty());

    lifecycle.quit().await;
    assert!(!keyboard.is_installed());
}

#[tokio::test]
async fn quit_releases_the_hook() {
    let mut app = launch(SettingsStore::new(MemoryBlobStore::new()));
    assert!(app.keyboard.is_installed());

    app.lifecycle.quit().await;

    assert!(!app.keyboard.is_installed());
    assert!(!app.keyboard.press(1));
    assert_eq!(*app.lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn settings_survive_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let mut first = launch(SettingsStore::new(FileBlobStore::new(&path)));
    first
        .broker
        .update_settings_confirmed(PartialSettings {
            particle_size: Some(12),
            show_wpm: Some(true),
            ..PartialSettings::default()
        })
        .await
        .unwrap();
    first.lifecycle.quit().await;

    let mut second = launch(SettingsStore::new(FileBlobStore::new(&path)));
    let restored = second.broker.cached_settings();
    assert_eq!(restored.particle_size, 12);
    assert!(restored.show_wpm);
    assert_eq!(restored.volume, Settings::default().volume);
    second.lifecycle.quit().await;
}
