//! System Tray
//!
//! Menu-bar / notification-area icon with two actions: open preferences and
//! quit.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tray_icon::{
    menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem},
    TrayIconBuilder,
};

use crate::business::BrokerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    OpenPreferences,
    Quit,
}

/// Show the tray icon and serve its menu until the user picks Quit.
pub async fn run_tray(broker: BrokerHandle) -> Result<()> {
    let icon = load_icon()?;
    let menu = Menu::new();

    let version_item = MenuItem::new(
        format!("TypeSpark v{}", env!("CARGO_PKG_VERSION")),
        false,
        None,
    );
    let separator = PredefinedMenuItem::separator();
    let preferences_item = MenuItem::new("Preferences", true, None);
    let quit_item = MenuItem::new("Quit", true, None);

    let preferences_id = preferences_item.id().clone();
    let quit_id = quit_item.id().clone();

    menu.append(&version_item)?;
    menu.append(&separator)?;
    menu.append(&preferences_item)?;
    menu.append(&quit_item)?;

    let _tray_icon = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip("TypeSpark")
        .with_icon(icon)
        .build()?;

    tracing::info!("System tray initialized");

    let running = Arc::new(AtomicBool::new(true));
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();

    // Menu events arrive on a blocking receiver; forward them to the loop.
    let running_clone = running.clone();
    std::thread::spawn(move || {
        let menu_rx = MenuEvent::receiver();
        while running_clone.load(Ordering::SeqCst) {
            if let Ok(event) = menu_rx.recv_timeout(Duration::from_millis(50)) {
                let action = if event.id == preferences_id {
                    TrayAction::OpenPreferences
                } else if event.id == quit_id {
                    TrayAction::Quit
                } else {
                    continue;
                };
                if action_tx.send(action).is_err() {
                    break;
                }
            }
        }
    });

    while let Some(action) = action_rx.recv().await {
        match action {
            TrayAction::OpenPreferences => {
                tracing::info!("Preferences from menu");
                match broker.open_preferences().await {
                    Ok(registration) if registration.created => {}
                    Ok(_) => tracing::debug!("Preferences focused"),
                    Err(e) => tracing::error!("Failed to open preferences: {}", e),
                }
            }
            TrayAction::Quit => {
                tracing::info!("Quit from menu");
                break;
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    Ok(())
}

/// Tray icon: a four-point spark on a warm gradient disc.
fn load_icon() -> Result<tray_icon::Icon> {
    const SIZE: u32 = 32;
    let mut rgba = vec![0u8; (SIZE * SIZE * 4) as usize];

    let center = SIZE as f32 / 2.0;
    let radius = center - 1.0;
    let color_start = (255u8, 170u8, 40u8);
    let color_end = (235u8, 60u8, 90u8);

    for y in 0..SIZE {
        for x in 0..SIZE {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > radius {
                continue;
            }

            let t = (x + y) as f32 / (2 * SIZE) as f32;
            let mix = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t) as u8;
            let alpha = if dist > radius - 1.5 {
                ((radius - dist) / 1.5 * 255.0) as u8
            } else {
                255
            };

            // Spark: |dx|^0.5 + |dy|^0.5 <= r^0.5 gives a concave star.
            let spark = dx.abs().sqrt() + dy.abs().sqrt() <= (radius * 0.7).sqrt();
            let (r, g, b) = if spark {
                (255, 255, 255)
            } else {
                (
                    mix(color_start.0, color_end.0),
                    mix(color_start.1, color_end.1),
                    mix(color_start.2, color_end.2),
                )
            };

            let idx = ((y * SIZE + x) * 4) as usize;
            rgba[idx..idx + 4].copy_from_slice(&[r, g, b, alpha]);
        }
    }

    let icon = tray_icon::Icon::from_rgba(rgba, SIZE, SIZE)?;
    Ok(icon)
}
