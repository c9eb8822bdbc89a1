//! Presentation surfaces, their registry and the system tray

mod registry;
mod surface;
#[cfg(any(target_os = "windows", target_os = "macos"))]
mod system_tray;

pub use registry::{Registration, SurfaceRegistry};
pub use surface::{
    AttachFn, ChannelSurface, ChannelSurfaceFactory, KeydownEvent, Surface, SurfaceFactory,
    SurfaceKind, SurfaceLink, SurfaceMessage, SurfaceRequest,
};
#[cfg(any(target_os = "windows", target_os = "macos"))]
pub use system_tray::{run_tray, TrayAction};
