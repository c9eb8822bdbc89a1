use crate::error::HookError;
use crate::platform::{KeySink, KeyboardHookProvider, PointerPosition, PointerSource};
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

/// Low-level keyboard hook (`WH_KEYBOARD_LL`) running on a dedicated thread
/// with its own message loop.
pub struct WindowsKeyboardHook {
    hook_thread: Mutex<Option<HookThread>>,
}

struct HookThread {
    thread_id: u32,
    handle: JoinHandle<()>,
}

impl WindowsKeyboardHook {
    pub fn new() -> Self {
        Self {
            hook_thread: Mutex::new(None),
        }
    }
}

impl KeyboardHookProvider for WindowsKeyboardHook {
    fn install(&self, sink: KeySink) -> Result<(), HookError> {
        let mut slot = self
            .hook_thread
            .lock()
            .map_err(|_| HookError::Install("hook state poisoned".to_string()))?;
        if slot.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<u32, HookError>>();
        let handle = thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || run_keyboard_hook(sink, ready_tx))
            .map_err(|e| HookError::Install(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                *slot = Some(HookThread { thread_id, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(HookError::Install(
                    "hook thread exited before reporting".to_string(),
                ))
            }
        }
    }

    fn uninstall(&self) {
        use windows::Win32::Foundation::{LPARAM, WPARAM};
        use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};

        let hook_thread = match self.hook_thread.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };

        if let Some(HookThread { thread_id, handle }) = hook_thread {
            unsafe {
                let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
            if handle.join().is_err() {
                tracing::warn!("Keyboard hook thread panicked during shutdown");
            }
        }
    }
}

impl Drop for WindowsKeyboardHook {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Install the hook, report the outcome, then pump messages until `WM_QUIT`.
fn run_keyboard_hook(sink: KeySink, ready: std_mpsc::Sender<Result<u32, HookError>>) {
    use std::cell::RefCell;
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, SetWindowsHookExW, UnhookWindowsHookEx,
        HHOOK, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL, WM_KEYDOWN, WM_SYSKEYDOWN,
    };

    thread_local! {
        static SINK: RefCell<Option<KeySink>> = RefCell::new(None);
    }

    SINK.with(|slot| *slot.borrow_mut() = Some(sink));

    unsafe extern "system" fn keyboard_hook_proc(
        code: i32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        if code >= 0 {
            let message = wparam.0 as u32;
            if message == WM_KEYDOWN || message == WM_SYSKEYDOWN {
                let kb_struct = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
                let vk_code = kb_struct.vkCode;
                SINK.with(|slot| {
                    if let Some(ref sink) = *slot.borrow() {
                        sink(vk_code);
                    }
                });
            }
        }

        // Capture only: always pass the keystroke on.
        CallNextHookEx(HHOOK::default(), code, wparam, lparam)
    }

    let hook = unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) };

    match hook {
        Ok(h) => {
            let tid = unsafe { GetCurrentThreadId() };
            tracing::info!("Keyboard hook installed successfully");
            if ready.send(Ok(tid)).is_err() {
                let _ = unsafe { UnhookWindowsHookEx(h) };
                return;
            }

            let mut msg = MSG::default();
            unsafe {
                while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                    DispatchMessageW(&msg);
                }
            }

            let _ = unsafe { UnhookWindowsHookEx(h) };
            tracing::info!("Keyboard hook uninstalled");
        }
        Err(e) => {
            tracing::error!("Failed to install keyboard hook: {:?}", e);
            let _ = ready.send(Err(HookError::Install(e.to_string())));
        }
    }

    SINK.with(|slot| *slot.borrow_mut() = None);
}

pub struct WindowsPointer;

impl PointerSource for WindowsPointer {
    fn position(&self) -> Option<PointerPosition> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }.ok()?;
        Some(PointerPosition {
            x: point.x,
            y: point.y,
        })
    }
}
