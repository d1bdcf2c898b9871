// ~/Sentinel/sentinel-addons/display/src/watcher/message_window.rs
//
// A window owned by a dedicated thread with its own message loop. Broadcasts
// and registered notifications for that window are handed to a per-thread
// handler.

use std::{
    cell::RefCell,
    sync::mpsc,
    thread::{self, JoinHandle},
};

use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
        System::{
            LibraryLoader::GetModuleHandleW,
            Power::{UnregisterPowerSettingNotification, HPOWERNOTIFY},
            Threading::GetCurrentThreadId,
        },
        UI::WindowsAndMessaging::{
            CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
            PostThreadMessageW, RegisterClassW, TranslateMessage, UnregisterDeviceNotification,
            HDEVNOTIFY, HWND_MESSAGE, MSG, WINDOW_EX_STYLE, WM_QUIT, WNDCLASSW, WS_OVERLAPPED,
        },
    },
};

use crate::{
    debug,
    error::{DisplayError, Result},
    utility::to_wstring,
    warn, DEBUG_NAME,
};

type Handler = Box<dyn Fn(u32, WPARAM, LPARAM)>;

thread_local! {
    static HANDLER: RefCell<Option<Handler>> = RefCell::new(None);
}

/// Notification registration tied to the window; released before the window
/// is destroyed.
pub(crate) enum Registration {
    None,
    Power(HPOWERNOTIFY),
    Device(HDEVNOTIFY),
}

impl Drop for Registration {
    fn drop(&mut self) {
        let result = unsafe {
            match self {
                Registration::None => Ok(()),
                Registration::Power(handle) => UnregisterPowerSettingNotification(*handle),
                Registration::Device(handle) => UnregisterDeviceNotification(*handle),
            }
        };
        if let Err(e) = result {
            warn!("[{}][WATCHER] Failed to unregister notification: {:?}", DEBUG_NAME, e);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct WindowSpec {
    pub class_name: &'static str,
    /// Message-only windows receive registered notifications but no
    /// broadcasts such as WM_DISPLAYCHANGE.
    pub message_only: bool,
}

pub(crate) struct MessageWindowThread {
    thread_id: u32,
    handle: Option<JoinHandle<()>>,
}

impl MessageWindowThread {
    /// Spawns the thread and waits until its window exists and `register`
    /// has run, so a failure on either is returned here.
    pub fn spawn<R, H>(spec: WindowSpec, register: R, handler: H) -> Result<Self>
    where
        R: FnOnce(HWND) -> Result<Registration> + Send + 'static,
        H: Fn(u32, WPARAM, LPARAM) + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();

        let handle = thread::Builder::new()
            .name(format!("display-{}", spec.class_name))
            .spawn(move || run(spec, register, handler, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => Ok(Self {
                thread_id,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(DisplayError::native(
                    "MessageWindowThread",
                    format!("{} thread exited before its window was ready", spec.class_name),
                ))
            }
        }
    }

    /// Posts WM_QUIT to the thread and joins it.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        if let Err(e) = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            warn!("[{}][WATCHER] PostThreadMessageW failed: {:?}", DEBUG_NAME, e);
        }
        if handle.join().is_err() {
            warn!("[{}][WATCHER] Message thread panicked", DEBUG_NAME);
        }
    }
}

impl Drop for MessageWindowThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<R, H>(spec: WindowSpec, register: R, handler: H, ready: mpsc::Sender<Result<u32>>)
where
    R: FnOnce(HWND) -> Result<Registration>,
    H: Fn(u32, WPARAM, LPARAM) + 'static,
{
    let hwnd = match create_window(spec) {
        Ok(hwnd) => hwnd,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    HANDLER.with(|slot| *slot.borrow_mut() = Some(Box::new(handler)));

    let registration = match register(hwnd) {
        Ok(registration) => registration,
        Err(e) => {
            teardown(hwnd);
            let _ = ready.send(Err(e));
            return;
        }
    };

    let thread_id = unsafe { GetCurrentThreadId() };
    if ready.send(Ok(thread_id)).is_err() {
        drop(registration);
        teardown(hwnd);
        return;
    }
    debug!("[{}][WATCHER] {} window ready", DEBUG_NAME, spec.class_name);

    let mut msg = MSG::default();
    unsafe {
        // 0 is WM_QUIT, -1 is an error; both end the loop.
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    drop(registration);
    teardown(hwnd);
    debug!("[{}][WATCHER] {} window closed", DEBUG_NAME, spec.class_name);
}

fn create_window(spec: WindowSpec) -> Result<HWND> {
    let class_name = to_wstring(spec.class_name);
    let class = PCWSTR(class_name.as_ptr());

    let hinstance = unsafe {
        GetModuleHandleW(None)
            .map(|h| HINSTANCE(h.0))
            .map_err(|e| DisplayError::native("GetModuleHandleW", format!("{e:?}")))?
    };

    let wc = WNDCLASSW {
        lpfnWndProc: Some(window_proc),
        hInstance: hinstance,
        lpszClassName: class,
        ..Default::default()
    };

    // Registering twice fails harmlessly when a source is restarted.
    unsafe {
        let _ = RegisterClassW(&wc);
    }

    let parent = spec.message_only.then_some(HWND_MESSAGE);
    unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            class,
            PCWSTR::null(),
            WS_OVERLAPPED,
            0,
            0,
            0,
            0,
            parent,
            None,
            Some(hinstance),
            None,
        )
    }
    .map_err(|e| DisplayError::native("CreateWindowExW", format!("{e:?}")))
}

fn teardown(hwnd: HWND) {
    unsafe {
        let _ = DestroyWindow(hwnd);
    }
    HANDLER.with(|slot| *slot.borrow_mut() = None);
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    HANDLER.with(|slot| {
        if let Some(handler) = slot.borrow().as_ref() {
            handler(msg, wparam, lparam);
        }
    });
    DefWindowProcW(hwnd, msg, wparam, lparam)
}
