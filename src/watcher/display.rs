// ~/Sentinel/sentinel-addons/display/src/watcher/display.rs

use windows::Win32::{Foundation::HWND, UI::WindowsAndMessaging::WM_DISPLAYCHANGE};

use crate::{
    error::Result,
    watcher::{
        message_window::{MessageWindowThread, Registration, WindowSpec},
        Notification, NotificationSink, NotificationSource,
    },
};

/// WM_DISPLAYCHANGE is only broadcast to top-level windows, so this source
/// owns a hidden one rather than a message-only window.
#[derive(Default)]
pub struct DisplayChangeSource {
    thread: Option<MessageWindowThread>,
}

impl DisplayChangeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationSource for DisplayChangeSource {
    fn name(&self) -> &'static str {
        "display"
    }

    fn start(&mut self, sink: NotificationSink) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        let spec = WindowSpec {
            class_name: "SentinelDisplayChange",
            message_only: false,
        };
        let thread = MessageWindowThread::spawn(
            spec,
            |_: HWND| Ok(Registration::None),
            move |msg, _, _| {
                if msg == WM_DISPLAYCHANGE {
                    sink(Notification::DisplaySettingsChanged);
                }
            },
        )?;

        self.thread = Some(thread);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut thread) = self.thread.take() {
            thread.stop();
        }
    }
}
