/// How many ticks a toast stays on screen (the tick timer runs at 300ms).
const TOAST_TICKS: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

/// Where recoverable failures surface. The send pipeline and the attachment
/// validator report through this; they never render anything themselves.
pub trait Notify {
    fn notify(&mut self, kind: NoticeKind, title: &str, description: &str);
}

/// Notices the renderer shows as toasts, expired by the tick timer.
#[derive(Default)]
pub struct ToastList {
    entries: Vec<(Notice, u8)>,
}

impl ToastList {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent notice still on screen.
    pub fn current(&self) -> Option<&Notice> {
        self.entries.last().map(|(notice, _)| notice)
    }

    pub fn tick(&mut self) {
        for (_, ticks_left) in &mut self.entries {
            *ticks_left = ticks_left.saturating_sub(1);
        }
        self.entries.retain(|(_, ticks_left)| *ticks_left > 0);
    }
}

impl Notify for ToastList {
    fn notify(&mut self, kind: NoticeKind, title: &str, description: &str) {
        self.entries.push((
            Notice {
                kind,
                title: title.to_string(),
                description: description.to_string(),
            },
            TOAST_TICKS,
        ));
    }
}
