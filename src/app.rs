use crate::attachment::{self, SelectedFile};
use crate::notify::{NoticeKind, Notify, ToastList};
use crate::session::ChatSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,
    pub toasts: ToastList,

    // Draft editing state
    pub draft_cursor: usize, // cursor position in the draft text, in chars

    // Transcript view state
    pub transcript_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Attach prompt state (the file-picker surface)
    pub show_attach_prompt: bool,
    pub attach_input: String,
    pub attach_cursor: usize,

    // Display
    pub model: String,
}

impl App {
    pub fn new(session: ChatSession, model: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session,
            toasts: ToastList::new(),

            draft_cursor: 0,

            transcript_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            show_attach_prompt: false,
            attach_input: String::new(),
            attach_cursor: 0,

            model: model.into(),
        }
    }

    /// Sends the draft if there is one and no reply is pending.
    pub fn submit(&mut self) {
        if self.session.dispatch() {
            self.draft_cursor = 0;
            self.input_mode = InputMode::Normal;
            self.scroll_to_bottom();
        }
    }

    /// Settles the in-flight reply into the transcript (or a toast).
    pub async fn finish_send(&mut self) {
        self.session.reconcile(&mut self.toasts).await;
        self.scroll_to_bottom();
    }

    /// Tick event: advance the thinking animation, expire toasts.
    pub fn tick(&mut self) {
        if self.session.conversation().busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.toasts.tick();
    }

    pub fn open_attach_prompt(&mut self) {
        self.show_attach_prompt = true;
        self.attach_cursor = self.attach_input.chars().count();
    }

    pub fn close_attach_prompt(&mut self) {
        self.show_attach_prompt = false;
    }

    /// Validates the file named in the attach prompt and stages it on the
    /// draft. Rejections become toasts; the draft is left untouched and the
    /// prompt stays open so the path can be corrected.
    pub async fn stage_attachment(&mut self) {
        let path = self.attach_input.trim().to_string();
        if path.is_empty() {
            return;
        }

        let loaded = match SelectedFile::from_path(&path).await {
            Ok(file) => attachment::load(&file).await,
            Err(err) => Err(err),
        };

        match loaded {
            Ok(payload) => {
                self.session
                    .conversation_mut()
                    .set_draft_image(Some(payload));
                self.show_attach_prompt = false;
            }
            Err(err) => {
                self.toasts
                    .notify(NoticeKind::Error, "Attachment rejected", &err.to_string());
            }
        }
    }

    /// Discards the staged image and resets the attach prompt so the same
    /// file can be picked again.
    pub fn clear_attachment(&mut self) {
        self.session.conversation_mut().set_draft_image(None);
        self.attach_input.clear();
        self.attach_cursor = 0;
    }

    // Transcript scrolling
    pub fn scroll_up(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(1);
    }

    pub fn scroll_half_page_up(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(self.chat_height / 2);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(self.chat_height / 2);
    }

    pub fn scroll_to_top(&mut self) {
        self.transcript_scroll = 0;
    }

    /// Scroll the transcript so the latest message (or the thinking
    /// indicator) is visible.
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for message in self.session.conversation().messages() {
            total_lines += 1; // Role line ("You:" or "AI:")
            if message.image.is_some() {
                total_lines += 1; // Attachment marker line
            }
            for line in message.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.session.conversation().busy() {
            total_lines += 2; // "AI:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.transcript_scroll = total_lines.saturating_sub(visible_height);
    }
}
