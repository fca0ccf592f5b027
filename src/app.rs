use crate::backend::BackendClient;
use crate::session::{ChatSession, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation
    pub session: ChatSession,
    pub backend: BackendClient,
    pub reply_task: Option<tokio::task::JoinHandle<anyhow::Result<String>>>,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Transcript scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(session: ChatSession, backend: BackendClient) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            session,
            backend,
            reply_task: None,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,
        }
    }

    /// Submit the pending input. Ignored when blank or while a cycle is in
    /// flight; otherwise clears the input and spawns the backend call.
    pub fn submit(&mut self) {
        let text = self.input.clone();
        if !self.session.submit(&text) {
            return;
        }

        self.input.clear();
        self.cursor = 0;

        let backend = self.backend.clone();
        self.reply_task = Some(tokio::spawn(async move { backend.send(&text).await }));

        self.scroll_to_bottom();
    }

    /// Hand a finished backend call over to the session. Called from the
    /// event loop; a join error (panicked task) counts as a backend failure.
    pub async fn poll_reply(&mut self) {
        let finished = self
            .reply_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.reply_task.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(err) => Err(anyhow::Error::new(err)),
            };
            self.session.resolve(result);
            self.scroll_to_bottom();
        }
    }

    /// One reveal step, driven by the typing timer.
    pub fn advance_reveal(&mut self) {
        if self.session.advance_reveal() {
            self.scroll_to_bottom();
        }
    }

    /// Clear the conversation and its persisted history. Not available
    /// while a cycle is in flight, mirroring the disabled send affordance.
    pub fn reset(&mut self) {
        if self.session.is_busy() {
            return;
        }
        self.session.reset();
        self.chat_scroll = 0;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll the transcript so the latest message is visible.
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.session.messages() {
            total_lines += 1; // Role line ("Tú:" or "IA:")
            // Calculate wrapped lines for each line of content
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            // A closed code block renders to the same line count as its
            // source (label + body + rule vs fence + body + fence); only an
            // unmatched fence gains a line.
            if msg.role == Role::Assistant {
                let fences = msg.content.lines().filter(|l| l.starts_with("```")).count();
                if fences % 2 == 1 {
                    total_lines += 1;
                }
            }
            total_lines += 1; // Blank line after message
        }

        // Add lines for the "Escribiendo..." indicator
        if self.session.is_sending() {
            total_lines += 2; // "IA:" + "Escribiendo..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(amount);
    }
}
