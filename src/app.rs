use std::path::PathBuf;

use crate::backend::BackendClient;
use crate::chat::ChatClient;

pub const SPINNER_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// One-line notice shown in the footer until the next one replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Info(String),
    Error(String),
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub chat: ChatClient,
    pub status: Option<StatusLine>,

    // Animation state
    pub animation_frame: usize,

    // Log area inner size, updated during render for paging
    pub log_height: u16,

    // Backend
    pub backend: BackendClient,
    pub evidence_dir: PathBuf,
}

impl App {
    pub fn new(backend: BackendClient, evidence_dir: PathBuf) -> Self {
        Self {
            should_quit: false,
            chat: ChatClient::new(),
            status: None,
            animation_frame: 0,
            log_height: 0,
            backend,
            evidence_dir,
        }
    }

    /// Advance the spinner while requests are in flight
    pub fn tick_animation(&mut self) {
        if self.chat.pending_count() > 0 {
            self.animation_frame = (self.animation_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.animation_frame % SPINNER_FRAMES.len()]
    }

    pub fn half_page(&self) -> u16 {
        (self.log_height / 2).max(1)
    }

    /// Write the newest evidence image to the evidence directory.
    pub fn save_latest_evidence(&mut self) {
        let Some((entry, evidence)) = self.chat.latest_evidence() else {
            self.status = Some(StatusLine::Error("No evidence image to save".to_string()));
            return;
        };

        self.status = Some(match evidence.save_in(&self.evidence_dir, entry) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "evidence image saved");
                StatusLine::Info(format!("Saved {}", path.display()))
            }
            Err(e) => {
                tracing::error!(error = %e, dir = %self.evidence_dir.display(), "saving evidence failed");
                StatusLine::Error(format!("Could not save image: {}", e))
            }
        });
    }

    #[cfg(test)]
    pub fn new_for_test(base_url: &str, evidence_dir: PathBuf) -> Self {
        Self::new(BackendClient::new(base_url, "/api/chat"), evidence_dir)
    }
}
