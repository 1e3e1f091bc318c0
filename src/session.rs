//! The editor session: one owner for every piece of conversation state.
//!
//! Messages are never edited in place. Any change to the script or the
//! global status re-derives the whole list from the pair, so the rendered
//! thread always matches the current (script, status).

use std::time::Instant;

use chrono::{DateTime, Local};

use crate::model::{ConversationView, Message, MessageStatus, Platform, Profile};
use crate::render::{compose, ChatSurface};
use crate::script::{parse_script, DEFAULT_SCRIPT};
use crate::typing::TypingDebounce;

pub type Clock = fn() -> DateTime<Local>;

pub struct Studio {
    sender: Profile,
    receiver: Profile,
    platform: Platform,
    status: MessageStatus,
    script: String,
    messages: Vec<Message>,
    typing: TypingDebounce,
    clock: Clock,
}

impl Default for Studio {
    fn default() -> Self {
        Self::new()
    }
}

impl Studio {
    pub fn new() -> Self {
        Self::with_clock(Local::now)
    }

    /// Session whose timestamps come from `clock` instead of the wall clock.
    pub fn with_clock(clock: Clock) -> Self {
        let mut studio = Self {
            sender: Profile::default_sender(),
            receiver: Profile::default_receiver(),
            platform: Platform::Tinder,
            status: MessageStatus::Read,
            script: DEFAULT_SCRIPT.to_owned(),
            messages: Vec::new(),
            typing: TypingDebounce::default(),
            clock,
        };
        studio.rederive();
        studio
    }

    pub fn sender(&self) -> &Profile {
        &self.sender
    }

    pub fn receiver(&self) -> &Profile {
        &self.receiver
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_typing()
    }

    pub fn typing_deadline(&self) -> Option<Instant> {
        self.typing.deadline()
    }

    /// Replaces the script and counts as an edit for the typing indicator.
    pub fn set_script(&mut self, text: impl Into<String>, now: Instant) {
        self.script = text.into();
        self.rederive();
        self.typing.on_edit(now);
    }

    /// Replaces the script without arming the typing indicator, as when a
    /// document is opened.
    pub fn load_script(&mut self, text: impl Into<String>) {
        self.script = text.into();
        self.rederive();
    }

    pub fn clear_script(&mut self, now: Instant) {
        self.set_script(String::new(), now);
    }

    pub fn set_status(&mut self, status: MessageStatus) {
        if self.status != status {
            self.status = status;
            self.rederive();
        }
    }

    pub fn set_platform(&mut self, platform: Platform) {
        self.platform = platform;
    }

    pub fn set_sender(&mut self, profile: Profile) {
        self.sender = profile;
    }

    pub fn set_receiver(&mut self, profile: Profile) {
        self.receiver = profile;
    }

    /// Takes a generated script. Blank results leave the session untouched.
    pub fn apply_generated(&mut self, generated: &str, now: Instant) -> bool {
        let generated = generated.trim();
        if generated.is_empty() {
            tracing::debug!("generated script was empty; keeping current script");
            return false;
        }
        self.set_script(generated, now);
        true
    }

    /// Advances the typing debounce. Returns whether the indicator changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.typing.poll(now)
    }

    pub fn view(&self) -> ConversationView<'_> {
        ConversationView {
            sender: &self.sender,
            receiver: &self.receiver,
            platform: self.platform,
            messages: &self.messages,
            is_typing: self.typing.is_typing(),
        }
    }

    pub fn surface(&self) -> ChatSurface {
        compose(&self.view())
    }

    fn rederive(&mut self) {
        self.messages = parse_script(&self.script, self.status, (self.clock)());
        tracing::debug!(
            messages = self.messages.len(),
            status = self.status.keyword(),
            "re-derived messages"
        );
    }
}
