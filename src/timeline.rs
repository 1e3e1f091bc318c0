use serde::Serialize;

use crate::model::Message;

pub const RECEIVER_TYPING_MS: u64 = 1200;
pub const SENDER_GAP_MS: u64 = 600;
pub const CLOSING_HOLD_MS: u64 = 1500;
pub const DEFAULT_FPS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum RevealOp {
    ShowTyping,
    /// The first `n` messages are visible and the typing bubble is gone.
    Reveal(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimedEvent {
    pub at_ms: u64,
    pub op: RevealOp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevealState {
    pub visible: usize,
    pub is_typing: bool,
}

/// When each message of a recorded clip appears.
///
/// The first message is on screen from the first frame. After that a
/// receiver message is announced by the typing bubble for
/// [`RECEIVER_TYPING_MS`], a sender message follows a [`SENDER_GAP_MS`]
/// pause, and the clip holds the full thread for [`CLOSING_HOLD_MS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealTimeline {
    events: Vec<TimedEvent>,
    duration_ms: u64,
}

pub fn build_timeline(messages: &[Message]) -> RevealTimeline {
    let mut events = Vec::with_capacity(messages.len() * 2);
    let mut current_ms = 0_u64;

    for (index, message) in messages.iter().enumerate() {
        if index > 0 {
            if message.is_sender() {
                current_ms = current_ms.saturating_add(SENDER_GAP_MS);
            } else {
                events.push(TimedEvent {
                    at_ms: current_ms,
                    op: RevealOp::ShowTyping,
                });
                current_ms = current_ms.saturating_add(RECEIVER_TYPING_MS);
            }
        }
        events.push(TimedEvent {
            at_ms: current_ms,
            op: RevealOp::Reveal(index + 1),
        });
    }

    RevealTimeline {
        events,
        duration_ms: current_ms.saturating_add(CLOSING_HOLD_MS),
    }
}

impl RevealTimeline {
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn state_at(&self, at_ms: u64) -> RevealState {
        let mut state = RevealState::default();
        for event in self.events.iter().take_while(|event| event.at_ms <= at_ms) {
            match event.op {
                RevealOp::ShowTyping => state.is_typing = true,
                RevealOp::Reveal(visible) => {
                    state.visible = visible;
                    state.is_typing = false;
                }
            }
        }
        state
    }

    pub fn frame_count(&self, fps: u32) -> u64 {
        let fps = u64::from(fps.max(1));
        (self.duration_ms * fps).div_ceil(1000).max(1)
    }

    pub fn frame_time_ms(frame: u64, fps: u32) -> u64 {
        frame * 1000 / u64::from(fps.max(1))
    }
}
