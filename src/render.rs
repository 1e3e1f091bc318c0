use serde::Serialize;

use crate::model::{ConversationView, Platform};
use crate::style::{
    style_for, BubbleContext, BubbleSpec, HeaderSpec, InputBarSpec, Rgba, TextSpec, TypingSpec,
    Weight, SLATE_400, SLATE_800,
};

pub const EMPTY_STATE_TEXT: &str = "Start typing below...";

/// Logical visual tree for one render pass. Positions are assigned later by
/// [`crate::layout`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSurface {
    pub platform: Platform,
    pub background: Rgba,
    pub header: HeaderSpec,
    pub body: SurfaceBody,
    pub input_bar: InputBarSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SurfaceBody {
    Empty(EmptyState),
    Thread {
        rows: Vec<MessageRow>,
        typing: Option<TypingSpec>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyState {
    pub text: TextSpec,
    /// Dashed ring drawn above the text.
    pub ring: Rgba,
    /// Opacity applied to the whole placeholder.
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRow {
    pub id: String,
    pub bubble: BubbleSpec,
}

impl ChatSurface {
    pub fn rows(&self) -> &[MessageRow] {
        match &self.body {
            SurfaceBody::Thread { rows, .. } => rows,
            SurfaceBody::Empty(_) => &[],
        }
    }

    pub fn typing(&self) -> Option<&TypingSpec> {
        match &self.body {
            SurfaceBody::Thread { typing, .. } => typing.as_ref(),
            SurfaceBody::Empty(_) => None,
        }
    }

    pub fn is_empty_state(&self) -> bool {
        matches!(self.body, SurfaceBody::Empty(_))
    }
}

/// Composes the full surface: header, message list (or the empty-state
/// placeholder), trailing typing bubble and input bar.
pub fn compose(view: &ConversationView<'_>) -> ChatSurface {
    let style = style_for(view.platform);
    let header = (style.header)(view.receiver);
    let input_bar = (style.input_bar)();

    let body = if view.messages.is_empty() {
        SurfaceBody::Empty(EmptyState {
            text: TextSpec::new(EMPTY_STATE_TEXT, 14.0, SLATE_800).weight(Weight::Medium),
            ring: SLATE_400,
            opacity: 0.3,
        })
    } else {
        let last_index = view.messages.len() - 1;
        let rows = view
            .messages
            .iter()
            .enumerate()
            .map(|(index, message)| MessageRow {
                id: message.id.clone(),
                bubble: (style.bubble)(&BubbleContext {
                    message,
                    index,
                    is_last: index == last_index,
                    receiver: view.receiver,
                }),
            })
            .collect();
        SurfaceBody::Thread {
            rows,
            typing: view.is_typing.then(|| (style.typing)(view.receiver)),
        }
    };

    tracing::trace!(
        platform = view.platform.keyword(),
        messages = view.messages.len(),
        typing = view.is_typing,
        "composed chat surface"
    );

    ChatSurface {
        platform: view.platform,
        background: style.background,
        header,
        body,
        input_bar,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::{compose, ChatSurface, EMPTY_STATE_TEXT};
    use crate::model::{ConversationView, Message, MessageStatus, Platform, Profile};
    use crate::script::parse_script;
    use crate::style::{Align, Paint, StatusMark};

    fn messages(script: &str, status: MessageStatus) -> Vec<Message> {
        let now = Local
            .with_ymd_and_hms(2026, 6, 1, 18, 45, 0)
            .earliest()
            .expect("fixed test time should exist");
        parse_script(script, status, now)
    }

    fn surface(
        platform: Platform,
        messages: &[Message],
        is_typing: bool,
    ) -> ChatSurface {
        let sender = Profile::default_sender();
        let receiver = Profile::default_receiver();
        compose(&ConversationView {
            sender: &sender,
            receiver: &receiver,
            platform,
            messages,
            is_typing,
        })
    }

    #[test]
    fn messenger_marks_only_the_last_message() {
        let msgs = messages("> hi\n< hey\n> you there?", MessageStatus::Read);
        let surface = surface(Platform::Messenger, &msgs, false);
        let rows = surface.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].bubble.status, None);
        assert_eq!(rows[1].bubble.status, None);
        assert!(matches!(
            rows[2].bubble.status,
            Some(StatusMark::ReceiverAvatar { .. })
        ));
    }

    #[test]
    fn last_receiver_line_hides_the_seen_marker() {
        let msgs = messages("> hi\n< hey", MessageStatus::Read);
        for platform in [Platform::Messenger, Platform::Instagram] {
            let surface = surface(platform, &msgs, false);
            assert!(
                surface.rows().iter().all(|row| row.bubble.status.is_none()),
                "{platform:?} should show no marker when the thread ends on the receiver"
            );
        }
    }

    #[test]
    fn tinder_aligns_and_paints_by_role_without_status() {
        for status in MessageStatus::ALL {
            let msgs = messages("> Yo!\n< Hey!", status);
            let surface = surface(Platform::Tinder, &msgs, false);
            let rows = surface.rows();
            assert_eq!(rows.len(), 2);

            assert_eq!(rows[0].bubble.align, Align::End);
            assert!(rows[0].bubble.fill.is_gradient());
            assert_eq!(rows[1].bubble.align, Align::Start);
            assert!(matches!(rows[1].bubble.fill, Paint::Solid(_)));

            assert!(rows.iter().all(|row| row.bubble.status.is_none()));
            assert!(rows.iter().all(|row| row.bubble.caption.is_some()));
        }
    }

    #[test]
    fn empty_thread_shows_placeholder_but_keeps_chrome() {
        let msgs = messages("just words\n\n", MessageStatus::Read);
        assert!(msgs.is_empty());
        let surface = surface(Platform::WhatsApp, &msgs, true);
        assert!(surface.is_empty_state());
        assert!(surface.typing().is_none());
        assert_eq!(surface.header.title.text, "Jordan");
        assert_eq!(surface.input_bar.field.placeholder.text, "Message");
        let super::SurfaceBody::Empty(empty) = &surface.body else {
            panic!("expected empty state");
        };
        assert_eq!(empty.text.text, EMPTY_STATE_TEXT);
    }

    #[test]
    fn typing_bubble_trails_the_thread_only_while_typing() {
        let msgs = messages("> hi", MessageStatus::Sent);
        assert!(surface(Platform::IMessage, &msgs, true).typing().is_some());
        assert!(surface(Platform::IMessage, &msgs, false).typing().is_none());
    }

    #[test]
    fn rows_keep_message_ids_in_order() {
        let msgs = messages("> a\n< b\n> c", MessageStatus::Delivered);
        let surface = surface(Platform::Instagram, &msgs, false);
        let ids = surface
            .rows()
            .iter()
            .map(|row| row.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["0-a", "1-b", "2-c"]);
    }

    #[test]
    fn header_uses_receiver_subtext_with_platform_fallbacks() {
        let msgs = messages("> hi", MessageStatus::Read);
        let sender = Profile::default_sender();
        let receiver = Profile::new("Kim");
        let view = |platform| ConversationView {
            sender: &sender,
            receiver: &receiver,
            platform,
            messages: &msgs,
            is_typing: false,
        };
        assert_eq!(compose(&view(Platform::WhatsApp)).header.subtitle.text, "online");
        assert_eq!(
            compose(&view(Platform::Messenger)).header.subtitle.text,
            "Active now"
        );
        assert_eq!(
            compose(&view(Platform::Tinder)).header.subtitle.text,
            "MATCHED ON TINDER"
        );
    }
}
