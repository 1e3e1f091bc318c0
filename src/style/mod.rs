//! Per-platform rendering rules.
//!
//! Each platform is one [`PlatformStyle`] record of plain functions. The
//! records share the data they consume ([`Profile`], [`Message`]) and the
//! description types below, but no behavior: every platform module answers every
//! question on its own.

mod imessage;
mod instagram;
mod messenger;
mod tinder;
mod whatsapp;

use serde::Serialize;

use crate::model::{Message, Platform, Profile};

pub type Rgba = [u8; 4];

pub const fn rgb(hex: u32) -> Rgba {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255]
}

pub const fn with_alpha(color: Rgba, alpha: u8) -> Rgba {
    [color[0], color[1], color[2], alpha]
}

pub const WHITE: Rgba = rgb(0xffffff);
pub const BLACK: Rgba = rgb(0x000000);
pub const SLATE_50: Rgba = rgb(0xf8fafc);
pub const SLATE_100: Rgba = rgb(0xf1f5f9);
pub const SLATE_200: Rgba = rgb(0xe2e8f0);
pub const SLATE_300: Rgba = rgb(0xcbd5e1);
pub const SLATE_400: Rgba = rgb(0x94a3b8);
pub const SLATE_500: Rgba = rgb(0x64748b);
pub const SLATE_800: Rgba = rgb(0x1e293b);
pub const SLATE_900: Rgba = rgb(0x0f172a);
pub const BLUE_500: Rgba = rgb(0x3b82f6);
pub const GREEN_500: Rgba = rgb(0x22c55e);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientDirection {
    ToRight,
    ToTopRight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Paint {
    Solid(Rgba),
    Gradient {
        direction: GradientDirection,
        stops: Vec<Rgba>,
    },
}

impl Paint {
    pub fn is_gradient(&self) -> bool {
        matches!(self, Paint::Gradient { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Corners {
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_right: f32,
    pub bottom_left: f32,
}

impl Corners {
    pub const fn all(radius: f32) -> Self {
        Self {
            top_left: radius,
            top_right: radius,
            bottom_right: radius,
            bottom_left: radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    /// Receiver side.
    Start,
    /// Sender side.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    Regular,
    Medium,
    Bold,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSpec {
    pub text: String,
    pub size: f32,
    pub color: Rgba,
    pub weight: Weight,
}

impl TextSpec {
    pub fn new(text: impl Into<String>, size: f32, color: Rgba) -> Self {
        Self {
            text: text.into(),
            size,
            color,
            weight: Weight::Regular,
        }
    }

    pub fn weight(mut self, weight: Weight) -> Self {
        self.weight = weight;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    ChevronLeft,
    Info,
    Phone,
    Camera,
    Video,
    MoreVertical,
    Smile,
    Paperclip,
    Send,
    Mic,
    Image,
    Plus,
    ThumbsUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IconSpec {
    pub icon: Icon,
    pub size: f32,
    pub color: Rgba,
    pub filled: bool,
}

impl IconSpec {
    pub const fn outline(icon: Icon, size: f32, color: Rgba) -> Self {
        Self {
            icon,
            size,
            color,
            filled: false,
        }
    }

    pub const fn filled(icon: Icon, size: f32, color: Rgba) -> Self {
        Self {
            icon,
            size,
            color,
            filled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvatarSpec {
    /// Image reference copied from the profile; empty draws only the placeholder.
    pub image: String,
    pub size: f32,
    pub placeholder: Rgba,
    pub ring: Option<Rgba>,
    pub presence_dot: Option<Rgba>,
}

impl AvatarSpec {
    pub fn new(image: &str, size: f32, placeholder: Rgba) -> Self {
        Self {
            image: image.to_owned(),
            size,
            placeholder,
            ring: None,
            presence_dot: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderLayout {
    /// Avatar, then title block, then trailing icons on one row.
    Row,
    /// Avatar stacked over the title block, centered.
    Centered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderSpec {
    pub layout: HeaderLayout,
    pub height: f32,
    pub background: Rgba,
    pub border_bottom: Option<Rgba>,
    pub shadow: bool,
    pub leading: Option<IconSpec>,
    pub avatar: AvatarSpec,
    pub title: TextSpec,
    /// Small dot drawn after the title.
    pub title_badge: Option<Rgba>,
    pub subtitle: TextSpec,
    pub trailing: Vec<IconSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StatusMark {
    /// Check glyphs drawn inline after the timestamp (one or two).
    Checks { count: u8, color: Rgba },
    /// Caption drawn under the bubble.
    Label(TextSpec),
    /// Tiny copy of the receiver avatar at the bubble's trailing edge.
    ReceiverAvatar { image: String, placeholder: Rgba },
    FilledCheck { color: Rgba },
    OutlineCheck { color: Rgba },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubbleSpec {
    pub align: Align,
    pub fill: Paint,
    pub border: Option<Rgba>,
    pub shadow: bool,
    pub corners: Corners,
    pub text: TextSpec,
    /// Fraction of the message area width a bubble may take.
    pub max_width: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    pub spacing_after: f32,
    /// Leading avatar for receiver rows.
    pub avatar: Option<AvatarSpec>,
    /// Timestamp set inside the bubble, after the text.
    pub inline_timestamp: Option<TextSpec>,
    /// Caption set under the bubble on the bubble's side.
    pub caption: Option<TextSpec>,
    pub status: Option<StatusMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingSpec {
    pub fill: Paint,
    pub border: Option<Rgba>,
    pub corners: Corners,
    pub dot_color: Rgba,
    pub avatar: Option<AvatarSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InputAction {
    Text(TextSpec),
    Round { fill: Rgba, icon: IconSpec },
    Icon(IconSpec),
    /// Plain colored circle (iMessage app drawer button).
    Dot { fill: Rgba, size: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputFieldSpec {
    pub fill: Rgba,
    pub border: Option<Rgba>,
    pub placeholder: TextSpec,
    pub leading: Vec<InputAction>,
    pub trailing: Vec<IconSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputBarSpec {
    pub height: f32,
    pub background: Rgba,
    pub border_top: Option<Rgba>,
    pub leading: Vec<InputAction>,
    pub field: InputFieldSpec,
    pub action: Option<InputAction>,
}

/// The message being styled and where it sits in the thread.
#[derive(Debug, Clone, Copy)]
pub struct BubbleContext<'a> {
    pub message: &'a Message,
    pub index: usize,
    /// True for the final entry of the full message sequence, whatever its role.
    pub is_last: bool,
    pub receiver: &'a Profile,
}

pub struct PlatformStyle {
    pub platform: Platform,
    pub background: Rgba,
    pub header: fn(&Profile) -> HeaderSpec,
    pub bubble: fn(&BubbleContext<'_>) -> BubbleSpec,
    pub typing: fn(&Profile) -> TypingSpec,
    pub input_bar: fn() -> InputBarSpec,
}

pub fn style_for(platform: Platform) -> &'static PlatformStyle {
    match platform {
        Platform::Tinder => &tinder::STYLE,
        Platform::WhatsApp => &whatsapp::STYLE,
        Platform::IMessage => &imessage::STYLE,
        Platform::Instagram => &instagram::STYLE,
        Platform::Messenger => &messenger::STYLE,
    }
}

#[cfg(test)]
mod tests {
    use super::{rgb, style_for, BubbleContext, StatusMark};
    use crate::model::{Message, MessageStatus, Platform, Profile, Role};

    fn message(index: usize, role: Role, status: MessageStatus) -> Message {
        Message {
            id: format!("{index}-text"),
            text: "text".to_owned(),
            sender: role,
            timestamp: "10:00".to_owned(),
            status: (role == Role::Sender).then_some(status),
        }
    }

    fn status_for(
        platform: Platform,
        role: Role,
        status: MessageStatus,
        is_last: bool,
    ) -> Option<StatusMark> {
        let receiver = Profile::default_receiver();
        let msg = message(0, role, status);
        let ctx = BubbleContext {
            message: &msg,
            index: 0,
            is_last,
            receiver: &receiver,
        };
        (style_for(platform).bubble)(&ctx).status
    }

    #[test]
    fn hex_colors_unpack_to_rgba() {
        assert_eq!(rgb(0x075e54), [0x07, 0x5e, 0x54, 255]);
    }

    #[test]
    fn registry_entries_match_their_platform() {
        for platform in Platform::ALL {
            assert_eq!(style_for(platform).platform, platform);
        }
    }

    #[test]
    fn receiver_messages_never_carry_a_status_mark() {
        for platform in Platform::ALL {
            for status in MessageStatus::ALL {
                assert_eq!(
                    status_for(platform, Role::Receiver, status, true),
                    None,
                    "{platform:?} {status:?}"
                );
            }
        }
    }

    #[test]
    fn tinder_never_shows_status() {
        for status in MessageStatus::ALL {
            assert_eq!(status_for(Platform::Tinder, Role::Sender, status, true), None);
        }
    }

    #[test]
    fn whatsapp_marks_every_sender_message() {
        let checks = |status| match status_for(Platform::WhatsApp, Role::Sender, status, false) {
            Some(StatusMark::Checks { count, color }) => (count, color),
            other => panic!("expected checks for {status:?}, got {other:?}"),
        };
        let (sent_count, _) = checks(MessageStatus::Sent);
        let (delivered_count, gray) = checks(MessageStatus::Delivered);
        let (read_count, blue) = checks(MessageStatus::Read);

        assert_eq!(sent_count, 1);
        assert_eq!(delivered_count, 2);
        assert_eq!(read_count, 2);
        assert_ne!(gray, blue, "read checks are colored differently");
    }

    #[test]
    fn imessage_labels_delivered_and_read() {
        let label = |status| match status_for(Platform::IMessage, Role::Sender, status, false) {
            Some(StatusMark::Label(text)) => Some(text.text),
            _ => None,
        };
        assert_eq!(label(MessageStatus::Sent), None);
        assert_eq!(label(MessageStatus::Delivered).as_deref(), Some("Delivered"));
        assert_eq!(label(MessageStatus::Read).as_deref(), Some("Read"));
    }

    #[test]
    fn instagram_shows_seen_only_on_last_read_sender_message() {
        assert!(matches!(
            status_for(Platform::Instagram, Role::Sender, MessageStatus::Read, true),
            Some(StatusMark::Label(ref text)) if text.text == "Seen"
        ));
        assert_eq!(
            status_for(Platform::Instagram, Role::Sender, MessageStatus::Read, false),
            None
        );
        assert_eq!(
            status_for(Platform::Instagram, Role::Sender, MessageStatus::Delivered, true),
            None
        );
    }

    #[test]
    fn messenger_glyph_follows_status_on_last_message() {
        assert!(matches!(
            status_for(Platform::Messenger, Role::Sender, MessageStatus::Read, true),
            Some(StatusMark::ReceiverAvatar { .. })
        ));
        assert!(matches!(
            status_for(Platform::Messenger, Role::Sender, MessageStatus::Delivered, true),
            Some(StatusMark::FilledCheck { .. })
        ));
        assert!(matches!(
            status_for(Platform::Messenger, Role::Sender, MessageStatus::Sent, true),
            Some(StatusMark::OutlineCheck { .. })
        ));
        assert_eq!(
            status_for(Platform::Messenger, Role::Sender, MessageStatus::Read, false),
            None
        );
    }
}
