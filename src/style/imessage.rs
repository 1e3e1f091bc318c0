use super::{
    rgb, Align, AvatarSpec, BubbleContext, BubbleSpec, Corners, HeaderLayout, HeaderSpec, Icon,
    IconSpec, InputAction, InputBarSpec, InputFieldSpec, Paint, PlatformStyle, StatusMark,
    TextSpec, TypingSpec, Weight, BLACK, BLUE_500, SLATE_200, SLATE_300, SLATE_400, SLATE_50,
    WHITE,
};
use crate::model::{MessageStatus, Platform, Profile};

const IOS_BLUE: [u8; 4] = rgb(0x007aff);
const IOS_GRAY: [u8; 4] = rgb(0xe9e9eb);

pub(super) static STYLE: PlatformStyle = PlatformStyle {
    platform: Platform::IMessage,
    background: WHITE,
    header,
    bubble,
    typing,
    input_bar,
};

fn header(receiver: &Profile) -> HeaderSpec {
    let mut avatar = AvatarSpec::new(&receiver.avatar, 48.0, SLATE_300);
    avatar.ring = Some(WHITE);

    HeaderSpec {
        layout: HeaderLayout::Centered,
        height: 96.0,
        background: SLATE_50,
        border_bottom: Some(SLATE_200),
        shadow: false,
        leading: None,
        avatar,
        title: TextSpec::new(&receiver.name, 12.0, BLACK).weight(Weight::Bold),
        title_badge: Some(BLUE_500),
        subtitle: TextSpec::new("iMessage", 9.0, SLATE_400).weight(Weight::Medium),
        trailing: Vec::new(),
    }
}

fn bubble(ctx: &BubbleContext<'_>) -> BubbleSpec {
    let is_sender = ctx.message.is_sender();
    let status = if is_sender {
        ctx.message.status.and_then(|status| {
            let label = match status {
                MessageStatus::Sent => return None,
                MessageStatus::Delivered => "Delivered",
                MessageStatus::Read => "Read",
            };
            Some(StatusMark::Label(TextSpec::new(label, 10.0, SLATE_400)))
        })
    } else {
        None
    };

    BubbleSpec {
        align: if is_sender { Align::End } else { Align::Start },
        fill: Paint::Solid(if is_sender { IOS_BLUE } else { IOS_GRAY }),
        border: None,
        shadow: false,
        corners: if is_sender {
            Corners {
                bottom_right: 2.0,
                ..Corners::all(20.0)
            }
        } else {
            Corners {
                bottom_left: 2.0,
                ..Corners::all(20.0)
            }
        },
        text: TextSpec::new(&ctx.message.text, 15.0, if is_sender { WHITE } else { BLACK }),
        max_width: 0.7,
        padding_x: 16.0,
        padding_y: 8.0,
        spacing_after: 8.0,
        avatar: None,
        inline_timestamp: None,
        caption: None,
        status,
    }
}

fn typing(_receiver: &Profile) -> TypingSpec {
    TypingSpec {
        fill: Paint::Solid(IOS_GRAY),
        border: None,
        corners: Corners {
            bottom_left: 2.0,
            ..Corners::all(20.0)
        },
        dot_color: rgb(0x8e8e93),
        avatar: None,
    }
}

fn input_bar() -> InputBarSpec {
    InputBarSpec {
        height: 56.0,
        background: WHITE,
        border_top: None,
        leading: vec![
            InputAction::Icon(IconSpec::outline(Icon::Camera, 24.0, SLATE_400)),
            InputAction::Dot {
                fill: BLUE_500,
                size: 28.0,
            },
        ],
        field: InputFieldSpec {
            fill: WHITE,
            border: Some(SLATE_200),
            placeholder: TextSpec::new("iMessage", 14.0, SLATE_300),
            leading: Vec::new(),
            trailing: Vec::new(),
        },
        action: None,
    }
}
