use super::{
    rgb, with_alpha, Align, AvatarSpec, BubbleContext, BubbleSpec, Corners, HeaderLayout,
    HeaderSpec, Icon, IconSpec, InputAction, InputBarSpec, InputFieldSpec, Paint, PlatformStyle,
    StatusMark, TextSpec, TypingSpec, Weight, SLATE_300, SLATE_400, WHITE,
};
use crate::model::{MessageStatus, Platform, Profile};

const TEAL_DARK: [u8; 4] = rgb(0x075e54);
const TEAL: [u8; 4] = rgb(0x128c7e);
const OUTGOING: [u8; 4] = rgb(0xdcf8c6);
const WALLPAPER: [u8; 4] = rgb(0xe5ddd5);
const INPUT_TRAY: [u8; 4] = rgb(0xf0f0f0);
const READ_BLUE: [u8; 4] = rgb(0x34b7f1);
const INK: [u8; 4] = rgb(0x111b21);

pub(super) static STYLE: PlatformStyle = PlatformStyle {
    platform: Platform::WhatsApp,
    background: WALLPAPER,
    header,
    bubble,
    typing,
    input_bar,
};

fn header(receiver: &Profile) -> HeaderSpec {
    HeaderSpec {
        layout: HeaderLayout::Row,
        height: 52.0,
        background: TEAL_DARK,
        border_bottom: None,
        shadow: false,
        leading: Some(IconSpec::outline(Icon::ChevronLeft, 20.0, WHITE)),
        avatar: AvatarSpec::new(&receiver.avatar, 36.0, SLATE_300),
        title: TextSpec::new(&receiver.name, 14.0, WHITE).weight(Weight::Medium),
        title_badge: None,
        subtitle: TextSpec::new(receiver.subtext_or("online"), 10.0, with_alpha(WHITE, 204)),
        trailing: vec![
            IconSpec::filled(Icon::Phone, 16.0, WHITE),
            IconSpec::filled(Icon::Camera, 18.0, WHITE),
            IconSpec::outline(Icon::MoreVertical, 18.0, WHITE),
        ],
    }
}

fn bubble(ctx: &BubbleContext<'_>) -> BubbleSpec {
    let is_sender = ctx.message.is_sender();
    let status = if is_sender {
        ctx.message.status.map(|status| match status {
            MessageStatus::Sent => StatusMark::Checks {
                count: 1,
                color: SLATE_400,
            },
            MessageStatus::Delivered => StatusMark::Checks {
                count: 2,
                color: SLATE_400,
            },
            MessageStatus::Read => StatusMark::Checks {
                count: 2,
                color: READ_BLUE,
            },
        })
    } else {
        None
    };

    BubbleSpec {
        align: if is_sender { Align::End } else { Align::Start },
        fill: Paint::Solid(if is_sender { OUTGOING } else { WHITE }),
        border: None,
        shadow: true,
        corners: Corners::all(8.0),
        text: TextSpec::new(&ctx.message.text, 13.0, INK),
        max_width: 0.85,
        padding_x: 8.0,
        padding_y: 4.0,
        spacing_after: 8.0,
        avatar: None,
        inline_timestamp: Some(TextSpec::new(&ctx.message.timestamp, 9.0, SLATE_400)),
        caption: None,
        status,
    }
}

fn typing(_receiver: &Profile) -> TypingSpec {
    TypingSpec {
        fill: Paint::Solid(WHITE),
        border: None,
        corners: Corners::all(8.0),
        dot_color: SLATE_400,
        avatar: None,
    }
}

fn input_bar() -> InputBarSpec {
    InputBarSpec {
        height: 60.0,
        background: INPUT_TRAY,
        border_top: None,
        leading: Vec::new(),
        field: InputFieldSpec {
            fill: WHITE,
            border: None,
            placeholder: TextSpec::new("Message", 14.0, SLATE_400),
            leading: vec![InputAction::Icon(IconSpec::outline(
                Icon::Smile,
                20.0,
                SLATE_400,
            ))],
            trailing: vec![
                IconSpec::outline(Icon::Paperclip, 18.0, SLATE_400),
                IconSpec::outline(Icon::Camera, 18.0, SLATE_400),
            ],
        },
        action: Some(InputAction::Round {
            fill: TEAL,
            icon: IconSpec::filled(Icon::Send, 20.0, WHITE),
        }),
    }
}
