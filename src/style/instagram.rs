use super::{
    rgb, Align, AvatarSpec, BubbleContext, BubbleSpec, Corners, GradientDirection, HeaderLayout,
    HeaderSpec, Icon, IconSpec, InputAction, InputBarSpec, InputFieldSpec, Paint, PlatformStyle,
    StatusMark, TextSpec, TypingSpec, Weight, BLUE_500, SLATE_100, SLATE_200, SLATE_400, SLATE_50,
    SLATE_800, SLATE_900, WHITE,
};
use crate::model::{MessageStatus, Platform, Profile};

const INDIGO: [u8; 4] = rgb(0x6366f1);
const PURPLE: [u8; 4] = rgb(0xa855f7);
const PINK: [u8; 4] = rgb(0xec4899);

pub(super) static STYLE: PlatformStyle = PlatformStyle {
    platform: Platform::Instagram,
    background: WHITE,
    header,
    bubble,
    typing,
    input_bar,
};

fn header(receiver: &Profile) -> HeaderSpec {
    HeaderSpec {
        layout: HeaderLayout::Row,
        height: 60.0,
        background: WHITE,
        border_bottom: Some(SLATE_200),
        shadow: false,
        leading: Some(IconSpec::outline(Icon::ChevronLeft, 24.0, SLATE_800)),
        avatar: AvatarSpec::new(&receiver.avatar, 32.0, SLATE_200),
        title: TextSpec::new(&receiver.name, 14.0, SLATE_800).weight(Weight::Bold),
        title_badge: None,
        subtitle: TextSpec::new("Instagram", 11.0, SLATE_400),
        trailing: vec![
            IconSpec::outline(Icon::Phone, 20.0, SLATE_800),
            IconSpec::outline(Icon::Video, 22.0, SLATE_800),
        ],
    }
}

fn bubble(ctx: &BubbleContext<'_>) -> BubbleSpec {
    let is_sender = ctx.message.is_sender();
    // "Seen" hangs off the thread's final entry only, and only when it is ours.
    let status = (is_sender && ctx.is_last && ctx.message.status == Some(MessageStatus::Read))
        .then(|| StatusMark::Label(TextSpec::new("Seen", 11.0, SLATE_400)));

    BubbleSpec {
        align: if is_sender { Align::End } else { Align::Start },
        fill: if is_sender {
            Paint::Gradient {
                direction: GradientDirection::ToTopRight,
                stops: vec![INDIGO, PURPLE, PINK],
            }
        } else {
            Paint::Solid(SLATE_100)
        },
        border: (!is_sender).then_some(SLATE_200),
        shadow: false,
        corners: Corners::all(22.0),
        text: TextSpec::new(
            &ctx.message.text,
            14.0,
            if is_sender { WHITE } else { SLATE_900 },
        ),
        max_width: 0.75,
        padding_x: 16.0,
        padding_y: 10.0,
        spacing_after: 8.0,
        avatar: (!is_sender).then(|| AvatarSpec::new(&ctx.receiver.avatar, 28.0, SLATE_200)),
        inline_timestamp: None,
        caption: None,
        status,
    }
}

fn typing(receiver: &Profile) -> TypingSpec {
    TypingSpec {
        fill: Paint::Solid(SLATE_100),
        border: Some(SLATE_200),
        corners: Corners::all(22.0),
        dot_color: SLATE_400,
        avatar: Some(AvatarSpec::new(&receiver.avatar, 28.0, SLATE_200)),
    }
}

fn input_bar() -> InputBarSpec {
    InputBarSpec {
        height: 64.0,
        background: WHITE,
        border_top: None,
        leading: Vec::new(),
        field: InputFieldSpec {
            fill: SLATE_50,
            border: Some(SLATE_200),
            placeholder: TextSpec::new("Message...", 14.0, SLATE_400),
            leading: vec![InputAction::Round {
                fill: BLUE_500,
                icon: IconSpec::filled(Icon::Camera, 18.0, WHITE),
            }],
            trailing: vec![
                IconSpec::outline(Icon::Mic, 20.0, SLATE_800),
                IconSpec::outline(Icon::Image, 20.0, SLATE_800),
                IconSpec::outline(Icon::Smile, 20.0, SLATE_800),
            ],
        },
        action: None,
    }
}
