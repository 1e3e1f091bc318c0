use super::{
    rgb, Align, AvatarSpec, BubbleContext, BubbleSpec, Corners, GradientDirection, HeaderLayout,
    HeaderSpec, Icon, IconSpec, InputAction, InputBarSpec, InputFieldSpec, Paint, PlatformStyle,
    TextSpec, TypingSpec, Weight, SLATE_100, SLATE_200, SLATE_300, SLATE_400, SLATE_800, WHITE,
};
use crate::model::{Platform, Profile};

const CORAL: [u8; 4] = rgb(0xff6b6b);
const ORANGE: [u8; 4] = rgb(0xff8e53);

pub(super) static STYLE: PlatformStyle = PlatformStyle {
    platform: Platform::Tinder,
    background: WHITE,
    header,
    bubble,
    typing,
    input_bar,
};

fn header(receiver: &Profile) -> HeaderSpec {
    HeaderSpec {
        layout: HeaderLayout::Row,
        height: 64.0,
        background: WHITE,
        border_bottom: Some(SLATE_200),
        shadow: false,
        leading: None,
        avatar: AvatarSpec::new(&receiver.avatar, 40.0, SLATE_200),
        title: TextSpec::new(&receiver.name, 16.0, SLATE_800).weight(Weight::Bold),
        title_badge: None,
        subtitle: TextSpec::new("MATCHED ON TINDER", 11.0, SLATE_400),
        trailing: vec![IconSpec::outline(Icon::Info, 20.0, SLATE_300)],
    }
}

fn bubble(ctx: &BubbleContext<'_>) -> BubbleSpec {
    let is_sender = ctx.message.is_sender();
    let (fill, text_color, corners) = if is_sender {
        (
            Paint::Gradient {
                direction: GradientDirection::ToRight,
                stops: vec![CORAL, ORANGE],
            },
            WHITE,
            Corners {
                top_right: 0.0,
                ..Corners::all(16.0)
            },
        )
    } else {
        (
            Paint::Solid(SLATE_100),
            SLATE_800,
            Corners {
                top_left: 0.0,
                ..Corners::all(16.0)
            },
        )
    };

    BubbleSpec {
        align: if is_sender { Align::End } else { Align::Start },
        fill,
        border: None,
        shadow: false,
        corners,
        text: TextSpec::new(&ctx.message.text, 14.0, text_color),
        max_width: 0.8,
        padding_x: 16.0,
        padding_y: 10.0,
        spacing_after: 16.0,
        avatar: None,
        inline_timestamp: None,
        caption: Some(
            TextSpec::new(ctx.message.timestamp.to_uppercase(), 10.0, SLATE_400)
                .weight(Weight::Bold),
        ),
        status: None,
    }
}

fn typing(_receiver: &Profile) -> TypingSpec {
    TypingSpec {
        fill: Paint::Solid(SLATE_100),
        border: None,
        corners: Corners {
            top_left: 0.0,
            ..Corners::all(16.0)
        },
        dot_color: SLATE_400,
        avatar: None,
    }
}

fn input_bar() -> InputBarSpec {
    InputBarSpec {
        height: 76.0,
        background: WHITE,
        border_top: Some(SLATE_200),
        leading: Vec::new(),
        field: InputFieldSpec {
            fill: SLATE_100,
            border: None,
            placeholder: TextSpec::new("Type a message", 14.0, SLATE_400),
            leading: Vec::new(),
            trailing: Vec::new(),
        },
        action: Some(InputAction::Text(
            TextSpec::new("SEND", 14.0, CORAL).weight(Weight::Bold),
        )),
    }
}
