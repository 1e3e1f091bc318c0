use super::{
    rgb, Align, AvatarSpec, BubbleContext, BubbleSpec, Corners, HeaderLayout, HeaderSpec, Icon,
    IconSpec, InputAction, InputBarSpec, InputFieldSpec, Paint, PlatformStyle, StatusMark,
    TextSpec, TypingSpec, Weight, BLUE_500, GREEN_500, SLATE_100, SLATE_200, SLATE_400, SLATE_500,
    SLATE_900, WHITE,
};
use crate::model::{MessageStatus, Platform, Profile};

const MESSENGER_BLUE: [u8; 4] = rgb(0x0084ff);
const INCOMING: [u8; 4] = rgb(0xe4e6eb);

pub(super) static STYLE: PlatformStyle = PlatformStyle {
    platform: Platform::Messenger,
    background: WHITE,
    header,
    bubble,
    typing,
    input_bar,
};

fn header(receiver: &Profile) -> HeaderSpec {
    let mut avatar = AvatarSpec::new(&receiver.avatar, 36.0, SLATE_200);
    avatar.presence_dot = Some(GREEN_500);

    HeaderSpec {
        layout: HeaderLayout::Row,
        height: 56.0,
        background: WHITE,
        border_bottom: Some(SLATE_200),
        shadow: true,
        leading: Some(IconSpec::outline(Icon::ChevronLeft, 24.0, BLUE_500)),
        avatar,
        title: TextSpec::new(&receiver.name, 15.0, SLATE_900).weight(Weight::Bold),
        title_badge: None,
        subtitle: TextSpec::new(receiver.subtext_or("Active now"), 11.0, SLATE_500),
        trailing: vec![
            IconSpec::filled(Icon::Phone, 20.0, BLUE_500),
            IconSpec::filled(Icon::Video, 22.0, BLUE_500),
            IconSpec::filled(Icon::Info, 20.0, BLUE_500),
        ],
    }
}

fn bubble(ctx: &BubbleContext<'_>) -> BubbleSpec {
    let is_sender = ctx.message.is_sender();
    let status = if is_sender && ctx.is_last {
        ctx.message.status.map(|status| match status {
            MessageStatus::Read => StatusMark::ReceiverAvatar {
                image: ctx.receiver.avatar.clone(),
                placeholder: SLATE_200,
            },
            MessageStatus::Delivered => StatusMark::FilledCheck {
                color: MESSENGER_BLUE,
            },
            MessageStatus::Sent => StatusMark::OutlineCheck {
                color: MESSENGER_BLUE,
            },
        })
    } else {
        None
    };

    BubbleSpec {
        align: if is_sender { Align::End } else { Align::Start },
        fill: Paint::Solid(if is_sender { MESSENGER_BLUE } else { INCOMING }),
        border: None,
        shadow: false,
        corners: Corners::all(18.0),
        text: TextSpec::new(
            &ctx.message.text,
            15.0,
            if is_sender { WHITE } else { SLATE_900 },
        ),
        max_width: 0.75,
        padding_x: 14.0,
        padding_y: 8.0,
        spacing_after: 6.0,
        avatar: (!is_sender).then(|| AvatarSpec::new(&ctx.receiver.avatar, 28.0, SLATE_200)),
        inline_timestamp: None,
        caption: None,
        status,
    }
}

fn typing(receiver: &Profile) -> TypingSpec {
    TypingSpec {
        fill: Paint::Solid(INCOMING),
        border: None,
        corners: Corners::all(18.0),
        dot_color: SLATE_500,
        avatar: Some(AvatarSpec::new(&receiver.avatar, 28.0, SLATE_200)),
    }
}

fn input_bar() -> InputBarSpec {
    InputBarSpec {
        height: 52.0,
        background: WHITE,
        border_top: None,
        leading: vec![
            InputAction::Icon(IconSpec::outline(Icon::Plus, 22.0, BLUE_500)),
            InputAction::Icon(IconSpec::filled(Icon::Camera, 22.0, BLUE_500)),
            InputAction::Icon(IconSpec::filled(Icon::Image, 22.0, BLUE_500)),
            InputAction::Icon(IconSpec::filled(Icon::Mic, 22.0, BLUE_500)),
        ],
        field: InputFieldSpec {
            fill: SLATE_100,
            border: None,
            placeholder: TextSpec::new("Message", 14.0, SLATE_400),
            leading: Vec::new(),
            trailing: vec![IconSpec::outline(Icon::Smile, 20.0, BLUE_500)],
        },
        action: Some(InputAction::Icon(IconSpec::filled(
            Icon::ThumbsUp,
            24.0,
            BLUE_500,
        ))),
    }
}
