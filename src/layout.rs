//! Places a [`ChatSurface`] on the phone frame.
//!
//! All coordinates are logical pixels on a 375 x 792 canvas; the rasterizer
//! multiplies by its supersampling factor. Message rows are stacked top to
//! bottom and the list is pinned to its newest entry: the scroll offset is
//! whatever hides the overflow above the viewport.

use serde::Serialize;

use crate::render::{ChatSurface, SurfaceBody};
use crate::style::{
    Align, BubbleSpec, HeaderLayout, HeaderSpec, InputAction, InputBarSpec, Rgba, StatusMark,
    TextSpec, TypingSpec, Weight,
};

pub const FRAME_WIDTH: f32 = 375.0;
pub const FRAME_HEIGHT: f32 = 792.0;
pub const BEZEL: f32 = 8.0;
pub const SCREEN_INSET: f32 = BEZEL + 12.0;
pub const FRAME_RADIUS: f32 = 48.0;
pub const SCREEN_RADIUS: f32 = 38.0;
pub const NOTCH_WIDTH: f32 = 160.0;
pub const NOTCH_HEIGHT: f32 = 24.0;

const AREA_PADDING: f32 = 16.0;
const AVATAR_GAP: f32 = 8.0;
const CAPTION_GAP: f32 = 4.0;
const STATUS_GLYPH: f32 = 14.0;
const CHECK_WIDTH: f32 = 14.0;
const TYPING_DOT: f32 = 8.0;
const TYPING_DOT_GAP: f32 = 5.0;
const EMPTY_RING: f32 = 96.0;

/// Text metrics seam: the fontdue painter answers with real glyph advances,
/// [`FixedAdvance`] with an estimate when no font is loaded.
pub trait TextMeasure {
    fn advance(&self, text: &str, size: f32, weight: Weight) -> f32;

    fn line_height(&self, size: f32) -> f32 {
        (size * 1.3).ceil()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance {
    pub em_ratio: f32,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { em_ratio: 0.55 }
    }
}

impl TextMeasure for FixedAdvance {
    fn advance(&self, text: &str, size: f32, weight: Weight) -> f32 {
        let bold_extra = if weight == Weight::Bold { 0.05 } else { 0.0 };
        text.chars().count() as f32 * size * (self.em_ratio + bold_extra)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// A single line of text, anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Rgba,
    pub weight: Weight,
}

impl PlacedText {
    fn from_spec(spec: &TextSpec, text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            size: spec.size,
            color: spec.color,
            weight: spec.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderBox {
    pub rect: Rect,
    pub leading: Option<Rect>,
    pub avatar: Rect,
    pub title: PlacedText,
    pub badge: Option<Rect>,
    pub subtitle: PlacedText,
    pub trailing: Vec<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputBox {
    pub rect: Rect,
    pub leading: Vec<Rect>,
    pub field: Rect,
    pub field_leading: Vec<Rect>,
    pub placeholder: PlacedText,
    pub field_trailing: Vec<Rect>,
    pub action: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubbleBox {
    pub row: usize,
    pub rect: Rect,
    pub lines: Vec<PlacedText>,
    pub avatar: Option<Rect>,
    pub inline_timestamp: Option<PlacedText>,
    /// Check glyph area after the inline timestamp.
    pub inline_checks: Option<Rect>,
    pub caption: Option<PlacedText>,
    pub status_label: Option<PlacedText>,
    /// Round status glyph at the trailing edge under the bubble.
    pub status_glyph: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingBox {
    pub rect: Rect,
    pub dots: [Rect; 3],
    pub avatar: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyBox {
    pub ring: Rect,
    pub text: PlacedText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceLayout {
    pub frame: Rect,
    pub screen: Rect,
    pub notch: Rect,
    pub header: HeaderBox,
    /// Visible message viewport; everything in `bubbles`/`typing` is clipped to it.
    pub message_area: Rect,
    pub input: InputBox,
    pub content_height: f32,
    pub scroll_offset: f32,
    pub bubbles: Vec<BubbleBox>,
    pub typing: Option<TypingBox>,
    pub empty: Option<EmptyBox>,
}

pub fn layout_surface(surface: &ChatSurface, measure: &dyn TextMeasure) -> SurfaceLayout {
    let frame = Rect::new(0.0, 0.0, FRAME_WIDTH, FRAME_HEIGHT);
    let screen = Rect::new(
        SCREEN_INSET,
        SCREEN_INSET,
        FRAME_WIDTH - SCREEN_INSET * 2.0,
        FRAME_HEIGHT - SCREEN_INSET * 2.0,
    );
    let notch = Rect::new(
        (FRAME_WIDTH - NOTCH_WIDTH) / 2.0,
        0.0,
        NOTCH_WIDTH,
        NOTCH_HEIGHT,
    );

    let header_rect = Rect::new(screen.x, screen.y, screen.w, surface.header.height);
    let input_rect = Rect::new(
        screen.x,
        screen.bottom() - surface.input_bar.height,
        screen.w,
        surface.input_bar.height,
    );
    let message_area = Rect::new(
        screen.x,
        header_rect.bottom(),
        screen.w,
        (input_rect.y - header_rect.bottom()).max(0.0),
    );

    let header = layout_header(&surface.header, header_rect, measure);
    let input = layout_input(&surface.input_bar, input_rect, measure);

    let mut layout = SurfaceLayout {
        frame,
        screen,
        notch,
        header,
        message_area,
        input,
        content_height: 0.0,
        scroll_offset: 0.0,
        bubbles: Vec::new(),
        typing: None,
        empty: None,
    };

    match &surface.body {
        SurfaceBody::Empty(empty) => {
            let text_w = measure.advance(&empty.text.text, empty.text.size, empty.text.weight);
            let block_h = EMPTY_RING + 16.0 + measure.line_height(empty.text.size);
            let top = message_area.y + (message_area.h - block_h).max(0.0) / 2.0;
            let cx = message_area.x + message_area.w / 2.0;
            layout.empty = Some(EmptyBox {
                ring: Rect::new(cx - EMPTY_RING / 2.0, top, EMPTY_RING, EMPTY_RING),
                text: PlacedText::from_spec(
                    &empty.text,
                    empty.text.text.clone(),
                    cx - text_w / 2.0,
                    top + EMPTY_RING + 16.0,
                ),
            });
        }
        SurfaceBody::Thread { rows, typing } => {
            let mut cursor = 0.0;
            for (row, message) in rows.iter().enumerate() {
                let (bubble, height) = layout_bubble(row, &message.bubble, message_area, cursor, measure);
                layout.bubbles.push(bubble);
                cursor += height;
            }
            if let Some(typing) = typing {
                let (typing_box, height) = layout_typing(typing, message_area, cursor);
                layout.typing = Some(typing_box);
                cursor += height;
            }

            let viewport = (message_area.h - AREA_PADDING * 2.0).max(0.0);
            layout.content_height = cursor;
            layout.scroll_offset = (cursor - viewport).max(0.0);
            let shift = message_area.y + AREA_PADDING - layout.scroll_offset;
            for bubble in &mut layout.bubbles {
                shift_bubble(bubble, shift);
            }
            if let Some(typing) = layout.typing.as_mut() {
                shift_rect(&mut typing.rect, shift);
                for dot in &mut typing.dots {
                    shift_rect(dot, shift);
                }
                if let Some(avatar) = typing.avatar.as_mut() {
                    shift_rect(avatar, shift);
                }
            }
        }
    }

    layout
}

fn layout_header(spec: &HeaderSpec, rect: Rect, measure: &dyn TextMeasure) -> HeaderBox {
    let title_h = measure.line_height(spec.title.size);
    let subtitle_h = measure.line_height(spec.subtitle.size);
    let title_w = measure.advance(&spec.title.text, spec.title.size, spec.title.weight);
    let subtitle_w = measure.advance(
        &spec.subtitle.text,
        spec.subtitle.size,
        spec.subtitle.weight,
    );

    match spec.layout {
        HeaderLayout::Centered => {
            let cx = rect.x + rect.w / 2.0;
            let avatar = Rect::new(
                cx - spec.avatar.size / 2.0,
                rect.y + 8.0,
                spec.avatar.size,
                spec.avatar.size,
            );
            let title_y = avatar.bottom() + 4.0;
            let badge_size = 6.0;
            let title_x = cx - (title_w + badge_size + 4.0) / 2.0;
            let badge = spec.title_badge.map(|_| {
                Rect::new(
                    title_x + title_w + 4.0,
                    title_y + (title_h - badge_size) / 2.0,
                    badge_size,
                    badge_size,
                )
            });
            HeaderBox {
                rect,
                leading: None,
                avatar,
                title: PlacedText::from_spec(&spec.title, spec.title.text.clone(), title_x, title_y),
                badge,
                subtitle: PlacedText::from_spec(
                    &spec.subtitle,
                    spec.subtitle.text.clone(),
                    cx - subtitle_w / 2.0,
                    title_y + title_h,
                ),
                trailing: Vec::new(),
            }
        }
        HeaderLayout::Row => {
            let cy = rect.center_y();
            let mut x = rect.x + 12.0;
            let leading = spec.leading.map(|icon| {
                let r = Rect::new(x, cy - icon.size / 2.0, icon.size, icon.size);
                x = r.right() + 8.0;
                r
            });
            let avatar = Rect::new(
                x,
                cy - spec.avatar.size / 2.0,
                spec.avatar.size,
                spec.avatar.size,
            );
            let text_x = avatar.right() + 10.0;
            let text_top = cy - (title_h + subtitle_h) / 2.0;

            let mut right = rect.right() - 14.0;
            let mut trailing = spec
                .trailing
                .iter()
                .rev()
                .map(|icon| {
                    let r = Rect::new(right - icon.size, cy - icon.size / 2.0, icon.size, icon.size);
                    right = r.x - 16.0;
                    r
                })
                .collect::<Vec<_>>();
            trailing.reverse();

            HeaderBox {
                rect,
                leading,
                avatar,
                title: PlacedText::from_spec(&spec.title, spec.title.text.clone(), text_x, text_top),
                badge: spec.title_badge.map(|_| {
                    Rect::new(text_x + title_w + 4.0, text_top + title_h / 2.0 - 3.0, 6.0, 6.0)
                }),
                subtitle: PlacedText::from_spec(
                    &spec.subtitle,
                    spec.subtitle.text.clone(),
                    text_x,
                    text_top + title_h,
                ),
                trailing,
            }
        }
    }
}

fn action_width(action: &InputAction, measure: &dyn TextMeasure) -> f32 {
    match action {
        InputAction::Text(text) => measure.advance(&text.text, text.size, text.weight),
        InputAction::Round { icon, .. } => icon.size + 24.0,
        InputAction::Icon(icon) => icon.size,
        InputAction::Dot { size, .. } => *size,
    }
}

fn layout_input(spec: &InputBarSpec, rect: Rect, measure: &dyn TextMeasure) -> InputBox {
    let pad = 10.0;
    let gap = 10.0;
    let cy = rect.center_y();

    let mut x = rect.x + pad;
    let leading = spec
        .leading
        .iter()
        .map(|action| {
            let w = action_width(action, measure);
            let r = Rect::new(x, cy - w.min(rect.h) / 2.0, w, w.min(rect.h));
            x = r.right() + gap;
            r
        })
        .collect::<Vec<_>>();

    let mut right = rect.right() - pad;
    let action = spec.action.as_ref().map(|action| {
        let w = action_width(action, measure);
        let h = match action {
            InputAction::Text(text) => measure.line_height(text.size),
            _ => w,
        };
        let r = Rect::new(right - w, cy - h / 2.0, w, h);
        right = r.x - gap;
        r
    });

    let field_h = (rect.h - 16.0).min(44.0).max(0.0);
    let field = Rect::new(x, cy - field_h / 2.0, (right - x).max(0.0), field_h);

    let mut inner_x = field.x + 14.0;
    let field_leading = spec
        .field
        .leading
        .iter()
        .map(|action| {
            let w = action_width(action, measure).min(field.h - 8.0);
            let r = Rect::new(inner_x, cy - w / 2.0, w, w);
            inner_x = r.right() + 8.0;
            r
        })
        .collect::<Vec<_>>();

    let mut inner_right = field.right() - 14.0;
    let mut field_trailing = spec
        .field
        .trailing
        .iter()
        .rev()
        .map(|icon| {
            let r = Rect::new(
                inner_right - icon.size,
                cy - icon.size / 2.0,
                icon.size,
                icon.size,
            );
            inner_right = r.x - 12.0;
            r
        })
        .collect::<Vec<_>>();
    field_trailing.reverse();

    let placeholder = &spec.field.placeholder;
    InputBox {
        rect,
        leading,
        field,
        field_leading,
        placeholder: PlacedText::from_spec(
            placeholder,
            placeholder.text.clone(),
            inner_x,
            cy - measure.line_height(placeholder.size) / 2.0,
        ),
        field_trailing,
        action,
    }
}

/// Lays one row out in content coordinates (top of the list at 0). Returns
/// the box and the vertical space the row consumes, spacing included.
fn layout_bubble(
    row: usize,
    spec: &BubbleSpec,
    area: Rect,
    top: f32,
    measure: &dyn TextMeasure,
) -> (BubbleBox, f32) {
    let inner_left = area.x + AREA_PADDING;
    let inner_right = area.right() - AREA_PADDING;
    let avatar_w = spec
        .avatar
        .as_ref()
        .map_or(0.0, |avatar| avatar.size + AVATAR_GAP);
    let available = (inner_right - inner_left).max(0.0);
    let max_bubble = ((available * spec.max_width).min(available - avatar_w)).max(24.0);
    let max_text = (max_bubble - spec.padding_x * 2.0).max(8.0);

    let text = &spec.text;
    let line_h = measure.line_height(text.size);
    let wrapped = wrap_text(measure, &text.text, text.size, text.weight, max_text);
    let widths = wrapped
        .iter()
        .map(|line| measure.advance(line, text.size, text.weight))
        .collect::<Vec<_>>();
    let mut content_w = widths.iter().copied().fold(0.0_f32, f32::max);
    let mut content_h = line_h * wrapped.len() as f32;

    // Inline timestamp (and checks) either share the last text line or open a new one.
    let mut meta: Option<(f32, f32, bool)> = None;
    if let Some(stamp) = &spec.inline_timestamp {
        let checks = matches!(spec.status, Some(StatusMark::Checks { .. }));
        let meta_w = measure.advance(&stamp.text, stamp.size, stamp.weight)
            + if checks { CHECK_WIDTH + 3.0 } else { 0.0 };
        let last_w = widths.last().copied().unwrap_or(0.0);
        if last_w + 16.0 + meta_w <= max_text {
            content_w = content_w.max(last_w + 16.0 + meta_w);
            meta = Some((meta_w, content_h - measure.line_height(stamp.size), checks));
        } else {
            content_w = content_w.max(meta_w);
            let stamp_h = measure.line_height(stamp.size);
            meta = Some((meta_w, content_h, checks));
            content_h += stamp_h;
        }
    }

    let bubble_w = content_w + spec.padding_x * 2.0;
    let bubble_h = content_h + spec.padding_y * 2.0;
    let bubble_x = match spec.align {
        Align::End => inner_right - bubble_w,
        Align::Start => inner_left + avatar_w,
    };
    let rect = Rect::new(bubble_x, top, bubble_w, bubble_h);
    let text_x = rect.x + spec.padding_x;
    let text_y = rect.y + spec.padding_y;

    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            PlacedText::from_spec(text, line, text_x, text_y + line_h * index as f32)
        })
        .collect::<Vec<_>>();

    let mut inline_timestamp = None;
    let mut inline_checks = None;
    if let (Some(stamp), Some((meta_w, meta_y, checks))) = (&spec.inline_timestamp, meta) {
        let stamp_h = measure.line_height(stamp.size);
        let meta_x = rect.right() - spec.padding_x - meta_w;
        inline_timestamp = Some(PlacedText::from_spec(
            stamp,
            stamp.text.clone(),
            meta_x,
            text_y + meta_y,
        ));
        if checks {
            inline_checks = Some(Rect::new(
                rect.right() - spec.padding_x - CHECK_WIDTH,
                text_y + meta_y + (stamp_h - 8.0) / 2.0,
                CHECK_WIDTH,
                8.0,
            ));
        }
    }

    let avatar = spec.avatar.as_ref().map(|avatar| {
        Rect::new(
            inner_left,
            rect.bottom() - avatar.size,
            avatar.size,
            avatar.size,
        )
    });

    let mut bottom = rect.bottom();
    let below = |spec_text: &TextSpec, y: f32| {
        let w = measure.advance(&spec_text.text, spec_text.size, spec_text.weight);
        let x = match spec.align {
            Align::End => rect.right() - w - 4.0,
            Align::Start => rect.x + 4.0,
        };
        PlacedText::from_spec(spec_text, spec_text.text.clone(), x, y)
    };

    let caption = spec.caption.as_ref().map(|caption| {
        let placed = below(caption, bottom + CAPTION_GAP);
        bottom += CAPTION_GAP + measure.line_height(caption.size);
        placed
    });

    let mut status_label = None;
    let mut status_glyph = None;
    match &spec.status {
        Some(StatusMark::Label(label)) => {
            status_label = Some(below(label, bottom + CAPTION_GAP));
            bottom += CAPTION_GAP + measure.line_height(label.size);
        }
        Some(
            StatusMark::ReceiverAvatar { .. }
            | StatusMark::FilledCheck { .. }
            | StatusMark::OutlineCheck { .. },
        ) => {
            status_glyph = Some(Rect::new(
                rect.right() - STATUS_GLYPH,
                bottom + 2.0,
                STATUS_GLYPH,
                STATUS_GLYPH,
            ));
            bottom += 2.0 + STATUS_GLYPH;
        }
        Some(StatusMark::Checks { .. }) | None => {}
    }

    let consumed = bottom - top + spec.spacing_after;
    (
        BubbleBox {
            row,
            rect,
            lines,
            avatar,
            inline_timestamp,
            inline_checks,
            caption,
            status_label,
            status_glyph,
        },
        consumed,
    )
}

fn layout_typing(spec: &TypingSpec, area: Rect, top: f32) -> (TypingBox, f32) {
    let inner_left = area.x + AREA_PADDING;
    let avatar = spec.avatar.as_ref().map(|avatar| {
        Rect::new(inner_left, top + 36.0 - avatar.size, avatar.size, avatar.size)
    });
    let x = inner_left
        + spec
            .avatar
            .as_ref()
            .map_or(0.0, |avatar| avatar.size + AVATAR_GAP);
    let pad_x = 14.0;
    let w = pad_x * 2.0 + TYPING_DOT * 3.0 + TYPING_DOT_GAP * 2.0;
    let rect = Rect::new(x, top, w, 36.0);
    let dot_y = rect.center_y() - TYPING_DOT / 2.0;
    let dot = |i: f32| {
        Rect::new(
            rect.x + pad_x + i * (TYPING_DOT + TYPING_DOT_GAP),
            dot_y,
            TYPING_DOT,
            TYPING_DOT,
        )
    };
    (
        TypingBox {
            rect,
            dots: [dot(0.0), dot(1.0), dot(2.0)],
            avatar,
        },
        rect.h + 8.0,
    )
}

fn shift_rect(rect: &mut Rect, dy: f32) {
    rect.y += dy;
}

fn shift_text(text: &mut PlacedText, dy: f32) {
    text.y += dy;
}

fn shift_bubble(bubble: &mut BubbleBox, dy: f32) {
    shift_rect(&mut bubble.rect, dy);
    for line in &mut bubble.lines {
        shift_text(line, dy);
    }
    if let Some(avatar) = bubble.avatar.as_mut() {
        shift_rect(avatar, dy);
    }
    if let Some(stamp) = bubble.inline_timestamp.as_mut() {
        shift_text(stamp, dy);
    }
    if let Some(checks) = bubble.inline_checks.as_mut() {
        shift_rect(checks, dy);
    }
    if let Some(caption) = bubble.caption.as_mut() {
        shift_text(caption, dy);
    }
    if let Some(label) = bubble.status_label.as_mut() {
        shift_text(label, dy);
    }
    if let Some(glyph) = bubble.status_glyph.as_mut() {
        shift_rect(glyph, dy);
    }
}

/// Greedy word wrap. Words wider than a line are split by characters.
/// Always returns at least one (possibly empty) line.
pub fn wrap_text(
    measure: &dyn TextMeasure,
    text: &str,
    size: f32,
    weight: Weight,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_owned()
            } else {
                format!("{current} {word}")
            };
            if measure.advance(&candidate, size, weight) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure.advance(word, size, weight) <= max_width {
                current = word.to_owned();
                continue;
            }
            for ch in word.chars() {
                current.push(ch);
                if measure.advance(&current, size, weight) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::{layout_surface, wrap_text, FixedAdvance, SurfaceLayout, TextMeasure};
    use crate::model::{ConversationView, MessageStatus, Platform, Profile};
    use crate::render::compose;
    use crate::script::parse_script;
    use crate::style::Weight;

    fn laid_out(platform: Platform, script: &str, typing: bool) -> SurfaceLayout {
        let now = Local
            .with_ymd_and_hms(2026, 2, 2, 7, 30, 0)
            .earliest()
            .expect("fixed test time should exist");
        let messages = parse_script(script, MessageStatus::Read, now);
        let sender = Profile::default_sender();
        let receiver = Profile::default_receiver();
        let surface = compose(&ConversationView {
            sender: &sender,
            receiver: &receiver,
            platform,
            messages: &messages,
            is_typing: typing,
        });
        layout_surface(&surface, &FixedAdvance::default())
    }

    #[test]
    fn wrap_splits_on_words_then_characters() {
        let measure = FixedAdvance { em_ratio: 1.0 };
        // 10px per char at size 10: lines may hold 5 chars.
        let lines = wrap_text(&measure, "ab cd efghijkl", 10.0, Weight::Regular, 50.0);
        assert_eq!(lines, vec!["ab cd", "efghi", "jkl"]);
        assert_eq!(
            wrap_text(&measure, "", 10.0, Weight::Regular, 50.0),
            vec![String::new()]
        );
    }

    #[test]
    fn sender_bubbles_hug_the_right_edge() {
        let layout = laid_out(Platform::Tinder, "> Yo!\n< Hey!", false);
        let area = layout.message_area;
        let sent = &layout.bubbles[0].rect;
        let received = &layout.bubbles[1].rect;
        assert!((sent.right() - (area.right() - 16.0)).abs() < 0.01);
        assert!((received.x - (area.x + 16.0)).abs() < 0.01);
        assert!(received.y > sent.bottom());
    }

    #[test]
    fn long_threads_pin_the_newest_row_to_the_bottom() {
        let script = (0..40)
            .map(|i| if i % 2 == 0 { format!("> ping {i}") } else { format!("< pong {i}") })
            .collect::<Vec<_>>()
            .join("\n");
        let layout = laid_out(Platform::Messenger, &script, false);
        assert!(layout.scroll_offset > 0.0);
        let last = layout.bubbles.last().expect("rows should be laid out");
        let area = layout.message_area;
        assert!(last.rect.bottom() <= area.bottom());
        assert!(last.rect.bottom() > area.bottom() - 80.0);
        assert!(layout.bubbles[0].rect.bottom() < area.y, "oldest row scrolled out");
    }

    #[test]
    fn typing_bubble_is_the_newest_content() {
        let script = (0..40).map(|i| format!("> line {i}")).collect::<Vec<_>>().join("\n");
        let layout = laid_out(Platform::IMessage, &script, true);
        let typing = layout.typing.as_ref().expect("typing bubble should be placed");
        let last = layout.bubbles.last().expect("rows should be laid out");
        assert!(typing.rect.y > last.rect.y);
        assert!(typing.rect.bottom() <= layout.message_area.bottom());
    }

    #[test]
    fn short_threads_do_not_scroll() {
        let layout = laid_out(Platform::WhatsApp, "> hi", false);
        assert_eq!(layout.scroll_offset, 0.0);
        assert!(layout.bubbles[0].inline_timestamp.is_some());
        assert!(layout.bubbles[0].inline_checks.is_some());
    }

    #[test]
    fn empty_thread_centers_the_placeholder() {
        let layout = laid_out(Platform::Instagram, "", false);
        let empty = layout.empty.as_ref().expect("placeholder should be placed");
        let area = layout.message_area;
        let center = empty.ring.x + empty.ring.w / 2.0;
        assert!((center - (area.x + area.w / 2.0)).abs() < 0.01);
        assert!(layout.bubbles.is_empty());
    }

    #[test]
    fn messenger_glyph_sits_under_the_last_bubble() {
        let layout = laid_out(Platform::Messenger, "> hi\n< hey\n> you there?", false);
        assert!(layout.bubbles[0].status_glyph.is_none());
        let last = &layout.bubbles[2];
        let glyph = last.status_glyph.expect("read glyph should be placed");
        assert!(glyph.y >= last.rect.bottom());
    }

    #[test]
    fn fixed_measure_widens_bold_text() {
        let measure = FixedAdvance::default();
        assert!(
            measure.advance("abc", 10.0, Weight::Bold) > measure.advance("abc", 10.0, Weight::Regular)
        );
    }
}
