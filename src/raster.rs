//! Draws a laid-out [`ChatSurface`] into an RGBA pixmap.
//!
//! Shapes go through tiny-skia with a uniform scale transform so every path
//! is built in logical pixels. Text is rasterized by fontdue and blended into
//! the premultiplied pixmap buffer directly.

use std::collections::HashMap;
use std::f32::consts::TAU;

use anyhow::{Context, Result};
use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use fontdue::Font;
use tiny_skia::{
    Color, FillRule, FilterQuality, GradientStop, LineCap, LineJoin, LinearGradient, Mask, Path,
    PathBuilder, Pattern, Pixmap, Point, SpreadMode, Stroke, StrokeDash, Transform,
};

use crate::avatar::AvatarCache;
use crate::font_assets::{supported_text, unsupported_codepoints, FontSet};
use crate::layout::{
    layout_surface, BubbleBox, FixedAdvance, HeaderBox, InputBox, PlacedText, Rect,
    SurfaceLayout, TextMeasure, TypingBox, FRAME_HEIGHT, FRAME_RADIUS, FRAME_WIDTH,
    SCREEN_RADIUS,
};
use crate::render::{ChatSurface, EmptyState, SurfaceBody};
use crate::style::{
    with_alpha, AvatarSpec, BubbleSpec, Corners, GradientDirection, HeaderSpec, Icon, IconSpec,
    InputAction, InputBarSpec, Paint, Rgba, StatusMark, TypingSpec, Weight, BLACK, SLATE_900,
    WHITE,
};

const BEZEL_COLOR: Rgba = SLATE_900;

#[derive(Debug, Clone, Copy)]
pub struct FrameOptions {
    /// Integer supersampling factor; the pixmap is `375*scale x 792*scale`.
    pub scale: u32,
    /// Drives the typing-dot bounce. Zero draws the dots at rest.
    pub elapsed_ms: u64,
}

impl FrameOptions {
    pub const fn still(scale: u32) -> Self {
        Self {
            scale,
            elapsed_ms: 0,
        }
    }
}

pub fn frame_size(scale: u32) -> (u32, u32) {
    let scale = scale.max(1);
    (FRAME_WIDTH as u32 * scale, FRAME_HEIGHT as u32 * scale)
}

#[derive(Debug, Clone)]
struct GlyphBitmap {
    width: usize,
    height: usize,
    bitmap: Vec<u8>,
}

pub struct TextPainter {
    fonts: Vec<Font>,
    has_bold: bool,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
    layout: Layout,
}

impl TextPainter {
    pub fn new(set: FontSet) -> Self {
        let mut fonts = vec![set.regular.font];
        let has_bold = set.bold.is_some();
        fonts.extend(set.bold.map(|bold| bold.font));
        Self {
            fonts,
            has_bold,
            glyph_cache: HashMap::new(),
            layout: Layout::new(CoordinateSystem::PositiveYDown),
        }
    }

    fn font_index(&self, weight: Weight) -> usize {
        usize::from(weight == Weight::Bold && self.has_bold)
    }

    fn faux_bold(&self, weight: Weight) -> bool {
        weight == Weight::Bold && !self.has_bold
    }

    fn draw_line(
        &mut self,
        pixmap: &mut Pixmap,
        text: &PlacedText,
        scale: f32,
        opacity: f32,
        clip: Option<DeviceClip>,
    ) {
        let index = self.font_index(text.weight);
        let emboldened = self.faux_bold(text.weight);
        let font = &self.fonts[index];
        let missing = unsupported_codepoints(font, &text.text);
        if !missing.is_empty() {
            tracing::debug!(?missing, "skipping codepoints the font cannot draw");
        }
        let visible = supported_text(font, &text.text);
        if visible.trim().is_empty() {
            return;
        }

        self.layout.reset(&LayoutSettings {
            x: text.x * scale,
            y: (text.y + text.size * 0.1) * scale,
            max_width: None,
            max_height: None,
            horizontal_align: fontdue::layout::HorizontalAlign::Left,
            vertical_align: fontdue::layout::VerticalAlign::Top,
            line_height: 1.0,
            wrap_style: fontdue::layout::WrapStyle::Letter,
            wrap_hard_breaks: false,
        });
        self.layout
            .append(self.fonts.as_slice(), &TextStyle::new(&visible, text.size * scale, index));

        let color = with_alpha(text.color, (f32::from(text.color[3]) * opacity).round() as u8);
        let width = pixmap.width();
        let height = pixmap.height();
        let clip = clip.unwrap_or(DeviceClip {
            x0: 0,
            y0: 0,
            x1: width as i32,
            y1: height as i32,
        });
        let bold_offset = (scale * 0.5).round().max(1.0) as i32;

        for glyph in self.layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 || glyph.char_data.is_whitespace() {
                continue;
            }
            let fonts = &self.fonts;
            let glyph_bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (_, bitmap) = fonts[glyph.font_index].rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    bitmap,
                }
            });

            let gx = glyph.x.round() as i32;
            let gy = glyph.y.round() as i32;
            blend_glyph(pixmap.data_mut(), width, clip, gx, gy, glyph_bitmap, color);
            if emboldened {
                blend_glyph(pixmap.data_mut(), width, clip, gx + bold_offset, gy, glyph_bitmap, color);
            }
        }
    }
}

impl TextMeasure for TextPainter {
    fn advance(&self, text: &str, size: f32, weight: Weight) -> f32 {
        let font = &self.fonts[self.font_index(weight)];
        let visible = supported_text(font, text);
        let mut width = 0.0;
        let mut previous = None;
        for ch in visible.chars() {
            if let Some(left) = previous {
                width += font.horizontal_kern(left, ch, size).unwrap_or(0.0);
            }
            width += font.metrics(ch, size).advance_width;
            previous = Some(ch);
        }
        if self.faux_bold(weight) && width > 0.0 {
            width += 0.5;
        }
        width
    }
}

/// Device-pixel clip box, exclusive on the far edges.
#[derive(Debug, Clone, Copy)]
struct DeviceClip {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl DeviceClip {
    fn from_rect(rect: Rect, scale: f32) -> Self {
        Self {
            x0: (rect.x * scale).floor() as i32,
            y0: (rect.y * scale).floor() as i32,
            x1: (rect.right() * scale).ceil() as i32,
            y1: (rect.bottom() * scale).ceil() as i32,
        }
    }
}

fn blend_glyph(
    frame: &mut [u8],
    frame_width: u32,
    clip: DeviceClip,
    x: i32,
    y: i32,
    glyph: &GlyphBitmap,
    color: Rgba,
) {
    for row in 0..glyph.height {
        let py = y + row as i32;
        if py < clip.y0 || py >= clip.y1 {
            continue;
        }
        for col in 0..glyph.width {
            let px = x + col as i32;
            if px < clip.x0 || px >= clip.x1 {
                continue;
            }
            let mask = glyph.bitmap[row * glyph.width + col];
            if mask == 0 {
                continue;
            }
            let idx = ((py as u32 * frame_width + px as u32) * 4) as usize;
            if let Some(pixel) = frame.get_mut(idx..idx + 4) {
                blend_premultiplied(pixel, color, mask);
            }
        }
    }
}

/// Source-over of a straight-alpha color with `coverage` onto one
/// premultiplied RGBA pixel.
fn blend_premultiplied(pixel: &mut [u8], color: Rgba, coverage: u8) {
    let alpha = u16::from(coverage) * u16::from(color[3]) / 255;
    if alpha == 0 {
        return;
    }
    let inv_alpha = 255 - alpha;
    for channel in 0..3 {
        let src = u16::from(color[channel]) * alpha / 255;
        let dst = u16::from(pixel[channel]);
        pixel[channel] = (src + (dst * inv_alpha + 127) / 255).min(255) as u8;
    }
    let dst_alpha = u16::from(pixel[3]);
    pixel[3] = (alpha + (dst_alpha * inv_alpha + 127) / 255).min(255) as u8;
}

/// Straight (non-premultiplied) RGBA bytes for encoders.
pub fn straight_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        out.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    out
}

/// Owns the fonts and decoded avatars shared across frames.
pub struct Rasterizer {
    painter: Option<TextPainter>,
    fallback: FixedAdvance,
    avatars: AvatarCache,
}

impl Rasterizer {
    pub fn new(fonts: Option<FontSet>) -> Self {
        Self {
            painter: fonts.map(TextPainter::new),
            fallback: FixedAdvance::default(),
            avatars: AvatarCache::default(),
        }
    }

    pub fn has_font(&self) -> bool {
        self.painter.is_some()
    }

    pub fn measure(&self) -> &dyn TextMeasure {
        match &self.painter {
            Some(painter) => painter as &dyn TextMeasure,
            None => &self.fallback,
        }
    }

    pub fn layout(&self, surface: &ChatSurface) -> SurfaceLayout {
        layout_surface(surface, self.measure())
    }

    pub fn render(&mut self, surface: &ChatSurface, options: FrameOptions) -> Result<Pixmap> {
        let layout = self.layout(surface);
        let (width, height) = frame_size(options.scale);
        let mut pixmap = Pixmap::new(width, height)
            .with_context(|| format!("failed to allocate {width}x{height} frame"))?;
        let scale = options.scale.max(1) as f32;

        let mut frame = Frame {
            pixmap: &mut pixmap,
            ts: Transform::from_scale(scale, scale),
            scale,
            elapsed_ms: options.elapsed_ms,
            painter: self.painter.as_mut(),
            avatars: &mut self.avatars,
        };
        frame.draw(surface, &layout)?;
        Ok(pixmap)
    }
}

struct Frame<'a> {
    pixmap: &'a mut Pixmap,
    ts: Transform,
    scale: f32,
    elapsed_ms: u64,
    painter: Option<&'a mut TextPainter>,
    avatars: &'a mut AvatarCache,
}

impl Frame<'_> {
    fn draw(&mut self, surface: &ChatSurface, layout: &SurfaceLayout) -> Result<()> {
        self.fill(
            rounded_rect(layout.frame, Corners::all(FRAME_RADIUS)),
            &solid(BEZEL_COLOR),
            None,
        );

        let screen_mask = self.mask(rounded_rect(layout.screen, Corners::all(SCREEN_RADIUS)))?;
        self.fill(rect_path(layout.screen), &solid(surface.background), Some(&screen_mask));

        let area_mask = self.mask(rect_path(layout.message_area))?;
        let area_clip = DeviceClip::from_rect(layout.message_area, self.scale);
        match &surface.body {
            SurfaceBody::Empty(empty) => self.draw_empty(empty, layout, &area_mask, area_clip),
            SurfaceBody::Thread { rows, typing } => {
                for (row, placed) in rows.iter().zip(&layout.bubbles) {
                    if !placed_bounds(placed).intersects(&layout.message_area) {
                        continue;
                    }
                    self.draw_bubble(&row.bubble, placed, &area_mask, area_clip);
                }
                if let (Some(spec), Some(placed)) = (typing, &layout.typing) {
                    self.draw_typing(spec, placed, &area_mask);
                }
            }
        }

        self.draw_header(&surface.header, &layout.header, &screen_mask);
        self.draw_input(&surface.input_bar, &layout.input, &screen_mask);

        let notch = layout.notch;
        self.fill(
            rounded_rect(
                notch,
                Corners {
                    top_left: 0.0,
                    top_right: 0.0,
                    bottom_right: 16.0,
                    bottom_left: 16.0,
                },
            ),
            &solid(BEZEL_COLOR),
            None,
        );
        Ok(())
    }

    fn mask(&self, path: Option<Path>) -> Result<Mask> {
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())
            .context("failed to allocate clip mask")?;
        if let Some(path) = path {
            mask.fill_path(&path, FillRule::Winding, true, self.ts);
        }
        Ok(mask)
    }

    fn fill(&mut self, path: Option<Path>, paint: &tiny_skia::Paint<'_>, mask: Option<&Mask>) {
        if let Some(path) = path {
            self.pixmap
                .fill_path(&path, paint, FillRule::Winding, self.ts, mask);
        }
    }

    fn stroke(
        &mut self,
        path: Option<Path>,
        paint: &tiny_skia::Paint<'_>,
        width: f32,
        mask: Option<&Mask>,
    ) {
        if let Some(path) = path {
            let stroke = Stroke {
                width,
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
                ..Stroke::default()
            };
            self.pixmap.stroke_path(&path, paint, &stroke, self.ts, mask);
        }
    }

    fn text(&mut self, text: &PlacedText, opacity: f32, clip: Option<DeviceClip>) {
        if let Some(painter) = self.painter.as_mut() {
            painter.draw_line(self.pixmap, text, self.scale, opacity, clip);
        }
    }

    fn avatar(
        &mut self,
        image: &str,
        placeholder: Rgba,
        rect: Rect,
        ring: Option<Rgba>,
        presence: Option<Rgba>,
        mask: Option<&Mask>,
    ) {
        let radius = rect.w.min(rect.h) / 2.0;
        let cx = rect.x + rect.w / 2.0;
        let cy = rect.y + rect.h / 2.0;
        if let Some(ring) = ring {
            self.fill(PathBuilder::from_circle(cx, cy, radius + 2.0), &solid(ring), mask);
        }
        self.fill(PathBuilder::from_circle(cx, cy, radius), &solid(placeholder), mask);

        if let Some(picture) = self.avatars.get(image) {
            let zoom = (rect.w / picture.width() as f32).max(rect.h / picture.height() as f32);
            let tx = rect.x + (rect.w - picture.width() as f32 * zoom) / 2.0;
            let ty = rect.y + (rect.h - picture.height() as f32 * zoom) / 2.0;
            let mut paint = tiny_skia::Paint::default();
            paint.anti_alias = true;
            paint.shader = Pattern::new(
                picture.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Bicubic,
                1.0,
                Transform::from_row(zoom, 0.0, 0.0, zoom, tx, ty),
            );
            if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
                self.pixmap
                    .fill_path(&path, &paint, FillRule::Winding, self.ts, mask);
            }
        }

        if let Some(dot) = presence {
            let dot_r = rect.w * 0.14;
            let dx = rect.right() - dot_r;
            let dy = rect.bottom() - dot_r;
            self.fill(PathBuilder::from_circle(dx, dy, dot_r + 1.5), &solid(WHITE), mask);
            self.fill(PathBuilder::from_circle(dx, dy, dot_r), &solid(dot), mask);
        }
    }

    fn avatar_spec(&mut self, spec: &AvatarSpec, rect: Rect, mask: Option<&Mask>) {
        self.avatar(
            &spec.image,
            spec.placeholder,
            rect,
            spec.ring,
            spec.presence_dot,
            mask,
        );
    }

    fn icon(&mut self, spec: &IconSpec, rect: Rect, mask: Option<&Mask>) {
        let line_width = (spec.size * 0.09).max(1.2);
        let color = solid(spec.color);
        let detail = if spec.filled { solid(WHITE) } else { color.clone() };
        for mark in icon_marks(spec.icon, spec.filled, rect) {
            match mark {
                Mark::Body(path) if spec.filled => self.fill(Some(path), &color, mask),
                Mark::Body(path) | Mark::Line(path) => {
                    self.stroke(Some(path), &color, line_width, mask)
                }
                Mark::Dot(path) => self.fill(Some(path), &color, mask),
                Mark::Detail(path) => self.stroke(Some(path), &detail, line_width, mask),
            }
        }
    }

    fn action(&mut self, action: &InputAction, rect: Rect, mask: Option<&Mask>) {
        match action {
            InputAction::Text(text) => {
                let placed = PlacedText {
                    text: text.text.clone(),
                    x: rect.x,
                    y: rect.y,
                    size: text.size,
                    color: text.color,
                    weight: text.weight,
                };
                self.text(&placed, 1.0, None);
            }
            InputAction::Round { fill, icon } => {
                let cx = rect.x + rect.w / 2.0;
                let cy = rect.y + rect.h / 2.0;
                self.fill(
                    PathBuilder::from_circle(cx, cy, rect.w.min(rect.h) / 2.0),
                    &solid(*fill),
                    mask,
                );
                let inner = Rect::new(cx - icon.size / 2.0, cy - icon.size / 2.0, icon.size, icon.size);
                self.icon(icon, inner, mask);
            }
            InputAction::Icon(icon) => self.icon(icon, rect, mask),
            InputAction::Dot { fill, .. } => {
                self.fill(
                    PathBuilder::from_circle(
                        rect.x + rect.w / 2.0,
                        rect.y + rect.h / 2.0,
                        rect.w.min(rect.h) / 2.0,
                    ),
                    &solid(*fill),
                    mask,
                );
            }
        }
    }

    fn draw_header(&mut self, spec: &HeaderSpec, placed: &HeaderBox, mask: &Mask) {
        let rect = placed.rect;
        self.fill(rect_path(rect), &solid(spec.background), Some(mask));
        if let Some(border) = spec.border_bottom {
            self.fill(
                rect_path(Rect::new(rect.x, rect.bottom() - 1.0, rect.w, 1.0)),
                &solid(border),
                Some(mask),
            );
        }
        if spec.shadow {
            let shade = Rect::new(rect.x, rect.bottom(), rect.w, 4.0);
            if let Some(paint) = vertical_fade(shade, with_alpha(BLACK, 28)) {
                self.fill(rect_path(shade), &paint, Some(mask));
            }
        }

        if let (Some(icon), Some(icon_rect)) = (&spec.leading, placed.leading) {
            self.icon(icon, icon_rect, Some(mask));
        }
        self.avatar_spec(&spec.avatar, placed.avatar, Some(mask));
        self.text(&placed.title, 1.0, None);
        if let (Some(color), Some(badge)) = (spec.title_badge, placed.badge) {
            self.fill(
                PathBuilder::from_circle(badge.x + badge.w / 2.0, badge.center_y(), badge.w / 2.0),
                &solid(color),
                Some(mask),
            );
        }
        self.text(&placed.subtitle, 1.0, None);
        for (icon, icon_rect) in spec.trailing.iter().zip(&placed.trailing) {
            self.icon(icon, *icon_rect, Some(mask));
        }
    }

    fn draw_input(&mut self, spec: &InputBarSpec, placed: &InputBox, mask: &Mask) {
        let rect = placed.rect;
        self.fill(rect_path(rect), &solid(spec.background), Some(mask));
        if let Some(border) = spec.border_top {
            self.fill(
                rect_path(Rect::new(rect.x, rect.y, rect.w, 1.0)),
                &solid(border),
                Some(mask),
            );
        }
        for (action, action_rect) in spec.leading.iter().zip(&placed.leading) {
            self.action(action, *action_rect, Some(mask));
        }

        let field = placed.field;
        let pill = Corners::all(field.h / 2.0);
        self.fill(rounded_rect(field, pill), &solid(spec.field.fill), Some(mask));
        if let Some(border) = spec.field.border {
            self.stroke(rounded_rect(field, pill), &solid(border), 1.0, Some(mask));
        }
        for (action, action_rect) in spec.field.leading.iter().zip(&placed.field_leading) {
            self.action(action, *action_rect, Some(mask));
        }
        self.text(&placed.placeholder, 1.0, Some(DeviceClip::from_rect(field, self.scale)));
        for (icon, icon_rect) in spec.field.trailing.iter().zip(&placed.field_trailing) {
            self.icon(icon, *icon_rect, Some(mask));
        }

        if let (Some(action), Some(action_rect)) = (&spec.action, placed.action) {
            self.action(action, action_rect, Some(mask));
        }
    }

    fn draw_bubble(&mut self, spec: &BubbleSpec, placed: &BubbleBox, mask: &Mask, clip: DeviceClip) {
        if let (Some(avatar), Some(rect)) = (&spec.avatar, placed.avatar) {
            self.avatar_spec(avatar, rect, Some(mask));
        }

        let rect = placed.rect;
        if spec.shadow {
            for (offset, alpha) in [(1.0, 18), (2.0, 10)] {
                let shadow = Rect::new(rect.x, rect.y + offset, rect.w, rect.h);
                self.fill(
                    rounded_rect(shadow, spec.corners),
                    &solid(with_alpha(BLACK, alpha)),
                    Some(mask),
                );
            }
        }
        self.fill(rounded_rect(rect, spec.corners), &paint_for(&spec.fill, rect), Some(mask));
        if let Some(border) = spec.border {
            self.stroke(rounded_rect(rect, spec.corners), &solid(border), 1.0, Some(mask));
        }

        for line in &placed.lines {
            self.text(line, 1.0, Some(clip));
        }
        if let Some(stamp) = &placed.inline_timestamp {
            self.text(stamp, 1.0, Some(clip));
        }
        if let (Some(StatusMark::Checks { count, color }), Some(area)) =
            (&spec.status, placed.inline_checks)
        {
            let single = Rect::new(area.x, area.y, area.w * 0.65, area.h);
            let paint = solid(*color);
            if *count >= 2 {
                self.stroke(check_path(single), &paint, 1.3, Some(mask));
                let second = Rect::new(area.x + area.w * 0.35, area.y, area.w * 0.65, area.h);
                self.stroke(check_path(second), &paint, 1.3, Some(mask));
            } else {
                let centered = Rect::new(area.x + area.w * 0.35, area.y, area.w * 0.65, area.h);
                self.stroke(check_path(centered), &paint, 1.3, Some(mask));
            }
        }
        if let Some(caption) = &placed.caption {
            self.text(caption, 1.0, Some(clip));
        }
        if let Some(label) = &placed.status_label {
            self.text(label, 1.0, Some(clip));
        }

        if let (Some(mark), Some(glyph)) = (&spec.status, placed.status_glyph) {
            let cx = glyph.x + glyph.w / 2.0;
            let cy = glyph.center_y();
            let radius = glyph.w / 2.0;
            let inner = Rect::new(glyph.x + 3.5, glyph.y + 4.0, glyph.w - 7.0, glyph.h - 8.0);
            match mark {
                StatusMark::ReceiverAvatar { image, placeholder } => {
                    self.avatar(image, *placeholder, glyph, None, None, Some(mask));
                }
                StatusMark::FilledCheck { color } => {
                    self.fill(PathBuilder::from_circle(cx, cy, radius), &solid(*color), Some(mask));
                    self.stroke(check_path(inner), &solid(WHITE), 1.4, Some(mask));
                }
                StatusMark::OutlineCheck { color } => {
                    self.stroke(
                        PathBuilder::from_circle(cx, cy, radius - 0.5),
                        &solid(*color),
                        1.0,
                        Some(mask),
                    );
                    self.stroke(check_path(inner), &solid(*color), 1.4, Some(mask));
                }
                StatusMark::Checks { .. } | StatusMark::Label(_) => {}
            }
        }
    }

    fn draw_typing(&mut self, spec: &TypingSpec, placed: &TypingBox, mask: &Mask) {
        if let (Some(avatar), Some(rect)) = (&spec.avatar, placed.avatar) {
            self.avatar_spec(avatar, rect, Some(mask));
        }
        self.fill(
            rounded_rect(placed.rect, spec.corners),
            &paint_for(&spec.fill, placed.rect),
            Some(mask),
        );
        if let Some(border) = spec.border {
            self.stroke(rounded_rect(placed.rect, spec.corners), &solid(border), 1.0, Some(mask));
        }
        let seconds = self.elapsed_ms as f32 / 1000.0;
        for (i, dot) in placed.dots.iter().enumerate() {
            let bounce = ((seconds * 1.6 - i as f32 * 0.15) * TAU).sin().max(0.0) * 3.0;
            self.fill(
                PathBuilder::from_circle(dot.x + dot.w / 2.0, dot.center_y() - bounce, dot.w / 2.0),
                &solid(spec.dot_color),
                Some(mask),
            );
        }
    }

    fn draw_empty(&mut self, empty: &EmptyState, layout: &SurfaceLayout, mask: &Mask, clip: DeviceClip) {
        let Some(placed) = &layout.empty else {
            return;
        };
        let ring = placed.ring;
        let color = with_alpha(empty.ring, (255.0 * empty.opacity).round() as u8);
        if let Some(path) = PathBuilder::from_circle(
            ring.x + ring.w / 2.0,
            ring.center_y(),
            ring.w / 2.0 - 1.0,
        ) {
            let stroke = Stroke {
                width: 2.0,
                dash: StrokeDash::new(vec![6.0, 4.0], 0.0),
                ..Stroke::default()
            };
            self.pixmap
                .stroke_path(&path, &solid(color), &stroke, self.ts, Some(mask));
        }
        self.text(&placed.text, empty.opacity, Some(clip));
    }
}

fn placed_bounds(placed: &BubbleBox) -> Rect {
    let mut top = placed.rect.y;
    let mut bottom = placed.rect.bottom();
    if let Some(avatar) = placed.avatar {
        top = top.min(avatar.y);
        bottom = bottom.max(avatar.bottom());
    }
    for text in [&placed.caption, &placed.status_label].into_iter().flatten() {
        bottom = bottom.max(text.y + text.size * 1.3);
    }
    if let Some(glyph) = placed.status_glyph {
        bottom = bottom.max(glyph.bottom());
    }
    Rect::new(placed.rect.x, top, placed.rect.w, bottom - top)
}

fn sk_color(color: Rgba) -> Color {
    Color::from_rgba8(color[0], color[1], color[2], color[3])
}

fn solid(color: Rgba) -> tiny_skia::Paint<'static> {
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(sk_color(color));
    paint.anti_alias = true;
    paint
}

fn paint_for(fill: &Paint, rect: Rect) -> tiny_skia::Paint<'static> {
    match fill {
        Paint::Solid(color) => solid(*color),
        Paint::Gradient { direction, stops } => {
            let fallback = stops.first().copied().unwrap_or(BLACK);
            let (start, end) = match direction {
                GradientDirection::ToRight => (
                    Point::from_xy(rect.x, rect.center_y()),
                    Point::from_xy(rect.right(), rect.center_y()),
                ),
                GradientDirection::ToTopRight => (
                    Point::from_xy(rect.x, rect.bottom()),
                    Point::from_xy(rect.right(), rect.y),
                ),
            };
            let last = stops.len().saturating_sub(1).max(1) as f32;
            let gradient_stops = stops
                .iter()
                .enumerate()
                .map(|(i, color)| GradientStop::new(i as f32 / last, sk_color(*color)))
                .collect::<Vec<_>>();
            match LinearGradient::new(
                start,
                end,
                gradient_stops,
                SpreadMode::Pad,
                Transform::identity(),
            ) {
                Some(shader) => {
                    let mut paint = tiny_skia::Paint::default();
                    paint.shader = shader;
                    paint.anti_alias = true;
                    paint
                }
                None => solid(fallback),
            }
        }
    }
}

fn vertical_fade(rect: Rect, top: Rgba) -> Option<tiny_skia::Paint<'static>> {
    let shader = LinearGradient::new(
        Point::from_xy(rect.x, rect.y),
        Point::from_xy(rect.x, rect.bottom()),
        vec![
            GradientStop::new(0.0, sk_color(top)),
            GradientStop::new(1.0, sk_color(with_alpha(top, 0))),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    )?;
    let mut paint = tiny_skia::Paint::default();
    paint.shader = shader;
    Some(paint)
}

fn rect_path(rect: Rect) -> Option<Path> {
    tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.w, rect.h).map(PathBuilder::from_rect)
}

/// Rounded rectangle with independent corner radii, each clamped to half the
/// shorter side.
fn rounded_rect(rect: Rect, corners: Corners) -> Option<Path> {
    if rect.w <= 0.0 || rect.h <= 0.0 {
        return None;
    }
    const KAPPA: f32 = 0.552_284_8;
    let limit = rect.w.min(rect.h) / 2.0;
    let tl = corners.top_left.clamp(0.0, limit);
    let tr = corners.top_right.clamp(0.0, limit);
    let br = corners.bottom_right.clamp(0.0, limit);
    let bl = corners.bottom_left.clamp(0.0, limit);
    let (x, y, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());

    let mut pb = PathBuilder::new();
    pb.move_to(x + tl, y);
    pb.line_to(r - tr, y);
    pb.cubic_to(r - tr + tr * KAPPA, y, r, y + tr - tr * KAPPA, r, y + tr);
    pb.line_to(r, b - br);
    pb.cubic_to(r, b - br + br * KAPPA, r - br + br * KAPPA, b, r - br, b);
    pb.line_to(x + bl, b);
    pb.cubic_to(x + bl - bl * KAPPA, b, x, b - bl + bl * KAPPA, x, b - bl);
    pb.line_to(x, y + tl);
    pb.cubic_to(x, y + tl - tl * KAPPA, x + tl - tl * KAPPA, y, x + tl, y);
    pb.close();
    pb.finish()
}

fn check_path(rect: Rect) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(rect.x, rect.y + rect.h * 0.55);
    pb.line_to(rect.x + rect.w * 0.35, rect.y + rect.h * 0.9);
    pb.line_to(rect.right(), rect.y + rect.h * 0.1);
    pb.finish()
}

enum Mark {
    /// Filled for filled icons, stroked otherwise.
    Body(Path),
    Line(Path),
    Dot(Path),
    /// Drawn on top of a body: white on filled icons, icon color otherwise.
    Detail(Path),
}

/// Unit-square drawing helper for icon glyphs.
struct Pen {
    rect: Rect,
    pb: PathBuilder,
}

impl Pen {
    fn new(rect: Rect) -> Self {
        Self {
            rect,
            pb: PathBuilder::new(),
        }
    }

    fn x(&self, u: f32) -> f32 {
        self.rect.x + u * self.rect.w
    }

    fn y(&self, v: f32) -> f32 {
        self.rect.y + v * self.rect.h
    }

    fn m(mut self, u: f32, v: f32) -> Self {
        let (x, y) = (self.x(u), self.y(v));
        self.pb.move_to(x, y);
        self
    }

    fn l(mut self, u: f32, v: f32) -> Self {
        let (x, y) = (self.x(u), self.y(v));
        self.pb.line_to(x, y);
        self
    }

    fn q(mut self, cu: f32, cv: f32, u: f32, v: f32) -> Self {
        let (cx, cy, x, y) = (self.x(cu), self.y(cv), self.x(u), self.y(v));
        self.pb.quad_to(cx, cy, x, y);
        self
    }

    fn z(mut self) -> Self {
        self.pb.close();
        self
    }

    fn done(self) -> Option<Path> {
        self.pb.finish()
    }
}

fn unit_circle(rect: Rect, u: f32, v: f32, r: f32) -> Option<Path> {
    PathBuilder::from_circle(rect.x + u * rect.w, rect.y + v * rect.h, r * rect.w)
}

fn unit_rounded(rect: Rect, u: f32, v: f32, w: f32, h: f32, radius: f32) -> Option<Path> {
    rounded_rect(
        Rect::new(rect.x + u * rect.w, rect.y + v * rect.h, w * rect.w, h * rect.h),
        Corners::all(radius * rect.w),
    )
}

fn icon_marks(icon: Icon, filled: bool, r: Rect) -> Vec<Mark> {
    let marks = match icon {
        Icon::ChevronLeft => vec![Pen::new(r).m(0.62, 0.18).l(0.3, 0.5).l(0.62, 0.82).done().map(Mark::Line)],
        Icon::Info => vec![
            unit_circle(r, 0.5, 0.5, 0.42).map(Mark::Body),
            Pen::new(r).m(0.5, 0.46).l(0.5, 0.72).done().map(Mark::Detail),
            Pen::new(r).m(0.5, 0.3).l(0.5, 0.31).done().map(Mark::Detail),
        ],
        Icon::Phone => vec![Pen::new(r)
            .m(0.2, 0.1)
            .l(0.38, 0.1)
            .l(0.45, 0.3)
            .l(0.35, 0.4)
            .q(0.45, 0.56, 0.6, 0.65)
            .l(0.7, 0.55)
            .l(0.9, 0.62)
            .l(0.9, 0.8)
            .q(0.9, 0.9, 0.8, 0.9)
            .q(0.1, 0.85, 0.1, 0.2)
            .q(0.1, 0.1, 0.2, 0.1)
            .z()
            .done()
            .map(Mark::Body)],
        Icon::Camera => vec![
            unit_rounded(r, 0.08, 0.28, 0.84, 0.58, 0.1).map(Mark::Body),
            unit_rounded(r, 0.34, 0.16, 0.32, 0.14, 0.04).map(Mark::Body),
            unit_circle(r, 0.5, 0.57, 0.16).map(Mark::Detail),
        ],
        Icon::Video => vec![
            unit_rounded(r, 0.06, 0.26, 0.6, 0.48, 0.1).map(Mark::Body),
            Pen::new(r).m(0.7, 0.5).l(0.94, 0.3).l(0.94, 0.7).z().done().map(Mark::Body),
        ],
        Icon::MoreVertical => [0.2, 0.5, 0.8]
            .into_iter()
            .map(|v| unit_circle(r, 0.5, v, 0.09).map(Mark::Dot))
            .collect(),
        Icon::Smile => vec![
            unit_circle(r, 0.5, 0.5, 0.42).map(Mark::Body),
            Pen::new(r).m(0.32, 0.58).q(0.5, 0.78, 0.68, 0.58).done().map(Mark::Detail),
            Pen::new(r).m(0.37, 0.4).l(0.37, 0.41).done().map(Mark::Detail),
            Pen::new(r).m(0.63, 0.4).l(0.63, 0.41).done().map(Mark::Detail),
        ],
        Icon::Paperclip => vec![Pen::new(r)
            .m(0.65, 0.3)
            .l(0.35, 0.62)
            .q(0.27, 0.72, 0.37, 0.8)
            .q(0.45, 0.86, 0.53, 0.78)
            .l(0.82, 0.48)
            .q(0.95, 0.32, 0.8, 0.2)
            .q(0.66, 0.08, 0.52, 0.22)
            .l(0.2, 0.54)
            .done()
            .map(Mark::Line)],
        Icon::Send => vec![Pen::new(r)
            .m(0.1, 0.15)
            .l(0.9, 0.5)
            .l(0.1, 0.85)
            .l(0.22, 0.5)
            .z()
            .done()
            .map(Mark::Body)],
        Icon::Mic => vec![
            unit_rounded(r, 0.36, 0.08, 0.28, 0.5, 0.14).map(Mark::Body),
            Pen::new(r).m(0.22, 0.46).q(0.5, 0.9, 0.78, 0.46).done().map(Mark::Line),
            Pen::new(r).m(0.5, 0.7).l(0.5, 0.9).done().map(Mark::Line),
        ],
        Icon::Image => vec![
            unit_rounded(r, 0.1, 0.16, 0.8, 0.68, 0.1).map(Mark::Body),
            Pen::new(r)
                .m(0.18, 0.76)
                .l(0.42, 0.5)
                .l(0.6, 0.66)
                .l(0.7, 0.58)
                .l(0.84, 0.72)
                .done()
                .map(Mark::Detail),
            unit_circle(r, 0.66, 0.36, 0.07).map(Mark::Detail),
        ],
        Icon::Plus => {
            let mut marks = Vec::new();
            if filled {
                marks.push(unit_circle(r, 0.5, 0.5, 0.45).map(Mark::Body));
            }
            marks.push(Pen::new(r).m(0.5, 0.25).l(0.5, 0.75).done().map(Mark::Detail));
            marks.push(Pen::new(r).m(0.25, 0.5).l(0.75, 0.5).done().map(Mark::Detail));
            marks
        }
        Icon::ThumbsUp => vec![
            unit_rounded(r, 0.1, 0.45, 0.18, 0.45, 0.03).map(Mark::Body),
            Pen::new(r)
                .m(0.34, 0.45)
                .l(0.5, 0.12)
                .q(0.62, 0.12, 0.6, 0.28)
                .l(0.57, 0.42)
                .l(0.82, 0.42)
                .q(0.92, 0.44, 0.9, 0.56)
                .l(0.84, 0.84)
                .q(0.82, 0.9, 0.74, 0.9)
                .l(0.34, 0.9)
                .z()
                .done()
                .map(Mark::Body),
        ],
    };
    marks.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use tiny_skia::Pixmap;

    use super::{blend_premultiplied, frame_size, straight_rgba, FrameOptions, Rasterizer};
    use crate::model::{ConversationView, MessageStatus, Platform, Profile};
    use crate::render::{compose, ChatSurface};
    use crate::script::parse_script;

    fn surface(platform: Platform, script: &str, typing: bool) -> ChatSurface {
        let now = Local
            .with_ymd_and_hms(2026, 3, 14, 21, 5, 0)
            .earliest()
            .expect("fixed test time should exist");
        let messages = parse_script(script, MessageStatus::Read, now);
        let sender = Profile::default_sender();
        let receiver = Profile::default_receiver();
        compose(&ConversationView {
            sender: &sender,
            receiver: &receiver,
            platform,
            messages: &messages,
            is_typing: typing,
        })
    }

    fn pixel(pixmap: &Pixmap, x: f32, y: f32, scale: f32) -> [u8; 4] {
        let px = (x * scale) as u32;
        let py = (y * scale) as u32;
        let color = pixmap
            .pixel(px, py)
            .expect("sample inside the pixmap")
            .demultiply();
        [color.red(), color.green(), color.blue(), color.alpha()]
    }

    #[test]
    fn still_frames_are_double_resolution() {
        assert_eq!(frame_size(2), (750, 1584));
        let mut raster = Rasterizer::new(None);
        let pixmap = raster
            .render(&surface(Platform::Tinder, "> Yo!", false), FrameOptions::still(2))
            .expect("render");
        assert_eq!((pixmap.width(), pixmap.height()), (750, 1584));
    }

    #[test]
    fn outside_the_phone_stays_transparent() {
        let mut raster = Rasterizer::new(None);
        let pixmap = raster
            .render(&surface(Platform::IMessage, "> hi", false), FrameOptions::still(1))
            .expect("render");
        assert_eq!(pixel(&pixmap, 0.0, 0.0, 1.0)[3], 0);
        assert_eq!(pixel(&pixmap, 374.0, 791.0, 1.0)[3], 0);
    }

    #[test]
    fn message_area_shows_platform_background_and_bubble_fill() {
        let mut raster = Rasterizer::new(None);
        let surface = surface(Platform::Messenger, "> hi", false);
        let layout = raster.layout(&surface);
        let pixmap = raster.render(&surface, FrameOptions::still(2)).expect("render");

        let area = layout.message_area;
        assert_eq!(pixel(&pixmap, area.x + 4.0, area.bottom() - 4.0, 2.0), [255, 255, 255, 255]);

        let bubble = layout.bubbles[0].rect;
        let center = pixel(&pixmap, bubble.x + bubble.w / 2.0, bubble.center_y(), 2.0);
        assert_eq!(center, [0x00, 0x84, 0xff, 255]);
    }

    #[test]
    fn whatsapp_empty_state_keeps_the_wallpaper() {
        let mut raster = Rasterizer::new(None);
        let surface = surface(Platform::WhatsApp, "", true);
        let layout = raster.layout(&surface);
        let pixmap = raster.render(&surface, FrameOptions::still(1)).expect("render");
        let area = layout.message_area;
        assert_eq!(pixel(&pixmap, area.x + 6.0, area.y + 10.0, 1.0), [0xe5, 0xdd, 0xd5, 255]);
    }

    #[test]
    fn every_platform_renders_a_typing_frame() {
        let mut raster = Rasterizer::new(None);
        for platform in Platform::ALL {
            let surface = surface(platform, "> hi\n< hey\n> you there?", true);
            let pixmap = raster
                .render(
                    &surface,
                    FrameOptions {
                        scale: 1,
                        elapsed_ms: 250,
                    },
                )
                .expect("render");
            let opaque = straight_rgba(&pixmap)
                .chunks_exact(4)
                .filter(|px| px[3] == 255)
                .count();
            assert!(opaque > 200_000, "{platform:?} frame should be mostly opaque");
        }
    }

    #[test]
    fn premultiplied_blend_covers_fully_at_full_coverage() {
        let mut px = [10, 20, 30, 255];
        blend_premultiplied(&mut px, [200, 100, 50, 255], 255);
        assert_eq!(px, [200, 100, 50, 255]);

        let mut clear = [0, 0, 0, 0];
        blend_premultiplied(&mut clear, [255, 255, 255, 255], 0);
        assert_eq!(clear, [0, 0, 0, 0]);
    }
}
