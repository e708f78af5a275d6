use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use anyhow::{Result, anyhow, bail};
use std::collections::HashMap;
use std::time::Duration;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Rect,
    Transform,
};
use tracing::debug;
use vsearch_core::{ExperimentState, StimulusLayout};
use vsearch_timing::HighPrecisionTimer;

pub const INSTRUCTIONS: [&str; 5] = [
    "Multiple shapes will get displayed.",
    "Only one shape is different from all other shapes.",
    "1. Spot it as fast as possible and press Space bar;",
    "2. Click on the placeholder over that shape.",
    "Press Enter key when ready to start.",
];

const BACKGROUND: [u8; 4] = [255, 255, 255, 255];
const SHAPE_RGB: [u8; 3] = [0, 0, 0];
const PLACEHOLDER: [u8; 4] = [128, 128, 128, 255];
const TEXT: [u8; 4] = [0, 0, 0, 255];
const TEXT_SIZE: f32 = 24.0;
const LINE_HEIGHT: f32 = 40.0;

/// Everything the renderer needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub state: ExperimentState,
    pub layout: Option<&'a StimulusLayout>,
    pub progress: Option<(usize, usize)>,
    pub notice: Option<&'a str>,
}

pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub shapes: usize,
}

pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: [u8; 4],
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // 1) Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    // 2) Union pixel bounds from outlined glyphs
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    let outlined: Vec<_> = glyphs
        .iter()
        .filter_map(|g| font.outline_glyph(g.clone()))
        .collect();
    for out in &outlined {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    if outlined.is_empty() {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;

    // 3) Transparent, premultiplied pixmap
    let mut pm = Pixmap::new(w, h)?;
    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();

    for out in &outlined {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // Porter-Duff over in premultiplied space
            let a = (cov * color[3] as f32 / 255.0).clamp(0.0, 1.0);
            let bg = dst[i];
            let inv = 1.0 - a;
            let blend = |src: u8, dst: u8| (src as f32 * a + dst as f32 * inv).round() as u8;
            let alpha = (a * 255.0 + bg.alpha() as f32 * inv).round() as u8;
            let r = blend(color[0], bg.red()).min(alpha);
            let g = blend(color[1], bg.green()).min(alpha);
            let bl = blend(color[2], bg.blue()).min(alpha);

            if let Some(px) = PremultipliedColorU8::from_rgba(r, g, bl, alpha) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    placeholder_size: f32,

    font: Option<FontVec>,
    text_cache: HashMap<String, Option<Pixmap>>,

    canvas: Pixmap,
    timer: HighPrecisionTimer,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, placeholder_size: f32) -> Result<Self> {
        let mut canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("cannot allocate a {width}x{height} canvas"))?;
        canvas.fill(rgba(BACKGROUND));

        Ok(Self {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            placeholder_size,
            font: None,
            text_cache: HashMap::new(),
            canvas,
            timer: HighPrecisionTimer::new(),
        })
    }

    pub fn with_font_bytes(mut self, bytes: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec(bytes).map_err(|e| anyhow!("invalid font: {e}"))?;
        self.font = Some(font);
        self.text_cache.clear();
        Ok(self)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.canvas = Pixmap::new(new_width, new_height)
            .ok_or_else(|| anyhow!("cannot allocate a {new_width}x{new_height} canvas"))?;
        self.canvas.fill(rgba(BACKGROUND));
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    /// Canvas position of grid cell (0, 0); the grid is centered.
    pub fn grid_origin(&self, layout: &StimulusLayout) -> (f32, f32) {
        let half = layout.extent() / 2.0;
        (self.center.0 - half, self.center.1 - half)
    }

    /// Placeholder under a canvas point, if any.
    pub fn hit_test(&self, layout: &StimulusLayout, point: (f32, f32)) -> Option<usize> {
        let (ox, oy) = self.grid_origin(layout);
        let half = self.placeholder_size / 2.0;
        layout.shapes.iter().position(|shape| {
            let cx = ox + shape.position.x;
            let cy = oy + shape.position.y;
            (point.0 - cx).abs() <= half && (point.1 - cy).abs() <= half
        })
    }

    /// Redraws the whole canvas for `view`.
    pub fn render(&mut self, view: &SceneView) -> Result<()> {
        self.canvas.fill(rgba(BACKGROUND));

        match view.layout {
            _ if view.state == ExperimentState::Instructions => {
                let top = self.center.1 - LINE_HEIGHT * (INSTRUCTIONS.len() as f32 - 1.0) / 2.0;
                for (i, line) in INSTRUCTIONS.iter().enumerate() {
                    self.draw_text(line, (self.center.0, top + i as f32 * LINE_HEIGHT));
                }
            }
            Some(layout) if view.state.shows_stimulus() => self.draw_shapes(layout),
            Some(layout) if view.state.accepts_clicks() => self.draw_placeholders(layout),
            _ => {}
        }

        if view.state.is_running() {
            if let Some((current, total)) = view.progress {
                self.draw_text(&format!("Trial: {current}/{total}"), (90.0, 30.0));
            }
        }
        if let Some(notice) = view.notice {
            self.draw_text(notice, self.center);
        }
        Ok(())
    }

    /// Renders `view` and copies the canvas into an RGBA frame buffer of the
    /// same size.
    pub fn render_frame(
        &mut self,
        view: &SceneView,
        frame_buffer: &mut [u8],
    ) -> Result<FrameStats> {
        if frame_buffer.len() != self.canvas.data().len() {
            bail!(
                "frame buffer holds {} bytes, canvas {}x{} needs {}",
                frame_buffer.len(),
                self.width,
                self.height,
                self.canvas.data().len()
            );
        }

        let timer = self.timer.clone();
        let (drawn, draw) = timer.measure(|| self.render(view));
        drawn?;
        let ((), copy) = timer.measure(|| frame_buffer.copy_from_slice(self.canvas.data()));

        Ok(FrameStats {
            draw,
            copy,
            total: draw + copy,
            shapes: view.layout.map_or(0, |l| l.len()),
        })
    }

    fn draw_shapes(&mut self, layout: &StimulusLayout) {
        let (ox, oy) = self.grid_origin(layout);
        let mut paint = Paint::default();
        paint.anti_alias = true;

        for shape in &layout.shapes {
            let alpha = (shape.appearance.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
            paint.set_color_rgba8(SHAPE_RGB[0], SHAPE_RGB[1], SHAPE_RGB[2], alpha);
            let radius = shape.appearance.size / 2.0;
            if let Some(path) =
                PathBuilder::from_circle(ox + shape.position.x, oy + shape.position.y, radius)
            {
                self.canvas
                    .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
    }

    fn draw_placeholders(&mut self, layout: &StimulusLayout) {
        let (ox, oy) = self.grid_origin(layout);
        let size = self.placeholder_size;
        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color(rgba(PLACEHOLDER));

        for shape in &layout.shapes {
            let x = ox + shape.position.x - size / 2.0;
            let y = oy + shape.position.y - size / 2.0;
            if let Some(rect) = Rect::from_xywh(x, y, size, size) {
                self.canvas.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
    }

    /// Draws `text` centered on `pos`. Without a font this is a no-op.
    fn draw_text(&mut self, text: &str, pos: (f32, f32)) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let cached = self
            .text_cache
            .entry(text.to_string())
            .or_insert_with(|| render_text_pixmap(text, TEXT_SIZE, font, TEXT));
        let Some(pm) = cached.as_ref() else {
            debug!(text, "Nothing to draw for text");
            return;
        };

        let x = (pos.0 - pm.width() as f32 * 0.5) as i32;
        let y = (pos.1 - pm.height() as f32 * 0.5) as i32;
        self.canvas.draw_pixmap(
            x,
            y,
            pm.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

fn rgba(c: [u8; 4]) -> Color {
    Color::from_rgba8(c[0], c[1], c[2], c[3])
}
