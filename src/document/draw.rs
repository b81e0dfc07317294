//! Shapes, colors, transparency, rotation and image placement.

use tracing::{debug, trace};

use super::{Document, EmbeddedImage};
use crate::cache::SMaskKey;
use crate::error::{FolioError, Result};
use crate::image::{self, ImagePayload};
use crate::pdf::{
    ColorSpace, ContentStream, ExtGState, FormXObject, ImageFilter, ImageXObject, PdfObject,
    SMaskType,
};
use crate::style::{Color, LineCap, LineType, PaintStyle, Transparency};
use crate::units::{Point, Rect};

/// Placement of an image. Coordinates and size are in document units.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    pub x: f64,
    pub y: f64,
    /// Drawn size. `None`, or both sides zero, uses one point per pixel;
    /// a single zero side keeps the aspect ratio.
    pub size: Option<Rect>,
    /// Overrides the document transparency for this image.
    pub transparency: Option<Transparency>,
    pub mask: Option<MaskOptions>,
}

/// A soft mask built from a second image drawn over the same area.
#[derive(Debug, Clone)]
pub struct MaskOptions {
    pub data: Vec<u8>,
    pub subtype: SMaskType,
}

impl Document {
    /// Line width in document units.
    pub fn set_line_width(&mut self, width: f64) {
        self.state.line_width = self.to_pt(width);
    }

    pub fn set_line_type(&mut self, line_type: LineType) {
        self.state.line_type = match line_type {
            LineType::Custom(pattern, phase) => LineType::Custom(
                pattern.iter().map(|v| self.to_pt(*v)).collect(),
                self.to_pt(phase),
            ),
            other => other,
        };
    }

    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.state.line_cap = cap;
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.state.stroke_color = color;
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.state.fill_color = color;
    }

    pub fn set_text_color(&mut self, color: Color) {
        self.state.text_color = color;
    }

    /// Apply `transparency` to everything drawn until it is cleared.
    pub fn set_transparency(&mut self, transparency: Transparency) {
        self.state.transparency = Some(transparency);
    }

    pub fn clear_transparency(&mut self) {
        self.state.transparency = None;
    }

    /// Graphics state prologue shared by all path drawing.
    pub(super) fn path_state(&mut self, ops: &mut ContentStream) {
        if let Some(gs) = self.transparency_gs(None) {
            ops.graphics_state(&gs);
        }
        ops.line_width(self.state.line_width);
        ops.line_cap(self.state.line_cap);
        ops.dash(&self.state.line_type, self.state.line_width);
        ops.stroke_color(&self.state.stroke_color);
        ops.fill_color(&self.state.fill_color);
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        let result = self.draw_line(x1, y1, x2, y2);
        self.record(result)
    }

    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        let (py1, py2) = (self.pdf_y(y1)?, self.pdf_y(y2)?);
        let mut ops = ContentStream::new();
        ops.save();
        self.path_state(&mut ops);
        ops.move_to(self.to_pt(x1), py1);
        ops.line_to(self.to_pt(x2), py2);
        ops.paint(PaintStyle::Draw);
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }

    /// Rectangle with its top-left corner at (x, y). A positive `radius`
    /// rounds the corners.
    pub fn rectangle(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        style: PaintStyle,
        radius: f64,
    ) -> Result<()> {
        let result = self.draw_rectangle(x, y, w, h, style, radius);
        self.record(result)
    }

    fn draw_rectangle(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        style: PaintStyle,
        radius: f64,
    ) -> Result<()> {
        if !Rect::new(w, h).is_valid() || !(radius >= 0.0) || !x.is_finite() || !y.is_finite() {
            return Err(FolioError::InvalidRect(format!(
                "rectangle at ({x}, {y}) size {w} x {h} radius {radius}"
            )));
        }
        let (w_pt, h_pt) = (self.to_pt(w), self.to_pt(h));
        let bottom = self.pdf_y(y)? - h_pt;
        let left = self.to_pt(x);

        let mut ops = ContentStream::new();
        ops.save();
        self.path_state(&mut ops);
        if radius > 0.0 {
            ops.rounded_rect(left, bottom, w_pt, h_pt, self.to_pt(radius));
            ops.close_and_paint(style);
        } else {
            ops.rect(left, bottom, w_pt, h_pt);
            ops.paint(style);
        }
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }

    /// Ellipse inscribed in the box spanned by (x1, y1) and (x2, y2).
    pub fn oval(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: PaintStyle) -> Result<()> {
        let result = self.draw_oval(x1, y1, x2, y2, style);
        self.record(result)
    }

    fn draw_oval(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: PaintStyle) -> Result<()> {
        let cx = self.to_pt((x1 + x2) / 2.0);
        let cy = self.pdf_y((y1 + y2) / 2.0)?;
        let rx = self.to_pt((x2 - x1).abs() / 2.0);
        let ry = self.to_pt((y2 - y1).abs() / 2.0);

        let mut ops = ContentStream::new();
        ops.save();
        self.path_state(&mut ops);
        ops.ellipse(cx, cy, rx, ry);
        ops.paint(style);
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }

    /// Cubic Bézier from `p0` to `p3` with control points `p1` and `p2`.
    pub fn curve(&mut self, p0: Point, p1: Point, p2: Point, p3: Point, style: PaintStyle) -> Result<()> {
        let result = self.draw_curve(p0, p1, p2, p3, style);
        self.record(result)
    }

    fn draw_curve(&mut self, p0: Point, p1: Point, p2: Point, p3: Point, style: PaintStyle) -> Result<()> {
        self.canvas_size()?;
        let mut ops = ContentStream::new();
        ops.save();
        self.path_state(&mut ops);
        ops.move_to(self.to_pt(p0.x), self.pdf_y(p0.y)?);
        ops.curve_to(
            self.to_pt(p1.x),
            self.pdf_y(p1.y)?,
            self.to_pt(p2.x),
            self.pdf_y(p2.y)?,
            self.to_pt(p3.x),
            self.pdf_y(p3.y)?,
        );
        ops.paint(style);
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }

    /// Closed polygon through `points`.
    pub fn polygon(&mut self, points: &[Point], style: PaintStyle) -> Result<()> {
        let result = self.draw_polygon(points, style);
        self.record(result)
    }

    fn draw_polygon(&mut self, points: &[Point], style: PaintStyle) -> Result<()> {
        if points.len() < 2 {
            return Err(FolioError::InvalidRect(format!(
                "polygon needs at least 2 points, got {}",
                points.len()
            )));
        }
        self.canvas_size()?;
        let mut ops = ContentStream::new();
        ops.save();
        self.path_state(&mut ops);
        for (i, p) in points.iter().enumerate() {
            let (x, y) = (self.to_pt(p.x), self.pdf_y(p.y)?);
            if i == 0 {
                ops.move_to(x, y);
            } else {
                ops.line_to(x, y);
            }
        }
        ops.close_and_paint(style);
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }

    /// Rotate subsequent drawing by `degrees` counter-clockwise around
    /// (x, y). Each call nests; [`Document::rotate_reset`] undoes the
    /// innermost one.
    pub fn rotate(&mut self, degrees: f64, x: f64, y: f64) -> Result<()> {
        let result = self.push_rotation(degrees, x, y);
        self.record(result)
    }

    fn push_rotation(&mut self, degrees: f64, x: f64, y: f64) -> Result<()> {
        let (px, py) = (self.to_pt(x), self.pdf_y(y)?);
        let content = self.content_mut()?;
        content.save();
        content.rotate_around(degrees, px, py);
        *self.rotation_depth()? += 1;
        Ok(())
    }

    /// Undo the innermost rotation of the page (or template page) being
    /// drawn on. Does nothing when none is open there.
    pub fn rotate_reset(&mut self) -> Result<()> {
        if self.rotation_depth().map_or(0, |d| *d) == 0 {
            return Ok(());
        }
        let result = self.content_mut().map(|c| c.restore());
        if result.is_ok() {
            if let Ok(depth) = self.rotation_depth() {
                *depth -= 1;
            }
        }
        self.record(result)
    }

    /// Open rotations on the current drawing target.
    fn rotation_depth(&mut self) -> Result<&mut usize> {
        if let Some(template) = self.template.as_mut() {
            return Ok(&mut template.rotations);
        }
        let page = self.current_page.ok_or(FolioError::NoPage)?;
        Ok(&mut self.pages[page].rotations)
    }

    /// Draw an image with its top-left corner at (x, y).
    pub fn image(&mut self, data: &[u8], x: f64, y: f64, size: Option<Rect>) -> Result<()> {
        self.image_with_options(
            data,
            ImageOptions {
                x,
                y,
                size,
                ..Default::default()
            },
        )
    }

    pub fn image_with_options(&mut self, data: &[u8], options: ImageOptions) -> Result<()> {
        let result = self.draw_image(data, options);
        self.record(result)
    }

    fn draw_image(&mut self, data: &[u8], options: ImageOptions) -> Result<()> {
        let top = self.pdf_y(options.y)?;
        let (name, embedded) = self.embed_image(data)?;
        let (w, h) = self.image_size(&embedded, options.size);
        let (x, y) = (self.to_pt(options.x), top - h);

        let mut ops = ContentStream::new();
        ops.save();
        match &options.mask {
            Some(mask) => {
                let gs = self.mask_gs(mask, [x, y, w, h], options.transparency)?;
                ops.graphics_state(&gs);
            }
            None => {
                if let Some(gs) = self.transparency_gs(options.transparency) {
                    ops.graphics_state(&gs);
                }
            }
        }
        ops.concat(w, 0.0, 0.0, h, x, y);
        ops.draw_xobject(&name);
        ops.restore();
        self.content_mut()?.extend(&ops);
        Ok(())
    }

    /// Drawn size in points.
    fn image_size(&self, image: &EmbeddedImage, size: Option<Rect>) -> (f64, f64) {
        let (nw, nh) = (image.width_px as f64, image.height_px as f64);
        let Some(size) = size else {
            return (nw, nh);
        };
        let (w, h) = (self.to_pt(size.w), self.to_pt(size.h));
        match (w > 0.0, h > 0.0) {
            (true, true) => (w, h),
            (true, false) => (w, w * nh / nw),
            (false, true) => (h * nw / nh, h),
            (false, false) => (nw, nh),
        }
    }

    /// Embed `data` as an image XObject once per document, keyed by its
    /// content hash. A translucent PNG gets its alpha channel appended first
    /// as a grayscale `/SMask` image.
    pub(crate) fn embed_image(&mut self, data: &[u8]) -> Result<(String, EmbeddedImage)> {
        let name = image::resource_name(data);
        if let Some(template) = self.template.as_mut() {
            template.add_image(&name, data);
        }
        if let Some(hit) = self.images.get(&name) {
            trace!(%name, "image cache hit");
            return Ok((name, *hit));
        }

        let decoded = image::decode(data)?;
        if decoded.width_px == 0 || decoded.height_px == 0 {
            return Err(FolioError::CorruptImageData(format!(
                "image has no pixels ({} x {})",
                decoded.width_px, decoded.height_px
            )));
        }
        let (filter, samples, alpha) = match decoded.payload {
            ImagePayload::Jpeg(bytes) => (ImageFilter::Dct, bytes, None),
            ImagePayload::Raw { samples, alpha } => (ImageFilter::Flate, samples, alpha),
        };
        let smask = alpha.map(|alpha| {
            self.store.append(PdfObject::Image(ImageXObject {
                width: decoded.width_px,
                height: decoded.height_px,
                color_space: ColorSpace::DeviceGray,
                filter: ImageFilter::Flate,
                data: alpha,
                smask: None,
            }))
        });
        let index = self.store.append(PdfObject::Image(ImageXObject {
            width: decoded.width_px,
            height: decoded.height_px,
            color_space: decoded.color_space,
            filter,
            data: samples,
            smask,
        }));
        self.resources.xobjects.insert(name.clone(), index);

        let embedded = EmbeddedImage {
            index,
            width_px: decoded.width_px,
            height_px: decoded.height_px,
        };
        debug!(%name, object = index + 1, width = embedded.width_px, height = embedded.height_px, "image embedded");
        self.images.insert(name.clone(), embedded);
        Ok((name, embedded))
    }

    /// Graphics state masking a drawing at `rect` (`[x y w h]`, PDF space)
    /// with the mask image, plus any transparency.
    fn mask_gs(
        &mut self,
        mask: &MaskOptions,
        rect: [f64; 4],
        transparency: Option<Transparency>,
    ) -> Result<String> {
        let (mask_name, _) = self.embed_image(&mask.data)?;
        let [x, y, w, h] = rect;

        let mut group = ContentStream::new();
        group.save();
        group.concat(w, 0.0, 0.0, h, x, y);
        group.draw_xobject(&mask_name);
        group.restore();
        let form = FormXObject {
            bbox: [x, y, x + w, y + h],
            content: group.as_bytes().to_vec(),
            transparency_group: true,
        };
        let key = SMaskKey::new(mask.subtype, &mask_name, rect);
        let smask = self.caches.soft_mask(&mut self.store, key, form);

        let t = transparency.or(self.state.transparency);
        let state = ExtGState {
            fill_alpha: t.map(|t| t.alpha),
            stroke_alpha: t.map(|t| t.alpha),
            blend_mode: t.map(|t| t.blend_mode),
            smask: Some(smask),
        };
        let resource = self
            .caches
            .ext_gstate(&mut self.store, &mut self.resources, state)
            .ok_or_else(|| FolioError::InvalidConfig("soft mask produced no graphics state".into()))?;
        Ok(resource.name)
    }
}
