//! 2D canvas rendering of a [`FrameOutput`].

use std::f64::consts::TAU;

use lanyard_core::na::{Point3, Vector3};
use lanyard_core::{AssetKind, Camera, FrameOutput, WrapMode};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::assets::Textures;
use crate::constants::{
    CARD_FALLBACK_BACK, CARD_FALLBACK_FRONT, CONNECTOR_COLOR, CONNECTOR_RADIUS, ROPE_FALLBACK_COLOR,
    ROPE_WIDTH,
};
use crate::utils::ndc_to_canvas;

// Non-deprecated helpers to set canvas styles via property assignment.
fn set_style(ctx: &CanvasRenderingContext2d, prop: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(ctx.as_ref(), &JsValue::from_str(prop), value);
}

pub fn set_fill_style(ctx: &CanvasRenderingContext2d, color: &str) {
    set_style(ctx, "fillStyle", &JsValue::from_str(color));
}

pub fn set_stroke_style(ctx: &CanvasRenderingContext2d, color: &str) {
    set_style(ctx, "strokeStyle", &JsValue::from_str(color));
}

fn repetition(mode: WrapMode) -> &'static str {
    match mode {
        WrapMode::Repeat => "repeat",
        WrapMode::ClampToEdge => "no-repeat",
    }
}

/// Rope width in backing-store pixels. The line resolution preset says how
/// many rope-width units span the canvas on each axis.
pub fn rope_width_px(width: f64, height: f64, resolution: [f32; 2]) -> f64 {
    let sx = width / resolution[0].max(1.0) as f64;
    let sy = height / resolution[1].max(1.0) as f64;
    (ROPE_WIDTH * sx.min(sy)).max(1.0)
}

fn usable(img: &HtmlImageElement) -> bool {
    img.complete() && img.natural_width() > 0 && img.natural_height() > 0
}

/// Projects world points onto the canvas backing store.
struct Projector<'a> {
    camera: &'a Camera,
    width: f64,
    height: f64,
}

impl Projector<'_> {
    fn to_canvas(&self, p: &Point3<f32>) -> Option<(f64, f64)> {
        let ndc = self.camera.project(p)?;
        Some(ndc_to_canvas(ndc.x, ndc.y, self.width, self.height))
    }
}

pub fn draw(
    ctx: &CanvasRenderingContext2d,
    width: f64,
    height: f64,
    camera: &Camera,
    face_size: [f32; 2],
    textures: &Textures,
    out: &FrameOutput,
) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.clear_rect(0.0, 0.0, width, height);
    let proj = Projector {
        camera,
        width,
        height,
    };
    draw_rope(ctx, &proj, out, textures.get(AssetKind::Rope));
    draw_card(ctx, &proj, out, face_size, textures);
    draw_connectors(ctx, &proj, out);
}

fn draw_rope(
    ctx: &CanvasRenderingContext2d,
    proj: &Projector<'_>,
    out: &FrameOutput,
    texture: Option<&HtmlImageElement>,
) {
    let pts: Vec<(f64, f64)> = out.rope.iter().filter_map(|p| proj.to_canvas(p)).collect();
    let Some((first, rest)) = pts.split_first() else {
        return;
    };
    ctx.begin_path();
    ctx.move_to(first.0, first.1);
    for (x, y) in rest {
        ctx.line_to(*x, *y);
    }
    ctx.set_line_cap("round");
    ctx.set_line_join("round");
    ctx.set_line_width(rope_width_px(proj.width, proj.height, out.line_resolution));
    ctx.set_global_alpha(out.rope_opacity.clamp(0.0, 1.0) as f64);

    let pattern = texture.filter(|img| usable(img)).and_then(|img| {
        ctx.create_pattern_with_html_image_element(img, repetition(AssetKind::Rope.wrap()))
            .ok()
            .flatten()
    });
    match pattern {
        Some(pattern) => set_style(ctx, "strokeStyle", pattern.as_ref()),
        None => set_stroke_style(ctx, ROPE_FALLBACK_COLOR),
    }
    ctx.stroke();
    ctx.set_global_alpha(1.0);
}

fn draw_card(
    ctx: &CanvasRenderingContext2d,
    proj: &Projector<'_>,
    out: &FrameOutput,
    face_size: [f32; 2],
    textures: &Textures,
) {
    let scale = out.card.scale;
    if scale <= 1e-4 {
        return;
    }
    let hx = face_size[0] * scale * 0.5;
    let hy = face_size[1] * scale * 0.5;
    let pos = out.card.position;
    let rot = out.card.rotation;

    let normal = rot * Vector3::z();
    let front = normal.dot(&(proj.camera.position - pos)) >= 0.0;
    // the back face is seen mirrored, so swap sides to keep its image upright
    let sx = if front { 1.0 } else { -1.0 };
    let corner = |x: f32, y: f32| proj.to_canvas(&(pos + rot * Vector3::new(x * sx, y, 0.0)));
    let (Some(tl), Some(tr), Some(br), Some(bl)) = (
        corner(-hx, hy),
        corner(hx, hy),
        corner(hx, -hy),
        corner(-hx, -hy),
    ) else {
        return;
    };

    ctx.save();
    ctx.begin_path();
    ctx.move_to(tl.0, tl.1);
    ctx.line_to(tr.0, tr.1);
    ctx.line_to(br.0, br.1);
    ctx.line_to(bl.0, bl.1);
    ctx.close_path();

    let kind = if front {
        AssetKind::CardFront
    } else {
        AssetKind::CardBack
    };
    match textures.get(kind).filter(|img| usable(img)) {
        Some(img) => {
            ctx.clip();
            let iw = img.natural_width() as f64;
            let ih = img.natural_height() as f64;
            // affine map of the image rectangle onto tl/tr/bl
            let _ = ctx.set_transform(
                (tr.0 - tl.0) / iw,
                (tr.1 - tl.1) / iw,
                (bl.0 - tl.0) / ih,
                (bl.1 - tl.1) / ih,
                tl.0,
                tl.1,
            );
            let _ = ctx.draw_image_with_html_image_element(img, 0.0, 0.0);
        }
        None => {
            set_fill_style(
                ctx,
                if front {
                    CARD_FALLBACK_FRONT
                } else {
                    CARD_FALLBACK_BACK
                },
            );
            ctx.fill();
        }
    }
    ctx.restore();
}

fn draw_connectors(ctx: &CanvasRenderingContext2d, proj: &Projector<'_>, out: &FrameOutput) {
    let radius = CONNECTOR_RADIUS * out.connector_scale;
    if radius <= 0.0 {
        return;
    }
    set_fill_style(ctx, CONNECTOR_COLOR);
    for c in &out.connectors {
        let (Some(center), Some(edge)) = (
            proj.to_canvas(c),
            proj.to_canvas(&(c + Vector3::new(radius, 0.0, 0.0))),
        ) else {
            continue;
        };
        let r = ((edge.0 - center.0).powi(2) + (edge.1 - center.1).powi(2)).sqrt();
        ctx.begin_path();
        let _ = ctx.arc(center.0, center.1, r.max(0.5), 0.0, TAU);
        ctx.fill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rope_width_follows_smaller_axis() {
        assert_eq!(rope_width_px(1000.0, 1000.0, [1000.0, 1000.0]), ROPE_WIDTH);
        assert_eq!(rope_width_px(1000.0, 1000.0, [1000.0, 2000.0]), ROPE_WIDTH * 0.5);
        assert_eq!(rope_width_px(10.0, 10.0, [1000.0, 1000.0]), 1.0);
    }

    #[test]
    fn wrap_modes_map_to_pattern_repetition() {
        assert_eq!(repetition(AssetKind::Rope.wrap()), "repeat");
        assert_eq!(repetition(AssetKind::CardBack.wrap()), "no-repeat");
    }
}
