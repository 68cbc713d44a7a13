use std::cell::{Cell, RefCell};
use std::f64::consts::TAU;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{
    CanvasRenderingContext2d, CanvasWindingRule, HtmlCanvasElement, HtmlImageElement, MouseEvent,
    PointerEvent, WheelEvent,
};

use blockmap_shared::blockinfo::tile_span;
use blockmap_shared::marker::{FillRule, Geometry, IconImage, Shape};
use blockmap_shared::{Color, LatLng, Player};

use crate::app::Readout;
use crate::icons;
use crate::overlay::{self, Callout, OpenPopup, Overlay};
use crate::registry::{self, WorldRegistry};
use crate::render_loop::FrameScheduler;
use crate::viewport::Viewport;
use crate::world::World;

const BACKGROUND: &str = "#0c0e17";
const DEFAULT_STROKE: Color = Color {
    rgb: 0x3388ff,
    opacity: 1.0,
};
const DEFAULT_WEIGHT: f64 = 3.0;
const DEFAULT_FILL_OPACITY: f64 = 0.2;
const TOOLTIP_FONT: &str = "12px sans-serif";
const LINE_HEIGHT: f64 = 14.0;
const CALLOUT_PAD: f64 = 4.0;
const POPUP_PAD: f64 = 8.0;
const POPUP_TIP: f64 = 10.0;
const AUTO_PAN_PADDING: f64 = 5.0;
/// Pointer travel past which a press is a drag, not a click.
const CLICK_SLOP: f64 = 4.0;
const PLAYER_RADIUS: f64 = 5.0;

#[component]
pub fn MapCanvas() -> impl IntoView {
    let viewport: RwSignal<Viewport> = expect_context();
    let Readout(readout) = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    // Track drag state
    let is_dragging = Rc::new(Cell::new(false));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));
    let pressed_at = Rc::new(Cell::new((0.0f64, 0.0f64)));

    let overlay: Rc<RefCell<Overlay>> = Rc::new(RefCell::new(Overlay::default()));

    // Cached 2D context (invalidated on canvas resize)
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));

    let paint_overlay = overlay.clone();
    let paint_ctx = cached_ctx.clone();
    let scheduler = FrameScheduler::new(move || {
        let cached_ctx = &paint_ctx;
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let Some(parent) = canvas.parent_element() else {
            return;
        };
        let w = parent.client_width() as f64;
        let h = parent.client_height() as f64;
        if w <= 0.0 || h <= 0.0 {
            return;
        }

        let vp = viewport.get_untracked();
        if vp.width != w || vp.height != h {
            // The size change re-runs the view effect, which asks for another frame.
            viewport.update(|vp| vp.resize(w, h));
            return;
        }

        let dpr = device_pixel_ratio();
        let cw = (w * dpr).round() as u32;
        let ch = (h * dpr).round() as u32;
        if canvas.width() != cw || canvas.height() != ch {
            canvas.set_width(cw);
            canvas.set_height(ch);
            cached_ctx.borrow_mut().take();
        }

        let mut ctx_slot = cached_ctx.borrow_mut();
        if ctx_slot.is_none() {
            *ctx_slot = context_2d(canvas);
        }
        let Some(ctx) = ctx_slot.as_ref() else {
            return;
        };
        ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();

        registry::with(|registry| {
            let mut overlay = paint_overlay.borrow_mut();
            overlay.follow_world(registry.current().map(World::name));
            paint(ctx, &vp, registry, &overlay, dpr);
        });
    });

    let redraw = scheduler.clone();
    registry::set_redraw(Some(Rc::new(move || redraw.request())));

    // View effect: every pan, zoom or resize repaints and re-picks tiles.
    let sched_vp = scheduler.clone();
    Effect::new(move || {
        viewport.track();
        sched_vp.request();
    });

    let sched_cleanup = StoredValue::new_local(scheduler.clone());
    on_cleanup(move || {
        registry::set_redraw(None);
        sched_cleanup.with_value(|s| s.shutdown());
    });

    // --- Input handlers ---

    let local_point = move |e: &MouseEvent| -> (f64, f64) {
        canvas_ref
            .get_untracked()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                (
                    e.client_x() as f64 - rect.left(),
                    e.client_y() as f64 - rect.top(),
                )
            })
            .unwrap_or((e.offset_x() as f64, e.offset_y() as f64))
    };

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        if delta == 0.0 {
            return;
        }
        let x = e.offset_x() as f64;
        let y = e.offset_y() as f64;
        viewport.update(|vp| vp.zoom_at(-delta.signum(), x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let pressed_at = pressed_at.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);
            pressed_at.set((e.client_x() as f64, e.client_y() as f64));

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let overlay = overlay.clone();
        move |e: PointerEvent| {
            if is_dragging.get() {
                let dx = e.client_x() as f64 - last_x.get();
                let dy = e.client_y() as f64 - last_y.get();
                last_x.set(e.client_x() as f64);
                last_y.set(e.client_y() as f64);
                viewport.update(|vp| vp.pan(dx, dy));
                return;
            }
            let local = local_point(&*e);
            let hover = viewport.with_untracked(|vp| hover_at(vp, local.0, local.1));
            let changed = {
                let mut overlay = overlay.borrow_mut();
                let changed = overlay.hover != hover;
                overlay.hover = hover;
                changed
            };
            if changed {
                registry::request_redraw();
            }

            let (bx, bz) = viewport.with_untracked(|vp| vp.screen_to_block(local.0, local.1));
            let (x, z) = (bx.floor() as i32, bz.floor() as i32);
            if readout.with_untracked(|r| r.as_ref().is_some_and(|r| r.x == x && r.z == z)) {
                return;
            }
            let inspection = registry::with(|registry| {
                registry
                    .current()
                    .map(|world| world.inspect(x, z, &registry.blocks))
            });
            readout.set(inspection);
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_click = {
        let overlay = overlay.clone();
        let cached_ctx = cached_ctx.clone();
        move |e: MouseEvent| {
            let (px, py) = pressed_at.get();
            let moved = (e.client_x() as f64 - px).hypot(e.client_y() as f64 - py);
            if moved > CLICK_SLOP {
                return;
            }
            let (x, y) = local_point(&e);
            let vp = viewport.get_untracked();
            let Some(popup) = popup_at(&vp, x, y) else {
                overlay.borrow_mut().click_map();
                registry::request_redraw();
                return;
            };
            let pan = match cached_ctx.borrow().as_ref() {
                Some(ctx) if popup.auto_pan => {
                    let layout = layout_popup(ctx, &vp, &popup);
                    overlay::auto_pan_delta(
                        (layout.x, layout.y, layout.w, layout.h + POPUP_TIP),
                        vp.width,
                        vp.height,
                        AUTO_PAN_PADDING,
                    )
                }
                _ => (0.0, 0.0),
            };
            overlay.borrow_mut().open(popup);
            if pan != (0.0, 0.0) {
                viewport.update(|vp| vp.pan(pan.0, pan.1));
            } else {
                registry::request_redraw();
            }
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        is_dragging.set(false);
        if overlay.borrow_mut().hover.take().is_some() {
            registry::request_redraw();
        }
        if readout.with_untracked(Option::is_some) {
            readout.set(None);
        }
    };

    view! {
        <div
            style="position: absolute; inset: 0; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
}

fn device_pixel_ratio() -> f64 {
    web_sys::window()
        .map(|win| win.device_pixel_ratio())
        .unwrap_or(1.0)
        .max(1.0)
}

/// Shape slices of the current world's visible layers, bottom to top.
fn visible_shapes(registry: &WorldRegistry) -> Vec<&[Shape]> {
    registry
        .current()
        .map(|world| {
            world
                .marker_layers()
                .iter()
                .filter(|layer| !layer.is_hidden())
                .map(|layer| layer.shapes())
                .collect()
        })
        .unwrap_or_default()
}

fn hover_at(vp: &Viewport, x: f64, y: f64) -> Option<Callout> {
    let dpr = device_pixel_ratio();
    registry::with(|registry| {
        let layers = visible_shapes(registry);
        let bounds = |icon: &IconImage, sx: f64, sy: f64| icon_rect(icon, dpr, sx, sy);
        let shape = overlay::pick(&layers, vp, x, y, overlay::has_hover_tooltip, &bounds)?;
        let (bx, bz) = vp.screen_to_block(x, y);
        Callout::tooltip(shape, vp.transform().to_lat_lng(bx, bz))
    })
}

fn popup_at(vp: &Viewport, x: f64, y: f64) -> Option<OpenPopup> {
    let dpr = device_pixel_ratio();
    registry::with(|registry| {
        let layers = visible_shapes(registry);
        let bounds = |icon: &IconImage, sx: f64, sy: f64| icon_rect(icon, dpr, sx, sy);
        let shape = overlay::pick(&layers, vp, x, y, overlay::has_popup, &bounds)?;
        let (bx, bz) = vp.screen_to_block(x, y);
        OpenPopup::new(shape, vp.transform().to_lat_lng(bx, bz))
    })
}

/// One frame: tiles, then marker layers by z-index, players, and callouts on top.
fn paint(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    registry: &WorldRegistry,
    overlay: &Overlay,
    dpr: f64,
) {
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, vp.width, vp.height);

    let Some(world) = registry.current() else {
        return;
    };
    paint_tiles(ctx, vp, world);

    for layer in world.marker_layers() {
        if layer.is_hidden() {
            continue;
        }
        for shape in layer.shapes() {
            draw_shape(ctx, vp, shape, dpr);
        }
        for shape in layer.shapes() {
            let permanent = shape
                .tooltip
                .as_ref()
                .is_some_and(|t| t.options.permanent == Some(true));
            if !permanent {
                continue;
            }
            let callout = overlay::anchor_of(&shape.geometry)
                .and_then(|anchor| Callout::tooltip(shape, anchor));
            if let Some(callout) = callout {
                draw_callout(ctx, vp, &callout);
            }
        }
    }

    for player in registry.players() {
        draw_player(ctx, vp, &player);
    }

    if let Some(hover) = overlay.hover.as_ref() {
        draw_callout(ctx, vp, hover);
    }
    for popup in &overlay.popups {
        draw_popup(ctx, vp, popup);
    }
}

fn paint_tiles(ctx: &CanvasRenderingContext2d, vp: &Viewport, world: &World) {
    let Some(tiles) = world.active_tiles() else {
        return;
    };
    ctx.set_image_smoothing_enabled(false);
    for layer in tiles.paint_order() {
        let Some(url_zoom) = layer.url_zoom() else {
            continue;
        };
        let span = tile_span(url_zoom);
        for (coord, image) in layer.ready_tiles() {
            let x1 = coord.x as f64 * span;
            let z1 = coord.z as f64 * span;
            let (sx, sy) = vp.block_to_screen(x1, z1);
            let (ex, ey) = vp.block_to_screen(x1 + span, z1 + span);
            // Snap to the pixel grid so neighbours overlap instead of leaving seams.
            let sx = sx.floor();
            let sy = sy.floor();
            let sw = ex.ceil() - sx;
            let sh = ey.ceil() - sy;
            if sx + sw < 0.0 || sy + sh < 0.0 || sx > vp.width || sy > vp.height {
                continue;
            }
            ctx.draw_image_with_html_image_element_and_dw_and_dh(image, sx, sy, sw, sh)
                .ok();
        }
    }
    ctx.set_image_smoothing_enabled(true);
}

fn trace_ring(ctx: &CanvasRenderingContext2d, vp: &Viewport, ring: &[LatLng], close: bool) {
    let mut points = ring.iter().map(|p| vp.lat_lng_to_screen(*p));
    let Some((x, y)) = points.next() else {
        return;
    };
    ctx.move_to(x, y);
    for (x, y) in points {
        ctx.line_to(x, y);
    }
    if close {
        ctx.close_path();
    }
}

fn draw_shape(ctx: &CanvasRenderingContext2d, vp: &Viewport, shape: &Shape, dpr: f64) {
    ctx.begin_path();
    match &shape.geometry {
        Geometry::Circle { center, radius } => {
            let (x, y) = vp.lat_lng_to_screen(*center);
            ctx.arc(x, y, vp.meters_to_screen(*radius), 0.0, TAU).ok();
        }
        Geometry::Ellipse {
            center,
            radii,
            tilt_degrees,
        } => {
            let (x, y) = vp.lat_lng_to_screen(*center);
            ctx.ellipse(
                x,
                y,
                vp.meters_to_screen(radii.0),
                vp.meters_to_screen(radii.1),
                tilt_degrees.to_radians(),
                0.0,
                TAU,
            )
            .ok();
        }
        Geometry::Icon { position, image } => {
            draw_icon(ctx, vp, *position, image, dpr);
            return;
        }
        Geometry::Polygon(rings) => {
            for ring in rings {
                trace_ring(ctx, vp, ring, true);
            }
        }
        Geometry::MultiPolygon(polygons) => {
            for ring in polygons.iter().flatten() {
                trace_ring(ctx, vp, ring, true);
            }
        }
        Geometry::Polyline(points) => trace_ring(ctx, vp, points, false),
        Geometry::MultiPolyline(lines) => {
            for line in lines {
                trace_ring(ctx, vp, line, false);
            }
        }
        Geometry::Rectangle { corner1, corner2 } => {
            let (x1, y1) = vp.lat_lng_to_screen(*corner1);
            let (x2, y2) = vp.lat_lng_to_screen(*corner2);
            ctx.rect(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs());
        }
    }

    let stroke = shape.stroke.clone().unwrap_or_default();
    let stroke_color = stroke.color.unwrap_or(DEFAULT_STROKE);
    let fill = shape.fill.clone().unwrap_or_default();
    if fill.enabled.unwrap_or(shape.geometry.is_area()) {
        let color = fill
            .color
            .unwrap_or_else(|| stroke_color.faded(DEFAULT_FILL_OPACITY));
        ctx.set_fill_style_str(&color.rgba_css());
        let rule = match fill.rule {
            Some(FillRule::EvenOdd) => CanvasWindingRule::Evenodd,
            _ => CanvasWindingRule::Nonzero,
        };
        ctx.fill_with_canvas_winding_rule(rule);
    }

    if stroke.enabled.unwrap_or(true) {
        ctx.set_stroke_style_str(&stroke_color.rgba_css());
        ctx.set_line_width(stroke.weight.unwrap_or(DEFAULT_WEIGHT));
        ctx.set_line_cap(stroke.line_cap.map_or("round", |c| c.as_str()));
        ctx.set_line_join(stroke.line_join.map_or("round", |j| j.as_str()));
        let dashes = stroke
            .dash_pattern
            .as_deref()
            .map(parse_dash_pattern)
            .unwrap_or_default();
        let segments: js_sys::Array = dashes.iter().map(|d| JsValue::from_f64(*d)).collect();
        ctx.set_line_dash(&segments).ok();
        ctx.set_line_dash_offset(
            stroke
                .dash_offset
                .as_deref()
                .and_then(|o| o.trim().parse().ok())
                .unwrap_or(0.0),
        );
        ctx.stroke();
        ctx.set_line_dash(&js_sys::Array::new()).ok();
    }
}

/// Image and screen box for an icon anchored at `(sx, sy)`. A retina image stands in for one of
/// half its natural size.
fn icon_image(
    normal: Option<&str>,
    retina: Option<&str>,
    icon: &IconImage,
    dpr: f64,
    sx: f64,
    sy: f64,
) -> Option<(HtmlImageElement, (f64, f64, f64, f64))> {
    let url = icons::source(normal, retina, dpr)?;
    let image = icons::image(url)?;
    let mut natural = natural_size(&image);
    if retina == Some(url) {
        natural = natural.map(|n| n / 2.0);
    }
    let rect = icons::placement(icon, natural, sx, sy);
    Some((image, rect))
}

fn icon_rect(icon: &IconImage, dpr: f64, sx: f64, sy: f64) -> Option<(f64, f64, f64, f64)> {
    icon_image(icon.url.as_deref(), icon.retina_url.as_deref(), icon, dpr, sx, sy)
        .map(|(_, rect)| rect)
}

fn draw_icon(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    position: LatLng,
    icon: &IconImage,
    dpr: f64,
) {
    let (sx, sy) = vp.lat_lng_to_screen(position);
    let Some((image, (dx, dy, w, h))) =
        icon_image(icon.url.as_deref(), icon.retina_url.as_deref(), icon, dpr, sx, sy)
    else {
        return;
    };
    let shadow_icon = IconImage {
        size: icon.shadow_size,
        anchor: icon.shadow_anchor,
        ..IconImage::default()
    };
    if let Some((shadow, (sdx, sdy, sw, sh))) = icon_image(
        icon.shadow_url.as_deref(),
        icon.shadow_retina_url.as_deref(),
        &shadow_icon,
        dpr,
        sx,
        sy,
    ) {
        ctx.draw_image_with_html_image_element_and_dw_and_dh(&shadow, sdx, sdy, sw, sh)
            .ok();
    }
    ctx.draw_image_with_html_image_element_and_dw_and_dh(&image, dx, dy, w, h)
        .ok();
}

fn natural_size(image: &HtmlImageElement) -> [f64; 2] {
    [image.natural_width() as f64, image.natural_height() as f64]
}

fn text_width(ctx: &CanvasRenderingContext2d, text: &str) -> f64 {
    ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0)
}

fn draw_callout(ctx: &CanvasRenderingContext2d, vp: &Viewport, callout: &Callout) {
    let (x, y) = vp.lat_lng_to_screen(callout.at);
    let [ox, oy] = callout.offset;

    ctx.set_font(TOOLTIP_FONT);
    let lines: Vec<&str> = callout.text.lines().collect();
    let width = lines
        .iter()
        .map(|line| text_width(ctx, line))
        .fold(0.0, f64::max);
    let box_w = width + CALLOUT_PAD * 2.0;
    let box_h = LINE_HEIGHT * lines.len() as f64 + CALLOUT_PAD * 2.0;
    let (bx, by) = overlay::tooltip_box(callout.direction, x + ox, y + oy, box_w, box_h);

    ctx.set_global_alpha(callout.opacity);
    ctx.set_fill_style_str("rgba(255,255,255,1)");
    ctx.fill_rect(bx, by, box_w, box_h);
    ctx.set_stroke_style_str("rgba(0,0,0,0.4)");
    ctx.set_line_width(1.0);
    ctx.stroke_rect(bx, by, box_w, box_h);
    ctx.set_fill_style_str("#222");
    ctx.set_text_baseline("top");
    for (i, line) in lines.iter().enumerate() {
        ctx.fill_text(line, bx + CALLOUT_PAD, by + CALLOUT_PAD + LINE_HEIGHT * i as f64)
            .ok();
    }
    ctx.set_global_alpha(1.0);
}

struct PopupLayout {
    lines: Vec<String>,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

fn layout_popup(ctx: &CanvasRenderingContext2d, vp: &Viewport, popup: &OpenPopup) -> PopupLayout {
    ctx.set_font(TOOLTIP_FONT);
    let lines = overlay::wrap_text(&popup.text, popup.max_width, |text| text_width(ctx, text));
    let text_w = lines
        .iter()
        .map(|line| text_width(ctx, line))
        .fold(0.0, f64::max)
        .clamp(popup.min_width, popup.max_width);
    let w = text_w + POPUP_PAD * 2.0;
    let mut h = LINE_HEIGHT * lines.len() as f64 + POPUP_PAD * 2.0;
    if let Some(max) = popup.max_height {
        h = h.min(max);
    }
    let (ax, ay) = vp.lat_lng_to_screen(popup.at);
    let (x, y) = overlay::popup_box(ax + popup.offset[0], ay + popup.offset[1], w, h);
    PopupLayout { lines, x, y, w, h }
}

fn draw_popup(ctx: &CanvasRenderingContext2d, vp: &Viewport, popup: &OpenPopup) {
    let PopupLayout { lines, x, y, w, h } = layout_popup(ctx, vp, popup);
    let tip_x = x + w / 2.0;

    ctx.begin_path();
    ctx.rect(x, y, w, h);
    ctx.move_to(tip_x - POPUP_TIP, y + h);
    ctx.line_to(tip_x, y + h + POPUP_TIP);
    ctx.line_to(tip_x + POPUP_TIP, y + h);
    ctx.set_fill_style_str("rgba(255,255,255,1)");
    ctx.fill();
    ctx.set_stroke_style_str("rgba(0,0,0,0.4)");
    ctx.set_line_width(1.0);
    ctx.stroke_rect(x, y, w, h);

    // Text past maxHeight is cut off.
    ctx.save();
    ctx.begin_path();
    ctx.rect(x, y, w, h);
    ctx.clip();
    ctx.set_fill_style_str("#222");
    ctx.set_text_baseline("top");
    for (i, line) in lines.iter().enumerate() {
        ctx.fill_text(line, x + POPUP_PAD, y + POPUP_PAD + LINE_HEIGHT * i as f64)
            .ok();
    }
    ctx.restore();
}

fn draw_player(ctx: &CanvasRenderingContext2d, vp: &Viewport, player: &Player) {
    let (x, y) = vp.block_to_screen(player.position.x + 0.5, player.position.z + 0.5);
    if x < -50.0 || y < -50.0 || x > vp.width + 50.0 || y > vp.height + 50.0 {
        return;
    }
    ctx.begin_path();
    ctx.arc(x, y, PLAYER_RADIUS, 0.0, TAU).ok();
    ctx.set_fill_style_str("#ffd966");
    ctx.fill();
    ctx.set_stroke_style_str("rgba(0,0,0,0.6)");
    ctx.set_line_width(1.5);
    ctx.stroke();

    ctx.set_font(TOOLTIP_FONT);
    ctx.set_text_baseline("bottom");
    ctx.set_stroke_style_str("rgba(0,0,0,0.8)");
    ctx.set_line_width(3.0);
    ctx.stroke_text(&player.name, x + PLAYER_RADIUS + 2.0, y - 2.0)
        .ok();
    ctx.set_fill_style_str("#ffffff");
    ctx.fill_text(&player.name, x + PLAYER_RADIUS + 2.0, y - 2.0)
        .ok();
}

/// Dash list from a `"5, 10"` style pattern. Anything unparsable means a solid line.
fn parse_dash_pattern(pattern: &str) -> Vec<f64> {
    let dashes: Option<Vec<f64>> = pattern
        .split([',', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>().ok().filter(|d| *d >= 0.0))
        .collect();
    dashes.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::parse_dash_pattern;

    #[test]
    fn dash_patterns() {
        assert_eq!(parse_dash_pattern("5, 10"), vec![5.0, 10.0]);
        assert_eq!(parse_dash_pattern("4 2 1"), vec![4.0, 2.0, 1.0]);
        assert!(parse_dash_pattern("").is_empty());
        assert!(parse_dash_pattern("5, x").is_empty());
        assert!(parse_dash_pattern("-1").is_empty());
    }
}
