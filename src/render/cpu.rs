use std::collections::HashMap;
use std::sync::Arc;

use vello_cpu::kurbo::{self as vk, Shape};
use vello_cpu::peniko::color::PremulRgba8;

use crate::animation::ease::Ease;
use crate::assets::icons::{Icon, IconKey, IconStore};
use crate::foundation::core::{Point, Rgba8};
use crate::foundation::error::{FlowError, FlowResult};
use crate::render::backend::{FrameRGBA, RenderBackend, RenderSettings};
use crate::scene::layout::{EdgeOwner, Layout, NODE_SIZE, NodeKind, ReturnPath};
use crate::sim::effects::DispersingParticle;
use crate::sim::failure::FailureController;
use crate::sim::particle::Fate;
use crate::sim::simulation::Simulation;

const DEFAULT_BACKGROUND: Rgba8 = Rgba8::new(252, 253, 255, 255);
const CONNECTION: Rgba8 = Rgba8::new(200, 210, 220, 255);
const CONNECTION_LAYERS: usize = 5;
const RETURN_DOTS: usize = 30;
const COLLISION_MARK: Rgba8 = Rgba8::new(0, 0, 0, 255);
const COLLISION_MARK_SIZE: f64 = 25.0;
const NODE_RADIUS: f64 = 15.0;
const NODE_SHADOW: Rgba8 = Rgba8::new(0, 0, 0, 20);
const GLOW: Rgba8 = Rgba8::new(253, 194, 33, 255);
const TOLERANCE: f64 = 0.1;

/// Stroke and fill of a node body.
fn node_palette(kind: NodeKind) -> (Rgba8, Rgba8) {
    match kind {
        NodeKind::Service | NodeKind::Enrichment => {
            (Rgba8::opaque(59, 28, 50), Rgba8::opaque(232, 217, 227))
        }
        NodeKind::Depositor | NodeKind::Validation => {
            (Rgba8::opaque(41, 71, 96), Rgba8::opaque(0, 175, 181))
        }
        NodeKind::Metadata => (Rgba8::opaque(14, 121, 178), Rgba8::opaque(217, 232, 247)),
    }
}

/// CPU backend powered by `vello_cpu`.
///
/// The drawing context is reused between frames but reset before each one, so nothing drawn for
/// a previous frame survives.
pub struct CpuRenderer {
    settings: RenderSettings,
    ctx: Option<vello_cpu::RenderContext>,
    icon_cache: HashMap<IconKey, vello_cpu::Image>,
}

impl CpuRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            ctx: None,
            icon_cache: HashMap::new(),
        }
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> FlowResult<R>,
    ) -> FlowResult<R> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    fn icon_paint(
        &mut self,
        key: IconKey,
        icons: &IconStore,
    ) -> FlowResult<Option<vello_cpu::Image>> {
        if let Some(img) = self.icon_cache.get(&key) {
            return Ok(Some(img.clone()));
        }
        let Some(icon) = icons.get(key) else {
            return Ok(None);
        };
        let img = icon_to_image(icon)?;
        self.icon_cache.insert(key, img.clone());
        Ok(Some(img))
    }

    fn draw_nodes(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        sim: &Simulation,
        icons: &IconStore,
    ) -> FlowResult<()> {
        let layout = sim.layout();
        let controller = sim.controller();

        for glow in sim.glows() {
            draw_glow(ctx, glow.pos, glow.intensity);
        }

        for node in layout.nodes() {
            let opacity = node_opacity(controller, node.id, node.branch);
            if opacity <= 0.0 {
                continue;
            }
            let (stroke, fill) = node_palette(node.kind);
            let half = NODE_SIZE / 2.0;
            let c = node.center;

            let shadow = vk::RoundedRect::new(
                c.x - half + 2.0,
                c.y - half + 2.0,
                c.x + half + 2.0,
                c.y + half + 2.0,
                NODE_RADIUS,
            );
            ctx.set_paint(color(NODE_SHADOW.faded(opacity)));
            ctx.fill_path(&shadow.to_path(TOLERANCE));

            let body =
                vk::RoundedRect::new(c.x - half, c.y - half, c.x + half, c.y + half, NODE_RADIUS)
                    .to_path(TOLERANCE);
            ctx.set_paint(color(fill.faded(opacity)));
            ctx.fill_path(&body);
            ctx.set_stroke(vk::Stroke::new(2.0));
            ctx.set_paint(color(stroke.faded(opacity)));
            ctx.stroke_path(&body);

            if let Some(img) = self.icon_paint(IconKey::for_kind(node.kind), icons)? {
                let size = f64::from(crate::assets::icons::ICON_SIZE);
                ctx.set_transform(vk::Affine::translate((c.x - size / 2.0, c.y - size / 2.0)));
                ctx.set_paint(img);
                let layered = opacity < 1.0;
                if layered {
                    ctx.push_opacity_layer(opacity as f32);
                }
                ctx.fill_rect(&vk::Rect::new(0.0, 0.0, size, size));
                if layered {
                    ctx.pop_layer();
                }
                ctx.reset_transform();
            }
        }
        Ok(())
    }
}

impl RenderBackend for CpuRenderer {
    #[tracing::instrument(level = "trace", skip_all, fields(now_ms = sim.now_ms()))]
    fn render(&mut self, sim: &Simulation, icons: &IconStore) -> FlowResult<FrameRGBA> {
        let canvas = sim.layout().canvas();
        let w: u16 = canvas
            .width
            .try_into()
            .map_err(|_| FlowError::render("canvas width exceeds u16"))?;
        let h: u16 = canvas
            .height
            .try_into()
            .map_err(|_| FlowError::render("canvas height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(FlowError::render("canvas must be non-empty"));
        }
        let background = self
            .settings
            .clear_rgba
            .map(Rgba8::from)
            .unwrap_or(DEFAULT_BACKGROUND);

        self.with_ctx_mut(w, h, |this, ctx| {
            ctx.set_paint(color(background));
            ctx.fill_rect(&vk::Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));

            draw_connections(ctx, sim.layout(), sim.controller());
            draw_return_paths(ctx, sim.layout());
            draw_particles(ctx, sim);
            this.draw_nodes(ctx, sim, icons)?;
            for state in sim.controller().states() {
                for p in state.dispersion() {
                    draw_dispersing(ctx, p);
                }
            }

            ctx.flush();
            let mut pixmap = vello_cpu::Pixmap::new(w, h);
            ctx.render_to_pixmap(&mut pixmap);
            Ok(FrameRGBA {
                width: canvas.width,
                height: canvas.height,
                data: pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            })
        })
    }
}

fn color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn vpt(p: Point) -> vk::Point {
    vk::Point::new(p.x, p.y)
}

fn fill_circle(ctx: &mut vello_cpu::RenderContext, center: Point, radius: f64, c: Rgba8) {
    if radius <= 0.0 || c.a == 0 {
        return;
    }
    ctx.set_paint(color(c));
    ctx.fill_path(&vk::Circle::new(vpt(center), radius).to_path(TOLERANCE));
}

fn stroke_line(ctx: &mut vello_cpu::RenderContext, a: Point, b: Point, width: f64, c: Rgba8) {
    if c.a == 0 {
        return;
    }
    let mut path = vk::BezPath::new();
    path.move_to(vpt(a));
    path.line_to(vpt(b));
    ctx.set_stroke(vk::Stroke::new(width));
    ctx.set_paint(color(c));
    ctx.stroke_path(&path);
}

fn node_opacity(
    controller: &FailureController,
    node: crate::scene::layout::NodeId,
    branch: Option<crate::scene::layout::BranchId>,
) -> f64 {
    let Some(state) = branch.and_then(|b| controller.state(b)) else {
        return 1.0;
    };
    if state.service() == node {
        state.opacities().service_body
    } else if state.silo() == node {
        state.opacities().silo_body
    } else {
        1.0
    }
}

fn edge_opacity(controller: &FailureController, owner: EdgeOwner) -> f64 {
    let of = |b| controller.state(b).map(|s| *s.opacities());
    match owner {
        EdgeOwner::Static => Some(1.0),
        EdgeOwner::Inbound(b) => of(b).map(|o| o.inbound_edge),
        EdgeOwner::Outbound(b) => of(b).map(|o| o.outbound_edge),
        EdgeOwner::Feed(b) => of(b).map(|o| o.silo_body),
    }
    .unwrap_or(1.0)
}

/// Soft connections: wide faint strokes under narrow stronger ones.
fn draw_connections(
    ctx: &mut vello_cpu::RenderContext,
    layout: &Layout,
    controller: &FailureController,
) {
    for layer in 0..CONNECTION_LAYERS {
        let t = layer as f64 / CONNECTION_LAYERS as f64;
        let alpha = 150.0 * (1.0 - t);
        let width = 5.0 - 3.0 * t;
        for edge in layout.edges() {
            let opacity = edge_opacity(controller, edge.owner);
            let c = CONNECTION.with_alpha((alpha * opacity).round() as u8);
            stroke_line(ctx, layout.center(edge.from), layout.center(edge.to), width, c);
        }
    }
}

fn draw_return_paths(ctx: &mut vello_cpu::RenderContext, layout: &Layout) {
    let Some(lp) = layout.return_loop() else {
        return;
    };
    let dot = CONNECTION.with_alpha(150);
    for path in [ReturnPath::Top, ReturnPath::Bottom] {
        for i in 0..=RETURN_DOTS {
            let p = lp.point_at(path, i as f64 / RETURN_DOTS as f64);
            fill_circle(ctx, p, 2.0, dot);
        }
        if let Some(hit) = lp.collision_point(path) {
            fill_circle(ctx, hit, 5.0, dot);
            let d = COLLISION_MARK_SIZE / 2.0;
            let mark = |dx: f64, dy: f64| Point::new(hit.x + dx, hit.y + dy);
            stroke_line(ctx, mark(-d, -d), mark(d, d), 3.0, COLLISION_MARK);
            stroke_line(ctx, mark(d, -d), mark(-d, d), 3.0, COLLISION_MARK);
        }
    }
}

fn draw_particles(ctx: &mut vello_cpu::RenderContext, sim: &Simulation) {
    for trail in sim.trails().live() {
        let c = trail.color.faded(trail.opacity);
        fill_circle(ctx, trail.pos, trail.size / 2.0, c);
    }

    for p in sim.particles() {
        for d in p.burst() {
            draw_dispersing(ctx, d);
        }
        if p.fate() == Fate::Collided {
            continue;
        }
        let c = p.color();
        // halo, outermost first
        for ring in 0..5 {
            let i = 1.0 - 0.2 * ring as f64;
            let radius = p.size() * (1.0 + i) / 2.0;
            fill_circle(ctx, p.position(), radius, c.faded(0.15));
        }
        fill_circle(ctx, p.position(), p.size() / 2.0, c);
    }
}

fn draw_dispersing(ctx: &mut vello_cpu::RenderContext, p: &DispersingParticle) {
    let fade = p.opacity();
    fill_circle(ctx, p.pos, p.size(), p.color.faded(fade * 0.3));
    fill_circle(ctx, p.pos, p.size() / 2.0, p.color.faded(fade));
}

fn draw_glow(ctx: &mut vello_cpu::RenderContext, center: Point, intensity: f64) {
    let spread = Ease::OutCubic.apply(1.0 - intensity);
    for ring in 0..3 {
        let radius = NODE_SIZE / 2.0 + 6.0 + 8.0 * ring as f64 + 14.0 * spread;
        let alpha = intensity * 0.35 / (1.0 + ring as f64);
        fill_circle(ctx, center, radius, GLOW.faded(alpha));
    }
}

fn icon_to_image(icon: &Icon) -> FlowResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(&icon.rgba8_premul, icon.width, icon.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> FlowResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| FlowError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| FlowError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(FlowError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
