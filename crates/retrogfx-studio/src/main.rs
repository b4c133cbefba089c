use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use retrogfx_engine::backend::Backend;
use retrogfx_engine::coords::{PixelRect, Vec2};
use retrogfx_engine::device::{Gpu, GpuInit};
use retrogfx_engine::logging::{LoggingConfig, init_logging};
use retrogfx_engine::raster::{CubicBezier, QuadTransform};
use retrogfx_engine::{
    BlendMode, BlendState, ImageData, NoiseRange, Pen, Renderer, RendererConfig, Rgba, ShapeKind,
    SoftwareBackend, WgpuBackend,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 200;

/// Renders the retrogfx demo scene to a PNG
#[derive(Parser, Debug)]
#[command(name = "retrogfx-studio")]
#[command(version)]
struct Args {
    /// Render on a wgpu adapter instead of the software backend
    #[arg(long)]
    gpu: bool,

    /// PNG file to write
    #[arg(default_value = "retrogfx-demo.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let args = Args::parse();

    let frame = if args.gpu {
        let gpu = Gpu::new_headless_blocking(GpuInit::default())
            .or_else(|e| {
                log::debug!("hardware adapter unavailable ({e:#}); trying a fallback adapter");
                Gpu::new_headless_blocking(GpuInit::fallback())
            });
        match gpu {
            Ok(gpu) => render(Renderer::new(WgpuBackend::new(&gpu), RendererConfig::default()))?,
            Err(e) => {
                log::warn!("no usable GPU ({e:#}); falling back to the software backend");
                render(Renderer::new(SoftwareBackend::new(), RendererConfig::default()))?
            }
        }
    } else {
        render(Renderer::new(SoftwareBackend::new(), RendererConfig::default()))?
    };

    image::save_buffer(&args.output, &frame.pixels, frame.width, frame.height, image::ColorType::Rgba8)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!("wrote {}x{} frame to {}", frame.width, frame.height, args.output.display());
    Ok(())
}

/// Draws the demo scene and reads the composed frame back.
fn render<B: Backend>(mut r: Renderer<B>) -> Result<ImageData> {
    let id = r.create_surface(WIDTH, HEIGHT)?;

    // Sky: one band per eighth of the screen, darkest on top.
    for band in 0..8u8 {
        let y = band as i32 * (HEIGHT as i32 / 8);
        r.draw_rect_filled(id, 0, y, WIDTH as i32, HEIGHT as i32 / 8, Rgba::opaque(8 + band * 10, 4 + band * 6, 40 + band * 14));
    }

    // Sun with a translucent halo.
    r.draw_circle_filled(id, 250, 60, 26, Rgba::opaque(255, 200, 80), Rgba::opaque(255, 160, 40));
    r.draw_circle(id, 250, 60, 34, Rgba::new(255, 220, 120, 110));
    r.draw_arc(id, 250, 60, 42, 200.0, 340.0, Rgba::new(255, 220, 120, 70));

    // Hills.
    r.draw_ellipse(id, 80, 190, 120, 50, Rgba::opaque(20, 70, 40), Some(Rgba::opaque(30, 100, 55)));
    r.draw_ellipse(id, 260, 200, 110, 40, Rgba::opaque(15, 55, 30), Some(Rgba::opaque(25, 85, 45)));

    // Road.
    r.set_pen(id, Pen::round(5));
    let road = CubicBezier::new(
        Vec2::new(150.0, 199.0),
        Vec2::new(120.0, 170.0),
        Vec2::new(210.0, 160.0),
        Vec2::new(170.0, 140.0),
    );
    r.draw_bezier(id, &road, Rgba::opaque(90, 80, 70));
    r.set_pen(id, Pen::pixel());
    r.draw_bezier(id, &road, Rgba::opaque(240, 230, 140));

    // Stars.
    for (i, (x, y)) in [(20, 12), (47, 30), (88, 9), (131, 22), (170, 14), (199, 35), (300, 18)].into_iter().enumerate() {
        r.draw_pixel(id, x, y, Rgba::WHITE);
        if i % 3 == 0 {
            r.draw_cached_geometry(id, ShapeKind::Circle, 3, x, y, Rgba::new(255, 255, 255, 90));
        }
    }

    // A tiled sprite sheet: 4x4 checker, drawn whole and as a rotated sub-region.
    let mut sheet = ImageData::filled(4, 4, Rgba::opaque(200, 40, 60));
    for y in 0..4 {
        for x in 0..4 {
            if (x + y) % 2 == 0 {
                sheet.set_pixel(x, y, Rgba::opaque(250, 240, 220));
            }
        }
    }
    let sheet = r.register_image(sheet);
    r.draw_image(id, sheet, 12.0, 150.0)?;
    r.draw_sprite(
        id,
        sheet,
        Some(PixelRect::new(0, 0, 2, 2)),
        &QuadTransform::at(60.0, 150.0, 2.0, 2.0).with_anchor(0.5, 0.5).with_scale(8.0, 8.0).with_rotation(0.4),
        Rgba::WHITE,
    )?;

    // Frame with a square pen, then grain over everything.
    r.set_pen(id, Pen::square(3));
    r.draw_rect(id, 1, 1, WIDTH as i32 - 2, HEIGHT as i32 - 2, Rgba::opaque(60, 50, 90));
    r.set_blend(id, BlendState::new(BlendMode::Alpha).with_noise(NoiseRange::uniform(8), Some(1)));
    r.draw_rect_filled(id, 0, 0, WIDTH as i32, HEIGHT as i32, Rgba::new(0, 0, 0, 24));

    // Scroll the whole scene up a little, as a text console would.
    r.shift_image_up(id, 4)?;

    r.set_image_dirty(id);
    r.run_microtasks();

    let frame = r
        .read_pixels_raw(id, PixelRect::new(0, 0, WIDTH as i32, HEIGHT as i32))?
        .context("surface has no pixels")?;
    r.destroy_surface(id);
    Ok(frame)
}
