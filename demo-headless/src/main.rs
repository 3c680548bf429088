use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use ripple_core::{
    Backend, DeviceProfile, GridSize, PointerEvent, PointerKind, Raster, ReferenceSource,
    RippleConfig, RippleError, Scheduler, Vec2, Viewport, ViewportMapping,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Headless ripple demo: drives a scripted pointer over an image and saves the last frame
#[derive(Parser, Debug)]
#[command(name = "ripple-demo")]
#[command(about = "Pointer-reactive water ripples over an image", long_about = None)]
struct Args {
    /// Reference image (a procedural pattern is used when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the final frame
    #[arg(short, long, default_value = "ripple.png")]
    output: PathBuf,

    /// Viewport width in CSS pixels
    #[arg(short, long, default_value_t = 640.0)]
    width: f32,

    /// Device pixels per CSS pixel
    #[arg(long, default_value_t = 1.0)]
    density: f32,

    /// Number of display frames to simulate
    #[arg(short, long, default_value_t = 180)]
    frames: u32,

    /// Device profile the tunings are taken from
    #[arg(long, value_enum, default_value_t = ProfileArg::Desktop)]
    profile: ProfileArg,

    /// Integrator backend
    #[arg(short, long, value_enum, default_value_t = BackendArg::Auto)]
    backend: BackendArg,

    /// Seed for ambient ripples
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    Desktop,
    Mobile,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Scalar,
    Pressure,
    Gpu,
}

impl From<ProfileArg> for DeviceProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Desktop => DeviceProfile::Desktop,
            ProfileArg::Mobile => DeviceProfile::Mobile,
        }
    }
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Scalar => Backend::Scalar,
            BackendArg::Pressure => Backend::PressureReference,
            BackendArg::Gpu => Backend::Gpu,
        }
    }
}

/// Decoded image rescaled with a triangle filter on every rebuild
struct ImageReference {
    image: RgbaImage,
}

impl ReferenceSource for ImageReference {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn raster_for(&self, size: GridSize) -> Result<Raster, RippleError> {
        let resized = imageops::resize(&self.image, size.width(), size.height(), FilterType::Triangle);
        Raster::from_rgba(size, resized.into_raw())
    }
}

/// Concentric bands with a diagonal tint, 16:10
fn procedural_image() -> RgbaImage {
    let (width, height) = (480, 300);
    RgbaImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - width as f32 / 2.0;
        let dy = y as f32 - height as f32 / 2.0;
        let band = ((dx * dx + dy * dy).sqrt() / 12.0).sin() * 0.5 + 0.5;
        let tint = (x + y) as f32 / (width + height) as f32;
        image::Rgba([
            (40.0 + 120.0 * tint) as u8,
            (90.0 + 100.0 * band) as u8,
            (150.0 + 90.0 * band) as u8,
            255,
        ])
    })
}

fn load_reference(input: Option<&Path>) -> Result<ImageReference> {
    let image = match input {
        Some(path) => image::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .to_rgba8(),
        None => procedural_image(),
    };
    Ok(ImageReference { image })
}

fn mouse(position: Vec2, buttons: u32) -> PointerEvent {
    PointerEvent {
        id: 1,
        position,
        kind: PointerKind::Mouse,
        is_primary: true,
        buttons,
    }
}

/// Feed the scripted pointer path for `frame`
///
/// Hover across the top third, press and drag a loop through the middle,
/// release, then rest so the idle echo and ambient ripples take over.
fn drive_pointer(scheduler: &mut Scheduler, mapping: &ViewportMapping, frame: u32, now: Duration) {
    let viewport = mapping.viewport_size;
    let t = frame as f32;
    match frame {
        0..=39 => {
            let client = Vec2::new(viewport.x * t / 40.0, viewport.y * 0.3);
            scheduler.on_pointer_move(&mouse(mapping.to_field(client), 0), now);
        }
        40 => {
            let client = Vec2::new(viewport.x * 0.5, viewport.y * 0.5);
            scheduler.on_pointer_down(&mouse(mapping.to_field(client), 1), now);
        }
        41..=99 => {
            let angle = (t - 40.0) / 60.0 * std::f32::consts::TAU;
            let client = Vec2::new(
                viewport.x * (0.5 + 0.25 * angle.cos()),
                viewport.y * (0.5 + 0.25 * angle.sin()),
            );
            scheduler.on_pointer_move(&mouse(mapping.to_field(client), 1), now);
        }
        100 => scheduler.on_pointer_up(1),
        _ => {}
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = RippleConfig::for_profile(args.profile.into()).with_backend(args.backend.into());
    config.seed = args.seed;

    let reference = load_reference(args.input.as_deref())?;
    let (image_w, image_h) = reference.dimensions();
    let aspect = reference.aspect_ratio();
    if aspect <= 0.0 {
        return Err(anyhow!("reference image has no area"));
    }
    let viewport = Viewport::new(args.width, args.width / aspect, args.density);
    info!(
        "Reference {}x{}, viewport {}x{} @ {}x",
        image_w, image_h, viewport.width, viewport.height, args.density
    );

    let mut scheduler = Scheduler::new(config);
    scheduler.begin_loading();
    scheduler
        .on_reference_loaded(reference, viewport, Duration::ZERO)
        .context("failed to build the ripple field")?;

    let size = scheduler
        .grid_size()
        .ok_or_else(|| anyhow!("scheduler has no field"))?;
    let backend = scheduler.field().map_or("none", |field| field.name());
    let mapping = ViewportMapping::new(
        Vec2::zeros(),
        Vec2::new(viewport.width, viewport.height),
        size,
    );

    let frame_interval = Duration::from_micros(16_667);
    let mut last = None;
    for frame in 0..args.frames {
        let now = frame_interval * frame;
        drive_pointer(&mut scheduler, &mapping, frame, now);
        last = scheduler.tick(now).cloned();
    }

    let timer = scheduler.frame_timer();
    info!(
        "{} backend, average {:.3} ms over the last {} frames, last {:.3} ms",
        backend,
        timer.average_frame_time_ms(),
        timer.frame_count(),
        timer.last_frame_time_ms()
    );

    let Some(frame) = last else {
        warn!("No frame was produced");
        return Ok(());
    };
    let image = RgbaImage::from_raw(size.width(), size.height(), frame.into_bytes())
        .ok_or_else(|| anyhow!("frame does not match {}x{}", size.width(), size.height()))?;
    image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("Saved {}", args.output.display());

    Ok(())
}
