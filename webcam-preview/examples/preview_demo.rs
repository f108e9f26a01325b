//! Drives a preview with a synthetic test-pattern camera and reports how many
//! frames reached an in-memory surface.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

use clap::Parser;
use webcam_preview::{
    BindError, FrameSource, Image, MemorySurface, PreviewConfig, ServiceBinder,
    ServiceConnection, Size, WebcamPreview, IMG_HEIGHT, IMG_WIDTH,
};

#[derive(Parser)]
pub struct Opts {
    /// Window width.
    #[clap(long, default_value = "800")]
    pub width: u32,
    /// Window height.
    #[clap(long, default_value = "480")]
    pub height: u32,
    /// How long to run, in milliseconds.
    #[clap(long, default_value = "1000")]
    pub duration_ms: u64,
    /// Simulate a service disconnect halfway through.
    #[clap(long)]
    pub flap: bool,
    /// Preview config as JSON.
    #[clap(long)]
    pub config: Option<String>,
}

/// Moving gradient, one step per call.
struct TestPattern {
    tick: AtomicU32,
}
impl FrameSource for TestPattern {
    fn current_image(&self) -> Image {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        let mut data = Vec::with_capacity((IMG_WIDTH * IMG_HEIGHT * 4) as usize);
        for y in 0..IMG_HEIGHT {
            for x in 0..IMG_WIDTH {
                data.extend_from_slice(&[
                    x.wrapping_add(tick) as u8,
                    y.wrapping_add(tick) as u8,
                    tick as u8,
                    255,
                ]);
            }
        }
        // sized to match, cannot fail
        Image::new(IMG_WIDTH, IMG_HEIGHT, data).unwrap()
    }
}

/// Binds immediately from a helper thread, the way a platform service would
/// call back.
#[derive(Default)]
struct LocalBinder {
    connection: Mutex<Option<ServiceConnection>>,
}
impl ServiceBinder for LocalBinder {
    fn bind(&self, connection: ServiceConnection) -> Result<(), BindError> {
        *self.connection.lock().unwrap() = Some(connection.clone());
        thread::spawn(move || {
            connection.on_service_connected(Arc::new(TestPattern {
                tick: AtomicU32::new(0),
            }));
        });
        Ok(())
    }
    fn unbind(&self) {
        println!("unbound");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let opts: Opts = Opts::parse();
    let config = match &opts.config {
        Some(json) => PreviewConfig::from_json(json)?,
        None => PreviewConfig::default(),
    };

    let window = Size::new(opts.width, opts.height);
    let surface = Arc::new(MemorySurface::new(window)?);
    let binder = Arc::new(LocalBinder::default());
    let preview = WebcamPreview::new(surface.clone(), binder.clone(), window, config)?;
    println!("drawing into {:?}", preview.rect());

    preview.surface_created()?;
    let half = Duration::from_millis(opts.duration_ms / 2);
    thread::sleep(half);
    if opts.flap {
        if let Some(connection) = binder.connection.lock().unwrap().clone() {
            connection.on_service_disconnected();
            println!("disconnected at {} frames", surface.frames_posted());
            thread::sleep(Duration::from_millis(50));
            connection.on_service_connected(Arc::new(TestPattern {
                tick: AtomicU32::new(0),
            }));
        }
    }
    thread::sleep(half);
    preview.surface_destroyed();

    let last = surface.snapshot();
    let checksum = last
        .data()
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_mul(31).wrapping_add(b as u64));
    println!(
        "{} frames posted, {} canvases refused, last {:?} frame checksum {:016x}",
        surface.frames_posted(),
        surface.canvases_refused(),
        surface.size(),
        checksum
    );
    Ok(())
}
