//! Host simulation
//!
//! Plays the part of a game talking to its graphics driver: it creates a
//! device, a queue and a multisampled swapchain through the interception
//! layer on the null backend, renders a few frames, resizes the window once
//! and shuts down. Two sample add-ons are loaded so every frame exercises the
//! event registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use render_hook::backend::null::NullDriver;
use render_hook::foundation::logging;
use render_hook::prelude::*;
use render_hook::api::ChildKind;

const FRAME_COUNT: u64 = 120;
const RESIZE_FRAME: u64 = 60;
const WINDOW: WindowHandle = WindowHandle(0x0001_0042);

/// Host simulation errors
#[derive(thiserror::Error, Debug)]
enum HostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Add-on error: {0}")]
    Addon(#[from] AddonError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Swapchain error: {0}")]
    Swapchain(#[from] SwapchainError),

    #[error("Driver error: {0}")]
    Backend(#[from] BackendError),
}

/// Counts draws and clears, skipping empty draws
#[derive(Default)]
struct FrameStats {
    draws: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
    clears: Arc<AtomicU64>,
}

impl Addon for FrameStats {
    fn name(&self) -> &str {
        "frame_stats"
    }

    fn on_load(&mut self, scope: &mut AddonScope<'_>) {
        let draws = Arc::clone(&self.draws);
        let skipped = Arc::clone(&self.skipped);
        scope.register::<events::Draw>(Arc::new(
            move |_list: &CommandList, vertex_count: u32, instance_count: u32, _first_vertex: u32, _first_instance: u32| {
                if vertex_count == 0 || instance_count == 0 {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    return true;
                }
                draws.fetch_add(1, Ordering::Relaxed);
                false
            },
        ));

        let clears = Arc::clone(&self.clears);
        scope.register::<events::ClearRenderTargetView>(Arc::new(
            move |_list: &CommandList, _view: ResourceView, _color: &[f32; 4]| {
                clears.fetch_add(1, Ordering::Relaxed);
                false
            },
        ));

        let draws = Arc::clone(&self.draws);
        scope.register::<events::PresentEffectRuntime>(Arc::new(
            move |runtime: &EffectRuntime, _list: &mut CommandList| {
                if runtime.frame_count() % 30 == 0 {
                    log::info!(
                        "Frame {} ({}x{}): {} draws so far",
                        runtime.frame_count(),
                        runtime.width(),
                        runtime.height(),
                        draws.load(Ordering::Relaxed)
                    );
                }
            },
        ));
    }

    fn on_unload(&mut self) {
        log::info!(
            "frame_stats: {} draws, {} skipped, {} clears",
            self.draws.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.clears.load(Ordering::Relaxed)
        );
    }
}

/// Forces triple buffering and logs swapchain lifecycle events
struct SwapchainOverride {
    buffer_count: u32,
}

impl Addon for SwapchainOverride {
    fn name(&self) -> &str {
        "swapchain_override"
    }

    fn on_load(&mut self, scope: &mut AddonScope<'_>) {
        let buffer_count = self.buffer_count;
        scope.register::<events::CreateSwapchain>(Arc::new(move |desc: &mut SwapchainDesc| {
            if desc.buffer_count == buffer_count {
                return false;
            }
            log::info!("Forcing {} back buffers (host asked for {})", buffer_count, desc.buffer_count);
            desc.buffer_count = buffer_count;
            true
        }));
        scope.register::<events::InitSwapchain>(Arc::new(|swapchain: &Swapchain| {
            log::info!(
                "Swapchain ready: {}x{} {:?}, {} buffers",
                swapchain.width(),
                swapchain.height(),
                swapchain.format(),
                swapchain.back_buffer_count()
            );
        }));
        scope.register::<events::Resize>(Arc::new(|_swapchain: &Swapchain, width: u32, height: u32| {
            log::info!("Swapchain resizing to {}x{}", width, height);
        }));
    }
}

/// The host's own scene resources
struct Scene {
    color: Resource,
    color_view: ResourceView,
}

impl Scene {
    fn create(device: &Device, width: u32, height: u32) -> Result<Self, HostError> {
        let desc = ResourceDesc::texture_2d(
            width,
            height,
            Format::R8G8B8A8Unorm,
            1,
            ResourceUsage::RENDER_TARGET | ResourceUsage::SHADER_RESOURCE,
        );
        let color = device.on_create_resource(&desc, None, ResourceUsage::RENDER_TARGET)?;
        let color_view = device
            .on_create_resource_view(color, &ResourceViewDesc::texture_2d(Format::R8G8B8A8Unorm, false))?;
        Ok(Self { color, color_view })
    }

    fn record(&self, queue: &mut CommandQueue, frame: u64, width: u32, height: u32) {
        let Some(list) = queue.immediate_command_list_mut() else {
            log::warn!("Queue has no immediate command list");
            return;
        };

        #[allow(clippy::cast_precision_loss)]
        let shade = (frame % 60) as f32 / 60.0;
        list.bind_render_targets(&[self.color_view], ResourceView::NULL);
        list.bind_viewports(&[Viewport::full(width, height)]);
        list.clear_render_target_view(self.color_view, &[shade, 0.1, 0.2, 1.0]);
        list.draw(3, 1, 0, 0);
        list.draw(36, 4, 0, 0);
        // Culled object, nothing to draw
        list.draw(0, 1, 0, 0);
    }

    fn destroy(self, device: &Device) {
        device.on_destroy_resource_view(self.color_view);
        device.on_destroy_resource(self.color);
    }
}

fn run(config: LayerConfig) -> Result<(), HostError> {
    let mut addons = AddonManager::new();
    addons.load(Box::new(FrameStats::default()))?;
    addons.load(Box::new(SwapchainOverride { buffer_count: 3 }))?;
    log::info!("Loaded add-ons: {:?}", addons.loaded_names());

    let driver = NullDriver::new();
    let device = Device::new(driver.create_device(), config)?;
    let mut queue = CommandQueue::new(&device, driver.create_queue());

    let desc = SwapchainDesc {
        width: 1280,
        height: 720,
        format: Format::R8G8B8A8UnormSrgb,
        sample_count: 4,
        buffer_count: 2,
        usage: ResourceUsage::RENDER_TARGET,
        window: WINDOW,
        fullscreen: false,
        sync_interval: 1,
    };
    let mut swapchain = device.create_swapchain(&desc, |desc| driver.create_swapchain(desc))?;
    let mut scene = Scene::create(&device, swapchain.width(), swapchain.height())?;

    for frame in 0..FRAME_COUNT {
        if frame == RESIZE_FRAME {
            scene.destroy(&device);
            swapchain.resize_buffers(1920, 1080, WINDOW)?;
            scene = Scene::create(&device, swapchain.width(), swapchain.height())?;
        }

        scene.record(&mut queue, frame, swapchain.width(), swapchain.height());
        queue.present(&mut swapchain)?;
    }

    scene.destroy(&device);
    log::info!(
        "Rendered {} frames, {} commands reached the driver",
        swapchain.runtime().frame_count(),
        driver.commands().len()
    );

    drop(swapchain);
    drop(queue);
    log::debug!(
        "Live children at shutdown: {} swapchains, {} queues",
        device.live_children(ChildKind::Swapchain),
        device.live_children(ChildKind::CommandQueue)
    );
    drop(device);

    addons.unload_all();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "render_hook.toml".to_string());
    let config = LayerConfig::load_or_default(&path)?;

    logging::init_with_level(config.level_filter());
    log::info!("Starting host simulation with '{}'", path);

    if let Err(error) = run(config) {
        log::error!("Host simulation failed: {}", error);
        return Err(error.into());
    }

    log::info!("Host simulation finished");
    Ok(())
}
