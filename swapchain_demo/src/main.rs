//! Headless swapchain demo
//!
//! Drives one swapchain per graphics API through a few frames of the
//! acquire/wait/release protocol against the in-memory compositor, then
//! tears everything down.
//!
//! Usage: `swapchain_demo [config.toml|config.ron] [frames]`

use std::sync::Arc;
use thiserror::Error;
use xr_runtime::compositor::headless::{
    DXGI_FORMAT_R8G8B8A8_UNORM_SRGB, GL_SRGB8_ALPHA8, VK_FORMAT_R8G8B8A8_SRGB,
};
use xr_runtime::config::ConfigError;
use xr_runtime::foundation::logging;
use xr_runtime::prelude::*;

// Configuration constants
const DEFAULT_FRAMES: u32 = 6;
const EYE_WIDTH: u32 = 1440;
const EYE_HEIGHT: u32 = 1600;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] XrError),

    #[error("Invalid frame count: {0}")]
    FrameCount(String),
}

fn main() {
    if let Err(err) = run() {
        log::error!("{}", err);
        eprintln!("swapchain_demo: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RuntimeConfig::load_from_file(&path)?,
        None => RuntimeConfig::default(),
    };
    let frames = match args.next() {
        Some(raw) => raw.parse().map_err(|_| DemoError::FrameCount(raw))?,
        None => DEFAULT_FRAMES,
    };

    logging::init_with_filter(&config.log_filter);
    log::info!("Starting swapchain demo ({} frames per swapchain)", frames);

    let compositor = Arc::new(HeadlessCompositor::new());
    let swapchains = SwapchainManager::new(config.swapchain.clone());

    let apis = [
        (GraphicsApi::Vulkan, VK_FORMAT_R8G8B8A8_SRGB),
        (GraphicsApi::D3D12, DXGI_FORMAT_R8G8B8A8_UNORM_SRGB),
        (GraphicsApi::OpenGl, GL_SRGB8_ALPHA8),
    ];

    let mut handles = Vec::new();
    for (api, format) in apis {
        let binding = GraphicsBinding::new(api, compositor.clone());
        let info = SwapchainCreateInfo::new(format, EYE_WIDTH, EYE_HEIGHT);
        let handle = swapchains.create(&info, &binding)?;

        let count = swapchains.enumerate_images(handle, &mut [])?;
        let mut images = vec![SwapchainImage::default(); count as usize];
        swapchains.enumerate_images(handle, &mut images)?;
        for (index, image) in images.iter().enumerate() {
            log::info!("{} swapchain {} image {}: {:?}", api, handle, index, image);
        }

        run_frames(&swapchains, handle, frames, &config)?;
        handles.push(handle);
    }

    // Leave the last swapchain to the bulk teardown path
    if let Some((&last, rest)) = handles.split_last() {
        for &handle in rest {
            swapchains.destroy(handle)?;
        }
        log::info!("Leaving swapchain {} for session teardown", last);
    }
    let torn_down = swapchains.destroy_all();

    log::info!(
        "Demo complete: {} native swapchains created, {} still live, {} torn down at exit",
        compositor.swapchains_created(),
        compositor.live_swapchains(),
        torn_down
    );
    Ok(())
}

fn run_frames(
    swapchains: &SwapchainManager,
    handle: Handle,
    frames: u32,
    config: &RuntimeConfig,
) -> Result<(), DemoError> {
    for frame in 0..frames {
        let index = swapchains.acquire(handle)?;
        match swapchains.wait(handle, config.default_wait_timeout()) {
            Ok(_) => log::debug!("Frame {}: rendering into image {}", frame, index),
            // Skip the frame; the image goes back unused
            Err(XrError::Timeout(_)) => log::warn!("Frame {}: image {} not ready", frame, index),
            Err(err) => return Err(err.into()),
        }
        swapchains.release(handle)?;
    }
    Ok(())
}
