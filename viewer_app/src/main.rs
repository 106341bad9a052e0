//! Mesh viewer application
//!
//! Usage: `mesh_viewer [--config FILE] [--frames N] [--headless] [MODEL.obj]`
//!
//! Opens a window, frames the model and spins it until the window closes or
//! `--frames` frames have been drawn. `--headless` runs the same loop against
//! the recording backend, which needs no GPU.

use mesh_viewer::config::{Config, ConfigError, ViewerConfig};
use mesh_viewer::foundation::logging;
use mesh_viewer::foundation::time::Timer;
use mesh_viewer::render::{FrameRenderer, FrameStatus, RecordingBackend, RenderBackend, RenderError};
use mesh_viewer::render::vulkan::VulkanBackend;
use mesh_viewer::scene::{Scene, SceneError};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Error, Debug)]
enum AppError {
    #[error("{0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    model: Option<PathBuf>,
    frames: Option<u64>,
    headless: bool,
}

impl Args {
    fn parse() -> Result<Self, AppError> {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    let path = iter.next().ok_or_else(|| AppError::Usage("--config needs a path".to_string()))?;
                    args.config = Some(PathBuf::from(path));
                }
                "--frames" => {
                    let count = iter
                        .next()
                        .and_then(|value| value.parse().ok())
                        .ok_or_else(|| AppError::Usage("--frames needs a number".to_string()))?;
                    args.frames = Some(count);
                }
                "--headless" => args.headless = true,
                other if other.starts_with("--") => {
                    return Err(AppError::Usage(format!("unknown option {}", other)));
                }
                model => args.model = Some(PathBuf::from(model)),
            }
        }
        Ok(args)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse()?;

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load_from_file(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(model) = args.model.clone() {
        config = config.with_model_path(model);
    }

    logging::init_with_level(&config.engine.log_level);
    config.validate()?;

    if args.headless {
        let mut backend = RecordingBackend::new(config.window.width, config.window.height);
        run_loop(&config, &mut backend, args.frames.or(Some(1)), |_| false)?;
        log::info!("Headless run recorded {} calls", backend.calls().len());
        return Ok(());
    }

    let mut backend = VulkanBackend::new(&config)?;
    run_loop(&config, &mut backend, args.frames, |backend| {
        backend.poll_events();
        backend.should_close()
    })
}

fn run_loop<B, F>(config: &ViewerConfig, backend: &mut B, frame_limit: Option<u64>, mut should_close: F) -> Result<(), AppError>
where
    B: RenderBackend,
    F: FnMut(&mut B) -> bool,
{
    let scene = Scene::load(config, backend)?;

    let (width, height) = backend.display_size();
    let aspect = width as f32 / height.max(1) as f32;
    let mut renderer = FrameRenderer::new(&scene.camera, &config.camera, &config.lighting, aspect);

    let mut timer = Timer::new();
    while !should_close(backend) {
        if frame_limit.is_some_and(|limit| renderer.frames_rendered() >= limit) {
            break;
        }
        timer.update();
        if renderer.render_frame(backend, &scene.parts, timer.total_time())? == FrameStatus::Skipped {
            log::trace!("Frame skipped");
        }
    }

    log::info!(
        "Rendered {} frames, {:.1} fps average",
        renderer.frames_rendered(),
        timer.average_fps()
    );
    Ok(())
}
