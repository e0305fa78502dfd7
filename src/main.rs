use std::path::PathBuf;

use air_canvas::{
    app::AirDrawingApp,
    config::{Config, HandConfig},
};
use anyhow::Result;
use clap::Parser;

#[derive(Parser)]
#[command(name = "air-canvas")]
#[command(about = "Draw in the air with your index finger and search for what you wrote")]
struct Args {
    /// Canvas and window width
    #[arg(long, default_value_t = 1280)]
    width: i32,

    /// Canvas and window height
    #[arg(long, default_value_t = 720)]
    height: i32,

    /// Webcam index
    #[arg(long, default_value_t = 0)]
    camera: u32,

    /// Directory with the models, sketch classes and dictionary
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,

    /// Maximum number of hands to track
    #[arg(long, default_value_t = 1)]
    max_hands: usize,

    /// Minimum palm detection confidence
    #[arg(long, default_value_t = 0.8)]
    detection_confidence: f32,

    /// Minimum landmark presence to keep tracking a hand
    #[arg(long, default_value_t = 0.8)]
    tracking_confidence: f32,

    /// Weight of the newest fingertip position when smoothing
    #[arg(long, default_value_t = 0.65)]
    smoothing: f64,

    /// Base URL of the web search
    #[arg(long, default_value = "https://www.google.com/search")]
    search_url: String,

    /// Title of the window
    #[arg(long, default_value = "Air Drawing Search Pro")]
    window_title: String,

    /// Start in fullscreen
    #[arg(long)]
    fullscreen: bool,

    /// Run the models on the CPU even if CUDA is available
    #[arg(long)]
    cpu: bool,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            width: args.width,
            height: args.height,
            camera_index: args.camera,
            models_dir: args.models_dir,
            window_title: args.window_title,
            fullscreen: args.fullscreen,
            force_cpu: args.cpu,
            search_url: args.search_url,
            hands: HandConfig {
                max_hands: args.max_hands,
                detection_confidence: args.detection_confidence,
                tracking_confidence: args.tracking_confidence,
                smoothing: args.smoothing,
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let config = Config::from(args);
    log::info!(
        "Starting at {}x{} with models from {}",
        config.width,
        config.height,
        config.models_dir.display()
    );

    let mut app = AirDrawingApp::new(config)?;
    app.run()?;
    Ok(())
}
