//! CLI `model` commands: fetch the weights and report readiness.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use super::App;

/// Resolution of download progress bars.
const PROGRESS_STEPS: u64 = 1000;

pub fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(PROGRESS_STEPS);
    if let Ok(style) = ProgressStyle::default_bar().template("  {bar:40.cyan/blue} {percent}% ({eta})")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

pub fn set_progress(pb: &ProgressBar, fraction: f32) {
    pb.set_position((fraction.clamp(0.0, 1.0) * PROGRESS_STEPS as f32) as u64);
}

/// Download the model weights to the configured cache directory.
pub async fn download(app: &App) -> Result<()> {
    let models = app.generator.models();
    let weights = app.config.model.weights_path();

    if models.is_downloaded().await? {
        println!("Model already exists at {}", weights.display());
        return Ok(());
    }

    println!("Downloading {}...", app.config.model.weights_file_name());
    let pb = progress_bar();
    let result = models.download(|fraction| set_progress(&pb, fraction)).await;
    pb.finish_and_clear();
    result?;

    println!("Model saved to {}", weights.display());
    Ok(())
}

/// Report whether the weights are present and the model server answers.
pub async fn status(app: &App) -> Result<()> {
    let models = app.generator.models();
    let model = &app.config.model;

    println!("Model: {}", model.name);
    println!("{}", "=".repeat(40));
    println!("  Weights:    {}", model.weights_path().display());
    println!("  Endpoint:   {}", model.endpoint);

    if !models.is_downloaded().await? {
        println!("  Status:     not downloaded (run `tulip model download`)");
        return Ok(());
    }

    match models.ensure_ready().await {
        Ok(()) => println!("  Status:     ready"),
        Err(e) => println!("  Status:     downloaded, server unavailable ({e:#})"),
    }
    Ok(())
}
