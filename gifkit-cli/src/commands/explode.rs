//! Frame extraction command.

use anyhow::Context;
use clap::Args;
use console::style;
use gifkit::{Bitmap, Frame, FrameSink};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decode every frame of a GIF into numbered PNG files.
#[derive(Args, Debug)]
pub struct CmdExplode {
    /// Path to the GIF file.
    pub file: PathBuf,

    /// Output directory, created if missing.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// File name prefix for the frames.
    #[arg(long, default_value = "frame")]
    pub prefix: String,
}

/// Writes each frame as soon as the reader delivers it.
struct PngSink<'a> {
    dir: &'a Path,
    prefix: &'a str,
    written: Vec<PathBuf>,
    error: Option<anyhow::Error>,
}

impl PngSink<'_> {
    fn save(&self, bitmap: &Bitmap) -> anyhow::Result<PathBuf> {
        let path = frame_path(self.dir, self.prefix, self.written.len());
        let image = image::RgbaImage::from_raw(bitmap.width(), bitmap.height(), bitmap.to_rgba())
            .context("frame buffer does not match its dimensions")?;
        image
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

impl FrameSink for PngSink<'_> {
    fn add_frame(&mut self, frame: Frame) {
        if self.error.is_some() {
            return;
        }
        match self.save(&frame.bitmap) {
            Ok(path) => {
                debug!(
                    path = %path.display(),
                    delay_ms = frame.delay.as_millis() as u64,
                    "Wrote frame"
                );
                self.written.push(path);
            }
            Err(e) => self.error = Some(e),
        }
    }
}

fn frame_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{}_{:03}.png", prefix, index))
}

impl CmdExplode {
    /// Execute the explode command.
    pub fn run(&self) -> anyhow::Result<()> {
        if !self.file.exists() {
            anyhow::bail!("File not found: {}", self.file.display());
        }
        std::fs::create_dir_all(&self.output)
            .with_context(|| format!("creating {}", self.output.display()))?;

        let data = std::fs::read(&self.file)
            .with_context(|| format!("reading {}", self.file.display()))?;

        let mut sink = PngSink {
            dir: &self.output,
            prefix: &self.prefix,
            written: Vec::new(),
            error: None,
        };
        let decoded = gifkit::decode(&data, &mut sink);
        if let Some(e) = sink.error {
            return Err(e);
        }
        let info = decoded.with_context(|| format!("decoding {}", self.file.display()))?;

        println!(
            "{} {} frames ({}x{}) to {}",
            style("Wrote").green().bold(),
            sink.written.len(),
            info.width,
            info.height,
            self.output.display()
        );
        Ok(())
    }
}
