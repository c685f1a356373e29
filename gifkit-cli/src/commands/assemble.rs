//! GIF assembly command.

use anyhow::Context;
use clap::{Args, ValueEnum};
use console::style;
use gifkit::{Bitmap, GifWriter, HsvDistanceMatcher, TableMode, WriterConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Where color tables are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableModeArg {
    /// Global table from the first frame.
    First,
    /// Global table from all frames.
    All,
    /// A local table per frame.
    Local,
}

impl From<TableModeArg> for TableMode {
    fn from(arg: TableModeArg) -> Self {
        match arg {
            TableModeArg::First => TableMode::GlobalFromFirst,
            TableModeArg::All => TableMode::GlobalFromAll,
            TableModeArg::Local => TableMode::Local,
        }
    }
}

/// Color matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatcherArg {
    /// Smallest summed RGB difference.
    Rgb,
    /// Weighted hue, saturation and value distance.
    Hsv,
}

/// Encode a sequence of images into a GIF animation.
#[derive(Args, Debug)]
pub struct CmdAssemble {
    /// Input images, one per frame, in order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output GIF file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Color table placement.
    #[arg(long, value_enum, default_value = "first")]
    pub table_mode: TableModeArg,

    /// Color matching strategy.
    #[arg(long, value_enum, default_value = "rgb")]
    pub matcher: MatcherArg,

    /// Delay between frames in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Loop count, 0 loops forever.
    #[arg(long = "loop")]
    pub loop_count: Option<u16>,

    /// Background color index.
    #[arg(long, default_value = "0")]
    pub background: u8,
}

impl CmdAssemble {
    fn config(&self) -> WriterConfig {
        let mut config = WriterConfig::default()
            .table_mode(self.table_mode.into())
            .background_color_index(self.background);
        if let Some(ms) = self.delay_ms {
            config = config.frame_delay(Duration::from_millis(ms));
        }
        if let Some(count) = self.loop_count {
            config = config.loop_count(count);
        }
        config
    }

    /// Execute the assemble command.
    pub fn run(&self) -> anyhow::Result<()> {
        for input in &self.inputs {
            if !input.exists() {
                anyhow::bail!("File not found: {}", input.display());
            }
        }

        let mut writer = GifWriter::create(&self.output, load_bitmap)
            .with_context(|| format!("creating {}", self.output.display()))?
            .with_config(self.config());
        if self.matcher == MatcherArg::Hsv {
            writer.set_color_matcher(HsvDistanceMatcher::new());
        }

        for (i, input) in self.inputs.iter().enumerate() {
            writer
                .write_frame(input)
                .with_context(|| format!("frame {} ({})", i, input.display()))?;
            info!(frame = i, input = %input.display(), "Added frame");
        }
        writer.finish().context("finishing output")?;

        println!(
            "{} {} frames to {}",
            style("Wrote").green().bold(),
            self.inputs.len(),
            self.output.display()
        );
        Ok(())
    }
}

/// Decode any image format the `image` crate understands into a bitmap.
fn load_bitmap(path: &PathBuf, dst: &mut Bitmap) -> gifkit::Result<()> {
    let image = image::open(path)
        .map_err(|e| gifkit::Error::invalid_param(format!("{}: {}", path.display(), e)))?
        .to_rgba8();
    *dst = Bitmap::from_rgba(image.width(), image.height(), image.as_raw())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        cmd: CmdAssemble,
    }

    #[test]
    fn test_parse_defaults() {
        let cli = TestCli::parse_from(["test", "a.png", "b.png", "-o", "out.gif"]);
        assert_eq!(cli.cmd.inputs.len(), 2);
        assert_eq!(cli.cmd.table_mode, TableModeArg::First);
        assert_eq!(cli.cmd.matcher, MatcherArg::Rgb);

        let config = cli.cmd.config();
        assert_eq!(config.table_mode, TableMode::GlobalFromFirst);
        assert_eq!(config.frame_delay, None);
        assert_eq!(config.loop_count, None);
    }

    #[test]
    fn test_parse_options() {
        let cli = TestCli::parse_from([
            "test", "a.png", "-o", "out.gif", "--table-mode", "local", "--matcher", "hsv",
            "--delay-ms", "80", "--loop", "0", "--background", "3",
        ]);
        let config = cli.cmd.config();
        assert_eq!(config.table_mode, TableMode::Local);
        assert_eq!(config.frame_delay, Some(Duration::from_millis(80)));
        assert_eq!(config.loop_count, Some(0));
        assert_eq!(config.background_color_index, 3);
        assert_eq!(cli.cmd.matcher, MatcherArg::Hsv);
    }

    #[test]
    fn test_load_bitmap_missing_file() {
        let mut bitmap = Bitmap::default();
        let err = load_bitmap(&PathBuf::from("/nonexistent/gifkit.png"), &mut bitmap).unwrap_err();
        assert!(err.to_string().contains("gifkit.png"));
    }
}
