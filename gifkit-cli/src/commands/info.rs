//! GIF inspection command.

use anyhow::Context;
use clap::Args;
use console::style;
use gifkit::{decode, FrameList, GifInfo};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// File summary for display.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    /// File path.
    pub file: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Header version, e.g. `GIF89a`.
    pub version: String,
    /// Logical screen width.
    pub width: u16,
    /// Logical screen height.
    pub height: u16,
    /// Background color index.
    pub background_color_index: u8,
    /// Global color table entries.
    pub global_color_table_len: usize,
    /// Number of frames.
    pub frame_count: usize,
    /// Sum of all frame delays in milliseconds.
    pub total_delay_ms: u128,
    /// NETSCAPE2.0 loop count, 0 meaning forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_count: Option<u16>,
    /// Per-frame delays in milliseconds.
    pub frame_delays_ms: Vec<u128>,
}

impl FileInfo {
    fn new(file: &Path, size_bytes: u64, info: &GifInfo, delays: Vec<u128>) -> Self {
        Self {
            file: file.display().to_string(),
            size_bytes,
            version: info.version.to_string(),
            width: info.width,
            height: info.height,
            background_color_index: info.background_color_index,
            global_color_table_len: info.global_color_table_len,
            frame_count: info.frame_count,
            total_delay_ms: info.total_delay.as_millis(),
            loop_count: info.loop_count,
            frame_delays_ms: delays,
        }
    }
}

/// Inspect a GIF file.
#[derive(Args, Debug)]
pub struct CmdInfo {
    /// Path to the GIF file.
    pub file: PathBuf,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,
}

impl CmdInfo {
    /// Execute the info command.
    pub fn run(&self) -> anyhow::Result<()> {
        if !self.file.exists() {
            anyhow::bail!("File not found: {}", self.file.display());
        }

        let data = std::fs::read(&self.file)
            .with_context(|| format!("reading {}", self.file.display()))?;

        // Only delays are kept; the pixels are dropped as frames arrive.
        let mut frames = FrameList::new(|_| ());
        let info = decode(&data, &mut frames)
            .with_context(|| format!("decoding {}", self.file.display()))?;
        let delays = frames.iter().map(|(_, delay)| delay.as_millis()).collect();

        let file_info = FileInfo::new(&self.file, data.len() as u64, &info, delays);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&file_info)?);
        } else {
            print_file_info(&file_info);
        }

        Ok(())
    }
}

fn print_file_info(info: &FileInfo) {
    println!();
    println!("{}", style("File Information").cyan().bold());
    println!("  {} {}", style("Path:").dim(), info.file);
    println!("  {} {} bytes", style("Size:").dim(), info.size_bytes);
    println!("  {} {}", style("Version:").dim(), info.version);
    println!("  {} {}x{}", style("Screen:").dim(), info.width, info.height);
    println!(
        "  {} {}",
        style("Global table:").dim(),
        if info.global_color_table_len > 0 {
            format!("{} colors", info.global_color_table_len)
        } else {
            "none".to_string()
        }
    );
    println!("  {} {}", style("Background:").dim(), info.background_color_index);

    println!();
    println!("{}", style("Animation").cyan().bold());
    println!("  {} {}", style("Frames:").dim(), info.frame_count);
    println!("  {} {} ms", style("Duration:").dim(), info.total_delay_ms);
    match info.loop_count {
        Some(0) => println!("  {} forever", style("Loop:").dim()),
        Some(n) => println!("  {} {} times", style("Loop:").dim(), n),
        None => println!("  {} not set", style("Loop:").dim()),
    }

    if !info.frame_delays_ms.is_empty() {
        println!();
        println!("{}", style("Frames").cyan().bold());
        for (i, delay) in info.frame_delays_ms.iter().enumerate() {
            println!("  {} {:>4}  {} ms", style("#").dim(), i, delay);
        }
    }
    println!();
}
