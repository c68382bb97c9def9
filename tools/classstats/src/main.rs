/// Per-class streaming statistics tool: cross-tabulates one raster band
/// against a co-registered class-label raster and prints count, mean and
/// unbiased standard deviation per class.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use tiff::decoder::DecodingResult;

use agrisense_core::classstats::stream_class_stats;
use agrisense_core::confusion::format_metric;
use agrisense_core::{LabelField, StreamingConfig, ValueField};

#[derive(Parser, Debug)]
#[command(
    name = "classstats",
    about = "Per-class pixel statistics of a raster band under a class-label mask"
)]
struct Args {
    /// Input raster band (TIFF; float or integer samples).
    #[arg(short, long)]
    image: PathBuf,

    /// Class-label raster (integer TIFF) on the same pixel grid.
    #[arg(short, long)]
    labels: PathBuf,

    /// Label of the NoData class.
    #[arg(long, default_value_t = 0)]
    nodata: i32,

    /// Available memory for region buffers, in MB.
    #[arg(long, default_value_t = 256)]
    ram: usize,

    /// Optional JSON export path.
    #[arg(long)]
    json: Option<PathBuf>,
}

fn decode(path: &Path) -> Result<(usize, usize, DecodingResult)> {
    let file =
        fs::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut decoder = tiff::decoder::Decoder::new(io::BufReader::new(file))
        .with_context(|| format!("Cannot parse {} as TIFF", path.display()))?;
    let (width, height) = decoder
        .dimensions()
        .with_context(|| format!("Missing dimensions in {}", path.display()))?;
    let image = decoder
        .read_image()
        .with_context(|| format!("Cannot decode {}", path.display()))?;
    Ok((width as usize, height as usize, image))
}

fn read_value_tiff(path: &Path) -> Result<ValueField> {
    let (width, height, image) = decode(path)?;
    let data: Vec<f32> = match image {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        _ => bail!("{} has an unsupported sample format", path.display()),
    };
    ensure!(
        data.len() == width * height,
        "{} decoded to {} samples, expected {}x{}",
        path.display(),
        data.len(),
        width,
        height
    );
    Ok(ValueField::from_data(width, height, data))
}

fn read_label_tiff(path: &Path) -> Result<LabelField> {
    let (width, height, image) = decode(path)?;
    let data: Vec<i32> = match image {
        DecodingResult::U8(v) => v.into_iter().map(i32::from).collect(),
        DecodingResult::I8(v) => v.into_iter().map(i32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(i32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(i32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as i32).collect(),
        DecodingResult::I32(v) => v,
        _ => bail!("{} must carry integer class labels", path.display()),
    };
    ensure!(
        data.len() == width * height,
        "{} decoded to {} samples, expected {}x{}",
        path.display(),
        data.len(),
        width,
        height
    );
    Ok(LabelField::from_data(width, height, data))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let values = read_value_tiff(&args.image)?;
    let labels = read_label_tiff(&args.labels)?;

    let config = StreamingConfig {
        ram_budget_mb: args.ram,
        ..StreamingConfig::default()
    };
    let stats = stream_class_stats(&values, &labels, &config, args.nodata)
        .context("Per-class statistics failed")?;

    println!("{:>8} {:>12} {:>16} {:>16}", "Class", "Count", "Mean", "StdDev");
    for (label, class) in &stats {
        println!(
            "{:>8} {:>12} {:>16} {:>16}",
            format!("[{label}]"),
            class.count,
            format_metric(class.mean),
            format_metric(class.std_dev)
        );
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&stats)?;
        fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
