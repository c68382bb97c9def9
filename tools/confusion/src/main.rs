/// Confusion-matrix application: streams one or more classification
/// rasters against reference label rasters, logs the aligned diagnostic
/// matrix with per-class and global accuracy measures, and writes the raw
/// counts to a CSV file whose two comment headers declare the row/column
/// label order.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use clap::{Parser, ValueEnum};
use tiff::decoder::DecodingResult;

use agrisense_core::confusion::{format_metric, measure, render_matrix, write_csv};
use agrisense_core::streaming::{plan_regions, stream_pairs};
use agrisense_core::{ConfusionAccumulator, LabelField, MeasureError, StreamingConfig};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GroundTruthMode {
    /// Reference labels come from raster images.
    Raster,
    /// Reference labels come from a vector layer (requires external
    /// rasterization; not handled by this tool).
    Vector,
}

#[derive(Parser, Debug)]
#[command(
    name = "confusion",
    about = "Compute the confusion matrix of classification rasters against ground truth"
)]
struct Args {
    /// Input classification rasters (integer label TIFFs).
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Ground truth format.
    #[arg(long, value_enum, default_value_t = GroundTruthMode::Raster)]
    ground_truth: GroundTruthMode,

    /// Reference label rasters: either one shared by all inputs, or one
    /// per input in the same order.
    #[arg(short, long, num_args = 1..)]
    reference: Vec<PathBuf>,

    /// Attribute field holding the label when the ground truth is a
    /// vector layer.
    #[arg(long, default_value = "Class")]
    field: String,

    /// Label of the NoData class: pixels carrying it on either raster are
    /// discarded.
    #[arg(long, default_value_t = 0)]
    nodata: i32,

    /// Available memory for region buffers, in MB.
    #[arg(long, default_value_t = 256)]
    ram: usize,

    /// Empirical inflation factor applied to the raw buffer size.
    #[arg(long, default_value_t = 2.0)]
    ram_bias: f64,

    /// Output CSV path for the raw confusion counts.
    #[arg(short, long, default_value = "confusion_matrix.csv")]
    out: PathBuf,

    /// Optional JSON export of the per-class and global measures.
    #[arg(long)]
    metrics_json: Option<PathBuf>,
}

// ── TIFF input ───────────────────────────────────────────────────────────────

/// Decode an integer label raster into a LabelField.
fn read_label_tiff(path: &Path) -> Result<LabelField> {
    let file =
        fs::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut decoder = tiff::decoder::Decoder::new(io::BufReader::new(file))
        .with_context(|| format!("Cannot parse {} as TIFF", path.display()))?;
    let (width, height) = decoder
        .dimensions()
        .with_context(|| format!("Missing dimensions in {}", path.display()))?;

    let data: Vec<i32> = match decoder
        .read_image()
        .with_context(|| format!("Cannot decode {}", path.display()))?
    {
        DecodingResult::U8(v) => v.into_iter().map(i32::from).collect(),
        DecodingResult::I8(v) => v.into_iter().map(i32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(i32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(i32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as i32).collect(),
        DecodingResult::I32(v) => v,
        DecodingResult::U64(v) => v.into_iter().map(|s| s as i32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as i32).collect(),
        _ => bail!(
            "{} has a floating-point sample format; label rasters must be integer",
            path.display()
        ),
    };

    let (width, height) = (width as usize, height as usize);
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

/// Pick the reference raster path for input `index`.
fn reference_path(references: &[PathBuf], index: usize) -> &PathBuf {
    if references.len() == 1 {
        &references[0]
    } else {
        &references[index]
    }
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    if args.ground_truth == GroundTruthMode::Vector {
        bail!(
            "vector ground truth (field '{}') must be rasterized onto each input's grid \
             by an external tool first; pass the result via --reference",
            args.field
        );
    }
    ensure!(
        args.reference.len() == 1 || args.reference.len() == args.input.len(),
        "expected 1 reference raster or {} (one per input), got {}",
        args.input.len(),
        args.reference.len()
    );

    let config = StreamingConfig {
        ram_budget_mb: args.ram,
        ram_bias: args.ram_bias,
    };
    let mut accumulator = ConfusionAccumulator::new(args.nodata);

    for (index, input) in args.input.iter().enumerate() {
        println!("Processing image: {}", input.display());
        let produced = read_label_tiff(input)?;

        let ref_path = reference_path(&args.reference, index);
        if !ref_path.is_file() {
            return Err(MeasureError::MissingReference(input.display().to_string()).into());
        }
        let reference = read_label_tiff(ref_path)
            .with_context(|| format!("No usable reference raster for {}", input.display()))?;

        let divisions = plan_regions(
            produced.width,
            produced.height,
            2 * std::mem::size_of::<i32>(),
            &config,
        )
        .len();
        println!("Number of stream divisions: {divisions}");

        let added = stream_pairs(&produced, &reference, &config, &mut accumulator)
            .with_context(|| format!("Streaming failed for {}", input.display()))?;
        println!("Accumulated {added} label pairs");
    }

    let tally = accumulator.freeze();
    println!(
        "Reference class labels ordered according to the rows of the output confusion matrix: {:?}",
        tally.reference_index().labels()
    );
    println!(
        "Produced class labels ordered according to the columns of the output confusion matrix: {:?}",
        tally.produced_index().labels()
    );

    let square = tally.square_matrix();
    println!(
        "Confusion matrix (rows = reference labels, columns = produced labels):\n{}",
        render_matrix(&square)
    );

    // A zero-mass matrix is fatal before any artifact is written.
    let measures = measure(&square).context("Accuracy measurement failed")?;
    for class in &measures.per_class {
        println!(
            "Precision of class [{}] vs all: {}",
            class.label,
            format_metric(class.precision)
        );
        println!(
            "Recall of class [{}] vs all: {}",
            class.label,
            format_metric(class.recall)
        );
        println!(
            "F-score of class [{}] vs all: {}",
            class.label,
            format_metric(class.f_score)
        );
    }
    println!("Kappa index: {}", format_metric(measures.kappa_index));
    println!(
        "Overall accuracy index: {}",
        format_metric(measures.overall_accuracy)
    );

    let out_file = fs::File::create(&args.out)
        .with_context(|| format!("Cannot open {} for writing", args.out.display()))?;
    let mut writer = io::BufWriter::new(out_file);
    write_csv(&mut writer, &tally)?;
    writer.flush()?;
    println!("Wrote {}", args.out.display());

    if let Some(path) = &args.metrics_json {
        let json = serde_json::to_string_pretty(&measures)?;
        fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
