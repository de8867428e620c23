use anyhow::{Context, anyhow};
use landwatch::core_modules::codec;
use landwatch::core_modules::visualizer::VisualizationKind;
use landwatch::{AnalysisResult, ChangeDetectionPipeline, PipelineConfig};
use std::env;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

const REPORT_FILE: &str = "result.json";

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // --- 1. Argument Parsing ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        println!("Usage: landwatch_tester <reference_image> <current_image> <output_dir>");
        return Ok(());
    }

    let result = run(
        Path::new(&args[1]),
        Path::new(&args[2]),
        Path::new(&args[3]),
        PipelineConfig::default(),
    )?;

    println!(
        "{}: {} deviation(s), {}% changed, risk {}",
        result.result_id,
        result.summary.total_deviations,
        result.summary.change_percentage,
        result.summary.risk_level
    );
    Ok(())
}

/// Analyzes one pair and writes `result.json` plus one JPEG per visualization.
fn run(
    reference: &Path,
    current: &Path,
    output_dir: &Path,
    config: PipelineConfig,
) -> anyhow::Result<AnalysisResult> {
    // --- 2. Input ---
    let reference_bytes =
        fs::read(reference).with_context(|| format!("reading {}", reference.display()))?;
    let current_bytes =
        fs::read(current).with_context(|| format!("reading {}", current.display()))?;

    // --- 3. Analysis ---
    let jpeg_quality = config.jpeg_quality;
    let pipeline = ChangeDetectionPipeline::new(config);
    let result = pipeline.analyze_bytes(&reference_bytes, &current_bytes)?;

    // --- 4. Output ---
    fs::create_dir_all(output_dir).with_context(|| format!("creating {}", output_dir.display()))?;

    let mut report = serde_json::to_value(&result)?;
    let recommendations = serde_json::to_value(result.recommendations())?;
    report
        .as_object_mut()
        .ok_or_else(|| anyhow!("analysis result did not serialize to an object"))?
        .insert("recommendations".to_string(), recommendations);
    let report_path = output_dir.join(REPORT_FILE);
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", report_path.display()))?;

    if let Some(visualizations) = &result.visualizations {
        for kind in VisualizationKind::ALL {
            let path = output_dir.join(format!("{kind}.jpg"));
            codec::save_jpeg(&path, visualizations.get(kind), jpeg_quality)
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }

    info!(dir = %output_dir.display(), id = %result.result_id, "report written");
    Ok(result)
}
