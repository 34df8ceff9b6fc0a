//! Runs simulation, range detection and cleaning off the async runtime

use anyhow::{anyhow, Context};
use eeg_core::{Record, SuppressionMode};
use eeg_processing::{
    filter_record, AutoCleaner, CleaningConfig, CleaningResult, FilterConfig, PowerSpectrum,
    RangeAnalysis,
};
use eeg_simulation::{EEGSimulator, SimulationConfig};
use tracing::{info, warn};

/// Everything produced by one cleaning run
pub struct CleaningRun {
    pub raw: Record,
    pub ranges: RangeAnalysis,
    pub result: CleaningResult,
}

/// Simulate `duration` seconds and clean them with `config`
pub async fn run(
    config: CleaningConfig,
    simulation: SimulationConfig,
    duration: f64,
) -> anyhow::Result<CleaningRun> {
    tokio::task::spawn_blocking(move || {
        let cleaner = AutoCleaner::new(config).context("invalid cleaning configuration")?;

        let raw = EEGSimulator::new(simulation)
            .and_then(|mut simulator| simulator.generate(duration))
            .context("simulation failed")?
            .record;

        info!(
            record = %raw.name,
            leads = raw.lead_count(),
            seconds = raw.duration(),
            analyzers = ?cleaner.analyzer_names(),
            "recording ready"
        );

        let ranges = cleaner.detect_ranges(&raw);
        let result = cleaner.clean(&raw);

        Ok::<_, anyhow::Error>(CleaningRun { raw, ranges, result })
    })
    .await
    .map_err(|e| anyhow!("cleaning task failed: {}", e))?
}

/// Log the outcome of a run; fails when cleaning did not succeed
pub fn report(run: &CleaningRun, display_lowpass_hz: f64) -> anyhow::Result<()> {
    if run.ranges.succeeded {
        for range in &run.ranges.ranges {
            let (start, end) = range.to_seconds(run.raw.sample_rate);
            info!(start_s = start, end_s = end, label = %range.label, "artifact range");
        }
    } else if let Some(diagnostic) = &run.ranges.diagnostic {
        warn!(%diagnostic, "range detection failed");
    }

    for stage in &run.result.stages {
        info!(
            stage = %stage.stage,
            time_us = stage.processing_time_us,
            success = stage.success,
            "stage"
        );
    }
    for warning in &run.result.warnings {
        warn!("{}", warning);
    }

    if !run.result.succeeded {
        return Err(anyhow!(
            "cleaning failed: {}",
            run.result.diagnostic.as_deref().unwrap_or("unknown reason")
        ));
    }

    let (Some(components), Some(output)) = (&run.result.components, &run.result.output) else {
        return Err(anyhow!("cleaning succeeded without output"));
    };

    for (component, mode) in components.components.iter().zip(&run.result.assignments) {
        if *mode != SuppressionMode::None {
            info!(
                component = component.name(),
                suppression = ?mode,
                eye = component.flags.eye,
                single_electrode = component.flags.single_electrode,
                reference_electrode = component.flags.reference_electrode,
                "suppressed"
            );
        }
    }

    for (before, after) in run.raw.leads().iter().zip(output.leads()) {
        if !before.lead_type().is_frontal() {
            continue;
        }
        let low_before = PowerSpectrum::compute(&before.samples, run.raw.sample_rate)?.band_power(0.0, 4.0);
        let low_after = PowerSpectrum::compute(&after.samples, output.sample_rate)?.band_power(0.0, 4.0);
        let reduction = if low_before > 0.0 { 1.0 - low_after / low_before } else { 0.0 };
        info!(lead = %before.name, reduction_pct = 100.0 * reduction, "0-4 Hz power removed");
    }

    let display_record = filter_record(output, &FilterConfig::lowpass(display_lowpass_hz, 4))?;
    info!(
        raw_peak = run.raw.max_abs_value(),
        cleaned_peak = output.max_abs_value(),
        display_peak = display_record.max_abs_value(),
        "amplitude"
    );

    println!(
        "{}: {} of {} components suppressed in {} us",
        output.name,
        run.result.suppressed_count(),
        components.component_count(),
        run.result.total_time_us
    );

    Ok(())
}
