use anyhow::{Context, Result};
use log::info;
use std::io::BufRead;
use std::path::Path;

use raftscope::config::ScopeConfig;
use raftscope::display::{DisplayReport, DisplayRequest, RequestFile, ScopeSession};
use raftscope::render::{RenderOutput, SvgRenderer};

/// Run display requests and print what was produced
pub fn run(config: ScopeConfig, requests: Vec<DisplayRequest>) -> Result<()> {
    let interactive = config.interactive;
    let renderer = SvgRenderer::new(&config.output_dir).with_max_points(config.max_points);
    let mut session = ScopeSession::new(config, renderer);

    let mut total = DisplayReport::default();
    for request in &requests {
        let report = session
            .run(request)
            .with_context(|| format!("Failed to run {}", request))?;
        total.merge(report);
    }

    print!("{}", format_report(&total));

    // the scratch directory lives as long as the renderer
    if interactive && !total.outputs.is_empty() {
        println!("Press Enter to close the session and remove the figures.");
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
    }
    drop(session);
    Ok(())
}

/// Run every request of a TOML request file
pub fn run_file(config: ScopeConfig, path: &Path) -> Result<()> {
    let file = RequestFile::from_file(path)
        .with_context(|| format!("Failed to load request file: {}", path.display()))?;
    if file.requests.is_empty() {
        anyhow::bail!("No [[request]] tables in {}", path.display());
    }
    info!("{} request(s) from {}", file.requests.len(), path.display());
    run(config, file.requests)
}

fn output_line(output: &RenderOutput) -> String {
    match output {
        RenderOutput::Displayed(handle) => {
            format!("view  {}  {}", handle.title, handle.path.display())
        }
        RenderOutput::File(artifact) => {
            format!("wrote {}  {}", artifact.title, artifact.path.display())
        }
    }
}

#[cfg(feature = "colorized_output")]
fn format_report(report: &DisplayReport) -> String {
    use console::style;

    let mut out = String::new();
    for output in &report.outputs {
        out.push_str(&format!("{} {}\n", style("✓").green(), output_line(output)));
    }
    for skip in &report.skipped {
        out.push_str(&format!(
            "{} skipped CCD {} ({}): {}\n",
            style("⚠").yellow(),
            skip.ccd,
            skip.path.display(),
            skip.reason
        ));
    }
    for warning in &report.warnings {
        out.push_str(&format!("{} {}\n", style("⚠").yellow(), warning));
    }
    out.push_str(&format!(
        "{}: {} figure(s), {} skipped, {} warning(s)\n",
        style("Summary").bold(),
        style(report.outputs.len()).green(),
        style(report.skipped.len()).yellow(),
        style(report.warnings.len()).yellow()
    ));
    out
}

#[cfg(not(feature = "colorized_output"))]
fn format_report(report: &DisplayReport) -> String {
    let mut out = String::new();
    for output in &report.outputs {
        out.push_str(&format!("[OK] {}\n", output_line(output)));
    }
    for skip in &report.skipped {
        out.push_str(&format!(
            "[WARN] skipped CCD {} ({}): {}\n",
            skip.ccd,
            skip.path.display(),
            skip.reason
        ));
    }
    for warning in &report.warnings {
        out.push_str(&format!("[WARN] {}\n", warning));
    }
    out.push_str(&format!(
        "Summary: {} figure(s), {} skipped, {} warning(s)\n",
        report.outputs.len(),
        report.skipped.len(),
        report.warnings.len()
    ));
    out
}
