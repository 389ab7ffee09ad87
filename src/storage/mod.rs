//! Results persistence module

use crate::cluster::metrics::{EiReport, RankedNode};
use crate::graph::InteractionGraph;
use crate::pipeline::AnalysisReport;
use crate::temporal::{CommunityMatch, SimilarityMatrix, TimeSlice};
use anyhow::{Context, Result};
use serde_json::{json, to_string_pretty};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Save a report and its CSV companions to the given directory
pub fn save_results(report: &AnalysisReport, ranked: &[RankedNode], output_dir: &Path) -> Result<()> {
    log::info!("Saving results for '{}' to {}", report.period, output_dir.display());

    fs::create_dir_all(output_dir)?;

    save_report(report, &output_dir.join("report.json"))?;
    save_partition(ranked, &output_dir.join("communities.csv"))?;
    save_ei_indices(&report.ei, &output_dir.join("ei_indices.csv"))?;

    log::info!("Results saved successfully");
    Ok(())
}

/// Save the full report as pretty JSON
pub fn save_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(to_string_pretty(report)?.as_bytes())?;
    Ok(())
}

/// Save the aggregated (source, target, weight) edgelist as CSV
pub fn save_edgelist(graph: &InteractionGraph, path: &Path, weighted: bool) -> Result<()> {
    log::info!("Saving edgelist to {}", path.display());

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    for (source, target, weight) in graph.to_edgelist() {
        if weighted {
            writer.write_record([source, target, weight.to_string()])?;
        } else {
            writer.write_record([source, target])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Save partition members ranked by degree: name, community, degree
pub fn save_partition(ranked: &[RankedNode], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(["name", "community", "degree"])?;
    for row in ranked {
        writer.write_record([
            row.node.clone(),
            row.community.to_string(),
            row.degree.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Save EI indices; undefined indices are written as NaN
pub fn save_ei_indices(ei: &EiReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(["community", "ei_index"])?;
    for (community, index) in &ei.indices {
        let value = index.map_or_else(|| "NaN".to_string(), |v| format!("{:.3}", v));
        writer.write_record([community.to_string(), value])?;
    }
    writer.flush()?;
    Ok(())
}

/// Save a slice comparison as JSON
pub fn save_comparison(
    matrix: &SimilarityMatrix,
    matches: &[CommunityMatch],
    path: &Path,
) -> Result<()> {
    log::info!("Saving community comparison to {}", path.display());

    let mut file = File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let comparison = json!({
        "similarity": matrix,
        "matches": matches,
        "accepted_matches": matches.iter().filter(|m| m.accepted).count(),
    });

    file.write_all(to_string_pretty(&comparison)?.as_bytes())?;
    Ok(())
}

/// Store a time slice in compact binary form for later comparison
pub fn save_slice(slice: &TimeSlice, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, slice)?;
    writer.flush()?;
    Ok(())
}

/// Load a time slice written by [`save_slice`]
pub fn load_slice(path: &Path) -> Result<TimeSlice> {
    let file = File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let slice = bincode::deserialize_from(BufReader::new(file))?;
    Ok(slice)
}
