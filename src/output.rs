use anyhow::Result;
use serde_json::json;

use crate::labeler::LabelSummary;
use crate::prepare::PrepareReport;
use crate::resolver::StatsSnapshot;

pub fn ndjson_lines(
    report: &PrepareReport,
    stats: Option<&StatsSnapshot>,
    labels: Option<&LabelSummary>,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    lines.push(serde_json::to_string(&json!({
        "type": "summary",
        "key": report.key,
        "raw_parts": report.raw_parts,
        "countries": report.countries,
        "negatives": report.negatives,
        "candidates": report.candidates,
        "reused_normalized": report.reused_normalized,
    }))?);

    lines.push(serde_json::to_string(&json!({
        "type": "partition",
        "zoom": report.partition_zoom,
        "cells": report.partition_cells,
        "candidates": report.partition_candidates,
        "reused": report.reused_partition,
    }))?);

    for failure in report.failures.iter() {
        lines.push(serde_json::to_string(&json!({
            "type": "invalid_geometry",
            "error": failure,
        }))?);
    }

    if let Some(stats) = stats {
        lines.push(serde_json::to_string(&json!({
            "type": "stats",
            "stats": stats,
        }))?);
    }

    if let Some(labels) = labels {
        lines.push(serde_json::to_string(&json!({
            "type": "labels",
            "summary": labels,
        }))?);
    }

    Ok(lines)
}

pub fn text_lines(
    report: &PrepareReport,
    stats: Option<&StatsSnapshot>,
    labels: Option<&LabelSummary>,
) -> Vec<String> {
    let mut lines = vec![
        format!(
            "countries: {} negatives: {} candidates: {}",
            report.countries, report.negatives, report.candidates
        ),
        format!(
            "partition: z={} cells={} candidates={}",
            report.partition_zoom, report.partition_cells, report.partition_candidates
        ),
    ];
    if let Some(key) = report.key.as_ref() {
        lines.push(format!(
            "artifacts: key={} reused_normalized={} reused_partition={}",
            key, report.reused_normalized, report.reused_partition
        ));
    }
    if !report.failures.is_empty() {
        lines.push("invalid_geometry:".to_string());
        for failure in report.failures.iter() {
            lines.push(format!("  {failure}"));
        }
    }
    if let Some(stats) = stats {
        lines.push(format!(
            "stats: queries={} classify={} direct_hits={} ancestor_hits={} shortcuts={} exact_zoom={}",
            stats.queries,
            stats.classify_calls,
            stats.direct_hits,
            stats.ancestor_hits,
            stats.ancestor_shortcuts,
            stats.exact_zoom
        ));
    }
    if let Some(labels) = labels {
        lines.push(format!(
            "labels: records={} written={} skipped_zoom={} dropped_unknown={} malformed={}",
            labels.records,
            labels.written,
            labels.skipped_zoom,
            labels.dropped_unknown,
            labels.malformed
        ));
    }
    lines
}
