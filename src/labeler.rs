use std::io::{Read, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geometry::UNKNOWN_ISO;
use crate::progress::progress_for_phase;
use crate::resolver::{Resolver, StatsSnapshot};
use crate::tile::TileCoord;

const RECORD_FIELDS: usize = 5;

/// One parsed tile request: `date,z,x,y,count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub date: String,
    pub tile: TileCoord,
    pub count: u64,
}

/// Input row as laid out in the request dumps.
#[derive(Debug, Deserialize)]
struct RequestRow {
    date: String,
    zoom: u8,
    x: u32,
    y: u32,
    count: u64,
}

/// Output row: the request plus the tile center and its label.
#[derive(Debug, Serialize)]
pub struct LabeledRow<'a> {
    pub date: &'a str,
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    pub count: u64,
    pub lat: f64,
    pub lon: f64,
    pub label: &'a str,
}

impl<'a> LabeledRow<'a> {
    pub fn new(record: &'a TileRecord, label: &'a str) -> Self {
        let (lat, lon) = record.tile.center();
        Self {
            date: &record.date,
            zoom: record.tile.zoom,
            x: record.tile.x,
            y: record.tile.y,
            count: record.count,
            lat,
            lon,
            label,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelOptions {
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
    /// Skip tiles labeled `"??"`.
    pub drop_unknown: bool,
    pub no_progress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelSummary {
    pub records: u64,
    pub written: u64,
    pub skipped_zoom: u64,
    pub dropped_unknown: u64,
    pub malformed: u64,
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(false).flexible(true).trim(Trim::All);
    builder
}

fn is_header(row: &StringRecord) -> bool {
    row.get(0) == Some("date")
}

/// Converts one CSV row into a validated record.
pub fn record_from_row(row: &StringRecord) -> Result<TileRecord> {
    if row.len() != RECORD_FIELDS {
        anyhow::bail!("record must be date,z,x,y,count, got {} fields", row.len());
    }
    let parsed: RequestRow = row.deserialize(None).context("invalid tile record")?;
    if parsed.date.is_empty() {
        anyhow::bail!("empty date");
    }
    let tile = TileCoord::new(parsed.zoom, parsed.x, parsed.y)?;
    Ok(TileRecord {
        date: parsed.date,
        tile,
        count: parsed.count,
    })
}

/// Parses a single `date,z,x,y,count` line.
pub fn parse_record(line: &str) -> Result<TileRecord> {
    let mut reader = reader_builder().from_reader(line.as_bytes());
    let mut row = StringRecord::new();
    if !reader.read_record(&mut row).context("read tile record")? {
        anyhow::bail!("empty record");
    }
    record_from_row(&row)
}

fn in_zoom_range(zoom: u8, options: &LabelOptions) -> bool {
    options.min_zoom.is_none_or(|min| zoom >= min) && options.max_zoom.is_none_or(|max| zoom <= max)
}

/// Labels every record of `input` and writes `date,z,x,y,count,lat,lon,label`
/// rows to `output`. Stats for each date are logged when the date changes.
pub fn label_records<R: Read, W: Write>(
    resolver: &Resolver,
    input: R,
    output: W,
    options: &LabelOptions,
) -> Result<LabelSummary> {
    let progress = progress_for_phase("labeling", "records labeled", None, options.no_progress);
    let mut reader = reader_builder().from_reader(input);
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(output);
    let mut summary = LabelSummary::default();
    let mut batch: Option<(String, Instant, StatsSnapshot)> = None;

    for row in reader.records() {
        let row = row.context("read tile records")?;
        if is_header(&row) {
            continue;
        }
        let record = match record_from_row(&row) {
            Ok(record) => record,
            Err(err) => {
                let line = row.position().map(|pos| pos.line());
                warn!(line = ?line, error = %err, "skipping malformed tile record");
                summary.malformed += 1;
                continue;
            }
        };
        summary.records += 1;
        if let Some(progress) = progress.as_ref() {
            progress.inc(1);
        }

        let same_date = batch.as_ref().is_some_and(|(date, _, _)| *date == record.date);
        if !same_date {
            if let Some((date, started, start)) = batch.take() {
                resolver.log_stats_since(&date, &start, started.elapsed());
            }
            batch = Some((record.date.clone(), Instant::now(), resolver.stats().snapshot()));
        }

        if !in_zoom_range(record.tile.zoom, options) {
            summary.skipped_zoom += 1;
            continue;
        }
        let label = resolver.resolve(&record.tile);
        if options.drop_unknown && label == UNKNOWN_ISO {
            summary.dropped_unknown += 1;
            continue;
        }
        writer
            .serialize(LabeledRow::new(&record, &label))
            .context("write labeled record")?;
        summary.written += 1;
    }
    writer.flush().context("flush labeled records")?;

    if let Some(progress) = progress {
        progress.finish();
    }
    if let Some((date, started, start)) = batch {
        resolver.log_stats_since(&date, &start, started.elapsed());
    }
    Ok(summary)
}
