use std::fs::File;
use std::io::{self, BufReader, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;

use tile_sovereignty::cli::{Cli, Command, ReportFormat, SourceArgs, WarmupArgs};
use tile_sovereignty::labeler::{LabelOptions, label_records};
use tile_sovereignty::output::{ndjson_lines, text_lines};
use tile_sovereignty::prepare::{PrepareOptions, Session, prepare};
use tile_sovereignty::resolver::{WarmOptions, WarmStrategy};
use tile_sovereignty::store::Target;
use tile_sovereignty::tile::TileCoord;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match cli.command {
        Command::Prepare(args) => {
            let prepared = prepare(&args.source.boundaries, &prepare_options(&args.source))?;
            match args.output {
                ReportFormat::Json => {
                    let json = serde_json::to_string_pretty(&prepared.report)?;
                    println!("{}", json);
                }
                ReportFormat::Ndjson => {
                    for line in ndjson_lines(&prepared.report, None, None)? {
                        println!("{}", line);
                    }
                }
                ReportFormat::Text => {
                    for line in text_lines(&prepared.report, None, None) {
                        println!("{}", line);
                    }
                }
            }
        }
        Command::Warm(args) => {
            let session = Session::open(
                &args.source.boundaries,
                &prepare_options(&args.source),
                &warm_options(&args.warm, args.source.no_progress),
                None,
            )?;
            session.save()?;
            let stats = session.resolver.stats().snapshot();
            match args.output {
                ReportFormat::Json => {
                    let json = serde_json::to_string_pretty(&serde_json::json!({
                        "report": session.report,
                        "min_cache_zoom": session.resolver.min_cache_zoom(),
                        "cached": session.resolver.cache_len(),
                        "unambiguous": session.resolver.unambiguous_len(),
                        "stats": stats,
                    }))?;
                    println!("{}", json);
                }
                ReportFormat::Ndjson => {
                    for line in ndjson_lines(&session.report, Some(&stats), None)? {
                        println!("{}", line);
                    }
                }
                ReportFormat::Text => {
                    for line in text_lines(&session.report, Some(&stats), None) {
                        println!("{}", line);
                    }
                    println!(
                        "cache: min_cache_zoom={} entries={} unambiguous={}",
                        session.resolver.min_cache_zoom(),
                        session.resolver.cache_len(),
                        session.resolver.unambiguous_len()
                    );
                }
            }
        }
        Command::Resolve(args) => {
            let tiles = args
                .tiles
                .iter()
                .map(|value| value.parse::<TileCoord>())
                .collect::<Result<Vec<_>, _>>()?;
            let session = Session::open(
                &args.source.boundaries,
                &prepare_options(&args.source),
                &warm_options(&args.warm, args.source.no_progress),
                None,
            )?;
            for tile in tiles.iter() {
                println!("{} {}", tile, session.resolver.resolve(tile));
            }
            session.save()?;
        }
        Command::Label(args) => {
            let options = prepare_options(&args.source);
            let drop_unknown = args.drop_unknown || (options.target.is_some() && !args.keep_unknown);
            let session = Session::open(
                &args.source.boundaries,
                &options,
                &warm_options(&args.warm, args.source.no_progress),
                None,
            )?;
            let label_options = LabelOptions {
                min_zoom: args.min_zoom,
                max_zoom: args.max_zoom,
                drop_unknown,
                no_progress: args.source.no_progress,
            };
            let reader: Box<dyn io::BufRead> = match args.input.as_ref() {
                Some(path) => Box::new(BufReader::new(
                    File::open(path).with_context(|| format!("open {}", path.display()))?,
                )),
                None => Box::new(io::stdin().lock()),
            };
            let writer: Box<dyn io::Write> = match args.output.as_ref() {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("create {}", path.display()))?,
                )),
                None => Box::new(BufWriter::new(io::stdout().lock())),
            };
            let summary = label_records(&session.resolver, reader, writer, &label_options)?;
            session.save()?;
            let stats = session.resolver.stats().snapshot();
            let lines = match args.report {
                ReportFormat::Json => vec![serde_json::to_string_pretty(&serde_json::json!({
                    "report": session.report,
                    "stats": stats,
                    "labels": summary,
                }))?],
                ReportFormat::Ndjson => ndjson_lines(&session.report, Some(&stats), Some(&summary))?,
                ReportFormat::Text => text_lines(&session.report, Some(&stats), Some(&summary)),
            };
            for line in lines {
                eprintln!("{}", line);
            }
        }
    }

    Ok(())
}

fn prepare_options(args: &SourceArgs) -> PrepareOptions {
    let target = match (args.country.as_ref(), args.rel) {
        (Some(country), _) => Some(Target::Country(country.clone())),
        (None, Some(rel)) => Some(Target::Relation(rel)),
        (None, None) => None,
    };
    PrepareOptions {
        cache_dir: args.cache_dir.clone(),
        target,
        negative_step: args.negative_step,
        partition_zoom: args.partition_zoom,
        no_progress: args.no_progress,
    }
}

fn warm_options(args: &WarmupArgs, no_progress: bool) -> WarmOptions {
    WarmOptions {
        strategy: match args.warm_zoom {
            Some(zoom) => WarmStrategy::FixedZoom(zoom),
            None => WarmStrategy::FirstUnambiguous,
        },
        max_zoom: args.max_warm_zoom,
        preset_min_zoom: args.min_cache_zoom,
        no_progress,
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level).unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
