use clap::{CommandFactory, Parser};

use tile_sovereignty::cli::{Cli, Command, ReportFormat};

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parse_prepare_minimal() {
    let cli = Cli::parse_from(["tile-sovereignty", "prepare", "boundaries"]);
    assert_eq!(cli.log, "info");
    match cli.command {
        Command::Prepare(args) => {
            assert_eq!(args.source.boundaries.as_os_str(), "boundaries");
            assert_eq!(args.source.cache_dir, None);
            assert_eq!(args.source.country, None);
            assert_eq!(args.source.rel, None);
            assert_eq!(args.source.negative_step, 10);
            assert_eq!(args.source.partition_zoom, 8);
            assert!(!args.source.no_progress);
            assert_eq!(args.output, ReportFormat::Text);
        }
        _ => panic!("expected prepare command"),
    }
}

#[test]
fn parse_warm_options() {
    let cli = Cli::parse_from([
        "tile-sovereignty",
        "warm",
        "planet.geojson",
        "--cache-dir",
        "cache",
        "--country",
        "FR",
        "--warm-zoom",
        "6",
        "--max-warm-zoom",
        "12",
        "--output",
        "ndjson",
        "--log",
        "debug",
    ]);
    assert_eq!(cli.log, "debug");
    match cli.command {
        Command::Warm(args) => {
            assert_eq!(args.source.cache_dir.expect("cache dir").as_os_str(), "cache");
            assert_eq!(args.source.country.as_deref(), Some("FR"));
            assert_eq!(args.warm.warm_zoom, Some(6));
            assert_eq!(args.warm.max_warm_zoom, 12);
            assert_eq!(args.warm.min_cache_zoom, None);
            assert_eq!(args.output, ReportFormat::Ndjson);
        }
        _ => panic!("expected warm command"),
    }
}

#[test]
fn parse_resolve_tiles() {
    let cli = Cli::parse_from([
        "tile-sovereignty",
        "resolve",
        "boundaries",
        "3/4/3",
        "12/1536/1689",
        "--min-cache-zoom",
        "2",
    ]);
    match cli.command {
        Command::Resolve(args) => {
            assert_eq!(args.tiles, vec!["3/4/3", "12/1536/1689"]);
            assert_eq!(args.warm.min_cache_zoom, Some(2));
        }
        _ => panic!("expected resolve command"),
    }
    assert!(Cli::try_parse_from(["tile-sovereignty", "resolve", "boundaries"]).is_err());
}

#[test]
fn parse_label_options() {
    let cli = Cli::parse_from([
        "tile-sovereignty",
        "label",
        "boundaries",
        "--rel",
        "2202162",
        "--input",
        "tiles.csv",
        "--output",
        "labeled.csv",
        "--min-zoom",
        "4",
        "--keep-unknown",
        "--no-progress",
        "--report",
        "ndjson",
    ]);
    match cli.command {
        Command::Label(args) => {
            assert_eq!(args.source.rel, Some(2_202_162));
            assert_eq!(args.input.expect("input").as_os_str(), "tiles.csv");
            assert_eq!(args.output.expect("output").as_os_str(), "labeled.csv");
            assert_eq!(args.min_zoom, Some(4));
            assert_eq!(args.max_zoom, None);
            assert!(args.keep_unknown);
            assert!(!args.drop_unknown);
            assert!(args.source.no_progress);
            assert_eq!(args.report, ReportFormat::Ndjson);
        }
        _ => panic!("expected label command"),
    }
}

#[test]
fn conflicting_flags_are_rejected() {
    assert!(
        Cli::try_parse_from([
            "tile-sovereignty",
            "prepare",
            "boundaries",
            "--country",
            "FR",
            "--rel",
            "1",
        ])
        .is_err()
    );
    assert!(
        Cli::try_parse_from([
            "tile-sovereignty",
            "label",
            "boundaries",
            "--drop-unknown",
            "--keep-unknown",
        ])
        .is_err()
    );
}
