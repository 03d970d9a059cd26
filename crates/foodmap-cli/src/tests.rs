use std::path::PathBuf;

use foodmap_core::{RunReport, SearchReport};
use foodmap_scraper::CleanSummary;
use foodmap_store::{FileSummary, PostalSummary};

use super::*;

#[test]
fn parses_scrape_with_original_flag_names() {
    let cli = Cli::try_parse_from([
        "foodmap-cli",
        "scrape",
        "--postal",
        "75011",
        "--visible",
        "--limit",
        "10",
        "--menu-limit",
        "25",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Scrape {
            ref postal,
            visible: true,
            limit: Some(10),
            menu_limit: Some(25),
        } if postal == "75011"
    ));
}

#[test]
fn scrape_limits_default_to_none() {
    let cli = Cli::try_parse_from(["foodmap-cli", "scrape", "--postal", "69001"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Scrape {
            visible: false,
            limit: None,
            menu_limit: None,
            ..
        }
    ));
}

#[test]
fn scrape_requires_postal_code() {
    assert!(Cli::try_parse_from(["foodmap-cli", "scrape"]).is_err());
}

#[test]
fn non_numeric_limit_is_rejected() {
    assert!(Cli::try_parse_from(["foodmap-cli", "scrape", "--postal", "75011", "--limit", "many"]).is_err());
}

#[test]
fn parses_search_clean_and_status() {
    let search = Cli::try_parse_from(["foodmap-cli", "search", "--postal", "75011"]).unwrap();
    assert!(matches!(search.command, Commands::Search { visible: false, .. }));

    let clean = Cli::try_parse_from(["foodmap-cli", "clean", "--postal", "75011"]).unwrap();
    assert!(matches!(clean.command, Commands::Clean { ref postal } if postal == "75011"));

    let status = Cli::try_parse_from(["foodmap-cli", "status", "--postal", "75011"]).unwrap();
    assert!(matches!(status.command, Commands::Status { .. }));
}

#[test]
fn a_command_is_required() {
    assert!(Cli::try_parse_from(["foodmap-cli"]).is_err());
}

fn report() -> RunReport {
    RunReport {
        success: true,
        error: None,
        postal_code: "75011".to_string(),
        pages_processed: 3,
        establishments_scraped: 12,
        restaurants_scraped: 9,
        stores_scraped: 3,
        stopped: false,
        restaurants_file: Some(PathBuf::from("restaurants_75011.json")),
        stores_file: Some(PathBuf::from("stores_75011.json")),
        started_at: chrono::Utc::now(),
        elapsed_ms: 61_500,
    }
}

#[test]
fn report_lists_counts_and_files() {
    let out = commands::render_report(&report());
    assert!(out.starts_with("scrape completed for 75011"));
    assert!(out.contains("restaurants:      9"));
    assert!(out.contains("stores_75011.json"));
    assert!(out.contains("61.5s"));
}

#[test]
fn stopped_and_failed_reports_say_so() {
    let mut stopped = report();
    stopped.stopped = true;
    assert!(commands::render_report(&stopped).starts_with("scrape stopped"));

    let failed = RunReport::failed("75011", "search timed out", chrono::Utc::now());
    let out = commands::render_report(&failed);
    assert!(out.starts_with("error: scrape failed for 75011: search timed out"));
    assert!(!out.contains("saved to"));
}

#[test]
fn search_report_shows_timings_only_on_success() {
    let ok = SearchReport {
        success: true,
        postal_code: "75011".to_string(),
        dialog_closed: true,
        page_load_ms: 1200,
        search_ms: 800,
        total_ms: 2100,
        error: None,
    };
    let out = commands::render_search(&ok);
    assert!(out.contains("dialog closed:  true"));
    assert!(out.contains("2100 ms"));

    let failed = SearchReport {
        success: false,
        error: Some("no input".to_string()),
        ..ok
    };
    let out = commands::render_search(&failed);
    assert!(out.contains("error: search failed for 75011: no input"));
    assert!(!out.contains("page load"));
}

#[test]
fn status_renders_one_row_per_file() {
    let summary = PostalSummary {
        postal_code: "75011".to_string(),
        restaurants: FileSummary {
            file: PathBuf::from("restaurants_75011.json"),
            exists: true,
            establishments: 2,
            items: 14,
            sample_names: vec!["Pizza Roma".to_string(), "Sushi Go".to_string()],
        },
        stores: FileSummary {
            file: PathBuf::from("stores_75011.json"),
            exists: false,
            establishments: 0,
            items: 0,
            sample_names: vec![],
        },
    };
    let out = commands::render_status(&summary);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[2].starts_with("restaurants  yes"));
    assert!(lines[2].ends_with("Pizza Roma, Sushi Go"));
    assert!(lines[3].starts_with("stores       no"));
}

#[test]
fn clean_summary_is_one_line() {
    let out = commands::render_clean(&CleanSummary {
        postal_code: "75011".to_string(),
        restaurants: 4,
        stores: 2,
        duplicate_establishments: 1,
        products_removed: 7,
    });
    assert_eq!(out.lines().count(), 1);
    assert!(out.contains("1 duplicate establishments and 7 products removed"));
}
