//! Unit tests for the CLI commands and edge-list ingestion.

mod helpers;

use std::io::Cursor;
use std::path::Path;

use commune_core::{
    AllocationTracker, Graph, LouvainError, RunStatus, WccError, estimate_louvain_bytes,
};
use rstest::rstest;

use commune_test_support::tracing::RecordingLayer;

use super::{CliError, Command, EdgeList, ExecutionSummary, LevelSummary, render_summary};
use helpers::{
    TWO_TRIANGLES, create_edge_list, parse_args, run, run_expecting_error, temp_dir,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn parse(contents: &str, node_count: Option<usize>) -> Result<EdgeList, CliError> {
    EdgeList::parse(Cursor::new(contents), Path::new("input.txt"), node_count)
}

#[rstest]
#[case::whitespace("0 1\n1\t2\n", vec![(0, 1, 1.0), (1, 2, 1.0)], false)]
#[case::commas("0,1\n1, 2, 0.5\n", vec![(0, 1, 1.0), (1, 2, 0.5)], true)]
#[case::comments("# header\n% matrix market style\n\n0 1 2.0\n", vec![(0, 1, 2.0)], true)]
fn edge_list_accepts_supported_layouts(
    #[case] contents: &str,
    #[case] expected: Vec<(usize, usize, f64)>,
    #[case] weighted: bool,
) -> TestResult {
    let edges = parse(contents, None)?;
    assert_eq!(edges.relationships, expected);
    assert_eq!(edges.weighted, weighted);
    Ok(())
}

#[rstest]
#[case::derived(None, 4)]
#[case::override_larger(Some(9), 9)]
fn edge_list_node_count(#[case] requested: Option<usize>, #[case] expected: usize) -> TestResult {
    let edges = parse("0 3\n1 2\n", requested)?;
    assert_eq!(edges.node_count, expected);
    Ok(())
}

#[rstest]
#[case::one_field("0\n", 1)]
#[case::four_fields("0 1\n0 1 1.0 extra\n", 2)]
#[case::negative_id("0 1\n-1 2\n", 2)]
#[case::bad_weight("# c\n0 1 heavy\n", 2)]
#[case::infinite_weight("0 1 inf\n", 1)]
fn edge_list_reports_offending_line(#[case] contents: &str, #[case] expected_line: usize) {
    match parse(contents, None) {
        Err(CliError::Parse { line, .. }) => assert_eq!(line, expected_line),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[rstest]
fn edge_list_rejects_too_small_node_count() {
    match parse("0 5\n", Some(3)) {
        Err(CliError::Parse { line, message, .. }) => {
            assert_eq!(line, 0);
            assert!(message.contains("6 ids"), "unexpected message: {message}");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[rstest]
fn edge_list_builds_symmetric_graph() -> TestResult {
    let edges = parse(TWO_TRIANGLES, None)?;
    let graph = edges.to_graph(&AllocationTracker::empty())?;
    assert_eq!(graph.node_count(), 6);
    assert_eq!(graph.relationship_count()?, 12);
    assert_eq!(graph.degree(0)?, 2);
    Ok(())
}

#[rstest]
fn louvain_separates_two_triangles() -> TestResult {
    let dir = temp_dir();
    let path = create_edge_list(&dir, "triangles.txt", TWO_TRIANGLES)?;
    let cli = parse_args(&["commune", "louvain", path.to_string_lossy().as_ref()]);

    match run(cli)? {
        ExecutionSummary::Louvain {
            levels,
            status,
            assignments,
            ..
        } => {
            assert_eq!(status, RunStatus::Completed);
            assert_eq!(levels.len(), 1);
            assert_eq!(levels[0].communities, 2);
            assert!((levels[0].modularity - 0.5).abs() < 1e-9);
            assert_eq!(assignments, vec![vec![0, 0, 0, 1, 1, 1]]);
        }
        other => panic!("unexpected summary: {other:?}"),
    }
    Ok(())
}

#[rstest]
fn louvain_prints_every_level_on_request() -> TestResult {
    let dir = temp_dir();
    let mut contents = String::new();
    for clique in 0..8_usize {
        let base = clique * 4;
        for a in 0..4 {
            for b in (a + 1)..4 {
                contents.push_str(&format!("{} {}\n", base + a, base + b));
            }
        }
        contents.push_str(&format!("{} {}\n", base, ((clique + 1) % 8) * 4 + 1));
    }
    let path = create_edge_list(&dir, "ring.txt", &contents)?;
    let cli = parse_args(&[
        "commune",
        "louvain",
        path.to_string_lossy().as_ref(),
        "--all-levels",
        "--concurrency",
        "1",
    ]);

    match run(cli)? {
        ExecutionSummary::Louvain {
            levels,
            assignments,
            ..
        } => {
            assert_eq!(assignments.len(), levels.len());
            assert!(assignments.iter().all(|row| row.len() == 32));
        }
        other => panic!("unexpected summary: {other:?}"),
    }
    Ok(())
}

#[rstest]
fn louvain_surfaces_configuration_errors() -> TestResult {
    let dir = temp_dir();
    let path = create_edge_list(&dir, "triangles.txt", TWO_TRIANGLES)?;
    let cli = parse_args(&[
        "commune",
        "louvain",
        path.to_string_lossy().as_ref(),
        "--max-levels",
        "0",
    ]);

    let err = run_expecting_error(cli, "zero levels must be rejected");
    assert!(matches!(
        err,
        CliError::Louvain(LouvainError::InvalidMaxLevels { .. })
    ));
    assert_eq!(err.code(), Some("LOUVAIN_INVALID_MAX_LEVELS"));
    Ok(())
}

#[rstest]
fn missing_input_is_an_io_error() {
    let dir = temp_dir();
    let missing = dir.path().join("missing.txt");
    let cli = parse_args(&["commune", "wcc", missing.to_string_lossy().as_ref()]);

    let err = run_expecting_error(cli, "missing file must fail");
    assert!(matches!(err, CliError::Io { .. }));
    assert_eq!(err.code(), None);
}

#[rstest]
fn wcc_labels_components_in_node_order() -> TestResult {
    let dir = temp_dir();
    let path = create_edge_list(&dir, "pairs.txt", "2 3\n0 1\n")?;
    let cli = parse_args(&[
        "commune",
        "wcc",
        path.to_string_lossy().as_ref(),
        "--nodes",
        "5",
    ]);

    match run(cli)? {
        ExecutionSummary::Components {
            component_count,
            assignments,
            ..
        } => {
            assert_eq!(component_count, 3);
            assert_eq!(assignments, vec![0, 0, 1, 1, 2]);
        }
        other => panic!("unexpected summary: {other:?}"),
    }
    Ok(())
}

#[rstest]
fn wcc_threshold_drops_light_relationships() -> TestResult {
    let dir = temp_dir();
    let path = create_edge_list(&dir, "weighted.txt", "0 1 0.9\n1 2 0.1\n")?;
    let cli = parse_args(&[
        "commune",
        "wcc",
        path.to_string_lossy().as_ref(),
        "--threshold",
        "0.5",
    ]);

    match run(cli)? {
        ExecutionSummary::Components { assignments, .. } => {
            assert_eq!(assignments, vec![0, 0, 1]);
        }
        other => panic!("unexpected summary: {other:?}"),
    }
    Ok(())
}

#[rstest]
fn wcc_rejects_zero_workers() -> TestResult {
    let dir = temp_dir();
    let path = create_edge_list(&dir, "pairs.txt", "0 1\n")?;
    let cli = parse_args(&[
        "commune",
        "wcc",
        path.to_string_lossy().as_ref(),
        "--concurrency",
        "0",
    ]);

    let err = run_expecting_error(cli, "zero workers must fail");
    assert!(matches!(
        err,
        CliError::Wcc(WccError::InvalidConcurrency { got: 0 })
    ));
    Ok(())
}

#[rstest]
fn estimate_grows_with_relationships() -> TestResult {
    let sparse = run(parse_args(&[
        "commune",
        "estimate",
        "--nodes",
        "10000",
        "--relationships",
        "1000",
    ]))?;
    let dense = run(parse_args(&[
        "commune",
        "estimate",
        "--nodes",
        "10000",
        "--relationships",
        "100000",
    ]))?;

    match (sparse, dense) {
        (
            ExecutionSummary::Estimate {
                louvain_bytes: small,
                wcc_bytes: wcc_small,
            },
            ExecutionSummary::Estimate {
                louvain_bytes: large,
                wcc_bytes: wcc_large,
            },
        ) => {
            assert!(large > small);
            assert_eq!(wcc_small, wcc_large);
        }
        other => panic!("unexpected summaries: {other:?}"),
    }
    Ok(())
}

#[rstest]
fn estimate_saturates_for_the_largest_relationship_count() -> TestResult {
    let summary = run(parse_args(&[
        "commune",
        "estimate",
        "--nodes",
        "10",
        "--relationships",
        "18446744073709551615",
    ]))?;
    match summary {
        ExecutionSummary::Estimate { louvain_bytes, .. } => {
            assert_eq!(louvain_bytes, estimate_louvain_bytes(10, usize::MAX));
            assert!(louvain_bytes > estimate_louvain_bytes(10, 1_000_000));
        }
        other => panic!("unexpected summary: {other:?}"),
    }
    Ok(())
}

#[rstest]
fn render_louvain_summary_lists_levels_and_nodes() -> TestResult {
    let summary = ExecutionSummary::Louvain {
        source: "demo".into(),
        levels: vec![
            LevelSummary {
                communities: 2,
                modularity: 0.25,
                iterations: 3,
                converged: true,
            },
            LevelSummary {
                communities: 1,
                modularity: 0.5,
                iterations: 1,
                converged: true,
            },
        ],
        status: RunStatus::Cancelled,
        assignments: vec![vec![0, 1, 1], vec![0, 0, 0]],
        peak_bytes: 2048,
    };
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;

    assert!(text.contains("source: demo\n"));
    assert!(text.contains("status: cancelled\n"));
    assert!(text.contains("peak memory: 2.0 KiB\n"));
    assert!(text.contains("level 1: communities=1 modularity=0.500000 iterations=1"));
    assert!(text.ends_with("0\t0\t0\n1\t1\t0\n2\t1\t0\n"));
    Ok(())
}

#[rstest]
fn render_estimate_uses_binary_units() -> TestResult {
    let summary = ExecutionSummary::Estimate {
        louvain_bytes: 3 * 1024 * 1024,
        wcc_bytes: 512,
    };
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    assert_eq!(String::from_utf8(buffer)?, "louvain: 3.0 MiB\nwcc: 512 B\n");
    Ok(())
}

#[rstest]
fn clap_maps_louvain_flags() {
    let cli = parse_args(&[
        "commune",
        "louvain",
        "graph.txt",
        "--max-levels",
        "4",
        "--min-gain",
        "0.01",
        "--resolution",
        "0.5",
        "--shuffle",
        "--seed",
        "9",
        "--asynchronous",
    ]);
    match cli.command {
        Command::Louvain(command) => {
            assert_eq!(command.max_levels, 4);
            assert_eq!(command.min_modularity_gain, 0.01);
            assert_eq!(command.resolution, 0.5);
            assert_eq!(command.seed, Some(9));
            assert!(command.shuffle && command.asynchronous && !command.all_levels);
            assert_eq!(command.graph.max_bytes, None);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[rstest]
#[case::unknown_command(&["commune", "pagerank", "graph.txt"])]
#[case::missing_path(&["commune", "louvain"])]
#[case::bad_size(&["commune", "wcc", "graph.txt", "--max-bytes", "lots"])]
#[case::estimate_without_nodes(&["commune", "estimate", "--relationships", "3"])]
fn clap_rejects_malformed_arguments(#[case] args: &[&str]) {
    use clap::Parser;

    assert!(super::Cli::try_parse_from(args).is_err());
}

#[rstest]
fn louvain_command_records_tracing_fields() -> TestResult {
    let dir = temp_dir();
    let path = create_edge_list(&dir, "triangles.txt", TWO_TRIANGLES)?;
    let cli = parse_args(&["commune", "louvain", path.to_string_lossy().as_ref()]);

    let (layer, summary) = RecordingLayer::capture(|| run(cli));
    assert!(summary.is_ok());

    let run_span = layer.span_named("cli.run").expect("cli.run span must exist");
    assert_eq!(
        run_span.fields.get("command").map(String::as_str),
        Some("louvain")
    );
    let louvain_span = layer
        .span_named("cli.louvain")
        .expect("cli.louvain span must exist");
    assert!(
        louvain_span
            .fields
            .get("path")
            .is_some_and(|value| value.ends_with("triangles.txt"))
    );
    assert!(louvain_span.fields.contains_key("estimated_bytes"));
    let load_span = layer
        .span_named("cli.load_edge_list")
        .expect("load span must exist");
    assert_eq!(
        load_span.fields.get("relationships").map(String::as_str),
        Some("6")
    );
    assert!(layer.span_named("core.louvain.run").is_some());
    assert!(
        layer
            .events()
            .iter()
            .any(|event| event.message() == Some("louvain completed"))
    );
    Ok(())
}
