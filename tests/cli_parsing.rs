use std::path::PathBuf;

use clap::Parser;
use covseed::cli::{Cli, Commands};
use covseed::domain::models::TargetMode;

#[test]
fn test_parse_seed_defaults() {
    let cli = Cli::try_parse_from([
        "covseed",
        "seed",
        "--coverage",
        "cov.json",
        "--model",
        "mistral",
        "--output-dir",
        "out",
    ])
    .unwrap();

    assert!(!cli.global.json);
    match cli.command {
        Commands::Seed(args) => {
            assert_eq!(args.coverage, PathBuf::from("cov.json"));
            assert!((args.threshold - 40.0).abs() < f64::EPSILON);
            assert!(args.min_threshold.abs() < f64::EPSILON);
            assert_eq!(args.model, "mistral");
            assert_eq!(args.max_retries, None);
            assert_eq!(args.output_dir, PathBuf::from("out"));
            assert_eq!(args.target, TargetMode::File);
            assert!(args.extension.is_none());
            assert!(args.libraries.is_empty());
            assert!(!args.repair);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_seed_full() {
    let cli = Cli::try_parse_from([
        "covseed",
        "--json",
        "--log-level",
        "debug",
        "seed",
        "--coverage",
        "cov.json",
        "--threshold",
        "25.5",
        "--min-threshold",
        "5",
        "--model",
        "gemini",
        "--max-retries",
        "7",
        "--output-dir",
        "out",
        "--target",
        "function",
        "--extension",
        ".lef",
        "--library",
        "a.lef",
        "--library",
        "b.lef",
        "--repair",
    ])
    .unwrap();

    assert!(cli.global.json);
    assert_eq!(cli.global.log_level.as_deref(), Some("debug"));
    match cli.command {
        Commands::Seed(args) => {
            assert!((args.threshold - 25.5).abs() < f64::EPSILON);
            assert!((args.min_threshold - 5.0).abs() < f64::EPSILON);
            assert_eq!(args.max_retries, Some(7));
            assert_eq!(args.target, TargetMode::Function);
            assert_eq!(args.extension.as_deref(), Some(".lef"));
            assert_eq!(
                args.libraries,
                vec![PathBuf::from("a.lef"), PathBuf::from("b.lef")]
            );
            assert!(args.repair);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "covseed",
        "repair",
        "a.def",
        "--in-place",
        "--json",
        "--config",
        "ci.yaml",
    ])
    .unwrap();

    assert!(cli.global.json);
    assert_eq!(cli.global.config, Some(PathBuf::from("ci.yaml")));
    match cli.command {
        Commands::Repair(args) => {
            assert_eq!(args.file, PathBuf::from("a.def"));
            assert!(args.in_place);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_snippet_requires_library() {
    let result = Cli::try_parse_from([
        "covseed",
        "snippet",
        "--model",
        "openai",
        "--target",
        "defin.cpp",
        "--output",
        "defin.def",
    ]);
    assert!(result.is_err());

    let cli = Cli::try_parse_from([
        "covseed",
        "snippet",
        "--model",
        "openai",
        "--target",
        "defin.cpp",
        "--output",
        "defin.def",
        "--library",
        "tech.lef",
    ])
    .unwrap();
    match cli.command {
        Commands::Snippet(args) => {
            assert_eq!(args.target, PathBuf::from("defin.cpp"));
            assert_eq!(args.output, PathBuf::from("defin.def"));
            assert_eq!(args.libraries, vec![PathBuf::from("tech.lef")]);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_verify_and_coverage() {
    let cli =
        Cli::try_parse_from(["covseed", "verify", "out/a.def", "-l", "tech.lef"]).unwrap();
    match cli.command {
        Commands::Verify(args) => {
            assert_eq!(args.file, PathBuf::from("out/a.def"));
            assert_eq!(args.libraries, vec![PathBuf::from("tech.lef")]);
        }
        _ => panic!("Wrong top-level command"),
    }

    let cli = Cli::try_parse_from([
        "covseed",
        "coverage",
        "--coverage",
        "cov.json",
        "--threshold",
        "15",
    ])
    .unwrap();
    match cli.command {
        Commands::Coverage(args) => {
            assert!((args.threshold - 15.0).abs() < f64::EPSILON);
            assert_eq!(args.target, TargetMode::File);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_seed_requires_model_and_output_dir() {
    assert!(Cli::try_parse_from(["covseed", "seed", "--coverage", "cov.json"]).is_err());
    assert!(Cli::try_parse_from(["covseed", "seed", "--coverage", "c.json", "--target", "line", "-m", "x", "-o", "o"]).is_err());
}

#[test]
fn test_cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
