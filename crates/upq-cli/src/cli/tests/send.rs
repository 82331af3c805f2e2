//! Parse tests for `upq send`.

use std::path::PathBuf;

use clap::Parser;

use super::parse;
use crate::cli::{parse_params, Cli, CliCommand};

#[test]
fn cli_parse_send_minimal() {
    match parse(&["upq", "send", "a.bin", "--receiver", "http://h/up"]) {
        CliCommand::Send {
            files,
            receiver,
            monitor,
            params,
            batch,
            interval,
            max_size,
        } => {
            assert_eq!(files, vec![PathBuf::from("a.bin")]);
            assert_eq!(receiver, "http://h/up");
            assert!(monitor.is_none());
            assert!(params.is_empty());
            assert!(!batch);
            assert!(interval.is_none());
            assert!(max_size.is_none());
        }
        _ => panic!("expected Send"),
    }
}

#[test]
fn cli_parse_send_full() {
    match parse(&[
        "upq", "send", "a.bin", "b.bin", "--receiver", "http://h/up", "--monitor",
        "http://h/mon", "--param", "album=42", "--param", "tag=x", "--batch", "--interval",
        "250", "--max-size", "1048576",
    ]) {
        CliCommand::Send {
            files,
            monitor,
            params,
            batch,
            interval,
            max_size,
            ..
        } => {
            assert_eq!(files.len(), 2);
            assert_eq!(monitor.as_deref(), Some("http://h/mon"));
            assert_eq!(params, vec!["album=42".to_string(), "tag=x".to_string()]);
            assert!(batch);
            assert_eq!(interval, Some(250));
            assert_eq!(max_size, Some(1_048_576));
        }
        _ => panic!("expected Send"),
    }
}

#[test]
fn cli_parse_send_requires_files() {
    assert!(Cli::try_parse_from(["upq", "send", "--receiver", "http://h/up"]).is_err());
}

#[test]
fn params_split_on_first_equals() {
    let parsed = parse_params(&["k=v".to_string(), "q=a=b".to_string()]).unwrap();
    assert_eq!(
        parsed,
        vec![
            ("k".to_string(), "v".to_string()),
            ("q".to_string(), "a=b".to_string())
        ]
    );
}

#[test]
fn params_reject_missing_equals() {
    assert!(parse_params(&["novalue".to_string()]).is_err());
}
