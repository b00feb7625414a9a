use std::path::PathBuf;

use crate::{parse_args, Args, AutostartAction};

fn args(list: &[&str]) -> anyhow::Result<Args> {
    parse_args(list.iter().map(|s| s.to_string()))
}

#[test]
fn no_arguments_means_defaults() {
    assert_eq!(args(&[]).unwrap(), Args::default());
}

#[test]
fn development_run() {
    let parsed = args(&["--stdout", "--frames", "25", "--config", "layout.toml"]).unwrap();
    assert!(parsed.stdout);
    assert_eq!(parsed.frames, Some(25));
    assert_eq!(parsed.config, Some(PathBuf::from("layout.toml")));
}

#[test]
fn autostart_actions() {
    assert_eq!(args(&["--autostart", "toggle"]).unwrap().autostart, Some(AutostartAction::Toggle));
    assert_eq!(args(&["--autostart", "status"]).unwrap().autostart, Some(AutostartAction::Status));
    assert!(args(&["--autostart", "sometimes"]).is_err());
    assert!(args(&["--autostart"]).is_err());
}

#[test]
fn bad_input_is_rejected() {
    assert!(args(&["--frames", "many"]).is_err());
    assert!(args(&["--verbose"]).is_err());
    assert!(args(&["--config"]).is_err());
}
