use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_lookout"))
        .arg("init")
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "lookout init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".lookout.toml");
    assert!(config_path.exists(), ".lookout.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[github]"));
    assert!(content.contains("[llm]"));
    assert!(content.contains("[review]"));

    // Every setting is commented out, so parsing yields the defaults.
    let config: lookout_core::LookoutConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.llm.model, "gpt-4o");
    assert!(!config.review.auto_approve);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".lookout.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_lookout"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".lookout.toml")).unwrap();
    assert_eq!(content, "# existing");
}
