use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use orbitile_world::SECTOR_KEY_SIZE;

fn test_root(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("orbitile-cli-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).expect("create test root");
    path
}

fn orbitile(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_orbitile"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run the orbitile binary")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn terrain_preview_has_ground_below_the_surface() {
    let below = orbitile(&[
        "terrain", "--selector", "rollingHills", "--x", "0", "--y", "440", "--width", "12",
        "--height", "6",
    ]);
    assert!(below.status.success(), "{}", String::from_utf8_lossy(&below.stderr));
    assert_eq!(stdout_lines(&below), vec!["############".to_owned(); 6]);

    let above = orbitile(&[
        "terrain", "--selector", "rollingHills", "--y", "560", "--width", "12", "--height", "3",
    ]);
    assert!(above.status.success());
    assert_eq!(stdout_lines(&above), vec!["............".to_owned(); 3]);
}

#[test]
fn unknown_selectors_fail_with_a_message() {
    let output = orbitile(&["terrain", "--selector", "noSuchSelector"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("noSuchSelector"));
}

#[test]
fn malformed_config_is_rejected() {
    let root = test_root("bad-config");
    let config = root.join("orbitile.toml");
    std::fs::write(&config, "[world]\nsize = \"huge\"\n").expect("write config");
    let output = orbitile(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "terrain",
        "--selector",
        "rollingHills",
    ]);
    assert!(!output.status.success());
}

fn write_world_config(root: &Path, database: &Path) -> PathBuf {
    let config = root.join("orbitile.toml");
    std::fs::write(
        &config,
        format!(
            "[world]\nsize = [256, 128]\nseed = 5\nstorage_path = {:?}\n",
            database.to_str().expect("utf-8 path")
        ),
    )
    .expect("write config");
    config
}

#[test]
fn generated_world_sectors_can_be_listed() {
    let root = test_root("world");
    let database = root.join("sectors.db");
    let config = write_world_config(&root, &database);
    let config = config.to_str().expect("utf-8 path");

    let world = orbitile(&[
        "--config", config, "world", "--x", "0", "--y", "10", "--width", "40", "--height", "30",
    ]);
    assert!(world.status.success(), "{}", String::from_utf8_lossy(&world.stderr));
    let picture = stdout_lines(&world);
    assert_eq!(picture.len(), 30);
    assert!(picture.iter().all(|row| row.len() == 40));
    assert_eq!(picture.last().map(String::as_str), Some(&"#".repeat(40)[..]));

    let listing = orbitile(&[
        "--config",
        config,
        "storage",
        "--path",
        database.to_str().expect("utf-8 path"),
    ]);
    assert!(listing.status.success(), "{}", String::from_utf8_lossy(&listing.stderr));
    let records = stdout_lines(&listing);
    // 40x30 cells starting at (0, 10) touch two sector columns and two rows.
    assert_eq!(records.len(), 4);
    for record in &records {
        let (key, value) = record.split_once(' ').expect("key and value");
        assert_eq!(key.len(), SECTOR_KEY_SIZE * 2);
        assert!(!value.is_empty());
    }
}

#[test]
fn listing_a_missing_database_fails() {
    let root = test_root("missing");
    let output = orbitile(&[
        "storage",
        "--path",
        root.join("absent.db").to_str().expect("utf-8 path"),
    ]);
    assert!(!output.status.success());
}
