//! Integration tests for the taskboard CLI.
//!
//! Every test runs against a fresh project directory with its own database.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a taskboard Command isolated from the caller's environment
fn taskboard(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("taskboard");
    cmd.current_dir(dir.path())
        .env_remove("TASKBOARD_OWNER")
        .env_remove("TASKBOARD_DB")
        .env_remove("TASKBOARD_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn init_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    taskboard(&dir).arg("init").assert().success();
    dir
}

/// Run a create command and pull the new id out of its `id:` line.
fn create(dir: &TempDir, args: &[&str]) -> String {
    let output = taskboard(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("id: "))
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| panic!("no id in output: {}", stdout))
}

fn show(dir: &TempDir, board: &str) -> String {
    let output = taskboard(dir).args(["board", "show", board]).output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

fn positions(haystack: &str, needles: &[&str]) -> Vec<usize> {
    needles
        .iter()
        .map(|n| haystack.find(n).unwrap_or_else(|| panic!("{} missing", n)))
        .collect()
}

// =============================================================================
// Init and config
// =============================================================================

#[test]
fn test_init_creates_config_and_database() {
    let dir = init_project();
    assert!(dir.path().join(".taskboard/taskboard.toml").exists());
    assert!(dir.path().join(".taskboard/taskboard.db").exists());

    let content = fs::read_to_string(dir.path().join(".taskboard/taskboard.toml")).unwrap();
    assert!(content.contains("[server]"));
    assert!(content.contains("port = 3141"));
}

#[test]
fn test_init_twice_keeps_existing_config() {
    let dir = init_project();
    let path = dir.path().join(".taskboard/taskboard.toml");
    fs::write(&path, "[user]\nowner = \"kim\"\n").unwrap();

    taskboard(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    assert!(fs::read_to_string(&path).unwrap().contains("kim"));
}

#[test]
fn test_config_show_defaults() {
    let dir = TempDir::new().unwrap();
    taskboard(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No taskboard.toml found"))
        .stdout(predicate::str::contains("port = 3141"));
}

#[test]
fn test_config_validate_reports_warnings() {
    let dir = init_project();
    fs::write(
        dir.path().join(".taskboard/taskboard.toml"),
        "[server]\nport = 0\n[logging]\nlevel = \"chatty\"\n",
    )
    .unwrap();

    taskboard(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration warnings"))
        .stdout(predicate::str::contains("port is 0"))
        .stdout(predicate::str::contains("chatty"));
}

#[test]
fn test_config_init_then_validate() {
    let dir = TempDir::new().unwrap();
    taskboard(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created taskboard.toml"));
    taskboard(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_env_owner_is_stamped_on_new_boards() {
    let dir = init_project();
    taskboard(&dir)
        .env("TASKBOARD_OWNER", "robin")
        .args(["board", "create", "Shared"])
        .assert()
        .success();
    taskboard(&dir)
        .args(["board", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("robin"))
        .stdout(predicate::str::contains("Shared"));
}

// =============================================================================
// Board lifecycle
// =============================================================================

#[test]
fn test_board_list_empty() {
    let dir = init_project();
    taskboard(&dir)
        .args(["board", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No boards yet"));
}

#[test]
fn test_board_show_lists_columns_and_cards() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "Launch"]);
    let todo = create(&dir, &["column", "add", &board, "Todo"]);
    create(&dir, &["column", "add", &board, "Done"]);
    create(&dir, &["card", "add", &todo, "Write docs"]);
    create(&dir, &["card", "add", &todo, "Fix bug", "--order", "0"]);

    let out = show(&dir, &board);
    let at = positions(&out, &["Launch", "Todo", "Fix bug", "Write docs", "Done"]);
    assert!(at.windows(2).all(|w| w[0] < w[1]), "unexpected order:\n{}", out);
}

#[test]
fn test_board_show_unknown_fails() {
    let dir = init_project();
    taskboard(&dir)
        .args(["board", "show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("board missing"));
}

#[test]
fn test_empty_title_is_rejected() {
    let dir = init_project();
    taskboard(&dir)
        .args(["board", "create", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("title"));
}

#[test]
fn test_card_order_past_end_is_rejected() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "B"]);
    let todo = create(&dir, &["column", "add", &board, "Todo"]);
    taskboard(&dir)
        .args(["card", "add", &todo, "Late", "--order", "3"])
        .assert()
        .failure();
}

#[test]
fn test_rename_and_delete() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "Old"]);
    let todo = create(&dir, &["column", "add", &board, "Todo"]);
    let card = create(&dir, &["card", "add", &todo, "Draft"]);

    taskboard(&dir)
        .args(["board", "rename", &board, "New"])
        .assert()
        .success();
    taskboard(&dir)
        .args(["card", "rename", &card, "Final"])
        .assert()
        .success();
    let out = show(&dir, &board);
    assert!(out.contains("New"));
    assert!(out.contains("Final"));

    taskboard(&dir)
        .args(["column", "delete", &todo])
        .assert()
        .success();
    assert!(show(&dir, &board).contains("(no columns)"));

    taskboard(&dir)
        .args(["board", "delete", &board])
        .assert()
        .success();
    taskboard(&dir)
        .args(["board", "show", &board])
        .assert()
        .failure();
}

#[test]
fn test_repair_on_ordered_board_is_noop() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "B"]);
    create(&dir, &["column", "add", &board, "Todo"]);
    taskboard(&dir)
        .args(["board", "repair", &board])
        .assert()
        .success()
        .stdout(predicate::str::contains("already in order"));
}

// =============================================================================
// Moves
// =============================================================================

#[test]
fn test_move_card_within_column() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "B"]);
    let todo = create(&dir, &["column", "add", &board, "Todo"]);
    let a = create(&dir, &["card", "add", &todo, "Alpha"]);
    create(&dir, &["card", "add", &todo, "Bravo"]);
    create(&dir, &["card", "add", &todo, "Charlie"]);

    taskboard(&dir)
        .args(["move", "card", &a, "--to", &todo, "--index", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 records updated"));

    let out = show(&dir, &board);
    let at = positions(&out, &["Bravo", "Charlie", "Alpha"]);
    assert!(at[0] < at[1] && at[1] < at[2], "unexpected order:\n{}", out);
}

#[test]
fn test_move_card_across_columns_appends() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "B"]);
    let todo = create(&dir, &["column", "add", &board, "Todo"]);
    let done = create(&dir, &["column", "add", &board, "Done"]);
    let a = create(&dir, &["card", "add", &todo, "Alpha"]);
    create(&dir, &["card", "add", &todo, "Bravo"]);
    create(&dir, &["card", "add", &done, "Delta"]);

    taskboard(&dir)
        .args(["move", "card", &a, "--to", &done])
        .assert()
        .success();

    let out = show(&dir, &board);
    let at = positions(&out, &["Todo", "Bravo", "Done", "Delta", "Alpha"]);
    assert!(at.windows(2).all(|w| w[0] < w[1]), "unexpected order:\n{}", out);
}

#[test]
fn test_move_card_to_same_place_is_noop() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "B"]);
    let todo = create(&dir, &["column", "add", &board, "Todo"]);
    let a = create(&dir, &["card", "add", &todo, "Alpha"]);

    taskboard(&dir)
        .args(["move", "card", &a, "--to", &todo, "--index", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to do"));
}

#[test]
fn test_move_card_out_of_range_fails() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "B"]);
    let todo = create(&dir, &["column", "add", &board, "Todo"]);
    let a = create(&dir, &["card", "add", &todo, "Alpha"]);

    taskboard(&dir)
        .args(["move", "card", &a, "--to", &todo, "--index", "5"])
        .assert()
        .failure();
}

#[test]
fn test_move_column() {
    let dir = init_project();
    let board = create(&dir, &["board", "create", "B"]);
    let todo = create(&dir, &["column", "add", &board, "Todo"]);
    create(&dir, &["column", "add", &board, "Doing"]);
    create(&dir, &["column", "add", &board, "Done"]);

    taskboard(&dir)
        .args(["move", "column", &todo, "--index", "2"])
        .assert()
        .success();

    let out = show(&dir, &board);
    let at = positions(&out, &["Doing", "Done", "Todo"]);
    assert!(at[0] < at[1] && at[1] < at[2], "unexpected order:\n{}", out);
}
