use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn tour() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tour"))
}

fn workspace() -> TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(temp.path().join(".tours")).unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(temp.path().join("src/lib.rs"), "pub fn lib() {}\n").unwrap();
    fs::write(
        temp.path().join(".tours/intro.tour"),
        r#"{"title":"Intro","steps":[
            {"file":"src/main.rs","line":1,"description":"Entry point"},
            {"file":"src/lib.rs","title":"Sources","description":"Sources"}
        ]}"#,
    )
    .unwrap();
    temp
}

fn init_repo(dir: &Path) {
    let repo = git2::Repository::init(dir).expect("init");
    let sig = git2::Signature::now("Test", "test@example.com").unwrap();
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, "Initial", &tree, &[])
        .unwrap();
    let commit = repo.find_object(oid, None).unwrap();
    repo.tag_lightweight("v1", &commit, false).unwrap();
}

#[test]
fn help_lists_commands() {
    tour()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("record"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn list_json_is_parseable() {
    let temp = workspace();
    let output = tour()
        .arg("--root")
        .arg(temp.path())
        .args(["list", "--json"])
        .output()
        .expect("run list");
    assert!(output.status.success());

    let tours: serde_json::Value = serde_json::from_slice(&output.stdout).expect("list json");
    assert_eq!(tours.as_array().map(Vec::len), Some(1));
    assert_eq!(tours[0]["title"], "Intro");
    assert_eq!(tours[0]["steps"], 2);
}

#[test]
fn list_reports_empty_workspace() {
    let temp = tempfile::tempdir().unwrap();
    tour()
        .arg("--root")
        .arg(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("No tours found"));
}

#[test]
fn show_prints_steps() {
    let temp = workspace();
    tour()
        .arg("--root")
        .arg(temp.path())
        .args(["show", "Intro"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 - src/main.rs"))
        .stdout(predicate::str::contains("#2 - Sources"));
}

#[test]
fn show_unknown_tour_fails() {
    let temp = workspace();
    tour()
        .arg("--root")
        .arg(temp.path())
        .args(["show", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No tour titled"));
}

#[test]
fn resolve_prints_content() {
    let temp = workspace();
    tour()
        .arg("--root")
        .arg(temp.path())
        .args(["resolve", "Intro", "1", "--content"])
        .assert()
        .success()
        .stdout("fn main() {}\n");
}

#[test]
fn validate_accepts_and_rejects() {
    let temp = workspace();
    tour()
        .args(["validate", "--input"])
        .arg(temp.path().join(".tours/intro.tour"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid: Intro (2 steps)"));

    let bad = temp.path().join("bad.tour");
    fs::write(&bad, "not json").unwrap();
    tour()
        .args(["validate", "--input"])
        .arg(&bad)
        .assert()
        .failure();
}

#[test]
fn record_then_add_step() {
    let temp = tempfile::tempdir().unwrap();
    tour()
        .arg("--root")
        .arg(temp.path())
        .args(["record", "Walkthrough"])
        .assert()
        .success()
        .stdout(predicate::str::contains("walkthrough.tour"));

    tour()
        .arg("--root")
        .arg(temp.path())
        .args([
            "step",
            "add",
            "Walkthrough",
            "--file",
            "lib.rs",
            "--line",
            "7",
            "--description",
            "Start here",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added step #1"));

    let raw = fs::read_to_string(temp.path().join(".tours/walkthrough.tour")).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved["steps"][0]["file"], "lib.rs");
    assert_eq!(saved["steps"][0]["line"], 7);
}

#[test]
fn export_inlines_contents() {
    let temp = workspace();
    let output = tour()
        .arg("--root")
        .arg(temp.path())
        .args(["export", "Intro"])
        .output()
        .expect("run export");
    assert!(output.status.success());

    let exported: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(exported["steps"][0]["contents"], "fn main() {}\n");
    assert!(exported.get("id").is_none());
}

#[test]
fn refs_lists_pin_choices() {
    let temp = workspace();
    init_repo(temp.path());

    let output = tour()
        .arg("--root")
        .arg(temp.path())
        .args(["refs", "--json"])
        .output()
        .expect("run refs");
    assert!(output.status.success());

    let refs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let choices = refs["choices"].as_array().unwrap();
    assert_eq!(choices[0]["ref"], "HEAD");
    assert!(choices.iter().any(|c| c["ref"] == "v1"));
    assert!(
        refs["refs"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["name"] == "v1" && r["kind"] == "tag")
    );
}

#[test]
fn refs_outside_repository_is_not_an_error() {
    let temp = workspace();
    tour()
        .arg("--root")
        .arg(temp.path())
        .arg("refs")
        .assert()
        .success()
        .stderr(predicate::str::contains("not in a git repository"));
}
