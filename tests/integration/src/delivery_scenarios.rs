//! Whole-pass scenarios: config file on disk, storage tree, in-memory ledger.

use std::fs;
use std::path::PathBuf;

use osprey_core::{RunMode, Runner};
use osprey_ledger::{CheckResult, FolderStatus, ManifestScope};
use osprey_meta::{CheckName, ConfigLoader, OspreyConfig};
use osprey_test_utils::{FakeTools, MemoryLedger, TestWorkspace};
use pretty_assertions::assert_eq;

fn write_config(ws: &TestWorkspace, workers: usize) -> PathBuf {
    let path = ws.root().join("osprey.toml");
    fs::write(
        &path,
        format!(
            r#"
[project]
alias = "test_project"
storage = "{storage}"

[ledger]
url = "http://ledger.invalid"

[checks]
filename_pattern = '^obj\d+_[ab]$'

[sequence]
tokens = ["a", "b"]
separator = "_"

[previews]
root = "{previews}"
width = 200

[runtime]
workers = {workers}
sleep_secs = 0
startup_grace_secs = 0
scratch_dir = "{scratch}"
"#,
            storage = ws.storage().display(),
            previews = ws.previews().display(),
            scratch = ws.scratch().display(),
        ),
    )
    .unwrap();
    path
}

fn load(ws: &TestWorkspace, workers: usize) -> OspreyConfig {
    ConfigLoader::new().load(&write_config(ws, workers)).unwrap()
}

fn all_checks() -> Vec<CheckName> {
    CheckName::all().to_vec()
}

#[test]
fn full_pass_over_two_deliveries() {
    let ws = TestWorkspace::new();

    let good = ws.folder("20240105_batch1");
    for stem in ["obj1_a", "obj1_b", "obj2_a", "obj2_b"] {
        good.main(stem);
        good.raw(stem);
    }
    good.manifest("tifs");
    good.manifest("raws");
    good.file("data/inventory.csv", "id,title\n");

    let messy = ws.folder("20240106_batch2");
    messy.main("obj3_a");
    messy.file("tifs/obj3_a.jpg", "stray export");

    let config = load(&ws, 2);
    let ledger = MemoryLedger::new("test_project", &all_checks());
    let tools = FakeTools::new().toolkit();

    let summary = Runner::new(&config, &ledger, &tools).run(RunMode::Once).unwrap();
    assert_eq!(summary.folders, 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.halted, 1);
    assert_eq!(ledger.startup_resets(), 1);

    let good_id = ledger.folder_id("20240105_batch1").unwrap();
    let record = ledger.folder(good_id);
    assert_eq!(record.folder_date.as_deref(), Some("2024-01-05"));
    assert_eq!(record.status, Some((FolderStatus::Clear, String::new())));
    assert_eq!(record.flags.get("tif_md5_exists"), Some(&0));
    assert_eq!(record.flags.get("raw_md5_exists"), Some(&0));
    assert_eq!(
        record.manifest_results,
        vec![
            (ManifestScope::Main, true, "Valid".to_string()),
            (ManifestScope::Raw, true, "Valid".to_string()),
        ]
    );

    let files = ledger.files(good_id);
    assert_eq!(files.len(), 4);
    for file in &files {
        for check in CheckName::all() {
            let (result, info) = file
                .checks
                .get(check)
                .unwrap_or_else(|| panic!("{} missing {check}", file.stem));
            assert_eq!(*result, CheckResult::Pass, "{} {check}: {info}", file.stem);
        }
        assert!(file.digests.contains_key("tif"));
        assert!(file.digests.contains_key("raw"));
        let thumb = ws
            .previews()
            .join(format!("folder{good_id}"))
            .join("200")
            .join(format!("{}.jpg", file.file_id));
        assert!(thumb.is_file(), "{}", thumb.display());
    }

    let messy_id = ledger.folder_id("20240106_batch2").unwrap();
    assert_eq!(
        ledger.folder(messy_id).status,
        Some((FolderStatus::Error, "Extraneous files: tifs/obj3_a.jpg".to_string()))
    );
    assert!(ledger.files(messy_id).is_empty());
}

#[test]
fn removed_files_are_reconciled_on_the_next_pass() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("20240105_batch1");
    let mut mains = Vec::new();
    for stem in ["obj1_a", "obj1_b"] {
        mains.push(folder.main(stem));
    }

    let config = load(&ws, 1);
    let ledger = MemoryLedger::new("test_project", &[CheckName::Jhove, CheckName::Sequence]);
    let tools = FakeTools::new().toolkit();
    let runner = Runner::new(&config, &ledger, &tools);

    runner.run(RunMode::Once).unwrap();
    let folder_id = ledger.folder_id("20240105_batch1").unwrap();
    assert_eq!(ledger.files(folder_id).len(), 2);
    assert_eq!(
        ledger.check(folder_id, "obj1_a", CheckName::Sequence).unwrap().0,
        CheckResult::Pass
    );

    fs::remove_file(&mains[1]).unwrap();
    runner.run_once().unwrap();

    let files = ledger.files(folder_id);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].stem, "obj1_a");
    assert_eq!(
        ledger.check(folder_id, "obj1_a", CheckName::Sequence),
        Some((CheckResult::Fail, "Next file in sequence was not found".to_string()))
    );
    assert_eq!(ledger.folder(folder_id).stats_posts, 2);
}

#[test]
fn api_key_comes_from_the_environment_override() {
    let ws = TestWorkspace::new();
    let mut config: OspreyConfig = load(&ws, 1);
    osprey_meta::loader::apply_overrides(&mut config, |key| {
        (key == osprey_meta::loader::API_KEY_ENV).then(|| "from-env".to_string())
    });
    assert_eq!(config.ledger.api_key, "from-env");
    assert_eq!(config.previews.as_ref().map(|p| p.width), Some(200));
    assert_eq!(config.sequence.as_ref().map(|s| s.tokens.len()), Some(2));
}
