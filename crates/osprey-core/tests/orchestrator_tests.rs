//! Folder-level behaviour against the in-memory ledger and fake tools.

use osprey_core::{FolderOrchestrator, FolderOutcome, SkipReason};
use osprey_ledger::types::QC_PENDING;
use osprey_ledger::{CheckResult, FolderStatus, ManifestScope, Update};
use osprey_meta::{CheckName, OspreyConfig, SequenceSpec};
use osprey_test_utils::{FakeTools, MemoryLedger, TestWorkspace};
use pretty_assertions::assert_eq;

const STANDARD: &[CheckName] = &[
    CheckName::Jhove,
    CheckName::Filename,
    CheckName::TifPages,
    CheckName::Magick,
    CheckName::TifCompression,
];

fn process(config: &OspreyConfig, ledger: &MemoryLedger, tools: FakeTools, folder: &std::path::Path) -> FolderOutcome {
    let tools = tools.toolkit();
    FolderOrchestrator::new(config, ledger, &tools)
        .process(folder)
        .unwrap()
}

fn status(ledger: &MemoryLedger, folder_id: i64) -> (FolderStatus, String) {
    ledger.folder(folder_id).status.expect("status recorded")
}

#[test]
fn clean_folder_passes_every_check() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("botany_20240105");
    for stem in ["a", "b", "c"] {
        folder.main(stem);
    }
    let ledger = MemoryLedger::new("test_project", STANDARD);

    let outcome = process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    let folder_id = ledger.folder_id("botany_20240105").unwrap();
    assert_eq!(
        outcome,
        FolderOutcome::Completed {
            folder_id,
            files: 3,
            failed_files: 0,
            counts_match: true,
        }
    );
    assert_eq!(status(&ledger, folder_id), (FolderStatus::Clear, String::new()));

    let record = ledger.folder(folder_id);
    assert_eq!(record.folder_date.as_deref(), Some("2024-01-05"));
    assert_eq!(record.flags.get("checking_folder"), Some(&1));
    assert_eq!(record.flags.get("tif_md5_exists"), Some(&1));
    assert_eq!(record.stats_posts, 1);

    let files = ledger.files(folder_id);
    assert_eq!(files.len(), 3);
    for file in files {
        for check in STANDARD {
            let (result, info) = &file.checks[check];
            assert_eq!(*result, CheckResult::Pass, "{} {check}: {info}", file.stem);
        }
        assert!(file.digests.contains_key("tif"));
        assert!(file.exif.is_some());
        assert_eq!(file.filetype, "tif");
    }
}

#[test]
fn second_pass_is_idempotent() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    folder.main("b");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let config = ws.config();

    process(&config, &ledger, FakeTools::new(), folder.path());
    let folder_id = ledger.folder_id("f1").unwrap();
    let first = ledger.files(folder_id);

    process(&config, &ledger, FakeTools::new(), folder.path());
    let second = ledger.files(folder_id);

    let ids = |files: &[osprey_test_utils::MemoryFile]| files.iter().map(|f| f.file_id).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    for (before, after) in first.iter().zip(&second) {
        assert_eq!(before.checks, after.checks);
    }
    assert_eq!(ledger.folder(folder_id).stats_posts, 2);
}

#[test]
fn failing_checks_are_recorded_not_raised() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    for stem in ["good", "multi", "zip", "broken"] {
        folder.main(stem);
    }
    let tools = FakeTools::new()
        .pages("multi", 2)
        .compression("zip", "ZIP")
        .invalid("broken", &["Premature EOF"])
        .unreadable("broken");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    let outcome = process(&ws.config(), &ledger, tools, folder.path());
    assert!(matches!(outcome, FolderOutcome::Completed { failed_files: 0, .. }));

    let folder_id = ledger.folder_id("f1").unwrap();
    let pages = ledger.check(folder_id, "multi", CheckName::TifPages).unwrap();
    assert_eq!(pages, (CheckResult::Fail, "No. of pages: 2".to_string()));
    let compression = ledger.check(folder_id, "zip", CheckName::TifCompression).unwrap();
    assert_eq!(compression, (CheckResult::Fail, "ZIP (expected LZW)".to_string()));
    let (jhove, _) = ledger.check(folder_id, "broken", CheckName::Jhove).unwrap();
    assert_eq!(jhove, CheckResult::Fail);
    let (magick, _) = ledger.check(folder_id, "broken", CheckName::Magick).unwrap();
    assert_eq!(magick, CheckResult::Fail);
    let (good, _) = ledger.check(folder_id, "good", CheckName::TifPages).unwrap();
    assert_eq!(good, CheckResult::Pass);
}

#[test]
fn benign_validator_messages_pass() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    let tools = FakeTools::new().invalid("a", &["Unknown TIFF IFD tag: 50341"]);
    let ledger = MemoryLedger::new("test_project", STANDARD);

    process(&ws.config(), &ledger, tools, folder.path());

    let folder_id = ledger.folder_id("f1").unwrap();
    let (result, _) = ledger.check(folder_id, "a", CheckName::Jhove).unwrap();
    assert_eq!(result, CheckResult::Pass);
}

#[test]
fn low_preview_space_aborts_every_file() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    for stem in ["a", "b", "c"] {
        folder.main(stem);
    }
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let config = ws.config_with_previews(Some(1.0));

    let outcome = process(&config, &ledger, FakeTools::new(), folder.path());

    let folder_id = ledger.folder_id("f1").unwrap();
    assert_eq!(
        outcome,
        FolderOutcome::Completed {
            folder_id,
            files: 3,
            failed_files: 3,
            counts_match: true,
        }
    );
    for file in ledger.files(folder_id) {
        assert!(!file.checks.contains_key(&CheckName::Jhove));
        assert!(file.digests.is_empty());
    }
    assert!(!ws.previews().join(format!("folder{folder_id}")).join("160").exists());
}

#[test]
fn missing_preview_root_is_created_before_checks() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    folder.main("b");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let config = ws.config_with_previews(Some(0.0));
    std::fs::remove_dir_all(ws.previews()).unwrap();

    let outcome = process(&config, &ledger, FakeTools::new(), folder.path());

    let folder_id = ledger.folder_id("f1").unwrap();
    assert!(matches!(outcome, FolderOutcome::Completed { failed_files: 0, .. }));
    assert!(ws.previews().join(format!("folder{folder_id}")).is_dir());
    for stem in ["a", "b"] {
        assert_eq!(
            ledger.check(folder_id, stem, CheckName::Jhove).map(|(r, _)| r),
            Some(CheckResult::Pass)
        );
    }
}

#[test]
fn previews_are_written_per_file_id() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    process(&ws.config_with_previews(None), &ledger, FakeTools::new(), folder.path());

    let folder_id = ledger.folder_id("f1").unwrap();
    let file_id = ledger.file(folder_id, "a").unwrap().file_id;
    let folder_dir = ws.previews().join(format!("folder{folder_id}"));
    assert!(folder_dir.join("160").join(format!("{file_id}.jpg")).is_file());
    assert!(folder_dir.join(format!("{file_id}.dzi")).is_file());
}

#[test]
fn stale_tiles_are_replaced_on_rerun() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let config = ws.config_with_previews(None);

    process(&config, &ledger, FakeTools::new(), folder.path());
    let folder_id = ledger.folder_id("f1").unwrap();
    let file_id = ledger.file(folder_id, "a").unwrap().file_id;
    let tiles = ws.previews().join(format!("folder{folder_id}")).join(format!("{file_id}_files"));
    std::fs::create_dir_all(tiles.join("11")).unwrap();
    std::fs::write(tiles.join("11").join("0_0.jpg"), "old tile").unwrap();

    process(&config, &ledger, FakeTools::new(), folder.path());

    assert!(!tiles.join("11").join("0_0.jpg").exists());
}

#[test]
fn failed_thumbnail_aborts_only_that_file() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    folder.main("b");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let tools = FakeTools::new().no_preview("b");

    let outcome = process(&ws.config_with_previews(None), &ledger, tools, folder.path());

    assert!(matches!(outcome, FolderOutcome::Completed { failed_files: 1, .. }));
    let folder_id = ledger.folder_id("f1").unwrap();
    assert!(ledger.check(folder_id, "a", CheckName::Jhove).is_some());
    assert!(ledger.check(folder_id, "b", CheckName::Jhove).is_none());
}

#[test]
fn matching_manifest_is_valid() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    for i in 1..=5 {
        folder.main(&format!("img_{i:03}"));
    }
    folder.manifest("tifs");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    let record = ledger.folder(ledger.folder_id("f1").unwrap());
    assert_eq!(record.flags.get("tif_md5_exists"), Some(&0));
    assert_eq!(
        record.manifest_results,
        vec![(ManifestScope::Main, true, "Valid".to_string())]
    );
}

#[test]
fn manifest_count_mismatch_is_reported() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    for i in 1..=4 {
        folder.main(&format!("img_{i:03}"));
    }
    folder.manifest("tifs");
    folder.main("img_005");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    let record = ledger.folder(ledger.folder_id("f1").unwrap());
    assert_eq!(
        record.manifest_results,
        vec![(
            ManifestScope::Main,
            false,
            "No. of files (5) mismatch manifest (4)".to_string()
        )]
    );
}

#[test]
fn tampered_file_fails_manifest() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    folder.main("b");
    folder.manifest("tifs");
    folder.file("tifs/b.tif", "changed after delivery");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    let record = ledger.folder(ledger.folder_id("f1").unwrap());
    assert_eq!(
        record.manifest_results,
        vec![(ManifestScope::Main, false, "1 files don't match the manifest".to_string())]
    );
}

#[test]
fn required_manifest_missing_halts() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let mut config = ws.config();
    config.checks.manifest_required = true;

    let outcome = process(&config, &ledger, FakeTools::new(), folder.path());

    let folder_id = ledger.folder_id("f1").unwrap();
    assert_eq!(
        outcome,
        FolderOutcome::Halted {
            folder_id,
            reason: "Manifest missing in tifs".into(),
        }
    );
    assert_eq!(status(&ledger, folder_id).0, FolderStatus::Error);
    assert!(ledger.files(folder_id).is_empty());
    assert_eq!(ledger.folder(folder_id).stats_posts, 1);
}

#[test]
fn extraneous_files_halt() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    folder.file("tifs/a.psd", "layers");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    let outcome = process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    assert!(matches!(outcome, FolderOutcome::Halted { .. }));
    let folder_id = ledger.folder_id("f1").unwrap();
    assert_eq!(
        status(&ledger, folder_id),
        (FolderStatus::Error, "Extraneous files: tifs/a.psd".to_string())
    );
    assert!(ledger.files(folder_id).is_empty());
}

#[test]
fn missing_main_folder_is_a_hard_failure() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.raw("a");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    let folder_id = ledger.folder_id("f1").unwrap();
    assert_eq!(
        status(&ledger, folder_id),
        (FolderStatus::Failed, "Missing MAIN folder in /f1".to_string())
    );
}

#[test]
fn disallowed_characters_halt_with_flag() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a b");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    let outcome = process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    assert!(matches!(outcome, FolderOutcome::Halted { .. }));
    let record = ledger.folder(ledger.folder_id("f1").unwrap());
    assert_eq!(record.flags.get("filename_spaces"), Some(&1));
}

#[test]
fn pairing_reports_missing_raw() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    folder.main("b");
    folder.raw("a");
    let mut checks = STANDARD.to_vec();
    checks.push(CheckName::RawPair);
    let ledger = MemoryLedger::new("test_project", &checks);

    let outcome = process(&ws.config(), &ledger, FakeTools::new(), folder.path());
    assert!(matches!(outcome, FolderOutcome::Completed { counts_match: true, .. }));

    let folder_id = ledger.folder_id("f1").unwrap();
    assert_eq!(
        status(&ledger, folder_id),
        (FolderStatus::Error, "No. of files do not match (main: 2, raws: 1)".to_string())
    );

    let a = ledger.file(folder_id, "a").unwrap();
    assert_eq!(a.checks[&CheckName::RawPair].0, CheckResult::Pass);
    assert!(a.digests.contains_key("raw"));
    assert!(a.sizes.contains_key("iiq"));

    let b = ledger.file(folder_id, "b").unwrap();
    assert_eq!(
        b.checks[&CheckName::RawPair],
        (CheckResult::Fail, format!("Missing raw file for b.tif ({})", b.file_id))
    );
}

#[test]
fn sequence_gaps_fail() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    for stem in ["obj1_a", "obj1_b", "obj2_a"] {
        folder.main(stem);
    }
    let mut checks = STANDARD.to_vec();
    checks.push(CheckName::Sequence);
    let ledger = MemoryLedger::new("test_project", &checks);
    let mut config = ws.config();
    config.sequence = Some(SequenceSpec::new(&["a", "b"], "_"));

    process(&config, &ledger, FakeTools::new(), folder.path());

    let folder_id = ledger.folder_id("f1").unwrap();
    assert_eq!(
        ledger.check(folder_id, "obj1_a", CheckName::Sequence),
        Some((CheckResult::Pass, "Next file in sequence (obj1_b) found".to_string()))
    );
    assert_eq!(
        ledger.check(folder_id, "obj1_b", CheckName::Sequence),
        Some((CheckResult::Pass, "File is the last one in the sequence".to_string()))
    );
    assert_eq!(
        ledger.check(folder_id, "obj2_a", CheckName::Sequence),
        Some((CheckResult::Fail, "Next file in sequence was not found".to_string()))
    );
}

#[test]
fn sequence_results_land_on_the_folders_own_records() {
    let ws = TestWorkspace::new();
    let first = ws.folder("f1");
    first.main("obj_a");
    first.main("obj_b");
    let second = ws.folder("f2");
    second.main("obj_a");
    let mut checks = STANDARD.to_vec();
    checks.push(CheckName::Sequence);
    let ledger = MemoryLedger::new("test_project", &checks);
    let mut config = ws.config();
    config.sequence = Some(SequenceSpec::new(&["a", "b"], "_"));

    process(&config, &ledger, FakeTools::new(), first.path());
    process(&config, &ledger, FakeTools::new(), second.path());
    process(&config, &ledger, FakeTools::new(), first.path());

    let f1 = ledger.folder_id("f1").unwrap();
    let f2 = ledger.folder_id("f2").unwrap();
    for update in ledger.updates() {
        if let Update::FileCheck {
            folder_id,
            file_id,
            check: CheckName::Sequence,
            ..
        } = update
        {
            assert!(
                ledger.files(folder_id).iter().any(|f| f.file_id == file_id),
                "file {file_id} posted under folder {folder_id}"
            );
        }
    }
    assert_eq!(
        ledger.check(f2, "obj_a", CheckName::Sequence),
        Some((CheckResult::Pass, "Next file in sequence (obj_b) found".to_string()))
    );
    assert_eq!(
        ledger.check(f1, "obj_a", CheckName::Sequence),
        Some((CheckResult::Pass, "Next file in sequence (obj_b) found".to_string()))
    );
}

#[test]
fn duplicate_stems_are_flagged_and_processing_continues() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    folder.file("tifs/sub/a.tif", "second copy of a");
    let ledger = MemoryLedger::new("test_project", STANDARD);

    let outcome = process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    let folder_id = ledger.folder_id("f1").unwrap();
    assert_eq!(
        outcome,
        FolderOutcome::Completed {
            folder_id,
            files: 2,
            failed_files: 0,
            counts_match: false,
        }
    );
    assert_eq!(ledger.folder(folder_id).flags.get("duplicate_files"), Some(&1));
    assert!(ledger.check(folder_id, "a", CheckName::Jhove).is_some());
    assert_eq!(
        status(&ledger, folder_id),
        (FolderStatus::Error, "System error".to_string())
    );
}

#[test]
fn stale_ledger_files_are_deleted() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let path = folder.path().to_string_lossy().into_owned();
    let folder_id = ledger.add_folder("f1", &path, None, QC_PENDING);
    let kept = ledger.add_file(folder_id, "a", "tif");
    ledger.add_file(folder_id, "gone", "tif");

    process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    let files = ledger.files(folder_id);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_id, kept);
}

#[test]
fn delivered_and_reviewed_folders_are_skipped() {
    let ws = TestWorkspace::new();
    let ledger = MemoryLedger::new("test_project", STANDARD);

    let delivered = ws.folder("delivered");
    delivered.main("a");
    let delivered_id = ledger.add_folder("delivered", &delivered.path().to_string_lossy(), Some(1), QC_PENDING);

    let reviewed = ws.folder("reviewed");
    reviewed.main("a");
    let reviewed_id = ledger.add_folder("reviewed", &reviewed.path().to_string_lossy(), None, "QC Passed");

    let config = ws.config();
    assert_eq!(
        process(&config, &ledger, FakeTools::new(), delivered.path()),
        FolderOutcome::Skipped {
            folder_id: delivered_id,
            reason: SkipReason::Delivered,
        }
    );
    assert_eq!(
        process(&config, &ledger, FakeTools::new(), reviewed.path()),
        FolderOutcome::Skipped {
            folder_id: reviewed_id,
            reason: SkipReason::QcDone,
        }
    );
    assert!(ledger.updates().is_empty());
}

#[test]
fn clean_folders_can_be_skipped() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let mut config = ws.config();
    config.runtime.skip_clean_folders = true;

    let first = process(&config, &ledger, FakeTools::new(), folder.path());
    assert!(matches!(first, FolderOutcome::Completed { .. }));
    let second = process(&config, &ledger, FakeTools::new(), folder.path());
    assert!(matches!(second, FolderOutcome::Skipped { reason: SkipReason::Clean, .. }));

    folder.main("b");
    let third = process(&config, &ledger, FakeTools::new(), folder.path());
    assert!(matches!(third, FolderOutcome::Completed { files: 2, .. }));
}

#[test]
fn rejected_updates_abort_files_not_the_folder() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    folder.main("b");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    ledger.fail_property(Some("filechecks"));

    let outcome = process(&ws.config(), &ledger, FakeTools::new(), folder.path());

    assert!(matches!(
        outcome,
        FolderOutcome::Completed {
            files: 2,
            failed_files: 2,
            counts_match: true,
            ..
        }
    ));
}

#[test]
fn unreachable_ledger_is_an_error() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    folder.main("a");
    let ledger = MemoryLedger::new("test_project", STANDARD);
    ledger.set_offline(true);
    let tools = FakeTools::new().toolkit();
    let config = ws.config();

    let err = FolderOrchestrator::new(&config, &ledger, &tools)
        .process(folder.path())
        .unwrap_err();
    assert!(matches!(err, osprey_core::Error::Ledger(_)));
    assert!(!err.is_fatal());
}

#[test]
fn parallel_workers_check_every_file() {
    let ws = TestWorkspace::new();
    let folder = ws.folder("f1");
    for i in 0..8 {
        folder.main(&format!("img_{i}"));
    }
    let ledger = MemoryLedger::new("test_project", STANDARD);
    let mut config = ws.config();
    config.runtime.workers = 3;

    let outcome = process(&config, &ledger, FakeTools::new(), folder.path());

    assert!(matches!(outcome, FolderOutcome::Completed { files: 8, failed_files: 0, counts_match: true, .. }));
    let folder_id = ledger.folder_id("f1").unwrap();
    let files = ledger.files(folder_id);
    assert_eq!(files.len(), 8);
    assert!(files.iter().all(|f| f.checks.len() == STANDARD.len() + 1));
}
