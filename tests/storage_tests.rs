// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for sequence seeding and the space monitor

use depth_recorder::config::{SpaceBudget, gb_to_bytes};
use depth_recorder::storage::sequence::{highest_index, next_index};
use depth_recorder::storage::space::{SpaceDecision, SpaceMonitor, WalkDirSizer};
use std::path::PathBuf;
use std::time::Duration;

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{}-{}", tag, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_sequence_continues_after_highest() {
    let dir = temp_dir("seq");
    std::fs::write(dir.join("image_7_1718000000000.jpg"), b"").unwrap();
    std::fs::write(dir.join("image_12_1718000000500.jpg"), b"").unwrap();

    assert_eq!(next_index(&dir, "image_"), 13);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_empty_directory_starts_at_one() {
    let dir = temp_dir("seq-empty");
    assert_eq!(next_index(&dir, "image_"), 1);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_malformed_names_do_not_affect_max() {
    let dir = temp_dir("seq-malformed");
    std::fs::write(dir.join("image_3_1.jpg"), b"").unwrap();
    std::fs::write(dir.join("image_final.jpg"), b"").unwrap();
    std::fs::write(dir.join("notes.txt"), b"").unwrap();
    std::fs::write(dir.join("pointcloud_40_1.npy"), b"").unwrap();

    assert_eq!(highest_index(&dir, "image_"), 3);
    assert_eq!(next_index(&dir, "image_"), 4);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_hysteresis_with_default_budget() {
    let mut monitor = SpaceMonitor::new(SpaceBudget::with_ceiling(5.0), Duration::ZERO);

    for (used_gb, expected) in [
        (1.0, SpaceDecision::Record),
        (4.7, SpaceDecision::Record),
        (4.75, SpaceDecision::Pause),
        (4.5, SpaceDecision::Pause),
        (3.5, SpaceDecision::Pause),
        (2.9, SpaceDecision::Record),
        (4.5, SpaceDecision::Record),
    ] {
        assert_eq!(
            monitor.evaluate(Some(gb_to_bytes(used_gb))),
            expected,
            "at {} GB",
            used_gb
        );
    }
}

#[test]
fn test_check_rate_limits_while_recording() {
    let dir = temp_dir("space-rate");
    let mut monitor = SpaceMonitor::new(SpaceBudget::default(), Duration::from_secs(3600));

    assert_eq!(monitor.check(&WalkDirSizer, &dir), SpaceDecision::Record);
    assert_eq!(monitor.last_used(), Some(0));

    std::fs::write(dir.join("frame.bin"), vec![0u8; 64]).unwrap();
    monitor.check(&WalkDirSizer, &dir);
    // Inside the interval the cached measurement is kept
    assert_eq!(monitor.last_used(), Some(0));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_check_measures_real_tree() {
    let dir = temp_dir("space-real");
    std::fs::create_dir_all(dir.join("rgb_images")).unwrap();
    std::fs::create_dir_all(dir.join("point_cloud")).unwrap();
    std::fs::write(dir.join("rgb_images/image_1_0.jpg"), vec![0u8; 1000]).unwrap();
    std::fs::write(dir.join("point_cloud/pointcloud_1_0.npy"), vec![0u8; 24]).unwrap();

    let mut monitor = SpaceMonitor::new(SpaceBudget::default(), Duration::ZERO);
    monitor.check(&WalkDirSizer, &dir);
    assert_eq!(monitor.last_used(), Some(1024));

    std::fs::remove_dir_all(&dir).unwrap();
}
