//! Project identity: origin sentinel and the hash-collision guard.

use ao_core::id::ProjectId;
use ao_storage::ProjectPaths;
use tempfile::TempDir;

#[test]
fn origin_guard_rejects_a_different_config_for_the_same_state_dir() {
    let tmp = TempDir::new().unwrap();
    let config_a = tmp.path().join("config.yaml");
    let config_b = tmp.path().join("other-config.yaml");
    std::fs::write(&config_a, "projects: {}").unwrap();
    std::fs::write(&config_b, "projects: {}").unwrap();

    let paths = ProjectPaths::new(
        tmp.path().join("state"),
        &config_a,
        ProjectId::new("backend"),
    )
    .unwrap();

    paths.validate_and_store_origin(&config_a).unwrap();

    // Re-initializing with a colliding config must fail before writing
    let origin_before = std::fs::read_to_string(paths.origin_file()).unwrap();
    let err = paths.validate_and_store_origin(&config_b).unwrap_err();
    assert!(err.to_string().contains("Hash collision detected"));
    assert_eq!(
        std::fs::read_to_string(paths.origin_file()).unwrap(),
        origin_before
    );
}

#[test]
fn same_config_revalidates_cleanly_across_invocations() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.yaml");
    std::fs::write(&config, "projects: {}").unwrap();

    for _ in 0..3 {
        let paths = ProjectPaths::new(
            tmp.path().join("state"),
            &config,
            ProjectId::new("backend"),
        )
        .unwrap();
        paths.validate_and_store_origin(&config).unwrap();
    }
}

#[test]
fn state_dirs_are_namespaced_by_config_location() {
    let tmp = TempDir::new().unwrap();
    for dir in ["a", "b"] {
        std::fs::create_dir_all(tmp.path().join(dir)).unwrap();
        std::fs::write(tmp.path().join(dir).join("config.yaml"), "x").unwrap();
    }

    let paths_a = ProjectPaths::new(
        tmp.path().join("state"),
        &tmp.path().join("a/config.yaml"),
        ProjectId::new("backend"),
    )
    .unwrap();
    let paths_b = ProjectPaths::new(
        tmp.path().join("state"),
        &tmp.path().join("b/config.yaml"),
        ProjectId::new("backend"),
    )
    .unwrap();

    assert_ne!(paths_a.base_dir(), paths_b.base_dir());
}
