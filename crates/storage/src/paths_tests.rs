// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn project_paths(tmp: &TempDir) -> ProjectPaths {
    let config = tmp.path().join("config.json");
    std::fs::write(&config, "{}").unwrap();
    ProjectPaths::new(tmp.path().join("state"), &config, ProjectId::new("backend")).unwrap()
}

// ── Hashing ──────────────────────────────────────────────────────────────────

#[test]
fn hash_is_stable_across_invocations() {
    let path = Path::new("/srv/projects/backend");
    assert_eq!(hash_of(path), hash_of(path));
}

#[test]
fn hash_is_twelve_lowercase_hex_digits() {
    let hash = hash_of(Path::new("/anything"));
    assert_eq!(hash.len(), 12);
    assert!(hash
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn different_paths_hash_differently() {
    assert_ne!(hash_of(Path::new("/a")), hash_of(Path::new("/b")));
}

#[test]
fn config_hash_follows_symlinks() {
    let tmp = TempDir::new().unwrap();
    let real_dir = tmp.path().join("real");
    std::fs::create_dir(&real_dir).unwrap();
    std::fs::write(real_dir.join("config.json"), "{}").unwrap();

    let link_dir = tmp.path().join("link");
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&real_dir, &link_dir).unwrap();
        let via_real = config_hash(&real_dir.join("config.json")).unwrap();
        let via_link = config_hash(&link_dir.join("config.json")).unwrap();
        assert_eq!(via_real, via_link);
    }
}

// ── Names ────────────────────────────────────────────────────────────────────

#[test]
fn session_name_shape() {
    assert_eq!(session_name("be", 7), "be-7");
}

#[test]
fn tmux_name_roundtrip() {
    let name = tmux_name("a1b2c3d4e5f6", "be", 12);
    assert_eq!(name, "a1b2c3d4e5f6-be-12");
    assert_eq!(
        parse_tmux_name(&name),
        Some(("a1b2c3d4e5f6".into(), "be".into(), 12))
    );
}

#[test]
fn tmux_name_parse_handles_hyphenated_prefix() {
    assert_eq!(
        parse_tmux_name("a1b2c3d4e5f6-my-app-3"),
        Some(("a1b2c3d4e5f6".into(), "my-app".into(), 3))
    );
}

#[yare::parameterized(
    short_hash    = { "abc-be-1" },
    no_number     = { "a1b2c3d4e5f6-be" },
    bad_number    = { "a1b2c3d4e5f6-be-x" },
    uppercase_hex = { "A1B2C3D4E5F6-be-1" },
    not_hex       = { "g1b2c3d4e5f6-be-1" },
)]
fn tmux_name_parse_rejects(name: &str) {
    assert_eq!(parse_tmux_name(name), None);
}

// ── Prefix derivation ────────────────────────────────────────────────────────

#[yare::parameterized(
    short_as_is          = { "api", "api" },
    short_lowercased     = { "API", "api" },
    four_chars           = { "Demo", "demo" },
    camel_case           = { "myProjectName", "pn" },
    pascal_case          = { "MyCoolApp", "mca" },
    kebab_segments       = { "my-cool-app", "mca" },
    snake_segments       = { "my_cool_app", "mca" },
    plain_word           = { "backend", "bac" },
    uppercase_word       = { "BACKEND", "bac" },
    single_upper_long    = { "Backendapp", "bac" },
    empty_segments       = { "a--big--app", "aba" },
)]
fn prefix_rules(project_id: &str, expected: &str) {
    assert_eq!(derive_session_prefix(project_id), expected);
}

// ── Layout ───────────────────────────────────────────────────────────────────

#[test]
fn layout_hangs_off_the_slug() {
    let tmp = TempDir::new().unwrap();
    let paths = project_paths(&tmp);

    let base = paths.base_dir();
    assert!(base.ends_with(paths.slug()));
    assert_eq!(paths.sessions_dir(), base.join("sessions"));
    assert_eq!(paths.archive_dir(), base.join("sessions/archive"));
    assert_eq!(paths.plans_dir(), base.join("sessions/plans"));
    assert_eq!(paths.worktrees_dir(), base.join("worktrees"));
    assert_eq!(
        paths.outcome_log_file(),
        base.join("metrics/outcome-transitions.jsonl")
    );
}

#[test]
fn session_file_rejects_unsafe_ids_without_touching_fs() {
    let tmp = TempDir::new().unwrap();
    let paths = project_paths(&tmp);

    for bad in ["../escape", "a/b", "", "a b"] {
        assert!(matches!(
            paths.session_file(bad),
            Err(PathsError::InvalidId(_))
        ));
    }
    // state dir was never created
    assert!(!paths.base_dir().exists());
}

#[test]
fn slug_combines_hash_and_project() {
    let tmp = TempDir::new().unwrap();
    let paths = project_paths(&tmp);
    assert_eq!(paths.slug(), format!("{}-backend", paths.hash()));
}

// ── Origin guard ─────────────────────────────────────────────────────────────

#[test]
fn origin_written_on_first_use_and_accepted_on_reuse() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.json");
    std::fs::write(&config, "{}").unwrap();
    let paths =
        ProjectPaths::new(tmp.path().join("state"), &config, ProjectId::new("backend")).unwrap();

    paths.validate_and_store_origin(&config).unwrap();
    let recorded = std::fs::read_to_string(paths.origin_file()).unwrap();
    assert!(recorded.ends_with('\n'));

    // Same config validates again
    paths.validate_and_store_origin(&config).unwrap();
}

#[test]
fn origin_mismatch_is_a_collision() {
    let tmp = TempDir::new().unwrap();
    let config_a = tmp.path().join("config.json");
    let config_b = tmp.path().join("other.json");
    std::fs::write(&config_a, "{}").unwrap();
    std::fs::write(&config_b, "{}").unwrap();

    let paths =
        ProjectPaths::new(tmp.path().join("state"), &config_a, ProjectId::new("backend")).unwrap();
    paths.validate_and_store_origin(&config_a).unwrap();

    let err = paths.validate_and_store_origin(&config_b).unwrap_err();
    assert!(err.to_string().contains("Hash collision detected"));
}
