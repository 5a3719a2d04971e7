//! Integration tests for ufdrfs-cli.
//!
//! Mount success requires a FUSE device, so these exercise argument
//! handling and mount-setup failures only.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use ufdrfs_core::test_utils::create_test_zip;

fn ufdrfs_cmd() -> Command {
    cargo_bin_cmd!("ufdrfs")
}

fn write_zip(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, create_test_zip(vec![("file.txt", b"hello")])).unwrap();
    path
}

#[test]
fn test_version_flag() {
    ufdrfs_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ufdrfs"));
}

#[test]
fn test_help_flag() {
    ufdrfs_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mount ZIP and UFDR archives"));
}

#[test]
fn test_missing_args_fail() {
    ufdrfs_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_nonexistent_archive_fails() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let mountpoint = temp.path().join("mnt");
    fs::create_dir(&mountpoint).unwrap();

    ufdrfs_cmd()
        .arg(temp.path().join("missing.zip"))
        .arg(&mountpoint)
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}

#[test]
fn test_archive_without_signature_fails() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = temp.path().join("notes.txt");
    fs::write(&archive, b"This file has no zip signature.\n").unwrap();
    let mountpoint = temp.path().join("mnt");
    fs::create_dir(&mountpoint).unwrap();

    ufdrfs_cmd()
        .arg(&archive)
        .arg(&mountpoint)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No ZIP payload"));
}

#[test]
fn test_missing_mountpoint_fails() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_zip(&temp, "ok.zip");

    ufdrfs_cmd()
        .arg(&archive)
        .arg(temp.path().join("missing-mnt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_nonempty_mountpoint_fails() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_zip(&temp, "ok.zip");
    let mountpoint = temp.path().join("mnt");
    fs::create_dir(&mountpoint).unwrap();
    fs::write(mountpoint.join("occupied"), b"x").unwrap();

    ufdrfs_cmd()
        .arg(&archive)
        .arg(&mountpoint)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not empty"));
}
