#![forbid(unsafe_code)]

//! Every source file of the harness forbids `unsafe`, and the workspace
//! ships the license file its manifests point at.

use std::fs;
use std::path::{Path, PathBuf};

fn rust_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("readable source dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn every_module_forbids_unsafe_code() {
    let mut files = Vec::new();
    rust_sources(&Path::new(env!("CARGO_MANIFEST_DIR")).join("src"), &mut files);
    assert!(files.len() >= 15, "{files:?}");
    for file in files {
        let source = fs::read_to_string(&file).expect("readable source");
        assert!(
            source.starts_with("#![forbid(unsafe_code)]"),
            "{} lacks #![forbid(unsafe_code)]",
            file.display()
        );
    }
}

#[test]
fn license_file_ships_with_the_workspace() {
    let license = include_str!("../../../LICENSE");
    assert!(license.starts_with("MIT License"));
}
