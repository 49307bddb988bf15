// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-temp-then-rename helper shared by the snapshot writer and the
//! Persister (spec §4.7: "The write is atomic per file").

use std::io;
use std::path::Path;

/// Write `bytes` to `path` atomically: write to a sibling `.tmp-<pid>-<n>`
/// file in the same directory, then rename over the destination.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let tmp_name = format!(".tmp-{}-{}", std::process::id(), n);
    let tmp_path = dir.join(tmp_name);

    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_file_with_expected_contents() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("nested").join("out.json");
        write_atomic(&path, b"hello").expect("write_atomic failed");
        assert_eq!(std::fs::read(&path).expect("read failed"), b"hello");
    }

    #[test]
    fn leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("out.json");
        write_atomic(&path, b"x").expect("write_atomic failed");
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir failed")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["out.json"]);
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("out.json");
        write_atomic(&path, b"first").expect("write_atomic failed");
        write_atomic(&path, b"second").expect("write_atomic failed");
        assert_eq!(std::fs::read(&path).expect("read failed"), b"second");
    }
}
