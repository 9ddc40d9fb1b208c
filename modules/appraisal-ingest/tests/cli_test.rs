// The binary's stdout carries only the JSON summary; logs and errors go to
// stderr. Both cases here fail before a database is needed.

use std::process::Command;

fn ingest_cmd(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_appraisal-ingest"));
    cmd.current_dir(dir.path())
        .env_remove("DATABASE_URL")
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn logs_stay_off_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = ingest_cmd(&dir)
        .args(["--district", "HCAD", "--file", "roll.txt", "--json-logs"])
        .output()
        .expect("run appraisal-ingest");

    assert!(!output.status.success());
    assert!(
        output.stdout.is_empty(),
        "stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Secrets loaded"), "stderr: {stderr}");
    assert!(stderr.contains("DATABASE_URL"), "stderr: {stderr}");
}

#[test]
fn zero_sample_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = ingest_cmd(&dir)
        .args(["--district", "TAD", "--file", "roll.txt", "--sample", "0"])
        .output()
        .expect("run appraisal-ingest");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--sample"));
}
