use assert_cmd::Command;
use std::io::Write;

#[test]
fn runs_a_raw_image_to_max_cycles() {
    let mut image = tempfile::NamedTempFile::new().unwrap();
    // `wfi`, repeated: parks immediately and never wakes, so the run ends
    // via the all-harts-parked path well before `--max_cycles`.
    image.write_all(&0x1050_0073u32.to_le_bytes()).unwrap();
    image.flush().unwrap();

    Command::cargo_bin("et-sysemu")
        .unwrap()
        .arg("--file_load")
        .arg(format!("0x4000000000,{}", image.path().display()))
        .arg("--shires")
        .arg("0x1")
        .arg("--minions")
        .arg("0x1")
        .arg("--single_thread")
        .arg("--max_cycles")
        .arg("1000")
        .arg("--dram_size")
        .arg("4096")
        .assert()
        .success();
}

#[test]
fn rejects_missing_image_arguments() {
    Command::cargo_bin("et-sysemu").unwrap().assert().failure();
}
