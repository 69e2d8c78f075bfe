#[test]
fn paperscan_version_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("paperscan");
    let out = std::process::Command::new(bin)
        .args(["version"])
        .output()
        .expect("run paperscan version");

    assert!(out.status.success(), "paperscan version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse version json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("version"));
    assert_eq!(v["name"].as_str(), Some("paperscan"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn paperscan_version_text_output() {
    let bin = assert_cmd::cargo::cargo_bin!("paperscan");
    let out = std::process::Command::new(bin)
        .args(["version", "--output", "text"])
        .output()
        .expect("run paperscan version");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("paperscan "));
}
