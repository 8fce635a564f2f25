use assert_cmd::Command;

#[test]
fn watch_prints_requested_ticks() {
    let output = Command::new(assert_cmd::cargo::cargo_bin!("perfwatch-cli"))
        .args(["--no-color", "watch", "--period-ms", "100", "--count", "3"])
        .env("PERFWATCH_CONFIG", "/nonexistent/perfwatch.toml")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("TIME"));
    assert!(lines.len() >= 4, "expected header plus 3 ticks, got {stdout}");
}
