
use std::fs;

use serde_json::Value;
use tempfile::tempdir;

use support_cli::{phout_line, run_volley, success_stdout};

#[test]
fn e2e_plan_prints_timestamps() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let output = run_volley(dir.path(), ["plan", "const(5, 1s)", "wait(1s)", "const(2, 1s)"])?;
    let stdout = success_stdout(&output)?;
    let got: Vec<&str> = stdout.lines().collect();
    let expected = ["0", "200", "400", "600", "800", "2000", "2500"];
    if got != expected {
        return Err(format!("Unexpected timestamps: {:?}", got));
    }
    Ok(())
}

#[test]
fn e2e_plan_limit_truncates_output() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let output = run_volley(dir.path(), ["plan", "const(1000, 1h)", "--limit", "3"])?;
    let stdout = success_stdout(&output)?;
    if stdout != "0\n1\n2\n" {
        return Err(format!("Unexpected output: {:?}", stdout));
    }
    Ok(())
}

#[test]
fn e2e_plan_info_is_json() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let output = run_volley(dir.path(), ["plan", "--info", "line(1, 5, 2s)"])?;
    let stdout = success_stdout(&output)?;
    let info: Value =
        serde_json::from_str(&stdout).map_err(|err| format!("invalid JSON: {}", err))?;
    if info.get("total_count") != Some(&Value::from(6))
        || info.get("duration_ms") != Some(&Value::from(2000))
    {
        return Err(format!("Unexpected info: {}", info));
    }
    Ok(())
}

#[test]
fn e2e_instances_prints_start_events() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let output = run_volley(dir.path(), ["instances", "start(1)", "ramp(2, 2s)"])?;
    let stdout = success_stdout(&output)?;
    if stdout != "0\t1\n0\t2\n1000\t3\n" {
        return Err(format!("Unexpected events: {:?}", stdout));
    }
    Ok(())
}

#[test]
fn e2e_plan_falls_back_to_config_schedule() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    fs::write(
        dir.path().join("volley.toml"),
        "rps_schedule = [\"const(2, 1s)\"]\n",
    )
    .map_err(|err| format!("write config failed: {}", err))?;
    let output = run_volley(dir.path(), ["plan"])?;
    let stdout = success_stdout(&output)?;
    if stdout != "0\n500\n" {
        return Err(format!("Unexpected output: {:?}", stdout));
    }
    Ok(())
}

#[test]
fn e2e_plan_without_steps_fails() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let output = run_volley(dir.path(), ["plan"])?;
    if output.status.success() {
        return Err("plan without steps succeeded".to_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.contains("rps_schedule") {
        return Err(format!("Unexpected stderr: {}", stderr));
    }
    Ok(())
}

#[test]
fn e2e_aggregate_joins_phout_files() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let first = [
        phout_line("1.000", "search#0", 200),
        phout_line("1.500", "search#1", 200),
        phout_line("2.200", "search#2", 500),
    ]
    .concat();
    let second = [
        phout_line("1.100", "login", 200),
        phout_line("2.500", "login", 200),
        phout_line("3.000", "login", 200),
    ]
    .concat();
    fs::write(dir.path().join("a.phout"), first).map_err(|err| format!("write failed: {}", err))?;
    fs::write(dir.path().join("b.phout"), second)
        .map_err(|err| format!("write failed: {}", err))?;

    let output = run_volley(dir.path(), ["aggregate", "a.phout", "b.phout"])?;
    let stdout = success_stdout(&output)?;
    let mut got = Vec::new();
    for line in stdout.lines() {
        let result: Value =
            serde_json::from_str(line).map_err(|err| format!("invalid JSONL: {}", err))?;
        let key = result.get("bucket_key").and_then(Value::as_i64);
        let tag = result
            .get("tag")
            .map(|tag| tag.as_str().unwrap_or("*").to_owned());
        let len = result
            .pointer("/metrics/interval_real/len")
            .and_then(Value::as_i64);
        got.push((key, tag, len));
    }
    let expected = vec![
        (Some(1), Some("*".to_owned()), Some(3)),
        (Some(1), Some("login".to_owned()), Some(1)),
        (Some(1), Some("search".to_owned()), Some(2)),
        (Some(2), Some("*".to_owned()), Some(2)),
        (Some(2), Some("login".to_owned()), Some(1)),
        (Some(2), Some("search".to_owned()), Some(1)),
        (Some(3), Some("*".to_owned()), Some(1)),
        (Some(3), Some("login".to_owned()), Some(1)),
    ];
    if got != expected {
        return Err(format!("Unexpected results: {:?}", got));
    }
    Ok(())
}

#[test]
fn e2e_aggregate_missing_file_fails() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let output = run_volley(dir.path(), ["aggregate", "missing.phout"])?;
    if output.status.success() {
        return Err("aggregate over a missing file succeeded".to_owned());
    }
    Ok(())
}

#[test]
fn e2e_aggregate_unreadable_input_terminates() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    fs::create_dir(dir.path().join("not_a_log"))
        .map_err(|err| format!("create dir failed: {}", err))?;
    // A directory opens as a file on unix but every read fails.
    let output = run_volley(dir.path(), ["aggregate", "not_a_log"])?;
    let stdout = success_stdout(&output)?;
    if !stdout.trim().is_empty() {
        return Err(format!("Unexpected results from an unreadable input: {}", stdout));
    }
    Ok(())
}
