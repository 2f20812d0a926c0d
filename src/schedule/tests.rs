use super::*;

#[test]
fn parse_duration_composite_tokens() -> Result<(), String> {
    let cases: [(&str, u64); 8] = [
        ("3h2m3s", 10_923_000),
        ("0.3s", 300),
        ("5", 5_000),
        ("250ms", 250),
        ("1d", 86_400_000),
        ("1m30", 90_000),
        ("0", 0),
        (" 10s ", 10_000),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_ms(input).map_err(|err| err.to_string())?;
        if parsed != expected {
            return Err(format!(
                "parse_duration_ms({:?}) = {}, expected {}",
                input, parsed, expected
            ));
        }
    }
    Ok(())
}

#[test]
fn parse_duration_rejects_garbage() -> Result<(), String> {
    for input in ["", "s", "-5s", "5x", "1.2.3s", "10w"] {
        if parse_duration_ms(input).is_ok() {
            return Err(format!("Expected '{}' to be rejected", input));
        }
    }
    match parse_duration_ms("5x") {
        Err(ScheduleError::InvalidDurationUnit { unit, .. }) if unit == "x" => Ok(()),
        other => Err(format!("Unexpected result: {:?}", other)),
    }
}

#[test]
fn parse_rate_steps() -> Result<(), String> {
    let steps = parse_schedule(&["const(100, 10s)", "line(1, 10, 5m)", " step(1, 5, 1, 5s) "])
        .map_err(|err| err.to_string())?;
    let expected = vec![
        ScheduleStep::Const {
            rate: 100.0,
            duration_ms: 10_000,
        },
        ScheduleStep::Line {
            rate_start: 1.0,
            rate_end: 10.0,
            duration_ms: 300_000,
        },
        ScheduleStep::Stairway {
            rate_start: 1.0,
            rate_end: 5.0,
            step_size: 1.0,
            step_duration_ms: 5_000,
        },
    ];
    if steps != expected {
        return Err(format!("Unexpected steps: {:?}", steps));
    }
    Ok(())
}

#[test]
fn parse_instance_steps() -> Result<(), String> {
    let steps =
        parse_schedule(&["start(10)", "ramp(5,4s)", "wait(30s)"]).map_err(|err| err.to_string())?;
    let expected = vec![
        ScheduleStep::InstanceStart { count: 10 },
        ScheduleStep::InstanceRamp {
            count: 5,
            duration_ms: 4_000,
        },
        ScheduleStep::Wait {
            duration_ms: 30_000,
        },
    ];
    if steps != expected {
        return Err(format!("Unexpected steps: {:?}", steps));
    }
    Ok(())
}

#[test]
fn negative_start_parses_and_is_left_to_the_builder() -> Result<(), String> {
    let step: ScheduleStep = "start(-3)".parse().map_err(|err: ScheduleError| err.to_string())?;
    if step != (ScheduleStep::InstanceStart { count: -3 }) {
        return Err(format!("Unexpected step: {:?}", step));
    }
    Ok(())
}

#[test]
fn rejects_malformed_steps() -> Result<(), String> {
    let cases = [
        "",
        "const 100, 10s",
        "const(100, 10s",
        "burst(1, 2s)",
        "const(100)",
        "line(1, 2, 3, 4s)",
        "const(-1, 10s)",
        "const(abc, 10s)",
        "const(inf, 10s)",
        "step(1, 5, 0, 5s)",
        "start(1.5)",
    ];
    for input in cases {
        if input.parse::<ScheduleStep>().is_ok() {
            return Err(format!("Expected '{}' to be rejected", input));
        }
    }
    match "burst(1, 2s)".parse::<ScheduleStep>() {
        Err(ScheduleError::UnknownStepType { name }) if name == "burst" => Ok(()),
        other => Err(format!("Unexpected result: {:?}", other)),
    }
}

#[test]
fn display_round_trips_through_parser() -> Result<(), String> {
    for input in ["const(100, 10s)", "line(1, 5, 1500ms)", "wait(2s)", "ramp(4, 1s)"] {
        let step: ScheduleStep = input.parse().map_err(|err: ScheduleError| err.to_string())?;
        let reparsed: ScheduleStep = step
            .to_string()
            .parse()
            .map_err(|err: ScheduleError| err.to_string())?;
        if reparsed != step {
            return Err(format!("'{}' reparsed as {:?}", input, reparsed));
        }
    }
    Ok(())
}
