use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

const WIDTH: i64 = DEFAULT_BUCKET_WIDTH_US;

fn row(timestamp_us: i64, tag: &str) -> ResultRow {
    ResultRow {
        timestamp_us,
        tag: tag.to_owned(),
        ..ResultRow::default()
    }
}

fn ready_secs(secs: &[i64]) -> SourcePoll {
    SourcePoll::Ready(Batch::new(
        secs.iter().map(|sec| row(sec.saturating_mul(WIDTH), "")).collect(),
    ))
}

fn source(label: &str, polls: Vec<SourcePoll>) -> BoxedSource {
    Box::new(IterSource::new(label, polls))
}

fn keys(buckets: &[Bucket]) -> Vec<i64> {
    buckets.iter().map(|bucket| bucket.key).collect()
}

fn run_to_end(joiner: &mut TimeWindowJoiner) -> Result<Vec<Bucket>, String> {
    let mut out = Vec::new();
    for _ in 0..100_000 {
        let cycle = joiner.poll_cycle().map_err(|err| err.to_string())?;
        out.extend(cycle.buckets);
        if cycle.finished {
            return Ok(out);
        }
    }
    Err("Joiner never finished".to_owned())
}

#[test]
fn watermark_holds_back_the_slowest_source() -> Result<(), String> {
    let mut joiner = TimeWindowJoiner::new(
        vec![
            source("fast", vec![ready_secs(&[1, 2, 3, 4, 5])]),
            source("slow", vec![ready_secs(&[1, 2]), SourcePoll::Pending]),
        ],
        WIDTH,
    )
    .map_err(|err| err.to_string())?;

    let first = joiner.poll_cycle().map_err(|err| err.to_string())?;
    if keys(&first.buckets) != vec![1] {
        return Err(format!("Expected only bucket 1, got {:?}", keys(&first.buckets)));
    }
    if !first.progressed || first.finished {
        return Err(format!("Unexpected cycle flags: {:?}", first));
    }

    // "fast" is exhausted now and "slow" is pending: the watermark stays at 1.
    let second = joiner.poll_cycle().map_err(|err| err.to_string())?;
    if !second.buckets.is_empty() || second.progressed {
        return Err(format!("Expected an idle cycle, got {:?}", second));
    }
    if joiner.active_sources() != 1 {
        return Err(format!("Expected 1 active source, got {}", joiner.active_sources()));
    }

    let rest = run_to_end(&mut joiner)?;
    if keys(&rest) != vec![2, 3, 4, 5] {
        return Err(format!("Unexpected flush: {:?}", keys(&rest)));
    }
    match rest.first() {
        Some(bucket) if bucket.rows.len() == 2 => Ok(()),
        other => Err(format!("Bucket 2 should hold rows from both sources: {:?}", other)),
    }
}

#[test]
fn silent_source_blocks_release() -> Result<(), String> {
    let mut joiner = TimeWindowJoiner::new(
        vec![
            source("talker", vec![ready_secs(&[1, 2, 3]), ready_secs(&[4, 5])]),
            source(
                "mute",
                vec![SourcePoll::Pending, SourcePoll::Pending, ready_secs(&[3])],
            ),
        ],
        WIDTH,
    )
    .map_err(|err| err.to_string())?;
    for _ in 0..2 {
        let cycle = joiner.poll_cycle().map_err(|err| err.to_string())?;
        if !cycle.buckets.is_empty() {
            return Err(format!("Released before every source reported: {:?}", cycle));
        }
    }
    let cycle = joiner.poll_cycle().map_err(|err| err.to_string())?;
    if keys(&cycle.buckets) != vec![1, 2] {
        return Err(format!("Unexpected release: {:?}", keys(&cycle.buckets)));
    }
    Ok(())
}

#[test]
fn late_row_is_fatal() -> Result<(), String> {
    let mut joiner = TimeWindowJoiner::new(
        vec![
            source("a", vec![ready_secs(&[1, 5]), ready_secs(&[6])]),
            source("b", vec![ready_secs(&[5]), ready_secs(&[1])]),
        ],
        WIDTH,
    )
    .map_err(|err| err.to_string())?;
    let first = joiner.poll_cycle().map_err(|err| err.to_string())?;
    if keys(&first.buckets) != vec![1] {
        return Err(format!("Unexpected release: {:?}", keys(&first.buckets)));
    }
    match joiner.poll_cycle() {
        Err(JoinError::LateRow {
            source_label,
            key: 1,
            emitted_through: 1,
        }) if source_label == "b" => Ok(()),
        Err(err) => Err(format!("Unexpected error: {}", err)),
        Ok(cycle) => Err(format!("Late row accepted: {:?}", cycle)),
    }
}

#[test]
fn regression_above_emitted_buckets_is_merged() -> Result<(), String> {
    let mut joiner = TimeWindowJoiner::new(
        vec![
            source("a", vec![ready_secs(&[8]), ready_secs(&[6])]),
            source("b", vec![ready_secs(&[5]), ready_secs(&[9])]),
        ],
        WIDTH,
    )
    .map_err(|err| err.to_string())?;
    let buckets = run_to_end(&mut joiner)?;
    if keys(&buckets) != vec![5, 6, 8, 9] {
        return Err(format!("Unexpected buckets: {:?}", keys(&buckets)));
    }
    if joiner.stats().regressions != 1 {
        return Err(format!("Expected one regression, got {:?}", joiner.stats()));
    }
    Ok(())
}

#[test]
fn malformed_batches_are_dropped() -> Result<(), String> {
    let mut joiner = TimeWindowJoiner::new(
        vec![source(
            "flaky",
            vec![
                ready_secs(&[1]),
                SourcePoll::Malformed(DataError::UnorderedBatch {
                    source_label: "flaky".to_owned(),
                }),
                ready_secs(&[2]),
            ],
        )],
        WIDTH,
    )
    .map_err(|err| err.to_string())?;
    let buckets = run_to_end(&mut joiner)?;
    if keys(&buckets) != vec![1, 2] || joiner.stats().malformed_batches != 1 {
        return Err(format!(
            "Unexpected result: {:?}, {:?}",
            keys(&buckets),
            joiner.stats()
        ));
    }
    Ok(())
}

#[test]
fn duplicate_labels_are_rejected() -> Result<(), String> {
    match TimeWindowJoiner::new(vec![source("x", vec![]), source("x", vec![])], WIDTH) {
        Err(JoinError::DuplicateSource { label }) if label == "x" => Ok(()),
        Err(err) => Err(format!("Unexpected error: {}", err)),
        Ok(_) => Err("Duplicate labels accepted".to_owned()),
    }
}

#[test]
fn negative_timestamps_bucket_downwards() -> Result<(), String> {
    let joiner = TimeWindowJoiner::new(Vec::new(), WIDTH).map_err(|err| err.to_string())?;
    let cases = [(0, 0), (999_999, 0), (1_000_000, 1), (-1, -1), (-1_000_000, -1)];
    for (timestamp, expected) in cases {
        let key = joiner.bucket_key(timestamp);
        if key != expected {
            return Err(format!("bucket_key({}) = {}, expected {}", timestamp, key, expected));
        }
    }
    Ok(())
}

#[test]
fn randomized_split_is_complete() -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut all_rows: Vec<ResultRow> = Vec::new();
    for sec in 0..100_i64 {
        let count = rng.gen_range(0..20);
        for idx in 0..count {
            let offset = rng.gen_range(0..WIDTH);
            all_rows.push(row(
                sec.saturating_mul(WIDTH).saturating_add(offset),
                &format!("r{}-{}", sec, idx),
            ));
        }
    }
    all_rows.sort_by_key(|row| row.timestamp_us);

    let mut streams: [Vec<ResultRow>; 2] = [Vec::new(), Vec::new()];
    for row in &all_rows {
        let target = usize::from(rng.gen_bool(0.5));
        if let Some(stream) = streams.get_mut(target) {
            stream.push(row.clone());
        }
    }

    let mut sources = Vec::new();
    for (label, stream) in ["left", "right"].into_iter().zip(streams) {
        let mut polls = Vec::new();
        let mut remaining = stream.into_iter().peekable();
        while remaining.peek().is_some() {
            if rng.gen_bool(0.3) {
                polls.push(SourcePoll::Pending);
            }
            let take = rng.gen_range(1..40);
            let chunk: Vec<ResultRow> = remaining.by_ref().take(take).collect();
            polls.push(SourcePoll::Ready(Batch::new(chunk)));
        }
        sources.push(source(label, polls));
    }

    let mut joiner = TimeWindowJoiner::new(sources, WIDTH).map_err(|err| err.to_string())?;
    let buckets = run_to_end(&mut joiner)?;

    if buckets.windows(2).any(|pair| matches!(pair, [a, b] if a.key >= b.key)) {
        return Err(format!("Buckets not strictly ascending: {:?}", keys(&buckets)));
    }

    let mut expected: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for row in &all_rows {
        expected
            .entry(row.timestamp_us.div_euclid(WIDTH))
            .or_default()
            .push(row.tag.clone());
    }
    let mut got: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for bucket in buckets {
        let mut tags: Vec<String> = bucket.rows.into_iter().map(|row| row.tag).collect();
        tags.sort();
        got.insert(bucket.key, tags);
    }
    for tags in expected.values_mut() {
        tags.sort();
    }
    if got != expected {
        return Err(format!(
            "Join lost or duplicated rows: {} buckets expected, {} emitted",
            expected.len(),
            got.len()
        ));
    }
    Ok(())
}
