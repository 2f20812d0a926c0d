use std::collections::VecDeque;
use std::future::Future;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use volley::aggregate::{AggregatorConfig, StatValue, Statistic};
use volley::data::{Field, PhoutReader};
use volley::join::BoxedSource;
use volley::pipeline::{Pipeline, PipelineConfig, PipelineEvent, PipelineResults, ResultsPoll};
use volley::shutdown::{StopMode, stop_channel};

const WAIT: Duration = Duration::from_secs(5);

/// A result log another process is still appending to.
#[derive(Clone, Default)]
struct LiveLog {
    bytes: Arc<Mutex<VecDeque<u8>>>,
}

impl LiveLog {
    fn append(&self, text: &str) -> Result<(), String> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|err| format!("lock poisoned: {}", err))?;
        bytes.extend(text.as_bytes());
        Ok(())
    }
}

impl Read for LiveLog {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|err| std::io::Error::other(err.to_string()))?;
        let mut read: usize = 0;
        for slot in buf.iter_mut() {
            match bytes.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    read = read.saturating_add(1);
                }
                None => break,
            }
        }
        Ok(read)
    }
}

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn lines(seconds: &[u32]) -> String {
    seconds
        .iter()
        .map(|sec| format!("{}.250\tapi\t500\t1\t2\t400\t3\t450\t10\t20\t0\t200\n", sec))
        .collect()
}

fn len_only() -> Result<AggregatorConfig, String> {
    let config = AggregatorConfig::with_fields([(Field::Latency, vec![Statistic::Len])])
        .map_err(|err| err.to_string())?;
    Ok(AggregatorConfig {
        overall: false,
        ..config
    })
}

fn fast() -> PipelineConfig {
    PipelineConfig {
        poll_interval: Duration::from_millis(2),
        ..PipelineConfig::default()
    }
}

async fn next_result(results: &mut PipelineResults) -> Result<(i64, i64), String> {
    match results.recv_timeout(WAIT).await {
        ResultsPoll::Event(PipelineEvent::Result(result)) => {
            match result.metric(Field::Latency, Statistic::Len) {
                Some(StatValue::Int(len)) => Ok((result.bucket_key, *len)),
                other => Err(format!("Unexpected len: {:?}", other)),
            }
        }
        other => Err(format!("Expected a result, got {:?}", other)),
    }
}

#[test]
fn e2e_closed_logs_are_fully_aggregated() -> Result<(), String> {
    run_async_test(async {
        let mut first = PhoutReader::with_chunk_size("first", Cursor::new(lines(&[1, 1, 3])), 16);
        first.close();
        let mut second = PhoutReader::with_chunk_size("second", Cursor::new(lines(&[2, 3, 4])), 16);
        second.close();
        let sources: Vec<BoxedSource> = vec![Box::new(first), Box::new(second)];

        let pipeline = Pipeline::new(sources, len_only()?, fast()).map_err(|err| err.to_string())?;
        let (_stop_tx, stop_rx) = stop_channel();
        let (mut results, task) = pipeline.spawn(stop_rx);

        let mut got = Vec::new();
        for _ in 0..4 {
            got.push(next_result(&mut results).await?);
        }
        if got != vec![(1, 2), (2, 1), (3, 2), (4, 1)] {
            return Err(format!("Unexpected buckets: {:?}", got));
        }
        if results.recv_timeout(WAIT).await != ResultsPoll::Finished {
            return Err("Results channel did not finish".to_owned());
        }
        let stats = task.wait().await.map_err(|err| err.to_string())?;
        if stats.join.rows != 6 || stats.join.malformed_batches != 0 {
            return Err(format!("Unexpected stats: {:?}", stats));
        }
        Ok(())
    })
}

#[test]
fn e2e_live_log_advances_watermark_and_drains() -> Result<(), String> {
    run_async_test(async {
        let live = LiveLog::default();
        live.append(&lines(&[1, 2]))?;
        let mut finished = PhoutReader::new("finished", Cursor::new(lines(&[1, 2, 3])));
        finished.close();
        let sources: Vec<BoxedSource> = vec![
            Box::new(PhoutReader::new("live", live.clone())),
            Box::new(finished),
        ];

        let pipeline = Pipeline::new(sources, len_only()?, fast()).map_err(|err| err.to_string())?;
        let (stop_tx, stop_rx) = stop_channel();
        let (mut results, task) = pipeline.spawn(stop_rx);

        // Only bucket 1 is below the live source's watermark.
        if next_result(&mut results).await? != (1, 2) {
            return Err("Expected bucket 1 first".to_owned());
        }
        match results.recv_timeout(Duration::from_millis(50)).await {
            ResultsPoll::Timeout => {}
            other => return Err(format!("Bucket released early: {:?}", other)),
        }

        live.append(&lines(&[5]))?;
        let released = [next_result(&mut results).await?, next_result(&mut results).await?];
        if released != [(2, 2), (3, 1)] {
            return Err(format!("Unexpected release: {:?}", released));
        }

        stop_tx.send_replace(StopMode::Drain);
        if next_result(&mut results).await? != (5, 1) {
            return Err("Drain did not flush bucket 5".to_owned());
        }
        let stats = task.wait().await.map_err(|err| err.to_string())?;
        if stats.stopped_by != Some(StopMode::Drain) {
            return Err(format!("Unexpected stop: {:?}", stats));
        }
        Ok(())
    })
}
