use chrono::Utc;
use futures::future::join_all;
use prometheus::core::Collector as _;
use speedtest_exporter_collector::{
    speedtest::{
        mock_result,
        MockSpeedtest,
    },
    ResultCache,
    Speedtest,
    SpeedtestCollector,
};
use std::{
    path::Path,
    sync::Arc,
    time::Duration,
};
use temp_dir::TempDir;

const CACHE_TIME: Duration = Duration::from_secs(5 * 60);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scrapes_trigger_a_single_speedtest() {
    let speedtest = Arc::new(MockSpeedtest::new(mock_result(Utc::now())).with_delay(Duration::from_millis(300)));
    let provider: Arc<dyn Speedtest> = speedtest.clone();
    let cache = Arc::new(ResultCache::new(false, None, CACHE_TIME));
    let collector = Arc::new(SpeedtestCollector::new(Some(cache), Some(provider), "testinstance").unwrap());

    let tasks = (0..16).map(|_| {
        let collector = Arc::clone(&collector);
        tokio::task::spawn_blocking(move || collector.result())
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();

    assert_eq!(speedtest.runs(), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
}

#[test]
fn persisted_result_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.child("speedtest-result.json");

    let first_run = Arc::new(MockSpeedtest::new(mock_result(Utc::now())));
    let provider: Arc<dyn Speedtest> = first_run.clone();
    let cache = Arc::new(ResultCache::new(true, Some(path.clone()), CACHE_TIME));
    let collector = SpeedtestCollector::new(Some(cache), Some(provider), "testinstance").unwrap();
    let expected = collector.result();
    assert_eq!(first_run.runs(), 1);

    // A restarted process picks up the stored result instead of measuring again.
    let second_run = Arc::new(MockSpeedtest::new(mock_result(Utc::now())));
    let provider: Arc<dyn Speedtest> = second_run.clone();
    let cache = Arc::new(ResultCache::new(true, Some(path), CACHE_TIME));
    let collector = SpeedtestCollector::new(Some(cache), Some(provider), "testinstance").unwrap();

    assert_eq!(*collector.result(), *expected);
    assert_eq!(second_run.runs(), 0);
}

#[test]
fn failing_speedtest_never_raises() {
    let speedtest: Arc<dyn Speedtest> = Arc::new(MockSpeedtest::failing());
    let cache = Arc::new(ResultCache::new(false, None, CACHE_TIME));
    let collector = SpeedtestCollector::new(Some(cache), Some(speedtest), "testinstance").unwrap();

    for _ in 0..3 {
        let families = collector.collect();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), "speedtest_up");
        assert_eq!(families[0].get_metric()[0].get_gauge().get_value(), 0.0);
    }
}

#[test]
fn out_of_range_record_is_replaced_by_a_new_run() {
    for name in ["result-max-duration.json", "result-min-duration.json", "result-max-timestamp.json"] {
        let dir = TempDir::new().unwrap();
        let path = dir.child("speedtest-result.json");
        std::fs::copy(Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name), &path).unwrap();

        let speedtest = Arc::new(MockSpeedtest::new(mock_result(Utc::now())));
        let provider: Arc<dyn Speedtest> = speedtest.clone();
        let cache = Arc::new(ResultCache::new(true, Some(path), CACHE_TIME));
        let collector = SpeedtestCollector::new(Some(cache), Some(provider), "testinstance").unwrap();

        let families = collector.collect();

        let up = families
            .iter()
            .find(|f| f.get_name() == "speedtest_up")
            .unwrap_or_else(|| panic!("{name}: speedtest_up missing"));
        assert_eq!(up.get_metric()[0].get_gauge().get_value(), 1.0, "{name}");
        assert_eq!(families.len(), 6, "{name}");
        assert_eq!(speedtest.runs(), 1, "{name}");
    }
}
