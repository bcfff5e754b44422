use clap::Parser;
use fibload::adapters::{bind_shared, LocalStorage};
use fibload::app::bench::{save_json, BenchTarget};
use fibload::app::server;
use fibload::core::{LoadExecutor, SearchLimits, Storage};
use fibload::domain::bench::{BenchmarkReport, CaseKind, Execution};
use fibload::domain::model::RouteStyle;
use fibload::{run_bench, AppState, BenchCli, Settings};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Starts one self-recursive in-process worker that rejects `n` above `max_fibonacci_n`.
async fn start_worker(max_fibonacci_n: u64) -> SocketAddr {
    let listener = bind_shared("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();

    let settings = Settings {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
        service_url: format!("http://{}", addr),
        max_fibonacci_n,
        request_timeout_secs: 30,
        ..Settings::default()
    };

    let state = Arc::new(AppState::from_settings(&settings).unwrap());
    tokio::spawn(server::serve(listener, state));
    addr
}

fn bench_target(addr: SocketAddr, duration: Duration) -> BenchTarget {
    BenchTarget {
        url: format!("http://{}", addr),
        route_style: RouteStyle::Path,
        request_timeout: Duration::from_secs(10),
        duration_per_test: duration,
    }
}

fn relaxed_limits() -> SearchLimits {
    SearchLimits {
        max_avg_response_secs: 5.0,
        max_power: 1,
        min_requests_per_second: 2,
        rest: Duration::ZERO,
        ..SearchLimits::default()
    }
}

#[tokio::test]
async fn test_fixed_rate_execution_against_worker() {
    let addr = start_worker(40).await;
    let runner = bench_target(addr, Duration::from_millis(500))
        .runner(CaseKind::Fibonacci)
        .unwrap();

    let execution = runner.execute(10, 8).await.unwrap();

    assert_eq!(execution.test_case_name, "FibonacciTestCase");
    assert!(execution.errors.is_empty(), "{:?}", execution.errors);
    assert_eq!(execution.results.len(), 5);
    assert!(execution.results.iter().all(|s| s.load == 8));
    assert!(execution
        .results
        .windows(2)
        .all(|w| w[0].request_span.start <= w[1].request_span.start));
    assert!(!execution.exceeds(5.0));
}

#[tokio::test]
async fn test_bubble_sort_execution_against_worker() {
    let addr = start_worker(40).await;
    let runner = bench_target(addr, Duration::from_millis(500))
        .runner(CaseKind::BubbleSort)
        .unwrap();

    let execution = runner.execute(4, 10).await.unwrap();

    assert_eq!(execution.test_case_name, "BubbleSortTestCase");
    assert!(execution.errors.is_empty(), "{:?}", execution.errors);
    assert_eq!(execution.results.len(), 2);
}

#[tokio::test]
async fn test_rejected_requests_count_as_errors() {
    let addr = start_worker(3).await;
    let runner = bench_target(addr, Duration::from_millis(500))
        .runner(CaseKind::Fibonacci)
        .unwrap();

    let execution = runner.execute(4, 4).await.unwrap();

    assert!(execution.results.is_empty());
    assert_eq!(execution.errors.len(), 2);
    assert!(execution.errors[0].contains("400"));
    assert!(execution.exceeds(5.0));
}

#[tokio::test]
async fn test_max_rate_search_against_worker() {
    let addr = start_worker(40).await;
    let planner = bench_target(addr, Duration::from_millis(500))
        .planner(CaseKind::Fibonacci, relaxed_limits())
        .unwrap();

    let execution = planner.find_max_requests_per_second(3, 0).await.unwrap();

    assert_eq!(execution.requests_per_second, 2);
    assert_eq!(execution.load, 3);
    assert!(!execution.exceeds(5.0));
}

#[tokio::test]
async fn test_benchmark_against_worker_is_stored() {
    let addr = start_worker(3).await;
    let target = bench_target(addr, Duration::from_millis(500));

    let report = fibload::app::bench::benchmark_cases(
        &target,
        &[CaseKind::Fibonacci],
        &relaxed_limits(),
    )
    .await
    .unwrap();

    assert_eq!(report.benchmarks.len(), 1);
    let executions = &report.benchmarks[0].test_executions;
    let loads: Vec<u64> = executions.iter().map(|e| e.load).collect();
    // load 4 is the first one the worker rejects
    assert_eq!(loads, vec![4, 3, 2]);
    assert!(executions[0].has_errors());
    assert!(executions[1..].iter().all(|e| e.requests_per_second == 2));

    let dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(dir.path().to_string_lossy().to_string());
    let file_name = save_json(&storage, "benchmark", &report).await.unwrap();

    let saved: BenchmarkReport =
        serde_json::from_slice(&storage.read_file(&file_name).await.unwrap()).unwrap();
    assert_eq!(saved.target, target.url);
    assert_eq!(saved.benchmarks[0].test_executions.len(), 3);
}

#[tokio::test]
async fn test_cli_test_execution_writes_result_file() {
    let addr = start_worker(40).await;
    let dir = TempDir::new().unwrap();
    let storage_dir = dir.path().join("db");

    let cli = BenchCli::try_parse_from([
        "fibload-bench",
        "test-execution",
        "--load",
        "5",
        "--requests-per-second",
        "2",
        "--duration-per-test",
        "1",
        "--url",
        &format!("http://{}", addr),
        "--storage",
        storage_dir.to_str().unwrap(),
    ])
    .unwrap();

    let file_name = run_bench(&cli).await.unwrap();
    assert!(file_name.ends_with("_test_execution.json"));

    let data = std::fs::read(storage_dir.join(&file_name)).unwrap();
    let execution: Execution = serde_json::from_slice(&data).unwrap();
    assert_eq!(execution.load, 5);
    assert_eq!(execution.requests_per_second, 2);
    assert_eq!(execution.results.len(), 2);
    assert!(execution.errors.is_empty());
}
