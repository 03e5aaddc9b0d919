use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use probe_engine::{
    ChannelStatusSink, DispatcherConfig, DispatcherHandle, ProbeOutcome, ProbeStatus, Prober,
    StatusChange,
};

/// Poll `cond` until it holds or `timeout` elapses.
fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

fn fast_config(limit: usize) -> DispatcherConfig {
    DispatcherConfig {
        concurrency_limit: limit,
        poll_interval: Duration::from_millis(50),
        ..DispatcherConfig::default()
    }
}

fn channel_sink() -> (Arc<ChannelStatusSink>, mpsc::Receiver<StatusChange>) {
    let (tx, rx) = mpsc::channel();
    (Arc::new(ChannelStatusSink::new(tx)), rx)
}

/// Succeeds after a fixed delay, recording the peak number of concurrent
/// probe bodies.
struct CountingProber {
    active: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl CountingProber {
    fn new(delay: Duration) -> Self {
        Self {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait::async_trait]
impl Prober for CountingProber {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        ProbeOutcome::Succeeded
    }
}

/// Fails URLs containing "bad", succeeds everything else, immediately.
struct FlakyProber;

#[async_trait::async_trait]
impl Prober for FlakyProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        if url.contains("bad") {
            ProbeOutcome::failed("connection refused")
        } else {
            ProbeOutcome::Succeeded
        }
    }
}

/// Panics when invoked; used to prove a drain cycle launched nothing.
struct UnreachableProber;

#[async_trait::async_trait]
impl Prober for UnreachableProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        panic!("probe launched unexpectedly for {url}");
    }
}

fn all_terminal(handle: &DispatcherHandle) -> bool {
    let rows = handle.snapshot();
    !rows.is_empty() && rows.iter().all(|row| row.status.is_terminal())
}

#[test]
fn ten_urls_never_exceed_concurrency_limit_of_five() {
    probe_logging::initialize_for_tests();
    let prober = Arc::new(CountingProber::new(Duration::from_millis(100)));
    let (sink, _rx) = channel_sink();
    let handle =
        DispatcherHandle::spawn_with_prober(fast_config(5), sink, prober.clone()).expect("spawn");

    let urls: Vec<String> = (0..10)
        .map(|n| format!("http://host{n}.example.com/"))
        .collect();
    assert_eq!(handle.enqueue_all(&urls), 10);

    assert!(wait_until(Duration::from_secs(5), || all_terminal(&handle)));
    assert_eq!(prober.peak.load(Ordering::SeqCst), 5);

    for row in handle.snapshot() {
        assert_eq!(row.status, ProbeStatus::Succeeded);
    }
    handle.stop();
}

#[test]
fn refused_connection_fails_with_reason_and_restores_idle() {
    let (sink, _rx) = channel_sink();
    let handle = DispatcherHandle::spawn(fast_config(5), sink).expect("spawn");

    // Bind then drop a listener so the port is closed.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let url = format!("http://127.0.0.1:{port}/");
    handle.enqueue(&url);

    assert!(wait_until(Duration::from_secs(5), || all_terminal(&handle)));
    match handle.status_of(&url) {
        Some(ProbeStatus::Failed(reason)) => assert!(!reason.is_empty()),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(wait_until(Duration::from_secs(1), || handle.is_idle()));
    handle.stop();
}

#[test]
fn empty_drain_completes_with_no_status_changes() {
    let (sink, rx) = channel_sink();
    let handle =
        DispatcherHandle::spawn_with_prober(fast_config(5), sink, Arc::new(UnreachableProber))
            .expect("spawn");

    handle.drain_now();
    std::thread::sleep(Duration::from_millis(200));

    assert!(handle.is_idle());
    assert!(handle.snapshot().is_empty());
    assert!(rx.try_recv().is_err());
    handle.stop();
}

#[test]
fn re_enqueue_walks_the_full_transition_sequence_again() {
    let (sink, rx) = channel_sink();
    let handle =
        DispatcherHandle::spawn_with_prober(fast_config(5), sink, Arc::new(FlakyProber))
            .expect("spawn");

    let url = "http://good.example.com/";
    handle.enqueue(url);
    assert!(wait_until(Duration::from_secs(5), || {
        handle.status_of(url) == Some(ProbeStatus::Succeeded)
    }));

    handle.enqueue(url);
    assert!(wait_until(Duration::from_secs(5), || {
        handle.status_of(url) == Some(ProbeStatus::Succeeded)
    }));
    handle.stop();

    let observed: Vec<ProbeStatus> = rx.try_iter().map(|change| change.status).collect();
    assert_eq!(
        observed,
        vec![
            ProbeStatus::Pending,
            ProbeStatus::Probing,
            ProbeStatus::Succeeded,
            ProbeStatus::Pending,
            ProbeStatus::Probing,
            ProbeStatus::Succeeded,
        ]
    );
}

#[test]
fn one_failing_url_does_not_poison_the_others() {
    let (sink, _rx) = channel_sink();
    let handle =
        DispatcherHandle::spawn_with_prober(fast_config(2), sink, Arc::new(FlakyProber))
            .expect("spawn");

    handle.enqueue_all([
        "http://good-one.example.com/",
        "http://bad.example.com/",
        "http://good-two.example.com/",
    ]);

    assert!(wait_until(Duration::from_secs(5), || all_terminal(&handle)));
    assert_eq!(
        handle.status_of("http://good-one.example.com/"),
        Some(ProbeStatus::Succeeded)
    );
    assert_eq!(
        handle.status_of("http://bad.example.com/"),
        Some(ProbeStatus::Failed("connection refused".to_string()))
    );
    assert_eq!(
        handle.status_of("http://good-two.example.com/"),
        Some(ProbeStatus::Succeeded)
    );
    handle.stop();
}

#[test]
fn batch_duplicates_collapse_to_a_single_entry() {
    let (sink, _rx) = channel_sink();
    let handle =
        DispatcherHandle::spawn_with_prober(fast_config(5), sink, Arc::new(FlakyProber))
            .expect("spawn");

    let accepted = handle.enqueue_all([
        "http://dup.example.com/",
        "  http://dup.example.com/  ",
        "http://dup.example.com/",
    ]);
    assert_eq!(accepted, 1);

    assert!(wait_until(Duration::from_secs(5), || all_terminal(&handle)));
    assert_eq!(handle.snapshot().len(), 1);
    handle.stop();
}

#[test]
fn stop_lets_in_flight_probes_finish() {
    let prober = Arc::new(CountingProber::new(Duration::from_millis(200)));
    let (sink, rx) = channel_sink();
    let handle =
        DispatcherHandle::spawn_with_prober(fast_config(1), sink, prober).expect("spawn");

    let url = "http://slow.example.com/";
    handle.enqueue(url);
    assert!(wait_until(Duration::from_secs(2), || {
        handle.status_of(url) == Some(ProbeStatus::Probing)
    }));
    handle.stop();

    // `stop` waits for the in-flight probe, so its terminal transition must
    // already have been delivered.
    let observed: Vec<ProbeStatus> = rx.try_iter().map(|change| change.status).collect();
    assert_eq!(observed.last(), Some(&ProbeStatus::Succeeded));
}
