//! Tests for pipeline.rs

use std::sync::Arc;
use triage_common::{FakeTransport, PipelineSettings, RetryPolicy, Transport, TransportError, TriagePipeline};
use triage_shared::{FailureIdentity, FailureRecord, FailureReference, LibrarySnapshot, ReasonCode};

const BASE: &str = "http://h/develop/";

fn pipeline(fake: Arc<FakeTransport>) -> TriagePipeline {
    let transport: Arc<dyn Transport> = fake;
    TriagePipeline::new(
        transport,
        PipelineSettings {
            concurrency: 3,
            policy: RetryPolicy::immediate(2),
            base_url: BASE.to_string(),
        },
    )
}

fn reference(test: &str, runner: &str, toolset: &str, href: &str) -> FailureReference {
    FailureReference {
        test: test.to_string(),
        runner: runner.to_string(),
        toolset: toolset.to_string(),
        raw_href: href.to_string(),
    }
}

#[tokio::test]
async fn test_triage_classifies_each_failure() {
    let fake = FakeTransport::new()
        .respond("http://h/develop/out/a.html", "Compile [2014-05-01]: fail")
        .respond("http://h/develop/out/b.html", "300 second time limit exceeded")
        .respond("http://h/develop/out/c.html", "gcc: internal compiler error: Segmentation fault")
        .into_shared();
    let refs = vec![
        reference("buffer", "r1", "gcc", "out/a.html"),
        reference("area", "r1", "gcc", "/out/b.html"),
        reference("length", "r2", "clang", "out/c.html"),
    ];

    let outcome = pipeline(Arc::clone(&fake)).triage("geometry", &refs).await;

    let snap = &outcome.snapshot;
    assert_eq!(snap.name, "geometry");
    assert_eq!(snap.len(), 3);
    let reason = |r: &str, t: &str, n: &str| snap.get(&FailureIdentity::new(r, t, n)).unwrap().reason;
    assert_eq!(reason("r1", "gcc", "buffer"), ReasonCode::CompileFail);
    assert_eq!(reason("r1", "gcc", "area"), ReasonCode::Time);
    assert_eq!(reason("r2", "clang", "length"), ReasonCode::InternalError);
    assert_eq!(outcome.fetch.completed, 3);
    assert!(outcome.unfetched.is_empty());
    assert_eq!(outcome.escalation.nested_jobs, 0);
}

#[tokio::test]
async fn test_duplicate_identity_first_wins() {
    let fake = FakeTransport::new()
        .respond("http://h/develop/first.html", "Run [x]: fail")
        .respond("http://h/develop/second.html", "Link [x]: fail")
        .into_shared();
    let refs = vec![
        reference("buffer", "r1", "gcc", "first.html"),
        reference("buffer", "r1", "gcc", "second.html"),
    ];

    let outcome = pipeline(Arc::clone(&fake)).triage("geometry", &refs).await;

    assert_eq!(outcome.snapshot.len(), 1);
    assert_eq!(outcome.duplicates, 1);
    let record = outcome.snapshot.get(&FailureIdentity::new("r1", "gcc", "buffer")).unwrap();
    assert_eq!(record.url, "http://h/develop/first.html");
    assert_eq!(record.reason, ReasonCode::RunFail);
    assert_eq!(fake.call_count("http://h/develop/second.html"), 0);
}

#[tokio::test]
async fn test_unfetchable_log_stays_unknown() {
    let fake = FakeTransport::new()
        .script(
            "http://h/develop/down.html",
            vec![Err(TransportError::Network("connection reset".to_string()))],
        )
        .respond("http://h/develop/up.html", "Link [x]: fail")
        .into_shared();
    let refs = vec![
        reference("a", "r", "t", "down.html"),
        reference("b", "r", "t", "up.html"),
    ];

    let outcome = pipeline(Arc::clone(&fake)).triage("geometry", &refs).await;

    let a = outcome.snapshot.get(&FailureIdentity::new("r", "t", "a")).unwrap();
    let b = outcome.snapshot.get(&FailureIdentity::new("r", "t", "b")).unwrap();
    assert_eq!(a.reason, ReasonCode::Unknown);
    assert_eq!(b.reason, ReasonCode::LinkFail);
    assert_eq!(outcome.unfetched.len(), 1);
    assert!(outcome.unfetched.contains(&FailureIdentity::new("r", "t", "a")));
    assert_eq!(fake.call_count("http://h/develop/down.html"), 3);
}

#[tokio::test]
async fn test_unknown_log_escalates_through_nested_reference() {
    let fake = FakeTransport::new()
        .respond(
            "http://h/develop/out/a.html",
            r#"<p>see <a href="out/a-nested.html">details</a></p>"#,
        )
        .respond("http://h/develop/out/a-nested.html", "Compile [x]: fail")
        .into_shared();
    let refs = vec![reference("buffer", "r1", "gcc", "out/a.html")];

    let outcome = pipeline(Arc::clone(&fake)).triage("geometry", &refs).await;

    let record = outcome.snapshot.get(&FailureIdentity::new("r1", "gcc", "buffer")).unwrap();
    assert_eq!(record.reason, ReasonCode::CompileFail);
    assert_eq!(record.url, "http://h/develop/out/a.html");
    assert_eq!(outcome.escalation.upgraded, 1);
}

#[tokio::test]
async fn test_no_references_gives_empty_snapshot() {
    let fake = FakeTransport::new().into_shared();
    let outcome = pipeline(Arc::clone(&fake)).triage("any", &[]).await;
    assert!(outcome.snapshot.is_empty());
    assert_eq!(fake.total_calls(), 0);
}

#[test]
fn test_records_from_resolves_urls() {
    let fake = FakeTransport::new().into_shared();
    let p = pipeline(fake);
    let refs = vec![
        reference("a", "r", "t", "/developer/output/a.html"),
        reference("b", "r", "t", "http://elsewhere/b.html"),
    ];
    let (snapshot, duplicates) = p.records_from("lib", &refs);
    assert_eq!(duplicates, 0);
    let urls: Vec<&str> = snapshot.records().map(|r| r.url.as_str()).collect();
    assert!(urls.contains(&"http://h/develop/developer/output/a.html"));
    assert!(urls.contains(&"http://elsewhere/b.html"));
    assert!(snapshot.records().all(|r| r.reason == ReasonCode::Unknown));
}

#[tokio::test]
async fn test_settled_snapshot_keeps_previous_reason_for_unfetched() {
    let fake = FakeTransport::new()
        .script(
            "http://h/develop/down.html",
            vec![Err(TransportError::Timeout)],
        )
        .script(
            "http://h/develop/new-down.html",
            vec![Err(TransportError::Timeout)],
        )
        .respond("http://h/develop/up.html", "Run [x]: fail")
        .into_shared();
    let refs = vec![
        reference("a", "r", "t", "down.html"),
        reference("b", "r", "t", "up.html"),
        reference("c", "r", "t", "new-down.html"),
    ];
    let outcome = pipeline(Arc::clone(&fake)).triage("geometry", &refs).await;

    let previous = LibrarySnapshot::from_records(
        "geometry",
        vec![FailureRecord::new(FailureIdentity::new("r", "t", "a"), "http://h/develop/down.html")
            .with_reason(ReasonCode::CompileFail)],
    );
    let settled = outcome.settled(Some(&previous));

    let reason = |n: &str| settled.get(&FailureIdentity::new("r", "t", n)).map(|r| r.reason);
    assert_eq!(reason("a"), Some(ReasonCode::CompileFail));
    assert_eq!(reason("b"), Some(ReasonCode::RunFail));
    assert_eq!(reason("c"), None);

    // Without history, unfetched records are left out entirely
    let first = outcome.settled(None);
    assert_eq!(first.len(), 1);
    assert!(first.contains(&FailureIdentity::new("r", "t", "b")));
}
