//! Tests for escalation.rs

use std::collections::HashMap;
use std::sync::Arc;
use triage_common::{Escalation, EscalationEngine, FakeTransport, RetryPolicy, Transport};
use triage_shared::{FailureIdentity, FailureRecord, LibrarySnapshot, ReasonCode};

const BASE: &str = "http://h/develop/";

fn engine(fake: Arc<FakeTransport>) -> EscalationEngine {
    let transport: Arc<dyn Transport> = fake;
    EscalationEngine::new(transport, 4, RetryPolicy::immediate(1), BASE)
}

fn parent(reason: ReasonCode) -> FailureRecord {
    FailureRecord::new(FailureIdentity::new("runner", "gcc", "buffer"), "http://h/develop/log.html")
        .with_reason(reason)
}

fn setup(record: FailureRecord, body: &str) -> (LibrarySnapshot, HashMap<FailureIdentity, String>) {
    let mut logs = HashMap::new();
    logs.insert(record.identity.clone(), body.to_string());
    (LibrarySnapshot::from_records("geometry", vec![record]), logs)
}

#[tokio::test]
async fn test_unknown_takes_most_important_nested_reason() {
    let fake = FakeTransport::new()
        .respond("http://h/develop/nested/1.html", "Run [x]: fail")
        .respond("http://h/develop/nested/2.html", "Link [x]: fail")
        .into_shared();
    let body = r#"see <a href="/nested/1.html">run</a> and <a href="nested/2.html">link</a>"#;
    let (mut snapshot, logs) = setup(parent(ReasonCode::Unknown), body);

    let report = engine(Arc::clone(&fake)).escalate(&mut snapshot, &logs).await;

    let id = FailureIdentity::new("runner", "gcc", "buffer");
    assert_eq!(snapshot.get(&id).unwrap().reason, ReasonCode::LinkFail);
    assert_eq!(report.nested_jobs, 2);
    assert_eq!(report.upgraded, 1);
}

#[tokio::test]
async fn test_classified_records_are_not_escalated() {
    let fake = FakeTransport::new()
        .respond("http://h/develop/nested.html", "Compile [x]: fail")
        .into_shared();
    let body = r#"Run [x]: fail <a href="nested.html">details</a>"#;
    let (mut snapshot, logs) = setup(parent(ReasonCode::RunFail), body);

    let report = engine(Arc::clone(&fake)).escalate(&mut snapshot, &logs).await;

    let id = FailureIdentity::new("runner", "gcc", "buffer");
    assert_eq!(snapshot.get(&id).unwrap().reason, ReasonCode::RunFail);
    assert_eq!(report.nested_jobs, 0);
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_no_references_keeps_unknown() {
    let fake = FakeTransport::new().into_shared();
    let (mut snapshot, logs) = setup(parent(ReasonCode::Unknown), "nothing useful here");

    let report = engine(fake).escalate(&mut snapshot, &logs).await;

    let id = FailureIdentity::new("runner", "gcc", "buffer");
    assert_eq!(snapshot.get(&id).unwrap().reason, ReasonCode::Unknown);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.upgraded, 0);
}

#[tokio::test]
async fn test_less_important_nested_reason_never_lowers() {
    let fake = FakeTransport::new()
        .respond("http://h/develop/t.html", "300 second time limit exceeded")
        .into_shared();
    let (mut snapshot, logs) = setup(parent(ReasonCode::Unknown), r#"<a href="t.html">t</a>"#);

    engine(fake).escalate(&mut snapshot, &logs).await;

    let id = FailureIdentity::new("runner", "gcc", "buffer");
    assert_eq!(snapshot.get(&id).unwrap().reason, ReasonCode::Unknown);
}

#[tokio::test]
async fn test_failed_nested_fetch_keeps_unknown() {
    let fake = FakeTransport::new().into_shared();
    let (mut snapshot, logs) = setup(parent(ReasonCode::Unknown), r#"<a href="gone.html">x</a>"#);

    let report = engine(Arc::clone(&fake)).escalate(&mut snapshot, &logs).await;

    let id = FailureIdentity::new("runner", "gcc", "buffer");
    assert_eq!(snapshot.get(&id).unwrap().reason, ReasonCode::Unknown);
    assert_eq!(report.pool.dropped, 1);
}

#[tokio::test]
async fn test_only_one_level_is_followed() {
    let fake = FakeTransport::new()
        .respond("http://h/develop/level1.html", r#"no verdict <a href="level2.html">more</a>"#)
        .respond("http://h/develop/level2.html", "Compile [x]: fail")
        .into_shared();
    let (mut snapshot, logs) = setup(parent(ReasonCode::Unknown), r#"<a href="level1.html">x</a>"#);

    engine(Arc::clone(&fake)).escalate(&mut snapshot, &logs).await;

    let id = FailureIdentity::new("runner", "gcc", "buffer");
    assert_eq!(snapshot.get(&id).unwrap().reason, ReasonCode::Unknown);
    assert_eq!(fake.call_count("http://h/develop/level2.html"), 0);
}

#[test]
fn test_plan_skips_self_reference() {
    let mut escalation = Escalation::new(BASE);
    let record = parent(ReasonCode::Unknown);
    let jobs = escalation.plan(&record, r#"<a href="log.html">self</a><a href="other.html">o</a>"#);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].url, "http://h/develop/other.html");
    assert_eq!(jobs[0].tag, record.identity);
}

#[test]
fn test_observe_and_apply_is_monotonic() {
    let record = parent(ReasonCode::Unknown);
    let mut snapshot = LibrarySnapshot::from_records("geometry", vec![record.clone()]);

    let mut escalation = Escalation::new(BASE);
    escalation.plan(&record, r#"<a href="a.html">a</a><a href="b.html">b</a>"#);
    assert_eq!(escalation.observe(&record.identity, "Compile [x]: fail"), ReasonCode::CompileFail);
    assert_eq!(escalation.observe(&record.identity, "Run [x]: fail"), ReasonCode::RunFail);

    assert_eq!(escalation.apply(&mut snapshot), 1);
    assert_eq!(snapshot.get(&record.identity).unwrap().reason, ReasonCode::CompileFail);
}
