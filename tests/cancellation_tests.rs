//! Cancellation and back-pressure behaviour

use analytics_result::testing::{ResponseDocument, ScriptedSource};
use analytics_result::{Phase, QueryResult, ResponseMetadata, Row, Status, StreamConfig};
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use std::time::Duration;
use tokio_test::{assert_pending, task};

fn many_rows(count: usize) -> String {
    ResponseDocument::new()
        .signature(json!({"*": "*"}))
        .results((0..count).map(|i| json!({"i": i})).collect())
        .errors(vec![json!({"code": 1, "msg": "never reached"})])
        .status("success")
        .build()
}

#[tokio::test]
async fn test_cancelling_rows_stops_reading_and_completes_others() {
    let source = ScriptedSource::from_document(many_rows(500), 16);
    let probe = source.probe();
    let total = source.total_chunks();
    let config = StreamConfig::default().with_row_buffer(4);
    let result = QueryResult::open(source, ResponseMetadata::default(), &config).await;

    let errors = result.errors();
    let mut rows = result.rows();
    for expected in 0..3 {
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.value(), &json!({"i": expected}));
    }
    drop(rows);

    let errors: Vec<_> = errors.try_collect().await.unwrap();
    assert!(errors.is_empty());
    assert_eq!(result.signature().await.unwrap(), Some(json!({"*": "*"})));
    assert_eq!(result.status().await, Status::Stopped);
    assert!(!result.final_success().await);

    assert!(probe.chunks_read() < total / 4);
    assert_eq!(probe.cancels(), 1);
}

#[tokio::test]
async fn test_slow_consumer_holds_back_the_producer() {
    let source = ScriptedSource::from_document(many_rows(200), 8);
    let probe = source.probe();
    let total = source.total_chunks();
    let config = StreamConfig::default().with_row_buffer(2);
    let result = QueryResult::open(source, ResponseMetadata::default(), &config).await;
    let rows = result.rows();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let read_while_idle = probe.chunks_read();
    assert!(read_while_idle < total / 4);

    let rows: Vec<Row> = rows.try_collect().await.unwrap();
    assert_eq!(rows.len(), 200);
    assert_eq!(probe.chunks_read(), total);
    assert_eq!(result.status().await, Status::Success);
    assert_eq!(probe.cancels(), 1);
}

#[tokio::test]
async fn test_status_waits_until_terminal() {
    let source = ScriptedSource::from_document(r#"{"results":[1,"#, 64).then_hang();
    let probe = source.probe();
    let result = QueryResult::open(source, ResponseMetadata::default(), &StreamConfig::default()).await;
    assert!(result.parse_success());

    let mut rows = result.rows();
    assert_eq!(rows.next().await.unwrap().unwrap().value(), &json!(1));

    {
        let mut status = task::spawn(result.status());
        assert_pending!(status.poll());
        let mut final_success = task::spawn(result.final_success());
        assert_pending!(final_success.poll());
    }
    assert_ne!(result.phase(), Phase::Terminal);

    result.cancel();
    assert_eq!(result.status().await, Status::Stopped);
    assert!(rows.next().await.is_none());
    assert_eq!(result.phase(), Phase::Terminal);
    assert_eq!(probe.cancels(), 1);
}

#[tokio::test]
async fn test_dropping_the_result_releases_the_source() {
    let source = ScriptedSource::from_document(r#"{"results":["#, 64).then_hang();
    let probe = source.probe();
    let result = QueryResult::open(source, ResponseMetadata::default(), &StreamConfig::default()).await;
    let rows = result.rows();

    drop(result);
    let rows: Vec<Row> = rows.try_collect().await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(probe.cancels(), 1);
}

#[tokio::test]
async fn test_cancel_after_terminal_changes_nothing() {
    let doc = ResponseDocument::new()
        .results(vec![json!(1)])
        .status("success")
        .build();
    let source = ScriptedSource::from_document(doc, 8);
    let probe = source.probe();
    let result = QueryResult::open(source, ResponseMetadata::default(), &StreamConfig::default()).await;

    assert_eq!(result.status().await, Status::Success);
    result.cancel();
    assert_eq!(result.status().await, Status::Success);
    assert!(result.final_success().await);
    assert_eq!(probe.cancels(), 1);
}

#[tokio::test]
async fn test_dropping_an_error_subscription_does_not_stall_rows() {
    let doc = ResponseDocument::new()
        .errors((0..50).map(|i| json!({"code": i, "msg": "w"})).collect())
        .results((0..50).map(|i| json!(i)).collect())
        .status("errors")
        .build();
    let config = StreamConfig::default().with_error_buffer(2).with_row_buffer(2);
    let result = QueryResult::open(
        ScriptedSource::from_document(doc, 16),
        ResponseMetadata::default(),
        &config,
    )
    .await;

    let mut errors = result.errors();
    assert!(errors.next().await.unwrap().is_ok());
    drop(errors);

    let rows: Vec<Row> = result.rows().try_collect().await.unwrap();
    assert_eq!(rows.len(), 50);
    assert_eq!(result.status().await, Status::Errors);
}
