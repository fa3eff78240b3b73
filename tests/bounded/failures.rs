use transfer_scanner::{
    BlockSpec,
    Direction::{Received, Sent},
    FailureKind, InvalidRange, ScanRequest, ScannerError, StopReason, assert_records,
    test_utils::ACCOUNT,
};

use crate::common::{TIP, fixture_ledger, setup_scanner};

#[tokio::test]
async fn inverted_range_is_rejected_before_any_query() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let request = ScanRequest::new(ACCOUNT).from_block(200u64).to_block(100u64);
    let err = scanner.scan_bounded(&request).await.unwrap_err();

    assert_eq!(err, ScannerError::InvalidRange(InvalidRange::Inverted { from: 200, to: 100 }));
    assert!(err.is_invalid_range());
    assert!(!scanner.ledger().was_queried());

    Ok(())
}

#[tokio::test]
async fn pending_is_rejected() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let request = ScanRequest::new(ACCOUNT).to_block(BlockSpec::Pending);
    let err = scanner.scan_bounded(&request).await.unwrap_err();

    assert_eq!(err, ScannerError::InvalidRange(InvalidRange::Pending("to_block")));
    assert!(!scanner.ledger().was_queried());

    Ok(())
}

#[tokio::test]
async fn from_block_above_tip_is_rejected() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let request = ScanRequest::new(ACCOUNT).from_block(TIP + 10);
    let err = scanner.scan_bounded(&request).await.unwrap_err();

    assert_eq!(
        err,
        ScannerError::InvalidRange(InvalidRange::ExceedsTip("from_block", TIP + 10, TIP))
    );
    assert_eq!(scanner.ledger().event_queries(), 0);

    Ok(())
}

#[tokio::test]
async fn unreachable_tip_fails_the_scan() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger().with_failing_tip())?;

    let err = scanner.scan_bounded(&ScanRequest::new(ACCOUNT)).await.unwrap_err();

    assert!(matches!(err, ScannerError::LedgerUnavailable(_)), "got {err:?}");
    assert_eq!(scanner.ledger().event_queries(), 0);

    Ok(())
}

#[tokio::test]
async fn failed_chunk_is_reported_and_skipped() -> anyhow::Result<()> {
    // chunks of 25 from the tip: 176..=200 holds 180 and 200
    let scanner = setup_scanner(fixture_ledger().with_failing_range(190..=190))?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(10)).await?;

    assert_records!(result.records, [(150, Sent), (120, Received), (100, Sent)]);
    assert!(!result.is_complete());
    let failed = &result.diagnostics.failed_chunks;
    assert_eq!(failed.len(), 1);
    assert_eq!((failed[0].chunk.from_block, failed[0].chunk.to_block), (176, 200));
    assert_eq!(failed[0].kind, FailureKind::Fetch);
    assert_eq!(result.diagnostics.stop_reason, StopReason::FloorReached);

    Ok(())
}

#[tokio::test]
async fn timestamp_failure_fails_its_chunk() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger().with_failing_timestamp(120))?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(10)).await?;

    // 101..=125 is lost; 100 sits in 76..=100
    assert_records!(result.records, [(200, Sent), (180, Received), (150, Sent), (100, Sent)]);
    let failed = &result.diagnostics.failed_chunks;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind, FailureKind::Timestamp);
    assert_eq!((failed[0].chunk.from_block, failed[0].chunk.to_block), (101, 125));

    Ok(())
}

#[tokio::test]
async fn too_large_chunk_is_shrunk_and_recovered() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger().with_max_range(10))?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(10)).await?;

    assert_records!(
        result.records,
        [(200, Sent), (180, Received), (150, Sent), (120, Received), (100, Sent)]
    );
    assert!(result.is_complete());
    assert!(result.diagnostics.chunking.shrink_retries > 0);
    assert!(scanner.ledger().queried_ranges().iter().any(|r| r.end() - r.start() < 10));

    Ok(())
}
