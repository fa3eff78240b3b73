use std::time::Duration;

use transfer_scanner::{
    Direction::{Received, Sent},
    ScanRequest, ScanStrategy, StopReason, assert_descending, assert_records,
    test_utils::{ACCOUNT, OTHER, TOKEN, default_timestamp},
};

use crate::common::{DEPLOYMENT_BLOCK, ONE_TOKEN, TIP, fixture_ledger, setup_scanner};

#[tokio::test]
async fn returns_all_records_most_recent_first() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(10)).await?;

    assert_records!(
        result.records,
        [(200, Sent), (180, Received), (150, Sent), (120, Received), (100, Sent)]
    );
    assert_eq!(result.address, ACCOUNT);
    assert_eq!(result.contract_address, TOKEN);
    assert_eq!(result.diagnostics.strategy, ScanStrategy::Bounded { limit: 10 });
    assert_eq!(result.diagnostics.stop_reason, StopReason::FloorReached);
    assert!(result.is_complete());

    Ok(())
}

#[tokio::test]
async fn stops_early_once_limit_is_met() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(2)).await?;

    assert_records!(result.records, [(200, Sent), (180, Received)]);
    assert_eq!(result.diagnostics.stop_reason, StopReason::LimitReached);
    let stopped_at = result.diagnostics.stopped_at.expect("scan covered some blocks");
    assert!(stopped_at > 150, "descended to {stopped_at}");
    assert!(scanner.ledger().queried_ranges().iter().all(|range| *range.start() > 150));

    Ok(())
}

#[tokio::test]
async fn repeated_scans_are_identical() -> anyhow::Result<()> {
    let ledger = fixture_ledger().with_latency(Duration::from_millis(2));
    let scanner = setup_scanner(ledger)?;
    let request = ScanRequest::new(ACCOUNT).limit(3);

    let first = scanner.scan_bounded(&request).await?;
    let second = scanner.scan_bounded(&request).await?;

    assert_eq!(first.records, second.records);
    assert_records!(first.records, [(200, Sent), (180, Received), (150, Sent)]);

    Ok(())
}

#[tokio::test]
async fn never_queries_below_deployment_block() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let request = ScanRequest::new(ACCOUNT).from_block(0u64).limit(50);
    let result = scanner.scan_bounded(&request).await?;

    let scanned = result.diagnostics.scanned_range.expect("range is not empty");
    assert_eq!((scanned.from_block, scanned.to_block), (DEPLOYMENT_BLOCK, TIP));
    assert!(scanner.ledger().queried_ranges().iter().all(|r| *r.start() >= DEPLOYMENT_BLOCK));
    assert_eq!(result.diagnostics.stopped_at, Some(DEPLOYMENT_BLOCK));

    Ok(())
}

#[tokio::test]
async fn order_does_not_depend_on_completion_order() -> anyhow::Result<()> {
    let mut ledger = fixture_ledger().with_latency(Duration::from_millis(1));
    for block in (60..250).step_by(7) {
        ledger = ledger.with_transfer(block, OTHER, ACCOUNT, 1);
    }
    let scanner = setup_scanner(ledger)?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(1_000)).await?;

    assert_eq!(result.records.len(), 5 + (60..250).step_by(7).count());
    assert_descending!(result.records);

    Ok(())
}

#[tokio::test]
async fn records_are_enriched() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(10)).await?;

    let by_block = |block| result.records.iter().find(|r| r.block_number == block).unwrap();
    assert_eq!(by_block(100).value_formatted, "1.0");
    assert_eq!(by_block(100).value_raw, ONE_TOKEN.to_string());
    assert_eq!(by_block(150).value_formatted, "0.5");
    assert_eq!(by_block(200).value_formatted, "0.000000000000000001");
    assert_eq!(by_block(180).counterparty_from, OTHER);
    assert_eq!(by_block(180).counterparty_to, ACCOUNT);
    assert!(result.records.iter().all(|r| r.timestamp == default_timestamp(r.block_number)));

    Ok(())
}

#[tokio::test]
async fn timestamps_are_fetched_once_per_block() -> anyhow::Result<()> {
    let ledger = fixture_ledger()
        .with_transfer(180, ACCOUNT, OTHER, 1)
        .with_transfer(180, OTHER, ACCOUNT, 1);
    let scanner = setup_scanner(ledger)?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(10)).await?;

    assert_eq!(result.records.len(), 7);
    // five distinct blocks
    assert_eq!(scanner.ledger().timestamp_queries(), 5);

    Ok(())
}

#[tokio::test]
async fn self_transfer_appears_once() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger().with_transfer(210, ACCOUNT, ACCOUNT, 9))?;

    let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(1)).await?;

    assert_records!(result.records, [(210, Sent)]);

    Ok(())
}

#[tokio::test]
async fn account_without_history_scans_to_the_floor() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let result = scanner.scan_bounded(&ScanRequest::new(TOKEN)).await?;

    assert_records!(result.records, []);
    assert_eq!(result.diagnostics.stop_reason, StopReason::FloorReached);
    assert_eq!(result.diagnostics.stopped_at, Some(DEPLOYMENT_BLOCK));
    assert_eq!(scanner.ledger().timestamp_queries(), 0);

    Ok(())
}
