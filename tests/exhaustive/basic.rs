use std::time::Duration;

use transfer_scanner::{
    BlockSpec,
    Direction::{Received, Sent},
    ScanStrategy, SingleShotOutcome, StopReason, assert_records,
    test_utils::ACCOUNT,
};

use crate::common::{DEPLOYMENT_BLOCK, TIP, fixture_ledger, scanner_builder, setup_scanner};

#[tokio::test]
async fn floor_is_clamped_to_deployment_block() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let result = scanner.scan_exhaustive(ACCOUNT, 0u64, BlockSpec::Latest).await?;

    assert_records!(
        result.records,
        [(200, Sent), (180, Received), (150, Sent), (120, Received), (100, Sent)]
    );
    let scanned = result.diagnostics.scanned_range.expect("range is not empty");
    assert_eq!((scanned.from_block, scanned.to_block), (DEPLOYMENT_BLOCK, TIP));
    assert!(scanner.ledger().queried_ranges().iter().all(|r| *r.start() >= DEPLOYMENT_BLOCK));
    assert_eq!(result.diagnostics.strategy, ScanStrategy::Exhaustive);
    assert_eq!(result.diagnostics.stop_reason, StopReason::Completed);
    assert_eq!(result.diagnostics.stopped_at, Some(TIP));

    Ok(())
}

#[tokio::test]
async fn chunked_scan_matches_single_shot() -> anyhow::Result<()> {
    let single_shot = setup_scanner(fixture_ledger())?;
    let chunked = scanner_builder().single_shot(false).connect(fixture_ledger())?;

    let a = single_shot.scan_exhaustive(ACCOUNT, BlockSpec::Earliest, BlockSpec::Latest).await?;
    let b = chunked.scan_exhaustive(ACCOUNT, BlockSpec::Earliest, BlockSpec::Latest).await?;

    assert_eq!(a.records, b.records);
    assert_eq!(a.diagnostics.chunking.single_shot, SingleShotOutcome::Succeeded);
    assert_eq!(b.diagnostics.chunking.single_shot, SingleShotOutcome::NotAttempted);
    // 201 blocks in chunks of 40
    assert_eq!(b.diagnostics.chunking.chunks_fetched, 6);

    Ok(())
}

#[tokio::test]
async fn explicit_range_is_respected() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let result = scanner.scan_exhaustive(ACCOUNT, 110u64, 190u64).await?;

    assert_records!(result.records, [(180, Received), (150, Sent), (120, Received)]);
    assert!(scanner.ledger().queried_ranges().iter().all(|r| *r.start() >= 110 && *r.end() <= 190));

    Ok(())
}

#[tokio::test]
async fn chunks_are_read_one_at_a_time() -> anyhow::Result<()> {
    let ledger = fixture_ledger().with_latency(Duration::from_millis(1));
    let scanner = scanner_builder().single_shot(false).connect(ledger)?;

    scanner.scan_exhaustive(ACCOUNT, BlockSpec::Earliest, BlockSpec::Latest).await?;

    // the two directional queries of a chunk run together
    assert!(scanner.ledger().max_in_flight() <= 2);

    Ok(())
}

#[tokio::test]
async fn floor_above_end_returns_empty_result() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger())?;

    let result = scanner.scan_exhaustive(ACCOUNT, 0u64, 40u64).await?;

    assert_records!(result.records, []);
    assert_eq!(result.diagnostics.stop_reason, StopReason::EmptyRange);
    assert_eq!(result.diagnostics.scanned_range, None);
    assert_eq!(scanner.ledger().event_queries(), 0);

    Ok(())
}
