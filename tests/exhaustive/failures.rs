use transfer_scanner::{
    BlockSpec,
    Direction::{Received, Sent},
    FailureKind, SingleShotOutcome, assert_records,
    test_utils::ACCOUNT,
};

use crate::common::{fixture_ledger, scanner_builder, setup_scanner};

#[tokio::test]
async fn range_too_large_region_is_isolated() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger().with_too_large_range(150..=200))?;

    let result = scanner.scan_exhaustive(ACCOUNT, 0u64, BlockSpec::Latest).await?;

    // the first probe (50..=149) is accepted, everything touching 150..=200 keeps failing
    assert_eq!(
        result.diagnostics.chunking.single_shot,
        SingleShotOutcome::RangeTooLarge { accepted_width: Some(100) }
    );
    assert_records!(result.records, [(120, Received), (100, Sent)]);
    assert!(result.diagnostics.chunking.shrink_retries > 0);

    let failed = &result.diagnostics.failed_chunks;
    assert!(!failed.is_empty());
    assert!(failed.iter().all(|f| f.kind == FailureKind::RangeTooLarge));
    let lowest = failed.iter().map(|f| f.chunk.from_block).min();
    let highest = failed.iter().map(|f| f.chunk.to_block).max();
    assert_eq!(lowest, Some(150));
    assert!(highest >= Some(200));

    Ok(())
}

#[tokio::test]
async fn one_failed_chunk_keeps_the_others() -> anyhow::Result<()> {
    // chunks of 40 from 50: 170..=209 holds 180 and 200
    let ledger = fixture_ledger().with_failing_range(170..=170);
    let scanner = scanner_builder().single_shot(false).connect(ledger)?;

    let result = scanner.scan_exhaustive(ACCOUNT, BlockSpec::Earliest, BlockSpec::Latest).await?;

    assert_records!(result.records, [(150, Sent), (120, Received), (100, Sent)]);
    let failed = &result.diagnostics.failed_chunks;
    assert_eq!(failed.len(), 1);
    assert_eq!((failed[0].chunk.from_block, failed[0].chunk.to_block), (170, 209));
    assert_eq!(failed[0].kind, FailureKind::Fetch);
    assert!(!failed[0].message.is_empty());

    Ok(())
}

#[tokio::test]
async fn failed_single_shot_falls_back_to_default_chunks() -> anyhow::Result<()> {
    let scanner = setup_scanner(fixture_ledger().with_failing_range(250..=250))?;

    let result = scanner.scan_exhaustive(ACCOUNT, BlockSpec::Earliest, BlockSpec::Latest).await?;

    assert_eq!(result.diagnostics.chunking.single_shot, SingleShotOutcome::Failed);
    assert_eq!(result.diagnostics.chunking.chunk_size, 40);
    assert_eq!(result.records.len(), 5);
    let failed = &result.diagnostics.failed_chunks;
    assert_eq!(failed.len(), 1);
    assert_eq!((failed[0].chunk.from_block, failed[0].chunk.to_block), (250, 250));

    Ok(())
}
