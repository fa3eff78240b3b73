use crate::types::EventRecord;

/// Asserts that records are ordered most recent first.
///
/// Accepts anything that derefs to `[EventRecord]`.
#[macro_export]
macro_rules! assert_descending {
    ($records: expr) => {
        $crate::test_utils::macros::assert_descending(&$records)
    };
}

/// Asserts the exact `(block number, direction)` sequence of a record list.
///
/// # Examples
///
/// ```no_run
/// # use transfer_scanner::{Direction::*, assert_records};
/// # async fn example(result: transfer_scanner::ScanResult) {
/// assert_records!(result.records, [(200, Sent), (180, Received)]);
/// # }
/// ```
#[macro_export]
macro_rules! assert_records {
    ($records: expr, []) => {
        assert!($records.is_empty(), "Expected no records, got {:?}", $records);
    };
    ($records: expr, [$(($block: expr, $direction: expr)),+ $(,)?]) => {
        let expected: &[(u64, $crate::Direction)] = &[$(($block, $direction)),+];
        $crate::test_utils::macros::assert_records(&$records, expected)
    };
}

#[allow(clippy::missing_panics_doc)]
pub fn assert_descending(records: &[EventRecord]) {
    for (i, pair) in records.windows(2).enumerate() {
        assert!(
            pair[0].block_number >= pair[1].block_number,
            "Records {i} and {} out of order: block {} before block {}",
            i + 1,
            pair[0].block_number,
            pair[1].block_number
        );
    }
}

#[allow(clippy::missing_panics_doc)]
pub fn assert_records(records: &[EventRecord], expected: &[(u64, crate::Direction)]) {
    let actual: Vec<_> = records.iter().map(|r| (r.block_number, r.direction)).collect();
    assert_eq!(actual, expected, "Unexpected (block, direction) sequence");
}
