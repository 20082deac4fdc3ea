//! Per-bucket reduction of log quantities.

use rust_decimal::Decimal;

use crate::habit::{AggregationKind, LogEntry};

/// Reduce the logs of one bucket to a single value.
///
/// The caller has already partitioned `logs` to the bucket; no time filtering happens here.
/// An empty slice yields zero for every kind.
pub fn aggregate(kind: AggregationKind, logs: &[LogEntry]) -> Decimal {
    match kind {
        AggregationKind::Sum => logs.iter().map(|l| l.quantity).sum(),
        AggregationKind::Count => Decimal::from(logs.len()),
        AggregationKind::Boolean => {
            if logs.is_empty() {
                Decimal::ZERO
            } else {
                Decimal::ONE
            }
        }
    }
}
