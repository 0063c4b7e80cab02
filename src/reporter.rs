//! Periodic statistics logging (§4.8): an optional collaborator that reads
//! the merger's [`Counters`] on a fixed interval and writes one summary
//! line through the `log` facade, the way every other subsystem here
//! reports its health.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::source::Counters;

/// Runs until the process ends. A `0` interval disables reporting
/// entirely rather than logging on every tick.
pub async fn run(interval: Duration, counters: Arc<Counters>) {
    if interval.is_zero() {
        log::debug!("reporter disabled (report-interval=0)");
        return;
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        report_once(&counters);
    }
}

fn report_once(counters: &Counters) {
    let seen: u64 = counters.seen.iter().map(|c| c.load(Ordering::Relaxed)).sum();
    let duplicates: u64 = counters.duplicates.iter().map(|c| c.load(Ordering::Relaxed)).sum();
    let forwarded = counters.forwarded.load(Ordering::Relaxed);
    let decode_errors = counters.decode_errors.load(Ordering::Relaxed);

    log::info!("stats: seen={seen} duplicates={duplicates} forwarded={forwarded} decode_errors={decode_errors}");

    let busiest = counters
        .seen
        .iter()
        .enumerate()
        .map(|(type_id, c)| (type_id, c.load(Ordering::Relaxed)))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count);
    if let Some((type_id, count)) = busiest {
        log::debug!("stats: busiest message type is {type_id} with {count} seen");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn report_once_does_not_panic_on_empty_counters() {
        let counters = Counters::new();
        report_once(&counters);
    }

    #[test]
    fn report_once_reads_totals_across_types() {
        let counters = Counters::new();
        counters.seen[1].fetch_add(5, Ordering::Relaxed);
        counters.seen[5].fetch_add(2, Ordering::Relaxed);
        counters.forwarded.fetch_add(7, Ordering::Relaxed);
        report_once(&counters);
        assert_eq!(counters.seen[1].load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn zero_interval_returns_immediately() {
        tokio::time::timeout(Duration::from_millis(200), run(Duration::ZERO, Arc::new(Counters::new())))
            .await
            .expect("reporter should return immediately when disabled");
    }
}
