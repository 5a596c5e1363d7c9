use std::sync::Arc;

use market::AlertScanner;
use tracing::{info, instrument, warn};

#[instrument(name = "run_alerts", skip(scanner))]
pub async fn run_alerts(scanner: Arc<AlertScanner>) {
    let summary = scanner.scan().await;

    if summary.failures > 0 {
        warn!(
            failures = summary.failures,
            subscribers = summary.subscribers,
            "alert scan finished with failures"
        );
    } else {
        info!(
            alerted = summary.alerted,
            quiet = summary.quiet,
            "alert scan finished"
        );
    }
}
