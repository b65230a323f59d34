/// Fetch-then-persist glue.
use std::fmt::Display;

use tracing::{info, warn};

use coverfetch_shared::{Locators, Report};

use crate::{Fetcher, Persister};

/// Fetch every locator, then persist whatever was retrieved under `prefix`.
///
/// Variants that fail to download are skipped; only write failures end up
/// in the report.
pub async fn download_and_save<K>(
    fetcher: &Fetcher,
    persister: &Persister,
    prefix: &str,
    locators: &Locators<K>,
) -> Report
where
    K: Ord + Clone + Display + Send + 'static,
{
    info!("Downloading {} cover variant(s) for {:?}", locators.len(), prefix);

    let payloads = fetcher.fetch(locators).await;
    if payloads.is_empty() && !locators.is_empty() {
        warn!("No cover variant could be downloaded for {:?}", prefix);
    }

    persister.persist(prefix, payloads).await
}
