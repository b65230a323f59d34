/// Resolve a target and run the download pipeline for it.
use tracing::info;

use coverfetch_downloader::{download_and_save, Fetcher, Persister};
use coverfetch_shared::{CoverError, CoverResult, Report};

use crate::metadata::{Credentials, MetadataService};
use crate::target::TargetUri;

/// Log in, resolve `target`, then fetch and save its covers.
///
/// A report with any write failure is turned into [`CoverError::Persist`].
pub async fn download_covers(
    service: &dyn MetadataService,
    credentials: &Credentials,
    target: &TargetUri,
    fetcher: &Fetcher,
    persister: &Persister,
) -> CoverResult<Report> {
    let hex_id = target.hex_id()?;

    let session = service.login(credentials).await?;
    info!("Logged in as {}", credentials.username());

    let resolved = service.resolve(&session, target.kind, &hex_id).await?;
    info!(
        "Resolved {} {:?} with {} cover(s)",
        target.kind,
        resolved.name,
        resolved.locators.len()
    );

    let report = download_and_save(fetcher, persister, &resolved.name, &resolved.locators).await;
    if report.any_failure() {
        return Err(CoverError::Persist(report));
    }
    Ok(report)
}
