//! Whether the engine may run for the current document.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::settings::Settings;

/// The engine runs only when enabled for every site.
#[must_use]
pub const fn should_activate(settings: &Settings) -> bool {
    settings.whole_site_enabled
}

/// Wait until the settings allow activation.
///
/// Returns immediately if they already do. Returns `false` when cancelled or
/// when the settings provider goes away first.
pub async fn wait_for_activation(
    settings: &mut watch::Receiver<Settings>,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        result = settings.wait_for(should_activate) => {
            if result.is_ok() {
                tracing::debug!("Activation allowed by settings");
            }
            result.is_ok()
        }
    }
}
