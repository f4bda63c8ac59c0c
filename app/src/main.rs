mod config;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use api::{uploads::UploadStore, uploads::MAX_UPLOAD_BYTES, ApiConfig, AppState};
use authz::{AdminKey, Argon2Hasher, GrantSigner, OwnershipGuard};
use database::Database;
use tracing::{info, warn};

use config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load();

    let _guard = logging::init_logging(&settings.log_dir).context("Failed to initialize logging")?;

    info!("=== Guestbook server starting up ===");
    info!("  Database: {}", settings.database_path.display());
    info!("  Uploads: {}", settings.upload_dir.display());

    let database_path = settings.database_path.to_string_lossy();
    let db = Database::new(&database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", database_path))?;

    let uploads = UploadStore::new(
        settings.upload_dir.clone(),
        &settings.public_base_url,
        MAX_UPLOAD_BYTES,
    )
    .await
    .context("Failed to prepare upload directory")?;

    let admin = AdminKey::new(&settings.admin_key);
    if !admin.is_enabled() {
        warn!("ADMIN_KEY is not set; admin access is disabled");
    }

    let grants = match settings.grant_secret() {
        Some(secret) => GrantSigner::from_secret(secret, settings.grant_ttl()),
        None => {
            info!("GRANT_SECRET is not set; verification grants end with this process");
            GrantSigner::random(settings.grant_ttl())
        }
    };

    let state = AppState {
        db: Arc::new(db),
        guard: Arc::new(OwnershipGuard::new(admin, Argon2Hasher::new(), grants)),
        uploads: Arc::new(uploads),
    };

    let api_config = ApiConfig::new()
        .with_port(settings.port)
        .with_cors_origin(settings.cors_origin.clone());

    api::start_server(state, api_config)
        .await
        .context("API server error")?;

    info!("=== Guestbook server shutdown complete ===");
    Ok(())
}
