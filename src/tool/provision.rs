use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Once;

use crate::config::ToolConfig;

static PROVISION: Once = Once::new();

/// Make sure the external tool exists at its install location.
///
/// Runs the actual extraction at most once per process; `Once` serializes
/// concurrent first-use calls so they cannot race on directory creation.
/// Repeated calls are cheap no-ops.
///
/// Provisioning failure is logged and never aborts startup — a missing
/// tool surfaces later as an execution failure reported as absence.
pub fn ensure_installed(config: &ToolConfig) {
    PROVISION.call_once(|| {
        if let Err(e) = install(config) {
            log::warn!("Failed to provision {}: {e:#}", config.program);
        }
    });
}

fn install(config: &ToolConfig) -> Result<()> {
    let target = config.executable();
    if target.exists() {
        log::debug!("Tool already installed at {}", target.display());
        return Ok(());
    }

    let payload = config.bundled_payload()?;
    install_payload(&payload, &target)
}

/// Copy the bundled tool payload byte-for-byte into its install location,
/// creating the directory tree as needed.
///
/// No integrity verification beyond existence of the payload file.
pub fn install_payload(payload: &Path, target: &Path) -> Result<()> {
    if !payload.exists() {
        anyhow::bail!("Bundled tool payload not found at {}", payload.display());
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create install directory {}", parent.display()))?;
    }

    std::fs::copy(payload, target)
        .with_context(|| format!("Failed to copy tool payload to {}", target.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(target, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to mark {} executable", target.display()))?;
    }

    log::info!("Installed {} to {}", payload.display(), target.display());
    Ok(())
}
