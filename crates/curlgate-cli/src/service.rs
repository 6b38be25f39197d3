//! systemd unit management (Linux only).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

const SERVICE_NAME: &str = "curlgate.service";
const UNIT_DIR: &str = "/etc/systemd/system";

fn unit_path() -> PathBuf {
    Path::new(UNIT_DIR).join(SERVICE_NAME)
}

/// Render the unit file for `exe` serving `config`.
fn render_unit(exe: &Path, config: &Path) -> String {
    format!(
        "[Unit]\n\
         Description=Curlgate secured curl execution agent\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={} serve --config {}\n\
         Restart=on-failure\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        exe.display(),
        config.display()
    )
}

fn ensure_linux() -> Result<()> {
    if !cfg!(target_os = "linux") {
        bail!(
            "service management is only supported on linux (current: {})",
            std::env::consts::OS
        );
    }
    Ok(())
}

fn systemctl(args: &[&str]) -> Result<()> {
    let status = Command::new("systemctl")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run systemctl {}", args.join(" ")))?;
    if !status.success() {
        bail!("systemctl {} failed: {status}", args.join(" "));
    }
    Ok(())
}

pub fn install(config: &Path) -> Result<()> {
    ensure_linux()?;

    let exe = std::env::current_exe().context("Failed to locate current executable")?;
    let config = if config.is_absolute() {
        config.to_path_buf()
    } else {
        std::env::current_dir()?.join(config)
    };

    let path = unit_path();
    std::fs::write(&path, render_unit(&exe, &config)).map_err(|e| {
        if e.kind() == ErrorKind::PermissionDenied {
            anyhow::anyhow!("installing the service requires root privileges")
        } else {
            anyhow::Error::new(e).context(format!("Failed to write {}", path.display()))
        }
    })?;

    systemctl(&["daemon-reload"])?;
    println!("Installed {}", path.display());
    println!("Start it with: systemctl enable --now {SERVICE_NAME}");
    Ok(())
}

pub fn uninstall() -> Result<()> {
    ensure_linux()?;

    // The unit may already be stopped or disabled
    if let Err(e) = systemctl(&["stop", SERVICE_NAME]) {
        tracing::warn!("{e}");
    }
    if let Err(e) = systemctl(&["disable", SERVICE_NAME]) {
        tracing::warn!("{e}");
    }

    let path = unit_path();
    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            bail!("uninstalling the service requires root privileges")
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("Failed to remove {}", path.display())));
        }
    }

    systemctl(&["daemon-reload"])?;
    println!("Removed {}", path.display());
    Ok(())
}

pub fn status() -> Result<()> {
    ensure_linux()?;

    // systemctl status exits non-zero for inactive units; show output anyway
    let output = Command::new("systemctl")
        .args(["status", SERVICE_NAME])
        .output()
        .context("Failed to run systemctl status")?;
    print!("{}", String::from_utf8_lossy(&output.stdout));
    eprint!("{}", String::from_utf8_lossy(&output.stderr));
    Ok(())
}
