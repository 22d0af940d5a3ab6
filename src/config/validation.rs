//! Configuration validation
//!
//! Fail-fast validation of configuration invariants.

use super::Config;
use anyhow::{bail, Result};

/// Validate configuration invariants
pub fn validate(config: &Config) -> Result<()> {
    validate_tor(config)?;
    validate_service(config)?;
    Ok(())
}

fn validate_tor(config: &Config) -> Result<()> {
    if config.tor.control_host.is_empty() {
        bail!("tor.control_host cannot be empty");
    }
    if config.tor.control_port == 0 {
        bail!("tor.control_port cannot be 0");
    }
    if config.tor.command_timeout_secs == 0 {
        bail!("tor.command_timeout_secs must be greater than 0");
    }
    if let Some(password) = &config.tor.control_password {
        if password.is_empty() {
            bail!("tor.control_password cannot be empty (remove it to use cookie auth)");
        }
    }
    Ok(())
}

fn validate_service(config: &Config) -> Result<()> {
    if config.service.onion_port == 0 {
        bail!("service.onion_port cannot be 0");
    }

    // Tor takes the target as one token: host:port
    let target = &config.service.target;
    let Some((host, port)) = target.rsplit_once(':') else {
        bail!("service.target must be host:port, got {:?}", target);
    };
    if host.is_empty() || host.chars().any(|c| c.is_whitespace() || c == ',') {
        bail!("service.target has an invalid host: {:?}", target);
    }
    match port.parse::<u16>() {
        Ok(p) if p != 0 => {},
        _ => bail!("service.target has an invalid port: {:?}", target),
    }

    if config.service.state_path.as_os_str().is_empty() {
        bail!("service.state_path cannot be empty");
    }

    Ok(())
}
