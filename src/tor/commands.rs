//! Command builders and reply interpretation for onion service management
//!
//! Builders validate their inputs so nothing that could split a command
//! line or smuggle extra arguments reaches the control port.

use super::error::ControlError;
use super::reply::{ControlReply, STATUS_UNRECOGNIZED_ENTITY};
use crate::state::model::{KeyType, OnionIdentity, ONION_SUFFIX};

/// Key type requested for freshly created services
pub const NEW_KEY_TYPE: KeyType = KeyType::Ed25519V3;

/// Strip one `.onion` suffix and check what remains is a bare service id
pub fn service_id(address: &str) -> Result<&str, ControlError> {
    let id = address.strip_suffix(ONION_SUFFIX).unwrap_or(address);
    if id.is_empty() {
        return Err(ControlError::invalid(format!(
            "onion address {:?} has no service id",
            address
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ControlError::invalid(format!(
            "onion address {:?} is not a service id with an optional .onion suffix",
            address
        )));
    }
    Ok(id)
}

fn check_port(port: u16) -> Result<(), ControlError> {
    if port == 0 {
        return Err(ControlError::invalid("onion port cannot be 0"));
    }
    Ok(())
}

fn check_target(target: &str) -> Result<(), ControlError> {
    let valid = !target.is_empty()
        && target
            .chars()
            .all(|c| c.is_ascii_graphic() && c != ',' && c != '"');
    if !valid {
        return Err(ControlError::invalid(format!(
            "bad target {:?}, expected host:port",
            target
        )));
    }
    Ok(())
}

/// Keys travel as single tokens: base32/base64 alphabets only
fn check_key(what: &str, key: &str) -> Result<(), ControlError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='));
    if !valid {
        return Err(ControlError::invalid(format!("malformed {}", what)));
    }
    Ok(())
}

/// Fail unless the reply is exactly `250 OK`
pub fn expect_ok(command: &str, reply: &ControlReply) -> Result<(), ControlError> {
    if reply.is_ok() {
        Ok(())
    } else {
        Err(ControlError::Protocol {
            command: command.to_string(),
            reply: reply.raw(),
        })
    }
}

/// `ADD_ONION NEW:ED25519-V3 Port={port},{target} Flags=Detach`
pub fn add_onion_new(port: u16, target: &str) -> Result<String, ControlError> {
    check_port(port)?;
    check_target(target)?;
    Ok(format!(
        "ADD_ONION NEW:{} Port={},{} Flags=Detach",
        NEW_KEY_TYPE, port, target
    ))
}

/// Extract the identity Tor generated for `ADD_ONION NEW:...`
pub fn parse_add_onion_new(reply: &ControlReply) -> Result<OnionIdentity, ControlError> {
    expect_ok("ADD_ONION", reply)?;

    let service_id = reply
        .value("ServiceID")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ControlError::parse("ADD_ONION reply missing ServiceID"))?;

    let (key_type, key) = reply
        .value("PrivateKey")
        .and_then(|pk| pk.split_once(':'))
        .ok_or_else(|| ControlError::parse("ADD_ONION reply missing PrivateKey"))?;

    let key_type = key_type.parse::<KeyType>().map_err(ControlError::Parse)?;
    if key.is_empty() {
        return Err(ControlError::parse("ADD_ONION reply has an empty PrivateKey"));
    }

    Ok(OnionIdentity {
        key_type,
        private_key: key.to_string(),
        public_address: format!("{}{}", service_id, ONION_SUFFIX),
    })
}

/// Re-register a known key:
/// `ADD_ONION {type}:{key} Port={port},{target} Flags=Detach[,V3Auth][ ClientAuthV3={pk}...]`
pub fn add_onion_existing(
    key_type: KeyType,
    private_key: &str,
    port: u16,
    target: &str,
    client_auth: &[String],
) -> Result<String, ControlError> {
    check_key("onion private key", private_key)?;
    check_port(port)?;
    check_target(target)?;
    for pubkey in client_auth {
        check_key("client auth public key", pubkey)?;
    }

    let mut cmd = format!(
        "ADD_ONION {}:{} Port={},{} Flags=Detach",
        key_type, private_key, port, target
    );
    if !client_auth.is_empty() {
        cmd.push_str(",V3Auth");
        for pubkey in client_auth {
            cmd.push_str(" ClientAuthV3=");
            cmd.push_str(pubkey);
        }
    }
    Ok(cmd)
}

/// `DEL_ONION {service_id}`
pub fn del_onion(address: &str) -> Result<String, ControlError> {
    Ok(format!("DEL_ONION {}", service_id(address)?))
}

/// `250 OK`, or `552` when unknown services are tolerated
pub fn check_del_onion(reply: &ControlReply, ignore_unknown: bool) -> Result<(), ControlError> {
    if reply.is_ok() {
        return Ok(());
    }
    if ignore_unknown && reply.final_status_code() == STATUS_UNRECOGNIZED_ENTITY {
        return Ok(());
    }
    expect_ok("DEL_ONION", reply)
}

/// `ONION_CLIENT_AUTH_ADD {service_id} x25519:{key}`
pub fn client_auth_add(address: &str, x25519_private_key_base64: &str) -> Result<String, ControlError> {
    let id = service_id(address)?;
    check_key("x25519 private key", x25519_private_key_base64)?;
    Ok(format!(
        "ONION_CLIENT_AUTH_ADD {} x25519:{}",
        id, x25519_private_key_base64
    ))
}

/// `ONION_CLIENT_AUTH_REMOVE {service_id}`
pub fn client_auth_remove(address: &str) -> Result<String, ControlError> {
    Ok(format!("ONION_CLIENT_AUTH_REMOVE {}", service_id(address)?))
}

/// Returns `false` when a failure was tolerated.
///
/// Tor does not tell "no such entry" apart from other failures here, so
/// `ignore_unknown` tolerates any non-OK reply.
pub fn check_client_auth_remove(
    reply: &ControlReply,
    ignore_unknown: bool,
) -> Result<bool, ControlError> {
    if reply.is_ok() {
        return Ok(true);
    }
    if ignore_unknown {
        return Ok(false);
    }
    expect_ok("ONION_CLIENT_AUTH_REMOVE", reply).map(|()| true)
}

/// Ask Tor for fresh circuits
pub const SIGNAL_NEWNYM: &str = "SIGNAL NEWNYM";

/// List services created with `Flags=Detach`
pub const GETINFO_DETACHED: &str = "GETINFO onions/detached";

/// Service ids from a `GETINFO onions/detached` reply
pub fn parse_detached(reply: &ControlReply) -> Result<Vec<String>, ControlError> {
    expect_ok("GETINFO", reply)?;
    let value = reply
        .value("onions/detached")
        .ok_or_else(|| ControlError::parse("GETINFO reply missing onions/detached"))?;

    Ok(value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect())
}
