//! Administrative text-command surface
//!
//! A thin wrapper for testing setups: force-create, remove or re-age a
//! minor without going through the host's own family events. Commands
//! only call host operations and registry lookups; all engine behavior
//! still flows through the regular lifecycle passes.

use crate::core::types::Gender;
use crate::host::HostWorld;
use crate::registry::IdentityRegistry;

/// Host mutations the admin commands need on top of the read-mostly
/// `HostWorld` surface
pub trait AdminHost: HostWorld {
    /// Create a newborn minor in the household
    fn create_minor(&mut self, name: &str, gender: Gender);

    /// Remove a minor from the household entirely. False when unknown.
    fn delete_minor(&mut self, name: &str) -> bool;

    /// Overwrite a minor's age in days. False when unknown.
    fn age_minor(&mut self, name: &str, days_old: u32) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    AddMinor { name: String, gender: Gender },
    RemoveMinor { name: String },
    AgeMinor { name: String, days_old: u32 },
}

pub const USAGE_ADD: &str = "Usage: add-minor <name> <male|female>";
pub const USAGE_REMOVE: &str = "Usage: remove-minor <name>";
pub const USAGE_AGE: &str = "Usage: age-minor <name> <days old>";

/// Parse one command line. Unknown or malformed input reports the usage
/// string for the closest command.
pub fn parse(line: &str) -> Result<AdminCommand, String> {
    let mut tokens = line.split_whitespace();
    let command = tokens.next().unwrap_or_default();
    match command {
        "add-minor" => {
            let name = tokens.next().ok_or(USAGE_ADD)?;
            let gender = match tokens.next() {
                Some("male") => Gender::Male,
                Some("female") => Gender::Female,
                _ => return Err(USAGE_ADD.to_string()),
            };
            validate_name(name, USAGE_ADD)?;
            Ok(AdminCommand::AddMinor {
                name: name.to_string(),
                gender,
            })
        }
        "remove-minor" => {
            let name = tokens.next().ok_or(USAGE_REMOVE)?;
            validate_name(name, USAGE_REMOVE)?;
            Ok(AdminCommand::RemoveMinor {
                name: name.to_string(),
            })
        }
        "age-minor" => {
            let name = tokens.next().ok_or(USAGE_AGE)?;
            let days_old = tokens
                .next()
                .and_then(|raw| raw.parse::<u32>().ok())
                .ok_or(USAGE_AGE)?;
            validate_name(name, USAGE_AGE)?;
            Ok(AdminCommand::AgeMinor {
                name: name.to_string(),
                days_old,
            })
        }
        other => Err(format!("Unknown command \"{}\"", other)),
    }
}

fn validate_name(name: &str, usage: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > 100 {
        return Err(usage.to_string());
    }
    Ok(())
}

/// Execute a parsed command against the host. Returns a player-facing
/// message either way; nothing here can corrupt engine state because all
/// engine-side bookkeeping happens in the next lifecycle pass.
pub fn execute(
    command: &AdminCommand,
    host: &mut dyn AdminHost,
    registry: &IdentityRegistry,
) -> Result<String, String> {
    if !host.is_world_loaded() {
        return Err("No world is loaded".to_string());
    }

    match command {
        AdminCommand::AddMinor { name, gender } => {
            if host.minor_record(name).is_some() {
                return Err(format!("A minor named \"{}\" already exists", name));
            }
            host.create_minor(name, *gender);
            Ok(format!("{} has joined the household", name))
        }
        AdminCommand::RemoveMinor { name } => {
            if registry.proxy_of(name).is_some() {
                tracing::warn!(
                    "Removing minor \"{}\" while its proxy is active; the proxy disappears at the next save",
                    name
                );
            }
            if host.delete_minor(name) {
                Ok(format!("{} has been removed", name))
            } else {
                Err(format!("Failed to find a minor named \"{}\"", name))
            }
        }
        AdminCommand::AgeMinor { name, days_old } => {
            if host.age_minor(name, *days_old) {
                Ok(format!("{} is now {} days old", name, days_old))
            } else {
                Err(format!("Failed to find a minor named \"{}\"", name))
            }
        }
    }
}
