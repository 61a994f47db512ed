// SPDX-License-Identifier: Apache-2.0
//! The `hearth` binary: `run <config>` starts a node from a YAML config
//! file; `util mac`/`util noise`/`util hash-password` are the small
//! stand-alone helpers for provisioning a node's identity, PSK, and API
//! password without a running node.
//!
//! Exits 0 on success, non-zero on any error path.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use hearth_config::NodeConfig;
use rand::RngCore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hearth home-automation node", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a node config and run until interrupted.
    Run {
        /// Path to a YAML node config.
        config: PathBuf,
    },
    /// Stand-alone helpers that don't require a running node.
    #[command(subcommand)]
    Util(UtilCommand),
}

#[derive(Subcommand, Debug)]
enum UtilCommand {
    /// Generate a random locally-administered MAC address.
    Mac,
    /// Generate a random 32-byte Noise PSK, base64-encoded.
    Noise,
    /// Hash a plaintext password with bcrypt, for `api.password` in config.
    HashPassword {
        /// The plaintext password to hash.
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run { config } => run(&config).await,
        Command::Util(UtilCommand::Mac) => util_mac(),
        Command::Util(UtilCommand::Noise) => util_noise(),
        Command::Util(UtilCommand::HashPassword { password }) => util_hash_password(&password),
    }
}

async fn run(config_path: &Path) -> Result<()> {
    let bytes = std::fs::read(config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config: NodeConfig =
        serde_yaml::from_slice(&bytes).with_context(|| "parsing node config")?;
    hearth_service::run(config, std::collections::HashMap::new()).await
}

/// A random OUI with the locally-administered bit forced.
fn util_mac() -> Result<()> {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[0] = (bytes[0] & 0b1111_1100) | 0b0000_0010;
    let mac = hearth_config::MacAddress::new(bytes)?;
    print_line(&mac.to_hex_string());
    Ok(())
}

fn util_noise() -> Result<()> {
    let mut psk = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut psk);
    print_line(&STANDARD.encode(psk));
    Ok(())
}

fn util_hash_password(password: &str) -> Result<()> {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    print_line(&hash);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn util_mac_sets_the_locally_administered_bit() {
        let mut bytes = [0xffu8; 6];
        bytes[0] = (bytes[0] & 0b1111_1100) | 0b0000_0010;
        assert_eq!(bytes[0] & 0b0000_0010, 0b0000_0010);
        hearth_config::MacAddress::new(bytes).unwrap();
    }

    #[test]
    fn util_hash_password_produces_a_checkable_bcrypt_hash() {
        let hash = bcrypt::hash("hunter2", bcrypt::DEFAULT_COST).unwrap();
        assert!(bcrypt::verify("hunter2", &hash).unwrap());
    }
}
