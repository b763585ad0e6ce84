// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "ember-upload")]
#[command(about = "Firmware sealing and upload tool for ember-bootloader")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyUSB0); required for device commands
    #[arg(short, long)]
    pub port: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Seal a firmware image and drive a full update
    Update {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Firmware version (0 = debug build, keeps the installed version)
        #[arg(short, long)]
        version: u16,

        /// Release message stored behind the image
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Seal a firmware image into a frame-stream file without sending it
    Seal {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file for the sealed frame stream
        #[arg(value_name = "OUT")]
        out: PathBuf,

        /// Firmware version (0 = debug build, keeps the installed version)
        #[arg(short, long)]
        version: u16,

        /// Release message stored behind the image
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Boot the installed firmware
    Boot,
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let port = cli.port;

    match cli.command {
        Commands::Update {
            file,
            version,
            message,
        } => {
            let mut transport = Transport::new(&require_port(port)?)?;
            commands::update(&mut transport, &file, version, &message)
        }
        Commands::Seal {
            file,
            out,
            version,
            message,
        } => commands::seal_to_file(&file, &out, version, &message),
        Commands::Boot => {
            let mut transport = Transport::new(&require_port(port)?)?;
            commands::boot(&mut transport)
        }
    }
}

fn require_port(port: Option<String>) -> Result<String> {
    port.ok_or_else(|| anyhow::anyhow!("--port is required for this command"))
}
