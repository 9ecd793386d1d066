// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! mbox2imap command line.
//!
//! Usage:
//!   mbox2imap --archive mail.mbox --user me@example.com   # password from MBOX2IMAP_IMAP_PASS
//!   mbox2imap --config mbox2imap.toml --json               # machine-readable summary
//!
//! Exit codes:
//!   0 - Every message uploaded (or skipped)
//!   1 - Fatal error, run stopped early
//!   2 - Run completed but some messages were rejected

use clap::Parser;
use log::{debug, error};

use mbox2imap::config::{Settings, SettingsOverrides};
use mbox2imap::imap::{AsyncImapConnector, Encryption};
use mbox2imap::migrate::run_migration;
use mbox2imap::report::LogReporter;

#[derive(Parser)]
#[command(name = "mbox2imap", version, about = "Upload an mbox archive into an IMAP folder")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "MBOX2IMAP_CONFIG")]
    config: Option<String>,

    /// Path to the mbox archive
    #[arg(short, long)]
    archive: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long, value_enum)]
    encryption: Option<Encryption>,

    /// Login name. The password is only read from config or environment.
    #[arg(short, long)]
    user: Option<String>,

    /// Destination folder, created when missing
    #[arg(short, long)]
    folder: Option<String>,

    /// Pause between messages, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Report progress every N messages
    #[arg(long)]
    progress_every: Option<usize>,

    /// Skip the first N messages (resume a partial run)
    #[arg(long)]
    skip: Option<usize>,

    /// Skip messages larger than this many bytes
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Log level, e.g. info or debug
    #[arg(long)]
    log_level: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            archive_path: self.archive.clone(),
            imap_host: self.host.clone(),
            imap_port: self.port,
            encryption: self.encryption,
            imap_user: self.user.clone(),
            target_folder: self.folder.clone(),
            upload_delay_ms: self.delay_ms,
            progress_interval: self.progress_every,
            skip_first: self.skip,
            max_message_bytes: self.max_bytes,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = match Settings::new(cli.config.as_deref(), &cli.overrides()) {
        Ok(settings) => settings,
        Err(e) => {
            // Logger is not up yet; its level comes from these settings
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(settings.log.level.as_str()));
    debug!("Loaded settings: {:?}", settings);

    let report = run_migration(&settings, AsyncImapConnector, &mut LogReporter).await;

    if cli.json {
        match serde_json::to_string_pretty(&report.summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        println!("{}", report.summary);
    }

    std::process::exit(report.status.exit_code());
}
