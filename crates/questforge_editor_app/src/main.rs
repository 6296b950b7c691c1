// SPDX-License-Identifier: MIT OR Apache-2.0
//! `QuestForge` Editor - headless hierarchy session
//!
//! Runs a scripted editing session against the hierarchy core and logs the
//! resulting scene outline after every step.
//!
//! ## Usage
//!
//! ```text
//! questforge_editor [editor_settings.ron]
//! ```
//!
//! Log verbosity follows `RUST_LOG`.

mod session;

use questforge_editor_hierarchy::EditorSettings;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("questforge_editor_hierarchy=debug,questforge_editor=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting QuestForge Editor v{}", env!("CARGO_PKG_VERSION"));

    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => EditorSettings::load_or_default(&path),
        None => EditorSettings::default(),
    };

    if !session::run(&settings) {
        tracing::error!("Scripted session failed");
        std::process::exit(1);
    }
}
