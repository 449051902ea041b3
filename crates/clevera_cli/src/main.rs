//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `clevera_core` linkage with a ping/version probe.
//! - Drive one sign-in/catalog/star round against the in-memory backends.
//!
//! Usage: `clevera_cli [config.json]`

use clevera_core::{
    init_logging, Identity, MemoryAuth, MemoryStore, SyncConfig, SyncSession,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    println!("clevera_core ping={}", clevera_core::ping());
    println!("clevera_core version={}", clevera_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("clevera_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    init_logging(&config.logging)?;

    let auth = MemoryAuth::new();
    let store = MemoryStore::new();
    let mut session = SyncSession::new(&auth, Arc::new(store.clone()), &config);

    auth.sign_in(Identity::new("demo-user").with_display_name("Demo"));
    session.pump()?;

    session.catalog().add_topic("Biology", "🧬", Some("Cells and genes"))?;
    session.pump()?;
    let Some(topic_id) = session.catalog().topics().first().map(|topic| topic.id.clone()) else {
        return Err("topic was not mirrored".into());
    };

    session.catalog().add_set("Chapter 1", &topic_id, None)?;
    session.pump()?;
    let set_ids: Vec<String> = session
        .catalog()
        .topic(&topic_id)
        .map(|topic| topic.sets.iter().map(|set| set.id.clone()).collect())
        .unwrap_or_default();
    for set_id in &set_ids {
        session.identity_mut().toggle_star_set(set_id)?;
    }

    if let Some(profile) = session.identity().profile() {
        println!("profile={}", serde_json::to_string(profile)?);
    }
    for topic in session.catalog().topics() {
        println!("topic={} sets={}", topic.name, topic.sets.len());
    }
    println!("starred={}", session.starred_sets().len());
    println!("writes={}", store.writes().len());

    session.dispose();
    info!("event=cli_run module=cli status=ok");
    Ok(())
}
