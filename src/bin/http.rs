#[cfg(feature = "http_api")]
fn arg_value(flag: &str) -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use site_schedule::config::load_config_with_fallback;
    use site_schedule::logging::init_logging;
    use site_schedule::{ProjectMetadata, Schedule, http_api};

    let config_path = arg_value("--config").map(PathBuf::from);
    let load = load_config_with_fallback(config_path.as_deref());
    let config = load.config;
    init_logging(&config.log_level);
    if let Some(err) = load.error {
        tracing::warn!(error = %err, "using default configuration");
    }

    let project_id: i32 = match arg_value("--project") {
        Some(raw) => raw.parse()?,
        None => 1,
    };
    let addr: SocketAddr = config.resolved_http_addr().parse()?;

    let fresh = || {
        let mut metadata = ProjectMetadata::default();
        metadata.project_id = project_id;
        Schedule::new_with_metadata_and_calendar(metadata, config.calendar_with(std::iter::empty()))
            .with_options(config.engine_options())
    };

    #[cfg(feature = "sqlite")]
    let state = {
        use site_schedule::{ScheduleStore, SqliteScheduleStore};
        use std::sync::Arc;

        let store = Arc::new(SqliteScheduleStore::new(&config.database_path)?);
        let schedule = match store.load_schedule(project_id)? {
            Some(schedule) => schedule.with_options(config.engine_options()),
            None => fresh(),
        };
        tracing::info!(
            project_id,
            database = %config.database_path.display(),
            tasks = schedule.task_count(),
            "project loaded"
        );
        http_api::AppState::new(schedule).with_store(store)
    };

    #[cfg(not(feature = "sqlite"))]
    let state = http_api::AppState::new(fresh());

    println!("site-schedule HTTP API listening on http://{addr}");
    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
