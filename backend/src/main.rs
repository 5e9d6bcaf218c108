use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::sync::Arc;
use tiling_backend::config::Config;
use tiling_backend::engine::GrassCli;
use tiling_backend::job_controller::{start_job_updater, JobsState};
use tiling_backend::processing::ProcessingBackend;
use tiling_backend::services::{self, ProcessingState};
use tiling_backend::workspace::FsWorkspaces;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::parse();

    let tmp_workdir = config.tmp_workdir();
    std::fs::create_dir_all(&tmp_workdir)?;
    let backend = ProcessingBackend {
        executor: Arc::new(GrassCli::new(&config.grass_executable)),
        workspaces: Arc::new(FsWorkspaces::new(
            config.grass_database.clone(),
            config.lock_dir(),
            tmp_workdir.clone(),
        )),
        tmp_workdir,
    };
    let processing = ProcessingState {
        backend,
        user_id: config.user_id.clone(),
        job_timeout: config.job_timeout(),
    };

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new();
    tokio::spawn(start_job_updater(jobs_state.jobs.clone(), rx));

    info!(
        "Serving GRASS database {} at http://{}",
        config.grass_database.display(),
        config.listen_address
    );

    let json_limit = config.json_limit;
    HttpServer::new(move || {
        App::new()
            .app_data(services::json_config(json_limit))
            .app_data(web::Data::new(processing.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .configure(services::configure)
    })
    .bind(config.listen_address.as_str())?
    .run()
    .await
}
