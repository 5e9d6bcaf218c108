use actix_web::http::StatusCode;
use actix_web::test::{call_service, read_body_json, TestRequest};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tiling_backend::engine::{GrassEnvironment, ProcessExecutor};
use tiling_backend::error::Result;
use tiling_backend::job_controller::{start_job_updater, JobsState};
use tiling_backend::process_chain::{ProcessStep, StepLog};
use tiling_backend::processing::ProcessingBackend;
use tiling_backend::services::{self, ProcessingState};
use tiling_backend::workspace::FsWorkspaces;

/// Stands in for the `grass` executable: answers the info modules and writes
/// an element directory for every map a module creates.
struct FakeGrass;

fn touch(mapset: &Path, element: &str, name: &str) {
    let dir = mapset.join(element).join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("data"), name).unwrap();
}

impl ProcessExecutor for FakeGrass {
    fn run_step(&self, env: &GrassEnvironment, step: &ProcessStep) -> Result<StepLog> {
        let mapset = env.mapset_path();
        let mut return_code = 0;
        let stdout = match step.module.as_str() {
            "v.mkgrid" => {
                touch(&mapset, "vector", step.output_value("map").unwrap());
                String::new()
            }
            "v.info" => "nodes=9\ncentroids=4\nareas=4\n".to_string(),
            "v.extract" | "v.patch" => {
                touch(&mapset, "vector", step.output_value("output").unwrap());
                String::new()
            }
            "g.remove" => {
                let name = step.input_value("name").unwrap();
                fs::remove_dir_all(mapset.join("vector").join(name)).unwrap();
                String::new()
            }
            "g.region" => {
                // every tile must be readable through the temporary database
                for qualified in step.input_value("raster").unwrap().split(',') {
                    let (name, source) = qualified.split_once('@').unwrap();
                    let cell = env.gisdbase.join(&env.project).join(source).join("cell").join(name);
                    if !cell.is_dir() {
                        return_code = 1;
                    }
                }
                String::new()
            }
            "r.patch" => {
                touch(&mapset, "cell", step.output_value("output").unwrap());
                String::new()
            }
            _ => String::new(),
        };
        Ok(StepLog {
            id: step.display_id().to_string(),
            module: step.module.clone(),
            return_code,
            stdout,
            stderr: String::new(),
        })
    }
}

struct Fixture {
    _root: TempDir,
    database: PathBuf,
    lock_dir: PathBuf,
    processing: ProcessingState,
    jobs: JobsState,
}

impl Fixture {
    /// A project `nc` with PERMANENT and two tile mapsets holding `ndvi`.
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let database = root.path().join("grassdb");
        let permanent = database.join("nc").join("PERMANENT");
        fs::create_dir_all(&permanent).unwrap();
        fs::write(permanent.join("DEFAULT_WIND"), "proj: 99\n").unwrap();
        fs::write(permanent.join("WIND"), "proj: 99\n").unwrap();
        for tile in ["tile1", "tile2"] {
            let mapset = database.join("nc").join(tile);
            fs::create_dir_all(&mapset).unwrap();
            fs::write(mapset.join("WIND"), "proj: 99\n").unwrap();
            touch(&mapset, "cell", "ndvi");
        }

        let lock_dir = root.path().join("locks");
        let tmp_workdir = root.path().join("tmp");
        let backend = ProcessingBackend {
            executor: Arc::new(FakeGrass),
            workspaces: Arc::new(FsWorkspaces::new(
                database.clone(),
                lock_dir.clone(),
                tmp_workdir.clone(),
            )),
            tmp_workdir,
        };
        let (jobs, rx) = JobsState::new();
        tokio::spawn(start_job_updater(jobs.jobs.clone(), rx));
        Self {
            _root: root,
            database,
            lock_dir,
            processing: ProcessingState {
                backend,
                user_id: "user".to_string(),
                job_timeout: Duration::from_secs(30),
            },
            jobs,
        }
    }

    fn mapset(&self, name: &str) -> PathBuf {
        self.database.join("nc").join(name)
    }
}

macro_rules! create_app {
    ($fixture:expr) => {{
        ::actix_web::test::init_service(
            ::actix_web::App::new()
                .app_data(services::json_config(1024 * 1024))
                .app_data(::actix_web::web::Data::new($fixture.processing.clone()))
                .app_data(::actix_web::web::Data::new($fixture.jobs.clone()))
                .configure(services::configure),
        )
        .await
    }};
}

const MAPSET_PATH: &str = "/api/projects/nc/mapsets";

async fn wait_for_job(jobs: &JobsState, resource_id: &str) {
    for _ in 0..500 {
        if let Some(status) = jobs.status("user", resource_id).await {
            if status.status.is_terminal() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {resource_id} did not finish");
}

#[actix_web::test]
async fn process_listings() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);

    let req = TestRequest::get()
        .uri(&format!("{MAPSET_PATH}/tiles/tiling_processes"))
        .to_request();
    let response = call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_body_json(response).await;
    assert_eq!(body["tiling_processes"][0]["id"], "grid");
    assert_eq!(body["tiling_processes"][0]["categories"], json!(["Tiling"]));

    let req = TestRequest::get()
        .uri(&format!("{MAPSET_PATH}/merged/merge_processes"))
        .to_request();
    let body: Value = read_body_json(call_service(&app, req).await).await;
    assert_eq!(body["merge_processes"][0]["id"], "patch");
    assert_eq!(body["merge_processes"][0]["categories"], json!(["Merge"]));
}

#[actix_web::test]
async fn api_descriptions() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);

    let req = TestRequest::get()
        .uri(&format!("{MAPSET_PATH}/tiles/tiling_processes/grid"))
        .to_request();
    let body: Value = read_body_json(call_service(&app, req).await).await;
    assert_eq!(body["tags"], json!(["Tiling"]));
    assert_eq!(body["parameters"][2]["name"], "grid_prefix");

    let req = TestRequest::get()
        .uri(&format!("{MAPSET_PATH}/merged/merge_processes/patch"))
        .to_request();
    let body: Value = read_body_json(call_service(&app, req).await).await;
    assert_eq!(body["parameters"][0]["name"], "mapsetlist");
    // no job was started by describing
    assert!(fixture.jobs.jobs.read().await.is_empty());
}

#[actix_web::test]
async fn invalid_grid_request_is_rejected() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);

    let req = TestRequest::post()
        .uri(&format!("{MAPSET_PATH}/tiles/tiling_processes/grid"))
        .set_json(json!({"width": "-1", "height": "0.5", "grid_prefix": "grid"}))
        .to_request();
    let response = call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_body_json(response).await;
    assert_eq!(body["error"], "InvalidValue");

    let req = TestRequest::post()
        .uri(&format!("{MAPSET_PATH}/tiles/tiling_processes/grid"))
        .set_json(json!({"width": "1"}))
        .to_request();
    let response = call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_body_json(response).await;
    assert_eq!(body["error"], "InvalidRequest");
    assert!(fixture.jobs.jobs.read().await.is_empty());
}

#[actix_web::test]
async fn grid_tiling_job() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);

    let req = TestRequest::post()
        .uri(&format!("{MAPSET_PATH}/tiles/tiling_processes/grid"))
        .set_json(json!({"width": "0.5", "height": "0.5", "grid_prefix": "grid"}))
        .to_request();
    let response = call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::OK);
    let handle: Value = read_body_json(response).await;
    assert_eq!(handle["status"], "accepted");
    let resource_id = handle["resource_id"].as_str().unwrap().to_string();
    let status_url = handle["urls"]["status"].as_str().unwrap().to_string();

    wait_for_job(&fixture.jobs, &resource_id).await;

    let req = TestRequest::get().uri(&status_url).to_request();
    let response = call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::OK);
    let status: Value = read_body_json(response).await;
    assert_eq!(status["status"], "finished");
    assert_eq!(
        status["process_results"],
        json!(["grid1", "grid2", "grid3", "grid4"])
    );
    assert_eq!(status["progress"], json!({"step": 7, "num_of_steps": 7}));

    let tiles = fixture.mapset("tiles");
    for tile in ["grid1", "grid2", "grid3", "grid4"] {
        assert!(tiles.join("vector").join(tile).is_dir());
    }
    let leftovers: Vec<_> = fs::read_dir(tiles.join("vector"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("grid_"))
        .collect();
    assert!(leftovers.is_empty(), "temporary grid left behind: {leftovers:?}");
    assert!(!fixture.lock_dir.join("nc").join("tiles.lock").exists());
}

#[actix_web::test]
async fn patch_merge_job_removes_sources() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);

    let req = TestRequest::post()
        .uri(&format!("{MAPSET_PATH}/merged/merge_processes/patch"))
        .set_json(json!({
            "mapsetlist": ["tile1", "tile2"],
            "outputs": [
                {"param": "raster", "value": "ndvi"},
                {"param": "raster3d", "value": "volume"}
            ],
            "keep_mapsets": "false"
        }))
        .to_request();
    let handle: Value = read_body_json(call_service(&app, req).await).await;
    let resource_id = handle["resource_id"].as_str().unwrap().to_string();
    wait_for_job(&fixture.jobs, &resource_id).await;

    let status = fixture.jobs.status("user", &resource_id).await.unwrap();
    assert_eq!(status.process_results, ["ndvi"]);
    assert!(status.warnings.is_empty());

    assert!(fixture.mapset("merged").join("cell").join("ndvi").is_dir());
    assert!(fixture.mapset("merged").join("WIND").is_file());
    assert!(!fixture.mapset("tile1").exists());
    assert!(!fixture.mapset("tile2").exists());
    assert!(fixture.mapset("PERMANENT").is_dir());
}

#[actix_web::test]
async fn patch_merge_into_existing_target_keeps_its_data() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);
    let merged = fixture.mapset("merged");
    fs::create_dir_all(merged.join("sqlite")).unwrap();
    fs::write(merged.join("WIND"), "north: 7\n").unwrap();
    fs::write(merged.join("sqlite").join("sqlite.db"), "roads,rivers").unwrap();
    touch(&merged, "vector", "roads");

    let req = TestRequest::post()
        .uri(&format!("{MAPSET_PATH}/merged/merge_processes/patch"))
        .set_json(json!({
            "mapsetlist": ["tile1", "tile2"],
            "outputs": [{"param": "raster", "value": "ndvi"}],
            "keep_mapsets": true
        }))
        .to_request();
    let handle: Value = read_body_json(call_service(&app, req).await).await;
    let resource_id = handle["resource_id"].as_str().unwrap().to_string();
    wait_for_job(&fixture.jobs, &resource_id).await;

    let status = fixture.jobs.status("user", &resource_id).await.unwrap();
    assert_eq!(status.process_results, ["ndvi"]);
    assert!(merged.join("cell").join("ndvi").is_dir());
    assert!(merged.join("vector").join("roads").is_dir());
    assert_eq!(
        fs::read_to_string(merged.join("sqlite").join("sqlite.db")).unwrap(),
        "roads,rivers"
    );
    assert_eq!(fs::read_to_string(merged.join("WIND")).unwrap(), "north: 7\n");
    assert!(fixture.mapset("tile1").is_dir());
    assert!(fixture.mapset("tile2").is_dir());
}

#[actix_web::test]
async fn merge_into_locked_target_fails_with_lock_contention() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);
    fs::create_dir_all(fixture.lock_dir.join("nc")).unwrap();
    fs::write(fixture.lock_dir.join("nc").join("merged.lock"), "").unwrap();

    let req = TestRequest::post()
        .uri(&format!("{MAPSET_PATH}/merged/merge_processes/patch"))
        .set_json(json!({
            "mapsetlist": ["tile1", "tile2"],
            "outputs": [{"param": "raster", "value": "ndvi"}],
            "keep_mapsets": false
        }))
        .to_request();
    let handle: Value = read_body_json(call_service(&app, req).await).await;
    let resource_id = handle["resource_id"].as_str().unwrap().to_string();
    wait_for_job(&fixture.jobs, &resource_id).await;

    let req = TestRequest::get()
        .uri(&format!("/api/resources/user/{resource_id}"))
        .to_request();
    let response = call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let status: Value = read_body_json(response).await;
    assert_eq!(status["status"], "error");
    assert_eq!(status["exception"]["kind"], "LockContention");

    // nothing was touched and the foreign lock is still held
    assert!(fixture.mapset("tile1").is_dir());
    assert!(!fixture.mapset("merged").exists());
    assert!(fixture.lock_dir.join("nc").join("merged.lock").exists());
}

#[actix_web::test]
async fn merge_with_missing_source_publishes_nothing() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);

    let req = TestRequest::post()
        .uri(&format!("{MAPSET_PATH}/merged/merge_processes/patch"))
        .set_json(json!({
            "mapsetlist": ["tile1", "tile9"],
            "outputs": [{"param": "raster", "value": "ndvi"}]
        }))
        .to_request();
    let handle: Value = read_body_json(call_service(&app, req).await).await;
    let resource_id = handle["resource_id"].as_str().unwrap().to_string();
    wait_for_job(&fixture.jobs, &resource_id).await;

    let status = fixture.jobs.status("user", &resource_id).await.unwrap();
    assert_eq!(status.exception.unwrap().kind, "MissingWorkspace");
    assert!(!fixture.mapset("merged").exists());
    assert!(fixture.mapset("tile1").is_dir());
    assert!(!fixture.lock_dir.join("nc").join("merged.lock").exists());
}

#[actix_web::test]
async fn target_among_sources_is_rejected() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);

    let req = TestRequest::post()
        .uri(&format!("{MAPSET_PATH}/tile1/merge_processes/patch"))
        .set_json(json!({
            "mapsetlist": ["tile1", "tile2"],
            "outputs": [{"param": "raster", "value": "ndvi"}]
        }))
        .to_request();
    let response = call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_body_json(response).await;
    assert_eq!(body["error"], "InvalidRequest");
}

#[actix_web::test]
async fn unknown_resource_is_not_found() {
    let fixture = Fixture::new();
    let app = create_app!(fixture);

    let req = TestRequest::get()
        .uri("/api/resources/user/resource_id-unknown")
        .to_request();
    let response = call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = read_body_json(response).await;
    assert_eq!(body["error"], "NotFound");
}
