use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use stuck_monitor::server::{build_router, AppState};
use stuck_monitor::stage::Stage;
use stuck_monitor::store::InMemoryLinkStore;

fn stuckmon_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("stuckmon");
    path
}

fn write_config(root: &Path, bind: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
uri = "mongodb://127.0.0.1:1"
database = "pipeline"
server_selection_timeout_secs = 1

[server]
bind = "{}"

[client]
export_dir = "{}/exports"
"#,
        bind,
        root.display()
    );

    let config_path = config_dir.join("stuckmon.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

async fn run_stuckmon(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = stuckmon_binary();
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();

    let output = tokio::task::spawn_blocking(move || {
        Command::new(&binary)
            .arg("--config")
            .arg(&config_path)
            .args(&args)
            .env_remove("MONGODB_URI")
            .output()
            .unwrap_or_else(|e| panic!("Failed to run stuckmon binary at {:?}: {}", binary, e))
    })
    .await
    .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Serve `store` on an ephemeral port and return the bound address.
async fn spawn_server(store: InMemoryLinkStore) -> String {
    let app = build_router(AppState::with_limit(Arc::new(store), "links", 100));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

fn seeded_store() -> InMemoryLinkStore {
    let store = InMemoryLinkStore::new();
    for (yid, country) in [("a", "US"), ("b", "DE"), ("c", "DE")] {
        store
            .insert(
                "links",
                json!({
                    "link_yid": yid,
                    "url": format!("https://news.example/{}", yid),
                    "createdAt": "2024-05-01T08:30:00Z",
                    "source_channel": { "country_code": country },
                    "download_analysis": { "general-file-parser": { "processing_done": false } }
                }),
            )
            .unwrap();
    }
    store
}

fn csv_files(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_serve_without_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");
    let (_, stderr, success) = run_stuckmon(&missing, &["serve"]).await;
    assert!(!success);
    assert!(
        stderr.contains("Failed to read config file"),
        "stderr: {}",
        stderr
    );
}

#[tokio::test]
async fn test_malformed_config_is_not_ignored() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("stuckmon.toml");
    fs::write(&config_path, "[db\nuri = ").unwrap();

    let (_, stderr, success) = run_stuckmon(&config_path, &["dashboard"]).await;
    assert!(!success);
    assert!(
        stderr.contains("Failed to parse config file"),
        "stderr: {}",
        stderr
    );
}

#[tokio::test]
async fn test_invalid_config_is_not_ignored() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "127.0.0.1:2");
    let mut content = fs::read_to_string(&config).unwrap();
    content.push_str("\n[report]\nsample_limit = 0\n");
    fs::write(&config, content).unwrap();

    let (stdout, stderr, success) =
        run_stuckmon(&config, &["report", "website-scraping"]).await;
    assert!(!success);
    assert!(stderr.contains("sample_limit"), "stderr: {}", stderr);
    assert!(stdout.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_config_uses_server_flag() {
    let tmp = TempDir::new().unwrap();
    let bind = spawn_server(seeded_store()).await;
    let missing = tmp.path().join("absent.toml");
    let server = format!("http://{}", bind);

    let (stdout, stderr, success) = run_stuckmon(
        &missing,
        &["--server", &server, "report", "general-file-parser"],
    )
    .await;
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("Total:     3"), "stdout: {}", stdout);
}

#[tokio::test]
async fn test_unknown_stage_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "127.0.0.1:1");
    let (_, stderr, success) = run_stuckmon(&config, &["report", "articleclassifier"]).await;
    assert!(!success);
    assert!(stderr.contains("Unknown stage"), "stderr: {}", stderr);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_report_prints_filtered_rows() {
    let tmp = TempDir::new().unwrap();
    let bind = spawn_server(seeded_store()).await;
    let config = write_config(tmp.path(), &bind);

    let (stdout, stderr, success) =
        run_stuckmon(&config, &["report", "general-file-parser", "--country", "DE"]).await;
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("Stuck in General File Parser"));
    assert!(stdout.contains("Total:     2"), "stdout: {}", stdout);
    assert!(stdout.contains("https://news.example/b"));
    assert!(!stdout.contains("https://news.example/a"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_export_writes_displayed_rows() {
    let tmp = TempDir::new().unwrap();
    let bind = spawn_server(seeded_store()).await;
    let config = write_config(tmp.path(), &bind);

    let (stdout, stderr, success) = run_stuckmon(
        &config,
        &["export", "general-file-parser", "--country", "DE"],
    )
    .await;
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("Exported 2 row(s)"), "stdout: {}", stdout);

    let files = csv_files(&tmp.path().join("exports"));
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(
        name.starts_with("stuck-general-file-parser-2-items-"),
        "name: {}",
        name
    );
    let text = fs::read_to_string(&files[0]).unwrap();
    assert_eq!(text.lines().count(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_export_single_row() {
    let tmp = TempDir::new().unwrap();
    let bind = spawn_server(seeded_store()).await;
    let config = write_config(tmp.path(), &bind);
    let out_dir = tmp.path().join("single");

    let (_, stderr, success) = run_stuckmon(
        &config,
        &[
            "export",
            "general-file-parser",
            "--link-yid",
            "c",
            "--out-dir",
            out_dir.to_str().unwrap(),
        ],
    )
    .await;
    assert!(success, "stderr: {}", stderr);

    let files = csv_files(&out_dir);
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("stuck-general-file-parser-c-"), "name: {}", name);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_export_refuses_empty_view() {
    let tmp = TempDir::new().unwrap();
    let bind = spawn_server(seeded_store()).await;
    let config = write_config(tmp.path(), &bind);

    let (_, stderr, success) = run_stuckmon(
        &config,
        &["export", "general-file-parser", "--country", "FR"],
    )
    .await;
    assert!(!success);
    assert!(
        stderr.contains("No data available to download"),
        "stderr: {}",
        stderr
    );
    assert!(csv_files(&tmp.path().join("exports")).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dashboard_survives_unreachable_server() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "127.0.0.1:1");

    let (stdout, _, success) = run_stuckmon(&config, &["dashboard"]).await;
    assert!(success);
    assert!(stdout.contains("Pipeline Check Dashboard"));
    assert!(stdout.contains("unavailable"));
    assert!(stdout.contains("Total stuck: 0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dashboard_lists_every_stage() {
    let tmp = TempDir::new().unwrap();
    let bind = spawn_server(seeded_store()).await;
    let config = write_config(tmp.path(), &bind);

    let (stdout, stderr, success) = run_stuckmon(&config, &["dashboard"]).await;
    assert!(success, "stderr: {}", stderr);
    for stage in Stage::ALL {
        assert!(stdout.contains(stage.label()), "missing {}", stage.label());
    }
    assert!(stdout.contains("Total stuck: 3"));
    assert!(stdout.contains("Healthy: 3   Warning: 1   Critical: 0"));
}
