use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn radar_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("radar");
    path
}

const ANALYSIS: &str = r#"{
  "name": "Intercom",
  "description": "Conversational support platform with shared inbox and bots.",
  "category": "chat/messaging",
  "cx_relevance_score": 8,
  "integration_score": 6,
  "overall_score": 9.5,
  "key_features": ["Shared inbox", "Resolution bot"],
  "use_cases": ["Live chat", "Proactive messaging"],
  "integrations": ["Salesforce", "Slack"],
  "radar_position": "trial",
  "cost_rating": "$$$",
  "pricing_model": "Per seat",
  "reasoning": "Strong messaging, priced for mid-market."
}"#;

/// Messages API stand-in: rate-limits the first call, then answers with
/// a fenced analysis. Returns the base URL.
fn spawn_mock_model() -> String {
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let calls = Arc::new(AtomicUsize::new(0));
            let app = Router::new()
                .route("/v1/messages", post(handle_messages))
                .with_state(calls);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    let addr = rx.recv().unwrap();
    format!("http://{}", addr)
}

async fn handle_messages(
    State(calls): State<Arc<AtomicUsize>>,
    Json(_body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({ "error": { "type": "rate_limit_error" } })),
        );
    }
    let text = format!("Here you go:\n```json\n{}\n```", ANALYSIS);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn"
        })),
    )
}

fn setup_test_env(model_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"categories = ["CRM", "Helpdesk/Support", "Chat/Messaging", "Analytics", "Other"]

[scoring]
cx_weight = 0.6
integration_weight = 0.4

[db]
path = "{}/data/radar.db"

[llm]
base_url = "{}"
max_retries = 3
retry_base_ms = 10
timeout_secs = 10

[logging]
level = "warn"
"#,
        root.display(),
        model_url
    );

    let config_path = config_dir.join("radar.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_radar(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_radar_with_key(config_path, args, Some("test-key"))
}

fn run_radar_with_key(config_path: &Path, args: &[&str], key: Option<&str>) -> (String, String, bool) {
    let binary = radar_binary();
    let mut cmd = Command::new(&binary);
    cmd.arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("ANTHROPIC_MODEL")
        .env_remove("RUST_LOG");
    match key {
        Some(k) => cmd.env("ANTHROPIC_API_KEY", k),
        None => cmd.env_remove("ANTHROPIC_API_KEY"),
    };

    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run radar binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env("http://127.0.0.1:9");

    let (stdout, stderr, success) = run_radar(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/radar.db").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");

    let (_, _, success1) = run_radar(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_radar(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_empty_database() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    run_radar(&config_path, &["init"]);

    let (stdout, _, success) = run_radar(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Tools:       0"));

    let (stdout, _, success) = run_radar(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("No tools."));

    let (stdout, _, success) = run_radar(&config_path, &["search", "anything"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_add_retries_and_stores() {
    let model = spawn_mock_model();
    let (tmp, config_path) = setup_test_env(&model);
    run_radar(&config_path, &["init"]);

    let (stdout, stderr, success) = run_radar(
        &config_path,
        &["add", "Intercom is a messaging platform", "--url", "https://intercom.com"],
    );
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Added 'Intercom'"), "got: {}", stdout);

    // second add is a duplicate: warning, still a success
    let (_, stderr, success) = run_radar(&config_path, &["add", "Intercom again"]);
    assert!(success);
    assert!(stderr.contains("already exists"), "got: {}", stderr);

    let (stdout, _, success) = run_radar(&config_path, &["list", "--json"]);
    assert!(success);
    let tools: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["category"], "Chat/Messaging");
    assert_eq!(tools[0]["radar_position"], "Trial");
    assert_eq!(tools[0]["source_url"], "https://intercom.com");
    let overall = tools[0]["overall_score"].as_f64().unwrap();
    assert!((overall - 7.2).abs() < 1e-9, "overall_score {}", overall);

    let (stdout, _, _) = run_radar(&config_path, &["list", "--min-cx", "9"]);
    assert!(stdout.contains("No tools."));

    let (stdout, _, success) = run_radar(&config_path, &["search", "shared inbox"]);
    assert!(success);
    assert!(stdout.contains("Intercom"));

    let (stdout, _, success) = run_radar(&config_path, &["get", "Intercom"]);
    assert!(success);
    assert!(stdout.contains("Resolution bot"));

    let (stdout, _, success) = run_radar(&config_path, &["radar", "--json"]);
    assert!(success);
    let points: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(points[0]["ring"], 1);

    let (stdout, _, success) = run_radar(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Tools:       1"));
    assert!(stdout.contains("Recently added:"));

    let export_dir = tmp.path().join("exports");
    fs::create_dir_all(&export_dir).unwrap();
    let (_, stderr, success) = run_radar(
        &config_path,
        &["export", "--output", export_dir.to_str().unwrap()],
    );
    assert!(success, "export failed: {}", stderr);
    let csv = fs::read_to_string(export_dir.join("radar_tools.csv")).unwrap();
    assert!(csv.contains("Shared inbox; Resolution bot"));

    let backup_dir = tmp.path().join("backups");
    let (stdout, _, success) = run_radar(
        &config_path,
        &["backup", "--dir", backup_dir.to_str().unwrap()],
    );
    assert!(success);
    assert!(stdout.contains("radar_backup_"));
}

#[test]
fn test_analyze_json_does_not_save() {
    let model = spawn_mock_model();
    let (_tmp, config_path) = setup_test_env(&model);
    run_radar(&config_path, &["init"]);

    let (stdout, stderr, success) = run_radar(&config_path, &["analyze", "Intercom", "--json"]);
    assert!(success, "analyze failed: {}", stderr);
    let analysis: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(analysis["name"], "Intercom");
    assert_eq!(analysis["cost_rating"], "$$$");

    let (stdout, _, _) = run_radar(&config_path, &["list"]);
    assert!(stdout.contains("No tools."));
}

#[test]
fn test_add_without_api_key_fails() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    run_radar(&config_path, &["init"]);

    let (_, stderr, success) = run_radar_with_key(&config_path, &["add", "Something"], None);
    assert!(!success);
    assert!(stderr.contains("ANTHROPIC_API_KEY"), "got: {}", stderr);
}

#[test]
fn test_migrate_dir() {
    let (tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    run_radar(&config_path, &["init"]);

    let mig = tmp.path().join("migrations");
    fs::create_dir_all(&mig).unwrap();
    fs::write(mig.join("001_tags.sql"), "CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT);").unwrap();

    let (stdout, _, success) = run_radar(&config_path, &["migrate", "--dir", mig.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("Applied 001_tags"));

    let (stdout, _, success) = run_radar(&config_path, &["migrate", "--dir", mig.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("No pending migrations."));
}

#[test]
fn test_invalid_position_rejected() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    let (_, stderr, success) = run_radar(&config_path, &["list", "--position", "Maybe"]);
    assert!(!success);
    assert!(stderr.contains("invalid position"));
}

#[test]
fn test_add_before_init_fails_without_model_call() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");

    let (stdout, stderr, success) = run_radar(&config_path, &["add", "Intercom"]);
    assert!(!success);
    assert!(stderr.contains("radar init"), "got: {}", stderr);
    assert!(!stdout.contains("Category:"), "analysis ran before the schema check: {}", stdout);
}
