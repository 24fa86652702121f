// ABOUTME: Integration tests for hook-script notifications.
// ABOUTME: Tests hook selection, execution, and environment variable passing.

use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use swapdock::deploy::DeploymentOutcome;
use swapdock::notify::{HookNotifier, HookPoint, Notifier, NotifyError};
use swapdock::types::AppName;
use tempfile::TempDir;

fn create_hook(dir: &TempDir, name: &str, script: &str) {
    let hook_path = dir.path().join(name);
    fs::write(&hook_path, script).unwrap();

    // Make executable
    let mut perms = fs::metadata(&hook_path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&hook_path, perms).unwrap();
}

fn outcome(success: bool) -> DeploymentOutcome {
    DeploymentOutcome {
        app: AppName::new("shop").unwrap(),
        user: "alice".to_string(),
        success,
        services: Vec::new(),
        params: BTreeMap::from([("ref".to_string(), "main".to_string())]),
        warnings: Vec::new(),
        app_url: Some("https://shop.example.com".to_string()),
        host: "deploy-host".to_string(),
        finished_at: Utc::now(),
    }
}

/// Test: on-success runs with the outcome in its environment.
#[tokio::test]
async fn success_hook_receives_environment() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("env.txt");
    create_hook(
        &dir,
        "on-success",
        &format!(
            "#!/bin/sh\necho \"$SWAPDOCK_APP $SWAPDOCK_USER $SWAPDOCK_SUCCESS $SWAPDOCK_APP_URL\" > {}\necho \"$SWAPDOCK_OUTCOME\" >> {}\n",
            out.display(),
            out.display()
        ),
    );

    let notifier = HookNotifier::new(dir.path());
    assert!(notifier.hook_exists(HookPoint::OnSuccess));
    notifier.notify(&outcome(true)).await.unwrap();

    let written = fs::read_to_string(&out).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("shop alice true https://shop.example.com")
    );
    let json: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
    assert_eq!(json["params"]["ref"], "main");
}

/// Test: a failed deployment runs on-failure and not on-success.
#[tokio::test]
async fn failure_selects_failure_hook() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ran");
    create_hook(&dir, "on-success", "#!/bin/sh\nexit 1\n");
    create_hook(
        &dir,
        "on-failure",
        &format!("#!/bin/sh\ntouch {}\n", marker.display()),
    );

    HookNotifier::new(dir.path())
        .notify(&outcome(false))
        .await
        .unwrap();

    assert!(marker.exists());
}

/// Test: missing hooks are not an error.
#[tokio::test]
async fn missing_hook_is_skipped() {
    let dir = TempDir::new().unwrap();
    let notifier = HookNotifier::new(dir.path());
    assert!(!notifier.hook_exists(HookPoint::OnFailure));
    notifier.notify(&outcome(false)).await.unwrap();
}

/// Test: a non-zero exit is reported with stderr.
#[tokio::test]
async fn failing_hook_reports_stderr() {
    let dir = TempDir::new().unwrap();
    create_hook(&dir, "on-success", "#!/bin/sh\necho 'mail relay down' >&2\nexit 3\n");

    let err = HookNotifier::new(dir.path())
        .notify(&outcome(true))
        .await
        .unwrap_err();

    match err {
        NotifyError::HookFailed { code, stderr, .. } => {
            assert_eq!(code, Some(3));
            assert_eq!(stderr, "mail relay down");
        }
        other => panic!("unexpected error: {other}"),
    }
}
