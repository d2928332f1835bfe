use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

const FIXTURE_PBXPROJ: &str = include_str!("../../locbridge/tests/fixtures/project.pbxproj");

fn locbridge_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("locbridge"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A Cordova-style project with both platforms added.
fn cordova_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "config.xml",
        r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="com.example.demo" version="1.0.0" xmlns="http://www.w3.org/ns/widgets">
    <name>Demo</name>
</widget>
"#,
    );
    write(
        root,
        "translations/app/en.json",
        r#"{
            "locale": { "ios": ["en", "fr"] },
            "app": { "greeting": "Hello %1$@", "owner": "Bob's" },
            "config_android": { "app_name": "Demo" },
            "config_ios": { "CFBundleDisplayName": "Demo" }
        }"#,
    );
    write(
        root,
        "translations/app/de.json",
        r#"{ "app": { "greeting": "Hallo %1$@" } }"#,
    );
    fs::create_dir_all(root.join("platforms/android/app/src/main/res")).unwrap();
    write(root, "platforms/ios/Demo.xcodeproj/project.pbxproj", FIXTURE_PBXPROJ);
    dir
}

#[test]
fn test_run_renders_both_platforms() {
    let project = cordova_project();
    let root = project.path();

    let output = locbridge_cmd()
        .args(["run", "--project-root"])
        .arg(root)
        .output()
        .expect("Failed to execute command");
    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let res = root.join("platforms/android/app/src/main/res");
    let values = fs::read_to_string(res.join("values/strings.xml")).unwrap();
    assert!(values.contains("<string name=\"greeting\">Hello %1$s</string>"));
    assert!(values.contains("<string name=\"owner\">Bob\\'s</string>"));
    assert!(values.contains("<string name=\"app_name\">Demo</string>"));
    assert!(res.join("values-de/strings.xml").is_file());

    let resources = root.join("platforms/ios/Demo/Resources");
    for locale in ["en", "fr", "de"] {
        assert!(
            resources
                .join(format!("{}.lproj/Localizable.strings", locale))
                .is_file()
        );
    }
    let pbxproj = fs::read_to_string(root.join("platforms/ios/Demo.xcodeproj/project.pbxproj")).unwrap();
    assert!(pbxproj.contains("path = fr.lproj/Localizable.strings;"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Saved:"));
    assert!(stderr.contains("reload any cached copy"));
}

#[test]
fn test_platform_flag_limits_output() {
    let project = cordova_project();
    let root = project.path();

    let status = locbridge_cmd()
        .args(["run", "--platform", "android", "--project-root"])
        .arg(root)
        .status()
        .expect("Failed to execute command");
    assert!(status.success());

    assert!(root.join("platforms/android/app/src/main/res/values/strings.xml").is_file());
    assert!(!root.join("platforms/ios/Demo/Resources").exists());
    assert_eq!(
        fs::read_to_string(root.join("platforms/ios/Demo.xcodeproj/project.pbxproj")).unwrap(),
        FIXTURE_PBXPROJ
    );
}

#[test]
fn test_config_file_and_flag_precedence() {
    let project = cordova_project();
    let root = project.path();
    write(
        root,
        "locbridge.toml",
        r#"
platforms = ["android"]
android_res = "custom/res"
default_locale = "de"
"#,
    );

    let status = locbridge_cmd()
        .args(["run", "--default-locale", "fr", "--project-root"])
        .arg(root)
        .status()
        .expect("Failed to execute command");
    assert!(status.success());

    let res = root.join("custom/res");
    assert!(res.join("values-de/strings.xml").is_file());
    assert!(res.join("values-en/strings.xml").is_file());
    assert!(!res.join("values/strings.xml").exists());
}

#[test]
fn test_missing_translations_exits_with_error() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("platforms/android")).unwrap();

    let output = locbridge_cmd()
        .args(["run", "--project-root"])
        .arg(dir.path())
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_json_exits_with_error() {
    let project = cordova_project();
    let root = project.path();
    write(root, "translations/app/fr.json", "{ not json");

    let output = locbridge_cmd()
        .args(["run", "--project-root"])
        .arg(root)
        .output()
        .expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("fr.json"));
}

#[test]
fn test_unknown_platform_is_rejected() {
    let output = locbridge_cmd()
        .args(["run", "--platform", "windows"])
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success());
}

#[test]
fn test_completions() {
    let output = locbridge_cmd()
        .args(["completions", "bash"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("locbridge"));
}
