use assert_cmd::Command;
use assert_cmd::cargo;
use mavenkit::cache::sha1_hex;
use mockito::{Server, ServerGuard};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// Writes a settings file that only knows the mock repository.
fn write_settings(dir: &Path, repositories: &[(&str, &str)]) -> PathBuf {
    let entries: Vec<String> = repositories
        .iter()
        .map(|(id, url)| format!(r#"{{"id": "{}", "url": "{}"}}"#, id, url))
        .collect();
    let json = format!(
        r#"{{"use_presets": false, "max_retries": 1, "retry_delay_ms": 0,
            "repositories": [{}]}}"#,
        entries.join(",")
    );
    let path = dir.join("settings.json");
    std::fs::write(&path, json).unwrap();
    path
}

struct Env {
    _dir: TempDir,
    settings: PathBuf,
    local_repo: PathBuf,
}

impl Env {
    fn new(repositories: &[(&str, &str)]) -> Self {
        let dir = tempdir().unwrap();
        let settings = write_settings(dir.path(), repositories);
        let local_repo = dir.path().join("m2");
        Self {
            _dir: dir,
            settings,
            local_repo,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("mavenkit"));
        cmd.arg("--settings")
            .arg(&self.settings)
            .arg("--local-repo")
            .arg(&self.local_repo)
            .env_remove("MAVENKIT_LOCAL_REPO")
            .env_remove("MAVENKIT_PASSWORD");
        cmd
    }
}

fn mock_metadata(server: &mut ServerGuard, group_path: &str, name: &str, versions: &[&str]) {
    let listed: String = versions
        .iter()
        .map(|v| format!("<version>{}</version>", v))
        .collect();
    server
        .mock("GET", format!("/{}/{}/maven-metadata.xml", group_path, name).as_str())
        .with_status(200)
        .with_body(format!(
            "<metadata><versioning><versions>{}</versions></versioning></metadata>",
            listed
        ))
        .create();
}

/// Serves `body` at `path` with a matching `.sha1` sidecar.
fn mock_file(server: &mut ServerGuard, path: &str, body: &[u8]) {
    server
        .mock("GET", path)
        .with_status(200)
        .with_body(body)
        .create();
    server
        .mock("GET", format!("{}.sha1", path).as_str())
        .with_status(200)
        .with_body(sha1_hex(body))
        .create();
}

#[test]
fn test_versions_and_latest() {
    let mut server = Server::new();
    mock_metadata(&mut server, "org/example", "lib", &["1.0", "1.2", "2.0-SNAPSHOT"]);
    let env = Env::new(&[("mock", &server.url())]);

    env.cmd()
        .arg("versions")
        .arg("org.example:lib:[1.0,1.5)")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0 mock"))
        .stdout(predicate::str::contains("1.2 mock"))
        .stdout(predicate::str::contains("SNAPSHOT").not());

    env.cmd()
        .arg("latest")
        .arg("org.example:lib")
        .assert()
        .success()
        .stdout("1.2\n");
}

#[test]
fn test_versions_of_unknown_artifact_fails() {
    let mut server = Server::new();
    server
        .mock("GET", "/org/example/ghost/maven-metadata.xml")
        .with_status(404)
        .create();
    let env = Env::new(&[("mock", &server.url())]);

    env.cmd()
        .arg("versions")
        .arg("org.example:ghost:[1,)")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No versions of org.example:ghost"));
}

#[test]
fn test_fetch_installs_artifact_and_checksum() {
    let mut server = Server::new();
    mock_metadata(&mut server, "org/example", "lib", &["1.0", "1.2"]);
    mock_file(&mut server, "/org/example/lib/1.2/lib-1.2.jar", b"jar-bytes");
    let env = Env::new(&[("mock", &server.url())]);

    env.cmd()
        .arg("fetch")
        .arg("org.example:lib:[1.0,)")
        .assert()
        .success()
        .stdout(predicate::str::contains("lib-1.2.jar"));

    let jar = env.local_repo.join("org/example/lib/1.2/lib-1.2.jar");
    assert_eq!(std::fs::read(&jar).unwrap(), b"jar-bytes");
    assert_eq!(
        std::fs::read_to_string(env.local_repo.join("org/example/lib/1.2/lib-1.2.jar.sha1")).unwrap(),
        sha1_hex(b"jar-bytes")
    );
    assert!(!env
        .local_repo
        .join("org/example/lib/maven-metadata-mock.xml")
        .exists());

    // Served from the local repository alone from now on
    drop(server);
    env.cmd()
        .arg("fetch")
        .arg("org.example:lib:1.2")
        .assert()
        .success()
        .stdout(predicate::str::contains("lib-1.2.jar"));
}

#[test]
fn test_fetch_unresolvable_fails() {
    let mut server = Server::new();
    server
        .mock("GET", "/org/example/lib/9.9/lib-9.9.jar")
        .with_status(404)
        .create();
    let env = Env::new(&[("mock", &server.url())]);

    env.cmd()
        .arg("fetch")
        .arg("org.example:lib:9.9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not resolve org.example:lib:9.9"));
}

#[test]
fn test_classpath_filters_scopes_and_excludes_root() {
    let mut server = Server::new();
    let root_pom = r#"<project>
        <groupId>org.example</groupId><artifactId>app</artifactId><version>1.0</version>
        <dependencies>
          <dependency><groupId>org.example</groupId><artifactId>core</artifactId><version>1.0</version></dependency>
          <dependency><groupId>junit</groupId><artifactId>junit</artifactId><version>4.13</version><scope>test</scope></dependency>
          <dependency><groupId>org.example</groupId><artifactId>extra</artifactId><version>1.0</version><optional>true</optional></dependency>
          <dependency><groupId>org.example</groupId><artifactId>legacy</artifactId><version>1.0</version></dependency>
        </dependencies>
      </project>"#;
    mock_file(&mut server, "/org/example/app/1.0/app-1.0.pom", root_pom.as_bytes());
    mock_file(
        &mut server,
        "/org/example/core/1.0/core-1.0.pom",
        b"<project><groupId>org.example</groupId><artifactId>core</artifactId><version>1.0</version></project>",
    );
    mock_file(&mut server, "/org/example/core/1.0/core-1.0.jar", b"core");
    let env = Env::new(&[("mock", &server.url())]);

    env.cmd()
        .arg("classpath")
        .arg("org.example:app:1.0")
        .arg("--exclude")
        .arg("org.example:legacy")
        .assert()
        .success()
        .stdout(predicate::str::contains("core-1.0.jar"))
        .stdout(predicate::str::contains("app-1.0").not())
        .stdout(predicate::str::contains("junit").not())
        .stdout(predicate::str::contains("extra").not())
        .stdout(predicate::str::contains("legacy").not());
}

#[test]
fn test_validate_reports_not_found_as_success() {
    let mut server = Server::new();
    server
        .mock("GET", "/test/test/1.0/test-1.0.jar")
        .with_status(404)
        .create();
    let env = Env::new(&[]);

    env.cmd()
        .arg("validate")
        .arg("--id")
        .arg("probe")
        .arg("--url")
        .arg(server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains("reachable"));
}

#[test]
fn test_validate_reports_rejected_credentials() {
    let mut server = Server::new();
    server
        .mock("GET", "/test/test/1.0/test-1.0.jar")
        .with_status(401)
        .create();
    let env = Env::new(&[]);

    env.cmd()
        .args(["validate", "--id", "private", "--url"])
        .arg(server.url())
        .args(["--username", "joe", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn test_repo_add_persists_and_lists() {
    let mut server = Server::new();
    server
        .mock("GET", "/test/test/1.0/test-1.0.jar")
        .with_status(404)
        .create();
    let env = Env::new(&[]);

    env.cmd()
        .args(["repo", "add", "--id", "corp", "--url"])
        .arg(server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains("Added repository 'corp'"));

    env.cmd()
        .arg("repos")
        .assert()
        .success()
        .stdout(predicate::str::contains("corp"))
        .stdout(predicate::str::contains("[user]"));

    env.cmd()
        .args(["repo", "add", "--id", "corp", "--url"])
        .arg(server.url())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_library_list() {
    let library = tempdir().unwrap();
    std::fs::write(library.path().join("controls.jar"), b"jar").unwrap();
    std::fs::write(library.path().join("readme.txt"), b"text").unwrap();
    let env = Env::new(&[]);

    env.cmd()
        .args(["library", "list"])
        .arg(library.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("jar "))
        .stdout(predicate::str::contains("controls.jar"))
        .stdout(predicate::str::contains("readme.txt").not());
}

#[test]
fn test_library_add_resolve_and_remove() {
    let mut server = Server::new();
    mock_file(&mut server, "/org/example/controls/2.0/controls-2.0.jar", b"controls");
    let env = Env::new(&[("mock", &server.url())]);
    let library = tempdir().unwrap();
    let jar = env.local_repo.join("org/example/controls/2.0/controls-2.0.jar");

    env.cmd()
        .args(["library", "add"])
        .arg(library.path())
        .arg("org.example:controls:2.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("controls-2.0.jar"));
    assert!(jar.exists());
    let marker = std::fs::read_to_string(library.path().join("library.jars")).unwrap();
    assert_eq!(marker.lines().count(), 1);
    let recorded = PathBuf::from(marker.trim());

    env.cmd()
        .args(["library", "list"])
        .arg(library.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("controls-2.0.jar (linked)"));

    // A deleted jar is fetched again
    std::fs::remove_file(&jar).unwrap();
    env.cmd()
        .args(["library", "resolve"])
        .arg(library.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("controls-2.0.jar"));
    assert_eq!(std::fs::read(&jar).unwrap(), b"controls");

    env.cmd()
        .args(["library", "remove"])
        .arg(library.path())
        .arg(&recorded)
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(jar.exists());
    assert_eq!(
        std::fs::read_to_string(library.path().join("library.jars")).unwrap(),
        ""
    );

    env.cmd()
        .args(["library", "remove"])
        .arg(library.path())
        .arg(&recorded)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not part of library"));
}

#[test]
fn test_library_resolve_reports_lost_jars() {
    let mut server = Server::new();
    server
        .mock("GET", "/org/example/gone/1.0/gone-1.0.jar")
        .with_status(404)
        .create();
    let env = Env::new(&[("mock", &server.url())]);
    let library = tempdir().unwrap();
    let lost = std::path::absolute(&env.local_repo)
        .unwrap()
        .join("org/example/gone/1.0/gone-1.0.jar");
    std::fs::write(
        library.path().join("library.jars"),
        format!("{}\n", lost.display()),
    )
    .unwrap();

    env.cmd()
        .args(["library", "resolve"])
        .arg(library.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 jar(s)"));
}

#[test]
fn test_version_flag() {
    Command::new(cargo::cargo_bin!("mavenkit"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("mavenkit"));
}
