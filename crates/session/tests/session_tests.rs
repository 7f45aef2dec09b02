//! End-to-end sessions against a fake installer.
#![cfg(unix)]

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use projenv_core::{
    Arch, EnvironmentMutation, Error, LocalLauncher, LogSink, MemorySink, Os, PlatformInfo,
    ProcessLauncher, Result,
};
use projenv_session::{
    BodyOutcome, ExecutionContext, INSTALLER_PATH_NAME, Session, SessionConfig, SessionState,
};
use projenv_tools_release::ReleaseSource;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

enum Body {
    Exit(i32),
    Hang(Arc<Notify>),
}

struct TestContext {
    workspace: TempDir,
    temp_root: TempDir,
    env: HashMap<String, String>,
    sink: Arc<MemorySink>,
    body: Body,
    received: Mutex<Vec<EnvironmentMutation>>,
}

impl TestContext {
    fn new(body: Body) -> Self {
        Self {
            workspace: TempDir::new().unwrap(),
            temp_root: TempDir::new().unwrap(),
            env: std::env::vars().collect(),
            sink: Arc::new(MemorySink::new()),
            body,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Put a fake installer printing `manifest` on the search path.
    fn install_on_path(&mut self, manifest: &str, exit_code: i32) -> PathBuf {
        let bin = self.workspace.path().join("installer-bin");
        std::fs::create_dir_all(&bin).unwrap();
        let installer = bin.join("project-env-cli");
        write_script(&installer, &installer_script(manifest, exit_code));

        let path = self.env.get("PATH").cloned().unwrap_or_default();
        self.env
            .insert("PATH".to_string(), format!("{}:{path}", bin.display()));
        installer
    }

    fn bodies(&self) -> Vec<EnvironmentMutation> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionContext for TestContext {
    fn working_directory(&self) -> &Path {
        self.workspace.path()
    }

    fn environment(&self) -> &HashMap<String, String> {
        &self.env
    }

    fn launcher(&self) -> Arc<dyn ProcessLauncher> {
        Arc::new(LocalLauncher)
    }

    fn logger(&self) -> Arc<dyn LogSink> {
        self.sink.clone()
    }

    fn temp_root(&self) -> PathBuf {
        self.temp_root.path().to_path_buf()
    }

    fn platform(&self) -> Result<PlatformInfo> {
        Ok(PlatformInfo::new(Os::Linux, Arch::Amd64))
    }

    async fn invoke_body(
        &self,
        environment: &EnvironmentMutation,
        _platform: &PlatformInfo,
    ) -> Result<BodyOutcome> {
        self.received.lock().unwrap().push(environment.clone());
        match &self.body {
            Body::Exit(exit_code) => Ok(BodyOutcome {
                exit_code: *exit_code,
            }),
            Body::Hang(started) => {
                started.notify_one();
                std::future::pending::<Result<BodyOutcome>>().await
            }
        }
    }
}

fn installer_script(manifest: &str, exit_code: i32) -> String {
    format!(
        "#!/bin/sh\necho 'installing maven...' >&2\necho \"args: $*\" >&2\ncat <<'JSON'\n{manifest}\nJSON\nexit {exit_code}\n"
    )
}

fn write_script(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

const MANIFEST: &str = r#"{
  "jdk": [{"environmentVariables": {"JAVA_HOME": "/opt/jdk"}, "pathElements": ["/opt/jdk/bin"]}],
  "nodejs": [{"environmentVariables": {}, "pathElements": ["/opt/node/bin", "/opt/node/lib/bin"]}]
}"#;

fn offline_config() -> SessionConfig {
    SessionConfig {
        release: ReleaseSource::new("http://127.0.0.1:1"),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_session_with_installer_on_path() {
    let mut context = TestContext::new(Body::Exit(0));
    context.install_on_path(MANIFEST, 0);

    let mut session = Session::new(&context, offline_config());
    let outcome = session.run().await.unwrap();

    assert!(outcome.success());
    assert_eq!(session.state(), SessionState::Terminated);
    assert!(!session.temp_dir().unwrap().exists());

    let bodies = context.bodies();
    assert_eq!(bodies.len(), 1);
    let env = &bodies[0];
    assert_eq!(env.get("JAVA_HOME"), Some("/opt/jdk"));
    assert_eq!(env.get("PATH+JDK_0"), Some("/opt/jdk/bin"));
    assert_eq!(env.get("PATH+NODEJS_0"), Some("/opt/node/bin"));
    assert_eq!(env.get("PATH+NODEJS_1"), Some("/opt/node/lib/bin"));
    assert_eq!(env.get(&format!("PATH+{INSTALLER_PATH_NAME}")), None);

    let log = context.sink.lines();
    assert!(log.contains(&"installing maven...".to_string()), "{log:?}");
    assert!(
        log.contains(&"args: --config-file=project-env.toml".to_string()),
        "{log:?}"
    );
}

#[tokio::test]
async fn test_debug_flag_and_config_file_are_passed() {
    let mut context = TestContext::new(Body::Exit(0));
    context.install_on_path("{}", 0);

    let config = SessionConfig {
        cli_debug: true,
        config_file: "etc/project-env.toml".to_string(),
        ..offline_config()
    };
    Session::new(&context, config).run().await.unwrap();

    assert!(
        context
            .sink
            .lines()
            .contains(&"args: --config-file=etc/project-env.toml --debug".to_string())
    );
}

#[tokio::test]
async fn test_installer_failure_skips_body() {
    let mut context = TestContext::new(Body::Exit(0));
    context.install_on_path("{}", 7);

    let mut session = Session::new(&context, offline_config());
    let err = session.run().await.unwrap_err();

    assert!(matches!(err, Error::InstallerFailed { exit_code: 7 }), "{err}");
    assert!(context.bodies().is_empty());
    assert_eq!(session.state(), SessionState::Terminated);
    assert!(!session.temp_dir().unwrap().exists());
}

#[tokio::test]
async fn test_invalid_manifest_skips_body() {
    let mut context = TestContext::new(Body::Exit(0));
    context.install_on_path("this is not json", 0);

    let mut session = Session::new(&context, offline_config());
    let err = session.run().await.unwrap_err();

    assert!(matches!(err, Error::ManifestParse { .. }), "{err}");
    assert!(context.bodies().is_empty());
    assert!(!session.temp_dir().unwrap().exists());
}

#[tokio::test]
async fn test_failed_download_cleans_up() {
    let context = TestContext::new(Body::Exit(0));
    let config = SessionConfig {
        cli_version: Some("1.0.0".to_string()),
        features: projenv_session::StageFlags {
            probe_search_path: false,
            ..Default::default()
        },
        ..offline_config()
    };

    let mut session = Session::new(&context, config);
    let err = session.run().await.unwrap_err();

    assert!(matches!(err, Error::Network { .. }), "{err}");
    assert!(context.bodies().is_empty());
    assert!(!session.temp_dir().unwrap().exists());
    assert_eq!(
        std::fs::read_dir(context.temp_root.path()).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn test_body_failure_is_passed_through() {
    let mut context = TestContext::new(Body::Exit(42));
    context.install_on_path("{}", 0);

    let mut session = Session::new(&context, offline_config());
    let outcome = session.run().await.unwrap();

    assert_eq!(outcome.exit_code, 42);
    assert!(!session.temp_dir().unwrap().exists());
}

#[tokio::test]
async fn test_downloaded_installer_is_put_on_path() {
    let server = MockServer::start().await;
    let script = installer_script(MANIFEST, 0);

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_path("project-env-cli").unwrap();
    header.set_size(script.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append(&header, script.as_bytes()).unwrap();
    let archive = builder.into_inner().unwrap().finish().unwrap();

    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/releases/tag/v3.4.1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/releases/download/v3.4.1/cli-3.4.1-linux-amd64.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(1)
        .mount(&server)
        .await;

    let context = TestContext::new(Body::Exit(0));
    let config = SessionConfig {
        release: ReleaseSource::new(server.uri()),
        features: projenv_session::StageFlags {
            probe_search_path: false,
            ..Default::default()
        },
        ..SessionConfig::default()
    };

    let mut session = Session::new(&context, config);
    session.run().await.unwrap();

    let temp_dir = session.temp_dir().unwrap().to_path_buf();
    assert!(
        temp_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("withProjectEnv")
    );
    assert!(!temp_dir.exists());

    let env = &context.bodies()[0];
    assert_eq!(
        env.get(&format!("PATH+{INSTALLER_PATH_NAME}")),
        Some(temp_dir.to_string_lossy().as_ref())
    );
    assert_eq!(env.get("JAVA_HOME"), Some("/opt/jdk"));
}

#[tokio::test]
async fn test_abandoned_session_still_cleans_up() {
    let started = Arc::new(Notify::new());
    let mut context = TestContext::new(Body::Hang(started.clone()));
    context.install_on_path("{}", 0);

    let mut session = Session::new(&context, offline_config());
    {
        let run = session.run();
        tokio::pin!(run);
        tokio::select! {
            _ = &mut run => unreachable!("body never completes"),
            () = started.notified() => {}
        }
    }

    assert_eq!(session.state(), SessionState::BodyRunning);
    assert!(!session.temp_dir().unwrap().exists());
}

#[tokio::test]
async fn test_maven_launcher_is_wrapped() {
    let mut context = TestContext::new(Body::Exit(0));
    let bin = context.workspace.path().join("tools/maven/bin");
    std::fs::create_dir_all(&bin).unwrap();
    let mvn = bin.join("mvn");
    write_script(&mvn, "#!/bin/sh\necho maven\n");

    let manifest = serde_json::json!({
        "maven": [{
            "primaryExecutable": mvn,
            "environmentVariables": {"MAVEN_HOME": bin.parent().unwrap()},
            "pathElements": [bin],
            "unhandledProjectResources": {"userSettingsFile": "/etc/settings.xml"}
        }]
    });
    context.install_on_path(&manifest.to_string(), 0);

    Session::new(&context, offline_config()).run().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(bin.join("_mvn")).unwrap(),
        "#!/bin/sh\necho maven\n"
    );
    assert!(
        std::fs::read_to_string(&mvn)
            .unwrap()
            .contains("-s /etc/settings.xml")
    );
}
