use std::path::{Path, PathBuf};
use std::time::Duration;

use ferrule::build::checksum;
use ferrule::build::package::{Packager, archive_path};
use ferrule::cloud::api::{ApiError, Operation};
use ferrule::cloud::client::GcloudClient;
use ferrule::cloud::executor::GcloudExecutor;
use ferrule::cloud::functions::FunctionsApi;
use ferrule::cloud::gcloud::GcloudError;
use ferrule::cloud::run::RunApi;
use ferrule::cloud::transport::{ArtifactTransport, TransportError};
use ferrule::{
    App, AppError, Backend, DeployError, DeployOptions, Deployer, DeploymentTarget, FerruleConfig,
};
use mockall::{Sequence, mock};
use serde_json::{Value, json};

mock! {
    Functions {}

    impl FunctionsApi for Functions {
        async fn get_function(&self, name: &str) -> Result<Option<Value>, ApiError>;
        async fn generate_upload_url(&self, parent: &str) -> Result<String, ApiError>;
        async fn generate_download_url(&self, name: &str) -> Result<String, ApiError>;
        async fn create_function(&self, parent: &str, body: &Value) -> Result<Operation, ApiError>;
        async fn patch_function(&self, name: &str, body: &Value) -> Result<Operation, ApiError>;
        async fn get_operation(&self, name: &str) -> Result<Operation, ApiError>;
        async fn delete_function(&self, name: &str) -> Result<(), ApiError>;
        async fn set_iam_policy(&self, name: &str, bindings: &[Value]) -> Result<(), ApiError>;
    }
}

mock! {
    Transport {}

    impl ArtifactTransport for Transport {
        async fn put_archive(&self, url: &str, path: &Path, size: u64) -> Result<(), TransportError>;
        async fn content_hash(&self, url: &str) -> Result<String, TransportError>;
    }
}

mock! {
    Run {}

    impl RunApi for Run {
        async fn set_iam_policy(&self, service: &str, bindings: &[Value]) -> Result<(), ApiError>;
        async fn delete_service(&self, service: &str) -> Result<(), ApiError>;
    }
}

mock! {
    Executor {}

    impl GcloudExecutor for Executor {
        async fn exec(&self, args: &[String]) -> Result<String, GcloudError>;
        async fn exec_streaming(&self, args: &[String]) -> Result<(), GcloudError>;
    }
}

mock! {
    Application {}

    impl App for Application {
        fn name(&self) -> &str;
        fn is_http(&self) -> bool;
        async fn deploy<'a>(&self, source_upload_url: Option<&'a str>) -> Result<(), AppError>;
        async fn destroy(&self) -> Result<(), AppError>;
    }
}

const PARENT: &str = "projects/proj/locations/us-central1";
const FUNCTION: &str = "projects/proj/locations/us-central1/functions/hello";
const SERVICE: &str = "projects/proj/locations/us-central1/services/hello";
const UPLOAD_URL: &str = "https://storage.test/upload?sig=1";
const DOWNLOAD_URL: &str = "https://storage.test/download?sig=2";

type TestDeployer = Deployer<MockFunctions, MockTransport, MockRun, MockExecutor>;

/// Collaborators for one deployer; tests set expectations before `build`.
#[derive(Default)]
struct Mocks {
    functions: MockFunctions,
    transport: MockTransport,
    run: MockRun,
    executor: MockExecutor,
}

impl Mocks {
    fn build(self, dir: &Path, backend: Backend) -> TestDeployer {
        let target = DeploymentTarget::new("hello", "proj", "us-central1", backend).unwrap();
        Deployer::new(
            target,
            dir,
            self.functions,
            self.transport,
            self.run,
            GcloudClient::with_executor(self.executor),
        )
        .with_poll_interval(Duration::ZERO)
    }

    fn existing_function(&mut self, seq: &mut Sequence) {
        self.functions
            .expect_get_function()
            .withf(|name| name == FUNCTION)
            .times(1)
            .in_sequence(seq)
            .returning(|name| Ok(Some(json!({ "name": name }))));
    }

    fn deployed_hash(&mut self, seq: &mut Sequence, md5: impl Fn() -> String + Send + 'static) {
        self.functions
            .expect_generate_download_url()
            .withf(|name| name == FUNCTION)
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(DOWNLOAD_URL.to_owned()));
        self.transport
            .expect_content_hash()
            .withf(|url| url == DOWNLOAD_URL)
            .times(1)
            .in_sequence(seq)
            .returning(move |_| Ok(format!("crc32c=n03x6A==,md5={}", md5())));
    }

    fn upload(&mut self, seq: &mut Sequence, archive: PathBuf) {
        self.functions
            .expect_generate_upload_url()
            .withf(|parent| parent == PARENT)
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(UPLOAD_URL.to_owned()));
        self.transport
            .expect_put_archive()
            .withf(move |url, path, size| url == UPLOAD_URL && path == archive.as_path() && *size > 0)
            .times(1)
            .in_sequence(seq)
            .returning(|_, _, _| Ok(()));
    }

    fn create(&mut self, seq: &mut Sequence) {
        self.functions
            .expect_create_function()
            .withf(|parent, body| parent == PARENT && body["sourceUploadUrl"] == UPLOAD_URL)
            .times(1)
            .in_sequence(seq)
            .returning(|_, _| Ok(done("operations/1")));
    }
}

fn done(name: &str) -> Operation {
    Operation {
        name: name.to_owned(),
        done: true,
        error: None,
    }
}

fn status_error(status: u16) -> ApiError {
    ApiError::Status {
        method: "DELETE".to_owned(),
        url: "https://example.test".to_owned(),
        status,
        body: String::new(),
    }
}

fn command_failed(args: &[String]) -> GcloudError {
    GcloudError::CommandFailed {
        args: args.to_vec(),
        stderr: "exit code: exit status: 1".to_owned(),
    }
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("requirements.txt"), "ferrule\n").unwrap();
    std::fs::write(
        dir.path().join("main.py"),
        "def ferrule_entrypoint(request):\n    return 'ok'\n",
    )
    .unwrap();
    dir
}

fn app(http: bool) -> MockApplication {
    let mut app = MockApplication::new();
    app.expect_name().return_const("hello".to_owned());
    app.expect_is_http().return_const(http);
    app
}

fn expect_app_deploy(app: &mut MockApplication, seq: &mut Sequence, url: Option<&'static str>) {
    app.expect_deploy()
        .withf(move |given| *given == url)
        .times(1)
        .in_sequence(seq)
        .returning(|_| Ok(()));
}

fn expect_app_destroy(app: &mut MockApplication, seq: &mut Sequence) {
    app.expect_destroy()
        .times(1)
        .in_sequence(seq)
        .returning(|| Ok(()));
}

// ── Deploy ──

#[tokio::test]
async fn first_deploy_uploads_and_creates_once() {
    let dir = project();
    let archive = archive_path(dir.path(), "hello");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    mocks
        .functions
        .expect_get_function()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(None));
    mocks.transport.expect_content_hash().never();
    mocks.upload(&mut seq, archive.clone());
    mocks.create(&mut seq);
    expect_app_deploy(&mut app, &mut seq, Some(UPLOAD_URL));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &DeployOptions::default(), &FerruleConfig::default())
        .await
        .unwrap();

    assert!(archive.is_file());
}

#[tokio::test]
async fn unchanged_source_skips_upload() {
    let dir = project();
    let archive = archive_path(dir.path(), "hello");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    mocks.existing_function(&mut seq);
    mocks.deployed_hash(&mut seq, move || checksum::file_digest(&archive).unwrap());
    mocks.functions.expect_generate_upload_url().never();
    mocks.transport.expect_put_archive().never();
    mocks.functions.expect_create_function().never();
    expect_app_deploy(&mut app, &mut seq, None);

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &DeployOptions::default(), &FerruleConfig::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn changed_source_uploads() {
    let dir = project();
    let archive = archive_path(dir.path(), "hello");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    mocks.existing_function(&mut seq);
    mocks.deployed_hash(&mut seq, || "AAAAAAAAAAAAAAAAAAAAAA==".to_owned());
    mocks.upload(&mut seq, archive);
    mocks.create(&mut seq);
    expect_app_deploy(&mut app, &mut seq, Some(UPLOAD_URL));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &DeployOptions::default(), &FerruleConfig::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn deleted_source_counts_as_changed() {
    let dir = project();
    let archive = archive_path(dir.path(), "hello");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    mocks.existing_function(&mut seq);
    mocks
        .functions
        .expect_generate_download_url()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(DOWNLOAD_URL.to_owned()));
    mocks
        .transport
        .expect_content_hash()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|url| {
            Err(TransportError::Status {
                url: url.to_owned(),
                status: 404,
            })
        });
    mocks.upload(&mut seq, archive);
    mocks.create(&mut seq);
    expect_app_deploy(&mut app, &mut seq, Some(UPLOAD_URL));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &DeployOptions::default(), &FerruleConfig::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn force_uploads_without_comparing() {
    let dir = project();
    let archive = archive_path(dir.path(), "hello");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    mocks.functions.expect_get_function().never();
    mocks.transport.expect_content_hash().never();
    mocks.upload(&mut seq, archive);
    mocks.create(&mut seq);
    expect_app_deploy(&mut app, &mut seq, Some(UPLOAD_URL));

    let options = DeployOptions {
        force: true,
        ..Default::default()
    };
    mocks
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &options, &FerruleConfig::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn non_http_app_uploads_without_function() {
    let dir = project();
    let archive = archive_path(dir.path(), "hello");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(false);

    mocks
        .functions
        .expect_get_function()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(None));
    mocks.upload(&mut seq, archive);
    mocks.functions.expect_create_function().never();
    expect_app_deploy(&mut app, &mut seq, Some(UPLOAD_URL));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &DeployOptions::default(), &FerruleConfig::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn skip_function_runs_only_the_app() {
    let dir = project();
    let mut seq = Sequence::new();
    let mut app = app(true);
    expect_app_deploy(&mut app, &mut seq, None);

    let options = DeployOptions {
        skip_function: true,
        ..Default::default()
    };
    Mocks::default()
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &options, &FerruleConfig::default())
        .await
        .unwrap();

    assert!(!archive_path(dir.path(), "hello").exists());
}

#[tokio::test]
async fn only_function_skips_the_app() {
    let dir = project();
    let archive = archive_path(dir.path(), "hello");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    mocks
        .functions
        .expect_get_function()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(None));
    mocks.upload(&mut seq, archive);
    mocks.create(&mut seq);
    app.expect_deploy().never();

    let options = DeployOptions {
        only_function: true,
        ..Default::default()
    };
    mocks
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &options, &FerruleConfig::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn function_bindings_applied_after_create() {
    let dir = project();
    let archive = archive_path(dir.path(), "hello");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);
    let config = FerruleConfig {
        bindings: vec![json!({"role": "roles/cloudfunctions.invoker", "members": ["allUsers"]})],
        ..Default::default()
    };

    mocks
        .functions
        .expect_get_function()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(None));
    mocks.upload(&mut seq, archive);
    mocks.create(&mut seq);
    mocks
        .functions
        .expect_set_iam_policy()
        .withf(|name, bindings| name == FUNCTION && bindings.len() == 1)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    expect_app_deploy(&mut app, &mut seq, Some(UPLOAD_URL));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &DeployOptions::default(), &config)
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_manifest_stops_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(true);
    app.expect_deploy().never();

    let result = Mocks::default()
        .build(dir.path(), Backend::CloudFunction)
        .deploy(&app, &DeployOptions::default(), &FerruleConfig::default())
        .await;

    let Err(err) = result else {
        panic!("deploy without requirements.txt succeeded");
    };
    assert!(matches!(err, DeployError::Package { .. }));
}

#[tokio::test]
async fn cloud_run_deploys_through_gcloud() {
    let dir = project();
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    mocks
        .executor
        .expect_exec_streaming()
        .withf(|args| args.starts_with(&["run".to_owned(), "deploy".to_owned(), "hello".to_owned()]))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    mocks.run.expect_set_iam_policy().never();
    expect_app_deploy(&mut app, &mut seq, None);

    mocks
        .build(dir.path(), Backend::CloudRun)
        .deploy(&app, &DeployOptions::default(), &FerruleConfig::default())
        .await
        .unwrap();

    assert!(dir.path().join("Dockerfile").is_file());
}

#[tokio::test]
async fn cloud_run_failure_is_fatal_and_stops() {
    let dir = project();
    let mut mocks = Mocks::default();
    let mut app = app(true);
    let config = FerruleConfig {
        bindings: vec![json!({"role": "roles/run.invoker", "members": ["allUsers"]})],
        ..Default::default()
    };

    mocks
        .executor
        .expect_exec_streaming()
        .times(1)
        .returning(|args| Err(command_failed(args)));
    mocks.run.expect_set_iam_policy().never();
    app.expect_deploy().never();

    let result = mocks
        .build(dir.path(), Backend::CloudRun)
        .deploy(&app, &DeployOptions::default(), &config)
        .await;

    let Err(err) = result else {
        panic!("failed gcloud run deploy was not reported");
    };
    assert!(err.is_fatal());
}

// ── Destroy ──

#[tokio::test]
async fn destroy_runs_app_before_backend() {
    let dir = project();
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    expect_app_destroy(&mut app, &mut seq);
    mocks
        .functions
        .expect_delete_function()
        .withf(|name| name == FUNCTION)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .destroy(&app, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn destroy_tolerates_missing_function() {
    let dir = project();
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    expect_app_destroy(&mut app, &mut seq);
    mocks
        .functions
        .expect_delete_function()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(status_error(404)));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .destroy(&app, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn destroy_propagates_other_delete_failures() {
    let dir = project();
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    expect_app_destroy(&mut app, &mut seq);
    mocks
        .functions
        .expect_delete_function()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(status_error(403)));

    let err = mocks
        .build(dir.path(), Backend::CloudFunction)
        .destroy(&app, false)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Api { .. }));
}

#[tokio::test]
async fn destroy_cloud_run_deletes_service() {
    let dir = project();
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    expect_app_destroy(&mut app, &mut seq);
    mocks
        .run
        .expect_delete_service()
        .withf(|service| service == SERVICE)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    mocks.functions.expect_delete_function().never();

    mocks
        .build(dir.path(), Backend::CloudRun)
        .destroy(&app, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn destroy_all_purges_artifacts() {
    let dir = project();
    let archive = Packager::new(dir.path(), "hello")
        .package(&FerruleConfig::default())
        .unwrap()
        .path()
        .to_path_buf();
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    expect_app_destroy(&mut app, &mut seq);
    mocks
        .functions
        .expect_delete_function()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    mocks
        .executor
        .expect_exec()
        .withf(|args| args.join(" ") == "projects describe proj --format value(projectNumber)")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("123456789\n".to_owned()));
    mocks
        .executor
        .expect_exec()
        .withf(|args| {
            args.join(" ")
                == "storage rm --recursive gs://gcf-sources-123456789-us-central1/hello-* --project proj --quiet"
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(String::new()));
    mocks
        .executor
        .expect_exec()
        .withf(|args| {
            args.join(" ").starts_with(
                "artifacts docker images delete us-central1-docker.pkg.dev/proj/gcf-artifacts/hello",
            )
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(String::new()));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .destroy(&app, true)
        .await
        .unwrap();

    assert!(!archive.exists());
}

#[tokio::test]
async fn destroy_all_skips_remote_failures() {
    let dir = project();
    let mut seq = Sequence::new();
    let mut mocks = Mocks::default();
    let mut app = app(true);

    expect_app_destroy(&mut app, &mut seq);
    mocks
        .functions
        .expect_delete_function()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    mocks
        .executor
        .expect_exec()
        .withf(|args| args.starts_with(&["projects".to_owned(), "describe".to_owned()]))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|args| Err(command_failed(args)));
    mocks
        .executor
        .expect_exec()
        .withf(|args| args.starts_with(&["artifacts".to_owned()]))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|args| Err(command_failed(args)));

    mocks
        .build(dir.path(), Backend::CloudFunction)
        .destroy(&app, true)
        .await
        .unwrap();
}
