use std::path::{Path, PathBuf};

use ferrule_core::{ENTRYPOINT, FERRULE_DIR};

/// Version written into the generated `requirements.txt`.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Write a starter project into `project_dir`: `.ferrule/config.json`,
/// `requirements.txt`, `main.py` and `README.md`.
///
/// Existing files are overwritten. Returns the written paths.
pub fn create_project(project_dir: &Path, name: &str) -> Result<Vec<PathBuf>, ScaffoldError> {
    let ferrule_dir = project_dir.join(FERRULE_DIR);
    std::fs::create_dir_all(&ferrule_dir).map_err(|e| ScaffoldError::CreateDir {
        path: ferrule_dir.clone(),
        source: e,
    })?;

    let config = serde_json::to_string_pretty(&serde_json::json!({ "cloudfunction": {} }))
        .map_err(|e| ScaffoldError::Serialize { source: e })?;

    let files = [
        (ferrule_dir.join("config.json"), config),
        (
            project_dir.join("requirements.txt"),
            format!("ferrule=={TOOL_VERSION}\n"),
        ),
        (project_dir.join("main.py"), main_py(name)),
        (project_dir.join("README.md"), readme(name)),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (path, content) in files {
        std::fs::write(&path, content).map_err(|e| ScaffoldError::Write {
            path: path.clone(),
            source: e,
        })?;
        written.push(path);
    }
    Ok(written)
}

fn main_py(name: &str) -> String {
    format!(
        r#"from ferrule import Ferrule, jsonify

app = Ferrule(function_name="{name}")


@app.http()
def main(request):
    return jsonify(request.json)


# route
# @app.route('/hello')
# def home():
#     return jsonify("goodbye")

# schedule
# @app.schedule('5 * * * *')
# def scheduled_job():
#     return jsonify("success")

# pubsub topic
# @app.topic('test_topic')
# def topic(data):
#     app.log.info(data)
#     return


def {ENTRYPOINT}(request):
    return app(request)
"#
    )
}

fn readme(name: &str) -> String {
    format!(
        r#"# {name}

autocreated by ferrule

To package the function locally run `ferrule package`
To deploy the function and the triggers configured in `.ferrule/config.json` run `ferrule deploy`
To tear everything down again run `ferrule destroy`
"#
    )
}

#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize default config")]
    Serialize { source: serde_json::Error },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
