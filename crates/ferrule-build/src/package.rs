use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use ferrule_core::{FERRULE_DIR, FerruleConfig};
use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Dependency manifest, always stored at the archive root.
pub const MANIFEST: &str = "requirements.txt";

/// Member name the configured `mainFile` is stored under.
pub const MAIN_MEMBER: &str = "main.py";

/// Patterns every package includes, before `customFiles`.
pub const DEFAULT_INCLUDE: &[&str] = &["*.py"];

/// Path segments that exclude a file wherever they appear in its path.
pub const DEFAULT_EXCLUDE: &[&str] = &["build", "docs", "examples", "test", "venv", FERRULE_DIR];

/// A finalized archive on disk.
///
/// Only [`Packager::package`] creates these, after the zip writer has been
/// finished and the file closed, so the size on disk is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArtifact {
    path: PathBuf,
    members: Vec<String>,
}

impl PackagedArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Member names in the order they were written.
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// Zips an app's sources into `.ferrule/{name}.zip`.
pub struct Packager<'a> {
    project_dir: &'a Path,
    name: &'a str,
}

impl<'a> Packager<'a> {
    pub fn new(project_dir: &'a Path, name: &'a str) -> Self {
        Self { project_dir, name }
    }

    /// Location of the archive for this app name.
    pub fn archive_path(&self) -> PathBuf {
        archive_path(self.project_dir, self.name)
    }

    /// Write a fresh archive, replacing any previous one.
    ///
    /// The previous archive is removed before anything is checked, so a failed
    /// run never leaves an older archive behind to be uploaded.
    pub fn package(&self, config: &FerruleConfig) -> Result<PackagedArtifact, PackageError> {
        let path = self.archive_path();
        remove_stale(&path)?;

        let manifest = self.project_dir.join(MANIFEST);
        if !manifest.is_file() {
            return Err(PackageError::ManifestNotFound { path: manifest });
        }

        let include = compile_patterns(&config.custom_files)?;

        let out_dir = self.project_dir.join(FERRULE_DIR);
        std::fs::create_dir_all(&out_dir).map_err(|e| PackageError::CreateDir {
            path: out_dir.clone(),
            source: e,
        })?;

        let file = File::create(&path).map_err(|e| PackageError::CreateArchive {
            path: path.clone(),
            source: e,
        })?;
        let mut archive = ArchiveWriter::new(file);

        archive.add_file(&manifest, MANIFEST)?;
        if let Some(main_file) = &config.main_file {
            archive.add_file(&self.project_dir.join(main_file), MAIN_MEMBER)?;
        }
        for relative in collect_files(self.project_dir, &include)? {
            let member = member_name(&relative);
            archive.add_file(&self.project_dir.join(&relative), &member)?;
        }

        let members = archive.finish(&path)?;
        tracing::info!(
            archive = %path.display(),
            files = members.len(),
            "packaged {}",
            self.name
        );

        Ok(PackagedArtifact { path, members })
    }
}

/// `{project_dir}/.ferrule/{name}.zip`
pub fn archive_path(project_dir: &Path, name: &str) -> PathBuf {
    project_dir.join(FERRULE_DIR).join(format!("{name}.zip"))
}

fn remove_stale(path: &Path) -> Result<(), PackageError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(archive = %path.display(), "removed previous archive");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PackageError::RemoveArchive {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn compile_patterns(custom: &[String]) -> Result<Vec<Pattern>, PackageError> {
    DEFAULT_INCLUDE
        .iter()
        .map(|p| (*p).to_owned())
        .chain(custom.iter().cloned())
        .map(|p| {
            Pattern::new(&p).map_err(|e| PackageError::InvalidPattern {
                pattern: p.clone(),
                source: e,
            })
        })
        .collect()
}

/// Files under `root` (relative paths, file-name order) that match an include
/// pattern and contain no excluded segment.
fn collect_files(root: &Path, include: &[Pattern]) -> Result<Vec<PathBuf>, PackageError> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !DEFAULT_EXCLUDE.contains(&name))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| PackageError::Walk { source: e })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| PackageError::StripPrefix { source: e })?;
        let Some(segments) = utf8_segments(relative) else {
            tracing::warn!(path = %entry.path().display(), "skipping non-UTF-8 path");
            continue;
        };
        if matches_any(include, &segments) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

fn utf8_segments(path: &Path) -> Option<Vec<&str>> {
    path.components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect()
}

/// A pattern matches when it matches any trailing run of path segments, so
/// `*.py` matches at every depth and `templates/*.html` matches any
/// `templates` directory.
fn matches_any(include: &[Pattern], segments: &[&str]) -> bool {
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };
    (0..segments.len()).any(|start| {
        let suffix = segments[start..].join("/");
        include.iter().any(|p| p.matches_with(&suffix, options))
    })
}

fn member_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

struct ArchiveWriter {
    writer: ZipWriter<File>,
    seen: HashSet<String>,
    members: Vec<String>,
}

impl ArchiveWriter {
    fn new(file: File) -> Self {
        Self {
            writer: ZipWriter::new(file),
            seen: HashSet::new(),
            members: Vec::new(),
        }
    }

    /// First write of a member name wins; later duplicates are skipped.
    fn add_file(&mut self, src: &Path, member: &str) -> Result<(), PackageError> {
        if !self.seen.insert(member.to_owned()) {
            tracing::debug!(member, "duplicate archive member skipped");
            return Ok(());
        }

        let mut input = File::open(src).map_err(|e| PackageError::ReadFile {
            path: src.to_path_buf(),
            source: e,
        })?;
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer
            .start_file(member, options)
            .map_err(|e| PackageError::Zip { source: e })?;
        std::io::copy(&mut input, &mut self.writer).map_err(|e| PackageError::WriteMember {
            member: member.to_owned(),
            source: e,
        })?;

        self.members.push(member.to_owned());
        Ok(())
    }

    /// Finish the central directory and flush the file to disk.
    fn finish(mut self, path: &Path) -> Result<Vec<String>, PackageError> {
        let mut file = self
            .writer
            .finish()
            .map_err(|e| PackageError::Zip { source: e })?;
        file.flush()
            .and_then(|()| file.sync_all())
            .map_err(|e| PackageError::CreateArchive {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(self.members)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("dependency manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("invalid include pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove previous archive {path}")]
    RemoveArchive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write archive {path}")]
    CreateArchive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write archive member {member}")]
    WriteMember {
        member: String,
        source: std::io::Error,
    },

    #[error("walked path is outside the project directory")]
    StripPrefix { source: std::path::StripPrefixError },

    #[error("failed to walk project directory")]
    Walk { source: walkdir::Error },

    #[error("zip error")]
    Zip { source: zip::result::ZipError },
}
