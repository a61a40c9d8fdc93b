/// Project detection logic
///
/// Finds the root directory of a project by looking for common markers like
/// .git or Cargo.toml, and names the repository the way the task history does:
/// `owner/name` from the git origin remote, else the directory name.

use crate::error::Result;
use git2::{ErrorCode, Repository};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project root detection markers
const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "Cargo.toml",
    "package.json",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "requirements.txt",
    "Gemfile",
    "composer.json",
    ".project",
];

/// Handles project detection
pub struct ProjectDetector;

impl ProjectDetector {
    /// Detect the project root from a given path
    ///
    /// Walks up the directory tree looking for common project markers, falling
    /// back to the starting directory.
    ///
    /// # Examples
    /// ```no_run
    /// use taskmind_lib::core::ProjectDetector;
    /// use std::env;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let cwd = env::current_dir()?;
    /// let project_root = ProjectDetector::detect(&cwd)?;
    /// println!("Project root: {}", project_root.display());
    /// # Ok(())
    /// # }
    /// ```
    pub fn detect<P: AsRef<Path>>(start_path: P) -> Result<PathBuf> {
        let start_path = start_path.as_ref();

        let absolute_path = if start_path.is_absolute() {
            start_path.to_path_buf()
        } else {
            std::env::current_dir()?.join(start_path)
        };

        let mut current = absolute_path.as_path();
        loop {
            if PROJECT_MARKERS.iter().any(|marker| current.join(marker).exists()) {
                return Ok(current.to_path_buf());
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => return Ok(absolute_path),
            }
        }
    }

    /// Repository identifier for the project containing `start_path`
    pub fn repository_id<P: AsRef<Path>>(start_path: P) -> Result<String> {
        let root = Self::detect(start_path)?;

        if let Some(id) = Self::origin_identity(&root)? {
            return Ok(id);
        }

        Ok(Self::get_project_name(&root).unwrap_or_else(|| "default".to_string()))
    }

    /// `owner/name` from the origin remote, if the path is in a git
    /// repository that has one
    pub fn origin_identity<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
        let repo = match Repository::discover(path.as_ref()) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let remote = match repo.find_remote("origin") {
            Ok(remote) => remote,
            Err(e) => {
                debug!(path = %path.as_ref().display(), error = %e, "no origin remote");
                return Ok(None);
            }
        };

        Ok(remote.url().and_then(Self::parse_remote_url))
    }

    /// `owner/name` from an ssh, scp-style or http(s) remote URL
    pub fn parse_remote_url(url: &str) -> Option<String> {
        let trimmed = url.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        // Drop the scheme and host; scp-style uses ':' before the path
        let path = match trimmed.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, path)| path)?,
            None => trimmed.rsplit_once(':').map(|(_, path)| path).unwrap_or(trimmed),
        };

        let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
        let name = segments.next()?;
        let owner = segments.next()?;
        Some(format!("{}/{}", owner, name))
    }

    /// Get the project name from the root path
    pub fn get_project_name<P: AsRef<Path>>(project_root: P) -> Option<String> {
        project_root
            .as_ref()
            .file_name()
            .and_then(|name| name.to_str())
            .map(|s| s.to_string())
    }

    /// Detect if path is a git repository
    pub fn is_git_repo<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().join(".git").exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detect_git_project() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("my-project");
        fs::create_dir(&project_dir).unwrap();
        fs::create_dir(project_dir.join(".git")).unwrap();

        let sub_dir = project_dir.join("src").join("components");
        fs::create_dir_all(&sub_dir).unwrap();

        // Should detect from subdirectory
        let detected = ProjectDetector::detect(&sub_dir).unwrap();
        assert_eq!(detected, project_dir);
    }

    #[test]
    fn test_no_project_found() {
        let temp = TempDir::new().unwrap();
        let sub_dir = temp.path().join("no-markers");
        fs::create_dir(&sub_dir).unwrap();

        // Should fall back to the original directory
        let detected = ProjectDetector::detect(&sub_dir).unwrap();
        assert_eq!(detected, sub_dir);
    }

    #[test]
    fn test_is_git_repo() {
        let temp = TempDir::new().unwrap();
        assert!(!ProjectDetector::is_git_repo(temp.path()));

        fs::create_dir(temp.path().join(".git")).unwrap();
        assert!(ProjectDetector::is_git_repo(temp.path()));
    }

    #[test]
    fn test_parse_remote_urls() {
        let cases = [
            ("git@github.com:acme/api.git", Some("acme/api")),
            ("https://github.com/acme/api", Some("acme/api")),
            ("https://gitlab.com/group/sub/api.git/", Some("sub/api")),
            ("ssh://git@host:2222/acme/api.git", Some("acme/api")),
            ("api", None),
        ];

        for (url, expected) in cases {
            assert_eq!(ProjectDetector::parse_remote_url(url).as_deref(), expected, "{}", url);
        }
    }

    #[test]
    fn test_repository_id_from_origin() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        repo.remote("origin", "git@github.com:acme/billing.git").unwrap();

        let nested = temp.path().join("src");
        fs::create_dir(&nested).unwrap();

        assert_eq!(ProjectDetector::repository_id(&nested).unwrap(), "acme/billing");
    }

    #[test]
    fn test_repository_id_without_origin() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("side-project");
        fs::create_dir(&project).unwrap();
        Repository::init(&project).unwrap();

        assert_eq!(ProjectDetector::repository_id(&project).unwrap(), "side-project");
    }
}
