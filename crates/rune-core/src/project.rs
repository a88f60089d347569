//! Project name detection from the working directory.
//!
//! Detection always yields a name. Manifests are consulted in a fixed order
//! (`package.json`, `go.mod`, `Cargo.toml`, `pyproject.toml` / `setup.py`),
//! then the enclosing git repository, then the directory name itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Name used when nothing better can be found.
pub const DEFAULT_PROJECT: &str = "default";

static GO_MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^module\s+(\S+)").expect("valid regex"));
static SETUP_PY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name\s*=\s*['"]([^'"]+)['"]"#).expect("valid regex"));

/// Supplies the project name for a new session.
pub trait ProjectDetector {
    fn detect_project(&self) -> String;
}

/// Detects the project from manifests and git metadata under a directory,
/// then normalizes it with [`sanitize_project_name`].
#[derive(Debug, Clone)]
pub struct ManifestDetector {
    dir: PathBuf,
}

impl ManifestDetector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// A detector rooted at the process working directory.
    pub fn from_current_dir() -> Option<Self> {
        std::env::current_dir().ok().map(Self::new)
    }
}

impl ProjectDetector for ManifestDetector {
    fn detect_project(&self) -> String {
        sanitize_project_name(&detect_project(&self.dir))
    }
}

/// Detects a project name for `dir`.
pub fn detect_project(dir: &Path) -> String {
    let fallback = || dir_name(dir).unwrap_or_else(|| DEFAULT_PROJECT.to_string());

    if dir.join("package.json").is_file() {
        return name_from_package_json(dir).unwrap_or_else(fallback);
    }
    if dir.join("go.mod").is_file() {
        return name_from_go_mod(dir).unwrap_or_else(fallback);
    }
    if dir.join("Cargo.toml").is_file() {
        return name_from_cargo_toml(dir).unwrap_or_else(fallback);
    }
    if dir.join("pyproject.toml").is_file() || dir.join("setup.py").is_file() {
        return name_from_python(dir).unwrap_or_else(fallback);
    }
    if let Some(root) = find_git_root(dir) {
        return origin_remote_url(&root)
            .as_deref()
            .and_then(parse_remote_name)
            .or_else(|| dir_name(&root))
            .unwrap_or_else(fallback);
    }
    fallback()
}

/// Extract repo name from a git remote URL.
pub fn parse_remote_name(url: &str) -> Option<String> {
    let name = url.rsplit(['/', ':']).next()?.trim_end_matches(".git");

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Normalizes a project name: drops a `github.com/` prefix and `.git`
/// suffix, turns path separators and spaces into dashes, and lower-cases.
pub fn sanitize_project_name(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_prefix("github.com/").unwrap_or(name);
    let name = name.strip_suffix(".git").unwrap_or(name);
    let name = name.replace(['/', '\\', ' '], "-").to_lowercase();

    if name.is_empty() {
        DEFAULT_PROJECT.to_string()
    } else {
        name
    }
}

fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(String::from)
}

fn name_from_package_json(dir: &Path) -> Option<String> {
    let content = fs::read_to_string(dir.join("package.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    value
        .get("name")
        .and_then(serde_json::Value::as_str)
        .filter(|n| !n.is_empty())
        .map(String::from)
}

fn name_from_go_mod(dir: &Path) -> Option<String> {
    let content = fs::read_to_string(dir.join("go.mod")).ok()?;
    content.lines().map(str::trim).find_map(|line| {
        let module = GO_MODULE_RE.captures(line)?.get(1)?.as_str();
        module.rsplit('/').next().map(String::from)
    })
}

fn name_from_cargo_toml(dir: &Path) -> Option<String> {
    let manifest = read_toml(&dir.join("Cargo.toml"))?;
    toml_str(&manifest, &["package", "name"])
}

fn name_from_python(dir: &Path) -> Option<String> {
    let from_pyproject = read_toml(&dir.join("pyproject.toml")).and_then(|manifest| {
        toml_str(&manifest, &["project", "name"])
            .or_else(|| toml_str(&manifest, &["tool", "poetry", "name"]))
    });
    from_pyproject.or_else(|| {
        let content = fs::read_to_string(dir.join("setup.py")).ok()?;
        content
            .lines()
            .find_map(|line| SETUP_PY_NAME_RE.captures(line).map(|c| c[1].to_string()))
    })
}

fn read_toml(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str::<toml::Value>(&content) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "unparseable manifest");
            None
        }
    }
}

/// Non-empty string at a dotted key path, e.g. `["package", "name"]`.
fn toml_str(value: &toml::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .try_fold(value, |v, key| v.get(*key))?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn find_git_root(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .find(|d| d.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Reads the `origin` URL from `.git/config` without invoking git.
fn origin_remote_url(root: &Path) -> Option<String> {
    let config = fs::read_to_string(root.join(".git").join("config")).ok()?;
    let mut in_origin = false;
    config.lines().map(str::trim).find_map(|line| {
        if line.starts_with('[') {
            in_origin = line == r#"[remote "origin"]"#;
            return None;
        }
        let (key, value) = line.split_once('=').filter(|_| in_origin)?;
        (key.trim() == "url").then(|| value.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_dir(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_git_remote_url() {
        assert_eq!(
            parse_remote_name("https://github.com/user/time-tracker.git"),
            Some("time-tracker".to_string())
        );
        assert_eq!(
            parse_remote_name("git@github.com:user/dotfiles.git"),
            Some("dotfiles".to_string())
        );
        assert_eq!(
            parse_remote_name("git@host:dotfiles.git"),
            Some("dotfiles".to_string())
        );
        assert_eq!(parse_remote_name(""), None);
    }

    #[test]
    fn detects_from_package_json() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "node-project");
        fs::write(dir.join("package.json"), r#"{"name": "test-project"}"#).unwrap();
        assert_eq!(detect_project(&dir), "test-project");
    }

    #[test]
    fn detects_from_go_mod() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "go-project");
        fs::write(dir.join("go.mod"), "module github.com/user/test-project\n\ngo 1.22\n").unwrap();
        assert_eq!(detect_project(&dir), "test-project");
    }

    #[test]
    fn detects_from_cargo_toml_package_section() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "rust-project");
        fs::write(
            dir.join("Cargo.toml"),
            "[workspace]\nname = \"not-this\"\n\n[package]\nname = \"test-project\"\n",
        )
        .unwrap();
        assert_eq!(detect_project(&dir), "test-project");
    }

    #[test]
    fn cargo_workspace_without_package_uses_dir_name() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "workspace-root");
        fs::write(dir.join("Cargo.toml"), "[workspace]\nmembers = []\n").unwrap();
        assert_eq!(detect_project(&dir), "workspace-root");
    }

    #[test]
    fn cargo_toml_reads_package_table_not_line_shape() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "quoted-project");
        fs::write(
            dir.join("Cargo.toml"),
            "[package]\nversion = \"0.1.0\"\nname = 'single-quoted' # trailing\n",
        )
        .unwrap();
        assert_eq!(detect_project(&dir), "single-quoted");

        let dir = project_dir(temp.path(), "inherited-name");
        fs::write(dir.join("Cargo.toml"), "[package]\nname.workspace = true\n").unwrap();
        assert_eq!(detect_project(&dir), "inherited-name");

        let dir = project_dir(temp.path(), "broken-manifest");
        fs::write(dir.join("Cargo.toml"), "[package\nname = \"nope\"\n").unwrap();
        assert_eq!(detect_project(&dir), "broken-manifest");
    }

    #[test]
    fn pyproject_ignores_unrelated_tables() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "tooling-only");
        fs::write(
            dir.join("pyproject.toml"),
            "[tool.black]\nname = \"formatter\"\n",
        )
        .unwrap();
        assert_eq!(detect_project(&dir), "tooling-only");

        fs::write(dir.join("setup.py"), "setup(name=\"from-setup\")\n").unwrap();
        assert_eq!(detect_project(&dir), "from-setup");
    }

    #[test]
    fn pyproject_falls_back_to_poetry_table() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "poetry-project");
        fs::write(
            dir.join("pyproject.toml"),
            "[tool.poetry]\nname = \"verse\"\nversion = \"1.0\"\n",
        )
        .unwrap();
        assert_eq!(detect_project(&dir), "verse");

        fs::write(
            dir.join("pyproject.toml"),
            "[project]\nname = \"pep621\"\n\n[tool.poetry]\nname = \"verse\"\n",
        )
        .unwrap();
        assert_eq!(detect_project(&dir), "pep621");
    }

    #[test]
    fn detects_from_python_files() {
        let temp = tempfile::tempdir().unwrap();
        let pyproject = project_dir(temp.path(), "py-project");
        fs::write(
            pyproject.join("pyproject.toml"),
            "[project]\nname = \"snake\"\n",
        )
        .unwrap();
        assert_eq!(detect_project(&pyproject), "snake");

        let setup = project_dir(temp.path(), "setup-project");
        fs::write(setup.join("setup.py"), "setup(\n    name='legacy',\n)\n").unwrap();
        assert_eq!(detect_project(&setup), "legacy");
    }

    #[test]
    fn detects_from_git_repository() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "git-project");
        fs::create_dir_all(dir.join(".git")).unwrap();
        let nested = project_dir(&dir, "src");
        assert_eq!(detect_project(&nested), "git-project");

        fs::write(
            dir.join(".git").join("config"),
            "[core]\n\tbare = false\n\
             [remote \"origin\"]\n\turl = git@github.com:user/upstream.git\n",
        )
        .unwrap();
        assert_eq!(detect_project(&nested), "upstream");
    }

    #[test]
    fn origin_url_ignores_other_remotes() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "forked");
        fs::create_dir_all(dir.join(".git")).unwrap();
        let config = [
            "[remote \"fork\"]",
            "\turl = https://github.com/me/wrong.git",
            "[remote \"origin\"]",
            "\tfetch = +refs/heads/*:refs/remotes/origin/*",
            "\turl = https://github.com/team/right.git",
            "[branch \"main\"]",
            "\tremote = origin",
        ];
        fs::write(dir.join(".git").join("config"), config.join("\n")).unwrap();
        assert_eq!(detect_project(&dir), "right");

        fs::write(dir.join(".git").join("config"), &config[..2].join("\n")).unwrap();
        assert_eq!(detect_project(&dir), "forked");
    }

    #[test]
    fn falls_back_to_directory_name() {
        let temp = tempfile::tempdir().unwrap();
        let dir = project_dir(temp.path(), "fallback-project");
        assert_eq!(ManifestDetector::new(&dir).detect_project(), "fallback-project");

        let dir = project_dir(temp.path(), "My Project");
        assert_eq!(detect_project(&dir), "My Project");
        assert_eq!(ManifestDetector::new(&dir).detect_project(), "my-project");
    }

    #[test]
    fn test_sanitize_project_name() {
        let cases = [
            ("github.com/user/repo", "user-repo"),
            ("my-project.git", "my-project"),
            ("Project With Spaces", "project-with-spaces"),
            ("path/to/project", "path-to-project"),
            ("windows\\path", "windows-path"),
            ("", "default"),
        ];
        for (input, expected) in cases {
            assert_eq!(sanitize_project_name(input), expected, "input: {input:?}");
        }
    }
}
