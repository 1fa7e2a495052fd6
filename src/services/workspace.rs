use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Current-directory marker file kept inside each workspace root
const CWD_MARKER: &str = ".cwd";

/// Outcome of a change-directory request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDir {
    Changed { dir: PathBuf, display: String },
    NotFound,
}

/// A per-user jailed workspace.
///
/// Every path handed out by this type is the workspace root or a
/// descendant of it. Navigation that would escape the jail degrades to the
/// root instead of erroring.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open (creating if absent) the workspace for `user_id` under `base`.
    pub fn open(base: &Path, user_id: u64) -> io::Result<Self> {
        let root = base.join(user_id.to_string());
        fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join(CWD_MARKER)
    }

    /// The persisted current directory. A missing, unreadable, out-of-jail
    /// or non-directory marker silently falls back to the root.
    pub fn current_dir(&self) -> PathBuf {
        let Ok(saved) = fs::read_to_string(self.marker_path()) else {
            return self.root.clone();
        };
        let saved = PathBuf::from(saved.trim());
        match saved.canonicalize() {
            Ok(resolved) if resolved.starts_with(&self.root) && resolved.is_dir() => resolved,
            _ => self.root.clone(),
        }
    }

    /// Resolve a `cd` argument and persist the result.
    ///
    /// Empty, `~` and `/` mean the root. Everything else resolves against
    /// the root (not the process working directory). A resolved path
    /// outside the jail is replaced by the root; a missing path or a
    /// non-directory reports `NotFound` without touching the marker.
    pub fn change_dir(&self, requested: &str) -> io::Result<ChangeDir> {
        let requested = requested.trim();
        let candidate = if requested.is_empty() || requested == "~" || requested == "/" {
            self.root.clone()
        } else {
            // joining an absolute fragment replaces the root; the
            // containment check below brings it back inside
            self.root.join(requested)
        };

        let resolved = match candidate.canonicalize() {
            Ok(p) => p,
            Err(_) => return Ok(ChangeDir::NotFound),
        };

        let target = if resolved.starts_with(&self.root) {
            resolved
        } else {
            self.root.clone()
        };

        if !target.is_dir() {
            return Ok(ChangeDir::NotFound);
        }

        fs::write(self.marker_path(), target.to_string_lossy().as_bytes())?;
        let display = self.display_name(&target);
        Ok(ChangeDir::Changed { dir: target, display })
    }

    /// Pretty path relative to the root; the root itself shows as "workspace"
    pub fn display_name(&self, target: &Path) -> String {
        match target.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => "workspace".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => target
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "workspace".to_string()),
        }
    }

    /// Whether `target` is confined to this workspace once canonicalized
    pub fn contains(&self, target: &Path) -> bool {
        match target.canonicalize() {
            Ok(resolved) => resolved.starts_with(&self.root),
            Err(_) => false,
        }
    }

    /// Per-user GitHub CLI credential isolation, passed to the launcher as
    /// environment overrides. Directories are created on demand.
    pub fn gh_env(&self) -> io::Result<Vec<(String, String)>> {
        let gh_config = self.root.join(".gh");
        let gh_data = self.root.join(".gh_data");
        fs::create_dir_all(&gh_config)?;
        fs::create_dir_all(&gh_data)?;
        Ok(vec![
            ("GH_CONFIG_DIR".to_string(), gh_config.display().to_string()),
            ("GH_DATA_DIR".to_string(), gh_data.display().to_string()),
        ])
    }
}
