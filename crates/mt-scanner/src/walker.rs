//! Directory traversal for project files.
//!
//! [`FileWalker`] uses the `ignore` crate to walk a project while respecting
//! `.gitignore` patterns and optionally keeping only paths that match a glob.
//! Directories with a skipped name are pruned: the walk never enters them.
//!
//! Globs follow gitignore semantics relative to the project root: `pom.xml`
//! and `*.java` match at any depth, `src/main/**/*.java` is anchored.

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};

use crate::error::ScanError;

/// A file walker that discovers project files.
///
/// The walker uses a "collect-then-parallelize" pattern: paths are collected
/// on one thread, then callers process them with rayon.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use mt_scanner::FileWalker;
///
/// let walker = FileWalker::new(Utf8Path::new("./my-app"))?
///     .with_skip_dirs(&["target".to_owned()])
///     .with_glob("pom.xml")?;
///
/// for pom in walker.collect_paths()? {
///     println!("{pom}");
/// }
/// # Ok::<(), mt_scanner::ScanError>(())
/// ```
#[derive(Debug)]
pub struct FileWalker {
    /// The root directory to walk.
    root: Utf8PathBuf,
    /// Directory names to skip.
    skip_dirs: Vec<String>,
    /// Whether to follow symbolic links.
    follow_links: bool,
    /// Whether `.gitignore`, `.ignore` and hidden-file rules apply.
    standard_filters: bool,
    /// Keeps only paths matching the glob, when set.
    glob: Option<Override>,
}

impl FileWalker {
    /// Creates a new file walker for the given root directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::IllegalState`] if the root path doesn't exist or
    /// isn't a directory.
    pub fn new(root: &Utf8Path) -> Result<Self, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::illegal_state(format!(
                "project root is not a directory: {root}"
            )));
        }

        Ok(Self {
            root: root.to_owned(),
            skip_dirs: Vec::new(),
            follow_links: false,
            standard_filters: true,
            glob: None,
        })
    }

    /// Adds directory names to skip during traversal.
    #[must_use]
    pub fn with_skip_dirs(mut self, dirs: &[String]) -> Self {
        self.skip_dirs.extend(dirs.iter().cloned());
        self
    }

    /// Configures whether to follow symbolic links.
    ///
    /// By default, symbolic links are not followed.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Configures whether ignore files and hidden-file rules apply.
    ///
    /// Enabled by default. Tool output directories are often gitignored, so
    /// walks over them turn this off.
    #[must_use]
    pub const fn with_standard_filters(mut self, enabled: bool) -> Self {
        self.standard_filters = enabled;
        self
    }

    /// Keeps only files matching `glob`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidPattern`] if the glob cannot be compiled.
    pub fn with_glob(mut self, glob: &str) -> Result<Self, ScanError> {
        let mut builder = OverrideBuilder::new(&self.root);
        builder
            .add(glob)
            .map_err(|e| ScanError::invalid_pattern(glob, e))?;
        self.glob = Some(builder.build().map_err(|e| ScanError::invalid_pattern(glob, e))?);
        Ok(self)
    }

    /// Collects all matching file paths in the directory tree.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Walk`] if directory traversal fails.
    /// Returns [`ScanError::NonUtf8Path`] if a non-UTF-8 path is encountered.
    pub fn collect_paths(&self) -> Result<Vec<Utf8PathBuf>, ScanError> {
        let mut paths = Vec::new();

        for result in self.build_walker() {
            let entry = result?;

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let utf8_path =
                Utf8Path::from_path(path).ok_or_else(|| ScanError::NonUtf8Path(path.to_owned()))?;

            if !self.matches_glob(utf8_path) {
                continue;
            }

            paths.push(utf8_path.to_owned());
        }

        paths.sort();
        Ok(paths)
    }

    fn build_walker(&self) -> ignore::Walk {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(self.standard_filters)
            .follow_links(self.follow_links)
            .threads(1)
            .require_git(false);

        if !self.skip_dirs.is_empty() {
            let skip_dirs = self.skip_dirs.clone();
            // The root itself is never pruned, whatever its name.
            builder.filter_entry(move |entry| {
                entry.depth() == 0
                    || !entry.file_type().is_some_and(|ft| ft.is_dir())
                    || !skip_dirs.iter().any(|d| entry.file_name() == d.as_str())
            });
        }
        builder.build()
    }

    fn matches_glob(&self, path: &Utf8Path) -> bool {
        self.glob
            .as_ref()
            .is_none_or(|glob| glob.matched(path.as_std_path(), false).is_whitelist())
    }

    /// Returns `path` relative to the walked root.
    #[must_use]
    pub fn relative<'a>(&self, path: &'a Utf8Path) -> &'a Utf8Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}
