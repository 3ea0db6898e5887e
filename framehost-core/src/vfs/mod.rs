//! Virtual filesystem exposed to the guest's path-based operations.
//!
//! In-memory, keyed by normalized absolute path. The root `/` always exists and the
//! working directory always names an existing directory.

use crate::error::FileError;
use std::collections::BTreeMap;
use std::path::Path;

/// Root directory mounted during bootstrap unless configured otherwise.
pub const DEFAULT_ROOT: &str = "/working_directory";

#[derive(Clone, Debug)]
enum Node {
    File(Vec<u8>),
    Directory,
}

#[derive(Debug)]
pub struct VirtualFilesystem {
    nodes: BTreeMap<String, Node>,
    cwd: String,
}

impl Default for VirtualFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFilesystem {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Directory);
        Self {
            nodes,
            cwd: "/".to_string(),
        }
    }

    /// Make `root` exist and make it the working directory.
    ///
    /// Idempotent: an existing root directory is not an error.
    pub fn bootstrap(&mut self, root: &str) -> Result<(), FileError> {
        let root = self.resolve(root);
        self.create_dir_all(&root)?;
        self.chdir(&root)?;
        tracing::debug!(root = %root, "virtual filesystem bootstrapped");
        Ok(())
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn chdir(&mut self, path: &str) -> Result<(), FileError> {
        let path = self.resolve(path);
        match self.nodes.get(&path) {
            Some(Node::Directory) => {
                self.cwd = path;
                Ok(())
            }
            Some(Node::File(_)) => Err(FileError::NotADirectory(path)),
            None => Err(FileError::NotFound(path)),
        }
    }

    /// Turn `path` into a normalized absolute path. Relative paths start at the cwd.
    pub fn resolve(&self, path: &str) -> String {
        let joined = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.cwd, path)
        };
        normalize_path(&joined)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(&self.resolve(path))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.nodes.get(&self.resolve(path)), Some(Node::Directory))
    }

    /// Create one directory. The parent must exist.
    pub fn create_dir(&mut self, path: &str) -> Result<(), FileError> {
        let path = self.resolve(path);
        if self.nodes.contains_key(&path) {
            return Err(FileError::AlreadyExists(path));
        }
        self.ensure_parent(&path)?;
        self.nodes.insert(path, Node::Directory);
        Ok(())
    }

    /// Create a directory and any missing parents. Existing directories are fine.
    pub fn create_dir_all(&mut self, path: &str) -> Result<(), FileError> {
        let path = self.resolve(path);
        let mut current = String::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            current.push('/');
            current.push_str(component);
            match self.nodes.get(&current) {
                Some(Node::Directory) => {}
                Some(Node::File(_)) => return Err(FileError::NotADirectory(current)),
                None => {
                    self.nodes.insert(current.clone(), Node::Directory);
                }
            }
        }
        Ok(())
    }

    pub fn read(&self, path: &str) -> Result<&[u8], FileError> {
        let path = self.resolve(path);
        match self.nodes.get(&path) {
            Some(Node::File(data)) => Ok(data.as_slice()),
            Some(Node::Directory) => Err(FileError::IsADirectory(path)),
            None => Err(FileError::NotFound(path)),
        }
    }

    /// Create or replace a file. The parent directory must exist.
    pub fn write(&mut self, path: &str, data: &[u8]) -> Result<(), FileError> {
        let path = self.resolve(path);
        if let Some(Node::Directory) = self.nodes.get(&path) {
            return Err(FileError::IsADirectory(path));
        }
        self.ensure_parent(&path)?;
        self.nodes.insert(path, Node::File(data.to_vec()));
        Ok(())
    }

    /// Names of the direct children of a directory, sorted.
    pub fn read_dir(&self, path: &str) -> Result<Vec<String>, FileError> {
        let path = self.resolve(path);
        match self.nodes.get(&path) {
            Some(Node::Directory) => {}
            Some(Node::File(_)) => return Err(FileError::NotADirectory(path)),
            None => return Err(FileError::NotFound(path)),
        }
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        Ok(self
            .nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect())
    }

    /// Copy a host directory tree into `dest`, creating directories as needed.
    ///
    /// Host reads go through `tokio::fs`. Names that are not valid UTF-8 are refused
    /// rather than rewritten. Returns the number of files copied.
    pub async fn import_host_dir(&mut self, host_dir: &Path, dest: &str) -> Result<usize, FileError> {
        let host_err = |path: &Path, message: String| FileError::Host {
            path: path.display().to_string(),
            message,
        };

        let mut copied = 0;
        let mut pending = vec![(host_dir.to_path_buf(), self.resolve(dest))];
        while let Some((dir, dest)) = pending.pop() {
            self.create_dir_all(&dest)?;

            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| host_err(&dir, e.to_string()))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| host_err(&dir, e.to_string()))?
            {
                let host_path = entry.path();
                let name = entry
                    .file_name()
                    .into_string()
                    .map_err(|_| host_err(&host_path, "file name is not valid UTF-8".into()))?;
                let target = format!("{}/{}", dest.trim_end_matches('/'), name);

                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| host_err(&host_path, e.to_string()))?;
                if file_type.is_dir() {
                    pending.push((host_path, target));
                } else if file_type.is_file() {
                    let data = tokio::fs::read(&host_path)
                        .await
                        .map_err(|e| host_err(&host_path, e.to_string()))?;
                    self.write(&target, &data)?;
                    copied += 1;
                }
            }
        }
        Ok(copied)
    }

    fn ensure_parent(&self, path: &str) -> Result<(), FileError> {
        let Some(parent) = parent_path(path) else {
            return Ok(());
        };
        match self.nodes.get(parent) {
            Some(Node::Directory) => Ok(()),
            Some(Node::File(_)) => Err(FileError::NotADirectory(parent.to_string())),
            None => Err(FileError::NotFound(parent.to_string())),
        }
    }
}

/// Collapse `.`, `..` and repeated slashes. The result always starts with `/`.
pub fn normalize_path(path: &str) -> String {
    let mut result: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                result.pop();
            }
            name => result.push(name),
        }
    }

    if result.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", result.join("/"))
    }
}

fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/')? {
        0 => Some("/"),
        idx => Some(&path[..idx]),
    }
}
