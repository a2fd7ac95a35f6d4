use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::Display,
    fs,
    path::{Component, Path, PathBuf},
};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to read file `{0}`")]
    FileNotFound(String),
    #[error("invalid include path `{0}`")]
    InvalidResource(String),
}

/// A resource identifies an includable file, relative to the include directory.
///
/// Both `/` and `\` are accepted as separators in include paths.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Resource {
    path: PathBuf,
}

impl Resource {
    /// Normalizes an include path. Empty paths and paths leaving the include directory are
    /// rejected.
    pub fn new(path: &str) -> Result<Self, ResolveError> {
        let mut normalized = PathBuf::new();
        for part in path.split(['/', '\\']) {
            match part {
                "" | "." => {}
                ".." => {
                    if !normalized.pop() {
                        return Err(ResolveError::InvalidResource(path.to_string()));
                    }
                }
                part => normalized.push(part),
            }
        }
        if normalized.as_os_str().is_empty() {
            return Err(ResolveError::InvalidResource(path.to_string()));
        }
        Ok(Self { path: normalized })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<PathBuf> for Resource {
    fn from(path: PathBuf) -> Self {
        let path = path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        Self { path }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = self
            .path
            .components()
            .map(|c| c.as_os_str().to_string_lossy());
        write!(f, "{}", itertools::Itertools::format(parts, "/"))
    }
}

/// A Resolver provides the source text of included files.
pub trait Resolver {
    fn resolve_source(&self, resource: &Resource) -> Result<String, ResolveError>;
}

impl<T: Resolver + ?Sized> Resolver for Box<T> {
    fn resolve_source(&self, resource: &Resource) -> Result<String, ResolveError> {
        (**self).resolve_source(resource)
    }
}

impl<T: Resolver> Resolver for &T {
    fn resolve_source(&self, resource: &Resource) -> Result<String, ResolveError> {
        (**self).resolve_source(resource)
    }
}

/// Resolves nothing. Every `#include` fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoResolver;

impl Resolver for NoResolver {
    fn resolve_source(&self, resource: &Resource) -> Result<String, ResolveError> {
        Err(ResolveError::FileNotFound(format!(
            "{resource} (no include directory)"
        )))
    }
}

/// Reads included files from the file system, relative to an include directory.
#[derive(Default)]
pub struct FileResolver {
    base: PathBuf,
    cache: RefCell<HashMap<Resource, String>>,
}

impl FileResolver {
    /// `base` is the include directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            cache: Default::default(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn read_file_nocache(&self, resource: &Resource) -> Result<String, ResolveError> {
        let path = self.base.join(resource.path());
        fs::read_to_string(&path).map_err(|_| {
            ResolveError::FileNotFound(format!("{} (physical file)", path.display()))
        })
    }
}

impl Resolver for FileResolver {
    fn resolve_source(&self, resource: &Resource) -> Result<String, ResolveError> {
        if let Some(source) = self.cache.borrow().get(resource) {
            return Ok(source.clone());
        }
        let source = self.read_file_nocache(resource)?;
        self.cache
            .borrow_mut()
            .insert(resource.clone(), source.clone());
        Ok(source)
    }
}

/// In-memory files, keyed by their normalized path.
#[derive(Default)]
pub struct VirtualFileResolver {
    files: HashMap<Resource, String>,
}

impl VirtualFileResolver {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    pub fn add_file(&mut self, path: &str, file: impl Into<String>) -> Result<(), ResolveError> {
        self.files.insert(Resource::new(path)?, file.into());
        Ok(())
    }
}

impl Resolver for VirtualFileResolver {
    fn resolve_source(&self, resource: &Resource) -> Result<String, ResolveError> {
        self.files
            .get(resource)
            .cloned()
            .ok_or_else(|| ResolveError::FileNotFound(format!("{resource} (virtual file)")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_are_normalized() {
        let a = Resource::new("lib\\common/./light.glsl").unwrap();
        let b = Resource::new("lib/common/light.glsl").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "lib/common/light.glsl");
        let c = Resource::new("lib/../light.glsl").unwrap();
        assert_eq!(c.to_string(), "light.glsl");
    }

    #[test]
    fn invalid_paths() {
        assert!(matches!(
            Resource::new(""),
            Err(ResolveError::InvalidResource(_))
        ));
        assert!(matches!(
            Resource::new("../outside.glsl"),
            Err(ResolveError::InvalidResource(_))
        ));
    }

    #[test]
    fn virtual_files() {
        let mut resolver = VirtualFileResolver::new();
        resolver.add_file("include/a.glsl", "float a;").unwrap();
        let resource = Resource::new("include\\a.glsl").unwrap();
        assert_eq!(resolver.resolve_source(&resource).unwrap(), "float a;");
        let missing = Resource::new("b.glsl").unwrap();
        assert_eq!(
            resolver.resolve_source(&missing),
            Err(ResolveError::FileNotFound("b.glsl (virtual file)".to_string()))
        );
    }
}
