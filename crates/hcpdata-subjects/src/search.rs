//! Ordered list of directories searched for subject directories

use hcpdata_core::types::expand_user;
use hcpdata_core::{Error, Result, SubjectId};
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct SearchPaths {
    paths: RwLock<Vec<PathBuf>>,
}

impl SearchPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory, or a `:`-separated list of directories
    ///
    /// `index` gives the position of the (first) new path; `None` appends.
    /// Paths that are not directories are refused and make the result false;
    /// paths already present count as added.
    pub fn add(&self, path: &str, index: Option<usize>) -> bool {
        let parts: Vec<&str> = path.split(':').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return false;
        }

        let Ok(mut paths) = self.paths.write() else {
            tracing::warn!("Search path lock poisoned");
            return false;
        };

        let mut all_added = true;
        let mut position = index;
        for part in parts {
            let dir = expand_user(part);
            if !dir.is_dir() {
                tracing::warn!("Ignoring search path {}: not a directory", dir.display());
                all_added = false;
                continue;
            }
            if paths.contains(&dir) {
                continue;
            }
            match position {
                Some(i) => {
                    let i = i.min(paths.len());
                    paths.insert(i, dir);
                    position = Some(i + 1);
                }
                None => paths.push(dir),
            }
        }
        all_added
    }

    /// Empty the list, returning what it held
    pub fn clear(&self) -> Vec<PathBuf> {
        match self.paths.write() {
            Ok(mut paths) => std::mem::take(&mut *paths),
            Err(_) => Vec::new(),
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths
            .read()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }

    /// First `<search path>/<sid>` that is a directory
    pub fn find(&self, sid: SubjectId) -> Result<Option<PathBuf>> {
        let paths = self
            .paths
            .read()
            .map_err(|_| Error::configuration("search path lock poisoned"))?;
        Ok(paths
            .iter()
            .map(|p| p.join(sid.to_string()))
            .find(|p| p.is_dir()))
    }

    /// First search path that still exists
    pub fn first_existing(&self) -> Option<PathBuf> {
        self.paths().into_iter().find(|p| p.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs(n: usize) -> (TempDir, Vec<String>) {
        let temp = TempDir::new().unwrap();
        let names = (0..n)
            .map(|i| {
                let p = temp.path().join(format!("d{}", i));
                std::fs::create_dir(&p).unwrap();
                p.to_string_lossy().into_owned()
            })
            .collect();
        (temp, names)
    }

    #[test]
    fn test_add_and_order() {
        let (_temp, d) = dirs(3);
        let sp = SearchPaths::new();
        assert!(sp.add(&d[0], None));
        assert!(sp.add(&d[1], None));
        assert!(sp.add(&d[2], Some(0)));
        assert_eq!(
            sp.paths(),
            vec![PathBuf::from(&d[2]), PathBuf::from(&d[0]), PathBuf::from(&d[1])]
        );
    }

    #[test]
    fn test_duplicates_and_missing() {
        let (temp, d) = dirs(1);
        let sp = SearchPaths::new();
        assert!(sp.add(&d[0], None));
        assert!(sp.add(&d[0], None));
        assert_eq!(sp.paths().len(), 1);

        let missing = temp.path().join("missing");
        assert!(!sp.add(missing.to_str().unwrap(), None));
        assert_eq!(sp.paths().len(), 1);
    }

    #[test]
    fn test_colon_lists() {
        let (temp, d) = dirs(3);
        let sp = SearchPaths::new();
        assert!(sp.add(&d[2], None));
        assert!(sp.add(&format!("{}:{}", d[0], d[1]), Some(0)));
        assert_eq!(
            sp.paths(),
            vec![PathBuf::from(&d[0]), PathBuf::from(&d[1]), PathBuf::from(&d[2])]
        );

        // one bad part makes the whole call false, the good parts still land
        let sp = SearchPaths::new();
        let missing = temp.path().join("missing");
        assert!(!sp.add(&format!("{}:{}", d[0], missing.display()), None));
        assert_eq!(sp.paths(), vec![PathBuf::from(&d[0])]);
    }

    #[test]
    fn test_clear_returns_previous() {
        let (_temp, d) = dirs(2);
        let sp = SearchPaths::new();
        sp.add(&d[0], None);
        sp.add(&d[1], None);
        let previous = sp.clear();
        assert_eq!(previous.len(), 2);
        assert!(sp.paths().is_empty());
    }

    #[test]
    fn test_find() {
        let (_temp, d) = dirs(2);
        let sid = SubjectId::new(100307).unwrap();
        std::fs::create_dir(PathBuf::from(&d[1]).join("100307")).unwrap();

        let sp = SearchPaths::new();
        sp.add(&format!("{}:{}", d[0], d[1]), None);
        assert_eq!(
            sp.find(sid).unwrap(),
            Some(PathBuf::from(&d[1]).join("100307"))
        );
        assert_eq!(sp.find(SubjectId::new(100408).unwrap()).unwrap(), None);
    }
}
