//! Work item enumeration.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::core::types::WorkItem;
use crate::error::BatchError;

/// List the entries of `dir` as work items, sorted by file name.
///
/// Every entry counts (files, subdirectories, dot-files) unless `extension`
/// narrows the set. The sort is byte-wise so the order does not depend on the
/// filesystem's listing order.
pub fn discover_items(dir: &Path, extension: Option<&str>) -> Result<Vec<WorkItem>, BatchError> {
    let not_found = |source| BatchError::DirectoryNotFound {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(not_found)? {
        let entry = entry.map_err(not_found)?;
        let path = entry.path();
        if let Some(wanted) = extension
            && path.extension().and_then(|ext| ext.to_str()) != Some(wanted)
        {
            continue;
        }
        paths.push(path);
    }
    paths.sort_by(|left, right| left.file_name().cmp(&right.file_name()));

    debug!(dir = %dir.display(), count = paths.len(), "discovered work items");
    Ok(paths.into_iter().map(WorkItem::from_path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[WorkItem]) -> Vec<&str> {
        items.iter().map(WorkItem::name).collect()
    }

    #[test]
    fn sorts_entries_lexically() {
        let temp = tempfile::tempdir().expect("tempdir");
        for name in ["b", "a", "c"] {
            fs::write(temp.path().join(name), "").expect("write");
        }
        let items = discover_items(temp.path(), None).expect("discover");
        assert_eq!(names(&items), vec!["a", "b", "c"]);
        assert_eq!(items[0].path(), temp.path().join("a"));
    }

    #[test]
    fn includes_every_entry_kind() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join(".hidden"), "").expect("write");
        fs::create_dir(temp.path().join("subdir")).expect("mkdir");
        fs::write(temp.path().join("prog.ssm"), "").expect("write");
        let items = discover_items(temp.path(), None).expect("discover");
        assert_eq!(names(&items), vec![".hidden", "prog.ssm", "subdir"]);
    }

    #[test]
    fn extension_filter_narrows_items() {
        let temp = tempfile::tempdir().expect("tempdir");
        for name in ["one.ssm", "two.txt", "three.ssm", "ssm"] {
            fs::write(temp.path().join(name), "").expect("write");
        }
        let items = discover_items(temp.path(), Some("ssm")).expect("discover");
        assert_eq!(names(&items), vec!["one.ssm", "three.ssm"]);
    }

    #[test]
    fn empty_directory_yields_no_items() {
        let temp = tempfile::tempdir().expect("tempdir");
        let items = discover_items(temp.path(), None).expect("discover");
        assert!(items.is_empty());
    }

    #[test]
    fn missing_directory_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("nope");
        let err = discover_items(&missing, None).expect_err("missing");
        assert!(matches!(err, BatchError::DirectoryNotFound { ref path, .. } if path == &missing));
    }

    #[test]
    fn file_instead_of_directory_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("file");
        fs::write(&file, "").expect("write");
        let err = discover_items(&file, None).expect_err("not a dir");
        assert!(matches!(err, BatchError::DirectoryNotFound { .. }));
    }
}
