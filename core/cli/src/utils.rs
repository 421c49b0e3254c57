use std::fs::create_dir_all;
use std::path::Path;

use anyhow::Result;

pub fn ensure_parent_exist(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent_dir) if !parent_dir.as_os_str().is_empty() => {
            create_dir_all(parent_dir)?;
            Ok(())
        },
        _ => Ok(()),
    }
}
