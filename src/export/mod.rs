//! Exporters. These consume the normalized aggregate (and the selected
//! LOD's sealed mesh buffer) only; raw source bytes never reach this layer.

pub mod mscn;
pub mod smd;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Write a file through a temporary sibling, renaming into place on
/// success. A failed export leaves no partial file behind.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> Result<()>,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_owned());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result = (|| {
        let file = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        let mut w = BufWriter::new(file);
        write(&mut w)?;
        w.flush()?;
        Ok(())
    })();

    match result {
        Ok(()) => fs::rename(&tmp, path)
            .with_context(|| format!("renaming {} into place", tmp.display())),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("model.smd");
        let err = write_atomic(&target, |_| bail!("boom"));
        assert!(err.is_err());
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn successful_write_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("model.smd");
        write_atomic(&target, |w| {
            w.write_all(b"version 1\n")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "version 1\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
