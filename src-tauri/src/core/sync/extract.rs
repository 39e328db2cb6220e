use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Unpacks `archive` over `dest`, overwriting files that already exist.
/// Entries escaping `dest` abort the whole extraction.
pub fn extract_over(archive: &Path, dest: &Path) -> LauncherResult<usize> {
    let file = std::fs::File::open(archive).map_err(|source| LauncherError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file)?;

    std::fs::create_dir_all(dest).map_err(|source| LauncherError::Io {
        path: dest.to_path_buf(),
        source,
    })?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative: PathBuf = entry.enclosed_name().ok_or_else(|| {
            LauncherError::Other(format!("Unsafe path in archive: {}", entry.name()))
        })?;

        let out_path = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|source| LauncherError::Io {
                path: out_path,
                source,
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut out = std::fs::File::create(&out_path).map_err(|source| LauncherError::Io {
            path: out_path.clone(),
            source,
        })?;
        std::io::copy(&mut entry, &mut out).map_err(|source| LauncherError::Io {
            path: out_path,
            source,
        })?;
        written += 1;
    }

    debug!("Extracted {} files from {:?} into {:?}", written, archive, dest);
    Ok(written)
}

/// Runs [`extract_over`] on the blocking pool.
pub async fn extract_over_async(archive: PathBuf, dest: PathBuf) -> LauncherResult<usize> {
    tokio::task::spawn_blocking(move || extract_over(&archive, &dest)).await?
}

#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;

    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap();
    }
    buffer.into_inner()
}
