use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::AsyncWriteExt;

use crate::error::MappingError;

/// Writes `content` to `path` through a sibling temp file, then renames over the target.
///
/// Readers see either the old file or the new one, never a truncated table.
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), MappingError> {
    let Some(dir) = path.parent() else {
        return Err(MappingError::InvalidArgument(format!(
            "Invalid output path (no parent directory): {}",
            path.display()
        )));
    };
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let file_name = path
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("table.json");

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut opened = None;
    for attempt in 0..32_u32 {
        let candidate = dir.join(format!(
            ".{file_name}.{}.{}.tmp",
            std::process::id(),
            seed.saturating_add(attempt as u128)
        ));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => {
                opened = Some((candidate, file));
                break;
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }
    let Some((tmp_path, mut file)) = opened else {
        return Err(MappingError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "Unable to allocate temporary output file",
        )));
    };

    let written = async {
        file.write_all(content).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;
    drop(file);
    if let Err(err) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err.into());
    }

    if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err.into());
    }
    Ok(())
}
