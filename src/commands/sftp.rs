//! File commands
//!
//! Remote paths are passed through as given, except `upload`, which also
//! accepts `\` separators from Windows hosts.

use std::path::Path;

use super::{render_error, render_unit};
use crate::session::SessionManager;
use crate::sftp::path_utils::to_remote_separators;
use crate::sftp::ListingItem;

/// JSON array of `{"type","name","size"?}`
pub async fn list(manager: &SessionManager, remote_path: &str) -> String {
    let entries = match manager.list(remote_path).await {
        Ok(entries) => entries,
        Err(e) => return render_error(e),
    };

    let items: Vec<ListingItem> = entries.iter().map(ListingItem::from).collect();
    serde_json::to_string(&items).unwrap_or_else(|e| render_error(e))
}

pub async fn download(manager: &SessionManager, remote_path: &str, local_dir: &str) -> String {
    render_unit(manager.download(remote_path, Path::new(local_dir)).await)
}

pub async fn upload(manager: &SessionManager, remote_path: &str, local_path: &str) -> String {
    let remote_path = to_remote_separators(remote_path);
    render_unit(manager.upload(&remote_path, Path::new(local_path)).await)
}

pub async fn delete(manager: &SessionManager, remote_path: &str) -> String {
    render_unit(manager.delete(remote_path).await)
}

pub async fn rename(manager: &SessionManager, remote_path: &str, new_name: &str) -> String {
    render_unit(manager.rename(remote_path, new_name).await)
}
