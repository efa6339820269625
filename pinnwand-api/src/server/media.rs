use std::{io, path::PathBuf};
use tokio::fs;

/// Writes uploaded post images below the configured media root. Serving the
/// files back is left to whatever fronts the server.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store image bytes and return the relative path kept on the post row.
    pub async fn store_post_image(&self, data: &[u8]) -> io::Result<String> {
        let relative = format!("posts/{:032x}", rand::random::<u128>());
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;

        Ok(relative)
    }
}
