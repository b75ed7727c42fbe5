//! Reading the selected picture into memory.

use async_trait::async_trait;

use super::state::ImageRef;

/// Resolves an [`ImageRef`] to its encoded bytes.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, image: &ImageRef) -> std::io::Result<Vec<u8>>;
}

/// Reads local files. Accepts plain paths and `file://` URIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageLoader;

#[async_trait]
impl ImageLoader for FsImageLoader {
    async fn load(&self, image: &ImageRef) -> std::io::Result<Vec<u8>> {
        let raw = image.as_str();
        let path = raw.strip_prefix("file://").unwrap_or(raw);
        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{path} is empty"),
            ));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_plain_path_and_file_uri() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("engine.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF]).unwrap();

        let plain = ImageRef::new(path.to_str().unwrap()).unwrap();
        assert_eq!(FsImageLoader.load(&plain).await.unwrap(), vec![0xFF, 0xD8, 0xFF]);

        let uri = ImageRef::new(&format!("file://{}", path.display())).unwrap();
        assert_eq!(FsImageLoader.load(&uri).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let missing = ImageRef::new(dir.path().join("nope.jpg").to_str().unwrap()).unwrap();
        let err = FsImageLoader.load(&missing).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("empty.jpg");
        std::fs::write(&path, b"").unwrap();

        let image = ImageRef::new(path.to_str().unwrap()).unwrap();
        let err = FsImageLoader.load(&image).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
