//! Async batch processing module
//!
//! This module compresses or decompresses many independent inputs
//! concurrently. Every single call still runs synchronously on a blocking
//! worker thread; only whole inputs are processed side by side.

#[cfg(feature = "async")]
/// Concurrent processing of independent buffers and files
pub mod processor {
    use crate::{Codec, CompressionStats, LzError, Result};
    use futures::stream::{self, StreamExt, TryStreamExt};
    use log::debug;
    use std::path::{Path, PathBuf};

    /// Concurrent batch processor for one codec
    #[derive(Debug, Clone)]
    pub struct AsyncBatchProcessor {
        codec: Codec,
        concurrency_limit: usize,
    }

    /// Run one engine call on the blocking pool
    async fn run_blocking<T, F>(job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| LzError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    impl AsyncBatchProcessor {
        /// Create a batch processor using one worker per CPU
        pub fn new(codec: Codec) -> Self {
            Self {
                codec,
                concurrency_limit: num_cpus::get(),
            }
        }

        /// Set the concurrency limit
        pub fn with_concurrency(mut self, limit: usize) -> Self {
            self.concurrency_limit = limit.max(1);
            self
        }

        /// Codec applied to every input
        pub fn codec(&self) -> Codec {
            self.codec
        }

        /// Compress in-memory buffers, keeping their order
        pub async fn compress_buffers(&self, inputs: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>> {
            let codec = self.codec;
            stream::iter(
                inputs
                    .into_iter()
                    .map(move |input| run_blocking(move || codec.compress(&input))),
            )
            .buffered(self.concurrency_limit)
            .try_collect()
            .await
        }

        /// Decompress in-memory buffers, keeping their order
        pub async fn decompress_buffers(&self, inputs: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>> {
            let codec = self.codec;
            stream::iter(
                inputs
                    .into_iter()
                    .map(move |input| run_blocking(move || codec.decompress(&input))),
            )
            .buffered(self.concurrency_limit)
            .try_collect()
            .await
        }

        /// Compress multiple files concurrently; results arrive in completion
        /// order
        pub async fn compress_files<P: AsRef<Path> + Send + Sync>(
            &self,
            files: Vec<P>,
        ) -> Result<Vec<(PathBuf, Vec<u8>)>> {
            let results = stream::iter(files.into_iter().map(|path| {
                let processor = self.clone();
                async move { processor.compress_single_file(path).await }
            }))
            .buffer_unordered(self.concurrency_limit)
            .map_ok(|(path, data, _)| (path, data))
            .try_collect()
            .await?;

            Ok(results)
        }

        /// Decompress multiple files concurrently
        pub async fn decompress_files<P: AsRef<Path> + Send + Sync>(
            &self,
            files: Vec<P>,
        ) -> Result<Vec<(PathBuf, Vec<u8>)>> {
            let results = stream::iter(files.into_iter().map(|path| {
                let codec = self.codec;
                async move {
                    let path = path.as_ref().to_path_buf();
                    let data = tokio::fs::read(&path).await?;
                    let output = run_blocking(move || codec.decompress(&data)).await?;
                    Ok::<_, LzError>((path, output))
                }
            }))
            .buffer_unordered(self.concurrency_limit)
            .try_collect()
            .await?;

            Ok(results)
        }

        /// Stream per-file statistics as compressions complete
        pub fn compress_files_streaming<P: AsRef<Path> + Send + Sync + 'static>(
            &self,
            files: Vec<P>,
        ) -> impl futures::Stream<Item = Result<(PathBuf, CompressionStats)>> + '_ {
            stream::iter(files.into_iter().map(move |path| {
                let processor = self.clone();
                async move {
                    let (path, _data, stats) = processor.compress_single_file(path).await?;
                    Ok((path, stats))
                }
            }))
            .buffer_unordered(self.concurrency_limit)
        }

        /// Compress a single file
        async fn compress_single_file<P: AsRef<Path>>(
            &self,
            path: P,
        ) -> Result<(PathBuf, Vec<u8>, CompressionStats)> {
            let path = path.as_ref().to_path_buf();
            let input = tokio::fs::read(&path).await?;
            let codec = self.codec;
            let (data, stats) = run_blocking(move || codec.compress_with_stats(&input)).await?;
            debug!("batch: {} compressed to {} bytes", path.display(), data.len());
            Ok((path, data, stats))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::FormatId;

        #[tokio::test]
        async fn test_buffers_keep_order() {
            let inputs: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 100 + i as usize * 50]).collect();
            let processor = AsyncBatchProcessor::new(Codec::new(FormatId::Lz11)).with_concurrency(3);
            let packed = processor.compress_buffers(inputs.clone()).await.unwrap();
            let unpacked = processor.decompress_buffers(packed).await.unwrap();
            assert_eq!(unpacked, inputs);
        }

        #[tokio::test]
        async fn test_files() {
            let dir = tempfile::tempdir().unwrap();
            let mut paths = Vec::new();
            for i in 0..4 {
                let path = dir.path().join(format!("input{i}.bin"));
                std::fs::write(&path, format!("file {i} ").repeat(200)).unwrap();
                paths.push(path);
            }

            let processor = AsyncBatchProcessor::new(Codec::new(FormatId::Yaz0Be));
            let packed = processor.compress_files(paths.clone()).await.unwrap();
            assert_eq!(packed.len(), 4);
            for (path, data) in packed {
                let original = std::fs::read(&path).unwrap();
                assert_eq!(processor.codec().decompress(&data).unwrap(), original);
            }

            let stats: Vec<_> = processor
                .compress_files_streaming(paths)
                .try_collect()
                .await
                .unwrap();
            assert!(stats.iter().all(|(_, s)| s.compression_ratio < 0.5));
        }

        #[tokio::test]
        async fn test_errors_propagate() {
            let processor = AsyncBatchProcessor::new(Codec::new(FormatId::Crilayla));
            let result = processor.compress_buffers(vec![vec![0; 0x200], vec![0; 3]]).await;
            assert!(matches!(result, Err(LzError::InputTooSmall { .. })));
        }
    }
}

#[cfg(feature = "async")]
pub use processor::AsyncBatchProcessor;
