use std::{fmt, fs::{self, File}, io::{BufReader, Read}, path::{Path, PathBuf}, time::Duration};

use anyhow::{Context, Result};
use bytes::Bytes;

/// Where one period's archive comes from: a file already on disk, or a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Source {
    Local(PathBuf),
    Remote(String),
}

impl Source {
    /// Prefer `local_dir/file_name` when a local mirror directory is configured.
    pub(crate) fn resolve(local_dir: Option<&Path>, file_name: &str, url: String) -> Self {
        match local_dir {
            Some(dir) => Source::Local(dir.join(file_name)),
            None => Source::Remote(url),
        }
    }

    /// Short name for log lines (file name or last URL segment).
    pub(crate) fn label(&self) -> String {
        match self {
            Source::Local(path) => path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Source::Remote(url) => url.rsplit('/').next().unwrap_or(url).to_string(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local(path) => write!(f, "{}", path.display()),
            Source::Remote(url) => f.write_str(url),
        }
    }
}

/// Opens sources and keeps a running total of bytes pulled over the network.
pub(crate) struct Fetcher {
    #[cfg(feature = "download")]
    client: reqwest::blocking::Client,
    bytes_downloaded: u64,
}

impl Fetcher {
    #[cfg_attr(not(feature = "download"), allow(unused_variables))]
    pub(crate) fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            #[cfg(feature = "download")]
            client: super::http_client(timeout)?,
            bytes_downloaded: 0,
        })
    }

    /// Total bytes downloaded so far (Content-Length for streamed sources).
    #[inline] pub(crate) fn bytes_downloaded(&self) -> u64 { self.bytes_downloaded }

    /// Open the source for streaming reads.
    pub(crate) fn open(&mut self, source: &Source) -> Result<Box<dyn Read>> {
        match source {
            Source::Local(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                Ok(Box::new(BufReader::new(file)))
            }
            Source::Remote(url) => self.open_remote(url),
        }
    }

    /// Read the whole source into memory.
    pub(crate) fn read_all(&mut self, source: &Source) -> Result<Bytes> {
        match source {
            Source::Local(path) => Ok(Bytes::from(
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
            )),
            Source::Remote(url) => self.fetch_remote(url),
        }
    }

    /// Read and parse a JSON source.
    pub(crate) fn read_json(&mut self, source: &Source) -> Result<serde_json::Value> {
        let bytes = self.read_all(source)?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse JSON from {source}"))
    }

    /// Counts the body's reported length once the GET has succeeded.
    #[cfg(feature = "download")]
    fn open_remote(&mut self, url: &str) -> Result<Box<dyn Read>> {
        let response = super::open_remote(&self.client, url)?;
        match response.content_length() {
            Some(size) => {
                log::debug!("[download] {url}: {:.3} GB", size as f64 / 1024f64.powi(3));
                self.bytes_downloaded += size;
            }
            None => log::debug!("[download] {url}: size unknown"),
        }
        Ok(Box::new(response))
    }

    #[cfg(feature = "download")]
    fn fetch_remote(&mut self, url: &str) -> Result<Bytes> {
        let bytes = super::fetch_bytes(&self.client, url)?;
        self.bytes_downloaded += bytes.len() as u64;
        Ok(bytes)
    }

    #[cfg(not(feature = "download"))]
    fn open_remote(&mut self, url: &str) -> Result<Box<dyn Read>> {
        anyhow::bail!("cannot fetch {url}: built without the `download` feature")
    }

    #[cfg(not(feature = "download"))]
    fn fetch_remote(&mut self, url: &str) -> Result<Bytes> {
        anyhow::bail!("cannot fetch {url}: built without the `download` feature")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_local_mirror() {
        let url = "https://example.org/data/ny_od_main_JT00_2020.csv.gz".to_string();
        let local = Source::resolve(Some(Path::new("/mirror")), "ny_od_main_JT00_2020.csv.gz", url.clone());
        assert_eq!(local, Source::Local(PathBuf::from("/mirror/ny_od_main_JT00_2020.csv.gz")));

        let remote = Source::resolve(None, "ny_od_main_JT00_2020.csv.gz", url.clone());
        assert_eq!(remote, Source::Remote(url));
        assert_eq!(remote.label(), "ny_od_main_JT00_2020.csv.gz");
    }

    #[test]
    fn local_sources_are_read_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        fs::write(&path, r#"[["a"],["b"]]"#).unwrap();

        let mut fetcher = Fetcher::new(Duration::from_secs(1)).unwrap();
        let source = Source::Local(path);
        assert_eq!(fetcher.read_json(&source).unwrap()[1][0], "b");
        assert_eq!(fetcher.bytes_downloaded(), 0);
    }

    #[cfg(feature = "download")]
    #[test]
    fn failed_remote_opens_count_no_bytes() {
        let mut fetcher = Fetcher::new(Duration::from_secs(2)).unwrap();
        let source = Source::Remote("http://127.0.0.1:9/ny_od_main_JT00_2020.csv.gz".to_string());
        assert!(fetcher.open(&source).is_err());
        assert!(fetcher.read_all(&source).is_err());
        assert_eq!(fetcher.bytes_downloaded(), 0);
    }
}
