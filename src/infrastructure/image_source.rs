//! 图片来源 - 基础设施层
//!
//! 只暴露"列出文件名 / 取字节 / 清空"三种能力，不关心批改流程。
//! 两种实现：上传服务器（HTTP）和本地目录。

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 文件名过滤条件：前缀 + 后缀
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    pub prefix: String,
    pub suffix: String,
}

impl NamePattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.image_prefix, &config.image_extension)
    }

    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && name.ends_with(&self.suffix)
    }
}

/// 图片来源
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// 用于日志的描述
    fn describe(&self) -> String;

    /// 列出当前可用的文件名
    async fn list_names(&self) -> AppResult<Vec<String>>;

    /// 读取指定文件的字节
    async fn fetch(&self, name: &str) -> AppResult<Vec<u8>>;

    /// 清空已上传的图片，调用方应把失败当作警告处理
    async fn delete_all(&self) -> AppResult<()>;
}

/// 上传服务器返回的文件列表
#[derive(Debug, Deserialize)]
struct UploadListing {
    #[serde(default)]
    files: Vec<String>,
}

/// 远程上传服务器
///
/// - `GET {base}/uploads` → `{"files": [...]}`
/// - `GET {base}/files/{name}` → 图片字节
/// - `DELETE {base}/delete-all`
pub struct RemoteImageSource {
    base_url: String,
    http: reqwest::Client,
}

impl RemoteImageSource {
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_base_url(&config.upload_base_url, config.http_timeout())
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::api_request_failed(&base_url, e))?;

        Ok(Self { base_url, http })
    }

    async fn get(&self, endpoint: &str) -> AppResult<reqwest::Response> {
        let response = self
            .http
            .get(endpoint)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::bad_response(endpoint, Some(status.as_u16()), None));
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageSource for RemoteImageSource {
    fn describe(&self) -> String {
        format!("上传服务器 {}", self.base_url)
    }

    async fn list_names(&self) -> AppResult<Vec<String>> {
        let endpoint = format!("{}/uploads", self.base_url);
        let listing: UploadListing = self
            .get(&endpoint)
            .await?
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        debug!("上传服务器共有 {} 个文件", listing.files.len());
        Ok(listing.files)
    }

    async fn fetch(&self, name: &str) -> AppResult<Vec<u8>> {
        let endpoint = format!("{}/files/{}", self.base_url, name);
        let bytes = self
            .get(&endpoint)
            .await?
            .bytes()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;
        Ok(bytes.to_vec())
    }

    async fn delete_all(&self) -> AppResult<()> {
        let endpoint = format!("{}/delete-all", self.base_url);
        let response = self
            .http
            .delete(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::bad_response(&endpoint, Some(status.as_u16()), None));
        }
        Ok(())
    }
}

/// 本地拍照目录
pub struct LocalImageSource {
    dir: PathBuf,
    pattern: NamePattern,
}

impl LocalImageSource {
    /// `pattern` 只用于 `delete_all`，避免删掉目录里的其他文件
    pub fn new(dir: impl Into<PathBuf>, pattern: NamePattern) -> Self {
        Self {
            dir: dir.into(),
            pattern,
        }
    }
}

#[async_trait]
impl ImageSource for LocalImageSource {
    fn describe(&self) -> String {
        format!("本地目录 {}", self.dir.display())
    }

    async fn list_names(&self) -> AppResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| AppError::file_read_failed(self.dir.display().to_string(), e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn fetch(&self, name: &str) -> AppResult<Vec<u8>> {
        let path = self.dir.join(name);
        fs::read(&path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))
    }

    async fn delete_all(&self) -> AppResult<()> {
        for name in self.list_names().await? {
            if !self.pattern.matches(&name) {
                continue;
            }
            let path = self.dir.join(&name);
            fs::remove_file(&path)
                .await
                .map_err(|e| AppError::file_delete_failed(path.display().to_string(), e))?;
        }
        Ok(())
    }
}

/// 按配置选择图片来源：设置了本地目录就用本地目录
pub fn from_config(config: &Config) -> AppResult<Box<dyn ImageSource>> {
    match &config.local_capture_dir {
        Some(dir) => Ok(Box::new(LocalImageSource::new(
            dir,
            NamePattern::from_config(config),
        ))),
        None => Ok(Box::new(RemoteImageSource::new(config)?)),
    }
}
