//! 会话存档 - 业务能力层
//!
//! 每次提交写一条 JSON 记录和一张 RGB JPEG，写入后不再修改。

use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, FileError};
use crate::models::{CapturedImage, SessionRecord};

/// 时间戳格式，同时用作文件名
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// 会话存档
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.history_dir)
    }

    /// 当前本地时间的时间戳
    pub fn timestamp() -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// 图片保存路径
    pub fn image_path(&self, timestamp: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", timestamp))
    }

    fn record_path(&self, timestamp: &str) -> PathBuf {
        self.dir.join(format!("{}.json", timestamp))
    }

    /// 保存记录和图片
    ///
    /// 先写图片，最后写 JSON 记录；记录文件存在即表示整条会话完整。
    /// 同一时间戳的文件已存在时返回 [`FileError::AlreadyExists`]，不覆盖。
    pub async fn save(&self, record: &SessionRecord, image: &CapturedImage) -> AppResult<PathBuf> {
        let json = serde_json::to_string_pretty(record)?;
        let jpeg = image.to_rgb_jpeg()?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.dir.display().to_string(), e))?;

        let image_path = self.image_path(&record.timestamp);
        write_new(&image_path, &jpeg).await?;

        let record_path = self.record_path(&record.timestamp);
        if let Err(e) = write_new(&record_path, json.as_bytes()).await {
            if let Err(cleanup) = fs::remove_file(&image_path).await {
                warn!("⚠️ 清理图片 {} 失败: {}", image_path.display(), cleanup);
            }
            return Err(e);
        }

        info!("💾 已保存会话记录: {}", record_path.display());
        Ok(record_path)
    }

    /// 列出已保存的记录名（不含扩展名），最新的在前
    pub async fn list(&self) -> AppResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("历史目录不存在: {}", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(AppError::file_read_failed(self.dir.display().to_string(), e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// 读取一条记录，`name` 可带或不带 `.json`
    pub async fn load(&self, name: &str) -> AppResult<SessionRecord> {
        let stem = name.strip_suffix(".json").unwrap_or(name);
        let path = self.record_path(stem);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FileError::NotFound {
                    path: path.display().to_string(),
                }
                .into())
            }
            Err(e) => return Err(AppError::file_read_failed(path.display().to_string(), e)),
        };

        Ok(serde_json::from_str(&content)?)
    }
}

async fn write_new(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                AppError::File(FileError::AlreadyExists {
                    path: path.display().to_string(),
                })
            } else {
                AppError::file_write_failed(path.display().to_string(), e)
            }
        })?;

    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(path).await;
        return Err(AppError::file_write_failed(path.display().to_string(), e));
    }
    Ok(())
}
