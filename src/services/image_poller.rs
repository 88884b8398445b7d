//! 图片轮询 - 业务能力层
//!
//! 状态机：`Waiting → Found(image) | TimedOut`。
//! 超时只是"没收到图片"，不是错误，由调用方决定是否重新进入等待。

use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::image_source::{ImageSource, NamePattern};
use crate::models::CapturedImage;

/// 轮询状态
#[derive(Debug)]
pub enum PollState {
    Waiting,
    Found(CapturedImage),
    TimedOut,
}

/// 图片轮询器
#[derive(Debug, Clone)]
pub struct ImagePoller {
    timeout: Duration,
    interval: Duration,
}

impl ImagePoller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.poll_timeout(), config.poll_interval())
    }

    /// 等待最新的一张图片
    ///
    /// "最新"取文件名字典序最大的一个，依赖采集端用时间戳命名。
    /// 最新的文件无法解码时记为拒绝，之后只接受比它更新的文件，
    /// 不会退回到更早的图片。单次查询不会超过剩余的等待时间。
    pub async fn await_latest(
        &self,
        source: &dyn ImageSource,
        pattern: &NamePattern,
    ) -> Option<CapturedImage> {
        info!(
            "⏳ 等待 {} 上传图片 ({}*{})，最多 {} 秒",
            source.describe(),
            pattern.prefix,
            pattern.suffix,
            self.timeout.as_secs()
        );

        let deadline = Instant::now() + self.timeout;
        let mut rejected_floor: Option<String> = None;
        let mut state = PollState::Waiting;

        loop {
            state = match state {
                PollState::Waiting => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let polled = timeout(
                        remaining,
                        self.poll_once(source, pattern, &mut rejected_floor),
                    )
                    .await;

                    match polled {
                        Ok(Some(image)) => PollState::Found(image),
                        Ok(None) if Instant::now() + self.interval <= deadline => {
                            sleep(self.interval).await;
                            PollState::Waiting
                        }
                        Ok(None) => PollState::TimedOut,
                        Err(_) => {
                            debug!("单次查询超出剩余等待时间");
                            PollState::TimedOut
                        }
                    }
                }
                PollState::Found(image) => {
                    info!("✓ 收到图片: {} ({} 字节)", image.name, image.bytes.len());
                    return Some(image);
                }
                PollState::TimedOut => {
                    warn!("⚠️ {} 秒内没有收到图片", self.timeout.as_secs());
                    return None;
                }
            };
        }
    }

    /// 查询一次，返回通过校验的最新图片
    async fn poll_once(
        &self,
        source: &dyn ImageSource,
        pattern: &NamePattern,
        rejected_floor: &mut Option<String>,
    ) -> Option<CapturedImage> {
        let names = match source.list_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!("⚠️ 查询上传列表失败: {}", e);
                return None;
            }
        };

        let latest = select_latest(&names, pattern, rejected_floor.as_deref())?.to_string();
        debug!("候选最新图片: {}（按文件名字典序）", latest);

        let bytes = match source.fetch(&latest).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("⚠️ 下载图片 {} 失败: {}", latest, e);
                return None;
            }
        };

        match CapturedImage::decode_checked(&latest, bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("⚠️ 丢弃损坏的图片，等待更新的上传: {}", e);
                *rejected_floor = Some(latest);
                None
            }
        }
    }
}

/// 选出符合条件、字典序最大的文件名
///
/// 最大的文件名不大于 `rejected_floor` 时返回 `None`：更早的图片不算最新。
pub fn select_latest<'a>(
    names: &'a [String],
    pattern: &NamePattern,
    rejected_floor: Option<&str>,
) -> Option<&'a str> {
    names
        .iter()
        .filter(|name| pattern.matches(name))
        .max()
        .map(String::as_str)
        .filter(|name| rejected_floor.map_or(true, |floor| *name > floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::models::capture::test_support::tiny_png;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 第 n 次 list 返回第 n 组文件名（超出后重复最后一组）
    struct FakeSource {
        listings: Vec<Vec<String>>,
        files: HashMap<String, Vec<u8>>,
        list_calls: AtomicUsize,
        fetched: Mutex<Vec<String>>,
        /// 前几次 list 返回传输错误
        list_failures: usize,
        /// 每次 list 之前的延迟
        list_delay: Duration,
    }

    impl FakeSource {
        fn new(listings: Vec<Vec<&str>>, files: Vec<(&str, Vec<u8>)>) -> Self {
            Self {
                listings: listings
                    .into_iter()
                    .map(|l| l.into_iter().map(String::from).collect())
                    .collect(),
                files: files
                    .into_iter()
                    .map(|(n, b)| (n.to_string(), b))
                    .collect(),
                list_calls: AtomicUsize::new(0),
                fetched: Mutex::new(Vec::new()),
                list_failures: 0,
                list_delay: Duration::ZERO,
            }
        }

        fn failing_first(mut self, failures: usize) -> Self {
            self.list_failures = failures;
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.list_delay = delay;
            self
        }
    }

    #[async_trait]
    impl ImageSource for FakeSource {
        fn describe(&self) -> String {
            "fake".to_string()
        }

        async fn list_names(&self) -> AppResult<Vec<String>> {
            let i = self.list_calls.fetch_add(1, Ordering::SeqCst);
            if !self.list_delay.is_zero() {
                sleep(self.list_delay).await;
            }
            if i < self.list_failures {
                return Err(AppError::bad_response("/uploads", Some(503), None));
            }
            let listing = self
                .listings
                .get(i)
                .or_else(|| self.listings.last())
                .cloned()
                .unwrap_or_default();
            Ok(listing)
        }

        async fn fetch(&self, name: &str) -> AppResult<Vec<u8>> {
            self.fetched.lock().unwrap().push(name.to_string());
            self.files
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::Other(format!("missing {}", name)))
        }

        async fn delete_all(&self) -> AppResult<()> {
            Ok(())
        }
    }

    fn pattern() -> NamePattern {
        NamePattern::new("mathmandala_", ".png")
    }

    fn poller() -> ImagePoller {
        ImagePoller::new(Duration::from_millis(200), Duration::from_millis(10))
    }

    #[test]
    fn test_select_latest_is_lexicographic_and_filtered() {
        let names: Vec<String> = [
            "mathmandala_2026-10-18_09-00-00.png",
            "mathmandala_2026-10-18_10-00-00.png",
            "zzz_2026.png",
            "mathmandala_2026-10-18_11-00-00.jpg",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(
            select_latest(&names, &pattern(), None),
            Some("mathmandala_2026-10-18_10-00-00.png")
        );
        assert_eq!(
            select_latest(&names, &pattern(), Some("mathmandala_2026-10-18_09-30-00.png")),
            Some("mathmandala_2026-10-18_10-00-00.png")
        );
    }

    #[test]
    fn test_select_latest_never_falls_back_below_rejected() {
        let names: Vec<String> = [
            "mathmandala_2026-10-17_old.png",
            "mathmandala_2026-10-18_new.png",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(
            select_latest(&names, &pattern(), Some("mathmandala_2026-10-18_new.png")),
            None
        );
    }

    #[tokio::test]
    async fn test_finds_image_after_a_few_empty_polls() {
        let source = FakeSource::new(
            vec![vec![], vec!["other.png"], vec!["mathmandala_1.png", "mathmandala_2.png"]],
            vec![("mathmandala_2.png", tiny_png())],
        );

        let image = poller().await_latest(&source, &pattern()).await.unwrap();
        assert_eq!(image.name, "mathmandala_2.png");
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_with_none() {
        let source = FakeSource::new(vec![vec![]], vec![]);
        let poller = ImagePoller::new(Duration::from_millis(50), Duration::from_millis(10));
        assert!(poller.await_latest(&source, &pattern()).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_latest_does_not_return_older_capture() {
        let source = FakeSource::new(
            vec![vec!["mathmandala_2026-10-17_old.png", "mathmandala_2026-10-18_new.png"]],
            vec![
                ("mathmandala_2026-10-17_old.png", tiny_png()),
                ("mathmandala_2026-10-18_new.png", b"half an image".to_vec()),
            ],
        );
        let poller = ImagePoller::new(Duration::from_millis(60), Duration::from_millis(10));

        assert!(poller.await_latest(&source, &pattern()).await.is_none());

        let fetched = source.fetched.lock().unwrap().clone();
        assert_eq!(fetched, vec!["mathmandala_2026-10-18_new.png"]);
    }

    #[tokio::test]
    async fn test_newer_upload_after_corrupt_one_is_accepted() {
        let source = FakeSource::new(
            vec![
                vec!["mathmandala_1.png", "mathmandala_2.png"],
                vec!["mathmandala_1.png", "mathmandala_2.png", "mathmandala_3.png"],
            ],
            vec![
                ("mathmandala_1.png", tiny_png()),
                ("mathmandala_2.png", b"half an image".to_vec()),
                ("mathmandala_3.png", tiny_png()),
            ],
        );

        let image = poller().await_latest(&source, &pattern()).await.unwrap();
        assert_eq!(image.name, "mathmandala_3.png");

        let fetched = source.fetched.lock().unwrap().clone();
        assert_eq!(fetched, vec!["mathmandala_2.png", "mathmandala_3.png"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_polling() {
        let source = FakeSource::new(vec![vec!["mathmandala_9.png"]], vec![]);
        let poller = ImagePoller::new(Duration::from_millis(50), Duration::from_millis(10));

        assert!(poller.await_latest(&source, &pattern()).await.is_none());
        assert!(source.fetched.lock().unwrap().len() > 1);
    }

    #[tokio::test]
    async fn test_listing_failure_keeps_polling() {
        let source = FakeSource::new(
            vec![vec!["mathmandala_1.png"]],
            vec![("mathmandala_1.png", tiny_png())],
        )
        .failing_first(2);

        let image = poller().await_latest(&source, &pattern()).await.unwrap();
        assert_eq!(image.name, "mathmandala_1.png");
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_slow_source_cannot_overrun_deadline() {
        let source = FakeSource::new(
            vec![vec!["mathmandala_1.png"]],
            vec![("mathmandala_1.png", tiny_png())],
        )
        .slow(Duration::from_secs(5));
        let poller = ImagePoller::new(Duration::from_millis(100), Duration::from_millis(10));

        let started = Instant::now();
        assert!(poller.await_latest(&source, &pattern()).await.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
