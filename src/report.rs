//! Persisted probe output.
//!
//! 探测结果的持久化输出。

use crate::{core::stats::RttSample, error::Result};
use std::{fmt::Write as _, path::Path};

/// Formats RTT samples as `"<index> <milliseconds>"` lines, index from 1.
pub fn format_rtt_samples(samples: &[RttSample]) -> String {
    let mut out = String::with_capacity(samples.len() * 16);
    for (i, sample) in samples.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{} {:.6}", i + 1, sample.as_millis_f64());
    }
    out
}

/// Writes the samples to `path` for offline plotting, replacing any previous
/// content.
///
/// 将样本写入 `path` 以供离线绘图，覆盖之前的内容。
pub async fn write_rtt_samples(path: impl AsRef<Path>, samples: &[RttSample]) -> Result<()> {
    tokio::fs::write(path, format_rtt_samples(samples)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_lines_are_indexed_from_one() {
        let samples = [
            RttSample::new(Duration::from_micros(1_500)),
            RttSample::new(Duration::from_millis(20)),
        ];
        assert_eq!(format_rtt_samples(&samples), "1 1.500000\n2 20.000000\n");
        assert_eq!(format_rtt_samples(&[]), "");
    }

    #[tokio::test]
    async fn test_write_replaces_file() {
        let path =
            std::env::temp_dir().join(format!("window-probe-rtt-{}.txt", std::process::id()));
        write_rtt_samples(&path, &[RttSample::new(Duration::from_millis(1))])
            .await
            .unwrap();
        write_rtt_samples(&path, &[RttSample::new(Duration::from_millis(2))])
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "1 2.000000\n");
        let _ = tokio::fs::remove_file(&path).await;
    }
}
