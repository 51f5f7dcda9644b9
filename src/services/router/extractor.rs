use std::time::Duration;

use serde::Deserialize;

use super::error::RouterError;

// 查询串中与阻塞查询相关的原始参数
#[derive(Debug, Default, Deserialize)]
pub struct BlockingParams {
    pub index: Option<String>,
    pub wait: Option<String>,
}

impl BlockingParams {
    /// 客户端上次看到的 index；缺省或空串视为 `None`
    pub fn index(&self) -> Result<Option<u64>, RouterError> {
        match self.index.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .map_err(|_| RouterError::InvalidIndex(raw.to_string())),
        }
    }

    pub fn wait(&self) -> Result<Option<Duration>, RouterError> {
        match self.wait.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_wait(raw).map(Some),
        }
    }
}

/// 解析 Consul 风格的等待时长
///
/// 支持 `ms` `s` `m` `h` 单位及其组合（如 `1m30s`），不带单位的纯数字按秒处理。
pub fn parse_wait(raw: &str) -> Result<Duration, RouterError> {
    let invalid = || RouterError::InvalidWait(raw.to_string());

    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = raw;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            _ => return Err(invalid()),
        };
        total = total.saturating_add(unit);
        rest = &rest[unit_len..];
    }

    Ok(total)
}
