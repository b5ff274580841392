// src/ingest/providers/mod.rs
pub mod google_trends;
pub mod quora;
pub mod reddit;
pub mod twitter;
pub mod wikipedia;
pub mod youtube;

use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;

use crate::error::SourceError;

pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Per-adapter HTTP client. The aggregator enforces the overall deadline;
/// this only bounds a single request.
pub(crate) fn http_client(user_agent: &str) -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(15))
        .build()?)
}

pub(crate) fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(SourceError::Status(status.as_u16()))
    }
}

/// GET + status check + JSON decode.
pub(crate) async fn get_json<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T, SourceError> {
    let resp = check_status(req.send().await?)?;
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(SourceError::parse)
}

pub(crate) fn date_from_unix(secs: f64) -> Option<NaiveDate> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.date_naive())
}

pub(crate) fn date_from_rfc3339(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_dates() {
        assert_eq!(
            date_from_unix(1_700_000_000.0),
            NaiveDate::from_ymd_opt(2023, 11, 14)
        );
        assert_eq!(date_from_unix(0.0), None);
        assert_eq!(date_from_unix(f64::NAN), None);
    }

    #[test]
    fn rfc3339_dates() {
        assert_eq!(
            date_from_rfc3339("2024-03-01T10:00:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(date_from_rfc3339("yesterday"), None);
    }
}
