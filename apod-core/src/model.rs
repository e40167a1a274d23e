use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApodError;

/// Date format used both on the wire and in query strings.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One Astronomy Picture of the Day entry.
///
/// Built once and never mutated; `is_public_domain` always mirrors whether a
/// copyright holder is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PictureOfDay {
    copyright: Option<String>,
    date: NaiveDate,
    explanation: Option<String>,
    hd_url: Option<String>,
    url: Option<String>,
    title: Option<String>,
    is_public_domain: bool,
}

impl PictureOfDay {
    pub fn new(
        copyright: Option<String>,
        date: NaiveDate,
        explanation: Option<String>,
        hd_url: Option<String>,
        url: Option<String>,
        title: Option<String>,
    ) -> Self {
        let copyright = copyright.filter(|c| !c.is_empty());
        let is_public_domain = copyright.is_none();

        Self { copyright, date, explanation, hd_url, url, title, is_public_domain }
    }

    /// Copyright holder, absent for public domain images.
    pub fn copyright(&self) -> Option<&str> {
        self.copyright.as_deref()
    }

    /// Date on which this entry was the picture of the day.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Link to the high definition image.
    pub fn hd_url(&self) -> Option<&str> {
        self.hd_url.as_deref()
    }

    /// Link to the standard definition image (or video).
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn is_public_domain(&self) -> bool {
        self.is_public_domain
    }
}

/// Record exactly as the remote API sends it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    pub copyright: Option<String>,
    pub date: Option<String>,
    pub explanation: Option<String>,
    pub hdurl: Option<String>,
    pub media_type: Option<String>,
    pub service_version: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
}

impl TryFrom<RawRecord> for PictureOfDay {
    type Error = ApodError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let value = raw.date.ok_or(ApodError::MissingDate)?;
        let date = NaiveDate::parse_from_str(&value, DATE_FORMAT)
            .map_err(|source| ApodError::InvalidDate { value, source })?;

        Ok(PictureOfDay::new(raw.copyright, date, raw.explanation, raw.hdurl, raw.url, raw.title))
    }
}
