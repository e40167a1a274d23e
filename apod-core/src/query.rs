use chrono::NaiveDate;

use crate::model::DATE_FORMAT;

/// Route of the APOD resource, relative to the API root.
pub const ROUTE: &str = "planetary/apod";

/// Logical APOD query. No local validation happens here; combinations such
/// as `date` together with a range are left for the remote API to reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApodQuery {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub count: u32,
    pub thumb: bool,
}

impl Default for ApodQuery {
    fn default() -> Self {
        Self { date: None, start_date: None, end_date: None, count: 1, thumb: false }
    }
}

impl ApodQuery {
    /// Today's entry.
    pub fn today() -> Self {
        Self::default()
    }

    /// `count` randomly chosen entries.
    pub fn random(count: u32) -> Self {
        Self { count, ..Self::default() }
    }

    /// The entry for a single date.
    pub fn on(date: NaiveDate) -> Self {
        Self { date: Some(date), ..Self::default() }
    }

    /// Every entry between `start` and `end`, inclusive.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start_date: Some(start), end_date: Some(end), ..Self::default() }
    }

    /// Ask for thumbnail URLs of video entries as well.
    pub fn with_thumb(mut self) -> Self {
        self.thumb = true;
        self
    }

    /// Whether the API answers with a single object rather than an array.
    pub fn expects_single(&self) -> bool {
        self.count == 1 && self.start_date.is_none() && self.end_date.is_none()
    }

    /// Query string for this request. The token is appended verbatim, last.
    pub fn to_query_string(&self, token: &str) -> String {
        let mut query = String::new();

        if let Some(date) = self.date {
            query.push_str(&format!("date={}&", date.format(DATE_FORMAT)));
        }
        if let Some(start) = self.start_date {
            query.push_str(&format!("start_date={}&", start.format(DATE_FORMAT)));
        }
        if let Some(end) = self.end_date {
            query.push_str(&format!("end_date={}&", end.format(DATE_FORMAT)));
        }
        if self.count != 1 {
            query.push_str(&format!("count={}&", self.count));
        }
        if self.thumb {
            query.push_str("thumb=true&");
        }
        query.push_str("api_key=");
        query.push_str(token);

        query
    }

    /// Route plus query string, relative to the API root.
    pub fn request_uri(&self, token: &str) -> String {
        format!("{ROUTE}?{}", self.to_query_string(token))
    }
}
