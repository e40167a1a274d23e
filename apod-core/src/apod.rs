use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    error::{ApodError, Result},
    mapper::map_response,
    model::PictureOfDay,
    query::ApodQuery,
    rate_limit::{RateLimitOptions, SlidingWindowLimiter},
    transport::Transport,
};

/// The `planetary/apod` resource.
///
/// Every call spends one permit from this instance's own limiter before any
/// network I/O; a denied permit fails with [`ApodError::RateLimitExceeded`].
#[derive(Debug)]
pub struct Apod {
    transport: Arc<dyn Transport>,
    token: String,
    limiter: SlidingWindowLimiter,
}

impl Apod {
    pub fn new(transport: Arc<dyn Transport>, token: impl Into<String>) -> Self {
        Self::with_limiter(transport, token, SlidingWindowLimiter::new(RateLimitOptions::default()))
    }

    pub fn with_limiter(
        transport: Arc<dyn Transport>,
        token: impl Into<String>,
        limiter: SlidingWindowLimiter,
    ) -> Self {
        Self { transport, token: token.into(), limiter }
    }

    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Today's picture.
    pub async fn get_today(&self) -> Result<PictureOfDay> {
        first(self.fetch(&ApodQuery::today()).await?)
    }

    /// `count` random pictures.
    ///
    /// A single random picture is requested as two and trimmed to the first,
    /// since the API does not treat `count=1` as a random pick.
    pub async fn get_random(&self, count: u32) -> Result<Vec<PictureOfDay>> {
        if count == 1 {
            let pic = first(self.fetch(&ApodQuery::random(2)).await?)?;
            return Ok(vec![pic]);
        }

        self.fetch(&ApodQuery::random(count)).await
    }

    /// The picture published on `date`.
    pub async fn get_by_date(&self, date: NaiveDate) -> Result<PictureOfDay> {
        first(self.fetch(&ApodQuery::on(date)).await?)
    }

    /// Every picture from `start` to `end`, inclusive.
    pub async fn get_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PictureOfDay>> {
        self.fetch(&ApodQuery::between(start, end)).await
    }

    /// Run an arbitrary query through the limiter, transport and mapper.
    pub async fn fetch(&self, query: &ApodQuery) -> Result<Vec<PictureOfDay>> {
        if !self.limiter.try_acquire() {
            return Err(ApodError::RateLimitExceeded);
        }

        let body = self.transport.get_text(&query.request_uri(&self.token)).await?;
        let pics = map_response(&body, query.expects_single())?;

        debug!(count = pics.len(), "mapped APOD response");
        Ok(pics)
    }
}

fn first(pics: Vec<PictureOfDay>) -> Result<PictureOfDay> {
    pics.into_iter().next().ok_or(ApodError::EmptyResult)
}
