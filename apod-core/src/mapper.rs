use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::Result,
    model::{PictureOfDay, RawRecord},
};

/// Turn a response body into entries.
///
/// `single` selects between a lone JSON object and an array of objects. A
/// `null` or unparseable body maps to an empty list, while a bad `date` in a
/// record that did parse is returned as an error.
pub fn map_response(body: &str, single: bool) -> Result<Vec<PictureOfDay>> {
    let records = if single {
        parse_lenient::<RawRecord>(body).into_iter().collect()
    } else {
        parse_lenient::<Vec<RawRecord>>(body).unwrap_or_default()
    };

    records.into_iter().map(PictureOfDay::try_from).collect()
}

fn parse_lenient<T: DeserializeOwned>(body: &str) -> Option<T> {
    match serde_json::from_str::<Option<T>>(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(error = %err, "discarding unparseable APOD response body");
            None
        }
    }
}
