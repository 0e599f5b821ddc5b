//! Ordered service endpoints with circular failover.

use std::sync::atomic::{AtomicUsize, Ordering};

use url::Url;

use crate::error::TransportError;

const SERVICE_PATH: &str = "/websvcs";

/// Appends `/websvcs` to the path of `raw` unless it already ends with it.
pub fn normalize_endpoint(raw: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(raw.trim())?;
    let path = url.path().trim_end_matches('/').to_string();
    if !path.ends_with(SERVICE_PATH) {
        url.set_path(&format!("{path}{SERVICE_PATH}"));
    } else {
        url.set_path(&path);
    }
    Ok(url)
}

/// A primary endpoint and optionally a backup, with the active index.
///
/// Rotation is a reaction to a service-unavailable condition only. With a
/// single endpoint [`EndpointRotator::next`] keeps returning it.
#[derive(Debug)]
pub struct EndpointRotator {
    endpoints: Vec<Url>,
    current: AtomicUsize,
}

impl EndpointRotator {
    pub fn new(endpoints: Vec<Url>) -> Result<Self, TransportError> {
        if endpoints.is_empty() {
            return Err(TransportError::NoEndpoint);
        }
        Ok(Self {
            endpoints,
            current: AtomicUsize::new(0),
        })
    }

    pub fn from_strs<S: AsRef<str>>(raw: &[S]) -> Result<Self, TransportError> {
        let endpoints = raw
            .iter()
            .map(|value| normalize_endpoint(value.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(endpoints)
    }

    pub fn current(&self) -> &Url {
        &self.endpoints[self.current.load(Ordering::Acquire)]
    }

    /// Advances to the next endpoint, wrapping past the last one.
    pub fn next(&self) -> &Url {
        let count = self.endpoints.len();
        if count > 1 {
            let _ = self
                .current
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |index| {
                    Some((index + 1) % count)
                });
        }
        self.current()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn has_backup(&self) -> bool {
        self.endpoints.len() > 1
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }
}
