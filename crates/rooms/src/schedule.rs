use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule fetch failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unknown event code: {0}")]
    EventNotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conference {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub day_count: u32,
    pub url: String,
    pub timezone: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub code: String,
    pub title: String,
    pub track: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    pub presenter: String,
    pub description: String,
    pub do_not_record: bool,
}

impl Event {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + ChronoDuration::minutes(self.duration_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ScheduleDocument {
    conference: Conference,
    events: Vec<Event>,
}

struct Cache {
    fetched_at: DateTime<Utc>,
    document: ScheduleDocument,
}

/// Stateless cache of a JSON schedule document fetched from a configured
/// URL, refetched only once the cache has expired.
pub struct ScheduleProvider {
    http: reqwest::Client,
    url: String,
    cache_minutes: i64,
    fake_now: Option<DateTime<Utc>>,
    cache: Mutex<Option<Cache>>,
}

impl ScheduleProvider {
    pub fn new(url: String, cache_minutes: i64, fake_now: Option<DateTime<Utc>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            cache_minutes,
            fake_now,
            cache: Mutex::new(None),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.fake_now.unwrap_or_else(Utc::now)
    }

    /// Refetches only if the cache is absent or older than `cache_minutes`.
    /// Returns whether a refetch actually happened, so callers can skip
    /// redoing work that only needs to run on a real cache miss.
    pub async fn update_data(&self) -> Result<bool, ScheduleError> {
        let expired = {
            let cache = self.cache.lock().unwrap();
            match cache.as_ref() {
                None => true,
                Some(c) => self.now() - c.fetched_at > ChronoDuration::minutes(self.cache_minutes),
            }
        };
        if !expired {
            return Ok(false);
        }

        let document = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<ScheduleDocument>()
            .await?;

        let mut cache = self.cache.lock().unwrap();
        *cache = Some(Cache {
            fetched_at: self.now(),
            document,
        });
        Ok(true)
    }

    pub fn conference(&self) -> Option<Conference> {
        self.cache.lock().unwrap().as_ref().map(|c| c.document.conference.clone())
    }

    pub fn all_events(&self) -> Vec<Event> {
        self.cache
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.document.events.clone())
            .unwrap_or_default()
    }

    /// Events today whose offset from now lies in `(-31 minutes,
    /// +duration)`, capped to starting within 12 hours, sorted by start.
    pub fn get_ongoing_events(&self) -> Vec<Event> {
        let now = self.now();
        let today = now.date_naive();
        let mut events: Vec<Event> = self
            .all_events()
            .into_iter()
            .filter(|event| event.start.date_naive() == today)
            .filter(|event| {
                let offset = now - event.start;
                offset > ChronoDuration::minutes(-31) && offset < (event.end() - event.start)
            })
            .filter(|event| event.start - now < ChronoDuration::hours(12))
            .collect();
        events.sort_by_key(|e| e.start);
        events
    }

    pub fn get_event_by_id(&self, code: &str) -> Result<Event, ScheduleError> {
        self.all_events()
            .into_iter()
            .find(|e| e.code == code)
            .ok_or_else(|| ScheduleError::EventNotFound(code.to_string()))
    }

    /// Seeds the cache directly without a network round trip. Exposed for
    /// integration tests that need known room ids without a live schedule.
    pub fn seed_events(&self, events: Vec<Event>, now: DateTime<Utc>) {
        *self.cache.lock().unwrap() = Some(Cache {
            fetched_at: now,
            document: ScheduleDocument {
                conference: Conference {
                    title: String::new(),
                    start: now,
                    end: now,
                    day_count: 1,
                    url: String::new(),
                    timezone: "UTC".into(),
                    tracks: vec![],
                },
                events,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with(events: Vec<Event>, now: DateTime<Utc>) -> ScheduleProvider {
        let provider = ScheduleProvider::new("http://unused.invalid".into(), 5, Some(now));
        *provider.cache.lock().unwrap() = Some(Cache {
            fetched_at: now,
            document: ScheduleDocument {
                conference: Conference {
                    title: "Test Conf".into(),
                    start: now,
                    end: now,
                    day_count: 1,
                    url: String::new(),
                    timezone: "UTC".into(),
                    tracks: vec![],
                },
                events,
            },
        });
        provider
    }

    fn event(code: &str, start: DateTime<Utc>, duration_minutes: i64) -> Event {
        Event {
            code: code.into(),
            title: code.into(),
            track: "main".into(),
            location: "hall".into(),
            start,
            duration_minutes,
            presenter: "someone".into(),
            description: String::new(),
            do_not_record: false,
        }
    }

    #[test]
    fn ongoing_events_excludes_events_outside_the_window() {
        let now = Utc::now();
        let ongoing = event("ongoing", now - ChronoDuration::minutes(10), 60);
        let finished = event("finished", now - ChronoDuration::hours(3), 30);
        let too_far = event("too-far", now + ChronoDuration::hours(13), 30);
        let provider = provider_with(vec![ongoing, finished, too_far], now);

        let results = provider.get_ongoing_events();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].code, "ongoing");
    }

    #[test]
    fn get_event_by_id_fails_for_unknown_code() {
        let provider = provider_with(vec![], Utc::now());
        assert!(matches!(
            provider.get_event_by_id("missing"),
            Err(ScheduleError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn cache_hit_within_window_skips_refetch() {
        let now = Utc::now();
        let provider = provider_with(vec![], now);
        // A provider with fake_now pinned and a populated cache never
        // considers itself expired within cache_minutes, so update_data
        // returns without making a request.
        let refetched = provider.update_data().await.unwrap();
        assert!(!refetched);
        assert!(provider.conference().is_some());
    }
}
