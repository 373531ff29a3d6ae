use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleProvider;

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("unknown event code: {0}")]
    UnknownEvent(String),
    #[error("vote count is already zero")]
    AlreadyZero,
    #[error("vote file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("vote file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VoteFile {
    tallies: HashMap<String, u64>,
}

struct Loaded {
    date: NaiveDate,
    file: VoteFile,
}

/// Per-day `event_code -> count` tally, persisted to one JSON file per
/// day. On load or date rollover, the day's tallies are seeded at zero
/// from the schedule's ongoing events -- a code outside that set is
/// unknown and `add_vote`/`remove_vote` reject it, mirroring
/// `examples/original_source/src/vote_manager.py`'s `KeyError` on a
/// code that was never seeded. Yesterday's counts are never carried
/// forward.
pub struct VoteTally {
    dir: PathBuf,
    schedule: Arc<ScheduleProvider>,
    loaded: Mutex<Option<Loaded>>,
}

impl VoteTally {
    pub fn new(dir: impl Into<PathBuf>, schedule: Arc<ScheduleProvider>) -> Self {
        Self {
            dir: dir.into(),
            schedule,
            loaded: Mutex::new(None),
        }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.votes", date.format("%Y-%m-%d")))
    }

    fn with_today<R>(&self, f: impl FnOnce(&mut HashMap<String, u64>) -> R) -> Result<R, VoteError> {
        let today = Utc::now().date_naive();
        let mut guard = self.loaded.lock().unwrap();

        let needs_reload = match guard.as_ref() {
            Some(loaded) => loaded.date != today,
            None => true,
        };

        if needs_reload {
            let path = self.path_for(today);
            let mut file: VoteFile = if path.exists() {
                let raw = std::fs::read_to_string(&path)?;
                serde_json::from_str(&raw)?
            } else {
                VoteFile::default()
            };
            for event in self.schedule.get_ongoing_events() {
                file.tallies.entry(event.code).or_insert(0);
            }
            *guard = Some(Loaded { date: today, file });
        }

        let loaded = guard.as_mut().unwrap();
        let result = f(&mut loaded.file.tallies);
        persist(&self.dir, self.path_for(today), &loaded.file)?;
        Ok(result)
    }

    pub fn add_vote(&self, event_code: &str) -> Result<u64, VoteError> {
        self.with_today(|tallies| -> Result<u64, VoteError> {
            match tallies.get_mut(event_code) {
                Some(count) => {
                    *count += 1;
                    Ok(*count)
                }
                None => Err(VoteError::UnknownEvent(event_code.to_string())),
            }
        })?
    }

    pub fn remove_vote(&self, event_code: &str) -> Result<u64, VoteError> {
        self.with_today(|tallies| -> Result<u64, VoteError> {
            match tallies.get_mut(event_code) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    Ok(*count)
                }
                Some(_) => Err(VoteError::AlreadyZero),
                None => Err(VoteError::UnknownEvent(event_code.to_string())),
            }
        })?
    }

    pub fn list(&self) -> Result<HashMap<String, u64>, VoteError> {
        self.with_today(|tallies| tallies.clone())
    }
}

fn persist(dir: &Path, path: PathBuf, file: &VoteFile) -> Result<(), VoteError> {
    std::fs::create_dir_all(dir)?;
    let tmp = path.with_extension("votes.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(file)?)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Event;

    fn schedule_seeded_with(codes: &[&str]) -> Arc<ScheduleProvider> {
        let now = Utc::now();
        let provider = ScheduleProvider::new("http://unused.invalid".into(), 5, Some(now));
        let events = codes
            .iter()
            .map(|code| Event {
                code: (*code).into(),
                title: (*code).into(),
                track: "main".into(),
                location: "hall".into(),
                start: now,
                duration_minutes: 60,
                presenter: "someone".into(),
                description: String::new(),
                do_not_record: false,
            })
            .collect();
        provider.seed_events(events, now);
        Arc::new(provider)
    }

    #[test]
    fn add_and_remove_vote_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let tally = VoteTally::new(dir.path(), schedule_seeded_with(&["talk-1"]));
        assert_eq!(tally.add_vote("talk-1").unwrap(), 1);
        assert_eq!(tally.add_vote("talk-1").unwrap(), 2);
        assert_eq!(tally.remove_vote("talk-1").unwrap(), 1);
    }

    #[test]
    fn removing_at_zero_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tally = VoteTally::new(dir.path(), schedule_seeded_with(&["talk-1"]));
        tally.add_vote("talk-1").unwrap();
        tally.remove_vote("talk-1").unwrap();
        assert!(matches!(
            tally.remove_vote("talk-1"),
            Err(VoteError::AlreadyZero)
        ));
    }

    #[test]
    fn adding_unknown_event_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tally = VoteTally::new(dir.path(), schedule_seeded_with(&["talk-1"]));
        assert!(matches!(
            tally.add_vote("never-seen"),
            Err(VoteError::UnknownEvent(_))
        ));
    }

    #[test]
    fn removing_unknown_event_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tally = VoteTally::new(dir.path(), schedule_seeded_with(&["talk-1"]));
        assert!(matches!(
            tally.remove_vote("never-seen"),
            Err(VoteError::UnknownEvent(_))
        ));
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let schedule = schedule_seeded_with(&["talk-1"]);
        {
            let tally = VoteTally::new(dir.path(), Arc::clone(&schedule));
            tally.add_vote("talk-1").unwrap();
        }
        let tally = VoteTally::new(dir.path(), schedule);
        assert_eq!(tally.list().unwrap().get("talk-1"), Some(&1));
    }
}
