use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use transcast_reconciler::Line;

use crate::schedule::{Event, ScheduleProvider};

/// On-disk shape of one session's snapshot file: the room's source
/// language at the time of the session alongside the Line sequence,
/// so a later transcript compilation knows which language is "the
/// source" without needing a live Room.
#[derive(Debug, Serialize, Deserialize)]
struct TranscriptSnapshot {
    source_lang: String,
    lines: Vec<Line>,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("access denied for room {0}")]
    AccessDenied(String),
    #[error("no transcript sessions found for room {0}")]
    NoSessions(String),
    #[error("transcript I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transcript snapshot is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Snapshot files and the opt-in access restriction for one room's
/// transcript history. A room directory without an `access.conf` is
/// public; one containing it restricts reads to the exact key inside.
pub struct TranscriptStore {
    root: PathBuf,
    access_conf_name: String,
}

impl TranscriptStore {
    pub fn new(root: impl Into<PathBuf>, access_conf_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            access_conf_name: access_conf_name.into(),
        }
    }

    fn room_dir(&self, room_id: &str) -> PathBuf {
        self.root.join(room_id)
    }

    /// Writes `access.conf` containing `host_key`, restricting this
    /// room's transcripts to that key for the life of the directory.
    pub fn restrict_access(&self, room_id: &str, host_key: &str) -> Result<(), TranscriptError> {
        let dir = self.room_dir(room_id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(&self.access_conf_name), host_key)?;
        Ok(())
    }

    fn has_access(&self, room_id: &str, caller_key: Option<&str>) -> bool {
        let conf = self.room_dir(room_id).join(&self.access_conf_name);
        match fs::read_to_string(&conf) {
            Ok(contents) => Some(contents.trim()) == caller_key,
            Err(_) => true,
        }
    }

    /// Lists the event metadata for every room directory `caller_key` may
    /// read, joined against the schedule the way
    /// `examples/original_source/src/transcription_system/transcript_formatter.py`'s
    /// `get_available_transcript_directories` does. A directory whose
    /// room id no longer resolves to a schedule event is logged and
    /// skipped rather than failing the whole listing.
    pub fn accessible_room_ids(
        &self,
        caller_key: Option<&str>,
        schedule: &ScheduleProvider,
    ) -> Vec<Event> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|room_id| self.has_access(room_id, caller_key))
            .filter_map(|room_id| match schedule.get_event_by_id(&room_id) {
                Ok(event) => Some(event),
                Err(_) => {
                    warn!(room_id, "no event metadata for transcript directory");
                    None
                }
            })
            .collect()
    }

    /// Opens a writer for a new session starting at `started_at`, named
    /// `<YYYY-MM-DD_HH-MM>.snap` within the room's directory.
    pub fn session_writer(&self, room_id: &str, started_at: DateTime<Utc>) -> SnapshotWriter {
        let filename = format!("{}.snap", started_at.format("%Y-%m-%d_%H-%M"));
        SnapshotWriter {
            path: self.room_dir(room_id).join(filename),
        }
    }

    pub fn compile_transcript(
        &self,
        caller_key: Option<&str>,
        room_id: &str,
        lang: &str,
    ) -> Result<String, TranscriptError> {
        if !self.has_access(room_id, caller_key) {
            return Err(TranscriptError::AccessDenied(room_id.to_string()));
        }

        let dir = self.room_dir(room_id);
        let mut sessions: Vec<(NaiveDateTime, PathBuf)> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let stem = path.file_stem()?.to_str()?.to_string();
                let ts = NaiveDateTime::parse_from_str(&stem, "%Y-%m-%d_%H-%M").ok()?;
                Some((ts, path))
            })
            .collect();
        if sessions.is_empty() {
            return Err(TranscriptError::NoSessions(room_id.to_string()));
        }
        sessions.sort_by_key(|(ts, _)| *ts);

        let mut out = String::new();
        for (ts, path) in sessions {
            let raw = fs::read_to_string(&path)?;
            let snapshot: TranscriptSnapshot = serde_json::from_str(&raw)?;
            out.push_str(&format!(
                "[Transcription started on {}]\n",
                ts.format("%Y-%m-%d %H:%M")
            ));
            for line in &snapshot.lines {
                out.push_str(&format_line(line, lang, &snapshot.source_lang));
            }
        }
        Ok(out)
    }
}

/// Joins only sentences with content in `lang`, matching
/// `examples/original_source/src/transcription_system/transcript_formatter.py`'s
/// `get_transcript_from_lines`: a sentence missing a translation for
/// `lang` is excluded, never backfilled with the source text. The
/// source language itself is the one exception, since `Sentence`
/// stores it in a distinguished field rather than as a `translations`
/// entry.
fn format_line(line: &Line, lang: &str, source_lang: &str) -> String {
    let text: String = line
        .sentences
        .iter()
        .filter_map(|s| {
            if lang == source_lang {
                Some(s.source_text.clone())
            } else {
                s.translations.get(lang).cloned()
            }
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return String::new();
    }
    let speaker_label = if line.speaker >= 0 {
        format!("Speaker {}: ", line.speaker)
    } else {
        String::new()
    };
    format!(
        "[{}{} - {}]\n{}\n",
        speaker_label,
        fmt_hms(line.beg),
        fmt_hms(line.end),
        text
    )
}

fn fmt_hms(total_secs: i64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// Overwrites one session's snapshot file atomically (write-to-temp then
/// rename) so a reader never observes a half-written file.
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn overwrite(&self, source_lang: &str, lines: &[Line]) -> Result<(), TranscriptError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let snapshot = TranscriptSnapshot {
            source_lang: source_lang.to_string(),
            lines: lines.to_vec(),
        };
        let tmp = self.path.with_extension("snap.tmp");
        fs::write(&tmp, serde_json::to_vec(&snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
