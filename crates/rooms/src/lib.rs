mod auth;
mod connection;
mod error;
mod manager;
mod room;
mod schedule;
mod transcript;
mod votes;

pub use auth::{AuthEntry, AuthError, AuthStore, LoginResult, Power};
pub use connection::{ConnectionManager, Frame, HostSessionEnd, WsEvent};
pub use error::RoomsError;
pub use manager::{RoomListResponse, RoomManager, RoomSummary};
pub use room::{Room, RoomIdentity};
pub use schedule::{Conference, Event, ScheduleError, ScheduleProvider, Track};
pub use transcript::{SnapshotWriter, TranscriptError, TranscriptStore};
pub use votes::{VoteError, VoteTally};
