use std::sync::Arc;

use transcast_config::Settings;
use transcast_rooms::{AuthStore, RoomManager, ScheduleProvider, VoteTally};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub rooms: Arc<RoomManager>,
    pub auth: Arc<AuthStore>,
    pub schedule: Arc<ScheduleProvider>,
    pub votes: Arc<VoteTally>,
}
