mod settings;

pub use settings::{
    AppSettings, AsrSettings, AuthSettings, RoomSettings, ScheduleSettings, Settings,
    StorageSettings, TranslationSettings,
};
