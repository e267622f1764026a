/// Shared constants for the temporal normalizer and the aggregation run

/// Target offset every normalized instant is expressed in: UTC-8, no DST shift.
pub const TARGET_OFFSET_SECONDS: i32 = -8 * 3600;

/// Label printed next to target-offset times
pub const TARGET_LABEL: &str = "PST";

/// How far a parsed year may sit from the reference year before it is rejected
pub const DEFAULT_YEAR_WINDOW: i32 = 10;

/// Default rolling window length in days
pub const DEFAULT_DAYS_AHEAD: i64 = 14;

/// Default number of sources fetched at once
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Namespace for v5 event ids
pub const EVENT_ID_NAMESPACE: uuid::Uuid = uuid::Uuid::from_u128(0x6f1c_2a9e_4b7d_4e21_9a35_c0de_ca1e_0001);

/// Environment variable that overrides the config path
pub const CONFIG_PATH_ENV: &str = "EVENT_CALENDAR_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
