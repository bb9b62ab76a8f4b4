pub mod execution;
pub mod ids;
pub mod instrument;
pub mod market_data;
pub mod order;
pub mod position;
pub mod update;

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
