mod ma;

pub use ma::{compute_moving_averages, refresh_full, refresh_latest, MA_WINDOWS};
