//! King's Reward notifications

use std::time::{SystemTime, UNIX_EPOCH};

/// Receives the puzzle image URL when a hunter is blocked by a King's Reward
pub trait ChallengeNotifier: Send + Sync {
    fn notify_challenge(&self, image_url: &str);
}

/// Writes the puzzle URL to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ChallengeNotifier for LogNotifier {
    fn notify_challenge(&self, image_url: &str) {
        log::warn!("King's Reward pending, puzzle image: {image_url}");
    }
}

/// Puzzle image for a hunter, cache-busted with the current time
pub fn puzzle_image_url(base_url: &str, user_id: u64) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!(
        "{}/images/puzzleimage.php?t={millis}&user_id={user_id}",
        base_url.trim_end_matches('/')
    )
}
