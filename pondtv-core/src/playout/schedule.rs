//! Time-to-media-position mapping.
//!
//! Everything here is a pure function of (channel, playlist items,
//! wall-clock time): the scheduler holds no state, so the same inputs
//! always yield the same airing position regardless of which viewer or
//! background task asks.

use chrono::{DateTime, Duration, Utc};

use crate::library::{Channel, PlaylistItem};

/// Safety valve for the guide walk: near-zero-duration items could
/// otherwise produce unbounded slot counts inside the horizon.
const MAX_SLOT_ITERATIONS: usize = 1000;

/// What a channel should be playing at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayoutPosition {
    pub file_path: String,
    /// Offset into the file, in seconds. Always within
    /// `0 <= seek < duration` except for the frozen end-state of a
    /// non-looping channel, where `seek == duration` of the last item.
    pub seek: f64,
    pub title: String,
}

/// One projected on-air interval for the program guide.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSlot {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub title: String,
    pub description: String,
}

pub fn total_duration(items: &[PlaylistItem]) -> i64 {
    items.iter().map(|item| item.duration).sum()
}

fn anchor_instant(channel: &Channel) -> DateTime<Utc> {
    channel.start_time.unwrap_or(DateTime::UNIX_EPOCH)
}

fn seconds_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// Computes which file should be airing at `now` and at what offset.
///
/// Returns `None` only when the playlist is empty or its total
/// duration is zero; every other case names a definite item.
pub fn current_position(
    channel: &Channel,
    items: &[PlaylistItem],
    now: DateTime<Utc>,
) -> Option<PlayoutPosition> {
    if items.is_empty() {
        return None;
    }

    let mut elapsed = seconds_between(now, anchor_instant(channel));

    // Anchor in the future: hold on the first item until it starts.
    if elapsed < 0.0 {
        let first = &items[0];
        return Some(PlayoutPosition {
            file_path: first.file_path.clone(),
            seek: 0.0,
            title: first.title.clone(),
        });
    }

    let total = total_duration(items);
    if total <= 0 {
        return None;
    }

    if channel.loop_playlist {
        elapsed = elapsed.rem_euclid(total as f64);
    } else if elapsed >= total as f64 {
        // Playlist has ended: freeze on the final frame of the last
        // item rather than going dark.
        if let Some(last) = items.last() {
            return Some(PlayoutPosition {
                file_path: last.file_path.clone(),
                seek: last.duration as f64,
                title: last.title.clone(),
            });
        }
    }

    let mut accumulated = 0i64;
    for item in items {
        // Strict comparison: an exact boundary belongs to the next item.
        if (accumulated + item.duration) as f64 > elapsed {
            return Some(PlayoutPosition {
                file_path: item.file_path.clone(),
                seek: elapsed - accumulated as f64,
                title: item.title.clone(),
            });
        }
        accumulated += item.duration;
    }

    // Unreachable for consistent inputs; fall back to the top.
    let first = &items[0];
    Some(PlayoutPosition {
        file_path: first.file_path.clone(),
        seek: 0.0,
        title: first.title.clone(),
    })
}

/// Projects the forward schedule from `now` out to `now + horizon`.
///
/// The first slot starts when the airing item actually began, not at
/// the query instant, so slot boundaries line up with what viewers
/// see. Non-looping channels are projected through the playlist once;
/// looping channels wrap until the horizon (or the iteration ceiling)
/// is reached. The output is contiguous by construction.
pub fn upcoming_slots(
    channel: &Channel,
    items: &[PlaylistItem],
    now: DateTime<Utc>,
    horizon: Duration,
) -> Vec<ProgramSlot> {
    if items.is_empty() {
        return Vec::new();
    }
    let total = total_duration(items);
    if total <= 0 {
        return Vec::new();
    }

    let anchor = anchor_instant(channel);
    let mut elapsed = seconds_between(now, anchor);
    if channel.loop_playlist && elapsed >= 0.0 {
        elapsed = elapsed.rem_euclid(total as f64);
    }

    // Locate the airing item and the instant it began.
    let (mut index, mut slot_start) = if elapsed < 0.0 {
        (0, anchor)
    } else {
        let mut accumulated = 0i64;
        let mut located = (0usize, now);
        for (i, item) in items.iter().enumerate() {
            if (accumulated + item.duration) as f64 > elapsed {
                let into_item = elapsed - accumulated as f64;
                located = (i, now - Duration::milliseconds((into_item * 1000.0) as i64));
                break;
            }
            accumulated += item.duration;
        }
        located
    };

    let horizon_end = now + horizon;
    let mut slots = Vec::new();
    let mut iterations = 0;
    while slot_start < horizon_end && iterations < MAX_SLOT_ITERATIONS {
        iterations += 1;
        let item = &items[index];
        let stop = slot_start + Duration::seconds(item.duration);
        slots.push(ProgramSlot {
            start: slot_start,
            stop,
            title: item.title.clone(),
            description: item.description.clone(),
        });
        slot_start = stop;
        index = (index + 1) % items.len();
        if !channel.loop_playlist && index == 0 {
            break;
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::StreamSettings;
    use chrono::TimeZone;

    fn item(path: &str, duration: i64, title: &str) -> PlaylistItem {
        PlaylistItem {
            file_path: path.to_string(),
            duration,
            title: title.to_string(),
            description: String::new(),
        }
    }

    fn channel(loop_playlist: bool, start_time: Option<DateTime<Utc>>) -> Channel {
        Channel {
            id: "ch1".to_string(),
            name: "Channel One".to_string(),
            number: 1,
            category: "General".to_string(),
            logo_url: None,
            playlist_id: Some("pl1".to_string()),
            loop_playlist,
            start_time,
            stream_settings: StreamSettings::default(),
            enabled: true,
        }
    }

    fn sample_items() -> Vec<PlaylistItem> {
        vec![item("a.mp4", 600, "A"), item("b.mp4", 300, "B")]
    }

    #[test]
    fn position_inside_second_item() {
        let ch = channel(true, None);
        let now = Utc.timestamp_opt(650, 0).unwrap();
        let pos = current_position(&ch, &sample_items(), now).unwrap();
        assert_eq!(pos.file_path, "b.mp4");
        assert!((pos.seek - 50.0).abs() < 1e-6);
    }

    #[test]
    fn loop_boundary_belongs_to_next_item() {
        let ch = channel(true, None);
        // 900s is exactly one full cycle: back to the first item at 0.
        let now = Utc.timestamp_opt(900, 0).unwrap();
        let pos = current_position(&ch, &sample_items(), now).unwrap();
        assert_eq!(pos.file_path, "a.mp4");
        assert!(pos.seek.abs() < 1e-6);
        // Interior boundary at 600s belongs to the second item.
        let now = Utc.timestamp_opt(600, 0).unwrap();
        let pos = current_position(&ch, &sample_items(), now).unwrap();
        assert_eq!(pos.file_path, "b.mp4");
        assert!(pos.seek.abs() < 1e-6);
    }

    #[test]
    fn loop_is_periodic() {
        let ch = channel(true, None);
        let items = sample_items();
        for offset in [3, 333, 899] {
            let now = Utc.timestamp_opt(offset, 0).unwrap();
            let later = Utc.timestamp_opt(offset + 900, 0).unwrap();
            assert_eq!(
                current_position(&ch, &items, now),
                current_position(&ch, &items, later)
            );
        }
    }

    #[test]
    fn future_anchor_holds_first_item() {
        let start = Utc.timestamp_opt(10_000, 0).unwrap();
        let ch = channel(false, Some(start));
        let now = Utc.timestamp_opt(5_000, 0).unwrap();
        let pos = current_position(&ch, &sample_items(), now).unwrap();
        assert_eq!(pos.file_path, "a.mp4");
        assert_eq!(pos.seek, 0.0);
    }

    #[test]
    fn non_looping_freezes_at_end() {
        let start = Utc.timestamp_opt(0, 0).unwrap();
        let ch = channel(false, Some(start));
        let now = Utc.timestamp_opt(5_000, 0).unwrap();
        let pos = current_position(&ch, &sample_items(), now).unwrap();
        assert_eq!(pos.file_path, "b.mp4");
        assert_eq!(pos.seek, 300.0);
    }

    #[test]
    fn seek_stays_within_item_bounds() {
        let ch = channel(true, None);
        let items = sample_items();
        for offset in 0..900 {
            let now = Utc.timestamp_opt(offset, 0).unwrap();
            let pos = current_position(&ch, &items, now).unwrap();
            let duration = items
                .iter()
                .find(|item| item.file_path == pos.file_path)
                .unwrap()
                .duration as f64;
            assert!(pos.seek >= 0.0 && pos.seek < duration, "offset {offset}");
        }
    }

    #[test]
    fn empty_or_zero_duration_is_unschedulable() {
        let ch = channel(true, None);
        let now = Utc.timestamp_opt(100, 0).unwrap();
        assert!(current_position(&ch, &[], now).is_none());
        let zeros = vec![item("a.mp4", 0, "A")];
        assert!(current_position(&ch, &zeros, now).is_none());
        assert!(upcoming_slots(&ch, &zeros, now, Duration::hours(1)).is_empty());
    }

    #[test]
    fn slots_are_contiguous_and_start_at_item_start() {
        let ch = channel(true, None);
        let now = Utc.timestamp_opt(650, 0).unwrap();
        let slots = upcoming_slots(&ch, &sample_items(), now, Duration::hours(1));
        assert!(!slots.is_empty());
        // Airing item (b.mp4) began at 600s, not at the query instant.
        assert_eq!(slots[0].start, Utc.timestamp_opt(600, 0).unwrap());
        assert_eq!(slots[0].title, "B");
        for pair in slots.windows(2) {
            assert_eq!(pair[0].stop, pair[1].start);
        }
        // Last slot begins before the horizon ends.
        let horizon_end = now + Duration::hours(1);
        assert!(slots.last().unwrap().start < horizon_end);
    }

    #[test]
    fn non_looping_channel_is_projected_once() {
        let start = Utc.timestamp_opt(1_000, 0).unwrap();
        let ch = channel(false, Some(start));
        let now = Utc.timestamp_opt(1_050, 0).unwrap();
        let slots = upcoming_slots(&ch, &sample_items(), now, Duration::hours(24));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].title, "A");
        assert_eq!(slots[1].title, "B");
        assert_eq!(slots[1].stop, Utc.timestamp_opt(1_900, 0).unwrap());
    }

    #[test]
    fn iteration_ceiling_truncates_pathological_playlists() {
        let ch = channel(true, None);
        let items = vec![item("tick.mp4", 1, "Tick")];
        let now = Utc.timestamp_opt(0, 0).unwrap();
        let slots = upcoming_slots(&ch, &items, now, Duration::hours(6));
        // 6h of one-second items would be 21600 slots without the cap.
        assert_eq!(slots.len(), MAX_SLOT_ITERATIONS);
    }
}
