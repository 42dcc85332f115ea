use chrono::Utc;
use tempfile::TempDir;

use pondtv_core::{
    Channel, ChannelStore, Playlist, PlaylistItem, PlaylistStore, StreamSettings,
};

fn channel(id: &str, name: &str, number: u32) -> Channel {
    Channel {
        id: id.to_string(),
        name: name.to_string(),
        number,
        category: "General".to_string(),
        logo_url: None,
        playlist_id: None,
        loop_playlist: true,
        start_time: None,
        stream_settings: StreamSettings::default(),
        enabled: true,
    }
}

fn playlist(id: &str, name: &str) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        items: vec![PlaylistItem {
            file_path: "/media/a.mp4".to_string(),
            duration: 120,
            title: "A".to_string(),
            description: String::new(),
        }],
        created_at: Utc::now(),
        updated_at: Utc::now(),
        tags: vec![],
    }
}

#[test]
fn channel_crud_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = ChannelStore::new(dir.path()).unwrap();

    let created = store.create(channel("", "News", 5)).unwrap();
    assert!(!created.id.is_empty(), "id should be generated");

    let fetched = store.get(&created.id).unwrap().unwrap();
    assert_eq!(fetched.name, "News");
    assert_eq!(fetched.number, 5);

    let mut updated = fetched.clone();
    updated.name = "World News".to_string();
    let saved = store.update(&created.id, updated).unwrap().unwrap();
    assert_eq!(saved.name, "World News");

    assert!(store.delete(&created.id).unwrap());
    assert!(!store.delete(&created.id).unwrap());
    assert!(store.get(&created.id).unwrap().is_none());
}

#[test]
fn channel_list_sorts_by_number_and_skips_garbage() {
    let dir = TempDir::new().unwrap();
    let store = ChannelStore::new(dir.path()).unwrap();
    store.create(channel("b", "Beta", 20)).unwrap();
    store.create(channel("a", "Alpha", 10)).unwrap();
    std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].number, 10);
    assert_eq!(listed[1].number, 20);
}

#[test]
fn duplicate_channel_number_is_bumped_past_the_highest() {
    let dir = TempDir::new().unwrap();
    let store = ChannelStore::new(dir.path()).unwrap();
    store.create(channel("first", "First", 3)).unwrap();
    let second = store.create(channel("second", "Second", 3)).unwrap();
    assert_eq!(second.number, 4);

    // Gaps below the highest number in use are not filled.
    store.create(channel("high", "High", 10)).unwrap();
    let third = store.create(channel("third", "Third", 3)).unwrap();
    assert_eq!(third.number, 11);
}

#[test]
fn playlist_crud_and_usage_check() {
    let dir = TempDir::new().unwrap();
    let playlists = PlaylistStore::new(dir.path().join("playlists")).unwrap();
    let channels = ChannelStore::new(dir.path().join("channels")).unwrap();

    let created = playlists.create(playlist("", "Morning Block")).unwrap();
    assert!(!created.id.is_empty());
    assert!(!playlists.is_in_use(&created.id, &channels).unwrap());

    let mut referencing = channel("ch1", "One", 1);
    referencing.playlist_id = Some(created.id.clone());
    channels.create(referencing).unwrap();
    assert!(playlists.is_in_use(&created.id, &channels).unwrap());

    let before = playlists.get(&created.id).unwrap().unwrap().updated_at;
    let renamed = playlists
        .update(&created.id, {
            let mut changed = created.clone();
            changed.name = "Evening Block".to_string();
            changed
        })
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "Evening Block");
    assert!(renamed.updated_at >= before);

    assert!(playlists.delete(&created.id).unwrap());
    assert!(playlists.get(&created.id).unwrap().is_none());
}

#[test]
fn playlist_list_sorts_by_name_and_hides_underscore_files() {
    let dir = TempDir::new().unwrap();
    let store = PlaylistStore::new(dir.path()).unwrap();
    store.create(playlist("z", "zulu")).unwrap();
    store.create(playlist("a", "Alpha")).unwrap();
    std::fs::write(dir.path().join("_migration.json"), "{}").unwrap();

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].name, "Alpha");
    assert_eq!(listed[1].name, "zulu");
}
