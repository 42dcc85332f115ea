//! Channel-list and program-guide rendering: pure formatting over
//! scheduler output, consumed by IPTV clients.

use std::io;

use chrono::{DateTime, Duration, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::library::{Channel, PlaylistItem};
use crate::playout::upcoming_slots;

/// The manifest name every channel stream is served under.
pub const MANIFEST_NAME: &str = "stream.m3u8";

/// Renders an M3U channel list with tvg metadata and per-channel
/// playout URLs. Disabled channels are skipped.
pub fn render_m3u(channels: &[Channel], base_url: &str) -> String {
    let mut lines = vec!["#EXTM3U".to_string()];

    for channel in channels {
        if !channel.enabled {
            continue;
        }
        let mut extinf = format!(
            "#EXTINF:-1 tvg-id=\"{}\" tvg-name=\"{}\" tvg-chno=\"{}\"",
            channel.id, channel.name, channel.number
        );
        if let Some(logo) = &channel.logo_url {
            extinf.push_str(&format!(" tvg-logo=\"{logo}\""));
        }
        extinf.push_str(&format!(" group-title=\"{}\",{}", channel.category, channel.name));
        lines.push(extinf);
        lines.push(format!("{base_url}/stream/{}/{MANIFEST_NAME}", channel.id));
    }

    lines.join("\n") + "\n"
}

fn xmltv_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%d%H%M%S +0000").to_string()
}

/// Renders an XMLTV guide document for the given channels and their
/// resolved playlists, projecting `hours_ahead` from `now`.
pub fn render_xmltv(
    channels: &[(Channel, Vec<PlaylistItem>)],
    now: DateTime<Utc>,
    hours_ahead: u32,
) -> io::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut tv = BytesStart::new("tv");
    tv.push_attribute(("generator-info-name", "pondtv"));
    writer.write_event(Event::Start(tv))?;

    for (channel, _) in channels {
        if !channel.enabled {
            continue;
        }
        let mut elem = BytesStart::new("channel");
        elem.push_attribute(("id", channel.id.as_str()));
        writer.write_event(Event::Start(elem))?;

        writer.write_event(Event::Start(BytesStart::new("display-name")))?;
        writer.write_event(Event::Text(BytesText::new(&channel.name)))?;
        writer.write_event(Event::End(BytesEnd::new("display-name")))?;

        if let Some(logo) = &channel.logo_url {
            let mut icon = BytesStart::new("icon");
            icon.push_attribute(("src", logo.as_str()));
            writer.write_event(Event::Empty(icon))?;
        }

        writer.write_event(Event::End(BytesEnd::new("channel")))?;
    }

    let horizon = Duration::hours(i64::from(hours_ahead));
    for (channel, items) in channels {
        if !channel.enabled {
            continue;
        }
        for slot in upcoming_slots(channel, items, now, horizon) {
            let mut programme = BytesStart::new("programme");
            programme.push_attribute(("start", xmltv_time(slot.start).as_str()));
            programme.push_attribute(("stop", xmltv_time(slot.stop).as_str()));
            programme.push_attribute(("channel", channel.id.as_str()));
            writer.write_event(Event::Start(programme))?;

            let mut title = BytesStart::new("title");
            title.push_attribute(("lang", "en"));
            writer.write_event(Event::Start(title))?;
            writer.write_event(Event::Text(BytesText::new(&slot.title)))?;
            writer.write_event(Event::End(BytesEnd::new("title")))?;

            if !slot.description.is_empty() {
                let mut desc = BytesStart::new("desc");
                desc.push_attribute(("lang", "en"));
                writer.write_event(Event::Start(desc))?;
                writer.write_event(Event::Text(BytesText::new(&slot.description)))?;
                writer.write_event(Event::End(BytesEnd::new("desc")))?;
            }

            writer.write_event(Event::End(BytesEnd::new("programme")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("tv")))?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::StreamSettings;
    use chrono::TimeZone;

    fn channel(id: &str, number: u32, enabled: bool) -> Channel {
        Channel {
            id: id.to_string(),
            name: format!("Channel {number}"),
            number,
            category: "Movies".to_string(),
            logo_url: Some(format!("http://host/logos/{id}.png")),
            playlist_id: Some("pl1".to_string()),
            loop_playlist: true,
            start_time: None,
            stream_settings: StreamSettings::default(),
            enabled,
        }
    }

    fn items() -> Vec<PlaylistItem> {
        vec![
            PlaylistItem {
                file_path: "a.mp4".to_string(),
                duration: 600,
                title: "Feature A".to_string(),
                description: "First feature".to_string(),
            },
            PlaylistItem {
                file_path: "b.mp4".to_string(),
                duration: 300,
                title: "Short B".to_string(),
                description: String::new(),
            },
        ]
    }

    #[test]
    fn m3u_lists_enabled_channels_with_playout_urls() {
        let channels = vec![channel("one", 1, true), channel("two", 2, false)];
        let m3u = render_m3u(&channels, "http://host:8000");
        assert!(m3u.starts_with("#EXTM3U\n"));
        assert!(m3u.contains("tvg-id=\"one\""));
        assert!(m3u.contains("tvg-chno=\"1\""));
        assert!(m3u.contains("group-title=\"Movies\",Channel 1"));
        assert!(m3u.contains("http://host:8000/stream/one/stream.m3u8"));
        assert!(!m3u.contains("tvg-id=\"two\""));
    }

    #[test]
    fn xmltv_contains_channels_and_contiguous_programmes() {
        let now = Utc.timestamp_opt(650, 0).unwrap();
        let pairs = vec![(channel("one", 1, true), items())];
        let xml = render_xmltv(&pairs, now, 1).unwrap();
        assert!(xml.contains("<tv generator-info-name=\"pondtv\">"));
        assert!(xml.contains("<channel id=\"one\">"));
        assert!(xml.contains("<display-name>Channel 1</display-name>"));
        // Airing item began at 600s since epoch.
        assert!(xml.contains("start=\"19700101001000 +0000\""));
        assert!(xml.contains("<title lang=\"en\">Short B</title>"));
        assert!(xml.contains("<desc lang=\"en\">First feature</desc>"));
    }

    #[test]
    fn xmltv_skips_disabled_channels() {
        let now = Utc.timestamp_opt(0, 0).unwrap();
        let pairs = vec![(channel("off", 9, false), items())];
        let xml = render_xmltv(&pairs, now, 1).unwrap();
        assert!(!xml.contains("channel id=\"off\""));
        assert!(!xml.contains("<programme"));
    }
}
