use chrono::Utc;
use clap::Subcommand;

use pondtv_core::{render_m3u, render_xmltv, Channel, PlaylistItem};

use crate::{AppContext, Result};

#[derive(Subcommand, Debug)]
pub enum GuideCommands {
    /// M3U channel list for IPTV clients
    M3u,
    /// XMLTV program guide
    Xmltv,
}

fn resolved_channels(context: &AppContext) -> Result<Vec<(Channel, Vec<PlaylistItem>)>> {
    let mut pairs = Vec::new();
    for channel in context.channels.list()? {
        let items = match channel.playlist_id.as_deref() {
            Some(playlist_id) => context
                .playlists
                .get(playlist_id)?
                .map(|playlist| playlist.items)
                .unwrap_or_default(),
            None => Vec::new(),
        };
        pairs.push((channel, items));
    }
    Ok(pairs)
}

pub fn run(context: &AppContext, command: &GuideCommands) -> Result<()> {
    match command {
        GuideCommands::M3u => {
            let channels = context.channels.list()?;
            print!("{}", render_m3u(&channels, &context.config.epg.base_url));
            Ok(())
        }
        GuideCommands::Xmltv => {
            let pairs = resolved_channels(context)?;
            let xml = render_xmltv(&pairs, Utc::now(), context.config.epg.hours_ahead)?;
            println!("{xml}");
            Ok(())
        }
    }
}
