use clap::{Parser, Subcommand};
use mapsnap_common::LatLon;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mapsnap")]
#[command(about = "Render map viewports on an off-screen graphics surface")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, env = "MAPSNAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output width in pixels (overrides the config file)
    #[arg(long, global = true)]
    pub width: Option<u32>,

    /// Output height in pixels (overrides the config file)
    #[arg(long, global = true)]
    pub height: Option<u32>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one viewport to a PNG file
    #[command(allow_negative_numbers = true)]
    Render {
        /// Latitude of the viewport center
        lat: f64,

        /// Longitude of the viewport center
        lon: f64,

        /// Zoom level
        #[arg(short, long, default_value_t = 14.0)]
        zoom: f64,

        /// Point of interest marker, as "lat,lon"
        #[arg(long, value_name = "LAT,LON", value_parser = parse_lat_lon)]
        poi: Option<LatLon>,

        /// Live-location marker, as "lat,lon"
        #[arg(long, value_name = "LAT,LON", value_parser = parse_lat_lon)]
        location: Option<LatLon>,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        out: PathBuf,
    },

    /// Watch a data directory and forward changes to the map engine
    Watch {
        /// Directory to watch (overrides the config file)
        dir: Option<PathBuf>,

        /// Seconds between statistics log lines
        #[arg(long, default_value_t = 60)]
        stats_interval: u64,
    },
}

/// Parse "lat,lon" into a coordinate.
pub fn parse_lat_lon(value: &str) -> Result<LatLon, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {value:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude {lat:?}: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude {lon:?}: {e}"))?;
    let coordinate = LatLon::new(lat, lon);
    if !coordinate.is_valid() {
        return Err(format!("coordinate {lat},{lon} out of range"));
    }
    Ok(coordinate)
}
