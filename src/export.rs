use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{require_min_points, TrackResult};
use crate::types::{TrackingSession, TrackingStats, MS_TO_KMH};

/// Complete session export (JSON-serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub session: TrackingSession,
    pub duration_seconds: f64,
    pub point_count: usize,
}

impl SessionExport {
    /// Wrap a session for export, refusing fewer than 2 points
    pub fn new(session: TrackingSession) -> TrackResult<Self> {
        require_min_points(session.location_history.len())?;
        Ok(SessionExport {
            duration_seconds: session.duration_ms() as f64 / 1000.0,
            point_count: session.location_history.len(),
            session,
        })
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> TrackResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to JSON bytes
    pub fn to_json_bytes(&self) -> TrackResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// GPX track format for mapping applications
#[derive(Debug, Serialize)]
pub struct GpxTrack {
    pub name: String,
    pub description: String,
    pub track_points: Vec<GpxPoint>,
}

#[derive(Debug, Serialize)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub time: String,
    /// m/s, as GPX consumers expect
    pub speed: Option<f64>,
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl GpxTrack {
    /// Generate GPX document XML string
    pub fn to_gpx_xml(&self) -> String {
        let name = escape_xml(&self.name);
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<gpx version=\"1.1\" creator=\"gps_tracker_rs\">\n");
        xml.push_str("  <metadata>\n");
        xml.push_str(&format!("    <name>{}</name>\n", name));
        xml.push_str(&format!("    <desc>{}</desc>\n", escape_xml(&self.description)));
        xml.push_str("  </metadata>\n");
        xml.push_str("  <trk>\n");
        xml.push_str(&format!("    <name>{}</name>\n", name));
        xml.push_str("    <trkseg>\n");

        for point in &self.track_points {
            xml.push_str(&format!("      <trkpt lat=\"{}\" lon=\"{}\">\n", point.lat, point.lon));
            xml.push_str(&format!("        <time>{}</time>\n", point.time));
            if let Some(speed) = point.speed {
                xml.push_str(&format!(
                    "        <extensions><speed>{:.3}</speed></extensions>\n",
                    speed
                ));
            }
            xml.push_str("      </trkpt>\n");
        }

        xml.push_str("    </trkseg>\n");
        xml.push_str("  </trk>\n");
        xml.push_str("</gpx>\n");

        xml
    }
}

/// RFC 3339 UTC time for an epoch-ms timestamp
pub fn rfc3339_utc(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.to_rfc3339(),
        None => DateTime::<Utc>::default().to_rfc3339(),
    }
}

/// Local wall-clock rendering used in names and listings
pub fn local_datetime(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// Create GPX track from a completed session
pub fn create_gpx_track(session: &TrackingSession) -> TrackResult<GpxTrack> {
    require_min_points(session.location_history.len())?;

    let track_points = session
        .location_history
        .iter()
        .map(|p| GpxPoint {
            lat: p.lat,
            lon: p.lng,
            time: rfc3339_utc(p.timestamp),
            speed: p.speed.map(|kmh| kmh / MS_TO_KMH),
        })
        .collect();

    Ok(GpxTrack {
        name: session.name.clone(),
        description: format!(
            "Recorded from {} ({})",
            rfc3339_utc(session.start_time),
            summary_line(&session.stats)
        ),
        track_points,
    })
}

/// One-line stats rendering
pub fn summary_line(stats: &TrackingStats) -> String {
    format!(
        "{:.2} km, avg {:.1} km/h, max {:.1} km/h, area {:.2} m²",
        stats.distance, stats.avg_speed, stats.max_speed, stats.area
    )
}
