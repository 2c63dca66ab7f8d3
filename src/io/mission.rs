use crate::types::{FlightError, FlightPlanDetails, FlightResult, Geometry, Position};
use std::path::Path;

/// Header marker of the waypoint mission format (e.g. `QGC WPL 110`)
pub const MISSION_HEADER: &str = "QGC";

/// MAV_CMD_NAV_WAYPOINT
pub const CMD_NAV_WAYPOINT: u32 = 16;
/// MAV_CMD_DO_CHANGE_SPEED
pub const CMD_DO_CHANGE_SPEED: u32 = 178;
/// MAV_FRAME_GLOBAL, absolute altitude
pub const FRAME_GLOBAL: u32 = 0;
/// MAV_FRAME_GLOBAL_RELATIVE_ALT, altitude above home
pub const FRAME_GLOBAL_RELATIVE_ALT: u32 = 3;

const FIELDS_PER_ITEM: usize = 12;

/// One record of a waypoint mission file
#[derive(Debug, Clone, PartialEq)]
pub struct MissionItem {
    pub index: u32,
    pub current: u32,
    pub frame: u32,
    pub command: u32,
    pub params: [f64; 4],
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub autocontinue: u32,
}

/// Planned flight derived from a mission file
#[derive(Debug, Clone, PartialEq)]
pub struct FlightPlan {
    /// Waypoints in file order, altitudes absolute
    pub path: Vec<Position>,
    pub home_altitude: f64,
    pub mean_altitude: Option<f64>,
    /// Absent when the mission never sets a speed
    pub speed: Option<f64>,
}

impl FlightPlan {
    pub fn geometry(&self) -> Geometry {
        Geometry::Path(self.path.clone())
    }

    /// Mean waypoint altitude above the home point
    pub fn flight_altitude(&self) -> Option<f64> {
        self.mean_altitude.map(|mean| mean - self.home_altitude)
    }

    pub fn details(&self) -> FlightPlanDetails {
        FlightPlanDetails {
            home_altitude: self.home_altitude,
            mean_altitude: self.mean_altitude,
            speed: self.speed,
        }
    }
}

/// Parser for line-oriented waypoint mission files
pub struct MissionParser;

impl MissionParser {
    /// Read and parse a mission file
    pub fn read_file<P: AsRef<Path>>(path: P) -> FlightResult<FlightPlan> {
        let path = path.as_ref();
        log::debug!("Reading flight plan: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parse mission text. `source` is only used in error messages.
    pub fn parse(content: &str, source: &Path) -> FlightResult<FlightPlan> {
        let mut path = Vec::new();
        let mut home_altitude = 0.0;
        let mut speed = None;

        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(MISSION_HEADER) {
                continue;
            }
            let item = Self::parse_item(trimmed, source, i + 1)?;

            if item.index == 0 && item.frame == FRAME_GLOBAL {
                home_altitude = item.altitude;
            }
            if item.command == CMD_DO_CHANGE_SPEED {
                speed = Some(item.params[1]);
            }
            if item.command == CMD_NAV_WAYPOINT && item.index != 0 {
                let altitude = match item.frame {
                    FRAME_GLOBAL => item.altitude,
                    FRAME_GLOBAL_RELATIVE_ALT => item.altitude + home_altitude,
                    other => {
                        log::warn!(
                            "{}:{}: frame {} treated as relative to home",
                            source.display(),
                            i + 1,
                            other
                        );
                        item.altitude + home_altitude
                    }
                };
                path.push(Position::new(item.longitude, item.latitude, altitude));
            }
        }

        let mean_altitude = if path.is_empty() {
            None
        } else {
            Some(path.iter().map(|p| p.alt).sum::<f64>() / path.len() as f64)
        };

        log::debug!(
            "Flight plan {}: {} waypoints, home altitude {}, speed {:?}",
            source.display(),
            path.len(),
            home_altitude,
            speed
        );

        Ok(FlightPlan {
            path,
            home_altitude,
            mean_altitude,
            speed,
        })
    }

    /// Parse one 12-field record
    pub fn parse_item(line: &str, source: &Path, line_no: usize) -> FlightResult<MissionItem> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != FIELDS_PER_ITEM {
            return Err(FlightError::parse(
                source,
                line_no,
                format!("expected {} fields, found {}", FIELDS_PER_ITEM, fields.len()),
            ));
        }

        let int = |i: usize, name: &str| -> FlightResult<u32> {
            fields[i].parse::<u32>().map_err(|_| {
                FlightError::parse(source, line_no, format!("{} '{}' is not an integer", name, fields[i]))
            })
        };
        let real = |i: usize, name: &str| -> FlightResult<f64> {
            fields[i].parse::<f64>().map_err(|_| {
                FlightError::parse(source, line_no, format!("{} '{}' is not a number", name, fields[i]))
            })
        };

        Ok(MissionItem {
            index: int(0, "index")?,
            current: int(1, "current waypoint flag")?,
            frame: int(2, "coordinate frame")?,
            command: int(3, "command")?,
            params: [
                real(4, "param1")?,
                real(5, "param2")?,
                real(6, "param3")?,
                real(7, "param4")?,
            ],
            latitude: real(8, "latitude")?,
            longitude: real(9, "longitude")?,
            altitude: real(10, "altitude")?,
            autocontinue: int(11, "autocontinue flag")?,
        })
    }
}
