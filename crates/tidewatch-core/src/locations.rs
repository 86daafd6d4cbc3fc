//! Named places along the coast: affected-area boxes, known coastal cities
//! and the historical events recorded against their states.

use serde::Serialize;

use crate::coords::{BoundingBox, LatLon};
use crate::grid::Region;
use crate::hazard::HazardType;
use crate::labeling::Severity;

/// Label for points outside every named area.
pub const GENERIC_AREA: &str = "Indian Coastal Region";

/// Rough degrees → kilometres factor for the coastal latitudes.
const KM_PER_DEGREE: f64 = 111.0;

const fn bbox(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> BoundingBox {
    BoundingBox { min_lat, max_lat, min_lon, max_lon }
}

/// Checked in order; the first containing box wins.
static AFFECTED_AREAS: [(&str, BoundingBox); 7] = [
    ("Chennai Metropolitan Area", bbox(12.5, 13.5, 79.5, 80.5)),
    ("Pondicherry Coast", bbox(11.5, 12.5, 79.0, 80.0)),
    ("Kerala Coast", bbox(8.0, 9.5, 76.0, 77.0)),
    ("Mumbai Coast", bbox(18.5, 19.5, 72.5, 73.0)),
    ("Odisha Coast", bbox(19.5, 20.5, 85.0, 86.0)),
    ("West Bengal Coast", bbox(21.5, 23.0, 87.5, 88.5)),
    ("Andhra Pradesh Coast", bbox(16.5, 18.0, 82.5, 83.5)),
];

/// Name of the affected area containing `point`, or [`GENERIC_AREA`].
pub fn affected_area(point: LatLon) -> &'static str {
    AFFECTED_AREAS
        .iter()
        .find(|(_, b)| b.contains(point))
        .map_or(GENERIC_AREA, |(name, _)| *name)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoastalCity {
    pub name: &'static str,
    pub state: &'static str,
    pub location: LatLon,
}

const fn city(name: &'static str, state: &'static str, lat: f64, lon: f64) -> CoastalCity {
    CoastalCity { name, state, location: LatLon { lat, lon } }
}

pub static COASTAL_CITIES: [CoastalCity; 18] = [
    city("Chennai", "Tamil Nadu", 13.0827, 80.2707),
    city("Pondicherry", "Tamil Nadu", 11.9416, 79.8083),
    city("Mahabalipuram", "Tamil Nadu", 12.6169, 80.1991),
    city("Rameswaram", "Tamil Nadu", 9.2876, 79.3129),
    city("Tuticorin", "Tamil Nadu", 8.7642, 78.1348),
    city("Kochi", "Kerala", 9.9312, 76.2673),
    city("Thiruvananthapuram", "Kerala", 8.5241, 76.9366),
    city("Kozhikode", "Kerala", 11.2588, 75.7804),
    city("Mumbai", "Maharashtra", 18.9750, 72.8258),
    city("Ratnagiri", "Maharashtra", 16.9944, 73.3000),
    city("Surat", "Gujarat", 21.1702, 72.8311),
    city("Porbandar", "Gujarat", 21.6417, 69.6293),
    city("Kolkata", "West Bengal", 22.5726, 88.3639),
    city("Digha", "West Bengal", 21.6765, 87.5298),
    city("Puri", "Odisha", 19.8135, 85.8312),
    city("Paradip", "Odisha", 20.3150, 86.6094),
    city("Visakhapatnam", "Andhra Pradesh", 17.6868, 83.2185),
    city("Kakinada", "Andhra Pradesh", 16.9891, 82.2475),
];

/// Nearest known city to a query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationProfile {
    pub closest_location: &'static str,
    pub state: &'static str,
    pub sea_region: Region,
    pub distance_km: f64,
}

/// Profile for `(lat, lng)`. The region comes from the query point itself,
/// classified with latitude first like every other caller of
/// [`Region::classify`].
pub fn location_profile(lat: f64, lng: f64) -> LocationProfile {
    let point = LatLon::new(lat, lng);
    let (nearest, degrees) = COASTAL_CITIES
        .iter()
        .map(|c| (c, point.degree_distance(c.location)))
        .fold((&COASTAL_CITIES[0], f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });

    LocationProfile {
        closest_location: nearest.name,
        state: nearest.state,
        sea_region: Region::classify(lat, lng),
        distance_km: (degrees * KM_PER_DEGREE * 100.0).round() / 100.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalEvent {
    pub year: i32,
    pub name: &'static str,
    pub affected_states: &'static [&'static str],
    pub severity: Severity,
    pub casualties: u32,
    pub hazard: HazardType,
}

pub static HISTORICAL_EVENTS: [HistoricalEvent; 7] = [
    HistoricalEvent {
        year: 2004,
        name: "Indian Ocean Tsunami",
        affected_states: &["Tamil Nadu", "Kerala", "Andhra Pradesh"],
        severity: Severity::Critical,
        casualties: 10_000,
        hazard: HazardType::Tsunami,
    },
    HistoricalEvent {
        year: 1999,
        name: "Odisha Super Cyclone",
        affected_states: &["Odisha"],
        severity: Severity::Critical,
        casualties: 10_000,
        hazard: HazardType::Cyclone,
    },
    HistoricalEvent {
        year: 2017,
        name: "Cyclone Ockhi",
        affected_states: &["Kerala", "Tamil Nadu"],
        severity: Severity::High,
        casualties: 245,
        hazard: HazardType::Cyclone,
    },
    HistoricalEvent {
        year: 2019,
        name: "Cyclone Fani",
        affected_states: &["Odisha", "West Bengal"],
        severity: Severity::Critical,
        casualties: 89,
        hazard: HazardType::Cyclone,
    },
    HistoricalEvent {
        year: 2020,
        name: "Cyclone Amphan",
        affected_states: &["West Bengal", "Odisha"],
        severity: Severity::Critical,
        casualties: 128,
        hazard: HazardType::Cyclone,
    },
    HistoricalEvent {
        year: 2021,
        name: "Cyclone Tauktae",
        affected_states: &["Gujarat", "Maharashtra", "Kerala"],
        severity: Severity::High,
        casualties: 174,
        hazard: HazardType::Cyclone,
    },
    HistoricalEvent {
        year: 2018,
        name: "Kerala Floods",
        affected_states: &["Kerala"],
        severity: Severity::Critical,
        casualties: 504,
        hazard: HazardType::CoastalFlood,
    },
];

/// Events that affected `state`, most recent first.
pub fn events_for_state(state: &str) -> Vec<&'static HistoricalEvent> {
    let mut events: Vec<_> = HISTORICAL_EVENTS
        .iter()
        .filter(|e| e.affected_states.iter().any(|s| *s == state))
        .collect();
    events.sort_by(|a, b| b.year.cmp(&a.year));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_areas() {
        assert_eq!(affected_area(LatLon::new(13.08, 80.27)), "Chennai Metropolitan Area");
        assert_eq!(affected_area(LatLon::new(18.97, 72.82)), "Mumbai Coast");
        assert_eq!(affected_area(LatLon::new(22.57, 88.36)), "West Bengal Coast");
    }

    #[test]
    fn outside_every_box_is_generic() {
        assert_eq!(affected_area(LatLon::new(0.0, 0.0)), GENERIC_AREA);
        assert_eq!(affected_area(LatLon::new(-45.0, 170.0)), GENERIC_AREA);
        assert_eq!(affected_area(LatLon::new(15.0, 73.8)), GENERIC_AREA);
    }

    #[test]
    fn nearest_city_and_distance() {
        let p = location_profile(13.0827, 80.2707);
        assert_eq!(p.closest_location, "Chennai");
        assert_eq!(p.state, "Tamil Nadu");
        assert_eq!(p.distance_km, 0.0);

        let p = location_profile(19.0, 72.8258);
        assert_eq!(p.closest_location, "Mumbai");
        assert!((p.distance_km - 2.78).abs() < 0.011, "{}", p.distance_km);
    }

    /// Chennai sits east of 77°E. Classifying its latitude as a longitude
    /// would put it in the Arabian Sea.
    #[test]
    fn profile_classifies_lat_then_lng() {
        assert_eq!(location_profile(13.0827, 80.2707).sea_region, Region::BayOfBengal);
        assert_eq!(location_profile(9.9312, 76.2673).sea_region, Region::ArabianSea);
        assert_eq!(location_profile(11.6, 92.7).sea_region, Region::AndamanSea);
        assert_eq!(Region::classify(80.2707, 13.0827), Region::ArabianSea);
    }

    #[test]
    fn events_by_state() {
        let kerala = events_for_state("Kerala");
        assert_eq!(kerala.len(), 4);
        assert_eq!(kerala[0].name, "Cyclone Tauktae");
        assert!(events_for_state("Goa").is_empty());
    }
}
