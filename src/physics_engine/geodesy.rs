//! Great-circle distance between wells.

use crate::codec::CoordinateCodec;
use crate::config::defaults::EARTH_RADIUS_KM;
use crate::types::Well;

/// Haversine distance between two points given in decimal degrees.
///
/// Returns meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c * 1000.0
}

/// Distance between two wells in meters.
///
/// Returns exactly 0 when any of the four stored coordinates cannot be
/// decrypted. A zero distance maximizes the connectivity ratio downstream.
pub fn distance(codec: &dyn CoordinateCodec, a: &Well, b: &Well) -> f64 {
    let coords = (
        codec.decrypt_to_number(&a.latitude),
        codec.decrypt_to_number(&a.longitude),
        codec.decrypt_to_number(&b.latitude),
        codec.decrypt_to_number(&b.longitude),
    );

    match coords {
        (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => haversine_m(lat1, lon1, lat2, lon2),
        _ => {
            tracing::warn!(
                well_a = a.id,
                well_b = b.id,
                "Coordinates could not be decrypted, using zero distance"
            );
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PlainCoordinateCodec;
    use crate::types::WellType;

    fn well(id: i64, lat: &str, lon: &str) -> Well {
        Well {
            id,
            name: format!("W{id}"),
            latitude: lat.into(),
            longitude: lon.into(),
            drainage_radius: None,
            well_radius: None,
            well_type: WellType::Producer,
            workshop_id: None,
        }
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // 2π·6371/360 ≈ 111.195 km
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.93).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_same_point_is_zero() {
        assert!(haversine_m(54.3, 52.1, 54.3, 52.1).abs() < 1e-9);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = well(1, "54.30", "52.10");
        let b = well(2, "54.31", "52.12");
        let ab = distance(&PlainCoordinateCodec, &a, &b);
        let ba = distance(&PlainCoordinateCodec, &b, &a);
        assert!(ab > 1000.0 && ab < 2000.0, "got {ab}");
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_undecryptable_coordinate_gives_zero() {
        let good = well(1, "54.30", "52.10");
        for bad in [
            well(2, "garbage", "52.12"),
            well(2, "54.31", "garbage"),
        ] {
            assert_eq!(distance(&PlainCoordinateCodec, &good, &bad), 0.0);
            assert_eq!(distance(&PlainCoordinateCodec, &bad, &good), 0.0);
        }
    }
}
