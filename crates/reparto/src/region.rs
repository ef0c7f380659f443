use utility::geo::BoundingBox;

/// Operating region: Mendoza province, widened to cover the outlying
/// departments served by the fleet.
pub const MENDOZA_BBOX: BoundingBox = BoundingBox {
    min_latitude: -33.5,
    max_latitude: -32.0,
    min_longitude: -69.5,
    max_longitude: -68.0,
};

/// Exact centroids of the main localities. A geocoder answering one of
/// these has almost certainly fallen back to a generic city-level match,
/// which is useless for street delivery.
pub const KNOWN_CITY_CENTERS: [(f64, f64); 6] = [
    (-32.8908, -68.8272),  // Ciudad de Mendoza
    (-32.9887, -68.8361),  // Godoy Cruz
    (-32.8833, -68.7833),  // Guaymallén
    (-32.8500, -68.8833),  // Las Heras
    (-33.0712, -68.8868),  // Luján de Cuyo
    (-32.9833, -68.6000),  // Maipú
];

/// ~100 m per axis.
pub const CITY_CENTER_TOLERANCE_DEG: f64 = 0.001;

/// Locality tokens accepted as "address already names where it goes".
pub const KNOWN_LOCALITIES: [&str; 16] = [
    "GODOY CRUZ",
    "GUAYMALLÉN",
    "LAS HERAS",
    "LUJÁN DE CUYO",
    "MAIPÚ",
    "SAN RAFAEL",
    "CAPITAL",
    "CIUDAD",
    "MENDOZA",
    "TUNUYÁN",
    "SAN MARTÍN",
    "RIVADAVIA",
    "JUNÍN",
    "GUAYMALLEN",
    "LUJAN DE CUYO",
    "MAIPU",
];

pub fn is_in_region(lat: f64, lng: f64) -> bool {
    MENDOZA_BBOX.contains(lat, lng)
}

pub fn is_known_city_center(lat: f64, lng: f64) -> bool {
    KNOWN_CITY_CENTERS.iter().any(|(clat, clng)| {
        (lat - clat).abs() < CITY_CENTER_TOLERANCE_DEG
            && (lng - clng).abs() < CITY_CENTER_TOLERANCE_DEG
    })
}

pub fn has_known_locality(address_upper: &str) -> bool {
    KNOWN_LOCALITIES
        .iter()
        .any(|locality| address_upper.contains(locality))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depot_is_inside_region() {
        assert!(is_in_region(-32.91973, -68.81829));
    }

    #[test]
    fn outside_bbox_is_rejected() {
        assert!(!is_in_region(-31.5, -68.5));
        assert!(!is_in_region(-32.5, -70.0));
    }

    #[test]
    fn city_centroid_is_flagged_within_tolerance() {
        assert!(is_known_city_center(-32.8908, -68.8272));
        assert!(is_known_city_center(-32.8910, -68.8270));
        assert!(!is_known_city_center(-32.9050, -68.8272));
    }

    #[test]
    fn locality_detection_is_substring_based() {
        assert!(has_known_locality("AVENIDA SAN MARTIN 1200, GODOY CRUZ"));
        assert!(!has_known_locality("AVENIDA SIEMPREVIVA 742"));
    }
}
