//! Google Maps deep links for a generated route, honoring the 10
//! waypoint cap per link. Links chain: the first starts at the depot,
//! each next one starts where the previous ended, the last one returns
//! to the depot.

pub const MAX_WAYPOINTS_PER_LINK: usize = 10;

/// Commas and pipes are percent-encoded the way a query encoder would.
fn coord(lat: f64, lng: f64) -> String {
    format!("{lat}%2C{lng}")
}

pub fn build_gmaps_links(
    stops: &[(f64, f64)],
    depot_lat: f64,
    depot_lng: f64,
) -> Vec<String> {
    build_links_with_cap(stops, depot_lat, depot_lng, MAX_WAYPOINTS_PER_LINK)
}

fn build_links_with_cap(
    stops: &[(f64, f64)],
    depot_lat: f64,
    depot_lng: f64,
    max_waypoints: usize,
) -> Vec<String> {
    if stops.is_empty() {
        return vec![];
    }

    let depot = coord(depot_lat, depot_lng);
    let mut links = Vec::new();
    let mut i = 0;

    while i < stops.len() {
        let chunk = &stops[i..(i + max_waypoints).min(stops.len())];
        let origin = if i == 0 {
            depot.clone()
        } else {
            let (lat, lng) = stops[i - 1];
            coord(lat, lng)
        };

        let last_chunk = i + max_waypoints >= stops.len();
        let (destination, waypoints) = if last_chunk {
            // Final leg closes back at the depot, every stop a waypoint.
            (depot.clone(), chunk)
        } else {
            let (lat, lng) = chunk[chunk.len() - 1];
            (coord(lat, lng), &chunk[..chunk.len() - 1])
        };

        let mut url = format!(
            "https://www.google.com/maps/dir/?api=1&origin={origin}&destination={destination}"
        );
        if !waypoints.is_empty() {
            let joined = waypoints
                .iter()
                .map(|(lat, lng)| coord(*lat, *lng))
                .collect::<Vec<_>>()
                .join("%7C");
            url.push_str("&waypoints=");
            url.push_str(&joined);
        }
        links.push(url);
        i += max_waypoints;
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(n: usize) -> Vec<(f64, f64)> {
        (0..n).map(|i| (-32.9 - i as f64 * 0.01, -68.8)).collect()
    }

    #[test]
    fn no_stops_no_links() {
        assert!(build_gmaps_links(&[], -32.9, -68.8).is_empty());
    }

    #[test]
    fn single_link_starts_and_ends_at_depot() {
        let links = build_gmaps_links(&stops(3), -32.91973, -68.81829);
        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert!(link.starts_with("https://www.google.com/maps/dir/?api=1"));
        assert!(link.contains("origin=-32.91973%2C-68.81829"));
        assert!(link.contains("destination=-32.91973%2C-68.81829"));
        assert_eq!(link.matches("%7C").count(), 2); // three waypoints
    }

    #[test]
    fn long_routes_chain_through_the_previous_endpoint() {
        let all = stops(12);
        let links = build_links_with_cap(&all, -32.9, -68.8, 10);
        assert_eq!(links.len(), 2);

        // First link ends at stop 10 (index 9), second starts there.
        let boundary = coord(all[9].0, all[9].1);
        assert!(links[0].contains(&format!("destination={boundary}")));
        assert!(links[1].contains(&format!("origin={boundary}")));
        // Second link closes at the depot.
        assert!(links[1].contains("destination=-32.9%2C-68.8"));
    }

    #[test]
    fn waypoint_cap_is_respected() {
        for n in [1, 9, 10, 11, 25, 40] {
            for link in build_gmaps_links(&stops(n), -32.9, -68.8) {
                let waypoints = link
                    .split("waypoints=")
                    .nth(1)
                    .map(|tail| tail.matches("%2C").count())
                    .unwrap_or(0);
                assert!(waypoints <= MAX_WAYPOINTS_PER_LINK, "link {link}");
            }
        }
    }
}
