use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ParkingSpot {
    pub id: &'static str,
    pub zone: &'static str,
    pub available: bool,
}

const fn spot(id: &'static str, zone: &'static str, available: bool) -> ParkingSpot {
    ParkingSpot {
        id,
        zone,
        available,
    }
}

// Fixed lot layout. Bookings never change availability.
static CATALOG: [ParkingSpot; 12] = [
    spot("A1", "A", true),
    spot("A2", "A", true),
    spot("A3", "A", false),
    spot("A4", "A", true),
    spot("B1", "B", true),
    spot("B2", "B", true),
    spot("B3", "B", true),
    spot("B4", "B", false),
    spot("C1", "C", true),
    spot("C2", "C", false),
    spot("C3", "C", true),
    spot("C4", "C", true),
];

pub fn catalog() -> &'static [ParkingSpot] {
    &CATALOG
}

pub fn find(id: &str) -> Option<&'static ParkingSpot> {
    CATALOG.iter().find(|spot| spot.id == id)
}

/// Looks up a spot that can be booked right now.
pub fn bookable(id: &str) -> Result<&'static ParkingSpot, String> {
    let spot = find(id).ok_or(format!("Parking spot {} does not exist", id))?;
    if !spot.available {
        return Err(format!("Parking spot {} is not available", id));
    }
    Ok(spot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_three_zones_of_four() {
        assert_eq!(catalog().len(), 12);
        for zone in ["A", "B", "C"] {
            assert_eq!(catalog().iter().filter(|s| s.zone == zone).count(), 4);
        }
        let taken: Vec<_> = catalog()
            .iter()
            .filter(|s| !s.available)
            .map(|s| s.id)
            .collect();
        assert_eq!(taken, vec!["A3", "B4", "C2"]);
    }

    #[test]
    fn bookable_rejects_taken_and_unknown_spots() {
        assert_eq!(bookable("B2").map(|s| s.zone), Ok("B"));
        assert!(bookable("A3").unwrap_err().contains("not available"));
        assert!(bookable("Z9").unwrap_err().contains("does not exist"));
    }
}
