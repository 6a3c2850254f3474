use serde::Serialize;

use crate::entities::cab::VehicleClass;
use crate::utils::geo::haversine_distance;

/// Per-class rate card. Values are design-time constants, not live pricing.
pub struct RateCard {
    pub base_fare: f64,
    pub per_km: f64,
    pub per_min: f64,
    pub min_fare: f64,
}

pub fn rate_card(class: &VehicleClass) -> RateCard {
    match class {
        VehicleClass::Economy => RateCard { base_fare: 30.0, per_km: 9.0, per_min: 1.5, min_fare: 50.0 },
        VehicleClass::Sedan => RateCard { base_fare: 45.0, per_km: 12.0, per_min: 2.0, min_fare: 75.0 },
        VehicleClass::Suv => RateCard { base_fare: 60.0, per_km: 15.0, per_min: 2.5, min_fare: 100.0 },
        VehicleClass::Luxury => RateCard { base_fare: 100.0, per_km: 22.0, per_min: 3.5, min_fare: 180.0 },
    }
}

/// Surge is a fixed function of the local clock hour: morning and evening
/// peak bands plus a smaller late-night band. Not a live demand model.
pub fn surge_multiplier(hour: u32) -> f64 {
    match hour {
        7..=9 => 1.4,
        17..=20 => 1.5,
        22..=23 | 0..=5 => 1.2,
        _ => 1.0,
    }
}

/// Round to 2 decimal places, half away from zero.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize)]
pub struct FareBreakdown {
    pub base_fare: f64,
    pub distance_fare: f64,
    pub time_fare: f64,
    pub toll_charge: f64,
    pub surge_multiplier: f64,
    pub surge_fare: f64,
    pub discount_percent: f64,
    pub discount: f64,
    pub total: f64,
}

pub struct FareInput<'a> {
    pub vehicle_class: &'a VehicleClass,
    pub distance_km: f64,
    pub duration_min: f64,
    pub surge_multiplier: f64,
    pub discount_percent: f64,
    pub toll_charge: f64,
}

pub fn estimate_fare(input: &FareInput) -> FareBreakdown {
    let card = rate_card(input.vehicle_class);

    let distance_fare = input.distance_km * card.per_km;
    let time_fare = input.duration_min * card.per_min;
    let subtotal = card.base_fare + distance_fare + time_fare + input.toll_charge;
    let surge_fare = subtotal * (input.surge_multiplier - 1.0);
    let discount = (subtotal + surge_fare) * input.discount_percent / 100.0;
    let total = (subtotal + surge_fare - discount).max(card.min_fare);

    FareBreakdown {
        base_fare: round_money(card.base_fare),
        distance_fare: round_money(distance_fare),
        time_fare: round_money(time_fare),
        toll_charge: round_money(input.toll_charge),
        surge_multiplier: input.surge_multiplier,
        surge_fare: round_money(surge_fare),
        discount_percent: input.discount_percent,
        discount: round_money(discount),
        total: round_money(total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteKind {
    Fastest,
    Highway,
    TollFree,
}

/// Route shaping over the great-circle baseline. Without a routing API the
/// variants are fixed multipliers: road distance exceeds the great circle,
/// and each variant trades distance against speed and tolls.
struct RouteProfile {
    kind: RouteKind,
    distance_factor: f64,
    avg_speed_kmh: f64,
    toll_charge: f64,
}

const ROUTE_PROFILES: [RouteProfile; 3] = [
    RouteProfile { kind: RouteKind::Fastest, distance_factor: 1.15, avg_speed_kmh: 42.0, toll_charge: 0.0 },
    RouteProfile { kind: RouteKind::Highway, distance_factor: 1.30, avg_speed_kmh: 65.0, toll_charge: 75.0 },
    RouteProfile { kind: RouteKind::TollFree, distance_factor: 1.40, avg_speed_kmh: 35.0, toll_charge: 0.0 },
];

#[derive(Debug, Clone, Serialize)]
pub struct RouteEstimate {
    pub route: RouteKind,
    pub distance_km: f64,
    pub duration_min: f64,
    pub fare: FareBreakdown,
}

/// Fare estimates for every route variant between two points.
pub fn route_estimates(
    pickup_lat: f64,
    pickup_lng: f64,
    dropoff_lat: f64,
    dropoff_lng: f64,
    vehicle_class: &VehicleClass,
    surge: f64,
    discount_percent: f64,
) -> Vec<RouteEstimate> {
    let direct_km = haversine_distance(pickup_lat, pickup_lng, dropoff_lat, dropoff_lng);

    ROUTE_PROFILES
        .iter()
        .map(|profile| {
            let distance_km = direct_km * profile.distance_factor;
            let duration_min = distance_km / profile.avg_speed_kmh * 60.0;
            let fare = estimate_fare(&FareInput {
                vehicle_class,
                distance_km,
                duration_min,
                surge_multiplier: surge,
                discount_percent,
                toll_charge: profile.toll_charge,
            });
            RouteEstimate {
                route: profile.kind,
                distance_km: round_money(distance_km),
                duration_min: round_money(duration_min),
                fare,
            }
        })
        .collect()
}

/// The estimate used when a trip is requested: the fastest route variant.
pub fn trip_estimate(
    pickup_lat: f64,
    pickup_lng: f64,
    dropoff_lat: f64,
    dropoff_lng: f64,
    vehicle_class: &VehicleClass,
    surge: f64,
    discount_percent: f64,
) -> RouteEstimate {
    route_estimates(
        pickup_lat,
        pickup_lng,
        dropoff_lat,
        dropoff_lng,
        vehicle_class,
        surge,
        discount_percent,
    )
    .into_iter()
    .next()
    .expect("route profiles are non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn fare_formula_matches_breakdown() {
        let fare = estimate_fare(&FareInput {
            vehicle_class: &VehicleClass::Sedan,
            distance_km: 10.0,
            duration_min: 20.0,
            surge_multiplier: 1.5,
            discount_percent: 10.0,
            toll_charge: 50.0,
        });

        // subtotal = 45 + 120 + 40 + 50 = 255; surge = 127.5; discount = 38.25
        assert_eq!(fare.distance_fare, 120.0);
        assert_eq!(fare.time_fare, 40.0);
        assert_eq!(fare.surge_fare, 127.5);
        assert_eq!(fare.discount, 38.25);
        assert_eq!(fare.total, 344.25);
    }

    #[test]
    fn total_never_drops_below_min_fare() {
        let mut rng = rand::thread_rng();
        for class in [
            VehicleClass::Economy,
            VehicleClass::Sedan,
            VehicleClass::Suv,
            VehicleClass::Luxury,
        ] {
            let min_fare = rate_card(&class).min_fare;
            for _ in 0..200 {
                let fare = estimate_fare(&FareInput {
                    vehicle_class: &class,
                    distance_km: rng.gen_range(0.0..3.0),
                    duration_min: rng.gen_range(0.0..10.0),
                    surge_multiplier: rng.gen_range(1.0..2.0),
                    discount_percent: rng.gen_range(0.0..100.0),
                    toll_charge: 0.0,
                });
                assert!(fare.total >= min_fare);
            }
        }
    }

    #[test]
    fn full_discount_still_charges_min_fare() {
        let fare = estimate_fare(&FareInput {
            vehicle_class: &VehicleClass::Economy,
            distance_km: 5.0,
            duration_min: 12.0,
            surge_multiplier: 1.0,
            discount_percent: 100.0,
            toll_charge: 0.0,
        });
        assert_eq!(fare.total, 50.0);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // 0.125 is exactly representable, so 0.125 * 100 is an exact tie.
        assert_eq!(round_money(0.125), 0.13);
        assert_eq!(round_money(-0.125), -0.13);
        assert_eq!(round_money(2.344), 2.34);
        assert_eq!(round_money(2.346), 2.35);
    }

    #[test]
    fn surge_bands() {
        assert_eq!(surge_multiplier(8), 1.4);
        assert_eq!(surge_multiplier(18), 1.5);
        assert_eq!(surge_multiplier(23), 1.2);
        assert_eq!(surge_multiplier(3), 1.2);
        assert_eq!(surge_multiplier(12), 1.0);
    }

    #[test]
    fn all_route_variants_are_estimated() {
        // Connaught Place -> IGI Airport, roughly 16 km direct
        let estimates = route_estimates(
            28.6315, 77.2167, 28.5562, 77.1000, &VehicleClass::Economy, 1.0, 0.0,
        );

        assert_eq!(estimates.len(), 3);
        assert_eq!(estimates[0].route, RouteKind::Fastest);
        // The highway variant is longer but quicker than the toll-free one.
        assert!(estimates[1].distance_km > estimates[0].distance_km);
        assert!(estimates[1].duration_min < estimates[2].duration_min);
        for estimate in &estimates {
            assert!(estimate.fare.total > 0.0);
        }
    }
}
