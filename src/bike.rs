//! Bike order payloads and the random order generator.
//!
//! Payloads travel through the orchestration as JSON strings, so every type
//! here round-trips through `serde_json` with camelCase field names.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BIKE_PART_NAMES: [&str; 20] = [
    "wheel",
    "rim",
    "tire",
    "brake",
    "seat",
    "cassette",
    "rear-derailleur",
    "front-derailleur",
    "chain",
    "chainring",
    "crankset",
    "pedal",
    "headset",
    "stem",
    "handlerbar",
    "fork",
    "frame",
    "hub",
    "bottle-cage",
    "disk",
];

pub const BIKE_MODELS: [&str; 10] = [
    "mtb-xc",
    "mtb-trail",
    "mtb-enduro",
    "mtb-downhill",
    "bdc-aero",
    "bdc-endurance",
    "gravel",
    "ciclocross",
    "trekking",
    "urban",
];

pub const MIN_PRICE: u32 = 200;
pub const MAX_PRICE: u32 = 10_000;
pub const MIN_PARTS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikePart {
    pub id: String,
    pub name: String,
    pub code: String,
}

/// An incoming bike order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bike {
    pub id: String,
    pub price: u32,
    pub model: String,
    pub parts: Vec<BikePart>,
}

/// Output of the `AssembleBike` activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledBike {
    pub id: String,
    pub model: String,
    pub message: String,
}

/// Output of the `ShipBike` activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippedBike {
    pub id: String,
    pub model: String,
    pub message: String,
}

/// Source of order payloads for scheduled orchestrations.
pub trait OrderGenerator: Send + Sync {
    /// Produce a fresh order. A non-empty `model_hint` pins the model.
    fn generate_order(&self, model_hint: Option<&str>) -> Bike;
}

/// Generates randomized bikes from the shop catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct BikeFactory;

impl BikeFactory {
    pub fn new() -> Self {
        Self
    }

    fn generate_part<R: Rng + ?Sized>(rng: &mut R) -> BikePart {
        let name = BIKE_PART_NAMES
            .choose(rng)
            .copied()
            .unwrap_or(BIKE_PART_NAMES[0]);
        BikePart {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            code: ean8(rng),
        }
    }
}

impl OrderGenerator for BikeFactory {
    fn generate_order(&self, model_hint: Option<&str>) -> Bike {
        let mut rng = rand::thread_rng();

        let model = match model_hint {
            Some(hint) if !hint.trim().is_empty() => hint.to_string(),
            _ => BIKE_MODELS
                .choose(&mut rng)
                .copied()
                .unwrap_or(BIKE_MODELS[0])
                .to_string(),
        };

        let part_count = rng.gen_range(MIN_PARTS..=BIKE_PART_NAMES.len());
        let parts = (0..part_count)
            .map(|_| Self::generate_part(&mut rng))
            .collect();

        Bike {
            id: Uuid::new_v4().to_string(),
            price: rng.gen_range(MIN_PRICE..=MAX_PRICE),
            model,
            parts,
        }
    }
}

/// Random EAN-8 code: seven random digits plus the GS1 check digit.
fn ean8<R: Rng + ?Sized>(rng: &mut R) -> String {
    let digits: Vec<u32> = (0..7).map(|_| rng.gen_range(0..10)).collect();
    let check = ean8_check_digit(&digits);
    digits
        .iter()
        .chain(std::iter::once(&check))
        .map(|d| char::from_digit(*d, 10).unwrap_or('0'))
        .collect()
}

/// Weights alternate 3,1,3,1... starting from the leftmost of the seven digits.
fn ean8_check_digit(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();
    (10 - sum % 10) % 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_bike_stays_within_catalogue() {
        let factory = BikeFactory::new();
        for _ in 0..50 {
            let bike = factory.generate_order(None);
            assert!(BIKE_MODELS.contains(&bike.model.as_str()));
            assert!((MIN_PRICE..=MAX_PRICE).contains(&bike.price));
            assert!((MIN_PARTS..=BIKE_PART_NAMES.len()).contains(&bike.parts.len()));
            for part in &bike.parts {
                assert!(BIKE_PART_NAMES.contains(&part.name.as_str()));
                assert_eq!(part.code.len(), 8);
            }
        }
    }

    #[test]
    fn model_hint_is_honoured_unless_blank() {
        let factory = BikeFactory::new();
        assert_eq!(factory.generate_order(Some("custom-fatbike")).model, "custom-fatbike");
        assert!(BIKE_MODELS.contains(&factory.generate_order(Some("  ")).model.as_str()));
    }

    #[test]
    fn ids_are_unique_per_order() {
        let factory = BikeFactory::new();
        let a = factory.generate_order(None);
        let b = factory.generate_order(None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn ean8_check_digit_matches_known_code() {
        // 9638507-4 is a published EAN-8 sample.
        assert_eq!(ean8_check_digit(&[9, 6, 3, 8, 5, 0, 7]), 4);
        let mut rng = rand::thread_rng();
        let code = ean8(&mut rng);
        let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
        assert_eq!(digits.len(), 8);
        assert_eq!(ean8_check_digit(&digits[..7]), digits[7]);
    }

    #[test]
    fn bike_serializes_with_camel_case_fields() {
        let bike = Bike {
            id: "b-1".to_string(),
            price: 500,
            model: "gravel".to_string(),
            parts: vec![],
        };
        let json = serde_json::to_value(&bike).unwrap();
        assert_eq!(json["model"], "gravel");
        assert!(json.get("parts").is_some());
    }
}
