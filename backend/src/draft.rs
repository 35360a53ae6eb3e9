use crate::pricing::{self, CarType, Quote};
use crate::spots;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const MISSING_FIELDS: &str = "Please fill in all fields";

/// Registration form as submitted. Every field arrives as text.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftForm {
    pub owner_name: String,
    pub car_number: String,
    pub parking_hours: String,
    pub car_type: String,
    pub parking_spot: String,
}

/// A reservation that has been registered but not yet finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub owner_name: String,
    pub car_number: String,
    pub parking_hours: String,
    pub car_type: CarType,
    pub parking_spot: String,
}

impl BookingDraft {
    pub fn quote(&self) -> Quote {
        pricing::quote_str(&self.parking_hours, self.car_type)
    }
}

impl TryFrom<DraftForm> for BookingDraft {
    type Error = String;

    fn try_from(form: DraftForm) -> Result<Self, Self::Error> {
        let fields = [
            &form.owner_name,
            &form.car_number,
            &form.parking_hours,
            &form.car_type,
            &form.parking_spot,
        ];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(MISSING_FIELDS.to_string());
        }

        let car_type = CarType::try_from(form.car_type.trim())?;

        if pricing::parse_hours(&form.parking_hours) == 0 {
            return Err("Parking hours must be at least 1".to_string());
        }

        let spot = spots::bookable(form.parking_spot.trim())?;

        Ok(Self {
            owner_name: form.owner_name.trim().to_string(),
            car_number: form.car_number.trim().to_string(),
            parking_hours: form.parking_hours,
            car_type,
            parking_spot: spot.id.to_string(),
        })
    }
}
