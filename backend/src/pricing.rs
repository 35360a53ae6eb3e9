use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

const ELECTRIC_RATE: u64 = 50;
const NORMAL_RATE: u64 = 40;

// (minimum hours, percent), checked from the top
const DISCOUNT_TIERS: [(u32, u64); 2] = [(24, 20), (12, 10)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CarType {
    Electric,
    Normal,
}

impl CarType {
    /// Hourly rate in rupees.
    pub fn base_rate(self) -> u64 {
        match self {
            CarType::Electric => ELECTRIC_RATE,
            CarType::Normal => NORMAL_RATE,
        }
    }
}

impl TryFrom<&str> for CarType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "electric" => Ok(CarType::Electric),
            "normal" => Ok(CarType::Normal),
            other => Err(format!("Unknown car type: {}", other)),
        }
    }
}

impl fmt::Display for CarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarType::Electric => write!(f, "electric"),
            CarType::Normal => write!(f, "normal"),
        }
    }
}

/// Price breakdown for a stay. All amounts are whole rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub hours: u32,
    pub car_type: CarType,
    pub base_rate: u64,
    pub amount: u64,
    pub discount_percent: u64,
    pub final_amount: u64,
}

impl Quote {
    pub fn discount(&self) -> u64 {
        self.amount - self.final_amount
    }
}

/// Reads the leading integer of a form value the way a browser form does:
/// "12abc" is 12, "3.9" is 3, anything without leading digits is 0.
/// Negative input is treated as 0 and oversized input saturates.
pub fn parse_hours(input: &str) -> u32 {
    let trimmed = input.trim_start();
    let digits = match trimmed.strip_prefix('+') {
        Some(rest) => rest,
        None if trimmed.starts_with('-') => return 0,
        None => trimmed,
    };

    digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |acc, b| {
            acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
        })
}

pub fn discount_percent(hours: u32) -> u64 {
    DISCOUNT_TIERS
        .iter()
        .find(|(min_hours, _)| hours >= *min_hours)
        .map(|(_, percent)| *percent)
        .unwrap_or(0)
}

pub fn quote(hours: u32, car_type: CarType) -> Quote {
    let base_rate = car_type.base_rate();
    let amount = u64::from(hours) * base_rate;
    let discount_percent = discount_percent(hours);
    let final_amount = amount - amount * discount_percent / 100;

    Quote {
        hours,
        car_type,
        base_rate,
        amount,
        discount_percent,
        final_amount,
    }
}

/// Quote straight from the raw form value.
pub fn quote_str(hours: &str, car_type: CarType) -> Quote {
    quote(parse_hours(hours), car_type)
}
