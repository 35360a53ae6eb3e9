use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PhonePeDetails {
    pub upi_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    pub card_name: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentMethod {
    #[serde(rename = "phonepe")]
    PhonePe(PhonePeDetails),
    Card(CardDetails),
}

impl PaymentMethod {
    fn label(&self) -> &'static str {
        match self {
            PaymentMethod::PhonePe(_) => "phonepe",
            PaymentMethod::Card(_) => "card",
        }
    }

    /// Required-field checks only. Nothing is verified against a processor.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            PaymentMethod::PhonePe(details) => {
                if details.upi_id.trim().is_empty() {
                    return Err("Please enter UPI ID".to_string());
                }
            }
            PaymentMethod::Card(details) => {
                let fields = [
                    &details.card_number,
                    &details.expiry_date,
                    &details.cvv,
                    &details.card_name,
                ];
                if fields.iter().any(|field| field.trim().is_empty()) {
                    return Err("Please fill in all card details".to_string());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub reference: String,
    pub method: String,
    pub amount: u64,
    pub paid_at: DateTime<Utc>,
}

/// Stand-in processor: waits, then approves every payment.
#[derive(Debug, Clone)]
pub struct MockPayments {
    delay: Duration,
}

impl MockPayments {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn charge(&self, method: &PaymentMethod, amount: u64) -> PaymentReceipt {
        debug!("Processing {} payment of {}", method.label(), amount);
        tokio::time::sleep(self.delay).await;

        let receipt = PaymentReceipt {
            reference: reference(),
            method: method.label().to_string(),
            amount,
            paid_at: Utc::now(),
        };
        info!("Payment approved: {}", receipt.reference);
        receipt
    }
}

fn reference() -> String {
    let tail: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect();
    format!("PB-{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phonepe_needs_upi_id() {
        let method: PaymentMethod = serde_json::from_str(r#"{"method":"phonepe"}"#).unwrap();
        assert_eq!(method.validate().unwrap_err(), "Please enter UPI ID");

        let method: PaymentMethod =
            serde_json::from_str(r#"{"method":"phonepe","upiId":"asha@paytm"}"#).unwrap();
        assert!(method.validate().is_ok());
    }

    #[test]
    fn card_needs_every_field() {
        let method: PaymentMethod = serde_json::from_str(
            r#"{"method":"card","cardNumber":"4111 1111 1111 1111","expiryDate":"12/28","cvv":"","cardName":"ASHA"}"#,
        )
        .unwrap();
        assert_eq!(
            method.validate().unwrap_err(),
            "Please fill in all card details"
        );
    }

    #[tokio::test]
    async fn mock_processor_always_approves() {
        let payments = MockPayments::new(Duration::ZERO);
        let method = PaymentMethod::PhonePe(PhonePeDetails {
            upi_id: "asha@upi".to_string(),
        });
        let receipt = payments.charge(&method, 960).await;
        assert_eq!(receipt.amount, 960);
        assert_eq!(receipt.method, "phonepe");
        assert!(receipt.reference.starts_with("PB-"));
        assert_eq!(receipt.reference.len(), 13);
    }
}
