use crate::authenticate::{ClientId, LoginPayload};
use crate::config::Config;
use crate::draft::{BookingDraft, DraftForm};
use crate::error::FlowError;
use crate::flow::{ClientStorage, Page, Stage};
use crate::json_db::{JsonDb, JsonDbOptions};
use crate::payment::{MockPayments, PaymentMethod, PaymentReceipt};
use crate::pricing::{self, CarType, Quote};
use crate::spots::{self, ParkingSpot};
use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

type Storages = HashMap<ClientId, ClientStorage>;

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub message: String,
    pub next: String,
}

impl Navigation {
    fn to(page: Page, message: &str) -> Self {
        Self {
            message: message.to_string(),
            next: page.path().to_string(),
        }
    }
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_logged_in: bool,
    pub payment_complete: bool,
    pub has_draft: bool,
    pub stage: Stage,
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stage: Stage,
    pub pending_draft: Option<BookingDraft>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub parking_hours: String,
    #[serde(default)]
    pub car_type: String,
}

/// A draft together with its price, as shown on the summary and payment
/// pages.
#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub draft: BookingDraft,
    pub quote: Quote,
}

impl From<BookingDraft> for DraftView {
    fn from(draft: BookingDraft) -> Self {
        let quote = draft.quote();
        Self { draft, quote }
    }
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub receipt: PaymentReceipt,
    pub next: String,
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub draft: BookingDraft,
    pub quote: Quote,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FinishTarget {
    Home,
    Register,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FinishPayload {
    pub next: FinishTarget,
}

/// Runs the booking flow for every client against the shared store.
pub struct ParkingApp {
    storages: JsonDb<Storages>,
    payments: MockPayments,
    login_delay: Duration,
}

impl ParkingApp {
    pub async fn from_config(config: &Config) -> Result<Self> {
        info!("Loading client storage from: {}", config.store_path.display());
        let opts = JsonDbOptions {
            write_delay: config.store_write_delay,
        };
        let storages = JsonDb::open_opts(&config.store_path, opts).await?;

        Ok(Self {
            storages,
            payments: MockPayments::new(config.payment_delay),
            login_delay: config.login_delay,
        })
    }

    pub async fn flush(&self) -> Result<()> {
        self.storages.flush().await
    }

    fn storage(&self, client: &ClientId) -> ClientStorage {
        self.storages
            .read(|all| all.get(client).cloned())
            .unwrap_or_default()
    }

    fn update<R>(&self, client: &ClientId, f: impl FnOnce(&mut ClientStorage) -> R) -> R {
        self.storages.update(|all| {
            let storage = all.entry(client.clone()).or_default();
            let res = f(storage);
            // an empty record reads the same as a missing one
            if *storage == ClientStorage::default() {
                all.remove(client);
            }
            res
        })
    }

    /// Loads the client's storage if it may see `page`.
    fn enter(&self, client: &ClientId, page: Page) -> Result<ClientStorage, FlowError> {
        let storage = self.storage(client);
        page.admit(&storage).map_err(|redirect| {
            debug!("{} refused, redirecting to {}", page, redirect);
            redirect
        })?;
        Ok(storage)
    }

    fn draft_of(storage: ClientStorage) -> Result<BookingDraft, FlowError> {
        storage.parking_data.ok_or(FlowError::Redirect(Page::Register))
    }

    pub async fn login(
        &self,
        client: &ClientId,
        payload: LoginPayload,
    ) -> Result<Navigation, FlowError> {
        payload.validate().map_err(FlowError::Validation)?;

        tokio::time::sleep(self.login_delay).await;
        self.update(client, |storage| storage.is_logged_in = true);
        info!("Client logged in");
        Ok(Navigation::to(Page::Home, "Login successful!"))
    }

    pub fn logout(&self, client: &ClientId) -> Navigation {
        self.update(client, |storage| storage.is_logged_in = false);
        Navigation::to(Page::Login, "Logged out")
    }

    pub fn status(&self, client: &ClientId) -> SessionStatus {
        let storage = self.storage(client);
        SessionStatus {
            is_logged_in: storage.is_logged_in,
            payment_complete: storage.payment_complete,
            has_draft: storage.parking_data.is_some(),
            stage: Stage::of(&storage),
        }
    }

    pub fn home(&self, client: &ClientId) -> Result<Dashboard, FlowError> {
        let storage = self.enter(client, Page::Home)?;
        Ok(Dashboard {
            stage: Stage::of(&storage),
            pending_draft: storage.parking_data,
        })
    }

    pub fn spots(&self, client: &ClientId) -> Result<&'static [ParkingSpot], FlowError> {
        self.enter(client, Page::Register)?;
        Ok(spots::catalog())
    }

    pub fn quote(request: &QuoteRequest) -> Result<Quote, FlowError> {
        if request.parking_hours.is_empty() || request.car_type.is_empty() {
            return Err(FlowError::Validation(
                "Parking hours and car type are required".to_string(),
            ));
        }
        let car_type =
            CarType::try_from(request.car_type.trim()).map_err(FlowError::Validation)?;
        Ok(pricing::quote_str(&request.parking_hours, car_type))
    }

    pub fn register(&self, client: &ClientId, form: DraftForm) -> Result<DraftView, FlowError> {
        self.enter(client, Page::Register)?;
        let draft = BookingDraft::try_from(form).map_err(FlowError::Validation)?;

        info!(
            "Registering {} for {} hours at {}",
            draft.car_number, draft.parking_hours, draft.parking_spot
        );
        self.update(client, |storage| {
            storage.parking_data = Some(draft.clone());
            // a new draft has not been paid for
            storage.payment_complete = false;
        });
        Ok(draft.into())
    }

    pub fn summary(&self, client: &ClientId) -> Result<DraftView, FlowError> {
        let storage = self.enter(client, Page::Summary)?;
        Ok(Self::draft_of(storage)?.into())
    }

    pub fn payment(&self, client: &ClientId) -> Result<DraftView, FlowError> {
        let storage = self.enter(client, Page::Payment)?;
        Ok(Self::draft_of(storage)?.into())
    }

    pub async fn pay(
        &self,
        client: &ClientId,
        method: PaymentMethod,
    ) -> Result<PaymentResult, FlowError> {
        let storage = self.enter(client, Page::Payment)?;
        let charged = Self::draft_of(storage)?;
        method.validate().map_err(FlowError::Validation)?;

        let receipt = self
            .payments
            .charge(&method, charged.quote().final_amount)
            .await;

        // the draft may have been cleared or replaced while the payment was processing
        self.update(client, |storage| {
            if storage.parking_data.as_ref() != Some(&charged) {
                info!("Draft changed during payment {}", receipt.reference);
                return Err(FlowError::Redirect(Page::Register));
            }
            storage.payment_complete = true;
            Ok(())
        })?;

        Ok(PaymentResult {
            receipt,
            next: Page::Success.path().to_string(),
        })
    }

    /// Shows the confirmation once. The payment flag is consumed, so a second
    /// visit falls back to registration.
    pub fn success(&self, client: &ClientId) -> Result<Confirmation, FlowError> {
        let storage = self.enter(client, Page::Success)?;
        let draft = Self::draft_of(storage)?;

        self.update(client, |storage| storage.payment_complete = false);

        let message = format!(
            "A confirmation has been sent. Please park your vehicle at spot {}",
            draft.parking_spot
        );
        Ok(Confirmation {
            quote: draft.quote(),
            draft,
            message,
        })
    }

    pub fn finish(&self, client: &ClientId, target: FinishTarget) -> Result<Navigation, FlowError> {
        self.enter(client, Page::Home)?;
        self.update(client, |storage| storage.parking_data = None);

        Ok(match target {
            FinishTarget::Home => Navigation::to(Page::Home, "Booking closed"),
            FinishTarget::Register => Navigation::to(Page::Register, "Register another car"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{CardDetails, PhonePeDetails};

    fn config() -> Config {
        let path = std::env::temp_dir()
            .join(format!("parkbook-booker-{}", rand::random::<u64>()))
            .join("storage.json");
        Config::instant(path)
    }

    async fn app() -> ParkingApp {
        ParkingApp::from_config(&config()).await.unwrap()
    }

    fn records(app: &ParkingApp) -> usize {
        app.storages.read(|all| all.len())
    }

    fn form(spot: &str) -> DraftForm {
        DraftForm {
            owner_name: "Ravi Kumar".to_string(),
            car_number: "DL 3C AB 9090".to_string(),
            parking_hours: "24".to_string(),
            car_type: "electric".to_string(),
            parking_spot: spot.to_string(),
        }
    }

    fn upi() -> PaymentMethod {
        PaymentMethod::PhonePe(PhonePeDetails {
            upi_id: "ravi@ybl".to_string(),
        })
    }

    async fn logged_in(app: &ParkingApp) -> ClientId {
        let client = ClientId::generate();
        let payload = LoginPayload {
            email: "ravi@example.com".to_string(),
            password: "pw".to_string(),
        };
        app.login(&client, payload).await.unwrap();
        client
    }

    fn redirect<T>(result: Result<T, FlowError>) -> Option<Page> {
        match result {
            Err(FlowError::Redirect(page)) => Some(page),
            _ => None,
        }
    }

    #[tokio::test]
    async fn anonymous_client_is_sent_to_login() {
        let app = app().await;
        let client = ClientId::generate();
        assert_eq!(redirect(app.home(&client)), Some(Page::Login));
        assert_eq!(redirect(app.register(&client, form("A1"))), Some(Page::Login));
        assert_eq!(redirect(app.payment(&client)), Some(Page::Login));
        assert_eq!(redirect(app.success(&client)), Some(Page::Login));
    }

    #[tokio::test]
    async fn login_rejects_blank_credentials() {
        let app = app().await;
        let client = ClientId::generate();
        let payload = LoginPayload {
            email: String::new(),
            password: "pw".to_string(),
        };
        assert!(matches!(
            app.login(&client, payload).await,
            Err(FlowError::Validation(_))
        ));
        assert!(!app.status(&client).is_logged_in);
    }

    #[tokio::test]
    async fn full_flow_charges_the_discounted_amount() {
        let app = app().await;
        let client = logged_in(&app).await;
        assert_eq!(app.status(&client).stage, Stage::Authenticated);

        let view = app.register(&client, form("C4")).unwrap();
        assert_eq!(view.quote.final_amount, 960);
        assert_eq!(app.status(&client).stage, Stage::Reviewing);
        assert_eq!(app.summary(&client).unwrap().draft.parking_spot, "C4");

        let paid = app.pay(&client, upi()).await.unwrap();
        assert_eq!(paid.receipt.amount, 960);
        assert_eq!(paid.next, "/success");
        assert_eq!(app.status(&client).stage, Stage::Completed);

        let confirmation = app.success(&client).unwrap();
        assert!(confirmation.message.ends_with("spot C4"));

        // the flag is consumed by the first visit
        assert_eq!(redirect(app.success(&client)), Some(Page::Register));

        let next = app.finish(&client, FinishTarget::Home).unwrap();
        assert_eq!(next.next, "/home");
        assert!(!app.status(&client).has_draft);
    }

    #[tokio::test]
    async fn success_without_payment_goes_back_to_register() {
        let app = app().await;
        let client = logged_in(&app).await;
        app.register(&client, form("A1")).unwrap();
        assert_eq!(redirect(app.success(&client)), Some(Page::Register));
    }

    #[tokio::test]
    async fn payment_without_draft_goes_back_to_register() {
        let app = app().await;
        let client = logged_in(&app).await;
        assert_eq!(redirect(app.payment(&client)), Some(Page::Register));
        assert_eq!(redirect(app.pay(&client, upi()).await), Some(Page::Register));
    }

    #[tokio::test]
    async fn incomplete_card_is_not_charged() {
        let app = app().await;
        let client = logged_in(&app).await;
        app.register(&client, form("B3")).unwrap();

        let card = PaymentMethod::Card(CardDetails {
            card_number: "4111111111111111".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            app.pay(&client, card).await,
            Err(FlowError::Validation(_))
        ));
        assert!(!app.status(&client).payment_complete);
    }

    #[tokio::test]
    async fn clients_do_not_share_storage() {
        let app = app().await;
        let first = logged_in(&app).await;
        let second = ClientId::generate();
        app.register(&first, form("A2")).unwrap();

        assert!(app.status(&first).has_draft);
        assert!(!app.status(&second).is_logged_in);
        assert!(!app.status(&second).has_draft);
    }

    #[tokio::test]
    async fn logout_keeps_the_draft() {
        let app = app().await;
        let client = logged_in(&app).await;
        app.register(&client, form("A2")).unwrap();
        app.logout(&client);

        let status = app.status(&client);
        assert!(!status.is_logged_in);
        assert!(status.has_draft);
        assert_eq!(status.stage, Stage::Unauthenticated);
    }

    #[tokio::test]
    async fn new_draft_is_not_covered_by_an_earlier_payment() {
        let app = app().await;
        let client = logged_in(&app).await;
        app.register(&client, form("A1")).unwrap();
        app.pay(&client, upi()).await.unwrap();

        app.register(&client, form("B1")).unwrap();
        assert!(!app.status(&client).payment_complete);
        assert_eq!(redirect(app.success(&client)), Some(Page::Register));
    }

    #[tokio::test]
    async fn draft_replaced_during_payment_stays_unpaid() {
        let mut config = config();
        config.payment_delay = Duration::from_millis(200);
        let app = ParkingApp::from_config(&config).await.unwrap();
        let client = logged_in(&app).await;

        let mut cheap = form("A1");
        cheap.parking_hours = "1".to_string();
        cheap.car_type = "normal".to_string();
        app.register(&client, cheap).unwrap();

        let mut dear = form("A2");
        dear.parking_hours = "48".to_string();
        let (paid, registered) = tokio::join!(app.pay(&client, upi()), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            app.register(&client, dear)
        });

        assert_eq!(registered.unwrap().quote.final_amount, 1920);
        assert_eq!(redirect(paid), Some(Page::Register));
        assert!(!app.status(&client).payment_complete);
        assert_eq!(redirect(app.success(&client)), Some(Page::Register));
    }

    #[tokio::test]
    async fn anonymous_requests_leave_no_records() {
        let app = app().await;
        for _ in 0..1000 {
            app.logout(&ClientId::generate());
        }
        assert_eq!(records(&app), 0);

        let client = logged_in(&app).await;
        assert_eq!(records(&app), 1);
        app.logout(&client);
        assert_eq!(records(&app), 0);
    }

    #[test]
    fn blank_hours_quote_as_zero() {
        let request = QuoteRequest {
            parking_hours: "  ".to_string(),
            car_type: "electric".to_string(),
        };
        let quote = ParkingApp::quote(&request).unwrap();
        assert_eq!(quote.hours, 0);
        assert_eq!(quote.final_amount, 0);
    }

    #[test]
    fn quote_requires_both_fields() {
        let request = QuoteRequest {
            parking_hours: "12".to_string(),
            car_type: String::new(),
        };
        assert!(ParkingApp::quote(&request).is_err());

        let request = QuoteRequest {
            parking_hours: "ten".to_string(),
            car_type: "normal".to_string(),
        };
        assert_eq!(ParkingApp::quote(&request).unwrap().amount, 0);
    }
}
