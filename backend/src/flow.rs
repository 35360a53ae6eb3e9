//! Page admission for the booking flow.
//!
//! A client moves Login -> Home -> Register -> Summary -> Payment -> Success.
//! Nothing but the stored flags and the draft decides whether a page may be
//! shown; a refused page names the earlier page to fall back to.

use crate::draft::BookingDraft;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything a client keeps between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClientStorage {
    #[serde(rename = "isLoggedIn", default)]
    pub is_logged_in: bool,
    #[serde(rename = "parkingData", default, skip_serializing_if = "Option::is_none")]
    pub parking_data: Option<BookingDraft>,
    #[serde(rename = "paymentComplete", default)]
    pub payment_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Login,
    Home,
    Register,
    Summary,
    Payment,
    Success,
}

impl Page {
    pub fn path(self) -> &'static str {
        match self {
            Page::Login => "/",
            Page::Home => "/home",
            Page::Register => "/register",
            Page::Summary => "/summary",
            Page::Payment => "/payment",
            Page::Success => "/success",
        }
    }

    /// Checks whether `storage` may see this page. The error is the page to
    /// redirect to instead.
    pub fn admit(self, storage: &ClientStorage) -> Result<(), Page> {
        if self == Page::Login {
            return Ok(());
        }
        if !storage.is_logged_in {
            return Err(Page::Login);
        }

        match self {
            Page::Login | Page::Home | Page::Register => Ok(()),
            Page::Summary | Page::Payment => match storage.parking_data {
                Some(_) => Ok(()),
                None => Err(Page::Register),
            },
            Page::Success => {
                if !storage.payment_complete || storage.parking_data.is_none() {
                    return Err(Page::Register);
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Coarse position in the flow, derived from storage alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Unauthenticated,
    Authenticated,
    Reviewing,
    Completed,
}

impl Stage {
    pub fn of(storage: &ClientStorage) -> Self {
        match (
            storage.is_logged_in,
            storage.parking_data.is_some(),
            storage.payment_complete,
        ) {
            (false, _, _) => Stage::Unauthenticated,
            (true, false, _) => Stage::Authenticated,
            (true, true, false) => Stage::Reviewing,
            (true, true, true) => Stage::Completed,
        }
    }
}
