//! Step definitions for the intake wizard.

use serde::{Deserialize, Serialize};

/// Identifier of one question in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Category,
    Rooms,
    District,
    Renovation,
    Budget,
    Payment,
    Contact,
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepId::Category => "category",
            StepId::Rooms => "rooms",
            StepId::District => "district",
            StepId::Renovation => "renovation",
            StepId::Budget => "budget",
            StepId::Payment => "payment",
            StepId::Contact => "contact",
        };
        write!(f, "{}", s)
    }
}

/// How a step expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// One of a fixed token set, rendered as buttons.
    Choice,
    /// Any non-empty text.
    FreeText,
    /// A phone number or free text; a shared phone number wins over text.
    Contact,
}

/// One selectable option of a choice step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Raw token carried in callback data and recorded as the answer.
    pub token: String,
    /// Label shown on the button and echoed in the summary.
    pub label: String,
}

impl Choice {
    pub fn new(token: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            label: label.into(),
        }
    }
}

/// Immutable definition of one wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: StepId,
    /// Question text sent to the user.
    pub prompt: String,
    pub kind: StepKind,
    /// Empty for non-choice steps.
    pub choices: Vec<Choice>,
    /// Step that follows an accepted answer; `None` completes the wizard.
    pub next: Option<StepId>,
}

impl StepDefinition {
    pub fn choice(
        id: StepId,
        prompt: impl Into<String>,
        choices: Vec<Choice>,
        next: Option<StepId>,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            kind: StepKind::Choice,
            choices,
            next,
        }
    }

    pub fn free_text(id: StepId, prompt: impl Into<String>, next: Option<StepId>) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            kind: StepKind::FreeText,
            choices: Vec::new(),
            next,
        }
    }

    pub fn contact(id: StepId, prompt: impl Into<String>, next: Option<StepId>) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            kind: StepKind::Contact,
            choices: Vec::new(),
            next,
        }
    }

    /// Whether `token` is one of this step's choices.
    pub fn has_token(&self, token: &str) -> bool {
        self.choices.iter().any(|c| c.token == token)
    }

    /// Label of the choice carrying `token`, if any.
    pub fn label_of(&self, token: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| c.token == token)
            .map(|c| c.label.as_str())
    }
}

/// Answer tokens used by the standard step table.
///
/// Tokens are the stable wire identifiers: they ride in callback data, are
/// recorded as answers, and drive the listings query derivation.
pub mod tokens {
    pub const RENT_APARTMENT: &str = "rent_apartment";
    pub const BUY_APARTMENT: &str = "buy_apartment";
    pub const RENT_HOUSE: &str = "rent_house";
    pub const BUY_HOUSE: &str = "buy_house";

    pub const ROOMS_1: &str = "1_room";
    pub const ROOMS_2: &str = "2_rooms";
    pub const ROOMS_3: &str = "3_rooms";
    pub const ROOMS_4_PLUS: &str = "4_plus_rooms";

    pub const CENTRAL_DISTRICT: &str = "central_district";
    pub const WESTERN_DISTRICT: &str = "western_district";
    pub const EASTERN_DISTRICT: &str = "eastern_district";
    pub const SUBURBS: &str = "suburbs";

    pub const COSMETIC_RENOVATION: &str = "cosmetic_renovation";
    pub const EURO_RENOVATION: &str = "euro_renovation";
    pub const DESIGNER_RENOVATION: &str = "designer_renovation";
    pub const NO_RENOVATION: &str = "no_renovation";

    pub const BUDGET_TO_10K: &str = "budget_to_10k";
    pub const BUDGET_10K_20K: &str = "budget_10k_20k";
    pub const BUDGET_20K_40K: &str = "budget_20k_40k";
    pub const BUDGET_40K_PLUS: &str = "budget_40k_plus";

    pub const PAYMENT_CASH: &str = "payment_cash";
    pub const PAYMENT_CARD: &str = "payment_card";
    pub const PAYMENT_INSTALLMENTS: &str = "payment_installments";
    pub const PAYMENT_MORTGAGE: &str = "payment_mortgage";
}
