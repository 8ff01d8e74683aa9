//! Answer registry — the immutable step table the flow engine walks.

use std::collections::{HashMap, HashSet};

use crate::error::RegistryError;
use crate::registry::step::{tokens, Choice, StepDefinition, StepId, StepKind};
use crate::registry::texts;

/// Ordered, validated table of wizard steps.
///
/// Built once at startup and shared read-only after that. Validation
/// guarantees the steps form a single linear chain, so the engine can follow
/// `next` links without re-checking.
#[derive(Debug, Clone)]
pub struct AnswerRegistry {
    steps: Vec<StepDefinition>,
    index: HashMap<StepId, usize>,
}

impl AnswerRegistry {
    /// The production seven-step intake table.
    pub fn standard() -> Self {
        Self::new(standard_steps()).expect("built-in step table is valid")
    }

    /// Build a registry from a step table, validating its shape.
    ///
    /// The first entry is the entry step. Every `next` link must point at a
    /// step in the table, the chain from the entry step must visit each step
    /// exactly once, and choice steps need a non-empty, duplicate-free
    /// choice set.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, RegistryError> {
        if steps.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut index = HashMap::new();
        for (pos, step) in steps.iter().enumerate() {
            if index.insert(step.id, pos).is_some() {
                return Err(RegistryError::DuplicateStep(step.id));
            }
        }

        for step in &steps {
            if step.kind == StepKind::Choice {
                if step.choices.is_empty() {
                    return Err(RegistryError::NoChoices(step.id));
                }
                let mut seen = HashSet::new();
                for choice in &step.choices {
                    if !seen.insert(choice.token.as_str()) {
                        return Err(RegistryError::DuplicateToken {
                            step: step.id,
                            token: choice.token.clone(),
                        });
                    }
                }
            }
            if let Some(next) = step.next {
                if !index.contains_key(&next) {
                    return Err(RegistryError::UnknownNext {
                        step: step.id,
                        next,
                    });
                }
            }
        }

        // Walk the chain from the entry step. Ids are unique, so a repeat
        // visit means a loop.
        let mut seen = HashSet::new();
        let mut cursor = Some(steps[0].id);
        while let Some(id) = cursor {
            if !seen.insert(id) {
                return Err(RegistryError::ChainCycle(id));
            }
            cursor = steps[index[&id]].next;
        }
        if seen.len() != steps.len() {
            return Err(RegistryError::BrokenChain {
                visited: seen.len(),
                total: steps.len(),
            });
        }

        Ok(Self { steps, index })
    }

    /// The entry step of the wizard.
    pub fn first_step(&self) -> &StepDefinition {
        &self.steps[0]
    }

    /// Look up a step by id.
    pub fn step(&self, id: StepId) -> Result<&StepDefinition, RegistryError> {
        self.index
            .get(&id)
            .map(|&pos| &self.steps[pos])
            .ok_or(RegistryError::UnknownStep(id))
    }

    /// All steps in table order.
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Resolve a recorded answer token to its display label.
    ///
    /// Never fails: unknown tokens, blank text answers, and unknown steps
    /// all come back as the placeholder label.
    pub fn label_for(&self, id: StepId, token: &str) -> String {
        let Some(&pos) = self.index.get(&id) else {
            return texts::UNSPECIFIED.to_string();
        };
        let step = &self.steps[pos];
        match step.kind {
            StepKind::Choice => step
                .label_of(token)
                .unwrap_or(texts::UNSPECIFIED)
                .to_string(),
            StepKind::FreeText | StepKind::Contact => {
                let trimmed = token.trim();
                if trimmed.is_empty() {
                    texts::UNSPECIFIED.to_string()
                } else {
                    trimmed.to_string()
                }
            }
        }
    }
}

/// The production step table: category through contact, in order.
fn standard_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::choice(
            StepId::Category,
            "Чем я могу вам помочь?",
            vec![
                Choice::new(tokens::RENT_APARTMENT, "Аренда квартиры"),
                Choice::new(tokens::BUY_APARTMENT, "Покупка квартиры"),
                Choice::new(tokens::RENT_HOUSE, "Аренда дома"),
                Choice::new(tokens::BUY_HOUSE, "Покупка дома"),
            ],
            Some(StepId::Rooms),
        ),
        StepDefinition::choice(
            StepId::Rooms,
            "Сколько комнат вас интересует?",
            vec![
                Choice::new(tokens::ROOMS_1, "1 комната"),
                Choice::new(tokens::ROOMS_2, "2 комнаты"),
                Choice::new(tokens::ROOMS_3, "3 комнаты"),
                Choice::new(tokens::ROOMS_4_PLUS, "4+ комнат"),
            ],
            Some(StepId::District),
        ),
        StepDefinition::choice(
            StepId::District,
            "Какой район вам подходит?",
            vec![
                Choice::new(tokens::CENTRAL_DISTRICT, "Центральный район"),
                Choice::new(tokens::WESTERN_DISTRICT, "Западный район"),
                Choice::new(tokens::EASTERN_DISTRICT, "Восточный район"),
                Choice::new(tokens::SUBURBS, "Пригород"),
            ],
            Some(StepId::Renovation),
        ),
        StepDefinition::choice(
            StepId::Renovation,
            "Какой ремонт вы рассматриваете?",
            vec![
                Choice::new(tokens::COSMETIC_RENOVATION, "Косметический ремонт"),
                Choice::new(tokens::EURO_RENOVATION, "Евроремонт"),
                Choice::new(tokens::DESIGNER_RENOVATION, "Дизайнерский ремонт"),
                Choice::new(tokens::NO_RENOVATION, "Без ремонта"),
            ],
            Some(StepId::Budget),
        ),
        StepDefinition::choice(
            StepId::Budget,
            "Какой у вас бюджет?",
            vec![
                Choice::new(tokens::BUDGET_TO_10K, "До 10 000"),
                Choice::new(tokens::BUDGET_10K_20K, "10 000 - 20 000"),
                Choice::new(tokens::BUDGET_20K_40K, "20 000 - 40 000"),
                Choice::new(tokens::BUDGET_40K_PLUS, "Более 40 000"),
            ],
            Some(StepId::Payment),
        ),
        StepDefinition::choice(
            StepId::Payment,
            "Какой способ оплаты вам удобен?",
            vec![
                Choice::new(tokens::PAYMENT_CASH, "Наличные"),
                Choice::new(tokens::PAYMENT_CARD, "Безналичный расчёт"),
                Choice::new(tokens::PAYMENT_INSTALLMENTS, "Рассрочка"),
                Choice::new(tokens::PAYMENT_MORTGAGE, "Ипотека"),
            ],
            Some(StepId::Contact),
        ),
        StepDefinition::contact(
            StepId::Contact,
            "Пожалуйста, оставьте свой контактный номер или напишите, как с вами связаться.",
            None,
        ),
    ]
}
