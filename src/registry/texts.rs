//! User-facing message texts.
//!
//! Everything the bot says lives here, in the Russian wording the agency
//! runs in production. Transports compose these with step prompts from the
//! registry; no other module hardcodes user-visible text.

/// Sent when the user cancels the conversation.
pub const CANCEL_NOTICE: &str = "Разговор отменён. Вы можете начать заново, отправив /start.";

/// Sent when the very first choice is not recognized. The conversation ends.
pub const UNKNOWN_CHOICE_APOLOGY: &str = "Извините, я не понимаю ваш выбор.";

/// Prefixed to a repeated question after an unrecognized choice mid-flow.
pub const UNKNOWN_CHOICE_RETRY: &str =
    "Такого варианта нет. Пожалуйста, выберите один из предложенных.";

/// Prefixed to a repeated question after empty input on a text step.
pub const TEXT_REQUIRED: &str = "Пожалуйста, отправьте ответ текстом.";

/// First line of the completed-lead summary.
pub const SUMMARY_HEADER: &str = "Спасибо! Ваша заявка:";

/// Closing line of the completed-lead summary.
pub const SUMMARY_FOOTER: &str = "Мы свяжемся с вами в ближайшее время.";

/// Shown in the summary when the listings lookup found something.
pub const MATCHES_HEADER: &str = "Возможно, вам подойдёт:";

/// Shown in the summary when the listings lookup came back empty.
pub const NO_MATCHES: &str = "Подходящих объявлений пока не найдено.";

/// Placeholder label for an answer that cannot be resolved.
pub const UNSPECIFIED: &str = "не указано";

/// Generic failure reply when an update cannot be processed.
pub const PROCESSING_FAILED: &str =
    "Извините, не удалось обработать ваш запрос. Попробуйте ещё раз позже.";

/// Reply to the /help command.
pub const HELP: &str = "Я могу помочь вам с выбором:\n\
    - Аренда квартиры\n\
    - Покупка квартиры\n\
    - Аренда дома\n\
    - Покупка дома\n\n\
    Пожалуйста, используйте кнопки ниже или отправьте /start для повторного отображения меню.";

/// Greeting line that opens a fresh conversation.
pub fn greeting(first_name: Option<&str>) -> String {
    match first_name {
        Some(name) if !name.trim().is_empty() => format!("Здравствуйте, {}!", name.trim()),
        _ => "Здравствуйте!".to_string(),
    }
}
