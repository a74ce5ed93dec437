//! The fixed error taxonomy. Every crate's own
//! `thiserror` enum converts into one of these members at its outward edge;
//! the gateway is the only place a taxonomy member becomes an HTTP body, but
//! the member → Russian template mapping lives here so every crate agrees
//! on the wording without depending on the gateway crate.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTaxonomy {
    IntentTimeout,
    IntentParseError,
    IntentInvalid,
    ReferencesUnknownEntity,
    StoreTransient,
    StoreConstraint,
    SchedulerPlacementFailure,
    TransportSendFailure,
    ConfigError,
    StartupStoreUnreachable,
    UnsupportedInput,
}

impl ErrorTaxonomy {
    /// Whether this member is fatal at startup (maps to a process exit code
    /// rather than a per-request response).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorTaxonomy::ConfigError | ErrorTaxonomy::StartupStoreUnreachable
        )
    }

    /// The fixed, user-facing Russian-language template for this taxonomy
    /// member.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorTaxonomy::IntentTimeout => {
                "Не успел обработать запрос вовремя. Попробуйте ещё раз."
            }
            ErrorTaxonomy::IntentParseError => {
                "Не понял формулировку. Попробуйте переформулировать."
            }
            ErrorTaxonomy::IntentInvalid => "Не хватает данных, чтобы это выполнить.",
            ErrorTaxonomy::ReferencesUnknownEntity => {
                "Не нашёл то, о чём вы говорите. Уточните, пожалуйста."
            }
            ErrorTaxonomy::StoreTransient => "Что-то пошло не так. Попробуйте ещё раз.",
            ErrorTaxonomy::StoreConstraint => {
                "Такой элемент уже существует, действие не выполнено."
            }
            ErrorTaxonomy::SchedulerPlacementFailure => {
                "Цель сохранена, но автоматически расставить шаги по календарю не удалось."
            }
            ErrorTaxonomy::TransportSendFailure => "Не удалось отправить сообщение.",
            ErrorTaxonomy::ConfigError => "Ошибка конфигурации сервиса.",
            ErrorTaxonomy::StartupStoreUnreachable => "Хранилище данных недоступно.",
            ErrorTaxonomy::UnsupportedInput => {
                "Голосовые сообщения пока не поддерживаются. Напишите текстом."
            }
        }
    }
}

/// Implemented by every crate's top-level error enum so the gateway can map
/// any error in the workspace to the fixed taxonomy without a giant
/// `match` over foreign types at the boundary.
pub trait IntoTaxonomy {
    fn taxonomy(&self) -> ErrorTaxonomy;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_members_are_exactly_the_two_startup_errors() {
        let fatal: Vec<_> = [
            ErrorTaxonomy::IntentTimeout,
            ErrorTaxonomy::IntentParseError,
            ErrorTaxonomy::IntentInvalid,
            ErrorTaxonomy::ReferencesUnknownEntity,
            ErrorTaxonomy::StoreTransient,
            ErrorTaxonomy::StoreConstraint,
            ErrorTaxonomy::SchedulerPlacementFailure,
            ErrorTaxonomy::TransportSendFailure,
            ErrorTaxonomy::ConfigError,
            ErrorTaxonomy::StartupStoreUnreachable,
            ErrorTaxonomy::UnsupportedInput,
        ]
        .into_iter()
        .filter(|t| t.is_fatal())
        .collect();
        assert_eq!(fatal, vec![ErrorTaxonomy::ConfigError, ErrorTaxonomy::StartupStoreUnreachable]);
    }
}
