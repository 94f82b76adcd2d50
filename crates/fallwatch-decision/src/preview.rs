//! Message preview
//!
//! The preview is what a recipient would read. The title is a fixed template
//! per decision; the body is the backend's reasoning, bounded in length.

use fallwatch_core::{Action, Locale, MessagePreview};

/// Maximum body length in characters, ellipsis included
pub const MAX_BODY_CHARS: usize = 280;

fn title(action: Action, locale: Locale) -> &'static str {
    match (locale, action) {
        (Locale::En, Action::NotifyCaregiver) => "Possible fall: caregiver attention needed",
        (Locale::En, Action::NotifyFamilyInfo) => "Update: prolonged time on the floor",
        (Locale::En, Action::RequestConfirmation) => "Please confirm: possible fall",
        (Locale::En, Action::Monitor) => "Monitoring: unusual movement",
        (Locale::En, Action::Ignore) => "No action needed",
        (Locale::PtBr, Action::NotifyCaregiver) => "Possível queda: atenção do cuidador necessária",
        (Locale::PtBr, Action::NotifyFamilyInfo) => "Atualização: tempo prolongado no chão",
        (Locale::PtBr, Action::RequestConfirmation) => "Por favor, confirme: possível queda",
        (Locale::PtBr, Action::Monitor) => "Monitorando: movimento incomum",
        (Locale::PtBr, Action::Ignore) => "Nenhuma ação necessária",
    }
}

fn bounded_body(reasoning: &str) -> String {
    let normalised = reasoning.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalised.chars().count() <= MAX_BODY_CHARS {
        return normalised;
    }
    let mut body: String = normalised.chars().take(MAX_BODY_CHARS - 1).collect();
    body.truncate(body.trim_end().len());
    body.push('…');
    body
}

/// Build the preview for a final decision
pub fn build_preview(final_decision: Action, reasoning: &str, locale: Locale) -> MessagePreview {
    MessagePreview {
        title: title(final_decision, locale).to_string(),
        body: bounded_body(reasoning),
        requires_ack: final_decision == Action::RequestConfirmation,
        locale,
    }
}
