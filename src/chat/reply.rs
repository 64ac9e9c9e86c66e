//! Plan-gated reply templates. Deterministic; no external NLU.

use crate::auth::Plan;
use crate::error::ApiError;

/// Case-insensitive triggers for the domestic-violence advisory.
const VIOLENCE_KEYWORDS: &[&str] = &["feminicidio", "violencia"];

pub const VIOLENCE_ADVISORY: &str =
    "- Parece un asunto de violencia familiar. \
     Considera recopilar evidencia y acudir a las autoridades.";

/// Only blank input is rejected; the message is echoed as sent.
pub fn generate(plan: Plan, name: &str, message: &str) -> Result<String, ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    let reply = match plan {
        Plan::Gratuito => format!(
            "Hola {name}. Versión gratuita:\n\
             He recibido tu pregunta: \"{message}\". Te doy una guía básica: revisa la normativa \
             aplicable y consulta a un profesional si es un caso complejo."
        ),
        Plan::Premium => {
            let mut reply = format!(
                "Hola {name}. Versión premium:\nGracias por tu consulta. Análisis preliminar:\n"
            );
            if mentions_violence(message) {
                reply.push_str(VIOLENCE_ADVISORY);
                reply.push('\n');
            }
            reply.push_str(
                "Si quieres, exporto un borrador de documento o te conecto con un abogado.\n",
            );
            reply
        }
    };
    Ok(reply)
}

fn mentions_violence(message: &str) -> bool {
    let lower = message.to_lowercase();
    VIOLENCE_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_reply_echoes_message_without_advisory() {
        let reply = generate(Plan::Gratuito, "Ana", "¿Qué hago?").unwrap();
        assert!(reply.starts_with("Hola Ana. Versión gratuita:"));
        assert!(reply.contains("\"¿Qué hago?\""));
        assert!(!reply.contains(VIOLENCE_ADVISORY));
    }

    #[test]
    fn free_reply_keeps_surrounding_whitespace() {
        let reply = generate(Plan::Gratuito, "Ana", "  hola ").unwrap();
        assert!(reply.contains("\"  hola \""));
    }

    #[test]
    fn free_reply_ignores_keywords() {
        let reply = generate(Plan::Gratuito, "Ana", "sufro violencia").unwrap();
        assert!(!reply.contains(VIOLENCE_ADVISORY));
    }

    #[test]
    fn premium_reply_adds_advisory_on_keyword() {
        let reply = generate(Plan::Premium, "Ana", "Hay VIOLENCIA en casa").unwrap();
        assert!(reply.starts_with("Hola Ana. Versión premium:"));
        assert!(reply.contains(VIOLENCE_ADVISORY));

        let reply = generate(Plan::Premium, "Ana", "caso de feminicidio").unwrap();
        assert!(reply.contains(VIOLENCE_ADVISORY));
    }

    #[test]
    fn premium_reply_without_keyword_has_no_advisory() {
        let reply = generate(Plan::Premium, "Ana", "¿Cómo redacto un contrato?").unwrap();
        assert!(!reply.contains(VIOLENCE_ADVISORY));
        assert!(reply.ends_with("te conecto con un abogado.\n"));
    }

    #[test]
    fn premium_reply_is_longer_than_free() {
        let free = generate(Plan::Gratuito, "", "x").unwrap();
        let premium = generate(Plan::Premium, "", "violencia").unwrap();
        assert!(premium.len() > free.len());
    }

    #[test]
    fn blank_message_is_rejected() {
        assert!(matches!(generate(Plan::Premium, "Ana", ""), Err(ApiError::EmptyMessage)));
        assert!(matches!(generate(Plan::Gratuito, "Ana", "  \n "), Err(ApiError::EmptyMessage)));
    }
}
