//! Carrier resolution: a prioritized rule cascade with an optional AI
//! fallback. Stateless — reads only the carrier table passed in and the
//! classifier seam.

use log::warn;
use model::carrier::{self, Carrier};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::provider::TransportClassifier;

/// Minimum AI confidence accepted by the cascade.
pub const AI_CONFIDENCE_THRESHOLD: f64 = 0.85;

/// Hard-coded pickup pattern. Stable and critical, so it lives in code
/// rather than in the carrier table.
static RE_RETIRO: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"\bRETIRA\b(?:\s+(?:POR|EN))?\s*(?:COMERCIAL|DEP[OÓ]SITO|LOCAL|TIENDA|SUCURSAL)?|\bSE\s+RETIRA\b|\bRETIRO\s+CLIENTE\b|\bPASA\s+A\s+RETIRAR\b",
    )
    .case_insensitive(true)
    .build()
    .expect("static pattern")
});

/// Whether the text reads like a depot pickup.
pub fn detect_pickup(texto: &str) -> bool {
    !texto.is_empty() && RE_RETIRO.is_match(&texto.to_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Regex,
    Ai,
    Rule,
    Default,
}

impl DetectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Ai => "ai",
            Self::Rule => "rule",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CarrierDetection {
    pub carrier_id: Option<i32>,
    pub nombre_canonico: String,
    pub source: DetectionSource,
    pub confidence: f64,
}

fn by_name<'a>(carriers: &'a [Carrier], nombre: &str) -> Option<&'a Carrier> {
    carriers
        .iter()
        .find(|c| c.nombre_canonico.eq_ignore_ascii_case(nombre))
}

/// Cascade, first match wins:
/// 1. hard pickup pattern;
/// 2. active carrier regexes, ascending `prioridad_regex` then name —
///    malformed patterns are logged and skipped;
/// 3. AI fallback, accepted when the canonical name exists and the
///    confidence clears [`AI_CONFIDENCE_THRESHOLD`];
/// 4. locality rule: outside Mendoza → DESCONOCIDO, else own fleet.
pub async fn detect(
    carriers: &[Carrier],
    texto: &str,
    provincia: Option<&str>,
    ai: Option<&dyn TransportClassifier>,
) -> CarrierDetection {
    let upper_text = texto.to_uppercase();

    if detect_pickup(&upper_text) {
        return CarrierDetection {
            carrier_id: by_name(carriers, carrier::RETIRO_EN_GALPON).map(|c| c.id),
            nombre_canonico: carrier::RETIRO_EN_GALPON.to_owned(),
            source: DetectionSource::Regex,
            confidence: 1.0,
        };
    }

    let mut with_regex: Vec<&Carrier> = carriers
        .iter()
        .filter(|c| c.activo && c.regex_pattern.is_some())
        .collect();
    with_regex.sort_by(|a, b| {
        a.prioridad_regex
            .cmp(&b.prioridad_regex)
            .then_with(|| a.nombre_canonico.cmp(&b.nombre_canonico))
    });

    for candidate in &with_regex {
        let pattern = candidate.regex_pattern.as_deref().unwrap_or_default();
        let compiled = RegexBuilder::new(pattern).case_insensitive(true).build();
        match compiled {
            Ok(regex) => {
                if regex.is_match(&upper_text) {
                    return CarrierDetection {
                        carrier_id: Some(candidate.id),
                        nombre_canonico: candidate.nombre_canonico.clone(),
                        source: DetectionSource::Regex,
                        confidence: 1.0,
                    };
                }
            }
            Err(why) => {
                warn!(
                    "invalid regex in carrier {}: {why}",
                    candidate.nombre_canonico
                );
            }
        }
    }

    if let Some(classifier) = ai {
        match classifier.classify(texto).await {
            Ok(Some(answer)) if answer.confianza >= AI_CONFIDENCE_THRESHOLD => {
                if let Some(matched) = by_name(carriers, &answer.transportista) {
                    return CarrierDetection {
                        carrier_id: Some(matched.id),
                        nombre_canonico: matched.nombre_canonico.clone(),
                        source: DetectionSource::Ai,
                        confidence: answer.confianza,
                    };
                }
            }
            Ok(_) => {}
            Err(why) => warn!("AI transport classification failed: {why}"),
        }
    }

    if let Some(provincia) = provincia {
        if !provincia.trim().eq_ignore_ascii_case("MENDOZA") {
            return CarrierDetection {
                carrier_id: by_name(carriers, carrier::DESCONOCIDO).map(|c| c.id),
                nombre_canonico: carrier::DESCONOCIDO.to_owned(),
                source: DetectionSource::Rule,
                confidence: 0.5,
            };
        }
    }

    CarrierDetection {
        carrier_id: by_name(carriers, carrier::ENVIO_PROPIO).map(|c| c.id),
        nombre_canonico: carrier::ENVIO_PROPIO.to_owned(),
        source: DetectionSource::Default,
        confidence: 0.5,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::provider::{AiClassification, ProviderError};

    fn carrier(id: i32, nombre: &str, regex: Option<&str>, prioridad: i32) -> Carrier {
        Carrier {
            id,
            nombre_canonico: nombre.to_owned(),
            aliases: vec![],
            regex_pattern: regex.map(str::to_owned),
            es_externo: true,
            es_pickup: false,
            activo: true,
            prioridad_regex: prioridad,
            created_at: None,
            updated_at: None,
        }
    }

    fn seed() -> Vec<Carrier> {
        vec![
            carrier(1, carrier::RETIRO_EN_GALPON, Some(r"(?i)retira"), 10),
            carrier(2, "ANDREANI", Some(r"(?i)andreani"), 20),
            carrier(3, "OCA", Some(r"(?i)\boca\b"), 20),
            carrier(4, carrier::ENVIO_PROPIO, Some(r"(?i)envio\s+propio"), 30),
            carrier(5, carrier::DESCONOCIDO, None, 99),
        ]
    }

    struct FixedAi(Option<AiClassification>);

    #[async_trait]
    impl TransportClassifier for FixedAi {
        async fn classify(
            &self,
            _texto: &str,
        ) -> Result<Option<AiClassification>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn pickup_pattern_matches_variants() {
        assert!(detect_pickup("el cliente retira en depósito"));
        assert!(detect_pickup("SE RETIRA"));
        assert!(detect_pickup("pasa a retirar el lunes"));
        assert!(!detect_pickup("retirar")); // imperative alone is not pickup
        assert!(!detect_pickup("enviar por andreani"));
        assert!(!detect_pickup(""));
    }

    #[tokio::test]
    async fn pickup_wins_over_carrier_regex() {
        let detection = seed();
        let result = detect(&detection, "retira en local, NO enviar por OCA", None, None).await;
        assert_eq!(result.nombre_canonico, carrier::RETIRO_EN_GALPON);
        assert_eq!(result.source, DetectionSource::Regex);
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn carrier_regex_by_priority() {
        let result = detect(&seed(), "enviar via Andreani", None, None).await;
        assert_eq!(result.nombre_canonico, "ANDREANI");
        assert_eq!(result.carrier_id, Some(2));
        assert_eq!(result.source, DetectionSource::Regex);
    }

    #[tokio::test]
    async fn malformed_regex_is_skipped() {
        let mut carriers = seed();
        carriers.insert(0, carrier(9, "ROTO", Some(r"(?i)(unclosed"), 1));
        let result = detect(&carriers, "enviar via andreani", None, None).await;
        assert_eq!(result.nombre_canonico, "ANDREANI");
    }

    #[tokio::test]
    async fn ai_accepted_above_threshold() {
        let ai = FixedAi(Some(AiClassification {
            transportista: "OCA".to_owned(),
            confianza: 0.9,
        }));
        let result = detect(&seed(), "texto ambiguo", None, Some(&ai)).await;
        assert_eq!(result.nombre_canonico, "OCA");
        assert_eq!(result.source, DetectionSource::Ai);
    }

    #[tokio::test]
    async fn ai_below_threshold_falls_through() {
        let ai = FixedAi(Some(AiClassification {
            transportista: "OCA".to_owned(),
            confianza: 0.7,
        }));
        let result = detect(&seed(), "texto ambiguo", None, Some(&ai)).await;
        assert_eq!(result.nombre_canonico, carrier::ENVIO_PROPIO);
        assert_eq!(result.source, DetectionSource::Default);
    }

    #[tokio::test]
    async fn ai_unknown_name_falls_through() {
        let ai = FixedAi(Some(AiClassification {
            transportista: "TRANSPORTE FANTASMA".to_owned(),
            confianza: 0.99,
        }));
        let result = detect(&seed(), "texto ambiguo", None, Some(&ai)).await;
        assert_eq!(result.nombre_canonico, carrier::ENVIO_PROPIO);
    }

    #[tokio::test]
    async fn foreign_province_is_desconocido() {
        let result = detect(&seed(), "sin datos", Some("San Juan"), None).await;
        assert_eq!(result.nombre_canonico, carrier::DESCONOCIDO);
        assert_eq!(result.source, DetectionSource::Rule);
    }

    #[tokio::test]
    async fn mendoza_defaults_to_own_fleet() {
        let result = detect(&seed(), "sin datos", Some("Mendoza"), None).await;
        assert_eq!(result.nombre_canonico, carrier::ENVIO_PROPIO);
        assert_eq!(result.source, DetectionSource::Default);
    }
}
