//! Delivery-window extraction from free-text observations. A pure regex
//! cascade; the first rule that matches wins.

use model::remito::VentanaTipo;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::transportista;

/// Reference AM range, minutes past midnight: 09:00–13:00.
pub const WINDOW_AM_FROM: i32 = 9 * 60;
pub const WINDOW_AM_TO: i32 = 13 * 60;
/// Reference PM range: 14:00–18:00.
pub const WINDOW_PM_FROM: i32 = 14 * 60;
pub const WINDOW_PM_TO: i32 = 18 * 60;

/// What kind of instruction the observation text carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deteccion {
    /// The customer collects at the depot.
    Pickup,
    /// An explicit or vague time window.
    Ventana,
    /// No time constraint.
    SinHorario,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ventana {
    pub tipo: Deteccion,
    pub desde_min: Option<i32>,
    pub hasta_min: Option<i32>,
    pub ventana_tipo: VentanaTipo,
    pub llamar_antes: bool,
    pub raw: Option<String>,
}

impl Ventana {
    fn sin_horario(raw: Option<String>) -> Self {
        Self {
            tipo: Deteccion::SinHorario,
            desde_min: None,
            hasta_min: None,
            ventana_tipo: VentanaTipo::SinHorario,
            llamar_antes: false,
            raw,
        }
    }

    fn con_rango(desde: i32, hasta: i32, raw: String) -> Self {
        Self {
            tipo: Deteccion::Ventana,
            desde_min: Some(desde),
            hasta_min: Some(hasta),
            ventana_tipo: asignar_franja(desde, hasta),
            llamar_antes: false,
            raw: Some(raw),
        }
    }
}

static RE_EXPLICITO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}:\d{2})\s*[–\-]\s*(\d{1,2}:\d{2})").unwrap()
});
static RE_DESDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:DESDE|A PARTIR DE)\s+(?:LAS?\s+)?(\d{1,2}:\d{2})").unwrap()
});
static RE_HASTA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"HASTA\s+(?:LAS?\s+)?(\d{1,2}:\d{2})").unwrap());
static RE_MANANA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bMA[ÑN]ANA\b").unwrap());
static RE_TARDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bTARDE\b").unwrap());
static RE_COMERCIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"HORARIO COMERCIAL").unwrap());
static RE_LLAMAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"LLAMAR\s+ANTES|AVISAR\s+ANTES").unwrap());

fn parse_hhmm(text: &str) -> Option<i32> {
    utility::hhmm::parse(text).map(|minutes| minutes as i32)
}

fn rangos_intersectan(a_from: i32, a_to: i32, b_from: i32, b_to: i32) -> bool {
    a_from < b_to && b_from < a_to
}

/// AM, PM or neither, by overlap against the reference ranges. Overlap
/// with both or with none yields SIN_HORARIO.
pub fn asignar_franja(desde_min: i32, hasta_min: i32) -> VentanaTipo {
    let am = rangos_intersectan(desde_min, hasta_min, WINDOW_AM_FROM, WINDOW_AM_TO);
    let pm = rangos_intersectan(desde_min, hasta_min, WINDOW_PM_FROM, WINDOW_PM_TO);
    match (am, pm) {
        (true, false) => VentanaTipo::Am,
        (false, true) => VentanaTipo::Pm,
        _ => VentanaTipo::SinHorario,
    }
}

/// Cascade, first match wins:
/// pickup → explicit `HH:MM-HH:MM` → "desde"/"a partir de" → "hasta" →
/// vague words (mañana / tarde / horario comercial) → "llamar antes" →
/// no constraint.
pub fn parse(observation_text: &str) -> Ventana {
    if observation_text.trim().is_empty() {
        return Ventana::sin_horario(None);
    }

    let text = observation_text.to_uppercase().trim().to_owned();

    if transportista::detect_pickup(&text) {
        return Ventana {
            tipo: Deteccion::Pickup,
            desde_min: None,
            hasta_min: None,
            ventana_tipo: VentanaTipo::SinHorario,
            llamar_antes: false,
            raw: Some(text),
        };
    }

    if let Some(captures) = RE_EXPLICITO.captures(&text) {
        if let (Some(desde), Some(hasta)) =
            (parse_hhmm(&captures[1]), parse_hhmm(&captures[2]))
        {
            if desde < hasta {
                return Ventana::con_rango(desde, hasta, text);
            }
            // An inverted range is noise, not a window.
            return Ventana::sin_horario(Some(text));
        }
    }

    if let Some(captures) = RE_DESDE.captures(&text) {
        if let Some(desde) = parse_hhmm(&captures[1]) {
            if desde < 23 * 60 {
                return Ventana::con_rango(desde, 23 * 60, text);
            }
            return Ventana::sin_horario(Some(text));
        }
    }

    if let Some(captures) = RE_HASTA.captures(&text) {
        if let Some(hasta) = parse_hhmm(&captures[1]) {
            if hasta > 0 {
                return Ventana::con_rango(0, hasta, text);
            }
            return Ventana::sin_horario(Some(text));
        }
    }

    if RE_MANANA.is_match(&text) {
        return Ventana {
            ventana_tipo: VentanaTipo::Am,
            ..Ventana::con_rango(8 * 60, 13 * 60, text)
        };
    }
    if RE_TARDE.is_match(&text) {
        return Ventana {
            ventana_tipo: VentanaTipo::Pm,
            ..Ventana::con_rango(14 * 60, 21 * 60, text)
        };
    }
    if RE_COMERCIAL.is_match(&text) {
        return Ventana {
            ventana_tipo: VentanaTipo::SinHorario,
            ..Ventana::con_rango(9 * 60, 18 * 60, text)
        };
    }

    if RE_LLAMAR.is_match(&text) {
        return Ventana {
            llamar_antes: true,
            ..Ventana::sin_horario(Some(text))
        };
    }

    Ventana::sin_horario(Some(text))
}

/// Whether a stored window overlaps the configured operating hours.
/// Orders without an AM/PM-tagged range always pass.
pub fn dentro_de_ventana_operativa(
    ventana_tipo: Option<VentanaTipo>,
    desde_min: Option<i32>,
    hasta_min: Option<i32>,
    hora_desde: &str,
    hora_hasta: &str,
) -> bool {
    let tagged = matches!(ventana_tipo, Some(VentanaTipo::Am) | Some(VentanaTipo::Pm));
    if !tagged {
        return true;
    }
    let (Some(desde), Some(hasta)) = (desde_min, hasta_min) else {
        return true;
    };
    let (Some(config_desde), Some(config_hasta)) = (
        utility::hhmm::parse(hora_desde),
        utility::hhmm::parse(hora_hasta),
    ) else {
        return true;
    };
    rangos_intersectan(desde, hasta, config_desde as i32, config_hasta as i32)
}
