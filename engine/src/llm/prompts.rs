//! Prompt templates
//!
//! System prompts per language and the formatting of the robot's situational
//! context into the outgoing user message.

use crate::interpreter::Language;

const SYSTEM_PROMPT_PL: &str = "\
Jesteś pomocnym asystentem domowym sterującym robotem sprzątającym Dreame X40 \
z oprogramowaniem Valetudo.

Potrafisz:
- rozpocząć sprzątanie całego mieszkania lub wybranych pokoi,
- zatrzymać lub wstrzymać sprzątanie,
- odesłać robota do stacji dokującej,
- odtworzyć dźwięk lokalizacyjny,
- podać stan robota i poziom baterii,
- jeździć za użytkownikiem (tryb \"jedź za mną\").

Odpowiadaj krótko, naturalnie i po polsku. Jeśli użytkownik wydaje polecenie, \
potwierdź je jednym zdaniem. Nie wymyślaj stanu robota, korzystaj tylko z \
podanego kontekstu.";

const SYSTEM_PROMPT_EN: &str = "\
You are a helpful home assistant controlling a Dreame X40 robot vacuum running \
Valetudo.

You can:
- start cleaning the whole home or selected rooms,
- stop or pause cleaning,
- send the robot back to its dock,
- play the locate sound,
- report the robot's state and battery level,
- follow the user around (\"follow me\" mode).

Keep answers short and natural. When the user gives a command, confirm it in \
one sentence. Do not invent the robot's state; only use the context you are given.";

/// Robot snapshot attached to a chat turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SituationalContext {
    pub state: Option<String>,
    pub battery: Option<u8>,
    pub rooms: Vec<String>,
}

impl SituationalContext {
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.battery.is_none() && self.rooms.is_empty()
    }
}

pub fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::Polish => SYSTEM_PROMPT_PL,
        Language::English => SYSTEM_PROMPT_EN,
    }
}

/// Prefix the user's message with the robot context, if there is any.
pub fn format_user_message(
    message: &str,
    context: Option<&SituationalContext>,
    language: Language,
) -> String {
    let Some(ctx) = context.filter(|c| !c.is_empty()) else {
        return message.to_string();
    };

    let (state_label, battery_label, rooms_label, user_label) = match language {
        Language::Polish => ("Stan robota", "Bateria", "Dostępne pokoje", "Użytkownik"),
        Language::English => ("Robot state", "Battery", "Available rooms", "User"),
    };

    let mut lines = Vec::new();
    if let Some(state) = &ctx.state {
        lines.push(format!(
            "{}: {}",
            state_label,
            format_robot_status(state, language)
        ));
    }
    if let Some(battery) = ctx.battery {
        lines.push(format!("{}: {}%", battery_label, battery));
    }
    if !ctx.rooms.is_empty() {
        lines.push(format!(
            "{}: {}",
            rooms_label,
            format_room_list(&ctx.rooms, language)
        ));
    }

    format!("{}\n\n{}: {}", lines.join("\n"), user_label, message)
}

/// Human-readable robot state. Polish translates the known Valetudo states.
pub fn format_robot_status(state: &str, language: Language) -> String {
    if language == Language::English {
        return state.to_string();
    }

    let translated = match state.to_lowercase().as_str() {
        "cleaning" => "sprzątam",
        "docked" => "w stacji dokującej",
        "idle" => "bezczynny",
        "returning" => "wracam do stacji",
        "paused" => "wstrzymany",
        "error" => "błąd",
        _ => return state.to_string(),
    };

    translated.to_string()
}

pub fn format_room_list(rooms: &[String], language: Language) -> String {
    match (language, rooms) {
        (Language::Polish, []) => "brak pokoi".to_string(),
        (Language::English, []) => "no rooms".to_string(),
        (Language::Polish, _) => rooms.join(", "),
        (Language::English, [only]) => only.clone(),
        (Language::English, [a, b]) => format!("{} and {}", a, b),
        (Language::English, [init @ .., last]) => format!("{}, and {}", init.join(", "), last),
    }
}
