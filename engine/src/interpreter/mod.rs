//! Command Interpreter
//!
//! Stateless classification of one utterance into at most one robot
//! [`Command`]. The utterance's language is guessed first (Polish or English),
//! then categories are tried in a fixed priority order and the first category
//! whose keyword appears in the lower-cased text wins:
//!
//! `clean → stop → pause → home → locate → status → follow_me → goto → move`
//!
//! Keyword sets overlap between categories, so the order is what makes the
//! result reproducible. Confidence values are fixed per category; callers gate
//! execution on a threshold (see [`Command::is_actionable`]).

mod keywords;

use crate::llm::prompts::format_room_list;
use keywords::{KeywordTable, ENGLISH, POLISH, POLISH_DIACRITICS, POLISH_MARKERS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Default execution threshold used by the transports
pub const DEFAULT_COMMAND_THRESHOLD: f64 = 0.7;

/// Conversation language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "pl")]
    Polish,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Polish => "pl",
            Language::English => "en",
        }
    }

    fn table(&self) -> &'static KeywordTable {
        match self {
            Language::Polish => &POLISH,
            Language::English => &ENGLISH,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pl" | "polish" => Ok(Language::Polish),
            "en" | "english" => Ok(Language::English),
            other => Err(format!("unknown language '{}'", other)),
        }
    }
}

/// Classified robot action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StartCleaning,
    CleanRooms,
    Stop,
    Pause,
    Home,
    Locate,
    Status,
    FollowMe,
    GotoRoom,
    GotoLocation,
    Move,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::StartCleaning => "start_cleaning",
            Action::CleanRooms => "clean_rooms",
            Action::Stop => "stop",
            Action::Pause => "pause",
            Action::Home => "home",
            Action::Locate => "locate",
            Action::Status => "status",
            Action::FollowMe => "follow_me",
            Action::GotoRoom => "goto_room",
            Action::GotoLocation => "goto_location",
            Action::Move => "move",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manual-control direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified utterance. Never mutated after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    #[serde(default)]
    pub params: Map<String, Value>,
    pub confidence: f64,
}

impl Command {
    fn new(action: Action, confidence: f64) -> Self {
        Self {
            action,
            params: Map::new(),
            confidence,
        }
    }

    fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Rooms of a `clean_rooms` command
    pub fn rooms(&self) -> Vec<String> {
        self.params
            .get("rooms")
            .and_then(|v| v.as_array())
            .map(|rooms| {
                rooms
                    .iter()
                    .filter_map(|r| r.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Room of a `goto_room` command
    pub fn room(&self) -> Option<&str> {
        self.params.get("room").and_then(|v| v.as_str())
    }

    /// Direction of a `move` command
    pub fn direction(&self) -> Option<Direction> {
        self.params
            .get("direction")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Whether the command is confident enough to execute
    pub fn is_actionable(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }
}

/// Guess the utterance's language: Polish if it has Polish diacritics or one
/// of a few common Polish words, English otherwise.
pub fn detect_language(text: &str) -> Language {
    let lower = text.to_lowercase();

    if lower.chars().any(|c| POLISH_DIACRITICS.contains(&c))
        || POLISH_MARKERS.iter().any(|m| lower.contains(m))
    {
        Language::Polish
    } else {
        Language::English
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Canonical names of every room mentioned, in table order
fn extract_rooms(text: &str, table: &KeywordTable) -> Vec<&'static str> {
    table
        .rooms
        .iter()
        .filter(|(_, patterns)| contains_any(text, patterns))
        .map(|(room, _)| *room)
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandInterpreter;

impl CommandInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Classify an utterance. `None` means plain chat.
    pub fn parse(&self, text: &str) -> Option<Command> {
        let language = detect_language(text);
        let table = language.table();
        let lower = text.to_lowercase();

        let command = if contains_any(&lower, table.clean) {
            let rooms = extract_rooms(&lower, table);
            if rooms.is_empty() {
                Command::new(Action::StartCleaning, 0.95)
            } else {
                Command::new(Action::CleanRooms, 0.9).with_param("rooms", rooms)
            }
        } else if contains_any(&lower, table.stop) {
            Command::new(Action::Stop, 0.95)
        } else if contains_any(&lower, table.pause) {
            Command::new(Action::Pause, 0.95)
        } else if contains_any(&lower, table.home) {
            Command::new(Action::Home, 0.95)
        } else if contains_any(&lower, table.locate) {
            Command::new(Action::Locate, 0.9)
        } else if contains_any(&lower, table.status) {
            Command::new(Action::Status, 0.9)
        } else if contains_any(&lower, table.follow) {
            Command::new(Action::FollowMe, 0.95)
        } else if contains_any(&lower, table.goto) {
            match extract_rooms(&lower, table).first() {
                Some(room) => Command::new(Action::GotoRoom, 0.9).with_param("room", *room),
                None => Command::new(Action::GotoLocation, 0.7),
            }
        } else {
            let (direction, _) = table
                .directions
                .iter()
                .find(|(_, keywords)| contains_any(&lower, keywords))?;
            Command::new(Action::Move, 0.9).with_param("direction", direction.as_str())
        };

        tracing::debug!(
            "Classified '{}' as {} ({}, confidence {})",
            text,
            command.action,
            language,
            command.confidence
        );

        Some(command)
    }
}

/// Classify an utterance with the default interpreter
pub fn parse_command(text: &str) -> Option<Command> {
    CommandInterpreter::new().parse(text)
}

/// Short localized acknowledgement for an executable command.
///
/// `status` has its own template ([`status_response`]) since it needs live
/// values; goto and move have none.
pub fn response_template(command: &Command, language: Language) -> Option<String> {
    let polish = language == Language::Polish;

    let text = match command.action {
        Action::StartCleaning if polish => {
            "Oczywiście! Zaczynam sprzątanie całego mieszkania.".to_string()
        }
        Action::StartCleaning => "Sure! Starting full cleaning.".to_string(),
        Action::CleanRooms => {
            let rooms = format_room_list(&command.rooms(), language);
            if polish {
                format!("Dobrze, sprzątam: {}.", rooms)
            } else {
                format!("Okay, cleaning: {}.", rooms)
            }
        }
        Action::Stop if polish => "Zatrzymuję sprzątanie.".to_string(),
        Action::Stop => "Stopping cleaning.".to_string(),
        Action::Pause if polish => "Wstrzymuję sprzątanie.".to_string(),
        Action::Pause => "Pausing cleaning.".to_string(),
        Action::Home if polish => "Wracam do stacji dokującej.".to_string(),
        Action::Home => "Returning to dock.".to_string(),
        Action::Locate if polish => "Odtwarzam dźwięk lokalizacyjny.".to_string(),
        Action::Locate => "Playing locate sound.".to_string(),
        Action::FollowMe if polish => "Dobrze, jadę za tobą.".to_string(),
        Action::FollowMe => "Okay, following you.".to_string(),
        Action::Status | Action::GotoRoom | Action::GotoLocation | Action::Move => return None,
    };

    Some(text)
}

/// Localized status line, e.g. "Currently docked. Battery: 80%."
pub fn status_response(language: Language, state: &str, battery: u8) -> String {
    let state = crate::llm::prompts::format_robot_status(state, language);
    match language {
        Language::Polish => format!("Aktualnie {}. Bateria: {}%.", state, battery),
        Language::English => format!("Currently {}. Battery: {}%.", state, battery),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action_of(text: &str) -> Option<Action> {
        parse_command(text).map(|c| c.action)
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("Posprzątaj kuchnię"), Language::Polish);
        assert_eq!(detect_language("gdzie jestes"), Language::Polish);
        assert_eq!(detect_language("Clean the kitchen"), Language::English);
        assert_eq!(detect_language(""), Language::English);
    }

    #[test]
    fn test_polish_keywords_without_diacritics() {
        for text in ["zatrzymaj", "przerwij", "zatrzymaj robota"] {
            let cmd = parse_command(text).unwrap();
            assert_eq!(cmd.action, Action::Stop, "{}", text);
            assert_eq!(cmd.confidence, 0.95, "{}", text);
            assert_eq!(detect_language(text), Language::Polish, "{}", text);
        }

        assert_eq!(action_of("wstrzymaj"), Some(Action::Pause));
        assert_eq!(action_of("odkurz"), Some(Action::StartCleaning));
    }

    #[test]
    fn test_return_to_dock_both_languages() {
        let pl = parse_command("wróć do stacji").unwrap();
        assert_eq!(pl.action, Action::Home);
        assert_eq!(pl.confidence, 0.95);

        let en = parse_command("please go back to the dock").unwrap();
        assert_eq!(en.action, Action::Home);
        assert_eq!(en.confidence, 0.95);
    }

    #[test]
    fn test_clean_without_rooms() {
        let cmd = parse_command("Start cleaning").unwrap();
        assert_eq!(cmd.action, Action::StartCleaning);
        assert_eq!(cmd.confidence, 0.95);
        assert!(cmd.params.is_empty());
    }

    #[test]
    fn test_clean_rooms_collects_every_room() {
        let cmd = parse_command("vacuum the kitchen and the bedroom").unwrap();
        assert_eq!(cmd.action, Action::CleanRooms);
        assert_eq!(cmd.confidence, 0.9);
        assert_eq!(cmd.rooms(), vec!["bedroom", "kitchen"]);
    }

    #[test]
    fn test_polish_clean_rooms_uses_canonical_names() {
        let cmd = parse_command("Posprzątaj w kuchni i w łazience").unwrap();
        assert_eq!(cmd.action, Action::CleanRooms);
        assert_eq!(cmd.rooms(), vec!["kuchnia", "łazienka"]);

        let cmd = parse_command("odkurz pokój dziecięcy i w sypialni").unwrap();
        assert_eq!(cmd.rooms(), vec!["sypialnia", "dziecięcy"]);
    }

    #[test]
    fn test_clean_shadows_stop() {
        assert_eq!(action_of("stop cleaning"), Some(Action::StartCleaning));
    }

    #[test]
    fn test_fixed_confidences() {
        let cases = [
            ("stop", Action::Stop, 0.95),
            ("pause for a moment", Action::Pause, 0.95),
            ("where are you?", Action::Locate, 0.9),
            ("what's your battery level", Action::Status, 0.9),
            ("follow me", Action::FollowMe, 0.95),
            ("turn left", Action::Move, 0.9),
        ];

        for (text, action, confidence) in cases {
            let cmd = parse_command(text).unwrap();
            assert_eq!(cmd.action, action, "{}", text);
            assert_eq!(cmd.confidence, confidence, "{}", text);
        }
    }

    #[test]
    fn test_goto_room_takes_first_room_only() {
        let cmd = parse_command("go to the kitchen then the office").unwrap();
        assert_eq!(cmd.action, Action::GotoRoom);
        assert_eq!(cmd.room(), Some("kitchen"));
        assert_eq!(cmd.confidence, 0.9);
    }

    #[test]
    fn test_goto_without_room() {
        let cmd = parse_command("navigate to the window").unwrap();
        assert_eq!(cmd.action, Action::GotoLocation);
        assert_eq!(cmd.confidence, 0.7);
        assert!(!cmd.is_actionable(DEFAULT_COMMAND_THRESHOLD));
    }

    #[test]
    fn test_move_direction() {
        let cmd = parse_command("skręć w prawo").unwrap();
        assert_eq!(cmd.action, Action::Move);
        assert_eq!(cmd.direction(), Some(Direction::Right));
    }

    #[test]
    fn test_polish_follow_me() {
        let cmd = parse_command("Jedź za mną proszę").unwrap();
        assert_eq!(cmd.action, Action::FollowMe);
    }

    #[test]
    fn test_plain_chat_is_none() {
        assert!(parse_command("tell me a joke").is_none());
        assert!(parse_command("").is_none());
    }

    #[test]
    fn test_command_serialization() {
        let cmd = parse_command("follow me").unwrap();
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["action"], "follow_me");
        assert_eq!(json["confidence"], 0.95);
    }

    #[test]
    fn test_is_actionable_is_strict() {
        let cmd = Command::new(Action::GotoLocation, 0.7);
        assert!(!cmd.is_actionable(0.7));
        assert!(cmd.is_actionable(0.69));
    }

    #[test]
    fn test_response_templates() {
        let cmd = parse_command("clean the kitchen and the hallway").unwrap();
        assert_eq!(
            response_template(&cmd, Language::English).as_deref(),
            Some("Okay, cleaning: kitchen and hallway.")
        );

        let home = parse_command("wróć").unwrap();
        assert_eq!(
            response_template(&home, Language::Polish).as_deref(),
            Some("Wracam do stacji dokującej.")
        );

        let status = parse_command("status").unwrap();
        assert!(response_template(&status, Language::English).is_none());
    }

    #[test]
    fn test_status_response() {
        assert_eq!(
            status_response(Language::English, "docked", 80),
            "Currently docked. Battery: 80%."
        );
        assert_eq!(
            status_response(Language::Polish, "cleaning", 42),
            "Aktualnie sprzątam. Bateria: 42%."
        );
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("PL".parse::<Language>().unwrap(), Language::Polish);
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert!("de".parse::<Language>().is_err());
    }
}
