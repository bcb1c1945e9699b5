//! Keyword and room synonym tables, one per language.
//!
//! Matching is plain substring containment against the lower-cased
//! utterance, so entries must be lower case.

use super::Direction;

pub struct KeywordTable {
    pub clean: &'static [&'static str],
    pub stop: &'static [&'static str],
    pub pause: &'static [&'static str],
    pub home: &'static [&'static str],
    pub locate: &'static [&'static str],
    pub status: &'static [&'static str],
    pub follow: &'static [&'static str],
    pub goto: &'static [&'static str],
    /// Checked in order; the first direction with a hit wins
    pub directions: &'static [(Direction, &'static [&'static str])],
    /// Canonical room name and its synonyms, in extraction order
    pub rooms: &'static [(&'static str, &'static [&'static str])],
}

pub const POLISH: KeywordTable = KeywordTable {
    clean: &["posprzątaj", "wysprzątaj", "sprzątaj", "odkurz", "wymyj", "wyczyść"],
    stop: &["stop", "zatrzymaj", "przerwij", "przestań"],
    pause: &["pauzuj", "wstrzymaj", "poczekaj"],
    home: &["wróć", "powrót", "dom", "stacja", "baza", "dokuj"],
    locate: &["gdzie jesteś", "znajdź się", "lokalizuj", "dźwięk"],
    status: &["status", "stan", "jak się masz", "co robisz", "bateria"],
    follow: &[
        "jedź za mną",
        "chodź za mną",
        "podążaj za mną",
        "śledź mnie",
        "chodź ze mną",
        "jedź ze mną",
        "follow me",
    ],
    goto: &["jedź do", "pojedź do", "idź do", "przejedź do"],
    directions: &[
        (Direction::Forward, &["jedź do przodu", "do przodu", "naprzód"]),
        (Direction::Backward, &["jedź do tyłu", "do tyłu", "cofnij się"]),
        (Direction::Left, &["w lewo", "skręć w lewo", "obróć się w lewo"]),
        (Direction::Right, &["w prawo", "skręć w prawo", "obróć się w prawo"]),
    ],
    rooms: &[
        ("salon", &["salon", "pokój dzienny"]),
        ("sypialnia", &["sypialnia", "sypialni"]),
        ("kuchnia", &["kuchnia", "kuchni"]),
        ("łazienka", &["łazienka", "łazience"]),
        ("przedpokój", &["przedpokój", "korytarz", "hol"]),
        ("biuro", &["biuro", "gabinet"]),
        ("dziecięcy", &["pokój dziecięcy", "dziecięcy", "dziecka"]),
        ("garderoba", &["garderoba", "szafa"]),
    ],
};

pub const ENGLISH: KeywordTable = KeywordTable {
    clean: &["clean", "vacuum", "mop", "start"],
    stop: &["stop", "halt", "cancel"],
    pause: &["pause", "wait"],
    home: &["home", "dock", "return", "base"],
    locate: &["where are you", "locate", "find", "sound"],
    status: &["status", "state", "battery", "how are you"],
    follow: &["follow me", "come with me", "track me", "follow along"],
    goto: &["go to", "move to", "navigate to", "head to"],
    directions: &[
        (Direction::Forward, &["move forward", "go forward", "ahead"]),
        (Direction::Backward, &["move backward", "go back", "reverse"]),
        (Direction::Left, &["turn left", "go left", "rotate left"]),
        (Direction::Right, &["turn right", "go right", "rotate right"]),
    ],
    rooms: &[
        ("living room", &["living room", "lounge"]),
        ("bedroom", &["bedroom", "bed room"]),
        ("kitchen", &["kitchen"]),
        ("bathroom", &["bathroom", "bath"]),
        ("hallway", &["hallway", "corridor", "hall"]),
        ("office", &["office", "study"]),
        ("kids room", &["kids room", "children's room", "child's room"]),
        ("closet", &["closet", "wardrobe"]),
    ],
};

/// Diacritics that only occur in Polish text
pub const POLISH_DIACRITICS: &[char] = &['ą', 'ć', 'ę', 'ł', 'ń', 'ó', 'ś', 'ź', 'ż'];

/// Polish words that carry no diacritics, command keywords among them
pub const POLISH_MARKERS: &[&str] = &[
    "gdzie",
    "jest",
    "bateria",
    "zatrzymaj",
    "przerwij",
    "wstrzymaj",
    "pauzuj",
    "poczekaj",
    "odkurz",
    "wymyj",
    "dokuj",
    "lokalizuj",
];
