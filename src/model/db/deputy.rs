use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Deputies are identified by short string IDs assigned in the seed roster.
pub type DeputyId = String;

/// A deputy from the database, with its running vote total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deputy {
    #[serde(rename = "_id")]
    pub id: DeputyId,
    pub name: String,
    pub faction: String,
    pub votes: u32,
}

impl Deputy {
    /// Create a deputy with no votes.
    pub fn new(id: &str, name: &str, faction: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            faction: faction.to_string(),
            votes: 0,
        }
    }

    /// Leaderboard order: most votes first, ties by ID.
    pub fn leaderboard_order(a: &Self, b: &Self) -> Ordering {
        b.votes.cmp(&a.votes).then_with(|| a.id.cmp(&b.id))
    }
}

const PROGRESSIVES: &str = "Frakcija PROGRESĪVIE";
const UNITED_LIST: &str = "Frakcija \"APVIENOTAIS SARAKSTS\"";
const GREENS_FARMERS: &str = "Zaļo un Zemnieku savienības frakcija";
const NON_AFFILIATED: &str = "Pie frakcijām nepiederošie deputāti";
const NATIONAL_ALLIANCE: &str = "Frakcija \"Nacionālā apvienība\"";
const NEW_UNITY: &str = "JAUNĀ VIENOTĪBA";
const HARMONY: &str = "Saskaņas Sociāldemokrātiskā partija";

/// The deputies seeded into an empty store at startup.
pub fn seed_roster() -> Vec<Deputy> {
    [
        ("1", "Skaidrīte Ābrama", PROGRESSIVES),
        ("2", "Česlavs Batņa", UNITED_LIST),
        ("3", "Raimonds Bergmanis", UNITED_LIST),
        ("4", "Andris Bērziņš", GREENS_FARMERS),
        ("5", "Anita Brakovska", GREENS_FARMERS),
        ("6", "Augusts Brigmanis", GREENS_FARMERS),
        ("7", "Oļegs Burovs", NON_AFFILIATED),
        ("8", "Artūrs Butāns", NATIONAL_ALLIANCE),
        ("9", "Andrejs Ceļapīters", NON_AFFILIATED),
        ("10", "Edmunds Cepurītis", PROGRESSIVES),
        ("11", "Anda Čakša", NEW_UNITY),
        ("12", "Gundars Daudze", GREENS_FARMERS),
        ("13", "Jānis Dombrava", NATIONAL_ALLIANCE),
        ("14", "Sergejs Dolgopolovs", HARMONY),
        ("15", "Vjačeslavs Dombrovskis", HARMONY),
        ("98", "Jānis Vucāns", GREENS_FARMERS),
        ("99", "Jānis Zemnieks", NEW_UNITY),
        ("100", "Andris Zīle", NATIONAL_ALLIANCE),
    ]
    .into_iter()
    .map(|(id, name, faction)| Deputy::new(id, name, faction))
    .collect()
}
