//! Destination recommendations
//!
//! A curated catalog queried by keyword. Matching is intentionally
//! simple: any query keyword longer than two characters found in a
//! destination's searchable text counts as a hit; when nothing matches,
//! a themed default set is returned so the agent always has something
//! to recommend.

use serde::{Deserialize, Serialize};

pub const DESTINATIONS_TOOL: &str = "destinations-search";

const MAX_RESULTS: usize = 5;
const MAX_DEFAULT_RESULTS: usize = 4;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub city: String,
    pub country: String,
    pub description: String,
    pub highlights: Vec<String>,
    pub best_time_to_visit: String,
    pub travel_type: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationsResult {
    pub query: String,
    pub destinations: Vec<Destination>,
}

#[derive(Clone, Debug, Default)]
pub struct DestinationsCatalog;

impl DestinationsCatalog {
    pub fn new() -> Self {
        DestinationsCatalog
    }

    /// Search the catalog by trip type, region, activities or interests.
    pub fn search(&self, query: &str) -> DestinationsResult {
        let lower = query.to_lowercase();
        let catalog = catalog();

        let mut matched: Vec<&Destination> = catalog
            .iter()
            .filter(|dest| {
                let haystack = format!(
                    "{} {} {} {} {}",
                    dest.city,
                    dest.country,
                    dest.description,
                    dest.highlights.join(" "),
                    dest.travel_type.join(" ")
                )
                .to_lowercase();
                lower
                    .split_whitespace()
                    .any(|keyword| keyword.len() > 2 && haystack.contains(keyword))
            })
            .collect();
        matched.truncate(MAX_RESULTS);

        let destinations = if matched.is_empty() {
            default_destinations(&lower, catalog)
        } else {
            matched.into_iter().cloned().collect()
        };

        DestinationsResult {
            query: query.to_string(),
            destinations,
        }
    }
}

/// Themed defaults for queries that match nothing directly.
fn default_destinations(query: &str, catalog: &[Destination]) -> Vec<Destination> {
    let by_type = |types: &[&str]| -> Vec<Destination> {
        catalog
            .iter()
            .filter(|d| types.iter().any(|t| d.travel_type.iter().any(|dt| dt == t)))
            .take(MAX_DEFAULT_RESULTS)
            .cloned()
            .collect()
    };
    let by_country = |countries: &[&str]| -> Vec<Destination> {
        catalog
            .iter()
            .filter(|d| countries.contains(&d.country.as_str()))
            .take(MAX_DEFAULT_RESULTS)
            .cloned()
            .collect()
    };

    if ["beach", "sea", "caribbean"].iter().any(|k| query.contains(k)) {
        return by_type(&["beach"]);
    }
    if ["culture", "history", "museum"].iter().any(|k| query.contains(k)) {
        return by_type(&["culture", "history"]);
    }
    if ["adventure", "nature", "trekking"].iter().any(|k| query.contains(k)) {
        return by_type(&["adventure", "nature"]);
    }
    if ["romantic", "couple", "honeymoon"].iter().any(|k| query.contains(k)) {
        return by_type(&["romantic"]);
    }
    if ["budget", "cheap", "affordable"].iter().any(|k| query.contains(k)) {
        return by_type(&["budget"]);
    }
    if query.contains("europe") {
        return by_country(&["Spain", "France", "Italy", "Netherlands", "Czech Republic"]);
    }
    if query.contains("asia") {
        return by_country(&["Japan", "Indonesia", "Thailand"]);
    }
    if query.contains("america") {
        return by_country(&["United States", "Mexico", "Argentina", "Peru"]);
    }

    // A spread of popular picks across regions.
    ["Barcelona", "Tokyo", "New York", "Bali"]
        .iter()
        .filter_map(|city| catalog.iter().find(|d| d.city == *city))
        .cloned()
        .collect()
}

fn catalog() -> &'static [Destination] {
    use std::sync::OnceLock;

    static CATALOG: OnceLock<Vec<Destination>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

fn entry(
    city: &str,
    country: &str,
    description: &str,
    highlights: &[&str],
    best_time_to_visit: &str,
    travel_type: &[&str],
) -> Destination {
    Destination {
        city: city.to_string(),
        country: country.to_string(),
        description: description.to_string(),
        highlights: highlights.iter().map(|s| s.to_string()).collect(),
        best_time_to_visit: best_time_to_visit.to_string(),
        travel_type: travel_type.iter().map(|s| s.to_string()).collect(),
    }
}

fn build_catalog() -> Vec<Destination> {
    vec![
        // Europe
        entry(
            "Barcelona",
            "Spain",
            "Vibrant city with Gaudí modernist architecture, Mediterranean beaches, and rich nightlife.",
            &["Sagrada Familia", "Park Güell", "Las Ramblas", "Gothic Quarter", "Barceloneta Beach"],
            "May to June, September to October",
            &["beach", "culture", "gastronomy", "nightlife", "architecture"],
        ),
        entry(
            "Paris",
            "France",
            "The city of love, famous for its art, fashion, gastronomy, and iconic monuments.",
            &["Eiffel Tower", "Louvre", "Notre-Dame", "Champs-Élysées", "Montmartre"],
            "April to June, September to November",
            &["romantic", "culture", "art", "gastronomy", "fashion"],
        ),
        entry(
            "Rome",
            "Italy",
            "Eternal city with ancient ruins, Renaissance art, and the best pasta in the world.",
            &["Colosseum", "Vatican", "Trevi Fountain", "Pantheon", "Trastevere"],
            "April to May, September to October",
            &["history", "culture", "gastronomy", "art", "romantic"],
        ),
        entry(
            "Amsterdam",
            "Netherlands",
            "City of canals, world-class museums, unique architecture, and liberal atmosphere.",
            &["Van Gogh Museum", "Anne Frank House", "Rijksmuseum", "Canals", "Vondelpark"],
            "April to May (tulips), June to August",
            &["culture", "art", "cycling", "nightlife", "museums"],
        ),
        entry(
            "Prague",
            "Czech Republic",
            "Fairytale city with medieval architecture, craft beer, and affordable prices.",
            &["Charles Bridge", "Prague Castle", "Old Town Square", "Astronomical Clock"],
            "May to September",
            &["history", "architecture", "budget", "beer", "romantic"],
        ),
        // Asia
        entry(
            "Tokyo",
            "Japan",
            "Futuristic metropolis that combines ancestral tradition with cutting-edge technology.",
            &["Shibuya", "Senso-ji Temple", "Mount Fuji", "Akihabara", "Shinjuku"],
            "March to May (sakura), October to November",
            &["technology", "culture", "gastronomy", "temples", "modern"],
        ),
        entry(
            "Bali",
            "Indonesia",
            "Paradise island with Hindu temples, rice terraces, beaches, and wellness retreats.",
            &["Ubud", "Tanah Lot Temple", "Tegallalang Rice Terraces", "Seminyak", "Mount Batur"],
            "April to October (dry season)",
            &["beach", "wellness", "yoga", "nature", "spiritual", "budget"],
        ),
        entry(
            "Bangkok",
            "Thailand",
            "Chaotic and fascinating city with golden temples, floating markets, and incredible street food.",
            &["Grand Palace", "Wat Pho", "Floating Market", "Khao San Road", "Chatuchak"],
            "November to February",
            &["culture", "gastronomy", "temples", "budget", "adventure"],
        ),
        // Americas
        entry(
            "New York",
            "United States",
            "The city that never sleeps: iconic skyscrapers, Broadway, art, and cultural diversity.",
            &["Times Square", "Central Park", "Statue of Liberty", "Empire State", "Brooklyn Bridge"],
            "April to June, September to November",
            &["urban", "culture", "art", "shopping", "gastronomy", "museums"],
        ),
        entry(
            "Cancun",
            "Mexico",
            "Caribbean paradise with white sand beaches, Mayan ruins, and vibrant nightlife.",
            &["Hotel Zone", "Chichen Itza", "Isla Mujeres", "Xcaret", "Cenotes"],
            "December to April",
            &["beach", "resort", "history", "diving", "nightlife"],
        ),
        entry(
            "Buenos Aires",
            "Argentina",
            "Tango capital with European architecture, legendary steaks, and football passion.",
            &["La Boca", "San Telmo", "Recoleta", "Puerto Madero", "Teatro Colón"],
            "March to May, September to November",
            &["culture", "gastronomy", "tango", "art", "nightlife"],
        ),
        entry(
            "Cusco",
            "Peru",
            "Ancient Inca capital, gateway to Machu Picchu and heart of Andean culture.",
            &["Machu Picchu", "Sacred Valley", "Plaza de Armas", "Sacsayhuaman", "San Pedro Market"],
            "May to September (dry season)",
            &["history", "adventure", "trekking", "culture", "archaeology"],
        ),
        // Oceania
        entry(
            "Sydney",
            "Australia",
            "Coastal city with the iconic Opera House, surf beaches, and relaxed lifestyle.",
            &["Sydney Opera House", "Harbour Bridge", "Bondi Beach", "The Rocks", "Taronga Zoo"],
            "September to November, March to May",
            &["beach", "urban", "surf", "nature", "modern"],
        ),
        // Africa
        entry(
            "Marrakech",
            "Morocco",
            "Imperial city with labyrinthine souks, palaces, and the magic of the nearby desert.",
            &["Jemaa el-Fna Square", "Majorelle Garden", "Medina", "Bahia Palace", "Souks"],
            "March to May, September to November",
            &["culture", "exotic", "gastronomy", "shopping", "adventure"],
        ),
        entry(
            "Cape Town",
            "South Africa",
            "Spectacular city between mountains and ocean, with vineyards and African wildlife.",
            &["Table Mountain", "Cape of Good Hope", "Robben Island", "V&A Waterfront", "Vineyards"],
            "November to March",
            &["nature", "adventure", "wine", "safari", "beach"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_search_matches_highlights() {
        let catalog = DestinationsCatalog::new();
        let result = catalog.search("machu picchu trekking");
        assert!(result.destinations.iter().any(|d| d.city == "Cusco"));
    }

    #[test]
    fn test_short_keywords_are_ignored() {
        let catalog = DestinationsCatalog::new();
        // "in" and "to" are too short to match anything; the themed
        // beach default kicks in instead.
        let result = catalog.search("to in beach");
        assert!(!result.destinations.is_empty());
        assert!(result
            .destinations
            .iter()
            .all(|d| d.travel_type.iter().any(|t| t == "beach")));
    }

    #[test]
    fn test_unmatched_query_returns_popular_picks() {
        let catalog = DestinationsCatalog::new();
        let result = catalog.search("zzz");
        let cities: Vec<&str> = result.destinations.iter().map(|d| d.city.as_str()).collect();
        assert_eq!(cities, vec!["Barcelona", "Tokyo", "New York", "Bali"]);
    }

    #[test]
    fn test_results_are_capped() {
        let catalog = DestinationsCatalog::new();
        let result = catalog.search("culture gastronomy art city");
        assert!(result.destinations.len() <= 5);
        assert_eq!(result.query, "culture gastronomy art city");
    }

    #[test]
    fn test_region_defaults() {
        let catalog = DestinationsCatalog::new();
        // "asia" alone matches no destination text directly.
        let result = catalog.search("asia");
        assert!(result
            .destinations
            .iter()
            .all(|d| ["Japan", "Indonesia", "Thailand"].contains(&d.country.as_str())));
        assert!(!result.destinations.is_empty());
    }
}
