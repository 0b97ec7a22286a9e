use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Airport {
    pub code: &'static str,
    pub name: &'static str,
    pub city: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PopularRoute {
    pub source: &'static str,
    pub destination: &'static str,
    pub name: &'static str,
}

pub const AIRPORTS: &[Airport] = &[
    Airport { code: "JFK", name: "John F. Kennedy International Airport", city: "New York" },
    Airport { code: "LHR", name: "London Heathrow Airport", city: "London" },
    Airport { code: "CDG", name: "Charles de Gaulle Airport", city: "Paris" },
    Airport { code: "LAX", name: "Los Angeles International Airport", city: "Los Angeles" },
    Airport { code: "SFO", name: "San Francisco International Airport", city: "San Francisco" },
    Airport { code: "ORD", name: "O'Hare International Airport", city: "Chicago" },
    Airport { code: "MIA", name: "Miami International Airport", city: "Miami" },
    Airport { code: "SEA", name: "Seattle-Tacoma International Airport", city: "Seattle" },
    Airport { code: "DFW", name: "Dallas/Fort Worth International Airport", city: "Dallas" },
    Airport { code: "ATL", name: "Hartsfield-Jackson Atlanta International Airport", city: "Atlanta" },
    Airport { code: "DEN", name: "Denver International Airport", city: "Denver" },
    Airport { code: "LAS", name: "Harry Reid International Airport", city: "Las Vegas" },
    Airport { code: "BOS", name: "Boston Logan International Airport", city: "Boston" },
    Airport { code: "PHX", name: "Phoenix Sky Harbor International Airport", city: "Phoenix" },
    Airport { code: "IAH", name: "George Bush Intercontinental Airport", city: "Houston" },
];

pub const POPULAR_ROUTES: &[PopularRoute] = &[
    PopularRoute { source: "JFK", destination: "LHR", name: "New York to London" },
    PopularRoute { source: "JFK", destination: "CDG", name: "New York to Paris" },
    PopularRoute { source: "JFK", destination: "LAX", name: "New York to Los Angeles" },
    PopularRoute { source: "LHR", destination: "CDG", name: "London to Paris" },
    PopularRoute { source: "LAX", destination: "SFO", name: "Los Angeles to San Francisco" },
];

/// Case-insensitive match on code, name or city
pub fn search_airports(query: &str) -> Vec<Airport> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    AIRPORTS
        .iter()
        .filter(|a| {
            a.code.to_lowercase().contains(&query)
                || a.name.to_lowercase().contains(&query)
                || a.city.to_lowercase().contains(&query)
        })
        .copied()
        .collect()
}
