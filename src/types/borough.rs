/// The five NYC boroughs, each of which is exactly one county of New York State.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Borough {
    Manhattan,      // New York County
    Bronx,          // Bronx County
    Brooklyn,       // Kings County
    Queens,         // Queens County
    StatenIsland,   // Richmond County
}

impl Borough {
    /// New York State FIPS code.
    pub const STATE_FIPS: &'static str = "36";

    pub fn to_str(&self) -> &'static str {
        match self {
            Borough::Manhattan => "manhattan",
            Borough::Bronx => "bronx",
            Borough::Brooklyn => "brooklyn",
            Borough::Queens => "queens",
            Borough::StatenIsland => "staten_island",
        }
    }

    pub fn order() -> [Borough; 5] {
        [
            Borough::Manhattan,
            Borough::Bronx,
            Borough::Brooklyn,
            Borough::Queens,
            Borough::StatenIsland,
        ]
    }

    /// Leading digit of a 7-character borough tract code.
    pub fn digit(&self) -> char {
        match self {
            Borough::Manhattan => '1',
            Borough::Bronx => '2',
            Borough::Brooklyn => '3',
            Borough::Queens => '4',
            Borough::StatenIsland => '5',
        }
    }

    /// Three-digit county FIPS code (without the state prefix).
    pub fn county_fips(&self) -> &'static str {
        match self {
            Borough::Manhattan => "061",
            Borough::Bronx => "005",
            Borough::Brooklyn => "047",
            Borough::Queens => "081",
            Borough::StatenIsland => "085",
        }
    }

    pub fn from_digit(digit: char) -> Option<Self> {
        Self::order().into_iter().find(|b| b.digit() == digit)
    }

    /// Accepts either a 3-digit county code ("047") or a 5-digit state+county code ("36047").
    pub fn from_county_fips(fips: &str) -> Option<Self> {
        let county = match fips.len() {
            3 => fips,
            5 if fips.starts_with(Self::STATE_FIPS) => &fips[2..],
            _ => return None,
        };
        Self::order().into_iter().find(|b| b.county_fips() == county)
    }
}
