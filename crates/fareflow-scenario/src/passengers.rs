use crate::{Error, Result};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seats total the booking engine accepts per reservation.
const MAX_TRAVELLERS: u32 = 9;

/// IATA passenger type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaxType {
    Adult,
    Child,
    Infant,
}

impl PaxType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Adult => "ADT",
            Self::Child => "CHD",
            Self::Infant => "INF",
        }
    }
}

impl FromStr for PaxType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADT" | "ADULT" => Ok(Self::Adult),
            "CHD" | "CHILD" => Ok(Self::Child),
            "INF" | "INFANT" => Ok(Self::Infant),
            other => Err(Error::Passengers(format!("unknown passenger type '{other}'"))),
        }
    }
}

/// Aggregate passenger counts, as written in fixtures ("2 ADT,1 CHD").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaxCounts {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

impl PaxCounts {
    /// Parse a spec like `"2 ADT,1 CHD,1 INF"`. Duplicate codes accumulate.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut counts = Self::default();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (count, code) = part.split_once(char::is_whitespace).ok_or_else(|| {
                Error::Passengers(format!("'{part}' is not '<count> <code>'"))
            })?;
            let count: u32 = count
                .trim()
                .parse()
                .map_err(|_| Error::Passengers(format!("bad count in '{part}'")))?;
            match code.parse::<PaxType>()? {
                PaxType::Adult => counts.adults += count,
                PaxType::Child => counts.children += count,
                PaxType::Infant => counts.infants += count,
            }
        }
        if counts.total() == 0 {
            return Err(Error::Passengers(format!("'{spec}' names no travellers")));
        }
        Ok(counts)
    }

    pub fn total(&self) -> u32 {
        self.adults + self.children + self.infants
    }

    /// Travellers occupying a seat (infants ride on an adult's lap).
    pub fn seated(&self) -> u32 {
        self.adults + self.children
    }

    /// Booking-engine rules: minors need an adult, one lap infant per adult,
    /// nine travellers per reservation.
    pub fn validate(&self) -> Result<()> {
        if self.total() == 0 {
            return Err(Error::Passengers("at least one traveller required".into()));
        }
        if self.adults == 0 && (self.children > 0 || self.infants > 0) {
            return Err(Error::Passengers(
                "children or infants cannot travel without an adult".into(),
            ));
        }
        if self.infants > self.adults {
            return Err(Error::Passengers(format!(
                "{} infants exceed {} adults (one lap infant per adult)",
                self.infants, self.adults
            )));
        }
        if self.total() > MAX_TRAVELLERS {
            return Err(Error::Passengers(format!(
                "{} travellers exceed the booking limit of {MAX_TRAVELLERS}",
                self.total()
            )));
        }
        Ok(())
    }

    /// Expand counts into individual passengers with generated identities.
    ///
    /// Generation is deterministic: names come from fixed pools by index and
    /// dates of birth derive from `today`, so a rerun types the exact same
    /// data into the form.
    pub fn expand(&self, today: NaiveDate) -> Vec<Passenger> {
        let mut manifest = Vec::with_capacity(self.total() as usize);
        for i in 0..self.adults {
            manifest.push(Passenger::generated(PaxType::Adult, i as usize, today));
        }
        for i in 0..self.children {
            manifest.push(Passenger::generated(PaxType::Child, i as usize, today));
        }
        for i in 0..self.infants {
            manifest.push(Passenger::generated(PaxType::Infant, i as usize, today));
        }
        manifest
    }
}

impl fmt::Display for PaxCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.adults > 0 {
            parts.push(format!("{} ADT", self.adults));
        }
        if self.children > 0 {
            parts.push(format!("{} CHD", self.children));
        }
        if self.infants > 0 {
            parts.push(format!("{} INF", self.infants));
        }
        f.write_str(&parts.join(", "))
    }
}

/// One traveller as typed into the passenger form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passenger {
    pub pax_type: PaxType,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub loyalty_number: Option<String>,
}

const FIRST_NAMES: &[&str] = &[
    "Clara", "Jonas", "Amira", "Viktor", "Lena", "Tomas", "Ines", "Felix", "Nora",
];
const CHILD_NAMES: &[&str] = &[
    "Emil", "Sofia", "Theo", "Mila", "Oskar", "Ada", "Linus", "Greta", "Paul",
];
const LAST_NAMES: &[&str] = &[
    "Berger", "Okafor", "Lindqvist", "Moreau", "Kovacs", "Tanaka", "Weiss", "Silva", "Novak",
];

impl Passenger {
    fn generated(pax_type: PaxType, index: usize, today: NaiveDate) -> Self {
        let (title, first_name) = match pax_type {
            PaxType::Adult => {
                let title = if index % 2 == 0 { "Mr" } else { "Ms" };
                (title, FIRST_NAMES[index % FIRST_NAMES.len()])
            }
            PaxType::Child | PaxType::Infant => {
                let title = if index % 2 == 0 { "Master" } else { "Miss" };
                (title, CHILD_NAMES[index % CHILD_NAMES.len()])
            }
        };
        Self {
            pax_type,
            title: title.to_string(),
            first_name: first_name.to_string(),
            last_name: LAST_NAMES[index % LAST_NAMES.len()].to_string(),
            date_of_birth: date_of_birth(pax_type, index, today),
            loyalty_number: None,
        }
    }

    /// Age in whole years on the given date.
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        date.years_since(self.date_of_birth).unwrap_or(0)
    }
}

impl fmt::Display for Passenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.title,
            self.first_name,
            self.last_name,
            self.pax_type.code()
        )
    }
}

/// Deterministic DOB inside the fare band: adults 25+, children 2-11,
/// infants under 24 months.
fn date_of_birth(pax_type: PaxType, index: usize, today: NaiveDate) -> NaiveDate {
    let months_back = match pax_type {
        PaxType::Adult => 12 * (25 + 3 * index as u32),
        PaxType::Child => 12 * (2 + (index as u32 % 10)) + 3,
        PaxType::Infant => 4 + (index as u32 % 3) * 6,
    };
    today
        .checked_sub_months(Months::new(months_back))
        .unwrap_or(today)
}
