use crate::{Error, Passenger, PaxCounts, PaxType, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Direction of travel for a booking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
}

impl FromStr for TripType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "ow" | "oneway" => Ok(Self::OneWay),
            "rt" | "roundtrip" | "return" => Ok(Self::RoundTrip),
            other => Err(Error::Scenario(format!("unknown trip type '{other}'"))),
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneWay => f.write_str("one-way"),
            Self::RoundTrip => f.write_str("round-trip"),
        }
    }
}

/// Cabin of service. Accepts booking codes as well as names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    /// The value the cabin `<select>` carries in the search form.
    pub fn form_value(&self) -> &'static str {
        match self {
            Self::Economy => "ECONOMY",
            Self::PremiumEconomy => "PREMIUM_ECONOMY",
            Self::Business => "BUSINESS",
            Self::First => "FIRST",
        }
    }
}

impl FromStr for CabinClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "y" | "eco" | "economy" => Ok(Self::Economy),
            "w" | "pe" | "premium" | "premiumeconomy" => Ok(Self::PremiumEconomy),
            "c" | "j" | "business" => Ok(Self::Business),
            "f" | "first" => Ok(Self::First),
            other => Err(Error::Scenario(format!("unknown cabin '{other}'"))),
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Economy => f.write_str("economy"),
            Self::PremiumEconomy => f.write_str("premium economy"),
            Self::Business => f.write_str("business"),
            Self::First => f.write_str("first"),
        }
    }
}

/// How far through the booking flow a scenario is driven.
///
/// The ordering is the flow order: a stage "covers" every stage before it,
/// so `scenario.stage >= BookingStage::Results` means flights get selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    Search,
    Results,
    PassengerInfo,
    BookingSummary,
    Booking,
}

impl FromStr for BookingStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "search" => Ok(Self::Search),
            "results" => Ok(Self::Results),
            "passengerinfo" | "pax" => Ok(Self::PassengerInfo),
            "bookingsummary" | "summary" => Ok(Self::BookingSummary),
            "booking" | "book" => Ok(Self::Booking),
            other => Err(Error::Scenario(format!("unknown action '{other}'"))),
        }
    }
}

impl fmt::Display for BookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => f.write_str("search"),
            Self::Results => f.write_str("results"),
            Self::PassengerInfo => f.write_str("passenger-info"),
            Self::BookingSummary => f.write_str("booking-summary"),
            Self::Booking => f.write_str("booking"),
        }
    }
}

/// A travel date: fixed, or an offset in days from the run date.
///
/// Offsets (`+7`, `+30d`) keep CSV fixtures evergreen: a fixture written a
/// year ago still searches for flights in the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelDate {
    Fixed(NaiveDate),
    OffsetDays(i64),
}

impl TravelDate {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('+') {
            let rest = rest.strip_suffix('d').unwrap_or(rest);
            let days: i64 = rest
                .parse()
                .map_err(|_| Error::Date(format!("bad offset '{s}'")))?;
            if days < 0 {
                return Err(Error::Date(format!("offset '{s}' is in the past")));
            }
            return Ok(Self::OffsetDays(days));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self::Fixed)
            .map_err(|_| Error::Date(format!("'{s}' is neither YYYY-MM-DD nor +N days")))
    }

    /// Concrete calendar date for a run happening on `today`.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Fixed(d) => *d,
            Self::OffsetDays(n) => today + Duration::days(*n),
        }
    }
}

impl fmt::Display for TravelDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::OffsetDays(n) => write!(f, "+{n}d"),
        }
    }
}

/// One row of fixture data: a single booking attempt.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub id: String,
    pub description: String,
    pub trip_type: TripType,
    /// Three-letter IATA code, uppercased.
    pub origin: String,
    pub destination: String,
    pub depart: TravelDate,
    pub return_date: Option<TravelDate>,
    pub pax: PaxCounts,
    pub cabin: CabinClass,
    pub promo_code: Option<String>,
    pub loyalty_number: Option<String>,
    /// Last stage to complete before declaring the scenario done.
    pub stage: BookingStage,
}

/// Raw CSV row before validation. Header-driven; blank cells stay empty.
#[derive(Debug, Deserialize)]
struct RawRow {
    id: String,
    #[serde(default)]
    description: String,
    trip_type: String,
    origin: String,
    destination: String,
    depart_date: String,
    #[serde(default)]
    return_date: String,
    passengers: String,
    cabin: String,
    #[serde(default)]
    promo_code: String,
    #[serde(default)]
    loyalty_number: String,
    action: String,
}

impl Scenario {
    /// Load scenarios from a CSV fixture file.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;
        let scenarios = Self::from_reader(reader)?;
        debug!(
            "loaded {} scenarios from {}",
            scenarios.len(),
            path.as_ref().display()
        );
        Ok(scenarios)
    }

    /// Parse scenarios from any CSV source (used by tests and `--check`).
    pub fn parse_csv<R: Read>(input: R) -> Result<Vec<Self>> {
        let reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
        Self::from_reader(reader)
    }

    fn from_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Self>> {
        let mut scenarios = Vec::new();
        for row in reader.deserialize() {
            let raw: RawRow = row?;
            scenarios.push(Self::from_row(raw)?);
        }
        if scenarios.is_empty() {
            return Err(Error::Scenario("fixture contains no rows".into()));
        }
        Ok(scenarios)
    }

    fn from_row(raw: RawRow) -> Result<Self> {
        let id = raw.id.trim().to_string();
        if id.is_empty() {
            return Err(Error::Scenario("row is missing an id".into()));
        }
        let fail = |msg: String| Error::Scenario(format!("row '{id}': {msg}"));

        let trip_type: TripType = raw.trip_type.parse().map_err(|e| fail(format!("{e}")))?;
        let origin = airport_code(&raw.origin).map_err(|e| fail(format!("{e}")))?;
        let destination = airport_code(&raw.destination).map_err(|e| fail(format!("{e}")))?;
        if origin == destination {
            return Err(fail(format!("origin and destination are both {origin}")));
        }

        let depart = TravelDate::parse(&raw.depart_date).map_err(|e| fail(format!("{e}")))?;
        let return_date = match (trip_type, raw.return_date.trim()) {
            (TripType::OneWay, "") => None,
            (TripType::OneWay, _) => {
                return Err(fail("one-way scenario has a return date".into()));
            }
            (TripType::RoundTrip, "") => {
                return Err(fail("round-trip scenario needs a return date".into()));
            }
            (TripType::RoundTrip, s) => {
                Some(TravelDate::parse(s).map_err(|e| fail(format!("{e}")))?)
            }
        };

        // Ordering is only statically checkable when both sides are the same
        // kind; mixed fixed/offset pairs get checked at resolve time.
        match (depart, return_date) {
            (TravelDate::Fixed(out), Some(TravelDate::Fixed(back))) if back < out => {
                return Err(fail(format!("return {back} precedes departure {out}")));
            }
            (TravelDate::OffsetDays(out), Some(TravelDate::OffsetDays(back))) if back < out => {
                return Err(fail(format!("return +{back}d precedes departure +{out}d")));
            }
            _ => {}
        }

        let pax = PaxCounts::parse(&raw.passengers).map_err(|e| fail(format!("{e}")))?;
        pax.validate().map_err(|e| fail(format!("{e}")))?;
        let cabin: CabinClass = raw.cabin.parse().map_err(|e| fail(format!("{e}")))?;
        let stage: BookingStage = raw.action.parse().map_err(|e| fail(format!("{e}")))?;

        Ok(Self {
            id,
            description: raw.description.trim().to_string(),
            trip_type,
            origin,
            destination,
            depart,
            return_date,
            pax,
            cabin,
            promo_code: optional(raw.promo_code),
            loyalty_number: optional(raw.loyalty_number),
            stage,
        })
    }

    /// Resolve travel dates against the run date, enforcing ordering for
    /// mixed fixed/offset pairs the loader could not compare.
    pub fn resolved_dates(&self, today: NaiveDate) -> Result<(NaiveDate, Option<NaiveDate>)> {
        let depart = self.depart.resolve(today);
        let ret = self.return_date.map(|d| d.resolve(today));
        if let Some(back) = ret {
            if back < depart {
                return Err(Error::Date(format!(
                    "scenario '{}': return {back} precedes departure {depart}",
                    self.id
                )));
            }
        }
        Ok((depart, ret))
    }

    /// Expand passenger counts into the manifest the form layer types in.
    /// The scenario's loyalty number goes to the first adult.
    pub fn passenger_manifest(&self, today: NaiveDate) -> Result<Vec<Passenger>> {
        let mut manifest = self.pax.expand(today);
        if let Some(ref number) = self.loyalty_number {
            if let Some(lead) = manifest.iter_mut().find(|p| p.pax_type == PaxType::Adult) {
                lead.loyalty_number = Some(number.clone());
            }
        }
        Ok(manifest)
    }
}

fn optional(s: String) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn airport_code(s: &str) -> Result<String> {
    let code = s.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(Error::Scenario(format!("'{s}' is not a 3-letter airport code")));
    }
    Ok(code)
}

/// Lowercase and strip separators so "Round-Trip", "round_trip" and "RT"
/// all land on the same key.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,description,trip_type,origin,destination,depart_date,return_date,passengers,cabin,promo_code,loyalty_number,action\n";

    fn parse_one(row: &str) -> Result<Scenario> {
        let csv = format!("{HEADER}{row}\n");
        Scenario::parse_csv(csv.as_bytes()).map(|mut v| v.remove(0))
    }

    #[test]
    fn parses_full_round_trip_row() {
        let s = parse_one(
            "RT-01,weekend hop,RT,VIE,LHR,+14,+17,\"2 ADT,1 CHD\",business,SUMMER25,FF123456,booking",
        )
        .unwrap();
        assert_eq!(s.id, "RT-01");
        assert_eq!(s.trip_type, TripType::RoundTrip);
        assert_eq!(s.origin, "VIE");
        assert_eq!(s.destination, "LHR");
        assert_eq!(s.depart, TravelDate::OffsetDays(14));
        assert_eq!(s.return_date, Some(TravelDate::OffsetDays(17)));
        assert_eq!(s.pax.adults, 2);
        assert_eq!(s.pax.children, 1);
        assert_eq!(s.cabin, CabinClass::Business);
        assert_eq!(s.promo_code.as_deref(), Some("SUMMER25"));
        assert_eq!(s.loyalty_number.as_deref(), Some("FF123456"));
        assert_eq!(s.stage, BookingStage::Booking);
    }

    #[test]
    fn parses_one_way_with_blank_optionals() {
        let s = parse_one("OW-01,,ow,jfk,lax,2027-03-01,,1 ADT,Y,,,search").unwrap();
        assert_eq!(s.trip_type, TripType::OneWay);
        assert_eq!(s.origin, "JFK");
        assert_eq!(s.depart, TravelDate::Fixed(NaiveDate::from_ymd_opt(2027, 3, 1).unwrap()));
        assert!(s.return_date.is_none());
        assert!(s.promo_code.is_none());
        assert!(s.loyalty_number.is_none());
        assert_eq!(s.stage, BookingStage::Search);
    }

    #[test]
    fn stage_ordering_matches_flow_order() {
        assert!(BookingStage::Search < BookingStage::Results);
        assert!(BookingStage::Results < BookingStage::PassengerInfo);
        assert!(BookingStage::PassengerInfo < BookingStage::BookingSummary);
        assert!(BookingStage::BookingSummary < BookingStage::Booking);
    }

    #[test]
    fn stage_accepts_aliases() {
        assert_eq!("passenger-info".parse::<BookingStage>().unwrap(), BookingStage::PassengerInfo);
        assert_eq!("Booking Summary".parse::<BookingStage>().unwrap(), BookingStage::BookingSummary);
        assert_eq!("book".parse::<BookingStage>().unwrap(), BookingStage::Booking);
        assert!("checkout".parse::<BookingStage>().is_err());
    }

    #[test]
    fn cabin_accepts_codes_and_names() {
        assert_eq!("J".parse::<CabinClass>().unwrap(), CabinClass::Business);
        assert_eq!("premium economy".parse::<CabinClass>().unwrap(), CabinClass::PremiumEconomy);
        assert_eq!("W".parse::<CabinClass>().unwrap(), CabinClass::PremiumEconomy);
        assert!("coach".parse::<CabinClass>().is_err());
    }

    #[test]
    fn rejects_same_origin_and_destination() {
        let err = parse_one("X,,OW,VIE,vie,+7,,1 ADT,Y,,,search").unwrap_err();
        assert!(err.to_string().contains("origin and destination"));
    }

    #[test]
    fn rejects_bad_airport_code() {
        let err = parse_one("X,,OW,Vienna,LHR,+7,,1 ADT,Y,,,search").unwrap_err();
        assert!(err.to_string().contains("airport code"));
    }

    #[test]
    fn round_trip_requires_return_date() {
        let err = parse_one("X,,RT,VIE,LHR,+7,,1 ADT,Y,,,search").unwrap_err();
        assert!(err.to_string().contains("needs a return date"));
    }

    #[test]
    fn one_way_rejects_return_date() {
        let err = parse_one("X,,OW,VIE,LHR,+7,+9,1 ADT,Y,,,search").unwrap_err();
        assert!(err.to_string().contains("one-way"));
    }

    #[test]
    fn rejects_return_before_departure() {
        let err = parse_one("X,,RT,VIE,LHR,+10,+7,1 ADT,Y,,,search").unwrap_err();
        assert!(err.to_string().contains("precedes departure"));

        let err = parse_one("X,,RT,VIE,LHR,2027-05-10,2027-05-01,1 ADT,Y,,,search").unwrap_err();
        assert!(err.to_string().contains("precedes departure"));
    }

    #[test]
    fn mixed_date_kinds_checked_at_resolve_time() {
        let s = parse_one("X,,RT,VIE,LHR,2027-05-10,+2,1 ADT,Y,,,results").unwrap();
        let today = NaiveDate::from_ymd_opt(2027, 5, 20).unwrap();
        assert!(s.resolved_dates(today).is_err());

        let earlier = NaiveDate::from_ymd_opt(2027, 5, 1).unwrap();
        let (out, back) = s.resolved_dates(earlier).unwrap();
        assert_eq!(out, NaiveDate::from_ymd_opt(2027, 5, 10).unwrap());
        assert_eq!(back, Some(NaiveDate::from_ymd_opt(2027, 5, 3).unwrap()));
    }

    #[test]
    fn travel_date_offsets() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert_eq!(
            TravelDate::parse("+7").unwrap().resolve(today),
            NaiveDate::from_ymd_opt(2026, 8, 8).unwrap()
        );
        assert_eq!(
            TravelDate::parse("+30d").unwrap().resolve(today),
            NaiveDate::from_ymd_opt(2026, 8, 31).unwrap()
        );
        assert!(TravelDate::parse("-3").is_err());
        assert!(TravelDate::parse("07/03/2027").is_err());
    }

    #[test]
    fn manifest_attaches_loyalty_to_first_adult() {
        let s = parse_one("L,,OW,VIE,LHR,+7,,\"2 ADT,1 INF\",Y,,FF777,booking").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let manifest = s.passenger_manifest(today).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest[0].loyalty_number.as_deref(), Some("FF777"));
        assert!(manifest[1].loyalty_number.is_none());
    }

    #[test]
    fn empty_fixture_is_an_error() {
        let err = Scenario::parse_csv(HEADER.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no rows"));
    }

    #[test]
    fn missing_id_is_an_error() {
        let err = parse_one(",,OW,VIE,LHR,+7,,1 ADT,Y,,,search").unwrap_err();
        assert!(err.to_string().contains("missing an id"));
    }
}
