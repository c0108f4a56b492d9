//! Pre-model question screening.

/// Keywords for data the warehouse does not hold.
pub const OUT_OF_DOMAIN_KEYWORDS: [&str; 21] = [
    "driver",
    "rider",
    "bike",
    "vehicle",
    "delivery boy",
    "speed",
    "distance",
    "location",
    "map",
    "gps",
    "coordinates",
    "otp",
    "pin",
    "tracking",
    "warehouse",
    "postman",
    "time taken",
    "latitude",
    "longitude",
    "region",
    "delivery time",
];

pub const EMPTY_QUESTION: &str = "Please enter a valid question.";
pub const OUT_OF_DOMAIN: &str =
    "This information (like drivers, GPS, or delivery time) does not exist in the dataset.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyQuestion,
    /// The question names something outside the dataset.
    OutOfDomain(&'static str),
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::EmptyQuestion => EMPTY_QUESTION,
            Rejection::OutOfDomain(_) => OUT_OF_DOMAIN,
        }
    }
}

/// Reject blank questions and questions mentioning a blacklisted keyword.
///
/// Matching is a case-insensitive substring test, so "mapping" trips "map".
pub fn screen(question: &str) -> Result<(), Rejection> {
    if question.trim().is_empty() {
        return Err(Rejection::EmptyQuestion);
    }
    let lowered = question.to_lowercase();
    match OUT_OF_DOMAIN_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
        Some(keyword) => Err(Rejection::OutOfDomain(keyword)),
        None => Ok(()),
    }
}
