use crate::TerminologyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages the terminology carries names for.
///
/// Parsed from either the ISO 639-1 code (`fr`) or the terminology's own
/// three-letter code (`FRE`); serialized as the ISO code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    English,
    French,
    Czech,
    Finnish,
    German,
    Italian,
    Japanese,
    Polish,
    Portuguese,
    Russian,
    Spanish,
    Swedish,
    SerboCroatian,
    Dutch,
    Latvian,
    Hungarian,
    Korean,
    Danish,
    Norwegian,
    Hebrew,
    Basque,
}

impl Language {
    pub const ALL: [Language; 21] = [
        Language::English,
        Language::French,
        Language::Czech,
        Language::Finnish,
        Language::German,
        Language::Italian,
        Language::Japanese,
        Language::Polish,
        Language::Portuguese,
        Language::Russian,
        Language::Spanish,
        Language::Swedish,
        Language::SerboCroatian,
        Language::Dutch,
        Language::Latvian,
        Language::Hungarian,
        Language::Korean,
        Language::Danish,
        Language::Norwegian,
        Language::Hebrew,
        Language::Basque,
    ];

    /// Code used in the terminology's `LAT` column.
    pub fn terminology_code(self) -> &'static str {
        match self {
            Language::English => "ENG",
            Language::French => "FRE",
            Language::Czech => "CZE",
            Language::Finnish => "FIN",
            Language::German => "GER",
            Language::Italian => "ITA",
            Language::Japanese => "JPN",
            Language::Polish => "POL",
            Language::Portuguese => "POR",
            Language::Russian => "RUS",
            Language::Spanish => "SPA",
            Language::Swedish => "SWE",
            Language::SerboCroatian => "SCR",
            Language::Dutch => "DUT",
            Language::Latvian => "LAV",
            Language::Hungarian => "HUN",
            Language::Korean => "KOR",
            Language::Danish => "DAN",
            Language::Norwegian => "NOR",
            Language::Hebrew => "HEB",
            Language::Basque => "BAQ",
        }
    }

    /// ISO 639-1 code, also used as the RDF language tag.
    pub fn iso_code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
            Language::Czech => "cs",
            Language::Finnish => "fi",
            Language::German => "de",
            Language::Italian => "it",
            Language::Japanese => "ja",
            Language::Polish => "pl",
            Language::Portuguese => "pt",
            Language::Russian => "ru",
            Language::Spanish => "es",
            Language::Swedish => "sv",
            Language::SerboCroatian => "sh",
            Language::Dutch => "nl",
            Language::Latvian => "lv",
            Language::Hungarian => "hu",
            Language::Korean => "ko",
            Language::Danish => "da",
            Language::Norwegian => "no",
            Language::Hebrew => "he",
            Language::Basque => "eu",
        }
    }
}

impl FromStr for Language {
    type Err = TerminologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| {
                lang.iso_code().eq_ignore_ascii_case(code)
                    || lang.terminology_code().eq_ignore_ascii_case(code)
            })
            .ok_or_else(|| TerminologyError::UnknownLanguage(s.to_string()))
    }
}

impl TryFrom<String> for Language {
    type Error = TerminologyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.iso_code().to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.iso_code())
    }
}
