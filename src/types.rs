//! Display records and the closed enumerations that select query parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attribution link returned alongside grounded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// One parsed topic card. Built by the parser, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendItem {
    pub id: String,
    pub category: Category,
    pub headline: String,
    pub summary: String,
    pub virality_score: u32, // expected 1..=100, not enforced
    pub hashtags: Vec<String>,
    pub sources: Vec<Source>,
    pub timestamp: String, // "HH:MM" of the fetch
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub platform: Platform,
    pub content: String,
}

/// Implements label-based serde plus `FromStr` accepting the label or a slug.
macro_rules! label_enum {
    ($name:ident, $what:literal, { $($variant:ident => $label:literal, [$($slug:literal),*]);+ $(;)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                $(
                    if wanted == $label.to_ascii_lowercase() $(|| wanted == $slug)* {
                        return Ok($name::$variant);
                    }
                )+
                Err(anyhow::anyhow!(concat!("Unknown ", $what, ": {}"), s))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $name::from_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    Breaking,
    Tech,
    Crypto,
    Finance,
    Celebrity,
    Sports,
    Lifestyle,
}

label_enum!(Category, "category", {
    Breaking => "Breaking News", ["breaking"];
    Tech => "Technology", ["tech"];
    Crypto => "Crypto & Web3", ["crypto", "web3"];
    Finance => "Finance & Markets", ["finance", "markets"];
    Celebrity => "Celebrity & Entertainment", ["celebrity", "entertainment"];
    Sports => "Sports & Football", ["sports", "football"];
    Lifestyle => "Lifestyle & Travel", ["lifestyle", "travel"];
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    Global,
    #[default]
    Usa,
    Canada,
    Europe,
    Asia,
    MiddleEast,
    Africa,
    LatinAmerica,
}

label_enum!(Region, "region", {
    Global => "Global", ["global"];
    Usa => "USA", ["us"];
    Canada => "Canada", ["ca"];
    Europe => "Europe", ["eu"];
    Asia => "Asia", [];
    MiddleEast => "Middle East", ["middle-east", "middle_east"];
    Africa => "Africa", [];
    LatinAmerica => "Latin America", ["latin-america", "latam"];
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    Twitter,
    #[default]
    LinkedIn,
    Instagram,
    TikTok,
    YouTube,
}

label_enum!(Platform, "platform", {
    Twitter => "Twitter", ["x"];
    LinkedIn => "LinkedIn", [];
    Instagram => "Instagram", ["ig"];
    TikTok => "TikTok", [];
    YouTube => "YouTube", ["yt"];
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_slugs_parse() {
        assert_eq!("Technology".parse::<Category>().unwrap(), Category::Tech);
        assert_eq!("tech".parse::<Category>().unwrap(), Category::Tech);
        assert_eq!(" middle east ".parse::<Region>().unwrap(), Region::MiddleEast);
        assert_eq!("latam".parse::<Region>().unwrap(), Region::LatinAmerica);
        assert_eq!("youtube".parse::<Platform>().unwrap(), Platform::YouTube);
        assert!("weather".parse::<Category>().is_err());
    }

    #[test]
    fn trend_item_serializes_camel_case_with_labels() {
        let item = TrendItem {
            id: "trend-1-0".into(),
            category: Category::Crypto,
            headline: "h".into(),
            summary: "s".into(),
            virality_score: 77,
            hashtags: vec!["BTC".into()],
            sources: vec![],
            timestamp: "09:30".into(),
        };
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["viralityScore"], 77);
        assert_eq!(v["category"], "Crypto & Web3");

        let back: TrendItem = serde_json::from_value(v).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn defaults_match_dashboard_start_state() {
        assert_eq!(Category::default(), Category::Breaking);
        assert_eq!(Region::default(), Region::Usa);
        assert_eq!(Platform::default(), Platform::LinkedIn);
        assert_eq!(Category::ALL.len(), 7);
        assert_eq!(Region::ALL.len(), 8);
    }
}
