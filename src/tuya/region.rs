//! Tuya data center regions

use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// Data center hosting the cloud project. Selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Central Europe
    Eu,
    /// Western Europe
    EuWest,
    /// Western America
    Us,
    /// Eastern America
    UsEast,
    China,
    India,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Eu,
        Region::EuWest,
        Region::Us,
        Region::UsEast,
        Region::China,
        Region::India,
    ];

    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Eu => "https://openapi.tuyaeu.com",
            Region::EuWest => "https://openapi-weaz.tuyaeu.com",
            Region::Us => "https://openapi.tuyaus.com",
            Region::UsEast => "https://openapi-ueaz.tuyaus.com",
            Region::China => "https://openapi.tuyacn.com",
            Region::India => "https://openapi.tuyain.com",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Region::Eu => "eu",
            Region::EuWest => "eu-west",
            Region::Us => "us",
            Region::UsEast => "us-east",
            Region::China => "cn",
            Region::India => "in",
        }
    }
}

impl FromStr for Region {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Region::ALL
            .into_iter()
            .find(|r| r.code() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Region::ALL.iter().map(|r| r.code()).collect();
                GatewayError::Config(format!(
                    "Unsupported Tuya region '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_base_urls() {
        assert_eq!(Region::Eu.base_url(), "https://openapi.tuyaeu.com");
        assert_eq!(Region::Us.base_url(), "https://openapi.tuyaus.com");
        assert_eq!(Region::China.base_url(), "https://openapi.tuyacn.com");
    }

    #[test]
    fn test_region_parse() {
        assert_eq!("eu".parse::<Region>().unwrap(), Region::Eu);
        assert_eq!(" US ".parse::<Region>().unwrap(), Region::Us);
        assert_eq!("eu_west".parse::<Region>().unwrap(), Region::EuWest);
        assert_eq!("cn".parse::<Region>().unwrap(), Region::China);
    }

    #[test]
    fn test_unknown_region_is_config_error() {
        let err = "mars".parse::<Region>().unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("mars"));
    }

    #[test]
    fn test_code_round_trips_through_display() {
        for region in Region::ALL {
            assert_eq!(region.to_string().parse::<Region>().unwrap(), region);
        }
    }
}
