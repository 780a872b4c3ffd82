//! Static reservoir description as read from input.

use std::fmt;

use hydroute_core::NodeId;

use crate::error::ReservoirError;

/// Number of purpose columns in a reservoir record.
pub const NPURPOSE: usize = 5;

/// One reservoir input record.
///
/// `purpose[0]` is the main-purpose code; `purpose[1..5]` are yes/no
/// flags for secondary uses in the order irrigation, water supply, flood
/// control, hydropower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReservoirRecord {
    /// Year the dam starts operating. Zero or negative means no dam.
    pub commission_year: i32,
    /// Maximum storage in litres.
    pub capacity: f64,
    /// Water surface area in km².
    pub surface_area: f64,
    /// Installed hydropower capacity class.
    pub installed_capacity: i32,
    /// Dam height in metres.
    pub height: i32,
    /// Main-purpose code followed by secondary-use flags.
    pub purpose: [i32; NPURPOSE],
}

impl ReservoirRecord {
    /// `true` if the record describes a dam at all.
    pub fn has_dam(&self) -> bool {
        self.commission_year > 0
    }
}

/// What a reservoir is operated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Hydropower generation.
    Hydropower,
    /// Irrigation water supply.
    Irrigation,
    /// Household and industrial water supply.
    WaterSupply,
    /// Flood control.
    FloodControl,
    /// Navigation, recreation, fisheries, ...
    Other,
}

impl Purpose {
    const ALL: [Purpose; 5] = [
        Purpose::Hydropower,
        Purpose::Irrigation,
        Purpose::WaterSupply,
        Purpose::FloodControl,
        Purpose::Other,
    ];

    /// Decode a main-purpose code. `0` means unspecified.
    pub fn from_code(code: i32) -> Option<Option<Self>> {
        match code {
            0 => Some(None),
            1 => Some(Some(Self::Hydropower)),
            2 => Some(Some(Self::Irrigation)),
            3 => Some(Some(Self::WaterSupply)),
            4 => Some(Some(Self::FloodControl)),
            5 => Some(Some(Self::Other)),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Hydropower => 1,
            Self::Irrigation => 1 << 1,
            Self::WaterSupply => 1 << 2,
            Self::FloodControl => 1 << 3,
            Self::Other => 1 << 4,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hydropower => "hydropower",
            Self::Irrigation => "irrigation",
            Self::WaterSupply => "water supply",
            Self::FloodControl => "flood control",
            Self::Other => "other",
        })
    }
}

/// Set of purposes, with the main one remembered separately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PurposeSet {
    bits: u8,
    main: Option<Purpose>,
}

impl PurposeSet {
    /// Decode the purpose columns of a record.
    pub fn from_record(cell: NodeId, purpose: &[i32; NPURPOSE]) -> Result<Self, ReservoirError> {
        let main = Purpose::from_code(purpose[0]).ok_or_else(|| ReservoirError::Malformed {
            cell,
            reason: format!("unknown main purpose code {}", purpose[0]),
        })?;
        let mut set = Self { bits: 0, main };
        if let Some(p) = main {
            set.insert(p);
        }
        let secondary = [
            Purpose::Irrigation,
            Purpose::WaterSupply,
            Purpose::FloodControl,
            Purpose::Hydropower,
        ];
        for (flag, purpose) in purpose[1..].iter().zip(secondary) {
            match flag {
                0 => {}
                1 => set.insert(purpose),
                other => {
                    return Err(ReservoirError::Malformed {
                        cell,
                        reason: format!("{purpose} flag must be 0 or 1, got {other}"),
                    })
                }
            }
        }
        Ok(set)
    }

    /// Add a purpose.
    pub fn insert(&mut self, purpose: Purpose) {
        self.bits |= purpose.bit();
    }

    /// `true` if `purpose` is in the set.
    pub fn contains(&self, purpose: Purpose) -> bool {
        self.bits & purpose.bit() != 0
    }

    /// The main purpose, if one was given.
    pub fn main(&self) -> Option<Purpose> {
        self.main
    }

    /// `true` for reservoirs that buffer water for irrigation.
    pub fn is_irrigation(&self) -> bool {
        self.contains(Purpose::Irrigation)
    }

    /// Purposes in the set, in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = Purpose> + '_ {
        Purpose::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(purpose: [i32; NPURPOSE]) -> Result<PurposeSet, ReservoirError> {
        PurposeSet::from_record(NodeId::new(0), &purpose)
    }

    #[test]
    fn main_irrigation_code_makes_irrigation_reservoir() {
        let set = decode([2, 0, 0, 0, 0]).unwrap();
        assert!(set.is_irrigation());
        assert_eq!(set.main(), Some(Purpose::Irrigation));
    }

    #[test]
    fn secondary_irrigation_flag_makes_irrigation_reservoir() {
        let set = decode([1, 1, 0, 0, 0]).unwrap();
        assert!(set.is_irrigation());
        assert!(set.contains(Purpose::Hydropower));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn hydropower_only_is_not_irrigation() {
        assert!(!decode([1, 0, 0, 0, 1]).unwrap().is_irrigation());
    }

    #[test]
    fn bad_codes_are_rejected() {
        assert!(decode([9, 0, 0, 0, 0]).is_err());
        assert!(decode([1, 0, 2, 0, 0]).is_err());
    }
}
