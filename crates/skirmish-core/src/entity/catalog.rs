//! Static unit catalog: canonical codes, aliases, categories and weapon ranges.
//!
//! The roster is declared once in [`ROSTER`]; the alias lookup is built from it
//! on first use and shared for the life of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Tactical role of a unit type.
///
/// Closed set with [`UnitCategory::Other`] as the explicit default for codes
/// missing from the roster.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitCategory {
    /// Long-range, fragile, area damage.
    Arty,
    /// Main battle tank: durable, mid-range.
    Mbt,
    /// Light armor / anti-air: fast, good against light targets.
    Afv,
    /// Cheap infantry that soaks fire.
    InfMeat,
    /// Anti-tank infantry: fragile, dangerous to vehicles.
    InfAt,
    /// Static defenses.
    Defense,
    /// Anything not in the roster.
    #[default]
    Other,
}

impl UnitCategory {
    /// Single-bit mask for this category.
    #[must_use]
    pub const fn mask(self) -> CategoryMask {
        match self {
            Self::Arty => CategoryMask::ARTY,
            Self::Mbt => CategoryMask::MBT,
            Self::Afv => CategoryMask::AFV,
            Self::InfMeat => CategoryMask::INF_MEAT,
            Self::InfAt => CategoryMask::INF_AT,
            Self::Defense => CategoryMask::DEFENSE,
            Self::Other => CategoryMask::OTHER,
        }
    }

    /// True for both infantry categories.
    #[must_use]
    pub const fn is_infantry(self) -> bool {
        matches!(self, Self::InfMeat | Self::InfAt)
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Arty => "ARTY",
            Self::Mbt => "MBT",
            Self::Afv => "AFV",
            Self::InfMeat => "INF_MEAT",
            Self::InfAt => "INF_AT",
            Self::Defense => "DEFENSE",
            Self::Other => "OTHER",
        };
        write!(f, "{name}")
    }
}

bitflags! {
    /// Set of categories, used to express rule filters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CategoryMask: u8 {
        /// Artillery.
        const ARTY = 1 << 0;
        /// Main battle tanks.
        const MBT = 1 << 1;
        /// Light armor.
        const AFV = 1 << 2;
        /// Fodder infantry.
        const INF_MEAT = 1 << 3;
        /// Anti-tank infantry.
        const INF_AT = 1 << 4;
        /// Static defenses.
        const DEFENSE = 1 << 5;
        /// Unclassified.
        const OTHER = 1 << 6;

        /// Everything that can be finished off by an armor harvest.
        const VEHICLE = Self::ARTY.bits() | Self::MBT.bits() | Self::AFV.bits();
        /// Both infantry categories.
        const INFANTRY = Self::INF_MEAT.bits() | Self::INF_AT.bits();
        /// Units that retreat when badly damaged.
        const FRAGILE = Self::ARTY.bits() | Self::AFV.bits();
        /// Armor that avoids anti-tank infantry.
        const ARMOR = Self::MBT.bits() | Self::AFV.bits();
    }
}

/// One roster entry.
#[derive(Debug)]
pub struct UnitSpec {
    /// Canonical lower-case code.
    pub code: &'static str,
    /// Tactical category.
    pub category: UnitCategory,
    /// Extra names the game may report for this type (localized names).
    pub aliases: &'static [&'static str],
}

/// The full roster.
pub const ROSTER: &[UnitSpec] = &[
    UnitSpec { code: "v2rl", category: UnitCategory::Arty, aliases: &["V2火箭发射车"] },
    UnitSpec { code: "arty", category: UnitCategory::Arty, aliases: &["榴弹炮"] },
    UnitSpec { code: "3tnk", category: UnitCategory::Mbt, aliases: &["重型坦克"] },
    UnitSpec { code: "4tnk", category: UnitCategory::Mbt, aliases: &["超重型坦克"] },
    UnitSpec { code: "2tnk", category: UnitCategory::Mbt, aliases: &["中型坦克"] },
    UnitSpec { code: "ttnk", category: UnitCategory::Mbt, aliases: &["特斯拉坦克"] },
    UnitSpec { code: "ctnk", category: UnitCategory::Mbt, aliases: &["超时空坦克"] },
    UnitSpec { code: "ftrk", category: UnitCategory::Afv, aliases: &["防空车"] },
    UnitSpec { code: "1tnk", category: UnitCategory::Afv, aliases: &["轻坦克"] },
    UnitSpec { code: "jeep", category: UnitCategory::Afv, aliases: &["吉普车"] },
    UnitSpec { code: "apc", category: UnitCategory::Afv, aliases: &["装甲运输车"] },
    UnitSpec { code: "e1", category: UnitCategory::InfMeat, aliases: &["步兵"] },
    UnitSpec { code: "e2", category: UnitCategory::InfMeat, aliases: &["掷弹兵"] },
    UnitSpec { code: "e3", category: UnitCategory::InfAt, aliases: &["火箭兵"] },
    UnitSpec { code: "e4", category: UnitCategory::InfAt, aliases: &["喷火兵"] },
    UnitSpec { code: "shok", category: UnitCategory::InfAt, aliases: &["磁暴步兵"] },
    UnitSpec { code: "pbox", category: UnitCategory::Defense, aliases: &["碉堡"] },
    UnitSpec { code: "hbox", category: UnitCategory::Defense, aliases: &["伪装碉堡"] },
    UnitSpec { code: "gun", category: UnitCategory::Defense, aliases: &["炮塔"] },
    UnitSpec { code: "tsla", category: UnitCategory::Defense, aliases: &["磁暴线圈"] },
    UnitSpec { code: "ftur", category: UnitCategory::Defense, aliases: &["火焰塔"] },
];

/// Substrings that mark non-combat entities (spawn markers, cameras, wrecks).
pub const IGNORED_SUBSTRINGS: &[&str] = &["mpspawn", "camera", "husk"];

/// Range used for codes without an entry in [`weapon_range`].
pub const DEFAULT_WEAPON_RANGE: f32 = 4.0;

struct Lookup {
    /// Lower-cased alias or code -> roster entry.
    by_name: HashMap<String, &'static UnitSpec>,
}

fn lookup() -> &'static Lookup {
    static LOOKUP: OnceLock<Lookup> = OnceLock::new();
    LOOKUP.get_or_init(|| {
        let mut by_name = HashMap::new();
        for spec in ROSTER {
            by_name.insert(spec.code.to_owned(), spec);
            for alias in spec.aliases {
                by_name.insert(alias.to_lowercase(), spec);
            }
        }
        Lookup { by_name }
    })
}

/// Collapses a raw type name to its canonical code.
///
/// Matching is case-insensitive. Names missing from the roster come back
/// lower-cased unchanged.
///
/// ```
/// use skirmish_core::entity::catalog::normalize_code;
///
/// assert_eq!(normalize_code("重型坦克"), "3tnk");
/// assert_eq!(normalize_code("E1"), "e1");
/// assert_eq!(normalize_code("Harv"), "harv");
/// ```
#[must_use]
pub fn normalize_code(raw_type: &str) -> String {
    let lowered = raw_type.to_lowercase();
    match lookup().by_name.get(&lowered) {
        Some(spec) => spec.code.to_owned(),
        None => lowered,
    }
}

/// Category of a canonical code; [`UnitCategory::Other`] when unknown.
#[must_use]
pub fn category_of(code: &str) -> UnitCategory {
    lookup()
        .by_name
        .get(code)
        .map_or(UnitCategory::Other, |spec| spec.category)
}

/// True if the code contains any blacklisted substring.
#[must_use]
pub fn is_ignored(code: &str) -> bool {
    IGNORED_SUBSTRINGS.iter().any(|marker| code.contains(marker))
}

/// Conservative weapon range for a canonical code.
#[must_use]
pub fn weapon_range(code: &str) -> f32 {
    match code {
        "v2rl" => 10.0,
        "3tnk" | "4tnk" => 4.75,
        "ftrk" => 6.0,
        "e1" | "e3" => 5.0,
        _ => DEFAULT_WEAPON_RANGE,
    }
}
