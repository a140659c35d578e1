//! Facility categories and their query/presentation table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One `node[k=v][k=v]` selector: every tag pair must match.
pub type TagSelector = &'static [(&'static str, &'static str)];

/// Kind of accessibility facility the map can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TactilePaving,
    DisabledParking,
    AccessibleToilets,
    Ramps,
    Elevators,
    AccessibleStops,
    AudioTrafficSignals,
    EmergencyPhones,
    AccessibleEntrances,
    HearingLoops,
    SignLanguageServices,
    AccessibleHospitals,
}

/// Static description of a category: how to query it and how to draw it.
#[derive(Debug)]
pub struct CategorySpec {
    pub category: Category,
    /// Stable machine key, also used in survey output
    pub key: &'static str,
    pub label: &'static str,
    /// Selectors unioned into one query
    pub selectors: &'static [TagSelector],
    pub style: MarkerStyle,
}

/// Marker appearance for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub icon: &'static str,
    /// 0xRRGGBB
    pub color: u32,
}

impl MarkerStyle {
    pub fn hex_color(&self) -> String {
        hex_rgb(self.color)
    }
}

/// `0xRRGGBB` as `#RRGGBB`
pub fn hex_rgb(color: u32) -> String {
    format!("#{:06X}", color & 0xFF_FFFF)
}

// Indexed by `Category as usize`; keep in declaration order.
static CATALOG: [CategorySpec; 12] = [
    CategorySpec {
        category: Category::TactilePaving,
        key: "tactile_paving",
        label: "Tactile Paving",
        selectors: &[
            &[("kerb", "lowered"), ("tactile_paving", "yes")],
            &[("highway", "bus_stop"), ("tactile_paving", "yes")],
            &[("highway", "elevator"), ("tactile_paving", "yes")],
        ],
        style: MarkerStyle {
            icon: "circle.grid.3x3.fill",
            color: 0xFFCC00,
        },
    },
    CategorySpec {
        category: Category::DisabledParking,
        key: "disabled_parking",
        label: "Disabled Parking",
        selectors: &[&[("amenity", "parking")]],
        style: MarkerStyle {
            icon: "parkingsign.circle.fill",
            color: 0x007AFF,
        },
    },
    CategorySpec {
        category: Category::AccessibleToilets,
        key: "accessible_toilets",
        label: "Accessible Toilets",
        selectors: &[&[("amenity", "toilets"), ("wheelchair", "yes")]],
        style: MarkerStyle {
            icon: "toilet.fill",
            color: 0x5856D6,
        },
    },
    CategorySpec {
        category: Category::Ramps,
        key: "ramps",
        label: "Ramps",
        selectors: &[&[("ramp", "yes")]],
        style: MarkerStyle {
            icon: "figure.roll",
            color: 0x34C759,
        },
    },
    CategorySpec {
        category: Category::Elevators,
        key: "elevators",
        label: "Elevators",
        selectors: &[&[("highway", "elevator")]],
        style: MarkerStyle {
            icon: "arrow.up.arrow.down.square.fill",
            color: 0xAF52DE,
        },
    },
    CategorySpec {
        category: Category::AccessibleStops,
        key: "accessible_stops",
        label: "Accessible Transit Stops",
        selectors: &[&[("public_transport", "platform"), ("wheelchair", "yes")]],
        style: MarkerStyle {
            icon: "bus.fill",
            color: 0xFF9500,
        },
    },
    CategorySpec {
        category: Category::AudioTrafficSignals,
        key: "audio_traffic_signals",
        label: "Audio Traffic Signals",
        selectors: &[&[("highway", "crossing"), ("kerb", "lowered")]],
        style: MarkerStyle {
            icon: "speaker.wave.2.fill",
            color: 0xFF3B30,
        },
    },
    CategorySpec {
        category: Category::EmergencyPhones,
        key: "emergency_phones",
        label: "Emergency Phones",
        selectors: &[&[("amenity", "emergency_phone")]],
        style: MarkerStyle {
            icon: "phone.fill",
            color: 0xFF2D55,
        },
    },
    CategorySpec {
        category: Category::AccessibleEntrances,
        key: "accessible_entrances",
        label: "Accessible Entrances",
        selectors: &[&[("entrance", "main"), ("wheelchair", "yes")]],
        style: MarkerStyle {
            icon: "door.left.hand.open",
            color: 0x30B0C7,
        },
    },
    CategorySpec {
        category: Category::HearingLoops,
        key: "hearing_loops",
        label: "Hearing Loops",
        selectors: &[&[("hearing_loop", "yes")], &[("audio_loop", "yes")]],
        style: MarkerStyle {
            icon: "ear.fill",
            color: 0xA2845E,
        },
    },
    CategorySpec {
        category: Category::SignLanguageServices,
        key: "sign_language_services",
        label: "Sign Language Services",
        selectors: &[&[("contact:sign_language", "yes")]],
        style: MarkerStyle {
            icon: "hand.raised.fill",
            color: 0x32ADE6,
        },
    },
    CategorySpec {
        category: Category::AccessibleHospitals,
        key: "accessible_hospitals",
        label: "Accessible Hospitals",
        selectors: &[&[("emergency", "yes")]],
        style: MarkerStyle {
            icon: "cross.case.fill",
            color: 0xE0115F,
        },
    },
];

impl Category {
    pub const ALL: [Category; 12] = [
        Category::TactilePaving,
        Category::DisabledParking,
        Category::AccessibleToilets,
        Category::Ramps,
        Category::Elevators,
        Category::AccessibleStops,
        Category::AudioTrafficSignals,
        Category::EmergencyPhones,
        Category::AccessibleEntrances,
        Category::HearingLoops,
        Category::SignLanguageServices,
        Category::AccessibleHospitals,
    ];

    pub fn spec(self) -> &'static CategorySpec {
        &CATALOG[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }

    pub fn style(self) -> MarkerStyle {
        self.spec().style
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts either the machine key or the display label, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CATALOG
            .iter()
            .find(|spec| {
                spec.key.eq_ignore_ascii_case(wanted) || spec.label.eq_ignore_ascii_case(wanted)
            })
            .map(|spec| spec.category)
            .ok_or_else(|| format!("unknown category '{}'", wanted))
    }
}
