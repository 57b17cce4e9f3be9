//! Strongly typed identifier wrappers.
//!
//! Drone and receiver ids are operator-assigned strings ("drone1", "R0") that
//! travel over the wire, so they wrap `String` rather than a dense integer.
//! Both are `Ord + Hash` so they can key maps and be sorted for deterministic
//! swarm-wide decisions (band allocation, election tie-breaks).

use std::fmt;

/// Generate a typed ID wrapper around an owned string.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug,
                 serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub String);

        impl $name {
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Identifies one drone agent in the swarm.
    pub struct DroneId;
}

string_id! {
    /// Identifies one SDR receiver (fixed site or drone-mounted).
    pub struct ReceiverId;
}

/// A nominal signal frequency in integer hertz.
///
/// Integer so it can key measurement maps exactly; all measurements feeding
/// one geolocation attempt must share the same nominal frequency.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default,
         serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FrequencyHz(pub u64);

impl FrequencyHz {
    #[inline]
    pub fn from_mhz(mhz: f64) -> Self {
        Self((mhz * 1e6) as u64)
    }

    #[inline]
    pub fn as_mhz(self) -> f64 {
        self.0 as f64 / 1e6
    }
}

impl fmt::Display for FrequencyHz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} MHz", self.as_mhz())
    }
}
