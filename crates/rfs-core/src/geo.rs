//! Geographic coordinate type and great-circle math.
//!
//! `GeoPoint` uses `f64` throughout.  Multilateration residuals are on the
//! order of nanoseconds-of-light (metres); single precision would dominate
//! the solver's error budget, so the f32 economy used by visual-only systems
//! does not apply here.
//!
//! Bearings are in radians, 0 = north, increasing clockwise.

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 geographic coordinate with altitude in metres above the ellipsoid.
#[derive(Copy, Clone, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    /// Metres.  Zero for ground-level receivers.
    pub alt: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Haversine great-circle surface distance in metres (altitude ignored).
    pub fn surface_distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Surface distance Pythagorean-combined with the altitude delta.
    ///
    /// This is the propagation distance used by the TDoA and RSSI models.
    pub fn slant_distance_m(self, other: GeoPoint) -> f64 {
        let surface = self.surface_distance_m(other);
        let d_alt = other.alt - self.alt;
        (surface * surface + d_alt * d_alt).sqrt()
    }

    /// Initial great-circle bearing from `self` to `other`, in radians
    /// (0 = north, clockwise).
    pub fn bearing_to(self, other: GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
        y.atan2(x)
    }

    /// Great-circle forward problem: the point `distance_m` from `self` along
    /// `bearing_rad`.  Altitude is carried over unchanged.
    pub fn destination(self, distance_m: f64, bearing_rad: f64) -> GeoPoint {
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();
        let ang = distance_m / EARTH_RADIUS_M;

        let lat2 = (lat1.sin() * ang.cos() + lat1.cos() * ang.sin() * bearing_rad.cos()).asin();
        let lon2 = lon1
            + (bearing_rad.sin() * ang.sin() * lat1.cos())
                .atan2(ang.cos() - lat1.sin() * lat2.sin());

        GeoPoint {
            lat: lat2.to_degrees(),
            lon: lon2.to_degrees(),
            alt: self.alt,
        }
    }

    /// Same point with altitude clamped into `[lo, hi]` metres.
    #[inline]
    pub fn clamp_alt(self, lo: f64, hi: f64) -> GeoPoint {
        GeoPoint {
            alt: self.alt.clamp(lo, hi),
            ..self
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.1}m)", self.lat, self.lon, self.alt)
    }
}
