//! Coordinate conversion from the British National Grid to WGS84.
//!
//! The importers only depend on [`CoordinateTransformer`]; [`Osgb36ToWgs84`]
//! is the production implementation (inverse Transverse Mercator on the
//! Airy 1830 ellipsoid followed by a 7-parameter Helmert shift).

/// Converts projected grid coordinates to `(longitude, latitude)` in decimal degrees
pub trait CoordinateTransformer {
    fn convert(&self, easting: f64, northing: f64) -> (f64, f64);
}

impl<F> CoordinateTransformer for F
where
    F: Fn(f64, f64) -> (f64, f64),
{
    fn convert(&self, easting: f64, northing: f64) -> (f64, f64) {
        self(easting, northing)
    }
}

struct Ellipsoid {
    a: f64,
    b: f64,
}

impl Ellipsoid {
    fn e2(&self) -> f64 {
        1.0 - (self.b * self.b) / (self.a * self.a)
    }
}

const AIRY_1830: Ellipsoid = Ellipsoid {
    a: 6_377_563.396,
    b: 6_356_256.909,
};

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    b: 6_356_752.314_245,
};

// National Grid true origin and scale factor
const F0: f64 = 0.999_601_271_7;
const LAT0_DEG: f64 = 49.0;
const LON0_DEG: f64 = -2.0;
const E0: f64 = 400_000.0;
const N0: f64 = -100_000.0;

// OSGB36 -> WGS84 Helmert parameters (metres, ppm, arc-seconds)
const TX: f64 = 446.448;
const TY: f64 = -125.157;
const TZ: f64 = 542.060;
const SCALE_PPM: f64 = -20.4894;
const RX_SEC: f64 = 0.1502;
const RY_SEC: f64 = 0.2470;
const RZ_SEC: f64 = 0.8421;

const MAX_ITERATIONS: usize = 100;

/// Ordnance Survey National Grid eastings/northings to WGS84 longitude/latitude
#[derive(Debug, Clone, Copy, Default)]
pub struct Osgb36ToWgs84;

impl CoordinateTransformer for Osgb36ToWgs84 {
    fn convert(&self, easting: f64, northing: f64) -> (f64, f64) {
        let (lat, lon) = grid_to_osgb36(easting, northing);
        let (x, y, z) = to_cartesian(lat, lon, &AIRY_1830);
        let (x, y, z) = helmert(x, y, z);
        let (lat, lon) = from_cartesian(x, y, z, &WGS84);
        (lon.to_degrees(), lat.to_degrees())
    }
}

fn meridional_arc(lat: f64, n: f64, b: f64) -> f64 {
    let lat0 = LAT0_DEG.to_radians();
    let (n2, n3) = (n * n, n * n * n);
    let dl = lat - lat0;
    let sl = lat + lat0;

    let ma = (1.0 + n + 1.25 * n2 + 1.25 * n3) * dl;
    let mb = (3.0 * n + 3.0 * n2 + 2.625 * n3) * dl.sin() * sl.cos();
    let mc = (1.875 * n2 + 1.875 * n3) * (2.0 * dl).sin() * (2.0 * sl).cos();
    let md = (35.0 / 24.0) * n3 * (3.0 * dl).sin() * (3.0 * sl).cos();

    b * F0 * (ma - mb + mc - md)
}

/// Inverse projection to OSGB36 latitude/longitude in radians
fn grid_to_osgb36(easting: f64, northing: f64) -> (f64, f64) {
    let Ellipsoid { a, b } = AIRY_1830;
    let e2 = AIRY_1830.e2();
    let n = (a - b) / (a + b);
    let lon0 = LON0_DEG.to_radians();

    let mut lat = LAT0_DEG.to_radians();
    let mut m = 0.0;
    for _ in 0..MAX_ITERATIONS {
        lat += (northing - N0 - m) / (a * F0);
        m = meridional_arc(lat, n, b);
        // 0.01mm
        if (northing - N0 - m).abs() < 0.000_01 {
            break;
        }
    }

    let sin_lat = lat.sin();
    let nu = a * F0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let rho = a * F0 * (1.0 - e2) / (1.0 - e2 * sin_lat * sin_lat).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let tan = lat.tan();
    let (tan2, tan4, tan6) = (tan * tan, tan.powi(4), tan.powi(6));
    let sec = 1.0 / lat.cos();

    let vii = tan / (2.0 * rho * nu);
    let viii = tan / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
    let ix = tan / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
    let x = sec / nu;
    let xi = sec / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * tan2);
    let xii = sec / (120.0 * nu.powi(5)) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
    let xiia =
        sec / (5040.0 * nu.powi(7)) * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6);

    let de = easting - E0;
    let lat = lat - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
    let lon = lon0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xiia * de.powi(7);

    (lat, lon)
}

fn to_cartesian(lat: f64, lon: f64, ellipsoid: &Ellipsoid) -> (f64, f64, f64) {
    let e2 = ellipsoid.e2();
    let nu = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    (
        nu * lat.cos() * lon.cos(),
        nu * lat.cos() * lon.sin(),
        (1.0 - e2) * nu * lat.sin(),
    )
}

fn helmert(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let s = 1.0 + SCALE_PPM * 1e-6;
    let rx = (RX_SEC / 3600.0).to_radians();
    let ry = (RY_SEC / 3600.0).to_radians();
    let rz = (RZ_SEC / 3600.0).to_radians();

    (
        TX + s * x - rz * y + ry * z,
        TY + rz * x + s * y - rx * z,
        TZ - ry * x + rx * y + s * z,
    )
}

fn from_cartesian(x: f64, y: f64, z: f64, ellipsoid: &Ellipsoid) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let p = (x * x + y * y).sqrt();
    let mut lat = z.atan2(p * (1.0 - e2));

    for _ in 0..MAX_ITERATIONS {
        let nu = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let next = (z + e2 * nu * lat.sin()).atan2(p);
        if (next - lat).abs() < 1e-12 {
            lat = next;
            break;
        }
        lat = next;
    }

    (lat, y.atan2(x))
}
