// field path constants
pub const PATH_SEPARATOR: &str = "->";
pub const INDEX_SEGMENT_OPEN: char = '[';
pub const INDEX_SEGMENT_CLOSE: char = ']';

// regex cache defaults
pub const DEFAULT_REGEX_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_REGEX_CACHE_TTL_SECS: u64 = 600;

// earth model used by the geospatial predicates
pub const EARTH_RADIUS_KM: f64 = 6_371.0088;
pub const KM_PER_DEGREE: f64 = 2.0 * std::f64::consts::PI * EARTH_RADIUS_KM / 360.0;
