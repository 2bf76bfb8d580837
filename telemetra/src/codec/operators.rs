// logical operators
pub const AND: &str = "_and";
pub const OR: &str = "_or";
pub const NOT: &str = "_not";

// structural operators
pub const EXISTS: &str = "_exists";
pub const WITH_TAG: &str = "_withTag";
pub const WITH_ANY_TAG: &str = "_withAnyTag";
pub const LOCATION_IN_CIRCLE: &str = "_locationInCircle";
pub const LOCATION_IN_POLYGON: &str = "_locationInPolygon";

// leaf operators
pub const EQ: &str = "_eq";
pub const NEQ: &str = "_neq";
pub const GT: &str = "_gt";
pub const GTE: &str = "_gte";
pub const LT: &str = "_lt";
pub const LTE: &str = "_lte";
pub const IN: &str = "_in";
pub const STARTS_WITH: &str = "_startsWith";
pub const REGEX: &str = "_regex";
pub const REGEX_OPTIONS: &str = "_options";
pub const CASE_INSENSITIVE_OPTION: &str = "i";

// operand keys
pub const CENTER: &str = "center";
pub const RADIUS: &str = "radius";
pub const LAT: &str = "lat";
pub const LNG: &str = "lng";
