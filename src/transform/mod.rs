//! Raw records -> typed rows

pub mod gazetteer;
pub mod postcode;

pub use gazetteer::{
    apply_hemisphere, feature_lookups, parse_gazetteer_record, CountyAccumulator, CountyLookup,
    FeatureLookup, GazetteerPoint, GAZETTEER_FIELDS,
};
pub use postcode::{join_postcode, split_postcode, PostcodePoint};
