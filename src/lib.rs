extern crate byteorder;
extern crate chrono;
extern crate encoding;
extern crate itertools;
#[macro_use] extern crate lazy_static;
extern crate regex;

pub mod units;
pub mod endian;
pub mod geo;
pub mod dbf;
pub mod shp;
pub mod shapefile;
