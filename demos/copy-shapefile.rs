extern crate shapecodec;

use std::env;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use shapecodec::shapefile;

/// Reads the given layer and writes a byte-faithful copy beside the output
/// path, regenerating the ".shx" index along the way.
fn main() {
    let mut args = env::args();

    if args.len() != 3 {
        writeln!(&mut io::stderr(), "Usage: {} <IN_SHP_PATH> <OUT_SHP_PATH>", args.next().unwrap()).unwrap();
        process::exit(1);
    }

    args.next();
    let in_path = PathBuf::from(args.next().unwrap());
    let out_path = PathBuf::from(args.next().unwrap());

    let reader = match shapefile::open(&in_path) {
        Err(err) => {
            writeln!(&mut io::stderr(), "{}", err).unwrap();
            process::exit(1);
        }
        Ok(reader) => reader,
    };

    let shp_header = reader.shp_header().clone();
    let dbf_header = reader.dbf_header().clone();

    let mut writer = match shapefile::create(&out_path, shp_header, dbf_header) {
        Err(err) => {
            writeln!(&mut io::stderr(), "{}", err).unwrap();
            process::exit(1);
        }
        Ok(writer) => writer,
    };

    let mut n_records: usize = 0;
    for record_result in reader {
        let record = match record_result {
            Err(err) => {
                writeln!(&mut io::stderr(), "Error during read: {}", err).unwrap();
                process::exit(1);
            }
            Ok(record) => record,
        };
        if let Err(err) = writer.write_record(&record.shape.content, &record.attributes) {
            writeln!(&mut io::stderr(), "Error during write: {}", err).unwrap();
            process::exit(1);
        }
        n_records += 1;
    }

    if let Err(err) = writer.finish() {
        writeln!(&mut io::stderr(), "Error during write: {}", err).unwrap();
        process::exit(1);
    }

    println!("Copied {} records", n_records);
}
