extern crate shapecodec;

use std::env;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use shapecodec::shapefile;

fn main() {
    let mut args = env::args();

    if args.len() != 2 {
        writeln!(&mut io::stderr(), "Usage: {} <SHP_PATH>", args.next().unwrap()).unwrap();
        process::exit(1);
    }

    args.next();
    let path = PathBuf::from(args.next().unwrap());

    match shapefile::open(&path) {
        Err(err) => {
            writeln!(&mut io::stderr(), "{}", err).unwrap();
            process::exit(1);
        }
        Ok(reader) => {
            let schema = reader.schema().clone();
            let mut n_records: usize = 0;

            for record_result in reader {
                match record_result {
                    Err(err) => {
                        writeln!(&mut io::stderr(), "Error during read: {}", err).unwrap();
                        process::exit(1);
                    }
                    Ok(record) => {
                        n_records += 1;
                        let attributes: Vec<String> = schema.fields().iter()
                            .zip(record.attributes.values.iter())
                            .map(|(field, value)| format!("{}={}", field.name(), value))
                            .collect();
                        println!(
                            "{}: {:?} [{}]",
                            record.shape.record_number(),
                            record.shape.content.shape_type(),
                            attributes.join(", ")
                        );
                    }
                }
            }

            println!("Read {} records", n_records);
        }
    }
}
