//! Prints the decoded content of a registry.

use std::{env, fs};
use std::io::Read;
use atomreg::registry::Container;


fn main() {
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            println!("Usage: readreg <path>");
            return
        }
    };
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            println!("Can’t open file: {}", err);
            return;
        }
    };
    let mut data = Vec::new();
    if let Err(err) = file.read_to_end(&mut data) {
        println!("Can’t read file: {}", err);
        return;
    }

    let registry = match Container::from_pem_or_der(&data) {
        Ok(registry) => registry,
        Err(err) => {
            println!("Can’t decode registry: {}", err);
            return
        }
    };
    println!("{:#?}", registry.bag_infos());
    println!("{:#?}", registry.signers());
    for skipped in registry.skipped() {
        println!("{}", skipped);
    }
}
