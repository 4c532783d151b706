use std::{env, fs};
use std::io::Read;
use atomreg::cms::CmsContainer;


fn main() {
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            println!("Usage: readp7 <path>");
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

    let cms = match CmsContainer::from_pem_or_der(&data) {
        Ok(cms) => cms,
        Err(err) => {
            println!("Can’t decode CMS object: {}", err);
            return
        }
    };
    for cert in cms.certificates().iter().chain(cms.econtent_certs()) {
        println!("{:#?}", cert.summary());
    }
    println!("{:#?}", cms.signers());
    for skipped in cms.skipped() {
        println!("{}", skipped);
    }
}
